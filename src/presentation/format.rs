//! Display formatting for money, percentages, sizes and times.

use chrono::{DateTime, Local};
use rust_decimal::{Decimal, RoundingStrategy};

/// `$1,234.56`; negatives keep the sign after the dollar: `$-1,234.56`.
pub fn format_currency(value: Decimal) -> String {
    format!("${}", group_thousands(value, 2))
}

/// Four decimals, used for fees: `$1,234.5678`.
pub fn format_currency_precise(value: Decimal) -> String {
    format!("${}", group_thousands(value, 4))
}

/// `12.34%`
pub fn format_percent(value: Decimal) -> String {
    format!("{}%", fixed(value, 2))
}

/// Margin usage label value, one decimal: `40.0%`.
pub fn format_usage(value: Decimal) -> String {
    format!("{}%", fixed(value, 1))
}

/// Magnitude only, six decimals.
pub fn format_size(value: Decimal) -> String {
    fixed(value.abs(), 6)
}

/// Signed amount, six decimals.
pub fn format_amount(value: Decimal) -> String {
    fixed(value, 6)
}

pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// First ten characters of the wallet followed by an ellipsis.
pub fn short_wallet(address: &str) -> String {
    let prefix: String = address.chars().take(10).collect();
    format!("{}...", prefix)
}

fn round(value: Decimal, dp: u32) -> Decimal {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    // no "-0.00"
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

fn fixed(value: Decimal, dp: u32) -> String {
    format!("{:.*}", dp as usize, round(value, dp))
}

fn group_thousands(value: Decimal, dp: u32) -> String {
    let rounded = round(value, dp);
    let text = format!("{:.*}", dp as usize, rounded.abs());
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer.to_string(), Some(fraction.to_string())),
        None => (text, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}
