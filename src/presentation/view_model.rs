//! Section view models: canonical rows and aggregates turned into display strings.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::format::*;
use crate::domain::{BalanceSnapshot, PositionRecord, PositionSummary, TradeRecord, TradeStatistics};

pub const POSITION_HEADERS: [&str; 8] = [
    "Symbol",
    "Side",
    "Size",
    "Entry Price",
    "Mark Price",
    "Notional",
    "Unrealized PnL",
    "PnL %",
];

pub const TRADE_HEADERS: [&str; 9] = [
    "Time",
    "Symbol",
    "Side",
    "OID",
    "Amount",
    "Price",
    "Cost",
    "Fee",
    "Closed PnL",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MarginUsage {
    /// 0.0..=1.0, for gauges.
    pub ratio: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceCards {
    pub total: String,
    pub free: String,
    pub used: String,
    /// Absent when the total is not positive.
    pub usage: Option<MarginUsage>,
}

impl BalanceCards {
    pub fn build(balance: &BalanceSnapshot) -> Self {
        let usage = balance.margin_usage_pct().map(|pct| MarginUsage {
            ratio: (pct / Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
            label: format!("Margin Usage: {}", format_usage(pct)),
        });

        Self {
            total: format_currency(balance.total),
            free: format_currency(balance.free),
            used: format_currency(balance.used),
            usage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSummaryView {
    pub count: String,
    pub total_unrealized_pnl: String,
    pub total_notional: String,
    pub profitable: bool,
}

impl PositionSummaryView {
    pub fn build(summary: &PositionSummary) -> Self {
        Self {
            count: summary.count.to_string(),
            total_unrealized_pnl: format_currency(summary.total_unrealized_pnl),
            total_notional: format_currency(summary.total_notional),
            profitable: summary.total_unrealized_pnl >= Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    pub cells: [String; 8],
    pub profitable: bool,
}

impl PositionRow {
    pub fn build(position: &PositionRecord) -> Self {
        Self {
            cells: [
                position.symbol.clone(),
                position.side.to_string(),
                format_size(position.size),
                format_currency(position.entry_price),
                format_currency(position.mark_price),
                format_currency(position.notional),
                format_currency(position.unrealized_pnl),
                format_percent(position.pnl_percentage),
            ],
            profitable: position.is_profitable(),
        }
    }
}

/// Expanded per-position detail block.
pub fn position_detail_lines(position: &PositionRecord) -> Vec<String> {
    let marker = if position.is_profitable() { "+" } else { "-" };
    vec![
        format!("{} ({})", position.symbol, position.side),
        format!("  Size: {} contracts", format_size(position.size)),
        format!(
            "  Entry: {} | Mark: {}",
            format_currency(position.entry_price),
            format_currency(position.mark_price)
        ),
        format!("  Notional: {}", format_currency(position.notional)),
        format!(
            "  [{}] PnL: {} ({})",
            marker,
            format_currency(position.unrealized_pnl),
            format_percent(position.pnl_percentage)
        ),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub cells: [String; 9],
    pub side_is_buy: bool,
}

impl TradeRow {
    pub fn build(trade: &TradeRecord) -> Self {
        let time = if trade.timestamp_estimated {
            format!("~{}", format_timestamp(&trade.timestamp))
        } else {
            format_timestamp(&trade.timestamp)
        };

        Self {
            cells: [
                time,
                trade.symbol.clone(),
                trade.side.to_string(),
                trade.order_id.to_string(),
                format_amount(trade.amount),
                format_currency(trade.price),
                format_currency(trade.cost),
                format_currency_precise(trade.fee),
                format_currency(trade.closed_pnl),
            ],
            side_is_buy: trade.side == crate::domain::TradeSide::Buy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsView {
    pub total_closed_pnl: String,
    pub total_fees: String,
    pub net_pnl: String,
    pub net_profitable: bool,
}

impl StatisticsView {
    pub fn build(stats: &TradeStatistics) -> Self {
        Self {
            total_closed_pnl: format_currency(stats.total_closed_pnl),
            total_fees: format_currency_precise(stats.total_fees),
            net_pnl: format_currency(stats.net_pnl),
            net_profitable: stats.net_pnl >= Decimal::ZERO,
        }
    }
}
