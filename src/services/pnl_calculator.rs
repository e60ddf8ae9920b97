use crate::domain::{PositionRecord, PositionSummary, TradeRecord, TradeStatistics};
use rust_decimal::Decimal;
use tracing::error;

pub struct PnlCalculator;

impl PnlCalculator {
    /// Totals over the full open position set.
    pub fn summarize_positions(positions: &[PositionRecord]) -> PositionSummary {
        PositionSummary {
            count: positions.len(),
            total_unrealized_pnl: Self::checked_sum(
                "unrealized_pnl",
                positions.iter().map(|p| p.unrealized_pnl),
            ),
            total_notional: Self::checked_sum("notional", positions.iter().map(|p| p.notional)),
        }
    }

    /// Totals over whatever trade rows are currently shown.
    pub fn summarize_trades<'a, I>(trades: I) -> TradeStatistics
    where
        I: IntoIterator<Item = &'a TradeRecord>,
    {
        let trades: Vec<&TradeRecord> = trades.into_iter().collect();
        let total_closed_pnl = Self::checked_sum("closed_pnl", trades.iter().map(|t| t.closed_pnl));
        let total_fees = Self::checked_sum("fee", trades.iter().map(|t| t.fee));

        TradeStatistics {
            count: trades.len(),
            total_closed_pnl,
            total_fees,
            net_pnl: Self::calculate_net_pnl(total_closed_pnl, total_fees),
        }
    }

    /// Net PnL = closed PnL - fees
    pub fn calculate_net_pnl(total_closed_pnl: Decimal, total_fees: Decimal) -> Decimal {
        total_closed_pnl
            .checked_sub(total_fees)
            .unwrap_or_else(|| {
                error!("Net PnL overflow, showing closed PnL only");
                total_closed_pnl
            })
    }

    // Keeps the running total when an addition would overflow.
    fn checked_sum<I>(field: &str, values: I) -> Decimal
    where
        I: IntoIterator<Item = Decimal>,
    {
        values.into_iter().fold(Decimal::ZERO, |total, value| {
            total.checked_add(value).unwrap_or_else(|| {
                error!(field, "Overflow while summing, value skipped");
                total
            })
        })
    }
}
