use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregates over the full (unfiltered) open position set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub count: usize,
    pub total_unrealized_pnl: Decimal,
    pub total_notional: Decimal,
}

/// Aggregates over the currently filtered trade set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub count: usize,
    pub total_closed_pnl: Decimal,
    pub total_fees: Decimal,
    pub net_pnl: Decimal,
}
