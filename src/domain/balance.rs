use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quote-currency balance at fetch time.
///
/// `total ≈ free + used` is guaranteed by the exchange and not checked here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub total: Decimal,
    pub free: Decimal,
    pub used: Decimal,
}

impl BalanceSnapshot {
    /// Used margin as a percentage of the total, `None` when total is not positive.
    pub fn margin_usage_pct(&self) -> Option<Decimal> {
        if self.total <= Decimal::ZERO {
            return None;
        }
        self.used
            .checked_div(self.total)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    }
}
