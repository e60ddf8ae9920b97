use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One open perpetual position, normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub symbol: String,
    pub side: PositionSide,
    /// Signed contract count; negative for shorts on venues that report it that way.
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub notional: Decimal,
    pub unrealized_pnl: Decimal,
    pub pnl_percentage: Decimal,
}

impl PositionRecord {
    pub fn abs_size(&self) -> Decimal {
        self.size.abs()
    }

    pub fn is_profitable(&self) -> bool {
        self.unrealized_pnl >= Decimal::ZERO
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Parse the exchange side string, falling back to the sign of the size.
    pub fn resolve(raw: Option<&str>, signed_size: Decimal) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("long") | Some("buy") => Self::Long,
            Some("short") | Some("sell") => Self::Short,
            _ if signed_size < Decimal::ZERO => Self::Short,
            _ => Self::Long,
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_from_string_wins_over_sign() {
        assert_eq!(PositionSide::resolve(Some("short"), dec!(1)), PositionSide::Short);
        assert_eq!(PositionSide::resolve(Some("LONG"), dec!(-1)), PositionSide::Long);
    }

    #[test]
    fn test_side_falls_back_to_sign() {
        assert_eq!(PositionSide::resolve(None, dec!(-0.5)), PositionSide::Short);
        assert_eq!(PositionSide::resolve(Some("n/a"), dec!(2)), PositionSide::Long);
    }

    #[test]
    fn test_display_is_upper_case() {
        assert_eq!(PositionSide::Long.to_string(), "LONG");
        assert_eq!(PositionSide::Short.to_string(), "SHORT");
    }
}
