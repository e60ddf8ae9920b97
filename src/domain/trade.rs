use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sentinel shown when the exchange did not report an order id.
pub const ORDER_ID_NOT_AVAILABLE: &str = "N/A";

/// One fill from the account's trade history, normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: TradeSide,
    pub timestamp: DateTime<Local>,
    /// Set when the exchange sent no timestamp and fetch time was substituted.
    pub timestamp_estimated: bool,
    pub amount: Decimal,
    pub price: Decimal,
    pub cost: Decimal,
    pub fee: Decimal,
    pub closed_pnl: Decimal,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
    Unknown,
}

impl TradeSide {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("buy") | Some("b") => Self::Buy,
            Some("sell") | Some("a") | Some("s") => Self::Sell,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Unknown => write!(f, "N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderId {
    Known(String),
    NotAvailable,
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(id) => write!(f, "{}", id),
            Self::NotAvailable => write!(f, "{}", ORDER_ID_NOT_AVAILABLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_side_parse() {
        assert_eq!(TradeSide::parse(Some("buy")), TradeSide::Buy);
        assert_eq!(TradeSide::parse(Some("SELL")), TradeSide::Sell);
        assert_eq!(TradeSide::parse(Some("A")), TradeSide::Sell);
        assert_eq!(TradeSide::parse(None), TradeSide::Unknown);
    }

    #[test]
    fn test_order_id_sentinel() {
        assert_eq!(OrderId::NotAvailable.to_string(), "N/A");
        assert_eq!(OrderId::Known("9001".to_string()).to_string(), "9001");
    }
}
