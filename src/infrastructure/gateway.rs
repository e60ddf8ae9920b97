//! Exchange gateway seam and the unified raw payload shapes it returns.

use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("symbol not listed: {0}")]
    UnknownSymbol(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Errors that only concern the requested symbol, not the connection.
    pub fn is_symbol_error(&self) -> bool {
        matches!(self, Self::UnknownSymbol(_))
    }
}

/// Balance of one currency as reported by the exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCurrencyBalance {
    pub total: Option<Decimal>,
    pub free: Option<Decimal>,
    pub used: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBalance {
    pub currencies: HashMap<String, RawCurrencyBalance>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPosition {
    pub symbol: Option<String>,
    pub side: Option<String>,
    /// Signed contract count.
    pub contracts: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    pub mark_price: Option<Decimal>,
    pub notional: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub percentage: Option<Decimal>,
}

impl RawPosition {
    /// Missing sizes count as flat.
    pub fn is_flat(&self) -> bool {
        self.contracts.unwrap_or(Decimal::ZERO).is_zero()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTrade {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    /// Epoch milliseconds.
    pub timestamp: Option<i64>,
    /// `{ "cost": .., "currency": .. }` when present.
    pub fee: serde_json::Value,
    /// Exchange specific payload; carries `closedPnl` and `oid`.
    pub info: serde_json::Value,
}

impl Default for RawTrade {
    fn default() -> Self {
        Self {
            symbol: None,
            side: None,
            amount: None,
            price: None,
            cost: None,
            timestamp: None,
            fee: serde_json::Value::Null,
            info: serde_json::Value::Null,
        }
    }
}

/// Remote read primitives of the exchange. Implementations own authentication and
/// transport; callers never see anything but these three calls.
#[allow(async_fn_in_trait)]
pub trait ExchangeGateway {
    async fn fetch_balance(&self) -> Result<RawBalance, GatewayError>;

    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, GatewayError>;

    async fn fetch_my_trades(&self, symbol: &str, since_ms: i64) -> Result<Vec<RawTrade>, GatewayError>;
}

/// Parse a decimal that may arrive as a JSON string or number.
pub fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    use rust_decimal::prelude::FromPrimitive;
    use std::str::FromStr;

    match value {
        serde_json::Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .ok(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decimal_from_json() {
        assert_eq!(decimal_from_json(&json!("12.5")), Some(dec!(12.5)));
        assert_eq!(decimal_from_json(&json!(3)), Some(dec!(3)));
        assert_eq!(decimal_from_json(&json!(0.25)), Some(dec!(0.25)));
        assert_eq!(decimal_from_json(&json!("1e-3")), Some(dec!(0.001)));
        assert_eq!(decimal_from_json(&json!("abc")), None);
        assert_eq!(decimal_from_json(&json!(null)), None);
        assert_eq!(decimal_from_json(&json!({"cost": 1})), None);
    }

    #[test]
    fn test_flat_position() {
        let mut pos = RawPosition::default();
        assert!(pos.is_flat());
        pos.contracts = Some(dec!(0.0));
        assert!(pos.is_flat());
        pos.contracts = Some(dec!(-0.1));
        assert!(!pos.is_flat());
    }

    #[test]
    fn test_symbol_error_classification() {
        assert!(GatewayError::UnknownSymbol("DOGE/USDC:USDC".into()).is_symbol_error());
        assert!(!GatewayError::Malformed("bad".into()).is_symbol_error());
    }
}
