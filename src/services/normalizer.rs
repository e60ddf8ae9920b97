//! Raw exchange payloads -> canonical display rows. No I/O happens here.

use chrono::{DateTime, Local, TimeZone};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::{
    BalanceSnapshot, OrderId, PositionRecord, PositionSide, TradeRecord, TradeSide,
};
use crate::infrastructure::{decimal_from_json, RawBalance, RawPosition, RawTrade};

/// Placeholder symbol for records that came without one.
pub const UNKNOWN_SYMBOL: &str = "N/A";

/// Balance of the quote currency, `None` when the exchange did not report it.
pub fn normalize_balance(raw: &RawBalance, quote_currency: &str) -> Option<BalanceSnapshot> {
    let currency = raw.currencies.get(quote_currency)?;
    Some(BalanceSnapshot {
        total: currency.total.unwrap_or(Decimal::ZERO),
        free: currency.free.unwrap_or(Decimal::ZERO),
        used: currency.used.unwrap_or(Decimal::ZERO),
    })
}

/// Every numeric field defaults to zero when missing.
pub fn normalize_position(raw: &RawPosition) -> PositionRecord {
    let size = raw.contracts.unwrap_or(Decimal::ZERO);
    PositionRecord {
        symbol: raw.symbol.clone().unwrap_or_else(|| UNKNOWN_SYMBOL.to_string()),
        side: PositionSide::resolve(raw.side.as_deref(), size),
        size,
        entry_price: raw.entry_price.unwrap_or(Decimal::ZERO),
        mark_price: raw.mark_price.unwrap_or(Decimal::ZERO),
        notional: raw.notional.unwrap_or(Decimal::ZERO),
        unrealized_pnl: raw.unrealized_pnl.unwrap_or(Decimal::ZERO),
        pnl_percentage: raw.percentage.unwrap_or(Decimal::ZERO),
    }
}

/// Drop flat positions, normalize the rest in order.
pub fn normalize_open_positions(raw: &[RawPosition]) -> Vec<PositionRecord> {
    raw.iter()
        .filter(|position| !position.is_flat())
        .map(normalize_position)
        .collect()
}

/// `now` is used as the trade time when the exchange sent none (or zero).
pub fn normalize_trade(raw: &RawTrade, now: DateTime<Local>) -> TradeRecord {
    let (timestamp, timestamp_estimated) = match raw.timestamp.and_then(local_time_from_millis) {
        Some(time) => (time, false),
        None => (now, true),
    };

    TradeRecord {
        symbol: raw.symbol.clone().unwrap_or_else(|| UNKNOWN_SYMBOL.to_string()),
        side: TradeSide::parse(raw.side.as_deref()),
        timestamp,
        timestamp_estimated,
        amount: raw.amount.unwrap_or(Decimal::ZERO),
        price: raw.price.unwrap_or(Decimal::ZERO),
        cost: raw.cost.unwrap_or(Decimal::ZERO),
        fee: fee_cost(&raw.fee),
        closed_pnl: closed_pnl(&raw.info),
        order_id: order_id(&raw.info),
    }
}

pub fn normalize_trades(raw: &[RawTrade], now: DateTime<Local>) -> Vec<TradeRecord> {
    raw.iter().map(|trade| normalize_trade(trade, now)).collect()
}

fn local_time_from_millis(millis: i64) -> Option<DateTime<Local>> {
    if millis == 0 {
        return None;
    }
    Local.timestamp_millis_opt(millis).single()
}

fn fee_cost(fee: &Value) -> Decimal {
    fee.as_object()
        .and_then(|fee| fee.get("cost"))
        .and_then(decimal_from_json)
        .unwrap_or(Decimal::ZERO)
}

fn closed_pnl(info: &Value) -> Decimal {
    info.get("closedPnl")
        .and_then(decimal_from_json)
        .unwrap_or(Decimal::ZERO)
}

fn order_id(info: &Value) -> OrderId {
    match info.get("oid") {
        Some(Value::String(id)) if !id.is_empty() => OrderId::Known(id.clone()),
        Some(Value::Number(id)) => OrderId::Known(id.to_string()),
        _ => OrderId::NotAvailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::RawCurrencyBalance;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;

    fn now() -> DateTime<Local> {
        Local.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_balance_for_quote_currency() {
        let mut currencies = HashMap::new();
        currencies.insert(
            "USDC".to_string(),
            RawCurrencyBalance {
                total: Some(dec!(1000)),
                free: Some(dec!(600)),
                used: None,
            },
        );
        let raw = RawBalance { currencies };

        let balance = normalize_balance(&raw, "USDC").unwrap();
        assert_eq!(balance.total, dec!(1000));
        assert_eq!(balance.used, Decimal::ZERO);

        assert!(normalize_balance(&raw, "USDT").is_none());
    }

    #[test]
    fn test_position_defaults_to_zero() {
        let raw = RawPosition {
            symbol: Some("SOL/USDC:USDC".to_string()),
            contracts: Some(dec!(-3)),
            ..Default::default()
        };
        let position = normalize_position(&raw);
        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.size, dec!(-3));
        assert_eq!(position.abs_size(), dec!(3));
        assert_eq!(position.entry_price, Decimal::ZERO);
        assert_eq!(position.unrealized_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_zero_size_positions_are_dropped() {
        let raw = vec![
            RawPosition {
                symbol: Some("BTC/USDC:USDC".into()),
                contracts: Some(dec!(0.5)),
                ..Default::default()
            },
            RawPosition {
                symbol: Some("ETH/USDC:USDC".into()),
                contracts: Some(dec!(0.0)),
                ..Default::default()
            },
            RawPosition {
                symbol: Some("SOL/USDC:USDC".into()),
                contracts: Some(dec!(-10)),
                ..Default::default()
            },
        ];
        let open = normalize_open_positions(&raw);
        let symbols: Vec<_> = open.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC/USDC:USDC", "SOL/USDC:USDC"]);
    }

    #[test]
    fn test_trade_nested_fields() {
        let raw = RawTrade {
            symbol: Some("BTC/USDC:USDC".into()),
            side: Some("sell".into()),
            amount: Some(dec!(0.1)),
            price: Some(dec!(50000)),
            cost: Some(dec!(5000)),
            timestamp: Some(1_700_000_123_000),
            fee: json!({ "cost": "2.25", "currency": "USDC" }),
            info: json!({ "closedPnl": "-12.5", "oid": 123456 }),
        };
        let trade = normalize_trade(&raw, now());
        assert_eq!(trade.side, TradeSide::Sell);
        assert_eq!(trade.fee, dec!(2.25));
        assert_eq!(trade.closed_pnl, dec!(-12.5));
        assert_eq!(trade.order_id, OrderId::Known("123456".into()));
        assert_eq!(trade.timestamp.timestamp_millis(), 1_700_000_123_000);
        assert!(!trade.timestamp_estimated);
    }

    #[test]
    fn test_trade_missing_closed_pnl_is_zero() {
        let raw = RawTrade {
            info: json!({ "oid": null }),
            ..Default::default()
        };
        let trade = normalize_trade(&raw, now());
        assert_eq!(trade.closed_pnl, Decimal::ZERO);
        assert_eq!(trade.order_id, OrderId::NotAvailable);
        assert_eq!(trade.symbol, UNKNOWN_SYMBOL);
    }

    #[test]
    fn test_malformed_fee_is_zero() {
        let raw = RawTrade {
            fee: json!("0.5"),
            ..Default::default()
        };
        assert_eq!(normalize_trade(&raw, now()).fee, Decimal::ZERO);

        let raw = RawTrade {
            fee: json!({ "cost": "n/a" }),
            ..Default::default()
        };
        assert_eq!(normalize_trade(&raw, now()).fee, Decimal::ZERO);
    }

    #[test]
    fn test_missing_or_zero_timestamp_uses_now() {
        for timestamp in [None, Some(0)] {
            let raw = RawTrade {
                timestamp,
                ..Default::default()
            };
            let trade = normalize_trade(&raw, now());
            assert_eq!(trade.timestamp, now());
            assert!(trade.timestamp_estimated);
        }
    }
}
