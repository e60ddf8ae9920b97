#![allow(dead_code)]

use perps_risk_dashboard::domain::TradeSide;
use perps_risk_dashboard::infrastructure::{
    ExchangeGateway, GatewayError, RawBalance, RawCurrencyBalance, RawPosition, RawTrade,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Balance,
    Positions,
    Trades { symbol: String, since: i64 },
}

#[derive(Debug, Default)]
pub struct MockState {
    pub balance: Option<RawBalance>,
    pub fail_balance: bool,
    pub positions: Vec<RawPosition>,
    pub fail_positions: bool,
    pub trades: HashMap<String, Vec<RawTrade>>,
    pub unknown_symbols: Vec<String>,
    pub failing_symbols: Vec<String>,
    pub calls: Vec<Call>,
}

/// In-memory exchange. Clones share state so tests can inspect calls after
/// handing the gateway to a client.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Balance).count()
    }

    pub fn trade_calls(&self) -> Vec<(String, i64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Trades { symbol, since } => Some((symbol, since)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

fn server_error() -> GatewayError {
    GatewayError::Http {
        status: 500,
        body: "internal error".to_string(),
    }
}

impl ExchangeGateway for MockGateway {
    async fn fetch_balance(&self) -> Result<RawBalance, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Balance);
        if state.fail_balance {
            return Err(server_error());
        }
        Ok(state.balance.clone().unwrap_or_default())
    }

    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Positions);
        if state.fail_positions {
            return Err(server_error());
        }
        Ok(state.positions.clone())
    }

    async fn fetch_my_trades(&self, symbol: &str, since_ms: i64) -> Result<Vec<RawTrade>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Trades {
            symbol: symbol.to_string(),
            since: since_ms,
        });
        if state.unknown_symbols.iter().any(|s| s == symbol) {
            return Err(GatewayError::UnknownSymbol(symbol.to_string()));
        }
        if state.failing_symbols.iter().any(|s| s == symbol) {
            return Err(server_error());
        }
        Ok(state.trades.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn usdc_balance(total: Decimal, free: Decimal, used: Decimal) -> RawBalance {
    let mut currencies = HashMap::new();
    currencies.insert(
        "USDC".to_string(),
        RawCurrencyBalance {
            total: Some(total),
            free: Some(free),
            used: Some(used),
        },
    );
    RawBalance { currencies }
}

pub fn position(symbol: &str, contracts: Decimal, unrealized_pnl: Decimal, notional: Decimal) -> RawPosition {
    RawPosition {
        symbol: Some(symbol.to_string()),
        side: None,
        contracts: Some(contracts),
        entry_price: Some(Decimal::ONE_HUNDRED),
        mark_price: Some(Decimal::ONE_HUNDRED),
        notional: Some(notional),
        unrealized_pnl: Some(unrealized_pnl),
        percentage: Some(Decimal::ZERO),
    }
}

pub fn fill(
    symbol: &str,
    side: TradeSide,
    timestamp: i64,
    fee: Decimal,
    closed_pnl: Option<&str>,
    oid: u64,
) -> RawTrade {
    let side = match side {
        TradeSide::Buy => "buy",
        TradeSide::Sell => "sell",
        TradeSide::Unknown => "",
    };
    let mut info = json!({ "oid": oid });
    if let Some(pnl) = closed_pnl {
        info["closedPnl"] = json!(pnl);
    }
    RawTrade {
        symbol: Some(symbol.to_string()),
        side: Some(side.to_string()),
        amount: Some(Decimal::ONE),
        price: Some(Decimal::ONE_HUNDRED),
        cost: Some(Decimal::ONE_HUNDRED),
        timestamp: Some(timestamp),
        fee: json!({ "cost": fee.to_string(), "currency": "USDC" }),
        info,
    }
}
