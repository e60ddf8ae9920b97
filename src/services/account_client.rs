//! Account Data Client
//!
//! Single point of contact with the exchange gateway. Every read degrades to an
//! empty/absent value plus a warning instead of returning an error: a monitoring
//! dashboard keeps rendering through exchange hiccups.

use chrono::{DateTime, Duration, Local, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, LookbackDays, DEFAULT_QUOTE_CURRENCY, DEFAULT_TRADE_SYMBOLS};
use crate::domain::{BalanceSnapshot, PositionRecord, TradeRecord};
use crate::infrastructure::{ExchangeGateway, GatewayError, HyperliquidGateway, RawTrade};
use crate::services::normalizer;

pub const BALANCE_WARNING: &str = "Unable to fetch account balance";

/// Result of one degrade-on-error read.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub value: T,
    /// Human readable message for the affected section.
    pub warning: Option<String>,
}

impl<T> FetchOutcome<T> {
    pub fn ok(value: T) -> Self {
        Self { value, warning: None }
    }

    pub fn degraded(value: T, warning: impl Into<String>) -> Self {
        Self {
            value,
            warning: Some(warning.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

enum ClientState<G> {
    Connected(G),
    /// Construction failed; permanent for the process lifetime.
    Unavailable { reason: String },
}

pub struct AccountDataClient<G> {
    state: ClientState<G>,
    quote_currency: String,
    trade_symbols: Vec<String>,
}

impl AccountDataClient<HyperliquidGateway> {
    /// Build the Hyperliquid connection. Failure yields a client in degraded mode
    /// rather than an error.
    pub fn initialize(credentials: &Credentials) -> Self {
        match HyperliquidGateway::connect(credentials) {
            Ok(gateway) => {
                info!(
                    network = %credentials.network,
                    base_url = gateway.base_url(),
                    "Exchange client initialized"
                );
                Self::from_gateway(gateway)
            }
            Err(e) => {
                error!("Error initializing client: {}", e);
                Self::unavailable(format!("Error initializing client: {}", e))
            }
        }
    }
}

impl<G: ExchangeGateway> AccountDataClient<G> {
    pub fn from_gateway(gateway: G) -> Self {
        Self {
            state: ClientState::Connected(gateway),
            quote_currency: DEFAULT_QUOTE_CURRENCY.to_string(),
            trade_symbols: DEFAULT_TRADE_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ClientState::Unavailable {
                reason: reason.into(),
            },
            quote_currency: DEFAULT_QUOTE_CURRENCY.to_string(),
            trade_symbols: DEFAULT_TRADE_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_quote_currency(mut self, quote_currency: impl Into<String>) -> Self {
        self.quote_currency = quote_currency.into();
        self
    }

    pub fn with_trade_symbols(mut self, symbols: Vec<String>) -> Self {
        self.trade_symbols = symbols;
        self
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ClientState::Connected(_))
    }

    /// Why the client is in degraded mode, if it is.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ClientState::Connected(_) => None,
            ClientState::Unavailable { reason } => Some(reason),
        }
    }

    pub fn trade_symbols(&self) -> &[String] {
        &self.trade_symbols
    }

    pub fn quote_currency(&self) -> &str {
        &self.quote_currency
    }

    fn gateway(&self) -> Option<&G> {
        match &self.state {
            ClientState::Connected(gateway) => Some(gateway),
            ClientState::Unavailable { .. } => None,
        }
    }

    /// Quote-currency balance; absent when unavailable or on any failure.
    pub async fn fetch_balance(&self) -> FetchOutcome<Option<BalanceSnapshot>> {
        let Some(gateway) = self.gateway() else {
            return FetchOutcome::degraded(None, BALANCE_WARNING);
        };

        match gateway.fetch_balance().await {
            Ok(raw) => match normalizer::normalize_balance(&raw, &self.quote_currency) {
                Some(balance) => {
                    debug!(total = %balance.total, used = %balance.used, "Fetched balance");
                    FetchOutcome::ok(Some(balance))
                }
                None => {
                    warn!(currency = %self.quote_currency, "Balance response has no quote currency");
                    FetchOutcome::degraded(None, BALANCE_WARNING)
                }
            },
            Err(e) => {
                warn!("Error fetching balance: {}", e);
                FetchOutcome::degraded(None, format!("Error fetching balance: {}", e))
            }
        }
    }

    /// Open positions with every zero-size entry removed.
    pub async fn fetch_open_positions(&self) -> FetchOutcome<Vec<PositionRecord>> {
        let Some(gateway) = self.gateway() else {
            return FetchOutcome::ok(Vec::new());
        };

        match gateway.fetch_positions().await {
            Ok(raw) => {
                let positions = normalizer::normalize_open_positions(&raw);
                debug!(
                    fetched = raw.len(),
                    open = positions.len(),
                    "Fetched positions"
                );
                FetchOutcome::ok(positions)
            }
            Err(e) => {
                warn!("Error fetching positions: {}", e);
                FetchOutcome::degraded(Vec::new(), format!("Error fetching positions: {}", e))
            }
        }
    }

    /// Trades of the configured candidate symbols over the last `days`, newest first.
    pub async fn fetch_trade_history(&self, days: LookbackDays) -> FetchOutcome<Vec<TradeRecord>> {
        self.fetch_trade_history_at(days, &self.trade_symbols, Utc::now()).await
    }

    /// Same as `fetch_trade_history` but for an explicit symbol list.
    pub async fn fetch_trade_history_for(
        &self,
        days: LookbackDays,
        symbols: &[String],
    ) -> FetchOutcome<Vec<TradeRecord>> {
        self.fetch_trade_history_at(days, symbols, Utc::now()).await
    }

    pub async fn fetch_trade_history_at(
        &self,
        days: LookbackDays,
        symbols: &[String],
        now: DateTime<Utc>,
    ) -> FetchOutcome<Vec<TradeRecord>> {
        let Some(gateway) = self.gateway() else {
            return FetchOutcome::ok(Vec::new());
        };

        let since = trade_history_cutoff(now, days);
        let mut all_trades: Vec<RawTrade> = Vec::new();
        let mut failures: Vec<(String, GatewayError)> = Vec::new();

        // One request per symbol; a symbol that is not listed or has no trades is skipped.
        for symbol in symbols {
            match gateway.fetch_my_trades(symbol, since).await {
                Ok(trades) => all_trades.extend(trades),
                Err(e) => {
                    debug!(symbol = %symbol, error = %e, "Skipping symbol");
                    failures.push((symbol.clone(), e));
                }
            }
        }

        if !symbols.is_empty() && failures.len() == symbols.len() {
            // Unlisted symbols are skips; report the first real failure.
            if let Some((symbol, e)) = failures.iter().find(|(_, e)| !e.is_symbol_error()) {
                warn!(symbol = %symbol, "Error fetching trade history: {}", e);
                return FetchOutcome::degraded(
                    Vec::new(),
                    format!("Error fetching trade history: {}", e),
                );
            }
        }

        sort_newest_first(&mut all_trades);
        let trades = normalizer::normalize_trades(&all_trades, now.with_timezone(&Local));
        info!(
            days = days.get(),
            symbols = symbols.len(),
            skipped = failures.len(),
            trades = trades.len(),
            "Fetched trade history"
        );

        FetchOutcome::ok(trades)
    }
}

/// Epoch milliseconds `days` before `now`.
pub fn trade_history_cutoff(now: DateTime<Utc>, days: LookbackDays) -> i64 {
    (now - Duration::days(days.get() as i64)).timestamp_millis()
}

/// Stable descending sort on timestamp; a missing timestamp sorts as the oldest.
pub fn sort_newest_first(trades: &mut [RawTrade]) {
    trades.sort_by(|a, b| b.timestamp.unwrap_or(0).cmp(&a.timestamp.unwrap_or(0)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(symbol: &str, timestamp: Option<i64>) -> RawTrade {
        RawTrade {
            symbol: Some(symbol.to_string()),
            timestamp,
            ..Default::default()
        }
    }

    #[test]
    fn test_cutoff() {
        let now = DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let days = LookbackDays::new(2).unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-03-08T12:00:00Z")
            .unwrap()
            .timestamp_millis();
        assert_eq!(trade_history_cutoff(now, days), expected);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let mut trades = vec![
            raw("A", Some(100)),
            raw("B", Some(300)),
            raw("C", Some(100)),
            raw("D", None),
            raw("E", Some(300)),
        ];
        sort_newest_first(&mut trades);
        let order: Vec<_> = trades.iter().map(|t| t.symbol.clone().unwrap()).collect();
        assert_eq!(order, vec!["B", "E", "A", "C", "D"]);
    }

    #[test]
    fn test_fetch_outcome_helpers() {
        let ok = FetchOutcome::ok(1);
        assert!(!ok.is_degraded());
        let degraded = FetchOutcome::degraded(0, "boom");
        assert_eq!(degraded.warning.as_deref(), Some("boom"));
    }
}
