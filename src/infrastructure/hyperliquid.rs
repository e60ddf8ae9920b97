use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::gateway::{
    decimal_from_json, ExchangeGateway, GatewayError, RawBalance, RawCurrencyBalance, RawPosition,
    RawTrade,
};
use crate::config::{Credentials, Network};

pub const MAINNET_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Settlement currency of every Hyperliquid perpetual.
const SETTLE_CURRENCY: &str = "USDC";

/// Read-only Hyperliquid client over the public `/info` endpoint.
pub struct HyperliquidGateway {
    http_client: reqwest::Client,
    base_url: String,
    wallet_address: String,
    /// Perp coins listed on the venue, loaded on first use.
    listed_coins: Arc<RwLock<Option<HashSet<String>>>>,
    fills: RwLock<FillsCache>,
}

/// Last `userFillsByTime` response keyed by its start time. Every symbol of one
/// refresh shares the cutoff, so the venue is queried once per refresh.
#[derive(Debug, Default)]
struct FillsCache {
    entry: Option<(i64, Arc<Value>)>,
}

impl FillsCache {
    fn get(&self, since_ms: i64) -> Option<Arc<Value>> {
        self.entry
            .as_ref()
            .filter(|(since, _)| *since == since_ms)
            .map(|(_, fills)| Arc::clone(fills))
    }

    fn store(&mut self, since_ms: i64, fills: Value) -> Arc<Value> {
        let fills = Arc::new(fills);
        self.entry = Some((since_ms, Arc::clone(&fills)));
        fills
    }
}

impl HyperliquidGateway {
    /// Validate credentials and build the HTTP client. No request is sent.
    pub fn connect(credentials: &Credentials) -> Result<Self, GatewayError> {
        validate_wallet_address(&credentials.wallet_address)?;
        validate_private_key(credentials.private_key.expose())?;

        let base_url = match credentials.network {
            Network::Mainnet => MAINNET_URL,
            Network::Testnet => TESTNET_URL,
        };

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("perps-risk-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(
            http_client,
            base_url.to_string(),
            credentials.wallet_address.to_lowercase(),
        ))
    }

    pub fn with_client(http_client: reqwest::Client, base_url: String, wallet_address: String) -> Self {
        Self {
            http_client,
            base_url,
            wallet_address,
            listed_coins: Arc::new(RwLock::new(None)),
            fills: RwLock::new(FillsCache::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_info(&self, body: Value) -> Result<Value, GatewayError> {
        let url = format!("{}/info", self.base_url);
        let response = self.http_client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn clearinghouse_state(&self) -> Result<Value, GatewayError> {
        self.post_info(json!({
            "type": "clearinghouseState",
            "user": self.wallet_address,
        }))
        .await
    }

    async fn fills_since(&self, since_ms: i64) -> Result<Arc<Value>, GatewayError> {
        if let Some(fills) = self.fills.read().await.get(since_ms) {
            return Ok(fills);
        }

        let fills = self
            .post_info(json!({
                "type": "userFillsByTime",
                "user": self.wallet_address,
                "startTime": since_ms,
            }))
            .await?;
        debug!(since_ms, "Loaded user fills");
        Ok(self.fills.write().await.store(since_ms, fills))
    }

    async fn ensure_listed(&self, coin: &str) -> Result<(), GatewayError> {
        {
            let cache = self.listed_coins.read().await;
            if let Some(coins) = cache.as_ref() {
                return if coins.contains(coin) {
                    Ok(())
                } else {
                    Err(GatewayError::UnknownSymbol(coin.to_string()))
                };
            }
        }

        let meta = self.post_info(json!({ "type": "meta" })).await?;
        let coins = parse_listed_coins(&meta)?;
        debug!("Loaded {} listed coins", coins.len());

        let listed = coins.contains(coin);
        *self.listed_coins.write().await = Some(coins);

        if listed {
            Ok(())
        } else {
            Err(GatewayError::UnknownSymbol(coin.to_string()))
        }
    }
}

impl ExchangeGateway for HyperliquidGateway {
    async fn fetch_balance(&self) -> Result<RawBalance, GatewayError> {
        let state = self.clearinghouse_state().await?;
        parse_balance(&state)
    }

    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, GatewayError> {
        let state = self.clearinghouse_state().await?;
        parse_positions(&state)
    }

    async fn fetch_my_trades(&self, symbol: &str, since_ms: i64) -> Result<Vec<RawTrade>, GatewayError> {
        let coin = coin_from_symbol(symbol)?;
        self.ensure_listed(&coin).await?;

        let fills = self.fills_since(since_ms).await?;
        let trades = parse_fills(&fills, &coin, since_ms)?;
        debug!(symbol, count = trades.len(), "Fetched fills");
        Ok(trades)
    }
}

fn validate_wallet_address(address: &str) -> Result<(), GatewayError> {
    let hex = address
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::InvalidCredentials("wallet address must start with 0x".into()))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GatewayError::InvalidCredentials(
            "wallet address must be 20 hex-encoded bytes".into(),
        ));
    }
    Ok(())
}

fn validate_private_key(key: &str) -> Result<(), GatewayError> {
    let hex = key.strip_prefix("0x").unwrap_or(key);
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GatewayError::InvalidCredentials(
            "private key must be 32 hex-encoded bytes".into(),
        ));
    }
    Ok(())
}

/// `BTC/USDC:USDC` -> `BTC`
pub fn coin_from_symbol(symbol: &str) -> Result<String, GatewayError> {
    let (base, rest) = symbol
        .split_once('/')
        .ok_or_else(|| GatewayError::UnknownSymbol(symbol.to_string()))?;
    let quote = rest.split(':').next().unwrap_or_default();
    if base.is_empty() || quote.is_empty() {
        return Err(GatewayError::UnknownSymbol(symbol.to_string()));
    }
    Ok(base.to_string())
}

/// `BTC` -> `BTC/USDC:USDC`
pub fn symbol_from_coin(coin: &str) -> String {
    format!("{}/{}:{}", coin, SETTLE_CURRENCY, SETTLE_CURRENCY)
}

fn field(value: &Value, key: &str) -> Option<Decimal> {
    value.get(key).and_then(decimal_from_json)
}

fn parse_balance(state: &Value) -> Result<RawBalance, GatewayError> {
    let summary = state
        .get("marginSummary")
        .ok_or_else(|| GatewayError::Malformed("missing marginSummary".into()))?;

    let mut currencies = HashMap::new();
    currencies.insert(
        SETTLE_CURRENCY.to_string(),
        RawCurrencyBalance {
            total: field(summary, "accountValue"),
            free: field(state, "withdrawable"),
            used: field(summary, "totalMarginUsed"),
        },
    );

    Ok(RawBalance { currencies })
}

fn parse_positions(state: &Value) -> Result<Vec<RawPosition>, GatewayError> {
    let entries = state
        .get("assetPositions")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::Malformed("missing assetPositions".into()))?;

    let positions = entries
        .iter()
        .filter_map(|entry| entry.get("position"))
        .map(|position| {
            let contracts = field(position, "szi");
            let notional = field(position, "positionValue");
            let side = contracts.map(|szi| {
                if szi < Decimal::ZERO {
                    "short".to_string()
                } else {
                    "long".to_string()
                }
            });
            let mark_price = match (notional, contracts) {
                (Some(value), Some(szi)) if !szi.is_zero() => value.checked_div(szi.abs()),
                _ => None,
            };

            RawPosition {
                symbol: position
                    .get("coin")
                    .and_then(Value::as_str)
                    .map(symbol_from_coin),
                side,
                contracts,
                entry_price: field(position, "entryPx"),
                mark_price,
                notional,
                unrealized_pnl: field(position, "unrealizedPnl"),
                percentage: field(position, "returnOnEquity")
                    .and_then(|roe| roe.checked_mul(Decimal::ONE_HUNDRED)),
            }
        })
        .collect();

    Ok(positions)
}

fn parse_fills(fills: &Value, coin: &str, since_ms: i64) -> Result<Vec<RawTrade>, GatewayError> {
    let fills = fills
        .as_array()
        .ok_or_else(|| GatewayError::Malformed("fills response is not an array".into()))?;

    let trades = fills
        .iter()
        .filter(|fill| fill.get("coin").and_then(Value::as_str) == Some(coin))
        .map(|fill| {
            let amount = field(fill, "sz");
            let price = field(fill, "px");
            let side = fill.get("side").and_then(Value::as_str).map(|s| match s {
                "B" => "buy".to_string(),
                "A" => "sell".to_string(),
                other => other.to_lowercase(),
            });
            let fee = match field(fill, "fee") {
                Some(cost) => json!({
                    "cost": cost.to_string(),
                    "currency": fill.get("feeToken").cloned().unwrap_or(Value::Null),
                }),
                None => Value::Null,
            };

            RawTrade {
                symbol: Some(symbol_from_coin(coin)),
                side,
                amount,
                price,
                cost: match (price, amount) {
                    (Some(p), Some(a)) => p.checked_mul(a),
                    _ => None,
                },
                timestamp: fill.get("time").and_then(Value::as_i64),
                fee,
                info: fill.clone(),
            }
        })
        .filter(|trade| trade.timestamp.map_or(true, |t| t >= since_ms))
        .collect();

    Ok(trades)
}

fn parse_listed_coins(meta: &Value) -> Result<HashSet<String>, GatewayError> {
    let universe = meta
        .get("universe")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::Malformed("missing universe".into()))?;

    Ok(universe
        .iter()
        .filter_map(|asset| asset.get("name").and_then(Value::as_str))
        .map(String::from)
        .collect())
}
