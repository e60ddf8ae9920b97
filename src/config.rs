//! Startup configuration
//!
//! Credentials and dashboard options come either from a TOML secrets file with a
//! `[risk_management]` table or, when that file/table is absent, from environment
//! variables (after `.env` has been loaded).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "secrets.toml";
pub const DEFAULT_TRADE_HISTORY_DAYS: u32 = 2;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_QUOTE_CURRENCY: &str = "USDC";

pub const DEFAULT_TRADE_SYMBOLS: [&str; 5] = [
    "BTC/USDC:USDC",
    "ETH/USDC:USDC",
    "SOL/USDC:USDC",
    "XRP/USDC:USDC",
    "AVAX/USDC:USDC",
];

pub const SETUP_INSTRUCTIONS: &str = "\
Configuration Error: wallet credentials are missing.

Provide them in one of the following ways:

  Secrets file (secrets.toml, or --config <path>):
      [risk_management]
      wallet_address = \"0x...\"
      private_key = \"0x...\"
      testnet = false
      trade_history_days = 2

  Environment variables (a .env file is also read):
      WALLET_ADDRESS=0x...
      PRIVATE_KEY=0x...
      TESTNET=false
      TRADE_HISTORY_DAYS=2
";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wallet address and private key are required")]
    MissingCredentials,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Exchange network selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn from_flag(testnet: bool) -> Self {
        if testnet {
            Self::Testnet
        } else {
            Self::Mainnet
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mainnet => write!(f, "MAINNET"),
            Self::Testnet => write!(f, "TESTNET"),
        }
    }
}

/// Private key wrapper that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey(***)")
    }
}

impl std::fmt::Display for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***")
    }
}

/// Immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub wallet_address: String,
    pub private_key: SecretKey,
    pub network: Network,
}

/// Trade history lookback, always within 1..=7 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LookbackDays(u32);

impl LookbackDays {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 7;

    pub fn new(days: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&days).then_some(Self(days))
    }

    pub fn clamped(days: i64) -> Self {
        Self(days.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn increment(self) -> Self {
        Self((self.0 + 1).min(Self::MAX))
    }

    pub fn decrement(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN))
    }
}

impl Default for LookbackDays {
    fn default() -> Self {
        Self(DEFAULT_TRADE_HISTORY_DAYS)
    }
}

impl std::fmt::Display for LookbackDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub credentials: Credentials,
    pub trade_history_days: LookbackDays,
    pub trade_symbols: Vec<String>,
    pub include_position_symbols: bool,
    pub quote_currency: String,
    pub refresh_interval: Duration,
    /// `None` keeps retrying on every tick.
    pub max_consecutive_failures: Option<u32>,
}

/// `[risk_management]` table as written in the secrets file.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(alias = "walletAddress")]
    wallet_address: Option<String>,
    #[serde(alias = "privateKey")]
    private_key: Option<String>,
    testnet: Option<bool>,
    #[serde(alias = "tradeHistoryDays")]
    trade_history_days: Option<i64>,
    #[serde(alias = "tradeSymbols")]
    trade_symbols: Option<Vec<String>>,
    #[serde(alias = "includePositionSymbols")]
    include_position_symbols: Option<bool>,
    #[serde(alias = "quoteCurrency")]
    quote_currency: Option<String>,
    #[serde(alias = "refreshIntervalSecs")]
    refresh_interval_secs: Option<u64>,
    #[serde(alias = "maxConsecutiveFailures")]
    max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    risk_management: Option<RawSettings>,
}

impl DashboardConfig {
    /// Load from the secrets file when it carries a `[risk_management]` table,
    /// otherwise from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("RISK_DASHBOARD_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            if let Some(settings) = Self::settings_from_toml(&contents, &path)? {
                info!("Loaded configuration from {}", path.display());
                return Self::from_settings(settings);
            }
        }

        info!("Loading configuration from environment");
        Self::from_settings(Self::settings_from_env(|key| std::env::var(key).ok())?)
    }

    /// Parse a secrets document; `Ok(None)` when it has no `[risk_management]` table.
    pub fn from_toml_str(contents: &str) -> Result<Option<Self>, ConfigError> {
        Self::settings_from_toml(contents, Path::new(DEFAULT_CONFIG_PATH))?
            .map(Self::from_settings)
            .transpose()
    }

    /// Build from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_settings(Self::settings_from_env(lookup)?)
    }

    fn settings_from_toml(contents: &str, path: &Path) -> Result<Option<RawSettings>, ConfigError> {
        let file: SecretsFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(file.risk_management)
    }

    fn settings_from_env<F>(lookup: F) -> Result<RawSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_bool = |key: &'static str| -> Option<bool> {
            lookup(key).map(|v| v.trim().eq_ignore_ascii_case("true"))
        };

        Ok(RawSettings {
            wallet_address: lookup("WALLET_ADDRESS"),
            private_key: lookup("PRIVATE_KEY"),
            testnet: parse_bool("TESTNET"),
            trade_history_days: parse_number(&lookup, "TRADE_HISTORY_DAYS")?,
            trade_symbols: lookup("TRADE_SYMBOLS").map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }),
            include_position_symbols: parse_bool("INCLUDE_POSITION_SYMBOLS"),
            quote_currency: lookup("QUOTE_CURRENCY"),
            refresh_interval_secs: parse_number(&lookup, "REFRESH_INTERVAL_SECS")?,
            max_consecutive_failures: parse_number(&lookup, "MAX_CONSECUTIVE_FAILURES")?,
        })
    }

    fn from_settings(settings: RawSettings) -> Result<Self, ConfigError> {
        let wallet_address = non_blank(settings.wallet_address);
        let private_key = non_blank(settings.private_key);
        let (wallet_address, private_key) = match (wallet_address, private_key) {
            (Some(wallet), Some(key)) => (wallet, key),
            _ => return Err(ConfigError::MissingCredentials),
        };

        let requested_days = settings
            .trade_history_days
            .unwrap_or(DEFAULT_TRADE_HISTORY_DAYS as i64);
        let trade_history_days = LookbackDays::clamped(requested_days);
        if trade_history_days.get() as i64 != requested_days {
            warn!(
                requested = requested_days,
                used = trade_history_days.get(),
                "trade_history_days outside 1..=7, clamped"
            );
        }

        let trade_symbols = match settings.trade_symbols {
            Some(symbols) if !symbols.is_empty() => symbols,
            _ => DEFAULT_TRADE_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        };

        let refresh_secs = settings
            .refresh_interval_secs
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "refresh_interval_secs",
                value: refresh_secs.to_string(),
            });
        }

        Ok(Self {
            credentials: Credentials {
                wallet_address,
                private_key: SecretKey::new(private_key),
                network: Network::from_flag(settings.testnet.unwrap_or(false)),
            },
            trade_history_days,
            trade_symbols,
            include_position_symbols: settings.include_position_symbols.unwrap_or(true),
            quote_currency: non_blank(settings.quote_currency)
                .unwrap_or_else(|| DEFAULT_QUOTE_CURRENCY.to_string()),
            refresh_interval: Duration::from_secs(refresh_secs),
            max_consecutive_failures: settings.max_consecutive_failures.filter(|n| *n > 0),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_defaults() {
        let config = DashboardConfig::from_lookup(env(&[
            ("WALLET_ADDRESS", "0xabc"),
            ("PRIVATE_KEY", "0xdef"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.network, Network::Mainnet);
        assert_eq!(config.trade_history_days.get(), 2);
        assert_eq!(config.trade_symbols.len(), 5);
        assert_eq!(config.quote_currency, "USDC");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.max_consecutive_failures, None);
        assert!(config.include_position_symbols);
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let err = DashboardConfig::from_lookup(env(&[("WALLET_ADDRESS", "0xabc")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));

        let err = DashboardConfig::from_lookup(env(&[
            ("WALLET_ADDRESS", "   "),
            ("PRIVATE_KEY", "0xdef"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn test_env_overrides() {
        let config = DashboardConfig::from_lookup(env(&[
            ("WALLET_ADDRESS", "0xabc"),
            ("PRIVATE_KEY", "0xdef"),
            ("TESTNET", "True"),
            ("TRADE_HISTORY_DAYS", "5"),
            ("TRADE_SYMBOLS", "BTC/USDC:USDC, HYPE/USDC:USDC"),
            ("MAX_CONSECUTIVE_FAILURES", "3"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.network, Network::Testnet);
        assert_eq!(config.trade_history_days.get(), 5);
        assert_eq!(config.trade_symbols, vec!["BTC/USDC:USDC", "HYPE/USDC:USDC"]);
        assert_eq!(config.max_consecutive_failures, Some(3));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = DashboardConfig::from_lookup(env(&[
            ("WALLET_ADDRESS", "0xabc"),
            ("PRIVATE_KEY", "0xdef"),
            ("TRADE_HISTORY_DAYS", "two"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "TRADE_HISTORY_DAYS", .. }));
    }

    #[test]
    fn test_lookback_is_clamped() {
        let config = DashboardConfig::from_lookup(env(&[
            ("WALLET_ADDRESS", "0xabc"),
            ("PRIVATE_KEY", "0xdef"),
            ("TRADE_HISTORY_DAYS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.trade_history_days.get(), 7);
    }

    #[test]
    fn test_toml_secrets_with_camel_case_keys() {
        let config = DashboardConfig::from_toml_str(
            r#"
            [risk_management]
            walletAddress = "0xabc"
            privateKey = "0xdef"
            testnet = true
            tradeHistoryDays = 3
            "#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(config.credentials.wallet_address, "0xabc");
        assert_eq!(config.credentials.network, Network::Testnet);
        assert_eq!(config.trade_history_days.get(), 3);
    }

    #[test]
    fn test_toml_without_section() {
        let config = DashboardConfig::from_toml_str("[other]\nkey = 1\n").unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_secret_key_is_redacted() {
        let key = SecretKey::new("0xdeadbeef");
        assert_eq!(format!("{:?}", key), "SecretKey(***)");
        assert_eq!(key.to_string(), "***");
        assert_eq!(key.expose(), "0xdeadbeef");
    }

    #[test]
    fn test_lookback_bounds() {
        assert!(LookbackDays::new(0).is_none());
        assert!(LookbackDays::new(8).is_none());
        let days = LookbackDays::new(7).unwrap();
        assert_eq!(days.increment().get(), 7);
        assert_eq!(LookbackDays::new(1).unwrap().decrement().get(), 1);
    }
}
