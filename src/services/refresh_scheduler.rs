use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::{DashboardConfig, LookbackDays};
use crate::domain::{BalanceSnapshot, PositionRecord, PositionSummary, TradeRecord, TradeStatistics};
use crate::infrastructure::ExchangeGateway;
use crate::services::account_client::{AccountDataClient, FetchOutcome};
use crate::services::pnl_calculator::PnlCalculator;
use crate::services::trade_filter::TradeFilter;

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Fixed-period timer. Every refresh is a full re-fetch.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    period: Duration,
    next_due: Instant,
}

impl RefreshScheduler {
    /// The first refresh is due immediately.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }

    pub fn mark_refreshed(&mut self, now: Instant) {
        self.next_due = now + self.period;
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_PERIOD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Timer,
    Manual,
}

/// How many consecutive failures a section tolerates before timer ticks stop
/// retrying it. `None` retries forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureTracker {
    consecutive: u32,
}

impl FailureTracker {
    pub fn record(&mut self, failed: bool) {
        if failed {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn is_suppressed(&self, policy: RetryPolicy) -> bool {
        policy
            .max_consecutive_failures
            .is_some_and(|max| self.consecutive >= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Balance,
    Positions,
    Trades,
}

impl Section {
    fn label(self) -> &'static str {
        match self {
            Self::Balance => "Balance",
            Self::Positions => "Positions",
            Self::Trades => "Trade history",
        }
    }
}

/// Data from one refresh cycle. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub balance: Option<BalanceSnapshot>,
    pub balance_warning: Option<String>,
    pub positions: Vec<PositionRecord>,
    pub positions_warning: Option<String>,
    pub trades: Vec<TradeRecord>,
    pub trades_warning: Option<String>,
}

/// Per-session render context: the client, user choices and the last fetched data.
pub struct DashboardSession<G> {
    client: AccountDataClient<G>,
    lookback: LookbackDays,
    include_position_symbols: bool,
    retry_policy: RetryPolicy,
    balance_failures: FailureTracker,
    position_failures: FailureTracker,
    trade_failures: FailureTracker,
    snapshot: DashboardSnapshot,
    pub filter: TradeFilter,
    pub show_position_details: bool,
    pub show_trade_statistics: bool,
    last_update: Option<DateTime<Local>>,
}

impl<G: ExchangeGateway> DashboardSession<G> {
    pub fn new(client: AccountDataClient<G>, lookback: LookbackDays) -> Self {
        Self {
            client,
            lookback,
            include_position_symbols: true,
            retry_policy: RetryPolicy::default(),
            balance_failures: FailureTracker::default(),
            position_failures: FailureTracker::default(),
            trade_failures: FailureTracker::default(),
            snapshot: DashboardSnapshot::default(),
            filter: TradeFilter::default(),
            show_position_details: false,
            show_trade_statistics: false,
            last_update: None,
        }
    }

    pub fn from_config(client: AccountDataClient<G>, config: &DashboardConfig) -> Self {
        let client = client
            .with_quote_currency(config.quote_currency.clone())
            .with_trade_symbols(config.trade_symbols.clone());
        Self::new(client, config.trade_history_days)
            .with_position_symbols(config.include_position_symbols)
            .with_retry_policy(RetryPolicy {
                max_consecutive_failures: config.max_consecutive_failures,
            })
    }

    pub fn with_position_symbols(mut self, include: bool) -> Self {
        self.include_position_symbols = include;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn client(&self) -> &AccountDataClient<G> {
        &self.client
    }

    pub fn snapshot(&self) -> &DashboardSnapshot {
        &self.snapshot
    }

    pub fn lookback(&self) -> LookbackDays {
        self.lookback
    }

    /// Returns true when the value changed; trades must then be re-fetched.
    pub fn set_lookback(&mut self, days: LookbackDays) -> bool {
        let changed = self.lookback != days;
        self.lookback = days;
        changed
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    /// Run the three fetches in sequence and replace the snapshot.
    pub async fn refresh(&mut self, trigger: RefreshTrigger) {
        if trigger == RefreshTrigger::Manual {
            self.balance_failures.reset();
            self.position_failures.reset();
            self.trade_failures.reset();
        }

        // An unavailable client never retries, so there is nothing to suppress.
        let tracked = self.client.is_available();

        let balance = if tracked && self.balance_failures.is_suppressed(self.retry_policy) {
            self.suppressed(Section::Balance, None)
        } else {
            let outcome = self.client.fetch_balance().await;
            if tracked {
                self.balance_failures.record(outcome.is_degraded());
            }
            outcome
        };

        let positions = if tracked && self.position_failures.is_suppressed(self.retry_policy) {
            self.suppressed(Section::Positions, Vec::new())
        } else {
            let outcome = self.client.fetch_open_positions().await;
            if tracked {
                self.position_failures.record(outcome.is_degraded());
            }
            outcome
        };

        let trades = if tracked && self.trade_failures.is_suppressed(self.retry_policy) {
            self.suppressed(Section::Trades, Vec::new())
        } else {
            let symbols = self.trade_symbols_for(&positions.value);
            let outcome = self.client.fetch_trade_history_for(self.lookback, &symbols).await;
            if tracked {
                self.trade_failures.record(outcome.is_degraded());
            }
            outcome
        };

        self.snapshot = DashboardSnapshot {
            balance: balance.value,
            balance_warning: balance.warning,
            positions: positions.value,
            positions_warning: positions.warning,
            trades: trades.value,
            trades_warning: trades.warning,
        };
        self.filter.retain_valid(&self.snapshot.trades);
        self.last_update = Some(Local::now());

        info!(
            ?trigger,
            positions = self.snapshot.positions.len(),
            trades = self.snapshot.trades.len(),
            "Dashboard refreshed"
        );
    }

    fn suppressed<T>(&self, section: Section, value: T) -> FetchOutcome<T> {
        let failures = match section {
            Section::Balance => self.balance_failures,
            Section::Positions => self.position_failures,
            Section::Trades => self.trade_failures,
        };
        warn!(
            section = section.label(),
            failures = failures.consecutive(),
            "Fetch suppressed by retry policy"
        );
        FetchOutcome::degraded(
            value,
            format!(
                "{} fetch suppressed after {} consecutive failures; press r to retry",
                section.label(),
                failures.consecutive()
            ),
        )
    }

    /// Configured candidates, then any open-position symbol not already listed.
    pub fn trade_symbols_for(&self, positions: &[PositionRecord]) -> Vec<String> {
        let mut symbols = self.client.trade_symbols().to_vec();
        if self.include_position_symbols {
            for position in positions {
                if !symbols.contains(&position.symbol) {
                    symbols.push(position.symbol.clone());
                }
            }
        }
        symbols
    }

    pub fn position_summary(&self) -> PositionSummary {
        PnlCalculator::summarize_positions(&self.snapshot.positions)
    }

    pub fn filtered_trades(&self) -> Vec<&TradeRecord> {
        self.filter.apply(&self.snapshot.trades)
    }

    /// Recomputed against the current filter on every call.
    pub fn trade_statistics(&self) -> TradeStatistics {
        PnlCalculator::summarize_trades(self.filtered_trades())
    }

    pub fn cycle_symbol_filter(&mut self) {
        self.filter.cycle_symbol(&self.snapshot.trades);
    }

    pub fn cycle_side_filter(&mut self) {
        self.filter.cycle_side();
    }

    pub fn toggle_position_details(&mut self) {
        self.show_position_details = !self.show_position_details;
    }

    pub fn toggle_trade_statistics(&mut self) {
        self.show_trade_statistics = !self.show_trade_statistics;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_due_and_reschedule() {
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(60));
        let start = scheduler.next_due();
        assert!(scheduler.is_due(start));

        scheduler.mark_refreshed(start);
        assert!(!scheduler.is_due(start + Duration::from_secs(59)));
        assert!(scheduler.is_due(start + Duration::from_secs(60)));
        assert_eq!(scheduler.time_until_due(start), Duration::from_secs(60));
    }

    #[test]
    fn test_default_period_is_one_minute() {
        assert_eq!(RefreshScheduler::default().period(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_failure_tracker() {
        let policy = RetryPolicy {
            max_consecutive_failures: Some(2),
        };
        let mut tracker = FailureTracker::default();
        tracker.record(true);
        assert!(!tracker.is_suppressed(policy));
        tracker.record(true);
        assert!(tracker.is_suppressed(policy));
        tracker.record(false);
        assert_eq!(tracker.consecutive(), 0);

        tracker.record(true);
        tracker.record(true);
        tracker.record(true);
        assert!(!tracker.is_suppressed(RetryPolicy::default()));
    }
}
