//! Challenge evaluation — pass/fail/timeout rules over a simulated account.
//!
//! Models a funded-account ("prop firm") evaluation: hit the profit target
//! without breaching the daily-loss or max-drawdown limits, inside the time
//! limit. Rules are checked once per bar against equity including unrealized
//! P&L. A breach is an expected terminal outcome, not an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// What decides the outcome when the time limit is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Reaching the bar limit is its own terminal state.
    Strict,
    /// Final profit decides pass/fail at the boundary.
    DecideByProfit,
}

/// Why a challenge failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    MaxDrawdown,
    DailyLoss,
    /// Time limit reached short of the profit target (DecideByProfit mode).
    TimedOutShort,
}

/// Terminal-state machine status. Terminal states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum ChallengeStatus {
    Running,
    Passed,
    Failed(FailReason),
    TimedOut,
}

impl ChallengeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChallengeStatus::Running)
    }
}

/// Challenge rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeRules {
    /// Profit target as a fraction of starting capital (e.g. 0.10).
    pub profit_target: f64,
    /// Maximum same-day loss as a fraction of starting capital.
    pub max_daily_loss: f64,
    /// Maximum drawdown from the equity peak, as a fraction of starting capital.
    pub max_drawdown: f64,
    /// Evaluation window in bars.
    pub time_limit_bars: usize,
    /// Minimum closed trades before a pass can be awarded.
    pub min_trades: usize,
    pub timeout_policy: TimeoutPolicy,
}

impl ChallengeRules {
    /// The common 10%-target / 5%-daily / 10%-drawdown evaluation.
    pub fn standard(time_limit_bars: usize) -> Self {
        Self {
            profit_target: 0.10,
            max_daily_loss: 0.05,
            max_drawdown: 0.10,
            time_limit_bars,
            min_trades: 1,
            timeout_policy: TimeoutPolicy::DecideByProfit,
        }
    }
}

/// Terminal outcome of a challenge run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChallengeOutcome {
    pub status: ChallengeStatus,
    /// Bar at which the terminal state was reached.
    pub terminal_bar: usize,
    pub terminal_time: DateTime<Utc>,
    /// Profit over starting capital at the terminal bar.
    pub profit_fraction: f64,
}

/// Per-bar challenge rule tracker.
///
/// Feed it every bar's equity mark (including unrealized P&L) in order.
/// Once a terminal status is returned it never changes.
#[derive(Debug, Clone)]
pub struct ChallengeTracker {
    rules: ChallengeRules,
    starting_capital: f64,
    peak_equity: f64,
    day_anchor: Option<NaiveDate>,
    day_start_equity: f64,
    elapsed_bars: usize,
    status: ChallengeStatus,
}

impl ChallengeTracker {
    pub fn new(rules: ChallengeRules, starting_capital: f64) -> Self {
        assert!(starting_capital > 0.0, "starting_capital must be positive");
        Self {
            rules,
            starting_capital,
            peak_equity: starting_capital,
            day_anchor: None,
            day_start_equity: starting_capital,
            elapsed_bars: 0,
            status: ChallengeStatus::Running,
        }
    }

    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    pub fn elapsed_bars(&self) -> usize {
        self.elapsed_bars
    }

    /// Evaluate the rules after a bar's equity mark.
    ///
    /// Failure checks run before the pass check, so a bar that both breaches
    /// a limit and touches the target fails.
    pub fn on_bar(
        &mut self,
        timestamp: DateTime<Utc>,
        equity: f64,
        closed_trades: usize,
    ) -> ChallengeStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        let date = timestamp.date_naive();
        if self.day_anchor != Some(date) {
            self.day_anchor = Some(date);
            self.day_start_equity = equity;
        }

        self.elapsed_bars += 1;
        self.peak_equity = self.peak_equity.max(equity);

        let drawdown = (self.peak_equity - equity) / self.starting_capital;
        if drawdown > self.rules.max_drawdown {
            self.status = ChallengeStatus::Failed(FailReason::MaxDrawdown);
            return self.status;
        }

        let day_loss = (self.day_start_equity - equity) / self.starting_capital;
        if day_loss > self.rules.max_daily_loss {
            self.status = ChallengeStatus::Failed(FailReason::DailyLoss);
            return self.status;
        }

        let profit = (equity - self.starting_capital) / self.starting_capital;
        if profit >= self.rules.profit_target && closed_trades >= self.rules.min_trades {
            self.status = ChallengeStatus::Passed;
            return self.status;
        }

        if self.elapsed_bars >= self.rules.time_limit_bars {
            self.status = match self.rules.timeout_policy {
                TimeoutPolicy::Strict => ChallengeStatus::TimedOut,
                TimeoutPolicy::DecideByProfit => {
                    if profit >= self.rules.profit_target && closed_trades >= self.rules.min_trades
                    {
                        ChallengeStatus::Passed
                    } else {
                        ChallengeStatus::Failed(FailReason::TimedOutShort)
                    }
                }
            };
        }

        self.status
    }

    /// Profit fraction at the given equity level.
    pub fn profit_fraction(&self, equity: f64) -> f64 {
        (equity - self.starting_capital) / self.starting_capital
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn running_until_a_rule_fires() {
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(100), 10_000.0);
        for i in 0..10 {
            assert_eq!(tracker.on_bar(ts(i), 10_050.0, 0), ChallengeStatus::Running);
        }
    }

    #[test]
    fn fails_on_drawdown_at_first_breach() {
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(100), 10_000.0);
        tracker.on_bar(ts(0), 10_000.0, 0);
        // Peak 10_000; drop to 8_900 is an 11% drawdown of starting capital.
        let status = tracker.on_bar(ts(1), 8_900.0, 0);
        assert_eq!(status, ChallengeStatus::Failed(FailReason::MaxDrawdown));
        // Terminal is sticky even if equity recovers.
        assert_eq!(
            tracker.on_bar(ts(2), 11_000.0, 3),
            ChallengeStatus::Failed(FailReason::MaxDrawdown)
        );
    }

    #[test]
    fn drawdown_measured_from_peak() {
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(100), 10_000.0);
        tracker.on_bar(ts(0), 10_800.0, 0); // peak rises
        // 10_800 - 9_850 = 950 -> 9.5% of starting capital: still running.
        assert_eq!(tracker.on_bar(ts(1), 9_850.0, 0), ChallengeStatus::Running);
        // 10_800 - 9_790 = 1_010 -> 10.1%: failed.
        assert_eq!(
            tracker.on_bar(ts(2), 9_790.0, 0),
            ChallengeStatus::Failed(FailReason::MaxDrawdown)
        );
    }

    #[test]
    fn fails_on_daily_loss_within_one_day() {
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(100), 10_000.0);
        tracker.on_bar(ts(0), 10_000.0, 0);
        // Same calendar day: down 5.5% from the day's start.
        let status = tracker.on_bar(ts(5), 9_450.0, 0);
        assert_eq!(status, ChallengeStatus::Failed(FailReason::DailyLoss));
    }

    #[test]
    fn daily_window_resets_on_date_change() {
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(100), 10_000.0);
        tracker.on_bar(ts(0), 10_000.0, 0);
        tracker.on_bar(ts(5), 9_700.0, 0); // -3% same day: fine
        // Next calendar day anchors at 9_700; a further 3% drop stays inside
        // the daily limit (drawdown check still applies but 10_000 -> 9_400
        // is only 6%).
        let status = tracker.on_bar(ts(30), 9_400.0, 0);
        assert_eq!(status, ChallengeStatus::Running);
    }

    #[test]
    fn passes_on_target_with_min_trades() {
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(100), 10_000.0);
        tracker.on_bar(ts(0), 10_500.0, 1);
        assert_eq!(tracker.on_bar(ts(1), 11_000.0, 1), ChallengeStatus::Passed);
    }

    #[test]
    fn target_without_min_trades_keeps_running() {
        let mut rules = ChallengeRules::standard(100);
        rules.min_trades = 3;
        let mut tracker = ChallengeTracker::new(rules, 10_000.0);
        assert_eq!(tracker.on_bar(ts(0), 11_000.0, 2), ChallengeStatus::Running);
        assert_eq!(tracker.on_bar(ts(1), 11_000.0, 3), ChallengeStatus::Passed);
    }

    #[test]
    fn failure_checked_before_pass() {
        // A bar where the peak-relative drawdown breaches while equity still
        // sits above the target must fail, not pass.
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(100), 10_000.0);
        tracker.on_bar(ts(0), 12_500.0, 1); // peak 12_500
        let status = tracker.on_bar(ts(1), 11_400.0, 1); // dd 11% but profit 14%
        assert_eq!(status, ChallengeStatus::Failed(FailReason::MaxDrawdown));
    }

    #[test]
    fn strict_timeout() {
        let mut rules = ChallengeRules::standard(2);
        rules.timeout_policy = TimeoutPolicy::Strict;
        let mut tracker = ChallengeTracker::new(rules, 10_000.0);
        assert_eq!(tracker.on_bar(ts(0), 10_010.0, 0), ChallengeStatus::Running);
        assert_eq!(tracker.on_bar(ts(1), 10_020.0, 0), ChallengeStatus::TimedOut);
    }

    #[test]
    fn decide_by_profit_timeout_short_fails() {
        let mut tracker = ChallengeTracker::new(ChallengeRules::standard(2), 10_000.0);
        tracker.on_bar(ts(0), 10_010.0, 1);
        assert_eq!(
            tracker.on_bar(ts(1), 10_020.0, 1),
            ChallengeStatus::Failed(FailReason::TimedOutShort)
        );
    }

    #[test]
    fn status_serializes_with_reason() {
        let json = serde_json::to_string(&ChallengeStatus::Failed(FailReason::DailyLoss)).unwrap();
        assert!(json.contains("failed"));
        assert!(json.contains("daily_loss"));
    }
}
