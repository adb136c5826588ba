//! Serializable backtest configuration.
//!
//! A `RunConfig` captures everything needed to reproduce a run: the signal
//! stack, risk and level parameters, the execution cost model, and optional
//! challenge rules. Configs load from TOML, validate before anything is
//! built, and hash to a deterministic `RunId` for content-addressable runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use proplab_core::engine::challenge::{ChallengeRules, TimeoutPolicy};
use proplab_core::engine::costs::{CostModel, CostParams};
use proplab_core::engine::SimulatorConfig;
use proplab_core::signals::{
    CompositeSignal, EmaCrossover, LevelParams, MacdCross, RsiReversal, SignalGenerator,
};
use proplab_core::sizers::RiskSizer;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("initial_capital must be positive, got {0}")]
    NonPositiveCapital(f64),

    #[error("signal stack is empty")]
    EmptySignalStack,

    #[error("{name} must be in (0, 1), got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("challenge time_limit_bars must be positive")]
    ZeroTimeLimit,

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Serializable configuration for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub initial_capital: f64,
    pub strategy: StrategyConfig,

    /// Execution cost model; frictionless when omitted.
    #[serde(default)]
    pub execution: CostModelConfig,

    /// Challenge rules; a plain backtest when omitted.
    #[serde(default)]
    pub challenge: Option<ChallengeConfig>,
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId, which makes results
    /// content-addressable.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Range-check every parameter the builders assert on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }

        let s = &self.strategy;
        if s.signals.is_empty() {
            return Err(ConfigError::EmptySignalStack);
        }
        check_fraction("risk_fraction", s.risk_fraction)?;
        check_positive("max_position_fraction", s.max_position_fraction)?;
        check_positive("stop_volatility_mult", s.stop_volatility_mult)?;
        check_positive("target_volatility_mult", s.target_volatility_mult)?;
        check_positive("trail_volatility_mult", s.trail_volatility_mult)?;
        if s.trail_activation_mult < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "trail_activation_mult",
                value: s.trail_activation_mult,
            });
        }

        if let Some(c) = &self.challenge {
            check_fraction("profit_target", c.profit_target)?;
            check_fraction("max_daily_loss", c.max_daily_loss)?;
            check_fraction("max_drawdown", c.max_drawdown)?;
            if c.time_limit_bars == 0 {
                return Err(ConfigError::ZeroTimeLimit);
            }
        }

        Ok(())
    }

    /// Whether opposite-direction votes close positions.
    ///
    /// Explicit setting wins; otherwise on for plain runs, off for
    /// challenge runs (which hold to hard levels only).
    pub fn reversal_exit_enabled(&self) -> bool {
        self.strategy
            .allow_signal_reversal_exit
            .unwrap_or(self.challenge.is_none())
    }

    /// Build the composite signal stack.
    pub fn build_signal(&self) -> CompositeSignal {
        let s = &self.strategy;
        let levels = LevelParams::new(
            s.volatility_key.clone(),
            s.stop_volatility_mult,
            s.target_volatility_mult,
        );
        let members: Vec<Box<dyn SignalGenerator>> = s
            .signals
            .iter()
            .map(|config| config.build(levels.clone()))
            .collect();
        CompositeSignal::new(members)
    }

    pub fn build_sizer(&self) -> RiskSizer {
        RiskSizer::new(
            self.strategy.risk_fraction,
            self.strategy.max_position_fraction,
        )
    }

    pub fn build_cost_model(&self) -> CostModel {
        match &self.execution {
            CostModelConfig::None => CostModel::Frictionless,
            CostModelConfig::Realistic {
                spread_per_unit,
                commission_per_lot,
                slippage_per_unit,
                leverage,
                min_lot,
                lot_units,
                margin_usage_cap,
                stop_out_level,
                floor_to_min_lot,
            } => CostModel::Realistic(CostParams {
                spread_per_unit: *spread_per_unit,
                commission_per_lot: *commission_per_lot,
                slippage_per_unit: *slippage_per_unit,
                leverage: *leverage,
                min_lot: *min_lot,
                lot_units: *lot_units,
                margin_usage_cap: *margin_usage_cap,
                stop_out_level: *stop_out_level,
                floor_to_min_lot: *floor_to_min_lot,
            }),
        }
    }

    pub fn build_simulator_config(&self) -> SimulatorConfig {
        let s = &self.strategy;
        SimulatorConfig {
            initial_capital: self.initial_capital,
            volatility_key: s.volatility_key.clone(),
            trail_mult: s.trail_volatility_mult,
            trail_activation_mult: s.trail_activation_mult,
            allow_signal_reversal_exit: self.reversal_exit_enabled(),
            max_holding_bars: s.max_holding_bars,
            volatility_floor_fraction: s.volatility_floor_fraction,
        }
    }

    pub fn build_challenge_rules(&self) -> Option<ChallengeRules> {
        self.challenge.as_ref().map(|c| ChallengeRules {
            profit_target: c.profit_target,
            max_daily_loss: c.max_daily_loss,
            max_drawdown: c.max_drawdown,
            time_limit_bars: c.time_limit_bars,
            min_trades: c.min_trades,
            timeout_policy: c.timeout_policy,
        })
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value <= 0.0 || value >= 1.0 {
        return Err(ConfigError::FractionOutOfRange { name, value });
    }
    Ok(())
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { name, value });
    }
    Ok(())
}

/// Strategy parameters: signal stack, risk, stop/target/trailing levels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub signals: Vec<SignalConfig>,

    /// Indicator column holding the volatility unit.
    #[serde(default = "default_volatility_key")]
    pub volatility_key: String,

    /// Fraction of equity risked per trade.
    pub risk_fraction: f64,

    /// Hard notional cap as a fraction of equity.
    pub max_position_fraction: f64,

    #[serde(default = "default_stop_mult")]
    pub stop_volatility_mult: f64,

    #[serde(default = "default_target_mult")]
    pub target_volatility_mult: f64,

    #[serde(default = "default_trail_mult")]
    pub trail_volatility_mult: f64,

    #[serde(default = "default_trail_activation_mult")]
    pub trail_activation_mult: f64,

    /// Close on opposite votes. Defaults by run kind when omitted.
    #[serde(default)]
    pub allow_signal_reversal_exit: Option<bool>,

    /// Optional holding-period cap in bars.
    #[serde(default)]
    pub max_holding_bars: Option<usize>,

    /// Floor for broken volatility values, as a fraction of the close.
    #[serde(default = "default_volatility_floor")]
    pub volatility_floor_fraction: f64,
}

fn default_volatility_key() -> String {
    "atr".to_string()
}

fn default_stop_mult() -> f64 {
    1.5
}

fn default_target_mult() -> f64 {
    3.0
}

fn default_trail_mult() -> f64 {
    2.5
}

fn default_trail_activation_mult() -> f64 {
    1.0
}

fn default_volatility_floor() -> f64 {
    0.01
}

/// Signal generator configuration (serializable enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalConfig {
    /// Fast EMA crossing slow EMA, gated by a trend EMA.
    EmaCrossover {
        fast_period: usize,
        slow_period: usize,
        trend_period: usize,
    },

    /// RSI extreme snap-back, gated by a trend EMA.
    RsiReversal {
        rsi_period: usize,
        trend_period: usize,
        oversold: f64,
        oversold_recovery: f64,
        overbought: f64,
        overbought_recovery: f64,
    },

    /// MACD line crossing its signal line, gated by a trend EMA.
    MacdCross { trend_period: usize, warmup: usize },
}

impl SignalConfig {
    fn build(&self, levels: LevelParams) -> Box<dyn SignalGenerator> {
        match *self {
            SignalConfig::EmaCrossover {
                fast_period,
                slow_period,
                trend_period,
            } => Box::new(EmaCrossover::new(fast_period, slow_period, trend_period, levels)),
            SignalConfig::RsiReversal {
                rsi_period,
                trend_period,
                oversold,
                oversold_recovery,
                overbought,
                overbought_recovery,
            } => Box::new(RsiReversal::new(
                rsi_period,
                trend_period,
                oversold,
                oversold_recovery,
                overbought,
                overbought_recovery,
                levels,
            )),
            SignalConfig::MacdCross { trend_period, warmup } => {
                Box::new(MacdCross::new(trend_period, warmup, levels))
            }
        }
    }
}

/// Execution cost model configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostModelConfig {
    #[default]
    None,
    Realistic {
        spread_per_unit: f64,
        commission_per_lot: f64,
        slippage_per_unit: f64,
        leverage: f64,
        min_lot: f64,
        lot_units: f64,
        margin_usage_cap: f64,
        stop_out_level: f64,
        /// Bump sub-minimum sizes to the minimum lot instead of skipping.
        #[serde(default)]
        floor_to_min_lot: bool,
    },
}

/// Challenge rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeConfig {
    pub profit_target: f64,
    pub max_daily_loss: f64,
    pub max_drawdown: f64,
    pub time_limit_bars: usize,

    #[serde(default = "default_min_trades")]
    pub min_trades: usize,

    #[serde(default = "default_timeout_policy")]
    pub timeout_policy: TimeoutPolicy,
}

fn default_min_trades() -> usize {
    1
}

fn default_timeout_policy() -> TimeoutPolicy {
    TimeoutPolicy::DecideByProfit
}
