//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - strata.toml (default configuration)
//! - strata.local.toml (git-ignored local overrides)
//! - Environment variables (STRATA_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # strata.toml
//! [evaluation]
//! strategy = "magic-sets"
//! safety = "augmenting"
//! divide_by_zero = "stop"
//!
//! [limits]
//! timeout_ms = 5000
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! STRATA_EVALUATION__STRATEGY=well-founded
//! STRATA_LIMITS__MAX_DERIVED_TUPLES=1000000
//! ```

use crate::safety::SafetyPolicy;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which evaluator answers queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationStrategy {
    /// Stratified, every rule re-evaluated each round
    Naive,
    /// Stratified, delta-driven rounds
    #[default]
    SemiNaive,
    /// Three-valued alternating fixpoint; accepts unstratifiable programs
    WellFounded,
    /// Magic-sets rewrite, then semi-naive
    MagicSets,
}

impl fmt::Display for EvaluationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvaluationStrategy::Naive => "naive",
            EvaluationStrategy::SemiNaive => "semi-naive",
            EvaluationStrategy::WellFounded => "well-founded",
            EvaluationStrategy::MagicSets => "magic-sets",
        })
    }
}

/// What a division by zero (or integer overflow) does to the derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DivideByZeroPolicy {
    /// The offending binding derives nothing
    #[default]
    Discard,
    /// Abort evaluation with an error
    Stop,
}

/// Whether programs are stratified before evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StratifierMode {
    #[default]
    Enabled,
    /// Only honoured by the well-founded strategy
    Disabled,
}

/// Evaluation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub strategy: EvaluationStrategy,

    #[serde(default)]
    pub safety: SafetyPolicy,

    #[serde(default)]
    pub divide_by_zero: DivideByZeroPolicy,

    #[serde(default)]
    pub stratifier: StratifierMode,

    /// Evaluate the rules of one round on the rayon pool
    #[serde(default)]
    pub parallel: bool,
}

/// Resource limits; 0 disables a limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Evaluation timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: u64,

    /// Maximum number of derived tuples
    #[serde(default)]
    pub max_derived_tuples: usize,

    /// Maximum fixpoint rounds per stratum
    #[serde(default)]
    pub max_iterations: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (STRATA_*)
    /// 2. strata.local.toml
    /// 3. strata.toml
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file("strata.toml"))
            .merge(Toml::file("strata.local.toml"))
            .merge(Env::prefixed("STRATA_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file, still honouring STRATA_* overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("STRATA_").split("__"))
            .extract()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::string(text))
            .extract()
    }

    /// Builder-style strategy override
    pub fn with_strategy(mut self, strategy: EvaluationStrategy) -> Self {
        self.evaluation.strategy = strategy;
        self
    }

    pub fn with_safety(mut self, safety: SafetyPolicy) -> Self {
        self.evaluation.safety = safety;
        self
    }

    pub fn with_divide_by_zero(mut self, policy: DivideByZeroPolicy) -> Self {
        self.evaluation.divide_by_zero = policy;
        self
    }

    pub fn with_stratifier(mut self, mode: StratifierMode) -> Self {
        self.evaluation.stratifier = mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.evaluation.parallel = parallel;
        self
    }
}
