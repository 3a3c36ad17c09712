//! Runtime configuration from environment variables
//!
//! The binary loads a `.env` file first (via `dotenv`), then reads:
//! - `ROUTEFLOW_BRANCH_ISOLATION` - `shared` (default) or `snapshot`
//! - `ROUTEFLOW_PARAM_ENCODING` - `percent` (default) or `legacy`
//! - `ROUTEFLOW_MAX_HOPS` - stage visits allowed per path
//! - `ROUTEFLOW_MAX_VISITS` - stage visits allowed per message across all paths
//! - `ROUTEFLOW_MAX_FAN_OUT_DEPTH` - nesting limit for snapshot fan-outs
//! - `ROUTEFLOW_DEFAULT_LANGUAGE` - predicate language for clauses naming none

use std::env;

use crate::error::FlowError;
use crate::flow::condition::SIMPLE_LANGUAGE;
use crate::flow::descriptor::ParameterEncoding;
use crate::flow::engine::{
    BranchIsolation, EngineOptions, DEFAULT_MAX_FAN_OUT_DEPTH, DEFAULT_MAX_HOPS,
    DEFAULT_MAX_VISITS,
};

pub const BRANCH_ISOLATION_VAR: &str = "ROUTEFLOW_BRANCH_ISOLATION";
pub const PARAM_ENCODING_VAR: &str = "ROUTEFLOW_PARAM_ENCODING";
pub const MAX_HOPS_VAR: &str = "ROUTEFLOW_MAX_HOPS";
pub const MAX_VISITS_VAR: &str = "ROUTEFLOW_MAX_VISITS";
pub const MAX_FAN_OUT_DEPTH_VAR: &str = "ROUTEFLOW_MAX_FAN_OUT_DEPTH";
pub const DEFAULT_LANGUAGE_VAR: &str = "ROUTEFLOW_DEFAULT_LANGUAGE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub isolation: BranchIsolation,
    pub encoding: ParameterEncoding,
    pub max_hops: usize,
    pub max_visits: usize,
    pub max_fan_out_depth: usize,
    pub default_language: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            isolation: BranchIsolation::default(),
            encoding: ParameterEncoding::default(),
            max_hops: DEFAULT_MAX_HOPS,
            max_visits: DEFAULT_MAX_VISITS,
            max_fan_out_depth: DEFAULT_MAX_FAN_OUT_DEPTH,
            default_language: SIMPLE_LANGUAGE.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Read the process environment; unset variables keep their defaults
    pub fn from_env() -> Result<Self, FlowError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(BRANCH_ISOLATION_VAR) {
            config.isolation = value.parse()?;
        }
        if let Some(value) = lookup(PARAM_ENCODING_VAR) {
            config.encoding = value.parse()?;
        }
        if let Some(value) = lookup(MAX_HOPS_VAR) {
            config.max_hops = positive(MAX_HOPS_VAR, &value)?;
        }
        if let Some(value) = lookup(MAX_VISITS_VAR) {
            config.max_visits = positive(MAX_VISITS_VAR, &value)?;
        }
        if let Some(value) = lookup(MAX_FAN_OUT_DEPTH_VAR) {
            config.max_fan_out_depth = positive(MAX_FAN_OUT_DEPTH_VAR, &value)?;
        }
        if let Some(value) = lookup(DEFAULT_LANGUAGE_VAR) {
            let value = value.trim();
            if !value.is_empty() {
                config.default_language = value.to_string();
            }
        }

        log::debug!("Runtime config: {:?}", config);
        Ok(config)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            isolation: self.isolation,
            max_hops: self.max_hops,
            max_visits: self.max_visits,
            max_fan_out_depth: self.max_fan_out_depth,
        }
    }
}

fn positive(name: &str, value: &str) -> Result<usize, FlowError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FlowError::config(format!(
            "{} must be a positive integer, got '{}'",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<RuntimeConfig, FlowError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.isolation, BranchIsolation::Shared);
        assert_eq!(config.encoding, ParameterEncoding::Percent);
        assert_eq!(config.max_hops, DEFAULT_MAX_HOPS);
        assert_eq!(config.default_language, "simple");
    }

    #[test]
    fn test_reads_all_variables() {
        let config = config(&[
            (BRANCH_ISOLATION_VAR, "snapshot"),
            (PARAM_ENCODING_VAR, "legacy"),
            (MAX_HOPS_VAR, "42"),
            (MAX_VISITS_VAR, "500"),
            (MAX_FAN_OUT_DEPTH_VAR, "4"),
            (DEFAULT_LANGUAGE_VAR, "jsonpath"),
        ])
        .unwrap();

        assert_eq!(config.isolation, BranchIsolation::Snapshot);
        assert_eq!(config.encoding, ParameterEncoding::Legacy);
        assert_eq!(config.default_language, "jsonpath");
        assert_eq!(
            config.engine_options(),
            EngineOptions {
                isolation: BranchIsolation::Snapshot,
                max_hops: 42,
                max_visits: 500,
                max_fan_out_depth: 4,
            }
        );
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(
            config(&[(MAX_HOPS_VAR, "0")]),
            Err(FlowError::Config(_))
        ));
        assert!(matches!(
            config(&[(MAX_HOPS_VAR, "many")]),
            Err(FlowError::Config(_))
        ));
        assert!(matches!(
            config(&[(MAX_VISITS_VAR, "-1")]),
            Err(FlowError::Config(_))
        ));
        assert!(matches!(
            config(&[(MAX_FAN_OUT_DEPTH_VAR, "0")]),
            Err(FlowError::Config(_))
        ));
        assert!(matches!(
            config(&[(BRANCH_ISOLATION_VAR, "threads")]),
            Err(FlowError::Config(_))
        ));
    }
}
