/*!
 * Pipeline Configuration
 *
 * Runtime configuration for write targets, memory budgets and sampling.
 * Loadable from JSON or from `FAST_DUMP_*` environment variables.
 */

use super::errors::ConfigError;
use super::limits::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dump pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Persist dumps as files
    pub write_to_file: bool,
    /// Persist dumps to the trace channel
    pub write_to_trace: bool,
    /// Emit `<label>.<tag>` markers on failed requests
    pub inform_on_error: bool,
    /// Drop requests instead of blocking when staging memory is exhausted
    pub allow_data_loss: bool,
    /// Percentage of shared memory usable by tier 1
    pub max_percent_shared: u32,
    /// Percentage of local memory usable by tier 2
    pub max_percent_local: u32,
    /// Length of the accepting part of a sampling period
    pub sampling_active_ms: u64,
    /// Length of the rejecting part of a sampling period
    pub sampling_idle_ms: u64,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            write_to_file: DEFAULT_WRITE_TO_FILE,
            write_to_trace: DEFAULT_WRITE_TO_TRACE,
            inform_on_error: DEFAULT_INFORM_ON_ERROR,
            allow_data_loss: DEFAULT_ALLOW_DATA_LOSS,
            max_percent_shared: DEFAULT_MAX_PERCENT_SHARED as u32,
            max_percent_local: DEFAULT_MAX_PERCENT_LOCAL as u32,
            sampling_active_ms: 0,
            sampling_idle_ms: 0,
        }
    }
}

impl DumpConfig {
    /// Defaults overridden by whatever `FAST_DUMP_*` variables are set
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_WRITE_FILE) {
            config.write_to_file = parse_bool(ENV_WRITE_FILE, &v)?;
        }
        if let Some(v) = lookup(ENV_WRITE_TRACE) {
            config.write_to_trace = parse_bool(ENV_WRITE_TRACE, &v)?;
        }
        if let Some(v) = lookup(ENV_INFORM_ON_ERROR) {
            config.inform_on_error = parse_bool(ENV_INFORM_ON_ERROR, &v)?;
        }
        if let Some(v) = lookup(ENV_ALLOW_DATA_LOSS) {
            config.allow_data_loss = parse_bool(ENV_ALLOW_DATA_LOSS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_PERCENT_SHARED) {
            config.max_percent_shared = parse_num(ENV_MAX_PERCENT_SHARED, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_PERCENT_LOCAL) {
            config.max_percent_local = parse_num(ENV_MAX_PERCENT_LOCAL, &v)?;
        }
        if let Some(v) = lookup(ENV_SAMPLING_ACTIVE_MS) {
            config.sampling_active_ms = parse_num(ENV_SAMPLING_ACTIVE_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_SAMPLING_IDLE_MS) {
            config.sampling_idle_ms = parse_num(ENV_SAMPLING_IDLE_MS, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percent("max_percent_shared", self.max_percent_shared)?;
        check_percent("max_percent_local", self.max_percent_local)?;
        if !self.write_to_file && !self.write_to_trace {
            return Err(ConfigError::NoWriteTarget);
        }
        Ok(())
    }

    #[inline]
    pub fn sampling_active(&self) -> Duration {
        Duration::from_millis(self.sampling_active_ms)
    }

    #[inline]
    pub fn sampling_idle(&self) -> Duration {
        Duration::from_millis(self.sampling_idle_ms)
    }

    pub fn with_write_targets(mut self, file: bool, trace: bool) -> Self {
        self.write_to_file = file;
        self.write_to_trace = trace;
        self
    }

    pub fn with_inform_on_error(mut self, inform: bool) -> Self {
        self.inform_on_error = inform;
        self
    }

    pub fn with_allow_data_loss(mut self, allow: bool) -> Self {
        self.allow_data_loss = allow;
        self
    }

    pub fn with_tier_percents(mut self, shared: u32, local: u32) -> Self {
        self.max_percent_shared = shared;
        self.max_percent_local = local;
        self
    }

    pub fn with_sampling(mut self, active_ms: u64, idle_ms: u64) -> Self {
        self.sampling_active_ms = active_ms;
        self.sampling_idle_ms = idle_ms;
        self
    }
}

fn check_percent(key: &str, value: u32) -> Result<(), ConfigError> {
    if value > MAX_PERCENT as u32 {
        return Err(ConfigError::PercentOutOfRange {
            key: key.to_string(),
            value: value as u64,
        });
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DumpConfig::default();
        assert!(config.write_to_file);
        assert!(!config.write_to_trace);
        assert!(config.inform_on_error);
        assert!(config.allow_data_loss);
        assert_eq!(config.max_percent_shared, 75);
        assert_eq!(config.max_percent_local, 0);
        assert_eq!(config.sampling_active(), Duration::ZERO);
        assert_eq!(config.sampling_idle(), Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_WRITE_TRACE, "true"),
            (ENV_ALLOW_DATA_LOSS, "0"),
            (ENV_MAX_PERCENT_LOCAL, "20"),
            (ENV_SAMPLING_ACTIVE_MS, "100"),
            (ENV_SAMPLING_IDLE_MS, "50"),
        ]
        .into_iter()
        .collect();

        let config = DumpConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert!(config.write_to_file);
        assert!(config.write_to_trace);
        assert!(!config.allow_data_loss);
        assert_eq!(config.max_percent_local, 20);
        assert_eq!(config.sampling_active_ms, 100);
        assert_eq!(config.sampling_idle_ms, 50);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = DumpConfig::from_lookup(|k| (k == ENV_WRITE_FILE).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = DumpConfig::from_lookup(|k| {
            (k == ENV_MAX_PERCENT_SHARED).then(|| "101".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::PercentOutOfRange {
                key: "max_percent_shared".into(),
                value: 101
            }
        );
    }

    #[test]
    fn test_no_write_target() {
        let config = DumpConfig::default().with_write_targets(false, false);
        assert_eq!(config.validate(), Err(ConfigError::NoWriteTarget));
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            DumpConfig::from_json(r#"{"write_to_trace": true, "max_percent_shared": 50}"#).unwrap();
        assert!(config.write_to_file);
        assert!(config.write_to_trace);
        assert_eq!(config.max_percent_shared, 50);
        assert_eq!(config.max_percent_local, 0);

        assert!(matches!(
            DumpConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(ENV_INFORM_ON_ERROR, "off");
        let config = DumpConfig::from_env();
        std::env::remove_var(ENV_INFORM_ON_ERROR);

        assert!(!config.unwrap().inform_on_error);
    }
}
