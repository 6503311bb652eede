// config.rs — Policy service configuration.
//
// The whole surface is serde-deserializable so operators can keep one YAML
// document per deployment: base policy, overlays, dedupe window, approval
// TTL, confidence thresholds, and retention limits.
//
// Validation is strict and runs at engine construction: a service must not
// start against a configuration it cannot honor.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use brain_contracts::{PolicyDocument, PolicyOverlay};

/// Default auto-bind confidence threshold for disambiguation.
pub const DEFAULT_AUTO_BIND_THRESHOLD: f64 = 0.90;

/// Default clarify confidence threshold for disambiguation.
pub const DEFAULT_CLARIFY_THRESHOLD: f64 = 0.60;

fn default_dedupe_window() -> i64 {
    300
}

fn default_approval_ttl() -> i64 {
    3600
}

fn default_auto_bind() -> f64 {
    DEFAULT_AUTO_BIND_THRESHOLD
}

fn default_clarify() -> f64 {
    DEFAULT_CLARIFY_THRESHOLD
}

/// History trimming limits, applied after every decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Keep at most this many rows per table. `None` disables count trimming.
    #[serde(default)]
    pub max_rows: Option<usize>,

    /// Delete rows older than this many seconds. `None` disables age trimming.
    #[serde(default)]
    pub max_age_seconds: Option<i64>,
}

/// Complete configuration of one policy service instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyServiceConfig {
    /// Replay window in seconds. `0` disables dedupe denial (dedupe audit
    /// rows are still written).
    #[serde(default = "default_dedupe_window")]
    pub dedupe_window_seconds: i64,

    /// How long a created proposal stays resolvable.
    #[serde(default = "default_approval_ttl")]
    pub approval_ttl_seconds: i64,

    /// Disambiguation confidence at or above which a candidate resolves the
    /// proposal directly.
    #[serde(default = "default_auto_bind")]
    pub auto_bind_threshold: f64,

    /// Disambiguation confidence at or above which the engine asks the
    /// human to clarify instead of rejecting outright.
    #[serde(default = "default_clarify")]
    pub clarify_threshold: f64,

    /// Retention limits for decision/dedupe/proposal history.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// The base policy document overlays are applied to.
    pub base_document: PolicyDocument,

    /// Overlays, applied sorted by name ascending.
    #[serde(default)]
    pub overlays: Vec<PolicyOverlay>,
}

impl Default for PolicyServiceConfig {
    fn default() -> Self {
        Self {
            dedupe_window_seconds: default_dedupe_window(),
            approval_ttl_seconds: default_approval_ttl(),
            auto_bind_threshold: default_auto_bind(),
            clarify_threshold: default_clarify(),
            retention: RetentionConfig::default(),
            base_document: PolicyDocument {
                policy_id: "brain-default".to_string(),
                policy_version: "0".to_string(),
                rules: Default::default(),
            },
            overlays: Vec::new(),
        }
    }
}

impl PolicyServiceConfig {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&data)
    }

    /// Check invariants the engine depends on. Fatal at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dedupe_window_seconds < 0 {
            return Err(ConfigError::InvalidWindow {
                value: self.dedupe_window_seconds,
            });
        }
        if self.approval_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidTtl {
                value: self.approval_ttl_seconds,
            });
        }
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.auto_bind_threshold)
            || !in_unit(self.clarify_threshold)
            || self.clarify_threshold > self.auto_bind_threshold
        {
            return Err(ConfigError::InvalidThresholds {
                auto_bind: self.auto_bind_threshold,
                clarify: self.clarify_threshold,
            });
        }
        Ok(())
    }
}

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("dedupe window must be >= 0 seconds, got {value}")]
    InvalidWindow { value: i64 },

    #[error("approval TTL must be > 0 seconds, got {value}")]
    InvalidTtl { value: i64 },

    #[error(
        "confidence thresholds must satisfy 0 <= clarify <= auto_bind <= 1, \
         got clarify={clarify} auto_bind={auto_bind}"
    )]
    InvalidThresholds { auto_bind: f64, clarify: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PolicyServiceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.dedupe_window_seconds, 300);
        assert_eq!(config.approval_ttl_seconds, 3600);
        assert!((config.auto_bind_threshold - 0.90).abs() < f64::EPSILON);
        assert!((config.clarify_threshold - 0.60).abs() < f64::EPSILON);
    }

    #[test]
    fn yaml_round_trip_with_defaults() {
        let yaml = r#"
base_document:
  policy_id: "brain-default"
  policy_version: "7"
  rules:
    "*":
      enabled: true
    "capability:messaging/send-message":
      require_approval: true
      autonomy_ceiling: 1
overlays:
  - name: "001-weekend"
    rules:
      "capability:messaging/send-message":
        enabled: false
"#;
        let config = PolicyServiceConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.base_document.policy_version, "7");
        assert_eq!(config.overlays.len(), 1);
        assert_eq!(config.dedupe_window_seconds, 300);
        let rule = &config.base_document.rules["capability:messaging/send-message"];
        assert_eq!(rule.require_approval, Some(true));
        assert_eq!(rule.autonomy_ceiling, Some(1));
    }

    #[test]
    fn from_yaml_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(
            &path,
            "base_document:\n  policy_id: p\n  policy_version: '1'\n",
        )
        .unwrap();

        let config = PolicyServiceConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.base_document.policy_id, "p");
    }

    #[test]
    fn negative_window_is_rejected() {
        let config = PolicyServiceConfig {
            dedupe_window_seconds: -1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = PolicyServiceConfig {
            approval_ttl_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTtl { .. })));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let config = PolicyServiceConfig {
            auto_bind_threshold: 0.5,
            clarify_threshold: 0.8,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn out_of_unit_threshold_is_rejected() {
        let config = PolicyServiceConfig {
            auto_bind_threshold: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }
}
