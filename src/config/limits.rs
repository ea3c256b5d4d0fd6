//! Rate limiter definitions.
//!
//! Each named resource gets a fixed-window threshold. Definitions are
//! immutable once loaded and looked up by name; an unknown name is a
//! configuration error at admission time, never a silent default.

use serde::Deserialize;
use std::collections::HashMap;

use super::error::ValidationError;

/// A named rate limiter definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ResourceLimit {
    /// Maximum admitted requests per identity per window.
    pub threshold: u32,

    /// Window duration in seconds.
    pub window_secs: u32,
}

/// Registry of rate limiter definitions, keyed by resource name.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-resource limits.
    #[serde(default = "default_resources")]
    pub resources: HashMap<String, ResourceLimit>,
}

impl LimitsConfig {
    /// Looks up the definition for a resource name.
    pub fn limit_for(&self, resource: &str) -> Option<ResourceLimit> {
        self.resources.get(resource).copied()
    }

    /// Resource names in the registry, for metrics enumeration.
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Validate limit definitions
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, limit) in &self.resources {
            if limit.threshold == 0 || limit.window_secs == 0 {
                return Err(ValidationError::InvalidResourceLimit(name.clone()));
            }
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            resources: default_resources(),
        }
    }
}

fn default_resources() -> HashMap<String, ResourceLimit> {
    HashMap::from([
        (
            // User-triggered directory synchronization.
            "syncuser".to_string(),
            ResourceLimit {
                threshold: 10,
                window_secs: 3600,
            },
        ),
        (
            "serialissue".to_string(),
            ResourceLimit {
                threshold: 30,
                window_secs: 60,
            },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_contains_syncuser() {
        let config = LimitsConfig::default();
        let limit = config.limit_for("syncuser").unwrap();
        assert_eq!(limit.threshold, 10);
        assert_eq!(limit.window_secs, 3600);
    }

    #[test]
    fn unknown_resource_returns_none() {
        assert!(LimitsConfig::default().limit_for("nope").is_none());
    }

    #[test]
    fn zero_threshold_fails_validation() {
        let config = LimitsConfig {
            resources: HashMap::from([(
                "bad".to_string(),
                ResourceLimit {
                    threshold: 0,
                    window_secs: 60,
                },
            )]),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_window_fails_validation() {
        let config = LimitsConfig {
            resources: HashMap::from([(
                "bad".to_string(),
                ResourceLimit {
                    threshold: 5,
                    window_secs: 0,
                },
            )]),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(LimitsConfig::default().validate().is_ok());
    }
}
