// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Runtime configuration for the governance core, loadable from YAML
//! (`vorion-governance.yaml`). Every field has a serde default so a partial
//! or missing file still yields a working configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::dependency::CascadePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Policy applied to dependency nodes registered without one.
    #[serde(default)]
    pub default_cascade_policy: CascadePolicy,

    /// Seconds between auto-resume sweep runs when driven by the built-in
    /// scheduler. The sweep itself is idempotent, so the interval is purely
    /// operational.
    #[serde(default = "default_sweep_interval_secs")]
    pub auto_resume_sweep_interval_secs: u64,

    /// Buffer size of the broadcast event bus.
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_event_bus_capacity() -> usize {
    1000
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            default_cascade_policy: CascadePolicy::default(),
            auto_resume_sweep_interval_secs: default_sweep_interval_secs(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl GovernanceConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("invalid governance configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dependency::SelfPauseAction;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = GovernanceConfig::from_yaml("{}").unwrap();
        assert_eq!(config.auto_resume_sweep_interval_secs, 60);
        assert_eq!(config.event_bus_capacity, 1000);
        assert_eq!(config.default_cascade_policy, CascadePolicy::default());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
auto_resume_sweep_interval_secs: 15
default_cascade_policy:
  on_self_pause: notify_only
  max_cascade_depth: 3
"#;
        let config = GovernanceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.auto_resume_sweep_interval_secs, 15);
        assert_eq!(
            config.default_cascade_policy.on_self_pause,
            SelfPauseAction::NotifyOnly
        );
        assert_eq!(config.default_cascade_policy.max_cascade_depth, 3);
        assert_eq!(config.event_bus_capacity, 1000);
    }
}
