//! Configuration-driven feature flags.
//!
//! Flags live in the `[features]` table (or `APP_FEATURES__<NAME>`) and
//! follow configuration reloads: every lookup reads the current snapshot.

use std::collections::BTreeMap;

use crate::config::SharedConfig;

#[derive(Clone)]
pub struct FeatureFlags {
    config: SharedConfig,
}

impl FeatureFlags {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    /// Case-insensitive lookup; unknown flags are off.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.config
            .load()
            .features
            .iter()
            .find(|(flag, _)| flag.eq_ignore_ascii_case(name))
            .map(|(_, enabled)| *enabled)
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.config.load().features.clone()
    }
}
