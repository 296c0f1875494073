//! Bus Configuration

use serde::{Deserialize, Serialize};

/// Tuning for a [`SignalBus`](super::SignalBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusConfig {
    /// Nesting depth past which a broadcast chain is logged as suspicious.
    /// Chains are never cut off.
    pub chain_warning_depth: usize,

    /// Run the settle pass after an outermost broadcast even when its origin
    /// has no dependents.
    pub settle_unrouted: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            chain_warning_depth: 16,
            settle_unrouted: true,
        }
    }
}

impl BusConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = BusConfig::from_json(r#"{"chainWarningDepth": 4}"#).unwrap();
        assert_eq!(config.chain_warning_depth, 4);
        assert!(config.settle_unrouted);
    }
}
