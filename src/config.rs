use ramses_entity::ReduceProcessing;
use serde::{Deserialize, Serialize};

/// Realises spec §6's configuration table as a serde-round-trippable
/// struct, so a host application can load it from whatever config format
/// it prefers and hand the gateway a parsed value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// If false, do not auto-create destination devices or promote a
    /// device's class by observation.
    pub enable_eavesdrop: bool,
    /// Drop traffic whose src/dst is not in `known_list`.
    pub enforce_known_list: bool,
    /// Do not emit periodic discovery `RQ`s.
    pub disable_discovery: bool,
    /// Reject any outbound send (read-only mode).
    pub disable_sending: bool,
    pub reduce_processing: ReduceProcessing,
    /// Device IDs (`TT:NNNNNN`), only consulted when `enforce_known_list`.
    pub known_list: Vec<String>,
    /// Promote soft role-validation failures to hard errors.
    pub strict_mode: bool,
    /// Promote info-level soft-fails to warn-level, mirroring the
    /// source's `DEV_MODE`.
    pub dev_mode: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            enable_eavesdrop: true,
            enforce_known_list: false,
            disable_discovery: false,
            disable_sending: false,
            reduce_processing: ReduceProcessing::Full,
            known_list: Vec::new(),
            strict_mode: false,
            dev_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_spec_table() {
        let cfg = GatewayConfig::default();
        assert!(cfg.enable_eavesdrop);
        assert!(!cfg.enforce_known_list);
        assert!(!cfg.disable_discovery);
        assert!(!cfg.disable_sending);
        assert_eq!(cfg.reduce_processing, ReduceProcessing::Full);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = GatewayConfig {
            enforce_known_list: true,
            known_list: vec!["01:145038".to_owned()],
            ..GatewayConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.known_list, cfg.known_list);
        assert!(back.enforce_known_list);
    }
}
