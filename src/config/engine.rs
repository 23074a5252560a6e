//! Engine configuration structures.

use serde::{Deserialize, Serialize};

/// Gateway backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayBackendConfig {
    /// In-memory gateway driven explicitly; for development and testing.
    Manual,
    /// Spawner-backed gateway executing async work handlers.
    Spawner,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of resources to register at build time.
    pub resources: u32,
    /// Bounded capacity of the audit event buffer.
    pub audit_capacity: usize,
    /// Gateway backend selection.
    pub gateway: GatewayBackendConfig,
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.resources == 0 {
            return Err("resources must be greater than 0".into());
        }
        if self.audit_capacity == 0 {
            return Err("audit_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: EngineConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
