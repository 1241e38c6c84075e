use crate::world::{DeliveryZone, Position};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "CUBEFLEET_CONFIG";

/// Environment variable overriding `api.bind_addr`
pub const BIND_ADDR_ENV: &str = "CUBEFLEET_BIND_ADDR";

/// Complete coordinator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub delivery_zone: DeliveryZoneConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Delivery zone placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryZoneConfig {
    #[serde(default = "default_zone_x")]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Distance at which a carried cube may be deposited
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius: f64,
}

fn default_zone_x() -> f64 {
    30.0
}

fn default_arrival_radius() -> f64 {
    2.0
}

impl DeliveryZoneConfig {
    pub fn zone(&self) -> DeliveryZone {
        DeliveryZone {
            position: Position::new(self.x, self.y, self.z),
            arrival_radius: self.arrival_radius,
        }
    }
}

impl Default for DeliveryZoneConfig {
    fn default() -> Self {
        Self {
            x: default_zone_x(),
            y: 0.0,
            z: 0.0,
            arrival_radius: default_arrival_radius(),
        }
    }
}

/// Agent bookkeeping limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Upper bound on tracked agents; entries for new ids beyond it are rejected
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    /// Position deltas below this are treated as jitter
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f64,
    /// Reports closer than this (seconds, agent clock) to the last counted movement add no distance
    #[serde(default = "default_min_sample_interval")]
    pub min_sample_interval_secs: f64,
    /// Consecutive decision batches an agent may miss before its claims are released
    #[serde(default = "default_claim_expiry_snapshots")]
    pub claim_expiry_snapshots: u32,
}

fn default_max_agents() -> usize {
    64
}

fn default_movement_threshold() -> f64 {
    1.0
}

fn default_min_sample_interval() -> f64 {
    0.1
}

fn default_claim_expiry_snapshots() -> u32 {
    5
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            max_agents: default_max_agents(),
            movement_threshold: default_movement_threshold(),
            min_sample_interval_secs: default_min_sample_interval(),
            claim_expiry_snapshots: default_claim_expiry_snapshots(),
        }
    }
}

/// HTTP boundary settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Maximum accepted request body
    #[serde(default = "default_body_size_limit")]
    pub body_size_limit_bytes: usize,
    /// Allow any origin (the simulation client runs on another port)
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_body_size_limit() -> usize {
    1_048_576 // 1 MB
}

fn default_cors_permissive() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            body_size_limit_bytes: default_body_size_limit(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

impl CoordinatorConfig {
    /// Build from env vars: the file named by `CUBEFLEET_CONFIG` if set,
    /// defaults otherwise, then `CUBEFLEET_BIND_ADDR` on top.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            config.api.bind_addr = addr
                .parse()
                .with_context(|| format!("Failed to parse {}", BIND_ADDR_ENV))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agents.max_agents == 0 {
            anyhow::bail!("agents.max_agents must be at least 1");
        }
        if !(self.agents.movement_threshold >= 0.0) {
            anyhow::bail!("agents.movement_threshold must be non-negative");
        }
        if !(self.agents.min_sample_interval_secs >= 0.0) {
            anyhow::bail!("agents.min_sample_interval_secs must be non-negative");
        }
        if self.agents.claim_expiry_snapshots == 0 {
            anyhow::bail!("agents.claim_expiry_snapshots must be at least 1");
        }
        if !(self.delivery_zone.arrival_radius > 0.0) {
            anyhow::bail!("delivery_zone.arrival_radius must be positive");
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<CoordinatorConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: CoordinatorConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.delivery_zone.zone().position, Position::new(30.0, 0.0, 0.0));
        assert_eq!(config.delivery_zone.arrival_radius, 2.0);
        assert_eq!(config.agents.max_agents, 64);
        assert_eq!(config.agents.movement_threshold, 1.0);
        assert_eq!(config.agents.min_sample_interval_secs, 0.1);
        assert_eq!(config.agents.claim_expiry_snapshots, 5);
        assert_eq!(config.api.bind_addr.port(), 5000);
        assert!(config.api.cors_permissive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [delivery_zone]
            x = -10.0
            y = 0.5
            z = 4.0
            arrival_radius = 3.0

            [agents]
            max_agents = 8
            movement_threshold = 0.25
            min_sample_interval_secs = 0.5
            claim_expiry_snapshots = 12

            [api]
            bind_addr = "127.0.0.1:8080"
            body_size_limit_bytes = 2048
            cors_permissive = false
        "#;

        let config: CoordinatorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.delivery_zone.zone().position, Position::new(-10.0, 0.5, 4.0));
        assert_eq!(config.delivery_zone.arrival_radius, 3.0);
        assert_eq!(config.agents.max_agents, 8);
        assert_eq!(config.agents.movement_threshold, 0.25);
        assert_eq!(config.agents.min_sample_interval_secs, 0.5);
        assert_eq!(config.agents.claim_expiry_snapshots, 12);
        assert_eq!(config.api.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.api.body_size_limit_bytes, 2048);
        assert!(!config.api.cors_permissive);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections and fields use defaults
        let toml = r#"
            [agents]
            max_agents = 3
        "#;

        let config: CoordinatorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.agents.max_agents, 3);
        assert_eq!(config.agents.movement_threshold, 1.0);
        assert_eq!(config.agents.min_sample_interval_secs, 0.1);
        assert_eq!(config.delivery_zone.x, 30.0);
        assert_eq!(config.api.body_size_limit_bytes, 1_048_576);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[delivery_zone]\narrival_radius = 5.0").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.delivery_zone.arrival_radius, 5.0);
        assert_eq!(config.delivery_zone.x, 30.0);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("/nonexistent/cubefleet.toml").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = CoordinatorConfig::default();
        config.agents.max_agents = 0;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.delivery_zone.arrival_radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.agents.claim_expiry_snapshots = 0;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.agents.min_sample_interval_secs = -1.0;
        assert!(config.validate().is_err());
    }
}
