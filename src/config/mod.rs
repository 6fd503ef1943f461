pub mod env;

use crate::event::DeliveryMode;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Complete botmanager configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotManagerConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Maximum number of live bots
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// How lifecycle events are published
    #[serde(default)]
    pub delivery: DeliveryMode,
}

fn default_capacity() -> usize {
    1000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            delivery: DeliveryMode::default(),
        }
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Size of the delivery worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Pending delivery queue size; 0 means unbounded
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Action manager configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsConfig {
    /// Period of the driving tick loop (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Register built-in move/attack/cast/loot handlers at startup
    #[serde(default = "default_register_defaults")]
    pub register_defaults: bool,
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_register_defaults() -> bool {
    true
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            register_defaults: default_register_defaults(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<BotManagerConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: BotManagerConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BotManagerConfig::default();
        assert_eq!(config.registry.capacity, 1000);
        assert_eq!(config.registry.delivery, DeliveryMode::Async);
        assert_eq!(config.events.workers, 4);
        assert_eq!(config.events.queue_capacity, 1024);
        assert_eq!(config.actions.tick_interval_ms, 100);
        assert!(config.actions.register_defaults);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [registry]
            capacity = 50
            delivery = "sync"

            [events]
            workers = 2
            queue_capacity = 0

            [actions]
            tick_interval_ms = 250
            register_defaults = false
        "#;

        let config: BotManagerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.registry.capacity, 50);
        assert_eq!(config.registry.delivery, DeliveryMode::Sync);
        assert_eq!(config.events.workers, 2);
        assert_eq!(config.events.queue_capacity, 0);
        assert_eq!(config.actions.tick_interval_ms, 250);
        assert!(!config.actions.register_defaults);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections and keys use defaults
        let toml = r#"
            [registry]
            capacity = 3
        "#;

        let config: BotManagerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.registry.capacity, 3);
        assert_eq!(config.registry.delivery, DeliveryMode::Async);
        assert_eq!(config.events.workers, 4);
        assert_eq!(config.actions.tick_interval_ms, 100);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[events]\nworkers = 8").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.events.workers, 8);
        assert_eq!(config.registry.capacity, 1000);
    }

    #[test]
    fn test_load_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path().join("missing.toml")).is_err());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[registry]\ncapacity = \"lots\"").unwrap();
        let err = load_config(&bad).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
