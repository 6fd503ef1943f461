use super::BotManagerConfig;
use crate::event::DeliveryMode;
use std::str::FromStr;
use tracing::warn;

pub const CONFIG_PATH_VAR: &str = "BOTMANAGER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "botmanager.toml";

pub const CAPACITY_VAR: &str = "BOTMANAGER_CAPACITY";
pub const EVENT_WORKERS_VAR: &str = "BOTMANAGER_EVENT_WORKERS";
pub const DELIVERY_VAR: &str = "BOTMANAGER_DELIVERY";
pub const TICK_INTERVAL_VAR: &str = "BOTMANAGER_TICK_INTERVAL_MS";

/// Config file path from the environment, or the default
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

impl BotManagerConfig {
    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(n) = parsed::<usize>(&lookup, CAPACITY_VAR) {
            self.registry.capacity = n;
        }
        if let Some(n) = parsed::<usize>(&lookup, EVENT_WORKERS_VAR) {
            self.events.workers = n;
        }
        if let Some(mode) = parsed::<DeliveryMode>(&lookup, DELIVERY_VAR) {
            self.registry.delivery = mode;
        }
        if let Some(ms) = parsed::<u64>(&lookup, TICK_INTERVAL_VAR) {
            self.actions.tick_interval_ms = ms;
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = key, value = %raw, "Ignoring invalid environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = BotManagerConfig::default();
        config.apply_overrides(lookup(&[
            (CAPACITY_VAR, "25"),
            (EVENT_WORKERS_VAR, "1"),
            (DELIVERY_VAR, "sync"),
            (TICK_INTERVAL_VAR, "40"),
        ]));

        assert_eq!(config.registry.capacity, 25);
        assert_eq!(config.events.workers, 1);
        assert_eq!(config.registry.delivery, DeliveryMode::Sync);
        assert_eq!(config.actions.tick_interval_ms, 40);
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let mut config = BotManagerConfig::default();
        config.apply_overrides(lookup(&[(CAPACITY_VAR, "many"), (DELIVERY_VAR, "carrier-pigeon")]));

        assert_eq!(config.registry.capacity, 1000);
        assert_eq!(config.registry.delivery, DeliveryMode::Async);
    }

    #[test]
    fn test_no_overrides() {
        let mut config = BotManagerConfig::default();
        config.apply_overrides(|_| None);
        assert_eq!(config.events.workers, 4);
    }
}
