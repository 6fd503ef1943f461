// Composition root: one bus, one registry, one action manager per session

use crate::action::{ActionManager, ActionStatistics, AgentTick};
use crate::config::BotManagerConfig;
use crate::event::{EventBus, EventKind, EventStatistics};
use crate::registry::{BotRegistry, RegistryStatistics};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatistics {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub registry: RegistryStatistics,
    pub events: EventStatistics,
    pub actions: ActionStatistics,
}

/// Owns the bot management components and wires them together.
pub struct BotSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: BotManagerConfig,
    bus: Arc<EventBus>,
    registry: Arc<BotRegistry>,
    actions: Arc<ActionManager>,
}

impl BotSession {
    /// Build bus, registry and action manager on the current tokio runtime.
    ///
    /// Bot removals are forwarded to the action manager so per-agent state
    /// does not outlive the bot.
    pub fn start(config: BotManagerConfig) -> Result<Self> {
        let id = Uuid::now_v7();
        let bus = Arc::new(EventBus::new(&config.events)?);
        let registry = Arc::new(BotRegistry::new(Arc::clone(&bus), &config.registry));
        let actions = Arc::new(ActionManager::new(Arc::clone(&registry)));

        if config.actions.register_defaults {
            actions.register_default_handlers();
        }
        bus.subscribe(EventKind::BotRemoved, actions.removal_handler());

        info!(session_id = %id, "Bot session started");

        Ok(Self {
            id,
            started_at: Utc::now(),
            config,
            bus,
            registry,
            actions,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &BotManagerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    pub fn actions(&self) -> &Arc<ActionManager> {
        &self.actions
    }

    /// Tick every agent with current or queued work
    pub fn tick_all(&self) -> Vec<(u32, AgentTick)> {
        self.actions.tick_all()
    }

    /// Remove every bot and drop their action state.
    ///
    /// `BotRegistry::clear_all` publishes no removal events, so the action
    /// manager is pruned directly. Returns the number of bots removed.
    pub fn clear_bots(&self) -> usize {
        let removed = self.registry.clear_all();
        let forgotten = self.actions.prune_removed();
        info!(removed, forgotten, "Cleared all bots");
        removed
    }

    /// Drive `tick_all` every `tick_interval_ms` until `shutdown` resolves.
    ///
    /// Returns the number of ticks run.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> u64 {
        let period = Duration::from_millis(self.config.actions.tick_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(tick_interval_ms = period.as_millis() as u64, "Tick loop started");
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    let results = self.tick_all();
                    ticks += 1;
                    trace!(tick = ticks, agents = results.len(), "Tick");
                }
            }
        }
        info!(ticks, "Tick loop stopped");
        ticks
    }

    pub fn statistics(&self) -> SessionStatistics {
        SessionStatistics {
            session_id: self.id,
            started_at: self.started_at,
            registry: self.registry.statistics(),
            events: self.bus.statistics(),
            actions: self.actions.statistics(),
        }
    }

    /// Drain pending event deliveries and stop the bus workers.
    pub async fn shutdown(&self) {
        self.bus.shutdown().await;
        info!(session_id = %self.id, bots = self.registry.count(), "Bot session shut down");
    }
}
