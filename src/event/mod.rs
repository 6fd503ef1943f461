use crate::context::{BotContext, BotType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

mod bus;

pub use bus::{EventBus, EventStatistics, KindStatistics};

/// Lifecycle event kinds published by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    BotCreated,
    BotRemoved,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::BotCreated, EventKind::BotRemoved];

    /// Stable wire tag, e.g. `BOT_CREATED`
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::BotCreated => "BOT_CREATED",
            EventKind::BotRemoved => "BOT_REMOVED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How a publisher hands events to the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Fire-and-forget through the worker pool
    #[default]
    Async,
    /// Run every handler on the caller's path before returning
    Sync,
}

impl std::str::FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" => Ok(DeliveryMode::Async),
            "sync" => Ok(DeliveryMode::Sync),
            other => Err(format!("unknown delivery mode: {}", other)),
        }
    }
}

/// Immutable lifecycle event.
///
/// Carries the originating context (shared, so a removed bot stays readable
/// by late handlers) and the capture time.
#[derive(Clone)]
pub struct BotEvent {
    kind: EventKind,
    source: Arc<BotContext>,
    timestamp: DateTime<Utc>,
}

impl BotEvent {
    pub fn new(kind: EventKind, source: Arc<BotContext>) -> Self {
        Self {
            kind,
            source,
            timestamp: Utc::now(),
        }
    }

    pub fn created(source: Arc<BotContext>) -> Self {
        Self::new(EventKind::BotCreated, source)
    }

    pub fn removed(source: Arc<BotContext>) -> Self {
        Self::new(EventKind::BotRemoved, source)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Tag string of the event kind
    pub fn event_type(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn source(&self) -> &Arc<BotContext> {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn bot_id(&self) -> u32 {
        self.source.id()
    }

    pub fn bot_type(&self) -> Option<BotType> {
        self.source.bot_type()
    }

    pub fn bot_name(&self) -> Option<String> {
        self.source.name()
    }
}

impl fmt::Debug for BotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotEvent")
            .field("kind", &self.kind)
            .field("bot_id", &self.bot_id())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Subscriber callback.
///
/// Errors and panics are contained by the bus; they never reach the
/// publisher or other handlers. Handlers should return quickly.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &BotEvent) -> anyhow::Result<()>;

    /// Label used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> EventHandler for F
where
    F: Fn(&BotEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &BotEvent) -> anyhow::Result<()> {
        self(event)
    }
}
