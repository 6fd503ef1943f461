// Agent context: one managed bot record

mod actor;
mod property;

pub use actor::{CommandStatus, ExternalActor, Position};
pub use property::PropertyValue;

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

#[cfg(test)]
mod tests;

/// Property key holding the display name given at creation
pub const NAME_KEY: &str = "name";
/// Property key holding the declared [`BotType`]
pub const TYPE_KEY: &str = "type";
/// Property key holding the owning player's actor id
pub const OWNER_KEY: &str = "owner";

/// Lifecycle state of a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotState {
    Idle,
    Moving,
    Fighting,
    Farming,
    Guarding,
    Patrolling,
    Trading,
    Resting,
    Dead,
    Disconnected,
}

impl BotState {
    pub const ALL: [BotState; 10] = [
        BotState::Idle,
        BotState::Moving,
        BotState::Fighting,
        BotState::Farming,
        BotState::Guarding,
        BotState::Patrolling,
        BotState::Trading,
        BotState::Resting,
        BotState::Dead,
        BotState::Disconnected,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BotState::Idle => "Idle",
            BotState::Moving => "Moving",
            BotState::Fighting => "Fighting",
            BotState::Farming => "Farming",
            BotState::Guarding => "Guarding",
            BotState::Patrolling => "Patrolling",
            BotState::Trading => "Trading",
            BotState::Resting => "Resting",
            BotState::Dead => "Dead",
            BotState::Disconnected => "Disconnected",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BotState::Idle => "Bot is not performing any action",
            BotState::Moving => "Bot is moving towards a destination",
            BotState::Fighting => "Bot is engaged in combat",
            BotState::Farming => "Bot is gathering resources",
            BotState::Guarding => "Bot is guarding an area",
            BotState::Patrolling => "Bot is patrolling an area",
            BotState::Trading => "Bot is trading",
            BotState::Resting => "Bot is recovering health or mana",
            BotState::Dead => "Bot is dead",
            BotState::Disconnected => "Bot is disconnected from the server",
        }
    }
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Role a bot was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotType {
    Soldier,
    Officer,
    HighOfficer,
    ViceGuildmaster,
    Farmer,
    Merchant,
    Guard,
}

impl BotType {
    pub const ALL: [BotType; 7] = [
        BotType::Soldier,
        BotType::Officer,
        BotType::HighOfficer,
        BotType::ViceGuildmaster,
        BotType::Farmer,
        BotType::Merchant,
        BotType::Guard,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BotType::Soldier => "Soldier",
            BotType::Officer => "Officer",
            BotType::HighOfficer => "High Officer",
            BotType::ViceGuildmaster => "Vice Guildmaster",
            BotType::Farmer => "Farmer",
            BotType::Merchant => "Merchant",
            BotType::Guard => "Guard",
        }
    }

    pub fn hierarchy_level(&self) -> u8 {
        match self {
            BotType::Soldier => 1,
            BotType::Officer => 2,
            BotType::HighOfficer => 3,
            BotType::ViceGuildmaster => 4,
            BotType::Farmer => 5,
            BotType::Merchant => 6,
            BotType::Guard => 7,
        }
    }

    /// A bot may give orders only to strictly lower levels
    pub fn can_command(&self, subordinate: BotType) -> bool {
        self.hierarchy_level() > subordinate.hierarchy_level()
    }
}

impl fmt::Display for BotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Mutable record of one bot.
///
/// Shared as `Arc<BotContext>` between the registry, the action manager and
/// event handlers. Every field is individually synchronized, so readers never
/// observe a half-written entry.
pub struct BotContext {
    id: u32,
    state: RwLock<BotState>,
    properties: DashMap<String, PropertyValue>,
    /// Non-owning link to the host entity; absent means a virtual bot
    actor: RwLock<Option<Weak<dyn ExternalActor>>>,
    created_at: DateTime<Utc>,
    last_activity_ms: AtomicI64,
}

impl BotContext {
    pub fn new(id: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: RwLock::new(BotState::Idle),
            properties: DashMap::new(),
            actor: RwLock::new(None),
            created_at: now,
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> BotState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set lifecycle state, returning the previous one.
    pub fn set_state(&self, new_state: BotState) -> BotState {
        let old = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, new_state)
        };
        if old != new_state {
            self.touch();
        }
        old
    }

    /// Live actor, if one is linked and still alive
    pub fn actor(&self) -> Option<Arc<dyn ExternalActor>> {
        self.actor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    pub fn link_actor(&self, actor: &Arc<dyn ExternalActor>) {
        *self.actor.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::downgrade(actor));
        self.touch();
    }

    pub fn unlink_actor(&self) {
        *self.actor.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.touch();
    }

    /// True while a live external actor is attached
    pub fn is_active(&self) -> bool {
        self.actor().is_some()
    }

    /// Store a property, returning the value it replaced.
    pub fn set_property(&self, key: &str, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.properties.insert(key.to_string(), value.into())
    }

    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        self.properties.get(key).map(|v| v.value().clone())
    }

    pub fn remove_property(&self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key).map(|(_, v)| v)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Snapshot of the whole property bag
    pub fn properties(&self) -> HashMap<String, PropertyValue> {
        self.properties
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn clear_properties(&self) {
        self.properties.clear();
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .and_then(|v| v.as_text().map(str::to_string))
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(|v| v.as_int())
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(|v| v.as_float())
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(|v| v.as_bool())
    }

    pub fn bot_type_property(&self, key: &str) -> Option<BotType> {
        self.properties.get(key).and_then(|v| v.as_bot_type())
    }

    pub fn name(&self) -> Option<String> {
        self.text(NAME_KEY)
    }

    pub fn bot_type(&self) -> Option<BotType> {
        self.bot_type_property(TYPE_KEY)
    }

    /// Actor id of the owning player
    pub fn owner(&self) -> Option<u32> {
        self.int(OWNER_KEY).and_then(|n| u32::try_from(n).ok())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        let ms = self.last_activity_ms.load(Ordering::Relaxed);
        Utc.timestamp_millis_opt(ms).single().unwrap_or(self.created_at)
    }

    pub fn touch(&self) {
        self.last_activity_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn lifetime(&self) -> Duration {
        Utc::now() - self.created_at
    }

    pub fn idle_time(&self) -> Duration {
        Utc::now() - self.last_activity()
    }
}

impl fmt::Debug for BotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotContext")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("name", &self.name())
            .field("bot_type", &self.bot_type())
            .field("active", &self.is_active())
            .finish()
    }
}
