use crate::config::RegistryConfig;
use crate::context::{BotContext, BotState, BotType, ExternalActor, NAME_KEY, OWNER_KEY, TYPE_KEY};
use crate::error::{BotError, BotResult};
use crate::event::{BotEvent, DeliveryMode, EventBus};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};


pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 16;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStatistics {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub capacity: usize,
    pub by_type: BTreeMap<BotType, usize>,
    pub by_state: BTreeMap<BotState, usize>,
}

/// Owns every live bot context.
///
/// Ids start at 1 and are never reused. Capacity is checked on creation
/// only; the check and the insert are separate steps, so concurrent
/// creations can overshoot the ceiling by at most the number of racing
/// callers.
pub struct BotRegistry {
    bots: DashMap<u32, Arc<BotContext>>,
    next_id: AtomicU32,
    capacity: AtomicUsize,
    bus: Arc<EventBus>,
    delivery: DeliveryMode,
}

impl BotRegistry {
    pub fn new(bus: Arc<EventBus>, config: &RegistryConfig) -> Self {
        info!(
            capacity = config.capacity,
            delivery = ?config.delivery,
            "Bot registry initialized"
        );
        Self {
            bots: DashMap::new(),
            next_id: AtomicU32::new(1),
            capacity: AtomicUsize::new(config.capacity),
            bus,
            delivery: config.delivery,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery
    }

    /// Create a virtual bot (no linked actor) and publish `BOT_CREATED`.
    pub fn create_bot(&self, bot_type: BotType, name: &str) -> BotResult<Arc<BotContext>> {
        self.insert_bot(bot_type, name, None)
    }

    /// Create a bot bound to a live host entity.
    pub fn create_bot_with_actor(
        &self,
        bot_type: BotType,
        name: &str,
        actor: &Arc<dyn ExternalActor>,
    ) -> BotResult<Arc<BotContext>> {
        self.insert_bot(bot_type, name, Some(actor))
    }

    fn insert_bot(
        &self,
        bot_type: BotType,
        name: &str,
        actor: Option<&Arc<dyn ExternalActor>>,
    ) -> BotResult<Arc<BotContext>> {
        validate_name(name)?;

        let capacity = self.capacity();
        if self.bots.len() >= capacity {
            warn!(capacity, name, "Bot capacity reached");
            return Err(BotError::CapacityExceeded { capacity });
        }

        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .map_err(|_| {
                warn!(name, "Bot id space exhausted");
                BotError::IdsExhausted
            })?;
        let ctx = BotContext::new(id);
        ctx.set_property(NAME_KEY, name);
        ctx.set_property(TYPE_KEY, bot_type);
        if let Some(actor) = actor {
            ctx.link_actor(actor);
        }
        let ctx = Arc::new(ctx);
        self.bots.insert(id, Arc::clone(&ctx));

        info!(bot_id = id, name, bot_type = %bot_type, "Bot created");
        self.bus.dispatch(BotEvent::created(Arc::clone(&ctx)), self.delivery);
        Ok(ctx)
    }

    /// Remove a bot and publish `BOT_REMOVED`. Unknown ids publish nothing.
    pub fn remove_bot(&self, id: u32) -> BotResult<Arc<BotContext>> {
        let (_, ctx) = self.bots.remove(&id).ok_or(BotError::NotFound(id))?;
        info!(bot_id = id, name = ?ctx.name(), "Bot removed");
        self.bus.dispatch(BotEvent::removed(Arc::clone(&ctx)), self.delivery);
        Ok(ctx)
    }

    pub fn get(&self, id: u32) -> Option<Arc<BotContext>> {
        self.bots.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn exists(&self, id: u32) -> bool {
        self.bots.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    /// Snapshot of all bots ordered by id
    pub fn list(&self) -> Vec<Arc<BotContext>> {
        self.filtered(|_| true)
    }

    pub fn by_type(&self, bot_type: BotType) -> Vec<Arc<BotContext>> {
        self.filtered(|ctx| ctx.bot_type() == Some(bot_type))
    }

    pub fn by_state(&self, state: BotState) -> Vec<Arc<BotContext>> {
        self.filtered(|ctx| ctx.state() == state)
    }

    /// Bots with a live linked actor
    pub fn active(&self) -> Vec<Arc<BotContext>> {
        self.filtered(|ctx| ctx.is_active())
    }

    pub fn by_owner(&self, owner_id: u32) -> Vec<Arc<BotContext>> {
        self.filtered(|ctx| ctx.owner() == Some(owner_id))
    }

    fn filtered(&self, keep: impl Fn(&BotContext) -> bool) -> Vec<Arc<BotContext>> {
        let mut bots: Vec<Arc<BotContext>> = self
            .bots
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        bots.sort_by_key(|ctx| ctx.id());
        bots
    }

    pub fn set_owner(&self, id: u32, owner_id: u32) -> BotResult<()> {
        let ctx = self.get(id).ok_or(BotError::NotFound(id))?;
        ctx.set_property(OWNER_KEY, owner_id);
        info!(bot_id = id, owner_id, "Bot owner set");
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    /// Change the ceiling. Existing bots above a lowered ceiling stay.
    pub fn set_capacity(&self, capacity: usize) {
        let old = self.capacity.swap(capacity, Ordering::SeqCst);
        info!(old, new = capacity, "Bot capacity changed");
    }

    /// Drop every bot without publishing removal events.
    ///
    /// Action state of the dropped bots is released by
    /// `ActionManager::prune_removed`, which `tick_all` runs first.
    pub fn clear_all(&self) -> usize {
        let removed = self.bots.len();
        self.bots.clear();
        info!(removed, "All bots cleared");
        removed
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let mut stats = RegistryStatistics {
            capacity: self.capacity(),
            ..Default::default()
        };
        for entry in self.bots.iter() {
            let ctx = entry.value();
            stats.total += 1;
            if ctx.is_active() {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
            if let Some(bot_type) = ctx.bot_type() {
                *stats.by_type.entry(bot_type).or_insert(0) += 1;
            }
            *stats.by_state.entry(ctx.state()).or_insert(0) += 1;
        }
        stats
    }
}

/// Bot names are 3 to 16 characters
pub fn validate_name(name: &str) -> BotResult<()> {
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(BotError::InvalidArgument(format!(
            "bot name must be {} to {} characters, got {}",
            MIN_NAME_LEN, MAX_NAME_LEN, len
        )));
    }
    Ok(())
}
