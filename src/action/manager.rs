use super::{Action, ActionHandler, ActionKind, ActionParams, BuiltinHandler, Category, TickOutcome};
use crate::context::BotContext;
use crate::error::{BotError, BotResult};
use crate::event::{BotEvent, EventHandler};
use crate::registry::BotRegistry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};


/// Kinds registered by [`ActionManager::register_default_handlers`]
pub const DEFAULT_HANDLER_KINDS: [ActionKind; 4] = [
    ActionKind::Move,
    ActionKind::Pickup,
    ActionKind::Attack,
    ActionKind::CastSkill,
];

/// Answer to an action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Agent was idle; the action is now running
    Started,
    /// A lower-priority action was interrupted and replaced
    Interrupted { previous: ActionKind },
    /// Same kind already running; left untouched
    AlreadyRunning,
    /// Running action has equal or higher priority; nothing changed
    Rejected { current: ActionKind },
}

impl RequestOutcome {
    pub fn accepted(&self) -> bool {
        !matches!(self, RequestOutcome::Rejected { .. })
    }
}

/// What one `tick` did for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentTick {
    /// No current action and nothing queued
    Idle,
    Running(ActionKind),
    /// Step could not run; the action stays current
    NotExecuted(ActionKind),
    /// Action finished; the agent is idle again
    Completed(ActionKind),
}

/// Per-agent slot: at most one current action plus a FIFO of pending ones.
///
/// Keeps its own handle on the context so actions can still be interrupted
/// after the bot has left the registry.
struct AgentSlot {
    ctx: Arc<BotContext>,
    current: Option<Box<dyn Action>>,
    queue: VecDeque<Box<dyn Action>>,
}

impl AgentSlot {
    fn new(ctx: Arc<BotContext>) -> Self {
        Self {
            ctx,
            current: None,
            queue: VecDeque::new(),
        }
    }

    fn has_work(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }
}

/// Aggregate counters for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionStatistics {
    pub registered_handlers: usize,
    pub active_agents: usize,
    pub queued_actions: usize,
    pub started: u64,
    pub interrupted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub usage_by_kind: BTreeMap<ActionKind, u64>,
    pub active_by_kind: BTreeMap<ActionKind, usize>,
    pub active_by_category: BTreeMap<Category, usize>,
}

/// Decides which action each agent runs.
///
/// Holds one canonical handler per kind and one slot per agent. All slot
/// transitions happen under the slot's map entry lock, so concurrent
/// requests for the same agent serialize and at most one action is ever
/// active per agent.
///
/// Handlers and host actors run while that entry lock is held and must not
/// call back into the manager.
pub struct ActionManager {
    registry: Arc<BotRegistry>,
    handlers: DashMap<ActionKind, Arc<dyn ActionHandler>>,
    slots: DashMap<u32, AgentSlot>,
    usage: DashMap<ActionKind, u64>,
    started: AtomicU64,
    interrupted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
}

impl ActionManager {
    pub fn new(registry: Arc<BotRegistry>) -> Self {
        Self {
            registry,
            handlers: DashMap::new(),
            slots: DashMap::new(),
            usage: DashMap::new(),
            started: AtomicU64::new(0),
            interrupted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Register the handler for `handler.kind()`, replacing any previous one.
    pub fn register_handler(&self, handler: Arc<dyn ActionHandler>) -> Option<Arc<dyn ActionHandler>> {
        let kind = handler.kind();
        let previous = self.handlers.insert(kind, handler);
        info!(action = %kind, replaced = previous.is_some(), "Registered action handler");
        previous
    }

    pub fn unregister_handler(&self, kind: ActionKind) -> bool {
        let removed = self.handlers.remove(&kind).is_some();
        if removed {
            info!(action = %kind, "Unregistered action handler");
        }
        removed
    }

    /// Register built-in handlers for move, attack, cast and loot
    pub fn register_default_handlers(&self) {
        for kind in DEFAULT_HANDLER_KINDS {
            self.register_handler(Arc::new(BuiltinHandler::new(kind)));
        }
    }

    pub fn is_registered(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn handler(&self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).map(|h| Arc::clone(h.value()))
    }

    pub fn registered_kinds(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self.handlers.iter().map(|e| *e.key()).collect();
        kinds.sort();
        kinds
    }

    fn context(&self, agent_id: u32) -> BotResult<Arc<BotContext>> {
        self.registry.get(agent_id).ok_or(BotError::NotFound(agent_id))
    }

    fn instantiate(&self, kind: ActionKind, params: &ActionParams) -> BotResult<Box<dyn Action>> {
        let handler = self
            .handler(kind)
            .ok_or(BotError::HandlerNotRegistered(kind))?;
        handler.instantiate(params)
    }

    /// Ask for `kind` to run on an agent now.
    ///
    /// Idle agents always accept. A running action is replaced only by a
    /// strictly higher priority kind; the same kind is a no-op acceptance.
    /// Parameters are validated before the running action is touched.
    pub fn request_action(
        &self,
        agent_id: u32,
        kind: ActionKind,
        params: ActionParams,
    ) -> BotResult<RequestOutcome> {
        let ctx = self.context(agent_id)?;

        let mut slot = self
            .slots
            .entry(agent_id)
            .or_insert_with(|| AgentSlot::new(Arc::clone(&ctx)));
        if !self.registry.exists(agent_id) {
            drop(slot);
            self.drop_stale_slot(agent_id);
            return Err(BotError::NotFound(agent_id));
        }

        let previous = slot.current.as_ref().map(|a| a.kind());
        if let Some(current) = previous {
            if current == kind {
                debug!(bot_id = agent_id, action = %kind, "Action already running");
                return Ok(RequestOutcome::AlreadyRunning);
            }
            if !kind.can_interrupt(current) {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(
                    bot_id = agent_id,
                    requested = %kind,
                    current = %current,
                    "Action request rejected"
                );
                return Ok(RequestOutcome::Rejected { current });
            }
        }

        let mut action = self.instantiate(kind, &params)?;

        if let Some(mut old) = slot.current.take() {
            old.interrupt(&ctx);
            self.interrupted.fetch_add(1, Ordering::Relaxed);
        }

        action.activate(&ctx)?;
        slot.current = Some(action);
        drop(slot);

        self.started.fetch_add(1, Ordering::Relaxed);
        *self.usage.entry(kind).or_insert(0) += 1;

        match previous {
            Some(previous) => {
                info!(
                    bot_id = agent_id,
                    action = %kind,
                    interrupted = %previous,
                    "Action interrupted by higher priority request"
                );
                Ok(RequestOutcome::Interrupted { previous })
            }
            None => {
                debug!(bot_id = agent_id, action = %kind, "Action started");
                Ok(RequestOutcome::Started)
            }
        }
    }

    /// Append an action to the agent's queue; it starts once the agent is idle.
    ///
    /// Returns the queue length after insertion.
    pub fn queue_action(&self, agent_id: u32, kind: ActionKind, params: ActionParams) -> BotResult<usize> {
        let ctx = self.context(agent_id)?;
        let action = self.instantiate(kind, &params)?;

        let mut slot = self
            .slots
            .entry(agent_id)
            .or_insert_with(|| AgentSlot::new(ctx));
        if !self.registry.exists(agent_id) {
            drop(slot);
            self.drop_stale_slot(agent_id);
            return Err(BotError::NotFound(agent_id));
        }
        slot.queue.push_back(action);
        debug!(bot_id = agent_id, action = %kind, queued = slot.queue.len(), "Action queued");
        Ok(slot.queue.len())
    }

    /// Kinds waiting in the agent's queue, front first
    pub fn queued(&self, agent_id: u32) -> Vec<ActionKind> {
        self.slots
            .get(&agent_id)
            .map(|s| s.queue.iter().map(|a| a.kind()).collect())
            .unwrap_or_default()
    }

    /// Drop pending actions; returns how many were removed
    pub fn clear_queue(&self, agent_id: u32) -> usize {
        match self.slots.get_mut(&agent_id) {
            Some(mut slot) => {
                let n = slot.queue.len();
                slot.queue.clear();
                n
            }
            None => 0,
        }
    }

    /// Run one execution step for an agent.
    ///
    /// An idle agent with queued work starts the next queued action first.
    pub fn tick(&self, agent_id: u32) -> BotResult<AgentTick> {
        let ctx = self.context(agent_id)?;

        let Some(mut slot) = self.slots.get_mut(&agent_id) else {
            return Ok(AgentTick::Idle);
        };

        if slot.current.is_none() {
            self.start_queued(&mut slot, &ctx)?;
        }

        let Some(action) = slot.current.as_mut() else {
            return Ok(AgentTick::Idle);
        };
        let kind = action.kind();

        match action.tick(&ctx) {
            TickOutcome::Continue => Ok(AgentTick::Running(kind)),
            TickOutcome::NotExecuted => Ok(AgentTick::NotExecuted(kind)),
            TickOutcome::Completed => {
                slot.current = None;
                self.completed.fetch_add(1, Ordering::Relaxed);
                self.start_queued(&mut slot, &ctx)?;
                Ok(AgentTick::Completed(kind))
            }
        }
    }

    /// Activate the front of the queue on an idle slot
    fn start_queued(&self, slot: &mut AgentSlot, ctx: &BotContext) -> BotResult<()> {
        let Some(mut next) = slot.queue.pop_front() else {
            return Ok(());
        };
        let kind = next.kind();
        next.activate(ctx)?;
        slot.current = Some(next);
        self.started.fetch_add(1, Ordering::Relaxed);
        *self.usage.entry(kind).or_insert(0) += 1;
        debug!(bot_id = ctx.id(), action = %kind, "Started queued action");
        Ok(())
    }

    /// Tick every agent with a current or queued action.
    ///
    /// Agents that disappeared from the registry are forgotten first, with
    /// their running action interrupted.
    pub fn tick_all(&self) -> Vec<(u32, AgentTick)> {
        self.prune_removed();

        let ids: Vec<u32> = self
            .slots
            .iter()
            .filter(|e| e.value().has_work())
            .map(|e| *e.key())
            .collect();

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match self.tick(id) {
                Ok(outcome) => results.push((id, outcome)),
                Err(BotError::NotFound(_)) => {
                    if let Some((_, slot)) = self.slots.remove(&id) {
                        self.release(slot);
                    }
                }
                Err(e) => warn!(bot_id = id, error = %e, "Tick failed"),
            }
        }
        results
    }

    /// Interrupt the current action regardless of priority (operator override).
    pub fn stop_action(&self, agent_id: u32) -> BotResult<Option<ActionKind>> {
        let ctx = self.context(agent_id)?;
        let stopped = self
            .slots
            .get_mut(&agent_id)
            .and_then(|mut slot| slot.current.take())
            .map(|mut action| {
                action.interrupt(&ctx);
                action.kind()
            });

        if let Some(kind) = stopped {
            self.interrupted.fetch_add(1, Ordering::Relaxed);
            info!(bot_id = agent_id, action = %kind, "Stopped current action");
        }
        Ok(stopped)
    }

    /// Stop the current action and drop the queue
    pub fn interrupt_all(&self, agent_id: u32) -> BotResult<()> {
        self.stop_action(agent_id)?;
        let cleared = self.clear_queue(agent_id);
        info!(bot_id = agent_id, cleared, "Interrupted all actions");
        Ok(())
    }

    /// Drop all per-agent state, interrupting whatever was running.
    pub fn forget_agent(&self, ctx: &BotContext) {
        if let Some((_, slot)) = self.slots.remove(&ctx.id()) {
            self.release(slot);
        }
    }

    /// Forget every agent the registry no longer holds.
    ///
    /// Needed after `BotRegistry::clear_all`, which publishes no removal
    /// events. Returns how many agents were forgotten.
    pub fn prune_removed(&self) -> usize {
        let stale: Vec<u32> = self
            .slots
            .iter()
            .map(|e| *e.key())
            .filter(|id| !self.registry.exists(*id))
            .collect();

        let mut pruned = 0;
        for id in stale {
            if let Some((_, slot)) = self.slots.remove(&id) {
                self.release(slot);
                pruned += 1;
            }
        }
        if pruned > 0 {
            info!(pruned, "Forgot action state of removed bots");
        }
        pruned
    }

    /// Remove a slot created for a bot that vanished meanwhile, unless a
    /// concurrent caller already gave it work.
    fn drop_stale_slot(&self, agent_id: u32) {
        if let Some((_, slot)) = self.slots.remove_if(&agent_id, |_, slot| !slot.has_work()) {
            self.release(slot);
        }
    }

    /// Interrupt the slot's current action and drop its queue
    fn release(&self, mut slot: AgentSlot) {
        if let Some(mut action) = slot.current.take() {
            action.interrupt(&slot.ctx);
            self.interrupted.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            bot_id = slot.ctx.id(),
            dropped_queue = slot.queue.len(),
            "Forgot agent action state"
        );
    }

    /// Event handler that calls [`forget_agent`](Self::forget_agent) for removed bots.
    pub fn removal_handler(self: &Arc<Self>) -> Arc<dyn EventHandler> {
        let manager = Arc::downgrade(self);
        Arc::new(move |event: &BotEvent| -> anyhow::Result<()> {
            if let Some(manager) = manager.upgrade() {
                manager.forget_agent(event.source());
            }
            Ok(())
        })
    }

    pub fn active_kind(&self, agent_id: u32) -> Option<ActionKind> {
        self.slots
            .get(&agent_id)
            .and_then(|s| s.current.as_ref().map(|a| a.kind()))
    }

    /// Agents that currently run an action
    pub fn active_agent_ids(&self) -> BTreeSet<u32> {
        self.slots
            .iter()
            .filter(|e| e.value().current.is_some())
            .map(|e| *e.key())
            .collect()
    }

    pub fn statistics(&self) -> ActionStatistics {
        let mut stats = ActionStatistics {
            registered_handlers: self.handlers.len(),
            started: self.started.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            usage_by_kind: self.usage.iter().map(|e| (*e.key(), *e.value())).collect(),
            ..Default::default()
        };

        for slot in self.slots.iter() {
            stats.queued_actions += slot.queue.len();
            if let Some(action) = &slot.current {
                let kind = action.kind();
                stats.active_agents += 1;
                *stats.active_by_kind.entry(kind).or_insert(0) += 1;
                for category in kind.categories() {
                    *stats.active_by_category.entry(*category).or_insert(0) += 1;
                }
            }
        }
        stats
    }
}
