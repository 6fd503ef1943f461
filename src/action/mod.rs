// Action contract, concrete actions and the per-agent action manager

mod attack;
mod cast;
pub mod catalog;
mod loot;
mod manager;
mod move_to;
mod timed;

pub use attack::AttackAction;
pub use cast::CastAction;
pub use catalog::{ActionKind, Category, Requirement};
pub use loot::LootAction;
pub use manager::{ActionManager, ActionStatistics, AgentTick, RequestOutcome};
pub use move_to::MoveAction;
pub use timed::TimedAction;

use crate::context::{BotContext, BotState, Position};
use crate::error::{BotError, BotResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Three-state lifecycle of one action instance.
///
/// `Completed` is terminal: re-running an action needs a fresh instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionLifecycle {
    Inactive,
    Active,
    Completed,
}

/// Result of one execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Step ran, more work remains
    Continue,
    /// Action finished (successfully or not) and is now `Completed`
    Completed,
    /// Step could not run (no live actor, bot dead); state unchanged
    NotExecuted,
}

/// Skill reference for cast actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRef {
    pub id: u32,
    pub level: u32,
}

/// Inputs for one activation, set before the action starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionParams {
    pub target: Option<u32>,
    pub position: Option<Position>,
    pub skill: Option<SkillRef>,
    pub item: Option<u32>,
    pub duration: Option<Duration>,
}

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: Position) -> Self {
        Self::new().with_position(position)
    }

    pub fn on_target(target_id: u32) -> Self {
        Self::new().with_target(target_id)
    }

    pub fn for_item(item_id: u32) -> Self {
        Self::new().with_item(item_id)
    }

    pub fn with_target(mut self, target_id: u32) -> Self {
        self.target = Some(target_id);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_skill(mut self, skill_id: u32, level: u32) -> Self {
        self.skill = Some(SkillRef { id: skill_id, level });
        self
    }

    pub fn with_item(mut self, item_id: u32) -> Self {
        self.item = Some(item_id);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Check these params against the catalog requirements of `kind`.
    ///
    /// Pickup accepts either an item id or a loot position.
    pub fn validate_for(&self, kind: ActionKind) -> BotResult<()> {
        if kind.requires_target() && self.target.is_none() {
            return Err(BotError::InvalidArgument(format!("{} requires a target", kind)));
        }
        if kind.requires_position() && self.position.is_none() {
            return Err(BotError::InvalidArgument(format!("{} requires a position", kind)));
        }
        if kind.requires_item() {
            let loot_spot = kind == ActionKind::Pickup && self.position.is_some();
            if self.item.is_none() && !loot_spot {
                return Err(BotError::InvalidArgument(format!("{} requires an item", kind)));
            }
        }
        if kind == ActionKind::CastSkill {
            match self.skill {
                None => {
                    return Err(BotError::InvalidArgument(
                        "Cast Skill requires a skill id".to_string(),
                    ))
                }
                Some(skill) if skill.level == 0 => {
                    return Err(BotError::InvalidArgument(
                        "skill level must be at least 1".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Lifecycle bookkeeping shared by every action implementation.
#[derive(Debug)]
pub struct ActionCore {
    kind: ActionKind,
    lifecycle: ActionLifecycle,
    interrupted: bool,
    /// Raised on interrupt; async work spawned by an action must poll it
    cancelled: Arc<AtomicBool>,
    started_at: Option<Instant>,
    ticks: u64,
}

impl ActionCore {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            lifecycle: ActionLifecycle::Inactive,
            interrupted: false,
            cancelled: Arc::new(AtomicBool::new(false)),
            started_at: None,
            ticks: 0,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn lifecycle(&self) -> ActionLifecycle {
        self.lifecycle
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Time since activation (zero before)
    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn activate(&mut self) -> BotResult<()> {
        match self.lifecycle {
            ActionLifecycle::Inactive => {
                self.lifecycle = ActionLifecycle::Active;
                self.started_at = Some(Instant::now());
                Ok(())
            }
            ActionLifecycle::Active => Err(BotError::InvalidArgument(format!(
                "{} action is already active",
                self.kind
            ))),
            ActionLifecycle::Completed => Err(BotError::InvalidArgument(format!(
                "{} action already completed; create a new instance",
                self.kind
            ))),
        }
    }

    fn complete(&mut self) {
        self.lifecycle = ActionLifecycle::Completed;
    }

    fn interrupt(&mut self) {
        if self.lifecycle != ActionLifecycle::Completed {
            self.interrupted = true;
            self.cancelled.store(true, Ordering::SeqCst);
            self.lifecycle = ActionLifecycle::Completed;
        }
    }
}

/// A stateful unit of work bound to one [`ActionKind`].
///
/// Implementors provide `core`/`core_mut` and the `step` body; the provided
/// methods enforce the `Inactive -> Active -> Completed` lifecycle.
pub trait Action: Send + Sync {
    fn core(&self) -> &ActionCore;

    fn core_mut(&mut self) -> &mut ActionCore;

    /// One execution step. Only called while the action is Active.
    fn step(&mut self, ctx: &BotContext) -> TickOutcome;

    /// Hook run right after activation
    fn on_activate(&mut self, _ctx: &BotContext) {}

    /// Hook run once when the action completes or is interrupted
    fn on_end(&mut self, _ctx: &BotContext) {}

    fn kind(&self) -> ActionKind {
        self.core().kind()
    }

    fn lifecycle(&self) -> ActionLifecycle {
        self.core().lifecycle()
    }

    fn is_active(&self) -> bool {
        self.lifecycle() == ActionLifecycle::Active
    }

    fn is_completed(&self) -> bool {
        self.lifecycle() == ActionLifecycle::Completed
    }

    fn activate(&mut self, ctx: &BotContext) -> BotResult<()> {
        self.core_mut().activate()?;
        debug!(bot_id = ctx.id(), action = %self.kind(), "Action activated");
        self.on_activate(ctx);
        Ok(())
    }

    fn tick(&mut self, ctx: &BotContext) -> TickOutcome {
        match self.lifecycle() {
            ActionLifecycle::Inactive => TickOutcome::NotExecuted,
            ActionLifecycle::Completed => TickOutcome::Completed,
            ActionLifecycle::Active => {
                if matches!(ctx.state(), BotState::Dead | BotState::Disconnected) {
                    return TickOutcome::NotExecuted;
                }
                self.core_mut().ticks += 1;
                let outcome = self.step(ctx);
                if outcome == TickOutcome::Completed {
                    self.core_mut().complete();
                    self.on_end(ctx);
                    debug!(bot_id = ctx.id(), action = %self.kind(), "Action completed");
                }
                outcome
            }
        }
    }

    /// Force the action to `Completed`. No-op once completed.
    fn interrupt(&mut self, ctx: &BotContext) {
        if self.is_completed() {
            return;
        }
        self.core_mut().interrupt();
        self.on_end(ctx);
        debug!(bot_id = ctx.id(), action = %self.kind(), "Action interrupted");
    }
}

/// Factory producing fresh action instances for one kind.
///
/// `instantiate` may run while the manager holds the agent's slot lock, so
/// implementations must not call back into the `ActionManager`.
pub trait ActionHandler: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn instantiate(&self, params: &ActionParams) -> BotResult<Box<dyn Action>>;
}

/// Handler backed by the built-in action implementations.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinHandler {
    kind: ActionKind,
}

impl BuiltinHandler {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind }
    }
}

impl ActionHandler for BuiltinHandler {
    fn kind(&self) -> ActionKind {
        self.kind
    }

    fn instantiate(&self, params: &ActionParams) -> BotResult<Box<dyn Action>> {
        params.validate_for(self.kind)?;
        let missing = |what: &str| BotError::InvalidArgument(format!("{} requires {}", self.kind, what));

        let action: Box<dyn Action> = match self.kind {
            ActionKind::Move => Box::new(MoveAction::new(
                params.position.ok_or_else(|| missing("a position"))?,
            )),
            ActionKind::Attack => Box::new(AttackAction::new(
                params.target.ok_or_else(|| missing("a target"))?,
            )),
            ActionKind::CastSkill => {
                let skill = params.skill.ok_or_else(|| missing("a skill"))?;
                Box::new(CastAction::new(skill, params.target))
            }
            ActionKind::Pickup => match (params.item, params.position) {
                (Some(item), _) => Box::new(LootAction::item(item)),
                (None, Some(spot)) => Box::new(LootAction::at(spot)),
                (None, None) => return Err(missing("an item or position")),
            },
            other => Box::new(TimedAction::new(other, params.duration)),
        };
        Ok(action)
    }
}

/// Put the bot back to Idle if an action left it in `expected`.
pub(crate) fn restore_idle(ctx: &BotContext, expected: BotState) {
    if ctx.state() == expected {
        ctx.set_state(BotState::Idle);
    }
}
