use super::{Action, ActionCore, ActionKind, TickOutcome};
use crate::context::{BotContext, CommandStatus, Position};
use std::time::Duration;
use tracing::{debug, warn};

/// Distance at which a loot spot counts as reached
const LOOT_RANGE: f64 = 100.0;
const LOOT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LootTarget {
    Item(u32),
    Spot(Position),
}

/// Pick up a known item, or walk to a spot and collect what lies there.
#[derive(Debug)]
pub struct LootAction {
    core: ActionCore,
    target: LootTarget,
    timeout: Duration,
    approaching: bool,
    success: Option<bool>,
}

impl LootAction {
    pub fn item(item_id: u32) -> Self {
        Self::with_target(LootTarget::Item(item_id))
    }

    pub fn at(spot: Position) -> Self {
        Self::with_target(LootTarget::Spot(spot))
    }

    fn with_target(target: LootTarget) -> Self {
        Self {
            core: ActionCore::new(ActionKind::Pickup),
            target,
            timeout: LOOT_TIMEOUT,
            approaching: false,
            success: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn item_id(&self) -> Option<u32> {
        match self.target {
            LootTarget::Item(id) => Some(id),
            LootTarget::Spot(_) => None,
        }
    }

    pub fn spot(&self) -> Option<Position> {
        match self.target {
            LootTarget::Spot(p) => Some(p),
            LootTarget::Item(_) => None,
        }
    }

    /// `None` while still running
    pub fn success(&self) -> Option<bool> {
        self.success
    }

    fn finish(&mut self, ok: bool) -> TickOutcome {
        self.success = Some(ok);
        TickOutcome::Completed
    }
}

impl Action for LootAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn step(&mut self, ctx: &BotContext) -> TickOutcome {
        let Some(actor) = ctx.actor() else {
            return TickOutcome::NotExecuted;
        };

        if self.core.elapsed() > self.timeout {
            warn!(bot_id = ctx.id(), "Loot timed out");
            return self.finish(false);
        }

        match self.target {
            LootTarget::Item(item_id) => match actor.pick_up(item_id) {
                CommandStatus::InProgress => TickOutcome::Continue,
                CommandStatus::Done => {
                    debug!(bot_id = ctx.id(), item = item_id, "Item picked up");
                    self.finish(true)
                }
                CommandStatus::Failed => {
                    warn!(bot_id = ctx.id(), item = item_id, "Pick up failed");
                    self.finish(false)
                }
            },
            LootTarget::Spot(spot) => {
                if actor.position().distance(&spot) <= LOOT_RANGE {
                    debug!(bot_id = ctx.id(), "Reached loot spot");
                    return self.finish(true);
                }
                if !self.approaching {
                    if actor.move_to(spot) == CommandStatus::Failed {
                        return self.finish(false);
                    }
                    self.approaching = true;
                }
                TickOutcome::Continue
            }
        }
    }
}
