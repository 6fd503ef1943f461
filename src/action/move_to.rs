use super::{restore_idle, Action, ActionCore, ActionKind, TickOutcome};
use crate::context::{BotContext, BotState, CommandStatus, Position};
use std::time::Duration;
use tracing::{debug, warn};

/// Distance at which the destination counts as reached
const MOVE_TOLERANCE: f64 = 50.0;
const MOVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovePhase {
    Starting,
    Moving,
    Arrived,
    Failed,
}

/// Walk the linked actor to a destination.
#[derive(Debug)]
pub struct MoveAction {
    core: ActionCore,
    destination: Position,
    timeout: Duration,
    phase: MovePhase,
}

impl MoveAction {
    pub fn new(destination: Position) -> Self {
        Self {
            core: ActionCore::new(ActionKind::Move),
            destination,
            timeout: MOVE_TIMEOUT,
            phase: MovePhase::Starting,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn destination(&self) -> Position {
        self.destination
    }

    pub fn arrived(&self) -> bool {
        self.phase == MovePhase::Arrived
    }

    pub fn failed(&self) -> bool {
        self.phase == MovePhase::Failed
    }
}

impl Action for MoveAction {
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

        let distance = actor.position().distance(&self.destination);
        match self.phase {
            MovePhase::Starting => {
                if distance <= MOVE_TOLERANCE {
                    self.phase = MovePhase::Arrived;
                    return TickOutcome::Completed;
                }
                if actor.move_to(self.destination) == CommandStatus::Failed {
                    warn!(bot_id = ctx.id(), "Move command rejected by host");
                    self.phase = MovePhase::Failed;
                    return TickOutcome::Completed;
                }
                ctx.set_state(BotState::Moving);
                self.phase = MovePhase::Moving;
                debug!(
                    bot_id = ctx.id(),
                    x = self.destination.x,
                    y = self.destination.y,
                    z = self.destination.z,
                    "Started moving"
                );
                TickOutcome::Continue
            }
            MovePhase::Moving => {
                if distance <= MOVE_TOLERANCE {
                    self.phase = MovePhase::Arrived;
                    debug!(bot_id = ctx.id(), "Arrived at destination");
                    TickOutcome::Completed
                } else if self.core.elapsed() > self.timeout {
                    warn!(bot_id = ctx.id(), "Move timed out");
                    self.phase = MovePhase::Failed;
                    TickOutcome::Completed
                } else {
                    TickOutcome::Continue
                }
            }
            MovePhase::Arrived | MovePhase::Failed => TickOutcome::Completed,
        }
    }

    fn on_end(&mut self, ctx: &BotContext) {
        restore_idle(ctx, BotState::Moving);
    }
}
