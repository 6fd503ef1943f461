use super::{restore_idle, Action, ActionCore, ActionKind, TickOutcome};
use crate::context::{BotContext, BotState};
use std::time::Duration;

/// Generic action for kinds without a dedicated implementation.
///
/// Runs for `duration` (or a single tick when none is given) and needs no
/// linked actor.
#[derive(Debug)]
pub struct TimedAction {
    core: ActionCore,
    duration: Option<Duration>,
}

impl TimedAction {
    pub fn new(kind: ActionKind, duration: Option<Duration>) -> Self {
        Self {
            core: ActionCore::new(kind),
            duration,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn bot_state(&self) -> Option<BotState> {
        match self.core.kind() {
            ActionKind::Rest | ActionKind::Meditate | ActionKind::Heal => Some(BotState::Resting),
            ActionKind::Guard => Some(BotState::Guarding),
            ActionKind::Patrol => Some(BotState::Patrolling),
            ActionKind::Trade => Some(BotState::Trading),
            _ => None,
        }
    }
}

impl Action for TimedAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_activate(&mut self, ctx: &BotContext) {
        if let Some(state) = self.bot_state() {
            ctx.set_state(state);
        }
    }

    fn step(&mut self, _ctx: &BotContext) -> TickOutcome {
        match self.duration {
            Some(d) if self.core.elapsed() < d => TickOutcome::Continue,
            _ => TickOutcome::Completed,
        }
    }

    fn on_end(&mut self, ctx: &BotContext) {
        if let Some(state) = self.bot_state() {
            restore_idle(ctx, state);
        }
    }
}
