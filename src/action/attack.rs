use super::{restore_idle, Action, ActionCore, ActionKind, TickOutcome};
use crate::context::{BotContext, BotState, CommandStatus};
use std::time::Duration;
use tracing::{debug, warn};

const ATTACK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttackPhase {
    Targeting,
    Attacking,
    TargetDown,
    Failed,
}

/// Keep attacking a target until the host reports it down.
#[derive(Debug)]
pub struct AttackAction {
    core: ActionCore,
    target_id: u32,
    timeout: Duration,
    phase: AttackPhase,
}

impl AttackAction {
    pub fn new(target_id: u32) -> Self {
        Self {
            core: ActionCore::new(ActionKind::Attack),
            target_id,
            timeout: ATTACK_TIMEOUT,
            phase: AttackPhase::Targeting,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn target_id(&self) -> u32 {
        self.target_id
    }

    pub fn target_down(&self) -> bool {
        self.phase == AttackPhase::TargetDown
    }

    pub fn failed(&self) -> bool {
        self.phase == AttackPhase::Failed
    }
}

impl Action for AttackAction {
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

        match self.phase {
            AttackPhase::Targeting => {
                ctx.set_state(BotState::Fighting);
                self.phase = AttackPhase::Attacking;
                debug!(bot_id = ctx.id(), target = self.target_id, "Targeting enemy");
                TickOutcome::Continue
            }
            AttackPhase::Attacking => {
                if self.core.elapsed() > self.timeout {
                    warn!(bot_id = ctx.id(), target = self.target_id, "Attack timed out");
                    self.phase = AttackPhase::Failed;
                    return TickOutcome::Completed;
                }
                match actor.attack(self.target_id) {
                    CommandStatus::InProgress => TickOutcome::Continue,
                    CommandStatus::Done => {
                        self.phase = AttackPhase::TargetDown;
                        debug!(bot_id = ctx.id(), target = self.target_id, "Target down");
                        TickOutcome::Completed
                    }
                    CommandStatus::Failed => {
                        warn!(bot_id = ctx.id(), target = self.target_id, "Attack failed");
                        self.phase = AttackPhase::Failed;
                        TickOutcome::Completed
                    }
                }
            }
            AttackPhase::TargetDown | AttackPhase::Failed => TickOutcome::Completed,
        }
    }

    fn on_end(&mut self, ctx: &BotContext) {
        restore_idle(ctx, BotState::Fighting);
    }
}
