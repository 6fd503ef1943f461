use super::{restore_idle, Action, ActionCore, ActionKind, SkillRef, TickOutcome};
use crate::context::{BotContext, BotState, CommandStatus};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const CAST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CAST_TIME: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CastPhase {
    Preparing,
    Casting { since: Instant },
    Landed,
    Failed,
}

/// Cast one skill, optionally at a target.
#[derive(Debug)]
pub struct CastAction {
    core: ActionCore,
    skill: SkillRef,
    target_id: Option<u32>,
    cast_time: Duration,
    phase: CastPhase,
}

impl CastAction {
    pub fn new(skill: SkillRef, target_id: Option<u32>) -> Self {
        Self {
            core: ActionCore::new(ActionKind::CastSkill),
            skill,
            target_id,
            cast_time: DEFAULT_CAST_TIME,
            phase: CastPhase::Preparing,
        }
    }

    /// How long an in-progress cast takes before it counts as landed
    pub fn with_cast_time(mut self, cast_time: Duration) -> Self {
        self.cast_time = cast_time;
        self
    }

    pub fn skill(&self) -> SkillRef {
        self.skill
    }

    pub fn target_id(&self) -> Option<u32> {
        self.target_id
    }

    pub fn landed(&self) -> bool {
        self.phase == CastPhase::Landed
    }

    pub fn failed(&self) -> bool {
        self.phase == CastPhase::Failed
    }
}

impl Action for CastAction {
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

        if self.core.elapsed() > CAST_TIMEOUT {
            warn!(bot_id = ctx.id(), skill = self.skill.id, "Cast timed out");
            self.phase = CastPhase::Failed;
            return TickOutcome::Completed;
        }

        match self.phase {
            CastPhase::Preparing => {
                let level = self.skill.level.max(1);
                match actor.cast_skill(self.skill.id, level, self.target_id) {
                    CommandStatus::Done => {
                        self.phase = CastPhase::Landed;
                        TickOutcome::Completed
                    }
                    CommandStatus::Failed => {
                        warn!(bot_id = ctx.id(), skill = self.skill.id, "Cast rejected by host");
                        self.phase = CastPhase::Failed;
                        TickOutcome::Completed
                    }
                    CommandStatus::InProgress => {
                        ctx.set_state(BotState::Fighting);
                        self.phase = CastPhase::Casting { since: Instant::now() };
                        debug!(bot_id = ctx.id(), skill = self.skill.id, skill_level = level, "Casting");
                        TickOutcome::Continue
                    }
                }
            }
            CastPhase::Casting { since } => {
                if since.elapsed() >= self.cast_time {
                    self.phase = CastPhase::Landed;
                    TickOutcome::Completed
                } else {
                    TickOutcome::Continue
                }
            }
            CastPhase::Landed | CastPhase::Failed => TickOutcome::Completed,
        }
    }

    fn on_end(&mut self, ctx: &BotContext) {
        restore_idle(ctx, BotState::Fighting);
    }
}
