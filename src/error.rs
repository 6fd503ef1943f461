use crate::action::ActionKind;
use thiserror::Error;

/// Errors returned by registry and action-manager operations.
///
/// Expected negative results that are not failures (an action request losing
/// the priority check, publishing with no subscribers) are reported through
/// normal return values instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotError {
    /// Creation refused because the registry is at its configured ceiling
    #[error("maximum bot count reached: {capacity}")]
    CapacityExceeded { capacity: usize },

    /// No bot with this id is registered
    #[error("bot with id {0} not found")]
    NotFound(u32),

    /// No handler is registered for the requested action kind
    #[error("no handler registered for action {0}")]
    HandlerNotRegistered(ActionKind),

    /// Every bot id has been handed out once
    #[error("bot id space exhausted")]
    IdsExhausted,

    /// Malformed name or action parameters
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type BotResult<T> = Result<T, BotError>;
