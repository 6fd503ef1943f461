// Bot contexts and the host actor seam
pub mod context;

// Error taxonomy
pub mod error;

// Action catalog, contract, concrete actions and the action manager
pub mod action;

// Lifecycle events and the delivery bus
pub mod event;

// Bot registry
pub mod registry;

// Configuration (TOML file + environment overrides)
pub mod config;

// Session wiring
pub mod session;

#[cfg(test)]
mod test_support;

pub use action::{ActionKind, ActionManager, ActionParams, RequestOutcome};
pub use context::{BotContext, BotState, BotType};
pub use error::{BotError, BotResult};
pub use event::{BotEvent, EventBus, EventKind};
pub use registry::BotRegistry;
pub use session::BotSession;
