use serde::{Deserialize, Serialize};

/// World coordinates as used by the host simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in world units
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Result of a command issued to an external actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Command accepted, effect not finished yet
    InProgress,
    /// Command finished (target dead, skill landed, item picked up)
    Done,
    /// Command cannot be carried out
    Failed,
}

/// Handle to a live entity owned by the host simulation.
///
/// The bot core never looks behind this trait: actions issue command verbs
/// and read back the coarse status, everything else belongs to the host.
///
/// Command verbs are issued while the action manager holds the agent's slot
/// lock. Implementations must not call back into the `ActionManager`.
pub trait ExternalActor: Send + Sync {
    /// Host-side object id
    fn actor_id(&self) -> u32;

    /// Character name as known by the host
    fn name(&self) -> String;

    fn position(&self) -> Position;

    fn in_combat(&self) -> bool;

    /// Start walking towards `destination`
    fn move_to(&self, destination: Position) -> CommandStatus;

    /// Swing at `target_id`; `Done` once the target is dead or gone
    fn attack(&self, target_id: u32) -> CommandStatus;

    fn cast_skill(&self, skill_id: u32, level: u32, target_id: Option<u32>) -> CommandStatus;

    fn pick_up(&self, item_id: u32) -> CommandStatus;
}
