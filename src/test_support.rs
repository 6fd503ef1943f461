// Shared fakes for unit tests

use crate::context::{CommandStatus, ExternalActor, Position};
use std::sync::Mutex;

/// Scriptable stand-in for a host entity. Records every command it receives.
pub struct FakeActor {
    pub id: u32,
    pub name: String,
    pub position: Mutex<Position>,
    pub destination: Mutex<Option<Position>>,
    pub in_combat: Mutex<bool>,
    pub attack_status: Mutex<CommandStatus>,
    pub cast_status: Mutex<CommandStatus>,
    pub pick_up_status: Mutex<CommandStatus>,
    pub commands: Mutex<Vec<String>>,
}

impl FakeActor {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            position: Mutex::new(Position::new(0, 0, 0)),
            destination: Mutex::new(None),
            in_combat: Mutex::new(false),
            attack_status: Mutex::new(CommandStatus::InProgress),
            cast_status: Mutex::new(CommandStatus::Done),
            pick_up_status: Mutex::new(CommandStatus::Done),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Teleport to the last requested destination
    pub fn arrive(&self) {
        if let Some(dest) = *self.destination.lock().unwrap() {
            *self.position.lock().unwrap() = dest;
        }
    }

    pub fn set_attack_status(&self, status: CommandStatus) {
        *self.attack_status.lock().unwrap() = status;
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, cmd: String) {
        self.commands.lock().unwrap().push(cmd);
    }
}

impl ExternalActor for FakeActor {
    fn actor_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn position(&self) -> Position {
        *self.position.lock().unwrap()
    }

    fn in_combat(&self) -> bool {
        *self.in_combat.lock().unwrap()
    }

    fn move_to(&self, destination: Position) -> CommandStatus {
        self.record(format!("move_to {} {} {}", destination.x, destination.y, destination.z));
        *self.destination.lock().unwrap() = Some(destination);
        CommandStatus::InProgress
    }

    fn attack(&self, target_id: u32) -> CommandStatus {
        self.record(format!("attack {}", target_id));
        *self.attack_status.lock().unwrap()
    }

    fn cast_skill(&self, skill_id: u32, level: u32, target_id: Option<u32>) -> CommandStatus {
        self.record(format!("cast {} {} {:?}", skill_id, level, target_id));
        *self.cast_status.lock().unwrap()
    }

    fn pick_up(&self, item_id: u32) -> CommandStatus {
        self.record(format!("pick_up {}", item_id));
        *self.pick_up_status.lock().unwrap()
    }
}
