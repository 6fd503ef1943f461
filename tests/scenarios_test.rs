// Integration tests for the bot management core through a full session:
// capacity, lifecycle event delivery, action priority and removal.

use botmanager::action::{ActionKind, ActionParams, AgentTick, RequestOutcome};
use botmanager::config::BotManagerConfig;
use botmanager::context::{CommandStatus, ExternalActor, Position};
use botmanager::event::{BotEvent, DeliveryMode, EventHandler, EventKind};
use botmanager::{BotError, BotSession, BotState, BotType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn session(capacity: usize, delivery: DeliveryMode) -> BotSession {
    let mut config = BotManagerConfig::default();
    config.registry.capacity = capacity;
    config.registry.delivery = delivery;
    config.events.workers = 2;
    BotSession::start(config).unwrap()
}

fn count_events(session: &BotSession, kind: EventKind) -> Arc<AtomicUsize> {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let handler: Arc<dyn EventHandler> = Arc::new(move |_: &BotEvent| -> anyhow::Result<()> {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    session.event_bus().subscribe(kind, handler);
    hits
}

/// Host entity that walks one step per command poll
struct Walker {
    id: u32,
    position: Mutex<Position>,
    target: Mutex<Option<Position>>,
}

impl Walker {
    fn new(id: u32) -> Self {
        Self {
            id,
            position: Mutex::new(Position::new(0, 0, 0)),
            target: Mutex::new(None),
        }
    }

    fn teleport(&self) {
        if let Some(target) = *self.target.lock().unwrap() {
            *self.position.lock().unwrap() = target;
        }
    }
}

impl ExternalActor for Walker {
    fn actor_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> String {
        format!("walker-{}", self.id)
    }

    fn position(&self) -> Position {
        *self.position.lock().unwrap()
    }

    fn in_combat(&self) -> bool {
        false
    }

    fn move_to(&self, destination: Position) -> CommandStatus {
        *self.target.lock().unwrap() = Some(destination);
        CommandStatus::InProgress
    }

    fn attack(&self, _target_id: u32) -> CommandStatus {
        CommandStatus::InProgress
    }

    fn cast_skill(&self, _skill_id: u32, _level: u32, _target_id: Option<u32>) -> CommandStatus {
        CommandStatus::Done
    }

    fn pick_up(&self, _item_id: u32) -> CommandStatus {
        CommandStatus::Done
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_capacity_two_rejects_third_bot() {
    let session = session(2, DeliveryMode::Async);
    let registry = session.registry();

    registry.create_bot(BotType::Soldier, "Bot1").unwrap();
    registry.create_bot(BotType::Soldier, "Bot2").unwrap();
    let err = registry.create_bot(BotType::Soldier, "Bot3").unwrap_err();

    assert_eq!(err, BotError::CapacityExceeded { capacity: 2 });
    assert_eq!(registry.count(), 2);
}

#[tokio::test]
async fn test_creation_event_counted_after_async_delivery() {
    let session = session(10, DeliveryMode::Async);
    let hits = count_events(&session, EventKind::BotCreated);

    session.registry().create_bot(BotType::Soldier, "Bot1").unwrap();
    session.event_bus().wait_idle().await;

    assert_eq!(session.event_bus().event_count(EventKind::BotCreated), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_creation_event_counted_immediately_when_sync() {
    let session = session(10, DeliveryMode::Sync);
    let hits = count_events(&session, EventKind::BotCreated);

    session.registry().create_bot(BotType::Soldier, "Bot1").unwrap();

    assert_eq!(session.event_bus().event_count(EventKind::BotCreated), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_every_subscriber_gets_one_creation_event() {
    let session = session(10, DeliveryMode::Async);
    let first = count_events(&session, EventKind::BotCreated);
    let second = count_events(&session, EventKind::BotCreated);

    session.registry().create_bot(BotType::Officer, "Captain").unwrap();
    session.event_bus().wait_idle().await;

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    // One batch, two deliveries
    assert_eq!(session.event_bus().event_count(EventKind::BotCreated), 1);
}

#[tokio::test]
async fn test_move_interrupted_by_attack_then_move_rejected() {
    let session = session(10, DeliveryMode::Sync);
    let bot = session.registry().create_bot(BotType::Soldier, "Bot1").unwrap();
    let actions = session.actions();
    let destination = ActionParams::at(Position::new(500, 0, 0));

    assert_eq!(
        actions.request_action(bot.id(), ActionKind::Move, destination.clone()).unwrap(),
        RequestOutcome::Started
    );
    assert!(actions
        .request_action(bot.id(), ActionKind::Attack, ActionParams::on_target(9))
        .unwrap()
        .accepted());
    assert_eq!(actions.active_kind(bot.id()), Some(ActionKind::Attack));

    let outcome = actions.request_action(bot.id(), ActionKind::Move, destination).unwrap();
    assert_eq!(outcome, RequestOutcome::Rejected { current: ActionKind::Attack });
    assert_eq!(actions.active_kind(bot.id()), Some(ActionKind::Attack));
}

#[tokio::test]
async fn test_removing_unknown_bot() {
    let session = session(10, DeliveryMode::Async);
    let removed = count_events(&session, EventKind::BotRemoved);
    session.registry().create_bot(BotType::Soldier, "Bot1").unwrap();

    let err = session.registry().remove_bot(4242).unwrap_err();
    session.event_bus().wait_idle().await;

    assert_eq!(err, BotError::NotFound(4242));
    assert_eq!(session.registry().count(), 1);
    assert_eq!(removed.load(Ordering::SeqCst), 0);
    assert_eq!(session.event_bus().event_count(EventKind::BotRemoved), 0);
}

// ── Session behaviour ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_removal_clears_action_state() {
    let session = session(10, DeliveryMode::Async);
    let bot = session.registry().create_bot(BotType::Guard, "Sentry").unwrap();
    session
        .actions()
        .request_action(bot.id(), ActionKind::Defend, ActionParams::new())
        .unwrap();

    session.registry().remove_bot(bot.id()).unwrap();
    session.event_bus().wait_idle().await;

    assert_eq!(session.actions().active_kind(bot.id()), None);
    assert_eq!(session.actions().statistics().active_agents, 0);
}

#[tokio::test]
async fn test_clear_bots_releases_running_actions() {
    let session = session(10, DeliveryMode::Sync);
    let removed = count_events(&session, EventKind::BotRemoved);
    let walker: Arc<dyn ExternalActor> = Arc::new(Walker::new(1));
    let bot = session
        .registry()
        .create_bot_with_actor(BotType::Soldier, "Runner", &walker)
        .unwrap();
    session
        .actions()
        .request_action(bot.id(), ActionKind::Move, ActionParams::at(Position::new(900, 0, 0)))
        .unwrap();
    session.tick_all();
    assert_eq!(bot.state(), BotState::Moving);

    assert_eq!(session.clear_bots(), 1);

    assert_eq!(removed.load(Ordering::SeqCst), 0);
    assert_eq!(bot.state(), BotState::Idle);
    assert!(session.actions().active_agent_ids().is_empty());
    assert_eq!(session.actions().statistics().interrupted, 1);
    assert!(session.tick_all().is_empty());
}

#[tokio::test]
async fn test_session_registers_default_handlers() {
    let session = session(10, DeliveryMode::Async);
    let bot = session.registry().create_bot(BotType::Soldier, "Bot1").unwrap();

    assert!(session.actions().is_registered(ActionKind::Move));
    assert_eq!(
        session
            .actions()
            .request_action(bot.id(), ActionKind::Rest, ActionParams::new())
            .unwrap_err(),
        BotError::HandlerNotRegistered(ActionKind::Rest)
    );
}

#[tokio::test]
async fn test_run_loop_drives_actions() {
    let session = session(10, DeliveryMode::Sync);
    let walker = Arc::new(Walker::new(1));
    let actor: Arc<dyn ExternalActor> = walker.clone();
    let bot = session
        .registry()
        .create_bot_with_actor(BotType::Soldier, "Runner", &actor)
        .unwrap();

    session
        .actions()
        .request_action(bot.id(), ActionKind::Move, ActionParams::at(Position::new(900, 0, 0)))
        .unwrap();
    assert_eq!(session.tick_all(), vec![(bot.id(), AgentTick::Running(ActionKind::Move))]);
    assert_eq!(bot.state(), BotState::Moving);

    walker.teleport();
    let ticks = session.run(tokio::time::sleep(Duration::from_millis(250))).await;

    assert!(ticks > 0);
    assert_eq!(session.actions().active_kind(bot.id()), None);
    assert_eq!(bot.state(), BotState::Idle);
    assert_eq!(session.actions().statistics().completed, 1);
}

#[tokio::test]
async fn test_session_statistics_and_shutdown() {
    let session = session(10, DeliveryMode::Async);
    let hits = count_events(&session, EventKind::BotCreated);
    for name in ["Bot1", "Bot2", "Bot3"] {
        session.registry().create_bot(BotType::Farmer, name).unwrap();
    }

    session.shutdown().await;
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    let stats = session.statistics();
    assert_eq!(stats.registry.total, 3);
    assert_eq!(stats.events.per_kind[&EventKind::BotCreated].events, 3);
    // Removal handler wired by the session
    assert_eq!(stats.events.per_kind[&EventKind::BotRemoved].listeners, 1);
    assert_eq!(stats.actions.registered_handlers, 4);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["registry"]["capacity"], 10);
}
