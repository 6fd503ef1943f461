use super::*;
use crate::test_support::FakeActor;

#[test]
fn test_new_context_defaults() {
    let ctx = BotContext::new(7);

    assert_eq!(ctx.id(), 7);
    assert_eq!(ctx.state(), BotState::Idle);
    assert!(!ctx.is_active());
    assert!(ctx.properties().is_empty());
    assert!(ctx.created_at() <= Utc::now());
}

#[test]
fn test_set_state_returns_previous() {
    let ctx = BotContext::new(1);

    assert_eq!(ctx.set_state(BotState::Moving), BotState::Idle);
    assert_eq!(ctx.set_state(BotState::Fighting), BotState::Moving);
    assert_eq!(ctx.state(), BotState::Fighting);
}

#[test]
fn test_typed_property_accessors() {
    let ctx = BotContext::new(1);
    ctx.set_property(NAME_KEY, "Guardian");
    ctx.set_property(TYPE_KEY, BotType::Guard);
    ctx.set_property("level", 42i64);
    ctx.set_property("aggressive", true);

    assert_eq!(ctx.name().as_deref(), Some("Guardian"));
    assert_eq!(ctx.bot_type(), Some(BotType::Guard));
    assert_eq!(ctx.int("level"), Some(42));
    assert_eq!(ctx.float("level"), Some(42.0)); // ints widen
    assert_eq!(ctx.bool("aggressive"), Some(true));

    // Wrong type reads as absent rather than panicking
    assert_eq!(ctx.int(NAME_KEY), None);
    assert_eq!(ctx.text("level"), None);
    assert_eq!(ctx.text("missing"), None);
}

#[test]
fn test_property_replace_and_remove() {
    let ctx = BotContext::new(1);

    assert!(ctx.set_property("k", 1i64).is_none());
    assert_eq!(ctx.set_property("k", 2i64), Some(PropertyValue::Int(1)));
    assert!(ctx.has_property("k"));

    assert_eq!(ctx.remove_property("k"), Some(PropertyValue::Int(2)));
    assert!(!ctx.has_property("k"));

    ctx.set_property("a", "x");
    ctx.set_property("b", "y");
    assert_eq!(ctx.properties().len(), 2);
    ctx.clear_properties();
    assert!(ctx.properties().is_empty());
}

#[test]
fn test_owner_accessor() {
    let ctx = BotContext::new(1);
    assert_eq!(ctx.owner(), None);

    ctx.set_property(OWNER_KEY, 5001u32);
    assert_eq!(ctx.owner(), Some(5001));

    // Negative ids are not valid owners
    ctx.set_property(OWNER_KEY, -3i64);
    assert_eq!(ctx.owner(), None);
}

#[test]
fn test_actor_link_is_weak() {
    let ctx = BotContext::new(1);
    let actor: Arc<dyn ExternalActor> = Arc::new(FakeActor::new(100, "Hero"));

    ctx.link_actor(&actor);
    assert!(ctx.is_active());
    assert_eq!(ctx.actor().map(|a| a.actor_id()), Some(100));

    // Dropping the host entity makes the link read as absent
    drop(actor);
    assert!(!ctx.is_active());
    assert!(ctx.actor().is_none());
}

#[test]
fn test_unlink_actor() {
    let ctx = BotContext::new(1);
    let actor: Arc<dyn ExternalActor> = Arc::new(FakeActor::new(100, "Hero"));

    ctx.link_actor(&actor);
    ctx.unlink_actor();
    assert!(!ctx.is_active());
}

#[test]
fn test_bot_type_hierarchy() {
    assert!(BotType::Officer.can_command(BotType::Soldier));
    assert!(!BotType::Soldier.can_command(BotType::Officer));
    assert!(!BotType::Soldier.can_command(BotType::Soldier));
    assert_eq!(BotType::ALL.len(), 7);
}

#[test]
fn test_property_value_serialization() {
    let json = serde_json::to_value(PropertyValue::BotType(BotType::HighOfficer)).unwrap();
    assert_eq!(json, serde_json::json!({"type": "bot_type", "value": "HIGH_OFFICER"}));
}
