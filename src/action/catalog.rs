//! Fixed catalog of action kinds.
//!
//! Pure data: priorities, categories and requirement flags are decided at
//! compile time and never change at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioral grouping of an action kind. A kind may belong to several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Combat,
    Peaceful,
    Social,
    Recovery,
    Search,
    Special,
}

/// Input an action kind cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Target,
    Item,
    Position,
}

/// One entry of the action catalog.
///
/// Variant order is the catalog declaration order and breaks priority ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Idle,
    Wait,
    Stop,
    Turn,
    Move,
    Follow,
    Patrol,
    Guard,
    Search,
    Scan,
    Investigate,
    Talk,
    Trade,
    JoinParty,
    LeaveParty,
    Pickup,
    Drop,
    Use,
    Equip,
    Unequip,
    Rest,
    Meditate,
    Heal,
    Attack,
    CastSkill,
    UseItem,
    Defend,
    Escape,
}

use Category::*;

impl ActionKind {
    pub const ALL: [ActionKind; 28] = [
        ActionKind::Idle,
        ActionKind::Wait,
        ActionKind::Stop,
        ActionKind::Turn,
        ActionKind::Move,
        ActionKind::Follow,
        ActionKind::Patrol,
        ActionKind::Guard,
        ActionKind::Search,
        ActionKind::Scan,
        ActionKind::Investigate,
        ActionKind::Talk,
        ActionKind::Trade,
        ActionKind::JoinParty,
        ActionKind::LeaveParty,
        ActionKind::Pickup,
        ActionKind::Drop,
        ActionKind::Use,
        ActionKind::Equip,
        ActionKind::Unequip,
        ActionKind::Rest,
        ActionKind::Meditate,
        ActionKind::Heal,
        ActionKind::Attack,
        ActionKind::CastSkill,
        ActionKind::UseItem,
        ActionKind::Defend,
        ActionKind::Escape,
    ];

    /// Higher is more important
    pub fn priority(&self) -> u32 {
        match self {
            ActionKind::Idle => 0,
            ActionKind::Wait => 1,
            ActionKind::Stop => 2,
            ActionKind::Turn => 5,
            ActionKind::Move => 10,
            ActionKind::Follow => 12,
            ActionKind::Patrol => 14,
            ActionKind::Guard => 16,
            ActionKind::Search | ActionKind::Scan => 20,
            ActionKind::Investigate => 22,
            ActionKind::Talk | ActionKind::Trade => 25,
            ActionKind::JoinParty | ActionKind::LeaveParty => 26,
            ActionKind::Pickup | ActionKind::Drop => 30,
            ActionKind::Use => 32,
            ActionKind::Equip | ActionKind::Unequip => 34,
            ActionKind::Rest | ActionKind::Meditate => 40,
            ActionKind::Heal => 45,
            ActionKind::Attack => 50,
            ActionKind::CastSkill => 55,
            ActionKind::UseItem => 58,
            ActionKind::Defend => 60,
            ActionKind::Escape => 70,
        }
    }

    /// Strict: equal priority never interrupts
    pub fn can_interrupt(&self, running: ActionKind) -> bool {
        self.priority() > running.priority()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Idle => "Idle",
            ActionKind::Wait => "Wait",
            ActionKind::Stop => "Stop",
            ActionKind::Turn => "Turn",
            ActionKind::Move => "Move",
            ActionKind::Follow => "Follow",
            ActionKind::Patrol => "Patrol",
            ActionKind::Guard => "Guard",
            ActionKind::Search => "Search",
            ActionKind::Scan => "Scan",
            ActionKind::Investigate => "Investigate",
            ActionKind::Talk => "Talk",
            ActionKind::Trade => "Trade",
            ActionKind::JoinParty => "Join Party",
            ActionKind::LeaveParty => "Leave Party",
            ActionKind::Pickup => "Pickup",
            ActionKind::Drop => "Drop",
            ActionKind::Use => "Use",
            ActionKind::Equip => "Equip",
            ActionKind::Unequip => "Unequip",
            ActionKind::Rest => "Rest",
            ActionKind::Meditate => "Meditate",
            ActionKind::Heal => "Heal",
            ActionKind::Attack => "Attack",
            ActionKind::CastSkill => "Cast Skill",
            ActionKind::UseItem => "Use Item",
            ActionKind::Defend => "Defend",
            ActionKind::Escape => "Escape",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::Idle => "Bot does nothing",
            ActionKind::Wait => "Bot waits for a given time",
            ActionKind::Stop => "Bot stops in place",
            ActionKind::Turn => "Bot turns towards a point",
            ActionKind::Move => "Bot moves to a destination",
            ActionKind::Follow => "Bot follows a target",
            ActionKind::Patrol => "Bot patrols an area",
            ActionKind::Guard => "Bot guards a target at a position",
            ActionKind::Search => "Bot searches for a target",
            ActionKind::Scan => "Bot scans the surrounding area",
            ActionKind::Investigate => "Bot investigates an object",
            ActionKind::Talk => "Bot talks to an NPC",
            ActionKind::Trade => "Bot trades with an NPC",
            ActionKind::JoinParty => "Bot joins a party",
            ActionKind::LeaveParty => "Bot leaves its party",
            ActionKind::Pickup => "Bot picks up an item",
            ActionKind::Drop => "Bot drops an item",
            ActionKind::Use => "Bot uses an object",
            ActionKind::Equip => "Bot equips an item",
            ActionKind::Unequip => "Bot unequips an item",
            ActionKind::Rest => "Bot rests to recover health",
            ActionKind::Meditate => "Bot meditates to recover mana",
            ActionKind::Heal => "Bot heals itself",
            ActionKind::Attack => "Bot attacks a target",
            ActionKind::CastSkill => "Bot casts a skill",
            ActionKind::UseItem => "Bot uses an item in combat",
            ActionKind::Defend => "Bot defends against an attack",
            ActionKind::Escape => "Bot retreats from danger",
        }
    }

    pub fn categories(&self) -> &'static [Category] {
        match self {
            ActionKind::Idle | ActionKind::Stop | ActionKind::Turn | ActionKind::Move => &[Peaceful],
            ActionKind::Wait => &[Peaceful, Special],
            ActionKind::Follow | ActionKind::Patrol | ActionKind::Guard => &[Special],
            ActionKind::Search | ActionKind::Scan | ActionKind::Investigate => &[Search],
            ActionKind::Talk | ActionKind::Trade | ActionKind::JoinParty | ActionKind::LeaveParty => {
                &[Social]
            }
            ActionKind::Pickup
            | ActionKind::Drop
            | ActionKind::Use
            | ActionKind::Equip
            | ActionKind::Unequip => &[Peaceful],
            ActionKind::Rest | ActionKind::Meditate | ActionKind::Heal => &[Recovery],
            ActionKind::Attack
            | ActionKind::CastSkill
            | ActionKind::UseItem
            | ActionKind::Defend
            | ActionKind::Escape => &[Combat],
        }
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.categories().contains(&category)
    }

    pub fn is_combat(&self) -> bool {
        self.has_category(Combat)
    }

    pub fn is_peaceful(&self) -> bool {
        self.has_category(Peaceful)
    }

    pub fn is_social(&self) -> bool {
        self.has_category(Social)
    }

    pub fn is_recovery(&self) -> bool {
        self.has_category(Recovery)
    }

    pub fn is_search(&self) -> bool {
        self.has_category(Search)
    }

    pub fn is_special(&self) -> bool {
        self.has_category(Special)
    }

    pub fn requirements(&self) -> &'static [Requirement] {
        match self {
            ActionKind::Turn | ActionKind::Move | ActionKind::Patrol | ActionKind::Escape => {
                &[Requirement::Position]
            }
            ActionKind::Guard => &[Requirement::Target, Requirement::Position],
            ActionKind::Follow
            | ActionKind::Investigate
            | ActionKind::Talk
            | ActionKind::Trade
            | ActionKind::Attack
            | ActionKind::CastSkill => &[Requirement::Target],
            ActionKind::Pickup
            | ActionKind::Drop
            | ActionKind::Use
            | ActionKind::Equip
            | ActionKind::Unequip
            | ActionKind::UseItem => &[Requirement::Item],
            _ => &[],
        }
    }

    pub fn requires_target(&self) -> bool {
        self.requirements().contains(&Requirement::Target)
    }

    pub fn requires_item(&self) -> bool {
        self.requirements().contains(&Requirement::Item)
    }

    pub fn requires_position(&self) -> bool {
        self.requirements().contains(&Requirement::Position)
    }

    /// All kinds, most important first; ties keep declaration order
    pub fn by_priority() -> Vec<ActionKind> {
        let mut kinds = Self::ALL.to_vec();
        // sort_by is stable
        kinds.sort_by(|a, b| b.priority().cmp(&a.priority()));
        kinds
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_strictly_greater() {
        assert!(ActionKind::Attack.can_interrupt(ActionKind::Move));
        assert!(!ActionKind::Move.can_interrupt(ActionKind::Attack));
        assert!(!ActionKind::Move.can_interrupt(ActionKind::Move));
        // Equal priority, different kinds
        assert_eq!(ActionKind::Search.priority(), ActionKind::Scan.priority());
        assert!(!ActionKind::Search.can_interrupt(ActionKind::Scan));
        assert!(!ActionKind::Scan.can_interrupt(ActionKind::Search));
    }

    #[test]
    fn test_interrupt_matches_priority_for_every_pair() {
        for a in ActionKind::ALL {
            for b in ActionKind::ALL {
                assert_eq!(a.can_interrupt(b), a.priority() > b.priority(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_declaration_order_matches_all() {
        let mut sorted = ActionKind::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, ActionKind::ALL.to_vec());
    }

    #[test]
    fn test_by_priority_is_stable() {
        let ordered = ActionKind::by_priority();
        assert_eq!(ordered.len(), ActionKind::ALL.len());
        assert_eq!(ordered[0], ActionKind::Escape);
        assert_eq!(*ordered.last().unwrap(), ActionKind::Idle);

        let search = ordered.iter().position(|k| *k == ActionKind::Search).unwrap();
        let scan = ordered.iter().position(|k| *k == ActionKind::Scan).unwrap();
        assert_eq!(scan, search + 1);

        for pair in ordered.windows(2) {
            assert!(pair[0].priority() >= pair[1].priority());
        }
    }

    #[test]
    fn test_every_kind_has_a_category() {
        for kind in ActionKind::ALL {
            assert!(!kind.categories().is_empty(), "{kind} has no category");
        }
        assert!(ActionKind::Wait.is_peaceful() && ActionKind::Wait.is_special());
    }

    #[test]
    fn test_category_predicates() {
        assert!(ActionKind::Attack.is_combat());
        assert!(ActionKind::Trade.is_social());
        assert!(ActionKind::Heal.is_recovery());
        assert!(ActionKind::Scan.is_search());
        assert!(ActionKind::Patrol.is_special());
        assert!(ActionKind::Move.is_peaceful());
        assert!(!ActionKind::Move.is_combat());
    }

    #[test]
    fn test_requirements() {
        assert!(ActionKind::Attack.requires_target());
        assert!(ActionKind::Move.requires_position());
        assert!(ActionKind::Pickup.requires_item());
        assert!(ActionKind::Guard.requires_target() && ActionKind::Guard.requires_position());
        assert!(ActionKind::Rest.requirements().is_empty());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ActionKind::CastSkill).unwrap(),
            "\"CAST_SKILL\""
        );
        let kind: ActionKind = serde_json::from_str("\"JOIN_PARTY\"").unwrap();
        assert_eq!(kind, ActionKind::JoinParty);
    }
}
