use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::AbilityScores;

/// Opaque identifier assigned at encounter bootstrap. Display names may collide
/// ("Goblin", "Goblin"); ids never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub u32);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatantKind {
    Player,
    Companion,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Party,
    Hostile,
}

impl CombatantKind {
    pub fn faction(self) -> Faction {
        match self {
            CombatantKind::Player | CombatantKind::Companion => Faction::Party,
            CombatantKind::Enemy => Faction::Hostile,
        }
    }

    pub fn opposes(self, other: CombatantKind) -> bool {
        self.faction() != other.faction()
    }

    pub fn is_automated(self) -> bool {
        !matches!(self, CombatantKind::Player)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub kind: CombatantKind,
    pub position: GridPos,
    hp: i32,
    max_hp: i32,
    pub armor_class: i32,
    pub abilities: AbilityScores,
    pub initiative_mod: i32,
    /// Movement allowance per turn, in cells.
    pub movement_range: u32,
    /// Weapon and spell ids this combatant may use.
    pub actions: Vec<String>,
    /// Experience awarded for defeating this combatant.
    pub xp: u32,
}

impl Combatant {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CombatantId,
        name: impl Into<String>,
        kind: CombatantKind,
        position: GridPos,
        hp: i32,
        max_hp: i32,
        armor_class: i32,
        abilities: AbilityScores,
    ) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            id,
            name: name.into(),
            kind,
            position,
            hp: hp.clamp(0, max_hp),
            max_hp,
            armor_class,
            initiative_mod: abilities.mod_of(crate::Ability::Dex),
            abilities,
            movement_range: 6,
            actions: Vec::new(),
            xp: 0,
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_movement_range(mut self, cells: u32) -> Self {
        self.movement_range = cells;
        self
    }

    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp = xp;
        self
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn is_defeated(&self) -> bool {
        self.hp <= 0
    }

    pub fn owns_action(&self, action_id: &str) -> bool {
        self.actions.iter().any(|a| a == action_id)
    }

    /// Returns the HP actually removed.
    pub(crate) fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0)).max(0);
        before - self.hp
    }

    /// Returns the HP actually restored.
    pub(crate) fn restore(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
        self.hp - before
    }

    pub(crate) fn hp_in_range(&self) -> bool {
        (0..=self.max_hp).contains(&self.hp)
    }
}

/// All combatants of an encounter, in insertion order. Insertion order is the final
/// initiative tie-breaker, so it must never be reshuffled.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: IndexMap<CombatantId, Combatant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, combatant: Combatant) {
        self.members.insert(combatant.id, combatant);
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.members.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.members.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Insertion index, used as the stable initiative fallback.
    pub fn index_of(&self, id: CombatantId) -> Option<usize> {
        self.members.get_index_of(&id)
    }

    pub fn living(&self) -> impl Iterator<Item = &Combatant> {
        self.iter().filter(|c| !c.is_defeated())
    }

    pub fn player(&self) -> Option<&Combatant> {
        self.iter().find(|c| c.kind == CombatantKind::Player)
    }

    pub fn of_kind(&self, kind: CombatantKind) -> impl Iterator<Item = &Combatant> {
        self.iter().filter(move |c| c.kind == kind)
    }
}
