use serde::{Deserialize, Serialize};

use crate::{Ability, DiceSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Spell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Bludgeoning,
    Piercing,
    #[default]
    Slashing,
    Fire,
    Cold,
    Lightning,
    Acid,
    Poison,
    Psychic,
    Radiant,
    Necrotic,
    Thunder,
    Force,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSpec {
    pub dice: DiceSpec,
    #[serde(default)]
    pub bonus: i32,
    #[serde(default, rename = "type")]
    pub damage_type: DamageType,
    /// Adds the actor's modifier for this ability when set.
    #[serde(default)]
    pub ability: Option<Ability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealSpec {
    pub dice: DiceSpec,
    #[serde(default)]
    pub bonus: i32,
    #[serde(default)]
    pub ability: Option<Ability>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AoeShape {
    Sphere,
    Cube,
    Line,
    Cone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaOfEffect {
    pub shape: AoeShape,
    /// Radius (sphere) or side (cube), in feet.
    pub size: u32,
}

/// Read-only action data resolved from a weapon or spell id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ActionKind,
    #[serde(default)]
    pub damage: Option<DamageSpec>,
    #[serde(default)]
    pub heal: Option<HealSpec>,
    /// Reach in feet. `None` means the action is not range-limited.
    #[serde(default)]
    pub range: Option<u32>,
    #[serde(default = "one")]
    pub projectiles: u32,
    #[serde(default)]
    pub area: Option<AreaOfEffect>,
    #[serde(default)]
    pub targets_allies: bool,
}

fn one() -> u32 {
    1
}

impl ActionTemplate {
    pub fn max_targets(&self) -> usize {
        self.projectiles.max(1) as usize
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }

    /// An action that changes nothing; stands in for unresolvable ids so the
    /// turn can still be consumed.
    pub fn inert(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: ActionKind::Attack,
            damage: None,
            heal: None,
            range: None,
            projectiles: 1,
            area: None,
            targets_allies: false,
        }
    }
}
