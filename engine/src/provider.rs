use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::action::ActionTemplate;
use crate::content;
use crate::AbilityScores;

/// Character, equipment and bestiary lookups the engine needs but does not own.
pub trait CharacterData: Send + Sync {
    fn resolve_weapon(&self, id: &str) -> Option<ActionTemplate>;

    fn resolve_spell(&self, id: &str) -> Option<ActionTemplate>;

    fn resolve_enemy(&self, kind: &str) -> Option<EnemyTemplate>;

    fn resolve_action(&self, id: &str) -> Option<ActionTemplate> {
        self.resolve_weapon(id).or_else(|| self.resolve_spell(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub max_hp: i32,
    pub armor_class: i32,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub movement_range: Option<u32>,
    #[serde(default)]
    pub initiative_bonus: i32,
}

/// The state an existing character brings into combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSheet {
    pub name: String,
    pub max_hp: i32,
    /// Defaults to `max_hp`.
    #[serde(default)]
    pub current_hp: Option<i32>,
    pub armor_class: i32,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub movement_range: Option<u32>,
    #[serde(default)]
    pub initiative_bonus: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySheet {
    pub player: CombatantSheet,
    #[serde(default)]
    pub companions: Vec<CombatantSheet>,
}

impl PartySheet {
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(content::PARTY).context("built-in party")
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse party JSON")
    }
}

/// JSON-backed [`CharacterData`].
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    weapons: IndexMap<String, ActionTemplate>,
    spells: IndexMap<String, ActionTemplate>,
    bestiary: IndexMap<String, EnemyTemplate>,
}

fn index_actions(list: Vec<ActionTemplate>) -> IndexMap<String, ActionTemplate> {
    list.into_iter().map(|a| (a.id.clone(), a)).collect()
}

impl ContentLibrary {
    pub fn builtin() -> Result<Self> {
        Self::from_json(content::WEAPONS, content::SPELLS, content::BESTIARY)
    }

    pub fn from_json(weapons: &str, spells: &str, bestiary: &str) -> Result<Self> {
        let weapons: Vec<ActionTemplate> =
            serde_json::from_str(weapons).context("failed to parse weapons JSON")?;
        let spells: Vec<ActionTemplate> =
            serde_json::from_str(spells).context("failed to parse spells JSON")?;
        let bestiary: IndexMap<String, EnemyTemplate> =
            serde_json::from_str(bestiary).context("failed to parse bestiary JSON")?;
        Ok(Self {
            weapons: index_actions(weapons),
            spells: index_actions(spells),
            bestiary,
        })
    }

    pub fn with_weapon(mut self, template: ActionTemplate) -> Self {
        self.weapons.insert(template.id.clone(), template);
        self
    }

    pub fn with_spell(mut self, template: ActionTemplate) -> Self {
        self.spells.insert(template.id.clone(), template);
        self
    }

    pub fn with_enemy(mut self, kind: impl Into<String>, template: EnemyTemplate) -> Self {
        self.bestiary.insert(kind.into(), template);
        self
    }

    pub fn weapons(&self) -> impl Iterator<Item = &ActionTemplate> {
        self.weapons.values()
    }

    pub fn spells(&self) -> impl Iterator<Item = &ActionTemplate> {
        self.spells.values()
    }

    pub fn bestiary(&self) -> impl Iterator<Item = (&String, &EnemyTemplate)> {
        self.bestiary.iter()
    }
}

impl CharacterData for ContentLibrary {
    fn resolve_weapon(&self, id: &str) -> Option<ActionTemplate> {
        self.weapons.get(id).cloned()
    }

    fn resolve_spell(&self, id: &str) -> Option<ActionTemplate> {
        self.spells.get(id).cloned()
    }

    fn resolve_enemy(&self, kind: &str) -> Option<EnemyTemplate> {
        self.bestiary
            .get(kind)
            .or_else(|| self.bestiary.iter().find(|(k, _)| k.eq_ignore_ascii_case(kind)).map(|(_, v)| v))
            .cloned()
    }
}
