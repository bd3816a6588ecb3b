use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod action;
pub mod ai;
pub mod combatant;
pub mod config;
pub mod content;
pub mod encounter;
pub mod events;
pub mod grid;
pub mod phase;
pub mod provider;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod targeting;

pub use action::{ActionKind, ActionTemplate, AoeShape, AreaOfEffect, DamageSpec, DamageType, HealSpec};
pub use ai::{AiDecision, AiStrategy, CombatView, NearestFoe};
pub use combatant::{Combatant, CombatantId, CombatantKind, Faction, GridPos, Roster};
pub use config::EngineConfig;
pub use encounter::{
    CombatError, CombatOutcome, CombatResult, CombatantSummary, EnemyGroup, Encounter, EncounterBuilder,
    EncounterData, EncounterError,
};
pub use events::CombatEvent;
pub use phase::CombatPhase;
pub use provider::{CharacterData, CombatantSheet, ContentLibrary, EnemyTemplate, PartySheet};
pub use resolver::{EffectKind, TargetOutcome};
pub use scheduler::{InitiativeRoll, Scheduler, Step, TurnEntry, TurnToken};
pub use session::{spawn_session, SessionError, SessionHandle, SessionSnapshot};
pub use targeting::{TargetError, TargetSelection};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdMode { Normal, Advantage, Disadvantage }

enum Source {
    Seeded(ChaCha8Rng),
    Scripted { rolls: Vec<u32>, next: usize },
}

pub struct Dice { source: Source }

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    /// Replays `rolls` in order, wrapping around when exhausted. Each value is clamped
    /// into the range of the die being rolled.
    pub fn from_scripted(rolls: Vec<u32>) -> Self {
        Self { source: Source::Scripted { rolls, next: 0 } }
    }

    pub fn die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(1..=sides),
            Source::Scripted { rolls, next } => {
                if rolls.is_empty() {
                    return 1;
                }
                let value = rolls[*next % rolls.len()];
                *next += 1;
                value.clamp(1, sides)
            }
        }
    }

    pub fn d20(&mut self, mode: AdMode) -> u32 {
        match mode {
            AdMode::Normal => self.die(20),
            AdMode::Advantage => { let a = self.die(20); let b = self.die(20); a.max(b) }
            AdMode::Disadvantage => { let a = self.die(20); let b = self.die(20); a.min(b) }
        }
    }

    pub fn roll(&mut self, spec: DiceSpec) -> DiceRoll {
        let rolls: Vec<u32> = (0..spec.count).map(|_| self.die(spec.sides)).collect();
        let sum: i64 = rolls.iter().map(|&r| i64::from(r)).sum();
        let total = i32::try_from(sum).unwrap_or(i32::MAX);
        DiceRoll { rolls, total }
    }
}

/* ---------------- dice specifications ---------------- */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceParseError {
    #[error("invalid dice spec (expected XdY), got: {0}")]
    Malformed(String),
    #[error("dice must be between 1d2 and {MAX_DICE_COUNT}d{MAX_DICE_SIDES}, got: {0}")]
    OutOfRange(String),
}

/// Largest dice pool a spec string may ask for.
pub const MAX_DICE_COUNT: u32 = 100;
/// Largest die a spec string may ask for.
pub const MAX_DICE_SIDES: u32 = 1000;

/// `count` dice with `sides` faces, written `XdY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceSpec {
    pub count: u32,
    pub sides: u32,
}

impl DiceSpec {
    pub fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    pub fn min(&self) -> i32 {
        i32::try_from(self.count).unwrap_or(i32::MAX)
    }

    pub fn max(&self) -> i32 {
        let max = i64::from(self.count) * i64::from(self.sides);
        i32::try_from(max).unwrap_or(i32::MAX)
    }
}

impl FromStr for DiceSpec {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (count, sides) = lowered
            .split_once('d')
            .ok_or_else(|| DiceParseError::Malformed(s.to_string()))?;
        let count: u32 = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| DiceParseError::Malformed(s.to_string()))?
        };
        let sides: u32 = sides.parse().map_err(|_| DiceParseError::Malformed(s.to_string()))?;
        if !(1..=MAX_DICE_COUNT).contains(&count) || !(2..=MAX_DICE_SIDES).contains(&sides) {
            return Err(DiceParseError::OutOfRange(s.to_string()));
        }
        Ok(Self { count, sides })
    }
}

impl TryFrom<String> for DiceSpec {
    type Error = DiceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceSpec> for String {
    fn from(spec: DiceSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub rolls: Vec<u32>,
    pub total: i32,
}

/* ---------------- abilities ---------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability { Str, Dex, Con, Int, Wis, Cha }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    #[serde(rename = "str")]
    pub str_: i32,
    pub dex: i32,
    pub con: i32,
    #[serde(rename = "int")]
    pub int_: i32,
    pub wis: i32,
    pub cha: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self { str_: 10, dex: 10, con: 10, int_: 10, wis: 10, cha: 10 }
    }
}

impl AbilityScores {
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Str => self.str_,
            Ability::Dex => self.dex,
            Ability::Con => self.con,
            Ability::Int => self.int_,
            Ability::Wis => self.wis,
            Ability::Cha => self.cha,
        }
    }

    pub fn mod_of(&self, ability: Ability) -> i32 {
        ability_mod(self.score(ability))
    }
}

/// D&D ability modifier = floor((score - 10) / 2) for integer scores.
pub fn ability_mod(score: i32) -> i32 {
    // `div_euclid` with positive divisor matches mathematical floor division.
    (score - 10).div_euclid(2)
}
