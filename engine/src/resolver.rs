use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::{ActionTemplate, DamageType};
use crate::combatant::{CombatantId, Roster};
use crate::{Ability, AbilityScores, Dice, DiceSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Heal,
}

/// One HP change, as consumed by combat logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: CombatantId,
    pub amount: i32,
    pub kind: EffectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<DamageType>,
    pub hp_after: i32,
    pub defeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("acting combatant {0} is missing from the roster")]
    UnknownActor(CombatantId),
    #[error("HP of {id} left its clamp range: {hp}/{max_hp}")]
    HpOutOfRange { id: CombatantId, hp: i32, max_hp: i32 },
}

fn roll_amount(dice: &mut Dice, spec: DiceSpec, bonus: i32, ability: Option<Ability>, scores: &AbilityScores) -> i32 {
    let ability_bonus = ability.map(|a| scores.mod_of(a)).unwrap_or(0);
    dice.roll(spec).total.saturating_add(bonus).saturating_add(ability_bonus).max(0)
}

/// Applies `action` to each target in order, rolling separately per target.
/// Targets are expected to have been checked by the targeting resolver.
pub fn resolve_action(
    dice: &mut Dice,
    roster: &mut Roster,
    actor: CombatantId,
    action: &ActionTemplate,
    targets: &[CombatantId],
) -> Result<Vec<TargetOutcome>, ResolveError> {
    let scores = roster.get(actor).ok_or(ResolveError::UnknownActor(actor))?.abilities;
    let mut outcomes = Vec::new();

    for &id in targets {
        let Some(target) = roster.get_mut(id) else {
            warn!(target = %id, action = %action.id, "target vanished before resolution; skipping");
            continue;
        };

        if let Some(spec) = &action.damage {
            let amount = roll_amount(dice, spec.dice, spec.bonus, spec.ability, &scores);
            target.take_damage(amount);
            outcomes.push(TargetOutcome {
                target: id,
                amount,
                kind: EffectKind::Damage,
                damage_type: Some(spec.damage_type),
                hp_after: target.hp(),
                defeated: target.is_defeated(),
            });
        }

        if let Some(spec) = &action.heal {
            let amount = roll_amount(dice, spec.dice, spec.bonus, spec.ability, &scores);
            target.restore(amount);
            outcomes.push(TargetOutcome {
                target: id,
                amount,
                kind: EffectKind::Heal,
                damage_type: None,
                hp_after: target.hp(),
                defeated: target.is_defeated(),
            });
        }

        if !target.hp_in_range() {
            return Err(ResolveError::HpOutOfRange { id, hp: target.hp(), max_hp: target.max_hp() });
        }
        debug!(target = %id, hp = target.hp(), max_hp = target.max_hp(), "resolved");
    }

    Ok(outcomes)
}
