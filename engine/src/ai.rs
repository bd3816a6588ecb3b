//! The contract automated combatants plug into.
//!
//! A strategy is asked exactly once per automated turn. The encounter applies
//! whatever it returns through the targeting and action resolvers, then ends
//! the turn; an illegal or empty decision still consumes the turn.

use crate::action::ActionTemplate;
use crate::combatant::{Combatant, CombatantId, Roster};
use crate::grid::manhattan_distance;
use crate::phase::CombatPhase;
use crate::provider::CharacterData;
use crate::targeting::{self, TargetSelection};

/// Read-only snapshot handed to strategies.
pub struct CombatView<'a> {
    pub roster: &'a Roster,
    pub phase: CombatPhase,
    pub round: u32,
    pub(crate) data: &'a dyn CharacterData,
}

impl<'a> CombatView<'a> {
    pub fn new(roster: &'a Roster, phase: CombatPhase, round: u32, data: &'a dyn CharacterData) -> Self {
        Self { roster, phase, round, data }
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&'a Combatant> {
        self.roster.get(id)
    }

    pub fn resolve_action(&self, id: &str) -> Option<ActionTemplate> {
        self.data.resolve_action(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiDecision {
    pub action_id: String,
    pub target: TargetSelection,
}

pub trait AiStrategy: Send + Sync {
    /// `None` passes the turn.
    fn choose_action(&self, view: &CombatView<'_>, actor: CombatantId) -> Option<AiDecision>;
}

/// Uses the first owned action that has something to hit, aimed at the
/// closest legal targets. Heals go to the most wounded ally, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestFoe;

impl NearestFoe {
    fn decide(view: &CombatView<'_>, actor: &Combatant, action: &ActionTemplate) -> Option<AiDecision> {
        let mut candidates: Vec<&Combatant> = targeting::legal_targets(view.roster, actor, action)
            .into_iter()
            .filter_map(|id| view.roster.get(id))
            .collect();

        if action.targets_allies {
            candidates.retain(|c| c.hp() < c.max_hp());
            candidates.sort_by_key(|c| (c.hp() - c.max_hp(), c.id));
        } else {
            candidates.sort_by_key(|c| (manhattan_distance(actor.position, c.position), c.id));
        }

        let first = candidates.first()?;
        let target = match &action.area {
            Some(area) => {
                targeting::affected_cells(area, first.position).ok()?;
                TargetSelection::Cell(first.position)
            }
            None => TargetSelection::Combatants(
                candidates.iter().take(action.max_targets()).map(|c| c.id).collect(),
            ),
        };
        Some(AiDecision { action_id: action.id.clone(), target })
    }
}

impl AiStrategy for NearestFoe {
    fn choose_action(&self, view: &CombatView<'_>, actor: CombatantId) -> Option<AiDecision> {
        let me = view.combatant(actor)?;
        me.actions
            .iter()
            .filter_map(|id| view.resolve_action(id))
            .find_map(|action| Self::decide(view, me, &action))
    }
}
