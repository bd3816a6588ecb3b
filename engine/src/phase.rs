//! The combat phase machine.
//!
//! [`transition`] is a pure function: it never touches combatants, timers or
//! events. The scheduler feeds it inputs and applies whatever side effects the
//! new phase implies.

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombatPhase {
    InitiativeRoll,
    Turn,
    PlayerMovement,
    PlayerTurn,
    CompanionTurn,
    EnemyTurn,
    Victory,
    Defeat,
    /// Externally forced termination (retreat).
    End,
}

impl CombatPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, CombatPhase::Victory | CombatPhase::Defeat | CombatPhase::End)
    }

    pub fn awaits_player(self) -> bool {
        matches!(self, CombatPhase::PlayerMovement | CombatPhase::PlayerTurn)
    }

    pub fn is_automated(self) -> bool {
        matches!(self, CombatPhase::CompanionTurn | CombatPhase::EnemyTurn)
    }

    /// A phase in which some combatant is mid-turn.
    pub fn is_acting(self) -> bool {
        self.awaits_player() || self.is_automated()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInput {
    InitiativeRolled,
    TurnBegan(CombatantKind),
    TurnSkipped,
    MovementFinished,
    ActionCompleted,
    AllEnemiesDefeated,
    PlayerDefeated,
    ForcedEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("combat already ended in {0:?}")]
    Terminal(CombatPhase),
    #[error("{input:?} is not valid during {from:?}")]
    Invalid { from: CombatPhase, input: PhaseInput },
}

pub fn transition(from: CombatPhase, input: PhaseInput) -> Result<CombatPhase, PhaseError> {
    use CombatPhase::*;
    use PhaseInput::*;

    if from.is_terminal() {
        return Err(PhaseError::Terminal(from));
    }

    let next = match (from, input) {
        (_, AllEnemiesDefeated) => Victory,
        (_, PlayerDefeated) => Defeat,
        (_, ForcedEnd) => End,
        (InitiativeRoll, InitiativeRolled) => Turn,
        (Turn, TurnBegan(CombatantKind::Player)) => PlayerMovement,
        (Turn, TurnBegan(CombatantKind::Companion)) => CompanionTurn,
        (Turn, TurnBegan(CombatantKind::Enemy)) => EnemyTurn,
        (Turn, TurnSkipped) => Turn,
        (PlayerMovement, MovementFinished) => PlayerTurn,
        (PlayerMovement | PlayerTurn | CompanionTurn | EnemyTurn, ActionCompleted) => Turn,
        (from, input) => return Err(PhaseError::Invalid { from, input }),
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases_reject_everything() {
        for phase in [CombatPhase::Victory, CombatPhase::Defeat, CombatPhase::End] {
            assert_eq!(
                transition(phase, PhaseInput::ActionCompleted),
                Err(PhaseError::Terminal(phase))
            );
            assert_eq!(
                transition(phase, PhaseInput::AllEnemiesDefeated),
                Err(PhaseError::Terminal(phase))
            );
        }
    }

    #[test]
    fn player_turn_goes_through_movement() {
        let p = transition(CombatPhase::Turn, PhaseInput::TurnBegan(CombatantKind::Player)).unwrap();
        assert_eq!(p, CombatPhase::PlayerMovement);
        let p = transition(p, PhaseInput::MovementFinished).unwrap();
        assert_eq!(p, CombatPhase::PlayerTurn);
        assert_eq!(transition(p, PhaseInput::ActionCompleted).unwrap(), CombatPhase::Turn);
    }

    #[test]
    fn automated_turns_cannot_finish_movement() {
        assert!(matches!(
            transition(CombatPhase::EnemyTurn, PhaseInput::MovementFinished),
            Err(PhaseError::Invalid { .. })
        ));
    }
}
