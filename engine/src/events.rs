use serde::Serialize;

use crate::combatant::{CombatantId, CombatantKind, GridPos};
use crate::encounter::CombatOutcome;
use crate::phase::CombatPhase;
use crate::resolver::TargetOutcome;
use crate::scheduler::InitiativeRoll;

/// Everything an external combat log or UI needs to follow an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    PhaseChanged { from: CombatPhase, to: CombatPhase },
    InitiativeRolled { order: Vec<InitiativeRoll> },
    TurnStarted { combatant: CombatantId, kind: CombatantKind, round: u32 },
    TurnSkipped { combatant: CombatantId },
    CombatantMoved { combatant: CombatantId, from: GridPos, to: GridPos },
    ActionResolved { actor: CombatantId, action: String, outcomes: Vec<TargetOutcome> },
    /// The turn was consumed without effect; `reason` is the diagnostic.
    ActionFailed { actor: CombatantId, action: Option<String>, reason: String },
    CombatantDefeated { combatant: CombatantId },
    EncounterEnded { outcome: CombatOutcome },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<CombatEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: CombatEvent) {
        self.pending.push(event);
    }

    pub fn drain(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.pending)
    }
}
