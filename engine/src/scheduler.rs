//! Turn scheduler: initiative, the fixed turn order, and whose turn it is.
//!
//! The turn order never changes length once rolled. Defeated combatants keep
//! their slot and are skipped when it comes around.

use serde::Serialize;
use tracing::{debug, error};

use crate::combatant::{CombatantId, CombatantKind, GridPos, Roster};
use crate::encounter::{check_outcome, CombatOutcome};
use crate::events::{CombatEvent, EventQueue};
use crate::phase::{transition, CombatPhase, PhaseError, PhaseInput};
use crate::{AdMode, Dice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitiativeRoll {
    pub combatant: CombatantId,
    pub roll: u32,
    pub modifier: i32,
    pub total: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnEntry {
    pub combatant: CombatantId,
    pub kind: CombatantKind,
}

/// Identifies one specific turn. Anything holding a stale token (an AI timer,
/// a duplicated "end turn") is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TurnToken(u64);

/// What the scheduler is waiting on after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AwaitingPlayer { combatant: CombatantId },
    Automated { combatant: CombatantId, token: TurnToken },
    Finished(CombatPhase),
    /// The request referred to a turn that is already over.
    Ignored,
}

/// Orders rolls by total, then modifier, both descending. `rolls` must be in
/// roster insertion order; the sort is stable so remaining ties keep it.
pub fn initiative_order(rolls: &[InitiativeRoll]) -> Vec<InitiativeRoll> {
    let mut ordered = rolls.to_vec();
    ordered.sort_by(|a, b| b.total.cmp(&a.total).then(b.modifier.cmp(&a.modifier)));
    ordered
}

#[derive(Debug)]
pub struct Scheduler {
    phase: CombatPhase,
    order: Vec<TurnEntry>,
    index: usize,
    round: u32,
    serial: u64,
    turn_start: Option<GridPos>,
    events: EventQueue,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            phase: CombatPhase::InitiativeRoll,
            order: Vec::new(),
            index: 0,
            round: 0,
            serial: 0,
            turn_start: None,
            events: EventQueue::default(),
        }
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn order(&self) -> &[TurnEntry] {
        &self.order
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn token(&self) -> TurnToken {
        TurnToken(self.serial)
    }

    /// The entry whose turn is being processed, if any.
    pub fn current(&self) -> Option<TurnEntry> {
        if self.phase.is_acting() { self.order.get(self.index).copied() } else { None }
    }

    /// Position the acting combatant held when its turn began.
    pub fn turn_start(&self) -> Option<GridPos> {
        self.turn_start
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }

    pub(crate) fn emit(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    fn apply(&mut self, input: PhaseInput) -> Result<CombatPhase, PhaseError> {
        let from = self.phase;
        let to = transition(from, input)?;
        self.phase = to;
        if from != to {
            debug!(?from, ?to, ?input, "phase change");
            self.events.push(CombatEvent::PhaseChanged { from, to });
        }
        Ok(to)
    }

    pub fn roll_initiative(&mut self, dice: &mut Dice, roster: &Roster) -> Result<Vec<InitiativeRoll>, PhaseError> {
        if self.phase != CombatPhase::InitiativeRoll {
            return Err(PhaseError::Invalid { from: self.phase, input: PhaseInput::InitiativeRolled });
        }
        let rolls: Vec<InitiativeRoll> = roster
            .iter()
            .map(|c| {
                let roll = dice.d20(AdMode::Normal);
                InitiativeRoll {
                    combatant: c.id,
                    roll,
                    modifier: c.initiative_mod,
                    total: roll as i32 + c.initiative_mod,
                }
            })
            .collect();
        let ordered = initiative_order(&rolls);
        self.order = ordered
            .iter()
            .filter_map(|r| roster.get(r.combatant).map(|c| TurnEntry { combatant: c.id, kind: c.kind }))
            .collect();
        self.index = 0;
        self.round = 1;
        self.events.push(CombatEvent::InitiativeRolled { order: ordered.clone() });
        self.apply(PhaseInput::InitiativeRolled)?;
        Ok(ordered)
    }

    /// Starts the turn at the current index, skipping defeated combatants.
    pub fn begin_turn(&mut self, roster: &Roster) -> Result<Step, PhaseError> {
        if self.phase.is_terminal() {
            return Ok(Step::Finished(self.phase));
        }
        if self.phase != CombatPhase::Turn {
            return Err(PhaseError::Invalid { from: self.phase, input: PhaseInput::TurnSkipped });
        }

        for _ in 0..self.order.len() {
            let entry = self.order[self.index];
            match roster.get(entry.combatant) {
                Some(c) if !c.is_defeated() => {
                    self.serial += 1;
                    self.turn_start = Some(c.position);
                    debug!(combatant = %c.id, name = %c.name, round = self.round, "turn started");
                    self.events.push(CombatEvent::TurnStarted {
                        combatant: c.id,
                        kind: c.kind,
                        round: self.round,
                    });
                    self.apply(PhaseInput::TurnBegan(c.kind))?;
                    return Ok(match c.kind {
                        CombatantKind::Player => Step::AwaitingPlayer { combatant: c.id },
                        _ => Step::Automated { combatant: c.id, token: self.token() },
                    });
                }
                _ => {
                    self.events.push(CombatEvent::TurnSkipped { combatant: entry.combatant });
                    self.apply(PhaseInput::TurnSkipped)?;
                    if let Some(phase) = self.conclude(roster)? {
                        return Ok(Step::Finished(phase));
                    }
                    self.step_index();
                }
            }
        }

        // Nobody left to act but no terminal condition met: the roster has no
        // player and no enemies.
        Err(PhaseError::Invalid { from: self.phase, input: PhaseInput::TurnSkipped })
    }

    fn step_index(&mut self) {
        self.index = (self.index + 1) % self.order.len().max(1);
        if self.index == 0 {
            self.round += 1;
        }
    }

    /// Ends the turn identified by `token` and starts the next one. Only the
    /// first call per turn has effect; calls after a terminal phase are no-ops.
    pub fn advance_turn(&mut self, roster: &Roster, token: TurnToken) -> Result<Step, PhaseError> {
        if self.phase.is_terminal() {
            return Ok(Step::Finished(self.phase));
        }
        if token != self.token() || !self.phase.is_acting() {
            debug!(?token, current = ?self.token(), phase = ?self.phase, "stale advance ignored");
            return Ok(Step::Ignored);
        }
        self.apply(PhaseInput::ActionCompleted)?;
        self.turn_start = None;
        if let Some(phase) = self.conclude(roster)? {
            return Ok(Step::Finished(phase));
        }
        self.step_index();
        self.begin_turn(roster)
    }

    /// Player movement done (or skipped).
    pub fn finish_movement(&mut self) -> Result<CombatPhase, PhaseError> {
        self.apply(PhaseInput::MovementFinished)
    }

    /// Moves to a terminal phase if one side has lost. Returns the new phase.
    pub fn conclude(&mut self, roster: &Roster) -> Result<Option<CombatPhase>, PhaseError> {
        if self.phase.is_terminal() {
            return Ok(Some(self.phase));
        }
        let input = match check_outcome(roster) {
            Some(CombatOutcome::Victory) => PhaseInput::AllEnemiesDefeated,
            Some(CombatOutcome::Defeat) => PhaseInput::PlayerDefeated,
            _ => return Ok(None),
        };
        self.turn_start = None;
        self.apply(input).map(Some)
    }

    /// Forced termination. Idempotent once terminal.
    pub fn force_end(&mut self) -> CombatPhase {
        if !self.phase.is_terminal() {
            if let Err(e) = self.apply(PhaseInput::ForcedEnd) {
                error!(error = %e, phase = ?self.phase, "forced end rejected");
            }
            self.turn_start = None;
        }
        self.phase
    }
}
