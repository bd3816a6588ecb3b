//! Combat lifecycle: bootstrap from encounter data, drive turns through the
//! scheduler, detect victory/defeat and report the result to the caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::action::ActionTemplate;
use crate::ai::{AiStrategy, CombatView, NearestFoe};
use crate::combatant::{Combatant, CombatantId, CombatantKind, GridPos, Roster};
use crate::config::EngineConfig;
use crate::content;
use crate::events::CombatEvent;
use crate::grid::{self, MoveError};
use crate::phase::{CombatPhase, PhaseError};
use crate::provider::{CharacterData, CombatantSheet, PartySheet};
use crate::resolver::{self, ResolveError, TargetOutcome};
use crate::scheduler::{Scheduler, Step, TurnEntry, TurnToken};
use crate::targeting::{self, TargetError, TargetSelection};
use crate::Dice;

const DEFAULT_PLAYER_CELL: GridPos = GridPos::new(1, 2);
const DEFAULT_COMPANION_CELLS: [GridPos; 6] = [
    GridPos::new(0, 1),
    GridPos::new(0, 3),
    GridPos::new(1, 1),
    GridPos::new(1, 3),
    GridPos::new(0, 2),
    GridPos::new(0, 4),
];

/* ---------------- inbound / outbound data ---------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyGroup {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterData {
    pub enemies: Vec<EnemyGroup>,
    #[serde(default)]
    pub enemy_positions: Vec<GridPos>,
    #[serde(default)]
    pub player_position: Option<GridPos>,
    #[serde(default)]
    pub companion_positions: Option<Vec<GridPos>>,
}

impl EncounterData {
    pub fn builtin(id: &str) -> anyhow::Result<Self> {
        let text = content::builtin_encounters()
            .get(id)
            .copied()
            .with_context(|| format!("no built-in encounter named '{}'", id))?;
        Self::from_json_str(text).with_context(|| format!("built-in encounter '{}'", id))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("failed to parse encounter JSON")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    /// Forced termination (retreat, or an aborted encounter).
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSummary {
    pub id: CombatantId,
    pub name: String,
    pub kind: CombatantKind,
    pub hp: i32,
    pub max_hp: i32,
    pub position: GridPos,
}

impl From<&Combatant> for CombatantSummary {
    fn from(c: &Combatant) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            kind: c.kind,
            hp: c.hp(),
            max_hp: c.max_hp(),
            position: c.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatResult {
    pub outcome: CombatOutcome,
    pub total_experience_gained: u32,
    pub surviving_combatants: Vec<CombatantSummary>,
    pub rounds: u32,
}

/* ---------------- errors ---------------- */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncounterError {
    #[error("encounter has no enemies")]
    NoEnemies,
    #[error("unknown enemy type '{0}'")]
    UnknownEnemyType(String),
    #[error("{who} placed off the grid at {at}")]
    OutOfBounds { who: String, at: GridPos },
    #[error("{who} placed on occupied cell {at}")]
    Overlap { who: String, at: GridPos },
    #[error("no free cell left for {0}")]
    NoFreeCell(String),
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error("it is not the player's turn (phase is {0:?})")]
    NotPlayersTurn(CombatPhase),
    #[error("{actor} does not have action '{action}'")]
    ActionNotOwned { actor: CombatantId, action: String },
    #[error("combat is over ({0:?})")]
    Ended(CombatPhase),
    #[error("invariant violated, encounter aborted: {0}")]
    Invariant(String),
}

impl CombatError {
    /// Rejected input: nothing changed and the turn was not consumed.
    pub fn is_illegal_input(&self) -> bool {
        !matches!(self, CombatError::Invariant(_) | CombatError::Ended(_))
    }

    /// The only text a player should ever see for a failed command.
    pub fn user_message(&self) -> &'static str {
        match self {
            CombatError::Ended(_) | CombatError::Invariant(_) => "combat is over",
            _ => "action unavailable",
        }
    }
}

impl From<ResolveError> for CombatError {
    fn from(e: ResolveError) -> Self {
        CombatError::Invariant(e.to_string())
    }
}

/// Victory once every enemy is down; defeat once the player is.
pub fn check_outcome(roster: &Roster) -> Option<CombatOutcome> {
    let mut enemies = roster.of_kind(CombatantKind::Enemy).peekable();
    if enemies.peek().is_some() && enemies.all(|e| e.is_defeated()) {
        return Some(CombatOutcome::Victory);
    }
    if roster.player().is_some_and(|p| p.is_defeated()) {
        return Some(CombatOutcome::Defeat);
    }
    None
}

/* ---------------- bootstrap ---------------- */

pub struct EncounterBuilder {
    data: Arc<dyn CharacterData>,
    default_ai: Arc<dyn AiStrategy>,
    kind_ai: HashMap<CombatantKind, Arc<dyn AiStrategy>>,
    dice: Option<Dice>,
    config: EngineConfig,
}

impl EncounterBuilder {
    pub fn ai(mut self, strategy: Arc<dyn AiStrategy>) -> Self {
        self.default_ai = strategy;
        self
    }

    pub fn ai_for(mut self, kind: CombatantKind, strategy: Arc<dyn AiStrategy>) -> Self {
        self.kind_ai.insert(kind, strategy);
        self
    }

    pub fn dice(mut self, dice: Dice) -> Self {
        self.dice = Some(dice);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn start(self, encounter: &EncounterData, party: &PartySheet) -> Result<Encounter, EncounterError> {
        if encounter.enemies.iter().all(|g| g.count == 0) {
            return Err(EncounterError::NoEnemies);
        }

        let mut dice = self
            .dice
            .unwrap_or_else(|| Dice::from_seed(self.config.seed.unwrap_or_else(rand::random)));
        let companion_cells = encounter.companion_positions.as_deref().unwrap_or(&[]);
        let enemy_total: usize = encounter.enemies.iter().map(|g| g.count as usize).sum();
        let mut placer = Placer::reserving(
            encounter
                .player_position
                .iter()
                .chain(companion_cells.iter().take(party.companions.len()))
                .chain(encounter.enemy_positions.iter().take(enemy_total))
                .copied(),
        );
        let mut roster = Roster::new();
        let mut next_id = 0u32;
        let mut fresh_id = || {
            let id = CombatantId(next_id);
            next_id += 1;
            id
        };
        let movement = self.config.default_movement_range;

        let at = placer.place(&party.player.name, encounter.player_position, &[DEFAULT_PLAYER_CELL])?;
        roster.insert(from_sheet(fresh_id(), CombatantKind::Player, &party.player, at, movement));

        for (i, sheet) in party.companions.iter().enumerate() {
            let at = placer.place(&sheet.name, companion_cells.get(i).copied(), &DEFAULT_COMPANION_CELLS)?;
            roster.insert(from_sheet(fresh_id(), CombatantKind::Companion, sheet, at, movement));
        }

        let enemy_fallback: Vec<GridPos> = (0..grid::GRID_WIDTH)
            .rev()
            .flat_map(|x| (0..grid::GRID_HEIGHT).map(move |y| GridPos::new(x, y)))
            .collect();
        let mut slot = 0usize;
        for group in &encounter.enemies {
            let template = self
                .data
                .resolve_enemy(&group.kind)
                .ok_or_else(|| EncounterError::UnknownEnemyType(group.kind.clone()))?;
            for n in 1..=group.count {
                let name = if group.count > 1 { format!("{} {}", template.name, n) } else { template.name.clone() };
                let at = placer.place(&name, encounter.enemy_positions.get(slot).copied(), &enemy_fallback)?;
                slot += 1;
                let mut enemy = Combatant::new(
                    fresh_id(),
                    name,
                    CombatantKind::Enemy,
                    at,
                    template.max_hp,
                    template.max_hp,
                    template.armor_class,
                    template.abilities,
                )
                .with_actions(template.actions.iter().cloned())
                .with_movement_range(template.movement_range.unwrap_or(movement))
                .with_xp(template.xp);
                enemy.initiative_mod += template.initiative_bonus;
                roster.insert(enemy);
            }
        }

        let mut scheduler = Scheduler::new();
        let order = scheduler.roll_initiative(&mut dice, &roster)?;
        info!(
            combatants = roster.len(),
            first = ?order.first().map(|r| r.combatant),
            "encounter started"
        );

        let mut encounter = Encounter {
            roster,
            scheduler,
            dice,
            data: self.data,
            default_ai: self.default_ai,
            kind_ai: self.kind_ai,
            strategies: HashMap::new(),
            ended_reported: false,
        };
        if let Some((id, at)) = grid::find_overlap(&encounter.roster) {
            error!(combatant = %id, %at, "overlapping placement");
            return Err(EncounterError::Overlap { who: id.to_string(), at });
        }
        // A side may already be beaten (e.g. a player sheet saved at 0 HP).
        if encounter.scheduler.conclude(&encounter.roster)?.is_none() {
            encounter.scheduler.begin_turn(&encounter.roster)?;
        }
        encounter.report_end();
        Ok(encounter)
    }
}

fn from_sheet(id: CombatantId, kind: CombatantKind, sheet: &CombatantSheet, at: GridPos, movement: u32) -> Combatant {
    let mut c = Combatant::new(
        id,
        sheet.name.clone(),
        kind,
        at,
        sheet.current_hp.unwrap_or(sheet.max_hp),
        sheet.max_hp,
        sheet.armor_class,
        sheet.abilities,
    )
    .with_actions(sheet.actions.iter().cloned())
    .with_movement_range(sheet.movement_range.unwrap_or(movement));
    c.initiative_mod += sheet.initiative_bonus;
    c
}

/// Hands out starting cells. Explicitly requested cells are reserved up
/// front so a default formation never claims one.
struct Placer {
    taken: HashSet<GridPos>,
    reserved: HashSet<GridPos>,
}

impl Placer {
    fn reserving(explicit: impl IntoIterator<Item = GridPos>) -> Self {
        Self { taken: HashSet::new(), reserved: explicit.into_iter().collect() }
    }

    fn place(&mut self, who: &str, explicit: Option<GridPos>, fallback: &[GridPos]) -> Result<GridPos, EncounterError> {
        let at = match explicit {
            Some(at) => {
                if !grid::in_bounds(at) {
                    return Err(EncounterError::OutOfBounds { who: who.to_string(), at });
                }
                if self.taken.contains(&at) {
                    return Err(EncounterError::Overlap { who: who.to_string(), at });
                }
                at
            }
            None => fallback
                .iter()
                .copied()
                .chain(grid::cells())
                .find(|c| grid::in_bounds(*c) && !self.taken.contains(c) && !self.reserved.contains(c))
                .ok_or_else(|| EncounterError::NoFreeCell(who.to_string()))?,
        };
        self.taken.insert(at);
        Ok(at)
    }
}

/* ---------------- the running encounter ---------------- */

pub struct Encounter {
    roster: Roster,
    scheduler: Scheduler,
    dice: Dice,
    data: Arc<dyn CharacterData>,
    default_ai: Arc<dyn AiStrategy>,
    kind_ai: HashMap<CombatantKind, Arc<dyn AiStrategy>>,
    strategies: HashMap<CombatantId, Arc<dyn AiStrategy>>,
    ended_reported: bool,
}

impl Encounter {
    pub fn builder(data: Arc<dyn CharacterData>) -> EncounterBuilder {
        EncounterBuilder {
            data,
            default_ai: Arc::new(NearestFoe),
            kind_ai: HashMap::new(),
            dice: None,
            config: EngineConfig::default(),
        }
    }

    pub fn phase(&self) -> CombatPhase {
        self.scheduler.phase()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn turn_order(&self) -> &[TurnEntry] {
        self.scheduler.order()
    }

    pub fn round(&self) -> u32 {
        self.scheduler.round()
    }

    pub fn current_turn(&self) -> Option<TurnEntry> {
        self.scheduler.current()
    }

    pub fn turn_token(&self) -> TurnToken {
        self.scheduler.token()
    }

    pub fn turn_start(&self) -> Option<GridPos> {
        self.scheduler.turn_start()
    }

    pub fn view(&self) -> CombatView<'_> {
        CombatView::new(&self.roster, self.phase(), self.round(), self.data.as_ref())
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.scheduler.drain_events()
    }

    /// The automated turn waiting for its delay to elapse, if any.
    pub fn pending_ai_turn(&self) -> Option<(CombatantId, TurnToken)> {
        if !self.phase().is_automated() {
            return None;
        }
        self.current_turn().map(|t| (t.combatant, self.turn_token()))
    }

    pub fn set_strategy(&mut self, id: CombatantId, strategy: Arc<dyn AiStrategy>) {
        self.strategies.insert(id, strategy);
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self.phase() {
            CombatPhase::Victory => Some(CombatOutcome::Victory),
            CombatPhase::Defeat => Some(CombatOutcome::Defeat),
            CombatPhase::End => Some(CombatOutcome::Ended),
            _ => None,
        }
    }

    /// Summary for the caller; `None` until combat has ended.
    pub fn result(&self) -> Option<CombatResult> {
        let outcome = self.outcome()?;
        let total_experience_gained = match outcome {
            CombatOutcome::Victory => self.roster.of_kind(CombatantKind::Enemy).map(|e| e.xp).sum(),
            CombatOutcome::Defeat | CombatOutcome::Ended => 0,
        };
        Some(CombatResult {
            outcome,
            total_experience_gained,
            surviving_combatants: self.roster.living().map(CombatantSummary::from).collect(),
            rounds: self.round(),
        })
    }

    fn ensure_running(&self) -> Result<(), CombatError> {
        let phase = self.phase();
        if phase.is_terminal() { Err(CombatError::Ended(phase)) } else { Ok(()) }
    }

    fn player_turn(&self) -> Result<CombatantId, CombatError> {
        self.ensure_running()?;
        match self.current_turn() {
            Some(entry) if self.phase().awaits_player() => Ok(entry.combatant),
            _ => Err(CombatError::NotPlayersTurn(self.phase())),
        }
    }

    fn report_end(&mut self) {
        if self.ended_reported {
            return;
        }
        if let Some(outcome) = self.outcome() {
            self.ended_reported = true;
            info!(?outcome, rounds = self.round(), "encounter ended");
            self.scheduler.emit(CombatEvent::EncounterEnded { outcome });
        }
    }

    fn abort(&mut self, reason: String) -> CombatError {
        error!(%reason, "aborting encounter");
        self.scheduler.force_end();
        self.report_end();
        CombatError::Invariant(reason)
    }

    fn check_invariants(&mut self) -> Result<(), CombatError> {
        if let Some((id, at)) = grid::find_overlap(&self.roster) {
            return Err(self.abort(format!("{} shares cell {} with another combatant", id, at)));
        }
        let bad_hp = self
            .roster
            .iter()
            .find(|c| !c.hp_in_range())
            .map(|c| format!("{} has {} of {} HP", c.id, c.hp(), c.max_hp()));
        if let Some(reason) = bad_hp {
            return Err(self.abort(reason));
        }
        Ok(())
    }

    /* -------- player input -------- */

    /// Moves the player during its movement phase. Distance is measured from
    /// where the player stood when the turn began.
    pub fn move_player(&mut self, destination: GridPos) -> Result<GridPos, CombatError> {
        let id = self.player_turn()?;
        let turn_start = self.turn_start().ok_or(CombatError::NotPlayersTurn(self.phase()))?;
        let allowance = self.roster.get(id).map(|c| c.movement_range).unwrap_or(0);
        let phase = self.phase();
        let from = grid::apply_move(&mut self.roster, id, destination, turn_start, allowance, phase)?;
        debug!(combatant = %id, %from, to = %destination, "moved");
        self.scheduler.emit(CombatEvent::CombatantMoved { combatant: id, from, to: destination });
        self.check_invariants()?;
        Ok(from)
    }

    /// Ends (or skips) player movement.
    pub fn finish_movement(&mut self) -> Result<(), CombatError> {
        self.player_turn()?;
        if self.phase() == CombatPhase::PlayerMovement {
            self.scheduler.finish_movement()?;
        }
        Ok(())
    }

    /// Uses `action_id` on `selection`. Illegal input is rejected without
    /// consuming the turn; unknown action data consumes it with no effect.
    pub fn player_action(&mut self, action_id: &str, selection: &TargetSelection) -> Result<Vec<TargetOutcome>, CombatError> {
        let actor_id = self.player_turn()?;
        if !self.roster.get(actor_id).is_some_and(|a| a.owns_action(action_id)) {
            return Err(CombatError::ActionNotOwned { actor: actor_id, action: action_id.to_string() });
        }

        let Some(template) = self.data.resolve_action(action_id) else {
            self.resolve_missing(actor_id, action_id)?;
            self.end_turn()?;
            return Ok(Vec::new());
        };
        let actor = self.roster.get(actor_id).ok_or(CombatError::NotPlayersTurn(self.phase()))?;
        let targets = targeting::resolve_targets(&self.roster, actor, &template, selection)?;

        if self.phase() == CombatPhase::PlayerMovement {
            self.scheduler.finish_movement()?;
        }
        let outcomes = self.execute(actor_id, &template, &targets)?;
        self.end_turn()?;
        Ok(outcomes)
    }

    /// Ends the player's turn without acting.
    pub fn pass_turn(&mut self) -> Result<(), CombatError> {
        self.player_turn()?;
        self.end_turn()
    }

    /* -------- automated turns -------- */

    /// Runs the automated turn identified by `token`: asks the strategy once,
    /// applies its decision and ends the turn. Returns `false` (and changes
    /// nothing) when the token is stale or combat is over.
    pub fn run_ai_turn(&mut self, token: TurnToken) -> Result<bool, CombatError> {
        let Some((actor_id, current)) = self.pending_ai_turn() else {
            return Ok(false);
        };
        if current != token {
            debug!(?token, ?current, "stale AI turn ignored");
            return Ok(false);
        }
        let Some(actor) = self.roster.get(actor_id) else {
            return Ok(false);
        };

        let strategy = self
            .strategies
            .get(&actor_id)
            .or_else(|| self.kind_ai.get(&actor.kind))
            .unwrap_or(&self.default_ai)
            .clone();
        let decision = strategy.choose_action(&self.view(), actor_id);

        match decision {
            None => debug!(combatant = %actor_id, "strategy passed"),
            Some(decision) if self.data.resolve_action(&decision.action_id).is_none() => {
                self.resolve_missing(actor_id, &decision.action_id)?;
            }
            Some(decision) => match self.validate_decision(actor_id, &decision.action_id, &decision.target) {
                Ok((template, targets)) => {
                    self.execute(actor_id, &template, &targets)?;
                }
                Err(reason) => self.fail_soft(actor_id, Some(&decision.action_id), reason),
            },
        }

        self.end_turn()?;
        Ok(true)
    }

    fn validate_decision(
        &self,
        actor_id: CombatantId,
        action_id: &str,
        selection: &TargetSelection,
    ) -> Result<(ActionTemplate, Vec<CombatantId>), String> {
        let actor = self.roster.get(actor_id).ok_or_else(|| format!("{} is not in the roster", actor_id))?;
        if !actor.owns_action(action_id) {
            return Err(format!("{} does not have action '{}'", actor_id, action_id));
        }
        let template = self
            .data
            .resolve_action(action_id)
            .ok_or_else(|| format!("no weapon or spell data for '{}'", action_id))?;
        let targets = targeting::resolve_targets(&self.roster, actor, &template, selection).map_err(|e| e.to_string())?;
        Ok((template, targets))
    }

    /* -------- shared plumbing -------- */

    fn fail_soft(&mut self, actor: CombatantId, action: Option<&str>, reason: String) {
        warn!(combatant = %actor, ?action, %reason, "action had no effect; turn consumed");
        self.scheduler.emit(CombatEvent::ActionFailed {
            actor,
            action: action.map(str::to_string),
            reason,
        });
    }

    /// Unknown action data: resolves as an action with no effect.
    fn resolve_missing(&mut self, actor: CombatantId, action_id: &str) -> Result<(), CombatError> {
        self.fail_soft(actor, Some(action_id), format!("no weapon or spell data for '{}'", action_id));
        self.execute(actor, &ActionTemplate::inert(action_id), &[]).map(|_| ())
    }

    fn execute(&mut self, actor: CombatantId, template: &ActionTemplate, targets: &[CombatantId]) -> Result<Vec<TargetOutcome>, CombatError> {
        let outcomes = match resolver::resolve_action(&mut self.dice, &mut self.roster, actor, template, targets) {
            Ok(outcomes) => outcomes,
            Err(e) => return Err(self.abort(e.to_string())),
        };
        self.scheduler.emit(CombatEvent::ActionResolved {
            actor,
            action: template.id.clone(),
            outcomes: outcomes.clone(),
        });
        let mut fallen = HashSet::new();
        for o in outcomes.iter().filter(|o| o.defeated) {
            if fallen.insert(o.target) {
                info!(combatant = %o.target, "defeated");
                self.scheduler.emit(CombatEvent::CombatantDefeated { combatant: o.target });
            }
        }
        self.check_invariants()?;
        self.scheduler.conclude(&self.roster)?;
        self.report_end();
        Ok(outcomes)
    }

    fn end_turn(&mut self) -> Result<(), CombatError> {
        let token = self.turn_token();
        self.advance_turn(token).map(|_| ())
    }

    /// Ends the turn identified by `token`. Safe to call twice: only the first
    /// call for a turn has effect, and calls after combat ended are no-ops.
    pub fn advance_turn(&mut self, token: TurnToken) -> Result<Step, CombatError> {
        let step = self.scheduler.advance_turn(&self.roster, token)?;
        self.report_end();
        Ok(step)
    }

    /// Forced early termination (e.g. the player flees).
    pub fn force_end(&mut self) -> CombatResult {
        self.scheduler.force_end();
        self.report_end();
        self.result().unwrap_or(CombatResult {
            outcome: CombatOutcome::Ended,
            total_experience_gained: 0,
            surviving_combatants: self.roster.living().map(CombatantSummary::from).collect(),
            rounds: self.round(),
        })
    }
}
