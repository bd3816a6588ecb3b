//! Grid model and movement validator.
//!
//! The battlefield is a fixed 8×6 board. A cell holds at most one living
//! combatant; defeated combatants stay in the roster but no longer block.
//! Movement is measured from the position held at the start of the turn, so
//! several short hops can never add up to more than the allowance.

use std::collections::HashSet;

use crate::combatant::{Combatant, CombatantId, GridPos, Roster};
use crate::phase::CombatPhase;

pub const GRID_WIDTH: i32 = 8;
pub const GRID_HEIGHT: i32 = 6;
/// Native distance units (feet) per cell.
pub const FEET_PER_CELL: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("movement is only allowed during the player's movement phase (phase is {0:?})")]
    WrongPhase(CombatPhase),

    #[error("combatant {0} is not on the grid")]
    UnknownCombatant(CombatantId),

    #[error("destination {0} is out of bounds")]
    OutOfBounds(GridPos),

    #[error("destination {destination} is occupied by {occupant}")]
    Occupied { destination: GridPos, occupant: CombatantId },

    #[error("destination {destination} is {distance} cells from the turn start, allowance is {allowance}")]
    OutOfRange { destination: GridPos, distance: u32, allowance: u32 },
}

pub fn in_bounds(pos: GridPos) -> bool {
    (0..GRID_WIDTH).contains(&pos.x) && (0..GRID_HEIGHT).contains(&pos.y)
}

pub fn manhattan_distance(a: GridPos, b: GridPos) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// King-move distance, used for declared action ranges.
pub fn chebyshev_distance(a: GridPos, b: GridPos) -> u32 {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

/// Every cell of the board, row by row.
pub fn cells() -> impl Iterator<Item = GridPos> {
    (0..GRID_HEIGHT).flat_map(|y| (0..GRID_WIDTH).map(move |x| GridPos::new(x, y)))
}

pub fn occupant_at(roster: &Roster, pos: GridPos) -> Option<&Combatant> {
    roster.living().find(|c| c.position == pos)
}

/// Checks a move without applying it.
pub fn validate_move(
    roster: &Roster,
    mover: CombatantId,
    destination: GridPos,
    turn_start: GridPos,
    movement_range: u32,
    phase: CombatPhase,
) -> Result<(), MoveError> {
    if phase != CombatPhase::PlayerMovement {
        return Err(MoveError::WrongPhase(phase));
    }
    if !in_bounds(destination) {
        return Err(MoveError::OutOfBounds(destination));
    }
    let distance = manhattan_distance(turn_start, destination);
    if distance > movement_range {
        return Err(MoveError::OutOfRange { destination, distance, allowance: movement_range });
    }
    match occupant_at(roster, destination) {
        Some(occupant) if occupant.id != mover => Err(MoveError::Occupied {
            destination,
            occupant: occupant.id,
        }),
        _ => Ok(()),
    }
}

pub fn is_legal_move(
    roster: &Roster,
    mover: CombatantId,
    destination: GridPos,
    turn_start: GridPos,
    movement_range: u32,
    phase: CombatPhase,
) -> bool {
    validate_move(roster, mover, destination, turn_start, movement_range, phase).is_ok()
}

/// Validates and then moves `mover` in place. Returns the previous position.
pub fn apply_move(
    roster: &mut Roster,
    mover: CombatantId,
    destination: GridPos,
    turn_start: GridPos,
    movement_range: u32,
    phase: CombatPhase,
) -> Result<GridPos, MoveError> {
    validate_move(roster, mover, destination, turn_start, movement_range, phase)?;
    let Some(combatant) = roster.get_mut(mover) else {
        return Err(MoveError::UnknownCombatant(mover));
    };
    let from = combatant.position;
    combatant.position = destination;
    Ok(from)
}

/// Cells reachable this turn, for UI highlighting.
pub fn reachable_cells(
    roster: &Roster,
    mover: CombatantId,
    turn_start: GridPos,
    movement_range: u32,
) -> Vec<GridPos> {
    cells()
        .filter(|&cell| {
            is_legal_move(roster, mover, cell, turn_start, movement_range, CombatPhase::PlayerMovement)
        })
        .collect()
}

/// First living pair found sharing a cell, if any.
pub fn find_overlap(roster: &Roster) -> Option<(CombatantId, GridPos)> {
    let mut seen = HashSet::new();
    roster
        .living()
        .find(|c| !seen.insert(c.position))
        .map(|c| (c.id, c.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CombatantKind;
    use crate::AbilityScores;

    fn unit(id: u32, kind: CombatantKind, x: i32, y: i32) -> Combatant {
        Combatant::new(CombatantId(id), "u", kind, GridPos::new(x, y), 5, 5, 10, AbilityScores::default())
    }

    #[test]
    fn defeated_combatants_do_not_block() {
        let mut roster = Roster::new();
        roster.insert(unit(0, CombatantKind::Player, 0, 0));
        let mut corpse = unit(1, CombatantKind::Enemy, 1, 0);
        corpse.take_damage(99);
        roster.insert(corpse);
        assert!(occupant_at(&roster, GridPos::new(1, 0)).is_none());
        assert!(find_overlap(&roster).is_none());

        let start = GridPos::new(0, 0);
        apply_move(&mut roster, CombatantId(0), GridPos::new(1, 0), start, 1, CombatPhase::PlayerMovement).unwrap();
        assert_eq!(roster.living().map(|c| c.position).collect::<Vec<_>>(), vec![GridPos::new(1, 0)]);
        assert!(find_overlap(&roster).is_none());
    }

    #[test]
    fn reachable_cells_respect_allowance() {
        let mut roster = Roster::new();
        roster.insert(unit(0, CombatantKind::Player, 0, 0));
        let cells = reachable_cells(&roster, CombatantId(0), GridPos::new(0, 0), 1);
        assert_eq!(cells, vec![GridPos::new(0, 0), GridPos::new(1, 0), GridPos::new(0, 1)]);
    }
}
