use proptest::prelude::*;
use tactics::grid::{
    apply_move, in_bounds, manhattan_distance, reachable_cells, validate_move, MoveError, GRID_HEIGHT, GRID_WIDTH,
};
use tactics::{AbilityScores, Combatant, CombatantId, CombatantKind, CombatPhase, GridPos, Roster};

fn unit(id: u32, kind: CombatantKind, at: GridPos) -> Combatant {
    Combatant::new(CombatantId(id), format!("unit {}", id), kind, at, 10, 10, 12, AbilityScores::default())
}

fn board() -> Roster {
    let mut roster = Roster::new();
    roster.insert(unit(0, CombatantKind::Player, GridPos::new(1, 2)));
    roster.insert(unit(1, CombatantKind::Enemy, GridPos::new(3, 2)));
    roster.insert(unit(2, CombatantKind::Companion, GridPos::new(1, 3)));
    roster
}

const MOVING: CombatPhase = CombatPhase::PlayerMovement;

#[test]
fn occupied_cells_are_rejected() {
    let roster = board();
    let err = validate_move(&roster, CombatantId(0), GridPos::new(3, 2), GridPos::new(1, 2), 6, MOVING);
    assert_eq!(
        err,
        Err(MoveError::Occupied { destination: GridPos::new(3, 2), occupant: CombatantId(1) })
    );
}

#[test]
fn off_grid_is_rejected() {
    let roster = board();
    for dest in [GridPos::new(-1, 0), GridPos::new(8, 0), GridPos::new(0, 6)] {
        assert_eq!(
            validate_move(&roster, CombatantId(0), dest, GridPos::new(1, 2), 20, MOVING),
            Err(MoveError::OutOfBounds(dest))
        );
    }
}

#[test]
fn moving_outside_the_movement_phase_is_rejected() {
    let mut roster = board();
    let err = apply_move(&mut roster, CombatantId(0), GridPos::new(1, 1), GridPos::new(1, 2), 6, CombatPhase::PlayerTurn);
    assert_eq!(err, Err(MoveError::WrongPhase(CombatPhase::PlayerTurn)));
    assert_eq!(roster.get(CombatantId(0)).unwrap().position, GridPos::new(1, 2));
}

#[test]
fn hops_are_measured_from_the_turn_start() {
    let mut roster = board();
    let start = GridPos::new(1, 2);
    // two short hops that would each be legal on their own
    apply_move(&mut roster, CombatantId(0), GridPos::new(1, 0), start, 3, MOVING).unwrap();
    let err = apply_move(&mut roster, CombatantId(0), GridPos::new(3, 0), start, 3, MOVING);
    assert_eq!(
        err,
        Err(MoveError::OutOfRange { destination: GridPos::new(3, 0), distance: 4, allowance: 3 })
    );
    // moving back toward the start is always fine
    apply_move(&mut roster, CombatantId(0), GridPos::new(2, 1), start, 3, MOVING).unwrap();
    assert_eq!(roster.get(CombatantId(0)).unwrap().position, GridPos::new(2, 1));
}

#[test]
fn reachable_cells_match_the_validator() {
    let roster = board();
    let start = GridPos::new(1, 2);
    let cells = reachable_cells(&roster, CombatantId(0), start, 2);
    assert!(cells.contains(&start));
    assert!(!cells.contains(&GridPos::new(1, 3)), "companion blocks its cell");
    assert!(cells.iter().all(|c| manhattan_distance(start, *c) <= 2));
}

proptest! {
    #[test]
    fn accepted_moves_respect_range_bounds_and_occupancy(
        sx in 0..GRID_WIDTH, sy in 0..GRID_HEIGHT,
        dx in -3..GRID_WIDTH + 3, dy in -3..GRID_HEIGHT + 3,
        range in 0u32..10,
    ) {
        let start = GridPos::new(sx, sy);
        let mut roster = Roster::new();
        roster.insert(unit(0, CombatantKind::Player, start));
        let blocker = GridPos::new((sx + 2) % GRID_WIDTH, sy);
        if blocker != start {
            roster.insert(unit(1, CombatantKind::Enemy, blocker));
        }
        let dest = GridPos::new(dx, dy);

        if validate_move(&roster, CombatantId(0), dest, start, range, MOVING).is_ok() {
            prop_assert!(in_bounds(dest));
            prop_assert!(manhattan_distance(start, dest) <= range);
            prop_assert!(dest != blocker || blocker == start);
        }
    }
}
