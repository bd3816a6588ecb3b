//! Target legality and area-of-effect geometry.
//!
//! Single-target actions name their targets; area actions name a cell and pick
//! up whoever stands in the affected cells at resolution time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::action::{ActionTemplate, AoeShape, AreaOfEffect};
use crate::combatant::{Combatant, CombatantId, GridPos, Roster};
use crate::grid::{self, FEET_PER_CELL, GRID_HEIGHT, GRID_WIDTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSelection {
    Combatants(Vec<CombatantId>),
    Cell(GridPos),
}

impl TargetSelection {
    pub fn single(id: CombatantId) -> Self {
        TargetSelection::Combatants(vec![id])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("{0:?} areas are not supported")]
    UnsupportedShape(AoeShape),
    #[error("area actions need a target cell")]
    NeedsCell,
    #[error("single-target actions need combatant targets")]
    NeedsCombatants,
    #[error("cell {0} is off the grid")]
    CellOutOfBounds(GridPos),
    #[error("no combatant {0}")]
    UnknownTarget(CombatantId),
    #[error("{0} is already defeated")]
    TargetDefeated(CombatantId),
    #[error("{0} is not a valid side for this action")]
    WrongFaction(CombatantId),
    #[error("{target} is {distance_ft} ft away, range is {range_ft} ft")]
    OutOfRange { target: String, distance_ft: u32, range_ft: u32 },
    #[error("{0} was selected more than once")]
    DuplicateTarget(CombatantId),
    #[error("{selected} targets selected, at most {max} allowed")]
    TooManyTargets { selected: usize, max: usize },
    #[error("{selected} targets selected, {required} required")]
    TooFewTargets { selected: usize, required: usize },
}

/// Progress of an incremental target pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    NeedsMoreTargets { remaining: usize },
    Ready,
}

/// Cells covered by `area` placed at `origin`, row by row, clipped to the grid.
pub fn affected_cells(area: &AreaOfEffect, origin: GridPos) -> Result<Vec<GridPos>, TargetError> {
    if !grid::in_bounds(origin) {
        return Err(TargetError::CellOutOfBounds(origin));
    }
    // Anything wider than the board covers all of it.
    let span = (area.size / FEET_PER_CELL).min((GRID_WIDTH + GRID_HEIGHT) as u32) as i32;
    match area.shape {
        AoeShape::Sphere => {
            let r2 = span * span;
            Ok(grid::cells()
                .filter(|c| {
                    let (dx, dy) = (c.x - origin.x, c.y - origin.y);
                    dx * dx + dy * dy <= r2
                })
                .collect())
        }
        AoeShape::Cube => Ok(grid::cells()
            .filter(|c| {
                (origin.x..origin.x + span).contains(&c.x) && (origin.y..origin.y + span).contains(&c.y)
            })
            .collect()),
        shape @ (AoeShape::Line | AoeShape::Cone) => Err(TargetError::UnsupportedShape(shape)),
    }
}

fn side_ok(actor: &Combatant, target: &Combatant, action: &ActionTemplate) -> bool {
    if action.targets_allies {
        !actor.kind.opposes(target.kind)
    } else {
        actor.kind.opposes(target.kind)
    }
}

fn check_range(actor: &Combatant, at: GridPos, label: impl Fn() -> String, action: &ActionTemplate) -> Result<(), TargetError> {
    if let Some(range_ft) = action.range {
        let distance_ft = grid::chebyshev_distance(actor.position, at) * FEET_PER_CELL;
        if distance_ft > range_ft {
            return Err(TargetError::OutOfRange { target: label(), distance_ft, range_ft });
        }
    }
    Ok(())
}

/// Whether `target` may be picked individually by `actor` for `action`.
pub fn check_target(actor: &Combatant, target: &Combatant, action: &ActionTemplate) -> Result<(), TargetError> {
    if target.is_defeated() {
        return Err(TargetError::TargetDefeated(target.id));
    }
    if !side_ok(actor, target, action) {
        return Err(TargetError::WrongFaction(target.id));
    }
    check_range(actor, target.position, || target.id.to_string(), action)
}

pub fn legal_targets(roster: &Roster, actor: &Combatant, action: &ActionTemplate) -> Vec<CombatantId> {
    roster
        .iter()
        .filter(|t| check_target(actor, t, action).is_ok())
        .map(|t| t.id)
        .collect()
}

/// How many distinct targets a single-target action must name right now:
/// its cap, or fewer when fewer legal targets remain.
pub fn required_targets(roster: &Roster, actor: &Combatant, action: &ActionTemplate) -> usize {
    action.max_targets().min(legal_targets(roster, actor, action).len())
}

pub fn selection_state(roster: &Roster, actor: &Combatant, action: &ActionTemplate, selected: usize) -> SelectionState {
    if action.area.is_some() {
        return SelectionState::Ready;
    }
    let required = required_targets(roster, actor, action);
    if selected < required {
        SelectionState::NeedsMoreTargets { remaining: required - selected }
    } else {
        SelectionState::Ready
    }
}

/// Turns a selection into the concrete target list. Pure: nothing is mutated.
pub fn resolve_targets(
    roster: &Roster,
    actor: &Combatant,
    action: &ActionTemplate,
    selection: &TargetSelection,
) -> Result<Vec<CombatantId>, TargetError> {
    match (&action.area, selection) {
        (Some(area), TargetSelection::Cell(origin)) => {
            if !grid::in_bounds(*origin) {
                return Err(TargetError::CellOutOfBounds(*origin));
            }
            check_range(actor, *origin, || origin.to_string(), action)?;
            let cells: HashSet<GridPos> = affected_cells(area, *origin)?.into_iter().collect();
            Ok(roster
                .living()
                .filter(|t| cells.contains(&t.position) && side_ok(actor, t, action))
                .map(|t| t.id)
                .collect())
        }
        (Some(area), TargetSelection::Combatants(_)) => {
            // Shape support is reported before the selection mismatch.
            affected_cells(area, actor.position)?;
            Err(TargetError::NeedsCell)
        }
        (None, TargetSelection::Cell(_)) => Err(TargetError::NeedsCombatants),
        (None, TargetSelection::Combatants(ids)) => {
            let max = action.max_targets();
            if ids.len() > max {
                return Err(TargetError::TooManyTargets { selected: ids.len(), max });
            }
            let mut seen = HashSet::new();
            for &id in ids {
                if !seen.insert(id) {
                    return Err(TargetError::DuplicateTarget(id));
                }
                let target = roster.get(id).ok_or(TargetError::UnknownTarget(id))?;
                check_target(actor, target, action)?;
            }
            let required = required_targets(roster, actor, action);
            if ids.len() < required {
                return Err(TargetError::TooFewTargets { selected: ids.len(), required });
            }
            Ok(ids.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_is_anchored_at_its_corner_and_clipped() {
        let area = AreaOfEffect { shape: AoeShape::Cube, size: 15 };
        let cells = affected_cells(&area, GridPos::new(6, 4)).unwrap();
        assert_eq!(
            cells,
            vec![GridPos::new(6, 4), GridPos::new(7, 4), GridPos::new(6, 5), GridPos::new(7, 5)]
        );
    }

    #[test]
    fn oversized_areas_cover_the_board() {
        let total = grid::cells().count();
        for shape in [AoeShape::Sphere, AoeShape::Cube] {
            let area = AreaOfEffect { shape, size: 500_000 };
            let origin = if shape == AoeShape::Cube { GridPos::new(0, 0) } else { GridPos::new(3, 3) };
            assert_eq!(affected_cells(&area, origin).unwrap().len(), total);
        }
        let area = AreaOfEffect { shape: AoeShape::Sphere, size: u32::MAX };
        assert_eq!(affected_cells(&area, GridPos::new(7, 5)).unwrap().len(), total);
    }

    #[test]
    fn origin_off_the_board_is_rejected() {
        let area = AreaOfEffect { shape: AoeShape::Sphere, size: 10 };
        let origin = GridPos::new(i32::MAX, 0);
        assert_eq!(affected_cells(&area, origin), Err(TargetError::CellOutOfBounds(origin)));
    }

    #[test]
    fn zero_radius_sphere_is_the_origin() {
        let area = AreaOfEffect { shape: AoeShape::Sphere, size: 4 };
        assert_eq!(affected_cells(&area, GridPos::new(2, 2)).unwrap(), vec![GridPos::new(2, 2)]);
    }

    #[test]
    fn line_and_cone_are_rejected() {
        for shape in [AoeShape::Line, AoeShape::Cone] {
            let area = AreaOfEffect { shape, size: 30 };
            assert_eq!(
                affected_cells(&area, GridPos::new(0, 0)),
                Err(TargetError::UnsupportedShape(shape))
            );
        }
    }
}
