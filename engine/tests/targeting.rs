use tactics::targeting::{affected_cells, legal_targets, resolve_targets, selection_state, SelectionState};
use tactics::{
    AbilityScores, ActionTemplate, AoeShape, AreaOfEffect, CharacterData, Combatant, CombatantId, CombatantKind,
    ContentLibrary, GridPos, Roster, TargetError, TargetSelection,
};

fn unit(id: u32, kind: CombatantKind, at: GridPos) -> Combatant {
    Combatant::new(CombatantId(id), format!("unit {}", id), kind, at, 10, 10, 12, AbilityScores::default())
}

fn action(id: &str) -> ActionTemplate {
    ContentLibrary::builtin().unwrap().resolve_action(id).unwrap()
}

/// Companion at (0,0), player at (3,3), enemies at (3,2), (4,2) and (6,5).
fn skirmish() -> Roster {
    let mut roster = Roster::new();
    roster.insert(unit(0, CombatantKind::Player, GridPos::new(3, 3)));
    roster.insert(unit(1, CombatantKind::Companion, GridPos::new(0, 0)));
    roster.insert(unit(2, CombatantKind::Enemy, GridPos::new(3, 2)));
    roster.insert(unit(3, CombatantKind::Enemy, GridPos::new(4, 2)));
    roster.insert(unit(4, CombatantKind::Enemy, GridPos::new(6, 5)));
    roster
}

fn picture(cells: &[GridPos]) -> String {
    (0..6)
        .map(|y| {
            (0..8)
                .map(|x| if cells.contains(&GridPos::new(x, y)) { '#' } else { '.' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn sphere_footprint() {
    let area = AreaOfEffect { shape: AoeShape::Sphere, size: 10 };
    let cells = affected_cells(&area, GridPos::new(3, 2)).unwrap();
    insta::assert_snapshot!(picture(&cells), @r"
    ...#....
    ..###...
    .#####..
    ..###...
    ...#....
    ........
    ");
}

#[test]
fn aoe_resolution_is_deterministic_and_faction_aware() {
    let roster = skirmish();
    let caster = roster.get(CombatantId(1)).unwrap();
    let fireball = action("fireball");
    let at = TargetSelection::Cell(GridPos::new(3, 2));

    let first = resolve_targets(&roster, caster, &fireball, &at).unwrap();
    let second = resolve_targets(&roster, caster, &fireball, &at).unwrap();
    assert_eq!(first, second);
    // the player at (3,3) is inside the blast but on the caster's side
    assert_eq!(first, vec![CombatantId(2), CombatantId(3)]);
}

#[test]
fn aoe_needs_a_cell_and_rejects_unsupported_shapes() {
    let roster = skirmish();
    let caster = roster.get(CombatantId(0)).unwrap();

    let fireball = action("fireball");
    assert_eq!(
        resolve_targets(&roster, caster, &fireball, &TargetSelection::single(CombatantId(2))),
        Err(TargetError::NeedsCell)
    );

    let burning_hands = action("burning_hands");
    assert_eq!(
        resolve_targets(&roster, caster, &burning_hands, &TargetSelection::Cell(GridPos::new(3, 2))),
        Err(TargetError::UnsupportedShape(AoeShape::Cone))
    );
    assert_eq!(
        resolve_targets(&roster, caster, &fireball, &TargetSelection::Cell(GridPos::new(9, 9))),
        Err(TargetError::CellOutOfBounds(GridPos::new(9, 9)))
    );
}

#[test]
fn multi_projectile_selection_rules() {
    let roster = skirmish();
    let caster = roster.get(CombatantId(1)).unwrap();
    let missiles = action("magic_missile");
    let pick = |ids: &[u32]| TargetSelection::Combatants(ids.iter().map(|&i| CombatantId(i)).collect());

    assert_eq!(
        resolve_targets(&roster, caster, &missiles, &pick(&[2, 3, 4])),
        Ok(vec![CombatantId(2), CombatantId(3), CombatantId(4)])
    );
    assert_eq!(
        resolve_targets(&roster, caster, &missiles, &pick(&[2, 3])),
        Err(TargetError::TooFewTargets { selected: 2, required: 3 })
    );
    assert_eq!(
        resolve_targets(&roster, caster, &missiles, &pick(&[2, 2, 3])),
        Err(TargetError::DuplicateTarget(CombatantId(2)))
    );
    assert_eq!(
        resolve_targets(&roster, caster, &missiles, &pick(&[2, 3, 4, 0])),
        Err(TargetError::TooManyTargets { selected: 4, max: 3 })
    );
    assert_eq!(
        resolve_targets(&roster, caster, &missiles, &pick(&[0])),
        Err(TargetError::WrongFaction(CombatantId(0)))
    );
}

#[test]
fn required_count_shrinks_with_the_field() {
    let roster = skirmish();
    // drop two of the three enemies out of the fight
    let mut thinned = Roster::new();
    for c in roster.iter().filter(|c| c.id != CombatantId(3) && c.id != CombatantId(4)) {
        thinned.insert(c.clone());
    }
    let caster = thinned.get(CombatantId(1)).unwrap();
    let missiles = action("magic_missile");

    assert_eq!(selection_state(&thinned, caster, &missiles, 0), SelectionState::NeedsMoreTargets { remaining: 1 });
    assert_eq!(selection_state(&thinned, caster, &missiles, 1), SelectionState::Ready);
    assert_eq!(
        resolve_targets(&thinned, caster, &missiles, &TargetSelection::single(CombatantId(2))),
        Ok(vec![CombatantId(2)])
    );
}

#[test]
fn declared_range_is_enforced() {
    let roster = skirmish();
    let player = roster.get(CombatantId(0)).unwrap();
    let sword = action("longsword");

    assert_eq!(legal_targets(&roster, player, &sword), vec![CombatantId(2), CombatantId(3)]);
    assert_eq!(
        resolve_targets(&roster, player, &sword, &TargetSelection::single(CombatantId(4))),
        Err(TargetError::OutOfRange { target: "#4".to_string(), distance_ft: 15, range_ft: 5 })
    );
}

#[test]
fn healing_targets_allies_only() {
    let roster = skirmish();
    let cleric = roster.get(CombatantId(1)).unwrap();
    let mut cure = action("cure_wounds");
    cure.range = None;

    assert_eq!(legal_targets(&roster, cleric, &cure), vec![CombatantId(0), CombatantId(1)]);
    assert_eq!(
        resolve_targets(&roster, cleric, &cure, &TargetSelection::single(CombatantId(2))),
        Err(TargetError::WrongFaction(CombatantId(2)))
    );
}
