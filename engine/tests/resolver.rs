use proptest::prelude::*;
use tactics::resolver::resolve_action;
use tactics::{
    Ability, AbilityScores, ActionTemplate, Combatant, CombatantId, CombatantKind, DamageSpec, DamageType, Dice,
    DiceSpec, EffectKind, GridPos, HealSpec, Roster,
};

fn strike(count: u32, sides: u32, bonus: i32) -> ActionTemplate {
    ActionTemplate {
        damage: Some(DamageSpec {
            dice: DiceSpec::new(count, sides),
            bonus,
            damage_type: DamageType::Piercing,
            ability: None,
        }),
        ..ActionTemplate::inert("strike")
    }
}

fn mend(bonus: i32) -> ActionTemplate {
    ActionTemplate {
        heal: Some(HealSpec { dice: DiceSpec::new(1, 8), bonus, ability: Some(Ability::Wis) }),
        targets_allies: true,
        ..ActionTemplate::inert("mend")
    }
}

fn duo(target_hp: i32, target_max: i32) -> Roster {
    let mut roster = Roster::new();
    let wise = AbilityScores { wis: 16, ..AbilityScores::default() };
    roster.insert(Combatant::new(CombatantId(0), "Hero", CombatantKind::Player, GridPos::new(0, 0), 10, 10, 14, wise));
    roster.insert(Combatant::new(
        CombatantId(1),
        "Target",
        CombatantKind::Enemy,
        GridPos::new(1, 0),
        target_hp,
        target_max,
        12,
        AbilityScores::default(),
    ));
    roster
}

#[test]
fn damage_is_dice_plus_bonus() {
    let mut roster = duo(20, 20);
    let mut dice = Dice::from_scripted(vec![4]);
    let out = resolve_action(&mut dice, &mut roster, CombatantId(0), &strike(1, 6, 2), &[CombatantId(1)]).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind, EffectKind::Damage);
    assert_eq!(out[0].amount, 6);
    assert_eq!(out[0].damage_type, Some(DamageType::Piercing));
    assert_eq!(out[0].hp_after, 14);
    assert!(!out[0].defeated);
    assert_eq!(roster.get(CombatantId(1)).unwrap().hp(), 14);
}

#[test]
fn overkill_clamps_at_zero_and_defeats() {
    let mut roster = duo(3, 7);
    let mut dice = Dice::from_scripted(vec![6]);
    let out = resolve_action(&mut dice, &mut roster, CombatantId(0), &strike(2, 6, 0), &[CombatantId(1)]).unwrap();

    assert_eq!(out[0].hp_after, 0);
    assert!(out[0].defeated);
    assert!(roster.get(CombatantId(1)).unwrap().is_defeated());
}

#[test]
fn heal_adds_ability_modifier_and_caps_at_max() {
    let mut roster = duo(5, 7);
    // the healer heals an enemy here only because resolution trusts its caller
    let mut dice = Dice::from_scripted(vec![1]);
    let out = resolve_action(&mut dice, &mut roster, CombatantId(0), &mend(0), &[CombatantId(1)]).unwrap();

    assert_eq!(out[0].kind, EffectKind::Heal);
    assert_eq!(out[0].amount, 4, "1 on the die plus +3 wisdom");
    assert_eq!(out[0].hp_after, 7);
}

#[test]
fn negative_totals_deal_nothing() {
    let mut roster = duo(10, 10);
    let mut dice = Dice::from_scripted(vec![1]);
    let out = resolve_action(&mut dice, &mut roster, CombatantId(0), &strike(1, 4, -5), &[CombatantId(1)]).unwrap();
    assert_eq!(out[0].amount, 0);
    assert_eq!(out[0].hp_after, 10);
}

#[test]
fn each_target_rolls_separately_and_missing_ones_are_skipped() {
    let mut roster = duo(30, 30);
    roster.insert(Combatant::new(
        CombatantId(2),
        "Other",
        CombatantKind::Enemy,
        GridPos::new(2, 0),
        30,
        30,
        12,
        AbilityScores::default(),
    ));
    let mut dice = Dice::from_scripted(vec![2, 5]);
    let targets = [CombatantId(1), CombatantId(9), CombatantId(2)];
    let out = resolve_action(&mut dice, &mut roster, CombatantId(0), &strike(1, 6, 0), &targets).unwrap();

    let amounts: Vec<(CombatantId, i32)> = out.iter().map(|o| (o.target, o.amount)).collect();
    assert_eq!(amounts, vec![(CombatantId(1), 2), (CombatantId(2), 5)]);
}

#[test]
fn inert_actions_change_nothing() {
    let mut roster = duo(6, 10);
    let mut dice = Dice::from_seed(1);
    let out = resolve_action(&mut dice, &mut roster, CombatantId(0), &ActionTemplate::inert("void"), &[CombatantId(1)])
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(roster.get(CombatantId(1)).unwrap().hp(), 6);
}

proptest! {
    #[test]
    fn hp_never_leaves_its_bounds(
        max_hp in 1i32..60,
        start in 0i32..60,
        script in proptest::collection::vec(1u32..=12, 1..8),
        steps in proptest::collection::vec((any::<bool>(), -6i32..12), 1..20),
    ) {
        let mut roster = duo(start.min(max_hp), max_hp);
        let mut dice = Dice::from_scripted(script);
        for (heal, bonus) in steps {
            let action = if heal { mend(bonus) } else { strike(2, 6, bonus) };
            let out = resolve_action(&mut dice, &mut roster, CombatantId(0), &action, &[CombatantId(1)]).unwrap();
            prop_assert!(out.iter().all(|o| o.amount >= 0));
            let hp = roster.get(CombatantId(1)).unwrap().hp();
            prop_assert!((0..=max_hp).contains(&hp));
        }
    }
}
