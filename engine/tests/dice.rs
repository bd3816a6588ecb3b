use tactics::{ability_mod, AdMode, Dice, DiceParseError, DiceSpec};

#[test]
fn seeded_dice_replay_exactly() {
    let mut a = Dice::from_seed(2025);
    let mut b = Dice::from_seed(2025);
    let xs: Vec<u32> = (0..32).map(|_| a.die(20)).collect();
    let ys: Vec<u32> = (0..32).map(|_| b.die(20)).collect();
    assert_eq!(xs, ys);
    assert!(xs.iter().all(|r| (1..=20).contains(r)));
}

#[test]
fn roll_total_stays_within_spec_bounds() {
    let mut dice = Dice::from_seed(7);
    let spec: DiceSpec = "3d6".parse().unwrap();
    for _ in 0..200 {
        let roll = dice.roll(spec);
        assert_eq!(roll.rolls.len(), 3);
        assert!(roll.total >= spec.min() && roll.total <= spec.max());
    }
}

#[test]
fn scripted_dice_cycle_and_clamp() {
    let mut dice = Dice::from_scripted(vec![20, 1, 4]);
    // 20 clamps to a d6's top face
    assert_eq!(dice.die(6), 6);
    assert_eq!(dice.die(6), 1);
    assert_eq!(dice.die(6), 4);
    assert_eq!(dice.die(20), 20);

    let mut empty = Dice::from_scripted(vec![]);
    assert_eq!(empty.die(12), 1);
}

#[test]
fn advantage_and_disadvantage_pick_the_right_die() {
    let mut dice = Dice::from_scripted(vec![5, 17]);
    assert_eq!(dice.d20(AdMode::Advantage), 17);
    assert_eq!(dice.d20(AdMode::Disadvantage), 5);
    assert_eq!(dice.d20(AdMode::Normal), 5);
}

#[test]
fn dice_spec_parsing() {
    assert_eq!("2d8".parse::<DiceSpec>(), Ok(DiceSpec::new(2, 8)));
    assert_eq!("d6".parse::<DiceSpec>(), Ok(DiceSpec::new(1, 6)));
    assert_eq!(" 8D6 ".parse::<DiceSpec>(), Ok(DiceSpec::new(8, 6)));
    assert!(matches!("2x6".parse::<DiceSpec>(), Err(DiceParseError::Malformed(_))));
    assert!(matches!("0d6".parse::<DiceSpec>(), Err(DiceParseError::OutOfRange(_))));
    assert!(matches!("1d1".parse::<DiceSpec>(), Err(DiceParseError::OutOfRange(_))));
    assert!(matches!("100000d100000".parse::<DiceSpec>(), Err(DiceParseError::OutOfRange(_))));
    assert!(matches!("1d4294967295".parse::<DiceSpec>(), Err(DiceParseError::OutOfRange(_))));
    assert_eq!("100d1000".parse::<DiceSpec>(), Ok(DiceSpec::new(100, 1000)));
    assert_eq!(DiceSpec::new(4, 10).to_string(), "4d10");
}

#[test]
fn dice_spec_reads_from_json_strings() {
    let spec: DiceSpec = serde_json::from_str("\"1d12\"").unwrap();
    assert_eq!(spec, DiceSpec::new(1, 12));
    assert!(serde_json::from_str::<DiceSpec>("\"twelve\"").is_err());
}

#[test]
fn ability_mod_floors() {
    assert_eq!(ability_mod(10), 0);
    assert_eq!(ability_mod(11), 0);
    assert_eq!(ability_mod(9), -1);
    assert_eq!(ability_mod(1), -5);
    assert_eq!(ability_mod(20), 5);
}

#[test]
fn huge_dice_saturate_instead_of_wrapping() {
    let spec = DiceSpec::new(100_000, 100_000);
    assert_eq!(spec.max(), i32::MAX);

    let mut dice = Dice::from_scripted(vec![3_000_000_000]);
    let roll = dice.roll(DiceSpec::new(1, u32::MAX));
    assert_eq!(roll.rolls, vec![3_000_000_000]);
    assert_eq!(roll.total, i32::MAX);
}
