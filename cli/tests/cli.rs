use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("tactics-cli").unwrap()
}

#[test]
fn roll_is_seeded() {
    let first = cli().args(["roll", "--seed", "9", "--rolls", "4"]).assert().success();
    let out = String::from_utf8(first.get_output().stdout.clone()).unwrap();
    let rolls: Vec<u32> = out.lines().map(|l| l.trim().parse().unwrap()).collect();
    assert_eq!(rolls.len(), 4);
    assert!(rolls.iter().all(|r| (1..=20).contains(r)));

    cli().args(["roll", "--seed", "9", "--rolls", "4"]).assert().success().stdout(out);
}

#[test]
fn roll_accepts_dice_specs() {
    cli()
        .args(["roll", "--dice", "2d6", "--rolls", "1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2d6 => ["));

    cli().args(["roll", "--dice", "2x6"]).assert().failure();
}

#[test]
fn aoe_draws_the_sphere() {
    cli()
        .args(["aoe", "--shape", "sphere", "--size", "10", "--x", "3", "--y", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".##o##..").and(predicate::str::contains("13 cells")));
}

#[test]
fn aoe_rejects_cones() {
    cli()
        .args(["aoe", "--shape", "cone", "--size", "15", "--x", "0", "--y", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn content_lists_builtins() {
    cli()
        .arg("content")
        .assert()
        .success()
        .stdout(predicate::str::contains("fireball").and(predicate::str::contains("Goblin")));
}

#[test]
fn fleeing_a_fight_reports_ended() {
    cli()
        .args(["fight", "--seed", "4", "--delay-ms", "10000"])
        .write_stdin("status\nflee\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"ended\"").and(predicate::str::contains("[INIT]")));
}

#[test]
fn simulate_prints_a_summary() {
    Command::cargo_bin("simulate")
        .unwrap()
        .args(["--trials", "5", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("win rate:"));
}
