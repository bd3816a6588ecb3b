use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tactics::{
    AiStrategy, CombatOutcome, CombatantKind, ContentLibrary, Dice, Encounter, EncounterData, EngineConfig, NearestFoe,
    PartySheet,
};
use tactics_cli::{init_logging, load_config, load_content, load_encounter, load_party};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "simulate")]
#[command(about = "Monte Carlo sim: many unattended runs of one encounter")]
struct Args {
    /// Built-in encounter id or path to encounter JSON
    #[arg(long, default_value = "goblin_ambush")]
    encounter: String,

    /// Party JSON (defaults to the built-in party)
    #[arg(long)]
    party: Option<PathBuf>,

    /// Content directory (defaults to built-in content)
    #[arg(long)]
    content: Option<PathBuf>,

    /// Engine config, YAML or JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of trials
    #[arg(long, default_value_t = 200)]
    trials: u32,

    /// Safety cap on rounds per trial (overrides the config)
    #[arg(long)]
    max_rounds: Option<u32>,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log: String,
}

struct Trial {
    outcome: CombatOutcome,
    rounds: u32,
    xp: u32,
    player_hp: i32,
}

/// Plays one encounter to the end, with the player driven by the same
/// strategy as everyone else.
fn run_trial(
    lib: &Arc<ContentLibrary>,
    data: &EncounterData,
    party: &PartySheet,
    cfg: &EngineConfig,
    seed: u64,
) -> Result<Trial> {
    let max_rounds = cfg.max_rounds;
    let mut enc = Encounter::builder(lib.clone())
        .config(cfg.clone())
        .dice(Dice::from_seed(seed))
        .start(data, party)?;
    let pilot = NearestFoe;

    while !enc.phase().is_terminal() {
        if enc.round() > max_rounds {
            debug!(seed, "round cap reached");
            enc.force_end();
            break;
        }
        if let Some((_, token)) = enc.pending_ai_turn() {
            enc.run_ai_turn(token)?;
            continue;
        }
        let Some(turn) = enc.current_turn() else { break };
        let decision = pilot.choose_action(&enc.view(), turn.combatant);
        let acted = match decision {
            Some(d) => enc.player_action(&d.action_id, &d.target).is_ok(),
            None => false,
        };
        if !acted && enc.phase().awaits_player() {
            enc.pass_turn()?;
        }
    }

    let result = enc.force_end();
    let player_hp = result
        .surviving_combatants
        .iter()
        .find(|c| c.kind == CombatantKind::Player)
        .map(|c| c.hp)
        .unwrap_or(0);
    Ok(Trial { outcome: result.outcome, rounds: result.rounds, xp: result.total_experience_gained, player_hp })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log);

    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(cap) = args.max_rounds {
        cfg.max_rounds = cap;
    }
    let data = load_encounter(&args.encounter)?;
    let party = load_party(args.party.as_deref())?;
    let lib = Arc::new(load_content(args.content.as_deref())?);

    let mut trials = Vec::with_capacity(args.trials as usize);
    for i in 0..args.trials {
        trials.push(run_trial(&lib, &data, &party, &cfg, args.seed.wrapping_add(i as u64))?);
    }
    info!(trials = trials.len(), "simulation finished");

    let count = |o: CombatOutcome| trials.iter().filter(|t| t.outcome == o).count();
    let (wins, losses, capped) = (count(CombatOutcome::Victory), count(CombatOutcome::Defeat), count(CombatOutcome::Ended));
    let won: Vec<&Trial> = trials.iter().filter(|t| t.outcome == CombatOutcome::Victory).collect();

    let mut rounds: Vec<u32> = won.iter().map(|t| t.rounds).collect();
    rounds.sort_unstable();
    let pct = |n: usize| if trials.is_empty() { 0.0 } else { n as f64 * 100.0 / trials.len() as f64 };
    let mean = |xs: &[f64]| if xs.is_empty() { 0.0 } else { xs.iter().sum::<f64>() / xs.len() as f64 };
    let avg_rounds = mean(&rounds.iter().map(|&r| r as f64).collect::<Vec<_>>());
    let avg_hp = mean(&won.iter().map(|t| t.player_hp as f64).collect::<Vec<_>>());
    let avg_xp = mean(&trials.iter().map(|t| t.xp as f64).collect::<Vec<_>>());
    let median_rounds = if rounds.is_empty() {
        0
    } else {
        let m = rounds.len() / 2;
        if rounds.len() % 2 == 1 { rounds[m] } else { (rounds[m - 1] + rounds[m]) / 2 }
    };

    println!("simulate results");
    println!("----------------");
    println!("trials:             {}", args.trials);
    println!("encounter:          {}", args.encounter);
    println!("player:             {}", party.player.name);
    println!();
    println!("win rate:           {:.1}%", pct(wins));
    println!("loss rate:          {:.1}%", pct(losses));
    println!("hit round cap:      {:.1}%", pct(capped));
    println!("avg rounds (wins):  {:.2}", avg_rounds);
    println!("median rounds:      {}", median_rounds);
    println!("avg player hp left: {:.2}", avg_hp);
    println!("avg xp per trial:   {:.2}", avg_xp);

    Ok(())
}
