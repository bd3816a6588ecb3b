use std::{collections::HashMap, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tactics::grid::{GRID_HEIGHT, GRID_WIDTH};
use tactics::targeting::affected_cells;
use tactics::{
    spawn_session, AdMode, AoeShape, AreaOfEffect, CombatEvent, CombatResult, CombatantId, Dice, DiceSpec,
    EffectKind, Encounter, GridPos, SessionError, SessionHandle, TargetSelection,
};
use tactics_cli::{init_logging, load_config, load_content, load_encounter, load_party};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

#[derive(Copy, Clone, ValueEnum)]
enum Adv {
    Normal,
    Advantage,
    Disadvantage,
}

#[derive(Copy, Clone, ValueEnum)]
enum Shape {
    Sphere,
    Cube,
    Line,
    Cone,
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll a d20 (or any XdY) multiple times
    Roll {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Advantage mode (d20 only)
        #[arg(long, value_enum, default_value_t = Adv::Normal)]
        adv: Adv,
        /// Number of rolls
        #[arg(long, default_value_t = 5)]
        rolls: u32,
        /// Roll XdY instead of a d20
        #[arg(long)]
        dice: Option<DiceSpec>,
    },
    /// Draw the cells an area of effect covers on the battle grid
    Aoe {
        #[arg(long, value_enum)]
        shape: Shape,
        /// Radius (sphere) or side (cube) in feet
        #[arg(long)]
        size: u32,
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
    },
    /// List weapons, spells and enemies
    Content {
        /// Directory holding weapons.json, spells.json and bestiary.json
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Dump as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Play an encounter from stdin commands (type `help`)
    Fight {
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
        /// RNG seed (overrides the config)
        #[arg(long)]
        seed: Option<u64>,
        /// AI "thinking" delay in ms (overrides the config)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
}

#[derive(Parser)]
#[command(name = "tactics-cli")]
#[command(about = "Grid combat harness")]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log: String,
    #[command(subcommand)]
    cmd: Cmd,
}

fn to_mode(a: Adv) -> AdMode {
    match a {
        Adv::Normal => AdMode::Normal,
        Adv::Advantage => AdMode::Advantage,
        Adv::Disadvantage => AdMode::Disadvantage,
    }
}

fn to_shape(s: Shape) -> AoeShape {
    match s {
        Shape::Sphere => AoeShape::Sphere,
        Shape::Cube => AoeShape::Cube,
        Shape::Line => AoeShape::Line,
        Shape::Cone => AoeShape::Cone,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);
    match cli.cmd {
        Cmd::Roll { seed, adv, rolls, dice } => {
            let mut rng = Dice::from_seed(seed);
            for _ in 0..rolls {
                match dice {
                    Some(spec) => {
                        let r = rng.roll(spec);
                        println!("{} => {:?} = {}", spec, r.rolls, r.total);
                    }
                    None => println!("{}", rng.d20(to_mode(adv))),
                }
            }
        }
        Cmd::Aoe { shape, size, x, y } => {
            let area = AreaOfEffect { shape: to_shape(shape), size };
            let cells = affected_cells(&area, GridPos::new(x, y))?;
            for row in 0..GRID_HEIGHT {
                let line: String = (0..GRID_WIDTH)
                    .map(|col| {
                        let c = GridPos::new(col, row);
                        if c == GridPos::new(x, y) {
                            'o'
                        } else if cells.contains(&c) {
                            '#'
                        } else {
                            '.'
                        }
                    })
                    .collect();
                println!("{}", line);
            }
            println!("{} cells", cells.len());
        }
        Cmd::Content { dir, json } => {
            let lib = load_content(dir.as_deref())?;
            if json {
                let dump = serde_json::json!({
                    "weapons": lib.weapons().collect::<Vec<_>>(),
                    "spells": lib.spells().collect::<Vec<_>>(),
                    "bestiary": lib.bestiary().collect::<HashMap<_, _>>(),
                });
                println!("{}", serde_json::to_string_pretty(&dump)?);
            } else {
                for a in lib.weapons().chain(lib.spells()) {
                    let effect = match (&a.damage, &a.heal) {
                        (Some(d), _) => format!("{}{:+} {:?}", d.dice, d.bonus, d.damage_type).to_lowercase(),
                        (None, Some(h)) => format!("heal {}{:+}", h.dice, h.bonus),
                        (None, None) => "no effect".to_string(),
                    };
                    let range = a.range.map(|r| format!("{}ft", r)).unwrap_or_else(|| "any".into());
                    println!("{:<14} {:<14} {:<20} range {}", a.id, a.display_name(), effect, range);
                }
                for (kind, e) in lib.bestiary() {
                    println!("{:<14} {:<14} hp {:<3} ac {:<3} xp {}", kind, e.name, e.max_hp, e.armor_class, e.xp);
                }
            }
        }
        Cmd::Fight { encounter, party, content, config, seed, delay_ms } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                cfg.seed = Some(seed);
            }
            if let Some(ms) = delay_ms {
                cfg.ai_delay_ms = ms;
            }
            let data = load_encounter(&encounter)?;
            let party = load_party(party.as_deref())?;
            let lib = load_content(content.as_deref())?;
            let enc = Encounter::builder(std::sync::Arc::new(lib)).config(cfg.clone()).start(&data, &party)?;
            let result = fight(enc, &cfg).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

const HELP: &str = "commands: move X Y | done | act ACTION ID [ID..] | cast ACTION X Y | pass | status | flee";

async fn fight(enc: Encounter, cfg: &tactics::EngineConfig) -> Result<CombatResult> {
    let names: HashMap<CombatantId, String> = enc.roster().iter().map(|c| (c.id, c.name.clone())).collect();
    let (handle, mut done) = spawn_session(enc, cfg);
    let printer = tokio::spawn(print_events(handle.subscribe(), names));
    let mut lines = stdin_lines();
    println!("{}", HELP);

    let result = loop {
        tokio::select! {
            joined = &mut done => break joined?,
            line = lines.recv() => {
                let quit = match line {
                    Some(line) => run_line(&handle, line.trim()).await,
                    None => true,
                };
                if quit {
                    let _ = handle.flee().await;
                    break (&mut done).await?;
                }
            }
        }
    };
    drop(handle);
    let _ = printer.await;
    Ok(result)
}

fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines().map_while(|line| line.ok()) {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_ids(words: &[&str]) -> Option<Vec<CombatantId>> {
    words.iter().map(|w| w.trim_start_matches('#').parse().ok().map(CombatantId)).collect()
}

fn parse_cell(x: &str, y: &str) -> Option<GridPos> {
    Some(GridPos::new(x.parse().ok()?, y.parse().ok()?))
}

/// Returns true when the player wants to leave.
async fn run_line(handle: &SessionHandle, line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    let outcome: Result<(), SessionError> = match words.as_slice() {
        [] => Ok(()),
        ["flee" | "quit"] => return true,
        ["help"] => {
            println!("{}", HELP);
            Ok(())
        }
        ["status"] => handle.snapshot().await.map(|snap| {
            println!("round {} {:?}", snap.round, snap.phase);
            for c in &snap.combatants {
                println!("  {} {:<14} {:>3}/{:<3} at {}", c.id, c.name, c.hp, c.max_hp, c.position);
            }
        }),
        ["move", x, y] => match parse_cell(x, y) {
            Some(to) => handle.move_to(to).await.map(|_| ()),
            None => {
                println!("usage: move X Y");
                Ok(())
            }
        },
        ["done"] => handle.finish_movement().await,
        ["pass"] => handle.pass().await,
        ["act", action, ids @ ..] if !ids.is_empty() => match parse_ids(ids) {
            Some(ids) => handle.act(*action, TargetSelection::Combatants(ids)).await.map(|_| ()),
            None => {
                println!("usage: act ACTION ID [ID..]");
                Ok(())
            }
        },
        ["cast", action, x, y] => match parse_cell(x, y) {
            Some(cell) => handle.act(*action, TargetSelection::Cell(cell)).await.map(|_| ()),
            None => {
                println!("usage: cast ACTION X Y");
                Ok(())
            }
        },
        _ => {
            println!("{}", HELP);
            Ok(())
        }
    };
    if let Err(e) = outcome {
        debug!(error = %e, "command rejected");
        match e {
            SessionError::Closed => println!("combat is over"),
            SessionError::Combat(e) => println!("{}", e.user_message()),
        }
    }
    false
}

async fn print_events(mut events: broadcast::Receiver<CombatEvent>, names: HashMap<CombatantId, String>) {
    let name = |id: &CombatantId| names.get(id).cloned().unwrap_or_else(|| id.to_string());
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                println!("[LOG] {} events dropped", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match event {
            CombatEvent::InitiativeRolled { order } => {
                let list: Vec<String> = order.iter().map(|r| format!("{} {}", name(&r.combatant), r.total)).collect();
                println!("[INIT] {}", list.join(", "));
            }
            CombatEvent::TurnStarted { combatant, round, .. } => {
                println!("[TURN][{}] round {}", name(&combatant), round);
            }
            CombatEvent::TurnSkipped { combatant } => println!("[TURN][{}] is down, skipped", name(&combatant)),
            CombatEvent::CombatantMoved { combatant, from, to } => {
                println!("[MOVE][{}] {} → {}", name(&combatant), from, to);
            }
            CombatEvent::ActionResolved { actor, action, outcomes } => {
                println!("[ACT][{}] {}", name(&actor), action);
                for o in outcomes {
                    let verb = if o.kind == EffectKind::Heal { "heals" } else { "takes" };
                    println!("[HP][{}] {} {} → {} HP", name(&o.target), verb, o.amount, o.hp_after);
                }
            }
            CombatEvent::ActionFailed { actor, .. } => println!("[ACT][{}] action unavailable", name(&actor)),
            CombatEvent::CombatantDefeated { combatant } => println!("[STATE][{}] is defeated", name(&combatant)),
            CombatEvent::EncounterEnded { outcome } => println!("[END] {:?}", outcome),
            CombatEvent::PhaseChanged { .. } => {}
        }
    }
}
