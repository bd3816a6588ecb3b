//! Async combat session.
//!
//! A single task owns the [`Encounter`]. Player commands arrive over an mpsc
//! channel with oneshot replies; automated turns run after a configurable
//! delay. Leaving an automated phase (or ending combat) drops the pending
//! deadline, and any timer that still fires carries a stale [`TurnToken`].

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::combatant::GridPos;
use crate::config::EngineConfig;
use crate::encounter::{CombatError, CombatResult, CombatantSummary, Encounter};
use crate::events::CombatEvent;
use crate::phase::CombatPhase;
use crate::resolver::TargetOutcome;
use crate::scheduler::{TurnEntry, TurnToken};
use crate::targeting::TargetSelection;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("combat session is closed")]
    Closed,
    #[error(transparent)]
    Combat(#[from] CombatError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Point-in-time view of a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: CombatPhase,
    pub round: u32,
    pub current: Option<TurnEntry>,
    pub turn_start: Option<GridPos>,
    pub combatants: Vec<CombatantSummary>,
}

enum Command {
    Move {
        to: GridPos,
        reply: oneshot::Sender<Result<GridPos, CombatError>>,
    },
    FinishMovement {
        reply: oneshot::Sender<Result<(), CombatError>>,
    },
    Act {
        action: String,
        target: TargetSelection,
        reply: oneshot::Sender<Result<Vec<TargetOutcome>, CombatError>>,
    },
    Pass {
        reply: oneshot::Sender<Result<(), CombatError>>,
    },
    Flee {
        reply: oneshot::Sender<CombatResult>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Cheap, cloneable front end to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<CombatEvent>,
}

impl SessionHandle {
    /// Events published after this call. Earlier events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.events.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> SessionResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(build(tx)).await.map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn move_to(&self, to: GridPos) -> SessionResult<GridPos> {
        Ok(self.request(|reply| Command::Move { to, reply }).await??)
    }

    pub async fn finish_movement(&self) -> SessionResult<()> {
        Ok(self.request(|reply| Command::FinishMovement { reply }).await??)
    }

    pub async fn act(&self, action: impl Into<String>, target: TargetSelection) -> SessionResult<Vec<TargetOutcome>> {
        let action = action.into();
        Ok(self.request(|reply| Command::Act { action, target, reply }).await??)
    }

    pub async fn pass(&self) -> SessionResult<()> {
        Ok(self.request(|reply| Command::Pass { reply }).await??)
    }

    /// Forced retreat. Cancels any pending automated turn.
    pub async fn flee(&self) -> SessionResult<CombatResult> {
        self.request(|reply| Command::Flee { reply }).await
    }

    pub async fn snapshot(&self) -> SessionResult<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }
}

/// Starts the session task. The join handle yields the final result once
/// combat reaches a terminal phase, or once every handle has been dropped.
pub fn spawn_session(encounter: Encounter, config: &EngineConfig) -> (SessionHandle, JoinHandle<CombatResult>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
    let worker = SessionWorker {
        encounter,
        command_rx,
        event_tx: event_tx.clone(),
        ai_delay: config.ai_delay(),
        pending: None,
    };
    let handle = SessionHandle { commands: command_tx, events: event_tx };
    (handle, tokio::spawn(worker.run()))
}

struct SessionWorker {
    encounter: Encounter,
    command_rx: mpsc::Receiver<Command>,
    event_tx: broadcast::Sender<CombatEvent>,
    ai_delay: Duration,
    pending: Option<(TurnToken, Instant)>,
}

impl SessionWorker {
    async fn run(mut self) -> CombatResult {
        loop {
            self.publish();
            self.rearm();
            if let Some(result) = self.encounter.result() {
                info!(outcome = ?result.outcome, "session finished");
                return result;
            }

            let deadline = self.pending.map(|(_, at)| at);
            tokio::select! {
                biased;
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        debug!("all session handles dropped; ending combat");
                        self.pending = None;
                        let result = self.encounter.force_end();
                        self.publish();
                        return result;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((token, _)) = self.pending.take() {
                        self.fire(token);
                    }
                }
            }
        }
    }

    /// Keeps exactly one deadline for the current automated turn, if any.
    fn rearm(&mut self) {
        match self.encounter.pending_ai_turn() {
            Some((_, token)) if self.pending.is_some_and(|(t, _)| t == token) => {}
            Some((combatant, token)) => {
                debug!(%combatant, ?token, delay_ms = self.ai_delay.as_millis() as u64, "automated turn scheduled");
                self.pending = Some((token, Instant::now() + self.ai_delay));
            }
            None => {
                if let Some((token, _)) = self.pending.take() {
                    debug!(?token, "pending automated turn cancelled");
                }
            }
        }
    }

    fn fire(&mut self, token: TurnToken) {
        if let Err(e) = self.encounter.run_ai_turn(token) {
            warn!(error = %e, "automated turn failed");
        }
    }

    fn publish(&mut self) {
        for event in self.encounter.drain_events() {
            // No subscribers is fine.
            let _ = self.event_tx.send(event);
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Move { to, reply } => {
                let _ = reply.send(self.encounter.move_player(to));
            }
            Command::FinishMovement { reply } => {
                let _ = reply.send(self.encounter.finish_movement());
            }
            Command::Act { action, target, reply } => {
                let _ = reply.send(self.encounter.player_action(&action, &target));
            }
            Command::Pass { reply } => {
                let _ = reply.send(self.encounter.pass_turn());
            }
            Command::Flee { reply } => {
                self.pending = None;
                let _ = reply.send(self.encounter.force_end());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.encounter.phase(),
            round: self.encounter.round(),
            current: self.encounter.current_turn(),
            turn_start: self.encounter.turn_start(),
            combatants: self.encounter.roster().iter().map(CombatantSummary::from).collect(),
        }
    }
}
