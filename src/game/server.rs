//! The single game task and its handle.
//!
//! All world access funnels through one spawned task that owns [GameCore];
//! connections talk to it through [GameHandle]. Requests are applied in
//! arrival order, which is the whole concurrency story: two players grabbing
//! the same coin pile are just two `Command` requests, and the second one
//! finds the floor empty.
//!
//! After every request that changed persistable state the task pushes a
//! fresh snapshot to the persistence worker (if one is attached). Pushes are
//! fire-and-forget; the worker coalesces bursts.

use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};

use crate::game::engine::{GameCore, GameStats, LoginReply};
use crate::game::errors::GameError;
use crate::game::protocol::{CharacterSummary, ServerMessage};
use crate::world::types::{WorldDefinition, WorldSnapshot};

/// Seconds before the first ghost movement after startup.
pub const GHOST_WARMUP_SECS: u64 = 3;

pub enum GameRequest {
    AvailableCharacters(oneshot::Sender<Vec<CharacterSummary>>),
    Login {
        character_id: String,
        outbound: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<LoginReply, GameError>>,
    },
    Command {
        character_id: String,
        line: String,
        reply: oneshot::Sender<Vec<ServerMessage>>,
    },
    Logout {
        character_id: String,
    },
    GhostTick,
    Stats(oneshot::Sender<GameStats>),
    Shutdown(oneshot::Sender<WorldSnapshot>),
}

#[derive(Clone, Debug)]
pub struct GameHandle {
    tx: mpsc::UnboundedSender<GameRequest>,
}

impl GameHandle {
    pub async fn available_characters(&self) -> Result<Vec<CharacterSummary>, GameError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(GameRequest::AvailableCharacters(tx))
            .map_err(|_| game_task_gone())?;
        rx.await.map_err(|_| game_task_gone())
    }

    pub async fn login(
        &self,
        character_id: &str,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Result<LoginReply, GameError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(GameRequest::Login {
                character_id: character_id.to_string(),
                outbound,
                reply: tx,
            })
            .map_err(|_| game_task_gone())?;
        rx.await.map_err(|_| game_task_gone())?
    }

    pub async fn command(
        &self,
        character_id: &str,
        line: &str,
    ) -> Result<Vec<ServerMessage>, GameError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(GameRequest::Command {
                character_id: character_id.to_string(),
                line: line.to_string(),
                reply: tx,
            })
            .map_err(|_| game_task_gone())?;
        rx.await.map_err(|_| game_task_gone())
    }

    /// Fire-and-forget; safe to call from connection teardown paths.
    pub fn logout(&self, character_id: &str) {
        let _ = self.tx.send(GameRequest::Logout {
            character_id: character_id.to_string(),
        });
    }

    /// Returns false once the game task is gone, so tickers can stop.
    pub fn ghost_tick(&self) -> bool {
        self.tx.send(GameRequest::GhostTick).is_ok()
    }

    pub async fn stats(&self) -> Result<GameStats, GameError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(GameRequest::Stats(tx))
            .map_err(|_| game_task_gone())?;
        rx.await.map_err(|_| game_task_gone())
    }

    /// Stop the game task and collect the final world snapshot.
    pub async fn shutdown(&self) -> Option<WorldSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(GameRequest::Shutdown(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }
}

fn game_task_gone() -> GameError {
    GameError::Internal("game task unavailable".to_string())
}

/// Spawn the game task and return its handle. `persist` receives a full
/// snapshot after every state-changing request.
pub fn start_game_server(
    def: WorldDefinition,
    prior: Option<WorldSnapshot>,
    persist: Option<mpsc::UnboundedSender<WorldSnapshot>>,
) -> GameHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<GameRequest>();
    let handle = GameHandle { tx };

    tokio::spawn(async move {
        let mut core = GameCore::new(def, prior);
        let stats = core.stats();
        info!("game task up: {} rooms, {} ghosts", stats.rooms, stats.ghosts);
        while let Some(request) = rx.recv().await {
            let before = core.change_count();
            match request {
                GameRequest::AvailableCharacters(reply) => {
                    let _ = reply.send(core.available_characters());
                }
                GameRequest::Login {
                    character_id,
                    outbound,
                    reply,
                } => {
                    let result = core.login(&character_id, outbound);
                    queue_save(&persist, &core, before);
                    let _ = reply.send(result);
                }
                GameRequest::Command {
                    character_id,
                    line,
                    reply,
                } => {
                    let messages = core.execute(&character_id, &line);
                    queue_save(&persist, &core, before);
                    let _ = reply.send(messages);
                }
                GameRequest::Logout { character_id } => {
                    core.logout(&character_id);
                    queue_save(&persist, &core, before);
                }
                GameRequest::GhostTick => {
                    core.ghost_tick();
                    queue_save(&persist, &core, before);
                }
                GameRequest::Stats(reply) => {
                    let _ = reply.send(core.stats());
                }
                GameRequest::Shutdown(reply) => {
                    let _ = reply.send(core.snapshot());
                    break;
                }
            }
        }
        debug!("game task terminated");
    });

    handle
}

fn queue_save(
    persist: &Option<mpsc::UnboundedSender<WorldSnapshot>>,
    core: &GameCore,
    before: u64,
) {
    if core.change_count() == before {
        return;
    }
    if let Some(tx) = persist {
        if tx.send(core.snapshot()).is_err() {
            warn!("persistence worker unavailable; snapshot not queued");
        }
    }
}

/// Wake the ghosts every `min_secs..=max_secs` seconds, after a short
/// warmup. The ticker ends itself once the game task shuts down.
pub fn start_ghost_ticker(handle: GameHandle, min_secs: u64, max_secs: u64) {
    let (low, high) = if min_secs <= max_secs {
        (min_secs, max_secs)
    } else {
        (max_secs, min_secs)
    };
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(GHOST_WARMUP_SECS)).await;
        loop {
            if !handle.ghost_tick() {
                break;
            }
            let wait = rand::thread_rng().gen_range(low..=high);
            tokio::time::sleep(Duration::from_secs(wait)).await;
        }
        debug!("ghost ticker terminated");
    });
}
