//! # Undercroft - Multiplayer Text Dungeon Server
//!
//! Undercroft is a small MUD-style server: players telnet (or pipe a socket)
//! into a shared persistent dungeon, pick a pre-made character, and explore,
//! chat, and hoard coins together in real time.
//!
//! ## Features
//!
//! - **Line Protocol**: Plain text commands in, one JSON message per line out.
//!   Trivial to drive from netcat, a GUI client, or a bot.
//! - **Single Game Task**: All world state is owned by one task; commands are
//!   applied strictly in arrival order, so there are no locks and no races.
//! - **Procedural Worlds**: `undercroft init` generates a connected dungeon
//!   with locked doors, keys, scattered trinkets, and wandering ghosts, then
//!   writes it out as plain JSON you can hand-edit.
//! - **Checkout Characters**: A fixed roster instead of accounts. Each
//!   character can be played by at most one connection at a time.
//! - **Write-Behind Persistence**: World snapshots are handed to a background
//!   worker and stored in an embedded sled database; slow disks never stall
//!   the game loop.
//! - **Async Design**: Built on Tokio; a slow or dead client costs one
//!   bounded queue, never a stalled broadcast.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use undercroft::config::Config;
//! use undercroft::game::start_game_server;
//! use undercroft::{net, world};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let def = world::load_world_dir(std::path::Path::new(&config.world.data_dir)).await?;
//!     let handle = start_game_server(def, None, None);
//!     net::serve(&config.server, handle).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - The game core: command parsing, the serialized game task,
//!   presence, and the wire message types
//! - [`world`] - World definition files, validation, and procedural generation
//! - [`net`] - TCP listener and per-connection session plumbing
//! - [`storage`] - Snapshot persistence on sled
//! - [`config`] - TOML configuration loading and defaults
//! - [`metrics`] - Process-wide counters reported at shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │  TCP clients  │ ← text lines in, JSON lines out
//! └───────────────┘
//!         │ one bounded queue per connection
//! ┌───────────────┐
//! │   Game task   │ ← sole owner of rooms, characters, ghosts
//! └───────────────┘
//!         │ snapshots, off the critical path
//! ┌───────────────┐
//! │  Sled store   │ ← world survives restarts
//! └───────────────┘
//! ```

pub mod config;
pub mod game;
pub mod logutil;
pub mod metrics;
pub mod net;
pub mod storage;
pub mod world;
