//! Game coordination: commands, sessions, presence and the single game task.
//!
//! Everything stateful lives behind [server::GameHandle]; the submodules are
//! the pieces the game task is assembled from. Connection code should only
//! need the handle, [protocol::ServerMessage] and the error type.

pub mod command;
pub mod engine;
pub mod errors;
pub mod messaging;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod state;

pub use engine::{GameCore, GameStats, LoginReply};
pub use errors::GameError;
pub use presence::OUTBOUND_QUEUE_DEPTH;
pub use protocol::{
    CharacterSummary, InventoryView, ItemRef, OnlinePlayer, RoomView, ServerMessage,
};
pub use server::{start_game_server, start_ghost_ticker, GameHandle};
