use thiserror::Error;

/// User-recoverable command failures. Display strings are exactly what the
/// originating player sees; nothing here is ever broadcast.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("{0}")]
    Usage(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("No one called '{0}' is online.")]
    NotFound(String),

    #[error("'{query}' matches more than one player: {}.", candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    #[error("That character is already being played.")]
    AlreadyInUse(String),

    #[error("No such character: '{0}'.")]
    UnknownCharacter(String),

    #[error("You cannot go that way.")]
    NoSuchExit,

    #[error("The door is locked. You need a key.")]
    ExitLocked,

    #[error("There is no one to reply to.")]
    NoPriorSender,

    #[error("{0} is no longer online.")]
    ReplyGone(String),

    #[error("You cannot {0} yourself.")]
    SelfTarget(&'static str),

    #[error("There are no items to take.")]
    NothingToTake,

    #[error("You don't see that here.")]
    NoSuchItem,

    #[error("internal error: {0}")]
    Internal(String),
}
