//! Text command grammar.
//!
//! One line of player input becomes one [Command]. Movement accepts both
//! `go <direction>` and bare direction words with single-letter aliases.
//! Slash-prefixed verbs are either the three messaging commands or an emote;
//! emote verbs are validated against the world vocabulary later, at execute
//! time, because the parser is deliberately world-blind.

use crate::game::errors::GameError;
use crate::world::types::Direction;

pub const TELL_USAGE: &str = "Usage: /tell <name|all> <message>";
pub const YELL_USAGE: &str = "Usage: /yell <name|all> <message>";
pub const REPLY_USAGE: &str = "Usage: /reply <message>";
pub const GO_USAGE: &str = "Specify a direction (north/south/east/west).";
pub const EMOTE_USAGE: &str = "Specify an emote, e.g. /sneeze.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Blank input; produces no output at all.
    Noop,
    Go(Direction),
    Look,
    Collect,
    Drop,
    Take(Option<String>),
    /// Lowercased emote verb, not yet checked against the vocabulary.
    Emote(String),
    Tell { target: String, text: String },
    Yell { target: String, text: String },
    Reply(String),
}

pub fn parse(line: &str) -> Result<Command, GameError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Noop);
    }

    if let Some(rest) = line.strip_prefix('/') {
        return parse_slash(rest.trim_start());
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    match verb.as_str() {
        "go" => {
            let token = args
                .first()
                .ok_or_else(|| GameError::Usage(GO_USAGE.to_string()))?;
            let direction = Direction::parse(token).ok_or(GameError::NoSuchExit)?;
            Ok(Command::Go(direction))
        }
        "look" => Ok(Command::Look),
        "collect" => Ok(Command::Collect),
        "drop" => Ok(Command::Drop),
        "take" => Ok(Command::Take(if args.is_empty() {
            None
        } else {
            Some(args.join(" "))
        })),
        _ => {
            // Bare direction words move, but only without trailing words.
            if args.is_empty() {
                if let Some(direction) = Direction::parse(&verb) {
                    return Ok(Command::Go(direction));
                }
            }
            Err(GameError::UnknownCommand(verb))
        }
    }
}

fn parse_slash(rest: &str) -> Result<Command, GameError> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default().to_lowercase();
    let remainder = parts.next().map(str::trim).unwrap_or_default();

    if verb.is_empty() {
        return Err(GameError::Usage(EMOTE_USAGE.to_string()));
    }

    match verb.as_str() {
        "tell" => parse_directed(remainder, TELL_USAGE, true),
        "yell" => parse_directed(remainder, YELL_USAGE, false),
        "reply" => {
            if remainder.is_empty() {
                Err(GameError::Usage(REPLY_USAGE.to_string()))
            } else {
                Ok(Command::Reply(remainder.to_string()))
            }
        }
        // Anything after the emote verb is tolerated and discarded.
        _ => Ok(Command::Emote(verb)),
    }
}

fn parse_directed(remainder: &str, usage: &str, is_tell: bool) -> Result<Command, GameError> {
    let mut parts = remainder.splitn(2, char::is_whitespace);
    let target = parts.next().unwrap_or_default().trim();
    let text = parts.next().map(str::trim).unwrap_or_default();
    if target.is_empty() || text.is_empty() {
        return Err(GameError::Usage(usage.to_string()));
    }
    if is_tell {
        Ok(Command::Tell {
            target: target.to_string(),
            text: text.to_string(),
        })
    } else {
        Ok(Command::Yell {
            target: target.to_string(),
            text: text.to_string(),
        })
    }
}
