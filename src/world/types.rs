use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

pub const DEFAULT_COINS_TEMPLATE: &str = "You see {coinCount} gold coin(s) scattered about.";
pub const DEFAULT_EMPTY_COINS_TEMPLATE: &str = "You see no coins here.";
pub const DEFAULT_CHARACTERS_TEMPLATE: &str = "{names} are here.";

/// Cardinal movement directions. Ordering drives exit listings (N/S/E/W).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Accepts the full word or its single-letter alias, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Unit offset on a map grid where y grows southward.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exit in world data: either a bare target room id or a full record
/// carrying a lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExitDef {
    Plain(String),
    #[serde(rename_all = "camelCase")]
    Detailed {
        target: String,
        #[serde(default)]
        locked: bool,
        #[serde(default)]
        key_id: Option<String>,
    },
}

impl ExitDef {
    pub fn target(&self) -> &str {
        match self {
            ExitDef::Plain(target) => target,
            ExitDef::Detailed { target, .. } => target,
        }
    }

    pub fn locked(&self) -> bool {
        match self {
            ExitDef::Plain(_) => false,
            ExitDef::Detailed { locked, .. } => *locked,
        }
    }

    pub fn key_id(&self) -> Option<&str> {
        match self {
            ExitDef::Plain(_) => None,
            ExitDef::Detailed { key_id, .. } => key_id.as_deref(),
        }
    }
}

/// Per-room narration templates. `{coinCount}` and `{names}` are the only
/// placeholders the composer substitutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomAppearance {
    #[serde(default = "default_coins_template")]
    pub coins_template: String,
    #[serde(default = "default_empty_coins_template")]
    pub empty_coins_template: String,
    #[serde(default = "default_characters_template")]
    pub characters_template: String,
}

fn default_coins_template() -> String {
    DEFAULT_COINS_TEMPLATE.to_string()
}

fn default_empty_coins_template() -> String {
    DEFAULT_EMPTY_COINS_TEMPLATE.to_string()
}

fn default_characters_template() -> String {
    DEFAULT_CHARACTERS_TEMPLATE.to_string()
}

impl Default for RoomAppearance {
    fn default() -> Self {
        Self {
            coins_template: default_coins_template(),
            empty_coins_template: default_empty_coins_template(),
            characters_template: default_characters_template(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoinSpec {
    #[serde(default)]
    pub initial: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomDef {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: BTreeMap<Direction, ExitDef>,
    #[serde(default)]
    pub coins: CoinSpec,
    #[serde(default)]
    pub appearance: RoomAppearance,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub key_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GhostDef {
    pub room_id: String,
    pub description: String,
}

/// A playable identity. At most one live session may hold it at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CharacterTemplate {
    pub id: String,
    pub name: String,
    pub short_description: String,
    pub long_description: String,
    pub starting_room: String,
    pub appearance_in_room: String,
}

/// On-disk shape of `world.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldFile {
    #[serde(default)]
    pub world_name: Option<String>,
    pub rooms: Vec<RoomDef>,
    #[serde(default)]
    pub items: BTreeMap<String, ItemDef>,
    #[serde(default)]
    pub ghosts: BTreeMap<String, GhostDef>,
}

/// On-disk shape of `characters.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharactersFile {
    pub characters: Vec<CharacterTemplate>,
}

/// On-disk shape of `verbs.json`. Emotes are bare verb names; the handler
/// is generic over them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerbsFile {
    #[serde(default)]
    pub emotes: Vec<String>,
}

/// Validated, immutable world data. Built once at startup; everything that
/// changes at runtime lives in `WorldState`.
#[derive(Debug, Clone)]
pub struct WorldDefinition {
    pub world_name: String,
    pub rooms: BTreeMap<String, RoomDef>,
    /// First room in file order; fallback spawn for stale saves.
    pub first_room: String,
    pub items: BTreeMap<String, ItemDef>,
    pub ghosts: BTreeMap<String, GhostDef>,
    pub characters: Vec<CharacterTemplate>,
    pub emotes: BTreeSet<String>,
}

impl WorldDefinition {
    pub fn room(&self, id: &str) -> Option<&RoomDef> {
        self.rooms.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn character(&self, id: &str) -> Option<&CharacterTemplate> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn is_emote(&self, verb: &str) -> bool {
        self.emotes.contains(verb)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSave {
    pub coins: u32,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterSave {
    pub room_id: String,
    pub coins: u32,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GhostSave {
    pub room_id: String,
}

/// Point-in-time copy of all mutable world state, built at the
/// serialization boundary and persisted off the critical path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    pub schema_version: u8,
    pub saved_at: DateTime<Utc>,
    pub rooms: BTreeMap<String, RoomSave>,
    pub characters: BTreeMap<String, CharacterSave>,
    pub ghosts: BTreeMap<String, GhostSave>,
}

impl WorldSnapshot {
    pub fn new() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            saved_at: Utc::now(),
            rooms: BTreeMap::new(),
            characters: BTreeMap::new(),
            ghosts: BTreeMap::new(),
        }
    }
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
