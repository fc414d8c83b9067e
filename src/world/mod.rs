//! World data: on-disk definition files, validation, and procedural
//! generation. Runtime mutation of this data lives in `crate::game`.

pub mod gen;
pub mod loader;
pub mod types;

pub use gen::{default_characters, default_verbs, generate_world, seed_world_dir, GenOptions};
pub use loader::load_world_dir;
pub use types::{
    CharacterTemplate, Direction, ExitDef, GhostDef, ItemDef, RoomDef, WorldDefinition,
    WorldFile, WorldSnapshot, SNAPSHOT_SCHEMA_VERSION,
};
