//! Loading and validation of the world definition files.
//!
//! Three JSON files under the world directory describe everything static:
//! `world.json` (rooms, items, ghosts), `characters.json` (playable
//! characters) and `verbs.json` (the emote vocabulary). Validation happens
//! here, once, so the rest of the crate can treat a [WorldDefinition] as
//! internally consistent: broken cross-references are either fatal (exit to
//! a nowhere room) or logged and dropped (a room listing an unknown item).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use tokio::fs;

use crate::world::types::{CharactersFile, VerbsFile, WorldDefinition, WorldFile};

pub const WORLD_FILE: &str = "world.json";
pub const CHARACTERS_FILE: &str = "characters.json";
pub const VERBS_FILE: &str = "verbs.json";

const DEFAULT_WORLD_NAME: &str = "The Undercroft";

/// Read and validate the three definition files under `data_dir`.
pub async fn load_world_dir(data_dir: &Path) -> Result<WorldDefinition> {
    let world: WorldFile = read_json(&data_dir.join(WORLD_FILE)).await?;
    let characters: CharactersFile = read_json(&data_dir.join(CHARACTERS_FILE)).await?;
    let verbs: VerbsFile = read_json(&data_dir.join(VERBS_FILE)).await?;
    let definition = build_definition(world, characters, verbs)?;
    info!(
        "loaded world '{}': {} rooms, {} items, {} ghosts, {} characters, {} emotes",
        definition.world_name,
        definition.rooms.len(),
        definition.items.len(),
        definition.ghosts.len(),
        definition.characters.len(),
        definition.emotes.len()
    );
    Ok(definition)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Cross-check the parsed files and assemble the immutable definition.
pub fn build_definition(
    world: WorldFile,
    characters: CharactersFile,
    verbs: VerbsFile,
) -> Result<WorldDefinition> {
    let first_room = world
        .rooms
        .first()
        .map(|room| room.id.clone())
        .ok_or_else(|| anyhow!("{} defines no rooms", WORLD_FILE))?;

    let mut rooms = BTreeMap::new();
    for room in world.rooms {
        let id = room.id.clone();
        if id.trim().is_empty() {
            return Err(anyhow!("{} contains a room with an empty id", WORLD_FILE));
        }
        if rooms.insert(id.clone(), room).is_some() {
            return Err(anyhow!("duplicate room id '{}' in {}", id, WORLD_FILE));
        }
    }

    let items = world.items;
    let ghosts = world.ghosts;

    let available_keys: BTreeSet<&str> = items
        .values()
        .filter(|item| item.is_key)
        .filter_map(|item| item.key_id.as_deref())
        .collect();

    for room in rooms.values() {
        for (direction, exit) in &room.exits {
            if !rooms.contains_key(exit.target()) {
                return Err(anyhow!(
                    "room '{}' exit {} leads to unknown room '{}'",
                    room.id,
                    direction,
                    exit.target()
                ));
            }
            if exit.locked() {
                match exit.key_id() {
                    None => {
                        return Err(anyhow!(
                            "room '{}' exit {} is locked but names no key",
                            room.id,
                            direction
                        ));
                    }
                    Some(key_id) if !available_keys.contains(key_id) => {
                        warn!(
                            "no key item opens '{}' (locked exit {} of room '{}')",
                            key_id, direction, room.id
                        );
                    }
                    Some(_) => {}
                }
            }
        }
        for item_id in &room.items {
            if !items.contains_key(item_id) {
                warn!("room '{}' references unknown item '{}'", room.id, item_id);
            }
        }
    }

    for (ghost_id, ghost) in &ghosts {
        if !rooms.contains_key(&ghost.room_id) {
            return Err(anyhow!(
                "ghost '{}' starts in unknown room '{}'",
                ghost_id,
                ghost.room_id
            ));
        }
    }

    if characters.characters.is_empty() {
        return Err(anyhow!("{} defines no playable characters", CHARACTERS_FILE));
    }
    let mut seen_characters = BTreeSet::new();
    for template in &characters.characters {
        if !seen_characters.insert(template.id.clone()) {
            return Err(anyhow!(
                "duplicate character id '{}' in {}",
                template.id,
                CHARACTERS_FILE
            ));
        }
        if !rooms.contains_key(&template.starting_room) {
            warn!(
                "character '{}' starts in unknown room '{}'; will spawn in '{}'",
                template.id, template.starting_room, first_room
            );
        }
    }

    let mut emotes = BTreeSet::new();
    for verb in verbs.emotes {
        let verb = verb.trim().to_lowercase();
        if verb.is_empty() {
            continue;
        }
        if verb.split_whitespace().count() != 1 {
            warn!("ignoring multi-word emote '{}' in {}", verb, VERBS_FILE);
            continue;
        }
        emotes.insert(verb);
    }

    Ok(WorldDefinition {
        world_name: world
            .world_name
            .unwrap_or_else(|| DEFAULT_WORLD_NAME.to_string()),
        rooms,
        first_room,
        items,
        ghosts,
        characters: characters.characters,
        emotes,
    })
}
