//! Procedural world generation.
//!
//! Builds a connected random dungeon: a degree-constrained random graph
//! (most rooms get two exits, a few get one or three), compass directions
//! assigned pairwise so every exit has a matching opposite on the far side,
//! roughly one in ten doors locked behind a generated key item, and loose
//! items and ghosts scattered over the rooms.
//!
//! Generation runs only from `init`: the result is written out as ordinary
//! world files, so operators can hand-edit what the generator produced and
//! the server itself never regenerates anything.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::fs;

use crate::world::loader::{CHARACTERS_FILE, VERBS_FILE, WORLD_FILE};
use crate::world::types::{
    CharacterTemplate, CharactersFile, CoinSpec, Direction, ExitDef, GhostDef, ItemDef,
    RoomAppearance, RoomDef, VerbsFile, WorldFile,
};

const ROOM_ADJECTIVES: [&str; 10] = [
    "Dusty", "Echoing", "Shadowed", "Dripping", "Cracked", "Twisting", "Silent", "Icy",
    "Stifling", "Gloomy",
];

const ROOM_NOUNS: [&str; 10] = [
    "Hall",
    "Cellar",
    "Antechamber",
    "Vault",
    "Passage",
    "Gallery",
    "Crypt",
    "Cavern",
    "Library",
    "Guardroom",
];

const GENERIC_ITEM_DESCRIPTIONS: [&str; 16] = [
    "a tarnished silver ring",
    "a cracked emerald amulet",
    "a small brass compass",
    "a rune-etched stone",
    "a faded leather bookmark",
    "a glass vial of swirling mist",
    "a chipped obsidian dagger",
    "a delicate bone flute",
    "a copper coin with a square hole",
    "a fragment of a stained map",
    "a smooth stone painted with an eye",
    "a tiny clockwork beetle",
    "a lock of hair tied with red string",
    "a silver bell that makes no sound",
    "a wax-sealed black envelope",
    "a bronze key-shaped brooch",
];

const GHOST_DESCRIPTIONS: [&str; 4] = [
    "a translucent knight with empty, burning eyes",
    "a tattered-robed specter that drips shadow",
    "a towering phantom crowned in jagged bone",
    "a drifting child-ghost humming a tuneless song",
];

/// Tunables for a generated world.
#[derive(Debug, Clone)]
pub struct GenOptions {
    pub room_count: usize,
    /// Coins per room are drawn uniformly from this inclusive range.
    pub min_coins: u32,
    pub max_coins: u32,
    pub world_name: String,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            room_count: 100,
            min_coins: 0,
            max_coins: 10,
            world_name: "The Undercroft".to_string(),
        }
    }
}

/// Build a procedural world definition in memory.
pub fn generate_world<R: Rng>(options: &GenOptions, rng: &mut R) -> WorldFile {
    let room_count = options.room_count.max(1);
    let degrees = degree_plan(room_count);

    let mut edges = build_random_graph(room_count, &degrees, rng);
    let exit_targets = match (0..16).find_map(|_| assign_directions(room_count, &edges, rng)) {
        Some(targets) => targets,
        None => {
            // No conflict-free compass layout found; degrade to a corridor.
            edges = chain_edges(room_count);
            chain_exit_targets(room_count)
        }
    };

    let locked_target = (room_count / 10).max(1).min(edges.len());
    let all_edges: Vec<(usize, usize)> = edges.iter().copied().collect();
    let locked_keys: BTreeMap<(usize, usize), String> = all_edges
        .choose_multiple(rng, locked_target)
        .copied()
        .enumerate()
        .map(|(index, edge)| (edge, format!("key_{}", index)))
        .collect();

    let low = options.min_coins.min(options.max_coins);
    let high = options.min_coins.max(options.max_coins);

    let mut rooms: Vec<RoomDef> = (0..room_count)
        .map(|index| {
            let adjective = ROOM_ADJECTIVES[index % ROOM_ADJECTIVES.len()];
            let noun = ROOM_NOUNS[index % ROOM_NOUNS.len()];
            let exits = exit_targets[index]
                .iter()
                .map(|(direction, &target)| {
                    let pair = if index < target {
                        (index, target)
                    } else {
                        (target, index)
                    };
                    let key_id = locked_keys.get(&pair).cloned();
                    (
                        *direction,
                        ExitDef::Detailed {
                            target: format!("room_{}", target),
                            locked: key_id.is_some(),
                            key_id,
                        },
                    )
                })
                .collect();
            RoomDef {
                id: format!("room_{}", index),
                name: format!("{} {}", adjective, noun),
                description: format!(
                    "A {} {} carved from damp stone. Faint echoes hint at unseen passages.",
                    adjective.to_lowercase(),
                    noun.to_lowercase()
                ),
                exits,
                coins: CoinSpec {
                    initial: rng.gen_range(low..=high),
                },
                appearance: RoomAppearance::default(),
                items: Vec::new(),
            }
        })
        .collect();

    let total_items = (room_count / 3).max(1);
    let num_keys = locked_keys.len().min(total_items);
    let num_generic = total_items - num_keys;

    let mut items = BTreeMap::new();
    for index in 0..num_keys {
        let key_id = format!("key_{}", index);
        items.insert(
            key_id.clone(),
            ItemDef {
                name: format!("Strange Key #{}", index + 1),
                description: "a heavy iron key with jagged teeth".to_string(),
                is_key: true,
                key_id: Some(key_id),
            },
        );
    }
    for index in 0..num_generic {
        let description = GENERIC_ITEM_DESCRIPTIONS[index % GENERIC_ITEM_DESCRIPTIONS.len()];
        items.insert(
            format!("item_{}", index),
            ItemDef {
                name: description.to_string(),
                description: description.to_string(),
                is_key: false,
                key_id: None,
            },
        );
    }

    // One item per room, keys first, over a shuffled room order.
    let mut placement: Vec<usize> = (0..room_count).collect();
    placement.shuffle(rng);
    let mut cursor = 0usize;
    for index in 0..num_keys {
        if cursor >= placement.len() {
            break;
        }
        rooms[placement[cursor]].items.push(format!("key_{}", index));
        cursor += 1;
    }
    for index in 0..num_generic {
        if cursor >= placement.len() {
            break;
        }
        rooms[placement[cursor]].items.push(format!("item_{}", index));
        cursor += 1;
    }

    let ghost_count = (room_count / 30).max(1).min(3);
    let mut ghosts = BTreeMap::new();
    for index in 0..ghost_count {
        let room_index = rng.gen_range(0..room_count);
        ghosts.insert(
            format!("ghost_{}", index),
            GhostDef {
                room_id: format!("room_{}", room_index),
                description: GHOST_DESCRIPTIONS[index % GHOST_DESCRIPTIONS.len()].to_string(),
            },
        );
    }

    WorldFile {
        world_name: Some(options.world_name.clone()),
        rooms,
        items,
        ghosts,
    }
}

/// Starter character roster for a freshly seeded world.
pub fn default_characters() -> CharactersFile {
    let template = |id: &str, name: &str, short: &str, long: &str, appearance: &str| {
        CharacterTemplate {
            id: id.to_string(),
            name: name.to_string(),
            short_description: short.to_string(),
            long_description: long.to_string(),
            starting_room: "room_0".to_string(),
            appearance_in_room: appearance.to_string(),
        }
    };
    CharactersFile {
        characters: vec![
            template(
                "char_bob",
                "Bob the Brave",
                "A stout adventurer with a dented shield.",
                "Bob has marched into every dungeon within a week's ride and walked back \
                 out whistling. The shield dents are all from doors.",
                "{name} stands here, shield at the ready.",
            ),
            template(
                "char_boris",
                "Boris the Bold",
                "A wiry duelist who grins too much.",
                "Boris claims to fear nothing underground. The grin suggests otherwise.",
                "{name} leans against the wall, grinning.",
            ),
            template(
                "char_lina",
                "Lina the Quiet",
                "A soft-footed scout wrapped in gray.",
                "Nobody hears Lina arrive. Most never hear her leave either.",
                "{name} watches from the shadows.",
            ),
            template(
                "char_torin",
                "Torin the Swift",
                "A restless runner with patched boots.",
                "Torin maps corridors by running them. The boots are on their fourth soles.",
                "{name} paces back and forth.",
            ),
        ],
    }
}

/// Starter emote vocabulary for a freshly seeded world.
pub fn default_verbs() -> VerbsFile {
    VerbsFile {
        emotes: [
            "dance", "laugh", "sneeze", "wave", "bow", "cheer", "yawn", "sigh", "twirl",
            "stretch",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
}

/// Write any missing definition files under `dir`. Existing files are left
/// alone, so re-running init never clobbers a hand-edited world. Returns
/// true when at least one file was created.
pub async fn seed_world_dir(dir: &Path, options: &GenOptions) -> Result<bool> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create world directory {}", dir.display()))?;

    let mut wrote = false;

    let world_path = dir.join(WORLD_FILE);
    if !fs::try_exists(&world_path).await? {
        let world = generate_world(options, &mut rand::thread_rng());
        write_json(&world_path, &world).await?;
        info!(
            "generated {} with {} rooms",
            world_path.display(),
            world.rooms.len()
        );
        wrote = true;
    }

    let characters_path = dir.join(CHARACTERS_FILE);
    if !fs::try_exists(&characters_path).await? {
        write_json(&characters_path, &default_characters()).await?;
        info!("wrote starter roster to {}", characters_path.display());
        wrote = true;
    }

    let verbs_path = dir.join(VERBS_FILE);
    if !fs::try_exists(&verbs_path).await? {
        write_json(&verbs_path, &default_verbs()).await?;
        info!("wrote emote vocabulary to {}", verbs_path.display());
        wrote = true;
    }

    Ok(wrote)
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Target exit counts per room: 80% get two, 10% one, the rest three, with
/// one degree bumped if the total comes out odd (edges need an even sum).
fn degree_plan(room_count: usize) -> Vec<usize> {
    let num_one = room_count / 10;
    let mut num_two = room_count * 8 / 10;
    if num_one + num_two > room_count {
        num_two = room_count - num_one;
    }
    let num_three = room_count - num_one - num_two;

    let mut degrees = vec![2usize; num_two];
    degrees.extend(std::iter::repeat(1).take(num_one));
    degrees.extend(std::iter::repeat(3).take(num_three));

    if degrees.iter().sum::<usize>() % 2 == 1 {
        if let Some(first) = degrees.iter_mut().find(|d| **d < 3) {
            *first += 1;
        }
    }
    degrees
}

/// Random connected graph honoring `degrees`, built by repeated pairing
/// attempts. Falls back to a simple corridor when the dice refuse.
fn build_random_graph<R: Rng>(
    room_count: usize,
    degrees: &[usize],
    rng: &mut R,
) -> BTreeSet<(usize, usize)> {
    if room_count <= 1 {
        return BTreeSet::new();
    }

    const MAX_ATTEMPTS: usize = 64;
    for _ in 0..MAX_ATTEMPTS {
        let mut remaining = degrees.to_vec();
        let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); room_count];
        let mut failed = false;

        loop {
            let candidates: Vec<usize> = (0..room_count).filter(|i| remaining[*i] > 0).collect();
            let u = match candidates.choose(rng) {
                Some(u) => *u,
                None => break,
            };
            let possible: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|v| *v != u && !adjacency[u].contains(v))
                .collect();
            let v = match possible.choose(rng) {
                Some(v) => *v,
                None => {
                    failed = true;
                    break;
                }
            };
            edges.insert(if u < v { (u, v) } else { (v, u) });
            adjacency[u].insert(v);
            adjacency[v].insert(u);
            remaining[u] -= 1;
            remaining[v] -= 1;
        }

        if failed || remaining.iter().any(|d| *d != 0) {
            continue;
        }
        if is_connected(room_count, &edges) {
            return edges;
        }
    }

    chain_edges(room_count)
}

fn is_connected(room_count: usize, edges: &BTreeSet<(usize, usize)>) -> bool {
    if room_count == 0 {
        return true;
    }
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); room_count];
    for &(u, v) in edges {
        adjacency[u].push(v);
        adjacency[v].push(u);
    }
    let mut visited = vec![false; room_count];
    let mut stack = vec![0usize];
    while let Some(node) = stack.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        for &next in &adjacency[node] {
            if !visited[next] {
                stack.push(next);
            }
        }
    }
    visited.into_iter().all(|seen| seen)
}

/// Give every edge a compass pair (an exit plus its opposite on the far
/// side) without reusing a direction at either end. Fails with None when a
/// shuffle paints itself into a corner; the caller retries.
fn assign_directions<R: Rng>(
    room_count: usize,
    edges: &BTreeSet<(usize, usize)>,
    rng: &mut R,
) -> Option<Vec<BTreeMap<Direction, usize>>> {
    let mut dir_pairs = [
        (Direction::North, Direction::South),
        (Direction::South, Direction::North),
        (Direction::East, Direction::West),
        (Direction::West, Direction::East),
    ];
    let mut exits: Vec<BTreeMap<Direction, usize>> = vec![BTreeMap::new(); room_count];
    for &(u, v) in edges {
        dir_pairs.shuffle(rng);
        let fit = dir_pairs
            .iter()
            .find(|(d1, d2)| !exits[u].contains_key(d1) && !exits[v].contains_key(d2))
            .copied();
        match fit {
            Some((d1, d2)) => {
                exits[u].insert(d1, v);
                exits[v].insert(d2, u);
            }
            None => return None,
        }
    }
    Some(exits)
}

fn chain_edges(room_count: usize) -> BTreeSet<(usize, usize)> {
    (0..room_count.saturating_sub(1))
        .map(|i| (i, i + 1))
        .collect()
}

fn chain_exit_targets(room_count: usize) -> Vec<BTreeMap<Direction, usize>> {
    let mut exits: Vec<BTreeMap<Direction, usize>> = vec![BTreeMap::new(); room_count];
    for i in 0..room_count.saturating_sub(1) {
        exits[i].insert(Direction::North, i + 1);
        exits[i + 1].insert(Direction::South, i);
    }
    exits
}
