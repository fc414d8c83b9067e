//! Authoritative mutable world state.
//!
//! Everything here is owned by the game actor and mutated only at the
//! serialization boundary. Room occupancy is maintained in the same call
//! that moves a session, never reconstructed after the fact, so views taken
//! between commands are always occupancy-accurate.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::errors::GameError;
use crate::game::protocol::{CharacterRef, InventoryView, ItemRef, RoomView};
use crate::world::types::{
    CharacterSave, CharacterTemplate, Direction, GhostSave, RoomDef, RoomSave, WorldDefinition,
    WorldSnapshot, DEFAULT_CHARACTERS_TEMPLATE,
};

const MINIMAP_WIDTH: usize = 15;
const MINIMAP_HEIGHT: usize = 15;
const MINIMAP_STEP: i32 = 4;

/// Mutable per-room record. `occupants` mirrors session locations exactly.
#[derive(Debug, Clone, Default)]
pub struct RoomRuntime {
    pub coins: u32,
    pub items: Vec<String>,
    pub occupants: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct GhostRuntime {
    pub room_id: String,
}

/// One live character binding. Exactly one exists per online character.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub character_id: String,
    pub name: String,
    pub room_id: String,
    pub coins: u32,
    pub items: Vec<String>,
    /// Most recent character to tell or yell at this one, for `/reply`.
    pub last_sender: Option<String>,
}

/// Rooms touched by a completed move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub from_room: String,
    pub to_room: String,
    pub unlocked_door: bool,
}

#[derive(Debug)]
pub struct WorldState {
    rooms: BTreeMap<String, RoomRuntime>,
    sessions: BTreeMap<String, PlayerSession>,
    ghosts: BTreeMap<String, GhostRuntime>,
    saves: BTreeMap<String, CharacterSave>,
    /// Exits opened with a key during this process lifetime.
    unlocked: BTreeSet<(String, Direction)>,
    /// Bumped on every persistable mutation; lets the owner skip snapshots
    /// for read-only traffic.
    changes: u64,
}

impl WorldState {
    pub fn new(def: &WorldDefinition) -> Self {
        let rooms = def
            .rooms
            .iter()
            .map(|(id, room)| {
                let runtime = RoomRuntime {
                    coins: room.coins.initial,
                    items: room
                        .items
                        .iter()
                        .filter(|item_id| def.items.contains_key(*item_id))
                        .cloned()
                        .collect(),
                    occupants: BTreeSet::new(),
                };
                (id.clone(), runtime)
            })
            .collect();
        let ghosts = def
            .ghosts
            .iter()
            .map(|(id, ghost)| {
                (
                    id.clone(),
                    GhostRuntime {
                        room_id: ghost.room_id.clone(),
                    },
                )
            })
            .collect();
        Self {
            rooms,
            sessions: BTreeMap::new(),
            ghosts,
            saves: BTreeMap::new(),
            unlocked: BTreeSet::new(),
            changes: 0,
        }
    }

    /// Apply a prior snapshot on top of the freshly initialized state.
    /// Unknown rooms, ghosts and items are dropped; character saves are
    /// validated later, at checkout.
    pub fn restore(&mut self, def: &WorldDefinition, snapshot: WorldSnapshot) {
        for (room_id, save) in snapshot.rooms {
            if let Some(room) = self.rooms.get_mut(&room_id) {
                room.coins = save.coins;
                room.items = save
                    .items
                    .into_iter()
                    .filter(|item_id| def.items.contains_key(item_id))
                    .collect();
            }
        }
        self.saves = snapshot.characters;
        for (ghost_id, save) in snapshot.ghosts {
            if self.rooms.contains_key(&save.room_id) {
                if let Some(ghost) = self.ghosts.get_mut(&ghost_id) {
                    ghost.room_id = save.room_id;
                }
            }
        }
    }

    pub fn session(&self, character_id: &str) -> Option<&PlayerSession> {
        self.sessions.get(character_id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &PlayerSession> {
        self.sessions.values()
    }

    pub fn is_online(&self, character_id: &str) -> bool {
        self.sessions.contains_key(character_id)
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomRuntime> {
        self.rooms.get(room_id)
    }

    /// Occupants of a room other than `exclude`, in id order.
    pub fn occupants_except(&self, room_id: &str, exclude: &str) -> Vec<String> {
        match self.rooms.get(room_id) {
            Some(room) => room
                .occupants
                .iter()
                .filter(|id| id.as_str() != exclude)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Bind a session for a checked-out character, restoring its save when
    /// one exists. A stale save room falls back to the template's starting
    /// room, then to the first room of the world.
    pub fn spawn_session(
        &mut self,
        def: &WorldDefinition,
        template: &CharacterTemplate,
    ) -> PlayerSession {
        let save = self.saves.get(&template.id);
        let room_id = save
            .map(|s| s.room_id.clone())
            .filter(|room| self.rooms.contains_key(room))
            .or_else(|| {
                Some(template.starting_room.clone()).filter(|room| self.rooms.contains_key(room))
            })
            .unwrap_or_else(|| def.first_room.clone());
        let coins = save.map(|s| s.coins).unwrap_or(0);
        let items: Vec<String> = save
            .map(|s| {
                s.items
                    .iter()
                    .filter(|item_id| def.items.contains_key(*item_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let session = PlayerSession {
            character_id: template.id.clone(),
            name: template.name.clone(),
            room_id,
            coins,
            items,
            last_sender: None,
        };
        if let Some(room) = self.rooms.get_mut(&session.room_id) {
            room.occupants.insert(template.id.clone());
        }
        self.sessions.insert(template.id.clone(), session.clone());
        self.write_save(&template.id);
        session
    }

    /// Tear down a session, recording its final position in the save. Safe
    /// to call for characters that are not online.
    pub fn remove_session(&mut self, character_id: &str) -> Option<PlayerSession> {
        let session = self.sessions.remove(character_id)?;
        if let Some(room) = self.rooms.get_mut(&session.room_id) {
            room.occupants.remove(character_id);
        }
        self.saves.insert(
            character_id.to_string(),
            CharacterSave {
                room_id: session.room_id.clone(),
                coins: session.coins,
                items: session.items.clone(),
            },
        );
        self.changes += 1;
        Some(session)
    }

    pub fn move_character(
        &mut self,
        def: &WorldDefinition,
        character_id: &str,
        direction: Direction,
    ) -> Result<MoveReport, GameError> {
        let (from_room, held_items) = {
            let session = self
                .sessions
                .get(character_id)
                .ok_or_else(|| GameError::Internal(format!("no session for {}", character_id)))?;
            (session.room_id.clone(), session.items.clone())
        };
        let room_def = def
            .room(&from_room)
            .ok_or_else(|| GameError::Internal(format!("unknown room {}", from_room)))?;
        let exit = room_def.exits.get(&direction).ok_or(GameError::NoSuchExit)?;
        let to_room = exit.target().to_string();

        let mut unlocked_door = false;
        if exit.locked() && !self.unlocked.contains(&(from_room.clone(), direction)) {
            let has_key = exit.key_id().map_or(false, |key| {
                held_items.iter().any(|item_id| {
                    def.item(item_id)
                        .map_or(false, |item| item.is_key && item.key_id.as_deref() == Some(key))
                })
            });
            if !has_key {
                return Err(GameError::ExitLocked);
            }
            // A used key opens the matching exit on both sides, for everyone.
            self.unlocked.insert((from_room.clone(), direction));
            if let Some(back_room) = def.room(&to_room) {
                for (back_dir, back_exit) in &back_room.exits {
                    if back_exit.target() == from_room && back_exit.key_id() == exit.key_id() {
                        self.unlocked.insert((to_room.clone(), *back_dir));
                    }
                }
            }
            unlocked_door = true;
        }

        if let Some(room) = self.rooms.get_mut(&from_room) {
            room.occupants.remove(character_id);
        }
        if let Some(room) = self.rooms.get_mut(&to_room) {
            room.occupants.insert(character_id.to_string());
        }
        if let Some(session) = self.sessions.get_mut(character_id) {
            session.room_id = to_room.clone();
        }
        self.write_save(character_id);

        Ok(MoveReport {
            from_room,
            to_room,
            unlocked_door,
        })
    }

    /// Transfer every coin in the character's room to its inventory.
    /// Returns the amount moved; zero means there was nothing to collect.
    pub fn collect_coins(&mut self, character_id: &str) -> Result<u32, GameError> {
        let room_id = self.session_room(character_id)?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| GameError::Internal(format!("unknown room {}", room_id)))?;
        let amount = room.coins;
        room.coins = 0;
        if amount > 0 {
            if let Some(session) = self.sessions.get_mut(character_id) {
                session.coins += amount;
            }
            self.write_save(character_id);
        }
        Ok(amount)
    }

    /// Symmetric to `collect_coins`: the whole inventory onto the floor.
    pub fn drop_coins(&mut self, character_id: &str) -> Result<u32, GameError> {
        let room_id = self.session_room(character_id)?;
        if !self.rooms.contains_key(&room_id) {
            return Err(GameError::Internal(format!("unknown room {}", room_id)));
        }
        let amount = match self.sessions.get_mut(character_id) {
            Some(session) => {
                let amount = session.coins;
                session.coins = 0;
                amount
            }
            None => 0,
        };
        if amount > 0 {
            if let Some(room) = self.rooms.get_mut(&room_id) {
                room.coins += amount;
            }
            self.write_save(character_id);
        }
        Ok(amount)
    }

    /// Move items from the room into the inventory. No query or the literal
    /// `all` takes everything; otherwise the first item whose name contains
    /// the query, case-insensitively. Returns the taken item names.
    pub fn take_items(
        &mut self,
        def: &WorldDefinition,
        character_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<String>, GameError> {
        let room_id = self.session_room(character_id)?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| GameError::Internal(format!("unknown room {}", room_id)))?;
        if room.items.is_empty() {
            return Err(GameError::NothingToTake);
        }
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty() && !q.eq_ignore_ascii_case("all"));
        let taken_ids: Vec<String> = match query {
            None => room.items.drain(..).collect(),
            Some(wanted) => {
                let wanted = wanted.to_lowercase();
                let position = room.items.iter().position(|item_id| {
                    def.item(item_id)
                        .map_or(false, |item| item.name.to_lowercase().contains(&wanted))
                });
                match position {
                    Some(index) => vec![room.items.remove(index)],
                    None => return Err(GameError::NoSuchItem),
                }
            }
        };
        let names = taken_ids
            .iter()
            .map(|item_id| {
                def.item(item_id)
                    .map(|item| item.name.clone())
                    .unwrap_or_else(|| item_id.clone())
            })
            .collect();
        if let Some(session) = self.sessions.get_mut(character_id) {
            session.items.extend(taken_ids);
        }
        self.write_save(character_id);
        Ok(names)
    }

    pub fn inventory_view(
        &self,
        def: &WorldDefinition,
        character_id: &str,
    ) -> Result<InventoryView, GameError> {
        let session = self
            .sessions
            .get(character_id)
            .ok_or_else(|| GameError::Internal(format!("no session for {}", character_id)))?;
        let items = session
            .items
            .iter()
            .map(|item_id| ItemRef {
                id: item_id.clone(),
                name: def
                    .item(item_id)
                    .map(|item| item.name.clone())
                    .unwrap_or_else(|| item_id.clone()),
            })
            .collect();
        Ok(InventoryView {
            coins: session.coins,
            items,
        })
    }

    /// Full view of the character's current room: composed description,
    /// exits, coins, minimap and the other characters present.
    pub fn describe_room(
        &self,
        def: &WorldDefinition,
        character_id: &str,
    ) -> Result<RoomView, GameError> {
        let session = self
            .sessions
            .get(character_id)
            .ok_or_else(|| GameError::Internal(format!("no session for {}", character_id)))?;
        let room_def = def
            .room(&session.room_id)
            .ok_or_else(|| GameError::Internal(format!("unknown room {}", session.room_id)))?;
        let room = self
            .rooms
            .get(&session.room_id)
            .ok_or_else(|| GameError::Internal(format!("unknown room {}", session.room_id)))?;

        let others: Vec<&PlayerSession> = room
            .occupants
            .iter()
            .filter(|id| id.as_str() != character_id)
            .filter_map(|id| self.sessions.get(id))
            .collect();

        let characters = others
            .iter()
            .map(|other| CharacterRef {
                name: other.name.clone(),
                character_id: other.character_id.clone(),
            })
            .collect();

        Ok(RoomView {
            room_id: room_def.id.clone(),
            name: room_def.name.clone(),
            description: compose_description(def, room_def, room, &others),
            exits: room_def.exits.keys().map(|d| d.to_string()).collect(),
            coins: room.coins,
            minimap: self.build_minimap(def, session),
            characters,
        })
    }

    /// Step every ghost through a random exit of its room (ghosts ignore
    /// locks), then collect one narration per character sharing a room with
    /// a ghost.
    pub fn move_ghosts<R: Rng>(
        &mut self,
        def: &WorldDefinition,
        rng: &mut R,
    ) -> Vec<(String, String)> {
        if self.ghosts.is_empty() {
            return Vec::new();
        }
        let mut moved = false;
        for ghost in self.ghosts.values_mut() {
            let room_def = match def.room(&ghost.room_id) {
                Some(room) => room,
                None => continue,
            };
            let exits: Vec<_> = room_def.exits.values().collect();
            if let Some(exit) = exits.choose(rng) {
                ghost.room_id = exit.target().to_string();
                moved = true;
            }
        }
        if moved {
            self.changes += 1;
        }

        let mut events = Vec::new();
        for (ghost_id, ghost) in &self.ghosts {
            let ghost_def = match def.ghosts.get(ghost_id) {
                Some(ghost_def) => ghost_def,
                None => continue,
            };
            let room = match self.rooms.get(&ghost.room_id) {
                Some(room) => room,
                None => continue,
            };
            for character_id in &room.occupants {
                events.push((
                    character_id.clone(),
                    format!(
                        "A ghost passes through the room: {}.",
                        ghost_def.description
                    ),
                ));
            }
        }
        events
    }

    pub fn last_sender(&self, character_id: &str) -> Option<String> {
        self.sessions
            .get(character_id)
            .and_then(|session| session.last_sender.clone())
    }

    pub fn set_last_sender(&mut self, character_id: &str, sender_id: &str) {
        if let Some(session) = self.sessions.get_mut(character_id) {
            session.last_sender = Some(sender_id.to_string());
        }
    }

    /// Persistable copy of everything mutable. Saves track each character's
    /// latest position, so offline progress is included.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::new();
        for (room_id, room) in &self.rooms {
            snapshot.rooms.insert(
                room_id.clone(),
                RoomSave {
                    coins: room.coins,
                    items: room.items.clone(),
                },
            );
        }
        snapshot.characters = self.saves.clone();
        for (ghost_id, ghost) in &self.ghosts {
            snapshot.ghosts.insert(
                ghost_id.clone(),
                GhostSave {
                    room_id: ghost.room_id.clone(),
                },
            );
        }
        snapshot
    }

    pub fn change_count(&self) -> u64 {
        self.changes
    }

    /// Coins on floors plus coins held by online characters.
    pub fn coin_total(&self) -> u64 {
        let floors: u64 = self.rooms.values().map(|room| u64::from(room.coins)).sum();
        let held: u64 = self
            .sessions
            .values()
            .map(|session| u64::from(session.coins))
            .sum();
        floors + held
    }

    fn session_room(&self, character_id: &str) -> Result<String, GameError> {
        self.sessions
            .get(character_id)
            .map(|session| session.room_id.clone())
            .ok_or_else(|| GameError::Internal(format!("no session for {}", character_id)))
    }

    fn write_save(&mut self, character_id: &str) {
        if let Some(session) = self.sessions.get(character_id) {
            self.saves.insert(
                character_id.to_string(),
                CharacterSave {
                    room_id: session.room_id.clone(),
                    coins: session.coins,
                    items: session.items.clone(),
                },
            );
            self.changes += 1;
        }
    }

    fn build_minimap(&self, def: &WorldDefinition, session: &PlayerSession) -> String {
        let room_def = match def.room(&session.room_id) {
            Some(room) => room,
            None => return String::new(),
        };
        let mut grid = vec![vec![' '; MINIMAP_WIDTH]; MINIMAP_HEIGHT];
        let center_x = (MINIMAP_WIDTH / 2) as i32;
        let center_y = (MINIMAP_HEIGHT / 2) as i32;

        draw_room_block(&mut grid, center_x, center_y, true, false);

        for (direction, exit) in &room_def.exits {
            let (dx, dy) = direction.offset();
            if let Some(neighbour) = self.rooms.get(exit.target()) {
                let has_other = neighbour
                    .occupants
                    .iter()
                    .any(|id| id != &session.character_id);
                draw_room_block(
                    &mut grid,
                    center_x + dx * MINIMAP_STEP,
                    center_y + dy * MINIMAP_STEP,
                    false,
                    has_other,
                );
            }
            let link_x = center_x + dx * (MINIMAP_STEP / 2);
            let link_y = center_y + dy * (MINIMAP_STEP / 2);
            if in_grid(link_x, link_y) {
                grid[link_y as usize][link_x as usize] = if dx == 0 { '|' } else { '-' };
            }
        }

        grid.into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn in_grid(x: i32, y: i32) -> bool {
    (0..MINIMAP_WIDTH as i32).contains(&x) && (0..MINIMAP_HEIGHT as i32).contains(&y)
}

/// Rooms render as 2x2 blocks: `*` the viewer's room, `P` a room holding
/// another player, `.` an empty one.
fn draw_room_block(grid: &mut [Vec<char>], cx: i32, cy: i32, is_self: bool, has_other: bool) {
    for dy in [-1i32, 0] {
        for dx in [-1i32, 0] {
            let x = cx + dx;
            let y = cy + dy;
            if in_grid(x, y) {
                grid[y as usize][x as usize] = if is_self {
                    '*'
                } else if has_other {
                    'P'
                } else {
                    '.'
                };
            }
        }
    }
}

fn compose_description(
    def: &WorldDefinition,
    room_def: &RoomDef,
    room: &RoomRuntime,
    others: &[&PlayerSession],
) -> String {
    let mut lines = vec![room_def.description.clone()];

    if room.coins > 0 {
        let template = &room_def.appearance.coins_template;
        if !template.is_empty() {
            lines.push(template.replace("{coinCount}", &room.coins.to_string()));
        }
    } else if !room_def.appearance.empty_coins_template.is_empty() {
        lines.push(room_def.appearance.empty_coins_template.clone());
    }

    let item_names: Vec<&str> = room
        .items
        .iter()
        .filter_map(|item_id| def.item(item_id).map(|item| item.name.as_str()))
        .collect();
    if !item_names.is_empty() {
        lines.push(format!("Items here: {}.", item_names.join(", ")));
    }

    if !others.is_empty() {
        let appearances: Vec<String> = others
            .iter()
            .map(|session| match def.character(&session.character_id) {
                Some(template) => template.appearance_in_room.replace("{name}", &template.name),
                None => format!("{} is here.", session.name),
            })
            .collect();
        let template = if room_def.appearance.characters_template.is_empty() {
            DEFAULT_CHARACTERS_TEMPLATE
        } else {
            room_def.appearance.characters_template.as_str()
        };
        lines.push(template.replace("{names}", &appearances.join(" ")));
    }

    lines.join("\n")
}
