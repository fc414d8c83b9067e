//! Shared fixtures for the integration suites.
//!
//! `keep_world` assembles a small hand-written world through the same
//! validation path the loader uses for files on disk, so every suite runs
//! on data the server itself would accept.

#![allow(dead_code)] // Each suite compiles this module separately and uses its own subset.

use std::collections::BTreeMap;

use tokio::sync::mpsc;

use undercroft::game::{GameHandle, LoginReply, ServerMessage, OUTBOUND_QUEUE_DEPTH};
use undercroft::world::loader::build_definition;
use undercroft::world::types::{
    CharacterTemplate, CharactersFile, CoinSpec, Direction, ExitDef, GhostDef, ItemDef,
    RoomAppearance, RoomDef, VerbsFile, WorldDefinition, WorldFile,
};

fn room(
    id: &str,
    name: &str,
    coins: u32,
    items: &[&str],
    exits: &[(Direction, &str, Option<&str>)],
) -> RoomDef {
    RoomDef {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{}.", name),
        exits: exits
            .iter()
            .map(|(direction, target, key)| {
                let exit = match key {
                    Some(key_id) => ExitDef::Detailed {
                        target: target.to_string(),
                        locked: true,
                        key_id: Some(key_id.to_string()),
                    },
                    None => ExitDef::Plain(target.to_string()),
                };
                (*direction, exit)
            })
            .collect(),
        coins: CoinSpec { initial: coins },
        appearance: RoomAppearance::default(),
        items: items.iter().map(|item| item.to_string()).collect(),
    }
}

fn character(id: &str, name: &str, starting_room: &str) -> CharacterTemplate {
    CharacterTemplate {
        id: id.to_string(),
        name: name.to_string(),
        short_description: format!("{}, dressed for the dark.", name),
        long_description: format!("{}, studied at length.", name),
        starting_room: starting_room.to_string(),
        appearance_in_room: "{name} is here.".to_string(),
    }
}

/// Four rooms: a gate south of a hall, a crypt north of it, and a vault
/// behind a locked east door. The vault key lies on the gate floor, one
/// ghost starts in the crypt. Ann and Bob start at the gate, Boris in the
/// hall.
pub fn keep_world() -> WorldDefinition {
    let rooms = vec![
        room(
            "gate",
            "Rusty Gate",
            0,
            &["key_iron"],
            &[(Direction::North, "hall", None)],
        ),
        room(
            "hall",
            "Echo Hall",
            6,
            &[],
            &[
                (Direction::South, "gate", None),
                (Direction::East, "vault", Some("key_iron")),
                (Direction::North, "crypt", None),
            ],
        ),
        room(
            "vault",
            "Sealed Vault",
            10,
            &["ring_silver"],
            &[(Direction::West, "hall", Some("key_iron"))],
        ),
        room(
            "crypt",
            "Cold Crypt",
            0,
            &[],
            &[(Direction::South, "hall", None)],
        ),
    ];

    let mut items = BTreeMap::new();
    items.insert(
        "key_iron".to_string(),
        ItemDef {
            name: "Iron Key".to_string(),
            description: "a heavy iron key with jagged teeth".to_string(),
            is_key: true,
            key_id: Some("key_iron".to_string()),
        },
    );
    items.insert(
        "ring_silver".to_string(),
        ItemDef {
            name: "Silver Ring".to_string(),
            description: "a tarnished silver ring".to_string(),
            is_key: false,
            key_id: None,
        },
    );

    let mut ghosts = BTreeMap::new();
    ghosts.insert(
        "g_whisper".to_string(),
        GhostDef {
            room_id: "crypt".to_string(),
            description: "a faint whispering shade".to_string(),
        },
    );

    let world = WorldFile {
        world_name: Some("The Keep Below".to_string()),
        rooms,
        items,
        ghosts,
    };
    let characters = CharactersFile {
        characters: vec![
            character("char_ann", "Ann the Swift", "gate"),
            character("char_bob", "Bob the Brave", "gate"),
            character("char_boris", "Boris the Bold", "hall"),
        ],
    };
    let verbs = VerbsFile {
        emotes: vec!["dance".to_string(), "sneeze".to_string()],
    };
    build_definition(world, characters, verbs).expect("fixture world should validate")
}

/// Log a character in and hand back its outbound queue with the reply.
pub async fn login(
    handle: &GameHandle,
    character_id: &str,
) -> (mpsc::Receiver<ServerMessage>, LoginReply) {
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let reply = handle
        .login(character_id, tx)
        .await
        .unwrap_or_else(|err| panic!("login {} failed: {}", character_id, err));
    (rx, reply)
}

/// Empty a queue without waiting.
pub fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}

/// The `event` texts in a batch of messages, in order.
pub fn event_texts(messages: &[ServerMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|message| match message {
            ServerMessage::Event { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// The single `error` text expected in a reply batch.
pub fn sole_error(messages: &[ServerMessage]) -> String {
    match messages {
        [ServerMessage::Error { message }] => message.clone(),
        other => panic!("expected exactly one error, got {:?}", other),
    }
}

/// The `roomState` payload expected somewhere in a reply batch.
pub fn room_state(messages: &[ServerMessage]) -> undercroft::game::RoomView {
    messages
        .iter()
        .find_map(|message| match message {
            ServerMessage::RoomState(view) => Some(view.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no roomState in {:?}", messages))
}

/// The `inventory` payload expected somewhere in a reply batch.
pub fn inventory(messages: &[ServerMessage]) -> undercroft::game::InventoryView {
    messages
        .iter()
        .find_map(|message| match message {
            ServerMessage::Inventory(view) => Some(view.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no inventory in {:?}", messages))
}
