//! Wire payloads. Every message a client receives is one JSON object per
//! line with a `{"type": ..., "data": ...}` envelope and camelCase keys.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    RoomState(RoomView),
    Event { text: String },
    Inventory(InventoryView),
    Error { message: String },
    Characters { characters: Vec<CharacterSummary> },
    #[serde(rename_all = "camelCase")]
    Welcome { character_id: String, name: String },
    OnlinePlayers { players: Vec<OnlinePlayer> },
}

impl ServerMessage {
    pub fn event(text: impl Into<String>) -> Self {
        ServerMessage::Event { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub room_id: String,
    pub name: String,
    pub description: String,
    pub exits: Vec<String>,
    pub coins: u32,
    pub minimap: String,
    pub characters: Vec<CharacterRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRef {
    pub name: String,
    pub character_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryView {
    pub coins: u32,
    pub items: Vec<ItemRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSummary {
    pub id: String,
    pub name: String,
    pub short_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OnlinePlayer {
    pub character_id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_envelope_shape() {
        let json = serde_json::to_string(&ServerMessage::event("A ghost drifts by.")).unwrap();
        assert_eq!(json, r#"{"type":"event","data":{"text":"A ghost drifts by."}}"#);
    }

    #[test]
    fn error_envelope_shape() {
        let json = serde_json::to_string(&ServerMessage::error("You cannot go that way.")).unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","data":{"message":"You cannot go that way."}}"#
        );
    }

    #[test]
    fn welcome_uses_camel_case_keys() {
        let json = serde_json::to_string(&ServerMessage::Welcome {
            character_id: "char_bob".into(),
            name: "Bob the Brave".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"welcome","data":{"characterId":"char_bob","name":"Bob the Brave"}}"#
        );
    }

    #[test]
    fn room_state_round_trips() {
        let view = RoomView {
            room_id: "room_001".into(),
            name: "Mossy Vault".into(),
            description: "Damp stone.".into(),
            exits: vec!["north".into(), "east".into()],
            coins: 5,
            minimap: String::new(),
            characters: vec![CharacterRef {
                name: "Boris the Bold".into(),
                character_id: "char_boris".into(),
            }],
        };
        let json = serde_json::to_string(&ServerMessage::RoomState(view.clone())).unwrap();
        assert!(json.starts_with(r#"{"type":"roomState","data":{"roomId":"room_001""#));
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ServerMessage::RoomState(view));
    }
}
