//! Command execution against the authoritative world.
//!
//! [GameCore] owns the world definition, the mutable state, the character
//! registry and the presence directory, and is itself owned by the single
//! game task. Each public method is one serialized step: it mutates, reads
//! the views it needs, and pushes bystander messages through presence
//! before returning the submitting player's own replies.

use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::game::command::{self, Command};
use crate::game::errors::GameError;
use crate::game::messaging;
use crate::game::presence::PresenceDirectory;
use crate::game::protocol::{CharacterSummary, OnlinePlayer, ServerMessage};
use crate::game::registry::CharacterRegistry;
use crate::game::resolver::{self, Target};
use crate::game::state::WorldState;
use crate::metrics;
use crate::world::types::{Direction, WorldDefinition, WorldSnapshot};

/// Result of a successful login: the bound identity plus the bootstrap
/// messages the new connection should receive, in order.
#[derive(Debug, Clone)]
pub struct LoginReply {
    pub character_id: String,
    pub name: String,
    pub messages: Vec<ServerMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStats {
    pub online: usize,
    pub rooms: usize,
    pub ghosts: usize,
    pub coins_in_world: u64,
}

pub struct GameCore {
    def: WorldDefinition,
    state: WorldState,
    registry: CharacterRegistry,
    presence: PresenceDirectory,
}

impl GameCore {
    pub fn new(def: WorldDefinition, prior: Option<WorldSnapshot>) -> Self {
        let mut state = WorldState::new(&def);
        if let Some(snapshot) = prior {
            state.restore(&def, snapshot);
        }
        let registry = CharacterRegistry::new(def.characters.clone());
        Self {
            def,
            state,
            registry,
            presence: PresenceDirectory::new(),
        }
    }

    pub fn available_characters(&self) -> Vec<CharacterSummary> {
        self.registry
            .list_available()
            .into_iter()
            .map(|template| CharacterSummary {
                id: template.id.clone(),
                name: template.name.clone(),
                short_description: template.short_description.clone(),
            })
            .collect()
    }

    /// Check out a character, bind its session and register the delivery
    /// channel. The caller gets the bootstrap sequence for the new
    /// connection; everyone else receives a fresh personalized online list.
    pub fn login(
        &mut self,
        character_id: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<LoginReply, GameError> {
        let template = self.registry.checkout(character_id)?;
        let session = self.state.spawn_session(&self.def, &template);

        let room = match self.state.describe_room(&self.def, character_id) {
            Ok(view) => view,
            Err(err) => {
                self.state.remove_session(character_id);
                self.registry.release(character_id);
                return Err(err);
            }
        };
        let inventory = match self.state.inventory_view(&self.def, character_id) {
            Ok(view) => view,
            Err(err) => {
                self.state.remove_session(character_id);
                self.registry.release(character_id);
                return Err(err);
            }
        };

        self.presence.register(character_id, &session.name, sender);
        metrics::inc_logins();
        metrics::record_online_count(self.presence.online_count() as u64);

        let messages = vec![
            ServerMessage::Welcome {
                character_id: session.character_id.clone(),
                name: session.name.clone(),
            },
            ServerMessage::RoomState(room),
            ServerMessage::Inventory(inventory),
            self.online_players_message(character_id),
        ];
        self.broadcast_online_players(character_id);
        info!("{} checked out by a new session", session.name);

        Ok(LoginReply {
            character_id: session.character_id,
            name: session.name,
            messages,
        })
    }

    /// Unconditional, idempotent teardown: unregister the channel, close
    /// the session (writing its save), return the character to the pool.
    pub fn logout(&mut self, character_id: &str) {
        self.presence.unregister(character_id);
        let had_session = self.state.remove_session(character_id).is_some();
        let was_bound = self.registry.release(character_id);
        if had_session || was_bound {
            metrics::inc_logouts();
            info!("{} released", character_id);
            self.broadcast_online_players(character_id);
        }
    }

    /// Run one line of input for one character. The returned messages are
    /// the submitter's replies; messages for anyone else have already been
    /// handed to presence by the time this returns.
    pub fn execute(&mut self, character_id: &str, line: &str) -> Vec<ServerMessage> {
        let parsed = match command::parse(line) {
            Ok(Command::Noop) => return Vec::new(),
            Ok(parsed) => parsed,
            Err(err) => {
                metrics::record_command_failure("invalid");
                return vec![ServerMessage::error(err.to_string())];
            }
        };
        let verb = verb_of(&parsed);
        metrics::record_command(verb);

        match self.run(character_id, parsed) {
            Ok(messages) => messages,
            Err(GameError::Internal(detail)) => {
                metrics::record_command_failure(verb);
                error!("{} running {} for {}", detail, verb, character_id);
                vec![ServerMessage::error("Something went wrong.")]
            }
            Err(err) => {
                metrics::record_command_failure(verb);
                vec![ServerMessage::error(err.to_string())]
            }
        }
    }

    /// Step ghosts and deliver their narrations to anyone sharing a room.
    pub fn ghost_tick(&mut self) {
        let mut rng = rand::thread_rng();
        for (character_id, text) in self.state.move_ghosts(&self.def, &mut rng) {
            self.presence.send(&character_id, ServerMessage::event(text));
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.state.snapshot()
    }

    /// Monotonic count of persistable mutations, for snapshot scheduling.
    pub fn change_count(&self) -> u64 {
        self.state.change_count()
    }

    pub fn stats(&self) -> GameStats {
        GameStats {
            online: self.presence.online_count(),
            rooms: self.def.rooms.len(),
            ghosts: self.def.ghosts.len(),
            coins_in_world: self.state.coin_total(),
        }
    }

    fn run(
        &mut self,
        character_id: &str,
        command: Command,
    ) -> Result<Vec<ServerMessage>, GameError> {
        match command {
            Command::Noop => Ok(Vec::new()),
            Command::Go(direction) => self.run_go(character_id, direction),
            Command::Look => Ok(vec![ServerMessage::RoomState(
                self.state.describe_room(&self.def, character_id)?,
            )]),
            Command::Collect => self.run_collect(character_id),
            Command::Drop => self.run_drop(character_id),
            Command::Take(query) => self.run_take(character_id, query.as_deref()),
            Command::Emote(verb) => self.run_emote(character_id, &verb),
            Command::Tell { target, text } => self.run_directed(character_id, &target, &text, false),
            Command::Yell { target, text } => self.run_directed(character_id, &target, &text, true),
            Command::Reply(text) => self.run_reply(character_id, &text),
        }
    }

    fn run_go(
        &mut self,
        character_id: &str,
        direction: Direction,
    ) -> Result<Vec<ServerMessage>, GameError> {
        let name = self.display_name(character_id)?;
        let report = self
            .state
            .move_character(&self.def, character_id, direction)?;
        if report.unlocked_door {
            debug!(
                "{} unlocked the door between {} and {}",
                character_id, report.from_room, report.to_room
            );
        }
        self.broadcast_room(&report.from_room, character_id, messaging::left(&name));
        self.broadcast_room(&report.to_room, character_id, messaging::entered(&name));
        Ok(vec![ServerMessage::RoomState(
            self.state.describe_room(&self.def, character_id)?,
        )])
    }

    fn run_collect(&mut self, character_id: &str) -> Result<Vec<ServerMessage>, GameError> {
        let amount = self.state.collect_coins(character_id)?;
        if amount == 0 {
            // Not an error: the room simply has nothing on the floor.
            return Ok(vec![ServerMessage::event("There is nothing to collect.")]);
        }
        let room_id = self.room_of(character_id)?;
        self.broadcast_room(
            &room_id,
            character_id,
            "Someone collects coins nearby.".to_string(),
        );
        Ok(vec![
            ServerMessage::event(format!("You collected {} coin(s).", amount)),
            ServerMessage::RoomState(self.state.describe_room(&self.def, character_id)?),
            ServerMessage::Inventory(self.state.inventory_view(&self.def, character_id)?),
        ])
    }

    fn run_drop(&mut self, character_id: &str) -> Result<Vec<ServerMessage>, GameError> {
        let amount = self.state.drop_coins(character_id)?;
        if amount == 0 {
            return Ok(vec![ServerMessage::event("You have nothing to drop.")]);
        }
        let room_id = self.room_of(character_id)?;
        self.broadcast_room(
            &room_id,
            character_id,
            "You hear coins clatter onto the floor.".to_string(),
        );
        Ok(vec![
            ServerMessage::event(format!("You dropped {} coin(s).", amount)),
            ServerMessage::RoomState(self.state.describe_room(&self.def, character_id)?),
            ServerMessage::Inventory(self.state.inventory_view(&self.def, character_id)?),
        ])
    }

    fn run_take(
        &mut self,
        character_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<ServerMessage>, GameError> {
        let names = self.state.take_items(&self.def, character_id, query)?;
        let room_id = self.room_of(character_id)?;
        self.broadcast_room(
            &room_id,
            character_id,
            "Someone picks something up nearby.".to_string(),
        );
        Ok(vec![
            ServerMessage::event(format!("You take {}.", names.join(", "))),
            ServerMessage::Inventory(self.state.inventory_view(&self.def, character_id)?),
        ])
    }

    fn run_emote(&mut self, character_id: &str, verb: &str) -> Result<Vec<ServerMessage>, GameError> {
        if !self.def.is_emote(verb) {
            return Err(GameError::UnknownCommand(format!("/{}", verb)));
        }
        let name = self.display_name(character_id)?;
        let room_id = self.room_of(character_id)?;
        self.broadcast_room(&room_id, character_id, messaging::emote_bystander(&name, verb));
        Ok(vec![ServerMessage::event(messaging::emote_actor(verb))])
    }

    fn run_directed(
        &mut self,
        sender_id: &str,
        target_query: &str,
        text: &str,
        yell: bool,
    ) -> Result<Vec<ServerMessage>, GameError> {
        let sender_name = self.display_name(sender_id)?;
        match resolver::resolve(target_query, &self.presence.list_online())? {
            Target::Everyone => {
                // The sender is not a recipient: they get a confirmation and
                // their own reply target stays unchanged.
                let broadcast = if yell {
                    messaging::yell_all_to_recipient(&sender_name, text)
                } else {
                    messaging::tell_all_to_recipient(&sender_name, text)
                };
                for recipient in self.other_online_ids(sender_id) {
                    self.state.set_last_sender(&recipient, sender_id);
                    self.presence
                        .send(&recipient, ServerMessage::event(broadcast.clone()));
                }
                let confirmation = if yell {
                    messaging::yell_all_confirmation(text)
                } else {
                    messaging::tell_all_confirmation(text)
                };
                Ok(vec![ServerMessage::event(confirmation)])
            }
            Target::One(target_id) => {
                if target_id == sender_id {
                    return Err(GameError::SelfTarget(if yell { "yell at" } else { "tell" }));
                }
                let target_name = self.display_name(&target_id)?;
                self.state.set_last_sender(&target_id, sender_id);
                let message = if yell {
                    messaging::yell_to_recipient(&sender_name, text)
                } else {
                    messaging::tell_to_recipient(&sender_name, text)
                };
                self.presence.send(&target_id, ServerMessage::event(message));
                let confirmation = if yell {
                    messaging::yell_confirmation(&target_name, text)
                } else {
                    messaging::tell_confirmation(&target_name, text)
                };
                Ok(vec![ServerMessage::event(confirmation)])
            }
        }
    }

    fn run_reply(&mut self, sender_id: &str, text: &str) -> Result<Vec<ServerMessage>, GameError> {
        let last = self
            .state
            .last_sender(sender_id)
            .ok_or(GameError::NoPriorSender)?;
        if !self.state.is_online(&last) {
            let name = self
                .def
                .character(&last)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| last.clone());
            return Err(GameError::ReplyGone(name));
        }
        // A reply is a direct tell that points the other side back at us.
        let sender_name = self.display_name(sender_id)?;
        let target_name = self.display_name(&last)?;
        self.state.set_last_sender(&last, sender_id);
        self.presence.send(
            &last,
            ServerMessage::event(messaging::tell_to_recipient(&sender_name, text)),
        );
        Ok(vec![ServerMessage::event(messaging::tell_confirmation(
            &target_name,
            text,
        ))])
    }

    /// Deliver an event to everyone in a room except `exclude`, reading
    /// occupancy inside the same serialized step as the mutation.
    fn broadcast_room(&self, room_id: &str, exclude: &str, text: String) {
        for occupant in self.state.occupants_except(room_id, exclude) {
            self.presence
                .send(&occupant, ServerMessage::event(text.clone()));
        }
    }

    fn online_players_message(&self, viewer_id: &str) -> ServerMessage {
        let players = self
            .presence
            .list_online()
            .into_iter()
            .filter(|entry| entry.character_id != viewer_id)
            .map(|entry| OnlinePlayer {
                character_id: entry.character_id,
                name: entry.name,
            })
            .collect();
        ServerMessage::OnlinePlayers { players }
    }

    fn broadcast_online_players(&self, except: &str) {
        for entry in self.presence.list_online() {
            if entry.character_id == except {
                continue;
            }
            self.presence.send(
                &entry.character_id,
                self.online_players_message(&entry.character_id),
            );
        }
    }

    fn other_online_ids(&self, except: &str) -> Vec<String> {
        self.presence
            .list_online()
            .into_iter()
            .filter(|entry| entry.character_id != except)
            .map(|entry| entry.character_id)
            .collect()
    }

    fn display_name(&self, character_id: &str) -> Result<String, GameError> {
        self.state
            .session(character_id)
            .map(|session| session.name.clone())
            .ok_or_else(|| GameError::Internal(format!("no session for {}", character_id)))
    }

    fn room_of(&self, character_id: &str) -> Result<String, GameError> {
        self.state
            .session(character_id)
            .map(|session| session.room_id.clone())
            .ok_or_else(|| GameError::Internal(format!("no session for {}", character_id)))
    }
}

fn verb_of(command: &Command) -> &'static str {
    match command {
        Command::Noop => "noop",
        Command::Go(_) => "go",
        Command::Look => "look",
        Command::Collect => "collect",
        Command::Drop => "drop",
        Command::Take(_) => "take",
        Command::Emote(_) => "emote",
        Command::Tell { .. } => "tell",
        Command::Yell { .. } => "yell",
        Command::Reply(_) => "reply",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::presence::OUTBOUND_QUEUE_DEPTH;
    use crate::world::types::{
        CharacterTemplate, CoinSpec, ExitDef, GhostDef, RoomAppearance, RoomDef,
    };
    use std::collections::BTreeMap;

    fn room(id: &str, name: &str, coins: u32) -> RoomDef {
        RoomDef {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} carved from damp stone.", name),
            exits: BTreeMap::new(),
            coins: CoinSpec { initial: coins },
            appearance: RoomAppearance::default(),
            items: Vec::new(),
        }
    }

    fn template(id: &str, name: &str) -> CharacterTemplate {
        CharacterTemplate {
            id: id.to_string(),
            name: name.to_string(),
            short_description: format!("{}, down on their luck.", name),
            long_description: String::new(),
            starting_room: "r1".to_string(),
            appearance_in_room: "{name} is here.".to_string(),
        }
    }

    fn sample_def() -> WorldDefinition {
        let mut r1 = room("r1", "Mossy Vault", 5);
        r1.exits
            .insert(Direction::North, ExitDef::Plain("r2".to_string()));
        let mut r2 = room("r2", "Echo Hall", 0);
        r2.exits
            .insert(Direction::South, ExitDef::Plain("r1".to_string()));

        WorldDefinition {
            world_name: "Test Warren".to_string(),
            rooms: [r1, r2].into_iter().map(|r| (r.id.clone(), r)).collect(),
            first_room: "r1".to_string(),
            items: BTreeMap::new(),
            ghosts: BTreeMap::<String, GhostDef>::new(),
            characters: vec![
                template("char_ann", "Ann the Swift"),
                template("char_bob", "Bob the Brave"),
                template("char_boris", "Boris the Bold"),
            ],
            emotes: ["dance", "sneeze"].iter().map(|s| s.to_string()).collect(),
        }
    }

    type Outbound = mpsc::Receiver<ServerMessage>;

    fn login(core: &mut GameCore, id: &str) -> (LoginReply, Outbound) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let reply = core.login(id, tx).expect("login should succeed");
        (reply, rx)
    }

    fn drain(rx: &mut Outbound) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    fn events(messages: &[ServerMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::Event { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn login_bootstraps_and_enforces_exclusivity() {
        let mut core = GameCore::new(sample_def(), None);
        let (reply, _rx) = login(&mut core, "char_bob");
        assert_eq!(reply.name, "Bob the Brave");
        assert!(matches!(reply.messages[0], ServerMessage::Welcome { .. }));
        assert!(matches!(reply.messages[1], ServerMessage::RoomState(_)));
        assert!(matches!(reply.messages[2], ServerMessage::Inventory(_)));
        assert!(matches!(
            reply.messages[3],
            ServerMessage::OnlinePlayers { .. }
        ));

        let (tx, _rx2) = mpsc::channel(1);
        assert_eq!(
            core.login("char_bob", tx).unwrap_err(),
            GameError::AlreadyInUse("char_bob".to_string())
        );
        assert_eq!(core.available_characters().len(), 2);
    }

    #[test]
    fn later_logins_refresh_other_online_lists() {
        let mut core = GameCore::new(sample_def(), None);
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        let (_boris, _boris_rx) = login(&mut core, "char_boris");

        let updates = drain(&mut bob_rx);
        assert_eq!(updates.len(), 1);
        match &updates[0] {
            ServerMessage::OnlinePlayers { players } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].name, "Boris the Bold");
            }
            other => panic!("expected online players update, got {:?}", other),
        }
    }

    #[test]
    fn movement_announces_to_both_rooms() {
        let mut core = GameCore::new(sample_def(), None);
        let (_ann, mut ann_rx) = login(&mut core, "char_ann");
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        core.execute("char_ann", "north");
        drain(&mut ann_rx);
        drain(&mut bob_rx);

        let replies = core.execute("char_bob", "north");
        assert!(matches!(replies[0], ServerMessage::RoomState(_)));
        // Ann already sits in r2 and sees the arrival, not the departure.
        assert_eq!(events(&drain(&mut ann_rx)), vec!["Bob the Brave has entered."]);

        let replies = core.execute("char_bob", "s");
        assert!(matches!(replies[0], ServerMessage::RoomState(_)));
        assert_eq!(events(&drain(&mut ann_rx)), vec!["Bob the Brave has left."]);
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[test]
    fn collect_narrates_bystanders_and_handles_empty_floor() {
        let mut core = GameCore::new(sample_def(), None);
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        let (_boris, mut boris_rx) = login(&mut core, "char_boris");
        drain(&mut bob_rx);

        let replies = core.execute("char_bob", "collect");
        assert_eq!(
            events(&replies),
            vec!["You collected 5 coin(s).".to_string()]
        );
        assert!(replies
            .iter()
            .any(|m| matches!(m, ServerMessage::RoomState(_))));
        assert!(replies
            .iter()
            .any(|m| matches!(m, ServerMessage::Inventory(_))));
        assert_eq!(
            events(&drain(&mut boris_rx)),
            vec!["Someone collects coins nearby."]
        );

        let replies = core.execute("char_boris", "collect");
        assert_eq!(events(&replies), vec!["There is nothing to collect."]);
        assert!(drain(&mut bob_rx).is_empty());

        let replies = core.execute("char_boris", "drop");
        assert_eq!(events(&replies), vec!["You have nothing to drop."]);
    }

    #[test]
    fn tell_is_private_and_arms_reply() {
        let mut core = GameCore::new(sample_def(), None);
        let (_ann, mut ann_rx) = login(&mut core, "char_ann");
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        let (_boris, mut boris_rx) = login(&mut core, "char_boris");
        drain(&mut ann_rx);
        drain(&mut bob_rx);

        let replies = core.execute("char_bob", "/tell boris meet me north");
        assert_eq!(
            events(&replies),
            vec!["You tell Boris the Bold: 'meet me north'"]
        );
        assert_eq!(
            events(&drain(&mut boris_rx)),
            vec!["Bob the Brave tells you: 'meet me north'"]
        );
        // Nobody else hears a word.
        assert!(drain(&mut ann_rx).is_empty());

        let replies = core.execute("char_boris", "/reply on my way");
        assert_eq!(
            events(&replies),
            vec!["You tell Bob the Brave: 'on my way'"]
        );
        assert_eq!(
            events(&drain(&mut bob_rx)),
            vec!["Boris the Bold tells you: 'on my way'"]
        );

        // The reply re-armed Bob's own reply target.
        let replies = core.execute("char_bob", "/reply good");
        assert_eq!(events(&replies), vec!["You tell Boris the Bold: 'good'"]);
        assert_eq!(
            events(&drain(&mut boris_rx)),
            vec!["Bob the Brave tells you: 'good'"]
        );
    }

    #[test]
    fn tell_all_reaches_everyone_but_the_sender() {
        let mut core = GameCore::new(sample_def(), None);
        let (_ann, mut ann_rx) = login(&mut core, "char_ann");
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        let (_boris, mut boris_rx) = login(&mut core, "char_boris");
        drain(&mut ann_rx);
        drain(&mut bob_rx);

        let replies = core.execute("char_ann", "/tell all gather up");
        assert_eq!(events(&replies), vec!["You tell everyone: 'gather up'"]);
        assert_eq!(
            events(&drain(&mut bob_rx)),
            vec!["Ann the Swift tells everyone: 'gather up'"]
        );
        assert_eq!(
            events(&drain(&mut boris_rx)),
            vec!["Ann the Swift tells everyone: 'gather up'"]
        );
        assert!(drain(&mut ann_rx).is_empty());

        // The broadcast did not arm the sender's own reply target.
        let replies = core.execute("char_ann", "/reply anyone?");
        assert_eq!(
            replies,
            vec![ServerMessage::error("There is no one to reply to.")]
        );

        // Recipients can reply straight back to the sender.
        let replies = core.execute("char_bob", "/reply coming");
        assert_eq!(events(&replies), vec!["You tell Ann the Swift: 'coming'"]);
        assert_eq!(
            events(&drain(&mut ann_rx)),
            vec!["Bob the Brave tells you: 'coming'"]
        );
    }

    #[test]
    fn yell_uppercases_phrase_and_text() {
        let mut core = GameCore::new(sample_def(), None);
        let (_ann, mut ann_rx) = login(&mut core, "char_ann");
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        drain(&mut ann_rx);

        let replies = core.execute("char_ann", "/yell all hi");
        assert_eq!(events(&replies), vec!["You yell at everyone: 'HI'"]);
        assert_eq!(
            events(&drain(&mut bob_rx)),
            vec!["Ann the Swift YELLS AT EVERYONE: 'HI'"]
        );

        let replies = core.execute("char_bob", "/yell ann watch out");
        assert_eq!(
            events(&replies),
            vec!["You yell at Ann the Swift: 'WATCH OUT'"]
        );
        assert_eq!(
            events(&drain(&mut ann_rx)),
            vec!["Bob the Brave YELLS AT YOU: 'WATCH OUT'"]
        );
    }

    #[test]
    fn directed_errors_stay_private() {
        let mut core = GameCore::new(sample_def(), None);
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        let (_boris, mut boris_rx) = login(&mut core, "char_boris");
        drain(&mut bob_rx);

        // Ann exists as a character but is offline.
        let replies = core.execute("char_bob", "/tell ann hello");
        assert_eq!(
            replies,
            vec![ServerMessage::error("No one called 'ann' is online.")]
        );
        assert!(drain(&mut boris_rx).is_empty());

        let replies = core.execute("char_bob", "/tell bo hello");
        match &replies[0] {
            ServerMessage::Error { message } => {
                assert!(message.contains("more than one player"));
                assert!(message.contains("Bob the Brave"));
                assert!(message.contains("Boris the Bold"));
            }
            other => panic!("expected error, got {:?}", other),
        }

        let replies = core.execute("char_bob", "/tell bob hi");
        assert_eq!(
            replies,
            vec![ServerMessage::error("You cannot tell yourself.")]
        );
        let replies = core.execute("char_bob", "/yell bob hi");
        assert_eq!(
            replies,
            vec![ServerMessage::error("You cannot yell at yourself.")]
        );
    }

    #[test]
    fn reply_to_departed_sender_reports_the_name() {
        let mut core = GameCore::new(sample_def(), None);
        let (_bob, _bob_rx) = login(&mut core, "char_bob");
        let (_boris, mut boris_rx) = login(&mut core, "char_boris");
        core.execute("char_bob", "/tell boris hi");
        drain(&mut boris_rx);

        core.logout("char_bob");
        let replies = core.execute("char_boris", "/reply hello?");
        assert_eq!(
            replies,
            vec![ServerMessage::error("Bob the Brave is no longer online.")]
        );

        let replies = core.execute("char_ann", "/reply hi");
        // Never told: there is nothing to reply to. (Ann is not even online;
        // the missing reply target is reported first.)
        assert_eq!(
            replies,
            vec![ServerMessage::error("There is no one to reply to.")]
        );
    }

    #[test]
    fn emotes_are_generic_over_the_vocabulary() {
        let mut core = GameCore::new(sample_def(), None);
        let (_bob, mut bob_rx) = login(&mut core, "char_bob");
        let (_boris, mut boris_rx) = login(&mut core, "char_boris");
        drain(&mut bob_rx);

        let replies = core.execute("char_bob", "/Dance");
        assert_eq!(events(&replies), vec!["You have danced."]);
        assert_eq!(
            events(&drain(&mut boris_rx)),
            vec!["Bob the Brave has danced."]
        );

        let replies = core.execute("char_bob", "/frolic");
        assert_eq!(
            replies,
            vec![ServerMessage::error("Unknown command: /frolic")]
        );
        assert!(drain(&mut boris_rx).is_empty());
    }

    #[test]
    fn logout_is_idempotent_and_frees_the_character() {
        let mut core = GameCore::new(sample_def(), None);
        let (_bob, _rx) = login(&mut core, "char_bob");
        core.logout("char_bob");
        core.logout("char_bob");
        assert_eq!(core.stats().online, 0);
        assert!(core.login("char_bob", mpsc::channel(1).0).is_ok());
    }

    #[test]
    fn unknown_input_answers_with_an_error() {
        let mut core = GameCore::new(sample_def(), None);
        let (_bob, _rx) = login(&mut core, "char_bob");
        let replies = core.execute("char_bob", "say hi");
        assert_eq!(replies, vec![ServerMessage::error("Unknown command: say")]);
        assert!(core.execute("char_bob", "   ").is_empty());
    }
}
