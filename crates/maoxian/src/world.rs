use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::ansi;
use crate::direction::Direction;
use crate::entity::{self, Attack, Entity, EntityKind};
use crate::error::{Refusal, WorldError};
use crate::mailbox::Mailbox;
use crate::player::{Player, PlayerId};
use crate::room::Room;

const EMBEDDED_WORLD: &str = include_str!("../world/maoxian.yaml");

/// The world as every session sees it. Sessions share one behind [`SharedWorld`] and
/// hold the lock for the whole of a command, so a command never observes another one
/// half-done.
pub type SharedWorld = Arc<tokio::sync::Mutex<World>>;

#[derive(Debug)]
pub struct World {
    rooms: HashMap<String, Room>,
    start_room: String,
    players: HashMap<PlayerId, Player>,
    next_player_id: u64,
}

impl World {
    /// Build a world from rooms, rejecting graphs with missing rooms.
    pub fn from_rooms(
        start_room: impl Into<String>,
        rooms: impl IntoIterator<Item = Room>,
    ) -> Result<Self, WorldError> {
        let start_room = start_room.into();
        let mut by_name = HashMap::new();
        for r in rooms {
            let name = r.name().to_string();
            if by_name.insert(name.clone(), r).is_some() {
                return Err(WorldError::DuplicateRoom(name));
            }
        }
        if by_name.is_empty() {
            return Err(WorldError::Empty);
        }
        if !by_name.contains_key(&start_room) {
            return Err(WorldError::UnknownStartRoom(start_room));
        }

        let mut names = by_name.keys().collect::<Vec<_>>();
        names.sort_unstable();
        for name in names {
            for (dir, to) in by_name[name].exits() {
                if !by_name.contains_key(to) {
                    return Err(WorldError::DanglingExit {
                        room: name.clone(),
                        dir,
                        to: to.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            rooms: by_name,
            start_room,
            players: HashMap::new(),
            next_player_id: 1,
        })
    }

    pub fn from_yaml(src: &str) -> anyhow::Result<Self> {
        let f = serde_yaml::from_str::<WorldFile>(src).context("parse world yaml")?;
        let rooms = f.rooms.into_iter().map(|r| {
            let mut room = Room::new(r.name, r.description.trim());
            for (dir, to) in r.exits {
                room = room.with_exit(dir, to.trim());
            }
            for e in r.entities {
                room = room.with_entity(Entity::new(e.name.trim(), e.kind));
            }
            room
        });
        Ok(Self::from_rooms(f.start_room, rooms)?)
    }

    /// The world compiled into the binary.
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_yaml(EMBEDDED_WORLD).context("embedded world")
    }

    pub fn start_room(&self) -> &str {
        &self.start_room
    }

    pub fn lookup(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn resolve_exit(&self, room: &str, dir: Direction) -> Result<&str, Refusal> {
        self.rooms
            .get(room)
            .and_then(|r| r.exit(dir))
            .ok_or(Refusal::NoExit)
    }

    /// Rooms no sequence of exits leads to from the start room, sorted by name.
    pub fn unreachable_rooms(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.start_room.as_str()]);
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(r) = self.rooms.get(name) {
                queue.extend(r.exits().map(|(_, to)| to));
            }
        }
        let mut out = self
            .rooms
            .keys()
            .map(String::as_str)
            .filter(|n| !seen.contains(n))
            .collect::<Vec<_>>();
        out.sort_unstable();
        out
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Place a new player in the start room and announce them to whoever is there.
    pub fn join(&mut self, name: &str, mailbox: Mailbox) -> PlayerId {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        let room = self.start_room.clone();
        if let Some(r) = self.rooms.get_mut(&room) {
            r.add_player(id, mailbox.clone());
            r.broadcast_except(id, &format!("{name} enters the world of Maoxian..."));
        }
        self.players.insert(
            id,
            Player {
                id,
                name: name.to_string(),
                room,
                held: None,
                mailbox,
            },
        );
        id
    }

    /// Take a player out of the world. Whatever they carried stays behind in their room.
    ///
    /// Once the returned player is dropped nothing can reach their mailbox any more.
    pub fn leave(&mut self, id: PlayerId) -> Option<Player> {
        let mut p = self.players.remove(&id)?;
        if let Some(r) = self.rooms.get_mut(&p.room) {
            r.remove_player(id);
            if let Some(e) = p.held.take() {
                r.broadcast(&format!("{} drops {}.", p.name, e.identifier()));
                r.add_entity(e);
            }
            r.broadcast(&format!("{} leaves the world of Maoxian.", p.name));
        }
        Some(p)
    }

    /// Move through the exit in `dir`, announcing it in both rooms. Returns what the mover
    /// sees on arrival.
    pub fn move_player(&mut self, id: PlayerId, dir: Direction) -> Result<String, Refusal> {
        let p = self.players.get_mut(&id).ok_or(Refusal::Gone)?;
        let to = self
            .rooms
            .get(&p.room)
            .and_then(|r| r.exit(dir))
            .filter(|to| self.rooms.contains_key(*to))
            .ok_or(Refusal::NoExit)?
            .to_string();

        let from = std::mem::replace(&mut p.room, to.clone());
        let name = p.name.clone();
        let mailbox = p.mailbox.clone();

        if let Some(r) = self.rooms.get_mut(&from) {
            r.remove_player(id);
            r.broadcast(&format!("{name} went {dir}"));
        }
        if let Some(r) = self.rooms.get_mut(&to) {
            r.broadcast(&format!("{name} moves in from {}", dir.opposite()));
            r.add_player(id, mailbox);
        }

        Ok(format!("Moved to {to}.\n{}", self.render_room(id)))
    }

    /// Pick up the entity called `name` in the player's room.
    pub fn take(&mut self, id: PlayerId, name: &str) -> Result<(), Refusal> {
        let index = self.find_here(id, name)?;
        self.pickup(id, index)
    }

    /// Pick up the entity at `index` of the player's room. Anything already in hand is put
    /// down first.
    pub fn pickup(&mut self, id: PlayerId, index: usize) -> Result<(), Refusal> {
        let p = self.players.get_mut(&id).ok_or(Refusal::Gone)?;
        let room = self.rooms.get_mut(&p.room).ok_or(Refusal::Gone)?;
        let target = room.entities().get(index).ok_or(Refusal::NotHere)?;
        entity::check_pickup(target.capabilities())?;

        let target = room.remove_entity_at(index).ok_or(Refusal::NotHere)?;
        if let Some(old) = p.held.take() {
            room.broadcast(&format!("{} drops {}.", p.name, old.identifier()));
            room.add_entity(old);
        }
        room.broadcast(&format!("{} picks up {}.", p.name, target.identifier()));
        p.held = Some(target);
        Ok(())
    }

    pub fn drop_held(&mut self, id: PlayerId) -> Result<(), Refusal> {
        let p = self.players.get_mut(&id).ok_or(Refusal::Gone)?;
        let e = p.held.take().ok_or(Refusal::NotCarrying)?;
        if let Some(room) = self.rooms.get_mut(&p.room) {
            room.broadcast(&format!("{} drops {}.", p.name, e.identifier()));
            room.add_entity(e);
        }
        Ok(())
    }

    /// Attack the entity called `name` in the player's room.
    pub fn attack_named(
        &mut self,
        id: PlayerId,
        name: &str,
        attack: Attack,
    ) -> Result<String, Refusal> {
        let index = self.find_here(id, name)?;
        self.attack(id, index, attack)
    }

    /// Destroy the entity at `index` if it can be destroyed. Only the attacker is told.
    pub fn attack(
        &mut self,
        id: PlayerId,
        index: usize,
        attack: Attack,
    ) -> Result<String, Refusal> {
        let p = self.players.get(&id).ok_or(Refusal::Gone)?;
        let room = self.rooms.get_mut(&p.room).ok_or(Refusal::Gone)?;
        let target = room.entities().get(index).ok_or(Refusal::NotHere)?;
        entity::check_attack(target.capabilities(), attack)?;

        let target = room.remove_entity_at(index).ok_or(Refusal::NotHere)?;
        debug!(
            player = %id,
            target = %target.identifier(),
            weapon = attack.weapon.verb(),
            strength = attack.strength,
            "entity destroyed"
        );
        Ok(format!(
            "You {} {} with {}. It is destroyed.",
            attack.weapon.verb(),
            target.identifier(),
            attack.weapon.describe()
        ))
    }

    /// Say something to everyone in the speaker's room, the speaker included.
    pub fn say(&self, id: PlayerId, text: &str) -> Result<(), Refusal> {
        let p = self.players.get(&id).ok_or(Refusal::Gone)?;
        if let Some(room) = self.rooms.get(&p.room) {
            room.broadcast(&format!("{} says \"{text}\"", p.name));
        }
        Ok(())
    }

    fn find_here(&self, id: PlayerId, name: &str) -> Result<usize, Refusal> {
        let p = self.players.get(&id).ok_or(Refusal::Gone)?;
        self.rooms
            .get(&p.room)
            .and_then(|r| r.find_entity(name))
            .ok_or(Refusal::NotHere)
    }

    /// Description, exits, visible entities and the other players, as `id` sees the room.
    pub fn render_room(&self, id: PlayerId) -> String {
        let Some(room) = self.players.get(&id).and_then(|p| self.rooms.get(&p.room)) else {
            return String::new();
        };

        let mut s = String::new();
        s.push_str(room.description());
        s.push('\n');

        let exits = room
            .exits()
            .map(|(d, to)| format!("{}{d}{} => {to}", ansi::BOLD, ansi::NORMAL))
            .collect::<Vec<_>>();
        if !exits.is_empty() {
            s.push_str(&exits.join("; "));
            s.push('\n');
        }

        if !room.entities().is_empty() {
            let seen = room
                .entities()
                .iter()
                .map(Entity::display)
                .collect::<Vec<_>>();
            s.push_str(&format!("You can see: {}\n", seen.join(", ")));
        }

        for other in room.players().filter(|o| *o != id) {
            let Some(o) = self.players.get(&other) else {
                continue;
            };
            s.push_str(&o.name);
            s.push_str(" is here");
            if let Some(e) = &o.held {
                s.push_str(", carrying ");
                s.push_str(e.identifier());
            }
            s.push_str(".\n");
        }
        s
    }
}

#[derive(Debug, Deserialize)]
struct WorldFile {
    start_room: String,
    rooms: Vec<RoomFile>,
}

#[derive(Debug, Deserialize)]
struct RoomFile {
    name: String,
    description: String,
    #[serde(default)]
    exits: BTreeMap<Direction, String>,
    #[serde(default)]
    entities: Vec<EntityFile>,
}

#[derive(Debug, Deserialize)]
struct EntityFile {
    name: String,
    kind: EntityKind,
}
