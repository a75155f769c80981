use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::direction::Direction;
use crate::entity::Entity;
use crate::mailbox::{Delivery, Mailbox};
use crate::player::PlayerId;

#[derive(Debug, Clone)]
struct Occupant {
    id: PlayerId,
    mailbox: Mailbox,
}

#[derive(Debug, Clone)]
pub struct Room {
    name: String,
    description: String,
    exits: BTreeMap<Direction, String>,
    entities: Vec<Entity>,
    players: Vec<Occupant>,
}

impl Room {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            exits: BTreeMap::new(),
            entities: Vec::new(),
            players: Vec::new(),
        }
    }

    pub fn with_exit(mut self, dir: Direction, to: impl Into<String>) -> Self {
        self.exits.insert(dir, to.into());
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn exit(&self, dir: Direction) -> Option<&str> {
        self.exits.get(&dir).map(String::as_str)
    }

    pub fn exits(&self) -> impl Iterator<Item = (Direction, &str)> {
        self.exits.iter().map(|(d, to)| (*d, to.as_str()))
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Index of the first entity whose identifier is exactly `name`.
    pub fn find_entity(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.identifier() == name)
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn remove_entity_at(&mut self, index: usize) -> Option<Entity> {
        if index < self.entities.len() {
            Some(self.entities.remove(index))
        } else {
            None
        }
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|o| o.id)
    }

    pub fn has_player(&self, id: PlayerId) -> bool {
        self.players.iter().any(|o| o.id == id)
    }

    pub fn add_player(&mut self, id: PlayerId, mailbox: Mailbox) {
        if self.has_player(id) {
            return;
        }
        self.players.push(Occupant { id, mailbox });
    }

    /// Removing someone who is not here is a no-op.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|o| o.id != id);
        self.players.len() != before
    }

    pub fn broadcast(&self, msg: &str) {
        for o in &self.players {
            self.deliver(o, msg);
        }
    }

    pub fn broadcast_except(&self, except: PlayerId, msg: &str) {
        for o in self.players.iter().filter(|o| o.id != except) {
            self.deliver(o, msg);
        }
    }

    fn deliver(&self, o: &Occupant, msg: &str) {
        match o.mailbox.notify(msg) {
            Delivery::Queued => {}
            Delivery::Full => {
                warn!(room = %self.name, player = %o.id, "mailbox full; notice dropped");
            }
            Delivery::Closed => {
                debug!(room = %self.name, player = %o.id, "mailbox closed; notice dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::mailbox::mailbox;

    #[test]
    fn players_are_tracked_once_and_removal_is_idempotent() {
        let (mb, _inbox) = mailbox();
        let mut r = Room::new("cabin", "A small cabin.");
        r.add_player(PlayerId(1), mb.clone());
        r.add_player(PlayerId(1), mb);
        assert_eq!(r.players().count(), 1);

        assert!(r.remove_player(PlayerId(1)));
        assert!(!r.remove_player(PlayerId(1)));
        assert_eq!(r.players().count(), 0);
    }

    #[test]
    fn broadcast_except_skips_one_occupant() {
        let (a, mut a_in) = mailbox();
        let (b, mut b_in) = mailbox();
        let mut r = Room::new("cabin", "A small cabin.");
        r.add_player(PlayerId(1), a);
        r.add_player(PlayerId(2), b);

        r.broadcast_except(PlayerId(1), "psst");
        r.broadcast("hello");

        assert_eq!(a_in.drain(), vec!["hello".to_string()]);
        assert_eq!(b_in.drain(), vec!["psst".to_string(), "hello".to_string()]);
    }

    #[test]
    fn entities_are_found_by_exact_name() {
        let mut r = Room::new("square", "A square.")
            .with_entity(Entity::new("apple", EntityKind::Item))
            .with_entity(Entity::new("holy well", EntityKind::Fixture));

        assert_eq!(r.find_entity("holy well"), Some(1));
        assert_eq!(r.find_entity("Apple"), None);
        assert_eq!(r.find_entity("holy"), None);

        let apple = r.remove_entity_at(0).expect("apple");
        assert_eq!(apple.identifier(), "apple");
        assert!(r.remove_entity_at(5).is_none());
        assert_eq!(r.entities().len(), 1);
    }
}
