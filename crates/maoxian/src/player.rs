use crate::entity::Entity;
use crate::mailbox::Mailbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A connected identity. Lives in the world registry from join until leave.
#[derive(Debug)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) room: String,
    pub(crate) held: Option<Entity>,
    pub(crate) mailbox: Mailbox,
}

impl Player {
    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the room the player is in.
    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn held(&self) -> Option<&Entity> {
        self.held.as_ref()
    }
}
