use crate::direction::Direction;

/// Why a command did nothing. The `Display` text is exactly what the player sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    Usage(&'static str),
    UnknownCommand(String),
    NoExit,
    NotHere,
    CannotPickUp,
    CannotAttack,
    NotCarrying,
    Gone,
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refusal::Usage(s) => f.write_str(s),
            Refusal::UnknownCommand(verb) => write!(f, "{verb} is not a known command."),
            Refusal::NoExit => f.write_str("Cannot move there."),
            Refusal::NotHere => f.write_str("That object isn't here."),
            Refusal::CannotPickUp => f.write_str("Can't pick that up."),
            Refusal::CannotAttack => f.write_str("Can't attack that."),
            Refusal::NotCarrying => f.write_str("You're not carrying anything!"),
            Refusal::Gone => f.write_str("You are no longer in the world."),
        }
    }
}

impl std::error::Error for Refusal {}

/// A world definition that cannot be booted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    Empty,
    DuplicateRoom(String),
    UnknownStartRoom(String),
    DanglingExit {
        room: String,
        dir: Direction,
        to: String,
    },
}

impl std::fmt::Display for WorldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldError::Empty => f.write_str("world has no rooms"),
            WorldError::DuplicateRoom(name) => write!(f, "room defined twice: {name}"),
            WorldError::UnknownStartRoom(name) => write!(f, "start room not defined: {name}"),
            WorldError::DanglingExit { room, dir, to } => {
                write!(f, "room {room}: exit {dir} leads to undefined room {to}")
            }
        }
    }
}

impl std::error::Error for WorldError {}
