//! `maoxian`: the shared world behind the Maoxian text adventure.
//!
//! One [`world::World`] holds the room graph and every connected player. Each telnet
//! session runs [`session::run`], which feeds the player's input through the command
//! table in [`command`] while a second task delivers whatever other players' actions
//! dropped into the player's [`mailbox`].

pub mod command;
pub mod direction;
pub mod entity;
pub mod error;
pub mod mailbox;
pub mod player;
pub mod room;
pub mod session;
pub mod world;

pub(crate) mod ansi {
    pub const NORMAL: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
}
