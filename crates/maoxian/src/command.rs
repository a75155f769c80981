//! Player commands.
//!
//! A line is split into words; the first word is looked up in [`VERBS`] (aliases are just
//! more rows pointing at the same verb) or, failing that, read as a direction, which means
//! `move <direction>`. Every handler runs with the world locked.

use crate::direction::Direction;
use crate::entity::Attack;
use crate::error::Refusal;
use crate::player::PlayerId;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Help,
    Look,
    Move,
    Say,
    Take,
    Drop,
    Punch,
    WhoAmI,
    Exit,
}

pub const VERBS: &[(&str, Verb)] = &[
    ("help", Verb::Help),
    ("look", Verb::Look),
    ("l", Verb::Look),
    ("move", Verb::Move),
    ("go", Verb::Move),
    ("say", Verb::Say),
    ("take", Verb::Take),
    ("get", Verb::Take),
    ("drop", Verb::Drop),
    ("punch", Verb::Punch),
    ("whoami", Verb::WhoAmI),
    ("exit", Verb::Exit),
    ("quit", Verb::Exit),
];

const USAGE_MOVE: &str = "type: `move [direction]` to move somewhere. Example: move east.";
const USAGE_SAY: &str = "type: `say [stuff]` to say something. People in the same room will be able to see your message.";
const USAGE_TAKE: &str = "type: `take [thing]` to take something in this room.";
const USAGE_PUNCH: &str = "type: `punch [thing]` to attack something in this room.";

const HELP_ROWS: &[(&str, &str)] = &[
    ("look or l", "Show a description of the current room and its contents."),
    ("move [direction]", "Move to another room. Example: `move north` will go north."),
    ("[direction]", "Alias for `move [direction]`. n, s, e, w, u and d work too."),
    ("say [stuff...]", "Say something. People in the same room will be able to see your message."),
    ("take [thing]", "Pick something up. You can carry one thing at a time."),
    ("drop", "Put down whatever you are carrying."),
    ("punch [thing]", "Hit something with your bare hands."),
    ("whoami", "Show who you are."),
    ("exit", "Leave the land of Maoxian and return to your boring terminal."),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    /// Everything after the first space following the verb, untouched.
    pub arg: String,
}

impl Command {
    /// `Ok(None)` for a blank line; an unknown first word is refused.
    ///
    /// Words are separated by single spaces and matched case-sensitively, so `LOOK` is not
    /// `look` and `take holy  well` names something other than `holy well`.
    pub fn parse(line: &str) -> Result<Option<Self>, Refusal> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (first, arg) = line.split_once(' ').unwrap_or((line, ""));

        if let Some((_, verb)) = VERBS.iter().find(|(w, _)| *w == first) {
            return Ok(Some(Self {
                verb: *verb,
                arg: arg.to_string(),
            }));
        }
        if Direction::parse(first).is_some() {
            return Ok(Some(Self {
                verb: Verb::Move,
                arg: first.to_string(),
            }));
        }
        Err(Refusal::UnknownCommand(first.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Text for the acting player only.
    pub reply: String,
    /// The player asked to leave.
    pub quit: bool,
}

/// Run one line of input for `id`. `None` when the line was blank.
pub fn execute(world: &mut World, id: PlayerId, line: &str) -> Option<Outcome> {
    let res = match Command::parse(line) {
        Ok(None) => return None,
        Ok(Some(cmd)) => dispatch(world, id, &cmd),
        Err(r) => Err(r),
    };
    Some(match res {
        Ok(outcome) => outcome,
        Err(r) => Outcome {
            reply: r.to_string(),
            quit: false,
        },
    })
}

fn dispatch(world: &mut World, id: PlayerId, cmd: &Command) -> Result<Outcome, Refusal> {
    let reply = match cmd.verb {
        Verb::Help => help(),
        Verb::Look => world.render_room(id),
        Verb::Move => move_to(world, id, &cmd.arg)?,
        Verb::Say => {
            if cmd.arg.is_empty() {
                return Err(Refusal::Usage(USAGE_SAY));
            }
            world.say(id, &cmd.arg)?;
            String::new()
        }
        Verb::Take => {
            if cmd.arg.is_empty() {
                return Err(Refusal::Usage(USAGE_TAKE));
            }
            world.take(id, &cmd.arg)?;
            String::new()
        }
        Verb::Drop => {
            world.drop_held(id)?;
            String::new()
        }
        Verb::Punch => {
            if cmd.arg.is_empty() {
                return Err(Refusal::Usage(USAGE_PUNCH));
            }
            world.attack_named(id, &cmd.arg, Attack::PUNCH)?
        }
        Verb::WhoAmI => {
            let p = world.player(id).ok_or(Refusal::Gone)?;
            format!("You are {}", p.name())
        }
        Verb::Exit => {
            return Ok(Outcome {
                reply: "Leaving the land of Maoxian...".to_string(),
                quit: true,
            });
        }
    };
    Ok(Outcome {
        reply,
        quit: false,
    })
}

/// Only the first word counts: `move east quickly` goes east.
fn move_to(world: &mut World, id: PlayerId, arg: &str) -> Result<String, Refusal> {
    if arg.is_empty() {
        return Err(Refusal::Usage(USAGE_MOVE));
    }
    let word = arg.split(' ').next().unwrap_or(arg);
    let dir = Direction::parse(word).ok_or(Refusal::NoExit)?;
    world.move_player(id, dir)
}

fn help() -> String {
    let width = HELP_ROWS.iter().map(|(c, _)| c.len()).max().unwrap_or(0) + 2;
    let mut s = String::from("Maoxian MUD basic commands\n\n");
    for (cmd, what) in HELP_ROWS {
        s.push_str(&format!(" {cmd:<width$}{what}\n"));
    }
    s.push_str(
        "\npsst! try running 'look' to get started. Remember to hit [Enter] after writing any command",
    );
    s
}
