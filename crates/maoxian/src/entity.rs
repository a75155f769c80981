use serde::Deserialize;

use crate::ansi;
use crate::error::Refusal;

/// What a thing in a room is. The kind alone decides what players can do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Can be carried and destroyed (fruit, junk).
    Item,
    /// Stays put but can be smashed (crates, pots).
    Breakable,
    /// Part of the room (wells, levers).
    Fixture,
    Person,
    Creature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub pickupable: bool,
    pub destructible: bool,
}

impl EntityKind {
    pub fn capabilities(self) -> Capabilities {
        let (pickupable, destructible) = match self {
            EntityKind::Item => (true, true),
            EntityKind::Breakable => (false, true),
            EntityKind::Fixture | EntityKind::Person | EntityKind::Creature => (false, false),
        };
        Capabilities {
            pickupable,
            destructible,
        }
    }

    fn style(self) -> &'static str {
        match self {
            EntityKind::Person | EntityKind::Creature => ansi::BOLD,
            EntityKind::Item | EntityKind::Breakable | EntityKind::Fixture => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    BareHands,
}

impl WeaponKind {
    pub fn verb(self) -> &'static str {
        match self {
            WeaponKind::BareHands => "punch",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            WeaponKind::BareHands => "your bare hands",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attack {
    pub weapon: WeaponKind,
    pub strength: u32,
}

impl Attack {
    pub const PUNCH: Attack = Attack {
        weapon: WeaponKind::BareHands,
        strength: 0,
    };
}

/// Whether `caps` allows being picked up.
pub fn check_pickup(caps: Capabilities) -> Result<(), Refusal> {
    if caps.pickupable {
        Ok(())
    } else {
        Err(Refusal::CannotPickUp)
    }
}

/// Whether `caps` allows being destroyed by `attack`.
///
/// Strength does not matter yet: anything destructible breaks on the first hit.
pub fn check_attack(caps: Capabilities, _attack: Attack) -> Result<(), Refusal> {
    if caps.destructible {
        Ok(())
    } else {
        Err(Refusal::CannotAttack)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    name: String,
    kind: EntityKind,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The name players type to refer to this entity.
    pub fn identifier(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    pub fn display(&self) -> String {
        let style = self.kind.style();
        if style.is_empty() {
            self.name.clone()
        } else {
            format!("{style}{}{}", self.name, ansi::NORMAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_every_capability_combination() {
        let caps = |k: EntityKind| {
            let c = k.capabilities();
            (c.pickupable, c.destructible)
        };
        assert_eq!(caps(EntityKind::Item), (true, true));
        assert_eq!(caps(EntityKind::Breakable), (false, true));
        assert_eq!(caps(EntityKind::Fixture), (false, false));
        assert_eq!(caps(EntityKind::Creature), (false, false));
    }

    #[test]
    fn rules_refuse_by_capability() {
        let well = EntityKind::Fixture.capabilities();
        assert_eq!(check_pickup(well), Err(Refusal::CannotPickUp));
        assert_eq!(check_attack(well, Attack::PUNCH), Err(Refusal::CannotAttack));

        let apple = EntityKind::Item.capabilities();
        assert_eq!(check_pickup(apple), Ok(()));
        assert_eq!(check_attack(apple, Attack::PUNCH), Ok(()));
    }

    #[test]
    fn people_are_shown_in_bold() {
        assert_eq!(Entity::new("apple", EntityKind::Item).display(), "apple");
        assert_eq!(
            Entity::new("monk", EntityKind::Person).display(),
            "\x1b[1mmonk\x1b[0m"
        );
    }
}
