//! Action symbols, beat slots and side identifiers

use serde::{Deserialize, Serialize};

/// An action a fighter can perform on one beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Neutral action, also the default for an empty beat
    #[default]
    None,
    /// Gather energy
    Charge,
    /// Guard against attacks
    #[serde(alias = "GUARD")]
    Block,
    /// Melee strike
    Attack,
    /// Energy beam (costs 2 energy)
    #[serde(alias = "KAMEHAMEHA")]
    Beam,
    /// Evade everything this beat (costs 1 energy)
    Teleport,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::None,
        Action::Charge,
        Action::Block,
        Action::Attack,
        Action::Beam,
        Action::Teleport,
    ];

    /// Energy required to perform this action
    pub fn energy_cost(self) -> u32 {
        match self {
            Action::Beam => 2,
            Action::Teleport => 1,
            Action::None | Action::Charge | Action::Block | Action::Attack => 0,
        }
    }
}

/// One of the two input beats of a turn.
///
/// On the wire a beat is the integer `1` or `2`; anything else fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Beat {
    First,
    Second,
}

impl Beat {
    pub const BOTH: [Beat; 2] = [Beat::First, Beat::Second];

    /// Zero-based slot index
    pub fn index(self) -> usize {
        match self {
            Beat::First => 0,
            Beat::Second => 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("beat must be 1 or 2, got {0}")]
pub struct InvalidBeat(pub u8);

impl TryFrom<u8> for Beat {
    type Error = InvalidBeat;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Beat::First),
            2 => Ok(Beat::Second),
            other => Err(InvalidBeat(other)),
        }
    }
}

impl From<Beat> for u8 {
    fn from(beat: Beat) -> u8 {
        match beat {
            Beat::First => 1,
            Beat::Second => 2,
        }
    }
}

/// Side of a duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    P1,
    P2,
}

/// Result of a round or of the whole match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    P1,
    P2,
    Draw,
}

/// A value held once per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SidePair<T> {
    pub p1: T,
    pub p2: T,
}

impl<T> SidePair<T> {
    pub fn new(p1: T, p2: T) -> Self {
        Self { p1, p2 }
    }

    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::P1 => &self.p1,
            Side::P2 => &self.p2,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::P1 => &mut self.p1,
            Side::P2 => &mut self.p2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names_and_aliases() {
        let parsed: Action = serde_json::from_str("\"GUARD\"").unwrap();
        assert_eq!(parsed, Action::Block);
        let parsed: Action = serde_json::from_str("\"KAMEHAMEHA\"").unwrap();
        assert_eq!(parsed, Action::Beam);
        assert_eq!(serde_json::to_string(&Action::Teleport).unwrap(), "\"TELEPORT\"");
    }

    #[test]
    fn test_beat_accepts_only_one_or_two() {
        assert_eq!(serde_json::from_str::<Beat>("1").unwrap(), Beat::First);
        assert_eq!(serde_json::from_str::<Beat>("2").unwrap(), Beat::Second);
        assert!(serde_json::from_str::<Beat>("0").is_err());
        assert!(serde_json::from_str::<Beat>("3").is_err());
        assert!(serde_json::from_str::<Beat>("\"1\"").is_err());
    }

    #[test]
    fn test_only_beam_and_teleport_cost_energy() {
        let costed: Vec<Action> = Action::ALL
            .into_iter()
            .filter(|a| a.energy_cost() > 0)
            .collect();
        assert_eq!(costed, vec![Action::Beam, Action::Teleport]);
    }
}
