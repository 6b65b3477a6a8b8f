//! Core types for the match (players, teams, identifiers).
//!
//! Identifiers are newtype wrappers. [`Player`] and [`Team`] serialize in the
//! camelCase shape polled by clients.

use std::fmt;

/// Full health; also the respawn value.
pub const MAX_HEALTH: u8 = 100;

/// Highest join code a player may pick (inclusive, lowest is 0).
pub const MAX_CODE: u8 = 99;

/// Opaque player identifier, unique for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

/// One of the two fixed teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamKey {
    Blue,
    Red,
}

impl TeamKey {
    pub const ALL: [TeamKey; 2] = [TeamKey::Blue, TeamKey::Red];

    /// Parses a wire team key. Only the exact lowercase keys are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blue" => Some(TeamKey::Blue),
            "red" => Some(TeamKey::Red),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TeamKey::Blue => "blue",
            TeamKey::Red => "red",
        }
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Team record: display data plus the capture counter.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    pub color: String,
    pub flags_captured: u32,
}

impl Team {
    /// Fresh record for `key` with zero captures.
    pub fn new(key: TeamKey) -> Self {
        let (name, color) = match key {
            TeamKey::Blue => ("Blue", "#3b82f6"),
            TeamKey::Red => ("Red", "#ef4444"),
        };
        Self {
            name: name.into(),
            color: color.into(),
            flags_captured: 0,
        }
    }
}

/// An active participant.
///
/// `identity_source` is the originating network address. It is a uniqueness key
/// and is never sent back to clients.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub number: u32,
    pub code: u8,
    pub name: String,
    #[serde(skip)]
    pub identity_source: String,
    pub team: TeamKey,
    pub kills: u32,
    pub health: u8,
    /// Unix milliseconds.
    pub joined_at: i64,
}

impl Player {
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}
