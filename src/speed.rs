use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Time-control category of a game. The discriminant is the storage id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Speed {
    UltraBullet = 0,
    Bullet = 1,
    Blitz = 2,
    Rapid = 3,
    Classical = 4,
    Correspondence = 5,
}

impl Speed {
    pub const ALL: [Speed; 6] = [
        Speed::UltraBullet,
        Speed::Bullet,
        Speed::Blitz,
        Speed::Rapid,
        Speed::Classical,
        Speed::Correspondence,
    ];

    /// Classifies by estimated game duration, `seconds + 40 * increment`.
    #[must_use]
    pub fn from_seconds_and_increment(seconds: u64, increment: u64) -> Speed {
        let total = seconds.saturating_add(increment.saturating_mul(40));

        if total < 30 {
            Speed::UltraBullet
        } else if total < 180 {
            Speed::Bullet
        } else if total < 480 {
            Speed::Blitz
        } else if total < 1500 {
            Speed::Rapid
        } else if total < 21_600 {
            Speed::Classical
        } else {
            Speed::Correspondence
        }
    }

    /// Parses a PGN `TimeControl` value such as `300+3`. Anything that is
    /// not `<seconds>+<increment>` counts as correspondence.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Speed {
        let mut parts = bytes.splitn(2, |ch| *ch == b'+');
        let seconds = parts.next().and_then(|s| btoi::btou::<u64>(s).ok());
        let increment = parts.next().and_then(|s| btoi::btou::<u64>(s).ok());
        match (seconds, increment) {
            (Some(seconds), Some(increment)) => Speed::from_seconds_and_increment(seconds, increment),
            _ => Speed::Correspondence,
        }
    }

    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Speed> {
        Speed::ALL
            .get(usize::from(id))
            .copied()
            .ok_or(Error::UnknownSpeed(id))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Speed::UltraBullet => "ultraBullet",
            Speed::Bullet => "bullet",
            Speed::Blitz => "blitz",
            Speed::Rapid => "rapid",
            Speed::Classical => "classical",
            Speed::Correspondence => "correspondence",
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Speed {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Speed, String> {
        Speed::ALL
            .iter()
            .copied()
            .find(|speed| speed.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown speed: {s}"))
    }
}
