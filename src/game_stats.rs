use serde::Serialize;
use shakmaty::Color;

/// Largest value a counter may hold: the capacity of the widest (6 byte)
/// on-disk counter field.
pub const MAX_COUNT: u64 = (1 << 48) - 1;

/// Outcome counters, seen from white's side of the board.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct GameWins {
    pub white: u64,
    pub draws: u64,
    pub black: u64,
}

impl GameWins {
    #[must_use]
    pub fn from_winner(winner: Option<Color>) -> GameWins {
        match winner {
            Some(Color::White) => GameWins { white: 1, ..Default::default() },
            Some(Color::Black) => GameWins { black: 1, ..Default::default() },
            None => GameWins { draws: 1, ..Default::default() },
        }
    }

    /// Counter-wise sum, saturating at [`MAX_COUNT`].
    #[must_use]
    pub fn combine(&self, other: &GameWins) -> GameWins {
        GameWins {
            white: add(self.white, other.white),
            draws: add(self.draws, other.draws),
            black: add(self.black, other.black),
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.white + self.draws + self.black
    }
}

#[inline]
fn add(a: u64, b: u64) -> u64 {
    a.saturating_add(b).min(MAX_COUNT)
}
