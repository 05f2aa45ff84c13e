use crate::error::{Error, Result};
use shakmaty::Color;
use std::{cmp::Ordering, fmt};

/// Bytes of one packed [`GameRef`]: 8 id bytes, 2 rating bytes, 1 winner byte.
pub const PACK_SIZE: usize = 11;

const ID_SIZE: usize = 8;

/// Opaque fixed-width game identifier.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameId(pub [u8; ID_SIZE]);

impl GameId {
    /// Takes the last path segment of a `Site` header such as
    /// `https://lichess.org/AbCdEfGh`, zero padded or cut to 8 bytes.
    #[must_use]
    pub fn from_site(site: &[u8]) -> GameId {
        let segment = site.rsplit(|ch| *ch == b'/').next().unwrap_or(site);
        let mut id = [0; ID_SIZE];
        let len = segment.len().min(ID_SIZE);
        id[..len].copy_from_slice(&segment[..len]);
        GameId(id)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(ID_SIZE);
        f.write_str(&String::from_utf8_lossy(&self.0[..end]))
    }
}

/// One sample game stored alongside a position's counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GameRef {
    pub id: GameId,
    /// Average of both players' ratings.
    pub rating: u16,
    /// `None` for a draw.
    pub winner: Option<Color>,
}

impl GameRef {
    #[must_use]
    pub fn new(id: GameId, white_rating: u16, black_rating: u16, winner: Option<Color>) -> GameRef {
        let rating = (u32::from(white_rating) + u32::from(black_rating)) / 2;
        GameRef {
            id,
            rating: rating as u16,
            winner,
        }
    }

    #[must_use]
    pub fn pack(&self) -> [u8; PACK_SIZE] {
        let mut buf = [0; PACK_SIZE];
        buf[..ID_SIZE].copy_from_slice(&self.id.0);
        buf[ID_SIZE..ID_SIZE + 2].copy_from_slice(&self.rating.to_be_bytes());
        buf[PACK_SIZE - 1] = winner_tag(self.winner);
        buf
    }

    pub fn unpack(bytes: &[u8]) -> Result<GameRef> {
        if bytes.len() != PACK_SIZE {
            return Err(Error::InvalidInput {
                expected: PACK_SIZE,
                found: bytes.len(),
            });
        }
        let mut id = [0; ID_SIZE];
        id.copy_from_slice(&bytes[..ID_SIZE]);
        let rating = u16::from_be_bytes([bytes[ID_SIZE], bytes[ID_SIZE + 1]]);
        let winner = match bytes[PACK_SIZE - 1] {
            0 => None,
            1 => Some(Color::White),
            2 => Some(Color::Black),
            tag => return Err(Error::corruption(format!("winner tag {tag}"))),
        };
        Ok(GameRef {
            id: GameId(id),
            rating,
            winner,
        })
    }
}

fn winner_tag(winner: Option<Color>) -> u8 {
    match winner {
        None => 0,
        Some(Color::White) => 1,
        Some(Color::Black) => 2,
    }
}

// Top-games order: rating descending, then id, then winner.
impl Ord for GameRef {
    fn cmp(&self, other: &GameRef) -> Ordering {
        other
            .rating
            .cmp(&self.rating)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| winner_tag(self.winner).cmp(&winner_tag(other.winner)))
    }
}

impl PartialOrd for GameRef {
    fn partial_cmp(&self, other: &GameRef) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
