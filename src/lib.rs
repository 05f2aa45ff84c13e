extern crate btoi;
extern crate pgn_reader;
extern crate rocksdb;
extern crate serde;
extern crate shakmaty;
extern crate zstd;

pub mod chess_db;
pub mod config;
pub mod error;
pub mod extractor;
pub mod game_ref;
pub mod game_stats;
pub mod ingest;
pub mod merge;
pub mod rating;
pub mod record;
pub mod rocks_cfg;
pub mod sampling;
pub mod speed;
pub mod worker;

pub use error::{Error, Result};

use game_ref::GameRef;
use serde::Serialize;
use shakmaty::{san::SanPlus, Color};
use speed::Speed;

/// Chess game data to ingest
#[derive(Debug)]
pub struct GameSummary {
    pub game: GameRef,
    pub speed: Speed,
    pub sans: Vec<SanPlus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopGame {
    pub id: String,
    pub rating: u16,
    pub winner: Option<&'static str>,
}

impl From<&GameRef> for TopGame {
    fn from(game: &GameRef) -> TopGame {
        TopGame {
            id: game.id.to_string(),
            rating: game.rating,
            winner: game.winner.map(|color| match color {
                Color::White => "white",
                Color::Black => "black",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingResult {
    pub floor: u16,
    pub white: u64,
    pub draws: u64,
    pub black: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionResult {
    pub white: u64,
    pub draws: u64,
    pub black: u64,
    pub total: u64,
    pub ratings: Vec<RatingResult>,
    pub top_games: Vec<TopGame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeedKeys {
    pub speed: Speed,
    pub keys: u64,
}

/// Stored key counts of one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub variant: &'static str,
    pub keys: u64,
    pub by_speed: Vec<SpeedKeys>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveResult {
    pub uci: String,
    pub san: String,
    #[serde(flatten)]
    pub stats: PositionResult,
}
