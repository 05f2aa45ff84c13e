use crate::config::VariantName;
use crate::game_ref::{GameId, GameRef};
use crate::sampling::Sampler;
use crate::speed::Speed;
use crate::{config, GameSummary};
use crossbeam_channel::Sender;
use log::debug;
use pgn_reader::{RawHeader, Skip, Visitor};
use shakmaty::{san::SanPlus, Color};

const STANDARD_FEN: &[u8] = b"rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Visitor that extracts the game reference, speed and SAN move list for
/// each game that passes filtering, then sends it to the worker pool.
pub struct Extractor<'a> {
    tx: &'a Sender<GameSummary>,
    id: Option<GameId>,
    white_rating: Option<u16>,
    black_rating: Option<u16>,
    speed: Speed,
    winner: Option<Color>,
    has_result: bool,
    sans: Vec<SanPlus>,
    skip_game: bool,
    ply_count: u32,
    // filters
    min_rating: u16,
    min_ply_count: u32,
    sampler: Option<Sampler>,
    /// Set once the workers hung up; later games are not read.
    closed: bool,
    pub accepted: u64,
    pub skipped: u64,
}

impl<'a> Extractor<'a> {
    #[must_use] pub fn new(tx: &'a Sender<GameSummary>, cfg: &config::Ingest) -> Self {
        Self {
            tx,
            id: None,
            white_rating: None,
            black_rating: None,
            speed: Speed::Correspondence,
            winner: None,
            has_result: false,
            sans: Vec::new(),
            skip_game: false,
            ply_count: 0,
            min_rating: cfg.min_rating,
            min_ply_count: cfg.min_ply_count,
            sampler: (cfg.sample && cfg.variant == VariantName::Lichess)
                .then(|| Sampler::new(cfg.sample_seed)),
            closed: false,
            accepted: 0,
            skipped: 0,
        }
    }

    #[must_use] pub fn is_closed(&self) -> bool { self.closed }

    fn rating(value: &RawHeader<'_>) -> Option<u16> {
        btoi::btou::<u16>(value.as_bytes()).ok()
    }

    fn summary(&self) -> Option<GameRef> {
        let (white, black) = (self.white_rating?, self.black_rating?);
        if white < self.min_rating || black < self.min_rating || !self.has_result {
            return None;
        }
        Some(GameRef::new(self.id?, white, black, self.winner))
    }
}

impl Visitor for Extractor<'_> {
    type Result = ();

    fn begin_game(&mut self) {
        self.id = None;
        self.white_rating = None;
        self.black_rating = None;
        self.speed = Speed::Correspondence;
        self.winner = None;
        self.has_result = false;
        self.ply_count = 0;
        self.sans.clear();
    }

    fn begin_headers(&mut self) {
        self.skip_game = false;
    }

    fn header(&mut self, key: &[u8], value: RawHeader) {
        match key {
            b"Site" | b"LichessId" => self.id = Some(GameId::from_site(value.as_bytes())),
            b"WhiteElo" => self.white_rating = Self::rating(&value),
            b"BlackElo" => self.black_rating = Self::rating(&value),
            b"TimeControl" => self.speed = Speed::from_bytes(value.as_bytes()),
            b"Result" => {
                self.has_result = true;
                match value.as_bytes() {
                    b"1-0" => self.winner = Some(Color::White),
                    b"0-1" => self.winner = Some(Color::Black),
                    b"1/2-1/2" => self.winner = None,
                    _ => self.has_result = false,
                }
            }
            b"Variant" => {
                if !value.as_bytes().eq_ignore_ascii_case(b"standard") { self.skip_game = true; }
            }
            b"FEN" => {
                if value.as_bytes() != STANDARD_FEN { self.skip_game = true; }
            }
            b"WhiteTitle" | b"BlackTitle" => {
                if value.as_bytes() == b"BOT" { self.skip_game = true; }
            }
            _ => {}
        }
    }

    fn end_headers(&mut self) -> Skip {
        if self.closed || self.summary().is_none() {
            self.skip_game = true;
        } else if let (Some(sampler), Some(white), Some(black)) =
            (self.sampler.as_mut(), self.white_rating, self.black_rating)
        {
            if !self.skip_game && !sampler.accept(self.speed, white, black) { self.skip_game = true; }
        }
        Skip(self.skip_game)
    }

    fn san(&mut self, san_plus: SanPlus) {
        self.ply_count += 1;
        self.sans.push(san_plus);
    }

    fn begin_variation(&mut self) -> Skip { Skip(true) } // stay in the mainline

    fn end_game(&mut self) {
        if self.closed {
            self.sans.clear();
            return;
        }
        let game = self.summary().filter(|_| !self.skip_game && self.ply_count >= self.min_ply_count);
        match game {
            Some(game) => {
                let summary = GameSummary { game, speed: self.speed, sans: std::mem::take(&mut self.sans) };
                match self.tx.send(summary) {
                    Ok(()) => self.accepted += 1,
                    Err(_) => self.closed = true, // every worker has exited
                }
            }
            None => {
                self.skipped += 1;
                debug!("Skipping game {}", self.id.map(|id| id.to_string()).unwrap_or_default());
            }
        }
        self.sans.clear();
        self.ply_count = 0;
    }
}
