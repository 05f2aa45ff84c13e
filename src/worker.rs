use crate::chess_db::{pos_to_hash, PositionHash, PositionStore, Variant};
use crate::error::Result;
use crate::GameSummary;
use ahash::AHashSet;
use crossbeam_channel::Receiver;
use indicatif::ProgressBar;
use log::warn;
use shakmaty::{san::SanPlus, Chess, Position};

/// Entry point: called from `ingest` for each worker thread. Returns the
/// number of games merged.
pub fn run<V: Variant>(
    rx: &Receiver<GameSummary>,
    store: &PositionStore<V>,
    progress: &ProgressBar,
) -> Result<u64> {
    let mut games = 0;
    while let Ok(summary) = rx.recv() {
        let hashes = game_line_hashes(&summary.sans);
        store.merge(&summary.game, summary.speed, &hashes)?;
        games += 1;
        progress.inc(1);
    }
    Ok(games)
}

/// Hashes of every position along the game line, starting position first.
/// A position reached more than once is listed once.
pub fn game_line_hashes(sans: &[SanPlus]) -> Vec<PositionHash> {
    let mut board = Chess::default();
    let mut seen = AHashSet::with_capacity(sans.len() + 1);
    let mut hashes = Vec::with_capacity(sans.len() + 1);
    let mut push = |pos: &Chess| {
        let hash = pos_to_hash(pos);
        if seen.insert(hash) {
            hashes.push(hash);
        }
    };
    push(&board);
    for (ply, san_plus) in sans.iter().enumerate() {
        let Ok(mv) = san_plus.san.to_move(&board) else {
            warn!("Illegal move {san_plus} at ply {}, truncating line", ply + 1);
            break;
        };
        board.play_unchecked(&mv);
        push(&board);
    }
    hashes
}
