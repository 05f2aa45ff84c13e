use crate::error::{Error, Result};
use crate::game_ref::GameRef;
use crate::merge::{fold_packed, hex};
use crate::rating::{Overall, Partition, RatingGroup};
use crate::record::{Record, MAX_TOP_GAMES};
use crate::rocks_cfg;
use crate::speed::Speed;
use crate::{KeyStats, MoveResult, PositionResult, RatingResult, SpeedKeys, TopGame};
use rayon::prelude::*;
use log::{debug, error};
use rocksdb::{ErrorKind, IteratorMode, OptimisticTransactionDB};
use sha3::{Digest, Sha3_256};
use shakmaty::{fen::Epd, san::San, CastlingMode, Chess, EnPassantMode, Move, Position};
use std::{marker::PhantomData, path::Path};

pub const POSITION_HASH_LEN: usize = 32;

pub type PositionHash = [u8; POSITION_HASH_LEN];

/// Commit attempts for one key before a write conflict is reported.
const MAX_COMMIT_ATTEMPTS: usize = 64;

pub fn pos_to_keyable(pos: &Chess) -> String {
    Epd::from_position(pos.clone(), EnPassantMode::Legal).to_string()
}

/// Stable key of a position, independent of move counters.
pub fn pos_to_hash(pos: &Chess) -> PositionHash {
    let mut hasher = Sha3_256::new();
    hasher.update(pos_to_keyable(pos).as_bytes());
    let mut out = [0u8; POSITION_HASH_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// One database flavour: its aggregate shape and how keys are laid out.
pub trait Variant: Send + Sync + 'static {
    type Partition: Partition;

    /// Directory name below the database root.
    const NAME: &'static str;

    fn key(hash: &[u8], speed: Speed) -> Vec<u8>;

    /// Keys to read for a query restricted to `speeds` (empty means all).
    fn query_keys(hash: &[u8], speeds: &[Speed]) -> Vec<Vec<u8>>;

    /// Speed partition a stored key belongs to, if the variant has one.
    fn key_speed(key: &[u8]) -> Result<Option<Speed>>;
}

/// Curated over-the-board games, no speed partition.
pub struct Master;

impl Variant for Master {
    type Partition = Overall;

    const NAME: &'static str = "master";

    fn key(hash: &[u8], _speed: Speed) -> Vec<u8> {
        hash.to_vec()
    }

    fn query_keys(hash: &[u8], _speeds: &[Speed]) -> Vec<Vec<u8>> {
        vec![hash.to_vec()]
    }

    fn key_speed(_key: &[u8]) -> Result<Option<Speed>> {
        Ok(None)
    }
}

/// Online games, split by rating group and keyed by `(position, speed)`.
pub struct Lichess;

impl Variant for Lichess {
    type Partition = RatingGroup;

    const NAME: &'static str = "lichess";

    fn key(hash: &[u8], speed: Speed) -> Vec<u8> {
        let mut key = Vec::with_capacity(hash.len() + 1);
        key.extend_from_slice(hash);
        key.push(speed.id());
        key
    }

    fn query_keys(hash: &[u8], speeds: &[Speed]) -> Vec<Vec<u8>> {
        let speeds = if speeds.is_empty() { &Speed::ALL[..] } else { speeds };
        speeds.iter().map(|speed| Self::key(hash, *speed)).collect()
    }

    fn key_speed(key: &[u8]) -> Result<Option<Speed>> {
        match key.split_last() {
            Some((id, _)) => Speed::from_id(*id).map(Some),
            None => Err(Error::corruption("empty key")),
        }
    }
}

pub struct PositionStore<V: Variant> {
    db: OptimisticTransactionDB,
    variant: PhantomData<V>,
}

impl<V: Variant> PositionStore<V> {
    /// Opens (or creates) the variant's database below `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let db = OptimisticTransactionDB::open(&rocks_cfg::tuned(), root.as_ref().join(V::NAME))?;
        Ok(PositionStore {
            db,
            variant: PhantomData,
        })
    }

    /// Folds one game into every position along its line.
    ///
    /// Keys are updated one at a time and independently; a corrupt value
    /// stops the call with [`Error::Corruption`] and leaves that key as is.
    pub fn merge<I, H>(&self, game: &GameRef, speed: Speed, hashes: I) -> Result<()>
    where
        I: IntoIterator<Item = H>,
        H: AsRef<[u8]>,
    {
        let operand = Record::<V::Partition>::from_game(game).pack();
        for hash in hashes {
            self.merge_key(&V::key(hash.as_ref(), speed), &operand)?;
        }
        Ok(())
    }

    /// Read, combine and write back one key as an optimistic transaction,
    /// retrying when another writer committed the key first.
    fn merge_key(&self, key: &[u8], operand: &[u8]) -> Result<()> {
        let mut attempt = 1;
        loop {
            let txn = self.db.transaction();
            let existing = txn.get_for_update(key, true)?;
            let packed = fold_packed::<V::Partition, _>(existing.as_deref(), [operand])
                .map_err(|err| {
                    error!("Not merging into key {}: {err}", hex(key));
                    err
                })?;
            txn.put(key, packed)?;
            match txn.commit() {
                Ok(()) => return Ok(()),
                Err(err)
                    if matches!(err.kind(), ErrorKind::Busy | ErrorKind::TryAgain)
                        && attempt < MAX_COMMIT_ATTEMPTS =>
                {
                    debug!("Write conflict on key {}, attempt {attempt}", hex(key));
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// `None` when the key was never written.
    pub fn get(&self, key: &[u8]) -> Result<Option<Record<V::Partition>>> {
        match self.db.get_pinned(key)? {
            Some(value) => Ok(Some(Record::unpack(&value)?)),
            None => Ok(None),
        }
    }

    /// Combined record of a position over the requested speeds.
    pub fn lookup(&self, hash: &[u8], speeds: &[Speed]) -> Result<Record<V::Partition>> {
        let mut record = Record::new();
        for key in V::query_keys(hash, speeds) {
            if let Some(found) = self.get(&key)? {
                record = record.combine(&found);
            }
        }
        Ok(record)
    }

    pub fn query(&self, hash: &[u8], speeds: &[Speed], top_games: usize) -> Result<PositionResult> {
        let record = self.lookup(hash, speeds)?;
        Ok(position_result(&record, top_games))
    }

    /// Statistics of every legal successor that has been played at least once,
    /// most popular first.
    pub fn query_children(
        &self,
        pos: &Chess,
        speeds: &[Speed],
        top_games: usize,
    ) -> Result<Vec<MoveResult>> {
        let moves: Vec<Move> = pos.legal_moves().into_iter().collect();
        let mut children = moves
            .par_iter()
            .map(|m| -> Result<MoveResult> {
                let mut child = pos.clone();
                child.play_unchecked(m);
                let stats = self.query(&pos_to_hash(&child), speeds, top_games)?;
                Ok(MoveResult {
                    uci: m.to_uci(CastlingMode::Standard).to_string(),
                    san: San::from_move(pos, m).to_string(),
                    stats,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        children.retain(|child| child.stats.total > 0);
        children.sort_by(|a, b| {
            b.stats
                .total
                .cmp(&a.stats.total)
                .then_with(|| a.uci.cmp(&b.uci))
        });
        Ok(children)
    }

    /// Exact number of stored keys. The Lichess variant stores one key per
    /// `(position, speed)` pair, so this is a key count, not a position count.
    pub fn unique_positions(&self) -> Result<u64> {
        Ok(self.key_stats()?.keys)
    }

    /// Key count, broken down by speed for variants keyed by speed.
    pub fn key_stats(&self) -> Result<KeyStats> {
        let mut keys = 0;
        let mut by_speed = [0u64; Speed::ALL.len()];
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, _) = item?;
            keys += 1;
            if let Some(speed) = V::key_speed(&key)? {
                by_speed[usize::from(speed.id())] += 1;
            }
        }
        Ok(KeyStats {
            variant: V::NAME,
            keys,
            by_speed: Speed::ALL
                .iter()
                .zip(by_speed)
                .filter(|(_, keys)| *keys > 0)
                .map(|(speed, keys)| SpeedKeys { speed: *speed, keys })
                .collect(),
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn position_result<P: Partition>(record: &Record<P>, top_games: usize) -> PositionResult {
    let wins = record.wins();
    PositionResult {
        white: wins.white,
        draws: wins.draws,
        black: wins.black,
        total: record.total_games(),
        ratings: record
            .tallies()
            .iter()
            .enumerate()
            .map(|(i, tally)| RatingResult {
                floor: P::floor(i),
                white: tally.white,
                draws: tally.draws,
                black: tally.black,
            })
            .collect(),
        top_games: record
            .top_games()
            .iter()
            .take(top_games.min(MAX_TOP_GAMES))
            .map(TopGame::from)
            .collect(),
    }
}
