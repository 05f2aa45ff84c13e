//! Per-position aggregate and its packed on-disk format.
//!
//! The format is picked by the number of games in the record:
//!
//! | games          | layout                                                |
//! |----------------|-------------------------------------------------------|
//! | 0              | empty                                                 |
//! | 1              | one packed [`GameRef`], no tag                        |
//! | 2..=5          | tag `1`, packed top games (counters are replayed)     |
//! | 6..=255        | tag `2`, 1 byte counters per bucket, then top games   |
//! | 256..=65535    | tag `3`, 2 byte counters                              |
//! | ..2^32         | tag `4`, 4 byte counters                              |
//! | 2^32..         | tag `5`, 6 byte counters                              |
//!
//! Counters are written as `white, draws, black` for every bucket of the
//! partition, in storage order, big-endian.

use crate::error::{Error, Result};
use crate::game_ref::{GameRef, PACK_SIZE};
use crate::game_stats::GameWins;
use crate::rating::Partition;

pub const MAX_TOP_GAMES: usize = 5;

const TAG_REPLAY: u8 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Width {
    U8,
    U16,
    U32,
    U48,
}

impl Width {
    fn for_total(total: u64) -> Width {
        if total <= u64::from(u8::MAX) {
            Width::U8
        } else if total <= u64::from(u16::MAX) {
            Width::U16
        } else if total <= u64::from(u32::MAX) {
            Width::U32
        } else {
            Width::U48
        }
    }

    fn from_tag(tag: u8) -> Option<Width> {
        match tag {
            2 => Some(Width::U8),
            3 => Some(Width::U16),
            4 => Some(Width::U32),
            5 => Some(Width::U48),
            _ => None,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Width::U8 => 2,
            Width::U16 => 3,
            Width::U32 => 4,
            Width::U48 => 5,
        }
    }

    fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
            Width::U48 => 6,
        }
    }

    fn write(self, value: u64, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&value.to_be_bytes()[8 - self.bytes()..]);
    }

    fn read(self, bytes: &[u8]) -> u64 {
        bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b))
    }
}

/// Outcome counters per rating bucket plus the highest rated sample games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<P: Partition> {
    tallies: P::Tallies,
    top_games: Vec<GameRef>,
}

impl<P: Partition> Default for Record<P> {
    fn default() -> Self {
        Record {
            tallies: P::Tallies::default(),
            top_games: Vec::new(),
        }
    }
}

impl<P: Partition> Record<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_game(game: &GameRef) -> Self {
        let mut record = Self::default();
        record.tallies.as_mut()[P::index(game.rating)] = GameWins::from_winner(game.winner);
        record.top_games.push(*game);
        record
    }

    /// Builds a record from explicit counters. Top games are sorted and cut
    /// to what the counters can account for.
    #[must_use]
    pub fn from_parts(tallies: P::Tallies, top_games: Vec<GameRef>) -> Self {
        let mut record = Record { tallies, top_games };
        let keep = record.total_games().min(MAX_TOP_GAMES as u64) as usize;
        normalize(&mut record.top_games, keep);
        record
    }

    /// Bucket-wise sum of the counters. Only the best [`MAX_TOP_GAMES`]
    /// sample games of both sides survive.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        let mut tallies = self.tallies.clone();
        for (mine, theirs) in tallies.as_mut().iter_mut().zip(other.tallies.as_ref()) {
            *mine = mine.combine(theirs);
        }
        let mut top_games = Vec::with_capacity(self.top_games.len() + other.top_games.len());
        top_games.extend_from_slice(&self.top_games);
        top_games.extend_from_slice(&other.top_games);
        normalize(&mut top_games, MAX_TOP_GAMES);
        Record { tallies, top_games }
    }

    #[must_use]
    pub fn tallies(&self) -> &[GameWins] {
        self.tallies.as_ref()
    }

    /// Counters summed over every bucket.
    #[must_use]
    pub fn wins(&self) -> GameWins {
        self.tallies()
            .iter()
            .fold(GameWins::default(), |acc, t| acc.combine(t))
    }

    #[must_use]
    pub fn total_games(&self) -> u64 {
        self.tallies().iter().map(GameWins::total).sum()
    }

    #[must_use]
    pub fn top_games(&self) -> &[GameRef] {
        &self.top_games
    }

    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let total = self.total_games();
        let replayable = total <= MAX_TOP_GAMES as u64
            && self.top_games.len() as u64 == total
            && self.replays_exactly();
        match total {
            0 => Vec::new(),
            1 if replayable => self.top_games[0].pack().to_vec(),
            _ if replayable => {
                let mut buf = Vec::with_capacity(1 + self.top_games.len() * PACK_SIZE);
                buf.push(TAG_REPLAY);
                self.write_games(&mut buf);
                buf
            }
            t => {
                let width = Width::for_total(t);
                let mut buf = Vec::with_capacity(
                    1 + self.tallies().len() * 3 * width.bytes() + self.top_games.len() * PACK_SIZE,
                );
                buf.push(width.tag());
                for tally in self.tallies() {
                    width.write(tally.white, &mut buf);
                    width.write(tally.draws, &mut buf);
                    width.write(tally.black, &mut buf);
                }
                self.write_games(&mut buf);
                buf
            }
        }
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() == PACK_SIZE {
            return Ok(Self::from_game(&GameRef::unpack(bytes)?));
        }
        let Some((&tag, rest)) = bytes.split_first() else {
            return Ok(Self::default());
        };
        if tag == TAG_REPLAY {
            return Self::unpack_replay(rest);
        }
        match Width::from_tag(tag) {
            Some(width) => Self::unpack_counters(width, rest),
            None => Err(Error::corruption(format!("unknown format tag {tag}"))),
        }
    }

    fn unpack_replay(rest: &[u8]) -> Result<Self> {
        let games = read_games(rest)?;
        if games.len() < 2 || games.len() > MAX_TOP_GAMES {
            return Err(Error::corruption(format!("{} games in replay record", games.len())));
        }
        Ok(games
            .iter()
            .fold(Self::default(), |acc, game| acc.combine(&Self::from_game(game))))
    }

    fn unpack_counters(width: Width, rest: &[u8]) -> Result<Self> {
        let mut tallies = P::Tallies::default();
        let counters_len = tallies.as_ref().len() * 3 * width.bytes();
        if rest.len() < counters_len {
            return Err(Error::corruption(format!(
                "counter block needs {counters_len} bytes, found {}",
                rest.len()
            )));
        }
        let (counters, games) = rest.split_at(counters_len);
        let mut fields = counters.chunks_exact(width.bytes()).map(|c| width.read(c));
        for tally in tallies.as_mut() {
            // chunks_exact yields exactly three fields per bucket here
            tally.white = fields.next().unwrap_or_default();
            tally.draws = fields.next().unwrap_or_default();
            tally.black = fields.next().unwrap_or_default();
        }
        let top_games = read_games(games)?;
        if top_games.len() > MAX_TOP_GAMES {
            return Err(Error::corruption(format!("{} top games", top_games.len())));
        }
        let record = Record { tallies, top_games };
        if record.top_games.len() as u64 > record.total_games() {
            return Err(Error::corruption("more top games than games"));
        }
        Ok(record)
    }

    /// Whether the top games alone rebuild these exact counters.
    fn replays_exactly(&self) -> bool {
        let replayed = self
            .top_games
            .iter()
            .fold(Self::default(), |acc, game| acc.combine(&Self::from_game(game)));
        replayed.tallies == self.tallies
    }

    fn write_games(&self, buf: &mut Vec<u8>) {
        for game in &self.top_games {
            buf.extend_from_slice(&game.pack());
        }
    }
}

fn read_games(bytes: &[u8]) -> Result<Vec<GameRef>> {
    if bytes.len() % PACK_SIZE != 0 {
        return Err(Error::corruption(format!(
            "{} trailing bytes after top games",
            bytes.len() % PACK_SIZE
        )));
    }
    bytes.chunks_exact(PACK_SIZE).map(GameRef::unpack).collect()
}

fn normalize(games: &mut Vec<GameRef>, keep: usize) {
    games.sort();
    games.dedup();
    games.truncate(keep);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_ref::GameId;
    use crate::rating::{Overall, RatingGroup};
    use shakmaty::Color;

    type Lichess = Record<RatingGroup>;

    fn game(n: u32, rating: u16, winner: Option<Color>) -> GameRef {
        let mut id = [b'g'; 8];
        id[4..].copy_from_slice(&n.to_be_bytes());
        GameRef {
            id: GameId(id),
            rating,
            winner,
        }
    }

    fn games(n: u32) -> Vec<GameRef> {
        (0..n)
            .map(|i| {
                let winner = match i % 3 {
                    0 => Some(Color::White),
                    1 => None,
                    _ => Some(Color::Black),
                };
                game(i, 1500 + (i % 13) as u16 * 100, winner)
            })
            .collect()
    }

    fn fold(games: &[GameRef]) -> Lichess {
        games
            .iter()
            .fold(Lichess::new(), |acc, g| acc.combine(&Lichess::from_game(g)))
    }

    /// A record with `total` games spread over the first and last bucket.
    fn big(total: u64) -> Lichess {
        let mut tallies = <RatingGroup as Partition>::Tallies::default();
        tallies[0] = GameWins { white: total / 2, draws: 0, black: 0 };
        tallies[4] = GameWins { white: 0, draws: total - total / 2 - 1, black: 1 };
        Lichess::from_parts(tallies, games(7))
    }

    fn tag_of(record: &Lichess) -> Option<u8> {
        let packed = record.pack();
        if packed.len() == PACK_SIZE {
            None
        } else {
            packed.first().copied()
        }
    }

    #[test]
    fn empty_packs_to_nothing() {
        let record = Lichess::new();
        assert!(record.pack().is_empty());
        assert_eq!(Lichess::unpack(&[]).ok(), Some(record));
    }

    #[test]
    fn single_game_is_bare_game_ref() {
        let g = game(1, 2100, Some(Color::Black));
        let record = Lichess::from_game(&g);
        assert_eq!(record.pack(), g.pack().to_vec());
        assert_eq!(record.tallies()[RatingGroup::Group2000.index()].black, 1);
        assert_eq!(Lichess::unpack(&record.pack()).ok(), Some(record));
    }

    #[test]
    fn two_games_example() {
        let win = game(1, 1900, Some(Color::White));
        let draw = game(2, 2100, None);
        let record = fold(&[win, draw]);

        assert_eq!(record.total_games(), 2);
        assert_eq!(record.tallies()[RatingGroup::Group1800.index()].white, 1);
        assert_eq!(record.tallies()[RatingGroup::Group2000.index()].draws, 1);
        assert_eq!(record.top_games(), &[draw, win]);

        let mut expected = vec![1];
        expected.extend_from_slice(&draw.pack());
        expected.extend_from_slice(&win.pack());
        assert_eq!(record.pack(), expected);
        assert_eq!(Lichess::unpack(&expected).ok(), Some(record));
    }

    #[test]
    fn replay_format_up_to_max_top_games() {
        let five = fold(&games(5));
        assert_eq!(tag_of(&five), Some(1));
        assert_eq!(five.pack().len(), 1 + 5 * PACK_SIZE);

        let six = fold(&games(6));
        assert_eq!(tag_of(&six), Some(2));
        assert_eq!(six.top_games().len(), MAX_TOP_GAMES);
        assert_eq!(Lichess::unpack(&six.pack()).ok(), Some(six));
    }

    #[test]
    fn counter_width_boundaries() {
        for (total, tag) in [
            (255, 2),
            (256, 3),
            (65_535, 3),
            (65_536, 4),
            (u64::from(u32::MAX), 4),
            (u64::from(u32::MAX) + 1, 5),
        ] {
            let record = big(total);
            assert_eq!(record.total_games(), total);
            assert_eq!(tag_of(&record), Some(tag), "total {total}");
            assert_eq!(Lichess::unpack(&record.pack()).ok(), Some(record), "total {total}");
        }
    }

    #[test]
    fn counter_layout_is_big_endian_in_bucket_order() {
        let record = big(300);
        let packed = record.pack();
        assert_eq!(packed[0], 3);
        assert_eq!(&packed[1..4 * 2], &[0, 150, 0, 0, 0, 0, 0][..]);
        let last = 1 + 4 * 3 * 2;
        assert_eq!(&packed[last..last + 6], &[0, 0, 0, 149, 0, 1]);
        assert_eq!(packed.len(), 1 + 5 * 3 * 2 + 5 * PACK_SIZE);
    }

    #[test]
    fn round_trips_in_every_regime() {
        for record in [
            Lichess::new(),
            fold(&games(1)),
            fold(&games(3)),
            fold(&games(40)),
            fold(&games(1000)),
            big(70_000),
            big(1 << 40),
        ] {
            let back = Lichess::unpack(&record.pack()).ok();
            assert_eq!(back.as_ref().map(Record::total_games), Some(record.total_games()));
            assert_eq!(back, Some(record));
        }
    }

    #[test]
    fn hand_built_short_top_games_use_counters() {
        let mut tallies = <RatingGroup as Partition>::Tallies::default();
        tallies[2] = GameWins { white: 2, draws: 1, black: 0 };
        let record = Lichess::from_parts(tallies, vec![game(9, 2000, Some(Color::White))]);
        assert_eq!(tag_of(&record), Some(2));
        assert_eq!(Lichess::unpack(&record.pack()).ok(), Some(record));
    }

    #[test]
    fn mismatched_counters_never_use_replay_format() {
        let draws = vec![game(1, 1500, None), game(2, 1500, None)];
        let mut tallies = <RatingGroup as Partition>::Tallies::default();
        tallies[2] = GameWins { white: 2, draws: 0, black: 0 };
        let record = Lichess::from_parts(tallies, draws);
        assert_eq!(record.top_games().len(), 2);
        assert_eq!(tag_of(&record), Some(2));
        assert_eq!(Lichess::unpack(&record.pack()).ok(), Some(record));

        let mut tallies = <RatingGroup as Partition>::Tallies::default();
        tallies[3] = GameWins { white: 1, draws: 0, black: 0 };
        let record = Lichess::from_parts(tallies, vec![game(3, 1500, None)]);
        assert_eq!(tag_of(&record), Some(2));
        assert_eq!(Lichess::unpack(&record.pack()).ok(), Some(record));
    }

    #[test]
    fn duplicate_game_counts_twice_but_is_listed_once() {
        let g = game(7, 2300, Some(Color::White));
        let record = Lichess::from_game(&g).combine(&Lichess::from_game(&g));
        assert_eq!(record.total_games(), 2);
        assert_eq!(record.tallies()[RatingGroup::Group2200.index()].white, 2);
        assert_eq!(record.top_games(), &[g]);
        assert_eq!(tag_of(&record), Some(2));
        assert_eq!(Lichess::unpack(&record.pack()).ok(), Some(record));
    }

    #[test]
    fn combine_is_order_independent_across_formats() {
        let records = [
            Lichess::from_game(&game(500, 2600, None)),
            fold(&games(3)),
            fold(&games(1000)),
            big(70_000),
            big(1 << 33),
        ];
        assert_eq!(tag_of(&records[1]), Some(1));
        assert_eq!(tag_of(&records[2]), Some(3));
        assert_eq!(tag_of(&records[3]), Some(4));
        assert_eq!(tag_of(&records[4]), Some(5));

        for a in &records {
            for b in &records {
                assert_eq!(a.combine(b), b.combine(a));
                for c in &records {
                    assert_eq!(a.combine(&b.combine(c)), a.combine(b).combine(c));
                }
            }
        }

        let expected = records.iter().fold(Lichess::new(), |acc, r| acc.combine(r));
        for start in 0..records.len() {
            let rotated = records.iter().cycle().skip(start).take(records.len());
            assert_eq!(rotated.fold(Lichess::new(), |acc, r| acc.combine(r)), expected);
            let reversed = records.iter().rev().cycle().skip(start).take(records.len());
            assert_eq!(reversed.fold(Lichess::new(), |acc, r| acc.combine(r)), expected);
        }

        let all = games(60);
        for split in [1, 5, 6, 29, 59] {
            let (left, right) = all.split_at(split);
            assert_eq!(fold(left).combine(&fold(right)), fold(&all), "split {split}");
            assert_eq!(fold(right).combine(&fold(left)), fold(&all), "split {split}");
        }
        let total: u64 = records.iter().map(Record::total_games).sum();
        assert_eq!(expected.total_games(), total);
    }

    #[test]
    fn combine_is_associative_and_commutative() {
        let all = games(30);
        let a = fold(&all[..4]);
        let b = fold(&all[4..17]);
        let c = fold(&all[17..]);
        assert_eq!(a.combine(&b.combine(&c)), a.combine(&b).combine(&c));
        assert_eq!(a.combine(&b), b.combine(&a));
        assert_eq!(c.combine(&a).combine(&b), fold(&all));
    }

    #[test]
    fn keeps_highest_rated_games() {
        let all = games(40);
        let record = fold(&all);
        let mut expected = all.clone();
        expected.sort();
        expected.truncate(MAX_TOP_GAMES);
        assert_eq!(record.top_games(), &expected[..]);
        assert_eq!(record.total_games(), 40);
        assert!(record.top_games().windows(2).all(|w| w[0].rating >= w[1].rating));
    }

    #[test]
    fn overall_partition_sums_everything() {
        let record = games(12)
            .iter()
            .fold(Record::<Overall>::new(), |acc, g| acc.combine(&Record::from_game(g)));
        assert_eq!(record.tallies().len(), 1);
        assert_eq!(record.wins(), GameWins { white: 4, draws: 4, black: 4 });
        assert_eq!(Record::<Overall>::unpack(&record.pack()).ok(), Some(record));
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(matches!(Lichess::unpack(&[0, 1, 2]), Err(Error::Corruption { .. })));
        assert!(matches!(Lichess::unpack(&[6, 1, 2]), Err(Error::Corruption { .. })));
    }

    #[test]
    fn rejects_truncated_buffers() {
        let packed = fold(&games(20)).pack();
        assert!(matches!(Lichess::unpack(&packed[..10]), Err(Error::Corruption { .. })));
        assert!(matches!(
            Lichess::unpack(&packed[..packed.len() - 1]),
            Err(Error::Corruption { .. })
        ));
        let replay = fold(&games(3)).pack();
        assert!(matches!(
            Lichess::unpack(&replay[..replay.len() - 4]),
            Err(Error::Corruption { .. })
        ));
        assert!(matches!(Lichess::unpack(&[1]), Err(Error::Corruption { .. })));
    }
}
