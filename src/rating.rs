//! Rating partitions used to break position statistics down by the strength
//! of the players.
//!
//! The ordinal of a bucket is its index in the packed record format, so the
//! order of [`RatingGroup::ALL`] must never change without a migration.

use crate::game_stats::GameWins;
use serde::Serialize;
use std::fmt;

/// A closed, ordered set of buckets over the rating line.
pub trait Partition: fmt::Debug + Clone + PartialEq + Eq + Send + Sync + 'static {
    /// One [`GameWins`] per bucket, in storage order.
    type Tallies: AsRef<[GameWins]>
        + AsMut<[GameWins]>
        + Default
        + Clone
        + PartialEq
        + Eq
        + fmt::Debug
        + Send
        + Sync;

    /// Storage ordinal of the bucket holding `rating`.
    fn index(rating: u16) -> usize;

    /// Lowest rating of the bucket at `index`.
    fn floor(index: usize) -> u16;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RatingGroup {
    Group1600,
    Group1800,
    Group2000,
    Group2200,
    Group2500,
}

impl RatingGroup {
    pub const ALL: [RatingGroup; 5] = [
        RatingGroup::Group1600,
        RatingGroup::Group1800,
        RatingGroup::Group2000,
        RatingGroup::Group2200,
        RatingGroup::Group2500,
    ];

    #[must_use]
    pub fn all() -> &'static [RatingGroup] {
        &Self::ALL
    }

    /// Ratings below the lowest floor clamp into the lowest group.
    #[must_use]
    pub fn find(rating: u16) -> RatingGroup {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|group| group.floor() <= rating)
            .unwrap_or(RatingGroup::Group1600)
    }

    #[must_use]
    pub fn floor(self) -> u16 {
        match self {
            RatingGroup::Group1600 => 1600,
            RatingGroup::Group1800 => 1800,
            RatingGroup::Group2000 => 2000,
            RatingGroup::Group2200 => 2200,
            RatingGroup::Group2500 => 2500,
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Partition for RatingGroup {
    type Tallies = [GameWins; 5];

    fn index(rating: u16) -> usize {
        RatingGroup::find(rating).index()
    }

    fn floor(index: usize) -> u16 {
        Self::ALL.get(index).map_or(0, |group| group.floor())
    }
}

/// A single bucket covering every rating.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Overall;

impl Partition for Overall {
    type Tallies = [GameWins; 1];

    fn index(_rating: u16) -> usize {
        0
    }

    fn floor(_index: usize) -> u16 {
        0
    }
}
