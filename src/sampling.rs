//! Seeded down-sampling of online games, so the busiest speeds and rating
//! bands do not drown out the rest.

use crate::speed::Speed;
use rand::{distributions::OpenClosed01, rngs::SmallRng, Rng, SeedableRng};

/// Both players must be rated at least this much for a sampled game.
pub const MIN_SAMPLED_RATING: u16 = 1501;

/// Chance of keeping a standard game of `speed` with this average rating.
#[must_use]
pub fn acceptance(speed: Speed, rating: u16) -> f64 {
    match speed {
        Speed::Correspondence | Speed::Classical => 1.00,

        _ if rating >= 2500 => 1.00,

        Speed::Rapid if rating >= 2200 => 1.00,
        Speed::Rapid if rating >= 2000 => 0.83,
        Speed::Rapid if rating >= 1800 => 0.46,
        Speed::Rapid if rating >= 1600 => 0.39,

        Speed::Blitz if rating >= 2200 => 0.38,
        Speed::Blitz if rating >= 2000 => 0.18,
        Speed::Blitz if rating >= 1600 => 0.13,

        Speed::Bullet if rating >= 2200 => 0.48,
        Speed::Bullet if rating >= 2000 => 0.27,
        Speed::Bullet if rating >= 1800 => 0.19,
        Speed::Bullet if rating >= 1600 => 0.18,

        Speed::UltraBullet => 1.00,

        _ => 0.02,
    }
}

/// Deterministic for a given seed and game order.
pub struct Sampler {
    rng: SmallRng,
}

impl Sampler {
    #[must_use]
    pub fn new(seed: u64) -> Sampler {
        Sampler {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn accept(&mut self, speed: Speed, white_rating: u16, black_rating: u16) -> bool {
        if white_rating.min(black_rating) < MIN_SAMPLED_RATING {
            return false;
        }
        let rating = (u32::from(white_rating) + u32::from(black_rating)) / 2;
        let draw: f64 = self.rng.sample(OpenClosed01);
        acceptance(speed, rating as u16) >= draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptance_table() {
        assert_eq!(acceptance(Speed::Classical, 1000), 1.0);
        assert_eq!(acceptance(Speed::Correspondence, 1600), 1.0);
        assert_eq!(acceptance(Speed::UltraBullet, 1700), 1.0);
        assert_eq!(acceptance(Speed::Blitz, 2500), 1.0);

        assert_eq!(acceptance(Speed::Rapid, 2200), 1.0);
        assert_eq!(acceptance(Speed::Rapid, 2199), 0.83);
        assert_eq!(acceptance(Speed::Rapid, 1800), 0.46);
        assert_eq!(acceptance(Speed::Rapid, 1600), 0.39);
        assert_eq!(acceptance(Speed::Rapid, 1599), 0.02);

        assert_eq!(acceptance(Speed::Blitz, 2200), 0.38);
        assert_eq!(acceptance(Speed::Blitz, 2000), 0.18);
        assert_eq!(acceptance(Speed::Blitz, 1999), 0.13);
        assert_eq!(acceptance(Speed::Blitz, 1600), 0.13);
        assert_eq!(acceptance(Speed::Blitz, 1550), 0.02);

        assert_eq!(acceptance(Speed::Bullet, 2499), 0.48);
        assert_eq!(acceptance(Speed::Bullet, 2000), 0.27);
        assert_eq!(acceptance(Speed::Bullet, 1800), 0.19);
        assert_eq!(acceptance(Speed::Bullet, 1600), 0.18);
        assert_eq!(acceptance(Speed::Bullet, 1501), 0.02);
    }

    #[test]
    fn weakest_player_must_reach_minimum() {
        let mut sampler = Sampler::new(7);
        assert!(!sampler.accept(Speed::Classical, 1500, 2800));
        assert!(!sampler.accept(Speed::Correspondence, 2800, 1200));
        assert!(sampler.accept(Speed::Classical, 1501, 1501));
    }

    #[test]
    fn always_kept_bands() {
        let mut sampler = Sampler::new(1);
        assert!((0..1000).all(|_| sampler.accept(Speed::Blitz, 2600, 2500)));
        assert!((0..1000).all(|_| sampler.accept(Speed::Rapid, 2300, 2200)));
    }

    #[test]
    fn same_seed_same_decisions() {
        let decide = |seed| {
            let mut sampler = Sampler::new(seed);
            (0..500)
                .map(|i| sampler.accept(Speed::Blitz, 1600 + (i % 9) * 100, 1700))
                .collect::<Vec<_>>()
        };
        assert_eq!(decide(42), decide(42));
    }

    #[test]
    fn keeps_roughly_the_configured_share() {
        let mut sampler = Sampler::new(2024);
        let kept = (0..20_000)
            .filter(|_| sampler.accept(Speed::Blitz, 2050, 2050))
            .count();
        let share = kept as f64 / 20_000.0;
        assert!((share - 0.18).abs() < 0.02, "share {share}");
    }
}
