use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize};
use std::{fs::File, io::BufReader, path::Path};

// Put the helpers right above the struct so the names stay private.
const fn default_min_rating() -> u16 { 0 }
const fn default_min_ply_count() -> u32 { 0 }
const fn default_channel_capacity() -> usize { 1024 }
const fn default_sample_seed() -> u64 { 0x19ab_17c6 }

/// Which database a command works on.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VariantName {
    #[default]
    Lichess,
    Master,
}

/// Shape of the JSON config expected by the `ingest` sub‑command.
#[derive(Clone, Debug, Deserialize)]
pub struct Ingest {
    /// Database root. Each variant gets its own `RocksDB` directory below it.
    pub db_path: String,
    /// File listing one `.pgn` or `.pgn.zst` path per line.
    pub pgn_list: String,
    #[serde(default)]
    pub variant: VariantName,
    /// Minimum Elo for White *and* Black to keep a game.
    #[serde(default = "default_min_rating")]
    pub min_rating: u16,
    /// Minimum ply to keep a game.
    #[serde(default = "default_min_ply_count")]
    pub min_ply_count: u32,
    /// Merge workers. Defaults to the number of CPUs.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Games buffered between the PGN reader and the workers.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Down-sample lichess games by speed and rating. Ignored for master.
    #[serde(default)]
    pub sample: bool,
    #[serde(default = "default_sample_seed")]
    pub sample_seed: u64,
}

/// Shape of the JSON config expected by the `query` and `stats` sub‑commands.
#[derive(Clone, Debug, Deserialize)]
pub struct Query {
    pub db_path: String,
}

pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_defaults() {
        let cfg: Ingest =
            serde_json::from_str(r#"{ "db_path": "/tmp/db", "pgn_list": "files.txt" }"#).unwrap();
        assert_eq!(cfg.variant, VariantName::Lichess);
        assert_eq!(cfg.min_rating, 0);
        assert_eq!(cfg.min_ply_count, 0);
        assert_eq!(cfg.workers, None);
        assert_eq!(cfg.channel_capacity, 1024);
        assert!(!cfg.sample);
    }

    #[test]
    fn ingest_master() {
        let cfg: Ingest = serde_json::from_str(
            r#"{ "db_path": "db", "pgn_list": "l", "variant": "master", "min_rating": 2200, "workers": 3 }"#,
        )
        .unwrap();
        assert_eq!(cfg.variant, VariantName::Master);
        assert_eq!(cfg.min_rating, 2200);
        assert_eq!(cfg.workers, Some(3));
    }

    #[test]
    fn ingest_sampling() {
        let cfg: Ingest = serde_json::from_str(
            r#"{ "db_path": "db", "pgn_list": "l", "sample": true, "sample_seed": 9 }"#,
        )
        .unwrap();
        assert!(cfg.sample);
        assert_eq!(cfg.sample_seed, 9);
    }
}
