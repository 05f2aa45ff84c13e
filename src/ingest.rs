use crate::chess_db::{Lichess, Master, PositionStore, Variant};
use crate::config::{self, VariantName};
use crate::extractor::Extractor;
use crate::{worker, GameSummary};
use anyhow::{anyhow, bail, Context};
use crossbeam_channel::Sender;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use pgn_reader::BufferedReader;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::thread;
use std::time::Duration;
use zstd::stream::read::Decoder;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub games: u64,
    pub skipped: u64,
}

pub fn ingest(cfg: &config::Ingest) -> anyhow::Result<IngestReport> {
    match cfg.variant {
        VariantName::Lichess => ingest_into::<Lichess>(cfg),
        VariantName::Master => ingest_into::<Master>(cfg),
    }
}

fn ingest_into<V: Variant>(cfg: &config::Ingest) -> anyhow::Result<IngestReport> {
    let store = PositionStore::<V>::open(&cfg.db_path)
        .with_context(|| format!("opening {} database in {}", V::NAME, cfg.db_path))?;
    let paths = read_list(&cfg.pgn_list)?;
    let workers = cfg.workers.unwrap_or_else(num_cpus::get).max(1);
    info!("Ingesting {} files into {} with {workers} workers", paths.len(), V::NAME);

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {pos} games ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(200));

    let report = thread::scope(|s| -> anyhow::Result<IngestReport> {
        let (tx, rx) = crossbeam_channel::bounded::<GameSummary>(cfg.channel_capacity.max(1));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let rx = rx.clone();
                let (store, progress) = (&store, &progress);
                s.spawn(move || worker::run(&rx, store, progress))
            })
            .collect();
        drop(rx);

        let skipped = read_all(&paths, &tx, cfg);
        drop(tx);

        let mut games = 0;
        for handle in handles {
            games += handle.join().map_err(|_| anyhow!("ingest worker panicked"))??;
        }
        Ok(IngestReport { games, skipped: skipped? })
    })?;

    progress.finish_and_clear();
    store.flush()?;
    info!("Merged {} games, skipped {}", report.games, report.skipped);
    Ok(report)
}

/// Feeds every listed PGN file through an [`Extractor`]; returns how many
/// games were filtered out. Stops at the first file during which the
/// workers hung up, since nothing would be merged after that.
fn read_all(paths: &[String], tx: &Sender<GameSummary>, cfg: &config::Ingest) -> anyhow::Result<u64> {
    let mut skipped = 0;
    for path in paths {
        info!("Processing file: {path}");
        let mut reader = BufferedReader::new(open_pgn(path)?);
        let mut extractor = Extractor::new(tx, cfg);
        reader
            .read_all(&mut extractor)
            .with_context(|| format!("reading games from {path}"))?;
        info!("{path}: {} games accepted, {} skipped", extractor.accepted, extractor.skipped);
        skipped += extractor.skipped;
        if extractor.is_closed() {
            bail!("ingest workers stopped while reading {path}");
        }
    }
    Ok(skipped)
}

fn open_pgn(path: &str) -> anyhow::Result<Box<dyn Read + Send>> {
    let file = File::open(path).with_context(|| format!("opening {path}"))?;
    if path.ends_with(".zst") {
        Ok(Box::new(Decoder::new(file)?))
    } else {
        Ok(Box::new(file))
    }
}

/// Non-empty lines of the file list.
fn read_list(list: &str) -> anyhow::Result<Vec<String>> {
    let file = File::open(list).with_context(|| format!("opening file list {list}"))?;
    BufReader::new(file)
        .lines()
        .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|line| line.map(|l| l.trim().to_owned()))
        .collect::<io::Result<Vec<_>>>()
        .context("reading file list")
}
