use anyhow::{anyhow, Context};
use chess_explorer_db::chess_db::{pos_to_hash, Lichess, Master, PositionStore, Variant};
use chess_explorer_db::config::{self, VariantName};
use chess_explorer_db::ingest;
use chess_explorer_db::speed::Speed;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use shakmaty::{fen::Fen, CastlingMode, Chess};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Opening explorer position database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge the games of every listed PGN file into the database.
    Ingest {
        #[arg(long)]
        config: PathBuf,
    },
    /// Print the statistics of a position as JSON.
    Query {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        fen: String,
        #[arg(long, value_enum, default_value_t = VariantName::Lichess)]
        variant: VariantName,
        /// Restrict to these speeds (repeatable). All speeds by default.
        #[arg(long)]
        speed: Vec<Speed>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Also list every legal move that has been played.
        #[arg(long)]
        children: bool,
    },
    /// Print the number of stored keys.
    Stats {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = VariantName::Lichess)]
        variant: VariantName,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Ingest { config } => {
            let cfg: config::Ingest = config::load(&config)?;
            let report = ingest::ingest(&cfg)?;
            info!("Done: {} games merged, {} skipped", report.games, report.skipped);
        }
        Command::Query { config, fen, variant, speed, limit, children } => {
            let cfg: config::Query = config::load(&config)?;
            let pos = parse_fen(&fen)?;
            let json = match variant {
                VariantName::Lichess => query::<Lichess>(&cfg, &pos, &speed, limit, children)?,
                VariantName::Master => query::<Master>(&cfg, &pos, &speed, limit, children)?,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::Stats { config, variant } => {
            let cfg: config::Query = config::load(&config)?;
            let stats = match variant {
                VariantName::Lichess => PositionStore::<Lichess>::open(&cfg.db_path)?.key_stats()?,
                VariantName::Master => PositionStore::<Master>::open(&cfg.db_path)?.key_stats()?,
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

fn parse_fen(fen: &str) -> anyhow::Result<Chess> {
    let fen: Fen = fen.parse().context("invalid FEN")?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|err| anyhow!("illegal position: {err}"))
}

fn query<V: Variant>(
    cfg: &config::Query,
    pos: &Chess,
    speeds: &[Speed],
    limit: usize,
    children: bool,
) -> anyhow::Result<serde_json::Value> {
    let store = PositionStore::<V>::open(&cfg.db_path)
        .with_context(|| format!("opening {} database in {}", V::NAME, cfg.db_path))?;
    let position = store.query(&pos_to_hash(pos), speeds, limit)?;
    let moves = if children {
        store.query_children(pos, speeds, limit)?
    } else {
        Vec::new()
    };
    Ok(serde_json::json!({ "position": position, "moves": moves }))
}
