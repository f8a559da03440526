//! Collect command: launch the game and extract achievements.

use std::path::PathBuf;
use std::time::Duration;

use achtap::collector::CollectorConfigBuilder;
use achtap::{CacheStore, Collector, Config};
use anyhow::{Context, Result};

use super::{print_summary, write_output};

pub struct CollectArgs {
    pub game: Option<PathBuf>,
    pub module: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub reuse: bool,
    pub reuse_minutes: Option<u64>,
    pub pipe_name: Option<String>,
    pub schema: Option<PathBuf>,
}

pub fn run(config: &Config, cache: CacheStore, args: CollectArgs) -> Result<()> {
    eprintln!("achtap {} - Collect Mode", env!("CARGO_PKG_VERSION"));

    let mut builder = CollectorConfigBuilder::from_config(config);
    if let Some(game) = args.game {
        builder = builder.game_path(game);
    }
    if let Some(module) = args.module {
        builder = builder.module_path(module);
    }
    if let Some(pipe_name) = args.pipe_name {
        builder = builder.pipe_name(pipe_name);
    }
    if let Some(schema) = args.schema {
        builder = builder.schema_path(schema);
    }
    let collector = Collector::new(builder.build(), cache);

    if args.reuse {
        let minutes = args.reuse_minutes.unwrap_or(config.reuse_minutes);
        let max_age = Duration::from_secs(minutes * 60);
        if let Some(collection) = collector.collect_cached(max_age)? {
            eprintln!("Using achievement data cached within the last {} minutes", minutes);
            print_summary(&collection.items, collection.source);
            return write_output(&collection.items, args.output.as_deref());
        }
        eprintln!("No cached achievement data newer than {} minutes", minutes);
    }

    eprintln!("Launching game...");
    let collection = collector.collect().context("Collection failed")?;
    print_summary(&collection.items, collection.source);
    write_output(&collection.items, args.output.as_deref())
}
