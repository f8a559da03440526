//! Decode command: resolve a raw payload without launching the game.

use std::fs;
use std::path::{Path, PathBuf};

use achtap::collector::CollectorConfigBuilder;
use achtap::{CacheStore, Collector, Config};
use anyhow::{Context, Result};

use super::{print_summary, write_output};

pub fn run(
    config: &Config,
    cache: CacheStore,
    file: &Path,
    output: Option<&Path>,
    schema: Option<PathBuf>,
) -> Result<()> {
    let raw = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    eprintln!("Decoding {} ({} bytes)", file.display(), raw.len());

    let mut builder = CollectorConfigBuilder::from_config(config);
    if let Some(schema) = schema {
        builder = builder.schema_path(schema);
    }
    let collector = Collector::new(builder.build(), cache);

    let collection = collector.process_payload(raw)?;
    print_summary(&collection.items, collection.source);
    write_output(&collection.items, output)
}
