pub mod collect;
pub mod decode;

use std::fs;
use std::path::Path;

use achtap::{AchievementItem, CacheStore, Config, ExportFormat, JsonExporter, MappingSource};
use anyhow::{Context, Result};
use tracing::info;

/// Load the settings file; a missing file means defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    if path.exists() {
        info!("Loaded config from {}", path.display());
    }
    Ok(config)
}

pub fn cache_store(cache_dir: Option<&Path>, config: &Config) -> CacheStore {
    let root = cache_dir
        .map(Path::to_path_buf)
        .or_else(|| config.cache_dir.clone())
        .unwrap_or_else(CacheStore::default_root);
    CacheStore::new(root)
}

/// Export `items` as JSON to `output`, or to stdout.
pub fn write_output(items: &[AchievementItem], output: Option<&Path>) -> Result<()> {
    let exporter = JsonExporter;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).context("Failed to create output directory")?;
            }
            exporter
                .write_to(path, items)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} achievements to: {}", items.len(), path.display());
        }
        None => print!("{}", exporter.format_items(items)?),
    }
    Ok(())
}

pub fn print_summary(items: &[AchievementItem], source: Option<MappingSource>) {
    let completed = items.iter().filter(|item| item.status.is_completed()).count();
    match source {
        Some(source) => eprintln!(
            "{} achievements, {} completed ({} field layout)",
            items.len(),
            completed,
            source
        ),
        None => eprintln!("No achievements in payload"),
    }
}
