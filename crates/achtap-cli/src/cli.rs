use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "achtap")]
#[command(about = "Achievement extractor", version)]
pub struct Cli {
    /// Settings file
    #[arg(short, long, global = true, default_value = "achtap.toml", env = "ACHTAP_CONFIG")]
    pub config: PathBuf,

    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, global = true, env = "ACHTAP_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Launch the game, collect achievements and export them
    Collect {
        /// Game executable (remembered after a successful run)
        #[arg(short, long, env = "ACHTAP_GAME")]
        game: Option<PathBuf>,

        /// Module injected into the game
        #[arg(short, long)]
        module: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reuse achievement data cached by a recent run instead of launching
        #[arg(long)]
        reuse: bool,

        /// Maximum age of reusable cached data
        #[arg(long)]
        reuse_minutes: Option<u64>,

        /// Pipe the injected module connects to
        #[arg(long)]
        pipe_name: Option<String>,

        /// Known field mapping (JSON) to try before detection
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Decode a raw achievement payload from a file
    Decode {
        /// Raw payload, e.g. a dumped achievement_raw_data.bin
        file: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Known field mapping (JSON) to try before detection
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}
