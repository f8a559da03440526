mod cli;
mod commands;

use achtap::error::exit_code;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code_for(&e));
    }
}

fn run() -> anyhow::Result<()> {
    // Initialize logging; stdout is reserved for exported data
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("achtap=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(&cli.config)?;
    let cache = commands::cache_store(cli.cache_dir.as_deref(), &config);

    match cli.command {
        Command::Collect {
            game,
            module,
            output,
            reuse,
            reuse_minutes,
            pipe_name,
            schema,
        } => commands::collect::run(
            &config,
            cache,
            commands::collect::CollectArgs {
                game,
                module,
                output,
                reuse,
                reuse_minutes,
                pipe_name,
                schema,
            },
        ),
        Command::Decode {
            file,
            output,
            schema,
        } => commands::decode::run(&config, cache, &file, output.as_deref(), schema),
    }
}

/// Exit code of the first core error in the chain.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<achtap::Error>())
        .map_or(exit_code::GENERIC, achtap::Error::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_for_core_error() {
        let err = anyhow::Error::from(achtap::Error::NoData);
        assert_eq!(exit_code_for(&err), exit_code::NO_DATA);
    }

    #[test]
    fn test_exit_code_for_wrapped_core_error() {
        let result: Result<(), achtap::Error> = Err(achtap::Error::UnexpectedTermination);
        let err = result.context("collecting achievements").unwrap_err();
        assert_eq!(exit_code_for(&err), exit_code::UNEXPECTED_TERMINATION);
    }

    #[test]
    fn test_exit_code_for_other_error() {
        let err = anyhow::anyhow!("bad output path");
        assert_eq!(exit_code_for(&err), exit_code::GENERIC);
    }
}
