//! Binary entry point: parse arguments, initialise logging, dispatch.

use clap::{Parser, Subcommand};

use bgmerge::cli_args::{GlobalArgs, MergeArgs};
use bgmerge::commands::run_merge;
use bgmerge::config::load_with_site_fallback;

#[derive(Parser)]
#[command(name = "bgmerge", about = "Merge board game data files", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge scraped feeds for one site (or `all`) into a single file
    Merge(MergeArgs),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    match cli.command {
        Commands::Merge(args) => {
            let args = load_with_site_fallback(args)?;
            run_merge(&args)?;
        }
    }
    Ok(())
}
