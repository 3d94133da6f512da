mod cli;
mod commands;
mod error;

use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let opts = Cli::from_args();
    init_logging(opts.verbose);

    let result = match opts.command {
        Commands::Info(args) => commands::info(args),
        Commands::Detect(args) => commands::detect(args),
        Commands::Convert(args) => commands::convert(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:?}", anyhow::Error::from(e));
        std::process::exit(1);
    }
}
