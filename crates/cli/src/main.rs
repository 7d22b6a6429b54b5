use anyhow::Result;
use clap::Parser;
use dssketch_cli::cli::Cli;
use env_logger::Env;

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level())).init();
    cli.command.run()
}
