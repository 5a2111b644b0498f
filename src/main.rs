mod cli;
mod server;

use clap::Parser;
use cli::{Cli, Commands};
use spotreg::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            server::serve(config).await?
        }
        Commands::Seed(args) => server::seed(&config, args)?,
        Commands::Registers => server::print_registers(&config)?,
    }

    Ok(())
}
