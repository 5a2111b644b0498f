use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spotreg")]
#[command(about = "Spot price and presence register exporter", long_about = None)]
pub struct Cli {
    /// Configuration file (overrides SPOTREG_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API, the refresh scheduler and the Modbus adapter
    Serve(ServeArgs),
    /// Fill the store with synthetic hourly prices
    Seed(SeedArgs),
    /// Print the configured address map
    Registers,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (defaults to server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct SeedArgs {
    /// Days of history before today
    #[arg(long)]
    pub days: Option<u32>,

    /// Seed even if the store already holds prices
    #[arg(long)]
    pub force: bool,
}
