use anyhow::Result;
use clap::{Parser, Subcommand};
use scopus_atlas::{aggregate, query};

#[derive(Parser)]
#[command(name = "scopus-atlas")]
#[command(about = "Aggregate bibliographic CSV exports into a country/university/author atlas")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the aggregated country/university/author tree and write JSON outputs
    Process(aggregate::ProcessArgs),
    /// Print overall statistics for a dataset
    Stats(query::StatsArgs),
    /// Drill into the aggregated tree from the command line
    Query(query::QueryArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    match cli.command {
        Commands::Process(args) => aggregate::run(args),
        Commands::Stats(args) => query::run_stats(args),
        Commands::Query(args) => query::run(args),
    }
}
