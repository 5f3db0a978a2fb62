mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hrsync",
    version,
    about = "Resumable sync of employee records from HR sources into one warehouse table"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the pipeline YAML file
    #[arg(short, long, default_value = "hrsync.yaml", global = true)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one bounded sync for a source
    Run {
        /// Source system (garoon, smarthr, jobcan, pca, sheets)
        #[arg(long)]
        source: String,
        /// Target name from the config's `targets` section
        #[arg(long)]
        target: String,
        /// Only test the source connection
        #[arg(long)]
        test: bool,
    },
    /// Reset a source's extraction cursor to the beginning
    Reset {
        #[arg(long)]
        source: String,
    },
    /// Assess data quality of a target table and report alerts
    Quality {
        #[arg(long)]
        target: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            source,
            target,
            test,
        } => commands::run::execute(&cli.config, &source, &target, test).await,
        Commands::Reset { source } => commands::reset::execute(&cli.config, &source).await,
        Commands::Quality { target } => commands::quality::execute(&cli.config, &target).await,
    }
}
