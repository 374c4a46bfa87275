use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use g1lens::logging;
use g1lens_core::Config;

#[derive(Parser)]
#[command(name = "g1lens")]
#[command(about = "G1 GC, access log and service log analysis", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "g1lens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a log file
    Analyze {
        /// Log file to read
        file: PathBuf,
        /// Extension whose output is shown (default: first registered)
        #[arg(short, long)]
        extension: Option<String>,
        /// Output the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as TOML
    DefaultConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::DefaultConfig => {
            print!("{}", Config::default_toml()?);
        }
        Commands::Analyze {
            file,
            extension,
            json,
        } => {
            let config = Config::from_file_or_default(&cli.config)?;
            config.validate()?;

            logging::init(&config.logging);

            let output =
                g1lens::analyze_to_string(config, &file, extension.as_deref(), json).await?;
            println!("{output}");
        }
    }

    Ok(())
}
