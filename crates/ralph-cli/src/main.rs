use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod operator;

#[derive(Parser)]
#[command(name = "ralph", author, version, about = "An autonomous coding-assistant loop", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent loop against a working directory
    #[command(name = "loop")]
    Loop {
        /// Path to the YAML configuration file
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,

        /// Directory holding secret files (e.g. google_api_key)
        #[arg(long, default_value = "secrets")]
        secrets: PathBuf,

        /// Maximum number of loop iterations
        #[arg(long, default_value_t = 10)]
        limit: u32,

        /// Working directory the agent is confined to
        workdir: PathBuf,

        /// Instruction file stating the task
        instructions: PathBuf,
    },
    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Loop {
            config,
            secrets,
            limit,
            workdir,
            instructions,
        } => commands::run::execute(&config, &secrets, limit, &workdir, &instructions).await,
        Command::Version => commands::version::execute().await,
    }
}
