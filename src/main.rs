//! Contract Workbench CLI Application
//!
//! A command-line interface for deploying and invoking smart contracts
//! against an execution backend.

use clap::{Parser, Subcommand};
use contract_workbench::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "workbench")]
#[command(version = "0.1.0")]
#[command(about = "An interactive workbench for smart-contract sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API server over an in-process dev chain
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Directory of compiled artifact .json files to preload
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Active account identity used for deploys and invocations
        #[arg(long, default_value = "0x0000000000000000000000000000000000000001")]
        account: String,
    },

    /// Artifact operations
    Artifact {
        #[command(subcommand)]
        action: ArtifactCommands,
    },
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// Parse an artifact file and show its callable surface
    Inspect {
        /// Artifact file (.json)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the derived artifact id
    Id {
        /// Artifact file (.json)
        #[arg(short, long)]
        file: PathBuf,

        /// Source id to derive from (defaults to the file name)
        #[arg(short, long)]
        source: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            artifacts,
            account,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_serve(port, artifacts.as_ref(), &account))?;
        }

        Commands::Artifact { action } => match action {
            ArtifactCommands::Inspect { file } => {
                cli::cmd_inspect(&file)?;
            }
            ArtifactCommands::Id { file, source } => {
                cli::cmd_artifact_id(&file, source.as_deref())?;
            }
        },
    }

    Ok(())
}
