mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use embd::config::EmbdConfig;

#[derive(Parser)]
#[command(name = "embd", version, about = "Content-addressed embedding cache and similarity grep")]
struct Cli {
    /// Config file (defaults to ~/.embd/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed text from a file or stdin
    Think(cli::think::ThinkArgs),
    /// Rank keys against queries by similarity
    Grep(cli::grep::GrepArgs),
    /// Decode raw tensor bytes for reading
    Show(cli::show::ShowArgs),
    /// Show per-namespace cache statistics
    Stats,
    /// List the supported embedding models
    Models,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the configured model to ~/.embd/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EmbdConfig::load_from(path)?,
        None => EmbdConfig::load()?,
    };

    // Log to stderr so stdout stays clean for tensor bytes.
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Think(args) => cli::think::think(&config, args).await?,
        Command::Grep(args) => cli::grep::grep(&config, args).await?,
        Command::Show(args) => cli::show::show(args)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Models => cli::models(&config.embedding)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
