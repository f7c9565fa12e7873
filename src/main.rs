use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod cli;
mod command;
mod mount;
mod sandbox;
mod session;
mod steps;
mod tree;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Build {
            prompt,
            out,
            interactive,
        }) => {
            command::run_build(cli.backend_url, prompt, out, interactive).await?;
        }
        Some(Commands::Parse { file, json, show }) => {
            command::run_parse(file, json, show).await?;
        }
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'sitesmith build \"<prompt>\"' to generate a project.");
        }
    }

    Ok(())
}
