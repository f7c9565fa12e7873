use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sitesmith CLI - prompt-to-project website builder
#[derive(Parser)]
#[command(name = "sitesmith")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Base URL of the sitesmith backend
    #[arg(
        long,
        env = "SITESMITH_BACKEND_URL",
        default_value = "http://localhost:3000"
    )]
    pub backend_url: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a project from a prompt, or continue the one in the output directory
    Build {
        /// What to build
        prompt: String,

        /// Output directory for the generated project
        #[arg(short, long, default_value = "./site")]
        out: PathBuf,

        /// Keep the session open for follow-up prompts
        #[arg(short, long)]
        interactive: bool,
    },
    /// Parse a payload into steps without calling the backend
    Parse {
        /// Payload file to read (stdin when omitted)
        file: Option<PathBuf>,

        /// Print the parsed steps as JSON
        #[arg(long)]
        json: bool,

        /// Print the contents of the synthesized file at this path
        #[arg(long, value_name = "PATH")]
        show: Option<String>,
    },
}
