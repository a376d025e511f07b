use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::llm::LlmProvider;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional command to run; without one the chat screen opens
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Text-generation provider
    #[arg(short, long, global = true, value_enum)]
    pub provider: Option<LlmProvider>,

    /// Model for the selected provider
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Provider to ask when the primary one fails
    #[arg(long, global = true, value_enum)]
    pub fallback: Option<LlmProvider>,

    /// Delay between revealed words, in milliseconds
    #[arg(long, global = true)]
    pub reveal_ms: Option<u64>,

    /// Write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a one-off prompt and print the answer
    Ask {
        /// The prompt to send
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Show the effective configuration
    Config,
}
