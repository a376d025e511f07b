mod chat;
mod cli;
mod config;
mod llm;
mod markup;
mod reveal;
mod tui;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use crossterm::style::Stylize;
use markup::Token;
use reveal::RevealEvent;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), cli.command.is_none())?;

    let config = Config::from_env()?.with_overrides(&cli);
    info!(provider = %config.provider, model = config.model_for(config.provider), "starting");

    match cli.command {
        Some(Commands::Ask { message }) => {
            let client = llm::client_from_config(&config)?;
            ask(client.as_ref(), &config, &message.join(" ")).await?;
        }
        Some(Commands::Config) => {
            println!("{config}");
        }
        None => {
            let client = llm::client_from_config(&config)?;
            tui::run(client.into(), &config).await?;
        }
    }

    Ok(())
}

/// Logs go to `log_file` when given. Without one they go to stderr, except
/// on the chat screen where they would be drawn over.
fn init_tracing(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None if interactive => BoxMakeWriter::new(io::sink),
        None => BoxMakeWriter::new(io::stderr),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .init();

    Ok(())
}

/// One-shot prompt: the answer is typed out on stdout word by word.
async fn ask(client: &dyn llm::LlmClient, config: &Config, prompt: &str) -> Result<()> {
    let mut state = chat::ChatState::new();
    eprintln!("Asking {}...", client.model());

    let Some(words) = state.submit(client, prompt).await else {
        println!("{}", state.result_data);
        return Ok(());
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    reveal::spawn(state.generation(), words, config.reveal_interval, tx);

    let mut stdout = io::stdout();
    let mut bold = false;
    while let Some(event) = rx.recv().await {
        match event {
            RevealEvent::Word { generation, word } => {
                state.append_word(generation, &word);
                write_markup(&mut stdout, &word, &mut bold)?;
                stdout.flush()?;
            }
            RevealEvent::Done { .. } => break,
        }
    }
    writeln!(stdout)?;

    Ok(())
}

/// Print markup with ANSI bold. `bold` carries state across calls because a
/// bold span usually covers several words.
fn write_markup(out: &mut impl Write, markup: &str, bold: &mut bool) -> io::Result<()> {
    for token in markup::tokenize(markup) {
        match token {
            Token::Text(text) if *bold => write!(out, "{}", text.bold())?,
            Token::Text(text) => write!(out, "{text}")?,
            Token::BoldOn => *bold = true,
            Token::BoldOff => *bold = false,
            Token::Break => writeln!(out)?,
        }
    }
    Ok(())
}
