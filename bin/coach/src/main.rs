//! `vitals`: a terminal health coach.
//!
//! Answers questions about the user's blood pressure with a local Ollama
//! model that can read the latest reading from the health store.

mod config;
mod display;
mod error;

use crate::config::{CoachConfig, HealthConfig};
use crate::display::Printer;
use crate::error::CliError;
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};
use rootcause::prelude::ResultExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals_core::Result;
use vitals_conversation::{Availability, LanguageModel, Session};
use vitals_health::{BloodPressureTool, InMemoryHealthStore};
use vitals_ollama::OllamaModel;

const DEFAULT_PROMPT: &str = "Check my last blood pressure and suggest recommendations";

#[derive(Debug, Parser)]
#[command(name = "vitals", version, about = "Talk to a health coach about your blood pressure")]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = "vitals.toml")]
    config: PathBuf,

    /// Ask one question and exit. Without text, asks for the latest reading.
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_PROMPT)]
    prompt: Option<String>,

    /// Print the transcript as JSON before exiting.
    #[arg(long)]
    dump_transcript: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = CoachConfig::load(&cli.config).context(CliError::Config)?;
    info!(path = %cli.config.display(), model = %config.ollama.model, "loaded configuration");

    let store = load_store(&config.health)?;
    let model = OllamaModel::new(config.ollama.clone()).context(CliError::Model)?;
    if let Availability::Unavailable(reason) = model.availability().await {
        return Err(CliError::ModelUnavailable {
            reason: reason.to_string(),
        }
        .into());
    }

    let session = Session::builder(Arc::new(model))
        .instructions(config.session.instructions.clone())
        .tool(BloodPressureTool::new(Arc::new(store)))
        .config(config.session.limits.clone())
        .build()
        .context(CliError::Session)?;
    info!(session_id = %session.id(), "session started");

    let prewarm = session.clone();
    tokio::spawn(async move { prewarm.prewarm().await });

    let mut printer = Printer::new(std::io::stdout());
    match cli.prompt {
        Some(prompt) => respond(&session, prompt, &mut printer).await?,
        None => repl(&session, &mut printer).await?,
    }

    if cli.dump_transcript {
        let json = serde_json::to_string_pretty(&session.transcript()).map_err(|e| {
            CliError::Io {
                details: e.to_string(),
            }
        })?;
        println!("{json}");
    }
    Ok(())
}

fn load_store(config: &HealthConfig) -> Result<InMemoryHealthStore, CliError> {
    let store = match &config.records_path {
        Some(path) => InMemoryHealthStore::from_json_file(path).context(CliError::HealthStore)?,
        None => InMemoryHealthStore::new(),
    };
    Ok(if config.deny_authorization {
        store.deny_authorization("health data access is disabled in configuration")
    } else {
        store
    })
}

/// Reads prompts from stdin until end of input or Ctrl-C.
async fn repl(
    session: &Session,
    printer: &mut Printer<std::io::Stdout>,
) -> Result<(), CliError> {
    println!("Ask your coach anything. An empty line asks: {DEFAULT_PROMPT}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().map_err(CliError::from)?;

        let Some(prompt) = next_prompt(&mut lines, tokio::signal::ctrl_c()).await? else {
            break;
        };
        respond(session, prompt, printer).await?;
    }
    println!();
    Ok(())
}

/// Waits for the next prompt. `None` means end of input or an interrupt.
async fn next_prompt<R>(
    lines: &mut Lines<R>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<Option<String>, CliError>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => {
            let line = line.map_err(CliError::from)?;
            Ok(line.map(|line| match line.trim() {
                "" => DEFAULT_PROMPT.to_string(),
                text => text.to_string(),
            }))
        }
        _ = interrupt => {
            debug!("prompt interrupted");
            Ok(None)
        }
    }
}

/// Streams one response to the terminal.
///
/// Ctrl-C abandons the response; the session keeps what arrived so far.
async fn respond(
    session: &Session,
    prompt: String,
    printer: &mut Printer<std::io::Stdout>,
) -> Result<(), CliError> {
    let mut stream = match session.submit(prompt) {
        Ok(stream) => stream,
        Err(e) => {
            printer.error(&e).map_err(CliError::from)?;
            return Ok(());
        }
    };

    loop {
        tokio::select! {
            update = stream.next() => match update {
                Some(Ok(update)) => printer.update(&update).map_err(CliError::from)?,
                Some(Err(e)) => {
                    printer.error(&e).map_err(CliError::from)?;
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("response interrupted");
                printer.note("[interrupted]").map_err(CliError::from)?;
                break;
            }
        }
    }
    printer.finish().map_err(CliError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_health::HealthError;

    #[test]
    fn bare_prompt_flag_uses_default_question() {
        let cli = Cli::try_parse_from(["vitals", "--prompt"]).expect("parse");
        assert_eq!(cli.prompt.as_deref(), Some(DEFAULT_PROMPT));
        assert_eq!(cli.config, PathBuf::from("vitals.toml"));
        assert!(!cli.dump_transcript);
    }

    #[test]
    fn prompt_text_and_flags_parse() {
        let cli = Cli::try_parse_from([
            "vitals",
            "--config",
            "/etc/vitals.toml",
            "--prompt",
            "How was my week?",
            "--dump-transcript",
        ])
        .expect("parse");
        assert_eq!(cli.prompt.as_deref(), Some("How was my week?"));
        assert_eq!(cli.config, PathBuf::from("/etc/vitals.toml"));
        assert!(cli.dump_transcript);
    }

    #[tokio::test]
    async fn blank_lines_ask_the_default_question() {
        let input: &[u8] = b"  \nHow was my week?\n";
        let mut lines = BufReader::new(input).lines();

        let first = next_prompt(&mut lines, std::future::pending()).await.expect("read");
        assert_eq!(first.as_deref(), Some(DEFAULT_PROMPT));
        let second = next_prompt(&mut lines, std::future::pending()).await.expect("read");
        assert_eq!(second.as_deref(), Some("How was my week?"));
        let end = next_prompt(&mut lines, std::future::pending()).await.expect("read");
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn interrupt_ends_the_wait_for_a_prompt() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        let interrupt = async { Ok::<_, std::io::Error>(()) };
        let prompt = next_prompt(&mut lines, interrupt).await.expect("read");
        assert_eq!(prompt, None);
    }

    #[test]
    fn unreadable_health_export_keeps_the_underlying_report() {
        let config = HealthConfig {
            records_path: Some(PathBuf::from("/nonexistent/vitals.json")),
            ..HealthConfig::default()
        };
        let report = load_store(&config).expect_err("missing export");

        assert!(matches!(report.current_context(), CliError::HealthStore));
        let cause = report
            .iter_reports()
            .find_map(|r| r.downcast_current_context::<HealthError>());
        assert!(matches!(cause, Some(HealthError::ExportUnreadable { .. })));
    }

    #[test]
    fn health_store_without_export_starts_empty() {
        let config = HealthConfig {
            deny_authorization: true,
            ..HealthConfig::default()
        };
        let store = load_store(&config).expect("store");
        assert!(store.is_empty());
    }
}
