//! Main Entrypoint for the Poliglot CLI
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and the command line.
//! 2. Initializing logging.
//! 3. Building the question generator, speech, bell and history adapters.
//! 4. Running the interactive quiz loop, or one of the history commands.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::{Parser, Subcommand};
use poliglot_cli::{
    config::Config,
    prompts::load_prompts,
    speech::{CommandPronouncer, TerminalHaptics},
    terminal::{is_quit, parse_input, render, render_history},
};
use poliglot_core::{
    generator::{LLMQuestionGenerator, OfflineQuestionGenerator, QuestionGenerator},
    history::{FileHistoryStore, HistoryStore},
    quiz::Event,
    runtime::{PendingGeneration, QuizRuntime},
    speech::{Pronouncer, SilentPronouncer},
};
use std::{future::Future, path::PathBuf, pin::Pin, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "poliglot",
    version,
    about = "Poliglot - Uzbek vocabulary quizzes for the Yeni Istanbul course books"
)]
struct Cli {
    /// Use built-in sample questions instead of the AI provider
    #[arg(long)]
    offline: bool,

    /// Directory holding the quiz history (overrides HISTORY_DIR)
    #[arg(long)]
    history_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take a quiz (the default)
    Play,
    /// Print past quiz results, newest first
    History,
    /// Delete all past quiz results
    ClearHistory {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// A question request the loop is waiting on.
type InFlight = Pin<Box<dyn Future<Output = Event>>>;

fn launch(pending: PendingGeneration) -> InFlight {
    info!(token = ?pending.token(), level = %pending.selection().level, "Requesting questions");
    Box::pin(pending.run())
}

/// What woke the quiz loop up.
enum Wakeup {
    Loaded(Event),
    Line(Option<String>),
}

fn build_generator(config: &Config, offline: bool) -> anyhow::Result<Arc<dyn QuestionGenerator>> {
    if offline {
        info!("Using offline sample questions.");
        return Ok(Arc::new(OfflineQuestionGenerator::default()));
    }

    let api_key = config
        .api_key()
        .context("No API key configured; set one or run with --offline")?;
    let prompts = load_prompts(&config.prompts_path)?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(config.provider.api_base());
    info!(provider = ?config.provider, model = %config.chat_model, "Using AI provider.");
    Ok(Arc::new(LLMQuestionGenerator::new(
        openai_config,
        config.chat_model.clone(),
        prompts,
    )))
}

fn build_pronouncer(config: &Config) -> Arc<dyn Pronouncer> {
    match &config.tts_command {
        Some(program) => Arc::new(CommandPronouncer::new(program.clone())),
        None => {
            info!("Speech disabled.");
            Arc::new(SilentPronouncer)
        }
    }
}

async fn play(runtime: &mut QuizRuntime) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<InFlight> = None;
    let mut redraw = true;

    loop {
        if redraw {
            println!("\n{}", render(runtime.state(), &runtime.history()));
        }

        let wakeup = match in_flight.as_mut() {
            Some(request) => tokio::select! {
                loaded = request => Wakeup::Loaded(loaded),
                line = lines.next_line() => Wakeup::Line(line.context("Failed to read input")?),
            },
            None => Wakeup::Line(lines.next_line().await.context("Failed to read input")?),
        };

        match wakeup {
            Wakeup::Loaded(event) => {
                in_flight = runtime.dispatch(event).map(launch);
                redraw = true;
            }
            Wakeup::Line(None) => break,
            Wakeup::Line(Some(line)) if is_quit(&line) => break,
            Wakeup::Line(Some(line)) => match parse_input(runtime.state(), &line) {
                Some(event) => {
                    if let Some(pending) = runtime.dispatch(event) {
                        in_flight = Some(launch(pending));
                    } else if runtime.state().pending_request().is_none() {
                        // Dropping the future cancels an abandoned request.
                        in_flight = None;
                    }
                    redraw = true;
                }
                None => {
                    println!("Unrecognized input: '{}'", line.trim());
                    redraw = false;
                }
            },
        }
    }

    info!("Goodbye.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.history_dir {
        config.history_dir = dir;
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(history_dir = %config.history_dir.display(), "Configuration loaded.");

    let history = Arc::new(FileHistoryStore::new(&config.history_dir));

    // --- 3. Run the requested command ---
    match cli.command.unwrap_or(Commands::Play) {
        Commands::History => {
            print!("{}", render_history(&history.load()));
        }
        Commands::ClearHistory { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete history without --yes");
            }
            history
                .clear()
                .with_context(|| format!("Failed to clear {}", history.path().display()))?;
            println!("History cleared.");
        }
        Commands::Play => {
            let generator = build_generator(&config, cli.offline)?;
            let mut runtime = QuizRuntime::new(
                generator,
                build_pronouncer(&config),
                Arc::new(TerminalHaptics),
                history,
            );
            play(&mut runtime).await?;
        }
    }

    Ok(())
}
