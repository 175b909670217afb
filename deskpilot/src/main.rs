use anyhow::{Context, Result};
use clap::Parser;
use deskpilot_lib::settings::{self, LogLevel};
use deskpilot_lib::{logging, ModelError, Pipeline};
use log::{debug, error, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};

const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];

/// Control your desktop with plain-language commands
#[derive(Parser)]
#[command(name = "deskpilot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn plain-language requests into desktop actions")]
#[command(long_about = r#"
Keyword rules handle common requests directly. Anything they do not recognise
goes to a small function-calling model served over an OpenAI-compatible API.

Examples:
  deskpilot                        # interactive session
  deskpilot turn on bluetooth      # run one command and exit
  deskpilot --preload              # load the model before the first prompt
"#)]
struct Cli {
    /// Settings file (defaults to <config dir>/deskpilot/settings.json)
    #[arg(short, long, env = "DESKPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Load the model at startup instead of on first use
    #[arg(long)]
    preload: bool,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Command to run once; starts an interactive session when omitted
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = match cli.config.clone() {
        Some(path) => path,
        None => settings::default_settings_path()
            .context("Could not determine a config directory, pass --config")?,
    };
    let settings = settings::load_or_create(&path)?;
    logging::init(cli.log_level.unwrap_or(settings.log_level));
    info!("Using settings from {}", path.display());

    let pipeline = Pipeline::from_settings(&settings);

    if cli.preload || settings.preload_model {
        if let Err(e) = pipeline.preload_model().await {
            report_model_error(&e);
        }
    }

    if !cli.command.is_empty() {
        let text = cli.command.join(" ");
        return match run_one(&pipeline, &text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                report_model_error(&e);
                std::process::exit(2);
            }
        };
    }

    repl(&pipeline, &path.with_file_name("history.txt")).await
}

async fn run_one(pipeline: &Pipeline, text: &str) -> Result<(), ModelError> {
    for line in pipeline.process(text).await? {
        println!("{}", line);
    }
    Ok(())
}

fn report_model_error(e: &ModelError) {
    error!("{}", e);
    eprintln!("model unavailable: {}", e);
}

async fn repl(pipeline: &Pipeline, history: &Path) -> Result<()> {
    println!("DeskPilot - type \"exit\" to quit.");
    let mut editor = DefaultEditor::new()?;
    if let Err(e) = editor.load_history(history) {
        debug!("No command history loaded: {}", e);
    }

    loop {
        match editor.readline("You > ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(input);
                if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
                    println!("Goodbye!");
                    break;
                }

                if let Err(e) = run_one(pipeline, input).await {
                    report_model_error(&e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Type \"exit\" to quit.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                error!("Input error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = editor.save_history(history) {
        debug!("Could not save command history: {}", e);
    }
    Ok(())
}
