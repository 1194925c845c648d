//! Line-oriented chat on stdin/stdout

use aiterm_core::{Config, GeneratorMode};
use aiterm_session::{InputSource, InteractionLoop, ModelSession, OutputSink};
use anyhow::Result;
use crossterm::{cursor, execute, terminal};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::startup;

pub async fn execute() -> Result<()> {
    let config = Config::load()?;

    println!("Welcome to intelligent terminal! Type 'exit' to quit.");

    let opened = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || open_session(&config)).await?
    };
    let Some(mut session) = opened else {
        eprintln!("Failed to load model. Exiting.");
        std::process::exit(1);
    };

    tokio::task::spawn_blocking(move || {
        let input = StdinInput::new(io::stdin().lock(), config.interface.prompt.clone());
        InteractionLoop::new(&mut session, input, StdoutSink)
            .farewell(config.interface.farewell.clone())
            .run()
    })
    .await?
}

/// `None` when the configured model could not be loaded.
fn open_session(config: &Config) -> Option<ModelSession> {
    let mut session = match startup::build_session(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            return None;
        }
    };

    if config.model.mode == GeneratorMode::Canned {
        println!("Running with canned responses; no model is loaded.");
        return Some(session);
    }

    let path = &config.model.default_path;
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Loading AI model from: {}", path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let loaded = session.load_model(path);
    spinner.finish_and_clear();

    match loaded {
        Ok(()) => Some(session),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

/// Reads lines after printing the prompt. End of stream ends the session.
struct StdinInput<R> {
    reader: R,
    prompt: String,
}

impl<R: BufRead> StdinInput<R> {
    fn new(reader: R, prompt: String) -> Self {
        Self { reader, prompt }
    }
}

impl<R: BufRead> InputSource for StdinInput<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", self.prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            // EOF
            println!();
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

struct StdoutSink;

impl OutputSink for StdoutSink {
    fn append(&mut self, text: &str, from_ai: bool) -> Result<()> {
        if from_ai {
            println!("AI: {}", text);
        } else {
            println!("{}", text);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))?;
        Ok(())
    }
}
