mod app;
mod ui;

use aiterm_core::{resolve_model_path, Config, GeneratorMode, PathPrompt, Resolution};
use aiterm_session::ModelSession;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;

use crate::startup;
use app::App;

pub async fn run() -> Result<()> {
    let config = Config::load()?;

    // The file prompt needs the normal screen, so resolve before switching
    let resolution = match config.model.mode {
        GeneratorMode::Inference => Some(resolve_or_limited(&config, &mut DialoguerPrompt)),
        GeneratorMode::Canned => None,
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = match startup::build_session(&config) {
        Ok(session) => {
            let mut app = App::new(session).farewell(config.interface.farewell.clone());
            if let Some(resolution) = &resolution {
                app.begin_load(resolution);
            }
            app
        }
        Err(e) => {
            tracing::error!("Could not start the inference backend: {}", e);
            let mut app =
                App::new(ModelSession::new()).farewell(config.interface.farewell.clone());
            app.load_failed(&e.to_string());
            app
        }
    };

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.shutdown().await;
    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match key.code {
                    KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(())
                    }
                    KeyCode::Enter => app.submit(),
                    KeyCode::Backspace => app.backspace(),
                    KeyCode::Char(c) => app.push_char(c),
                    KeyCode::Up => app.scroll_up(1),
                    KeyCode::Down => app.scroll_down(1),
                    KeyCode::PageUp => app.scroll_up(10),
                    KeyCode::PageDown => app.scroll_down(10),
                    _ => {}
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        // Pick up load and generation results
        app.tick();
    }
}

/// Find the model file. A failed search leaves the UI running without a model.
fn resolve_or_limited(config: &Config, prompt: &mut dyn PathPrompt) -> Resolution {
    resolve_model_path(
        &config.model.default_path,
        &config.model.search_dir,
        &config.model.extension,
        prompt,
    )
    .unwrap_or_else(|e| {
        tracing::error!("Model search failed: {:#}", e);
        Resolution::NotChosen
    })
}

/// Asks for a model file on the plain terminal.
struct DialoguerPrompt;

impl PathPrompt for DialoguerPrompt {
    fn ask(&mut self, extension: &str) -> Result<Option<PathBuf>> {
        use dialoguer::Input;

        let answer = Input::<String>::new()
            .with_prompt(format!("Select AI model (*.{}), empty to skip", extension))
            .allow_empty(true)
            .interact_text();

        match answer {
            Ok(answer) if answer.trim().is_empty() => Ok(None),
            Ok(answer) => Ok(Some(PathBuf::from(answer.trim()))),
            Err(e) => {
                // No usable terminal: carry on without a model
                tracing::warn!("Model prompt unavailable: {}", e);
                Ok(None)
            }
        }
    }
}
