use aiterm_core::Resolution;
use aiterm_runtime_api::RuntimeStatus;
use aiterm_session::{dispatch_line, Dispatch, GenerationWorker, ModelSession, OutputSink, WorkerEvent};
use anyhow::Result;
use chrono::{DateTime, Local};

pub struct Entry {
    pub text: String,
    pub from_ai: bool,
    pub time: DateTime<Local>,
}

/// Timestamped transcript shown in the terminal pane
#[derive(Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn push(&mut self, text: impl Into<String>, from_ai: bool) {
        self.entries.push(Entry {
            text: text.into(),
            from_ai,
            time: Local::now(),
        });
    }
}

impl OutputSink for Transcript {
    fn append(&mut self, text: &str, from_ai: bool) -> Result<()> {
        self.push(text, from_ai);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

pub struct App {
    pub transcript: Transcript,
    pub input: String,

    // Model state
    pub status: RuntimeStatus,
    pub generator: Option<String>,

    /// Lines scrolled back from the bottom of the transcript
    pub scroll: u16,
    pub should_quit: bool,

    // Internal
    farewell: String,
    worker: GenerationWorker,
}

impl App {
    /// Hand `session` to a background worker. Must be called inside a tokio runtime.
    pub fn new(session: ModelSession) -> Self {
        let generator = session.generator_name();
        let status = if generator.is_some() {
            RuntimeStatus::Ready
        } else {
            RuntimeStatus::Unloaded
        };

        let mut app = Self {
            transcript: Transcript::default(),
            input: String::new(),
            status,
            generator,
            scroll: 0,
            should_quit: false,
            farewell: "Goodbye!".to_string(),
            worker: GenerationWorker::spawn(session),
        };

        app.transcript.push("Welcome to AI Terminal!", false);
        app.transcript.push("Type 'help' for a list of commands.", false);
        if let Some(name) = app.generator.clone() {
            app.transcript.push(format!("Using {}.", name), false);
        }
        app
    }

    pub fn farewell(mut self, farewell: impl Into<String>) -> Self {
        self.farewell = farewell.into();
        self
    }

    /// Show how the model file was found and start loading it.
    pub fn begin_load(&mut self, resolution: &Resolution) {
        for message in resolution.messages() {
            self.transcript.push(message, false);
        }

        let Some(path) = resolution.path() else {
            self.status = RuntimeStatus::Unloaded;
            return;
        };

        self.transcript
            .push(format!("Loading AI model from: {}", path.display()), false);
        match self.worker.load(path.to_path_buf()) {
            Ok(()) => self.status = RuntimeStatus::Loading,
            Err(e) => self.load_failed(&e.to_string()),
        }
    }

    pub fn load_failed(&mut self, error: &str) {
        self.status = RuntimeStatus::Error;
        self.transcript.push(format!("Error: {}", error), false);
        self.transcript.push(
            "Failed to load model. The application will work in limited mode.",
            false,
        );
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn status_text(&self) -> String {
        match self.status {
            RuntimeStatus::Unloaded => "AI Model: Not loaded".to_string(),
            RuntimeStatus::Loading => "AI Model: Loading...".to_string(),
            RuntimeStatus::Ready => match &self.generator {
                Some(name) => format!("AI Model: Loaded ({})", name),
                None => "AI Model: Loaded".to_string(),
            },
            RuntimeStatus::Error => "AI Model: Failed to load".to_string(),
        }
    }

    pub fn push_char(&mut self, c: char) {
        if !self.is_busy() {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if !self.is_busy() {
            self.input.pop();
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Dispatch the input line. Ignored while a request is in flight.
    pub fn submit(&mut self) {
        if self.is_busy() {
            return;
        }

        let line = std::mem::take(&mut self.input);
        if line.is_empty() {
            return;
        }
        self.scroll = 0;

        match dispatch_line(&line, &mut self.transcript, true, &self.farewell) {
            Ok(Dispatch::Continue) => {}
            Ok(Dispatch::Exit) => self.should_quit = true,
            Ok(Dispatch::Generate(prompt)) => match self.worker.submit(prompt) {
                Ok(()) => self.transcript.push("Processing...", false),
                Err(e) => self.transcript.push(format!("Error: {}", e), false),
            },
            Err(e) => self.transcript.push(format!("Error: {}", e), false),
        }
    }

    /// Apply whatever the worker has finished since the last tick.
    pub fn tick(&mut self) {
        while let Some(event) = self.worker.try_event() {
            self.apply(event);
        }
    }

    pub async fn shutdown(self) {
        self.worker.shutdown().await;
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Loading(_) => self.status = RuntimeStatus::Loading,
            WorkerEvent::Loaded { generator, .. } => {
                self.status = RuntimeStatus::Ready;
                self.generator = Some(generator);
                self.transcript.push("AI model loaded successfully!", false);
            }
            WorkerEvent::LoadFailed { error, .. } => self.load_failed(&error),
            WorkerEvent::Response(text) => {
                self.scroll = 0;
                self.transcript.push(text, true);
            }
            WorkerEvent::Stopped => {
                self.status = RuntimeStatus::Error;
                self.transcript
                    .push("Error: the AI model stopped responding.", false);
            }
        }
    }
}
