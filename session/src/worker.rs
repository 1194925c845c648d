//! Runs a [`ModelSession`] on a blocking task so the display thread stays
//! responsive while a model loads or generates.
//!
//! Only one request is in flight at a time. The display side submits a
//! request, shows a busy indicator, and polls for the matching event.

use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;

use crate::session::ModelSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A load request was picked up; the request is still in flight
    Loading(PathBuf),
    Loaded { path: PathBuf, generator: String },
    LoadFailed { path: PathBuf, error: String },
    Response(String),
    /// The worker went away with a request in flight, e.g. after a panic
    Stopped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("a request is already in flight")]
    Busy,

    #[error("the generation worker has stopped")]
    Stopped,
}

enum Request {
    Load(PathBuf),
    Generate(String),
}

pub struct GenerationWorker {
    requests: mpsc::UnboundedSender<Request>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
    in_flight: bool,
    handle: JoinHandle<()>,
}

impl GenerationWorker {
    /// Move `session` onto a blocking task. Must be called inside a tokio runtime.
    pub fn spawn(session: ModelSession) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let handle = tokio::task::spawn_blocking(move || serve(session, request_rx, event_tx));

        Self {
            requests: request_tx,
            events: event_rx,
            in_flight: false,
            handle,
        }
    }

    pub fn load(&mut self, path: PathBuf) -> Result<(), WorkerError> {
        self.send(Request::Load(path))
    }

    pub fn submit(&mut self, prompt: impl Into<String>) -> Result<(), WorkerError> {
        self.send(Request::Generate(prompt.into()))
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Next event if one is ready, without waiting
    pub fn try_event(&mut self) -> Option<WorkerEvent> {
        match self.events.try_recv() {
            Ok(event) => {
                self.observe(&event);
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.stopped(),
        }
    }

    /// Wait for the next event. `None` once the worker is gone.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        match self.events.recv().await {
            Some(event) => {
                self.observe(&event);
                Some(event)
            }
            None => self.stopped(),
        }
    }

    /// Stop accepting requests and wait for the worker, which drops the
    /// session (and its model) on the worker thread.
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.handle.await {
            tracing::error!("Generation worker panicked: {}", e);
        }
    }

    fn send(&mut self, request: Request) -> Result<(), WorkerError> {
        if self.in_flight {
            return Err(WorkerError::Busy);
        }
        self.requests.send(request).map_err(|_| WorkerError::Stopped)?;
        self.in_flight = true;
        Ok(())
    }

    /// Reported once, and only if something was still in flight.
    fn stopped(&mut self) -> Option<WorkerEvent> {
        if !self.in_flight {
            return None;
        }
        tracing::error!("Generation worker stopped with a request in flight");
        self.in_flight = false;
        Some(WorkerEvent::Stopped)
    }

    fn observe(&mut self, event: &WorkerEvent) {
        if !matches!(event, WorkerEvent::Loading(_)) {
            self.in_flight = false;
        }
    }
}

fn serve(
    mut session: ModelSession,
    mut requests: mpsc::UnboundedReceiver<Request>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    tracing::debug!("Generation worker started");

    while let Some(request) = requests.blocking_recv() {
        let event = match request {
            Request::Load(path) => {
                if events.send(WorkerEvent::Loading(path.clone())).is_err() {
                    break;
                }
                match session.load_model(&path) {
                    Ok(()) => WorkerEvent::Loaded {
                        generator: session.generator_name().unwrap_or_default(),
                        path,
                    },
                    Err(e) => WorkerEvent::LoadFailed {
                        path,
                        error: e.to_string(),
                    },
                }
            }
            Request::Generate(prompt) => WorkerEvent::Response(session.generate(&prompt)),
        };

        if events.send(event).is_err() {
            break;
        }
    }

    tracing::debug!("Generation worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiterm_runtime_api::{GenerationFailure, Generator, GeneratorKind, LoadError, ModelLoader};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Upper(Arc<AtomicUsize>);

    impl Generator for Upper {
        fn kind(&self) -> GeneratorKind {
            GeneratorKind::Inference
        }

        fn name(&self) -> String {
            "upper".to_string()
        }

        fn generate(&mut self, prompt: &str) -> Result<String, GenerationFailure> {
            Ok(prompt.to_uppercase())
        }
    }

    impl Drop for Upper {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;

    impl Generator for Panicking {
        fn kind(&self) -> GeneratorKind {
            GeneratorKind::Inference
        }

        fn name(&self) -> String {
            "panicking".to_string()
        }

        fn generate(&mut self, _prompt: &str) -> Result<String, GenerationFailure> {
            panic!("generator blew up");
        }
    }

    struct UpperLoader(Arc<AtomicUsize>);

    impl ModelLoader for UpperLoader {
        fn load(&self, path: &Path) -> Result<Box<dyn Generator>, LoadError> {
            if path.ends_with("missing.gguf") {
                return Err(LoadError::NotFound(path.to_path_buf()));
            }
            Ok(Box::new(Upper(Arc::clone(&self.0))))
        }
    }

    #[tokio::test]
    async fn generates_off_thread() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut worker = GenerationWorker::spawn(ModelSession::with_generator(Upper(drops.clone())));

        worker.submit("hello").unwrap();
        assert!(worker.is_busy());
        assert_eq!(worker.submit("again"), Err(WorkerError::Busy));

        assert_eq!(worker.next_event().await, Some(WorkerEvent::Response("HELLO".to_string())));
        assert!(!worker.is_busy());

        worker.shutdown().await;
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_reports_progress_then_result() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut worker = GenerationWorker::spawn(ModelSession::with_loader(UpperLoader(drops)));

        worker.load(PathBuf::from("/models/tiny.gguf")).unwrap();
        assert_eq!(
            worker.next_event().await,
            Some(WorkerEvent::Loading(PathBuf::from("/models/tiny.gguf")))
        );
        assert!(worker.is_busy());
        assert_eq!(
            worker.next_event().await,
            Some(WorkerEvent::Loaded {
                path: PathBuf::from("/models/tiny.gguf"),
                generator: "upper".to_string(),
            })
        );
        assert!(!worker.is_busy());

        worker.submit("ok").unwrap();
        assert_eq!(worker.next_event().await, Some(WorkerEvent::Response("OK".to_string())));
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn failed_load_keeps_worker_usable() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut worker = GenerationWorker::spawn(ModelSession::with_loader(UpperLoader(drops)));

        worker.load(PathBuf::from("/models/missing.gguf")).unwrap();
        let _loading = worker.next_event().await;
        match worker.next_event().await {
            Some(WorkerEvent::LoadFailed { error, .. }) => {
                assert_eq!(error, "model file not found: /models/missing.gguf")
            }
            other => panic!("unexpected event {:?}", other),
        }

        worker.submit("hi").unwrap();
        assert_eq!(
            worker.next_event().await,
            Some(WorkerEvent::Response("[Model not loaded]".to_string()))
        );
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn dead_worker_clears_busy_and_reports_once() {
        let mut worker = GenerationWorker::spawn(ModelSession::with_generator(Panicking));
        worker.submit("boom").unwrap();

        let mut event = None;
        for _ in 0..500 {
            event = worker.try_event();
            if event.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(event, Some(WorkerEvent::Stopped));
        assert!(!worker.is_busy());
        assert_eq!(worker.try_event(), None);
        worker.shutdown().await;
    }
}
