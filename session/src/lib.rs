//! aiterm_session - The prompt-to-response request lifecycle
//!
//! This crate provides:
//! - [`ModelSession`], which owns at most one loaded generator
//! - [`Command`] classification of raw input lines
//! - [`InteractionLoop`], the read / classify / dispatch / write cycle
//! - [`GenerationWorker`], which runs a session off the display thread

pub mod command;
pub mod interaction;
pub mod session;
pub mod worker;

pub use command::{Command, HELP_TEXT};
pub use interaction::{dispatch_line, Dispatch, Flow, InputSource, InteractionLoop, OutputSink};
pub use session::ModelSession;
pub use worker::{GenerationWorker, WorkerError, WorkerEvent};
