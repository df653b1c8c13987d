//! soothsayer - periodic multimodal capture agent
//!
//! Records short audio clips on a fixed cadence, grabs front and back camera
//! stills while recording, and uploads every capture to an analysis backend
//! for transcription and sentiment scoring.
//!
//! # Architecture
//!
//! - A single scheduler task owns the timer and allows at most one active
//!   capture session.
//! - Each session moves through an explicit lifecycle
//!   (Idle → Recording → Finalizing → Completed/Failed).
//! - Every upload passes a shared rate limiter; failures are logged and
//!   recorded per task, never retried.
//! - Session lifecycle events are appended to a JSONL journal.
//!
//! # Modules
//!
//! - `adapters`: Backend HTTP client and device traits (microphone, camera)
//! - `core`: Scheduler, session runner, dispatcher, rate limiter, journal
//! - `domain`: Data structures (CaptureSession, UploadTask, SessionEvent)
//! - `ingest`: Content-addressed media store
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Capture on a 10s cadence until Ctrl-C
//! soothsayer run
//!
//! # One session, then exit
//! soothsayer capture
//!
//! # Ask the backend for a combined analysis
//! soothsayer analyze
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;

// Re-export main types at crate root for convenience
pub use adapters::{AnalysisBackend, BackendClient, UploadError};
pub use core::{CaptureScheduler, RateLimiter, SessionRunner, UploadDispatcher};
pub use domain::{CaptureSession, SessionStatus, UploadKind, UploadTask};
