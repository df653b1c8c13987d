//! Domain types for the capture agent.
//!
//! This module contains the core data structures:
//! - Session: capture session state machine
//! - Upload: per-artifact upload tasks
//! - Events: session journal entries

pub mod events;
pub mod session;
pub mod upload;

// Re-export commonly used types
pub use events::{SessionEvent, SessionEventType};
pub use session::{CaptureSession, SessionError, SessionStatus};
pub use upload::{AnalysisType, CameraFacing, TaskResult, UploadKind, UploadMetadata, UploadTask};
