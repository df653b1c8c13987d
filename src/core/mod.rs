//! Core capture loop.
//!
//! This module contains:
//! - RateLimiter: admission control for outbound uploads
//! - PermissionGate: microphone/camera authorization
//! - UploadDispatcher: rate-limited multipart uploads
//! - SessionRunner: one capture session lifecycle
//! - CaptureScheduler: interval-driven session loop
//! - SessionJournal: append-only session history

pub mod dispatcher;
pub mod journal;
pub mod permissions;
pub mod rate_limiter;
pub mod scheduler;
pub mod session;

// Re-export commonly used types
pub use dispatcher::UploadDispatcher;
pub use journal::{SessionJournal, SessionSummary};
pub use permissions::{CaptureClearance, PermissionGate};
pub use rate_limiter::{Admission, RateLimiter, RateLimiterState, RateLimits, Rejection};
pub use scheduler::{
    trigger_combined_analysis, CaptureScheduler, SchedulerHandle, SchedulerSettings,
    SchedulerState, SchedulerStats, TickDecision,
};
pub use session::{SessionRunner, SessionSettings};
