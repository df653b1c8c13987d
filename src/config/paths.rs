//! Canonical paths for the capture agent.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use soothsayer::config::paths;
//!
//! let journal = paths::session_journal()?;
//! let media = paths::media_dir()?;
//! ```
//!
//! ## Layout
//!
//! | Location | Purpose |
//! |----------|---------|
//! | `<home>/sessions.jsonl` | Session journal |
//! | `<home>/media/{audio,front,back}/` | Persisted captures |
//! | `<home>/captures/` | Scratch output of capture commands |

use std::path::{Path, PathBuf};

use anyhow::Result;

pub const SESSION_JOURNAL_FILE: &str = "sessions.jsonl";
pub const MEDIA_DIR: &str = "media";
pub const CAPTURE_DIR: &str = "captures";

/// Get the state directory (~/.soothsayer)
pub fn soothsayer_home() -> Result<PathBuf> {
    crate::config::soothsayer_home()
}

/// Get the session journal path (~/.soothsayer/sessions.jsonl)
pub fn session_journal() -> Result<PathBuf> {
    Ok(session_journal_in(&soothsayer_home()?))
}

/// Get the persisted media directory (~/.soothsayer/media/)
pub fn media_dir() -> Result<PathBuf> {
    Ok(media_dir_in(&soothsayer_home()?))
}

/// Get the scratch directory capture commands write into (~/.soothsayer/captures/)
pub fn capture_dir() -> Result<PathBuf> {
    Ok(capture_dir_in(&soothsayer_home()?))
}

pub fn session_journal_in(home: &Path) -> PathBuf {
    home.join(SESSION_JOURNAL_FILE)
}

pub fn media_dir_in(home: &Path) -> PathBuf {
    home.join(MEDIA_DIR)
}

pub fn capture_dir_in(home: &Path) -> PathBuf {
    home.join(CAPTURE_DIR)
}
