//! Local handling of captured media.
//!
//! Captures from the device adapters are copied into a persistent media
//! directory before they are handed to the upload dispatcher.

pub mod media_store;

pub use media_store::{compute_file_hash, MediaStore};
