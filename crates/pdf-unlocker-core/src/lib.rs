//! PDF Unlocker Core Library
//!
//! Produces an unencrypted copy of a PDF by copying its pages, in order,
//! into a freshly built document:
//! - Opening the source and rebuilding its page tree
//! - Deriving the output name next to the source
//! - Running the copy on a background thread with per-page progress
//! - Foreground state for a front end driving runs

pub mod config;
pub mod controller;
pub mod error;
pub mod naming;
pub mod pdf;
pub mod util;
pub mod worker;

pub use config::{AppConfig, DEFAULT_MARKER};
pub use controller::{Controller, FolderOpener, NoReveal, Reveal, Run, Status};
pub use error::{Error, ErrorKind, Result};
pub use naming::unlocked_path;
pub use pdf::{OutputDocument, SourceDocument};
pub use worker::{
    DecryptEvent, DecryptHandle, DecryptRequest, Outcome, decrypt_file, progress_percent, run,
    spawn,
};
