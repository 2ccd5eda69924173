//! The unlock workflow and its background runner.
//!
//! A run opens the source, copies every page in order into a fresh document,
//! reports one progress percentage per page and saves the copy next to the
//! source. [`spawn`] moves the run onto the blocking thread pool and streams
//! [`DecryptEvent`]s back: zero or more `Progress` values in page order, then
//! exactly one `Finished`.
//!
//! There is no cancellation and no timeout. Two runs on the same source race
//! for the same output path; callers serialize them (see
//! [`Controller`](crate::Controller)).

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info};

use crate::config::DEFAULT_MARKER;
use crate::error::{ErrorKind, Result};
use crate::naming::unlocked_path;
use crate::pdf::{OutputDocument, SourceDocument};

/// Parameters of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptRequest {
    pub source: PathBuf,
    pub password: String,
    pub marker: String,
    pub compress: bool,
}

impl DecryptRequest {
    /// A request with an empty password and the default marker.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            password: String::new(),
            marker: DEFAULT_MARKER.to_string(),
            compress: true,
        }
    }

    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    #[must_use]
    pub const fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The unlocked copy was written to `path`
    Success { path: PathBuf },
    /// The run aborted; `message` is meant for display
    Failure { kind: ErrorKind, message: String },
}

impl Outcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Success { path } => Some(path),
            Self::Failure { .. } => None,
        }
    }

    pub(crate) fn worker_lost() -> Self {
        Self::Failure {
            kind: ErrorKind::Unexpected,
            message: "worker stopped without reporting a result".to_string(),
        }
    }
}

impl From<Result<PathBuf>> for Outcome {
    fn from(result: Result<PathBuf>) -> Self {
        match result {
            Ok(path) => Self::Success { path },
            Err(e) => Self::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// Message sent from a background run to the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptEvent {
    /// Percentage of pages copied so far (0-100)
    Progress(u8),
    /// Always the last event of a run
    Finished(Outcome),
}

/// `round(done / total * 100)`, rounding halves up.
///
/// `done` is clamped to `total`; an empty document counts as complete.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total);
    let percent = (done.saturating_mul(100) + total / 2) / total;
    u8::try_from(percent).unwrap_or(100)
}

/// Copy every page of `request.source` into an unencrypted sibling file.
///
/// `on_progress` is called once per page, after the page is appended. On
/// success returns the path of the written copy. The first failure aborts the
/// run; nothing is retried.
pub fn decrypt_file(request: &DecryptRequest, mut on_progress: impl FnMut(u8)) -> Result<PathBuf> {
    let source = SourceDocument::open(&request.source, &request.password)?;
    let total = source.page_count();
    info!("Opened {} ({} pages)", source.path().display(), total);

    let output_path = unlocked_path(&request.source, &request.marker)?;

    let mut output = OutputDocument::new(&source);
    for (index, &page_id) in source.page_ids().iter().enumerate() {
        output.append_page(&source, page_id)?;

        let percent = progress_percent(index + 1, total);
        debug!("Copied page {}/{} ({}%)", index + 1, total, percent);
        on_progress(percent);
    }

    output.save(&output_path, request.compress)?;
    info!("Saved unlocked copy to {}", output_path.display());

    drop(source);
    Ok(output_path)
}

/// Like [`decrypt_file`] but folds any error into [`Outcome::Failure`].
pub fn run(request: &DecryptRequest, on_progress: impl FnMut(u8)) -> Outcome {
    let outcome = Outcome::from(decrypt_file(request, on_progress));
    if let Outcome::Failure { kind, message } = &outcome {
        error!("Unlocking {} failed ({kind}): {message}", request.source.display());
    }
    outcome
}

/// Receiving end of a background run.
#[derive(Debug)]
pub struct DecryptHandle {
    events: mpsc::UnboundedReceiver<DecryptEvent>,
}

impl DecryptHandle {
    /// Next event, or `None` once the run is over and all events are consumed.
    pub async fn recv(&mut self) -> Option<DecryptEvent> {
        self.events.recv().await
    }

    /// Non-blocking poll for event loops that cannot await.
    ///
    /// `Empty` means the run is still going. `Disconnected` means no event
    /// will ever arrive again; if `Finished` was not seen before that, the
    /// worker died and the run counts as [`Outcome::worker_lost`].
    pub fn try_recv(&mut self) -> std::result::Result<DecryptEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// Discard progress and wait for the terminal outcome.
    pub async fn wait(mut self) -> Outcome {
        while let Some(event) = self.recv().await {
            if let DecryptEvent::Finished(outcome) = event {
                return outcome;
            }
        }
        Outcome::worker_lost()
    }
}

/// Start a run on the tokio blocking pool.
///
/// Must be called from within a tokio runtime.
pub fn spawn(request: DecryptRequest) -> DecryptHandle {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        // A dropped receiver only means nobody is watching any more
        let outcome = run(&request, |percent| {
            let _ = tx.send(DecryptEvent::Progress(percent));
        });
        let _ = tx.send(DecryptEvent::Finished(outcome));
    });

    DecryptHandle { events: rx }
}
