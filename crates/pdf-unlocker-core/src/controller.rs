//! Foreground state for driving unlock runs.
//!
//! Mirrors what a window shows: the selected file, whether the unlock
//! trigger is enabled, a progress value and a status line. A front end feeds
//! it user actions and worker events and renders the resulting state.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::worker::{self, DecryptEvent, DecryptHandle, DecryptRequest, Outcome};

/// Opens a folder in the host's file browser.
pub trait Reveal: Send {
    fn reveal(&self, folder: &Path) -> std::io::Result<()>;
}

/// Reveal through the platform's default opener.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderOpener;

impl Reveal for FolderOpener {
    fn reveal(&self, folder: &Path) -> std::io::Result<()> {
        open::that(folder)
    }
}

/// Never reveal anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReveal;

impl Reveal for NoReveal {
    fn reveal(&self, _folder: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

/// The status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    NoFileSelected,
    Working,
    Succeeded(PathBuf),
    Failed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::NoFileSelected => write!(f, "Select a PDF file first"),
            Self::Working => write!(f, "Unlocking..."),
            Self::Succeeded(path) => {
                write!(f, "Unlocked successfully. File saved to: {}", path.display())
            }
            Self::Failed(message) => write!(f, "Unlock failed: {message}"),
        }
    }
}

/// A started run, tagged with the generation it belongs to.
#[derive(Debug)]
pub struct Run {
    generation: u64,
    handle: DecryptHandle,
}

impl Run {
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn next_event(&mut self) -> Option<DecryptEvent> {
        self.handle.recv().await
    }

    /// See [`DecryptHandle::try_recv`] for what each error means.
    pub fn try_next_event(&mut self) -> std::result::Result<DecryptEvent, TryRecvError> {
        self.handle.try_recv()
    }
}

/// Interaction state plus the single in-flight run.
pub struct Controller {
    config: AppConfig,
    revealer: Box<dyn Reveal>,
    selected: Option<PathBuf>,
    trigger_enabled: bool,
    progress: u8,
    status: Status,
    /// Bumped on every start; events of older runs are dropped
    generation: u64,
}

impl Controller {
    /// Controller revealing output folders with the platform opener.
    pub fn new(config: AppConfig) -> Self {
        Self::with_revealer(config, Box::new(FolderOpener))
    }

    pub fn with_revealer(config: AppConfig, revealer: Box<dyn Reveal>) -> Self {
        Self {
            config,
            revealer,
            selected: None,
            trigger_enabled: true,
            progress: 0,
            status: Status::Idle,
            generation: 0,
        }
    }

    pub fn select_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!("Selected {}", path.display());
        self.selected = Some(path);
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    pub const fn trigger_enabled(&self) -> bool {
        self.trigger_enabled
    }

    pub const fn progress(&self) -> u8 {
        self.progress
    }

    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// Start one run on the selected file with an empty password.
    ///
    /// Returns `None` without starting anything when no file is selected
    /// (the status then asks for one) or while a run is still in flight.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Option<Run> {
        if !self.trigger_enabled {
            debug!("Run already in progress, ignoring start");
            return None;
        }
        let Some(source) = self.selected.clone() else {
            self.status = Status::NoFileSelected;
            return None;
        };

        self.trigger_enabled = false;
        self.progress = 0;
        self.status = Status::Working;
        self.generation += 1;
        info!("Starting run {} on {}", self.generation, source.display());

        let request = DecryptRequest::new(source)
            .with_marker(self.config.marker.clone())
            .with_compress(self.config.compress);

        Some(Run {
            generation: self.generation,
            handle: worker::spawn(request),
        })
    }

    /// Fold one worker event into the visible state.
    pub fn apply(&mut self, generation: u64, event: DecryptEvent) {
        if generation != self.generation || self.trigger_enabled {
            debug!("Dropping event from stale run {generation}");
            return;
        }

        match event {
            DecryptEvent::Progress(percent) => {
                self.progress = percent.min(100);
            }
            DecryptEvent::Finished(outcome) => {
                self.trigger_enabled = true;
                self.status = match outcome {
                    Outcome::Success { path } => {
                        if self.config.reveal_output {
                            self.reveal_folder_of(&path);
                        }
                        Status::Succeeded(path)
                    }
                    Outcome::Failure { message, .. } => Status::Failed(message),
                };
            }
        }
    }

    /// Apply every event of `run` until it finishes and return its outcome.
    ///
    /// `on_event` sees each event before it is applied.
    pub async fn drive(&mut self, mut run: Run, mut on_event: impl FnMut(&DecryptEvent)) -> Outcome {
        let generation = run.generation();

        while let Some(event) = run.next_event().await {
            on_event(&event);
            let finished = match &event {
                DecryptEvent::Finished(outcome) => Some(outcome.clone()),
                DecryptEvent::Progress(_) => None,
            };
            self.apply(generation, event);
            if let Some(outcome) = finished {
                return outcome;
            }
        }

        let outcome = Outcome::worker_lost();
        let event = DecryptEvent::Finished(outcome.clone());
        on_event(&event);
        self.apply(generation, event);
        outcome
    }

    fn reveal_folder_of(&self, path: &Path) {
        let folder = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        if let Err(e) = self.revealer.reveal(folder) {
            warn!("Could not open {}: {}", folder.display(), e);
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("selected", &self.selected)
            .field("trigger_enabled", &self.trigger_enabled)
            .field("progress", &self.progress)
            .field("status", &self.status)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
