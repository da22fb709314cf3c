/// File relocation into `root/Category/sub-folder/filename`.
///
/// This module ties the pieces together: it walks the root, classifies each
/// eligible file, picks a conflict-free destination, then moves the file (or
/// only reports the move in a dry run). Every file inspected produces exactly
/// one event for the caller's sink.
///
/// Failures are contained to the file they happen on. Only an invalid root
/// aborts a run.
use crate::config::CompiledFilters;
use crate::conflict::{ConflictResolver, is_occupied};
use crate::file_category::{Category, Classification, Classifier};
use crate::traversal::{Discovered, Rejection, TraversalPolicy};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during file organization operations.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The root is missing or is not a directory. Aborts the whole run.
    #[error("Target must be an existing directory: {}", path.display())]
    InvalidTarget { path: PathBuf },
    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to move a file to its destination.
    #[error("Failed to move {} to {}: {error}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
    /// The destination was taken after it was chosen.
    #[error("Destination appeared before the move: {}", path.display())]
    DestinationOccupied { path: PathBuf },
    /// A copy across devices failed and its copy at `to` could not be removed.
    #[error(
        "Failed to move {} to {}: {error}; the copy left at {} could not be removed: {cleanup}",
        from.display(),
        to.display(),
        to.display()
    )]
    LeftoverCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
        cleanup: io::Error,
    },
    /// A directory entry could not be read during the walk.
    #[error("Failed to read directory entry: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Flags for one run. The calling shell picks the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub recursive: bool,
    pub dry_run: bool,
    pub overwrite: bool,
    pub include_hidden: bool,
}

/// A move that happened, or would happen in a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub simulated: bool,
}

/// What happened to one inspected entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OrganizeEvent {
    SkippedHidden {
        source: PathBuf,
    },
    SkippedAlreadyOrganized {
        source: PathBuf,
    },
    SkippedExcluded {
        source: PathBuf,
    },
    Moved {
        source: PathBuf,
        destination: PathBuf,
        category: Category,
    },
    WouldMove {
        source: PathBuf,
        destination: PathBuf,
        category: Category,
    },
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        error: String,
    },
    WalkFailed {
        path: Option<PathBuf>,
        error: String,
    },
}

impl OrganizeEvent {
    /// The event kind as it appears in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SkippedHidden { .. } => "skipped-hidden",
            Self::SkippedAlreadyOrganized { .. } => "skipped-already-organized",
            Self::SkippedExcluded { .. } => "skipped-excluded",
            Self::Moved { .. } => "moved",
            Self::WouldMove { .. } => "would-move",
            Self::MoveFailed { .. } => "move-failed",
            Self::WalkFailed { .. } => "walk-failed",
        }
    }

    /// The file this event is about, if known.
    pub fn source(&self) -> Option<&Path> {
        match self {
            Self::SkippedHidden { source }
            | Self::SkippedAlreadyOrganized { source }
            | Self::SkippedExcluded { source }
            | Self::Moved { source, .. }
            | Self::WouldMove { source, .. }
            | Self::MoveFailed { source, .. } => Some(source),
            Self::WalkFailed { path, .. } => path.as_deref(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::MoveFailed { .. } | Self::WalkFailed { .. })
    }
}

/// Receives one event per inspected entry, in walk order.
pub trait EventSink {
    fn record(&mut self, event: OrganizeEvent);
}

impl EventSink for Vec<OrganizeEvent> {
    fn record(&mut self, event: OrganizeEvent) {
        self.push(event);
    }
}

/// Totals for one run plus the move records it produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub records: Vec<MoveRecord>,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Files actually moved.
    pub fn moved(&self) -> usize {
        self.records.iter().filter(|r| !r.simulated).count()
    }

    /// Files a dry run would have moved.
    pub fn simulated(&self) -> usize {
        self.records.iter().filter(|r| r.simulated).count()
    }

    /// True if no file failed.
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Organizes a directory tree into category folders.
pub struct Relocator {
    classifier: Classifier,
    filters: CompiledFilters,
}

impl Relocator {
    pub fn new(classifier: Classifier, filters: CompiledFilters) -> Self {
        Self {
            classifier,
            filters,
        }
    }

    /// Runs one organization pass over `root`.
    ///
    /// Each eligible file is classified and sent to
    /// `root/Category/sub-folder/filename`, renamed to `name (N).ext` if that
    /// is taken and `overwrite` is off. In a dry run nothing on disk changes.
    ///
    /// # Errors
    ///
    /// Only `OrganizeError::InvalidTarget`, raised before anything is
    /// inspected. Per-file problems become `move-failed` or `walk-failed`
    /// events and the run carries on.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortdir::file_organizer::{OrganizeEvent, Relocator, RunOptions};
    /// use std::path::Path;
    ///
    /// let relocator = Relocator::default();
    /// let options = RunOptions {
    ///     recursive: true,
    ///     dry_run: true,
    ///     overwrite: false,
    ///     include_hidden: false,
    /// };
    /// let mut events: Vec<OrganizeEvent> = Vec::new();
    /// let summary = relocator.run(Path::new("/path/to/downloads"), &options, &mut events)?;
    /// println!("{} files would move", summary.simulated());
    /// # Ok::<(), sortdir::file_organizer::OrganizeError>(())
    /// ```
    pub fn run(
        &self,
        root: &Path,
        options: &RunOptions,
        sink: &mut dyn EventSink,
    ) -> OrganizeResult<RunSummary> {
        let policy = TraversalPolicy::new(root, options.include_hidden, &self.filters);
        let candidates = policy.enumerate(options.recursive)?;

        info!(
            root = %root.display(),
            recursive = options.recursive,
            dry_run = options.dry_run,
            "organizing directory"
        );

        let mut summary = RunSummary::default();
        // Destinations claimed so far in a dry run, since nothing lands on disk.
        let mut reserved: HashSet<PathBuf> = HashSet::new();

        for item in candidates {
            let event = match item {
                Discovered::Eligible(source) => {
                    self.relocate(root, source, options, &mut reserved, &mut summary)
                }
                Discovered::Skipped { path, reason } => {
                    debug!(path = %path.display(), ?reason, "skipping");
                    summary.skipped += 1;
                    match reason {
                        Rejection::Hidden => OrganizeEvent::SkippedHidden { source: path },
                        Rejection::AlreadyOrganized => {
                            OrganizeEvent::SkippedAlreadyOrganized { source: path }
                        }
                        Rejection::Excluded => OrganizeEvent::SkippedExcluded { source: path },
                    }
                }
                Discovered::Failed(error) => {
                    let path = error.path().map(Path::to_path_buf);
                    let error = OrganizeError::from(error);
                    warn!("{}", error);
                    summary.failed += 1;
                    OrganizeEvent::WalkFailed {
                        path,
                        error: error.to_string(),
                    }
                }
            };
            sink.record(event);
        }

        info!(
            moved = summary.moved(),
            simulated = summary.simulated(),
            skipped = summary.skipped,
            failed = summary.failed,
            "organization finished"
        );
        Ok(summary)
    }

    fn relocate(
        &self,
        root: &Path,
        source: PathBuf,
        options: &RunOptions,
        reserved: &mut HashSet<PathBuf>,
        summary: &mut RunSummary,
    ) -> OrganizeEvent {
        let classification = self.classifier.classify(&source);
        debug!(
            path = %source.display(),
            category = %classification.category,
            sub_folder = %classification.sub_folder,
            "classified"
        );

        let desired = match planned_destination(root, &source, &classification) {
            Ok(desired) => desired,
            Err(e) => return Self::failed(source, root.to_path_buf(), e, summary),
        };

        if options.dry_run {
            let destination =
                ConflictResolver::resolve_reserved(&desired, options.overwrite, reserved);
            reserved.insert(destination.clone());
            summary.records.push(MoveRecord {
                source: source.clone(),
                destination: destination.clone(),
                simulated: true,
            });
            return OrganizeEvent::WouldMove {
                source,
                destination,
                category: classification.category,
            };
        }

        let destination = ConflictResolver::resolve(&desired, options.overwrite);
        match move_file(&source, &destination, options.overwrite) {
            Ok(()) => {
                info!(from = %source.display(), to = %destination.display(), "moved");
                summary.records.push(MoveRecord {
                    source: source.clone(),
                    destination: destination.clone(),
                    simulated: false,
                });
                OrganizeEvent::Moved {
                    source,
                    destination,
                    category: classification.category,
                }
            }
            Err(e) => Self::failed(source, destination, e, summary),
        }
    }

    fn failed(
        source: PathBuf,
        destination: PathBuf,
        error: OrganizeError,
        summary: &mut RunSummary,
    ) -> OrganizeEvent {
        warn!("{}", error);
        summary.failed += 1;
        OrganizeEvent::MoveFailed {
            source,
            destination,
            error: error.to_string(),
        }
    }
}

impl Default for Relocator {
    fn default() -> Self {
        Self::new(Classifier::default(), CompiledFilters::default())
    }
}

/// `root/Category/sub-folder/filename`, before conflict resolution.
pub fn planned_destination(
    root: &Path,
    source: &Path,
    classification: &Classification,
) -> OrganizeResult<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| OrganizeError::FileMoveFailure {
            from: source.to_path_buf(),
            to: root.to_path_buf(),
            error: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
        })?;

    Ok(root
        .join(classification.category.dir_name())
        .join(&classification.sub_folder)
        .join(file_name))
}

/// Moves `source` to `destination`, creating parent directories as needed.
///
/// Falls back to copy-then-delete when a rename would cross devices. Without
/// `overwrite`, refuses to replace anything that appeared at `destination`
/// after it was chosen.
fn move_file(source: &Path, destination: &Path, overwrite: bool) -> OrganizeResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    if !overwrite && is_occupied(destination) {
        return Err(OrganizeError::DestinationOccupied {
            path: destination.to_path_buf(),
        });
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %source.display(), "rename crosses devices, copying instead");
            copy_then_remove(source, destination, |from, to| fs::copy(from, to))
        }
        Err(error) => Err(OrganizeError::FileMoveFailure {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            error,
        }),
    }
}

/// Copies `source` to `destination` with `copy`, then removes `source`.
///
/// If either step fails, whatever reached `destination` is removed so the
/// original is the only copy left. A removal that fails too is logged and
/// reported as `LeftoverCopy`.
fn copy_then_remove(
    source: &Path,
    destination: &Path,
    copy: impl FnOnce(&Path, &Path) -> io::Result<u64>,
) -> OrganizeResult<()> {
    let Err(error) = copy(source, destination).and_then(|_| fs::remove_file(source)) else {
        return Ok(());
    };

    match fs::remove_file(destination) {
        Ok(()) => {}
        Err(cleanup) if cleanup.kind() == io::ErrorKind::NotFound => {}
        Err(cleanup) => {
            warn!(
                from = %source.display(),
                to = %destination.display(),
                "could not remove partial copy: {}",
                cleanup
            );
            return Err(OrganizeError::LeftoverCopy {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                error,
                cleanup,
            });
        }
    }

    Err(OrganizeError::FileMoveFailure {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        error,
    })
}
