//! sortdir - sort a directory into Category/extension folders
//!
//! This library classifies files by extension (with a content-type fallback),
//! walks a directory tree while skipping hidden and already organized files,
//! picks conflict-free destination names, and moves files into
//! `root/Category/extension/` folders, or only reports the moves in a dry run.

pub mod cli;
pub mod config;
pub mod conflict;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod traversal;

pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use conflict::ConflictResolver;
pub use file_category::{Category, Classification, Classifier, ContentTypeOracle, ExtensionTable};
pub use file_organizer::{
    EventSink, MoveRecord, OrganizeError, OrganizeEvent, Relocator, RunOptions, RunSummary,
};
pub use traversal::TraversalPolicy;

pub use cli::{Cli, run_cli};
