//! Directory walking and the eligibility policy.
//!
//! Every entry found under the root is either handed on for classification
//! or skipped with a reason. Eligibility is an ordered pipeline of
//! predicates; the first one that rejects a path names the skip reason.

use crate::config::CompiledFilters;
use crate::file_category::Category;
use crate::file_organizer::{OrganizeError, OrganizeResult};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Why a discovered file is not organized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The file or one of its directories (below the root) is hidden.
    Hidden,
    /// The file already sits inside a category folder under the root.
    AlreadyOrganized,
    /// A configured exclusion rule matched.
    Excluded,
}

/// One item produced by a walk.
#[derive(Debug)]
pub enum Discovered {
    /// A file that should be classified and moved.
    Eligible(PathBuf),
    /// A file that stays where it is.
    Skipped { path: PathBuf, reason: Rejection },
    /// An entry that could not be read; the walk carries on.
    Failed(walkdir::Error),
}

/// Decides which files under a root get organized.
pub struct TraversalPolicy<'a> {
    root: PathBuf,
    include_hidden: bool,
    filters: &'a CompiledFilters,
}

impl<'a> TraversalPolicy<'a> {
    pub fn new(root: &Path, include_hidden: bool, filters: &'a CompiledFilters) -> Self {
        Self {
            root: root.to_path_buf(),
            include_hidden,
            filters,
        }
    }

    /// Walks the root, top level only unless `recursive`.
    ///
    /// Entries are visited in file-name order. Each directory is listed when
    /// the walk enters it, so files moved into category folders created
    /// after that point are not revisited. Directories themselves are never
    /// yielded and symlinks are not followed.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidTarget` before walking if the root does
    /// not exist or is not a directory.
    pub fn enumerate(
        &self,
        recursive: bool,
    ) -> OrganizeResult<impl Iterator<Item = Discovered> + '_> {
        if !self.root.is_dir() {
            return Err(OrganizeError::InvalidTarget {
                path: self.root.clone(),
            });
        }

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name();

        Ok(walker
            .into_iter()
            .filter_map(move |entry| self.inspect(entry)))
    }

    /// Runs the eligibility pipeline on a path relative to the root.
    pub fn check(&self, relative: &Path) -> Result<(), Rejection> {
        let pipeline: [(Rejection, &dyn Fn(&Path) -> bool); 3] = [
            (Rejection::Hidden, &|p: &Path| {
                !self.include_hidden && is_hidden(p)
            }),
            (Rejection::AlreadyOrganized, &is_already_organized),
            (Rejection::Excluded, &|p: &Path| self.filters.is_excluded(p)),
        ];

        match pipeline.iter().find(|(_, rejects)| rejects(relative)) {
            Some((reason, _)) => Err(*reason),
            None => Ok(()),
        }
    }

    fn inspect(&self, entry: walkdir::Result<DirEntry>) -> Option<Discovered> {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => return Some(Discovered::Failed(error)),
        };

        // A symlink to a directory counts as a directory.
        if entry.file_type().is_dir() || entry.path().is_dir() {
            return None;
        }

        let path = entry.into_path();
        let verdict = self.check(path.strip_prefix(&self.root).unwrap_or(&path));

        Some(match verdict {
            Ok(()) => Discovered::Eligible(path),
            Err(reason) => Discovered::Skipped { path, reason },
        })
    }
}

/// True if any component of `relative` starts with a dot.
pub fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// True if `relative` lies inside a category folder directly under the root.
///
/// Files at the top level are never considered organized, whatever their name.
pub fn is_already_organized(relative: &Path) -> bool {
    let mut components = relative.components();
    let first = components.next();
    if components.next().is_none() {
        return false;
    }

    match first {
        Some(Component::Normal(name)) => name
            .to_str()
            .and_then(Category::from_dir_name)
            .is_some(),
        _ => false,
    }
}
