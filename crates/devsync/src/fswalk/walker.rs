//! Recursive directory traversal shared by the synchronizer and the watcher.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use super::ignore_filter::IgnoreFilter;

#[derive(Error, Debug)]
#[error("Error walking directory '{path}': {source}")]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// What the visitor wants after seeing an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    Continue,
    /// Do not descend into this directory. Ignored for files.
    SkipSubtree,
}

/// One surviving entry of a walk.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    path: PathBuf,
    is_dir: bool,
    depth: usize,
    len: u64,
    ignored: bool,
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// 0 for the root itself.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// File size in bytes, 0 for directories.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A file matched by the ignore rules. Only yielded by walkers built
    /// with [`PathWalker::with_ignored_files`].
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }
}

/// True for entries named with a leading dot.
pub fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Pre-order, depth-first walker with hidden-directory and ignore pruning.
pub struct PathWalker<'a> {
    root: PathBuf,
    filter: &'a IgnoreFilter,
    yield_ignored_files: bool,
}

impl<'a> PathWalker<'a> {
    pub fn new(root: impl Into<PathBuf>, filter: &'a IgnoreFilter) -> Self {
        Self {
            root: root.into(),
            filter,
            yield_ignored_files: false,
        }
    }

    /// Yields ignored files flagged with [`WalkEntry::is_ignored`] instead
    /// of dropping them. Ignored directories are still pruned.
    pub fn with_ignored_files(mut self) -> Self {
        self.yield_ignored_files = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Iterator over the surviving entries, root first.
    pub fn entries(&self) -> Walk<'a> {
        Walk {
            inner: WalkDir::new(&self.root).sort_by_file_name().into_iter(),
            filter: self.filter,
            yield_ignored_files: self.yield_ignored_files,
        }
    }

    /// Calls `visit` for every surviving entry until the walk ends or errors.
    pub fn walk<F>(&self, mut visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&Path, bool) -> WalkAction,
    {
        let mut walk = self.entries();
        while let Some(entry) = walk.next() {
            let entry = entry?;
            if visit(entry.path(), entry.is_dir()) == WalkAction::SkipSubtree && entry.is_dir() {
                walk.skip_subtree();
            }
        }
        Ok(())
    }
}

/// Iterator returned by [`PathWalker::entries`].
pub struct Walk<'a> {
    inner: walkdir::IntoIter,
    filter: &'a IgnoreFilter,
    yield_ignored_files: bool,
}

impl Walk<'_> {
    /// Stops descending into the directory yielded last.
    pub fn skip_subtree(&mut self) {
        self.inner.skip_current_dir();
    }
}

impl Iterator for Walk<'_> {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    return Some(Err(WalkError { path, source }));
                }
            };

            let is_dir = entry.file_type().is_dir();

            // The root is always visited.
            if entry.depth() > 0 {
                if is_dir && is_hidden_name(entry.file_name()) {
                    self.inner.skip_current_dir();
                    continue;
                }
                if self.filter.matches(entry.path(), is_dir) {
                    if is_dir {
                        self.inner.skip_current_dir();
                        continue;
                    }
                    if !self.yield_ignored_files {
                        continue;
                    }
                    let depth = entry.depth();
                    return Some(Ok(WalkEntry {
                        path: entry.into_path(),
                        is_dir,
                        depth,
                        len: 0,
                        ignored: true,
                    }));
                }
            }

            let len = if is_dir {
                0
            } else {
                match entry.metadata() {
                    Ok(meta) => meta.len(),
                    Err(source) => {
                        return Some(Err(WalkError {
                            path: entry.path().to_path_buf(),
                            source,
                        }))
                    }
                }
            };

            let depth = entry.depth();
            return Some(Ok(WalkEntry {
                path: entry.into_path(),
                is_dir,
                depth,
                len,
                ignored: false,
            }));
        }
    }
}

/// Root-relative object key with `/` separators, `None` for the root itself.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
