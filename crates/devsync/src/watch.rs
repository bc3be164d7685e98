//! Watching the source tree for changes worth a resync.
//!
//! Directories are registered one by one (non-recursively) so that hidden
//! and ignored subtrees never generate events in the first place.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};

use crate::error::WatchError;
use crate::fswalk::{is_hidden_name, IgnoreFilter, PathWalker};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// How often the event loop checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Directories under `root` that survive hidden/ignore pruning, root first.
pub fn watch_dirs(root: &Path, filter: &IgnoreFilter) -> Result<Vec<PathBuf>, WatchError> {
    let mut dirs = Vec::new();
    for entry in PathWalker::new(root, filter).entries() {
        let entry = entry?;
        if entry.is_dir() {
            dirs.push(entry.path().to_path_buf());
        }
    }
    Ok(dirs)
}

/// Adds every surviving directory to `watcher`. Returns how many were added.
pub fn register_watch_dirs<W>(watcher: &mut W, root: &Path, filter: &IgnoreFilter) -> Result<usize, WatchError>
where
    W: Watcher + ?Sized,
{
    let dirs = watch_dirs(root, filter)?;
    for dir in &dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Register {
                path: dir.clone(),
                message: e.to_string(),
            })?;
        debug!("Watching {}", dir.display());
    }
    Ok(dirs.len())
}

/// Registers a directory that appeared under `root` after watching began.
///
/// Hidden or ignored directories, and anything beneath them, are skipped
/// and count as zero registrations.
pub fn watch_subtree<W>(
    watcher: &mut W,
    root: &Path,
    dir: &Path,
    filter: &IgnoreFilter,
) -> Result<usize, WatchError>
where
    W: Watcher + ?Sized,
{
    if !is_relevant_change(root, filter, dir) {
        return Ok(0);
    }
    register_watch_dirs(watcher, dir, filter)
}

/// Whether a change at `path` should trigger a resync.
///
/// Changes inside hidden directories, to hidden directories themselves, to
/// ignored paths, or outside `root` are irrelevant. Hidden *files* are
/// relevant since they are synced.
pub fn is_relevant_change(root: &Path, filter: &IgnoreFilter, path: &Path) -> bool {
    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative,
        Err(_) => return false,
    };

    let is_dir = path.is_dir();
    let mut components: Vec<Component<'_>> = relative.components().collect();
    if !is_dir {
        components.pop();
    }
    if components
        .iter()
        .any(|c| matches!(c, Component::Normal(name) if is_hidden_name(name)))
    {
        return false;
    }

    !filter.matches(path, is_dir)
}

/// De-duplicated, sorted relevant paths from one debounced batch.
pub fn relevant_paths<I>(root: &Path, filter: &IgnoreFilter, paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    paths
        .into_iter()
        .filter(|p| is_relevant_change(root, filter, p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Debounced watcher over a source tree.
pub struct SourceWatcher {
    root: PathBuf,
    debounce: Duration,
    shutdown: Arc<AtomicBool>,
}

impl SourceWatcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_debounce(root, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            root: root.into(),
            debounce,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Flag that stops [`SourceWatcher::watch`] when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Blocks, calling `on_change` with each non-empty batch of relevant
    /// paths, until the shutdown flag is set.
    ///
    /// Directories created while watching are registered as they appear.
    pub fn watch<F>(&self, filter: &IgnoreFilter, mut on_change: F) -> Result<(), WatchError>
    where
        F: FnMut(Vec<PathBuf>),
    {
        let (tx, rx) = std::sync::mpsc::channel::<DebounceEventResult>();

        let mut debouncer: Debouncer<RecommendedWatcher> =
            new_debouncer(self.debounce, tx).map_err(|e| WatchError::CreateWatcher(e.to_string()))?;

        let registered = register_watch_dirs(debouncer.watcher(), &self.root, filter)?;
        info!(
            "Watching {} ({} directories)",
            self.root.display(),
            registered
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            match rx.recv_timeout(SHUTDOWN_POLL) {
                Ok(Ok(events)) => {
                    let changed = relevant_paths(
                        &self.root,
                        filter,
                        events.into_iter().map(|event| event.path),
                    );
                    if changed.is_empty() {
                        continue;
                    }

                    for dir in changed.iter().filter(|p| p.is_dir()) {
                        if let Err(e) = watch_subtree(debouncer.watcher(), &self.root, dir, filter) {
                            error!("Failed to watch new directory {}: {}", dir.display(), e);
                        }
                    }

                    on_change(changed);
                }
                Ok(Err(e)) => {
                    error!("Watch error: {}", e);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("Stopped watching {}", self.root.display());
        Ok(())
    }
}
