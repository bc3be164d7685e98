//! Isolated source trees for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use devsync::config::DevSyncConfig;
use devsync::fswalk::IgnoreFilter;

pub const POLL_INTERVAL: Duration = Duration::from_millis(1500);

pub struct TestHarness {
    temp_dir: TempDir,
    /// Source tree root inside the temp dir.
    pub root: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("src");
        std::fs::create_dir_all(&root).expect("Failed to create source root");
        Self { temp_dir, root }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `content` at a root-relative path, creating parents.
    pub fn write(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        self.write(relative, content.as_bytes())
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.root.join(relative)).expect("Failed to remove file");
    }

    /// Rules that exclude `build/` without an ignore file in the tree.
    pub fn build_filter(&self) -> IgnoreFilter {
        IgnoreFilter::from_lines(&self.root, ["build/"])
    }

    /// Ignore rules as currently on disk.
    pub fn filter(&self) -> IgnoreFilter {
        IgnoreFilter::build(&self.root)
    }

    /// One uploadable file, one empty file, a hidden and an ignored
    /// subtree. Pair with [`TestHarness::build_filter`].
    pub fn with_example_tree(self) -> Self {
        self.write("a.txt", b"0123456789");
        self.write_text(".git/config", "[core]\n");
        self.write("build/out.bin", &[0u8; 16]);
        self.write("empty.txt", b"");
        self
    }

    /// Config pointing at this tree, polling every [`POLL_INTERVAL`].
    pub fn config(&self, timeout: Duration) -> DevSyncConfig {
        DevSyncConfig {
            root_dir: self.root.clone(),
            timeout_secs: timeout.as_secs(),
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            ..DevSyncConfig::default()
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
