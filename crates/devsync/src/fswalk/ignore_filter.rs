//! Gitignore-based path exclusion for a synchronization root.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// File name of the rules file looked up at the root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Compiled, read-only set of exclusion rules for one root directory.
///
/// Construction never fails: a missing or broken rules file yields a
/// filter that matches nothing.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    matcher: Gitignore,
}

impl IgnoreFilter {
    /// Loads `.gitignore` from `root`, falling back to no rules.
    pub fn build(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let ignore_file = root.join(IGNORE_FILE_NAME);

        if !ignore_file.is_file() {
            return Self::empty();
        }

        match compile(root, &ignore_file) {
            Ok(matcher) => {
                log::debug!(
                    "Loaded {} ignore rules from {}",
                    matcher.num_ignores() + matcher.num_whitelists(),
                    ignore_file.display()
                );
                Self { matcher }
            }
            Err(message) => {
                log::warn!(
                    "Couldn't parse {}, ignoring nothing: {}",
                    ignore_file.display(),
                    message
                );
                Self::empty()
            }
        }
    }

    /// Compiles rules from in-memory lines, relative to `root`.
    pub fn from_lines<I, S>(root: impl AsRef<Path>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new(root.as_ref());
        for line in lines {
            if let Err(e) = builder.add_line(None, line.as_ref()) {
                log::warn!("Invalid ignore rule '{}', ignoring nothing: {}", line.as_ref(), e);
                return Self::empty();
            }
        }
        match builder.build() {
            Ok(matcher) => Self { matcher },
            Err(_) => Self::empty(),
        }
    }

    /// A pass-through filter.
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }

    /// True if the filter holds no rules at all.
    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    /// The directory the rules are anchored at.
    pub fn root(&self) -> &Path {
        self.matcher.path()
    }

    /// Whether `path` (absolute under the root, or root-relative) is excluded.
    ///
    /// A path is excluded when it, or any of its parent directories, matches
    /// an ignore rule. Absolute paths outside the root never match.
    pub fn matches(&self, path: impl AsRef<Path>, is_dir: bool) -> bool {
        if self.matcher.is_empty() {
            return false;
        }

        let path = path.as_ref();
        let relative = self.relative(path);
        if relative.has_root() || relative.as_os_str().is_empty() {
            return false;
        }

        self.matcher
            .matched_path_or_any_parents(&relative, is_dir)
            .is_ignore()
    }

    fn relative(&self, path: &Path) -> PathBuf {
        let path = path.strip_prefix("./").unwrap_or(path);
        let root = self.matcher.path();
        let root = root.strip_prefix("./").unwrap_or(root);
        if root.as_os_str().is_empty() || root == Path::new(".") {
            return path.to_path_buf();
        }
        path.strip_prefix(root).unwrap_or(path).to_path_buf()
    }
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::empty()
    }
}

fn compile(root: &Path, ignore_file: &Path) -> Result<Gitignore, String> {
    let mut builder = GitignoreBuilder::new(root);
    if let Some(err) = builder.add(ignore_file) {
        return Err(err.to_string());
    }
    builder.build().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_matches_nothing() {
        let dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::build(dir.path());
        assert!(filter.is_empty());
        assert!(!filter.matches(dir.path().join("anything.txt"), false));
    }

    #[test]
    fn test_broken_file_matches_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n[unclosed\n").unwrap();

        let filter = IgnoreFilter::build(dir.path());
        assert!(filter.is_empty());
        assert!(!filter.matches(dir.path().join("debug.log"), false));
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\nbuild/\n").unwrap();
        let filter = IgnoreFilter::build(dir.path());

        assert!(filter.matches(dir.path().join("debug.log"), false));
        assert!(filter.matches("debug.log", false));
        assert!(filter.matches(dir.path().join("build"), true));
        assert!(filter.matches("build", true));
        assert!(!filter.matches("src/main.rs", false));
    }

    #[test]
    fn test_files_under_ignored_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "build/\n").unwrap();
        let filter = IgnoreFilter::build(dir.path());

        assert!(filter.matches(dir.path().join("build/out.bin"), false));
        assert!(!filter.matches(dir.path().join("builder.rs"), false));
    }

    #[test]
    fn test_negation() {
        let filter = IgnoreFilter::from_lines("/repo", ["*.yaml", "!keep.yaml"]);
        assert!(filter.matches("/repo/drop.yaml", false));
        assert!(!filter.matches("/repo/keep.yaml", false));
    }

    #[test]
    fn test_path_outside_root_never_matches() {
        let filter = IgnoreFilter::from_lines("/repo", ["*.log"]);
        assert!(!filter.matches("/elsewhere/debug.log", false));
    }

    #[test]
    fn test_relative_root() {
        let filter = IgnoreFilter::from_lines(".", ["target/"]);
        assert!(filter.matches("./target", true));
        assert!(filter.matches("target/debug/app", false));
        assert!(!filter.matches("./src", true));
    }
}
