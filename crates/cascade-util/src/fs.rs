use std::path::{Path, PathBuf};

/// An ordered list of directories searched when resolving `` `include`` paths
/// and input files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludePath {
    dirs: Vec<PathBuf>,
}

impl IncludePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a colon-separated list of directories (`a:b:c`). Empty entries are skipped.
    pub fn from_colon_list(list: &str) -> Self {
        let dirs = list
            .split(':')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        Self { dirs }
    }

    /// Append a directory to the end of the search order, ignoring duplicates.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }

    /// Append every directory of `other` that is not already present.
    pub fn extend(&mut self, other: &IncludePath) {
        for dir in &other.dirs {
            self.push(dir.clone());
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Resolve `path` to an existing file.
    ///
    /// Absolute paths are returned as-is when they exist. Relative paths are
    /// tried against `relative_to` first (usually the directory of the file
    /// containing the include), then the current directory, then each search
    /// directory in order.
    pub fn resolve(&self, path: &str, relative_to: Option<&Path>) -> Option<PathBuf> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        if let Some(base) = relative_to {
            let joined = base.join(candidate);
            if joined.is_file() {
                return Some(joined);
            }
        }
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(candidate))
            .find(|p| p.is_file())
    }
}

/// Read a file to a string, attaching the path to any I/O error.
pub fn read_source(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))
    })
}
