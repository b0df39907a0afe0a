use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalized identifier of a script file, used as the script cache key.
///
/// Both `/` and `\` are treated as separators and rewritten to `/`. Repeated
/// separators collapse and `.` segments are dropped, so `"a/b.rhai"`,
/// `"a\\b.rhai"` and `"./a//b.rhai"` all name the same entry. `..` segments are
/// kept as-is; resolving them is the caller's job (the document root rejects
/// them before a path ever reaches the cache).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SourcePath(String);

impl SourcePath {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        let rooted = raw.starts_with(['/', '\\']);
        let segments: Vec<&str> = raw
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();

        let mut normalized = String::with_capacity(raw.len());
        if rooted {
            normalized.push('/');
        }
        normalized.push_str(&segments.join("/"));
        Self(normalized)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path suitable for opening the file on this platform.
    #[must_use]
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    /// Extension of the final segment, lower-cased, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.0)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourcePath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for SourcePath {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&Path> for SourcePath {
    fn from(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }
}

impl From<&PathBuf> for SourcePath {
    fn from(path: &PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<PathBuf> for SourcePath {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<&SourcePath> for SourcePath {
    fn from(path: &SourcePath) -> Self {
        path.clone()
    }
}
