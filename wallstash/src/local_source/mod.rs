//! Local-source lookup.
//!
//! Before going to the network the coordinator asks a
//! [`LocalSourceResolver`] whether a full-quality copy of the item already
//! sits somewhere on disk, typically in a third-party client's sync folder
//! (`{root}/{reference}/...`).
//!
//! Whether a file is "full quality" is decided purely by size: files at or
//! below [`DEFAULT_MIN_QUALITY_BYTES`] are assumed to be previews. This is
//! an approximation, nothing in the source folders marks a file as a
//! preview, so the threshold is configurable.

pub mod detection;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use detection::{steam_roots, workshop_content_dirs, WALLPAPER_ENGINE_APP_ID};

/// Files at or below this size are treated as previews (2 MB).
pub const DEFAULT_MIN_QUALITY_BYTES: u64 = 2_000_000;

/// Media extensions a local candidate may have (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "heic", "mp4", "webm", "mov",
];

/// A file outside the cache that may be imported instead of downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCandidate {
    /// Absolute path of the candidate.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// Looks for an existing local copy of a reference.
///
/// Implementations are synchronous and may block on the filesystem; the
/// coordinator calls them from a blocking task. Errors are never raised:
/// anything that goes wrong is logged and reported as "no candidate".
pub trait LocalSourceResolver: Send + Sync {
    fn find_local_candidate(&self, reference: &str) -> Option<LocalCandidate>;
}

/// Resolver that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalSource;

impl LocalSourceResolver for NoLocalSource {
    fn find_local_candidate(&self, _reference: &str) -> Option<LocalCandidate> {
        None
    }
}

/// Probes `{root}/{reference}/` under a list of root directories.
///
/// Roots are searched in order; the first root containing a qualifying file
/// wins. Within a root the largest supported file is chosen.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    roots: Vec<PathBuf>,
    min_quality_bytes: u64,
}

impl DirectoryResolver {
    /// Create a resolver over `roots` with the default quality threshold.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            min_quality_bytes: DEFAULT_MIN_QUALITY_BYTES,
        }
    }

    /// Resolver over every detected Steam Workshop content folder for `app_id`.
    pub fn for_workshop(app_id: &str) -> Self {
        Self::new(workshop_content_dirs(app_id))
    }

    /// Set the size a candidate must exceed to count as full quality.
    pub fn with_min_quality_bytes(mut self, bytes: u64) -> Self {
        self.min_quality_bytes = bytes;
        self
    }

    /// Add another root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Configured root directories.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Configured quality threshold.
    pub fn min_quality_bytes(&self) -> u64 {
        self.min_quality_bytes
    }

    /// Best candidate inside one item directory.
    fn best_in(&self, dir: &Path) -> io::Result<Option<LocalCandidate>> {
        let mut candidates = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !has_supported_extension(&path) {
                continue;
            }
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                candidates.push(LocalCandidate {
                    path,
                    size_bytes: metadata.len(),
                });
            }
        }

        candidates.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.path.cmp(&b.path)));

        let best = candidates.into_iter().next();
        match best {
            Some(candidate) if candidate.size_bytes > self.min_quality_bytes => Ok(Some(candidate)),
            Some(candidate) => {
                debug!(
                    path = %candidate.path.display(),
                    size = candidate.size_bytes,
                    threshold = self.min_quality_bytes,
                    "Only a preview is available locally"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl LocalSourceResolver for DirectoryResolver {
    fn find_local_candidate(&self, reference: &str) -> Option<LocalCandidate> {
        if !is_safe_component(reference) {
            return None;
        }

        for root in &self.roots {
            let dir = root.join(reference);
            if !dir.is_dir() {
                continue;
            }
            match self.best_in(&dir) {
                Ok(Some(candidate)) => {
                    debug!(
                        reference = %reference,
                        path = %candidate.path.display(),
                        size = candidate.size_bytes,
                        "Found local candidate"
                    );
                    return Some(candidate);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Local source scan failed");
                }
            }
        }
        None
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// A reference must name exactly one directory below a root.
fn is_safe_component(reference: &str) -> bool {
    !reference.is_empty()
        && reference != "."
        && reference != ".."
        && !reference.contains(['/', '\\'])
}
