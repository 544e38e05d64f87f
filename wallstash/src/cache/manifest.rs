//! Durable index of completed downloads.
//!
//! The manifest maps a content reference to the absolute path of its cached
//! artifact. It is a derived index: the artifact directory is the ground truth
//! and the manifest must tolerate being rebuilt from a scan at any time.
//!
//! # Format
//!
//! A flat JSON object of `reference -> absolute path` strings:
//!
//! ```json
//! { "42": "/home/me/.wallstash/cache/full/42_Sunset.png" }
//! ```
//!
//! Values that are not strings are ignored so newer writers can add metadata
//! without breaking older readers. An unreadable or corrupt file loads as an
//! empty manifest.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::CacheError;

/// Default manifest filename inside the cache root.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// In-memory view of the persisted manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

impl Manifest {
    /// Create an empty manifest that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the manifest from `path`.
    ///
    /// Never fails: a missing file is a fresh cache, and a corrupt one is
    /// logged and treated as empty.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No manifest yet, starting empty");
                return Self::empty(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Manifest unreadable, starting empty");
                return Self::empty(path);
            }
        };

        let entries = match Self::decode(&bytes) {
            Some(entries) => entries,
            None => {
                warn!(path = %path.display(), "Manifest corrupt, starting empty");
                BTreeMap::new()
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "Loaded manifest");
        Self { path, entries }
    }

    /// Decode manifest bytes, skipping values that are not path strings.
    fn decode(bytes: &[u8]) -> Option<BTreeMap<String, PathBuf>> {
        let object: Map<String, Value> = serde_json::from_slice(bytes).ok()?;
        Some(
            object
                .into_iter()
                .filter_map(|(reference, value)| match value {
                    Value::String(path) if !path.is_empty() => {
                        Some((reference, PathBuf::from(path)))
                    }
                    _ => None,
                })
                .collect(),
        )
    }

    /// Persist the manifest.
    ///
    /// Writes to a sibling temp file and renames it over the manifest so a
    /// crash mid-write never leaves a truncated index behind.
    pub async fn save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(parent, e))?;
        }

        let object: Map<String, Value> = self
            .entries
            .iter()
            .map(|(reference, path)| {
                (
                    reference.clone(),
                    Value::String(path.to_string_lossy().into_owned()),
                )
            })
            .collect();
        let bytes = serde_json::to_vec_pretty(&object)
            .map_err(|e| CacheError::Manifest(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, bytes)
            .await
            .map_err(|e| CacheError::io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "Saved manifest");
        Ok(())
    }

    /// Path the manifest persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the recorded path for a reference.
    pub fn get(&self, reference: &str) -> Option<&Path> {
        self.entries.get(reference).map(PathBuf::as_path)
    }

    /// Record a path for a reference, returning the previous one.
    pub fn insert(&mut self, reference: impl Into<String>, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.entries.insert(reference.into(), path.into())
    }

    /// Forget a reference, returning its recorded path.
    pub fn remove(&mut self, reference: &str) -> Option<PathBuf> {
        self.entries.remove(reference)
    }

    /// Find the reference that owns `path`, if any.
    pub fn reference_for(&self, path: &Path) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, p)| p.as_path() == path)
            .map(|(reference, _)| reference.as_str())
    }

    /// Iterate over all entries in reference order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(reference, path)| (reference.as_str(), path.as_path()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
