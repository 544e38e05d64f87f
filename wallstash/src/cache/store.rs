//! Filesystem-backed cache store.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tempfile::TempPath;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use super::manifest::{Manifest, MANIFEST_FILENAME};
use super::naming::{cache_filename, normalize_extension, parse_filename};
use super::{CacheEntry, CacheError, CacheStats, ClearResult};

/// Subdirectory holding full-quality artifacts.
pub const ARTIFACT_DIR: &str = "full";

/// Subdirectory holding files that are not yet part of the cache.
pub const STAGING_DIR: &str = ".staging";

/// Durable directory of completed downloads plus its manifest.
///
/// All mutation for a single reference is serialized through a per-reference
/// lock, so a `store` and a `delete` for the same reference never interleave.
/// Different references proceed independently and only meet briefly on the
/// manifest lock.
///
/// # Example
///
/// ```ignore
/// use wallstash::cache::CacheStore;
///
/// let store = CacheStore::open("/home/me/.wallstash/cache").await?;
/// let path = store.store("42", &downloaded_tmp, "Sunset").await?;
/// assert_eq!(store.lookup("42").await, Some(path));
/// ```
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    artifact_dir: PathBuf,
    staging_dir: PathBuf,
    manifest: tokio::sync::Mutex<Manifest>,
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Cached `total_size()` result, cleared on every mutation.
    size_cache: Mutex<Option<u64>>,
    /// Bumped on every mutation; a scan only caches its total if this did
    /// not move while it ran.
    generation: AtomicU64,
}

/// Holds the per-reference lock; drops the map entry once nobody else wants it.
struct ReferenceGuard<'a> {
    locks: &'a DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    reference: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ReferenceGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.reference, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl CacheStore {
    /// Open (or create) a cache rooted at `root`.
    ///
    /// Loads the manifest and reconciles it with the artifact directory, so
    /// files left behind by a lost manifest are picked up again and entries
    /// whose files vanished are dropped.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        let artifact_dir = root.join(ARTIFACT_DIR);
        let staging_dir = root.join(STAGING_DIR);

        for dir in [&artifact_dir, &staging_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::io(dir, e))?;
        }

        let manifest = Manifest::load(root.join(MANIFEST_FILENAME)).await;

        let store = Self {
            root,
            artifact_dir,
            staging_dir,
            manifest: tokio::sync::Mutex::new(manifest),
            locks: DashMap::new(),
            size_cache: Mutex::new(None),
            generation: AtomicU64::new(0),
        };

        let changes = store.reconcile().await?;
        info!(
            root = %store.root.display(),
            changes,
            "Opened cache store"
        );

        Ok(store)
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding full-quality artifacts.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Directory for partial files.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Path of the persisted manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    /// Bring the manifest in line with the artifact directory.
    ///
    /// Returns the number of entries added or dropped.
    pub async fn reconcile(&self) -> Result<usize, CacheError> {
        let files = self.scan_artifacts().await?;
        let mut manifest = self.manifest.lock().await;
        let mut changes = 0;

        let stale: Vec<String> = manifest
            .iter()
            .filter(|(_, path)| !files.iter().any(|(file, _)| file.as_path() == *path))
            .map(|(reference, _)| reference.to_string())
            .collect();
        for reference in stale {
            debug!(reference = %reference, "Dropping manifest entry without a file");
            manifest.remove(&reference);
            changes += 1;
        }

        for (path, _) in &files {
            if manifest.reference_for(path).is_some() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let parsed = parse_filename(name);
            if manifest.get(&parsed.reference).is_some() {
                // The manifest already points this reference at another file
                continue;
            }
            debug!(
                reference = %parsed.reference,
                path = %path.display(),
                "Recovered cache entry from directory scan"
            );
            manifest.insert(parsed.reference, path.clone());
            changes += 1;
        }

        if changes > 0 {
            manifest.save().await?;
        }
        self.invalidate_size();

        Ok(changes)
    }

    /// Return the cached path for `reference` if its file still exists.
    ///
    /// A manifest entry pointing at a missing file is removed and the manifest
    /// persisted again (self-heal).
    pub async fn lookup(&self, reference: &str) -> Option<PathBuf> {
        let _guard = self.lock_reference(reference).await;

        let mut manifest = self.manifest.lock().await;
        let path = manifest.get(reference)?.to_path_buf();

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }

        warn!(
            reference = %reference,
            path = %path.display(),
            "Cached file vanished, dropping manifest entry"
        );
        manifest.remove(reference);
        if let Err(e) = manifest.save().await {
            warn!(error = %e, "Failed to persist manifest after self-heal");
        }
        self.invalidate_size();
        None
    }

    /// Move a finished file into the cache and record it.
    ///
    /// The artifact is named `{reference}_{display_name}.{ext}`, with the
    /// extension taken from `temp_file`. Any earlier artifact for the same
    /// reference is replaced.
    pub async fn store(
        &self,
        reference: &str,
        temp_file: &Path,
        display_name: &str,
    ) -> Result<PathBuf, CacheError> {
        let extension = temp_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.store_as(reference, temp_file, display_name, extension)
            .await
    }

    /// Like [`store`](Self::store), with the extension given explicitly.
    ///
    /// Used when the file type is only known after the transfer, e.g. from a
    /// `Content-Type` header.
    pub async fn store_as(
        &self,
        reference: &str,
        temp_file: &Path,
        display_name: &str,
        extension: &str,
    ) -> Result<PathBuf, CacheError> {
        let _guard = self.lock_reference(reference).await;

        if !tokio::fs::try_exists(temp_file).await.unwrap_or(false) {
            return Err(CacheError::MissingFile(temp_file.to_path_buf()));
        }

        let extension = normalize_extension(extension);
        let mut manifest = self.manifest.lock().await;
        let mut dest = self
            .artifact_dir
            .join(cache_filename(reference, display_name, &extension));
        let mut attempt = 2;
        while manifest
            .reference_for(&dest)
            .is_some_and(|owner| owner != reference)
        {
            // A different reference already owns this filename
            let title = format!("{} {}", display_name, attempt);
            dest = self
                .artifact_dir
                .join(cache_filename(reference, &title, &extension));
            attempt += 1;
        }

        relocate(temp_file, &dest).await?;

        if let Some(previous) = manifest.insert(reference, dest.clone()) {
            if previous != dest {
                match tokio::fs::remove_file(&previous).await {
                    Ok(()) => debug!(path = %previous.display(), "Removed replaced artifact"),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!(path = %previous.display(), error = %e, "Failed to remove replaced artifact"),
                }
            }
        }
        manifest.save().await?;
        self.invalidate_size();

        info!(reference = %reference, path = %dest.display(), "Stored artifact");
        Ok(dest)
    }

    /// Copy an external file into the cache.
    ///
    /// The source is left untouched; the copy is staged first and then moved
    /// in through [`store`](Self::store).
    pub async fn import(
        &self,
        reference: &str,
        source: &Path,
        display_name: &str,
    ) -> Result<PathBuf, CacheError> {
        let staged = self.stage_copy(source).await?;
        self.store(reference, &staged, display_name).await
    }

    /// Copy `source` into a staging file that keeps its extension.
    ///
    /// Nothing in the cache changes until the staged file is passed to
    /// [`store`](Self::store).
    pub async fn stage_copy(&self, source: &Path) -> Result<TempPath, CacheError> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let staged = self.staging_file(extension)?;

        tokio::fs::copy(source, &staged)
            .await
            .map_err(|e| CacheError::io(source, e))?;
        Ok(staged)
    }

    /// Create an empty, uniquely named file in the staging directory.
    ///
    /// The returned [`TempPath`] deletes the file on drop, which makes it safe
    /// to abandon a partial download at any point.
    pub fn staging_file(&self, extension: &str) -> Result<TempPath, CacheError> {
        let suffix = format!(".{}", normalize_extension(extension));
        tempfile::Builder::new()
            .prefix("part-")
            .suffix(&suffix)
            .tempfile_in(&self.staging_dir)
            .map(|file| file.into_temp_path())
            .map_err(|e| CacheError::io(&self.staging_dir, e))
    }

    /// Remove the artifact and manifest entry for `reference`.
    ///
    /// Idempotent: returns `Ok(false)` if nothing was cached.
    pub async fn delete(&self, reference: &str) -> Result<bool, CacheError> {
        let _guard = self.lock_reference(reference).await;

        let mut manifest = self.manifest.lock().await;
        let Some(path) = manifest.remove(reference) else {
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                // Keep the index honest: the file is still there
                manifest.insert(reference, path.clone());
                return Err(CacheError::io(&path, e));
            }
        }
        manifest.save().await?;
        self.invalidate_size();

        info!(reference = %reference, path = %path.display(), "Deleted artifact");
        Ok(true)
    }

    /// Enumerate every artifact by scanning the artifact directory.
    ///
    /// References come from the manifest when it knows the file and from the
    /// filename otherwise, so entries survive a lost or corrupt manifest.
    pub async fn list_all(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let files = self.scan_artifacts().await?;
        let manifest = self.manifest.lock().await;

        let entries = files
            .into_iter()
            .filter_map(|(path, metadata)| {
                let name = path.file_name()?.to_str()?;
                let parsed = parse_filename(name);
                let reference = manifest
                    .reference_for(&path)
                    .map(str::to_string)
                    .unwrap_or(parsed.reference);
                Some(CacheEntry {
                    reference,
                    title: parsed.title,
                    size_bytes: metadata.len(),
                    created_at: created_at(&metadata),
                    local_path: path,
                })
            })
            .collect();

        Ok(entries)
    }

    /// Total size of all artifacts in bytes.
    ///
    /// Served from a cached aggregate when no mutation happened since the
    /// last scan.
    pub async fn total_size(&self) -> Result<u64, CacheError> {
        if let Some(size) = *self.size_cache.lock() {
            return Ok(size);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let size = self.list_all().await?.iter().map(|e| e.size_bytes).sum();

        let mut cached = self.size_cache.lock();
        if self.generation.load(Ordering::Acquire) == generation {
            *cached = Some(size);
        }
        Ok(size)
    }

    /// Entry count and total size.
    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.list_all().await?;
        Ok(CacheStats {
            entries: entries.len(),
            bytes: entries.iter().map(|e| e.size_bytes).sum(),
        })
    }

    /// Delete every artifact and empty the manifest.
    pub async fn clear(&self) -> Result<ClearResult, CacheError> {
        let mut manifest = self.manifest.lock().await;
        let mut result = ClearResult::default();

        for (path, metadata) in self.scan_artifacts().await? {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    result.files_deleted += 1;
                    result.bytes_freed += metadata.len();
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(&path, e)),
            }
        }

        manifest.clear();
        manifest.save().await?;
        self.invalidate_size();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);

        info!(
            files = result.files_deleted,
            bytes = result.bytes_freed,
            "Cleared cache"
        );
        Ok(result)
    }

    /// Wait for the per-reference mutation lock.
    async fn lock_reference(&self, reference: &str) -> ReferenceGuard<'_> {
        let lock = self.locks.entry(reference.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        ReferenceGuard {
            locks: &self.locks,
            reference: reference.to_string(),
            guard: Some(guard),
        }
    }

    fn invalidate_size(&self) {
        let mut cached = self.size_cache.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        *cached = None;
    }

    /// List regular, non-hidden files in the artifact directory, by name.
    async fn scan_artifacts(&self) -> Result<Vec<(PathBuf, Metadata)>, CacheError> {
        let mut dir = match tokio::fs::read_dir(&self.artifact_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.artifact_dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::io(&self.artifact_dir, e))?
        {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.is_file() {
                files.push((entry.path(), metadata));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

/// Rename `from` onto `to`, copying when they live on different filesystems.
async fn relocate(from: &Path, to: &Path) -> Result<(), CacheError> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(CacheError::MissingFile(from.to_path_buf()))
        }
        Err(_) => {
            tokio::fs::copy(from, to)
                .await
                .map_err(|e| CacheError::io(to, e))?;
            tokio::fs::remove_file(from)
                .await
                .map_err(|e| CacheError::io(from, e))
        }
    }
}

fn created_at(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_staged(store: &CacheStore, ext: &str, bytes: &[u8]) -> TempPath {
        let staged = store.staging_file(ext).unwrap();
        tokio::fs::write(&staged, bytes).await.unwrap();
        staged
    }

    #[tokio::test]
    async fn test_open_creates_layout() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path().join("cache")).await.unwrap();

        assert!(store.artifact_dir().is_dir());
        assert!(store.staging_dir().is_dir());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_recovers_without_manifest() {
        let temp = TempDir::new().unwrap();
        let full = temp.path().join(ARTIFACT_DIR);
        std::fs::create_dir_all(&full).unwrap();
        std::fs::write(full.join("abc_My_Wallpaper.png"), b"png").unwrap();
        std::fs::write(full.join("def_Other.jpg"), b"jpeg!").unwrap();

        let store = CacheStore::open(temp.path()).await.unwrap();
        let entries = store.list_all().await.unwrap();

        assert_eq!(entries.len(), 2);
        let abc = entries.iter().find(|e| e.reference == "abc").unwrap();
        assert_eq!(abc.title, "My Wallpaper");
        assert_eq!(abc.size_bytes, 3);
        let def = entries.iter().find(|e| e.reference == "def").unwrap();
        assert_eq!(def.title, "Other");

        // Reconciliation rebuilt the manifest as well
        assert_eq!(store.lookup("abc").await, Some(full.join("abc_My_Wallpaper.png")));
    }

    #[tokio::test]
    async fn test_lookup_self_heals_stale_entry() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        let staged = write_staged(&store, "png", b"data").await;
        let path = store.store("42", &staged, "Sunset").await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(store.lookup("42").await, None);

        let persisted = Manifest::load(store.manifest_path()).await;
        assert!(persisted.get("42").is_none());
    }

    #[tokio::test]
    async fn test_store_names_and_persists() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        let staged = write_staged(&store, "png", b"sunset").await;
        let path = store.store("42", &staged, "Sunset").await.unwrap();

        assert_eq!(path, store.artifact_dir().join("42_Sunset.png"));
        assert!(!staged.exists());
        let persisted = Manifest::load(store.manifest_path()).await;
        assert_eq!(persisted.get("42"), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_store_replaces_previous_artifact() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        let first = write_staged(&store, "jpg", b"old").await;
        let old = store.store("42", &first, "Old Name").await.unwrap();
        let second = write_staged(&store, "png", b"newer").await;
        let new = store.store("42", &second, "New Name").await.unwrap();

        assert_ne!(old, new);
        assert!(!old.exists());
        assert_eq!(store.lookup("42").await, Some(new));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_keeps_colliding_titles_apart() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        let a = write_staged(&store, "png", b"a").await;
        let b = write_staged(&store, "png", b"b").await;
        let path_a = store.store("1", &a, "Same / Name").await.unwrap();
        let path_b = store.store("2", &b, "Same : Name").await.unwrap();

        assert_ne!(path_a, path_b);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_disambiguates_separator_in_reference() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        // "a_b" + "c" and "a" + "b c" both sanitize to "a_b_c.png"
        let first = write_staged(&store, "png", b"first").await;
        let path_a = store.store("a_b", &first, "c").await.unwrap();
        let second = write_staged(&store, "png", b"second").await;
        let path_b = store.store("a", &second, "b c").await.unwrap();

        assert_ne!(path_a, path_b);
        assert_eq!(std::fs::read(&path_a).unwrap(), b"first");
        assert_eq!(store.lookup("a_b").await, Some(path_a));
        assert_eq!(store.lookup("a").await, Some(path_b));
    }

    #[tokio::test]
    async fn test_store_as_overrides_staged_extension() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        let staged = write_staged(&store, "part", b"webp").await;
        let path = store.store_as("9", &staged, "Dunes", "WEBP").await.unwrap();

        assert_eq!(path, store.artifact_dir().join("9_Dunes.webp"));
    }

    #[tokio::test]
    async fn test_store_missing_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        let result = store
            .store("42", &temp.path().join("nope.png"), "Sunset")
            .await;
        assert!(matches!(result, Err(CacheError::MissingFile(_))));
        assert_eq!(store.lookup("42").await, None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        let staged = write_staged(&store, "png", b"data").await;
        let path = store.store("42", &staged, "Sunset").await.unwrap();

        assert!(store.delete("42").await.unwrap());
        assert!(!path.exists());
        assert!(!store.delete("42").await.unwrap());
    }

    #[tokio::test]
    async fn test_total_size_tracks_mutations() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();
        assert_eq!(store.total_size().await.unwrap(), 0);

        let staged = write_staged(&store, "png", &[0u8; 1000]).await;
        store.store("1", &staged, "A").await.unwrap();
        assert_eq!(store.total_size().await.unwrap(), 1000);

        let staged = write_staged(&store, "png", &[0u8; 500]).await;
        store.store("2", &staged, "B").await.unwrap();
        assert_eq!(store.total_size().await.unwrap(), 1500);

        store.delete("1").await.unwrap();
        assert_eq!(store.total_size().await.unwrap(), 500);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_total_size_not_stale_after_concurrent_store() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(CacheStore::open(temp.path()).await.unwrap());

        for round in 0..50 {
            let staged = write_staged(&store, "png", &[0u8; 1000]).await;
            let reference = format!("r{}", round);

            let sizer = {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.total_size().await.unwrap() })
            };
            store.store(&reference, &staged, "New").await.unwrap();
            sizer.await.unwrap();

            let actual: u64 = store
                .list_all()
                .await
                .unwrap()
                .iter()
                .map(|e| e.size_bytes)
                .sum();
            assert_eq!(store.total_size().await.unwrap(), actual, "round {}", round);
        }
    }

    #[tokio::test]
    async fn test_reference_locks_are_released() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        assert_eq!(store.lookup("missing").await, None);
        assert!(store.locks.is_empty());

        let staged = write_staged(&store, "png", b"data").await;
        store.store("42", &staged, "Sunset").await.unwrap();
        assert!(store.lookup("42").await.is_some());
        assert!(store.delete("42").await.unwrap());
        assert!(store.locks.is_empty());

        let staged = write_staged(&store, "png", b"data").await;
        store.store("7", &staged, "Dusk").await.unwrap();
        store.clear().await.unwrap();
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_stage_copy_leaves_cache_untouched() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path().join("cache")).await.unwrap();
        let source = temp.path().join("scene.png");
        std::fs::write(&source, b"pixels").unwrap();

        let staged = store.stage_copy(&source).await.unwrap();

        assert!(staged.starts_with(store.staging_dir()));
        assert_eq!(staged.extension().unwrap(), "png");
        assert!(store.list_all().await.unwrap().is_empty());
        drop(staged);
        assert_eq!(std::fs::read_dir(store.staging_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_import_copies_source() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path().join("cache")).await.unwrap();
        let source = temp.path().join("wallpaper.JPG");
        std::fs::write(&source, b"original").unwrap();

        let path = store.import("7", &source, "Blue Hour").await.unwrap();

        assert!(source.exists());
        assert_eq!(path, store.artifact_dir().join("7_Blue_Hour.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path()).await.unwrap();

        for (reference, size) in [("1", 10usize), ("2", 20)] {
            let staged = write_staged(&store, "png", &vec![1u8; size]).await;
            store.store(reference, &staged, "x").await.unwrap();
        }

        let result = store.clear().await.unwrap();
        assert_eq!(result.files_deleted, 2);
        assert_eq!(result.bytes_freed, 30);
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(Manifest::load(store.manifest_path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_drops_entries_for_missing_files() {
        let temp = TempDir::new().unwrap();
        {
            let store = CacheStore::open(temp.path()).await.unwrap();
            let staged = write_staged(&store, "png", b"data").await;
            let path = store.store("42", &staged, "Sunset").await.unwrap();
            std::fs::remove_file(path).unwrap();
        }

        let store = CacheStore::open(temp.path()).await.unwrap();
        let persisted = Manifest::load(store.manifest_path()).await;
        assert!(persisted.is_empty());
    }
}
