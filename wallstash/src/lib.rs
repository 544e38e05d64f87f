//! Wallstash - download and local cache manager for wallpaper content
//!
//! This library provides the core that sits between a wallpaper catalog and the
//! desktop: it turns a content reference plus a source URL into a file on local
//! disk, exactly once, and remembers it across restarts.
//!
//! # Architecture
//!
//! ```text
//!                    ensure_local(request)
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FetchCoordinator                         │
//! │                                                              │
//! │  1. CacheStore::lookup ──────────► hit: return path          │
//! │  2. in-flight attempt? ──────────► join it                   │
//! │  3. LocalSourceResolver ─────────► copy into CacheStore      │
//! │  4. Fetcher (HTTP) ──────────────► move into CacheStore      │
//! │                                                              │
//! │  TransferEvent ─────► ProgressTracker ─────► subscribers     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The filesystem under the cache directory is the source of truth. The
//! manifest is an index that is rebuilt from a directory scan whenever it
//! disagrees with what is on disk.
//!
//! # Example
//!
//! ```ignore
//! use wallstash::app::{AppConfig, WallstashApp};
//! use wallstash::download::DownloadRequest;
//!
//! let app = WallstashApp::start(AppConfig::new(cache_dir)).await?;
//! let request = DownloadRequest::new("42", "https://host/file.png", "Sunset");
//! let path = app.coordinator().ensure_local(request).await?;
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod desktop;
pub mod download;
pub mod local_source;
pub mod logging;

/// Crate version, recorded in logs and the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
