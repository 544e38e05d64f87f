//! Application bootstrap and lifecycle management.
//!
//! This module provides the `WallstashApp` type, which creates the cache
//! store, progress tracker, local-source resolver and fetch coordinator in
//! one place and hands out shared handles to them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      WallstashApp                        │
//! │                                                          │
//! │  1. CacheStore::open ──► reconcile manifest with disk    │
//! │                                                          │
//! │  2. LocalSourceResolver                                  │
//! │     └── DirectoryResolver (Steam workshop + extra dirs)  │
//! │                                                          │
//! │  3. HttpFetcher, ProgressTracker                         │
//! │                                                          │
//! │  4. FetchCoordinator ──► ensure_local / cancel / pause   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use wallstash::app::{AppConfig, WallstashApp};
//!
//! let app = WallstashApp::start(AppConfig::from_config_file(&config)).await?;
//! let updates = app.tracker().subscribe();
//! app.shutdown().await;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::WallstashApp;
pub use config::{AppConfig, LocalSourceAppConfig};
pub use error::{AppError, ApplyError};
