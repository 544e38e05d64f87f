//! CLI command implementations.

pub mod apply;
pub mod cache;
pub mod config;
pub mod get;
pub mod init;
pub mod list;
pub mod remove;
mod transfer;
