//! Periodic multi-source feed ingestion with a paginated, per-user read side.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;
pub mod sync;

pub use error::{AppError, Result};
