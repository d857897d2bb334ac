//! Core types and shared functionality for appshell.
//!
//! This crate provides:
//! - The offline cache controller (install / activate / fetch lifecycle)
//! - Cache storage backends (SQLite and in-memory)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod worker;

pub use cache::{CacheBackend, CacheDb, CachedResponse, MemoryCache};
pub use config::AppConfig;
pub use error::Error;
pub use worker::{CacheController, CachePolicy, FetchOutcome, Request, Response, WorkerEvent, WorkerState};
