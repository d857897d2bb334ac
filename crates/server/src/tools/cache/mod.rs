//! Cache-related MCP tools.
//!
//! This module provides read access to the controller's cache namespace.

pub mod get;

pub use get::{CacheGetParams, get_impl};
