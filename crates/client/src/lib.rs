//! Client code for appshell.
//!
//! This crate provides the reqwest-backed network transport the cache controller
//! fetches through, plus request URL resolution shared by the server.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
pub use fetch::url::{UrlError, resolve};
