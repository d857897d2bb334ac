//! Request classification.
//!
//! Order is fixed: bypass, exclusion, asset, document, default. The first match wins.

use std::collections::HashSet;

use regex::RegexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::request::{Destination, Request};
use crate::Error;

/// Strategy selected for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Not intercepted: non-GET or non-http(s).
    Bypass,
    /// Network only, cache never read or written.
    Excluded,
    /// Network first, cache fallback on the same key.
    Asset,
    /// Network first, cache fallback on the same key, then on `/`.
    Document,
    /// Network only.
    Default,
}

/// Path patterns that must never touch the cache.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: RegexSet,
}

impl ExclusionSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSet::new(patterns).map_err(|e| Error::InvalidInput(format!("exclusion pattern: {e}")))?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.patterns.is_match(url.path())
    }
}

/// Maps requests to a [`Route`].
#[derive(Debug, Clone)]
pub struct Router {
    exclusions: ExclusionSet,
    asset_extensions: HashSet<String>,
}

impl Router {
    pub fn new<I, S>(exclusions: ExclusionSet, asset_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let asset_extensions = asset_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { exclusions, asset_extensions }
    }

    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_get() || !request.is_http() {
            Route::Bypass
        } else if self.exclusions.matches(&request.url) {
            Route::Excluded
        } else if self.is_asset(&request.url) {
            Route::Asset
        } else if request.destination == Destination::Document {
            Route::Document
        } else {
            Route::Default
        }
    }

    /// Plain suffix match on the last path segment.
    fn is_asset(&self, url: &Url) -> bool {
        let file = url.path().rsplit('/').next().unwrap_or_default();
        file.rsplit_once('.')
            .is_some_and(|(_, ext)| self.asset_extensions.contains(&ext.to_ascii_lowercase()))
    }
}
