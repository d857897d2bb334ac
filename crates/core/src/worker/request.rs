//! Request and response values passed between the controller and its collaborators.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Header fields by lower-cased name. Repeated fields keep every value in arrival order.
pub type Headers = BTreeMap<String, Vec<String>>;

/// What the requesting context intends to do with the response.
///
/// Covers every destination a page can issue. Only `Document` affects routing;
/// the rest matter to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Top-level navigable document.
    Document,
    Audio,
    AudioWorklet,
    Embed,
    Font,
    Frame,
    IFrame,
    Image,
    Json,
    Manifest,
    Object,
    PaintWorklet,
    Report,
    Script,
    ServiceWorker,
    SharedWorker,
    Style,
    Track,
    Video,
    WebIdentity,
    Worker,
    Xslt,
    /// `fetch()` / XHR and anything else without a destination.
    #[default]
    Empty,
}

impl Destination {
    const ALL: [Destination; 23] = [
        Self::Document,
        Self::Audio,
        Self::AudioWorklet,
        Self::Embed,
        Self::Font,
        Self::Frame,
        Self::IFrame,
        Self::Image,
        Self::Json,
        Self::Manifest,
        Self::Object,
        Self::PaintWorklet,
        Self::Report,
        Self::Script,
        Self::ServiceWorker,
        Self::SharedWorker,
        Self::Style,
        Self::Track,
        Self::Video,
        Self::WebIdentity,
        Self::Worker,
        Self::Xslt,
        Self::Empty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Audio => "audio",
            Self::AudioWorklet => "audioworklet",
            Self::Embed => "embed",
            Self::Font => "font",
            Self::Frame => "frame",
            Self::IFrame => "iframe",
            Self::Image => "image",
            Self::Json => "json",
            Self::Manifest => "manifest",
            Self::Object => "object",
            Self::PaintWorklet => "paintworklet",
            Self::Report => "report",
            Self::Script => "script",
            Self::ServiceWorker => "serviceworker",
            Self::SharedWorker => "sharedworker",
            Self::Style => "style",
            Self::Track => "track",
            Self::Video => "video",
            Self::WebIdentity => "webidentity",
            Self::Worker => "worker",
            Self::Xslt => "xslt",
            Self::Empty => "empty",
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Ok(Self::Empty);
        }
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown request destination: {name}")))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
    pub headers: Headers,
}

impl Request {
    /// A plain `GET` with no destination.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, destination: Destination::Empty, headers: Headers::new() }
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self { destination: Destination::Document, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Append a header value; earlier values for the same name are kept.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        append_header(&mut self.headers, name.into(), value.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the target can be fetched over the network at all.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// URL used as the cache key: the request URL without its fragment.
    pub fn cache_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }

    /// Method as stored in cache keys.
    pub fn cache_method(&self) -> String {
        self.method.to_ascii_uppercase()
    }
}

/// A response snapshot, either live from the network or read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL the response was served from.
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
    /// Set when the response was read back from cache storage.
    pub from_cache: bool,
}

impl Response {
    pub fn new(url: Url, status: u16) -> Self {
        Self {
            url,
            status,
            status_text: canonical_reason(status).to_string(),
            headers: Headers::new(),
            body: Bytes::new(),
            from_cache: false,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a header value; earlier values for the same name are kept.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        append_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// 2xx.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only an exact 200 is ever written to cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    /// Every value of a header, in arrival order.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Append under the lower-cased name.
pub fn append_header(headers: &mut Headers, name: String, value: String) {
    headers.entry(name.to_ascii_lowercase()).or_default().push(value);
}

fn canonical_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default()
}
