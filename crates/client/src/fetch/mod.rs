//! HTTP transport for the cache controller.
//!
//! ### Semantics
//! - Every HTTP status is a response, including 3xx/4xx/5xx. Only transport
//!   failures (DNS, connect, TLS, timeout, reset) are errors.
//! - Redirects are followed up to `max_redirects`; the final URL is reported.
//! - No timeout unless one is configured.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};

use appshell_core::Error;
use appshell_core::config::AppConfig;
use appshell_core::worker::{Headers, Network, Request, Response, append_header};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "appshell-sw/0.1")
    pub user_agent: String,

    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "appshell-sw/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name, value);
            }
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timed out fetching {}", request.url))
            } else {
                Error::Network(format!("{}: {e}", request.url))
            }
        })?;

        let status = response.status();
        let final_url = response.url().clone();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => append_header(&mut headers, name.as_str().to_string(), value.to_string()),
                Err(_) => tracing::debug!(header = %name, "dropping non-ASCII header value"),
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response from {final_url}: {e}")))?;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            url: final_url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP/1.1 response per connection on a loopback port.
    async fn serve(raw: &'static str) -> ::url::Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(raw.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        ::url::Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "appshell-sw/0.1");
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "tma/2".into(), timeout_ms: Some(1500), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "tma/2");
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(&FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let base = serve("HTTP/1.1 200 OK\r\nContent-Type: text/css\r\nContent-Length: 7\r\n\r\nbody{} ").await;
        let client = FetchClient::new(&FetchConfig::default()).unwrap();

        let response = client.fetch(&Request::get(base.join("app.css").unwrap())).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(&response.body[..], b"body{} ");
        assert!(!response.from_cache);
    }

    #[tokio::test]
    async fn test_fetch_keeps_repeated_headers() {
        let base = serve(
            "HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\nLink: </x.js>; rel=preload\r\n\
             Link: </y.js>; rel=preload\r\nContent-Length: 2\r\n\r\nok",
        )
        .await;
        let client = FetchClient::new(&FetchConfig::default()).unwrap();

        let response = client.fetch(&Request::get(base)).await.unwrap();
        assert_eq!(response.header_values("set-cookie"), ["a=1", "b=2"]);
        assert_eq!(response.header_values("link"), ["</x.js>; rel=preload", "</y.js>; rel=preload"]);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_response() {
        let base = serve("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n").await;
        let client = FetchClient::new(&FetchConfig::default()).unwrap();

        let response = client.fetch(&Request::get(base.join("missing.js").unwrap())).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FetchClient::new(&FetchConfig::default()).unwrap();
        let url = ::url::Url::parse(&format!("http://{addr}/")).unwrap();
        let result = client.fetch(&Request::get(url)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_fetch_invalid_method() {
        let client = FetchClient::new(&FetchConfig::default()).unwrap();
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/").unwrap()).with_method("BAD METHOD");
        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
