//! Transports that turn a URL into a raw response
//!
//! Two implementations exist: plain HTTP via reqwest, and an external
//! headless-renderer command whose stdout is taken as the rendered DOM.
//! Both sit behind [`Transport`] so the retry policy is shared.

use crate::config::{Config, FetchMode};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// A single response, before classification
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status, or 200 for a renderer that exited cleanly
    pub status: u16,
    /// Decoded body, `None` if the transport received nothing
    pub body: Option<String>,
}

/// Issues a single request for a URL
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request. Connection-level failures are reported as
    /// `FetchError::Transport` and are retried by the caller.
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError>;
}

/// Builds an HTTP client with the crawler's identity and timeout
///
/// # Arguments
///
/// * `config` - The full configuration (user agent, `Accept-Language` and
///   fetch timeout are used)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if !config.fetch.accept_language.is_empty() {
        match HeaderValue::from_str(&config.fetch.accept_language) {
            Ok(value) => {
                headers.insert(ACCEPT_LANGUAGE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid Accept-Language"),
        }
    }

    Client::builder()
        .user_agent(config.user_agent.user_agent_string())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP GET transport; redirects are followed by the client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();

        // A body that fails to decode mid-stream counts as missing
        let body = match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(url, error = %e, "Failed to read response body");
                None
            }
        };

        Ok(RawResponse { status, body })
    }
}

/// Runs an external renderer and reads the DOM from its stdout
///
/// The command is configured as an argv list; every `{url}` token is
/// replaced by the target URL. The process is killed if it outlives the
/// fetch timeout.
#[derive(Debug, Clone)]
pub struct RenderTransport {
    argv: Vec<String>,
    timeout: Duration,
}

impl RenderTransport {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.fetch.render_command.clone(),
            Duration::from_secs(config.fetch.timeout_secs),
        )
    }

    fn command_for(&self, url: &str) -> Vec<String> {
        self.argv.iter().map(|arg| arg.replace("{url}", url)).collect()
    }
}

#[async_trait]
impl Transport for RenderTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        let argv = self.command_for(url);
        let transport_err = |message: String| FetchError::Transport {
            url: url.to_string(),
            message,
        };

        let (program, args) = argv
            .split_first()
            .ok_or_else(|| transport_err("render command is empty".to_string()))?;

        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| transport_err(format!("renderer timed out after {:?}", self.timeout)))?
            .map_err(|e| transport_err(format!("failed to spawn {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(transport_err(format!(
                "renderer exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(RawResponse {
            status: 200,
            body: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
        })
    }
}

/// Builds the transport selected by `fetch.mode`
pub fn transport_for(config: &Config) -> Result<Arc<dyn Transport>, FetchError> {
    Ok(match config.fetch.mode {
        FetchMode::Http => Arc::new(HttpTransport::from_config(config)?),
        FetchMode::Render => Arc::new(RenderTransport::from_config(config)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command_substitution() {
        let transport = RenderTransport::new(
            vec!["render".to_string(), "--url={url}".to_string(), "{url}".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(
            transport.command_for("https://example.com/?a=1"),
            vec!["render", "--url=https://example.com/?a=1", "https://example.com/?a=1"]
        );
    }

    #[tokio::test]
    async fn test_render_transport_reads_stdout() {
        let transport = RenderTransport::new(
            vec!["echo".to_string(), "{url}".to_string()],
            Duration::from_secs(5),
        );
        let response = transport.get("https://example.com/").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_deref().map(str::trim), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn test_render_transport_missing_program() {
        let transport = RenderTransport::new(
            vec!["pagechain-no-such-renderer".to_string(), "{url}".to_string()],
            Duration::from_secs(5),
        );
        let err = transport.get("https://example.com/").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&Config::default()).is_ok());
    }

    #[test]
    fn test_build_http_client_without_accept_language() {
        let mut config = Config::default();
        config.fetch.accept_language = String::new();
        assert!(build_http_client(&config).is_ok());
    }
}
