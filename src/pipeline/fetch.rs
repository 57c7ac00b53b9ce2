use std::time::Duration;

use anyhow::Context;
use encoding_rs::{Encoding, UTF_8};
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::FetcherConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url {url:?}: {source}")]
    InvalidInput {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("page request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("page returned HTTP {status}")]
    Upstream { status: StatusCode },
    #[error("not an html page: {content_type:?}")]
    UnsupportedContentType { content_type: String },
    #[error("failed to read page body: {0}")]
    Parse(#[source] reqwest::Error),
}

/// Single-attempt HTML page download. The decoded body is handed to
/// [`super::extract::Document::parse`] by the caller.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &FetcherConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .build()
            .context("failed to build page fetcher http client")?;

        Ok(Self { client })
    }

    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidInput {
            url: url.to_string(),
            source,
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Upstream { status });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().contains("text/html") {
            return Err(FetchError::UnsupportedContentType { content_type });
        }

        let body = response.bytes().await.map_err(FetchError::Parse)?;
        tracing::debug!(url, bytes = body.len(), "page downloaded");

        Ok(decode_body(&body, &content_type))
    }
}

/// Decodes with the charset declared in `Content-Type`, UTF-8 otherwise.
/// A byte order mark overrides both.
fn decode_body(body: &[u8], content_type: &str) -> String {
    let encoding = content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, label)| Encoding::for_label(label.trim().trim_matches('"').as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}
