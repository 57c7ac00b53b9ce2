use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("ollama request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("ollama returned HTTP {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("failed to decode ollama response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("ollama reported an error: {0}")]
    Model(String),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let mut builder = Client::builder();
        if let Ok(parsed) = Url::parse(base_url) {
            let disable_proxy = parsed
                .host()
                .map(|host| match host {
                    url::Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
                    url::Host::Ipv4(addr) => addr.is_loopback(),
                    url::Host::Ipv6(addr) => addr.is_loopback(),
                })
                .unwrap_or(false);
            if disable_proxy {
                builder = builder.no_proxy();
            }
        }
        let http = builder
            .timeout(timeout)
            .build()
            .context("failed to build ollama http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single non-streaming completion against `/api/generate`.
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<String, GenerateError> {
        let url = format!("{}/api/generate", self.base_url);
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        };

        let response = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(GenerateError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(GenerateError::Transport)?;

        if status != StatusCode::OK {
            return Err(GenerateError::Upstream { status, body });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(GenerateError::Decode)?;
        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return Err(GenerateError::Model(error));
        }

        Ok(parsed.response)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}
