//! Turns raw note input (free text or a link) into title, plain text,
//! sanitized HTML and tags.

pub mod extract;
pub mod fetch;
pub mod tags;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{FetcherConfig, TaggerConfig},
    util::html::{self, SanitizePolicy},
};

use self::{
    extract::{extract_main_content, extract_title, Document},
    fetch::{FetchError, PageFetcher},
    tags::TagGenerator,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessedContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub plain_text: String,
    pub html_content: String,
    pub generated_tags: String,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("nothing to build a note from: input text is empty")]
    EmptyContent,
}

#[derive(Debug, Error)]
enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no readable text on page")]
    NoText,
}

pub fn is_url(input: &str) -> bool {
    let head: String = input.chars().take(8).collect::<String>().to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}

pub struct ContentPipeline {
    fetcher: PageFetcher,
    tagger: TagGenerator,
    policy: Arc<SanitizePolicy>,
    fallback_tags: String,
}

impl ContentPipeline {
    pub fn new(
        fetcher_config: &FetcherConfig,
        tagger_config: &TaggerConfig,
        policy: Arc<SanitizePolicy>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::new(fetcher_config)?,
            tagger: TagGenerator::new(tagger_config)?,
            policy,
            fallback_tags: tagger_config.fallback.clone(),
        })
    }

    /// Fetch and tag failures degrade to a plain-text note and the fallback
    /// tag value; only blank input is an error.
    pub async fn process_note_content(
        &self,
        input: &str,
    ) -> Result<ProcessedContent, PipelineError> {
        let mut content = if is_url(input) {
            match self.process_page(input).await {
                Ok(content) => content,
                Err(err) => {
                    warn!(url = input, error = %err, "page extraction failed, keeping link as text");
                    self.link_fallback(input)
                }
            }
        } else {
            ProcessedContent {
                plain_text: input.to_string(),
                html_content: html::wrap_plain_text(&self.policy, input),
                ..ProcessedContent::default()
            }
        };

        if content.plain_text.trim().is_empty() {
            return Err(PipelineError::EmptyContent);
        }

        content.generated_tags = match self.tagger.generate(&content.plain_text).await {
            Ok(tags) => tags,
            Err(err) => {
                warn!(error = %err, fallback = %self.fallback_tags, "tag generation failed");
                self.fallback_tags.clone()
            }
        };

        Ok(content)
    }

    async fn process_page(&self, url: &str) -> Result<ProcessedContent, PageError> {
        let body = self.fetcher.fetch_html(url).await?;
        let content = extract_page(&self.policy, url, &body);
        // An empty page takes the link fallback so any non-blank input still
        // becomes a note; it must not surface as `EmptyContent`.
        if content.plain_text.is_empty() {
            return Err(PageError::NoText);
        }
        info!(url, title = ?content.title, chars = content.plain_text.chars().count(), "page extracted");
        Ok(content)
    }

    fn link_fallback(&self, url: &str) -> ProcessedContent {
        let plain_text =
            format!("Link: {url}\n\nCould not retrieve the page content automatically.");
        ProcessedContent {
            original_url: Some(url.to_string()),
            html_content: html::wrap_plain_text(&self.policy, &plain_text),
            plain_text,
            ..ProcessedContent::default()
        }
    }
}

// `Document` is not `Send`; it must not live across an await point.
fn extract_page(policy: &SanitizePolicy, url: &str, body: &str) -> ProcessedContent {
    let doc = Document::parse(body);
    let title = extract_title(&doc);
    let extracted = extract_main_content(doc);

    ProcessedContent {
        original_url: Some(url.to_string()),
        title: Some(title).filter(|t| !t.is_empty()),
        plain_text: extracted.text,
        html_content: html::format_content(policy, &extracted.html),
        generated_tags: String::new(),
    }
}
