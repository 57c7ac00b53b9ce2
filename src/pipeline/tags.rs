use thiserror::Error;

use crate::{
    config::TaggerConfig,
    util::ollama::{GenerateError, GenerateOptions, OllamaClient},
};

#[derive(Debug, Error)]
pub enum TagError {
    #[error("note text is empty")]
    EmptyInput,
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

pub struct TagGenerator {
    client: OllamaClient,
    options: GenerateOptions,
    language: String,
}

impl TagGenerator {
    pub fn new(config: &TaggerConfig) -> anyhow::Result<Self> {
        let client = OllamaClient::new(&config.base_url, &config.model, config.timeout_secs)?;
        Ok(Self {
            client,
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.num_predict,
            },
            language: config.language.clone(),
        })
    }

    /// Asks the model for 3-5 comma-separated tags describing `text`.
    pub async fn generate(&self, text: &str) -> Result<String, TagError> {
        if text.trim().is_empty() {
            return Err(TagError::EmptyInput);
        }

        let prompt = build_prompt(&self.language, text);
        let raw = self.client.generate(&prompt, self.options).await?;
        let tags = clean_tags(&raw);
        tracing::debug!(model = self.client.model(), %tags, "tags generated");
        Ok(tags)
    }
}

fn build_prompt(language: &str, text: &str) -> String {
    format!(
        "Analyze the note text and return 3-5 key tags in {language}.\n\
         Tags must be short words or phrases.\n\
         Return ONLY the tags separated by commas, without explanations, periods or numbering.\n\
         \n\
         Note text: {text}"
    )
}

fn clean_tags(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed
        .replace('\n', ", ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn prompt_names_language_and_appends_text() {
        let prompt = build_prompt("Russian", "заметка о Rust");
        assert!(prompt.contains("3-5 key tags in Russian"));
        assert!(prompt.ends_with("Note text: заметка о Rust"));
    }

    #[test]
    fn cleans_model_output() {
        assert_eq!(clean_tags("  rust, async,  web.  "), "rust, async, web");
        assert_eq!(clean_tags("rust\nasync\nweb."), "rust, async, web");
        assert_eq!(clean_tags("a..."), "a..");
        assert_eq!(clean_tags("one,\ttwo"), "one, two");
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let generator = TagGenerator::new(&TaggerConfig {
            base_url: server.uri(),
            ..TaggerConfig::default()
        })
        .unwrap();
        assert!(matches!(
            generator.generate(" \n ").await,
            Err(TagError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn returns_cleaned_tags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "\nrust\nownership, borrowing.\n" })),
            )
            .mount(&server)
            .await;

        let generator = TagGenerator::new(&TaggerConfig {
            base_url: server.uri(),
            ..TaggerConfig::default()
        })
        .unwrap();
        assert_eq!(
            generator.generate("Notes on the borrow checker").await.unwrap(),
            "rust, ownership, borrowing"
        );
    }
}
