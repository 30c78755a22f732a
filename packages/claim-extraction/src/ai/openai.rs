//! OpenAI-compatible implementation of the Extractor trait.
//!
//! Works against any chat completions endpoint that speaks the OpenAI wire
//! format, including Gemini's compatibility endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use claim_extraction::ai::OpenAICompatibleExtractor;
//! use claim_extraction::ExtractorCredentials;
//!
//! let extractor = OpenAICompatibleExtractor::new(ExtractorCredentials::new("AIza..."));
//! let pipeline = ClaimPipeline::new(Arc::new(extractor), breaker);
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractorError, ExtractorResult};
use crate::pipeline::prompts::PromptConfig;
use crate::security::ExtractorCredentials;
use crate::traits::extractor::{ExtractionRecord, ExtractionRequest, ExtractionResult, Extractor};
use crate::types::candidate::Span;

const OUTPUT_INSTRUCTIONS: &str = r#"Respond with JSON only, in this shape:
{"extractions": [{"extraction_text": "...", "confidence": 0.0, "claim_type": "EFFICACY"}]}

Copy extraction_text verbatim from the document. Use an empty list when the document contains no claims."#;

/// Extractor backed by an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenAICompatibleExtractor {
    client: Client,
    credentials: ExtractorCredentials,
    temperature: f32,
}

impl OpenAICompatibleExtractor {
    pub fn new(credentials: ExtractorCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
            temperature: 0.0,
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn credentials(&self) -> &ExtractorCredentials {
        &self.credentials
    }

    /// Run one chunk through the model.
    async fn extract_chunk(
        &self,
        model_id: &str,
        system: &str,
        offset: usize,
        chunk: &str,
    ) -> ExtractorResult<Vec<ExtractionRecord>> {
        let request = ChatRequest {
            model: model_id.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: chunk.to_string(),
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "claim_extractions".to_string(),
                    strict: false,
                    schema: response_schema(),
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.credentials.base_url))
            .bearer_auth(self.credentials.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractorError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractorError::empty_response(model_id, e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ExtractorError::empty_response(model_id, "no content in response"))?;

        let parsed = parse_extractions(&content)
            .map_err(|e| ExtractorError::empty_response(model_id, e.to_string()))?;

        Ok(parsed
            .extractions
            .into_iter()
            .filter(|e| !e.extraction_text.trim().is_empty())
            .map(|e| e.into_record(chunk, offset))
            .collect())
    }
}

#[async_trait]
impl Extractor for OpenAICompatibleExtractor {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> ExtractorResult<ExtractionResult> {
        let system = system_prompt(request.prompt);
        let chunks = chunk_text(request.text, request.max_char_buffer);

        tracing::debug!(
            model = request.model_id,
            chunks = chunks.len(),
            max_workers = request.max_workers,
            "Sending extraction request"
        );

        let futures: Vec<_> = chunks
            .into_iter()
            .map(|(offset, chunk)| self.extract_chunk(request.model_id, &system, offset, chunk))
            .collect();

        let results: Vec<ExtractorResult<Vec<ExtractionRecord>>> = stream::iter(futures)
            .buffer_unordered(request.max_workers.max(1))
            .collect()
            .await;

        let mut extractions = Vec::new();
        let mut empty = None;
        for result in results {
            match result {
                Ok(records) => extractions.extend(records),
                // one failed chunk retries the whole document
                Err(e @ ExtractorError::Transient(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(model = request.model_id, error = %e, "Chunk produced no usable output");
                    empty.get_or_insert(e);
                }
            }
        }

        if extractions.is_empty() {
            if let Some(e) = empty {
                return Err(e);
            }
        }

        extractions.sort_by_key(|r| r.spans.first().map_or(usize::MAX, |s| s.start));
        Ok(ExtractionResult::new(extractions))
    }
}

// =============================================================================
// Prompt and response handling
// =============================================================================

fn system_prompt(prompt: &PromptConfig) -> String {
    let mut system = format!("{}\n\n{}", prompt.description, OUTPUT_INSTRUCTIONS);
    if prompt.examples.is_empty() {
        return system;
    }

    system.push_str("\n\nExamples:");
    for example in &prompt.examples {
        let extractions: Vec<serde_json::Value> = example
            .extractions
            .iter()
            .map(|record| {
                let mut object: serde_json::Map<String, serde_json::Value> =
                    record.attributes.clone().into_iter().collect();
                object.insert(
                    "extraction_text".to_string(),
                    serde_json::Value::String(record.extraction_text.clone()),
                );
                serde_json::Value::Object(object)
            })
            .collect();
        let output = serde_json::json!({ "extractions": extractions });
        system.push_str(&format!("\n\nText: {}\nOutput: {}", example.text, output));
    }
    system
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Breaks after the last newline or period inside the window, then after
/// the last space, then hard. Returns byte offsets with each chunk.
fn chunk_text(text: &str, max_chars: usize) -> Vec<(usize, &str)> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let rest = &text[start..];
        let hard_end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);

        let end = if hard_end == rest.len() {
            hard_end
        } else {
            let window = &rest[..hard_end];
            window
                .rfind(['\n', '.'])
                .or_else(|| window.rfind(' '))
                .map_or(hard_end, |i| i + 1)
        };

        chunks.push((start, &rest[..end]));
        start += end;
    }
    chunks
}

fn parse_extractions(content: &str) -> Result<ModelExtractions, serde_json::Error> {
    serde_json::from_str(content).or_else(|_| {
        let json_str = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        serde_json::from_str(json_str)
    })
}

/// Every HTTP failure is worth another attempt; rate limits and server
/// errors most of all.
fn status_error(status: StatusCode, body: &str) -> ExtractorError {
    let detail: String = body.chars().take(200).collect();
    if status == StatusCode::TOO_MANY_REQUESTS {
        ExtractorError::Transient(format!("rate limited ({status}): {detail}"))
    } else if status.is_server_error() {
        ExtractorError::Transient(format!("server error ({status}): {detail}"))
    } else {
        ExtractorError::Transient(format!("request rejected ({status}): {detail}"))
    }
}

fn response_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(ModelExtractions)).unwrap_or_default()
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
struct ModelExtractions {
    #[serde(default)]
    extractions: Vec<ModelExtraction>,
}

/// One claim as returned by the model.
#[derive(Debug, Deserialize, JsonSchema)]
struct ModelExtraction {
    /// Exact claim text copied from the document
    extraction_text: String,
    /// 0.0 to 1.0
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    claim_type: Option<String>,
    #[serde(default)]
    is_comparative: Option<bool>,
}

impl ModelExtraction {
    fn into_record(self, chunk: &str, offset: usize) -> ExtractionRecord {
        let text = self.extraction_text.trim().to_string();
        let span = chunk
            .find(text.as_str())
            .map(|pos| Span::new(offset + pos, offset + pos + text.len()));

        let mut record = ExtractionRecord::new(text);
        if let Some(confidence) = self.confidence {
            record = record.with_confidence(confidence);
        }
        if let Some(claim_type) = self.claim_type {
            record = record.with_attribute("claim_type", serde_json::json!(claim_type));
        }
        if let Some(is_comparative) = self.is_comparative {
            record = record.with_attribute("is_comparative", serde_json::json!(is_comparative));
        }
        if let Some(span) = span {
            record = record.with_span(span);
        }
        record
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::model::PromptVersion;

    #[test]
    fn test_chunks_cover_text_and_respect_limit() {
        let text = "XARELTO reduced stroke. It was well-tolerated. Bleeding was rare.";
        let chunks = chunk_text(text, 30);

        let rebuilt: String = chunks.iter().map(|(_, c)| *c).collect();
        assert_eq!(rebuilt, text);
        assert!(chunks.iter().all(|(_, c)| c.chars().count() <= 30));
        assert_eq!(chunks[0], (0, "XARELTO reduced stroke."));
        for (offset, chunk) in &chunks {
            assert_eq!(&text[*offset..*offset + chunk.len()], *chunk);
        }
    }

    #[test]
    fn test_chunking_multibyte_text() {
        let text = "é".repeat(10);
        let chunks = chunk_text(&text, 3);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3].1, "é");
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("short", 50_000), vec![(0, "short")]);
        assert!(chunk_text("", 10).is_empty());
    }

    #[test]
    fn test_parse_fenced_json_and_locate_span() {
        let content = "```json\n{\"extractions\": [{\"extraction_text\": \"reduced stroke by 21%\", \"confidence\": 0.9, \"claim_type\": \"EFFICACY\"}]}\n```";
        let parsed = parse_extractions(content).unwrap();

        let chunk = "XARELTO reduced stroke by 21% versus warfarin";
        let record = parsed
            .extractions
            .into_iter()
            .next()
            .unwrap()
            .into_record(chunk, 100);

        assert_eq!(record.spans, vec![Span::new(108, 129)]);
        assert_eq!(record.attributes["claim_type"], "EFFICACY");
    }

    #[test]
    fn test_unparseable_content_is_error() {
        assert!(parse_extractions("I could not find any claims.").is_err());
    }

    #[test]
    fn test_status_errors_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::BAD_REQUEST,
        ] {
            assert!(matches!(status_error(status, "boom"), ExtractorError::Transient(_)));
        }
    }

    #[test]
    fn test_system_prompt_includes_examples() {
        let prompt = PromptConfig::for_version(PromptVersion::V4Regulatory);
        let system = system_prompt(&prompt);
        assert!(system.starts_with(&prompt.description));
        assert!(system.contains("\"extractions\":[]"));
        assert!(system.contains("Examples:"));
    }

    #[test]
    fn test_response_schema_describes_extractions() {
        let schema = response_schema();
        assert!(schema["properties"]["extractions"].is_object());
    }
}
