//! LLM Field Extractor - OpenAI-compatible chat-completions client.
//!
//! The system prompt is generated from the field schema, and the already
//! collected snapshot is sent as context so the model only reports what
//! is new in the current message.
//!
//! # Configuration
//!
//! ```ignore
//! let config = LlmExtractorConfig::new(api_key, "https://api.deepseek.com/v1", "deepseek-chat")
//!     .with_timeout(Duration::from_secs(15));
//!
//! let extractor = LlmFieldExtractor::new(config, schema)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::intake::{normalize_value, CollectedFields, ExtractedFields, FieldSchema};
use crate::ports::{ExtractionError, FieldExtractor};

/// Configuration for the LLM extractor.
#[derive(Debug, Clone)]
pub struct LlmExtractorConfig {
    api_key: Secret<String>,
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmExtractorConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.1,
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Model-backed field extractor.
pub struct LlmFieldExtractor {
    config: LlmExtractorConfig,
    schema: FieldSchema,
    system_prompt: String,
    client: Client,
}

impl LlmFieldExtractor {
    pub fn new(config: LlmExtractorConfig, schema: FieldSchema) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractionError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        let system_prompt = system_prompt(&schema);

        Ok(Self {
            config,
            schema,
            system_prompt,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn user_prompt(&self, text: &str, collected: &CollectedFields) -> String {
        let mut out = String::from("当前已收集的信息（仅供参考，不要复制到结果中）：\n");
        for field in self.schema.fields() {
            match collected.get(&field.key) {
                Some(value) => {
                    let _ = writeln!(out, "- {}: {}（已收集）", field.short_label(), value);
                }
                None => {
                    let _ = writeln!(out, "- {}: 未收集", field.short_label());
                }
            }
        }
        let _ = write!(out, "\n用户当前消息：{}\n\n请从这条消息中提取信息，返回 JSON。", text);
        out
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response, ExtractionError> {
        self.client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else {
                    ExtractionError::Unavailable(e.to_string())
                }
            })
    }
}

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    async fn extract(
        &self,
        text: &str,
        collected: &CollectedFields,
    ) -> Result<ExtractedFields, ExtractionError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: self.user_prompt(text, collected),
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self.send(&request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Unavailable(format!("status {}: {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(format!("failed to parse response: {}", e)))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractionError::InvalidResponse("no choices in response".into()))?;

        debug!(raw = %content, "extractor response");
        Ok(parse_extraction(&content, &self.schema))
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

fn system_prompt(schema: &FieldSchema) -> String {
    let mut out = String::from(
        "你是一个技术支持信息收集助手。你的唯一任务是从用户的【当前这一条消息】中提取以下信息。\n\n需要收集的信息：\n",
    );
    for (i, field) in schema.fields().iter().enumerate() {
        let _ = writeln!(out, "{}. {} - {}", i + 1, field.key, field.label);
    }
    out.push_str(
        "\n严格规则：\n\
         - 只从用户当前这一条消息中提取新信息\n\
         - 如果用户这条消息没有明确提到某项信息，该字段必须返回空字符串 \"\"\n\
         - 不要从\"当前已收集信息\"中复制任何内容到结果中\n\
         - 不要把问候语当作任何信息\n\
         - 不要猜测或编造信息\n\
         - 如果用户纠正了之前的信息，返回新值\n\
         - 信息要简洁准确\n\n\
         返回严格的 JSON 格式，不要有其他任何文字：\n",
    );
    let template: serde_json::Map<String, Value> = schema
        .fields()
        .iter()
        .map(|f| (f.key.clone(), Value::String(String::new())))
        .collect();
    out.push_str(&Value::Object(template).to_string());
    out
}

/// Pulls a field map out of model output.
///
/// Accepts Markdown code fences and surrounding prose. Unparseable output
/// yields an empty map rather than an error.
fn parse_extraction(content: &str, schema: &FieldSchema) -> ExtractedFields {
    let mut body = content.trim();

    if body.starts_with("```") {
        body = body.trim_start_matches('`');
        body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        body = body.trim_end().trim_end_matches('`');
    }

    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            body = &body[start..=end];
        }
    }

    let object = match serde_json::from_str::<Value>(body.trim()) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            warn!(content = %content, "extractor output is not a JSON object");
            return ExtractedFields::new();
        }
    };

    object
        .into_iter()
        .filter(|(key, _)| schema.contains(key))
        .filter_map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            normalize_value(&raw).map(|v| (key, v.to_string()))
        })
        .collect()
}

// ----- OpenAI-compatible API Types -----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
