//! Minimal OpenAI-compatible client for quiz generation.
//!
//! We only call chat.completions with `response_format = json_object` and hand the raw
//! assistant text to `parser.rs`. Images from uploads go along as inline data-URL parts.
//! Calls are instrumented and log model names, latencies and token usage (not contents).
//!
//! NOTE: We never log the API key or prompt contents.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::domain::{FileKind, ProcessedFile};
use crate::error::{AppError, AppResult};

/// Image bytes (already base64) to attach to a request.
#[derive(Clone, Debug)]
pub struct InlineImage {
  pub mime_type: String,
  pub data_base64: String,
}

impl InlineImage {
  pub fn from_files(files: &[ProcessedFile]) -> Vec<InlineImage> {
    files
      .iter()
      .filter(|f| f.kind == FileKind::Image)
      .map(|f| InlineImage { mime_type: f.mime_type.clone(), data_base64: f.content.clone() })
      .collect()
  }

  fn data_url(&self) -> String {
    format!("data:{};base64,{}", self.mime_type, self.data_base64)
  }
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  pub fn new(api_key: String, base_url: String, fast_model: String, strong_model: String) -> Option<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .map_err(|e| error!(target: "quizcraft_backend", error = %e, "Failed to build HTTP client"))
      .ok()?;
    let base_url = base_url.trim_end_matches('/').to_string();
    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    Self::new(api_key, base_url, fast_model, strong_model)
  }

  /// JSON-object chat completion. Returns the assistant text untouched.
  #[instrument(level = "info", skip(self, system, user, images), fields(model = %model, user_len = user.len(), images = images.len()))]
  pub async fn generate_json(
    &self,
    model: &str,
    system: &str,
    user: &str,
    images: &[InlineImage],
    temperature: f32,
  ) -> AppResult<String> {
    let url = format!("{}/chat/completions", self.base_url);
    let user_content = if images.is_empty() {
      MessageContent::Text(user.to_string())
    } else {
      let mut parts = vec![ContentPart::Text { text: user.to_string() }];
      parts.extend(images.iter().map(|img| ContentPart::ImageUrl { image_url: ImageUrl { url: img.data_url() } }));
      MessageContent::Parts(parts)
    };
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: MessageContent::Text(system.to_string()) },
        ChatMessageReq { role: "user".into(), content: user_content },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "quizcraft-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), %status, "Model call failed");
      return Err(AppError::Upstream(format!("HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default();
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");

    if text.trim().is_empty() {
      return Err(AppError::Upstream("model returned an empty response".into()));
    }
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: MessageContent }
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
  Text(String),
  Parts(Vec<ContentPart>),
}
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
  Text { text: String },
  ImageUrl { image_url: ImageUrl },
}
#[derive(Serialize)]
struct ImageUrl { url: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_parts_serialize_as_data_urls() {
    let req = ChatMessageReq {
      role: "user".into(),
      content: MessageContent::Parts(vec![
        ContentPart::Text { text: "hi".into() },
        ContentPart::ImageUrl { image_url: ImageUrl { url: InlineImage { mime_type: "image/png".into(), data_base64: "AAA=".into() }.data_url() } },
      ]),
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["content"][0]["type"], "text");
    assert_eq!(v["content"][1]["type"], "image_url");
    assert_eq!(v["content"][1]["image_url"]["url"], "data:image/png;base64,AAA=");

    let plain = serde_json::to_value(ChatMessageReq { role: "system".into(), content: MessageContent::Text("s".into()) }).unwrap();
    assert_eq!(plain["content"], "s");
  }

  #[test]
  fn only_image_files_become_inline_images() {
    let files = vec![
      ProcessedFile { name: "a.png".into(), mime_type: "image/png".into(), kind: FileKind::Image, content: "AAA=".into() },
      ProcessedFile { name: "b.txt".into(), mime_type: "text/plain".into(), kind: FileKind::Text, content: "hello".into() },
    ];
    let imgs = InlineImage::from_files(&files);
    assert_eq!(imgs.len(), 1);
    assert_eq!(imgs[0].mime_type, "image/png");
  }

  #[test]
  fn error_body_message() {
    assert_eq!(
      extract_openai_error(r#"{"error": {"message": "bad key", "type": "auth"}}"#).as_deref(),
      Some("bad key")
    );
    assert_eq!(extract_openai_error("<html>"), None);
  }
}
