//! Script and metadata writing through an OpenAI-compatible chat API.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result, Scene, ScriptEntry, Topic};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, ScriptBrief, ScriptWriter};
use crate::config::ScriptConfig;
use crate::versions::UploadMetadata;

const SCRIPT_SYSTEM_PROMPT: &str = "\
You write scripts for short narrated videos and answer with JSON only.
The user gives the total duration and the number of segments. Return a JSON
array with exactly that many objects, one per segment, each with:
- \"dialogue\": one spoken line of 15 to 20 words that fits the segment length
- \"visualPrompt\": a detailed scene description for an image generator
  (setting, lighting, mood, composition)
- \"voiceTone\": a single word describing the delivery, such as calm or excited
Do not wrap the array in markdown and do not add any text around it.";

const METADATA_SYSTEM_PROMPT: &str = "\
You write titles and descriptions for short news videos and answer with JSON only.
Return one object with two string fields:
- \"title\": 50 to 70 characters, specific and attention-grabbing
- \"description\": 150 to 200 words with a strong opening line, a summary of
  the story, a call to action and three to five hashtags at the end
Do not wrap the object in markdown and do not add any text around it.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct MetadataAnswer {
    title: String,
    description: String,
}

pub struct ChatScriptWriter {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: String,
}

impl ChatScriptWriter {
    pub fn new(config: &ScriptConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(config.timeout_secs)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key: api_key.into(),
        }
    }

    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::http(format!("chat completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(format!("chat completion returned {status}: {body}")));
        }

        let answer: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::http(format!("invalid chat completion response: {e}")))?;
        Ok(answer
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ScriptWriter for ChatScriptWriter {
    async fn write_script(&self, brief: &ScriptBrief) -> Result<Vec<ScriptEntry>> {
        let user = format!(
            "{}\nSegments: {} of {} seconds each.",
            brief.text(),
            brief.scene_count,
            brief.duration_secs / brief.scene_count.max(1)
        );
        let raw = self.complete(SCRIPT_SYSTEM_PROMPT, &user, self.max_tokens).await?;
        let scenes = parse_scenes(&raw);
        tracing::info!(scenes = scenes.len(), "Script generated");
        Ok(scenes)
    }

    async fn write_metadata(&self, topic: &Topic, scenes: &[Scene]) -> Result<UploadMetadata> {
        let narration: Vec<&str> = scenes.iter().map(|s| s.dialogue.as_str()).collect();
        let user = format!(
            "Video about {}. Context: {}\nNarration: {}",
            topic.title,
            topic.description,
            narration.join(" ")
        );
        let raw = self
            .complete(METADATA_SYSTEM_PROMPT, &user, self.max_tokens.min(1024))
            .await?;

        let answer: MetadataAnswer = serde_json::from_str(extract_json(&raw, '{', '}'))
            .map_err(|e| Error::http(format!("metadata answer is not valid JSON: {e}")))?;
        Ok(UploadMetadata::new(answer.title, answer.description))
    }
}

/// Scene entries from a model answer; anything unparsable is an empty list.
pub fn parse_scenes(raw: &str) -> Vec<ScriptEntry> {
    match serde_json::from_str::<Vec<ScriptEntry>>(extract_json(raw, '[', ']')) {
        Ok(entries) => entries
            .into_iter()
            .filter(|e| !e.dialogue.trim().is_empty())
            .collect(),
        Err(e) => {
            tracing::warn!("Script answer is not a JSON scene array: {e}");
            tracing::debug!("Raw answer: {raw}");
            Vec::new()
        }
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Strip markdown fences, then cut to the outermost `open`..`close` span.
pub fn extract_json(raw: &str, open: char, close: char) -> &str {
    let mut body = raw.trim();
    if let Some(inner) = fence_regex().captures(body).and_then(|c| c.get(1)) {
        body = inner.as_str();
    }
    match (body.find(open), body.rfind(close)) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    }
}
