// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Vision model client
//!
//! Sends the operator's goal and a screenshot to an OpenAI-compatible chat
//! completions endpoint and hands back the reply text untouched. No retry.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::config::ModelConfig;

pub const SYSTEM_PROMPT: &str = r#"You control a virtual machine. Look at the screenshot and carry out the user's request immediately.

Available commands:
- click(x,y) - Left click at coordinates
- rightclick(x,y) - Right click at coordinates
- type('text') - Type text
- key('name') - Press key (enter, space, escape, up, down, left, right, tab, delete)
- cmd('name') - Press Cmd+key

Always respond with JSON only:
{
  "explanation": "Brief description of what you are doing",
  "commands": ["command1", "command2"]
}

Rules:
- Use only the commands listed above, exactly as written
- Coordinates are screenshot pixels from the top-left corner
- If the user says "click at 0,0" return ["click(0,0)"]
- If nothing needs to be done return an empty commands list"#;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("API key not set, export {0}")]
    MissingApiKey(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed API response: {0}")]
    MalformedResponse(String),
}

/// Turns (goal, screenshot) into free-form reply text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, goal: &str, screenshot: &[u8]) -> Result<String, ModelError>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: ModelConfig, api_key: Option<String>) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Reads the credential from the environment variable the config names.
    pub fn from_env(config: ModelConfig) -> Result<Self, ModelError> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(config, api_key)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn request_body(&self, goal: &str, screenshot: &[u8]) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": goal},
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:image/png;base64,{}", BASE64.encode(screenshot))
                            }
                        }
                    ]
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        })
    }
}

/// Pull `choices[0].message.content` out of a completion response.
pub fn reply_content(response: &Value) -> Result<String, ModelError> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ModelError::MalformedResponse("missing choices[0].message.content".to_string())
        })
}

#[async_trait]
impl VisionModel for OpenAiClient {
    async fn complete(&self, goal: &str, screenshot: &[u8]) -> Result<String, ModelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ModelError::MissingApiKey(self.config.api_key_env.clone()))?;

        debug!(endpoint = %self.config.endpoint, model = %self.config.model, "requesting plan");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(goal, screenshot))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;
        reply_content(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: Option<&str>) -> OpenAiClient {
        OpenAiClient::new(ModelConfig::default(), api_key.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = client(Some("k")).request_body("open finder", b"img");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        let user = &body["messages"][1]["content"];
        assert_eq!(user[0]["text"], "open finder");
        assert_eq!(user[1]["image_url"]["url"], "data:image/png;base64,aW1n");
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_reply_content() {
        let response = json!({"choices": [{"message": {"content": "{\"commands\":[]}"}}]});
        assert_eq!(reply_content(&response).unwrap(), "{\"commands\":[]}");
    }

    #[test]
    fn test_reply_content_missing() {
        for response in [json!({}), json!({"choices": []}), json!({"choices": [{"message": {"content": 3}}]})] {
            assert!(matches!(
                reply_content(&response),
                Err(ModelError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        assert!(!client(Some("  ")).has_api_key());
        assert!(client(Some("sk-test")).has_api_key());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let err = client(None).complete("goal", b"img").await.unwrap_err();
        assert!(matches!(err, ModelError::MissingApiKey(ref var) if var == "OPENAI_API_KEY"));
    }
}
