//! Gemini narrator
//!
//! Rephrases scripted drafts through the Gemini API.
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{NarrationRequest, Narrator};
use crate::error::OrchestrationError;
use crate::models::AgentId;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiNarrator {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiNarrator {
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(OrchestrationError::ConfigError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_URL.to_string(),
        })
    }

    fn build_request(request: &NarrationRequest<'_>) -> GeminiRequest {
        let mut contents = Vec::with_capacity(request.history.len() * 2 + 1);
        for turn in request.history {
            contents.push(Content::text("user", &turn.user));
            contents.push(Content::text("model", &turn.reply));
        }
        contents.push(Content::text(
            "user",
            &format!(
                "Customer said: {}\n\nDraft reply:\n{}",
                request.user_text, request.draft
            ),
        ));

        GeminiRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: request.profile.temperature,
                top_p: request.profile.top_p,
                top_k: 40,
                max_output_tokens: request.profile.max_tokens,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: build_system_prompt(request.agent),
                }],
            },
        }
    }
}

#[async_trait]
impl Narrator for GeminiNarrator {
    async fn narrate(&self, request: &NarrationRequest<'_>) -> Result<String> {
        let url = format!("{}?key={}", self.base_url, self.api_key);
        let body = Self::build_request(request);

        debug!(agent = %request.agent, "Calling Gemini API");

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            error!("Gemini API request failed: {}", e);
            OrchestrationError::NarratorError(format!("Gemini API error: {}", e))
        })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(OrchestrationError::NarratorError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            OrchestrationError::NarratorError(format!("Gemini parse error: {}", e))
        })?;

        gemini_response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.trim().to_string())
            .ok_or_else(|| OrchestrationError::NarratorError("Empty response from Gemini".to_string()))
    }
}

/// System prompt for one agent's voice
fn build_system_prompt(agent: AgentId) -> String {
    let role = match agent {
        AgentId::Intake => "the bank's reception assistant, who authenticates customers and presents the service menu",
        AgentId::Credit => "the bank's credit desk, who explains limits and handles limit increase requests",
        AgentId::Interview => "the bank's financial interviewer, who asks one question at a time to reassess a credit score",
        AgentId::Currency => "the bank's currency desk, who reports exchange rates",
        AgentId::Termination => "the bank's assistant, closing the conversation",
    };

    format!(
        r#"You are {}.

Guidelines:
- Rewrite the draft reply in a warm, professional tone
- Keep every number, amount, date, currency code and menu option exactly as written
- Never add offers, options or questions that are not in the draft
- Ask at most the one question the draft asks
- Be concise"#,
        role
    )
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrator::{AgentProfile, DialogueTurn};

    #[test]
    fn test_missing_key_is_a_config_error() {
        let result = GeminiNarrator::new("  ".to_string());
        assert!(matches!(result, Err(OrchestrationError::ConfigError(_))));
    }

    #[test]
    fn test_request_carries_history_profile_and_draft() {
        let history = vec![DialogueTurn {
            user: "hi".to_string(),
            reply: "Welcome!".to_string(),
        }];
        let request = NarrationRequest {
            agent: AgentId::Credit,
            profile: AgentProfile::for_agent(AgentId::Credit),
            history: &history,
            user_text: "8000",
            draft: "Approved: new limit 8,000.00",
        };

        let body = GeminiNarrator::build_request(&request);
        assert_eq!(body.contents.len(), 3);
        assert_eq!(body.contents[1].role.as_deref(), Some("model"));
        assert_eq!(body.generation_config.max_output_tokens, 250);

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("Approved: new limit 8,000.00"));
        assert!(json.contains("credit desk"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":" Hello! "}]},"finishReason":"STOP"}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, " Hello! ");
    }
}
