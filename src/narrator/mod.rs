//! Language-generation backend
//!
//! Agents decide *what* to say with a scripted draft; a `Narrator` decides
//! *how* to say it. The scripted narrator returns the draft untouched, the
//! Gemini narrator rephrases it. Decisions never depend on narration.

use crate::models::AgentId;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub mod gemini;
pub use gemini::GeminiNarrator;

/// Dialogue turns kept per agent for narration context
const MAX_VOICE_HISTORY: usize = 20;

/// Sampling parameters for one agent's voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentProfile {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl AgentProfile {
    pub fn for_agent(agent: AgentId) -> Self {
        let (temperature, top_p, max_tokens) = match agent {
            AgentId::Intake => (0.3, 0.9, 200),
            AgentId::Credit => (0.4, 0.85, 250),
            AgentId::Interview => (0.7, 0.95, 300),
            AgentId::Currency => (0.2, 0.8, 150),
            AgentId::Termination => (0.3, 0.9, 100),
        };
        Self {
            temperature,
            top_p,
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueTurn {
    pub user: String,
    pub reply: String,
}

/// Everything a narrator may use to phrase one reply.
pub struct NarrationRequest<'a> {
    pub agent: AgentId,
    pub profile: AgentProfile,
    pub history: &'a [DialogueTurn],
    pub user_text: &'a str,
    pub draft: &'a str,
}

/// Trait for reply phrasing
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, request: &NarrationRequest<'_>) -> Result<String>;
}

/// Returns every draft verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedNarrator;

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn narrate(&self, request: &NarrationRequest<'_>) -> Result<String> {
        Ok(request.draft.to_string())
    }
}

/// One agent's voice: its narrator plus the private dialogue buffer.
pub struct AgentVoice {
    agent: AgentId,
    profile: AgentProfile,
    narrator: Arc<dyn Narrator>,
    history: Vec<DialogueTurn>,
}

impl AgentVoice {
    pub fn new(agent: AgentId, narrator: Arc<dyn Narrator>) -> Self {
        Self {
            agent,
            profile: AgentProfile::for_agent(agent),
            narrator,
            history: Vec::new(),
        }
    }

    /// Phrase `draft`, falling back to it verbatim when narration fails.
    pub async fn say(&mut self, user_text: &str, draft: String) -> String {
        let request = NarrationRequest {
            agent: self.agent,
            profile: self.profile,
            history: &self.history,
            user_text,
            draft: &draft,
        };

        let reply = match self.narrator.narrate(&request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => draft,
            Err(e) => {
                warn!(agent = %self.agent, error = %e, "Narration failed, using draft");
                draft
            }
        };

        self.history.push(DialogueTurn {
            user: user_text.to_string(),
            reply: reply.clone(),
        });
        if self.history.len() > MAX_VOICE_HISTORY {
            let excess = self.history.len() - MAX_VOICE_HISTORY;
            self.history.drain(..excess);
        }

        reply
    }

    pub fn history(&self) -> &[DialogueTurn] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
