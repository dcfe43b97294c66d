//! Domain agents
//!
//! Each agent interprets one utterance against the shared
//! [`ConversationState`] and answers with an [`AgentTurn`]. Handoffs are
//! part of that return value; the orchestrator turns them into routing.
//!
//! Shared protocol:
//! - first turn after being switched into: greet, never read the trigger
//! - one field per turn, re-ask on anything unparseable
//! - a turn that hands off never advances the agent's own step

use crate::config::{AppConfig, NarratorBackend, RateBackend};
use crate::directory::{ClientDirectory, FileClientDirectory};
use crate::models::{AgentId, Customer};
use crate::narrator::{AgentVoice, GeminiNarrator, Narrator, ScriptedNarrator};
use crate::rates::{ExchangeRateApiProvider, FixedRateProvider, RateProvider};
use crate::scoring::{ScoreEngine, WeightedScoreEngine};
use crate::state::ConversationState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub mod credit;
pub mod currency;
pub mod intake;
pub mod interview;

pub use credit::CreditLimitAgent;
pub use currency::CurrencyAgent;
pub use intake::IntakeAgent;
pub use interview::InterviewAgent;

/// Whether a turn moved the dialogue forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnProgress {
    Advanced,
    /// Clarification re-prompt or unrecognised input
    Stalled,
}

/// Result of one agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTurn {
    pub reply: String,
    pub handoff: Option<AgentId>,
    pub progress: TurnProgress,
}

impl AgentTurn {
    pub fn advanced(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            handoff: None,
            progress: TurnProgress::Advanced,
        }
    }

    pub fn stalled(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            handoff: None,
            progress: TurnProgress::Stalled,
        }
    }

    pub fn handoff(reply: impl Into<String>, target: AgentId) -> Self {
        Self {
            reply: reply.into(),
            handoff: Some(target),
            progress: TurnProgress::Advanced,
        }
    }
}

/// Trait every domain agent implements
#[async_trait]
pub trait DomainAgent: Send + Sync {
    async fn process(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn;

    /// Clear private dialogue state and the voice history.
    fn reset(&mut self);
}

/// Collaborators shared by all agents of all sessions.
#[derive(Clone)]
pub struct AgentServices {
    pub directory: Arc<dyn ClientDirectory>,
    pub rates: Arc<dyn RateProvider>,
    pub scoring: Arc<dyn ScoreEngine>,
    pub narrator: Arc<dyn Narrator>,
    pub local_currency: String,
    pub base_currency: String,
}

impl AgentServices {
    /// Wire the configured backends. Fails only on start-up problems.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let directory: Arc<dyn ClientDirectory> =
            Arc::new(FileClientDirectory::open(&config.client_directory_path).await?);

        let rates: Arc<dyn RateProvider> = match config.rate_provider {
            RateBackend::Http => Arc::new(ExchangeRateApiProvider::new(
                config.exchange_rate_api_url.clone(),
                config.rate_timeout,
            )?),
            RateBackend::Fixed => Arc::new(FixedRateProvider::default()),
        };

        let narrator: Arc<dyn Narrator> = match config.narrator {
            NarratorBackend::Scripted => Arc::new(ScriptedNarrator),
            NarratorBackend::Gemini => Arc::new(GeminiNarrator::new(
                config.gemini_api_key.clone().unwrap_or_default(),
            )?),
        };

        info!(
            directory = %config.client_directory_path.display(),
            rates = ?config.rate_provider,
            narrator = ?config.narrator,
            local_currency = %config.local_currency,
            "Agent services initialized"
        );

        Ok(Self {
            directory,
            rates,
            scoring: Arc::new(WeightedScoreEngine),
            narrator,
            local_currency: config.local_currency.clone(),
            base_currency: config.base_currency.clone(),
        })
    }

    pub fn voice(&self, agent: AgentId) -> AgentVoice {
        AgentVoice::new(agent, self.narrator.clone())
    }
}

/// Phrase the draft reply of `turn` in the agent's voice.
pub(crate) async fn speak(voice: &mut AgentVoice, text: &str, turn: AgentTurn) -> AgentTurn {
    let reply = voice.say(text, turn.reply).await;
    AgentTurn { reply, ..turn }
}

/// Domain agents bail out to Intake when nobody is authenticated.
pub(crate) fn require_customer(agent: AgentId, state: &ConversationState) -> std::result::Result<Customer, AgentTurn> {
    state.authenticated_customer.clone().ok_or_else(|| {
        warn!(agent = %agent, "Domain agent reached without an authenticated customer");
        AgentTurn::handoff(
            "I need to confirm your identity before I can help with that. Let me take you back to reception.",
            AgentId::Intake,
        )
    })
}

/// First name for friendly replies
pub(crate) fn first_name(customer: &Customer) -> &str {
    customer.name.split_whitespace().next().unwrap_or(&customer.name)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures: in-memory directory, fixed rates, scripted narrator.

    use super::*;
    use crate::directory::InMemoryClientDirectory;
    use crate::error::OrchestrationError;
    use crate::models::{LimitRequest, RateQuote};
    use chrono::NaiveDate;

    pub fn ana() -> Customer {
        Customer {
            id: "12345678901".to_string(),
            name: "Ana Souza".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 5, 15).unwrap(),
            credit_limit: 5000.0,
            credit_score: 750.0,
        }
    }

    pub fn bruno() -> Customer {
        Customer {
            id: "98765432109".to_string(),
            name: "Bruno Lima".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1985, 8, 22).unwrap(),
            credit_limit: 2000.0,
            credit_score: 420.0,
        }
    }

    pub fn directory() -> Arc<InMemoryClientDirectory> {
        Arc::new(InMemoryClientDirectory::with_customers(vec![ana(), bruno()]))
    }

    pub fn services_with(directory: Arc<dyn ClientDirectory>) -> AgentServices {
        AgentServices {
            directory,
            rates: Arc::new(FixedRateProvider::default()),
            scoring: Arc::new(WeightedScoreEngine),
            narrator: Arc::new(ScriptedNarrator),
            local_currency: "BRL".to_string(),
            base_currency: "USD".to_string(),
        }
    }

    pub fn services() -> AgentServices {
        services_with(directory())
    }

    pub fn authenticated_state(customer: Customer) -> ConversationState {
        let mut state = ConversationState::new();
        state.record_auth_success(customer);
        state
    }

    /// Every call fails.
    pub struct OfflineDirectory;

    #[async_trait]
    impl ClientDirectory for OfflineDirectory {
        async fn authenticate(&self, _id: &str, _birthdate: NaiveDate) -> Result<Option<Customer>> {
            Err(OrchestrationError::DirectoryError("offline".to_string()))
        }

        async fn get_by_id(&self, _id: &str) -> Result<Option<Customer>> {
            Err(OrchestrationError::DirectoryError("offline".to_string()))
        }

        async fn max_limit_for_score(&self, _score: f64) -> Result<Option<f64>> {
            Err(OrchestrationError::DirectoryError("offline".to_string()))
        }

        async fn update_limit(&self, _id: &str, _limit: f64) -> Result<()> {
            Err(OrchestrationError::DirectoryError("offline".to_string()))
        }

        async fn update_score(&self, _id: &str, _score: f64) -> Result<()> {
            Err(OrchestrationError::DirectoryError("offline".to_string()))
        }

        async fn record_limit_request(&self, _request: LimitRequest) -> Result<()> {
            Err(OrchestrationError::DirectoryError("offline".to_string()))
        }
    }

    pub struct OfflineRates;

    #[async_trait]
    impl RateProvider for OfflineRates {
        async fn get_rate(&self, _from: &str, _to: &str) -> Result<Option<RateQuote>> {
            Err(OrchestrationError::RateProviderError("timeout".to_string()))
        }
    }
}
