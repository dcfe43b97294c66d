//! Shared conversation state
//!
//! One `ConversationState` lives for the whole session and is threaded
//! through every agent by the orchestrator. Cross-agent flags travel as
//! typed [`Signal`]s: raised by one turn, taken (read and cleared) by a
//! later one.

use crate::models::{AgentId, Customer};
use crate::transcript::{ConversationMessage, MessageRole, Transcript};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failed authentications allowed before the session is closed
pub const MAX_AUTH_ATTEMPTS: u8 = 3;

//
// ================= Signals =================
//

/// Named cross-agent signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    /// Control is being handed back to the menu; Intake must redisplay it
    /// instead of reading the utterance as a menu choice.
    ReturnedToMenu,
    /// A limit increase was just approved; Intake offers the reduced menu.
    CreditApproved,
    /// The reduced menu (no credit option) is on screen.
    ReducedMenu,
    /// A limit request was rejected and the three options are pending.
    RejectionOptionsPending { max_limit: f64 },
    /// The interview finished; its next turn returns to the menu.
    InterviewCompleted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    ReturnedToMenu,
    CreditApproved,
    ReducedMenu,
    RejectionOptionsPending,
    InterviewCompleted,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::ReturnedToMenu => SignalKind::ReturnedToMenu,
            Signal::CreditApproved => SignalKind::CreditApproved,
            Signal::ReducedMenu => SignalKind::ReducedMenu,
            Signal::RejectionOptionsPending { .. } => SignalKind::RejectionOptionsPending,
            Signal::InterviewCompleted => SignalKind::InterviewCompleted,
        }
    }
}

/// Bag of pending signals, at most one per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scratch {
    signals: Vec<Signal>,
}

impl Scratch {
    /// Raise a signal, replacing any pending signal of the same kind.
    pub fn raise(&mut self, signal: Signal) {
        self.signals.retain(|s| s.kind() != signal.kind());
        self.signals.push(signal);
    }

    /// Read and clear a signal.
    pub fn take(&mut self, kind: SignalKind) -> Option<Signal> {
        let index = self.signals.iter().position(|s| s.kind() == kind)?;
        Some(self.signals.remove(index))
    }

    pub fn peek(&self, kind: SignalKind) -> Option<&Signal> {
        self.signals.iter().find(|s| s.kind() == kind)
    }

    pub fn is_raised(&self, kind: SignalKind) -> bool {
        self.peek(kind).is_some()
    }

    pub fn clear(&mut self, kind: SignalKind) {
        self.signals.retain(|s| s.kind() != kind);
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

//
// ================= Transitions =================
//

/// Which agent handled the previous turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentTransitionContext {
    pub previous_agent: Option<AgentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTransition {
    pub from: AgentId,
    pub to: AgentId,
    pub at: DateTime<Utc>,
}

//
// ================= Conversation State =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: Uuid,
    pub messages: Transcript,
    pub current_user_message: String,
    pub active_agent: AgentId,
    /// Forced route for the next decision; consumed by the orchestrator.
    pub next_step: Option<AgentId>,
    pub conversation_active: bool,
    pub authenticated_customer: Option<Customer>,
    pub auth_attempts: u8,
    pub scratch: Scratch,
    pub agent_context: AgentTransitionContext,
    pub transitions: Vec<AgentTransition>,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            messages: Transcript::new(),
            current_user_message: String::new(),
            active_agent: AgentId::Intake,
            next_step: None,
            conversation_active: true,
            authenticated_customer: None,
            auth_attempts: 0,
            scratch: Scratch::default(),
            agent_context: AgentTransitionContext::default(),
            transitions: Vec::new(),
            started_at: now,
            last_message_at: now,
        }
    }

    pub fn append_message(&mut self, role: MessageRole, text: &str, agent: Option<AgentId>) {
        let message = self
            .messages
            .push(ConversationMessage::new(role, text, agent));
        self.last_message_at = message.timestamp;
    }

    /// Switch the active agent, recording the transition.
    pub fn set_active_agent(&mut self, agent: AgentId) {
        if self.active_agent != agent {
            self.transitions.push(AgentTransition {
                from: self.active_agent,
                to: agent,
                at: Utc::now(),
            });
        }
        self.active_agent = agent;
    }

    /// Marks `agent` as the handler of the current turn and reports whether
    /// it was just switched into (a different agent handled the last turn).
    pub fn claim_turn(&mut self, agent: AgentId) -> bool {
        let first_entry = self.agent_context.previous_agent != Some(agent);
        self.agent_context.previous_agent = Some(agent);
        first_entry
    }

    /// Count a failed authentication and return the new total.
    pub fn record_auth_failure(&mut self) -> u8 {
        self.auth_attempts = (self.auth_attempts + 1).min(MAX_AUTH_ATTEMPTS);
        self.auth_attempts
    }

    pub fn auth_exhausted(&self) -> bool {
        self.auth_attempts >= MAX_AUTH_ATTEMPTS
    }

    pub fn remaining_auth_attempts(&self) -> u8 {
        MAX_AUTH_ATTEMPTS.saturating_sub(self.auth_attempts)
    }

    /// Set once per session. The attempt counter is left as is.
    pub fn record_auth_success(&mut self, customer: Customer) {
        self.authenticated_customer = Some(customer);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated_customer.is_some()
    }

    /// End the session for good.
    pub fn mark_inactive(&mut self) {
        self.conversation_active = false;
        self.set_active_agent(AgentId::Termination);
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
