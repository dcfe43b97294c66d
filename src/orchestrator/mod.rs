//! Conversation orchestrator
//!
//! Holds the session's [`ConversationState`] and the four agents, and runs
//! the turn protocol:
//!
//! INPUT → DISPATCH(active agent) → RECORD → DECIDE → (ROUTE → DISPATCH)* → REPLY

use crate::agents::{
    AgentServices, AgentTurn, CreditLimitAgent, CurrencyAgent, DomainAgent, IntakeAgent, InterviewAgent,
};
use crate::models::AgentId;
use crate::state::{ConversationState, Signal};
use crate::transcript::MessageRole;
use tracing::{info, warn};

pub mod decision;
pub use decision::{decide_next_step, Decision, LoopGuard, RouteReason, TerminationCause, LOOP_GUARD_THRESHOLD};

/// Agent switches followed within one `process_message`
pub const MAX_HANDOFFS_PER_TURN: usize = 4;

const SESSION_CLOSED_REPLY: &str = "This conversation has ended. Please start a new session to continue.";
const LOOP_GUARD_REPLY: &str =
    "I'm having trouble following this conversation, so I'm going to end it here. Please start a new session if you need anything else.";

pub struct Orchestrator {
    state: ConversationState,
    intake: IntakeAgent,
    credit: CreditLimitAgent,
    interview: InterviewAgent,
    currency: CurrencyAgent,
    guard: LoopGuard,
}

impl Orchestrator {
    pub fn new(services: AgentServices) -> Self {
        Self {
            state: ConversationState::new(),
            intake: IntakeAgent::new(services.clone()),
            credit: CreditLimitAgent::new(services.clone()),
            interview: InterviewAgent::new(services.clone()),
            currency: CurrencyAgent::new(services),
            guard: LoopGuard::new(),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// The agent that will read the next utterance.
    pub fn select_entry_agent(&self) -> AgentId {
        self.state.active_agent
    }

    /// Process one utterance to completion and return the reply.
    pub async fn process_message(&mut self, text: &str) -> String {
        let text = text.trim();
        self.state.append_message(MessageRole::User, text, None);

        if !self.state.conversation_active {
            self.state
                .append_message(MessageRole::Assistant, SESSION_CLOSED_REPLY, Some(AgentId::Termination));
            return SESSION_CLOSED_REPLY.to_string();
        }

        self.state.current_user_message = text.to_string();

        let mut replies = Vec::new();
        let mut handoffs = 0;

        loop {
            let agent = self.select_entry_agent();
            let Some(turn) = self.dispatch(agent, text).await else {
                self.terminate(&mut replies, self.farewell());
                break;
            };

            self.state.append_message(MessageRole::Assistant, &turn.reply, Some(agent));
            if let Some(target) = turn.handoff {
                self.state.next_step = Some(target);
            }
            replies.push(turn.reply);

            let decision = decide_next_step(&mut self.state, turn.progress, &mut self.guard);
            info!(
                session_id = %self.state.session_id,
                agent = %agent,
                decision = ?decision,
                "Turn decided"
            );

            match decision {
                Decision::Await => break,
                Decision::Terminate {
                    cause: TerminationCause::SessionClosed,
                } => {
                    self.state.mark_inactive();
                    break;
                }
                Decision::Terminate {
                    cause: TerminationCause::LoopGuard,
                } => {
                    warn!(
                        session_id = %self.state.session_id,
                        agent = %agent,
                        stalled_turns = self.guard.stalled_turns(),
                        "Loop guard tripped"
                    );
                    self.terminate(&mut replies, LOOP_GUARD_REPLY.to_string());
                    break;
                }
                Decision::Route {
                    to: AgentId::Termination,
                    ..
                } => {
                    self.terminate(&mut replies, self.farewell());
                    break;
                }
                Decision::Route { to, reason } => {
                    handoffs += 1;
                    if handoffs > MAX_HANDOFFS_PER_TURN {
                        warn!(session_id = %self.state.session_id, handoffs, "Too many handoffs in one turn");
                        self.terminate(&mut replies, LOOP_GUARD_REPLY.to_string());
                        break;
                    }
                    if reason == RouteReason::Navigation && to == AgentId::Intake {
                        self.state.scratch.raise(Signal::ReturnedToMenu);
                    }
                    self.state.set_active_agent(to);
                }
            }
        }

        replies.join("\n\n")
    }

    /// Discard the session: fresh state, every agent's private state cleared.
    pub fn reset(&mut self) {
        info!(session_id = %self.state.session_id, "Session reset");
        self.state = ConversationState::new();
        self.intake.reset();
        self.credit.reset();
        self.interview.reset();
        self.currency.reset();
        self.guard.reset();
    }

    async fn dispatch(&mut self, agent: AgentId, text: &str) -> Option<AgentTurn> {
        let handler: &mut dyn DomainAgent = match agent {
            AgentId::Intake => &mut self.intake,
            AgentId::Credit => &mut self.credit,
            AgentId::Interview => &mut self.interview,
            AgentId::Currency => &mut self.currency,
            AgentId::Termination => return None,
        };
        Some(handler.process(text, &mut self.state).await)
    }

    fn farewell(&self) -> String {
        match &self.state.authenticated_customer {
            Some(customer) => format!(
                "Thank you for banking with us, {}. Goodbye!",
                crate::agents::first_name(customer)
            ),
            None => "Thank you for contacting us. Goodbye!".to_string(),
        }
    }

    fn terminate(&mut self, replies: &mut Vec<String>, message: String) {
        self.state
            .append_message(MessageRole::Assistant, &message, Some(AgentId::Termination));
        replies.push(message);
        self.state.mark_inactive();
    }
}
