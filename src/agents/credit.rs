//! Credit limit agent: limit consultation and increase requests

use super::{require_customer, speak, AgentServices, AgentTurn, DomainAgent};
use crate::extract::{contains_any_word, words, CreditAmountExtractor, Extractor};
use crate::intent::{navigation_intent, RejectionChoice, RejectionClassifier};
use crate::models::{format_money, AgentId, Customer, LimitRequest, LimitRequestStatus};
use crate::narrator::AgentVoice;
use crate::state::{ConversationState, Signal, SignalKind};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

const INCREASE_KEYWORDS: &[&str] = &["increase", "raise", "request", "more", "higher", "bigger"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreditStage {
    Consulting,
    CollectingAmount,
}

pub struct CreditLimitAgent {
    services: AgentServices,
    voice: AgentVoice,
    stage: CreditStage,
    amounts: CreditAmountExtractor,
}

impl CreditLimitAgent {
    pub fn new(services: AgentServices) -> Self {
        Self {
            voice: services.voice(AgentId::Credit),
            services,
            stage: CreditStage::Consulting,
            amounts: CreditAmountExtractor::default(),
        }
    }

    async fn respond(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let first_entry = state.claim_turn(AgentId::Credit);
        let customer = match require_customer(AgentId::Credit, state) {
            Ok(customer) => customer,
            Err(turn) => return turn,
        };

        if first_entry {
            self.stage = CreditStage::Consulting;
            state.scratch.clear(SignalKind::RejectionOptionsPending);
            return AgentTurn::advanced(format!(
                "Your current credit limit is {} and your credit score is {:.0}.\n\nWould you like to request a limit increase? Just tell me the new limit you'd like.",
                format_money(customer.credit_limit),
                customer.credit_score
            ));
        }

        if navigation_intent(text).is_some() {
            self.stage = CreditStage::Consulting;
            state.scratch.clear(SignalKind::RejectionOptionsPending);
            return AgentTurn::advanced("Sure.");
        }

        if let Some(Signal::RejectionOptionsPending { max_limit }) =
            state.scratch.peek(SignalKind::RejectionOptionsPending).copied()
        {
            return self.resolve_rejection(text, &customer, max_limit, state).await;
        }

        if self.stage == CreditStage::CollectingAmount {
            return match self.amounts.extract(text) {
                Some(amount) => self.evaluate(&customer, amount, state).await,
                None => AgentTurn::stalled(
                    "Please tell me the new limit you'd like as a number, for example 8000.",
                ),
            };
        }

        let asks_for_increase = contains_any_word(&words(text), INCREASE_KEYWORDS);
        match self.amounts.extract(text) {
            Some(amount) => self.evaluate(&customer, amount, state).await,
            None if asks_for_increase => {
                self.stage = CreditStage::CollectingAmount;
                AgentTurn::advanced(format!(
                    "Sure. Your current limit is {}. What new limit would you like?",
                    format_money(customer.credit_limit)
                ))
            }
            None => AgentTurn::stalled(format!(
                "Your current limit is {}. To request an increase, tell me the new limit you'd like, or say \"menu\" to go back.",
                format_money(customer.credit_limit)
            )),
        }
    }

    async fn evaluate(&mut self, customer: &Customer, amount: f64, state: &mut ConversationState) -> AgentTurn {
        self.stage = CreditStage::CollectingAmount;

        if amount <= customer.credit_limit {
            return AgentTurn::advanced(format!(
                "The new limit must be higher than your current limit of {}. What amount would you like?",
                format_money(customer.credit_limit)
            ));
        }

        let max_limit = match self.services.directory.max_limit_for_score(customer.credit_score).await {
            Ok(Some(max_limit)) => max_limit,
            Ok(None) => {
                warn!(score = customer.credit_score, "No score tier covers the customer's score");
                self.stage = CreditStage::Consulting;
                state.scratch.raise(Signal::ReturnedToMenu);
                return AgentTurn::handoff(
                    "Sorry, I couldn't find a limit policy for your current score. Please contact your branch. Taking you back to the menu.",
                    AgentId::Intake,
                );
            }
            Err(e) => {
                warn!(error = %e, "Score tier lookup failed");
                return AgentTurn::advanced(
                    "Sorry, I couldn't check the limits available for your score right now. Please send the amount again in a moment.",
                );
            }
        };

        if amount <= max_limit {
            return match self.approve(customer, amount, state).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(error = %e, "Failed to persist approved limit");
                    AgentTurn::advanced(
                        "Your request qualifies, but I couldn't save the new limit right now. Please send the amount again in a moment.",
                    )
                }
            };
        }

        info!(
            session_id = %state.session_id,
            customer_id = %customer.id,
            requested = amount,
            max_limit,
            "Limit increase rejected"
        );
        self.record(customer, amount, LimitRequestStatus::Rejected).await;
        self.stage = CreditStage::Consulting;
        state.scratch.raise(Signal::RejectionOptionsPending { max_limit });

        AgentTurn::advanced(format!(
            "I'm sorry, a limit of {} is above the maximum of {} available for your current score ({:.0}).\n\n{}",
            format_money(amount),
            format_money(max_limit),
            customer.credit_score,
            rejection_options(max_limit)
        ))
    }

    async fn resolve_rejection(
        &mut self,
        text: &str,
        customer: &Customer,
        max_limit: f64,
        state: &mut ConversationState,
    ) -> AgentTurn {
        let Some(choice) = RejectionClassifier::classify(text) else {
            return AgentTurn::stalled(format!("Please choose one of the options:\n\n{}", rejection_options(max_limit)));
        };
        state.scratch.take(SignalKind::RejectionOptionsPending);
        info!(session_id = %state.session_id, ?choice, "Rejection option chosen");

        match choice {
            RejectionChoice::Decline => {
                state.scratch.raise(Signal::ReturnedToMenu);
                AgentTurn::handoff(
                    format!(
                        "No problem, your limit stays at {}. Taking you back to the menu.",
                        format_money(customer.credit_limit)
                    ),
                    AgentId::Intake,
                )
            }
            RejectionChoice::Interview => AgentTurn::handoff(
                "Great, a financial interview may improve your score. Connecting you now.",
                AgentId::Interview,
            ),
            RejectionChoice::AcceptMaximum if max_limit <= customer.credit_limit => {
                state.scratch.raise(Signal::ReturnedToMenu);
                AgentTurn::handoff(
                    format!(
                        "Your current limit of {} is already the maximum available for your score. Taking you back to the menu.",
                        format_money(customer.credit_limit)
                    ),
                    AgentId::Intake,
                )
            }
            RejectionChoice::AcceptMaximum => match self.approve(customer, max_limit, state).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(error = %e, "Failed to persist maximum limit");
                    state.scratch.raise(Signal::RejectionOptionsPending { max_limit });
                    AgentTurn::advanced(
                        "Sorry, I couldn't save the new limit right now. Please choose an option again in a moment.",
                    )
                }
            },
        }
    }

    /// Persist `new_limit` and hand back to the menu with the approval flag.
    async fn approve(&mut self, customer: &Customer, new_limit: f64, state: &mut ConversationState) -> Result<AgentTurn> {
        self.services.directory.update_limit(&customer.id, new_limit).await?;
        self.record(customer, new_limit, LimitRequestStatus::Approved).await;

        info!(
            session_id = %state.session_id,
            customer_id = %customer.id,
            previous = customer.credit_limit,
            new_limit,
            "Limit increase approved"
        );

        if let Some(current) = state.authenticated_customer.as_mut() {
            current.credit_limit = new_limit;
        }
        self.stage = CreditStage::Consulting;
        state.scratch.raise(Signal::CreditApproved);
        state.scratch.raise(Signal::ReturnedToMenu);

        Ok(AgentTurn::handoff(
            format!(
                "Good news! Your credit limit has been increased from {} to {}.",
                format_money(customer.credit_limit),
                format_money(new_limit)
            ),
            AgentId::Intake,
        ))
    }

    async fn record(&self, customer: &Customer, requested_limit: f64, status: LimitRequestStatus) {
        let request = LimitRequest {
            customer_id: customer.id.clone(),
            requested_at: Utc::now(),
            current_limit: customer.credit_limit,
            requested_limit,
            status,
        };
        if let Err(e) = self.services.directory.record_limit_request(request).await {
            warn!(error = %e, "Failed to record limit request");
        }
    }
}

fn rejection_options(max_limit: f64) -> String {
    format!(
        "You can:\n1. Do a financial interview to try to improve your score\n2. Accept the maximum limit of {} now\n3. Keep your current limit and return to the menu",
        format_money(max_limit)
    )
}

#[async_trait]
impl DomainAgent for CreditLimitAgent {
    async fn process(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let turn = self.respond(text, state).await;
        speak(&mut self.voice, text, turn).await
    }

    fn reset(&mut self) {
        self.stage = CreditStage::Consulting;
        self.voice.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{ana, authenticated_state, bruno, directory, services_with, OfflineDirectory};
    use crate::agents::TurnProgress;
    use crate::directory::{ClientDirectory, InMemoryClientDirectory};
    use std::sync::Arc;

    async fn entered(directory: Arc<InMemoryClientDirectory>) -> (CreditLimitAgent, ConversationState) {
        let mut agent = CreditLimitAgent::new(services_with(directory));
        let mut state = authenticated_state(ana());
        let turn = agent.process("1", &mut state).await;
        assert!(turn.reply.contains("5,000.00"));
        assert!(turn.reply.contains("750"));
        assert!(turn.handoff.is_none());
        (agent, state)
    }

    #[tokio::test]
    async fn test_approval_within_tier_persists_and_returns_to_menu() {
        let directory = directory();
        let (mut agent, mut state) = entered(directory.clone()).await;

        let turn = agent.process("8000", &mut state).await;
        assert_eq!(turn.handoff, Some(AgentId::Intake));
        assert!(turn.reply.contains("8,000.00"));

        let persisted = directory.get_by_id("12345678901").await.unwrap().unwrap();
        assert_eq!(persisted.credit_limit, 8000.0);
        assert_eq!(state.authenticated_customer.as_ref().unwrap().credit_limit, 8000.0);
        assert!(state.scratch.is_raised(SignalKind::CreditApproved));
        assert!(state.scratch.is_raised(SignalKind::ReturnedToMenu));

        let ledger = directory.snapshot().await.limit_requests;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].status, LimitRequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_intent_then_amount() {
        let (mut agent, mut state) = entered(directory()).await;

        let turn = agent.process("I'd like to increase it", &mut state).await;
        assert!(turn.reply.contains("What new limit"));
        assert_eq!(agent.stage, CreditStage::CollectingAmount);

        let turn = agent.process("2", &mut state).await;
        assert_eq!(turn.progress, TurnProgress::Stalled);

        let turn = agent.process("R$ 12.000,00", &mut state).await;
        assert_eq!(turn.handoff, Some(AgentId::Intake));
    }

    #[tokio::test]
    async fn test_amount_not_above_current_is_invalid() {
        let directory = directory();
        let (mut agent, mut state) = entered(directory.clone()).await;

        let turn = agent.process("4000", &mut state).await;
        assert!(turn.reply.contains("higher than your current limit"));
        assert!(turn.handoff.is_none());
        assert!(directory.snapshot().await.limit_requests.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_offers_three_options() {
        let directory = directory();
        let (mut agent, mut state) = entered(directory.clone()).await;

        let turn = agent.process("25000", &mut state).await;
        assert!(turn.reply.contains("20,000.00"));
        assert!(turn.reply.contains("1. "));
        assert!(turn.reply.contains("2. "));
        assert!(turn.reply.contains("3. "));
        assert_eq!(
            state.scratch.peek(SignalKind::RejectionOptionsPending),
            Some(&Signal::RejectionOptionsPending { max_limit: 20000.0 })
        );
        assert_eq!(directory.snapshot().await.limit_requests[0].status, LimitRequestStatus::Rejected);
        assert_eq!(directory.get_by_id("12345678901").await.unwrap().unwrap().credit_limit, 5000.0);
    }

    #[tokio::test]
    async fn test_rejection_option_interview() {
        let (mut agent, mut state) = entered(directory()).await;
        agent.process("25000", &mut state).await;

        let turn = agent.process("1", &mut state).await;
        assert_eq!(turn.handoff, Some(AgentId::Interview));
        assert!(!state.scratch.is_raised(SignalKind::RejectionOptionsPending));
    }

    #[tokio::test]
    async fn test_rejection_option_accept_maximum() {
        let directory = directory();
        let (mut agent, mut state) = entered(directory.clone()).await;
        agent.process("25000", &mut state).await;

        let turn = agent.process("I'll take the maximum", &mut state).await;
        assert_eq!(turn.handoff, Some(AgentId::Intake));
        assert_eq!(directory.get_by_id("12345678901").await.unwrap().unwrap().credit_limit, 20000.0);
        assert!(state.scratch.is_raised(SignalKind::CreditApproved));
    }

    #[tokio::test]
    async fn test_rejection_decline_wins_over_positive_words() {
        let directory = directory();
        let (mut agent, mut state) = entered(directory.clone()).await;
        agent.process("25000", &mut state).await;

        let turn = agent.process("no, I don't want to accept the maximum", &mut state).await;
        assert_eq!(turn.handoff, Some(AgentId::Intake));
        assert!(state.scratch.is_raised(SignalKind::ReturnedToMenu));
        assert!(!state.scratch.is_raised(SignalKind::CreditApproved));
        assert_eq!(directory.get_by_id("12345678901").await.unwrap().unwrap().credit_limit, 5000.0);
    }

    #[tokio::test]
    async fn test_unclear_rejection_answer_repeats_options() {
        let (mut agent, mut state) = entered(directory()).await;
        agent.process("25000", &mut state).await;

        let turn = agent.process("hmm", &mut state).await;
        assert_eq!(turn.progress, TurnProgress::Stalled);
        assert!(state.scratch.is_raised(SignalKind::RejectionOptionsPending));
    }

    #[tokio::test]
    async fn test_accept_maximum_below_current_limit() {
        let mut agent = CreditLimitAgent::new(services_with(directory()));
        let mut customer = bruno();
        customer.credit_limit = 3500.0;
        let mut state = authenticated_state(customer);
        agent.process("1", &mut state).await;

        let turn = agent.process("5000", &mut state).await;
        assert!(turn.reply.contains("3,000.00"));

        let turn = agent.process("2", &mut state).await;
        assert!(turn.reply.contains("already the maximum"));
        assert_eq!(turn.handoff, Some(AgentId::Intake));
        assert!(!state.scratch.is_raised(SignalKind::CreditApproved));
    }

    #[tokio::test]
    async fn test_missing_customer_goes_back_to_intake() {
        let mut agent = CreditLimitAgent::new(services_with(directory()));
        let mut state = ConversationState::new();
        let turn = agent.process("8000", &mut state).await;
        assert_eq!(turn.handoff, Some(AgentId::Intake));
    }

    #[tokio::test]
    async fn test_directory_failure_is_apologetic() {
        let mut agent = CreditLimitAgent::new(services_with(Arc::new(OfflineDirectory)));
        let mut state = authenticated_state(ana());
        agent.process("1", &mut state).await;

        let turn = agent.process("8000", &mut state).await;
        assert!(turn.reply.starts_with("Sorry"));
        assert!(turn.handoff.is_none());
        assert_eq!(state.authenticated_customer.as_ref().unwrap().credit_limit, 5000.0);
    }

    #[tokio::test]
    async fn test_navigation_word_is_acknowledged_not_parsed() {
        let (mut agent, mut state) = entered(directory()).await;
        let turn = agent.process("back to menu", &mut state).await;
        assert_eq!(turn.reply, "Sure.");
        assert!(turn.handoff.is_none());
    }
}
