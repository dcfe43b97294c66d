//! Intake agent: authentication and the service menu

use super::{first_name, speak, AgentServices, AgentTurn, DomainAgent};
use crate::extract::{BirthdateExtractor, CustomerIdExtractor, Extractor};
use crate::intent::{navigation_intent, MenuClassifier, MenuVariant, Navigation};
use crate::models::{AgentId, Customer};
use crate::narrator::AgentVoice;
use crate::state::{ConversationState, SignalKind, Signal, MAX_AUTH_ATTEMPTS};
use async_trait::async_trait;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum IntakeStage {
    AwaitingId,
    AwaitingBirthdate { customer_id: String },
}

pub struct IntakeAgent {
    services: AgentServices,
    voice: AgentVoice,
    stage: IntakeStage,
    ids: CustomerIdExtractor,
}

impl IntakeAgent {
    pub fn new(services: AgentServices) -> Self {
        Self {
            voice: services.voice(AgentId::Intake),
            services,
            stage: IntakeStage::AwaitingId,
            ids: CustomerIdExtractor::default(),
        }
    }

    async fn respond(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let first_entry = state.claim_turn(AgentId::Intake);

        if !state.is_authenticated() {
            if navigation_intent(text) == Some(Navigation::Exit) {
                self.stage = IntakeStage::AwaitingId;
                return AgentTurn::handoff("Alright.", AgentId::Termination);
            }
            if first_entry && self.stage == IntakeStage::AwaitingId {
                return self.welcome(text);
            }
            return self.authenticate_step(text, state).await;
        }

        let returned = state.scratch.take(SignalKind::ReturnedToMenu).is_some();
        if returned || first_entry || navigation_intent(text) == Some(Navigation::Menu) {
            return Self::present_menu(state);
        }

        self.resolve_choice(text, state)
    }

    /// Opening turn. An id sent as the very first message is accepted.
    fn welcome(&mut self, text: &str) -> AgentTurn {
        const GREETING: &str = "Welcome to the bank's digital assistant!";

        if let Some(customer_id) = self.ids.extract(text) {
            self.stage = IntakeStage::AwaitingBirthdate { customer_id };
            return AgentTurn::advanced(format!(
                "{} Thanks for your customer ID. Please enter your date of birth (e.g. 1990-05-15 or 15/05/1990).",
                GREETING
            ));
        }

        AgentTurn::advanced(format!(
            "{} To get started, please enter your 11-digit customer ID.",
            GREETING
        ))
    }

    async fn authenticate_step(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let IntakeStage::AwaitingBirthdate { customer_id } = self.stage.clone() else {
            return self.collect_id(text);
        };

        let Some(birthdate) = BirthdateExtractor.extract(text) else {
            return AgentTurn::stalled(
                "I couldn't read that date. Please use a format like 1990-05-15 or 15/05/1990.",
            );
        };

        match self.services.directory.authenticate(&customer_id, birthdate).await {
            Ok(Some(customer)) => {
                self.stage = IntakeStage::AwaitingId;
                info!(
                    session_id = %state.session_id,
                    customer_id = %customer.id,
                    "Customer authenticated"
                );
                state.record_auth_success(customer.clone());
                state.scratch.clear(SignalKind::ReducedMenu);
                AgentTurn::advanced(format!(
                    "Authentication confirmed. Welcome, {}!\n\n{}",
                    first_name(&customer),
                    menu_prompt(&customer, MenuVariant::Full)
                ))
            }
            Ok(None) => {
                self.stage = IntakeStage::AwaitingId;
                let attempts = state.record_auth_failure();
                info!(session_id = %state.session_id, attempts, "Authentication failed");

                if state.auth_exhausted() {
                    state.mark_inactive();
                    AgentTurn::advanced(format!(
                        "The details provided don't match our records. You have reached the maximum of {} attempts, so for your security this conversation has been ended.",
                        MAX_AUTH_ATTEMPTS
                    ))
                } else {
                    let remaining = state.remaining_auth_attempts();
                    AgentTurn::advanced(format!(
                        "The details provided don't match our records. You have {} attempt{} left. Please enter your 11-digit customer ID again.",
                        remaining,
                        if remaining == 1 { "" } else { "s" }
                    ))
                }
            }
            Err(e) => {
                warn!(error = %e, "Client directory unavailable during authentication");
                AgentTurn::advanced(
                    "Sorry, I couldn't reach our customer records right now. Please send your date of birth again in a moment.",
                )
            }
        }
    }

    fn collect_id(&mut self, text: &str) -> AgentTurn {
        match self.ids.extract(text) {
            Some(customer_id) => {
                debug!("Customer id collected");
                self.stage = IntakeStage::AwaitingBirthdate { customer_id };
                AgentTurn::advanced(
                    "Thank you. Now please enter your date of birth (e.g. 1990-05-15 or 15/05/1990).",
                )
            }
            None => AgentTurn::stalled(
                "To identify you I need your 11-digit customer ID, numbers only (e.g. 12345678901).",
            ),
        }
    }

    /// Show the menu. Right after an approval the credit option is left out.
    fn present_menu(state: &mut ConversationState) -> AgentTurn {
        let Some(customer) = state.authenticated_customer.clone() else {
            return AgentTurn::stalled("Please enter your 11-digit customer ID.");
        };

        let menu = if state.scratch.take(SignalKind::CreditApproved).is_some() {
            state.scratch.raise(Signal::ReducedMenu);
            MenuVariant::Reduced
        } else {
            state.scratch.clear(SignalKind::ReducedMenu);
            MenuVariant::Full
        };

        AgentTurn::advanced(menu_prompt(&customer, menu))
    }

    fn resolve_choice(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let menu = if state.scratch.is_raised(SignalKind::ReducedMenu) {
            MenuVariant::Reduced
        } else {
            MenuVariant::Full
        };

        match MenuClassifier::classify(text, menu) {
            Some(target) => {
                state.scratch.clear(SignalKind::ReducedMenu);
                info!(session_id = %state.session_id, target = %target, ?menu, "Menu choice resolved");
                let reply = match target {
                    AgentId::Credit => "Connecting you to the credit desk.",
                    AgentId::Interview => "Connecting you to our financial interview.",
                    AgentId::Currency => "Connecting you to the currency desk.",
                    _ => "Alright.",
                };
                AgentTurn::handoff(reply, target)
            }
            None => AgentTurn::stalled(format!(
                "Sorry, I didn't catch that. Please choose one of the options:\n\n{}",
                menu.render()
            )),
        }
    }
}

fn menu_prompt(customer: &Customer, menu: MenuVariant) -> String {
    let lead = match menu {
        MenuVariant::Full => format!("How can I help you today, {}?", first_name(customer)),
        MenuVariant::Reduced => format!("Is there anything else I can help you with, {}?", first_name(customer)),
    };
    format!("{}\n\n{}", lead, menu.render())
}

#[async_trait]
impl DomainAgent for IntakeAgent {
    async fn process(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let turn = self.respond(text, state).await;
        speak(&mut self.voice, text, turn).await
    }

    fn reset(&mut self) {
        self.stage = IntakeStage::AwaitingId;
        self.voice.reset();
    }
}
