//! Currency agent: exchange rate quotes

use super::{require_customer, speak, AgentServices, AgentTurn, DomainAgent};
use crate::extract::{CurrencyExtractor, Extractor, YesNo, YesNoExtractor};
use crate::intent::navigation_intent;
use crate::models::{format_money, AgentId, RateQuote};
use crate::narrator::AgentVoice;
use crate::state::{ConversationState, Signal};
use async_trait::async_trait;
use tracing::{info, warn};

const SUGGESTED_CURRENCIES: &str = "USD, EUR or GBP";

pub struct CurrencyAgent {
    services: AgentServices,
    voice: AgentVoice,
    last_query: Option<(String, String)>,
}

impl CurrencyAgent {
    pub fn new(services: AgentServices) -> Self {
        Self {
            voice: services.voice(AgentId::Currency),
            services,
            last_query: None,
        }
    }

    pub fn last_query(&self) -> Option<&(String, String)> {
        self.last_query.as_ref()
    }

    /// 0 codes: base against local. 1 code: it against local (or base
    /// against local when it *is* local). 2+: first against second.
    fn resolve_pair(&self, codes: &[String]) -> (String, String) {
        let local = &self.services.local_currency;
        let base = &self.services.base_currency;
        match codes {
            [] => (base.clone(), local.clone()),
            [only] if only == local => (base.clone(), local.clone()),
            [only] => (only.clone(), local.clone()),
            [from, to, ..] => (from.clone(), to.clone()),
        }
    }

    async fn respond(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let first_entry = state.claim_turn(AgentId::Currency);
        if let Err(turn) = require_customer(AgentId::Currency, state) {
            return turn;
        }

        if first_entry {
            return AgentTurn::advanced(
                "Welcome to the currency desk. Which currency would you like a quote for? For example \"dollar\" or \"euro to pound\".",
            );
        }

        if navigation_intent(text).is_some() {
            return AgentTurn::advanced("Sure.");
        }

        let codes = CurrencyExtractor.extract(text).unwrap_or_default();
        if codes.is_empty() {
            match YesNoExtractor.extract(text) {
                Some(YesNo::No) => {
                    state.scratch.raise(Signal::ReturnedToMenu);
                    return AgentTurn::handoff("Alright, taking you back to the menu.", AgentId::Intake);
                }
                Some(YesNo::Yes) => {
                    return AgentTurn::advanced("Sure, which currency would you like a quote for?");
                }
                None => {}
            }
        }

        let (from, to) = self.resolve_pair(&codes);
        self.last_query = Some((from.clone(), to.clone()));

        match self.services.rates.get_rate(&from, &to).await {
            Ok(Some(quote)) => {
                info!(session_id = %state.session_id, from = %quote.from, to = %quote.to, rate = quote.rate, "Quote served");
                AgentTurn::advanced(format_quote(&quote))
            }
            Ok(None) => AgentTurn::advanced(format!(
                "I don't have a rate for {}/{}. Try one of the common currencies: {}.",
                from, to, SUGGESTED_CURRENCIES
            )),
            Err(e) => {
                warn!(error = %e, from = %from, to = %to, "Rate lookup failed");
                AgentTurn::advanced(format!(
                    "Sorry, I couldn't get a quote for {}/{} right now. Please try again, or ask for one of the common currencies: {}.",
                    from, to, SUGGESTED_CURRENCIES
                ))
            }
        }
    }
}

fn format_quote(quote: &RateQuote) -> String {
    let examples = [1.0, 100.0, 1000.0]
        .iter()
        .map(|units| {
            format!(
                "- {} {} = {} {}",
                format_money(*units),
                quote.from,
                format_money(units * quote.rate),
                quote.to
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "1 {} = {:.4} {}\n\n{}\n\nRate as of {}.\n\nWould you like another quote?",
        quote.from,
        quote.rate,
        quote.to,
        examples,
        quote.timestamp.format("%Y-%m-%d %H:%M UTC")
    )
}

#[async_trait]
impl DomainAgent for CurrencyAgent {
    async fn process(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let turn = self.respond(text, state).await;
        speak(&mut self.voice, text, turn).await
    }

    fn reset(&mut self) {
        self.last_query = None;
        self.voice.reset();
    }
}
