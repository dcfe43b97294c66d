//! Interview agent: five questions, then a score recalculation

use super::{require_customer, speak, AgentServices, AgentTurn, DomainAgent};
use crate::extract::{CountExtractor, EmploymentExtractor, Extractor, MoneyExtractor, YesNoExtractor};
use crate::intent::navigation_intent;
use crate::models::{format_money, AgentId, Customer, DebtStatus, EmploymentType, InterviewAnswers};
use crate::narrator::AgentVoice;
use crate::state::{ConversationState, Signal, SignalKind};
use async_trait::async_trait;
use tracing::{debug, info, warn};

const TOTAL_STEPS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterviewStep {
    Income,
    Employment,
    Expenses,
    Dependents,
    Debt,
}

impl InterviewStep {
    fn number(&self) -> usize {
        match self {
            InterviewStep::Income => 1,
            InterviewStep::Employment => 2,
            InterviewStep::Expenses => 3,
            InterviewStep::Dependents => 4,
            InterviewStep::Debt => 5,
        }
    }

    fn next(&self) -> Option<InterviewStep> {
        match self {
            InterviewStep::Income => Some(InterviewStep::Employment),
            InterviewStep::Employment => Some(InterviewStep::Expenses),
            InterviewStep::Expenses => Some(InterviewStep::Dependents),
            InterviewStep::Dependents => Some(InterviewStep::Debt),
            InterviewStep::Debt => None,
        }
    }

    fn question(&self) -> String {
        let text = match self {
            InterviewStep::Income => "What is your monthly income?",
            InterviewStep::Employment => "What is your employment type: formal, self-employed or unemployed?",
            InterviewStep::Expenses => "What are your fixed monthly expenses (rent, bills, etc.)?",
            InterviewStep::Dependents => "How many dependents do you have?",
            InterviewStep::Debt => "Do you currently have any active debt? (yes/no)",
        };
        format!("Question {}/{}: {}", self.number(), TOTAL_STEPS, text)
    }

    fn clarification(&self) -> &'static str {
        match self {
            InterviewStep::Income => "I couldn't read an amount. Please tell me your monthly income as a number, for example 4500.",
            InterviewStep::Employment => "Please answer formal, self-employed or unemployed.",
            InterviewStep::Expenses => "I couldn't read an amount. Please tell me your fixed monthly expenses as a number, for example 1500.",
            InterviewStep::Dependents => "Please tell me the number of dependents, for example 0, 1 or 2.",
            InterviewStep::Debt => "Please answer yes or no: do you have any active debt?",
        }
    }
}

/// Answers collected so far
#[derive(Debug, Default, Clone)]
struct Collected {
    monthly_income: Option<f64>,
    employment: Option<EmploymentType>,
    fixed_expenses: Option<f64>,
    dependents: Option<u32>,
    has_debt: Option<DebtStatus>,
}

impl Collected {
    fn complete(&self) -> Option<InterviewAnswers> {
        Some(InterviewAnswers {
            monthly_income: self.monthly_income?,
            employment: self.employment?,
            fixed_expenses: self.fixed_expenses?,
            dependents: self.dependents?,
            has_debt: self.has_debt?,
        })
    }
}

pub struct InterviewAgent {
    services: AgentServices,
    voice: AgentVoice,
    step: InterviewStep,
    collected: Collected,
    dependents: CountExtractor,
}

impl InterviewAgent {
    pub fn new(services: AgentServices) -> Self {
        Self {
            voice: services.voice(AgentId::Interview),
            services,
            step: InterviewStep::Income,
            collected: Collected::default(),
            dependents: CountExtractor::default(),
        }
    }

    fn restart(&mut self) {
        self.step = InterviewStep::Income;
        self.collected = Collected::default();
    }

    async fn respond(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let first_entry = state.claim_turn(AgentId::Interview);
        let customer = match require_customer(AgentId::Interview, state) {
            Ok(customer) => customer,
            Err(turn) => return turn,
        };

        if first_entry {
            state.scratch.clear(SignalKind::InterviewCompleted);
            self.restart();
            return AgentTurn::advanced(format!(
                "Let's reassess your credit score with {} quick questions, {}.\n\n{}",
                TOTAL_STEPS,
                super::first_name(&customer),
                self.step.question()
            ));
        }

        // Navigation is routed by the orchestrator, even right after the result.
        if navigation_intent(text).is_some() {
            if state.scratch.take(SignalKind::InterviewCompleted).is_some() {
                return AgentTurn::advanced("Sure.");
            }
            return AgentTurn::advanced("Sure, we can finish the interview another time.");
        }

        if state.scratch.take(SignalKind::InterviewCompleted).is_some() {
            state.scratch.raise(Signal::ReturnedToMenu);
            return AgentTurn::handoff("Taking you back to the menu.", AgentId::Intake);
        }

        if !self.record_answer(text) {
            return AgentTurn::stalled(self.step.clarification());
        }

        match self.step.next() {
            Some(next) => {
                self.step = next;
                AgentTurn::advanced(format!("Got it.\n\n{}", self.step.question()))
            }
            None => self.finish(&customer, state).await,
        }
    }

    /// Read the current step's field. `false` leaves everything unchanged.
    fn record_answer(&mut self, text: &str) -> bool {
        let collected = &mut self.collected;
        let recorded = match self.step {
            InterviewStep::Income => {
                collected.monthly_income = MoneyExtractor.extract(text);
                collected.monthly_income.is_some()
            }
            InterviewStep::Employment => {
                collected.employment = EmploymentExtractor.extract(text);
                collected.employment.is_some()
            }
            InterviewStep::Expenses => {
                collected.fixed_expenses = MoneyExtractor.extract(text);
                collected.fixed_expenses.is_some()
            }
            InterviewStep::Dependents => {
                collected.dependents = self.dependents.extract(text);
                collected.dependents.is_some()
            }
            InterviewStep::Debt => {
                collected.has_debt = YesNoExtractor.extract(text).map(DebtStatus::from);
                collected.has_debt.is_some()
            }
        };
        debug!(step = self.step.number(), recorded, "Interview answer read");
        recorded
    }

    async fn finish(&mut self, customer: &Customer, state: &mut ConversationState) -> AgentTurn {
        let Some(answers) = self.collected.complete() else {
            warn!("Interview finished with missing answers, restarting");
            self.restart();
            return AgentTurn::advanced(format!("Let's start over.\n\n{}", self.step.question()));
        };

        let scoring = &self.services.scoring;
        let previous = customer.credit_score;
        let computed = scoring.compute(&answers);

        let summary = if computed < previous {
            info!(
                session_id = %state.session_id,
                customer_id = %customer.id,
                computed,
                kept = previous,
                "Computed score below current, keeping current"
            );
            format!(
                "Thank you! Based on your answers your score would be {:.0} ({}). Your current score of {:.0} ({}) is higher, so we've preserved your better score.",
                computed,
                scoring.interpret(computed),
                previous,
                scoring.interpret(previous)
            )
        } else {
            if let Err(e) = self.services.directory.update_score(&customer.id, computed).await {
                warn!(error = %e, "Failed to persist new score");
                return AgentTurn::advanced(
                    "Sorry, I couldn't save your new score right now. Please answer the last question again so I can retry.",
                );
            }
            if let Some(current) = state.authenticated_customer.as_mut() {
                current.credit_score = computed;
            }
            info!(
                session_id = %state.session_id,
                customer_id = %customer.id,
                previous,
                new_score = computed,
                "Credit score updated"
            );
            format!(
                "Thank you! Your new credit score is {:.0} ({}), previously {:.0}. With your current limit of {}, you can now request a new limit from the credit menu.",
                computed,
                scoring.interpret(computed),
                previous,
                format_money(customer.credit_limit)
            )
        };

        self.restart();
        state.scratch.raise(Signal::InterviewCompleted);
        AgentTurn::advanced(format!("{}\n\nSend any message to return to the menu.", summary))
    }
}

#[async_trait]
impl DomainAgent for InterviewAgent {
    async fn process(&mut self, text: &str, state: &mut ConversationState) -> AgentTurn {
        let turn = self.respond(text, state).await;
        speak(&mut self.voice, text, turn).await
    }

    fn reset(&mut self) {
        self.restart();
        self.voice.reset();
    }
}
