//! Next-step decision
//!
//! Pure routing over the state after an agent turn, plus the loop guard.

use crate::agents::TurnProgress;
use crate::intent::navigation_intent;
use crate::models::AgentId;
use crate::state::ConversationState;
use serde::Serialize;

/// Consecutive stalled turns tolerated before the session is ended
pub const LOOP_GUARD_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    /// An agent asked for it through `next_step`
    Handoff,
    /// The customer said menu/back/exit inside a domain agent
    Navigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    SessionClosed,
    LoopGuard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Keep the active agent and wait for the next utterance
    Await,
    Route { to: AgentId, reason: RouteReason },
    Terminate { cause: TerminationCause },
}

/// Counts consecutive stalled turns of the same agent without an override.
#[derive(Debug, Default, Clone)]
pub struct LoopGuard {
    agent: Option<AgentId>,
    stalled_turns: u32,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.agent = None;
        self.stalled_turns = 0;
    }

    pub fn stalled_turns(&self) -> u32 {
        self.stalled_turns
    }

    /// Record one retained turn; `true` once the threshold is exceeded.
    pub fn observe(&mut self, agent: AgentId, progress: TurnProgress) -> bool {
        if self.agent != Some(agent) {
            self.agent = Some(agent);
            self.stalled_turns = 0;
        }

        match progress {
            TurnProgress::Advanced => self.stalled_turns = 0,
            TurnProgress::Stalled => self.stalled_turns += 1,
        }

        self.stalled_turns > LOOP_GUARD_THRESHOLD
    }
}

/// Decide where the conversation goes after the active agent's turn.
///
/// Priority:
/// 1. inactive session terminates
/// 2. a pending `next_step` is consumed (and cleared) and routed to
/// 3. the loop guard may trip
/// 4. Intake always keeps the turn; menu choices are resolved inside it
/// 5. a domain agent yields on menu/back (Intake) or exit/quit (termination)
/// 6. otherwise the active agent keeps the conversation
pub fn decide_next_step(state: &mut ConversationState, progress: TurnProgress, guard: &mut LoopGuard) -> Decision {
    if !state.conversation_active {
        return Decision::Terminate {
            cause: TerminationCause::SessionClosed,
        };
    }

    if let Some(to) = state.next_step.take() {
        guard.reset();
        return Decision::Route {
            to,
            reason: RouteReason::Handoff,
        };
    }

    if guard.observe(state.active_agent, progress) {
        return Decision::Terminate {
            cause: TerminationCause::LoopGuard,
        };
    }

    match state.active_agent {
        AgentId::Intake => Decision::Await,
        AgentId::Termination => Decision::Terminate {
            cause: TerminationCause::SessionClosed,
        },
        AgentId::Credit | AgentId::Interview | AgentId::Currency => {
            match navigation_intent(&state.current_user_message) {
                Some(navigation) => {
                    guard.reset();
                    Decision::Route {
                        to: navigation.target(),
                        reason: RouteReason::Navigation,
                    }
                }
                None => Decision::Await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_in(agent: AgentId, utterance: &str) -> ConversationState {
        let mut state = ConversationState::new();
        state.set_active_agent(agent);
        state.current_user_message = utterance.to_string();
        state
    }

    #[test]
    fn test_inactive_session_terminates_first() {
        let mut state = state_in(AgentId::Credit, "menu");
        state.next_step = Some(AgentId::Interview);
        state.conversation_active = false;

        let decision = decide_next_step(&mut state, TurnProgress::Advanced, &mut LoopGuard::new());
        assert_eq!(
            decision,
            Decision::Terminate {
                cause: TerminationCause::SessionClosed
            }
        );
    }

    #[test]
    fn test_next_step_is_consumed_exactly_once() {
        let mut state = state_in(AgentId::Credit, "1");
        let mut guard = LoopGuard::new();
        state.next_step = Some(AgentId::Interview);

        let first = decide_next_step(&mut state, TurnProgress::Advanced, &mut guard);
        assert_eq!(
            first,
            Decision::Route {
                to: AgentId::Interview,
                reason: RouteReason::Handoff
            }
        );
        assert!(state.next_step.is_none());

        let second = decide_next_step(&mut state, TurnProgress::Advanced, &mut guard);
        assert_eq!(second, Decision::Await);
    }

    #[test]
    fn test_intake_always_awaits() {
        let mut guard = LoopGuard::new();
        let mut state = state_in(AgentId::Intake, "menu");
        assert_eq!(decide_next_step(&mut state, TurnProgress::Advanced, &mut guard), Decision::Await);

        state.record_auth_success(crate::agents::testing::ana());
        state.current_user_message = "exit".to_string();
        assert_eq!(decide_next_step(&mut state, TurnProgress::Advanced, &mut guard), Decision::Await);
    }

    #[test]
    fn test_navigation_from_domain_agents() {
        let mut guard = LoopGuard::new();

        let mut state = state_in(AgentId::Currency, "back to the menu please");
        assert_eq!(
            decide_next_step(&mut state, TurnProgress::Advanced, &mut guard),
            Decision::Route {
                to: AgentId::Intake,
                reason: RouteReason::Navigation
            }
        );

        let mut state = state_in(AgentId::Interview, "quit");
        assert_eq!(
            decide_next_step(&mut state, TurnProgress::Advanced, &mut guard),
            Decision::Route {
                to: AgentId::Termination,
                reason: RouteReason::Navigation
            }
        );

        let mut state = state_in(AgentId::Credit, "8000");
        assert_eq!(decide_next_step(&mut state, TurnProgress::Advanced, &mut guard), Decision::Await);
    }

    #[test]
    fn test_loop_guard_trips_after_threshold() {
        let mut state = state_in(AgentId::Credit, "hmm");
        let mut guard = LoopGuard::new();

        for _ in 0..LOOP_GUARD_THRESHOLD {
            assert_eq!(decide_next_step(&mut state, TurnProgress::Stalled, &mut guard), Decision::Await);
        }
        assert_eq!(
            decide_next_step(&mut state, TurnProgress::Stalled, &mut guard),
            Decision::Terminate {
                cause: TerminationCause::LoopGuard
            }
        );
    }

    #[test]
    fn test_loop_guard_resets_on_progress_override_and_agent_change() {
        let mut guard = LoopGuard::new();
        assert!(!guard.observe(AgentId::Interview, TurnProgress::Stalled));
        assert!(!guard.observe(AgentId::Interview, TurnProgress::Stalled));
        assert!(!guard.observe(AgentId::Interview, TurnProgress::Advanced));
        assert_eq!(guard.stalled_turns(), 0);

        guard.observe(AgentId::Interview, TurnProgress::Stalled);
        guard.observe(AgentId::Interview, TurnProgress::Stalled);
        assert!(!guard.observe(AgentId::Currency, TurnProgress::Stalled));
        assert_eq!(guard.stalled_turns(), 1);

        let mut state = state_in(AgentId::Currency, "x");
        state.next_step = Some(AgentId::Intake);
        decide_next_step(&mut state, TurnProgress::Stalled, &mut guard);
        assert_eq!(guard.stalled_turns(), 0);
    }
}
