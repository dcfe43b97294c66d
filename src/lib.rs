//! Bank Agent Orchestrator
//!
//! A conversational banking assistant built from four cooperating agents:
//! - Intake: authenticates the customer and presents the service menu
//! - Credit: reports the credit limit and handles increase requests
//! - Interview: five-question financial interview that recalculates the score
//! - Currency: exchange rate quotes
//!
//! The orchestrator threads one shared conversation state through them and
//! decides after every turn who speaks next.
//!
//! TURN LOOP:
//! INPUT → DISPATCH → RECORD → DECIDE → (HANDOFF → DISPATCH)* → REPLY

pub mod agents;
pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod extract;
pub mod intent;
pub mod models;
pub mod narrator;
pub mod orchestrator;
pub mod rates;
pub mod scoring;
pub mod state;
pub mod transcript;

pub use error::Result;

// Re-export common types
pub use agents::{AgentServices, AgentTurn, DomainAgent, TurnProgress};
pub use config::AppConfig;
pub use models::*;
pub use orchestrator::Orchestrator;
pub use state::ConversationState;
