//! Error types for the banking agent orchestrator
//!
//! Only collaborators and start-up code return these. A conversation turn
//! never fails: agents turn every error into a reply.

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Client directory error: {0}")]
    DirectoryError(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Rate provider error: {0}")]
    RateProviderError(String),

    #[error("Narrator error: {0}")]
    NarratorError(String),

    // =============================
    // Start-up / Surface Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}
