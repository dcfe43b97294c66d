//! REST API Server for the Bank Agent Orchestrator
//!
//! One orchestrator per chat session, each behind its own lock so a
//! session processes one message at a time.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::agents::AgentServices;
use crate::error::OrchestrationError;
use crate::models::AgentId;
use crate::orchestrator::Orchestrator;

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omit to open a new session
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub reply: String,
    pub active_agent: AgentId,
    pub conversation_active: bool,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// Session Registry
/// =============================

type Session = Arc<Mutex<Orchestrator>>;

pub struct SessionRegistry {
    services: AgentServices,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new(services: AgentServices) -> Self {
        Self {
            services,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    pub async fn get_or_create(&self, session_id: Uuid) -> Session {
        if let Some(session) = self.get(session_id).await {
            return session;
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| {
                info!(session_id = %session_id, "Session opened");
                Arc::new(Mutex::new(Orchestrator::new(self.services.clone())))
            })
            .clone()
    }

    /// Drop a session; later requests for its id open a fresh one.
    pub async fn remove(&self, session_id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&session_id).is_some();
        if removed {
            info!(session_id = %session_id, "Session closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<SessionRegistry>,
}

/// =============================
/// Helpers
/// =============================

pub fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Client-supplied session ids may be any string; non-UUIDs map stably.
fn session_uuid(value: &str) -> Uuid {
    Uuid::parse_str(value.trim()).unwrap_or_else(|_| stable_uuid_from_string(value.trim()))
}

fn not_found(session_id: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error(
            OrchestrationError::SessionNotFound(session_id.to_string()).to_string(),
        )),
    )
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = match req.session_id.as_deref() {
        Some(value) if !value.trim().is_empty() => session_uuid(value),
        _ => Uuid::new_v4(),
    };

    let session = state.registry.get_or_create(session_id).await;
    let reply = {
        let mut orchestrator = session.lock().await;
        let reply = orchestrator.process_message(&req.message).await;
        let conversation = orchestrator.state();

        info!(
            session_id = %session_id,
            active_agent = %conversation.active_agent,
            "chat_handler turn complete"
        );

        ChatReply {
            session_id,
            reply,
            active_agent: conversation.active_agent,
            conversation_active: conversation.conversation_active,
        }
    };

    // Closed conversations are not kept.
    if !reply.conversation_active {
        state.registry.remove(session_id).await;
    }

    (StatusCode::OK, Json(ApiResponse::success(reply)))
}

/// =============================
/// Session Endpoints
/// =============================

async fn reset_handler(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let Some(session) = state.registry.get(session_uuid(&session_id)).await else {
        return not_found(&session_id);
    };

    let mut orchestrator = session.lock().await;
    orchestrator.reset();

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "session_id": session_uuid(&session_id),
            "reset": true,
        }))),
    )
}

async fn state_handler(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let Some(session) = state.registry.get(session_uuid(&session_id)).await else {
        return not_found(&session_id);
    };

    let orchestrator = session.lock().await;
    (StatusCode::OK, Json(ApiResponse::success(orchestrator.state())))
}

/// =============================
/// Router
/// =============================

pub fn create_router(registry: Arc<SessionRegistry>) -> Router {
    let state = ApiState { registry };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/:session_id/reset", post(reset_handler))
        .route("/api/sessions/:session_id/state", get(state_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    registry: Arc<SessionRegistry>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(registry);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
