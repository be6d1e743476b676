use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::domain::{ClockAction, Session, SessionCode, SignalKind};

// ============================================================================
// REST API TYPES
// ============================================================================

#[derive(Serialize, ToSchema)]
pub struct ApiResponse {
    pub message: String,
    pub timestamp: u64,
}

/// Create a session, optionally overriding default field values
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    #[schema(example = "ABC1")]
    pub code: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

/// Operator field update, e.g. `{"fields": {"home_score": 2}}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateSessionRequest {
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClockRequest {
    pub action: ClockAction,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignalRequest {
    pub signal: SignalKind,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignalAccepted {
    #[schema(value_type = String)]
    pub code: SessionCode,
    pub signal: SignalKind,
    /// Number of connections the signal was queued for
    pub delivered: usize,
}

// ============================================================================
// WEBSOCKET MESSAGE TYPES (Client → Server)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        code: String,
    },
    Leave {
        code: String,
    },
    Update {
        code: String,
        fields: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
    },
    Clock {
        code: String,
        action: ClockAction,
    },
    Signal {
        code: String,
        signal: SignalKind,
    },
    Ping,
}

// ============================================================================
// WEBSOCKET MESSAGE TYPES (Server → Client)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    // Group membership acknowledgments
    Joined { session: Session },
    Left { code: SessionCode },

    // Real-time data updates
    Snapshot { session: Session },
    Signal { code: SessionCode, signal: SignalKind },

    // Connection management
    Error { kind: String, message: String },
    Pong,
}
