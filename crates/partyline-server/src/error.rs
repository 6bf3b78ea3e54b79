use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use partyline_core::error::SessionError;
use partyline_core::net::messages::RejectReason;
use partyline_core::net::protocol::{PROTOCOL_VERSION, ProtocolError};
use partyline_core::session_code::SessionCode;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m) | Self::NotFound(m) => write!(f, "{m}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => Self::NotFound(err.to_string()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

/// Why the gateway refused a client request. Every variant maps onto a
/// `RejectReason` sent back to the originating connection only.
#[derive(Debug)]
pub enum GatewayError {
    Session(SessionError),
    AlreadyInSession(SessionCode),
    NotInSession,
    InvalidName,
    InvalidContent(String),
    ProtocolMismatch { client: u8 },
    Protocol(ProtocolError),
}

impl GatewayError {
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            Self::Session(SessionError::NotFound(_)) => RejectReason::NotFound,
            Self::Session(SessionError::InvalidPhase { .. }) => RejectReason::InvalidPhase,
            Self::Session(SessionError::UnknownPlayer(_)) => RejectReason::UnknownPlayer,
            Self::Session(SessionError::DuplicatePlayer(_)) => RejectReason::DuplicatePlayer,
            Self::Session(SessionError::SessionFull { .. }) => RejectReason::SessionFull,
            Self::AlreadyInSession(_) => RejectReason::AlreadyInSession,
            Self::NotInSession => RejectReason::NotInSession,
            Self::InvalidName => RejectReason::InvalidName,
            Self::InvalidContent(_) => RejectReason::InvalidContent,
            Self::ProtocolMismatch { .. } => RejectReason::ProtocolMismatch,
            Self::Protocol(_) => RejectReason::Malformed,
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session(e) => write!(f, "{e}"),
            Self::AlreadyInSession(code) => write!(f, "already in session {code}"),
            Self::NotInSession => write!(f, "not in a session"),
            Self::InvalidName => write!(f, "invalid player name"),
            Self::InvalidContent(why) => write!(f, "invalid submission: {why}"),
            Self::ProtocolMismatch { client } => write!(
                f,
                "protocol version mismatch: client={client}, server={PROTOCOL_VERSION}"
            ),
            Self::Protocol(e) => write!(f, "malformed message: {e}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(e) => Some(e),
            Self::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SessionError> for GatewayError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<ProtocolError> for GatewayError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}
