use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;

use partyline_core::phase::Phase;
use partyline_core::player::{Player, PlayerId};
use partyline_core::session::Session;
use partyline_core::session_code::SessionCode;

use crate::error::AppError;
use crate::state::AppState;

/// Read-only view of a live session.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub code: String,
    pub phase: Phase,
    pub round: u32,
    pub players: Vec<Player>,
    pub host_id: Option<PlayerId>,
    pub submitted: usize,
    pub created_at: u64,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            code: session.code().to_string(),
            phase: session.phase(),
            round: session.round(),
            players: session.players().to_vec(),
            host_id: session.host_id(),
            submitted: session.submitted_count(),
            created_at: session.created_at(),
        }
    }
}

/// GET /api/v1/sessions/{code}
pub async fn get_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let code = SessionCode::parse(&code)
        .ok_or_else(|| AppError::BadRequest(format!("invalid session code: {code}")))?;
    let gateway = state.gateway.read().await;
    let session = gateway.registry().get_session(code.as_str())?;
    Ok(Json(SessionSummary::from(session)))
}
