use crate::phase::Phase;
use crate::player::PlayerId;

/// Recoverable session errors. Each one is reported back to the client that
/// caused it; the session is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No live session has this code.
    NotFound(String),
    /// The operation targets a phase other than the session's current one,
    /// or the current phase does not allow it.
    InvalidPhase { requested: Phase, current: Phase },
    /// The player is not in the session's roster.
    UnknownPlayer(PlayerId),
    /// The player is already in the session's roster.
    DuplicatePlayer(PlayerId),
    /// The roster already holds the per-session maximum.
    SessionFull { max: usize },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(code) => write!(f, "session {code} not found"),
            Self::InvalidPhase { requested, current } => {
                write!(f, "invalid phase: requested {requested}, session is in {current}")
            },
            Self::UnknownPlayer(id) => write!(f, "player {id} is not in this session"),
            Self::DuplicatePlayer(id) => write!(f, "player {id} is already in this session"),
            Self::SessionFull { max } => write!(f, "session is full ({max} players)"),
        }
    }
}

impl std::error::Error for SessionError {}
