use std::collections::HashMap;
use std::time::Duration;

use crate::error::SessionError;
use crate::phase::{Phase, PhaseEntry};
use crate::player::PlayerId;
use crate::session::{RemoveOutcome, Session};
use crate::session_code::SessionCode;

/// Source of candidate session codes. Swappable so tests can force
/// specific codes and collisions.
pub type CodeGenerator = Box<dyn FnMut() -> SessionCode + Send + Sync>;

/// Roster cap applied when none is configured.
pub const DEFAULT_MAX_PLAYERS: usize = 16;

/// Owns every live session, keyed by code. Sessions are only reachable
/// through the registry, and a session whose roster empties is removed in
/// the same call that emptied it.
///
/// The registry never talks to clients; every mutation hands its outcome
/// back to the caller.
pub struct SessionRegistry {
    sessions: HashMap<SessionCode, Session>,
    generate_code: CodeGenerator,
    max_players: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_code_generator(Box::new(SessionCode::generate))
    }

    pub fn with_code_generator(generate_code: CodeGenerator) -> Self {
        Self {
            sessions: HashMap::new(),
            generate_code,
            max_players: DEFAULT_MAX_PLAYERS,
        }
    }

    /// Cap every roster at `max` players. Joins beyond it fail with
    /// `SessionFull`.
    pub fn set_max_players(&mut self, max: usize) {
        self.max_players = max;
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Create a session with `host_id` as its first player. The code is
    /// regenerated until it does not collide with a live session.
    pub fn create_session(
        &mut self,
        host_id: PlayerId,
        host_name: String,
    ) -> (SessionCode, &mut Session) {
        let code = self.unique_code();
        tracing::info!(session = %code, host_id, "Session created");
        let session = self
            .sessions
            .entry(code.clone())
            .or_insert_with(|| Session::new(code.clone(), host_id, host_name));
        (code, session)
    }

    pub fn get_session(&self, code: &str) -> Result<&Session, SessionError> {
        SessionCode::parse(code)
            .and_then(|c| self.sessions.get(&c))
            .ok_or_else(|| SessionError::NotFound(code.trim().to_string()))
    }

    pub fn get_session_mut(&mut self, code: &str) -> Result<&mut Session, SessionError> {
        SessionCode::parse(code)
            .and_then(|c| self.sessions.get_mut(&c))
            .ok_or_else(|| SessionError::NotFound(code.trim().to_string()))
    }

    /// Tear down a session. Returns it if it existed.
    pub fn remove_session(&mut self, code: &str) -> Option<Session> {
        let removed = self.sessions.remove(&SessionCode::parse(code)?);
        if removed.is_some() {
            tracing::info!(session = code, "Session removed");
        }
        removed
    }

    pub fn for_each_session(&mut self, mut f: impl FnMut(&SessionCode, &mut Session)) {
        for (code, session) in &mut self.sessions {
            f(code, session);
        }
    }

    /// Add a player to an existing session, up to the roster cap.
    pub fn join(
        &mut self,
        code: &str,
        player_id: PlayerId,
        name: String,
    ) -> Result<&Session, SessionError> {
        let max = self.max_players;
        let session = self.get_session_mut(code)?;
        if session.players().len() >= max {
            return Err(SessionError::SessionFull { max });
        }
        session.add_player(player_id, name)?;
        tracing::info!(session = %session.code(), player_id, "Player joined");
        Ok(session)
    }

    /// Remove a player from a session, tearing the session down if that
    /// leaves it empty.
    pub fn leave(&mut self, code: &str, player_id: PlayerId) -> Result<RemoveOutcome, SessionError> {
        let session = self.get_session_mut(code)?;
        let outcome = session.remove_player(player_id)?;
        tracing::info!(session = %session.code(), player_id, "Player left");
        if outcome.emptied {
            self.remove_session(code);
        }
        Ok(outcome)
    }

    pub fn submit(
        &mut self,
        code: &str,
        player_id: PlayerId,
        phase: Phase,
        content: String,
    ) -> Result<Option<PhaseEntry>, SessionError> {
        self.get_session_mut(code)?.submit(player_id, phase, content)
    }

    pub fn play_again(&mut self, code: &str, player_id: PlayerId) -> Result<PhaseEntry, SessionError> {
        self.get_session_mut(code)?.play_again(player_id)
    }

    /// Disconnect sweep: remove `player_id` from every session that holds
    /// it and drop any session left empty. Returns one outcome per session
    /// the player was removed from.
    pub fn remove_player_everywhere(&mut self, player_id: PlayerId) -> Vec<(SessionCode, RemoveOutcome)> {
        let mut outcomes = Vec::new();
        self.for_each_session(|code, session| {
            if let Ok(outcome) = session.remove_player(player_id) {
                outcomes.push((code.clone(), outcome));
            }
        });
        for (code, outcome) in &outcomes {
            if outcome.emptied {
                self.sessions.remove(code);
                tracing::info!(session = %code, "Session removed after last player left");
            }
        }
        outcomes
    }

    /// Remove sessions with no activity for at least `max_idle`.
    pub fn remove_idle(&mut self, max_idle: Duration) -> Vec<Session> {
        let stale: Vec<SessionCode> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.idle_for() >= max_idle)
            .map(|(code, _)| code.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|code| self.sessions.remove(&code))
            .collect()
    }

    /// Force every session whose current phase has been open for at least
    /// `timeout` into its next phase.
    pub fn force_stale_phases(&mut self, timeout: Duration) -> Vec<(SessionCode, PhaseEntry)> {
        let mut entries = Vec::new();
        self.for_each_session(|code, session| {
            if session.phase_age() >= timeout
                && let Some(entry) = session.force_advance()
            {
                tracing::info!(session = %code, phase = ?entry.phase, "Phase forced by timeout");
                entries.push((code.clone(), entry));
            }
        });
        entries
    }

    /// Drop sessions that are reachable with an empty roster. Every mutation
    /// path removes emptied sessions itself, so anything found here is a bug
    /// and is logged as such.
    pub fn reap_empty_sessions(&mut self) -> Vec<SessionCode> {
        let empty: Vec<SessionCode> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.is_empty())
            .map(|(code, _)| code.clone())
            .collect();
        for code in &empty {
            tracing::error!(session = %code, "Empty session still registered, removing");
            self.sessions.remove(code);
        }
        empty
    }

    /// (live sessions, players across all sessions)
    pub fn stats(&self) -> (usize, usize) {
        let players = self.sessions.values().map(|s| s.players().len()).sum();
        (self.sessions.len(), players)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn unique_code(&mut self) -> SessionCode {
        loop {
            let code = (self.generate_code)();
            if !self.sessions.contains_key(&code) {
                return code;
            }
            tracing::debug!(session = %code, "Session code collision, regenerating");
        }
    }
}
