use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use partyline_core::net::messages::{
    ClientMessage, CreateSessionMsg, JoinSessionMsg, PhaseEnteredMsg, PlayAgainMsg, RejectedMsg,
    RosterUpdatedMsg, ServerMessage, SessionClosedMsg, SessionCreatedMsg, SessionJoinedMsg,
    SubmissionAcceptedMsg, SubmitAnswerMsg,
};
use partyline_core::net::protocol::{
    decode_client_message, encode_server_message, is_compatible_version,
};
use partyline_core::phase::PhaseEntry;
use partyline_core::player::{PlayerId, normalize_display_name};
use partyline_core::registry::SessionRegistry;
use partyline_core::session_code::SessionCode;

use crate::config::LimitsConfig;
use crate::error::GatewayError;

/// Per-player sender for outbound WebSocket binary messages.
/// Bounded so a slow client cannot exhaust memory; `Bytes` makes the
/// per-player clone cheap when broadcasting.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// A live connection and the session it is currently attached to.
struct Connection {
    sender: PlayerSender,
    session: Option<SessionCode>,
}

/// What one sweeper pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub closed: usize,
    pub forced: usize,
    pub reaped: usize,
}

/// Boundary between connections and the session registry.
///
/// Each connection is given a `PlayerId` when it opens. Inbound messages are
/// resolved to a registry operation; whatever the operation returns is
/// encoded and delivered. Rejections only ever go to the connection that
/// caused them.
pub struct ConnectionGateway {
    registry: SessionRegistry,
    connections: HashMap<PlayerId, Connection>,
    next_player_id: PlayerId,
    limits: LimitsConfig,
}

impl ConnectionGateway {
    pub fn new(limits: LimitsConfig) -> Self {
        Self::with_registry(SessionRegistry::new(), limits)
    }

    pub fn with_registry(mut registry: SessionRegistry, limits: LimitsConfig) -> Self {
        registry.set_max_players(limits.max_players_per_session);
        Self {
            registry,
            connections: HashMap::new(),
            next_player_id: 1,
            limits,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[cfg(test)]
    fn registry_mut(&mut self) -> &mut SessionRegistry {
        &mut self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// (live sessions, players across all sessions)
    pub fn stats(&self) -> (usize, usize) {
        self.registry.stats()
    }

    /// The session a connection is attached to, if any.
    pub fn session_of(&self, player_id: PlayerId) -> Option<&SessionCode> {
        self.connections
            .get(&player_id)
            .and_then(|c| c.session.as_ref())
    }

    fn alloc_player_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    /// Register a new connection and hand back the identity it will play as.
    pub fn connect(&mut self, sender: PlayerSender) -> PlayerId {
        let player_id = self.alloc_player_id();
        self.connections.insert(
            player_id,
            Connection {
                sender,
                session: None,
            },
        );
        tracing::debug!(player_id, "Connection opened");
        player_id
    }

    /// Drop a connection and remove its player from whichever session holds
    /// it. Remaining players get the new roster, and the phase entry if the
    /// departure completed the current phase.
    pub fn disconnect(&mut self, player_id: PlayerId) {
        if self.connections.remove(&player_id).is_none() {
            return;
        }
        for (code, outcome) in self.registry.remove_player_everywhere(player_id) {
            tracing::info!(
                player_id,
                session = %code,
                emptied = outcome.emptied,
                "Player disconnected"
            );
            if outcome.emptied {
                continue;
            }
            self.broadcast_roster(&code);
            if let Some(entry) = outcome.entered {
                self.broadcast_phase(&code, &entry);
            }
        }
    }

    /// Decode one inbound frame and act on it. Undecodable frames are
    /// rejected as `Malformed` without touching any session.
    pub fn handle_frame(&mut self, player_id: PlayerId, data: &[u8]) {
        match decode_client_message(data) {
            Ok(msg) => self.handle(player_id, msg),
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Malformed frame");
                self.reject(player_id, &GatewayError::Protocol(e));
            },
        }
    }

    pub fn handle(&mut self, player_id: PlayerId, msg: ClientMessage) {
        if !self.connections.contains_key(&player_id) {
            tracing::debug!(player_id, "Message from closed connection ignored");
            return;
        }
        let msg_type = msg.message_type();
        if let Err(e) = self.dispatch(player_id, msg) {
            tracing::debug!(player_id, ?msg_type, error = %e, "Request rejected");
            self.reject(player_id, &e);
        }
    }

    fn dispatch(&mut self, player_id: PlayerId, msg: ClientMessage) -> Result<(), GatewayError> {
        match msg {
            ClientMessage::CreateSession(m) => self.create_session(player_id, m),
            ClientMessage::JoinSession(m) => self.join_session(player_id, m),
            ClientMessage::SubmitAnswer(m) => self.submit_answer(player_id, m),
            ClientMessage::LeaveSession(_) => self.leave_session(player_id),
            ClientMessage::PlayAgain(m) => self.play_again(player_id, m),
        }
    }

    fn create_session(
        &mut self,
        player_id: PlayerId,
        msg: CreateSessionMsg,
    ) -> Result<(), GatewayError> {
        check_version(msg.protocol_version)?;
        self.ensure_unattached(player_id)?;
        let name = self.validate_name(&msg.player_name)?;

        let (code, _) = self.registry.create_session(player_id, name);
        self.attach(player_id, code.clone());
        self.send_message(
            player_id,
            &ServerMessage::SessionCreated(SessionCreatedMsg {
                session_code: code.to_string(),
                player_id,
            }),
        );
        self.broadcast_roster(&code);
        Ok(())
    }

    fn join_session(&mut self, player_id: PlayerId, msg: JoinSessionMsg) -> Result<(), GatewayError> {
        check_version(msg.protocol_version)?;
        self.ensure_unattached(player_id)?;
        let name = self.validate_name(&msg.player_name)?;

        let session = self.registry.join(&msg.session_code, player_id, name)?;
        let code = session.code().clone();
        let joined = SessionJoinedMsg {
            session_code: code.to_string(),
            player_id,
            phase: session.phase(),
            round: session.round(),
        };
        self.attach(player_id, code.clone());
        self.send_message(player_id, &ServerMessage::SessionJoined(joined));
        self.broadcast_roster(&code);
        Ok(())
    }

    fn submit_answer(
        &mut self,
        player_id: PlayerId,
        msg: SubmitAnswerMsg,
    ) -> Result<(), GatewayError> {
        self.validate_content(&msg.content)?;
        let entered = self
            .registry
            .submit(&msg.session_code, player_id, msg.phase, msg.content)?;

        let session = self.registry.get_session(&msg.session_code)?;
        let code = session.code().clone();
        let expected = session.players().len() as u32;
        let submitted = if entered.is_some() {
            expected
        } else {
            session.submitted_count() as u32
        };
        self.send_message(
            player_id,
            &ServerMessage::SubmissionAccepted(SubmissionAcceptedMsg {
                phase: msg.phase,
                submitted,
                expected,
            }),
        );
        if let Some(entry) = entered {
            self.broadcast_phase(&code, &entry);
        }
        Ok(())
    }

    fn leave_session(&mut self, player_id: PlayerId) -> Result<(), GatewayError> {
        let code = self
            .connections
            .get_mut(&player_id)
            .and_then(|c| c.session.take())
            .ok_or(GatewayError::NotInSession)?;
        let outcome = self.registry.leave(code.as_str(), player_id)?;
        if !outcome.emptied {
            self.broadcast_roster(&code);
            if let Some(entry) = outcome.entered {
                self.broadcast_phase(&code, &entry);
            }
        }
        Ok(())
    }

    fn play_again(&mut self, player_id: PlayerId, msg: PlayAgainMsg) -> Result<(), GatewayError> {
        let entry = self.registry.play_again(&msg.session_code, player_id)?;
        let code = self.registry.get_session(&msg.session_code)?.code().clone();
        tracing::info!(player_id, session = %code, round = entry.round, "Play again");
        self.broadcast_phase(&code, &entry);
        Ok(())
    }

    /// Background maintenance: close idle sessions, force phases that have
    /// been open past `phase_timeout`, and drop any empty session that
    /// slipped through.
    pub fn sweep(&mut self, idle_timeout: Duration, phase_timeout: Option<Duration>) -> SweepReport {
        let mut report = SweepReport::default();

        for session in self.registry.remove_idle(idle_timeout) {
            let code = session.code();
            let closed = ServerMessage::SessionClosed(SessionClosedMsg {
                session_code: code.to_string(),
                reason: "idle timeout".to_string(),
            });
            for player in session.players() {
                self.detach(player.id, code);
                self.send_message(player.id, &closed);
            }
            tracing::info!(session = %code, "Idle session closed");
            report.closed += 1;
        }

        if let Some(timeout) = phase_timeout {
            for (code, entry) in self.registry.force_stale_phases(timeout) {
                self.broadcast_phase(&code, &entry);
                report.forced += 1;
            }
        }

        for code in self.registry.reap_empty_sessions() {
            for conn in self.connections.values_mut() {
                if conn.session.as_ref() == Some(&code) {
                    conn.session = None;
                }
            }
            report.reaped += 1;
        }

        report
    }

    /// Send a rejection to the originating connection only.
    pub fn reject(&self, player_id: PlayerId, err: &GatewayError) {
        self.send_message(
            player_id,
            &ServerMessage::Rejected(RejectedMsg {
                reason: err.reject_reason(),
                message: err.to_string(),
            }),
        );
    }

    /// Send a raw binary message to a specific player.
    pub fn send_to_player(&self, player_id: PlayerId, data: Bytes) {
        if let Some(conn) = self.connections.get(&player_id)
            && let Err(e) = conn.sender.try_send(data)
        {
            tracing::debug!(
                player_id, error = %e,
                "Failed to send to player (slow or disconnected)"
            );
        }
    }

    fn send_message(&self, player_id: PlayerId, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.send_to_player(player_id, Bytes::from(data)),
            Err(e) => tracing::warn!(player_id, error = %e, "Failed to encode server message"),
        }
    }

    /// Broadcast raw binary data to every connected player in a session.
    pub fn broadcast_to_session(&self, code: &SessionCode, data: Bytes) {
        let Ok(session) = self.registry.get_session(code.as_str()) else {
            return;
        };
        for player in session.players() {
            if let Some(conn) = self.connections.get(&player.id)
                && let Err(e) = conn.sender.try_send(data.clone())
            {
                tracing::debug!(
                    player_id = player.id, session = %code, error = %e,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }

    fn broadcast_message(&self, code: &SessionCode, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.broadcast_to_session(code, Bytes::from(data)),
            Err(e) => tracing::warn!(session = %code, error = %e, "Failed to encode broadcast"),
        }
    }

    pub fn broadcast_roster(&self, code: &SessionCode) {
        let Ok(session) = self.registry.get_session(code.as_str()) else {
            return;
        };
        let msg = ServerMessage::RosterUpdated(RosterUpdatedMsg {
            session_code: code.to_string(),
            players: session.players().to_vec(),
            host_id: session.host_id(),
        });
        self.broadcast_message(code, &msg);
    }

    pub fn broadcast_phase(&self, code: &SessionCode, entry: &PhaseEntry) {
        let msg = ServerMessage::PhaseEntered(PhaseEnteredMsg {
            session_code: code.to_string(),
            phase: entry.phase,
            round: entry.round,
            prompts: entry.prompts.clone(),
            forced: entry.forced,
        });
        self.broadcast_message(code, &msg);
    }

    fn ensure_unattached(&self, player_id: PlayerId) -> Result<(), GatewayError> {
        match self.session_of(player_id) {
            Some(code) => Err(GatewayError::AlreadyInSession(code.clone())),
            None => Ok(()),
        }
    }

    fn attach(&mut self, player_id: PlayerId, code: SessionCode) {
        if let Some(conn) = self.connections.get_mut(&player_id) {
            conn.session = Some(code);
        }
    }

    fn detach(&mut self, player_id: PlayerId, code: &SessionCode) {
        if let Some(conn) = self.connections.get_mut(&player_id)
            && conn.session.as_ref() == Some(code)
        {
            conn.session = None;
        }
    }

    fn validate_name(&self, raw: &str) -> Result<String, GatewayError> {
        normalize_display_name(raw, self.limits.max_name_len).ok_or(GatewayError::InvalidName)
    }

    fn validate_content(&self, content: &str) -> Result<(), GatewayError> {
        if content.len() > self.limits.max_submission_len {
            return Err(GatewayError::InvalidContent(format!(
                "exceeds {} bytes",
                self.limits.max_submission_len
            )));
        }
        if content.chars().any(|c| c.is_control() && c != '\n') {
            return Err(GatewayError::InvalidContent(
                "contains control characters".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_version(client: u8) -> Result<(), GatewayError> {
    if is_compatible_version(client) {
        Ok(())
    } else {
        Err(GatewayError::ProtocolMismatch { client })
    }
}
