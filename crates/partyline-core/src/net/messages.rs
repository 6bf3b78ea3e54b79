use serde::{Deserialize, Serialize};

use crate::phase::{Phase, Submission};
use crate::player::{Player, PlayerId};

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateSession = 0x01,
    JoinSession = 0x02,
    SubmitAnswer = 0x03,
    LeaveSession = 0x04,
    PlayAgain = 0x05,

    // Server -> Client
    SessionCreated = 0x10,
    SessionJoined = 0x11,
    RosterUpdated = 0x12,
    PhaseEntered = 0x13,
    SubmissionAccepted = 0x14,
    SessionClosed = 0x15,
    Rejected = 0x1F,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::CreateSession),
            0x02 => Some(Self::JoinSession),
            0x03 => Some(Self::SubmitAnswer),
            0x04 => Some(Self::LeaveSession),
            0x05 => Some(Self::PlayAgain),
            0x10 => Some(Self::SessionCreated),
            0x11 => Some(Self::SessionJoined),
            0x12 => Some(Self::RosterUpdated),
            0x13 => Some(Self::PhaseEntered),
            0x14 => Some(Self::SubmissionAccepted),
            0x15 => Some(Self::SessionClosed),
            0x1F => Some(Self::Rejected),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionMsg {
    pub player_name: String,
    #[serde(default)]
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSessionMsg {
    pub session_code: String,
    pub player_name: String,
    #[serde(default)]
    pub protocol_version: u8,
}

/// A player's submission for `phase`. The phase tag lets the server reject
/// submissions that arrive after the session has already moved on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAnswerMsg {
    pub session_code: String,
    pub phase: Phase,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaveSessionMsg {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayAgainMsg {
    pub session_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    CreateSession(CreateSessionMsg),
    JoinSession(JoinSessionMsg),
    SubmitAnswer(SubmitAnswerMsg),
    LeaveSession(LeaveSessionMsg),
    PlayAgain(PlayAgainMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::CreateSession(_) => MessageType::CreateSession,
            Self::JoinSession(_) => MessageType::JoinSession,
            Self::SubmitAnswer(_) => MessageType::SubmitAnswer,
            Self::LeaveSession(_) => MessageType::LeaveSession,
            Self::PlayAgain(_) => MessageType::PlayAgain,
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreatedMsg {
    pub session_code: String,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionJoinedMsg {
    pub session_code: String,
    pub player_id: PlayerId,
    pub phase: Phase,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterUpdatedMsg {
    pub session_code: String,
    pub players: Vec<Player>,
    pub host_id: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEnteredMsg {
    pub session_code: String,
    pub phase: Phase,
    pub round: u32,
    pub prompts: Vec<Submission>,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionAcceptedMsg {
    pub phase: Phase,
    /// Players who have submitted for `phase` so far.
    pub submitted: u32,
    /// Players the phase is waiting on in total.
    pub expected: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClosedMsg {
    pub session_code: String,
    pub reason: String,
}

/// Why a client request was refused. Sent only to the connection that made
/// the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    NotFound,
    InvalidPhase,
    UnknownPlayer,
    AlreadyInSession,
    NotInSession,
    InvalidName,
    InvalidContent,
    Malformed,
    ProtocolMismatch,
    DuplicatePlayer,
    SessionFull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedMsg {
    pub reason: RejectReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    SessionCreated(SessionCreatedMsg),
    SessionJoined(SessionJoinedMsg),
    RosterUpdated(RosterUpdatedMsg),
    PhaseEntered(PhaseEnteredMsg),
    SubmissionAccepted(SubmissionAcceptedMsg),
    SessionClosed(SessionClosedMsg),
    Rejected(RejectedMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::SessionCreated(_) => MessageType::SessionCreated,
            Self::SessionJoined(_) => MessageType::SessionJoined,
            Self::RosterUpdated(_) => MessageType::RosterUpdated,
            Self::PhaseEntered(_) => MessageType::PhaseEntered,
            Self::SubmissionAccepted(_) => MessageType::SubmissionAccepted,
            Self::SessionClosed(_) => MessageType::SessionClosed,
            Self::Rejected(_) => MessageType::Rejected,
        }
    }
}
