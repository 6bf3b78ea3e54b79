use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, CreateSessionMsg, JoinSessionMsg, LeaveSessionMsg, MessageType, PhaseEnteredMsg,
    PlayAgainMsg, RejectedMsg, RosterUpdatedMsg, ServerMessage, SessionClosedMsg,
    SessionCreatedMsg, SessionJoinedMsg, SubmissionAcceptedMsg, SubmitAnswerMsg,
};

/// Current protocol version. Clients that send 0 are treated as unversioned.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum frame size in bytes, type prefix included.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024; // 16 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Whether a client announcing `version` may talk to this server.
pub fn is_compatible_version(version: u8) -> bool {
    version == 0 || version == PROTOCOL_VERSION
}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    let ty = msg.message_type();
    match msg {
        ClientMessage::CreateSession(m) => encode_message(ty, m),
        ClientMessage::JoinSession(m) => encode_message(ty, m),
        ClientMessage::SubmitAnswer(m) => encode_message(ty, m),
        ClientMessage::LeaveSession(m) => encode_message(ty, m),
        ClientMessage::PlayAgain(m) => encode_message(ty, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    let ty = msg.message_type();
    match msg {
        ServerMessage::SessionCreated(m) => encode_message(ty, m),
        ServerMessage::SessionJoined(m) => encode_message(ty, m),
        ServerMessage::RosterUpdated(m) => encode_message(ty, m),
        ServerMessage::PhaseEntered(m) => encode_message(ty, m),
        ServerMessage::SubmissionAccepted(m) => encode_message(ty, m),
        ServerMessage::SessionClosed(m) => encode_message(ty, m),
        ServerMessage::Rejected(m) => encode_message(ty, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::CreateSession => Ok(ClientMessage::CreateSession(decode_payload::<
            CreateSessionMsg,
        >(data)?)),
        MessageType::JoinSession => Ok(ClientMessage::JoinSession(decode_payload::<
            JoinSessionMsg,
        >(data)?)),
        MessageType::SubmitAnswer => Ok(ClientMessage::SubmitAnswer(decode_payload::<
            SubmitAnswerMsg,
        >(data)?)),
        // Leave carries nothing; a bare type byte is accepted.
        MessageType::LeaveSession if data.len() == 1 => {
            Ok(ClientMessage::LeaveSession(LeaveSessionMsg::default()))
        },
        MessageType::LeaveSession => Ok(ClientMessage::LeaveSession(decode_payload::<
            LeaveSessionMsg,
        >(data)?)),
        MessageType::PlayAgain => Ok(ClientMessage::PlayAgain(decode_payload::<PlayAgainMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::SessionCreated => Ok(ServerMessage::SessionCreated(decode_payload::<
            SessionCreatedMsg,
        >(data)?)),
        MessageType::SessionJoined => Ok(ServerMessage::SessionJoined(decode_payload::<
            SessionJoinedMsg,
        >(data)?)),
        MessageType::RosterUpdated => Ok(ServerMessage::RosterUpdated(decode_payload::<
            RosterUpdatedMsg,
        >(data)?)),
        MessageType::PhaseEntered => Ok(ServerMessage::PhaseEntered(decode_payload::<
            PhaseEnteredMsg,
        >(data)?)),
        MessageType::SubmissionAccepted => Ok(ServerMessage::SubmissionAccepted(
            decode_payload::<SubmissionAcceptedMsg>(data)?,
        )),
        MessageType::SessionClosed => Ok(ServerMessage::SessionClosed(decode_payload::<
            SessionClosedMsg,
        >(data)?)),
        MessageType::Rejected => Ok(ServerMessage::Rejected(decode_payload::<RejectedMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
