use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use partyline_core::net::messages::{
    ClientMessage, CreateSessionMsg, JoinSessionMsg, RejectReason, ServerMessage, SubmitAnswerMsg,
};
use partyline_core::net::protocol::{PROTOCOL_VERSION, decode_server_message, encode_client_message};
use partyline_core::phase::Phase;
use partyline_core::player::PlayerId;

use partyline_server::config::ServerConfig;
use partyline_server::{build_app, spawn_session_sweeper};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default config.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);
        spawn_session_sweeper(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Create a session. Returns (session_code, player_id) after consuming the
/// creator's SessionCreated and RosterUpdated.
pub async fn ws_create_session(stream: &mut WsStream, name: &str) -> (String, PlayerId) {
    let msg = ClientMessage::CreateSession(CreateSessionMsg {
        player_name: name.to_string(),
        protocol_version: PROTOCOL_VERSION,
    });
    ws_send_client_msg(stream, &msg).await;

    let created = match ws_read_server_msg(stream).await {
        ServerMessage::SessionCreated(c) => c,
        other => panic!("Expected SessionCreated, got: {other:?}"),
    };
    match ws_read_server_msg(stream).await {
        ServerMessage::RosterUpdated(r) => assert_eq!(r.players.len(), 1),
        other => panic!("Expected RosterUpdated, got: {other:?}"),
    }
    (created.session_code, created.player_id)
}

/// Send a JoinSession and return the first reply (SessionJoined or Rejected).
pub async fn ws_join_session(stream: &mut WsStream, code: &str, name: &str) -> ServerMessage {
    let msg = ClientMessage::JoinSession(JoinSessionMsg {
        session_code: code.to_string(),
        player_name: name.to_string(),
        protocol_version: PROTOCOL_VERSION,
    });
    ws_send_client_msg(stream, &msg).await;
    ws_read_server_msg(stream).await
}

pub async fn ws_submit(stream: &mut WsStream, code: &str, phase: Phase, content: &str) {
    let msg = ClientMessage::SubmitAnswer(SubmitAnswerMsg {
        session_code: code.to_string(),
        phase,
        content: content.to_string(),
    });
    ws_send_client_msg(stream, &msg).await;
}

/// Read messages until a PhaseEntered arrives, skipping anything else.
pub async fn ws_wait_for_phase(stream: &mut WsStream) -> partyline_core::net::messages::PhaseEnteredMsg {
    loop {
        if let ServerMessage::PhaseEntered(p) = ws_read_server_msg(stream).await {
            return p;
        }
    }
}

/// Read messages until a Rejected arrives and return its reason.
pub async fn ws_wait_for_rejection(stream: &mut WsStream) -> RejectReason {
    loop {
        if let ServerMessage::Rejected(r) = ws_read_server_msg(stream).await {
            return r.reason;
        }
    }
}

/// Host creates a session and a second player joins. All setup messages are
/// consumed from both streams.
pub async fn two_player_session(server: &TestServer) -> (String, WsStream, WsStream) {
    let mut host = ws_connect(&server.ws_url()).await;
    let (code, _) = ws_create_session(&mut host, "Alice").await;

    let mut guest = ws_connect(&server.ws_url()).await;
    match ws_join_session(&mut guest, &code, "Bob").await {
        ServerMessage::SessionJoined(j) => assert_eq!(j.session_code, code),
        other => panic!("Expected SessionJoined, got: {other:?}"),
    }
    // Both receive the two-player roster
    for stream in [&mut host, &mut guest] {
        match ws_read_server_msg(stream).await {
            ServerMessage::RosterUpdated(r) => assert_eq!(r.players.len(), 2),
            other => panic!("Expected RosterUpdated, got: {other:?}"),
        }
    }
    (code, host, guest)
}
