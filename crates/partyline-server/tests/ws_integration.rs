#[allow(dead_code)]
mod common;

use std::time::Duration;

use futures::SinkExt;
use partyline_core::net::messages::{RejectReason, ServerMessage};
use partyline_core::phase::Phase;
use partyline_core::session_code::is_valid_session_code;
use partyline_server::config::ServerConfig;
use tokio_tungstenite::tungstenite::Message;

use common::{
    TestServer, two_player_session, ws_connect, ws_create_session, ws_join_session,
    ws_read_server_msg, ws_submit, ws_try_read_raw, ws_wait_for_phase, ws_wait_for_rejection,
};

#[tokio::test]
async fn create_session() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    let (code, player_id) = ws_create_session(&mut stream, "Alice").await;
    assert!(is_valid_session_code(&code), "bad code {code}");
    assert_eq!(player_id, 1);
}

#[tokio::test]
async fn join_existing_session() {
    let server = TestServer::new().await;
    let mut host = ws_connect(&server.ws_url()).await;
    let (code, host_id) = ws_create_session(&mut host, "Alice").await;

    let mut guest = ws_connect(&server.ws_url()).await;
    match ws_join_session(&mut guest, &code.to_lowercase(), "Bob").await {
        ServerMessage::SessionJoined(j) => {
            assert_eq!(j.session_code, code);
            assert_eq!(j.phase, Phase::Waiting);
            assert_eq!(j.round, 1);
        },
        other => panic!("Expected SessionJoined, got: {other:?}"),
    }

    match ws_read_server_msg(&mut host).await {
        ServerMessage::RosterUpdated(r) => {
            let names: Vec<_> = r.players.iter().map(|p| p.display_name.as_str()).collect();
            assert_eq!(names, ["Alice", "Bob"]);
            assert_eq!(r.host_id, Some(host_id));
        },
        other => panic!("Expected RosterUpdated, got: {other:?}"),
    }
}

#[tokio::test]
async fn join_unknown_session_is_rejected() {
    let server = TestServer::new().await;
    let mut host = ws_connect(&server.ws_url()).await;
    let (_code, _) = ws_create_session(&mut host, "Alice").await;

    let mut stranger = ws_connect(&server.ws_url()).await;
    match ws_join_session(&mut stranger, "ZZ99", "Carl").await {
        ServerMessage::Rejected(r) => assert_eq!(r.reason, RejectReason::NotFound),
        other => panic!("Expected Rejected, got: {other:?}"),
    }

    // Nothing leaks to the existing session
    assert!(ws_try_read_raw(&mut host, 200).await.is_none());
}

#[tokio::test]
async fn question_round_advances_both_players() {
    let server = TestServer::new().await;
    let (code, mut host, mut guest) = two_player_session(&server).await;

    ws_submit(&mut host, &code, Phase::Waiting, "").await;
    match ws_read_server_msg(&mut host).await {
        ServerMessage::SubmissionAccepted(a) => {
            assert_eq!(a.phase, Phase::Waiting);
            assert_eq!(a.expected, 2);
        },
        other => panic!("Expected SubmissionAccepted, got: {other:?}"),
    }
    ws_submit(&mut guest, &code, Phase::Waiting, "").await;
    assert_eq!(ws_wait_for_phase(&mut host).await.phase, Phase::Question);
    assert_eq!(ws_wait_for_phase(&mut guest).await.phase, Phase::Question);

    ws_submit(&mut host, &code, Phase::Question, "Best pizza topping?").await;
    ws_submit(&mut guest, &code, Phase::Question, "Worst movie ever?").await;
    let entry = ws_wait_for_phase(&mut host).await;
    assert_eq!(entry.phase, Phase::Answer);
    assert!(!entry.forced);
    let prompts: Vec<_> = entry.prompts.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(prompts, ["Best pizza topping?", "Worst movie ever?"]);

    let guest_entry = ws_wait_for_phase(&mut guest).await;
    assert_eq!(guest_entry, entry);
}

#[tokio::test]
async fn straggler_disconnect_completes_phase() {
    let server = TestServer::new().await;
    let (code, mut host, mut guest) = two_player_session(&server).await;

    ws_submit(&mut host, &code, Phase::Waiting, "").await;
    ws_submit(&mut guest, &code, Phase::Waiting, "").await;
    ws_wait_for_phase(&mut host).await;
    ws_wait_for_phase(&mut guest).await;

    ws_submit(&mut host, &code, Phase::Question, "Q1").await;
    match ws_read_server_msg(&mut host).await {
        ServerMessage::SubmissionAccepted(a) => assert_eq!(a.submitted, 1),
        other => panic!("Expected SubmissionAccepted, got: {other:?}"),
    }

    guest.close(None).await.unwrap();

    match ws_read_server_msg(&mut host).await {
        ServerMessage::RosterUpdated(r) => assert_eq!(r.players.len(), 1),
        other => panic!("Expected RosterUpdated, got: {other:?}"),
    }
    let entry = ws_wait_for_phase(&mut host).await;
    assert_eq!(entry.phase, Phase::Answer);
    assert_eq!(entry.prompts.len(), 1);
    assert_eq!(entry.prompts[0].content, "Q1");
}

#[tokio::test]
async fn stale_phase_submission_rejected_only_to_sender() {
    let server = TestServer::new().await;
    let (code, mut host, mut guest) = two_player_session(&server).await;

    ws_submit(&mut guest, &code, Phase::Reaction, "too early").await;
    assert_eq!(
        ws_wait_for_rejection(&mut guest).await,
        RejectReason::InvalidPhase
    );
    assert!(ws_try_read_raw(&mut host, 200).await.is_none());
}

#[tokio::test]
async fn late_join_is_rejected() {
    let server = TestServer::new().await;
    let (code, mut host, mut guest) = two_player_session(&server).await;
    ws_submit(&mut host, &code, Phase::Waiting, "").await;
    ws_submit(&mut guest, &code, Phase::Waiting, "").await;
    ws_wait_for_phase(&mut host).await;

    let mut late = ws_connect(&server.ws_url()).await;
    match ws_join_session(&mut late, &code, "Carl").await {
        ServerMessage::Rejected(r) => assert_eq!(r.reason, RejectReason::InvalidPhase),
        other => panic!("Expected Rejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn full_session_rejects_join() {
    let mut config = ServerConfig::default();
    config.limits.max_players_per_session = 2;
    let server = TestServer::from_config(config).await;
    let (code, mut host, _guest) = two_player_session(&server).await;

    let mut late = ws_connect(&server.ws_url()).await;
    match ws_join_session(&mut late, &code, "Carl").await {
        ServerMessage::Rejected(r) => assert_eq!(r.reason, RejectReason::SessionFull),
        other => panic!("Expected Rejected, got: {other:?}"),
    }
    assert!(ws_try_read_raw(&mut host, 200).await.is_none());
}

#[tokio::test]
async fn malformed_payload_is_rejected() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    stream
        .send(Message::Binary(vec![0x02, 0xC1, 0xC1].into()))
        .await
        .unwrap();
    assert_eq!(
        ws_wait_for_rejection(&mut stream).await,
        RejectReason::Malformed
    );

    // The connection stays usable
    let (code, _) = ws_create_session(&mut stream, "Alice").await;
    assert!(is_valid_session_code(&code));
}

#[tokio::test]
async fn silent_player_is_forced_by_phase_timeout() {
    let mut config = ServerConfig::default();
    config.sessions.phase_timeout_secs = Some(1);
    config.sessions.sweep_interval_secs = 1;
    let server = TestServer::from_config(config).await;
    let (code, mut host, mut guest) = two_player_session(&server).await;

    ws_submit(&mut host, &code, Phase::Waiting, "").await;
    ws_submit(&mut guest, &code, Phase::Waiting, "").await;
    assert_eq!(ws_wait_for_phase(&mut guest).await.phase, Phase::Question);
    ws_submit(&mut host, &code, Phase::Question, "Q1").await;

    let entry = ws_wait_for_phase(&mut guest).await;
    assert_eq!(entry.phase, Phase::Answer);
    assert!(entry.forced);
    let contents: Vec<_> = entry.prompts.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(contents, ["Q1", ""]);
}

#[tokio::test]
async fn connection_limit_returns_error() {
    let mut config = ServerConfig::default();
    config.limits.max_ws_connections = 1;
    let server = TestServer::from_config(config).await;

    let _first = ws_connect(&server.ws_url()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = tokio_tungstenite::connect_async(server.ws_url()).await;
    assert!(second.is_err(), "Second connection should be refused");
}
