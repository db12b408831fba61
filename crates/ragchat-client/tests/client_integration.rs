#![allow(clippy::unwrap_used, clippy::expect_used)]

use ragchat_client::{ChatApi, ClientConfig, TurnStatus, TurnStreamer};
use ragchat_core::PersistKey;
use ragchat_reveal::{RevealRate, RevealStore};
use ragchat_stream::StreamClient;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ndjson(lines: &[&str]) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

async fn mount_stream(server: &MockServer, route: &str, lines: &[&str]) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(lines)))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Turn streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_turn_completes_and_fills_fields() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        "/conversations/c1/messages",
        &[
            r#"{"type":"status","content":"Searching documents"}"#,
            r#"{"type":"rewritten_question","content":"capital of France?"}"#,
            r#"{"type":"token","content":"Par"}"#,
            r#"{"type":"token","content":"is"}"#,
            r#"{"type":"final","answer":"Paris","documents":[{"id":"d1"}]}"#,
        ],
    )
    .await;

    let store = RevealStore::new();
    let streamer = TurnStreamer::new(StreamClient::new(server.uri()), store.clone());
    let key = PersistKey::for_field("c1", "m1", "answer");

    let mut seen = Vec::new();
    let outcome = streamer
        .run_with(
            "/conversations/c1/messages",
            &serde_json::json!({"content": "capital of France"}),
            &key,
            |event, _| seen.push(event.kind().to_string()),
        )
        .await;

    assert!(outcome.is_completed());
    assert_eq!(seen, vec!["status", "rewritten_question", "token", "token", "final"]);
    assert_eq!(outcome.fields.answer_source(), "Paris");
    assert_eq!(outcome.fields.final_answer(), Some("Paris"));
    assert_eq!(outcome.fields.rewritten_question(), Some("capital of France?"));
    assert_eq!(outcome.fields.documents().map(Vec::len), Some(1));

    let snap = store.snapshot(&key).unwrap();
    assert_eq!(snap.source_len, "Paris".len());
}

#[tokio::test]
async fn test_final_answer_replaces_token_preview() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        "/stream",
        &[
            r#"{"type":"token","content":"Draft ans"}"#,
            r#"{"type":"final","answer":"The corrected answer."}"#,
        ],
    )
    .await;

    let store = RevealStore::new();
    let streamer = TurnStreamer::new(StreamClient::new(server.uri()), store.clone());
    let key = PersistKey::from("c2:m1:answer");
    let outcome = streamer.run("/stream", &serde_json::json!({}), &key).await;

    assert!(outcome.is_completed());
    // Nothing was revealed yet, so the timeline animates the final text.
    let snap = store.snapshot(&key).unwrap();
    assert_eq!(snap.source_len, "The corrected answer.".len());
    assert_eq!(snap.displayed, "");

    let rate = RevealRate::new(1_000_000.0, 1);
    for _ in 0..10 {
        store.tick(&key, &rate);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        streamer.visible_answer(&key, &outcome.fields),
        "The corrected answer."
    );
}

#[tokio::test]
async fn test_shorter_final_shown_verbatim_once_revealed() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        "/stream",
        &[
            r#"{"type":"token","content":"Hello"}"#,
            r#"{"type":"token","content":" world"}"#,
            r#"{"type":"final","answer":"Hello"}"#,
        ],
    )
    .await;

    let store = RevealStore::new();
    let streamer = TurnStreamer::new(StreamClient::new(server.uri()), store.clone());
    let key = PersistKey::from("c2:m2:answer");
    let rate = RevealRate::new(100.0, 1);

    // Reveal every token in full as soon as it lands.
    let revealer = store.clone();
    let tick_key = key.clone();
    let base = tokio::time::Instant::now();
    let mut step = 0;
    let outcome = streamer
        .run_with("/stream", &serde_json::json!({}), &key, |event, _| {
            if !event.is_final() {
                step += 1;
                revealer.tick_at(&tick_key, &rate, base + Duration::from_secs(10 * step));
            }
        })
        .await;

    assert!(outcome.is_completed());
    let snap = store.snapshot(&key).unwrap();
    assert_eq!(snap.displayed, "Hello");
    assert_eq!(snap.pending_chars, 0);
    assert_eq!(streamer.visible_answer(&key, &outcome.fields), "Hello");
}

#[tokio::test]
async fn test_final_extending_revealed_text_only_queues_the_rest() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        "/stream",
        &[
            r#"{"type":"token","content":"Hel"}"#,
            r#"{"type":"final","answer":"Hello world"}"#,
        ],
    )
    .await;

    let store = RevealStore::new();
    let streamer = TurnStreamer::new(StreamClient::new(server.uri()), store.clone());
    let key = PersistKey::from("c2:m3:answer");
    let rate = RevealRate::new(100.0, 1);

    let revealer = store.clone();
    let tick_key = key.clone();
    let base = tokio::time::Instant::now();
    let mut step = 0;
    let outcome = streamer
        .run_with("/stream", &serde_json::json!({}), &key, |event, _| {
            if !event.is_final() {
                step += 1;
                revealer.tick_at(&tick_key, &rate, base + Duration::from_secs(10 * step));
            }
        })
        .await;

    assert!(outcome.is_completed());
    let snap = store.snapshot(&key).unwrap();
    assert_eq!(snap.displayed, "Hel");
    assert_eq!(snap.pending_chars, "lo world".len());
    assert_eq!(streamer.visible_answer(&key, &outcome.fields), "Hel");
}

#[tokio::test]
async fn test_visible_answer_is_prefix_until_caught_up() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        "/stream",
        &[r#"{"type":"token","content":"abcdefghij"}"#],
    )
    .await;

    let store = RevealStore::new();
    let streamer = TurnStreamer::new(StreamClient::new(server.uri()), store.clone());
    let key = PersistKey::from("c3:m1:answer");
    let outcome = streamer.run("/stream", &serde_json::json!({}), &key).await;
    assert!(outcome.is_completed());

    let visible = streamer.visible_answer(&key, &outcome.fields);
    assert!(outcome.fields.answer_source().starts_with(&visible));
    assert!(visible.len() < outcome.fields.answer_source().len());
}

#[tokio::test]
async fn test_server_error_fails_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let streamer = TurnStreamer::new(StreamClient::new(server.uri()), RevealStore::new());
    let key = PersistKey::from("c4:m1:answer");
    let outcome = streamer.run("/stream", &serde_json::json!({}), &key).await;

    match outcome.status {
        TurnStatus::Failed(e) => {
            assert!(!e.is_user_abort());
            assert!(e.to_string().contains("500"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_user_stop_settles_as_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ndjson(&[r#"{"type":"token","content":"late"}"#]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let store = RevealStore::new();
    let streamer = Arc::new(TurnStreamer::new(
        StreamClient::new(server.uri()),
        store.clone(),
    ));
    let key = PersistKey::from("c5:m1:answer");

    let task = {
        let streamer = streamer.clone();
        let key = key.clone();
        tokio::spawn(async move { streamer.run("/stream", &serde_json::json!({}), &key).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(streamer.client().abort_current());

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("turn did not settle after abort")
        .unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.fields.answer_source(), "");
    // The abort flag is consumed by the turn.
    assert!(!streamer.client().take_user_abort());
}

// ---------------------------------------------------------------------------
// Conversation endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_hallucination_stream_posts_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/c1/messages/m1/stream-hallucination"))
        .and(body_json(serde_json::json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&[
            r#"{"type":"label","value":1}"#,
            r#"{"type":"reason","content":"Unsupported claim"}"#,
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = ChatApi::new(StreamClient::new(server.uri()));
    let mut kinds = Vec::new();
    api.stream_hallucination("c1", "m1", |e| kinds.push(e.kind().to_string()))
        .await
        .unwrap();
    assert_eq!(kinds, vec!["label", "reason"]);
}

#[tokio::test]
async fn test_stop_endpoints_send_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/c1/messages/m1/stop"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/conversations/c1/stop"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ClientConfig::new(server.uri());
    config.access_token = Some("secret".into());
    let api = ChatApi::from_config(&config);

    api.stop_message("c1", "m1").await.unwrap();
    api.stop_conversation("c1").await.unwrap();
}

#[tokio::test]
async fn test_retry_returns_message_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/c1/messages/m1/retry"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "m1", "output": ""})),
        )
        .mount(&server)
        .await;

    let api = ChatApi::new(StreamClient::new(server.uri()));
    let record = api.retry_message("c1", "m1").await.unwrap();
    assert_eq!(record["id"], "m1");
}

#[tokio::test]
async fn test_endpoint_error_status_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/c1/stop"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such conversation"))
        .mount(&server)
        .await;

    let api = ChatApi::new(StreamClient::new(server.uri()));
    let err = api.stop_conversation("c1").await.unwrap_err();
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("no such conversation"));
}

// ---------------------------------------------------------------------------
// Config files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "base_url = \"http://localhost:8000\"\naccess_token = \"tok\"\n[reveal]\nchars_per_second = 50.0"
    )
    .unwrap();

    let config = ClientConfig::load(file.path()).await.unwrap();
    assert_eq!(config.base_url, "http://localhost:8000");
    assert_eq!(config.access_token.as_deref(), Some("tok"));
    assert_eq!(config.reveal_rate(), RevealRate::new(50.0, 1));
}

#[tokio::test]
async fn test_missing_config_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ClientConfig::load(dir.path().join("absent.toml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ragchat_core::RagchatError::Config(_)));
}
