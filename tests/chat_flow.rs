//! End-to-end tests for the chat API
//!
//! Drives the real router with mock OpenAI and Qdrant servers, so every
//! test exercises the full pipeline: request parsing, token decode, turn
//! classification, retrieval, composition, and token re-encode.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bridgechat::config::Config;
use bridgechat::server::{build_state, router};
use bridgechat::session::{SessionCodec, Turn};
use bridgechat::state::Tone;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_SECRET: &str = "a-long-enough-test-secret";

struct TestHarness {
    app: Router,
    codec: SessionCodec,
    openai: MockServer,
    qdrant: MockServer,
}

async fn harness() -> TestHarness {
    let openai = MockServer::start().await;
    let qdrant = MockServer::start().await;

    let mut config = Config::default();
    config.openai.api_key = "sk-test".to_string();
    config.openai.api_base = openai.uri();
    config.qdrant.url = qdrant.uri();
    config.session.secret = TEST_SECRET.to_string();

    let state = build_state(&config).expect("state should build");
    TestHarness {
        app: router(state),
        codec: SessionCodec::new(TEST_SECRET.to_string(), 24),
        openai,
        qdrant,
    }
}

async fn mount_embedding(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.1, 0.2, 0.3]}],
            "model": "text-embedding-3-small"
        })))
        .mount(server)
        .await;
}

async fn mount_search(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/collections/bridgetext_scenarios/points/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"payload": {"text": "A new hire whose manager reassigns tasks mid-sprint."}}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .mount(server)
        .await;
}

async fn post_chat(app: Router, message: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut body = json!({"message": message});
    if let Some(token) = token {
        body["token"] = json!(token);
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn greeting_answers_without_any_upstream_call() {
    let harness = harness().await;
    // No mocks mounted: an upstream call would fail the turn visibly

    let (status, body) = post_chat(harness.app, "hi", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Hello! How can I help you today?");
    assert_eq!(body["quick_replies"].as_array().unwrap().len(), 0);
    assert_eq!(body["limit_reached"], false);

    let decoded = harness.codec.decode(body["token"].as_str().unwrap());
    assert!(decoded.valid);
    assert_eq!(decoded.history.len(), 1);
}

#[tokio::test]
async fn first_substantive_message_offers_tone_quick_replies() {
    let harness = harness().await;

    let (status, body) = post_chat(
        harness.app,
        "My manager keeps changing deadlines without notice",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .contains("how would you like me to respond?"));
    assert_eq!(body["quick_replies"], json!(["Professional", "Casual"]));

    // No completion request was made for the tone prompt
    assert!(harness.openai.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn tone_selection_re_answers_the_stated_problem() {
    let harness = harness().await;
    mount_embedding(&harness.openai).await;
    mount_search(&harness.qdrant).await;
    mount_completion(&harness.openai, "**Spot** the pattern, then raise it in your next 1:1.")
        .await;

    let (_, first) = post_chat(
        harness.app.clone(),
        "My manager keeps changing deadlines without notice",
        None,
    )
    .await;
    let token = first["token"].as_str().unwrap();

    let (status, second) = post_chat(harness.app, "Casual", Some(token)).await;

    assert_eq!(status, StatusCode::OK);
    // Markup is normalized for display
    assert_eq!(
        second["response"],
        "<b>Spot</b> the pattern, then raise it in your next 1:1."
    );
    assert_eq!(second["quick_replies"].as_array().unwrap().len(), 0);

    let decoded = harness.codec.decode(second["token"].as_str().unwrap());
    assert_eq!(decoded.tone, Some(Tone::Casual));
    assert_eq!(decoded.history.len(), 2);

    // The completion prompt carried the original problem, not the tone word
    let completion_requests: Vec<_> = harness
        .openai
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/chat/completions")
        .collect();
    assert_eq!(completion_requests.len(), 1);
    let sent: Value = serde_json::from_slice(&completion_requests[0].body).unwrap();
    let system_prompt = sent["messages"][0]["content"].as_str().unwrap();
    assert!(system_prompt.contains("My manager keeps changing deadlines without notice"));
    assert!(system_prompt.contains("A new hire whose manager reassigns tasks mid-sprint."));
}

#[tokio::test]
async fn violence_terms_short_circuit_before_any_upstream_call() {
    let harness = harness().await;

    let (status, body) = post_chat(harness.app, "my coworker threatened to hit me", None).await;

    assert_eq!(status, StatusCode::OK);
    let response = body["response"].as_str().unwrap();
    assert!(response.contains("1-800-799-7233"));
    assert!(response.contains("911"));
    assert_eq!(body["quick_replies"].as_array().unwrap().len(), 0);

    assert!(harness.openai.received_requests().await.unwrap().is_empty());
    assert!(harness.qdrant.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn workload_phrasing_is_not_flagged_as_violence() {
    let harness = harness().await;
    mount_embedding(&harness.openai).await;
    mount_search(&harness.qdrant).await;
    mount_completion(&harness.openai, "Break the deadline into chunks.").await;

    let token = harness
        .codec
        .encode(&[], Some(Tone::Professional))
        .unwrap();
    let (status, body) = post_chat(
        harness.app,
        "this deadline is beating me down, I'm drowning in work",
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Break the deadline into chunks.");
}

#[tokio::test]
async fn eleventh_message_hits_the_turn_limit() {
    let harness = harness().await;

    let full_history: Vec<Turn> = (0..10)
        .map(|i| Turn::new(format!("message {}", i), format!("reply {}", i)))
        .collect();
    let token = harness
        .codec
        .encode(&full_history, Some(Tone::Casual))
        .unwrap();

    let (status, body) = post_chat(harness.app, "one more question", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit_reached"], true);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .contains("free message limit"));

    // History did not grow
    let decoded = harness.codec.decode(body["token"].as_str().unwrap());
    assert_eq!(decoded.history.len(), 10);
}

#[tokio::test]
async fn completion_failure_yields_apology_not_http_error() {
    let harness = harness().await;
    mount_embedding(&harness.openai).await;
    mount_search(&harness.qdrant).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.openai)
        .await;

    let token = harness.codec.encode(&[], Some(Tone::Casual)).unwrap();
    let (status, body) = post_chat(
        harness.app,
        "my boss takes credit for my work",
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .contains("having trouble generating a response"));
}

#[tokio::test]
async fn retrieval_failure_still_answers() {
    let harness = harness().await;
    // Embeddings are down entirely
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&harness.openai)
        .await;
    mount_completion(&harness.openai, "Advice without dataset context.").await;

    let token = harness.codec.encode(&[], Some(Tone::Professional)).unwrap();
    let (status, body) = post_chat(
        harness.app,
        "my boss takes credit for my work",
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Advice without dataset context.");
    assert!(harness.qdrant.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn tampered_token_starts_a_fresh_session() {
    let harness = harness().await;

    let token = harness.codec.encode(&[], Some(Tone::Casual)).unwrap();
    let tampered = format!("{}x", token);

    let (status, body) = post_chat(harness.app, "hi", Some(&tampered)).await;

    // Fresh session: the greeting branch applies again
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Hello! How can I help you today?");
}

#[tokio::test]
async fn chat_accepts_bearer_token() {
    let harness = harness().await;

    let history = vec![Turn::new("hi".to_string(), "Hello!".to_string())];
    let token = harness.codec.encode(&history, Some(Tone::Casual)).unwrap();

    mount_embedding(&harness.openai).await;
    mount_search(&harness.qdrant).await;
    mount_completion(&harness.openai, "Name the behavior, then ask for what you need.").await;

    let response = harness
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::from(
                    json!({"message": "my coworker keeps interrupting me in meetings"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    // The session from the header was picked up: history grew from 1 to 2
    let decoded = harness.codec.decode(body["token"].as_str().unwrap());
    assert_eq!(decoded.history.len(), 2);
    assert_eq!(decoded.tone, Some(Tone::Casual));
}

#[tokio::test]
async fn health_is_healthy_with_both_dependencies_up() {
    let harness = harness().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&harness.openai)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": {"collections": []}})),
        )
        .mount(&harness.qdrant)
        .await;

    let response = harness
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["openai_ready"], true);
    assert_eq!(body["qdrant_connected"], true);
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["embeddings"], "text-embedding-3-small");
}
