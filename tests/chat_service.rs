use std::sync::Arc;
use std::time::Duration;

use chat_widget::chat_client::{ChatClient, ChatRequest, ChatService, ChatServiceError};
use chat_widget::cli::chat::conversation_state::Turn;
use chat_widget::cli::chat::view::NullView;
use chat_widget::cli::chat::widget::{ChatWidget, WidgetConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout: Duration) -> ChatClient {
    let base = Url::parse(&server.uri()).unwrap();
    ChatClient::new(&base, timeout).unwrap()
}

fn widget(client: ChatClient, config: WidgetConfig) -> ChatWidget {
    ChatWidget::new(Arc::new(client), Arc::new(NullView), config)
}

#[tokio::test]
async fn hello_gets_a_reply_and_a_conversation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({ "message": "Hello" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Hi", "conversation_id": "c1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let widget = widget(client(&server, Duration::from_secs(5)), WidgetConfig::default());
    widget.submit("Hello").await;

    assert_eq!(widget.turns(), vec![Turn::user("Hello"), Turn::assistant("Hi")]);
    assert_eq!(widget.conversation_id(), Some("c1".to_string()));
}

#[tokio::test]
async fn second_message_continues_the_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({ "message": "Hello" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Hi", "conversation_id": "c1" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({ "message": "Again", "conversation_id": "c1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Still here", "conversation_id": "c1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let widget = widget(client(&server, Duration::from_secs(5)), WidgetConfig::default());
    widget.submit("Hello").await;
    widget.submit("Again").await;

    assert_eq!(widget.turns().last(), Some(&Turn::assistant("Still here")));
}

#[tokio::test]
async fn detail_of_a_server_error_is_shown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "bad request" })))
        .mount(&server)
        .await;

    let widget = widget(client(&server, Duration::from_secs(5)), WidgetConfig::default());
    widget.submit("Hello").await;

    assert_eq!(
        widget.turns(),
        vec![Turn::user("Hello"), Turn::assistant("❌ Error: bad request")]
    );
    assert_eq!(widget.conversation_id(), None);
}

#[tokio::test]
async fn server_error_without_detail_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));
    let request = ChatRequest {
        message: "Hello".to_string(),
        conversation_id: None,
    };
    assert_eq!(
        client.send(&request).await,
        Err(ChatServiceError::Server {
            status: 502,
            detail: None,
        })
    );

    let widget = widget(client, WidgetConfig::default());
    widget.submit("Hello").await;
    assert_eq!(widget.turns().last(), Some(&Turn::assistant("❌ Error: Server error.")));
}

#[tokio::test]
async fn malformed_reply_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "Hi" })))
        .mount(&server)
        .await;

    let widget = widget(client(&server, Duration::from_secs(5)), WidgetConfig::default());
    widget.submit("Hello").await;

    assert_eq!(widget.turns().last(), Some(&Turn::assistant("❌ Error: Server error.")));
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Too late", "conversation_id": "c1" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let widget = widget(client(&server, Duration::from_millis(200)), WidgetConfig::default());
    widget.submit("Hello").await;

    assert_eq!(
        widget.turns().last(),
        Some(&Turn::assistant("❌ Error: Response time exceeded."))
    );
    assert!(!widget.is_awaiting_response());
}

#[tokio::test]
async fn unreachable_service_is_reported() {
    // Grab a free port and close it again so nothing listens there.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let base = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let client = ChatClient::new(&base, Duration::from_secs(5)).unwrap();

    let widget = widget(client, WidgetConfig::default());
    widget.submit("Hello").await;

    assert_eq!(
        widget.turns().last(),
        Some(&Turn::assistant("❌ Error: Unable to reach the server."))
    );

    // The conversation stays usable.
    widget.reset();
    assert!(widget.turns().is_empty());
}

#[tokio::test]
async fn untracked_conversation_never_sends_an_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({ "message": "Hello" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Hi", "conversation_id": "c1" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = WidgetConfig {
        track_conversation: false,
        ..WidgetConfig::default()
    };
    let widget = widget(client(&server, Duration::from_secs(5)), config);
    widget.submit("Hello").await;
    widget.submit("Hello").await;

    assert_eq!(widget.conversation_id(), None);
    assert_eq!(widget.turns().len(), 4);
}
