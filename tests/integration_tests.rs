//! End-to-end tests against a canned HTTP backend on a loopback port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use palaver::chat::{ChatConfig, ChatSession, ConnectionConfig, ResponseMode};
use palaver::{Backend, ChatClient, Message, PlainTextRenderer, StopReason, StreamFragment};

const REPLY: &str = "A palindrome reads the same forwards and backwards.";

#[derive(Debug, Clone)]
struct Recorded {
    request_line: String,
    headers: Vec<(String, String)>,
    body: Value,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Serves each canned response to one connection, in order, then stops accepting.
struct Fixture {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Fixture {
    async fn serve(responses: Vec<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                if let Some(request) = read_request(&mut socket).await {
                    recorded.lock().unwrap().push(request);
                }
                let _ = socket.write_all(&response).await;
                let _ = socket.flush().await;
                let _ = socket.shutdown().await;
            }
        });
        Self {
            base_url: format!("http://{addr}/"),
            requests,
        }
    }

    fn backend(&self) -> Backend {
        Backend::from_config(&ConnectionConfig {
            base_url: self.base_url.clone(),
            api_key: "ollama".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let length: usize = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    Some(Recorded {
        request_line,
        headers,
        body,
    })
}

fn json_response(status: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

fn sse_event(name: &str, data: Value) -> String {
    format!("event: {name}\ndata: {data}\n\n")
}

fn sse_prelude() -> String {
    let mut body = sse_event(
        "message_start",
        json!({
            "type": "message_start",
            "message": {
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "qwen3-coder",
                "content": [],
                "stop_reason": null,
                "stop_sequence": null,
                "usage": {"input_tokens": 12, "output_tokens": 1}
            }
        }),
    );
    body.push_str(&sse_event(
        "content_block_start",
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
    ));
    body.push_str(&sse_event("ping", json!({"type": "ping"})));
    body
}

fn sse_delta(text: &str) -> String {
    sse_event(
        "content_block_delta",
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": text}}),
    )
}

fn sse_epilogue() -> String {
    let mut body = sse_event(
        "content_block_stop",
        json!({"type": "content_block_stop", "index": 0}),
    );
    body.push_str(&sse_event(
        "message_delta",
        json!({
            "type": "message_delta",
            "delta": {"stop_reason": "end_turn", "stop_sequence": null},
            "usage": {"output_tokens": 40}
        }),
    ));
    body.push_str(&sse_event("message_stop", json!({"type": "message_stop"})));
    body
}

fn sse_response(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{body}"
    )
    .into_bytes()
}

fn blocking_body() -> String {
    json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "model": "qwen3-coder",
        "content": [{"type": "text", "text": REPLY}],
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": 12, "output_tokens": 40}
    })
    .to_string()
}

fn streamed_reply() -> String {
    let mut body = sse_prelude();
    for piece in ["A palindrome ", "reads the same ", "forwards and backwards."] {
        body.push_str(&sse_delta(piece));
    }
    body.push_str(&sse_epilogue());
    body
}

fn history() -> Vec<Message> {
    vec![Message::user("What is a palindrome?")]
}

#[tokio::test]
async fn blocking_completion() {
    let fixture = Fixture::serve(vec![json_response("200 OK", &blocking_body())]).await;
    let completion = fixture
        .backend()
        .complete(&history(), &ChatConfig::new())
        .await
        .unwrap();
    assert_eq!(completion.text, REPLY);
    assert_eq!(completion.stop_reason, Some(StopReason::EndTurn));
    assert_eq!(completion.usage.input_tokens, 12);
    assert_eq!(completion.usage.output_tokens, 40);
}

#[tokio::test]
async fn request_shape() {
    let fixture = Fixture::serve(vec![json_response("200 OK", &blocking_body())]).await;
    let config = ChatConfig::new()
        .with_system_prompt("Be brief.")
        .with_max_tokens(256);
    fixture.backend().complete(&history(), &config).await.unwrap();

    let requests = fixture.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.request_line, "POST /v1/messages HTTP/1.1");
    assert_eq!(request.header("x-api-key"), Some("ollama"));
    assert_eq!(request.header("anthropic-version"), Some("2023-06-01"));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.body["model"], "qwen3-coder");
    assert_eq!(request.body["max_tokens"], 256);
    assert_eq!(request.body["system"], "Be brief.");
    assert_eq!(
        request.body["messages"],
        json!([{"role": "user", "content": "What is a palindrome?"}])
    );
    assert_ne!(request.body["stream"], json!(true));
}

#[tokio::test]
async fn streaming_matches_blocking() {
    let fixture = Fixture::serve(vec![
        json_response("200 OK", &blocking_body()),
        sse_response(&streamed_reply()),
    ])
    .await;
    let backend = fixture.backend();
    let config = ChatConfig::new();
    let blocking = backend.complete(&history(), &config).await.unwrap();

    let mut stream = backend
        .complete_streaming(&history(), &config)
        .await
        .unwrap();
    let mut text = String::new();
    let mut done = None;
    while let Some(fragment) = stream.next().await {
        match fragment.unwrap() {
            StreamFragment::Text(piece) => {
                assert!(done.is_none());
                text.push_str(&piece);
            }
            StreamFragment::Done(completion) => done = Some(completion),
        }
    }
    let done = done.unwrap();
    assert_eq!(text, blocking.text);
    assert_eq!(done, blocking);

    let requests = fixture.requests();
    assert_eq!(requests[1].header("accept"), Some("text/event-stream"));
    assert_eq!(requests[1].body["stream"], json!(true));
}

#[tokio::test]
async fn session_streams_a_turn() {
    let fixture = Fixture::serve(vec![sse_response(&streamed_reply())]).await;
    let config = ChatConfig::new().with_mode(ResponseMode::Streaming);
    let mut session = ChatSession::new(fixture.backend(), config);
    let mut out = PlainTextRenderer::with_writer(Vec::new(), false);

    let outcome = session
        .run_turn("What is a palindrome?", &mut out)
        .await
        .unwrap();
    assert_eq!(outcome.fragments, 3);
    assert_eq!(session.message_count(), 2);
    assert_eq!(session.history().as_slice()[1], Message::assistant(REPLY));

    let text = String::from_utf8(out.into_inner()).unwrap();
    assert_eq!(
        text,
        format!(
            "Assistant: {REPLY}\nStop reason: end_turn | Input tokens: 12 | Output tokens: 40 | Total tokens: 52\n"
        )
    );
}

#[tokio::test]
async fn cut_stream_keeps_partial_text() {
    let mut body = sse_prelude();
    body.push_str(&sse_delta("Hel"));
    body.push_str(&sse_delta("lo"));
    // Promise more bytes than are sent so the body ends early.
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len() + 4096
    );
    let fixture = Fixture::serve(vec![response.into_bytes()]).await;
    let config = ChatConfig::new().with_mode(ResponseMode::Streaming);
    let mut session = ChatSession::new(fixture.backend(), config);
    let mut out = PlainTextRenderer::with_writer(Vec::new(), false);

    let err = session.run_turn("Say hello", &mut out).await.unwrap_err();
    assert!(err.is_stream_interrupted(), "{err:?}");
    assert_eq!(err.partial_text(), Some("Hello"));
    assert_eq!(session.message_count(), 0);

    let text = String::from_utf8(out.into_inner()).unwrap();
    assert!(text.starts_with("Assistant: Hello\n"), "{text}");
}

#[tokio::test]
async fn dropping_a_stream_releases_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (released_tx, released_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await.unwrap();
        let mut body = sse_prelude();
        body.push_str(&sse_delta("Hel"));
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        // Hold the response open; the client must hang up first.
        let mut buf = [0u8; 1024];
        let released = loop {
            match tokio::time::timeout(Duration::from_secs(5), socket.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) => break true,
                Ok(Ok(_)) => continue,
                Err(_) => break false,
            }
        };
        let _ = released_tx.send(released);
    });

    let backend = Backend::with_options(
        "ollama",
        &format!("http://{addr}/"),
        Duration::from_secs(30),
    )
    .unwrap();
    let mut stream = backend
        .complete_streaming(&history(), &ChatConfig::new())
        .await
        .unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, StreamFragment::Text("Hel".to_string()));
    drop(stream);

    let released = tokio::time::timeout(Duration::from_secs(10), released_rx)
        .await
        .unwrap()
        .unwrap();
    assert!(released, "connection still open after the stream was dropped");
}

#[tokio::test]
async fn stream_without_message_stop() {
    let mut body = sse_prelude();
    body.push_str(&sse_delta("Hel"));
    body.push_str(&sse_delta("lo"));
    let fixture = Fixture::serve(vec![sse_response(&body)]).await;
    let mut stream = fixture
        .backend()
        .complete_streaming(&history(), &ChatConfig::new())
        .await
        .unwrap();
    let mut last = None;
    while let Some(fragment) = stream.next().await {
        last = Some(fragment);
    }
    let err = last.unwrap().unwrap_err();
    assert!(err.is_stream_interrupted());
    assert_eq!(err.partial_text(), Some("Hello"));
}

#[tokio::test]
async fn server_error_is_backend_error() {
    let body = json!({
        "type": "error",
        "error": {"type": "api_error", "message": "model exploded"}
    })
    .to_string();
    let fixture = Fixture::serve(vec![json_response("500 Internal Server Error", &body)]).await;
    let err = fixture
        .backend()
        .complete(&history(), &ChatConfig::new())
        .await
        .unwrap_err();
    assert!(err.is_backend_error());
    assert_eq!(err.status_code(), Some(500));
    assert!(err.to_string().contains("model exploded"), "{err}");
}

#[tokio::test]
async fn not_found_is_backend_error() {
    let fixture = Fixture::serve(vec![json_response("404 Not Found", "")]).await;
    let err = fixture
        .backend()
        .complete_streaming(&history(), &ChatConfig::new())
        .await
        .err()
        .unwrap();
    assert!(err.is_backend_error());
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let fixture = Fixture::serve(vec![
        json_response("200 OK", "{\"id\": \"msg_1\", \"content\": "),
        json_response("200 OK", "{\"id\": \"msg_1\"}"),
    ])
    .await;
    let backend = fixture.backend();
    let err = backend
        .complete(&history(), &ChatConfig::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_response(), "{err:?}");
    let err = backend
        .complete(&history(), &ChatConfig::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_response(), "{err:?}");
}

#[tokio::test]
async fn closed_port_is_backend_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = Backend::with_options(
        "ollama",
        &format!("http://{addr}/"),
        Duration::from_secs(5),
    )
    .unwrap();
    let err = backend
        .complete(&history(), &ChatConfig::new())
        .await
        .unwrap_err();
    assert!(err.is_backend_unavailable(), "{err:?}");

    let mut session = ChatSession::new(backend, ChatConfig::new());
    let mut out = PlainTextRenderer::with_writer(Vec::new(), false);
    assert!(session.run_turn("hello", &mut out).await.is_err());
    assert_eq!(session.message_count(), 0);
}
