use std::sync::Arc;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot,
};

use gatehouse::{
    provider::{
        CredentialRef, EnvCredentialProvider, LlmProvider, OpenAiCompatibleProvider,
        ProviderBackendConfig, ProviderDialect, ProviderErrorKind,
    },
    types::Stance,
};

use crate::support::request;

/// Serves exactly one canned HTTP response and hands back the raw request it received.
async fn one_shot_server(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener binds");
    let address = listener.local_addr().expect("local addr");
    let (captured_tx, captured_rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut raw = Vec::new();
        let mut buffer = [0u8; 4096];
        loop {
            let Ok(read) = socket.read(&mut buffer).await else {
                return;
            };
            if read == 0 {
                break;
            }
            raw.extend_from_slice(&buffer[..read]);
            if request_complete(&raw) {
                break;
            }
        }
        let response = format!(
            "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        let _ = captured_tx.send(String::from_utf8_lossy(&raw).into_owned());
    });

    (format!("http://{address}/v1"), captured_rx)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

fn provider(endpoint: String, credential: CredentialRef) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new(
        ProviderBackendConfig {
            id: "primary".to_string(),
            dialect: ProviderDialect::OpenaiCompatible,
            endpoint,
            model: "configured-model".to_string(),
            credential,
            max_output_tokens: Some(256),
        },
        Arc::new(EnvCredentialProvider),
    )
}

#[tokio::test]
async fn given_completion_when_generating_then_text_model_and_usage_are_read() {
    let (endpoint, captured) = one_shot_server(
        "HTTP/1.1 200 OK",
        r#"{"model":"served-model","choices":[{"message":{"role":"assistant","content":"Boil it gently."}}],"usage":{"total_tokens":42}}"#,
    )
    .await;
    let provider = provider(
        endpoint,
        CredentialRef::InlineToken {
            token: "test-token".to_string(),
        },
    );

    let generation = provider
        .generate(&request(Stance::Lens))
        .await
        .expect("completion parsed");

    assert_eq!(generation.text, "Boil it gently.");
    assert_eq!(generation.model, "served-model");
    assert_eq!(generation.provider_id, "primary");
    assert_eq!(generation.tokens_used, Some(42));

    let raw = captured.await.expect("request captured");
    let lower = raw.to_lowercase();
    assert!(raw.starts_with("POST /v1/chat/completions"), "{raw}");
    assert!(lower.contains("authorization: bearer test-token"));
    assert!(lower.contains("x-request-id: req_provider"));
    assert!(raw.contains("\"max_tokens\":256"));
    assert!(raw.contains("How do I boil an egg?"));
}

#[tokio::test]
async fn given_rate_limit_status_when_generating_then_retryable_rate_limited() {
    let (endpoint, _captured) =
        one_shot_server("HTTP/1.1 429 Too Many Requests", r#"{"error":"slow down"}"#).await;

    let err = provider(endpoint, CredentialRef::None)
        .generate(&request(Stance::Lens))
        .await
        .expect_err("rate limited");

    assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    assert!(err.retryable);
    assert_eq!(err.http_status, Some(429));
}

#[tokio::test]
async fn given_body_without_choices_when_generating_then_protocol_violation() {
    let (endpoint, _captured) = one_shot_server("HTTP/1.1 200 OK", r#"{"choices":[]}"#).await;

    let err = provider(endpoint, CredentialRef::None)
        .generate(&request(Stance::Lens))
        .await
        .expect_err("malformed completion");

    assert_eq!(err.kind, ProviderErrorKind::ProtocolViolation);
    assert!(!err.retryable);
}

#[tokio::test]
async fn given_missing_env_credential_when_generating_then_authentication_error_without_network() {
    let err = provider(
        "http://127.0.0.1:9/v1".to_string(),
        CredentialRef::Env {
            var: "GATEHOUSE_TEST_UNSET_CREDENTIAL".to_string(),
        },
    )
    .generate(&request(Stance::Lens))
    .await
    .expect_err("credential missing");

    assert_eq!(err.kind, ProviderErrorKind::Authentication);
    assert!(!err.retryable);
}
