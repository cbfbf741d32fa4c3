use actix_web::{App, http::StatusCode, test, web};
use serde_json::{Value, json};
use sis_gateway::{api::Api, backend_client::SisBackendClient};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

type GatewayApi = Api<SisBackendClient>;

#[derive(Debug)]
struct CapturedRequest {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }
}

// Serves one canned response per connection and reports what it received
async fn start_mock_backend(
    status_line: &'static str,
    response_body: &'static str,
) -> (String, mpsc::UnboundedReceiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock backend");
    let address = listener.local_addr().expect("failed to get local address");
    let (captured_tx, captured_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let captured_tx = captured_tx.clone();

            tokio::spawn(async move {
                let mut reader = BufReader::new(&mut stream);
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).await.is_err() {
                    return;
                }

                let mut headers = Vec::new();
                let mut content_length = 0;

                // Read HTTP headers
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.is_err() {
                        return;
                    }

                    if line.trim().is_empty() {
                        break;
                    }

                    if let Some((key, value)) = line.split_once(':') {
                        if key.trim().eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                    }

                    headers.push(line.trim().to_string());
                }

                let mut body = vec![0; content_length];
                if reader.read_exact(&mut body).await.is_err() {
                    return;
                }

                let _ = captured_tx.send(CapturedRequest {
                    request_line: request_line.trim().to_string(),
                    headers,
                    body: String::from_utf8_lossy(&body).to_string(),
                });

                let http_response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response_body}",
                    response_body.len(),
                );

                let _ = stream.write_all(http_response.as_bytes()).await;
            });
        }
    });

    (format!("http://{address}"), captured_rx)
}

async fn call_reset_password(api_base: &str, payload: &str) -> (StatusCode, Value) {
    let api = GatewayApi::new(SisBackendClient::with_api_base(api_base));
    let app = test::init_service(App::new().app_data(web::Data::new(api)).route(
        "/api/users/reset-password-with-otp",
        web::post().to(GatewayApi::reset_password_with_otp),
    ))
    .await;

    let req = test::TestRequest::post()
        .uri("/api/users/reset-password-with-otp")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload.to_string())
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;

    (
        status,
        serde_json::from_slice(&body).expect("response body is not json"),
    )
}

const COMPLETE_PAYLOAD: &str =
    r#"{"session_token":"otp-session","new_password":"n3w-secret","confirm_password":"n3w-secret"}"#;

#[tokio::test]
async fn missing_session_token_should_be_rejected() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(
        &api_base,
        r#"{"new_password":"secret","confirm_password":"secret"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Session token is required"}));
    assert!(captured.try_recv().is_err());
}

#[tokio::test]
async fn session_token_is_checked_before_new_password() {
    let (api_base, _captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(&api_base, r#"{"confirm_password":"secret"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Session token is required"}));
}

#[tokio::test]
async fn missing_passwords_should_be_rejected_in_order() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(
        &api_base,
        r#"{"session_token":"otp-session","confirm_password":"secret"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "New password is required"}));

    let (status, body) = call_reset_password(
        &api_base,
        r#"{"session_token":"otp-session","new_password":"secret","confirm_password":""}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Confirm password is required"}));

    assert!(captured.try_recv().is_err());
}

#[tokio::test]
async fn complete_request_should_be_forwarded_and_relayed() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(&api_base, COMPLETE_PAYLOAD).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "ok"}));

    let request = captured.recv().await.expect("backend was not called");
    assert_eq!(
        request.request_line,
        "POST /api/reset-password-with-otp/ HTTP/1.1"
    );
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(
        serde_json::from_str::<Value>(&request.body).unwrap(),
        json!({
            "session_token": "otp-session",
            "new_password": "n3w-secret",
            "confirm_password": "n3w-secret",
        })
    );
}

#[tokio::test]
async fn base_url_trailing_slash_should_not_change_endpoint() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, _) = call_reset_password(&format!("{api_base}/"), COMPLETE_PAYLOAD).await;

    assert_eq!(status, StatusCode::OK);
    let request = captured.recv().await.expect("backend was not called");
    assert_eq!(
        request.request_line,
        "POST /api/reset-password-with-otp/ HTTP/1.1"
    );
}

#[tokio::test]
async fn extra_fields_should_not_be_forwarded() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, _) = call_reset_password(
        &api_base,
        r#"{"session_token":"t","new_password":"a","confirm_password":"b","role":"admin"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let request = captured.recv().await.expect("backend was not called");
    assert_eq!(
        serde_json::from_str::<Value>(&request.body).unwrap(),
        json!({"session_token": "t", "new_password": "a", "confirm_password": "b"})
    );
}

#[tokio::test]
async fn backend_error_should_be_relayed_unchanged() {
    let (api_base, _captured) =
        start_mock_backend("400 Bad Request", r#"{"error":"OTP session expired"}"#).await;

    let (status, body) = call_reset_password(&api_base, COMPLETE_PAYLOAD).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "OTP session expired"}));
}

#[tokio::test]
async fn unreachable_backend_should_return_internal_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let (status, body) = call_reset_password(&format!("http://{address}"), COMPLETE_PAYLOAD).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn non_json_backend_body_should_return_internal_error() {
    let (api_base, _captured) = start_mock_backend("502 Bad Gateway", "<html>oops</html>").await;

    let (status, body) = call_reset_password(&api_base, COMPLETE_PAYLOAD).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn malformed_request_body_should_return_internal_error() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(&api_base, "{session_token:").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
    assert!(captured.try_recv().is_err());
}

#[tokio::test]
async fn wrong_typed_field_should_not_hide_missing_session_token() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(&api_base, r#"{"new_password":7}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Session token is required"}));
    assert!(captured.try_recv().is_err());
}

#[tokio::test]
async fn numeric_session_token_should_be_forwarded_verbatim() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(
        &api_base,
        r#"{"session_token":12345,"new_password":"a","confirm_password":"a"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "ok"}));
    let request = captured.recv().await.expect("backend was not called");
    let forwarded: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        forwarded,
        json!({"session_token": 12345, "new_password": "a", "confirm_password": "a"})
    );
}

#[tokio::test]
async fn array_request_body_should_return_internal_error() {
    let (api_base, mut captured) = start_mock_backend("200 OK", r#"{"message":"ok"}"#).await;

    let (status, body) = call_reset_password(&api_base, "[]").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
    assert!(captured.try_recv().is_err());
}
