use std::time::Duration;

use bytes::Bytes;
use sealdrop_core::PackageStatus;
use sealdrop_remote::{
    AccessToken, HttpTransferService, RemoteConfig, RemoteError, TransferService, UploadRequest,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(server: &MockServer) -> HttpTransferService {
    HttpTransferService::new(RemoteConfig {
        api_base_url: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn metadata_json() -> serde_json::Value {
    serde_json::json!({
        "packageId": "pkg-1",
        "filename": "report.pdf",
        "originalSize": 4,
        "mimeType": "application/pdf",
        "uploadedAt": "2024-05-01T10:00:00Z",
        "expiresAt": "2024-05-08T10:00:00Z",
        "status": "active",
        "signer": "alice@example.com",
        "signatureValid": false
    })
}

// --- Download ---

#[tokio::test]
async fn fetch_envelope_returns_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/pkg-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zip".to_vec()))
        .mount(&server)
        .await;

    let service = setup(&server);
    let archive = service
        .fetch_envelope(&"pkg-1".parse().unwrap(), None)
        .await
        .unwrap();
    assert_eq!(archive, Bytes::from_static(b"PK\x03\x04zip"));
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/pkg-1"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let service = setup(&server);
    let token = AccessToken::new("tok-123");
    service
        .fetch_envelope(&"pkg-1".parse().unwrap(), Some(&token))
        .await
        .unwrap();
}

#[tokio::test]
async fn error_body_becomes_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "package expired" })),
        )
        .mount(&server)
        .await;

    let service = setup(&server);
    let err = service
        .fetch_envelope(&"gone".parse().unwrap(), None)
        .await
        .unwrap_err();
    match err {
        RemoteError::Status { status, reason } => {
            assert_eq!(status, 404);
            assert_eq!(reason, "package expired");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_uses_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/pkg-1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let service = setup(&server);
    let err = service
        .fetch_envelope(&"pkg-1".parse().unwrap(), None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("Service Unavailable"));
}

// --- Remote decrypt ---

#[tokio::test]
async fn remote_decrypt_posts_private_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download/pkg-1/decrypted"))
        .and(body_json(serde_json::json!({ "privateKey": "PEM TEXT" })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"plaintext".to_vec()))
        .mount(&server)
        .await;

    let service = setup(&server);
    let plaintext = service
        .remote_decrypt(&"pkg-1".parse().unwrap(), "PEM TEXT", None)
        .await
        .unwrap();
    assert_eq!(plaintext.as_slice(), b"plaintext");
}

#[tokio::test]
async fn remote_decrypt_failure_carries_status_and_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download/pkg-1/decrypted"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({ "error": "invalid private key" })),
        )
        .mount(&server)
        .await;

    let service = setup(&server);
    let err = service
        .remote_decrypt(&"pkg-1".parse().unwrap(), "PEM TEXT", None)
        .await
        .unwrap_err();
    match err {
        RemoteError::RemoteDecryptFailed { status, reason } => {
            assert_eq!(status, 400);
            assert_eq!(reason, "invalid private key");
        }
        other => panic!("expected RemoteDecryptFailed, got {other:?}"),
    }
}

// --- Metadata ---

#[tokio::test]
async fn fetch_metadata_parses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metadata/pkg-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .mount(&server)
        .await;

    let service = setup(&server);
    let meta = service
        .fetch_metadata(&"pkg-1".parse().unwrap(), None)
        .await
        .unwrap();
    assert_eq!(meta.original_size, 4);
    assert_eq!(meta.status, PackageStatus::Active);
    assert_eq!(meta.signature_valid, Some(false));
}

#[tokio::test]
async fn fetch_metadata_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metadata/pkg-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "nope": 1 })))
        .mount(&server)
        .await;

    let service = setup(&server);
    let err = service
        .fetch_metadata(&"pkg-1".parse().unwrap(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}

// --- Upload ---

#[tokio::test]
async fn upload_normalizes_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "package_id": "new-pkg",
            "filename": "a.txt",
            "size": 3,
            "encrypted_size": 700,
            "download_url": "/download/new-pkg",
            "expires_at": "2024-05-08T10:00:00Z"
        })))
        .mount(&server)
        .await;

    let service = setup(&server);
    let receipt = service
        .upload(
            UploadRequest {
                filename: "a.txt".into(),
                mime_type: "text/plain".into(),
                data: Bytes::from_static(b"abc"),
                recipient_public_key: "-----BEGIN PUBLIC KEY-----".into(),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(receipt.package_id.as_str(), "new-pkg");
    assert_eq!(receipt.encrypted_size, 700);
    assert_eq!(receipt.download_url.as_deref(), Some("/download/new-pkg"));
}

// --- Transport ---

#[tokio::test]
async fn unreachable_server_is_network_failure() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let service = HttpTransferService::new(RemoteConfig {
        api_base_url: uri,
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let err = service
        .fetch_envelope(&"pkg-1".parse().unwrap(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
}
