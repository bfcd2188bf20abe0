//! HTTP client for the transfer service.
//!
//! Endpoints:
//!
//! - `POST /upload` - multipart `file` + `recipientPublicKey`
//! - `GET /download/{id}` - envelope archive
//! - `POST /download/{id}/decrypted` - JSON `{"privateKey": ...}`, plaintext back
//! - `GET /metadata/{id}` - package metadata
//!
//! Error responses carry `{"error": "..."}`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use sealdrop_core::{PackageId, PackageMetadata};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::service::{AccessToken, TransferService, UploadReceipt, UploadRequest};

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecryptRequest<'a> {
    private_key: &'a str,
}

/// Transfer service reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTransferService {
    client: Client,
    config: RemoteConfig,
}

impl HttpTransferService {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn authorize(builder: RequestBuilder, auth: Option<&AccessToken>) -> RequestBuilder {
        match auth {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                RemoteError::Network(e.to_string())
            } else {
                RemoteError::Http(e)
            }
        })
    }
}

/// Pull the service's `{error}` message, falling back to the status text.
async fn failure_reason(resp: Response) -> (u16, String) {
    let status = resp.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();
    let reason = match resp.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(msg) }) if !msg.is_empty() => msg,
        _ => fallback,
    };
    (status.as_u16(), reason)
}

async fn check(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let (status, reason) = failure_reason(resp).await;
    Err(RemoteError::Status { status, reason })
}

#[async_trait]
impl TransferService for HttpTransferService {
    async fn upload(
        &self,
        request: UploadRequest,
        auth: Option<&AccessToken>,
    ) -> Result<UploadReceipt> {
        let url = self.config.endpoint("/upload");
        let file = Part::bytes(request.data.to_vec())
            .file_name(request.filename)
            .mime_str(&request.mime_type)?;
        let form = Form::new()
            .part("file", file)
            .text("recipientPublicKey", request.recipient_public_key);

        let resp = Self::send(Self::authorize(self.client.post(&url), auth).multipart(form)).await?;
        let body = check(resp).await?.bytes().await?;
        let receipt: UploadReceipt = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::InvalidResponse(format!("upload response: {e}")))?;

        debug!(package_id = %receipt.package_id, encrypted_size = receipt.encrypted_size, "uploaded package");
        Ok(receipt)
    }

    async fn fetch_envelope(&self, id: &PackageId, auth: Option<&AccessToken>) -> Result<Bytes> {
        let url = self.config.endpoint(&format!("/download/{id}"));
        let resp = Self::send(Self::authorize(self.client.get(&url), auth)).await?;
        let archive = check(resp).await?.bytes().await?;
        debug!(package_id = %id, len = archive.len(), "fetched envelope");
        Ok(archive)
    }

    async fn remote_decrypt(
        &self,
        id: &PackageId,
        private_key_pem: &str,
        auth: Option<&AccessToken>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let url = self.config.endpoint(&format!("/download/{id}/decrypted"));
        let body = DecryptRequest {
            private_key: private_key_pem,
        };

        let resp = Self::send(Self::authorize(self.client.post(&url), auth).json(&body)).await?;
        if !resp.status().is_success() {
            let (status, reason) = failure_reason(resp).await;
            return Err(RemoteError::RemoteDecryptFailed { status, reason });
        }

        let plaintext = Zeroizing::new(resp.bytes().await?.to_vec());
        debug!(package_id = %id, len = plaintext.len(), "remote decrypt succeeded");
        Ok(plaintext)
    }

    async fn fetch_metadata(
        &self,
        id: &PackageId,
        auth: Option<&AccessToken>,
    ) -> Result<PackageMetadata> {
        let url = self.config.endpoint(&format!("/metadata/{id}"));
        let resp = Self::send(Self::authorize(self.client.get(&url), auth)).await?;
        let body = check(resp).await?.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| RemoteError::InvalidResponse(format!("metadata response: {e}")))
    }
}
