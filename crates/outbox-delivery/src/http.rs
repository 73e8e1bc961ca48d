//! HTTP delivery client.

use crate::{DeliveryClient, DeliveryError, DeliveryResult};
use async_trait::async_trait;
use base64::Engine;
use outbox_store::{DraftPayload, HttpMethod, PendingRequestPayload, VoiceRecordingPayload};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Base64 encoding engine for audio bytes on the wire.
const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// HTTP delivery configuration.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Base URL for the sync API.
    pub api_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Bearer token attached to draft and recording uploads.
    pub auth_token: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_url: "https://sync.driftway.dev".to_string(),
            timeout_secs: 30,
            auth_token: None,
        }
    }
}

/// Request payload for uploading a draft.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadDraftRequest<'a> {
    content: &'a str,
    metadata: &'a BTreeMap<String, String>,
}

/// Request payload for uploading a voice recording.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRecordingRequest<'a> {
    audio_base64: String,
    transcription: Option<&'a str>,
    duration_ms: Option<u64>,
    size_bytes: Option<u64>,
    mime_type: Option<&'a str>,
}

/// Delivery client over HTTP.
///
/// Drafts and recordings are POSTed to fixed endpoints under the configured
/// base URL; pending requests are replayed verbatim against their stored
/// url/method/body/headers, with no header injection.
pub struct HttpDeliveryClient {
    config: DeliveryConfig,
    client: Client,
}

impl HttpDeliveryClient {
    /// Create a new HTTP delivery client.
    pub fn new(config: DeliveryConfig) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// Update the bearer token (e.g. after a refresh).
    pub fn set_auth_token(&mut self, token: &str) {
        self.config.auth_token = Some(token.to_string());
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> DeliveryResult<()> {
        let url = self.endpoint(path);
        debug!(url = %url, "Uploading item");

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.config.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        check_response(request.send().await?).await
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn deliver_draft(&self, draft: &DraftPayload) -> DeliveryResult<()> {
        self.post_json(
            "drafts",
            &UploadDraftRequest {
                content: &draft.content,
                metadata: &draft.metadata,
            },
        )
        .await
    }

    async fn deliver_voice_recording(
        &self,
        recording: &VoiceRecordingPayload,
    ) -> DeliveryResult<()> {
        self.post_json(
            "voice-recordings",
            &UploadRecordingRequest {
                audio_base64: BASE64.encode(&recording.audio),
                transcription: recording.transcription.as_deref(),
                duration_ms: recording.metadata.duration_ms,
                size_bytes: recording.metadata.size_bytes,
                mime_type: recording.metadata.mime_type.as_deref(),
            },
        )
        .await
    }

    async fn deliver_request(&self, request: &PendingRequestPayload) -> DeliveryResult<()> {
        debug!(url = %request.url, method = %request.method, "Replaying request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        check_response(builder.send().await?).await
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

async fn check_response(response: reqwest::Response) -> DeliveryResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Status {
        code: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_store::AudioMetadata;

    #[test]
    fn config_defaults() {
        let config = DeliveryConfig::default();
        assert_eq!(config.api_url, "https://sync.driftway.dev");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = HttpDeliveryClient::new(DeliveryConfig {
            api_url: "https://sync.example.com/".to_string(),
            ..DeliveryConfig::default()
        })
        .unwrap();

        assert_eq!(client.endpoint("drafts"), "https://sync.example.com/drafts");
    }

    #[test]
    fn draft_payload_uses_camel_case() {
        let metadata = BTreeMap::from([("mood".to_string(), "calm".to_string())]);
        let request = UploadDraftRequest {
            content: "dear diary",
            metadata: &metadata,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""content":"dear diary""#));
        assert!(json.contains(r#""metadata":{"mood":"calm"}"#));
    }

    #[test]
    fn recording_payload_encodes_audio_as_base64() {
        let request = UploadRecordingRequest {
            audio_base64: BASE64.encode([1u8, 2, 3]),
            transcription: Some("hello"),
            duration_ms: Some(500),
            size_bytes: Some(3),
            mime_type: Some("audio/ogg"),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""audioBase64":"AQID""#));
        assert!(json.contains(r#""durationMs":500"#));
        assert!(json.contains(r#""mimeType":"audio/ogg""#));
    }

    #[test]
    fn method_mapping_is_complete() {
        assert_eq!(to_reqwest_method(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(HttpMethod::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest_method(HttpMethod::Put), reqwest::Method::PUT);
        assert_eq!(to_reqwest_method(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(
            to_reqwest_method(HttpMethod::Delete),
            reqwest::Method::DELETE
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let client = HttpDeliveryClient::new(DeliveryConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            auth_token: None,
        })
        .unwrap();

        let recording = VoiceRecordingPayload {
            audio: vec![0u8; 8],
            transcription: None,
            metadata: AudioMetadata::default(),
        };

        let err = client.deliver_voice_recording(&recording).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Http(_)));
    }
}
