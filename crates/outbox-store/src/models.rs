//! Outbox model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Partition - a logically distinct sub-queue for one item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Drafts,
    VoiceRecordings,
    PendingRequests,
}

impl Partition {
    /// All partitions, in drain order.
    pub const ALL: [Partition; 3] = [
        Partition::Drafts,
        Partition::VoiceRecordings,
        Partition::PendingRequests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drafts => "drafts",
            Self::VoiceRecordings => "voice_recordings",
            Self::PendingRequests => "pending_requests",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "drafts" => Some(Self::Drafts),
            "voice_recordings" => Some(Self::VoiceRecordings),
            "pending_requests" => Some(Self::PendingRequests),
            _ => None,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item status within the store.
///
/// Pending items are picked up by the drain loop; dead items have exceeded
/// the configured retry limit and are kept only for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Dead,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dead => "dead",
        }
    }
}

/// HTTP method for a queued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A buffered text draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPayload {
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Metadata describing a recorded audio blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub duration_ms: Option<u64>,
    pub size_bytes: Option<u64>,
    pub mime_type: Option<String>,
}

/// A buffered voice recording.
///
/// The audio bytes live in a dedicated BLOB column, not in the payload JSON;
/// the store reattaches them on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceRecordingPayload {
    #[serde(skip)]
    pub audio: Vec<u8>,
    pub transcription: Option<String>,
    #[serde(default)]
    pub metadata: AudioMetadata,
}

/// A buffered arbitrary API call, replayed verbatim on delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequestPayload {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Tagged payload variant, one per partition.
///
/// Persisted as JSON and validated against this schema on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Draft(DraftPayload),
    VoiceRecording(VoiceRecordingPayload),
    PendingRequest(PendingRequestPayload),
}

impl Payload {
    /// The partition this payload belongs to.
    pub fn partition(&self) -> Partition {
        match self {
            Self::Draft(_) => Partition::Drafts,
            Self::VoiceRecording(_) => Partition::VoiceRecordings,
            Self::PendingRequest(_) => Partition::PendingRequests,
        }
    }
}

/// A queued outbox item.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub payload: Payload,
}

impl QueueItem {
    /// Create a new pending item with a fresh UUID id.
    pub fn new(payload: Payload) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), payload)
    }

    /// Create a new pending item with an explicit id.
    pub fn with_id(id: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            retry_count: 0,
            last_error: None,
            last_attempt_at: None,
            payload,
        }
    }

    /// The partition this item belongs to, derived from its payload.
    pub fn partition(&self) -> Partition {
        self.payload.partition()
    }
}

/// Pending counts per partition, for UI badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCounts {
    pub drafts: usize,
    pub voice_recordings: usize,
    pub requests: usize,
}

impl PendingCounts {
    /// Total pending items across all partitions.
    pub fn total(&self) -> usize {
        self.drafts + self.voice_recordings + self.requests
    }
}
