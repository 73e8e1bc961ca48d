//! Delivery client seam.

use crate::DeliveryResult;
use async_trait::async_trait;
use outbox_store::{DraftPayload, PendingRequestPayload, VoiceRecordingPayload};

/// One outbound call per queued item, matched to its partition.
///
/// Implementations make a single attempt per call; retry across cycles is
/// the orchestrator's job. Any timeout must come from the implementation
/// (e.g. the HTTP client's request timeout).
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Deliver a buffered text draft.
    async fn deliver_draft(&self, draft: &DraftPayload) -> DeliveryResult<()>;

    /// Deliver a buffered voice recording.
    async fn deliver_voice_recording(
        &self,
        recording: &VoiceRecordingPayload,
    ) -> DeliveryResult<()>;

    /// Replay a buffered API call.
    async fn deliver_request(&self, request: &PendingRequestPayload) -> DeliveryResult<()>;
}
