//! Content retrieval pipeline.
//!
//! Resolves protected artifact bytes for an authorized caller by walking
//! the credential strategy chain, and turns transcript containers into
//! structured meeting content. Exhausting every strategy is a soft
//! outcome with a reason, not an error; the caller still gets the rest of
//! the meeting details. The grant on the sharing edge is re-checked here
//! even though route handlers check it first, so no payload ever leaves
//! this module without a matching grant flag.

pub mod strategies;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access::{self, ArtifactKind};
use crate::db::SharedMeeting;
use crate::error::{CoreError, CoreResult};
use crate::platform::{ArtifactFile, ArtifactStore};
use crate::transcript::{MeetingContent, TranscriptDecryptor};

pub use strategies::{CallerCredential, CredentialStrategy, DelegatedDownload, FetchRequest, OwnerCredential};

/// Result of an artifact fetch. Unavailability carries a display reason
/// and never aborts the surrounding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Retrieved(Vec<u8>),
    Unavailable { reason: String },
}

impl FetchOutcome {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            FetchOutcome::Retrieved(bytes) => Some(bytes),
            FetchOutcome::Unavailable { .. } => None,
        }
    }
}

pub struct ContentPipeline {
    store: Arc<dyn ArtifactStore>,
    decryptor: Arc<dyn TranscriptDecryptor>,
    strategies: Vec<Box<dyn CredentialStrategy>>,
}

impl ContentPipeline {
    pub fn new(store: Arc<dyn ArtifactStore>, decryptor: Arc<dyn TranscriptDecryptor>) -> Self {
        Self {
            store,
            decryptor,
            strategies: vec![
                Box::new(DelegatedDownload),
                Box::new(CallerCredential),
                Box::new(OwnerCredential),
            ],
        }
    }

    /// Fetch the artifact named by `request.file`, walking the strategy
    /// chain until one yields content. The sharing edge's grant must
    /// allow `kind` or the fetch is refused before any network call.
    pub async fn fetch_artifact(
        &self,
        edge: &SharedMeeting,
        kind: ArtifactKind,
        request: &FetchRequest,
    ) -> CoreResult<FetchOutcome> {
        if !access::grant_allows(&edge.permisos, kind) {
            return Err(CoreError::not_authorized(
                "The sharing permissions do not allow this file",
            ));
        }

        for strategy in &self.strategies {
            match strategy.try_fetch(self.store.as_ref(), request).await {
                Ok(Some(bytes)) if !bytes.is_empty() => {
                    info!(
                        "Retrieved {} for meeting {} via {} strategy",
                        request.file.as_str(),
                        request.meeting_id,
                        strategy.name()
                    );
                    return Ok(FetchOutcome::Retrieved(bytes));
                }
                Ok(_) => {
                    debug!(
                        "Strategy {} found no {} for meeting {}",
                        strategy.name(),
                        request.file.as_str(),
                        request.meeting_id
                    );
                }
                Err(e) => {
                    warn!(
                        "Strategy {} failed for {} of meeting {}: {}",
                        strategy.name(),
                        request.file.as_str(),
                        request.meeting_id,
                        e
                    );
                }
            }
        }

        Ok(FetchOutcome::Unavailable {
            reason: unavailable_reason(request.file),
        })
    }

    /// Fetch and open the transcript container. Any failure along the way
    /// (no bytes, undecryptable container) degrades to the empty content
    /// structure rather than an error.
    pub async fn fetch_meeting_content(
        &self,
        edge: &SharedMeeting,
        request: &FetchRequest,
    ) -> CoreResult<MeetingContent> {
        let outcome = self
            .fetch_artifact(edge, ArtifactKind::Transcript, request)
            .await?;

        let bytes = match outcome {
            FetchOutcome::Retrieved(bytes) => bytes,
            FetchOutcome::Unavailable { reason } => {
                debug!("No transcript container for meeting {}: {}", request.meeting_id, reason);
                return Ok(MeetingContent::unavailable());
            }
        };

        match self.decryptor.decrypt(&bytes) {
            Some(structure) => Ok(self.decryptor.extract(&structure)),
            None => {
                warn!(
                    "Transcript container of meeting {} could not be opened by {}",
                    request.meeting_id,
                    self.decryptor.name()
                );
                Ok(MeetingContent::unavailable())
            }
        }
    }
}

fn unavailable_reason(file: ArtifactFile) -> String {
    match file {
        ArtifactFile::Audio => "Archivo de audio no disponible".to_string(),
        ArtifactFile::Transcript => "Transcripción no disponible".to_string(),
    }
}
