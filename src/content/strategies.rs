//! Credential strategies for retrieving protected artifacts.
//!
//! Three ways to reach a stored file, tried strictly in this order:
//! delegated download through the platform (owner's stored credential,
//! works for any authorized caller), then the caller's own credential,
//! then the owner's credential directly. Earlier strategies are preferred
//! because they do not depend on the caller having platform credentials.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::platform::{ArtifactFile, ArtifactStore};

/// Everything a strategy needs to locate the file and identify on whose
/// behalf it is fetched.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub org_id: i64,
    pub group_id: i64,
    pub meeting_id: i64,
    pub requester_user_id: String,
    pub requester_username: String,
    pub owner_username: String,
    pub file: ArtifactFile,
}

#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Attempt the fetch. `Ok(None)` means the strategy ran but found no
    /// content; an error means the attempt itself failed. Both cause the
    /// pipeline to fall through to the next strategy.
    async fn try_fetch(
        &self,
        store: &dyn ArtifactStore,
        request: &FetchRequest,
    ) -> CoreResult<Option<Vec<u8>>>;
}

/// The platform fetches the file itself using the meeting owner's stored
/// credential, scoped to the sharing group.
pub struct DelegatedDownload;

#[async_trait]
impl CredentialStrategy for DelegatedDownload {
    fn name(&self) -> &'static str {
        "delegated"
    }

    async fn try_fetch(
        &self,
        store: &dyn ArtifactStore,
        request: &FetchRequest,
    ) -> CoreResult<Option<Vec<u8>>> {
        store
            .fetch_delegated(
                request.org_id,
                request.group_id,
                request.meeting_id,
                &request.requester_user_id,
                request.file,
            )
            .await
    }
}

/// Direct download with the requesting caller's own credential.
pub struct CallerCredential;

#[async_trait]
impl CredentialStrategy for CallerCredential {
    fn name(&self) -> &'static str {
        "caller-credential"
    }

    async fn try_fetch(
        &self,
        store: &dyn ArtifactStore,
        request: &FetchRequest,
    ) -> CoreResult<Option<Vec<u8>>> {
        store
            .fetch_direct(request.meeting_id, &request.requester_username, request.file)
            .await
    }
}

/// Direct download with the meeting owner's credential. Last resort; only
/// reached when delegation and the caller's credential both came up empty.
pub struct OwnerCredential;

#[async_trait]
impl CredentialStrategy for OwnerCredential {
    fn name(&self) -> &'static str {
        "owner-credential"
    }

    async fn try_fetch(
        &self,
        store: &dyn ArtifactStore,
        request: &FetchRequest,
    ) -> CoreResult<Option<Vec<u8>>> {
        if request.owner_username == request.requester_username {
            // Identical to the caller-credential attempt; skip the
            // duplicate round trip.
            return Ok(None);
        }
        store
            .fetch_direct(request.meeting_id, &request.owner_username, request.file)
            .await
    }
}
