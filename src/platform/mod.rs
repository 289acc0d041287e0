//! Client for the external meeting platform API.
//!
//! The platform owns the meeting records, the membership directory and
//! the stored credentials used for artifact downloads. This module holds
//! the typed DTOs for those boundaries plus the trait seams
//! (`MeetingDirectory`, `MembershipDirectory`, `ArtifactStore`) that the
//! core components consume, so they can be exercised against mocks.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::PlatformConfig;
use crate::error::{CoreError, CoreResult};

/// A meeting record as the platform reports it. Read-only here: the core
/// never mutates meetings, only aggregates references to them.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformMeeting {
    pub id: i64,
    pub meeting_name: String,
    pub username: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub audio_ref: Option<String>,
    #[serde(default)]
    pub transcript_ref: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

impl PlatformMeeting {
    /// Whether the given caller identity owns this meeting.
    pub fn owned_by(&self, user_id: &str, username: &str) -> bool {
        self.user_id.as_deref() == Some(user_id) || self.username == username
    }
}

/// A member row from the organization directory.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgMember {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub rol: String,
}

/// Which artifact file to fetch from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFile {
    Audio,
    Transcript,
}

impl ArtifactFile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFile::Audio => "audio",
            ArtifactFile::Transcript => "transcript",
        }
    }
}

/// Read-only meeting listing collaborator.
#[async_trait]
pub trait MeetingDirectory: Send + Sync {
    async fn list_meetings_for_user(&self, user_id: &str) -> CoreResult<Vec<PlatformMeeting>>;

    async fn get_meeting(&self, meeting_id: i64) -> CoreResult<Option<PlatformMeeting>>;
}

/// Read-only organization membership directory.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn get_members(&self, org_id: i64) -> CoreResult<Vec<OrgMember>>;
}

/// Source of protected artifact bytes.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Delegated download: the platform fetches the file on behalf of the
    /// meeting owner's stored credential. Works for any caller.
    async fn fetch_delegated(
        &self,
        org_id: i64,
        group_id: i64,
        meeting_id: i64,
        requester_user_id: &str,
        file: ArtifactFile,
    ) -> CoreResult<Option<Vec<u8>>>;

    /// Direct download using the named user's own credential.
    async fn fetch_direct(
        &self,
        meeting_id: i64,
        username: &str,
        file: ArtifactFile,
    ) -> CoreResult<Option<Vec<u8>>>;
}

#[derive(Debug, Deserialize)]
struct MeetingListResponse {
    #[serde(default)]
    meetings: Vec<PlatformMeeting>,
}

#[derive(Debug, Deserialize)]
struct MeetingResponse {
    meeting: Option<PlatformMeeting>,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    members: Vec<OrgMember>,
}

#[derive(Debug, Deserialize)]
struct FilePayload {
    file_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SharedFilesResponse {
    #[serde(default)]
    audio: Option<FilePayload>,
    #[serde(default)]
    transcript: Option<FilePayload>,
}

#[derive(Debug, Deserialize)]
struct DirectDownloadResponse {
    file_content: Option<String>,
}

pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    metadata_timeout: Duration,
    download_timeout: Duration,
    delegated_timeout: Duration,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let client = reqwest::Client::new();
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            metadata_timeout: Duration::from_secs(config.metadata_timeout_seconds),
            download_timeout: Duration::from_secs(config.download_timeout_seconds),
            delegated_timeout: Duration::from_secs(config.delegated_timeout_seconds),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Convert an HTTP failure into the domain taxonomy instead of
    /// leaking the raw transport error.
    fn map_status(status: reqwest::StatusCode, what: &str) -> CoreError {
        match status.as_u16() {
            404 => CoreError::not_found(what.to_string()),
            403 => CoreError::not_authorized(format!("Platform denied access to {what}")),
            _ => CoreError::upstream(format!("Platform returned {status} for {what}")),
        }
    }

    fn decode_content(content: Option<String>) -> CoreResult<Option<Vec<u8>>> {
        match content {
            Some(b64) => {
                let bytes = BASE64.decode(b64.as_bytes()).map_err(|e| {
                    CoreError::upstream(format!("Platform sent invalid base64 content: {e}"))
                })?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MeetingDirectory for PlatformClient {
    async fn list_meetings_for_user(&self, user_id: &str) -> CoreResult<Vec<PlatformMeeting>> {
        let url = self.url(&format!("users/{user_id}/meetings"));
        debug!("Fetching meetings for user from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.metadata_timeout)
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("Meeting list request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::map_status(response.status(), "meeting list"));
        }

        let body: MeetingListResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("Invalid meeting list response: {e}")))?;

        Ok(body.meetings)
    }

    async fn get_meeting(&self, meeting_id: i64) -> CoreResult<Option<PlatformMeeting>> {
        let url = self.url(&format!("meetings/{meeting_id}"));

        let response = self
            .client
            .get(&url)
            .timeout(self.metadata_timeout)
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("Meeting request failed: {e}")))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::map_status(
                response.status(),
                &format!("meeting {meeting_id}"),
            ));
        }

        let body: MeetingResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("Invalid meeting response: {e}")))?;

        Ok(body.meeting)
    }
}

#[async_trait]
impl MembershipDirectory for PlatformClient {
    async fn get_members(&self, org_id: i64) -> CoreResult<Vec<OrgMember>> {
        let url = self.url(&format!("companies/{org_id}/members"));

        let response = self
            .client
            .get(&url)
            .timeout(self.metadata_timeout)
            .send()
            .await
            .map_err(|e| {
                warn!("Membership directory unreachable: {}", e);
                CoreError::upstream(format!("Membership directory request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(Self::map_status(response.status(), "organization members"));
        }

        let body: MembersResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("Invalid members response: {e}")))?;

        Ok(body.members)
    }
}

#[async_trait]
impl ArtifactStore for PlatformClient {
    async fn fetch_delegated(
        &self,
        org_id: i64,
        group_id: i64,
        meeting_id: i64,
        requester_user_id: &str,
        file: ArtifactFile,
    ) -> CoreResult<Option<Vec<u8>>> {
        let url = self.url(&format!(
            "companies/{org_id}/groups/{group_id}/shared-meetings/{meeting_id}/files"
        ));
        debug!(
            "Delegated download of {} for meeting {} via group {}",
            file.as_str(),
            meeting_id,
            group_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("requester_user_id", requester_user_id),
                ("file_type", file.as_str()),
            ])
            .timeout(self.delegated_timeout)
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("Delegated download failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::map_status(
                response.status(),
                &format!("shared files of meeting {meeting_id}"),
            ));
        }

        let body: SharedFilesResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("Invalid shared files response: {e}")))?;

        let payload = match file {
            ArtifactFile::Audio => body.audio,
            ArtifactFile::Transcript => body.transcript,
        };

        Self::decode_content(payload.and_then(|p| p.file_content))
    }

    async fn fetch_direct(
        &self,
        meeting_id: i64,
        username: &str,
        file: ArtifactFile,
    ) -> CoreResult<Option<Vec<u8>>> {
        let url = self.url(&format!(
            "meetings/{meeting_id}/download/{}",
            file.as_str()
        ));

        let response = self
            .client
            .get(&url)
            .query(&[("username", username)])
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| {
                error!(
                    "Direct download of {} for meeting {} failed: {}",
                    file.as_str(),
                    meeting_id,
                    e
                );
                CoreError::upstream(format!("Direct download failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(Self::map_status(
                response.status(),
                &format!("{} file of meeting {meeting_id}", file.as_str()),
            ));
        }

        let body: DirectDownloadResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("Invalid download response: {e}")))?;

        Self::decode_content(body.file_content)
    }
}
