//! End-to-end flows over the sharing registry, access decisions,
//! aggregation and the content pipeline, using an in-memory database and
//! scripted platform collaborators.

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use meetshare::access::{self, ArtifactKind};
use meetshare::aggregation::{registry_snapshot, MeetingAggregator, MeetingSource};
use meetshare::content::{ContentPipeline, FetchOutcome, FetchRequest};
use meetshare::db::{
    migrate, GroupRepository, GroupRole, PermissionGrant,
};
use meetshare::error::{CoreError, CoreResult};
use meetshare::platform::{
    ArtifactFile, ArtifactStore, MeetingDirectory, PlatformMeeting,
};
use meetshare::transcript::JsonContainerAdapter;

struct FakePlatform {
    meetings: HashMap<i64, PlatformMeeting>,
    delegated_files: HashMap<(i64, &'static str), Vec<u8>>,
    direct_files: HashMap<(i64, String, &'static str), Vec<u8>>,
}

impl FakePlatform {
    fn new() -> Self {
        Self {
            meetings: HashMap::new(),
            delegated_files: HashMap::new(),
            direct_files: HashMap::new(),
        }
    }

    fn with_meeting(mut self, meeting: PlatformMeeting) -> Self {
        self.meetings.insert(meeting.id, meeting);
        self
    }
}

#[async_trait]
impl MeetingDirectory for FakePlatform {
    async fn list_meetings_for_user(&self, user_id: &str) -> CoreResult<Vec<PlatformMeeting>> {
        Ok(self
            .meetings
            .values()
            .filter(|m| m.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn get_meeting(&self, meeting_id: i64) -> CoreResult<Option<PlatformMeeting>> {
        Ok(self.meetings.get(&meeting_id).cloned())
    }
}

#[async_trait]
impl ArtifactStore for FakePlatform {
    async fn fetch_delegated(
        &self,
        _org_id: i64,
        _group_id: i64,
        meeting_id: i64,
        _requester_user_id: &str,
        file: ArtifactFile,
    ) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.delegated_files.get(&(meeting_id, file.as_str())).cloned())
    }

    async fn fetch_direct(
        &self,
        meeting_id: i64,
        username: &str,
        file: ArtifactFile,
    ) -> CoreResult<Option<Vec<u8>>> {
        Ok(self
            .direct_files
            .get(&(meeting_id, username.to_string(), file.as_str()))
            .cloned())
    }
}

fn setup_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    migrate(&conn).unwrap();
    conn
}

fn meeting(id: i64, username: &str, user_id: &str, created_at: &str) -> PlatformMeeting {
    PlatformMeeting {
        id,
        meeting_name: format!("Reunión {id}"),
        username: username.to_string(),
        user_id: Some(user_id.to_string()),
        audio_ref: None,
        transcript_ref: None,
        created_at: created_at.to_string(),
        duration_minutes: Some(30),
    }
}

fn request(group_id: i64, meeting_id: i64, caller: &str, owner: &str, file: ArtifactFile) -> FetchRequest {
    FetchRequest {
        org_id: 1,
        group_id,
        meeting_id,
        requester_user_id: format!("uid-{caller}"),
        requester_username: caller.to_string(),
        owner_username: owner.to_string(),
        file,
    }
}

/// Owner shares a meeting into a group; a co-member can then manage it
/// and pull the transcript through the pipeline, while an outsider is
/// denied before any fetch.
#[tokio::test]
async fn shared_meeting_is_reachable_by_co_members_only() {
    let mut conn = setup_db();
    let m = meeting(100, "ana", "uid-ana", "2025-06-01T10:00:00Z");

    let container = serde_json::to_vec(&json!({
        "summary": "Decisiones de junio",
        "key_points": ["Presupuesto"],
        "segments": [{"speaker": "Ana", "text": "Empezamos"}]
    }))
    .unwrap();

    let mut platform = FakePlatform::new().with_meeting(m.clone());
    platform
        .delegated_files
        .insert((100, "transcript"), container);
    let platform = Arc::new(platform);

    let group = GroupRepository::create_group(&mut conn, "Dirección", None, "uid-ana").unwrap();
    GroupRepository::add_member(&conn, group.id, "uid-luis", GroupRole::Colaborador).unwrap();
    GroupRepository::share_meeting(
        &mut conn,
        group.id,
        100,
        "uid-ana",
        PermissionGrant::default(),
        Some("Para revisión"),
        None,
    )
    .unwrap();

    // Co-member may manage, outsider may not.
    assert!(access::can_manage_meeting(&conn, &m, "uid-luis", "luis").is_allowed());
    assert!(!access::can_manage_meeting(&conn, &m, "uid-eve", "eve").is_allowed());

    let edge = GroupRepository::get_shared(&conn, group.id, 100)
        .unwrap()
        .unwrap();
    let pipeline = ContentPipeline::new(platform, Arc::new(JsonContainerAdapter));
    let content = pipeline
        .fetch_meeting_content(
            &edge,
            &request(group.id, 100, "luis", "ana", ArtifactFile::Transcript),
        )
        .await
        .unwrap();

    assert_eq!(content.summary, "Decisiones de junio");
    assert_eq!(content.flatten_transcript(), "Ana: Empezamos");
}

/// Sharing the same meeting twice keeps the first edge, including its
/// original grant.
#[tokio::test]
async fn repeated_share_is_idempotent() {
    let mut conn = setup_db();
    let group = GroupRepository::create_group(&mut conn, "Equipo", None, "uid-ana").unwrap();

    let restricted = PermissionGrant {
        ver_audio: false,
        ver_transcript: true,
        descargar: false,
    };
    let first = GroupRepository::share_meeting(
        &mut conn, group.id, 5, "uid-ana", restricted, None, None,
    )
    .unwrap();
    let second = GroupRepository::share_meeting(
        &mut conn,
        group.id,
        5,
        "uid-ana",
        PermissionGrant::default(),
        Some("segundo intento"),
        None,
    )
    .unwrap();

    assert_eq!(first.id, second.id);
    assert!(!second.permisos.ver_audio);
    assert_eq!(second.message, None);
}

/// Only the identity that shared a meeting can revoke the share, even
/// when the requester owns the group.
#[tokio::test]
async fn only_the_sharer_can_unshare() {
    let mut conn = setup_db();
    let group = GroupRepository::create_group(&mut conn, "Equipo", None, "uid-owner").unwrap();
    GroupRepository::add_member(&conn, group.id, "uid-luis", GroupRole::Colaborador).unwrap();
    GroupRepository::share_meeting(
        &mut conn,
        group.id,
        7,
        "uid-luis",
        PermissionGrant::default(),
        None,
        None,
    )
    .unwrap();

    let denied = GroupRepository::unshare_meeting(&conn, group.id, 7, "uid-owner");
    assert!(matches!(denied, Err(CoreError::NotAuthorized(_))));

    GroupRepository::unshare_meeting(&conn, group.id, 7, "uid-luis").unwrap();
    assert!(GroupRepository::get_shared(&conn, group.id, 7)
        .unwrap()
        .is_none());
}

/// A meeting that is both owned by the caller and shared into one of
/// their groups shows up once in the feed, as their own.
#[tokio::test]
async fn overview_prefers_own_over_group_source() {
    let mut conn = setup_db();
    let own = meeting(1, "ana", "uid-ana", "2025-06-02T10:00:00Z");
    let foreign = meeting(2, "luis", "uid-luis", "2025-06-03T10:00:00Z");

    let platform = Arc::new(
        FakePlatform::new()
            .with_meeting(own)
            .with_meeting(foreign),
    );

    let group = GroupRepository::create_group(&mut conn, "Equipo", None, "uid-luis").unwrap();
    GroupRepository::add_member(&conn, group.id, "uid-ana", GroupRole::Invitado).unwrap();
    for id in [1, 2] {
        GroupRepository::share_meeting(
            &mut conn,
            group.id,
            id,
            "uid-luis",
            PermissionGrant::default(),
            None,
            None,
        )
        .unwrap();
    }

    let aggregator = MeetingAggregator::new(platform);
    let sources = registry_snapshot(&conn, "uid-ana").unwrap();
    let feed = aggregator
        .overview_for_user(&sources, "uid-ana", "ana")
        .await
        .unwrap();

    assert_eq!(feed.len(), 2);
    let own_entry = feed.iter().find(|e| e.meeting.id == 1).unwrap();
    let shared_entry = feed.iter().find(|e| e.meeting.id == 2).unwrap();
    assert_eq!(own_entry.source, MeetingSource::Own);
    assert_eq!(shared_entry.source, MeetingSource::Group("Equipo".to_string()));
}

/// The grant on the edge gates each artifact independently, and a
/// delegated miss falls through to the direct credentials.
#[tokio::test]
async fn grants_gate_artifacts_and_fallback_reaches_owner_credential() {
    let mut conn = setup_db();
    let m = meeting(9, "ana", "uid-ana", "2025-06-04T10:00:00Z");

    let mut platform = FakePlatform::new().with_meeting(m);
    // Nothing delegated; only the owner's credential can reach the audio.
    platform
        .direct_files
        .insert((9, "ana".to_string(), "audio"), b"wav-bytes".to_vec());
    let platform = Arc::new(platform);

    let group = GroupRepository::create_group(&mut conn, "Equipo", None, "uid-ana").unwrap();
    GroupRepository::add_member(&conn, group.id, "uid-luis", GroupRole::Colaborador).unwrap();
    let edge = GroupRepository::share_meeting(
        &mut conn,
        group.id,
        9,
        "uid-ana",
        PermissionGrant {
            ver_audio: true,
            ver_transcript: false,
            descargar: false,
        },
        None,
        None,
    )
    .unwrap();

    let pipeline = ContentPipeline::new(platform, Arc::new(JsonContainerAdapter));

    let audio = pipeline
        .fetch_artifact(
            &edge,
            ArtifactKind::Audio,
            &request(group.id, 9, "luis", "ana", ArtifactFile::Audio),
        )
        .await
        .unwrap();
    assert_eq!(audio, FetchOutcome::Retrieved(b"wav-bytes".to_vec()));

    let transcript = pipeline
        .fetch_artifact(
            &edge,
            ArtifactKind::Transcript,
            &request(group.id, 9, "luis", "ana", ArtifactFile::Transcript),
        )
        .await;
    assert!(matches!(transcript, Err(CoreError::NotAuthorized(_))));
}

/// Deleting a group removes its members and sharing edges atomically.
#[tokio::test]
async fn group_deletion_cascades() {
    let mut conn = setup_db();
    let group = GroupRepository::create_group(&mut conn, "Temporal", None, "uid-ana").unwrap();
    GroupRepository::add_member(&conn, group.id, "uid-luis", GroupRole::Colaborador).unwrap();
    GroupRepository::share_meeting(
        &mut conn,
        group.id,
        3,
        "uid-ana",
        PermissionGrant::default(),
        None,
        None,
    )
    .unwrap();

    GroupRepository::delete_group(&mut conn, group.id, "uid-ana").unwrap();

    assert!(GroupRepository::get(&conn, group.id).unwrap().is_none());
    assert!(GroupRepository::get_shared(&conn, group.id, 3)
        .unwrap()
        .is_none());
    assert!(!GroupRepository::meeting_shared_with_user(&conn, 3, "uid-luis").unwrap());
}
