//! Meeting overview and shared content endpoints.
//!
//! The overview feed merges the caller's own meetings with everything
//! shared into their groups. The files and details endpoints hang off
//! the groups router because access to them is always scoped to one
//! sharing edge.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{groups::member_group, with_db};
use crate::access::{self, ArtifactKind};
use crate::aggregation;
use crate::api::error::{ApiError, ApiResult};
use crate::api::{AppState, RequestContext};
use crate::content::{FetchOutcome, FetchRequest};
use crate::db::{GroupRepository, SharedMeeting};
use crate::error::CoreError;
use crate::platform::{ArtifactFile, PlatformMeeting};
use crate::transcript::MeetingContent;

/// Summary shown when a transcript container carries none of its own.
const DEFAULT_SUMMARY: &str = "Información de reunión disponible";

#[derive(Debug, Deserialize, Default)]
pub struct FilesQueryParams {
    /// audio | transcript | both (default both)
    pub file_type: Option<String>,
}

/// Create the meetings router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(overview))
        .with_state(state)
}

/// GET /meetings - Aggregated feed of own and group-shared meetings.
async fn overview(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let user_id = ctx.user_id.clone();
    let sources = with_db(move |conn| aggregation::registry_snapshot(conn, &user_id)).await?;

    let feed = state
        .aggregator
        .overview_for_user(&sources, &ctx.user_id, &ctx.username)
        .await?;

    let entries: Vec<Value> = feed
        .iter()
        .map(|entry| {
            json!({
                "id": entry.meeting.id,
                "meeting_name": entry.meeting.meeting_name,
                "created_at": entry.meeting.created_at,
                "duration_minutes": entry.meeting.duration_minutes,
                "source": entry.source.label(),
            })
        })
        .collect();

    Ok(Json(json!({ "meetings": entries })))
}

/// Resolve the sharing edge and the platform meeting for a content
/// request, enforcing group membership on the way.
async fn resolve_shared(
    state: &AppState,
    ctx: &RequestContext,
    group_id: i64,
    meeting_id: i64,
) -> ApiResult<(SharedMeeting, PlatformMeeting)> {
    let user_id = ctx.user_id.clone();
    let edge = with_db(move |conn| {
        member_group(conn, group_id, &user_id)?;
        GroupRepository::get_shared(conn, group_id, meeting_id)?.ok_or_else(|| {
            CoreError::not_found(format!(
                "Meeting {meeting_id} is not shared with group {group_id}"
            ))
        })
    })
    .await?;

    let meeting = state
        .meetings
        .get_meeting(meeting_id)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::not_found(format!("Meeting {meeting_id}"))))?;

    Ok((edge, meeting))
}

fn fetch_request(
    state: &AppState,
    ctx: &RequestContext,
    edge: &SharedMeeting,
    meeting: &PlatformMeeting,
    file: ArtifactFile,
) -> FetchRequest {
    FetchRequest {
        org_id: state.org_id,
        group_id: edge.group_id,
        meeting_id: edge.meeting_id,
        requester_user_id: ctx.user_id.clone(),
        requester_username: ctx.username.clone(),
        owner_username: meeting.username.clone(),
        file,
    }
}

fn file_json(outcome: FetchOutcome) -> Value {
    match outcome {
        FetchOutcome::Retrieved(bytes) => json!({ "file_content": BASE64.encode(bytes) }),
        FetchOutcome::Unavailable { reason } => json!({ "mensaje": reason }),
    }
}

/// GET /groups/:id/shared-meetings/:meeting_id/files - Download the
/// shared audio and/or transcript files.
///
/// Requesting one specific file the grant forbids is a 403. With
/// `file_type=both`, forbidden files are reported in place and the
/// allowed ones still come back.
pub(crate) async fn shared_files(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((group_id, meeting_id)): Path<(i64, i64)>,
    Query(params): Query<FilesQueryParams>,
) -> ApiResult<Json<Value>> {
    let file_type = params.file_type.as_deref().unwrap_or("both");
    let wanted: Vec<(ArtifactFile, ArtifactKind)> = match file_type {
        "audio" => vec![(ArtifactFile::Audio, ArtifactKind::Audio)],
        "transcript" => vec![(ArtifactFile::Transcript, ArtifactKind::Transcript)],
        "both" => vec![
            (ArtifactFile::Audio, ArtifactKind::Audio),
            (ArtifactFile::Transcript, ArtifactKind::Transcript),
        ],
        other => {
            return Err(ApiError::bad_request(format!(
                "Invalid file_type: {other}"
            )))
        }
    };

    let (edge, meeting) = resolve_shared(&state, &ctx, group_id, meeting_id).await?;

    let single = wanted.len() == 1;
    let mut body = json!({ "meeting_id": meeting_id });

    for (file, kind) in wanted {
        if !access::grant_allows(&edge.permisos, kind) {
            if single {
                return Err(ApiError::forbidden(
                    "The sharing permissions do not allow this file",
                ));
            }
            body[file.as_str()] = json!({ "mensaje": "Sin autorización para este archivo" });
            continue;
        }

        let request = fetch_request(&state, &ctx, &edge, &meeting, file);
        let outcome = state.pipeline.fetch_artifact(&edge, kind, &request).await?;
        body[file.as_str()] = file_json(outcome);
    }

    Ok(Json(body))
}

/// GET /groups/:id/shared-meetings/:meeting_id/details - Structured
/// meeting details: summary, key points, segments, flattened
/// transcription, and the audio payload when the grant allows it.
pub(crate) async fn shared_details(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((group_id, meeting_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let (edge, meeting) = resolve_shared(&state, &ctx, group_id, meeting_id).await?;

    let content = if edge.permisos.ver_transcript {
        let request = fetch_request(&state, &ctx, &edge, &meeting, ArtifactFile::Transcript);
        state.pipeline.fetch_meeting_content(&edge, &request).await?
    } else {
        MeetingContent::unavailable()
    };

    let audio_base64 = if edge.permisos.ver_audio {
        let request = fetch_request(&state, &ctx, &edge, &meeting, ArtifactFile::Audio);
        match state
            .pipeline
            .fetch_artifact(&edge, ArtifactKind::Audio, &request)
            .await?
        {
            FetchOutcome::Retrieved(bytes) => Some(BASE64.encode(bytes)),
            FetchOutcome::Unavailable { .. } => None,
        }
    } else {
        None
    };

    let summary = if content.summary.trim().is_empty() {
        DEFAULT_SUMMARY.to_string()
    } else {
        content.summary.clone()
    };
    let key_points = if content.key_points.is_empty() {
        synthesize_key_points(&meeting, &content)
    } else {
        content.key_points.clone()
    };

    Ok(Json(json!({
        "meeting_id": meeting.id,
        "meeting_name": meeting.meeting_name,
        "shared_by": edge.shared_by,
        "created_at": meeting.created_at,
        "duration_minutes": meeting.duration_minutes,
        "permisos": edge.permisos,
        "mensaje": edge.message,
        "summary": summary,
        "key_points": key_points,
        "segments": content.segments,
        "transcription": content.flatten_transcript(),
        "audio_base64": audio_base64,
    })))
}

/// Fallback key points built from the metadata at hand, so the details
/// view never renders empty.
fn synthesize_key_points(meeting: &PlatformMeeting, content: &MeetingContent) -> Vec<String> {
    let mut points = vec![format!("Reunión: {}", meeting.meeting_name)];
    points.push(format!("Fecha: {}", meeting.created_at));
    if let Some(minutes) = meeting.duration_minutes {
        points.push(format!("Duración: {minutes} minutos"));
    }
    let speakers: std::collections::BTreeSet<&str> = content
        .segments
        .iter()
        .filter_map(|s| s.speaker.as_deref())
        .collect();
    if !speakers.is_empty() {
        points.push(format!("Participantes: {}", speakers.len()));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;

    fn meeting() -> PlatformMeeting {
        PlatformMeeting {
            id: 1,
            meeting_name: "Planificación".to_string(),
            username: "ana".to_string(),
            user_id: Some("uid-ana".to_string()),
            audio_ref: None,
            transcript_ref: None,
            created_at: "2025-05-01T10:00:00Z".to_string(),
            duration_minutes: Some(45),
        }
    }

    #[test]
    fn test_synthesized_key_points_cover_metadata() {
        let content = MeetingContent {
            summary: String::new(),
            key_points: vec![],
            segments: vec![
                TranscriptSegment {
                    speaker: Some("Ana".to_string()),
                    text: "Hola".to_string(),
                    start: None,
                    end: None,
                },
                TranscriptSegment {
                    speaker: Some("Luis".to_string()),
                    text: "Buenos días".to_string(),
                    start: None,
                    end: None,
                },
            ],
        };

        let points = synthesize_key_points(&meeting(), &content);
        assert_eq!(points[0], "Reunión: Planificación");
        assert!(points.contains(&"Duración: 45 minutos".to_string()));
        assert!(points.contains(&"Participantes: 2".to_string()));
    }

    #[test]
    fn test_file_json_shapes() {
        let ok = file_json(FetchOutcome::Retrieved(b"abc".to_vec()));
        assert_eq!(ok["file_content"], "YWJj");

        let missing = file_json(FetchOutcome::Unavailable {
            reason: "Archivo de audio no disponible".to_string(),
        });
        assert_eq!(missing["mensaje"], "Archivo de audio no disponible");
    }
}
