//! Access decision engine.
//!
//! Stateless policy evaluation over the membership resolver and the group
//! sharing registry. Every decision here fails closed: a missing edge,
//! meeting or membership row, or an unreachable directory, resolves to a
//! deny, never to an error that could be mistaken for an allow.

use rusqlite::Connection;

use crate::db::{Group, GroupRepository, PermissionGrant, SharedMeeting};
use crate::membership::{self, MembershipResolver, OrgRole};
use crate::platform::PlatformMeeting;

/// The artifact capability being requested, mirroring the three grant
/// flags on a shared-meeting edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Audio,
    Transcript,
    Download,
}

impl ArtifactKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(ArtifactKind::Audio),
            "transcript" => Some(ArtifactKind::Transcript),
            "download" => Some(ArtifactKind::Download),
            _ => None,
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Whether the caller may manage (share, re-share, unshare) the meeting.
///
/// True for the meeting owner, and also for any member of a group the
/// meeting is shared into. The co-member case is deliberately broad and
/// kept as observed upstream; see DESIGN.md before tightening it.
pub fn can_manage_meeting(
    conn: &Connection,
    meeting: &PlatformMeeting,
    caller_user_id: &str,
    caller_username: &str,
) -> Decision {
    if meeting.owned_by(caller_user_id, caller_username) {
        return Decision::Allowed;
    }

    match GroupRepository::meeting_shared_with_user(conn, meeting.id, caller_user_id) {
        Ok(true) => Decision::Allowed,
        Ok(false) => Decision::Denied,
        Err(e) => {
            tracing::warn!("Group access check failed, denying: {}", e);
            Decision::Denied
        }
    }
}

/// Whether the caller may manage the group: its owner, or an organization
/// administrator. Resolver failures deny.
pub async fn can_manage_group(
    resolver: &MembershipResolver,
    group: &Group,
    caller_user_id: &str,
) -> Decision {
    if membership::is_group_owner(group, caller_user_id) {
        return Decision::Allowed;
    }

    match resolver.role(caller_user_id).await {
        Ok(Some(OrgRole::Administrador)) => Decision::Allowed,
        Ok(_) => Decision::Denied,
        Err(e) => {
            tracing::warn!("Membership directory unavailable, denying: {}", e);
            Decision::Denied
        }
    }
}

/// Look up the grant flag for the requested artifact kind. The all-true
/// default exists only at edge construction time; by the time an edge is
/// read back here the flags are whatever was stored.
pub fn authorize_artifact(shared: &SharedMeeting, kind: ArtifactKind) -> Decision {
    if grant_allows(&shared.permisos, kind) {
        Decision::Allowed
    } else {
        Decision::Denied
    }
}

pub fn grant_allows(grant: &PermissionGrant, kind: ArtifactKind) -> bool {
    match kind {
        ArtifactKind::Audio => grant.ver_audio,
        ArtifactKind::Transcript => grant.ver_transcript,
        ArtifactKind::Download => grant.descargar,
    }
}
