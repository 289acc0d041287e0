//! Group sharing registry.
//!
//! Owns the group, group-membership and shared-meeting records. Raw SQL
//! with rusqlite, no ORM. Mutations are individually transactional; group
//! deletion detaches members and shared-meeting edges inside the same
//! transaction so a partial delete is not possible.

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub const MAX_GROUP_NAME_LEN: usize = 255;
pub const MAX_GROUP_DESCRIPTION_LEN: usize = 1000;
pub const MAX_SHARE_MESSAGE_LEN: usize = 500;

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Administrador,
    Colaborador,
    Invitado,
}

impl GroupRole {
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s {
            "administrador" => Ok(GroupRole::Administrador),
            "colaborador" => Ok(GroupRole::Colaborador),
            "invitado" => Ok(GroupRole::Invitado),
            other => Err(CoreError::validation(format!(
                "Invalid group role: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Administrador => "administrador",
            GroupRole::Colaborador => "colaborador",
            GroupRole::Invitado => "invitado",
        }
    }
}

/// The three-flag capability set attached to a shared-meeting edge.
/// Defaults to all-true when a share omits it; immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionGrant {
    pub ver_audio: bool,
    pub ver_transcript: bool,
    pub descargar: bool,
}

impl Default for PermissionGrant {
    fn default() -> Self {
        Self {
            ver_audio: true,
            ver_transcript: true,
            descargar: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: i64,
    pub user_id: String,
    pub rol: GroupRole,
    pub created_at: String,
}

/// The record of one meeting being shared into one group.
///
/// `expires_at` is stored but not evaluated anywhere; see DESIGN.md.
#[derive(Debug, Clone, Serialize)]
pub struct SharedMeeting {
    pub id: i64,
    pub group_id: i64,
    pub meeting_id: i64,
    pub shared_by: String,
    pub permisos: PermissionGrant,
    pub message: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
}

/// Result of an add-member request. Adding an existing member is a no-op
/// with an informative outcome rather than an error.
#[derive(Debug)]
pub enum AddMemberOutcome {
    Added(GroupMember),
    AlreadyMember,
}

pub struct GroupRepository;

impl GroupRepository {
    /// Create a group and enroll its owner as an administrator member,
    /// both inside one transaction.
    pub fn create_group(
        conn: &mut Connection,
        name: &str,
        description: Option<&str>,
        owner_id: &str,
    ) -> CoreResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Group name is required"));
        }
        if name.len() > MAX_GROUP_NAME_LEN {
            return Err(CoreError::validation(format!(
                "Group name must be at most {MAX_GROUP_NAME_LEN} characters"
            )));
        }
        if let Some(desc) = description {
            if desc.len() > MAX_GROUP_DESCRIPTION_LEN {
                return Err(CoreError::validation(format!(
                    "Group description must be at most {MAX_GROUP_DESCRIPTION_LEN} characters"
                )));
            }
        }

        let tx = conn.transaction().context("Failed to start transaction")?;

        tx.execute(
            "INSERT INTO groups (name, description, owner_id) VALUES (?1, ?2, ?3)",
            params![name, description, owner_id],
        )
        .context("Failed to insert group")?;
        let group_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id, rol) VALUES (?1, ?2, ?3)",
            params![group_id, owner_id, GroupRole::Administrador.as_str()],
        )
        .context("Failed to enroll group owner")?;

        tx.commit().context("Failed to commit group creation")?;

        Self::get(conn, group_id)?
            .ok_or_else(|| CoreError::not_found(format!("Group {group_id} after creation")))
    }

    pub fn get(conn: &Connection, id: i64) -> CoreResult<Option<Group>> {
        let group = conn
            .query_row(
                "SELECT id, name, description, owner_id, is_active, created_at \
                 FROM groups WHERE id = ?1",
                params![id],
                Self::map_group,
            )
            .optional()
            .context("Failed to query group")?;
        Ok(group)
    }

    /// List active groups, newest first.
    pub fn list(conn: &Connection) -> CoreResult<Vec<Group>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, name, description, owner_id, is_active, created_at \
                 FROM groups WHERE is_active = 1 ORDER BY created_at DESC, id DESC",
            )
            .context("Failed to prepare groups query")?;

        let rows = stmt
            .query_map([], Self::map_group)
            .context("Failed to list groups")?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row.context("Failed to map group row")?);
        }
        Ok(groups)
    }

    pub fn update(
        conn: &Connection,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        is_active: Option<bool>,
    ) -> CoreResult<()> {
        if let Some(name) = name {
            if name.trim().is_empty() || name.len() > MAX_GROUP_NAME_LEN {
                return Err(CoreError::validation("Invalid group name"));
            }
        }
        if let Some(desc) = description {
            if desc.len() > MAX_GROUP_DESCRIPTION_LEN {
                return Err(CoreError::validation("Group description too long"));
            }
        }

        let updated = conn
            .execute(
                "UPDATE groups SET \
                 name = COALESCE(?1, name), \
                 description = COALESCE(?2, description), \
                 is_active = COALESCE(?3, is_active) \
                 WHERE id = ?4",
                params![name, description, is_active.map(|a| a as i64), id],
            )
            .context("Failed to update group")?;

        if updated == 0 {
            return Err(CoreError::not_found(format!("Group {id}")));
        }
        Ok(())
    }

    /// Delete a group, detaching all members and shared-meeting edges.
    /// Only the group owner may invoke this. All-or-nothing: runs in one
    /// transaction, so a crash cannot leave orphan edges.
    pub fn delete_group(conn: &mut Connection, group_id: i64, caller_id: &str) -> CoreResult<()> {
        let group = Self::get(conn, group_id)?
            .ok_or_else(|| CoreError::not_found(format!("Group {group_id}")))?;

        if group.owner_id != caller_id {
            return Err(CoreError::not_authorized(
                "Only the group owner can delete the group",
            ));
        }

        let tx = conn.transaction().context("Failed to start transaction")?;
        tx.execute(
            "DELETE FROM shared_meetings WHERE group_id = ?1",
            params![group_id],
        )
        .context("Failed to detach shared meetings")?;
        tx.execute(
            "DELETE FROM group_members WHERE group_id = ?1",
            params![group_id],
        )
        .context("Failed to detach group members")?;
        tx.execute("DELETE FROM groups WHERE id = ?1", params![group_id])
            .context("Failed to delete group")?;
        tx.commit().context("Failed to commit group deletion")?;

        Ok(())
    }

    /// Add a member to a group. The caller is responsible for verifying
    /// organization membership first; adding an existing member is a no-op.
    pub fn add_member(
        conn: &Connection,
        group_id: i64,
        user_id: &str,
        rol: GroupRole,
    ) -> CoreResult<AddMemberOutcome> {
        if Self::is_member(conn, group_id, user_id)? {
            return Ok(AddMemberOutcome::AlreadyMember);
        }

        conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id, rol) VALUES (?1, ?2, ?3)",
            params![group_id, user_id, rol.as_str()],
        )
        .context("Failed to add group member")?;

        let member = conn
            .query_row(
                "SELECT id, group_id, user_id, rol, created_at \
                 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
                Self::map_member,
            )
            .context("Failed to read back group member")?;

        Ok(AddMemberOutcome::Added(member))
    }

    pub fn update_member_role(
        conn: &Connection,
        group_id: i64,
        member_id: i64,
        rol: GroupRole,
    ) -> CoreResult<()> {
        let updated = conn
            .execute(
                "UPDATE group_members SET rol = ?1 WHERE id = ?2 AND group_id = ?3",
                params![rol.as_str(), member_id, group_id],
            )
            .context("Failed to update member role")?;

        if updated == 0 {
            return Err(CoreError::not_found(format!(
                "Member {member_id} in group {group_id}"
            )));
        }
        Ok(())
    }

    pub fn remove_member(conn: &Connection, group_id: i64, member_id: i64) -> CoreResult<()> {
        let deleted = conn
            .execute(
                "DELETE FROM group_members WHERE id = ?1 AND group_id = ?2",
                params![member_id, group_id],
            )
            .context("Failed to remove group member")?;

        if deleted == 0 {
            return Err(CoreError::not_found(format!(
                "Member {member_id} in group {group_id}"
            )));
        }
        Ok(())
    }

    pub fn list_members(conn: &Connection, group_id: i64) -> CoreResult<Vec<GroupMember>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, group_id, user_id, rol, created_at \
                 FROM group_members WHERE group_id = ?1 ORDER BY created_at ASC, id ASC",
            )
            .context("Failed to prepare members query")?;

        let rows = stmt
            .query_map(params![group_id], Self::map_member)
            .context("Failed to list group members")?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row.context("Failed to map member row")?);
        }
        Ok(members)
    }

    pub fn is_member(conn: &Connection, group_id: i64, user_id: &str) -> CoreResult<bool> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
                |row| row.get(0),
            )
            .context("Failed to check group membership")?;
        Ok(count > 0)
    }

    /// Active groups the user belongs to (as owner or member).
    pub fn groups_for_user(conn: &Connection, user_id: &str) -> CoreResult<Vec<Group>> {
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT g.id, g.name, g.description, g.owner_id, g.is_active, g.created_at \
                 FROM groups g \
                 LEFT JOIN group_members m ON m.group_id = g.id \
                 WHERE g.is_active = 1 AND (g.owner_id = ?1 OR m.user_id = ?1) \
                 ORDER BY g.created_at DESC, g.id DESC",
            )
            .context("Failed to prepare user groups query")?;

        let rows = stmt
            .query_map(params![user_id], Self::map_group)
            .context("Failed to list user groups")?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row.context("Failed to map group row")?);
        }
        Ok(groups)
    }

    /// Share a meeting into a group. Idempotent: if an edge for
    /// (group, meeting) already exists the existing edge is returned
    /// unchanged, including its original permission grant.
    pub fn share_meeting(
        conn: &mut Connection,
        group_id: i64,
        meeting_id: i64,
        shared_by: &str,
        permisos: PermissionGrant,
        message: Option<&str>,
        expires_at: Option<&str>,
    ) -> CoreResult<SharedMeeting> {
        if let Some(msg) = message {
            if msg.len() > MAX_SHARE_MESSAGE_LEN {
                return Err(CoreError::validation(format!(
                    "Share message must be at most {MAX_SHARE_MESSAGE_LEN} characters"
                )));
            }
        }

        let tx = conn.transaction().context("Failed to start transaction")?;

        // INSERT OR IGNORE + the UNIQUE(group_id, meeting_id) constraint
        // gives exactly one edge even when two shares race.
        tx.execute(
            "INSERT OR IGNORE INTO shared_meetings \
             (group_id, meeting_id, shared_by, ver_audio, ver_transcript, descargar, message, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                group_id,
                meeting_id,
                shared_by,
                permisos.ver_audio,
                permisos.ver_transcript,
                permisos.descargar,
                message,
                expires_at,
            ],
        )
        .context("Failed to insert shared meeting")?;

        let edge = tx
            .query_row(
                "SELECT id, group_id, meeting_id, shared_by, ver_audio, ver_transcript, \
                 descargar, message, expires_at, created_at \
                 FROM shared_meetings WHERE group_id = ?1 AND meeting_id = ?2",
                params![group_id, meeting_id],
                Self::map_shared,
            )
            .context("Failed to read back shared meeting")?;

        tx.commit().context("Failed to commit meeting share")?;

        Ok(edge)
    }

    pub fn get_shared(
        conn: &Connection,
        group_id: i64,
        meeting_id: i64,
    ) -> CoreResult<Option<SharedMeeting>> {
        let edge = conn
            .query_row(
                "SELECT id, group_id, meeting_id, shared_by, ver_audio, ver_transcript, \
                 descargar, message, expires_at, created_at \
                 FROM shared_meetings WHERE group_id = ?1 AND meeting_id = ?2",
                params![group_id, meeting_id],
                Self::map_shared,
            )
            .optional()
            .context("Failed to query shared meeting")?;
        Ok(edge)
    }

    /// Revoke a share. Only the identity that originally shared the
    /// meeting may revoke it, even if the requester owns the group.
    pub fn unshare_meeting(
        conn: &Connection,
        group_id: i64,
        meeting_id: i64,
        requester: &str,
    ) -> CoreResult<()> {
        let edge = Self::get_shared(conn, group_id, meeting_id)?.ok_or_else(|| {
            CoreError::not_found(format!(
                "Meeting {meeting_id} is not shared with group {group_id}"
            ))
        })?;

        if edge.shared_by != requester {
            return Err(CoreError::not_authorized(
                "Only the user who shared the meeting can stop sharing it",
            ));
        }

        conn.execute(
            "DELETE FROM shared_meetings WHERE group_id = ?1 AND meeting_id = ?2",
            params![group_id, meeting_id],
        )
        .context("Failed to delete shared meeting")?;

        Ok(())
    }

    pub fn list_shared_meetings(
        conn: &Connection,
        group_id: i64,
    ) -> CoreResult<Vec<SharedMeeting>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, group_id, meeting_id, shared_by, ver_audio, ver_transcript, \
                 descargar, message, expires_at, created_at \
                 FROM shared_meetings WHERE group_id = ?1 \
                 ORDER BY created_at DESC, id DESC",
            )
            .context("Failed to prepare shared meetings query")?;

        let rows = stmt
            .query_map(params![group_id], Self::map_shared)
            .context("Failed to list shared meetings")?;

        let mut edges = Vec::new();
        for row in rows {
            edges.push(row.context("Failed to map shared meeting row")?);
        }
        Ok(edges)
    }

    /// Whether the meeting is shared into any active group the user
    /// belongs to.
    pub fn meeting_shared_with_user(
        conn: &Connection,
        meeting_id: i64,
        user_id: &str,
    ) -> CoreResult<bool> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM shared_meetings s \
                 JOIN groups g ON g.id = s.group_id \
                 JOIN group_members m ON m.group_id = s.group_id \
                 WHERE s.meeting_id = ?1 AND g.is_active = 1 AND m.user_id = ?2",
                params![meeting_id, user_id],
                |row| row.get(0),
            )
            .context("Failed to check meeting group access")?;
        Ok(count > 0)
    }

    fn map_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
        Ok(Group {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            owner_id: row.get(3)?,
            is_active: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
        })
    }

    fn map_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupMember> {
        let rol: String = row.get(3)?;
        Ok(GroupMember {
            id: row.get(0)?,
            group_id: row.get(1)?,
            user_id: row.get(2)?,
            rol: GroupRole::parse(&rol).map_err(|_| rusqlite::Error::InvalidQuery)?,
            created_at: row.get(4)?,
        })
    }

    fn map_shared(row: &rusqlite::Row<'_>) -> rusqlite::Result<SharedMeeting> {
        Ok(SharedMeeting {
            id: row.get(0)?,
            group_id: row.get(1)?,
            meeting_id: row.get(2)?,
            shared_by: row.get(3)?,
            permisos: PermissionGrant {
                ver_audio: row.get::<_, i64>(4)? != 0,
                ver_transcript: row.get::<_, i64>(5)? != 0,
                descargar: row.get::<_, i64>(6)? != 0,
            },
            message: row.get(7)?,
            expires_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn make_group(conn: &mut Connection, owner: &str) -> Group {
        GroupRepository::create_group(conn, "Equipo", Some("Grupo de prueba"), owner).unwrap()
    }

    #[test]
    fn test_create_group_enrolls_owner() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "user-a");

        assert_eq!(group.name, "Equipo");
        assert_eq!(group.owner_id, "user-a");
        assert!(group.is_active);

        let members = GroupRepository::list_members(&conn, group.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, "user-a");
        assert_eq!(members[0].rol, GroupRole::Administrador);
    }

    #[test]
    fn test_create_group_rejects_empty_name() {
        let mut conn = setup_db();
        let result = GroupRepository::create_group(&mut conn, "  ", None, "user-a");
        assert!(matches!(result, Err(CoreError::ValidationFailed(_))));
    }

    #[test]
    fn test_create_group_rejects_long_name() {
        let mut conn = setup_db();
        let name = "x".repeat(MAX_GROUP_NAME_LEN + 1);
        let result = GroupRepository::create_group(&mut conn, &name, None, "user-a");
        assert!(matches!(result, Err(CoreError::ValidationFailed(_))));
    }

    #[test]
    fn test_add_member_is_noop_for_existing() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "user-a");

        let first = GroupRepository::add_member(&conn, group.id, "user-b", GroupRole::Colaborador)
            .unwrap();
        assert!(matches!(first, AddMemberOutcome::Added(_)));

        let second = GroupRepository::add_member(&conn, group.id, "user-b", GroupRole::Invitado)
            .unwrap();
        assert!(matches!(second, AddMemberOutcome::AlreadyMember));

        let members = GroupRepository::list_members(&conn, group.id).unwrap();
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_update_member_role() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "user-a");
        let member = match GroupRepository::add_member(
            &conn,
            group.id,
            "user-b",
            GroupRole::Colaborador,
        )
        .unwrap()
        {
            AddMemberOutcome::Added(m) => m,
            AddMemberOutcome::AlreadyMember => panic!("expected new member"),
        };

        GroupRepository::update_member_role(&conn, group.id, member.id, GroupRole::Administrador)
            .unwrap();

        let members = GroupRepository::list_members(&conn, group.id).unwrap();
        let updated = members.iter().find(|m| m.id == member.id).unwrap();
        assert_eq!(updated.rol, GroupRole::Administrador);
    }

    #[test]
    fn test_remove_missing_member_is_not_found() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "user-a");
        let result = GroupRepository::remove_member(&conn, group.id, 9999);
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_share_meeting_is_idempotent() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "user-a");

        let first = GroupRepository::share_meeting(
            &mut conn,
            group.id,
            42,
            "user-a",
            PermissionGrant::default(),
            Some("Revisen esto"),
            None,
        )
        .unwrap();

        // Second share with different arguments returns the original edge.
        let second = GroupRepository::share_meeting(
            &mut conn,
            group.id,
            42,
            "user-b",
            PermissionGrant {
                ver_audio: false,
                ver_transcript: false,
                descargar: false,
            },
            None,
            None,
        )
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.shared_by, "user-a");
        assert!(second.permisos.ver_audio);

        let edges = GroupRepository::list_shared_meetings(&conn, group.id).unwrap();
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_unshare_requires_original_sharer() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "owner");

        GroupRepository::share_meeting(
            &mut conn,
            group.id,
            7,
            "user-a",
            PermissionGrant::default(),
            None,
            None,
        )
        .unwrap();

        // The group owner did not share the meeting, so they cannot revoke.
        let result = GroupRepository::unshare_meeting(&conn, group.id, 7, "owner");
        assert!(matches!(result, Err(CoreError::NotAuthorized(_))));
        assert!(GroupRepository::get_shared(&conn, group.id, 7)
            .unwrap()
            .is_some());

        // The original sharer can.
        GroupRepository::unshare_meeting(&conn, group.id, 7, "user-a").unwrap();
        assert!(GroupRepository::get_shared(&conn, group.id, 7)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unshare_missing_edge_is_not_found() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "owner");
        let result = GroupRepository::unshare_meeting(&conn, group.id, 99, "owner");
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_delete_group_cascades() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "owner");

        GroupRepository::add_member(&conn, group.id, "user-b", GroupRole::Colaborador).unwrap();
        GroupRepository::share_meeting(
            &mut conn,
            group.id,
            1,
            "owner",
            PermissionGrant::default(),
            None,
            None,
        )
        .unwrap();
        GroupRepository::share_meeting(
            &mut conn,
            group.id,
            2,
            "owner",
            PermissionGrant::default(),
            None,
            None,
        )
        .unwrap();

        GroupRepository::delete_group(&mut conn, group.id, "owner").unwrap();

        assert!(GroupRepository::get(&conn, group.id).unwrap().is_none());
        assert!(GroupRepository::list_members(&conn, group.id)
            .unwrap()
            .is_empty());
        assert!(GroupRepository::list_shared_meetings(&conn, group.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_group_rejects_non_owner() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "owner");
        GroupRepository::add_member(&conn, group.id, "user-b", GroupRole::Colaborador).unwrap();
        GroupRepository::share_meeting(
            &mut conn,
            group.id,
            1,
            "owner",
            PermissionGrant::default(),
            None,
            None,
        )
        .unwrap();

        let result = GroupRepository::delete_group(&mut conn, group.id, "user-b");
        assert!(matches!(result, Err(CoreError::NotAuthorized(_))));

        // Group and its edges are untouched.
        assert!(GroupRepository::get(&conn, group.id).unwrap().is_some());
        assert_eq!(GroupRepository::list_members(&conn, group.id).unwrap().len(), 2);
        assert_eq!(
            GroupRepository::list_shared_meetings(&conn, group.id)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_groups_for_user_includes_owned_and_joined() {
        let mut conn = setup_db();
        let owned = make_group(&mut conn, "user-a");
        let other =
            GroupRepository::create_group(&mut conn, "Ventas", None, "user-b").unwrap();
        GroupRepository::add_member(&conn, other.id, "user-a", GroupRole::Invitado).unwrap();

        let groups = GroupRepository::groups_for_user(&conn, "user-a").unwrap();
        let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        assert!(ids.contains(&owned.id));
        assert!(ids.contains(&other.id));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_meeting_shared_with_user() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "owner");
        GroupRepository::add_member(&conn, group.id, "user-c", GroupRole::Colaborador).unwrap();
        GroupRepository::share_meeting(
            &mut conn,
            group.id,
            5,
            "owner",
            PermissionGrant::default(),
            None,
            None,
        )
        .unwrap();

        assert!(GroupRepository::meeting_shared_with_user(&conn, 5, "user-c").unwrap());
        assert!(!GroupRepository::meeting_shared_with_user(&conn, 5, "stranger").unwrap());
        assert!(!GroupRepository::meeting_shared_with_user(&conn, 6, "user-c").unwrap());
    }

    #[test]
    fn test_share_message_length_limit() {
        let mut conn = setup_db();
        let group = make_group(&mut conn, "owner");
        let long = "m".repeat(MAX_SHARE_MESSAGE_LEN + 1);
        let result = GroupRepository::share_meeting(
            &mut conn,
            group.id,
            3,
            "owner",
            PermissionGrant::default(),
            Some(&long),
            None,
        );
        assert!(matches!(result, Err(CoreError::ValidationFailed(_))));
    }
}
