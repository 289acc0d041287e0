//! Membership resolver.
//!
//! Answers organization role and group ownership/membership questions.
//! The organization directory is external and read-only; when it is
//! unreachable the error surfaces as `UpstreamUnavailable` and callers
//! must treat that as a deny, never an allow.

use rusqlite::Connection;
use std::sync::Arc;

use crate::db::{Group, GroupRepository};
use crate::error::CoreResult;
use crate::platform::MembershipDirectory;

/// Role of a user inside the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgRole {
    Administrador,
    Miembro,
    Colaborador,
}

impl OrgRole {
    /// The directory reports roles in mixed vocabularies; normalize the
    /// admin aliases and default everything unknown to plain member.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "administrador" | "admin" | "administrator" => OrgRole::Administrador,
            "colaborador" => OrgRole::Colaborador,
            _ => OrgRole::Miembro,
        }
    }
}

pub struct MembershipResolver {
    directory: Arc<dyn MembershipDirectory>,
    org_id: i64,
}

impl MembershipResolver {
    pub fn new(directory: Arc<dyn MembershipDirectory>, org_id: i64) -> Self {
        Self { directory, org_id }
    }

    /// Organization role of the user, or None when they are not a member.
    /// The directory does not enforce one row per user; the first row
    /// wins, matching the observed behavior of the upstream system.
    pub async fn role(&self, user_id: &str) -> CoreResult<Option<OrgRole>> {
        let members = self.directory.get_members(self.org_id).await?;
        Ok(members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| OrgRole::parse(&m.rol)))
    }

    pub async fn is_org_member(&self, user_id: &str) -> CoreResult<bool> {
        Ok(self.role(user_id).await?.is_some())
    }

    /// The full member roster of the organization.
    pub async fn members(&self) -> CoreResult<Vec<crate::platform::OrgMember>> {
        self.directory.get_members(self.org_id).await
    }
}

pub fn is_group_owner(group: &Group, user_id: &str) -> bool {
    group.owner_id == user_id
}

/// Owner counts as a member even without an explicit membership row.
pub fn is_group_member(conn: &Connection, group: &Group, user_id: &str) -> CoreResult<bool> {
    if is_group_owner(group, user_id) {
        return Ok(true);
    }
    GroupRepository::is_member(conn, group.id, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::platform::OrgMember;
    use async_trait::async_trait;

    struct FakeDirectory {
        members: Vec<OrgMember>,
        fail: bool,
    }

    #[async_trait]
    impl MembershipDirectory for FakeDirectory {
        async fn get_members(&self, _org_id: i64) -> CoreResult<Vec<OrgMember>> {
            if self.fail {
                return Err(CoreError::upstream("directory unreachable"));
            }
            Ok(self.members.clone())
        }
    }

    fn member(user_id: &str, rol: &str) -> OrgMember {
        OrgMember {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
            full_name: None,
            rol: rol.to_string(),
        }
    }

    #[tokio::test]
    async fn test_role_normalizes_admin_aliases() {
        let resolver = MembershipResolver::new(
            Arc::new(FakeDirectory {
                members: vec![member("u1", "admin"), member("u2", "miembro")],
                fail: false,
            }),
            1,
        );

        assert_eq!(resolver.role("u1").await.unwrap(), Some(OrgRole::Administrador));
        assert_eq!(resolver.role("u2").await.unwrap(), Some(OrgRole::Miembro));
        assert_eq!(resolver.role("u3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_rows_first_wins() {
        let resolver = MembershipResolver::new(
            Arc::new(FakeDirectory {
                members: vec![member("u1", "miembro"), member("u1", "administrador")],
                fail: false,
            }),
            1,
        );

        assert_eq!(resolver.role("u1").await.unwrap(), Some(OrgRole::Miembro));
    }

    #[tokio::test]
    async fn test_unreachable_directory_surfaces_upstream_error() {
        let resolver = MembershipResolver::new(
            Arc::new(FakeDirectory {
                members: vec![],
                fail: true,
            }),
            1,
        );

        let result = resolver.is_org_member("u1").await;
        assert!(matches!(result, Err(CoreError::UpstreamUnavailable(_))));
    }
}
