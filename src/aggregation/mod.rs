//! Meeting aggregation service.
//!
//! Merges the caller's own meetings and the meetings shared into their
//! groups into one deduplicated feed, newest first, capped. A meeting the
//! caller owns that is also shared into one of their groups appears once,
//! tagged `own`. The source tag is informational for display only;
//! authorization always re-derives from the access decision engine.

use chrono::{DateTime, FixedOffset};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::db::GroupRepository;
use crate::error::CoreResult;
use crate::platform::{MeetingDirectory, PlatformMeeting};

/// Hard cap on the overview feed.
pub const OVERVIEW_CAP: usize = 50;

/// Where a feed entry came from, first-seen wins with `own` priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingSource {
    Own,
    Group(String),
}

impl MeetingSource {
    pub fn label(&self) -> String {
        match self {
            MeetingSource::Own => "own".to_string(),
            MeetingSource::Group(name) => format!("group: {name}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverviewEntry {
    pub meeting: PlatformMeeting,
    pub source: MeetingSource,
}

/// The registry side of the feed, read in one pass so the database
/// connection never crosses an await point.
#[derive(Debug, Clone)]
pub struct GroupFeedSource {
    pub group: crate::db::Group,
    pub edges: Vec<crate::db::SharedMeeting>,
}

/// Snapshot every group the user belongs to together with its shared
/// meeting edges.
pub fn registry_snapshot(conn: &Connection, user_id: &str) -> CoreResult<Vec<GroupFeedSource>> {
    let groups = GroupRepository::groups_for_user(conn, user_id)?;
    let mut sources = Vec::with_capacity(groups.len());
    for group in groups {
        let edges = match GroupRepository::list_shared_meetings(conn, group.id) {
            Ok(edges) => edges,
            Err(e) => {
                warn!("Failed to load shared meetings of group {}: {}", group.id, e);
                Vec::new()
            }
        };
        sources.push(GroupFeedSource { group, edges });
    }
    Ok(sources)
}

pub struct MeetingAggregator {
    directory: Arc<dyn MeetingDirectory>,
}

impl MeetingAggregator {
    pub fn new(directory: Arc<dyn MeetingDirectory>) -> Self {
        Self { directory }
    }

    /// Build the merged overview feed for the caller. A failing source
    /// (the caller's own list, or one shared meeting's lookup)
    /// contributes nothing and is logged; it never aborts the whole
    /// aggregation.
    pub async fn overview_for_user(
        &self,
        sources: &[GroupFeedSource],
        user_id: &str,
        username: &str,
    ) -> CoreResult<Vec<OverviewEntry>> {
        let mut entries: Vec<OverviewEntry> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();

        match self.directory.list_meetings_for_user(user_id).await {
            Ok(own) => {
                for meeting in own {
                    if seen.insert(meeting.id) {
                        entries.push(OverviewEntry {
                            meeting,
                            source: MeetingSource::Own,
                        });
                    }
                }
            }
            Err(e) => {
                warn!("Failed to load own meetings for {}: {}", username, e);
            }
        }

        for source in sources {
            for edge in &source.edges {
                if seen.contains(&edge.meeting_id) {
                    continue;
                }
                match self.directory.get_meeting(edge.meeting_id).await {
                    Ok(Some(meeting)) => {
                        seen.insert(meeting.id);
                        entries.push(OverviewEntry {
                            meeting,
                            source: MeetingSource::Group(source.group.name.clone()),
                        });
                    }
                    Ok(None) => {
                        warn!(
                            "Shared meeting {} of group {} no longer exists upstream",
                            edge.meeting_id, source.group.id
                        );
                    }
                    Err(e) => {
                        warn!(
                            "Failed to resolve shared meeting {} of group {}: {}",
                            edge.meeting_id, source.group.id, e
                        );
                    }
                }
            }
        }

        entries.sort_by(|a, b| {
            sort_key(&b.meeting)
                .cmp(&sort_key(&a.meeting))
                .then_with(|| b.meeting.id.cmp(&a.meeting.id))
        });
        entries.truncate(OVERVIEW_CAP);

        Ok(entries)
    }
}

fn sort_key(meeting: &PlatformMeeting) -> (Option<DateTime<FixedOffset>>, String) {
    (
        DateTime::parse_from_rfc3339(&meeting.created_at).ok(),
        meeting.created_at.clone(),
    )
}
