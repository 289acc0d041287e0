use anyhow::{Context, Result};
use rusqlite::Connection;

pub mod groups;

pub use groups::{
    AddMemberOutcome, Group, GroupMember, GroupRepository, GroupRole, PermissionGrant,
    SharedMeeting,
};

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            owner_id TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create groups table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS group_members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL,
            user_id TEXT NOT NULL,
            rol TEXT NOT NULL DEFAULT 'colaborador',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(group_id, user_id)
        )",
        [],
    )
    .context("Failed to create group_members table")?;

    // UNIQUE(group_id, meeting_id) makes shareMeeting idempotent even
    // under concurrent requests.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS shared_meetings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL,
            meeting_id INTEGER NOT NULL,
            shared_by TEXT NOT NULL,
            ver_audio INTEGER NOT NULL DEFAULT 1,
            ver_transcript INTEGER NOT NULL DEFAULT 1,
            descargar INTEGER NOT NULL DEFAULT 1,
            message TEXT,
            expires_at TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(group_id, meeting_id)
        )",
        [],
    )
    .context("Failed to create shared_meetings table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(user_id)",
        [],
    )
    .context("Failed to create group_members user index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_shared_meetings_group ON shared_meetings(group_id)",
        [],
    )
    .context("Failed to create shared_meetings group index")?;

    Ok(())
}
