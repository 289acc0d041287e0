//! API route modules.

pub mod groups;
pub mod meetings;
pub mod members;

use crate::api::error::{ApiError, ApiResult};
use crate::error::CoreResult;

/// Run a registry operation on the blocking pool with a fresh database
/// connection. SQLite connections never cross an await point.
pub(crate) async fn with_db<T, F>(f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> CoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = crate::db::init_db()?;
        f(&mut conn)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Blocking task failed: {e}")))?
    .map_err(ApiError::from)
}
