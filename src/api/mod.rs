//! REST API server for Meetshare.
//!
//! Provides HTTP endpoints for:
//! - Sharing group management (create, update, members)
//! - Meeting sharing and revocation
//! - The aggregated meeting overview feed
//! - Shared artifact retrieval (audio, transcript, details)
//! - Organization member listing

pub mod context;
pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use crate::aggregation::MeetingAggregator;
use crate::config::Config;
use crate::content::ContentPipeline;
use crate::membership::MembershipResolver;
use crate::platform::MeetingDirectory;

pub use context::RequestContext;

/// Shared collaborators handed to every route handler. Database
/// connections are opened per request on the blocking pool; only the
/// platform-facing services live here.
#[derive(Clone)]
pub struct AppState {
    pub org_id: i64,
    pub org_name: String,
    pub resolver: Arc<MembershipResolver>,
    pub meetings: Arc<dyn MeetingDirectory>,
    pub aggregator: Arc<MeetingAggregator>,
    pub pipeline: Arc<ContentPipeline>,
}

pub struct ApiServer {
    port: u16,
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState, config: &Config) -> Self {
        Self {
            port: config.server.port,
            state,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            // Root and version endpoints
            .route("/", get(status))
            .route("/version", get(version))
            // API routes
            .nest("/groups", routes::groups::router(self.state.clone()))
            .nest("/meetings", routes::meetings::router(self.state.clone()))
            .nest("/members", routes::members::router(self.state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                - Service info");
        info!("  GET  /version         - Get version info");
        info!("  GET  /groups          - List caller's sharing groups");
        info!("  POST /groups          - Create a sharing group");
        info!("  GET  /groups/:id      - Get a group with its members");
        info!("  PUT  /groups/:id      - Update a group");
        info!("  DELETE /groups/:id    - Delete a group (owner only)");
        info!("  GET  /groups/:id/members           - List group members");
        info!("  POST /groups/:id/members           - Add a member");
        info!("  PUT  /groups/:id/members/:mid      - Change a member's role");
        info!("  DELETE /groups/:id/members/:mid    - Remove a member");
        info!("  GET  /groups/:id/shared-meetings   - List shared meetings");
        info!("  POST /groups/:id/share-meeting     - Share a meeting");
        info!("  DELETE /groups/:id/shared-meetings/:mid         - Stop sharing");
        info!("  GET  /groups/:id/shared-meetings/:mid/files     - Download shared files");
        info!("  GET  /groups/:id/shared-meetings/:mid/details   - Meeting details");
        info!("  GET  /meetings        - Aggregated meeting overview");
        info!("  GET  /members         - List organization members");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetshare",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "meetshare"
    }))
}
