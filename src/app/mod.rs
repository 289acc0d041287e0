use crate::aggregation::MeetingAggregator;
use crate::api::{ApiServer, AppState};
use crate::config::Config;
use crate::content::ContentPipeline;
use crate::membership::MembershipResolver;
use crate::platform::PlatformClient;
use crate::transcript::JsonContainerAdapter;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub async fn run_service() -> Result<()> {
    info!("Starting Meetshare service");

    let config = Config::load()?;

    // Apply pending schema migrations before serving.
    crate::db::init_db()?;

    let platform = Arc::new(PlatformClient::new(&config.platform)?);

    let resolver = Arc::new(MembershipResolver::new(
        platform.clone(),
        config.organization.id,
    ));
    let aggregator = Arc::new(MeetingAggregator::new(platform.clone()));
    let pipeline = Arc::new(ContentPipeline::new(
        platform.clone(),
        Arc::new(JsonContainerAdapter),
    ));

    let state = AppState {
        org_id: config.organization.id,
        org_name: config.organization.name.clone(),
        resolver,
        meetings: platform,
        aggregator,
        pipeline,
    };

    let api_server = ApiServer::new(state, &config);

    info!("Meetshare is ready, serving organization {}", config.organization.name);
    api_server.start().await
}
