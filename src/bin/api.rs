use advisor_reference_orchestrator::{agent::ReferenceAgent, api::start_server, config::Settings};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Loads .env as well
    let settings = Settings::from_env()?;

    info!("Advisor Reference Orchestrator - API Server");
    info!("Port: {}", settings.api_port);

    let agent = Arc::new(ReferenceAgent::from_settings(&settings)?);

    info!(
        request_timeout_secs = settings.request_timeout.as_secs(),
        "Reference agent ready, starting API server"
    );

    start_server(agent, settings.request_timeout, settings.api_port).await?;

    Ok(())
}
