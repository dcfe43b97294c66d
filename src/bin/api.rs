use bank_agent_orchestrator::{
    api::{start_server, SessionRegistry},
    AgentServices, AppConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("Bank Agent Orchestrator - API Server");
    info!(port = config.port, directory = %config.client_directory_path.display(), "Configuration loaded");

    let services = AgentServices::from_config(&config).await?;
    let registry = Arc::new(SessionRegistry::new(services));

    info!("Session registry initialized");

    start_server(registry, config.port).await?;

    Ok(())
}
