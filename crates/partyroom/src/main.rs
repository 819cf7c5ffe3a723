use partyroom::{PartyroomError, PartyroomServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PartyroomError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        max_players = config.registry.max_players,
        idle_timeout = ?config.idle_timeout,
        "starting partyroom"
    );

    let server = PartyroomServer::builder().config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening for websocket connections");

    server.run().await
}
