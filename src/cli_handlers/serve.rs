use crate::config::RelayConfig;
use crate::error::Result;
use crate::server::RelayServer;

pub async fn handle_serve_command(
    host: Option<String>,
    port: Option<u16>,
    heartbeat_secs: Option<u64>,
) -> Result<()> {
    let config = RelayConfig::from_env()?.with_overrides(host, port, heartbeat_secs)?;
    tracing::debug!(?config, "Resolved relay configuration");

    RelayServer::new(config).run().await?;
    Ok(())
}
