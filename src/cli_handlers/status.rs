use serde_json::json;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::relay::status::{ClientsResponse, StatusResponse};

/// Fetch `/status` and `/clients` from a running relay.
pub async fn fetch_status(base_url: &str) -> Result<serde_json::Value> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()?;

    let status: StatusResponse = client
        .get(format!("{}/status", base_url))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let clients: ClientsResponse = client
        .get(format!("{}/clients", base_url))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    tracing::debug!("Relay at {} reports {} client(s)", base_url, clients.count);

    Ok(json!({
        "url": base_url,
        "status": status.status,
        "connectedClients": status.connected_clients,
        "clients": clients.clients,
    }))
}

pub async fn handle_status_command(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = RelayConfig::from_env()?.with_overrides(host, port, None)?;
    let base_url = format!("http://{}", config.bind_addr());

    let report = fetch_status(&base_url).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
