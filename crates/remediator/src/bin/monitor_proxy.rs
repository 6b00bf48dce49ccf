use sre_remediator::{config::Config, server::ProxyServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?.proxy;
    info!(
        prometheus = %config.prometheus_url,
        grafana = %config.grafana_url,
        rules_file = %config.rules_file.display(),
        "Starting monitor proxy"
    );

    let addr = config.addr.clone();
    ProxyServer::new(config)?.start(&addr).await?;
    Ok(())
}
