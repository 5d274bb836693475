use crewdesk_services::Node;
use crewdesk_shared::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewdesk_node=info,crewdesk_services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bus_timeout_ms = config.bus.call_timeout.as_millis() as u64,
        sweep_interval_s = config.tokens.sweep_interval.as_secs(),
        "starting crewdesk node"
    );

    let node = Node::new(config);
    let sweep = node.start_token_sweep();

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    node.shutdown().await;
    sweep.await?;
    Ok(())
}
