use anyhow::Context;
use tnt_registry::config::{LogFormat, RegistryConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RegistryConfig::from_env();
    init_tracing(&config)?;

    tnt_registry::server::run(config).await
}

fn init_tracing(config: &RegistryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid TNT_REGISTRY_LOG_FILTER `{}`", config.log_filter))?;

    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    Ok(())
}
