use anyhow::Context;
use gatehouse::{cli::config_path_from_args, config::Config, logging::init_tracing, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging = init_tracing(&config.logging).context("failed to initialize logging")?;
    tracing::info!(
        target: "server",
        run_id = logging.run_id(),
        config = %config_path.display(),
        "gatehouse_starting"
    );

    server::run(config).await
}
