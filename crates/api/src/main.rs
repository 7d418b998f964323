use anyhow::Result;
use lectern_api::build_app_with_config;
use lectern_core::LecternConfig;
use lectern_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("lectern_api");

    let config = LecternConfig::from_env()?;
    let bind = config.bind.clone();

    let app = build_app_with_config(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "lectern api started");

    axum::serve(listener, app).await?;
    Ok(())
}
