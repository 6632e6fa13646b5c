#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = iam_api::config::AppConfig::from_env()?;
    iam_observability::init(config.log_format);

    if config.authn.is_none() {
        tracing::warn!("AUTHN_SERVER not set; using in-process account store");
    }
    if config.disable_authorization {
        tracing::warn!("authorization disabled; every authenticated request is allowed");
    }

    let app = iam_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
