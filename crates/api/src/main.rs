#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tacklebox_observability::init();

    let session_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });
    let admin_token_secret = std::env::var("ADMIN_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("ADMIN_JWT_SECRET not set; using insecure dev default");
        "dev-admin-secret".to_string()
    });
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = tacklebox_api::app::build_app(tacklebox_api::app::AppConfig {
        session_secret,
        admin_token_secret,
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
