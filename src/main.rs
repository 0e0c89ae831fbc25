use placeclip::{create_router, init, AppState, Config, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the application
    init()?;

    // Model and translator handles are built once and shared by every request
    let config = Config::from_env()?;
    let addr = config.bind_addr;
    let state = AppState::from_config(config)?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
