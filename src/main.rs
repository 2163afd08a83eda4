use citrine::config::AppConfig;
use citrine::{db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = AppConfig::load().expect("Failed to load config.toml");

    let pool = db::setup_database(&settings).await?;
    let state = AppState::new(pool, settings.clone());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    log::info!("listening on {}", settings.server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
