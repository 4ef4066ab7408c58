use carewait::engine::{Engine, ForecastSettings};
use carewait::store::LocalStore;
use carewait::{api, config};
use std::net::SocketAddr;
use std::sync::Arc;

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_target(false).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        "carewait starting"
    );
    let config = config::load_default()?;

    let data_dir = config.data_dir();
    tracing::info!(path = %data_dir.display(), "using local blob storage");
    let store = LocalStore::new(data_dir)?;

    let settings = ForecastSettings {
        default_wait: config.default_wait_minutes(),
        history_cap: config.history_cap(),
    };
    let engine = Arc::new(Engine::new(Box::new(store), settings));

    let app = api::router(Arc::clone(&engine));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
