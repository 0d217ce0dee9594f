use haulbase::{info, rest, storage, AppConfig, AppError, Entities, RequestState};
use std::path::PathBuf;
use tokio::sync::watch;
use tower_http::cors;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::new("config/settings").expect("Failed to load app config");
    let socket_addr = config.http.bind_address()?;

    let store = storage::open(&config.store)?;
    let state = RequestState::new(Entities::new(store));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_tx.send(true).ok();
        }
    });

    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    info!("Starting http server at {}", socket_addr);
    rest::serve(state, socket_addr, PathBuf::from(&config.http.static_dir), Some(cors_layer), shutdown_rx).await
}
