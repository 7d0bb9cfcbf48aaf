use std::net::SocketAddr;
use std::sync::Arc;

use axum::serve;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use url_shortener::audit::{AuditLevel, AuditLogger, Component};
use url_shortener::routes::{create_router, AppState};
use url_shortener::store::UrlStore;
use url_shortener::utils::get_env_or;

const DEFAULT_TRACING_LEVEL: &str = "url_shortener=debug";
const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[tokio::main]
async fn main() {
    _ = dotenv();
    configure_tracing();
    let audit = AuditLogger::from_env();
    audit.emit(
        AuditLevel::Info,
        Component::Service,
        "URL shortener service starting up",
    );

    let base_url = get_env_or("BASE_URL", DEFAULT_BASE_URL);
    audit.emit(
        AuditLevel::Info,
        Component::Config,
        format!("Short links served under base URL: {}", base_url),
    );
    let state = AppState {
        store: Arc::new(UrlStore::new(audit.clone())),
        audit,
        base_url,
    };
    let listener = create_listener(&get_env_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)).await;
    let router = create_router(state);
    serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server failed to start");
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_listener(server_address: &str) -> TcpListener {
    let listener = TcpListener::bind(server_address)
        .await
        .expect("Creating tcp listener failed");
    tracing::info!("Listening on address: {}", server_address);
    listener
}
