use tracing::info;
use tracing_subscriber::EnvFilter;

use page_summary::config::Config;
use page_summary::server::{self, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // JSON logs in production, human-readable otherwise.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("page_summary=info,tower_http=info"));

    if std::env::var("APP_ENV").as_deref() == Ok("production") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env();
    let app = server::router(AppState::new(config.http));

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .expect("Failed to bind to address");

    info!("Summary server listening on http://{}", config.addr);

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
