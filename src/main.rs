mod config;
mod dto;
mod handlers;
mod mailer;
mod service;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use std::sync::Arc;

use config::Config;
use handlers::rest;
use mailer::SmtpMailer;
use service::DeliveryService;

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {e}");
        panic!("failed to load config: {e}");
    });
    tracing::info!("Successfully loaded ebook service config");

    report_startup_state(&cfg);

    // Setup service
    let port = cfg.port;
    let mailer = Arc::new(SmtpMailer::new(&cfg));
    let service = Arc::new(DeliveryService::new(cfg, mailer));

    // Start server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("Failed to bind to address");
    let addr = listener
        .local_addr()
        .expect("Failed to read listener address");

    tracing::info!("Ebook service starting, listening on {}", addr);

    axum::serve(listener, router(service))
        .await
        .expect("Failed to start server");
}

fn router(service: Arc<DeliveryService>) -> Router {
    Router::new()
        .route("/", get(rest::health_check))
        .route("/send-ebook", post(rest::send_ebook))
        .route("/api-doc/openapi.json", get(rest::openapi_json))
        .with_state(service)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Missing pieces are reported but never stop the process; requests fail instead.
fn report_startup_state(cfg: &Config) {
    if cfg.ebook_path.exists() {
        tracing::info!("Found ebook: {}", cfg.ebook_path.display());
    } else {
        tracing::error!(
            "CRITICAL: ebook file '{}' not found, every request will fail until it is in place",
            cfg.ebook_path.display()
        );
    }

    match cfg.sender_credentials() {
        Some(credentials) => tracing::info!("Sender email configured: {}", credentials.address),
        None => tracing::warn!(
            "SENDER_EMAIL or SENDER_PASSWORD not set, email sending will fail. \
             Set them in a .env file or in the environment"
        ),
    }
}
