use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod chat_hub;
mod db;
mod gemini_client;
mod handlers;
mod intents;
mod mailer;
mod middleware;
mod models;
mod services;
mod utils;

// AppState holds the database connection pool, the Gemini client for the AI
// assistant, the mail client for appointment notifications, and the live chat
// room registry.
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub gemini_client: Option<gemini_client::GeminiClient>,
    pub mailer: Option<mailer::Mailer>,
    pub chat_hub: chat_hub::SharedChatHub,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // Create the database connection pool
    let db_pool = db::create_pool()
        .await
        .expect("Failed to create database pool.");

    // Initialize Gemini client if API key is provided
    let gemini_client = match std::env::var("GEMINI_API_KEY").ok() {
        Some(api_key) if !api_key.is_empty() => {
            tracing::info!("Initializing Gemini AI client...");
            Some(gemini_client::GeminiClient::new(api_key))
        }
        _ => {
            tracing::warn!("GEMINI_API_KEY not found. AI assistant features will be disabled.");
            None
        }
    };

    // Initialize the mail client if the transactional mail API is configured
    let mailer = match (
        std::env::var("MAIL_API_URL").ok(),
        std::env::var("MAIL_API_KEY").ok(),
    ) {
        (Some(api_url), Some(api_key)) => {
            let from_address = std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@mindhaven.app".to_string());
            tracing::info!("Initializing mail client...");
            Some(mailer::Mailer::new(api_url, api_key, from_address))
        }
        _ => {
            tracing::warn!("MAIL_API_URL / MAIL_API_KEY not found. Email notifications disabled.");
            None
        }
    };

    // Initialize the chat hub for the live chat relay
    let chat_hub = Arc::new(chat_hub::ChatHub::new());
    tracing::info!("Chat hub initialized");

    // Create the shared state
    let shared_state = Arc::new(AppState {
        db_pool,
        gemini_client,
        mailer,
        chat_hub,
    });

    // Build our application with all routes and shared state
    let app = Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::therapists::therapist_routes())
        .merge(handlers::appointments::appointment_routes())
        .merge(handlers::ai::ai_routes())
        .merge(handlers::chat::chat_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state.clone()));

    // Run the server with ConnectInfo to provide socket addresses for rate limiting
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .await
        .unwrap();
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,mindhaven=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,mindhaven=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for production (easier for log aggregation)
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        // Human-readable logging for development
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("MindHaven starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    let db_configured = std::env::var("DATABASE_URL").is_ok();
    let gemini_configured = std::env::var("GEMINI_API_KEY").is_ok();
    let mail_configured =
        std::env::var("MAIL_API_URL").is_ok() && std::env::var("MAIL_API_KEY").is_ok();

    tracing::info!(
        "Configuration - Database: {}, Gemini AI: {}, Mail: {}",
        if db_configured { "✅" } else { "❌" },
        if gemini_configured { "✅" } else { "❌" },
        if mail_configured { "✅" } else { "❌" }
    );

    Ok(())
}

// API Status endpoint
async fn api_status(
    Extension(state): Extension<Arc<AppState>>,
) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let gemini_status = if state.gemini_client.is_some() { "configured" } else { "not_configured" };
    let mail_status = if state.mailer.is_some() { "configured" } else { "not_configured" };

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "gemini_ai": gemini_status,
            "mail": mail_status
        },
        "features": {
            "authentication": true,
            "therapist_directory": true,
            "appointments": true,
            "websocket_chat": true,
            "ai_assistant": gemini_status == "configured",
            "rate_limiting": true
        },
        "endpoints": {
            "status": "/api/status",
            "websocket": "/ws",
            "auth": "/api/auth/*",
            "therapists": "/api/therapists/*",
            "appointments": "/api/appointments/*",
            "chat": "/api/chat/*",
            "ai": "/api/ai/*"
        }
    }))
}
