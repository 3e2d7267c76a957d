//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CodeforcesAdapter, PgStore, SesNotifier},
    config::{Config, ConfigError},
    error::ApiError,
    web::{
        dispatch_notifications_handler, list_contests_handler, list_subscriptions_handler,
        notification_preview_handler, save_subscriptions_handler, state::AppState, ApiDoc,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use contest_reminder_core::dispatch::DispatchEngine;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http_client = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?;
    let contests = Arc::new(CodeforcesAdapter::new(
        http_client,
        config.codeforces_api_base.clone(),
        config.contest_cache_ttl,
    ));

    let sender = config
        .ses_sender
        .clone()
        .ok_or_else(|| ConfigError::MissingVar("AWS_SES_SENDER".to_string()))?;
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.ses_region.clone()))
        .load()
        .await;
    let notifier = Arc::new(SesNotifier::new(
        aws_sdk_sesv2::Client::new(&aws_config),
        sender,
    ));

    let engine = DispatchEngine::new(store.clone(), notifier);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        contests,
        store,
        engine,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/contests", get(list_contests_handler))
        .route(
            "/users/{user_id}/subscriptions",
            get(list_subscriptions_handler).put(save_subscriptions_handler),
        )
        .route(
            "/users/{user_id}/notification-preview",
            get(notification_preview_handler),
        )
        .route(
            "/users/{user_id}/notifications/dispatch",
            post(dispatch_notifications_handler),
        )
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
