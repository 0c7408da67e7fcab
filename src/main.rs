//! Perpustakaan Server - School Library Circulation
//!
//! REST API server for the school library.

use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perpustakaan_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{clock::SystemClock, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    tracing::info!("Starting Perpustakaan Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    tracing::info!(
        loan_period_days = config.circulation.loan_period_days,
        self_return = ?config.circulation.self_return,
        "Circulation policy loaded"
    );

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool.clone());
    let services = Services::new(
        repository,
        config.circulation.clone(),
        Arc::new(SystemClock),
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        pool,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global subscriber; RUST_LOG overrides the configured level
fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("perpustakaan_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Books (catalog)
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        .route("/books/:id/stock-movements", get(api::books::list_stock_movements))
        // Users
        .route("/users", get(api::users::list_users).post(api::users::create_user))
        .route("/users/me", get(api::users::me))
        .route(
            "/users/:id",
            get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .route("/users/:id/active", put(api::users::set_active))
        // Cart
        .route("/cart", get(api::cart::list_cart))
        .route("/cart/items", post(api::cart::add_to_cart))
        .route("/cart/items/:book_id", delete(api::cart::remove_from_cart))
        .route("/cart/checkout", post(api::cart::checkout))
        // Loans
        .route("/loans", get(api::loans::list_loans).post(api::loans::create_loan))
        .route("/loans/self", post(api::loans::self_borrow))
        .route("/loans/mine", get(api::loans::my_loans))
        .route("/loans/due-soon", get(api::loans::due_soon))
        .route("/loans/overdue", get(api::loans::overdue_loans))
        .route("/loans/:id", get(api::loans::get_loan))
        .route("/loans/:id/return", post(api::loans::return_loan))
        .route("/loans/:id/self-return", post(api::loans::self_return))
        .route("/loans/:id/confirm", post(api::loans::confirm_return))
        .route("/loans/:id/rating", post(api::loans::rate_loan))
        // Reports
        .route("/reports/summary", get(api::reports::summary))
        .route("/reports/most-borrowed", get(api::reports::most_borrowed))
        .route("/reports/late-students", get(api::reports::late_students))
        .route("/reports/top-rated", get(api::reports::top_rated))
        .route("/reports/loans", get(api::reports::loans_per_period))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
