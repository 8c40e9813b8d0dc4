use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use storefront_orders::{
    auth::TokenService,
    config::AppConfig,
    create_router, db,
    payments::{GatewayRegistry, HostedCheckoutGateway},
    AppState, Repositories,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Storefront Orders API - Starting...");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|e| format!("Invalid configuration: {}", e))?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url)
        .await
        .map_err(|e| format!("Failed to create database pool: {}", e))?;

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| format!("Failed to run database migrations: {}", e))?;
    tracing::info!("Migrations completed successfully");

    let mut gateways = GatewayRegistry::offline();
    match config.hosted_gateway.clone() {
        Some(hosted) => {
            let gateway =
                HostedCheckoutGateway::new(hosted, &config.public_base_url, config.gateway_timeout)
                    .map_err(|e| format!("Failed to build hosted gateway client: {}", e))?;
            gateways = gateways.with(Arc::new(gateway));
            tracing::info!("Hosted payment gateway enabled");
        }
        None => tracing::info!("Hosted payment gateway not configured; offline gateways only"),
    }

    let state = AppState::new(
        Repositories::postgres(pool),
        gateways,
        config.checkout.clone(),
        config.coupon_reservation_ttl,
        Arc::new(TokenService::new(config.jwt_secret.clone())),
    );
    let app = create_router(state);

    // Start the Axum server
    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("Storefront Orders API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))
}
