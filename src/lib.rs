// Storefront order service
// Cart, coupon, payment and order orchestration over PostgreSQL

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod coupons;
pub mod db;
pub mod error;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod reviews;
pub mod validation;

#[cfg(test)]
mod memory_store;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use addresses::{AddressBook, PgAddressBook};
use auth::TokenService;
use cart::{CartRepository, CartService, PgCartRepository};
use catalog::{CatalogRepository, PgCatalogRepository};
use config::CheckoutSettings;
use coupons::{CouponEngine, CouponRepository, PgCouponRepository};
use orders::{OrderRepository, OrderService, PgOrderRepository};
use payments::{GatewayRegistry, PaymentRepository, PaymentService, PgPaymentRepository};
use reviews::{PgReviewRepository, ReviewRepository, ReviewService};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        cart::add_to_cart_handler,
        cart::get_cart_handler,
        cart::remove_cart_item_handler,
        coupons::apply_coupon_handler,
        coupons::get_active_coupon_handler,
        coupons::release_coupon_handler,
        payments::init_payment_handler,
        payments::get_payment_handler,
        payments::confirm_payment_handler,
        orders::checkout_handler,
        orders::get_order_history_handler,
        orders::get_order_by_id_handler,
        orders::cancel_order_handler,
        orders::update_order_status_handler,
        reviews::create_review_handler,
        reviews::get_product_reviews_handler,
    ),
    components(
        schemas(
            cart::AddToCartRequest,
            cart::CartLineResponse,
            cart::CartResponse,
            coupons::ApplyCouponRequest,
            coupons::ActiveCouponResponse,
            coupons::CouponDiscount,
            coupons::CouponDiscountKind,
            payments::GatewayKind,
            payments::PaymentInfo,
            payments::PaymentInfoStatus,
            payments::InitPaymentRequest,
            payments::InitPaymentResponse,
            payments::ConfirmPaymentRequest,
            orders::CheckoutLineRequest,
            orders::CheckoutRequest,
            orders::UpdateStatusRequest,
            orders::OrderResponse,
            orders::OrderItemResponse,
            orders::OrderStatus,
            orders::PaymentStatus,
            reviews::CreateReviewRequest,
            reviews::ReviewResponse,
            reviews::ProductReviewsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "cart", description = "Shopping cart"),
        (name = "coupons", description = "Coupon reservation"),
        (name = "payments", description = "Payment initiation and status"),
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "reviews", description = "Product reviews"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Storefront Orders API",
        version = "1.0.0",
        description = "Cart, coupon, payment and order orchestration for the storefront"
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Storage backends behind every service
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub addresses: Arc<dyn AddressBook>,
    pub carts: Arc<dyn CartRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
            addresses: Arc::new(PgAddressBook::new(pool.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            coupons: Arc::new(PgCouponRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            reviews: Arc::new(PgReviewRepository::new(pool)),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cart_service: CartService,
    pub coupon_engine: CouponEngine,
    pub payment_service: PaymentService,
    pub order_service: OrderService,
    pub review_service: ReviewService,
    pub token_service: Arc<TokenService>,
}

impl AppState {
    /// Wire every service on top of the given repositories
    pub fn new(
        repos: Repositories,
        gateways: GatewayRegistry,
        checkout: CheckoutSettings,
        coupon_reservation_ttl: chrono::Duration,
        token_service: Arc<TokenService>,
    ) -> Self {
        let coupon_engine = CouponEngine::new(repos.coupons.clone(), coupon_reservation_ttl);

        Self {
            cart_service: CartService::new(repos.catalog.clone(), repos.carts.clone()),
            payment_service: PaymentService::new(
                repos.payments.clone(),
                gateways,
                checkout.currency.clone(),
            ),
            order_service: OrderService::new(
                repos.orders,
                repos.catalog.clone(),
                repos.carts,
                repos.addresses,
                repos.payments,
                coupon_engine.clone(),
                checkout,
            ),
            review_service: ReviewService::new(repos.reviews, repos.catalog),
            coupon_engine,
            token_service,
        }
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.token_service.clone()
    }
}

/// Handler for GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and tracing middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_handler))
        // Cart
        .route(
            "/api/cart",
            get(cart::get_cart_handler).post(cart::add_to_cart_handler),
        )
        .route(
            "/api/cart/:item_id",
            axum::routing::delete(cart::remove_cart_item_handler),
        )
        // Coupons
        .route("/api/coupon/apply", post(coupons::apply_coupon_handler))
        .route(
            "/api/coupon/active",
            get(coupons::get_active_coupon_handler).delete(coupons::release_coupon_handler),
        )
        // Payments; gateways call back with GET or a form POST
        .route("/api/payment/init", post(payments::init_payment_handler))
        .route(
            "/api/payment/success",
            get(payments::payment_success_handler).post(payments::payment_success_handler),
        )
        .route(
            "/api/payment/fail",
            get(payments::payment_fail_handler).post(payments::payment_fail_handler),
        )
        .route(
            "/api/payment/cancel",
            get(payments::payment_cancel_handler).post(payments::payment_cancel_handler),
        )
        .route(
            "/api/payment/:transaction_id",
            get(payments::get_payment_handler),
        )
        .route(
            "/api/payment/:transaction_id/confirm",
            post(payments::confirm_payment_handler),
        )
        // Orders
        .route("/api/checkout", post(orders::checkout_handler))
        .route("/api/orders", get(orders::get_order_history_handler))
        .route("/api/orders/:order_id", get(orders::get_order_by_id_handler))
        .route(
            "/api/orders/:order_id/cancel",
            post(orders::cancel_order_handler),
        )
        .route(
            "/api/orders/:order_id/status",
            patch(orders::update_order_status_handler),
        )
        // Reviews
        .route("/api/reviews", post(reviews::create_review_handler))
        .route(
            "/api/products/:product_id/reviews",
            get(reviews::get_product_reviews_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
