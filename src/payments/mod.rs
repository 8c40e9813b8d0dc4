// Payment module
// Gateway adapters, payment attempt records and callback handling

pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::PaymentError;
pub use gateway::{GatewayRegistry, HostedCheckoutGateway, OfflineGateway, PaymentGateway};
pub use handlers::*;
pub use models::*;
pub use repository::{NewPayment, PaymentRepository, PgPaymentRepository};
pub use service::PaymentService;
