// Coupon module
// Validation, per-user reservation and single-use enforcement

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::CouponError;
pub use handlers::*;
pub use models::*;
pub use repository::{consume_reservation, CouponRepository, PgCouponRepository};
pub use service::CouponEngine;
