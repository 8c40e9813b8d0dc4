// Cart module
// Per-user cart lines keyed by (product, variation)

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::CartError;
pub use handlers::*;
pub use models::*;
pub use repository::{clear_cart, CartRepository, PgCartRepository};
pub use service::CartService;
