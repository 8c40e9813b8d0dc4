// Review module
// Product reviews, gated on a delivered purchase

pub mod error;
pub mod handlers;
pub mod models;
pub mod rating_calculator;
pub mod repository;
pub mod service;

pub use error::ReviewError;
pub use handlers::*;
pub use models::*;
pub use rating_calculator::RatingCalculator;
pub use repository::{PgReviewRepository, ReviewRepository};
pub use service::ReviewService;
