// Authentication module
// Validates JWT access tokens issued by the identity service

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{AdminUser, AuthenticatedUser, MaybeUser};
pub use models::Role;
pub use token::{Claims, TokenService};
