// Catalog lookups consumed by cart, checkout and reviews.
// Catalog data is owned by catalog management; nothing here writes it.

pub mod lookup;
pub mod models;
pub mod repository;

pub use lookup::*;
pub use models::*;
pub use repository::*;
