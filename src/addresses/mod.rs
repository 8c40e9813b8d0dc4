// Saved-address lookup used by checkout.
// Orders copy the address text; they never keep a reference to this row.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedAddress {
    pub id: i32,
    pub user_id: i32,
    pub address_line: String,
    pub contact_number: String,
}

#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Fetch an address only if it belongs to the given user
    async fn find_for_user(
        &self,
        user_id: i32,
        address_id: i32,
    ) -> Result<Option<SavedAddress>, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgAddressBook {
    pool: PgPool,
}

impl PgAddressBook {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressBook for PgAddressBook {
    async fn find_for_user(
        &self,
        user_id: i32,
        address_id: i32,
    ) -> Result<Option<SavedAddress>, sqlx::Error> {
        sqlx::query_as::<_, SavedAddress>(
            "SELECT id, user_id, address_line, contact_number FROM addresses WHERE id = $1 AND user_id = $2",
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
