//! Persistence port for users and travel requests.
//!
//! Reads go straight through [`Ledger`]. Every write happens inside a
//! [`LedgerTx`]: rows fetched with the `*_for_update` methods stay locked
//! until the transaction is committed or dropped, and dropping without
//! [`LedgerTx::commit`] discards all staged writes.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use derive_more::Display;
use futures::stream::BoxStream;

use crate::model::{
    role::Role,
    travel_request::{NewTravelRequest, TravelRequest, TravelStatus},
    user::{NewUser, User},
};

#[derive(Debug, Display)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[display(fmt = "duplicate key")]
    Duplicate,
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    /// A stored value could not be mapped back into the domain.
    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;

    async fn user_by_id(&self, id: u64) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Every registered address, streamed row by row.
    fn emails(&self) -> BoxStream<'_, StoreResult<String>>;
    async fn count_by_role(&self, role: Role) -> StoreResult<u64>;

    async fn request_by_id(&self, id: u64) -> StoreResult<Option<TravelRequest>>;
    async fn requests_by_employee(&self, employee_id: u64) -> StoreResult<Vec<TravelRequest>>;
    /// Requests whose employee reports to `manager_id`.
    async fn requests_by_manager(
        &self,
        manager_id: u64,
        status: Option<TravelStatus>,
    ) -> StoreResult<Vec<TravelRequest>>;
    async fn all_requests(&self, status: Option<TravelStatus>) -> StoreResult<Vec<TravelRequest>>;
}

#[async_trait]
pub trait LedgerTx: Send {
    async fn user_for_update(&mut self, id: u64) -> StoreResult<Option<User>>;
    async fn request_for_update(&mut self, id: u64) -> StoreResult<Option<TravelRequest>>;
    /// Counts users with `role`. Serialized against other transactions doing
    /// the same, so a zero count stays zero until this one commits.
    async fn count_by_role(&mut self, role: Role) -> StoreResult<u64>;

    async fn insert_user(&mut self, user: NewUser) -> StoreResult<User>;
    async fn insert_request(&mut self, request: NewTravelRequest) -> StoreResult<TravelRequest>;
    /// Persists the status/decision columns of an existing request.
    async fn save_decision(&mut self, request: &TravelRequest) -> StoreResult<()>;
    /// Adds `delta` to the user's balance and returns the new value.
    async fn adjust_balance(&mut self, user_id: u64, delta: i32) -> StoreResult<i32>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
