use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::debug;

use super::{Ledger, LedgerTx, StoreError, StoreResult};
use crate::model::{
    role::Role,
    travel_request::{NewTravelRequest, TravelRequest, TravelStatus},
    user::{NewUser, User},
};

const USER_COLUMNS: &str = r#"
    id, first_name, last_name, email, password_hash, role, manager_id, leaves_left, created_at
"#;

const REQUEST_COLUMNS: &str = r#"
    tr.id, tr.employee_id, tr.from_date, tr.to_date, tr.from_location, tr.destination,
    tr.mode_of_transport, tr.purpose_of_travel, tr.status, tr.days_requested,
    tr.approved_by, tr.approved_at, tr.rejection_reason, tr.created_at, tr.updated_at
"#;

#[derive(FromRow)]
struct UserRow {
    id: u64,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    manager_id: Option<u64>,
    leaves_left: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| StoreError::Corrupt(format!("unknown role '{}' for user {}", row.role, row.id)))?;
        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            manager_id: row.manager_id,
            leaves_left: row.leaves_left,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    from_date: NaiveDate,
    to_date: NaiveDate,
    from_location: String,
    destination: String,
    mode_of_transport: String,
    purpose_of_travel: String,
    status: String,
    days_requested: i32,
    approved_by: Option<u64>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for TravelRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let status = TravelStatus::from_str(&row.status).map_err(|_| {
            StoreError::Corrupt(format!("unknown status '{}' for travel request {}", row.status, row.id))
        })?;
        Ok(TravelRequest {
            id: row.id,
            employee_id: row.employee_id,
            from_date: row.from_date,
            to_date: row.to_date,
            from_location: row.from_location,
            destination: row.destination,
            mode_of_transport: row.mode_of_transport,
            purpose_of_travel: row.purpose_of_travel,
            status,
            days_requested: row.days_requested,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_requests(rows: Vec<RequestRow>) -> StoreResult<Vec<TravelRequest>> {
    rows.into_iter().map(TravelRequest::try_from).collect()
}

/// `SELECT` over travel requests, optionally joined to the employee row as `e`.
/// Clauses are ANDed in order and must use `?` placeholders.
fn requests_sql(join_users: bool, clauses: &[&str]) -> String {
    let mut where_sql = String::from(" WHERE 1=1");
    for clause in clauses {
        where_sql.push_str(" AND ");
        where_sql.push_str(clause);
    }

    let join_sql = if join_users {
        " JOIN users e ON e.id = tr.employee_id"
    } else {
        ""
    };

    format!("SELECT {REQUEST_COLUMNS} FROM travel_requests tr{join_sql}{where_sql} ORDER BY tr.id")
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(&'static str),
}

/// MySQL-backed ledger. Expects the schema from `migrations/`.
#[derive(Clone)]
pub struct MySqlLedger {
    pool: MySqlPool,
}

impl MySqlLedger {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_requests(
        &self,
        join_users: bool,
        conditions: Vec<(&'static str, FilterValue)>,
    ) -> StoreResult<Vec<TravelRequest>> {
        let clauses: Vec<&str> = conditions.iter().map(|(clause, _)| *clause).collect();
        let sql = requests_sql(join_users, &clauses);
        debug!(sql = %sql, "Fetching travel requests");

        let mut query = sqlx::query_as::<_, RequestRow>(&sql);
        for (_, value) in conditions {
            query = match value {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        into_requests(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl Ledger for MySqlLedger {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTx { tx }))
    }

    async fn user_by_id(&self, id: u64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    fn emails(&self) -> BoxStream<'_, StoreResult<String>> {
        sqlx::query_scalar::<_, String>("SELECT email FROM users")
            .fetch(&self.pool)
            .map(|row| row.map_err(StoreError::from))
            .boxed()
    }

    async fn count_by_role(&self, role: Role) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_ref())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn request_by_id(&self, id: u64) -> StoreResult<Option<TravelRequest>> {
        let mut found = self
            .fetch_requests(false, vec![("tr.id = ?", FilterValue::U64(id))])
            .await?;
        Ok(found.pop())
    }

    async fn requests_by_employee(&self, employee_id: u64) -> StoreResult<Vec<TravelRequest>> {
        self.fetch_requests(false, vec![("tr.employee_id = ?", FilterValue::U64(employee_id))])
            .await
    }

    async fn requests_by_manager(
        &self,
        manager_id: u64,
        status: Option<TravelStatus>,
    ) -> StoreResult<Vec<TravelRequest>> {
        let mut conditions = vec![("e.manager_id = ?", FilterValue::U64(manager_id))];
        if let Some(status) = status {
            conditions.push(("tr.status = ?", FilterValue::Str(status.into())));
        }
        self.fetch_requests(true, conditions).await
    }

    async fn all_requests(&self, status: Option<TravelStatus>) -> StoreResult<Vec<TravelRequest>> {
        let conditions = status
            .map(|s| vec![("tr.status = ?", FilterValue::Str(s.into()))])
            .unwrap_or_default();
        self.fetch_requests(false, conditions).await
    }
}

struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl LedgerTx for MySqlTx {
    async fn user_for_update(&mut self, id: u64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? FOR UPDATE");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn request_for_update(&mut self, id: u64) -> StoreResult<Option<TravelRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM travel_requests tr WHERE tr.id = ? FOR UPDATE");
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(TravelRequest::try_from)
            .transpose()
    }

    async fn count_by_role(&mut self, role: Role) -> StoreResult<u64> {
        // queue on the gate row; held until commit or rollback
        sqlx::query_scalar::<_, u8>("SELECT id FROM registration_gate WHERE id = 1 FOR UPDATE")
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::Corrupt("registration_gate row missing".into()))?;

        // locking read sees rows committed while we waited, whatever the isolation level
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ? LOCK IN SHARE MODE")
            .bind(role.as_ref())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_user(&mut self, user: NewUser) -> StoreResult<User> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (first_name, last_name, email, password_hash, role, manager_id, leaves_left, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .bind(user.manager_id)
        .bind(user.leaves_left)
        .bind(created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(User {
            id: result.last_insert_id(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            manager_id: user.manager_id,
            leaves_left: user.leaves_left,
            created_at,
        })
    }

    async fn insert_request(&mut self, request: NewTravelRequest) -> StoreResult<TravelRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO travel_requests
                (employee_id, from_date, to_date, from_location, destination, mode_of_transport,
                 purpose_of_travel, status, days_requested, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.from_date)
        .bind(request.to_date)
        .bind(&request.from_location)
        .bind(&request.destination)
        .bind(&request.mode_of_transport)
        .bind(&request.purpose_of_travel)
        .bind(TravelStatus::Pending.as_ref())
        .bind(request.days_requested)
        .bind(request.created_at)
        .bind(request.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(TravelRequest::from_new(result.last_insert_id(), request))
    }

    async fn save_decision(&mut self, request: &TravelRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE travel_requests
            SET status = ?, approved_by = ?, approved_at = ?, rejection_reason = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(request.status.as_ref())
        .bind(request.approved_by)
        .bind(request.approved_at)
        .bind(&request.rejection_reason)
        .bind(request.updated_at)
        .bind(request.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn adjust_balance(&mut self, user_id: u64, delta: i32) -> StoreResult<i32> {
        sqlx::query("UPDATE users SET leaves_left = leaves_left + ? WHERE id = ?")
            .bind(delta)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        let balance = sqlx::query_scalar::<_, i32>("SELECT leaves_left FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        balance.ok_or_else(|| StoreError::Corrupt(format!("user {user_id} vanished")))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
