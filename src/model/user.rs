use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::role::Role;

/// Leave balance granted to every new account.
pub const DEFAULT_LEAVES: i32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub manager_id: Option<u64>,
    pub leaves_left: i32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A user row before the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    /// Already trimmed and lower-cased.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub manager_id: Option<u64>,
    pub leaves_left: i32,
}

/// Public view of an account, never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "firstName": "John",
    "lastName": "Manager",
    "email": "manager@gmail.com",
    "role": "MANAGER",
    "managerId": null,
    "leavesLeft": 30
}))]
pub struct UserSummary {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<u64>,
    pub leaves_left: i32,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            manager_id: user.manager_id,
            leaves_left: user.leaves_left,
        }
    }
}
