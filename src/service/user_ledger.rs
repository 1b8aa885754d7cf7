use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::Principal;
use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::model::{
    role::Role,
    user::{DEFAULT_LEAVES, NewUser, User},
};
use crate::models::{SignupRequest, normalize_email};
use crate::store::Ledger;
use crate::utils::email_registry::EmailRegistry;

/// Accounts, roles, manager links and leave balances.
pub struct UserLedger {
    ledger: Arc<dyn Ledger>,
    emails: Arc<EmailRegistry>,
}

/// Registration gate applied inside the insert transaction.
enum Gate {
    /// Only while no manager exists; always yields a manager.
    FirstManager,
    /// Role as requested, employees linked to the given manager.
    ByManager(u64),
}

impl UserLedger {
    pub fn new(ledger: Arc<dyn Ledger>, emails: Arc<EmailRegistry>) -> Self {
        Self { ledger, emails }
    }

    /// Unauthenticated bootstrap path: open until the first manager exists.
    #[instrument(name = "register_public", skip_all, fields(email = %signup.email))]
    pub async fn register_public(&self, signup: &SignupRequest) -> Result<User, AppError> {
        if self.ledger.count_by_role(Role::Manager).await? > 0 {
            warn!("Public registration attempted after a manager exists");
            return Err(AppError::RegistrationClosed);
        }
        let requested = signup.validate()?;
        if requested != Role::Manager {
            info!(requested = %requested, "Public signup always creates a manager");
        }
        self.register(signup, Role::Manager, Gate::FirstManager).await
    }

    /// Privileged path: a manager creates an employee who reports to them, or
    /// another manager.
    #[instrument(name = "register_by_manager", skip_all, fields(manager_id = principal.user_id, email = %signup.email))]
    pub async fn register_by_manager(
        &self,
        principal: &Principal,
        signup: &SignupRequest,
    ) -> Result<User, AppError> {
        if !principal.role.is_manager() {
            return Err(AppError::Forbidden("Manager only"));
        }
        let role = signup.validate()?;
        self.register(signup, role, Gate::ByManager(principal.user_id)).await
    }

    async fn register(&self, signup: &SignupRequest, role: Role, gate: Gate) -> Result<User, AppError> {
        let email = normalize_email(&signup.email);

        if !self.emails.is_available(&email, &*self.ledger).await? {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = hash_password(&signup.password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AppError::Internal
        })?;

        let manager_id = match (&gate, role) {
            (Gate::ByManager(manager_id), Role::Employee) => Some(*manager_id),
            _ => None,
        };

        let mut tx = self.ledger.begin().await?;

        // re-checked under lock: two concurrent first signups must not both pass
        if matches!(gate, Gate::FirstManager) && tx.count_by_role(Role::Manager).await? > 0 {
            return Err(AppError::RegistrationClosed);
        }

        let user = tx
            .insert_user(NewUser {
                first_name: signup.first_name.trim().to_string(),
                last_name: signup.last_name.trim().to_string(),
                email,
                password_hash,
                role,
                manager_id,
                leaves_left: DEFAULT_LEAVES,
            })
            .await?;
        tx.commit().await?;

        self.emails.mark_taken(&user.email).await;
        info!(user_id = user.id, name = %user.display_name(), role = %user.role, "User registered");
        Ok(user)
    }

    #[instrument(name = "authenticate", skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.find_by_email(email).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::UserNotFound,
            other => other,
        })?;

        verify_password(password, &user.password_hash).map_err(|e| {
            info!(error = %e, "Invalid credentials: password mismatch");
            AppError::InvalidCredentials
        })?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<User, AppError> {
        self.ledger
            .user_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, AppError> {
        self.ledger
            .user_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Remaining leave days of `user_id`, visible to the owner and to managers.
    pub async fn leave_balance(&self, principal: &Principal, user_id: u64) -> Result<i32, AppError> {
        if !can_view_balance(principal, user_id) {
            return Err(AppError::Forbidden("You can only view your own leave balance"));
        }
        Ok(self.find_by_id(user_id).await?.leaves_left)
    }
}

pub fn can_view_balance(principal: &Principal, user_id: u64) -> bool {
    principal.user_id == user_id || principal.role.is_manager()
}
