//! Creation rules, balance checks and the PENDING → APPROVED | REJECTED
//! transitions of travel requests.
//!
//! Known gaps kept on purpose: approval does not re-check the balance (two
//! pending requests can each pass the creation check against the same
//! balance, so it can go negative), and approve/reject only require the
//! MANAGER role, not that the acting manager manages the employee.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use super::Principal;
use crate::error::AppError;
use crate::model::travel_request::{NewTravelRequest, TravelDraft, TravelRequest};
use crate::store::Ledger;

pub struct LifecycleEngine {
    ledger: Arc<dyn Ledger>,
}

impl LifecycleEngine {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Submits a request for the caller. The balance is checked, not reserved.
    #[instrument(name = "create_request", skip(self, draft), fields(employee_id = principal.user_id))]
    pub async fn create_request(
        &self,
        principal: &Principal,
        draft: TravelDraft,
    ) -> Result<TravelRequest, AppError> {
        let days = draft.validate()?;

        let mut tx = self.ledger.begin().await?;
        let employee = tx
            .user_for_update(principal.user_id)
            .await?
            .ok_or(AppError::NotFound("Employee"))?;

        if employee.leaves_left < days {
            info!(
                available = employee.leaves_left,
                requested = days,
                "Insufficient leave balance"
            );
            return Err(AppError::InsufficientBalance {
                available: employee.leaves_left,
                requested: days,
            });
        }

        let request = tx
            .insert_request(NewTravelRequest {
                employee_id: employee.id,
                from_date: draft.from_date,
                to_date: draft.to_date,
                from_location: draft.from_location.trim().to_string(),
                destination: draft.destination.trim().to_string(),
                mode_of_transport: draft.mode_of_transport.trim().to_string(),
                purpose_of_travel: draft.purpose_of_travel.trim().to_string(),
                days_requested: days,
                created_at: Utc::now(),
            })
            .await?;
        tx.commit().await?;

        info!(request_id = request.id, days, "Travel request submitted");
        Ok(request)
    }

    /// Approves a pending request and deducts its days from the employee.
    #[instrument(name = "approve_request", skip(self), fields(manager_id = principal.user_id))]
    pub async fn approve(&self, request_id: u64, principal: &Principal) -> Result<TravelRequest, AppError> {
        require_manager(principal)?;

        let mut tx = self.ledger.begin().await?;
        let mut request = tx
            .request_for_update(request_id)
            .await?
            .ok_or(AppError::NotFound("Travel request"))?;

        request.approve(principal.user_id, Utc::now())?;

        // lock order is request then employee, same for every writer
        tx.user_for_update(request.employee_id)
            .await?
            .ok_or(AppError::NotFound("Employee"))?;
        let balance = tx
            .adjust_balance(request.employee_id, -request.days_requested)
            .await?;
        tx.save_decision(&request).await?;
        tx.commit().await?;

        if balance < 0 {
            warn!(
                employee_id = request.employee_id,
                balance, "Leave balance went negative after approval"
            );
        }
        info!(request_id, days = request.days_requested, balance, "Travel request approved");
        Ok(request)
    }

    /// Rejects a pending request. The balance is left untouched.
    #[instrument(name = "reject_request", skip(self, reason), fields(manager_id = principal.user_id))]
    pub async fn reject(
        &self,
        request_id: u64,
        principal: &Principal,
        reason: &str,
    ) -> Result<TravelRequest, AppError> {
        require_manager(principal)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::ValidationFailed("Rejection reason is required".into()));
        }

        let mut tx = self.ledger.begin().await?;
        let mut request = tx
            .request_for_update(request_id)
            .await?
            .ok_or(AppError::NotFound("Travel request"))?;

        request.reject(principal.user_id, reason, Utc::now())?;
        tx.save_decision(&request).await?;
        tx.commit().await?;

        info!(request_id, "Travel request rejected");
        Ok(request)
    }
}

fn require_manager(principal: &Principal) -> Result<(), AppError> {
    if principal.role.is_manager() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Manager only"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        role::Role,
        travel_request::TravelStatus,
        user::{NewUser, User},
    };
    use crate::store::memory::MemoryLedger;
    use chrono::NaiveDate;

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        engine: LifecycleEngine,
        manager: Principal,
    }

    impl Fixture {
        async fn new() -> Self {
            let ledger = Arc::new(MemoryLedger::new());
            let engine = LifecycleEngine::new(ledger.clone());
            let boss = insert_user(&ledger, "boss@gmail.com", Role::Manager, None, 30).await;
            Self {
                ledger,
                engine,
                manager: Principal {
                    user_id: boss.id,
                    role: Role::Manager,
                },
            }
        }

        async fn employee(&self, email: &str, leaves_left: i32) -> Principal {
            let user = insert_user(
                &self.ledger,
                email,
                Role::Employee,
                Some(self.manager.user_id),
                leaves_left,
            )
            .await;
            Principal {
                user_id: user.id,
                role: Role::Employee,
            }
        }

        async fn balance(&self, principal: &Principal) -> i32 {
            self.ledger
                .user_by_id(principal.user_id)
                .await
                .unwrap()
                .unwrap()
                .leaves_left
        }
    }

    async fn insert_user(
        ledger: &MemoryLedger,
        email: &str,
        role: Role,
        manager_id: Option<u64>,
        leaves_left: i32,
    ) -> User {
        let mut tx = ledger.begin().await.unwrap();
        let user = tx
            .insert_user(NewUser {
                first_name: "Test".into(),
                last_name: "User".into(),
                email: email.into(),
                password_hash: "hash".into(),
                role,
                manager_id,
                leaves_left,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user
    }

    fn draft(from: (i32, u32, u32), to: (i32, u32, u32)) -> TravelDraft {
        TravelDraft {
            from_date: NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            to_date: NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap(),
            from_location: "Dhaka".into(),
            destination: "Chittagong".into(),
            mode_of_transport: "Train".into(),
            purpose_of_travel: "Client workshop".into(),
        }
    }

    #[actix_web::test]
    async fn submit_then_approve_deducts_exact_days() {
        let fx = Fixture::new().await;
        let alice = fx.employee("alice@gmail.com", 30).await;

        let request = fx
            .engine
            .create_request(&alice, draft((2024, 1, 1), (2024, 1, 5)))
            .await
            .unwrap();
        assert_eq!(request.status, TravelStatus::Pending);
        assert_eq!(request.days_requested, 5);
        assert_eq!(fx.balance(&alice).await, 30);

        let approved = fx.engine.approve(request.id, &fx.manager).await.unwrap();
        assert_eq!(approved.status, TravelStatus::Approved);
        assert_eq!(approved.approved_by, Some(fx.manager.user_id));
        assert!(approved.approved_at.unwrap() >= approved.created_at);
        assert_eq!(fx.balance(&alice).await, 25);
    }

    #[actix_web::test]
    async fn insufficient_balance_persists_nothing() {
        let fx = Fixture::new().await;
        let bob = fx.employee("bob@gmail.com", 2).await;

        let result = fx
            .engine
            .create_request(&bob, draft((2024, 1, 1), (2024, 1, 5)))
            .await;
        assert!(matches!(
            result,
            Err(AppError::InsufficientBalance {
                available: 2,
                requested: 5
            })
        ));
        assert!(fx.ledger.requests_by_employee(bob.user_id).await.unwrap().is_empty());
        assert_eq!(fx.balance(&bob).await, 2);
    }

    #[actix_web::test]
    async fn exact_balance_is_enough() {
        let fx = Fixture::new().await;
        let carol = fx.employee("carol@gmail.com", 3).await;

        let request = fx
            .engine
            .create_request(&carol, draft((2024, 3, 1), (2024, 3, 3)))
            .await
            .unwrap();
        fx.engine.approve(request.id, &fx.manager).await.unwrap();
        assert_eq!(fx.balance(&carol).await, 0);
    }

    #[actix_web::test]
    async fn reversed_dates_are_rejected() {
        let fx = Fixture::new().await;
        let alice = fx.employee("alice@gmail.com", 30).await;

        let result = fx
            .engine
            .create_request(&alice, draft((2024, 1, 5), (2024, 1, 1)))
            .await;
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[actix_web::test]
    async fn unknown_employee_is_not_found() {
        let fx = Fixture::new().await;
        let ghost = Principal {
            user_id: 404,
            role: Role::Employee,
        };
        let result = fx
            .engine
            .create_request(&ghost, draft((2024, 1, 1), (2024, 1, 1)))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn decided_requests_cannot_be_decided_again() {
        let fx = Fixture::new().await;
        let alice = fx.employee("alice@gmail.com", 30).await;
        let request = fx
            .engine
            .create_request(&alice, draft((2024, 1, 1), (2024, 1, 2)))
            .await
            .unwrap();

        fx.engine.approve(request.id, &fx.manager).await.unwrap();
        let stored = fx.ledger.request_by_id(request.id).await.unwrap();

        assert!(matches!(
            fx.engine.approve(request.id, &fx.manager).await,
            Err(AppError::AlreadyProcessed)
        ));
        assert!(matches!(
            fx.engine.reject(request.id, &fx.manager, "too late").await,
            Err(AppError::AlreadyProcessed)
        ));
        assert_eq!(fx.ledger.request_by_id(request.id).await.unwrap(), stored);
        assert_eq!(fx.balance(&alice).await, 28);
    }

    #[actix_web::test]
    async fn reject_keeps_balance_and_needs_reason() {
        let fx = Fixture::new().await;
        let alice = fx.employee("alice@gmail.com", 30).await;
        let request = fx
            .engine
            .create_request(&alice, draft((2024, 1, 1), (2024, 1, 10)))
            .await
            .unwrap();

        assert!(matches!(
            fx.engine.reject(request.id, &fx.manager, "   ").await,
            Err(AppError::ValidationFailed(_))
        ));

        let rejected = fx
            .engine
            .reject(request.id, &fx.manager, " Budget freeze ")
            .await
            .unwrap();
        assert_eq!(rejected.status, TravelStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Budget freeze"));
        assert_eq!(fx.balance(&alice).await, 30);
    }

    #[actix_web::test]
    async fn missing_request_is_not_found() {
        let fx = Fixture::new().await;
        assert!(matches!(
            fx.engine.approve(77, &fx.manager).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            fx.engine.reject(77, &fx.manager, "nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn employees_cannot_decide() {
        let fx = Fixture::new().await;
        let alice = fx.employee("alice@gmail.com", 30).await;
        let request = fx
            .engine
            .create_request(&alice, draft((2024, 1, 1), (2024, 1, 1)))
            .await
            .unwrap();

        assert!(matches!(
            fx.engine.approve(request.id, &alice).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[actix_web::test]
    async fn double_booking_can_overdraw_on_approval() {
        let fx = Fixture::new().await;
        let dave = fx.employee("dave@gmail.com", 5).await;

        let first = fx
            .engine
            .create_request(&dave, draft((2024, 5, 1), (2024, 5, 4)))
            .await
            .unwrap();
        let second = fx
            .engine
            .create_request(&dave, draft((2024, 6, 1), (2024, 6, 4)))
            .await
            .unwrap();

        fx.engine.approve(first.id, &fx.manager).await.unwrap();
        fx.engine.approve(second.id, &fx.manager).await.unwrap();
        assert_eq!(fx.balance(&dave).await, -3);
    }

    #[actix_web::test]
    async fn concurrent_approvals_do_not_lose_updates() {
        let fx = Fixture::new().await;
        let erin = fx.employee("erin@gmail.com", 30).await;

        let mut ids = Vec::new();
        for day in 1..=5 {
            let request = fx
                .engine
                .create_request(&erin, draft((2024, 7, day), (2024, 7, day)))
                .await
                .unwrap();
            ids.push(request.id);
        }

        let results =
            futures::future::join_all(ids.iter().map(|id| fx.engine.approve(*id, &fx.manager))).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(fx.balance(&erin).await, 25);
    }
}
