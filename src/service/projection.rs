use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::{
    travel_request::{TravelRequest, TravelStatus},
    user::User,
};
use crate::store::{Ledger, StoreError};

/// A travel request joined with its employee and the employee's manager.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TravelRequestView {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 2)]
    pub employee_id: u64,
    #[schema(example = "Alice")]
    pub employee_first_name: String,
    #[schema(example = "Johnson")]
    pub employee_last_name: String,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2024-01-05", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    pub from_location: String,
    pub destination: String,
    pub mode_of_transport: String,
    pub purpose_of_travel: String,
    pub status: TravelStatus,
    #[schema(example = 5)]
    pub days_requested: i32,
    /// Balance at the time of the query, not at submission.
    #[schema(example = 25)]
    pub employee_leaves_left: i32,
    pub manager_first_name: Option<String>,
    /// Manager's login email.
    pub manager_username: Option<String>,
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl TravelRequestView {
    fn compose(request: TravelRequest, employee: &User, manager: Option<&User>) -> Self {
        Self {
            id: request.id,
            employee_id: request.employee_id,
            employee_first_name: employee.first_name.clone(),
            employee_last_name: employee.last_name.clone(),
            from_date: request.from_date,
            to_date: request.to_date,
            from_location: request.from_location,
            destination: request.destination,
            mode_of_transport: request.mode_of_transport,
            purpose_of_travel: request.purpose_of_travel,
            status: request.status,
            days_requested: request.days_requested,
            employee_leaves_left: employee.leaves_left,
            manager_first_name: manager.map(|m| m.first_name.clone()),
            manager_username: manager.map(|m| m.email.clone()),
            approved_by: request.approved_by,
            approved_at: request.approved_at,
            rejection_reason: request.rejection_reason,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Read-only views over the store. Users are loaded per call and never
/// cached across calls, so balances are always current.
pub struct Projections {
    ledger: Arc<dyn Ledger>,
}

impl Projections {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn get_by_id(&self, id: u64) -> Result<TravelRequestView, AppError> {
        let request = self
            .ledger
            .request_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Travel request"))?;
        self.view(request).await
    }

    pub async fn list_by_employee(&self, employee_id: u64) -> Result<Vec<TravelRequestView>, AppError> {
        let requests = self.ledger.requests_by_employee(employee_id).await?;
        self.view_all(requests).await
    }

    /// Requests of every employee reporting to `manager_id`.
    pub async fn list_by_manager(
        &self,
        manager_id: u64,
        status: Option<TravelStatus>,
    ) -> Result<Vec<TravelRequestView>, AppError> {
        let requests = self.ledger.requests_by_manager(manager_id, status).await?;
        self.view_all(requests).await
    }

    pub async fn list_all(&self, status: Option<TravelStatus>) -> Result<Vec<TravelRequestView>, AppError> {
        let requests = self.ledger.all_requests(status).await?;
        self.view_all(requests).await
    }

    pub async fn view(&self, request: TravelRequest) -> Result<TravelRequestView, AppError> {
        let mut views = self.view_all(vec![request]).await?;
        views.pop().ok_or(AppError::Internal)
    }

    async fn view_all(&self, requests: Vec<TravelRequest>) -> Result<Vec<TravelRequestView>, AppError> {
        // users seen within this one projection
        let mut users: HashMap<u64, Option<User>> = HashMap::new();
        let mut views = Vec::with_capacity(requests.len());

        for request in requests {
            let employee = self
                .load(&mut users, request.employee_id)
                .await?
                .ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "travel request {} references missing employee {}",
                        request.id, request.employee_id
                    ))
                })?;

            let manager = match employee.manager_id {
                Some(manager_id) => self.load(&mut users, manager_id).await?,
                None => None,
            };

            views.push(TravelRequestView::compose(request, &employee, manager.as_ref()));
        }

        Ok(views)
    }

    async fn load(&self, users: &mut HashMap<u64, Option<User>>, id: u64) -> Result<Option<User>, StoreError> {
        if let Some(found) = users.get(&id) {
            return Ok(found.clone());
        }
        let user = self.ledger.user_by_id(id).await?;
        users.insert(id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{role::Role, user::NewUser};
    use crate::service::{Principal, lifecycle::LifecycleEngine};
    use crate::store::memory::MemoryLedger;
    use crate::model::travel_request::TravelDraft;

    struct Org {
        engine: LifecycleEngine,
        projections: Projections,
        boss: User,
        other_boss: User,
        alice: User,
        bob: User,
        loner: User,
    }

    async fn add(ledger: &MemoryLedger, first: &str, email: &str, role: Role, manager: Option<u64>) -> User {
        let mut tx = ledger.begin().await.unwrap();
        let user = tx
            .insert_user(NewUser {
                first_name: first.into(),
                last_name: "Test".into(),
                email: email.into(),
                password_hash: "hash".into(),
                role,
                manager_id: manager,
                leaves_left: 30,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user
    }

    async fn org() -> Org {
        let ledger = Arc::new(MemoryLedger::new());
        let boss = add(&ledger, "John", "manager@gmail.com", Role::Manager, None).await;
        let other_boss = add(&ledger, "Grace", "grace@gmail.com", Role::Manager, None).await;
        let alice = add(&ledger, "Alice", "alice@gmail.com", Role::Employee, Some(boss.id)).await;
        let bob = add(&ledger, "Bob", "bob@gmail.com", Role::Employee, Some(other_boss.id)).await;
        let loner = add(&ledger, "Lone", "lone@gmail.com", Role::Employee, None).await;
        Org {
            engine: LifecycleEngine::new(ledger.clone()),
            projections: Projections::new(ledger),
            boss,
            other_boss,
            alice,
            bob,
            loner,
        }
    }

    fn principal(user: &User) -> Principal {
        Principal {
            user_id: user.id,
            role: user.role,
        }
    }

    fn draft(day: u32) -> TravelDraft {
        TravelDraft {
            from_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2024, 1, day + 1).unwrap(),
            from_location: "Dhaka".into(),
            destination: "Khulna".into(),
            mode_of_transport: "Car".into(),
            purpose_of_travel: "Site visit".into(),
        }
    }

    #[actix_web::test]
    async fn view_embeds_employee_and_manager() {
        let org = org().await;
        let request = org.engine.create_request(&principal(&org.alice), draft(1)).await.unwrap();

        let view = org.projections.get_by_id(request.id).await.unwrap();
        assert_eq!(view.employee_first_name, "Alice");
        assert_eq!(view.employee_leaves_left, 30);
        assert_eq!(view.manager_first_name.as_deref(), Some("John"));
        assert_eq!(view.manager_username.as_deref(), Some("manager@gmail.com"));
        assert_eq!(view.days_requested, 2);
    }

    #[actix_web::test]
    async fn view_without_manager_has_no_manager_fields() {
        let org = org().await;
        let request = org.engine.create_request(&principal(&org.loner), draft(3)).await.unwrap();

        let view = org.projections.get_by_id(request.id).await.unwrap();
        assert!(view.manager_first_name.is_none());
        assert!(view.manager_username.is_none());
    }

    #[actix_web::test]
    async fn balance_in_view_is_read_at_query_time() {
        let org = org().await;
        let request = org.engine.create_request(&principal(&org.alice), draft(1)).await.unwrap();
        org.engine.approve(request.id, &principal(&org.boss)).await.unwrap();

        let view = org.projections.get_by_id(request.id).await.unwrap();
        assert_eq!(view.employee_leaves_left, 28);
    }

    #[actix_web::test]
    async fn manager_listing_follows_reporting_line() {
        let org = org().await;
        let a1 = org.engine.create_request(&principal(&org.alice), draft(1)).await.unwrap();
        let a2 = org.engine.create_request(&principal(&org.alice), draft(10)).await.unwrap();
        let b1 = org.engine.create_request(&principal(&org.bob), draft(5)).await.unwrap();
        org.engine.create_request(&principal(&org.loner), draft(7)).await.unwrap();
        org.engine
            .reject(a2.id, &principal(&org.boss), "overlaps audit")
            .await
            .unwrap();

        let mine: Vec<u64> = org
            .projections
            .list_by_manager(org.boss.id, None)
            .await
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(mine, vec![a1.id, a2.id]);

        let pending: Vec<u64> = org
            .projections
            .list_by_manager(org.boss.id, Some(TravelStatus::Pending))
            .await
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(pending, vec![a1.id]);

        let theirs: Vec<u64> = org
            .projections
            .list_by_manager(org.other_boss.id, None)
            .await
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(theirs, vec![b1.id]);

        assert_eq!(org.projections.list_all(None).await.unwrap().len(), 4);
        assert_eq!(
            org.projections
                .list_all(Some(TravelStatus::Rejected))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[actix_web::test]
    async fn employee_listing_is_scoped_to_owner() {
        let org = org().await;
        org.engine.create_request(&principal(&org.alice), draft(1)).await.unwrap();
        org.engine.create_request(&principal(&org.bob), draft(2)).await.unwrap();

        let alice_views = org.projections.list_by_employee(org.alice.id).await.unwrap();
        assert_eq!(alice_views.len(), 1);
        assert!(alice_views.iter().all(|v| v.employee_id == org.alice.id));
    }

    #[actix_web::test]
    async fn unknown_id_is_not_found() {
        let org = org().await;
        assert!(matches!(
            org.projections.get_by_id(123).await,
            Err(AppError::NotFound(_))
        ));
    }
}
