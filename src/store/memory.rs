use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Ledger, LedgerTx, StoreError, StoreResult};
use crate::model::{
    role::Role,
    travel_request::{NewTravelRequest, TravelRequest, TravelStatus},
    user::{NewUser, User},
};

#[derive(Debug, Clone, Default)]
struct Arena {
    users: BTreeMap<u64, User>,
    requests: BTreeMap<u64, TravelRequest>,
    last_user_id: u64,
    last_request_id: u64,
}

impl Arena {
    fn manager_of(&self, employee_id: u64) -> Option<u64> {
        self.users.get(&employee_id).and_then(|u| u.manager_id)
    }
}

/// Process-local store for development and tests.
///
/// A transaction holds the arena mutex for its whole lifetime and works on a
/// staged copy, so writes are serialized and only become visible on commit.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    arena: Arc<Mutex<Arena>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = self.arena.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn user_by_id(&self, id: u64) -> StoreResult<Option<User>> {
        Ok(self.arena.lock().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let arena = self.arena.lock().await;
        Ok(arena.users.values().find(|u| u.email == email).cloned())
    }

    fn emails(&self) -> BoxStream<'_, StoreResult<String>> {
        let arena = self.arena.clone();
        stream::once(async move {
            let arena = arena.lock().await;
            arena
                .users
                .values()
                .map(|u| Ok(u.email.clone()))
                .collect::<Vec<_>>()
        })
        .flat_map(stream::iter)
        .boxed()
    }

    async fn count_by_role(&self, role: Role) -> StoreResult<u64> {
        let arena = self.arena.lock().await;
        Ok(arena.users.values().filter(|u| u.role == role).count() as u64)
    }

    async fn request_by_id(&self, id: u64) -> StoreResult<Option<TravelRequest>> {
        Ok(self.arena.lock().await.requests.get(&id).cloned())
    }

    async fn requests_by_employee(&self, employee_id: u64) -> StoreResult<Vec<TravelRequest>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .requests
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn requests_by_manager(
        &self,
        manager_id: u64,
        status: Option<TravelStatus>,
    ) -> StoreResult<Vec<TravelRequest>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .requests
            .values()
            .filter(|r| arena.manager_of(r.employee_id) == Some(manager_id))
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }

    async fn all_requests(&self, status: Option<TravelStatus>) -> StoreResult<Vec<TravelRequest>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .requests
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Arena>,
    staged: Arena,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn user_for_update(&mut self, id: u64) -> StoreResult<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn request_for_update(&mut self, id: u64) -> StoreResult<Option<TravelRequest>> {
        Ok(self.staged.requests.get(&id).cloned())
    }

    async fn count_by_role(&mut self, role: Role) -> StoreResult<u64> {
        Ok(self.staged.users.values().filter(|u| u.role == role).count() as u64)
    }

    async fn insert_user(&mut self, user: NewUser) -> StoreResult<User> {
        if self.staged.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        self.staged.last_user_id += 1;
        let user = User {
            id: self.staged.last_user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            manager_id: user.manager_id,
            leaves_left: user.leaves_left,
            created_at: chrono::Utc::now(),
        };
        self.staged.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn insert_request(&mut self, request: NewTravelRequest) -> StoreResult<TravelRequest> {
        if !self.staged.users.contains_key(&request.employee_id) {
            return Err(StoreError::Corrupt(format!(
                "travel request references missing user {}",
                request.employee_id
            )));
        }
        self.staged.last_request_id += 1;
        let request = TravelRequest::from_new(self.staged.last_request_id, request);
        self.staged.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn save_decision(&mut self, request: &TravelRequest) -> StoreResult<()> {
        match self.staged.requests.get_mut(&request.id) {
            Some(stored) => {
                stored.status = request.status;
                stored.approved_by = request.approved_by;
                stored.approved_at = request.approved_at;
                stored.rejection_reason = request.rejection_reason.clone();
                stored.updated_at = request.updated_at;
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("travel request {} vanished", request.id))),
        }
    }

    async fn adjust_balance(&mut self, user_id: u64, delta: i32) -> StoreResult<i32> {
        match self.staged.users.get_mut(&user_id) {
            Some(user) => {
                user.leaves_left += delta;
                Ok(user.leaves_left)
            }
            None => Err(StoreError::Corrupt(format!("user {user_id} vanished"))),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
