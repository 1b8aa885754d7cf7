//! Domain services. Every operation takes the caller's [`Principal`]
//! explicitly; nothing reads an ambient security context.

pub mod lifecycle;
pub mod projection;
pub mod user_ledger;

use std::sync::Arc;

use actix_web::web::Data;

use crate::model::role::Role;
use crate::store::Ledger;
use crate::utils::email_registry::EmailRegistry;

use lifecycle::LifecycleEngine;
use projection::Projections;
use user_ledger::UserLedger;

/// Verified identity of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: u64,
    pub role: Role,
}

/// The three services wired to one store, ready to hand to actix as app data.
#[derive(Clone)]
pub struct Services {
    pub users: Data<UserLedger>,
    pub lifecycle: Data<LifecycleEngine>,
    pub projections: Data<Projections>,
}

impl Services {
    pub fn new(ledger: Arc<dyn Ledger>, emails: Arc<EmailRegistry>) -> Self {
        Self {
            users: Data::new(UserLedger::new(ledger.clone(), emails)),
            lifecycle: Data::new(LifecycleEngine::new(ledger.clone())),
            projections: Data::new(Projections::new(ledger)),
        }
    }
}
