use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use tracing::info;

use crate::store::{Ledger, StoreResult};

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Fast email availability check in front of the store.
///
/// The cuckoo filter answers "definitely free" without a query, the moka
/// cache answers "definitely taken" for recently seen addresses, and anything
/// else falls back to the store. The store's unique index stays the source of
/// truth; this only saves round trips.
pub struct EmailRegistry {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, bool>,
}

impl Default for EmailRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailRegistry {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(500_000)
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }

    fn might_exist(&self, email: &str) -> bool {
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&email.to_string())
    }

    /// Record an address that now belongs to an account.
    pub async fn mark_taken(&self, email: &str) {
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&email.to_string());
        self.taken.insert(email.to_string(), true).await;
    }

    /// true  => email AVAILABLE
    /// false => email TAKEN
    pub async fn is_available(&self, email: &str, ledger: &dyn Ledger) -> StoreResult<bool> {
        // 1️⃣ Cuckoo filter: fast negative
        if !self.might_exist(email) {
            return Ok(true);
        }

        // 2️⃣ Moka cache: fast positive
        if self.taken.get(email).await.unwrap_or(false) {
            return Ok(false);
        }

        // 3️⃣ Store fallback
        Ok(ledger.user_by_email(email).await?.is_none())
    }

    /// Stream every registered address into the filter, `batch_size` at a time.
    pub async fn warmup(&self, ledger: &dyn Ledger, batch_size: usize) -> StoreResult<usize> {
        let batch_size = batch_size.max(1);
        let mut stream = ledger.emails();
        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(email) = stream.next().await {
            batch.push(email?);
            total += 1;

            if batch.len() == batch_size {
                self.insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch);
        }

        info!(total, "Email registry warmup complete");
        Ok(total)
    }

    fn insert_batch(&self, emails: &[String]) {
        let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
        for email in emails {
            filter.add(email);
        }
    }
}
