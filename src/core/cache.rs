use crate::core::models::CheckoutRecord;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Drops records that have not been called yet and orders the rest most
/// recent first. The sort is stable, so ties keep the data source's order.
pub fn prepare(records: Vec<CheckoutRecord>) -> Vec<CheckoutRecord> {
    let mut called: Vec<CheckoutRecord> = records.into_iter().filter(|r| r.is_called()).collect();
    called.sort_by(|a, b| b.checked_out_at.cmp(&a.checked_out_at));
    called
}

/// The window of entries shown under the current one.
pub fn previously_called(records: &[CheckoutRecord], size: usize) -> &[CheckoutRecord] {
    if records.len() <= 1 {
        return &[];
    }
    let end = records.len().min(size.saturating_add(1));
    &records[1..end]
}

/// Holds exactly one generation of prepared records. Readers get the whole
/// generation as an `Arc`, writers swap it in one assignment.
#[derive(Clone)]
pub struct CheckoutCache {
    inner: Arc<RwLock<Arc<[CheckoutRecord]>>>,
}

impl CheckoutCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::from(Vec::new()))),
        }
    }

    pub async fn snapshot(&self) -> Arc<[CheckoutRecord]> {
        Arc::clone(&*self.inner.read().await)
    }

    pub async fn replace(&self, records: Vec<CheckoutRecord>) -> Arc<[CheckoutRecord]> {
        let generation: Arc<[CheckoutRecord]> = Arc::from(records);
        *self.inner.write().await = Arc::clone(&generation);
        generation
    }
}

impl Default for CheckoutCache {
    fn default() -> Self {
        Self::new()
    }
}
