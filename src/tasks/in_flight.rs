//! Work that has to finish before its owner shuts down

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const MAX_IN_FLIGHT: u32 = 1 << 16;

/// Counts in-flight work. [InFlight::close] waits until all of it is done and
/// refuses anything new.
#[derive(Debug)]
pub struct InFlight {
    permits: Arc<Semaphore>,
}

impl Default for InFlight {
    fn default() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(MAX_IN_FLIGHT as usize)),
        }
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of work, held until the permit is dropped.
    /// `None` once closing has started.
    pub fn enter(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().try_acquire_owned().ok()
    }

    /// Wait for every outstanding permit, then close
    pub async fn close(&self) {
        if let Ok(all) = self.permits.acquire_many(MAX_IN_FLIGHT).await {
            all.forget();
        }
        self.permits.close();
    }
}
