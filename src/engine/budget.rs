// Shared temporary-storage budget

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::domain::errors::DomainError;

/// Temporary storage shared by every running job, counted in MiB.
/// A pass that does not fit waits for other passes to release space.
#[derive(Debug, Clone)]
pub struct StorageBudget {
    semaphore: Arc<Semaphore>,
    total_mib: u32,
}

/// Space held by one pass; returned on drop
#[derive(Debug)]
pub struct BudgetPermit {
    _permit: OwnedSemaphorePermit,
    mib: u32,
}

impl BudgetPermit {
    pub fn mib(&self) -> u32 {
        self.mib
    }
}

impl StorageBudget {
    pub fn new(total_mib: u32) -> Result<Self, DomainError> {
        if total_mib == 0 {
            return Err(DomainError::ConfigInvalid(
                "temporary storage budget must be at least 1 MiB".to_string(),
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(total_mib as usize)),
            total_mib,
        })
    }

    pub fn total_mib(&self) -> u32 {
        self.total_mib
    }

    pub fn available_mib(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }

    /// Reserve without waiting
    pub fn try_reserve(&self, mib: u32) -> Result<BudgetPermit, DomainError> {
        let mib = self.clamp(mib);
        match Arc::clone(&self.semaphore).try_acquire_many_owned(mib) {
            Ok(permit) => Ok(BudgetPermit {
                _permit: permit,
                mib,
            }),
            Err(_) => Err(DomainError::ResourceBudgetExceeded {
                requested_mib: mib,
                available_mib: self.available_mib(),
            }),
        }
    }

    /// Reserve, waiting for space when the budget is exhausted
    pub async fn reserve(&self, mib: u32) -> Result<BudgetPermit, DomainError> {
        match self.try_reserve(mib) {
            Ok(permit) => {
                debug!(mib = permit.mib, available = self.available_mib(), "Reserved temp storage");
                Ok(permit)
            }
            Err(err) => {
                warn!(error = %err, "Waiting for temporary storage");
                let mib = self.clamp(mib);
                let permit = Arc::clone(&self.semaphore)
                    .acquire_many_owned(mib)
                    .await
                    .map_err(|_| DomainError::FsFail("storage budget closed".to_string()))?;
                Ok(BudgetPermit {
                    _permit: permit,
                    mib,
                })
            }
        }
    }

    /// Requests larger than the whole budget would never be granted
    fn clamp(&self, mib: u32) -> u32 {
        if mib > self.total_mib {
            warn!(requested = mib, total = self.total_mib, "Request exceeds whole budget, clamping");
        }
        mib.clamp(1, self.total_mib)
    }
}
