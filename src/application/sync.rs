use tracing::{info, warn};

use crate::domain::{CustomerReference, EntityStatus};
use crate::events::{CustomerCreated, CustomerDeleted, CustomerEvent, CustomerUpdated};
use crate::storage::Repository;

use super::AppError;

/// Maintains the local customer projection from registry lifecycle events.
///
/// All handlers are idempotent: delivery is at-least-once, so replaying any
/// event must converge to the same projection row. An event referencing an
/// unknown customer is logged and dropped — the projection tolerates a
/// missing-then-arriving-later creation event but never synthesizes identity
/// from partial data. Storage failures propagate; they are never swallowed.
pub struct CustomerSync {
    repo: Repository,
}

impl CustomerSync {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Dispatch an inbound event to its handler.
    pub async fn apply(&self, event: &CustomerEvent) -> Result<(), AppError> {
        match event {
            CustomerEvent::Created(created) => self.on_created(created).await,
            CustomerEvent::Updated(updated) => self.on_updated(updated).await,
            CustomerEvent::Deleted(deleted) => self.on_deleted(deleted).await,
        }
    }

    /// Unconditionally insert or overwrite the projection row.
    pub async fn on_created(&self, event: &CustomerCreated) -> Result<(), AppError> {
        info!(customer_id = event.customer_id, "received customer created event");

        let reference = CustomerReference {
            id: event.customer_id,
            name: event.name.clone(),
            identification: event.identification.clone(),
            status: event.status,
        };
        self.repo.upsert_customer_reference(&reference).await?;

        info!(customer_id = event.customer_id, "customer reference created");
        Ok(())
    }

    /// Overwrite the existing projection row; drop the event when no row
    /// exists.
    pub async fn on_updated(&self, event: &CustomerUpdated) -> Result<(), AppError> {
        info!(customer_id = event.customer_id, "received customer updated event");

        match self.repo.get_customer_reference(event.customer_id).await? {
            Some(mut reference) => {
                reference.name = event.name.clone();
                reference.identification = event.identification.clone();
                reference.status = event.status;
                self.repo.update_customer_reference(&reference).await?;
                info!(customer_id = event.customer_id, "customer reference updated");
            }
            None => {
                warn!(
                    customer_id = event.customer_id,
                    "customer reference not found, dropping update event"
                );
            }
        }
        Ok(())
    }

    /// Flip the projection row's status to DELETED, preserving name and
    /// identification; drop the event when no row exists.
    pub async fn on_deleted(&self, event: &CustomerDeleted) -> Result<(), AppError> {
        info!(customer_id = event.customer_id, "received customer deleted event");

        match self.repo.get_customer_reference(event.customer_id).await? {
            Some(mut reference) => {
                reference.status = EntityStatus::Deleted;
                self.repo.update_customer_reference(&reference).await?;
                info!(
                    customer_id = event.customer_id,
                    "customer reference marked as deleted"
                );
            }
            None => {
                warn!(
                    customer_id = event.customer_id,
                    "customer reference not found, dropping delete event"
                );
            }
        }
        Ok(())
    }
}
