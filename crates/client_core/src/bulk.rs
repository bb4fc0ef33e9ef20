use std::{future::Future, sync::Arc, time::Duration};

use console_state::{
    selectors::bulk_running,
    transition::{bulk_advance, bulk_start, bulk_stop},
    BulkAction, BulkFailure, BulkSummary, UnitOutcome,
};
use shared::{
    domain::{EntityId, EntityType},
    error::ApiError,
};
use tracing::{debug, info, warn};

use crate::{
    config::ConsoleSettings,
    store::{ConsoleStore, Notification, NotificationLevel},
    TransportError,
};

/// Runs one unit operation per selected row, strictly one after another, so
/// progress is linear and the server sees at most one request from a run.
/// A failing unit is recorded and the run moves on to the next id.
pub struct BulkOrchestrator {
    store: Arc<ConsoleStore>,
    unit_timeout: Duration,
}

impl BulkOrchestrator {
    pub fn new(store: Arc<ConsoleStore>, settings: &ConsoleSettings) -> Self {
        Self::with_unit_timeout(store, settings.bulk_unit_timeout())
    }

    pub fn with_unit_timeout(store: Arc<ConsoleStore>, unit_timeout: Duration) -> Self {
        Self {
            store,
            unit_timeout,
        }
    }

    pub async fn run<F, Fut>(&self, action: BulkAction, ids: Vec<EntityId>, mut op: F) -> BulkSummary
    where
        F: FnMut(EntityId) -> Fut,
        Fut: Future<Output = Result<(), TransportError>>,
    {
        if bulk_running(&self.store.snapshot().await) {
            warn!(action = %action.name, "starting a bulk run while another is still running");
        }

        let total = ids.len();
        let title = action.title.clone();
        info!(action = %action.name, total, "bulk run started");
        self.store.dispatch(bulk_start(action, total)).await;

        let mut succeeded = 0;
        let mut failed_ids = Vec::new();
        for (index, id) in ids.into_iter().enumerate() {
            let outcome = match tokio::time::timeout(self.unit_timeout, op(id.clone())).await {
                Ok(Ok(())) => {
                    succeeded += 1;
                    UnitOutcome::Succeeded(id)
                }
                Ok(Err(err)) => {
                    warn!(id = %id, "bulk unit failed: {err}");
                    failed_ids.push(id.clone());
                    UnitOutcome::Failed(BulkFailure {
                        error: ApiError::from(&err),
                        id,
                    })
                }
                Err(_) => {
                    let err = TransportError::Timeout(self.unit_timeout);
                    warn!(id = %id, "bulk unit failed: {err}");
                    failed_ids.push(id.clone());
                    UnitOutcome::Failed(BulkFailure {
                        error: ApiError::from(&err),
                        id,
                    })
                }
            };
            self.store.dispatch(bulk_advance(outcome)).await;
            debug!(processed = index + 1, total, "bulk progress");
        }

        self.store.dispatch(bulk_stop()).await;

        let summary = BulkSummary {
            title,
            succeeded,
            total,
            failed_ids,
        };
        let level = if summary.all_succeeded() {
            NotificationLevel::Success
        } else if summary.succeeded == 0 {
            NotificationLevel::Error
        } else {
            NotificationLevel::Warning
        };
        self.store
            .notify(Notification::new(level, summary.title.clone(), summary.to_string()));
        summary
    }

    /// Deletes each id on the server; every successful delete is scrubbed from
    /// the store and all views as it completes.
    pub async fn bulk_delete(&self, entity_type: &EntityType, ids: Vec<EntityId>) -> BulkSummary {
        let action = BulkAction::new("delete", format!("Delete {entity_type}"));
        let store = Arc::clone(&self.store);
        self.run(action, ids, |id| {
            let store = Arc::clone(&store);
            let entity_type = entity_type.clone();
            async move { store.delete_entity(&entity_type, &id).await }
        })
        .await
    }
}

#[cfg(test)]
#[path = "tests/bulk_tests.rs"]
mod tests;
