use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use console_state::{
    transition::{
        apply_edit, clear_collection, confirm_pending, delete_entity, receive_collection_for,
        receive_error, receive_error_for, receive_single, request_collection, request_single,
    },
    ConsoleState, Transition,
};
use shared::{
    domain::{EntityId, EntityType, ViewKey},
    error::ApiError,
    protocol::CollectionQuery,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{config::ConsoleSettings, EntityTransport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    StateChanged {
        transition: &'static str,
        view_key: Option<ViewKey>,
    },
    Notification(Notification),
}

/// Owns the current [`ConsoleState`] and applies transitions to it one at a
/// time, in dispatch order. Transport calls run outside the state lock.
pub struct ConsoleStore {
    transport: Arc<dyn EntityTransport>,
    state: Mutex<ConsoleState>,
    events: broadcast::Sender<StoreEvent>,
    request_timeout: Duration,
}

impl ConsoleStore {
    pub fn new(transport: Arc<dyn EntityTransport>, settings: &ConsoleSettings) -> Arc<Self> {
        Self::with_timeout(transport, settings.request_timeout())
    }

    pub fn with_timeout(transport: Arc<dyn EntityTransport>, request_timeout: Duration) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            transport,
            state: Mutex::new(ConsoleState::default()),
            events,
            request_timeout,
        })
    }

    pub fn transport(&self) -> &Arc<dyn EntityTransport> {
        &self.transport
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ConsoleState {
        self.state.lock().await.clone()
    }

    /// Applies one transition and returns the resulting state.
    pub async fn dispatch(&self, transition: Transition) -> ConsoleState {
        let name = transition.name();
        let view_key = transition.view_key().cloned();
        let next = {
            let mut guard = self.state.lock().await;
            let next = console_state::reduce(&guard, transition);
            *guard = next.clone();
            next
        };
        debug!(transition = name, view = ?view_key, "applied transition");
        let _ = self.events.send(StoreEvent::StateChanged {
            transition: name,
            view_key,
        });
        next
    }

    pub fn notify(&self, notification: Notification) {
        info!(
            level = notification.level.label(),
            title = %notification.title,
            "{}",
            notification.message
        );
        let _ = self.events.send(StoreEvent::Notification(notification));
    }

    pub(crate) async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.request_timeout)),
        }
    }

    /// Fetches one page into `view_key`. A response that arrives after a newer
    /// request for the same view is discarded by the reducer.
    pub async fn load_collection(
        &self,
        view_key: &ViewKey,
        entity_type: &EntityType,
        query: CollectionQuery,
    ) -> Result<(), TransportError> {
        let requested = self
            .dispatch(request_collection(view_key.clone(), query.clone()))
            .await;
        let generation = requested
            .view(view_key)
            .map(|view| view.generation)
            .unwrap_or_default();

        match self
            .call(self.transport.fetch_collection(entity_type, &query))
            .await
        {
            Ok(page) => {
                let state = self
                    .dispatch(receive_collection_for(
                        view_key.clone(),
                        entity_type.clone(),
                        page.items,
                        page.total,
                        query,
                        generation,
                    ))
                    .await;
                if state.view(view_key).map(|view| view.generation) != Some(generation) {
                    debug!(view = %view_key, generation, "dropped superseded collection response");
                }
                Ok(())
            }
            Err(err) => {
                warn!(view = %view_key, entity_type = %entity_type, "collection fetch failed: {err}");
                self.dispatch(receive_error_for(
                    view_key.clone(),
                    ApiError::from(&err),
                    generation,
                ))
                .await;
                Err(err)
            }
        }
    }

    pub async fn load_single(
        &self,
        view_key: &ViewKey,
        entity_type: &EntityType,
        id: &EntityId,
    ) -> Result<(), TransportError> {
        self.dispatch(request_single(view_key.clone(), id.clone()))
            .await;
        match self.call(self.transport.fetch_one(entity_type, id)).await {
            Ok(entity) => {
                self.dispatch(receive_single(view_key.clone(), entity_type.clone(), entity))
                    .await;
                Ok(())
            }
            Err(err) => Err(self.record_view_error(view_key, err).await),
        }
    }

    /// Deletes on the server, then scrubs the id from the store and all views.
    pub async fn delete_entity(
        &self,
        entity_type: &EntityType,
        id: &EntityId,
    ) -> Result<(), TransportError> {
        self.call(self.transport.delete_one(entity_type, id)).await?;
        self.dispatch(delete_entity(entity_type.clone(), id.clone()))
            .await;
        Ok(())
    }

    /// Sends the scratch of the row being edited. On failure the edit stays
    /// open so it can be retried or cancelled. An edit started on another row
    /// while the request is in flight stays open and unsaved.
    pub async fn save_edit(
        &self,
        view_key: &ViewKey,
        entity_type: &EntityType,
    ) -> Result<Option<EntityId>, TransportError> {
        let session = {
            let state = self.state.lock().await;
            state
                .edits(view_key)
                .and_then(|edits| edits.editing.clone())
        };
        let Some(session) = session else {
            return Ok(None);
        };

        match self
            .call(
                self.transport
                    .patch_one(entity_type, &session.id, &session.scratch),
            )
            .await
        {
            Ok(saved) => {
                self.dispatch(apply_edit(
                    view_key.clone(),
                    entity_type.clone(),
                    session.id.clone(),
                ))
                .await;
                self.dispatch(receive_single(view_key.clone(), entity_type.clone(), saved))
                    .await;
                Ok(Some(session.id))
            }
            Err(err) => Err(self.record_view_error(view_key, err).await),
        }
    }

    /// Creates the pending row on the server and swaps the placeholder for the
    /// server-assigned id. Returns the new id.
    pub async fn save_pending(
        &self,
        view_key: &ViewKey,
        entity_type: &EntityType,
        placeholder_id: &EntityId,
    ) -> Result<Option<EntityId>, TransportError> {
        let draft = {
            let state = self.state.lock().await;
            state.edits(view_key).and_then(|edits| {
                edits
                    .pending
                    .iter()
                    .find(|row| &row.id == placeholder_id)
                    .map(|row| row.draft.clone())
            })
        };
        let Some(draft) = draft else {
            return Ok(None);
        };

        match self.call(self.transport.create_one(entity_type, &draft)).await {
            Ok(created) => {
                let id = created.id.clone();
                self.dispatch(confirm_pending(
                    view_key.clone(),
                    placeholder_id.clone(),
                    entity_type.clone(),
                    created,
                ))
                .await;
                Ok(Some(id))
            }
            Err(err) => Err(self.record_view_error(view_key, err).await),
        }
    }

    pub async fn clear_collection(&self, entity_type: &EntityType, view_key: &ViewKey) {
        self.dispatch(clear_collection(entity_type.clone(), view_key.clone()))
            .await;
    }

    async fn record_view_error(&self, view_key: &ViewKey, err: TransportError) -> TransportError {
        warn!(view = %view_key, "request failed: {err}");
        self.dispatch(receive_error(view_key.clone(), ApiError::from(&err)))
            .await;
        err
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
