//! Async side of the admin console: the REST transport, the dispatching store
//! that feeds transport results through the console reducer, the sequential
//! bulk action runner and the session resume bridge.

use std::fmt;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::{Map, Value};
use shared::{
    domain::{Entity, EntityId, EntityType},
    protocol::{CollectionPage, CollectionQuery},
};

pub mod bulk;
pub mod config;
pub mod error;
pub mod rest;
pub mod session;
pub mod store;

pub use bulk::BulkOrchestrator;
pub use config::{load_settings, ConsoleSettings};
pub use error::{SessionError, TransportError};
pub use rest::RestTransport;
pub use session::{FileSessionStorage, MemorySessionStorage, SessionBridge, SessionStorage};
pub use store::{ConsoleStore, Notification, NotificationLevel, StoreEvent};

/// REST operations the console needs. Implementations fail with `Err` for
/// transport problems and for error payloads embedded in 2xx responses.
#[async_trait]
pub trait EntityTransport: Send + Sync {
    async fn fetch_collection(
        &self,
        entity_type: &EntityType,
        query: &CollectionQuery,
    ) -> Result<CollectionPage, TransportError>;
    async fn fetch_one(
        &self,
        entity_type: &EntityType,
        id: &EntityId,
    ) -> Result<Entity, TransportError>;
    async fn create_one(
        &self,
        entity_type: &EntityType,
        draft: &Map<String, Value>,
    ) -> Result<Entity, TransportError>;
    async fn patch_one(
        &self,
        entity_type: &EntityType,
        id: &EntityId,
        fields: &Map<String, Value>,
    ) -> Result<Entity, TransportError>;
    async fn delete_one(&self, entity_type: &EntityType, id: &EntityId)
        -> Result<(), TransportError>;
}

/// Credentials handed to a transport when it is built. There is no process
/// wide token; a new session means a new transport.
#[derive(Clone, Default)]
pub struct AuthContext {
    bearer_token: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
        }
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        match settings.api_token.as_deref() {
            Some(token) => Self::bearer(token),
            None => Self::anonymous(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer_token.is_some()
    }

    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/fake_transport.rs"]
pub(crate) mod fake_transport;
