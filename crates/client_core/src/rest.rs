use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::{
    domain::{Entity, EntityId, EntityType},
    protocol::{CollectionPage, CollectionQuery, ErrorEnvelope},
};
use tracing::debug;
use url::Url;

use crate::{config::ConsoleSettings, AuthContext, EntityTransport, TransportError};

/// JSON-over-HTTP transport. Collections live at `{base}/{entity_type}`,
/// single records at `{base}/{entity_type}/{id}`.
pub struct RestTransport {
    http: Client,
    base_url: Url,
    auth: AuthContext,
}

impl RestTransport {
    pub fn new(base_url: &str, auth: AuthContext) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            auth,
        })
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Result<Self, TransportError> {
        Self::new(&settings.api_url, AuthContext::from_settings(settings))
    }

    fn resource_url(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| TransportError::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn collection_url(&self, entity_type: &EntityType) -> Result<Url, TransportError> {
        self.resource_url(&[entity_type.as_str()])
    }

    fn record_url(&self, entity_type: &EntityType, id: &EntityId) -> Result<Url, TransportError> {
        self.resource_url(&[entity_type.as_str(), id.as_str()])
    }
}

#[async_trait]
impl EntityTransport for RestTransport {
    async fn fetch_collection(
        &self,
        entity_type: &EntityType,
        query: &CollectionQuery,
    ) -> Result<CollectionPage, TransportError> {
        let url = self.collection_url(entity_type)?;
        debug!(%url, "fetching collection");
        let response = self
            .auth
            .authorize(self.http.get(url).query(&query.to_params()))
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch_one(
        &self,
        entity_type: &EntityType,
        id: &EntityId,
    ) -> Result<Entity, TransportError> {
        let url = self.record_url(entity_type, id)?;
        let response = self.auth.authorize(self.http.get(url)).send().await?;
        read_json(response).await
    }

    async fn create_one(
        &self,
        entity_type: &EntityType,
        draft: &Map<String, Value>,
    ) -> Result<Entity, TransportError> {
        let url = self.collection_url(entity_type)?;
        let response = self
            .auth
            .authorize(self.http.post(url).json(draft))
            .send()
            .await?;
        read_json(response).await
    }

    async fn patch_one(
        &self,
        entity_type: &EntityType,
        id: &EntityId,
        fields: &Map<String, Value>,
    ) -> Result<Entity, TransportError> {
        let url = self.record_url(entity_type, id)?;
        let response = self
            .auth
            .authorize(self.http.patch(url).json(fields))
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_one(
        &self,
        entity_type: &EntityType,
        id: &EntityId,
    ) -> Result<(), TransportError> {
        let url = self.record_url(entity_type, id)?;
        let response = self.auth.authorize(self.http.delete(url)).send().await?;
        let body = read_body(response).await?;
        reject_embedded_error(&body)
    }
}

async fn read_body(response: Response) -> Result<String, TransportError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(TransportError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

fn reject_embedded_error(body: &str) -> Result<(), TransportError> {
    if body.trim().is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => Err(TransportError::Rejected(envelope.error)),
        Err(_) => Ok(()),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let body = read_body(response).await?;
    reject_embedded_error(&body)?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
