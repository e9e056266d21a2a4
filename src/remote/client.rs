use super::{FieldUpdate, ItemAttributes, ItemStore, NewField};
use crate::config::Config;
use crate::error::SyncError;
use crate::model::{Field, FieldConfiguration, ListDetail, ListItem};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP implementation of [`ItemStore`].
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
#[derive(Clone)]
pub struct RemoteItemClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteItemClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteItemClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteItemClient {
    /// Create a client rooted at `base_url`.
    ///
    /// Only `http` and `https` bases are accepted. Plain `http` is allowed but
    /// logged, since the bearer token travels in the clear.
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let base_url = Url::parse(base_url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        match base_url.scheme() {
            "https" => {}
            "http" => tracing::warn!(base_url = %base_url, "Using non-HTTPS API base URL"),
            other => {
                return Err(SyncError::InvalidUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let mut client = Self::new(&config.base_url)?.with_timeout(config.request_timeout());
        if let Some(token) = config.api_token() {
            client = client.with_token(token);
        }
        Ok(client)
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append path segments to the base URL. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, SyncError> {
        let mut request = request.header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| SyncError::Timeout)?
            .map_err(SyncError::Network)?;

        let status = response.status();
        let body = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| SyncError::Timeout)?
            .map_err(SyncError::Network)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Remote call returned error status");
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn send_json<B: Serialize>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
    ) -> Result<String, SyncError> {
        let payload = serde_json::to_vec(body).map_err(|e| SyncError::Encode(e.to_string()))?;
        tracing::trace!(method = %method, url = %url, "Sending request");
        let request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.send(request).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, SyncError> {
        tracing::trace!(url = %url, "Fetching");
        let body = self.send(self.http.get(url)).await?;
        decode(&body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, SyncError> {
    serde_json::from_str(body).map_err(|e| SyncError::Decode(e.to_string()))
}

#[derive(Serialize)]
struct ItemEnvelope {
    list_item: ItemAttributes,
}

#[derive(Serialize)]
struct FieldEnvelope<T> {
    list_item_field: T,
}

impl ItemStore for RemoteItemClient {
    async fn create_item(
        &self,
        list_id: &str,
        attributes: ItemAttributes,
    ) -> Result<ListItem, SyncError> {
        let url = self.endpoint(&["lists", list_id, "list_items"])?;
        let body = self
            .send_json(
                reqwest::Method::POST,
                url,
                &ItemEnvelope {
                    list_item: attributes,
                },
            )
            .await?;
        decode(&body)
    }

    async fn update_item(
        &self,
        list_id: &str,
        item_id: &str,
        attributes: ItemAttributes,
    ) -> Result<(), SyncError> {
        let url = self.endpoint(&["lists", list_id, "list_items", item_id])?;
        self.send_json(
            reqwest::Method::PUT,
            url,
            &ItemEnvelope {
                list_item: attributes,
            },
        )
        .await?;
        Ok(())
    }

    async fn delete_item(&self, list_id: &str, item_id: &str) -> Result<(), SyncError> {
        let url = self.endpoint(&["lists", list_id, "list_items", item_id])?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn create_field(
        &self,
        list_id: &str,
        item_id: &str,
        field: NewField,
    ) -> Result<Field, SyncError> {
        let url = self.endpoint(&["lists", list_id, "list_items", item_id, "list_item_fields"])?;
        let body = self
            .send_json(
                reqwest::Method::POST,
                url,
                &FieldEnvelope {
                    list_item_field: field,
                },
            )
            .await?;
        decode(&body)
    }

    async fn update_field(
        &self,
        list_id: &str,
        item_id: &str,
        field_id: &str,
        update: FieldUpdate,
    ) -> Result<(), SyncError> {
        let url = self.endpoint(&[
            "lists",
            list_id,
            "list_items",
            item_id,
            "list_item_fields",
            field_id,
        ])?;
        self.send_json(
            reqwest::Method::PUT,
            url,
            &FieldEnvelope {
                list_item_field: update,
            },
        )
        .await?;
        Ok(())
    }

    async fn get_item(&self, list_id: &str, item_id: &str) -> Result<ListItem, SyncError> {
        let url = self.endpoint(&["lists", list_id, "list_items", item_id])?;
        self.get(url).await
    }

    async fn get_list(&self, list_id: &str) -> Result<ListDetail, SyncError> {
        let url = self.endpoint(&["lists", list_id])?;
        self.get(url).await
    }

    async fn field_configurations(
        &self,
        item_configuration_id: &str,
    ) -> Result<Vec<FieldConfiguration>, SyncError> {
        let url = self.endpoint(&[
            "list_item_configurations",
            item_configuration_id,
            "list_item_field_configurations",
        ])?;
        self.get(url).await
    }
}
