//! HTTP transport against the admin backend's action routes.
//!
//! Every call goes to a single action endpoint with an `action_route`
//! query parameter, e.g.
//! `GET /action?action_route=ServiceCapabilities&type=wfslayer&version=1.1.0&url=...`

use std::time::Duration;

use async_trait::async_trait;
use layer_common::{LayerId, WireLayer};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::catalog::{
    AdminMetadata, CapabilitiesQuery, CapabilityCatalog, SaveResponse, UpdateCapabilitiesQuery,
    UpdateCapabilitiesResponse,
};
use crate::transport::{LayerAdminTransport, TransportError, TransportResult};

const ROUTE_LAYER_ADMIN: &str = "LayerAdmin";
const ROUTE_DELETE_LAYER: &str = "DeleteLayer";
const ROUTE_SERVICE_CAPABILITIES: &str = "ServiceCapabilities";
const ROUTE_UPDATE_CAPABILITIES: &str = "UpdateCapabilities";
const ROUTE_ADMIN_METADATA: &str = "LayerAdminMetadata";

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Action endpoint, e.g. "http://localhost:8080/action"
    pub base_url: String,
    /// Whole request timeout
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/action".to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpTransportConfig {
    /// Build from environment variables.
    ///
    /// - LAYER_ADMIN_URL (default: http://localhost:8080/action)
    /// - LAYER_ADMIN_TIMEOUT_SECS (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("LAYER_ADMIN_URL").unwrap_or(defaults.base_url);
        let request_timeout = std::env::var("LAYER_ADMIN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        Self {
            base_url,
            request_timeout,
            connect_timeout: defaults.connect_timeout,
        }
    }
}

/// Form body of a delete request.
#[derive(Debug, Serialize)]
struct DeleteForm<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<LayerId>,
    #[serde(rename = "type")]
    layer_type: &'a str,
}

/// Admin backend client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| TransportError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, route: &str) -> RequestBuilder {
        self.client
            .get(&self.base_url)
            .query(&[("action_route", route)])
            .header(header::ACCEPT, "application/json")
    }

    fn post(&self, route: &str) -> RequestBuilder {
        self.client
            .post(&self.base_url)
            .query(&[("action_route", route)])
            .header(header::ACCEPT, "application/json")
    }

    /// Send a request and decode a JSON body from a successful response.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<T> {
        let response = check_status(request.send().await?)?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Map non-success statuses to transport errors.
fn check_status(response: Response) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    debug!(status = status.as_u16(), url = %response.url(), "Backend returned error status");
    Err(TransportError::Status {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("").to_string(),
    })
}

#[async_trait]
impl LayerAdminTransport for HttpTransport {
    #[instrument(skip(self), fields(id = %id))]
    async fn fetch_layer(&self, id: LayerId) -> TransportResult<WireLayer> {
        let request = self.get(ROUTE_LAYER_ADMIN).query(&[("id", id.0)]);
        match self.send_json(request).await {
            Err(TransportError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(TransportError::NotFound)
            }
            other => other,
        }
    }

    #[instrument(skip(self, layer), fields(id = ?layer.id, layer_type = %layer.layer_type))]
    async fn save_layer(&self, layer: &WireLayer) -> TransportResult<SaveResponse> {
        let request = self.post(ROUTE_LAYER_ADMIN).json(layer);
        self.send_json(request).await
    }

    #[instrument(skip(self, layer), fields(id = ?layer.id))]
    async fn delete_layer(&self, layer: &WireLayer) -> TransportResult<()> {
        let form = DeleteForm {
            id: layer.id,
            layer_type: &layer.layer_type,
        };
        let response = self.post(ROUTE_DELETE_LAYER).form(&form).send().await?;
        check_status(response).map(|_| ())
    }

    #[instrument(skip(self, query), fields(layer_type = %query.layer_type, version = ?query.version))]
    async fn fetch_capabilities(
        &self,
        query: &CapabilitiesQuery,
    ) -> TransportResult<CapabilityCatalog> {
        let request = self.get(ROUTE_SERVICE_CAPABILITIES).query(query);
        self.send_json(request).await
    }

    #[instrument(skip(self, query), fields(layers = query.ids.len()))]
    async fn update_capabilities(
        &self,
        query: &UpdateCapabilitiesQuery,
    ) -> TransportResult<UpdateCapabilitiesResponse> {
        let request = self
            .post(ROUTE_UPDATE_CAPABILITIES)
            .query(&query.to_params());
        self.send_json(request).await
    }

    #[instrument(skip(self))]
    async fn fetch_admin_metadata(&self) -> TransportResult<AdminMetadata> {
        self.send_json(self.get(ROUTE_ADMIN_METADATA)).await
    }
}
