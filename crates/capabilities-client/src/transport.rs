//! The admin backend seen from the editor.

use async_trait::async_trait;
use layer_common::{EditorError, LayerId, WireLayer};
use thiserror::Error;

use crate::catalog::{
    AdminMetadata, CapabilitiesQuery, CapabilityCatalog, SaveResponse, UpdateCapabilitiesQuery,
    UpdateCapabilitiesResponse,
};

pub type TransportResult<T> = Result<T, TransportError>;

/// Failure talking to the admin backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Not found")]
    NotFound,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Could not decode response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn status(status: u16) -> Self {
        TransportError::Status {
            status,
            message: String::new(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

/// Persistence failures. Capability failures are classified by the
/// negotiator instead.
impl From<TransportError> for EditorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound => EditorError::LayerNotFound("layer".to_string()),
            other => EditorError::Persistence(other.to_string()),
        }
    }
}

/// Operations the editor needs from the admin backend.
#[async_trait]
pub trait LayerAdminTransport: Send + Sync {
    /// Load a saved layer.
    async fn fetch_layer(&self, id: LayerId) -> TransportResult<WireLayer>;

    /// Create or update a layer. The response carries the layer id.
    async fn save_layer(&self, layer: &WireLayer) -> TransportResult<SaveResponse>;

    async fn delete_layer(&self, layer: &WireLayer) -> TransportResult<()>;

    /// Fetch and parse a service's capabilities document.
    async fn fetch_capabilities(
        &self,
        query: &CapabilitiesQuery,
    ) -> TransportResult<CapabilityCatalog>;

    /// Refresh stored capabilities of saved layers.
    async fn update_capabilities(
        &self,
        query: &UpdateCapabilitiesQuery,
    ) -> TransportResult<UpdateCapabilitiesResponse>;

    async fn fetch_admin_metadata(&self) -> TransportResult<AdminMetadata>;
}
