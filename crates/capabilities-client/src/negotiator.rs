//! Capability negotiation and on-demand capability refresh.
//!
//! The negotiator classifies transport answers into outcomes the editor can
//! act on. It does not know about draft state or supersession; callers
//! decide whether a result is still relevant when it arrives.

use std::collections::BTreeMap;
use std::sync::Arc;

use layer_common::{EditorError, LayerId, Message};
use metrics::counter;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::catalog::{CapabilitiesQuery, CapabilityCatalog, UpdateCapabilitiesQuery};
use crate::transport::{LayerAdminTransport, TransportError, TransportResult};

/// Result of asking a service for its capabilities.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationOutcome {
    Success(CapabilityCatalog),
    /// Service answered 401; credentials are needed
    AuthRequired,
    /// Service did not answer in time (408 or client timeout)
    Timeout,
    /// 400 or a connection failure
    BadRequest(String),
    /// 417 or a body that could not be decoded
    Unparseable(String),
    ServerError { status: u16, message: String },
}

impl NegotiationOutcome {
    /// Classify a transport answer.
    pub fn from_result(result: TransportResult<CapabilityCatalog>) -> Self {
        match result {
            Ok(catalog) => NegotiationOutcome::Success(catalog),
            Err(TransportError::Status { status, message }) => match status {
                401 => NegotiationOutcome::AuthRequired,
                408 => NegotiationOutcome::Timeout,
                400 => NegotiationOutcome::BadRequest(message),
                417 => NegotiationOutcome::Unparseable(message),
                _ => NegotiationOutcome::ServerError { status, message },
            },
            Err(TransportError::Timeout) => NegotiationOutcome::Timeout,
            Err(TransportError::Connection(message)) => NegotiationOutcome::BadRequest(message),
            Err(TransportError::Decode(message)) => NegotiationOutcome::Unparseable(message),
            Err(TransportError::NotFound) => NegotiationOutcome::ServerError {
                status: 404,
                message: "Not found".to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NegotiationOutcome::Success(_))
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            NegotiationOutcome::Success(_) => "success",
            NegotiationOutcome::AuthRequired => "auth_required",
            NegotiationOutcome::Timeout => "timeout",
            NegotiationOutcome::BadRequest(_) => "bad_request",
            NegotiationOutcome::Unparseable(_) => "unparseable",
            NegotiationOutcome::ServerError { .. } => "server_error",
        }
    }

    /// The single notification a failed negotiation produces.
    pub fn message(&self) -> Option<Message> {
        let message = match self {
            NegotiationOutcome::Success(_) => return None,
            NegotiationOutcome::AuthRequired => {
                Message::warning("messages.unauthorizedErrorFetchCapabilities")
            }
            NegotiationOutcome::Timeout => Message::warning("messages.timeoutErrorFetchCapabilities"),
            NegotiationOutcome::BadRequest(_) => {
                Message::warning("messages.connectionErrorFetchCapabilities")
            }
            NegotiationOutcome::Unparseable(_) => {
                Message::warning("messages.parsingErrorFetchCapabilities")
            }
            NegotiationOutcome::ServerError { status, .. } => {
                Message::error("messages.errorFetchCapabilities").with_arg("status", *status)
            }
        };
        Some(message)
    }

    pub fn into_result(self) -> Result<CapabilityCatalog, EditorError> {
        match self {
            NegotiationOutcome::Success(catalog) => Ok(catalog),
            NegotiationOutcome::AuthRequired => Err(EditorError::AuthRequired),
            NegotiationOutcome::Timeout => Err(EditorError::Timeout),
            NegotiationOutcome::BadRequest(message) => Err(EditorError::Connection(message)),
            NegotiationOutcome::Unparseable(message) => Err(EditorError::Unparseable(message)),
            NegotiationOutcome::ServerError { status, message } => {
                Err(EditorError::Service { status, message })
            }
        }
    }
}

/// Per-layer result of a capability refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerUpdate {
    Updated { capabilities: Option<Value> },
    Failed { reason: Option<String> },
}

/// Capability refresh results keyed by layer id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub results: BTreeMap<LayerId, LayerUpdate>,
}

impl UpdateReport {
    pub fn get(&self, id: LayerId) -> Option<&LayerUpdate> {
        self.results.get(&id)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.results
            .iter()
            .filter(|(_, update)| matches!(update, LayerUpdate::Updated { .. }))
            .map(|(id, _)| *id)
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .values()
            .filter(|update| matches!(update, LayerUpdate::Failed { .. }))
            .count()
    }

    /// The notification for one layer's refresh.
    pub fn message_for(&self, id: LayerId) -> Message {
        match self.get(id) {
            Some(LayerUpdate::Updated { .. }) => Message::success("capabilities.updatedSuccesfully"),
            Some(LayerUpdate::Failed {
                reason: Some(reason),
            }) => Message::error("capabilities.updateFailedWithReason").with_arg("reason", reason.as_str()),
            _ => Message::error("capabilities.updateFailed"),
        }
    }
}

/// Asks services for their capabilities through the admin backend.
pub struct CapabilityNegotiator<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: ?Sized> Clone for CapabilityNegotiator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: LayerAdminTransport + ?Sized> CapabilityNegotiator<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Fetch capabilities for a (type, version, url, credentials) combination.
    #[instrument(skip(self, query), fields(layer_type = %query.layer_type, version = ?query.version, url = ?query.url))]
    pub async fn negotiate(&self, query: &CapabilitiesQuery) -> NegotiationOutcome {
        let outcome = NegotiationOutcome::from_result(self.transport.fetch_capabilities(query).await);

        counter!("layer_editor_negotiations_total", "outcome" => outcome.label()).increment(1);
        match &outcome {
            NegotiationOutcome::Success(catalog) => {
                info!(layers = catalog.layers.len(), "Capabilities negotiated");
            }
            other => {
                warn!(outcome = other.label(), "Capability negotiation failed");
            }
        }
        outcome
    }

    /// Refresh stored capabilities of saved layers.
    ///
    /// Ids missing from the backend's success list are failures; the reason
    /// is the backend's message for that id, or its first message if it
    /// reported none for the id.
    #[instrument(skip(self, ids), fields(layers = ids.len(), srs = %srs))]
    pub async fn update(&self, ids: &[LayerId], srs: &str) -> Result<UpdateReport, EditorError> {
        let query = UpdateCapabilitiesQuery {
            ids: ids.to_vec(),
            srs: srs.to_string(),
        };
        let response = self.transport.update_capabilities(&query).await.map_err(|e| {
            warn!(error = %e, "Capability update request failed");
            EditorError::from(e)
        })?;

        let fallback_reason = response.error.values().next().cloned();
        let mut report = UpdateReport::default();
        for id in ids {
            let key = id.to_string();
            let update = if response.success.contains(&key) {
                let capabilities = response
                    .layer_data
                    .get(&key)
                    .and_then(|data| data.get("capabilities"))
                    .cloned();
                LayerUpdate::Updated { capabilities }
            } else {
                LayerUpdate::Failed {
                    reason: response.error.get(&key).cloned().or_else(|| fallback_reason.clone()),
                }
            };
            report.results.insert(*id, update);
        }

        info!(
            updated = report.results.len() - report.failed_count(),
            failed = report.failed_count(),
            "Capabilities refreshed"
        );
        Ok(report)
    }
}
