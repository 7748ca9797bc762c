//! Admin backend transport and capability negotiation.
//!
//! The [`LayerAdminTransport`] trait abstracts the admin backend: loading,
//! saving and deleting layers, fetching capability documents of external
//! map services and the admin metadata (roles, permission types, mandatory
//! fields per layer type). [`HttpTransport`] talks to the backend's action
//! routes over HTTP.
//!
//! [`CapabilityNegotiator`] turns raw transport results into the outcomes the
//! editor reacts to (auth required, timeout, unparseable document, ...).

pub mod catalog;
pub mod http;
pub mod negotiator;
pub mod transport;

pub use catalog::{
    AdminMetadata, CapabilitiesQuery, CapabilityCatalog, SaveResponse, UpdateCapabilitiesQuery,
    UpdateCapabilitiesResponse,
};
pub use http::{HttpTransport, HttpTransportConfig};
pub use negotiator::{CapabilityNegotiator, LayerUpdate, NegotiationOutcome, UpdateReport};
pub use transport::{LayerAdminTransport, TransportError, TransportResult};
