//! Scripted in-memory admin backend.
//!
//! Responses are queued per operation and consumed in order. A queued
//! response can be gated: the call blocks until the test releases the
//! [`Gate`], which lets tests decide the order in which concurrent requests
//! complete.
//!
//! Without a scripted response the mock behaves like a small backend: saves
//! assign ids and store the layer, fetches return the stored layer, deletes
//! remove it.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use capabilities_client::{
    AdminMetadata, CapabilitiesQuery, CapabilityCatalog, LayerAdminTransport, SaveResponse,
    TransportError, TransportResult, UpdateCapabilitiesQuery, UpdateCapabilitiesResponse,
};
use layer_common::{LayerId, WireLayer};
use serde_json::Map;
use tokio::sync::oneshot;

use crate::fixtures;

/// First id handed out to saved layers without one.
pub const FIRST_ASSIGNED_ID: i64 = 100;

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchLayer(LayerId),
    SaveLayer(WireLayer),
    DeleteLayer(WireLayer),
    FetchCapabilities(CapabilitiesQuery),
    UpdateCapabilities(UpdateCapabilitiesQuery),
    FetchAdminMetadata,
}

/// Releases a gated response.
#[derive(Debug)]
pub struct Gate {
    tx: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.tx.send(());
    }
}

struct Scripted<T> {
    result: TransportResult<T>,
    gate: Option<oneshot::Receiver<()>>,
}

type Script<T> = Mutex<VecDeque<Scripted<T>>>;

fn push<T>(script: &Script<T>, result: TransportResult<T>) {
    script.lock().unwrap().push_back(Scripted { result, gate: None });
}

fn push_gated<T>(script: &Script<T>, result: TransportResult<T>) -> Gate {
    let (tx, rx) = oneshot::channel();
    script.lock().unwrap().push_back(Scripted {
        result,
        gate: Some(rx),
    });
    Gate { tx }
}

/// Pop the next scripted response, waiting on its gate if it has one.
async fn next<T>(script: &Script<T>) -> Option<TransportResult<T>> {
    let scripted = script.lock().unwrap().pop_front()?;
    if let Some(gate) = scripted.gate {
        // A dropped gate releases the response as well
        let _ = gate.await;
    }
    Some(scripted.result)
}

/// In-memory [`LayerAdminTransport`] for tests.
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    layers: Mutex<BTreeMap<LayerId, WireLayer>>,
    next_id: Mutex<i64>,
    metadata: Mutex<AdminMetadata>,
    fetch_layer: Script<WireLayer>,
    save_layer: Script<SaveResponse>,
    delete_layer: Script<()>,
    capabilities: Script<CapabilityCatalog>,
    update_capabilities: Script<UpdateCapabilitiesResponse>,
    admin_metadata: Script<AdminMetadata>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Empty backend serving [`fixtures::admin_metadata`].
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            layers: Mutex::new(BTreeMap::new()),
            next_id: Mutex::new(FIRST_ASSIGNED_ID),
            metadata: Mutex::new(fixtures::admin_metadata()),
            fetch_layer: Mutex::new(VecDeque::new()),
            save_layer: Mutex::new(VecDeque::new()),
            delete_layer: Mutex::new(VecDeque::new()),
            capabilities: Mutex::new(VecDeque::new()),
            update_capabilities: Mutex::new(VecDeque::new()),
            admin_metadata: Mutex::new(VecDeque::new()),
        }
    }

    /// Store a layer as if it had been saved earlier.
    pub fn with_layer(self, layer: WireLayer) -> Self {
        if let Some(id) = layer.id {
            self.layers.lock().unwrap().insert(id, layer);
        }
        self
    }

    pub fn with_metadata(self, metadata: AdminMetadata) -> Self {
        *self.metadata.lock().unwrap() = metadata;
        self
    }

    // ========================================================================
    // Scripting
    // ========================================================================

    pub fn push_fetch_layer(&self, result: TransportResult<WireLayer>) {
        push(&self.fetch_layer, result);
    }

    pub fn push_fetch_layer_gated(&self, result: TransportResult<WireLayer>) -> Gate {
        push_gated(&self.fetch_layer, result)
    }

    pub fn push_save_layer(&self, result: TransportResult<SaveResponse>) {
        push(&self.save_layer, result);
    }

    pub fn push_delete_layer(&self, result: TransportResult<()>) {
        push(&self.delete_layer, result);
    }

    pub fn push_delete_layer_gated(&self, result: TransportResult<()>) -> Gate {
        push_gated(&self.delete_layer, result)
    }

    pub fn push_capabilities(&self, result: TransportResult<CapabilityCatalog>) {
        push(&self.capabilities, result);
    }

    pub fn push_capabilities_gated(&self, result: TransportResult<CapabilityCatalog>) -> Gate {
        push_gated(&self.capabilities, result)
    }

    pub fn push_update_capabilities(&self, result: TransportResult<UpdateCapabilitiesResponse>) {
        push(&self.update_capabilities, result);
    }

    pub fn push_admin_metadata(&self, result: TransportResult<AdminMetadata>) {
        push(&self.admin_metadata, result);
    }

    pub fn push_admin_metadata_gated(&self, result: TransportResult<AdminMetadata>) -> Gate {
        push_gated(&self.admin_metadata, result)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Capability queries in the order they were made.
    pub fn capability_queries(&self) -> Vec<CapabilitiesQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::FetchCapabilities(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    /// Layers sent to `save_layer`.
    pub fn saved_layers(&self) -> Vec<WireLayer> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SaveLayer(layer) => Some(layer),
                _ => None,
            })
            .collect()
    }

    pub fn stored_layer(&self, id: LayerId) -> Option<WireLayer> {
        self.layers.lock().unwrap().get(&id).cloned()
    }

    /// Wait until at least `count` calls have been recorded.
    ///
    /// Panics after a second so a broken test fails instead of hanging.
    pub async fn wait_for_calls(&self, count: usize) {
        let wait = async {
            while self.call_count() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        };
        if tokio::time::timeout(Duration::from_secs(1), wait).await.is_err() {
            panic!(
                "expected {} transport calls, saw {:?}",
                count,
                self.calls()
            );
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl LayerAdminTransport for MockTransport {
    async fn fetch_layer(&self, id: LayerId) -> TransportResult<WireLayer> {
        self.record(Call::FetchLayer(id));
        if let Some(result) = next(&self.fetch_layer).await {
            return result;
        }
        self.stored_layer(id).ok_or(TransportError::NotFound)
    }

    async fn save_layer(&self, layer: &WireLayer) -> TransportResult<SaveResponse> {
        self.record(Call::SaveLayer(layer.clone()));
        if let Some(result) = next(&self.save_layer).await {
            return result;
        }

        let id = match layer.id {
            Some(id) => id,
            None => {
                let mut next_id = self.next_id.lock().unwrap();
                let id = LayerId(*next_id);
                *next_id += 1;
                id
            }
        };
        let mut stored = layer.clone();
        stored.id = Some(id);
        self.layers.lock().unwrap().insert(id, stored);
        Ok(SaveResponse {
            id,
            extra: Map::new(),
        })
    }

    async fn delete_layer(&self, layer: &WireLayer) -> TransportResult<()> {
        self.record(Call::DeleteLayer(layer.clone()));
        if let Some(result) = next(&self.delete_layer).await {
            return result;
        }
        match layer.id {
            Some(id) => self
                .layers
                .lock()
                .unwrap()
                .remove(&id)
                .map(|_| ())
                .ok_or(TransportError::NotFound),
            None => Ok(()),
        }
    }

    async fn fetch_capabilities(
        &self,
        query: &CapabilitiesQuery,
    ) -> TransportResult<CapabilityCatalog> {
        self.record(Call::FetchCapabilities(query.clone()));
        match next(&self.capabilities).await {
            Some(result) => result,
            None => Err(TransportError::Status {
                status: 500,
                message: "no scripted capabilities".to_string(),
            }),
        }
    }

    async fn update_capabilities(
        &self,
        query: &UpdateCapabilitiesQuery,
    ) -> TransportResult<UpdateCapabilitiesResponse> {
        self.record(Call::UpdateCapabilities(query.clone()));
        match next(&self.update_capabilities).await {
            Some(result) => result,
            None => Ok(UpdateCapabilitiesResponse::default()),
        }
    }

    async fn fetch_admin_metadata(&self) -> TransportResult<AdminMetadata> {
        self.record(Call::FetchAdminMetadata);
        if let Some(result) = next(&self.admin_metadata).await {
            return result;
        }
        Ok(self.metadata.lock().unwrap().clone())
    }
}
