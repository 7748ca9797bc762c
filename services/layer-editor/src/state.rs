//! Observable wizard state.

use capabilities_client::{AdminMetadata, CapabilityCatalog};
use layer_common::{FieldId, LayerDraft, Message};
use serde::Serialize;
use tracing::warn;

/// Tab shown when a session starts or is reset.
pub const DEFAULT_TAB: &str = "general";

/// UI-facing wizard flags and the notification queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub tab: String,
    pub credentials_collapse_open: bool,
    /// True while any asynchronous operation is outstanding
    pub loading: bool,
    pub messages: Vec<Message>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            tab: DEFAULT_TAB.to_string(),
            credentials_collapse_open: false,
            loading: false,
            messages: Vec::new(),
        }
    }
}

/// Count of outstanding asynchronous operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight(u32);

impl InFlight {
    pub fn start(&mut self) {
        self.0 += 1;
    }

    /// Mark one operation finished. A finish without a matching start is
    /// logged and ignored.
    pub fn finish(&mut self) {
        match self.0.checked_sub(1) {
            Some(count) => self.0 = count,
            None => warn!("Operation finished while none was in flight"),
        }
    }

    pub fn count(&self) -> u32 {
        self.0
    }

    pub fn is_loading(&self) -> bool {
        self.0 > 0
    }
}

/// Everything a UI needs to render the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub draft: LayerDraft,
    pub capabilities: CapabilityCatalog,
    /// Versions the draft's type supports
    pub versions: Vec<String>,
    /// Fields relevant for the draft's type and version
    pub property_fields: Vec<FieldId>,
    pub wizard: WizardState,
    pub metadata: Option<AdminMetadata>,
    /// Capability negotiation was skipped for this session
    pub capabilities_skipped: bool,
}

impl WizardSnapshot {
    pub fn has_field(&self, field: FieldId) -> bool {
        self.property_fields.contains(&field)
    }
}
