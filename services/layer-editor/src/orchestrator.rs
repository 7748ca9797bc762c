//! The layer wizard orchestrator.
//!
//! [`LayerEditor`] owns one edit session: the draft, the capability catalog
//! of the service being configured, the wizard flags and the in-flight
//! counter. Every operation replaces state under a short-lived lock and
//! publishes a [`WizardSnapshot`]; the lock is never held across an await.
//!
//! Asynchronous results are applied only if the state they were started
//! against is still current. Capability negotiations compare a negotiation
//! generation, bumped whenever the (type, version, url, credentials) tuple
//! changes or a new negotiation starts. Layer loads and saves compare a
//! session generation, bumped whenever the draft's identity changes. Stale
//! results are dropped but still count as finished for the loading flag.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use capabilities_client::{
    AdminMetadata, CapabilitiesQuery, CapabilityCatalog, CapabilityNegotiator,
    LayerAdminTransport, LayerUpdate, NegotiationOutcome, UpdateReport,
};
use layer_common::{
    validate, ComposingModel, EditorError, EditorResult, FieldCatalog, FieldId, JsonOption,
    LayerDraft, LayerId, Message, Role, ValidationContext, ValidationError, WireLayer,
};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::metrics::{EditorMetrics, SaveResult};
use crate::state::{InFlight, WizardSnapshot, WizardState, DEFAULT_TAB};

/// Mutable state of one edit session.
#[derive(Debug)]
struct Session {
    draft: LayerDraft,
    catalog: CapabilityCatalog,
    fields: FieldCatalog,
    versions: Vec<String>,
    property_fields: Vec<FieldId>,
    wizard: WizardState,
    in_flight: InFlight,
    metadata: Option<AdminMetadata>,
    capabilities_skipped: bool,
    negotiation_generation: u64,
    session_generation: u64,
}

impl Session {
    fn new(fields: FieldCatalog) -> Self {
        Self {
            draft: LayerDraft::default(),
            catalog: CapabilityCatalog::default(),
            fields,
            versions: Vec::new(),
            property_fields: Vec::new(),
            wizard: WizardState::default(),
            in_flight: InFlight::default(),
            metadata: None,
            capabilities_skipped: false,
            negotiation_generation: 0,
            session_generation: 0,
        }
    }

    fn roles(&self) -> &[Role] {
        self.metadata
            .as_ref()
            .map(|m| m.roles.as_slice())
            .unwrap_or_default()
    }

    fn edit_draft(&mut self, f: impl FnOnce(LayerDraft) -> LayerDraft) {
        let draft = std::mem::take(&mut self.draft);
        self.draft = f(draft);
    }

    fn refresh_fields(&mut self) {
        self.property_fields = self
            .fields
            .fields_for(&self.draft.layer_type, self.draft.version.as_deref());
    }

    fn refresh_versions(&mut self) {
        self.versions = self.fields.versions_for(&self.draft.layer_type);
    }

    fn bump_negotiation(&mut self) -> u64 {
        self.negotiation_generation += 1;
        self.negotiation_generation
    }

    /// The draft's identity changed; pending loads, saves and negotiations
    /// belong to the old one.
    fn bump_session(&mut self) -> u64 {
        self.bump_negotiation();
        self.session_generation += 1;
        self.session_generation
    }

    fn reset(&mut self) {
        self.bump_session();
        self.draft = LayerDraft::default().with_initialized_permissions(self.roles());
        self.catalog = CapabilityCatalog::default();
        self.versions.clear();
        self.property_fields.clear();
        self.wizard.tab = DEFAULT_TAB.to_string();
        self.capabilities_skipped = false;
    }

    /// Replace the draft with a backend copy. Returns the backend's one-shot
    /// warning as a message.
    fn load_wire(&mut self, wire: WireLayer, preserved: Option<Value>) -> Option<Message> {
        let (draft, warn) = LayerDraft::from_wire(wire, preserved);
        self.draft = draft.with_initialized_permissions(self.roles());
        self.refresh_versions();
        self.refresh_fields();
        warn.map(|key| Message::warning(format!("messages.{}", key)))
    }

    fn capabilities_query(&self) -> CapabilitiesQuery {
        CapabilitiesQuery {
            layer_type: self.draft.layer_type.clone(),
            version: self.draft.version.clone(),
            url: self.draft.url.clone(),
            username: self.draft.username.clone(),
            password: self.draft.password.clone(),
        }
    }

    fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            draft: self.draft.clone(),
            capabilities: self.catalog.clone(),
            versions: self.versions.clone(),
            property_fields: self.property_fields.clone(),
            wizard: WizardState {
                loading: self.in_flight.is_loading(),
                ..self.wizard.clone()
            },
            metadata: self.metadata.clone(),
            capabilities_skipped: self.capabilities_skipped,
        }
    }
}

/// Fields whose granted values differ between the edited draft and the
/// backend's copy after a save.
fn diverged_fields(before: &LayerDraft, after: &LayerDraft) -> Vec<&'static str> {
    fn granted(draft: &LayerDraft) -> BTreeMap<&str, &BTreeSet<String>> {
        draft
            .role_permissions
            .iter()
            .filter(|(_, granted)| !granted.is_empty())
            .map(|(role, granted)| (role.as_str(), granted))
            .collect()
    }

    let mut fields = Vec::new();
    if before.groups != after.groups {
        fields.push("groups");
    }
    if granted(before) != granted(after) {
        fields.push("role_permissions");
    }
    fields
}

/// Drives creation and editing of one layer.
pub struct LayerEditor<T: LayerAdminTransport + ?Sized> {
    transport: Arc<T>,
    negotiator: CapabilityNegotiator<T>,
    config: EditorConfig,
    session_id: Uuid,
    session: Mutex<Session>,
    snapshot_tx: watch::Sender<WizardSnapshot>,
    metrics: Arc<EditorMetrics>,
}

impl<T: LayerAdminTransport + ?Sized> LayerEditor<T> {
    pub fn new(transport: Arc<T>, config: EditorConfig, fields: FieldCatalog) -> Self {
        let session = Session::new(fields);
        let (snapshot_tx, _) = watch::channel(session.snapshot());
        let session_id = Uuid::new_v4();
        info!(session = %session_id, "Layer editor session started");

        Self {
            negotiator: CapabilityNegotiator::new(Arc::clone(&transport)),
            transport,
            config,
            session_id,
            session: Mutex::new(session),
            snapshot_tx,
            metrics: Arc::new(EditorMetrics::new()),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EditorMetrics {
        &self.metrics
    }

    /// Current state.
    pub fn snapshot(&self) -> WizardSnapshot {
        self.lock().snapshot()
    }

    /// Validation errors of the current draft.
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        let session = self.lock();
        let ctx = ValidationContext {
            catalog: &session.fields,
            default_language: self.config.default_language(),
        };
        validate(&session.draft, &ctx)
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<WizardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a change to the session and publish the new state.
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.lock();
        let result = f(&mut session);
        self.snapshot_tx.send_replace(session.snapshot());
        result
    }

    // ========================================================================
    // Service and type selection
    // ========================================================================

    /// Select the layer type. Url and credentials are kept.
    pub fn set_type(&self, layer_type: impl Into<String>) {
        let layer_type = layer_type.into();
        self.update(|s| {
            s.bump_negotiation();
            s.edit_draft(|d| d.with_type(layer_type.as_str()));
            s.refresh_versions();
            s.refresh_fields();
        });
        info!(session = %self.session_id, layer_type = %layer_type, "Layer type selected");
    }

    /// Set the version without negotiating.
    pub fn set_version(&self, version: Option<String>) {
        self.update(|s| {
            s.bump_negotiation();
            s.edit_draft(|d| d.with_version(version));
            s.refresh_fields();
        });
    }

    /// Select a protocol version and negotiate capabilities when the type
    /// needs them.
    ///
    /// `None` steps back to version selection: name and version are cleared
    /// together with the catalog, and a skipped negotiation is re-enabled.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn version_selected(&self, version: Option<String>) -> EditorResult<()> {
        let negotiate = self.update(|s| {
            s.bump_negotiation();
            if version.is_none() {
                s.capabilities_skipped = false;
            }
            let has_version = version.as_deref().is_some_and(|v| !v.is_empty());
            s.edit_draft(|d| d.with_version(version));
            s.refresh_fields();

            if !has_version {
                s.catalog = CapabilityCatalog::default();
                return false;
            }
            if s.capabilities_skipped {
                debug!("Capability negotiation skipped for this session");
                return false;
            }
            s.property_fields.contains(&FieldId::Capabilities)
        });

        if negotiate {
            self.fetch_capabilities().await
        } else {
            Ok(())
        }
    }

    pub fn set_layer_url(&self, url: Option<String>) {
        self.update(|s| {
            s.bump_negotiation();
            s.edit_draft(|d| d.with_url(url));
        });
    }

    pub fn set_username(&self, username: Option<String>) {
        self.update(|s| {
            s.bump_negotiation();
            s.edit_draft(|d| d.with_username(username));
        });
    }

    pub fn set_password(&self, password: Option<String>) {
        self.update(|s| {
            s.bump_negotiation();
            s.edit_draft(|d| d.with_password(password));
        });
    }

    pub fn set_layer_name(&self, name: Option<String>) {
        self.update(|s| s.edit_draft(|d| d.with_name(name)));
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    /// Negotiate capabilities for the draft's current service settings.
    ///
    /// Supersedes any negotiation still in flight. Replaces the messages:
    /// none on success, exactly one on failure. A 401 also opens the
    /// credentials section.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn fetch_capabilities(&self) -> EditorResult<()> {
        let (generation, query) = self.update(|s| {
            let generation = s.bump_negotiation();
            s.in_flight.start();
            (generation, s.capabilities_query())
        });

        let outcome = self.negotiator.negotiate(&query).await;

        self.update(|s| {
            s.in_flight.finish();
            if s.negotiation_generation != generation {
                debug!(
                    generation,
                    current = s.negotiation_generation,
                    "Dropping superseded capabilities"
                );
                self.metrics.record_stale_result("negotiation");
                return Err(EditorError::Superseded);
            }

            s.wizard.messages = outcome.message().into_iter().collect();
            match outcome {
                NegotiationOutcome::Success(catalog) => {
                    s.catalog = catalog;
                    s.refresh_fields();
                    Ok(())
                }
                NegotiationOutcome::AuthRequired => {
                    s.wizard.credentials_collapse_open = true;
                    Err(EditorError::AuthRequired)
                }
                other => other.into_result().map(|_| ()),
            }
        })
    }

    /// Fill the draft from a layer advertised in the catalog.
    ///
    /// Selecting a name the catalog does not advertise is a caller bug: it
    /// is logged and leaves the state unchanged.
    pub fn layer_selected(&self, name: &str) -> EditorResult<()> {
        self.update(|s| {
            let Some(found) = s.catalog.layer(name).cloned() else {
                error!(session = %self.session_id, name, "Layer not in capabilities");
                return Err(EditorError::InvariantViolation(format!(
                    "layer '{}' is not in the capabilities",
                    name
                )));
            };
            let wire = s.draft.to_wire().overlay(&found)?;
            let preserved = s.draft.capabilities.clone();
            let (draft, _) = LayerDraft::from_wire(wire, preserved);
            s.draft = draft.with_initialized_permissions(s.roles());
            s.refresh_fields();
            info!(session = %self.session_id, name, "Layer selected from capabilities");
            Ok(())
        })
    }

    /// Configure the layer by hand, bypassing negotiation for the rest of
    /// the session.
    pub fn skip_capabilities(&self) {
        self.update(|s| {
            s.bump_negotiation();
            s.capabilities_skipped = true;
            s.catalog = CapabilityCatalog::default();
            s.edit_draft(|d| {
                let name = d.name.clone().unwrap_or_default();
                let version = d.version.clone().unwrap_or_default();
                d.with_name(Some(name)).with_version(Some(version))
            });
            s.refresh_fields();
        });
        info!(session = %self.session_id, "Capabilities skipped");
    }

    /// Start another layer from the same service. The current layer is
    /// listed as already configured; url, version and credentials are kept.
    pub fn add_new_from_same_service(&self) -> EditorResult<()> {
        self.update(|s| {
            let Some(name) = s.draft.name.clone().filter(|n| !n.is_empty()) else {
                error!(session = %self.session_id, "No layer selected to add another from");
                return Err(EditorError::InvariantViolation(
                    "no layer selected".to_string(),
                ));
            };
            let wire = s.draft.to_wire();
            s.catalog.mark_existing(name.as_str(), &wire);
            s.session_generation += 1;
            s.edit_draft(LayerDraft::without_identity);
            info!(session = %self.session_id, name = %name, "Adding another layer from the same service");
            Ok(())
        })
    }

    /// Refresh the saved layer's capabilities on the backend.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn update_capabilities(&self) -> EditorResult<UpdateReport> {
        let (generation, id) = self.update(|s| match s.draft.id {
            Some(id) => {
                s.in_flight.start();
                Ok((s.session_generation, id))
            }
            None => {
                error!("Capabilities can only be refreshed for saved layers");
                Err(EditorError::InvariantViolation("layer is not saved".to_string()))
            }
        })?;

        let result = self.negotiator.update(&[id], &self.config.map_srs).await;

        self.update(|s| {
            s.in_flight.finish();
            if s.session_generation != generation {
                debug!(id = %id, "Dropping capabilities of a replaced layer");
                self.metrics.record_stale_result("update_capabilities");
                return Err(EditorError::Superseded);
            }
            match result {
                Ok(report) => {
                    s.wizard.messages = vec![report.message_for(id)];
                    if let Some(LayerUpdate::Updated {
                        capabilities: Some(capabilities),
                    }) = report.get(id)
                    {
                        s.draft.capabilities = Some(capabilities.clone());
                    }
                    Ok(report)
                }
                Err(err) => {
                    s.wizard.messages = vec![Message::error("capabilities.updateFailed")];
                    Err(err)
                }
            }
        })
    }

    // ========================================================================
    // Draft edits
    // ========================================================================

    /// Apply a leaf edit. Required fields are not recomputed.
    pub fn edit(&self, f: impl FnOnce(LayerDraft) -> LayerDraft) {
        self.update(|s| s.edit_draft(f));
    }

    pub fn set_option_json(&self, option: JsonOption, raw: impl Into<String>) {
        let raw = raw.into();
        self.update(|s| s.edit_draft(|d| d.with_option_json(option, raw)));
    }

    pub fn set_attributes(&self, attributes: Map<String, Value>) {
        self.update(|s| s.edit_draft(|d| d.with_attributes(attributes)));
    }

    pub fn set_attributes_json(&self, raw: impl Into<String>) {
        let raw = raw.into();
        self.update(|s| s.edit_draft(|d| d.with_attributes_json(raw)));
    }

    pub fn set_forced_srs(&self, forced_srs: Vec<String>) {
        self.update(|s| s.edit_draft(|d| d.with_forced_srs(forced_srs)));
    }

    pub fn set_min_and_max_scale(&self, minscale: Option<f64>, maxscale: Option<f64>) {
        self.update(|s| s.edit_draft(|d| d.with_scales(minscale, maxscale)));
    }

    /// Set the scale limits from slider positions on the map's zoom levels.
    /// Positions outside the table mean no restriction.
    pub fn set_scale_zoom_range(&self, min_zoom: i32, max_zoom: i32) {
        let range = self.config.scales.range_for_zoom(min_zoom, max_zoom);
        self.set_min_and_max_scale(range.min, range.max);
    }

    pub fn set_group(&self, checked: bool, group_id: i64) {
        self.update(|s| s.edit_draft(|d| d.with_group(checked, group_id)));
    }

    pub fn toggle_permission(&self, role: &str, permission: &str) {
        self.update(|s| s.edit_draft(|d| d.toggle_permission(role, permission)));
    }

    pub fn set_permission_for_all(&self, permission: &str, enabled: bool) {
        self.update(|s| s.edit_draft(|d| d.with_permission_for_all(permission, enabled)));
    }

    /// Add or replace a layer type at runtime.
    pub fn register_layer_type(&self, layer_type: impl Into<String>, model: ComposingModel) {
        let layer_type = layer_type.into();
        self.update(|s| {
            s.fields.register(layer_type.as_str(), model);
            if s.draft.layer_type == layer_type {
                s.refresh_versions();
                s.refresh_fields();
            }
        });
    }

    // ========================================================================
    // Wizard flags
    // ========================================================================

    pub fn set_tab(&self, tab: impl Into<String>) {
        let tab = tab.into();
        self.update(|s| s.wizard.tab = tab);
    }

    pub fn set_message(&self, message: Message) {
        self.set_messages(vec![message]);
    }

    pub fn set_messages(&self, messages: Vec<Message>) {
        self.update(|s| s.wizard.messages = messages);
    }

    pub fn clear_messages(&self) {
        self.update(|s| s.wizard.messages.clear());
    }

    pub fn clear_credentials_collapse(&self) {
        self.update(|s| s.wizard.credentials_collapse_open = false);
    }

    /// Start over with an empty draft.
    pub fn reset_layer(&self) {
        self.update(Session::reset);
    }

    /// Abandon the session locally. Results still in flight are dropped
    /// when they arrive.
    pub fn cancel(&self) {
        self.update(|s| {
            s.reset();
            s.wizard.messages.clear();
            s.wizard.credentials_collapse_open = false;
        });
        info!(session = %self.session_id, "Edit cancelled");
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Load roles, permission types and mandatory fields.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn fetch_admin_metadata(&self) -> EditorResult<()> {
        self.update(|s| s.in_flight.start());
        let result = self.transport.fetch_admin_metadata().await;

        self.update(|s| {
            s.in_flight.finish();
            match result {
                Ok(metadata) => {
                    for (layer_type, mandatory) in &metadata.layer_types {
                        s.fields.set_mandatory_fields(layer_type, mandatory.clone());
                    }
                    s.edit_draft(|d| d.with_initialized_permissions(&metadata.roles));
                    info!(
                        roles = metadata.roles.len(),
                        layer_types = metadata.layer_types.len(),
                        "Admin metadata loaded"
                    );
                    s.metadata = Some(metadata);
                    Ok(())
                }
                Err(err) => {
                    error!(error = %err, "Fetching roles and permission types failed");
                    s.wizard.messages =
                        vec![Message::error("messages.errorFetchUserRolesAndPermissionTypes")];
                    Err(err.into())
                }
            }
        })
    }

    /// Load a saved layer into the session; `None` starts a new layer.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn fetch_layer(&self, id: Option<LayerId>) -> EditorResult<()> {
        let Some(id) = id else {
            self.update(|s| {
                s.wizard.messages.clear();
                s.reset();
            });
            return Ok(());
        };

        let generation = self.update(|s| {
            s.wizard.messages.clear();
            s.in_flight.start();
            s.bump_session()
        });

        let result = self.transport.fetch_layer(id).await;

        self.update(|s| {
            s.in_flight.finish();
            if s.session_generation != generation {
                debug!(id = %id, "Dropping superseded layer load");
                self.metrics.record_stale_result("fetch_layer");
                return Err(EditorError::Superseded);
            }
            match result {
                Ok(wire) => {
                    if let Some(warning) = s.load_wire(wire, None) {
                        s.wizard.messages = vec![warning];
                    }
                    info!(id = %id, layer_type = %s.draft.layer_type, "Layer loaded");
                    Ok(())
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "Loading layer failed");
                    s.wizard.messages =
                        vec![Message::error("messages.errorFetchLayer").with_arg("id", id.0)];
                    Err(err.into())
                }
            }
        })
    }

    /// Validate and persist the draft, then reload it from the backend.
    ///
    /// Validation errors become messages and nothing is sent. After a
    /// successful save the backend's copy replaces the draft; if it lost
    /// groups or permissions the user is warned. Edits made while the save
    /// was in flight are kept and only the saved id is applied.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn save_layer(&self) -> EditorResult<LayerId> {
        let prepared = self.update(|s| {
            let ctx = ValidationContext {
                catalog: &s.fields,
                default_language: self.config.default_language(),
            };
            let errors = validate(&s.draft, &ctx);
            if !errors.is_empty() {
                s.wizard.messages = errors
                    .iter()
                    .map(|e| Message::error(e.message_key()))
                    .collect();
                return Err(EditorError::Validation(errors));
            }
            s.in_flight.start();
            Ok((s.session_generation, s.draft.clone()))
        });
        let (generation, pre_save) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                info!(error = %err, "Draft not saved");
                self.metrics.record_save(SaveResult::Invalid);
                return Err(err);
            }
        };

        let saved = match self.transport.save_layer(&pre_save.to_wire()).await {
            Ok(saved) => saved,
            Err(err) => {
                warn!(error = %err, "Saving layer failed");
                self.metrics.record_save(SaveResult::Failed);
                return self.update(|s| {
                    s.in_flight.finish();
                    s.wizard.messages = vec![Message::error("messages.saveFailed")];
                    Err(err.into())
                });
            }
        };
        self.metrics.record_save(SaveResult::Success);
        info!(id = %saved.id, "Layer saved");

        let reloaded = self.transport.fetch_layer(saved.id).await;

        self.update(|s| {
            s.in_flight.finish();
            if s.session_generation != generation {
                debug!(id = %saved.id, "Session replaced while saving, not reloading");
                self.metrics.record_stale_result("save_layer");
                return Ok(saved.id);
            }

            let mut messages = vec![Message::success("messages.saveSuccess")];
            if s.draft != pre_save {
                // edited while the save was in flight; keep the newer edits
                info!(id = %saved.id, "Draft edited during save, keeping local edits");
                s.draft.id = Some(saved.id);
                if let Ok(wire) = reloaded {
                    if let Some(key) = LayerDraft::from_wire(wire, None).1 {
                        messages.push(Message::warning(format!("messages.{}", key)));
                    }
                }
                messages.push(Message::warning("messages.editedDuringSave"));
                s.wizard.messages = messages;
                return Ok(saved.id);
            }
            match reloaded {
                Ok(wire) => {
                    if let Some(warning) = s.load_wire(wire, pre_save.capabilities.clone()) {
                        messages.push(warning);
                    }
                    let diverged = diverged_fields(&pre_save, &s.draft);
                    if !diverged.is_empty() {
                        warn!(id = %saved.id, fields = ?diverged, "Saved layer differs from the edited draft");
                        messages.push(
                            Message::warning("messages.savedLayerDiffers").with_arg("fields", diverged),
                        );
                    }
                }
                Err(err) => {
                    warn!(id = %saved.id, error = %err, "Reloading saved layer failed");
                    s.draft.id = Some(saved.id);
                    messages.push(
                        Message::warning("messages.errorFetchLayer").with_arg("id", saved.id.0),
                    );
                }
            }
            s.wizard.messages = messages;
            Ok(saved.id)
        })
    }

    /// Delete the layer on the backend. On success the session starts over.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub async fn delete_layer(&self) -> EditorResult<()> {
        let (generation, wire) = self.update(|s| {
            s.in_flight.start();
            (s.session_generation, s.draft.to_wire())
        });

        let result = self.transport.delete_layer(&wire).await;

        self.update(|s| {
            s.in_flight.finish();
            match result {
                Ok(()) => {
                    info!(id = ?wire.id, "Layer deleted");
                    if s.session_generation == generation {
                        s.reset();
                        s.wizard.messages = vec![Message::success("messages.deleteSuccess")];
                    }
                    Ok(())
                }
                Err(err) => {
                    warn!(id = ?wire.id, error = %err, "Deleting layer failed");
                    if s.session_generation == generation {
                        s.wizard.messages = vec![Message::error("messages.errorRemoveLayer")];
                    } else {
                        self.metrics.record_stale_result("delete_layer");
                    }
                    Err(err.into())
                }
            }
        })
    }
}
