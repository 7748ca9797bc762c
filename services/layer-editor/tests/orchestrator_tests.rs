//! Integration tests for the layer editor orchestrator.
//!
//! These run the editor against the scripted in-memory backend from
//! test-utils. Gated responses decide the order in which concurrent
//! requests complete.

use std::sync::Arc;

use capabilities_client::TransportError;
use layer_common::{
    ComposingModel, EditorError, FieldCatalog, FieldId, JsonOption, LayerId, Message, ScaleTable,
};
use layer_editor::{EditorConfig, LayerEditor};
use serde_json::json;
use test_utils::fixtures::{self, urls};
use test_utils::{assert_has_message, assert_no_message, Call, MockTransport, FIRST_ASSIGNED_ID};

fn editor(mock: Arc<MockTransport>) -> Arc<LayerEditor<MockTransport>> {
    let config = EditorConfig {
        map_srs: fixtures::MAP_SRS.to_string(),
        scales: ScaleTable::new(fixtures::SCALES.to_vec()),
        ..EditorConfig::default()
    };
    Arc::new(LayerEditor::new(mock, config, FieldCatalog::builtin()))
}

/// Editor with a WMS service selected and no version yet.
fn wms_editor(mock: Arc<MockTransport>) -> Arc<LayerEditor<MockTransport>> {
    let editor = editor(mock);
    editor.set_type("wmslayer");
    editor.set_layer_url(Some(urls::WMS.to_string()));
    editor
}

// ============================================================================
// Type and version selection
// ============================================================================

#[tokio::test]
async fn test_selecting_version_negotiates_capabilities() {
    let mock = Arc::new(MockTransport::new());
    mock.push_capabilities(Ok(fixtures::catalog(&["tiles"])));
    let editor = editor(mock.clone());

    editor.set_type("wmtslayer");
    editor.set_layer_url(Some(urls::WMTS.to_string()));
    assert_eq!(editor.snapshot().versions, vec!["1.0.0"]);

    editor.version_selected(Some("1.0.0".to_string())).await.unwrap();

    let queries = mock.capability_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].layer_type, "wmtslayer");
    assert_eq!(queries[0].version.as_deref(), Some("1.0.0"));
    assert_eq!(queries[0].url.as_deref(), Some(urls::WMTS));

    let snapshot = editor.snapshot();
    assert!(snapshot.capabilities.contains_layer("tiles"));
    assert!(snapshot.has_field(FieldId::Capabilities));
    assert!(snapshot.wizard.messages.is_empty());
    assert!(!snapshot.wizard.loading);
}

#[tokio::test]
async fn test_type_without_capabilities_does_not_negotiate() {
    let mock = Arc::new(MockTransport::new());
    let editor = editor(mock.clone());
    editor.register_layer_type("tiles3dlayer", ComposingModel::new(&[FieldId::Url], &["1.0"]));

    editor.set_type("tiles3dlayer");
    editor.version_selected(Some("1.0".to_string())).await.unwrap();

    assert_eq!(mock.call_count(), 0);
    let snapshot = editor.snapshot();
    assert_eq!(snapshot.versions, vec!["1.0"]);
    assert_eq!(snapshot.property_fields, vec![FieldId::Url]);
    assert_eq!(snapshot.draft.version.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn test_registering_type_refreshes_current_draft() {
    let mock = Arc::new(MockTransport::new());
    let editor = editor(mock);

    editor.set_type("tiles3dlayer");
    assert!(editor.snapshot().versions.is_empty());

    editor.register_layer_type("tiles3dlayer", ComposingModel::new(&[FieldId::Url], &["1.0"]));
    let snapshot = editor.snapshot();
    assert_eq!(snapshot.versions, vec!["1.0"]);
    assert_eq!(snapshot.property_fields, vec![FieldId::Url]);
}

#[tokio::test]
async fn test_stepping_back_clears_version_name_and_catalog() {
    let mock = Arc::new(MockTransport::new());
    mock.push_capabilities(Ok(fixtures::catalog(&["roads"])));
    let editor = wms_editor(mock.clone());

    editor.version_selected(Some("1.3.0".to_string())).await.unwrap();
    editor.layer_selected("roads").unwrap();

    editor.version_selected(None).await.unwrap();

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.version, None);
    assert_eq!(snapshot.draft.name, None);
    assert!(snapshot.capabilities.layers.is_empty());
    assert_eq!(snapshot.draft.url.as_deref(), Some(urls::WMS));
    assert_eq!(mock.capability_queries().len(), 1);
}

// ============================================================================
// Capability negotiation
// ============================================================================

#[tokio::test]
async fn test_auth_required_opens_credentials() {
    let mock = Arc::new(MockTransport::new());
    mock.push_capabilities(Err(TransportError::status(401)));
    let editor = wms_editor(mock.clone());
    editor.set_version(Some("1.3.0".to_string()));
    let before = editor.snapshot().draft;

    let result = editor.fetch_capabilities().await;
    assert!(matches!(result, Err(EditorError::AuthRequired)));

    let snapshot = editor.snapshot();
    assert!(snapshot.wizard.credentials_collapse_open);
    assert_eq!(
        snapshot.wizard.messages,
        vec![Message::warning("messages.unauthorizedErrorFetchCapabilities")]
    );
    assert_eq!(snapshot.draft, before);
    assert!(snapshot.capabilities.layers.is_empty());
    assert!(!snapshot.wizard.loading);
}

#[tokio::test]
async fn test_retry_with_credentials() {
    let mock = Arc::new(MockTransport::new());
    mock.push_capabilities(Err(TransportError::status(401)));
    mock.push_capabilities(Ok(fixtures::catalog(&["roads"])));
    let editor = wms_editor(mock.clone());

    let _ = editor.version_selected(Some("1.3.0".to_string())).await;
    editor.set_username(Some("admin".to_string()));
    editor.set_password(Some("secret".to_string()));
    editor.fetch_capabilities().await.unwrap();
    editor.clear_credentials_collapse();

    let queries = mock.capability_queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].username, None);
    assert_eq!(queries[1].username.as_deref(), Some("admin"));
    assert_eq!(queries[1].password.as_deref(), Some("secret"));

    let snapshot = editor.snapshot();
    assert!(snapshot.capabilities.contains_layer("roads"));
    assert!(!snapshot.wizard.credentials_collapse_open);
    // the success replaces the warning
    assert!(snapshot.wizard.messages.is_empty());
}

#[tokio::test]
async fn test_negotiation_failures_produce_one_message() {
    let cases = [
        (TransportError::Timeout, "messages.timeoutErrorFetchCapabilities"),
        (TransportError::status(400), "messages.connectionErrorFetchCapabilities"),
        (TransportError::status(417), "messages.parsingErrorFetchCapabilities"),
        (TransportError::status(500), "messages.errorFetchCapabilities"),
    ];

    for (error, key) in cases {
        let mock = Arc::new(MockTransport::new());
        mock.push_capabilities(Err(error));
        let editor = wms_editor(mock);

        assert!(editor.version_selected(Some("1.3.0".to_string())).await.is_err());

        let messages = editor.snapshot().wizard.messages;
        assert_eq!(messages.len(), 1, "{}", key);
        assert_eq!(messages[0].key, key);
        assert!(!editor.snapshot().wizard.credentials_collapse_open);
    }
}

#[tokio::test]
async fn test_late_response_of_superseded_negotiation_is_dropped() {
    let mock = Arc::new(MockTransport::new());
    let gate_a = mock.push_capabilities_gated(Ok(fixtures::catalog(&["from_a"])));
    mock.push_capabilities(Ok(fixtures::catalog(&["from_b"])));
    let editor = editor(mock.clone());
    editor.set_type("wfslayer");
    editor.set_layer_url(Some(urls::WFS.to_string()));

    let first = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.version_selected(Some("1.1.0".to_string())).await })
    };
    mock.wait_for_calls(1).await;
    assert!(editor.snapshot().wizard.loading);

    editor.version_selected(Some("2.0.0".to_string())).await.unwrap();
    assert!(editor.snapshot().capabilities.contains_layer("from_b"));

    gate_a.release();
    let result = first.await.unwrap();
    assert!(matches!(result, Err(EditorError::Superseded)));

    let snapshot = editor.snapshot();
    assert!(snapshot.capabilities.contains_layer("from_b"));
    assert!(!snapshot.capabilities.contains_layer("from_a"));
    assert_eq!(snapshot.draft.version.as_deref(), Some("2.0.0"));
    assert!(!snapshot.wizard.loading);
    assert_eq!(editor.metrics().stale_results(), 1);
}

#[tokio::test]
async fn test_changing_url_drops_pending_negotiation() {
    let mock = Arc::new(MockTransport::new());
    let gate = mock.push_capabilities_gated(Err(TransportError::status(401)));
    let editor = wms_editor(mock.clone());

    let pending = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.version_selected(Some("1.3.0".to_string())).await })
    };
    mock.wait_for_calls(1).await;
    editor.set_layer_url(Some(urls::OTHER_WFS.to_string()));

    gate.release();
    assert!(matches!(pending.await.unwrap(), Err(EditorError::Superseded)));

    // the 401 belonged to the old url
    let snapshot = editor.snapshot();
    assert!(!snapshot.wizard.credentials_collapse_open);
    assert_no_message!(
        snapshot.wizard.messages,
        "messages.unauthorizedErrorFetchCapabilities"
    );
}

#[tokio::test]
async fn test_loading_flag_visible_to_subscribers() {
    let mock = Arc::new(MockTransport::new());
    let gate = mock.push_capabilities_gated(Ok(fixtures::catalog(&["roads"])));
    let editor = wms_editor(mock.clone());
    let rx = editor.subscribe();

    let pending = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.version_selected(Some("1.3.0".to_string())).await })
    };
    mock.wait_for_calls(1).await;
    assert!(rx.borrow().wizard.loading);

    gate.release();
    pending.await.unwrap().unwrap();
    assert!(!rx.borrow().wizard.loading);
    assert!(rx.borrow().capabilities.contains_layer("roads"));
}

// ============================================================================
// Layer selection
// ============================================================================

#[tokio::test]
async fn test_layer_selected_fills_draft() {
    let mock = Arc::new(MockTransport::new());
    mock.push_capabilities(Ok(fixtures::catalog(&["roads", "rivers"])));
    let editor = wms_editor(mock);
    editor.version_selected(Some("1.3.0".to_string())).await.unwrap();

    editor.layer_selected("roads").unwrap();

    let draft = editor.snapshot().draft;
    assert_eq!(draft.name.as_deref(), Some("roads"));
    assert_eq!(draft.url.as_deref(), Some(urls::WMS));
    assert_eq!(draft.version.as_deref(), Some("1.3.0"));
    assert_eq!(
        draft.locale.get("en").and_then(|l| l.name.as_deref()),
        Some("roads (service title)")
    );
    assert_eq!(
        draft.capabilities.as_ref().and_then(|c| c.get("srs")),
        Some(&json!([fixtures::MAP_SRS, "EPSG:4326"]))
    );
}

#[tokio::test]
async fn test_unknown_layer_leaves_state_unchanged() {
    let mock = Arc::new(MockTransport::new());
    mock.push_capabilities(Ok(fixtures::catalog(&["roads"])));
    let editor = wms_editor(mock);
    editor.version_selected(Some("1.3.0".to_string())).await.unwrap();
    let before = editor.snapshot();

    let result = editor.layer_selected("missing");
    assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
    assert_eq!(editor.snapshot(), before);
}

#[tokio::test]
async fn test_add_new_from_same_service() {
    let mock = Arc::new(MockTransport::new());
    mock.push_capabilities(Ok(fixtures::catalog(&["roads", "rivers"])));
    let editor = wms_editor(mock.clone());
    editor.version_selected(Some("1.3.0".to_string())).await.unwrap();
    editor.layer_selected("roads").unwrap();
    editor.edit(|mut draft| {
        draft.id = Some(LayerId(5));
        draft
    });

    editor.add_new_from_same_service().unwrap();

    let snapshot = editor.snapshot();
    assert!(snapshot.capabilities.is_existing("roads"));
    assert_eq!(
        snapshot.capabilities.unconfigured_layers().collect::<Vec<_>>(),
        vec!["rivers"]
    );
    assert_eq!(snapshot.draft.name, None);
    assert_eq!(snapshot.draft.id, None);
    assert_eq!(snapshot.draft.url.as_deref(), Some(urls::WMS));
    assert_eq!(snapshot.draft.version.as_deref(), Some("1.3.0"));
    // no second negotiation
    assert_eq!(mock.capability_queries().len(), 1);
}

#[tokio::test]
async fn test_add_new_requires_selected_layer() {
    let mock = Arc::new(MockTransport::new());
    let editor = wms_editor(mock);

    let result = editor.add_new_from_same_service();
    assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
}

#[tokio::test]
async fn test_skip_disables_negotiation_until_stepping_back() {
    let mock = Arc::new(MockTransport::new());
    let editor = wms_editor(mock.clone());

    editor.skip_capabilities();
    let snapshot = editor.snapshot();
    assert!(snapshot.capabilities_skipped);
    assert_eq!(snapshot.draft.name.as_deref(), Some(""));
    assert_eq!(snapshot.draft.version.as_deref(), Some(""));

    editor.version_selected(Some("1.3.0".to_string())).await.unwrap();
    assert_eq!(mock.call_count(), 0);

    editor.version_selected(None).await.unwrap();
    assert!(!editor.snapshot().capabilities_skipped);
}

// ============================================================================
// Draft edits
// ============================================================================

#[tokio::test]
async fn test_scale_zoom_range() {
    let mock = Arc::new(MockTransport::new());
    let editor = wms_editor(mock);

    editor.set_scale_zoom_range(-1, 3);
    let draft = editor.snapshot().draft;
    assert_eq!(draft.minscale, None);
    assert_eq!(draft.maxscale, Some(566_929.0));

    editor.set_scale_zoom_range(1, fixtures::SCALES.len() as i32);
    let draft = editor.snapshot().draft;
    assert_eq!(draft.minscale, Some(2_834_647.0));
    assert_eq!(draft.maxscale, None);
}

#[tokio::test]
async fn test_invalid_option_json_blocks_save() {
    let mock = Arc::new(MockTransport::new());
    let editor = editor(mock.clone());
    editor.edit(|_| fixtures::valid_wms_draft());

    editor.set_option_json(JsonOption::Styles, "{\"default\": ");
    let result = editor.save_layer().await;

    assert!(matches!(result, Err(EditorError::Validation(_))));
    let snapshot = editor.snapshot();
    assert_has_message!(snapshot.wizard.messages, "validation.styles");
    assert!(mock.saved_layers().is_empty());
}

#[tokio::test]
async fn test_permission_edits() {
    let mock = Arc::new(MockTransport::new());
    let editor = editor(mock);
    editor.fetch_admin_metadata().await.unwrap();

    editor.set_permission_for_all("VIEW_LAYER", true);
    let draft = editor.snapshot().draft;
    assert!(draft.role_permissions["1"].contains("VIEW_LAYER"));
    assert!(draft.role_permissions["2"].contains("VIEW_LAYER"));

    editor.toggle_permission("2", "VIEW_LAYER");
    let draft = editor.snapshot().draft;
    assert!(!draft.role_permissions["2"].contains("VIEW_LAYER"));
}

// ============================================================================
// Saving
// ============================================================================

#[tokio::test]
async fn test_invalid_draft_is_not_sent() {
    let mock = Arc::new(MockTransport::new());
    let editor = wms_editor(mock.clone());
    editor.set_layer_url(None);

    let result = editor.save_layer().await;
    assert!(matches!(result, Err(EditorError::Validation(_))));

    let keys: Vec<String> = editor
        .snapshot()
        .wizard
        .messages
        .into_iter()
        .map(|m| m.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "validation.dataprovider",
            "validation.nopermissions",
            "validation.locale",
            "validation.url",
            "validation.name",
        ]
    );
    assert_eq!(mock.call_count(), 0);
    assert!(!editor.snapshot().wizard.loading);
}

#[tokio::test]
async fn test_save_reloads_layer() {
    let mock = Arc::new(MockTransport::new());
    let editor = editor(mock.clone());
    editor.edit(|_| fixtures::valid_wms_draft());

    let id = editor.save_layer().await.unwrap();
    assert_eq!(id, LayerId(FIRST_ASSIGNED_ID));

    let calls = mock.calls();
    assert!(matches!(calls[0], Call::SaveLayer(_)));
    assert_eq!(calls[1], Call::FetchLayer(id));

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, Some(id));
    assert_eq!(snapshot.draft.name.as_deref(), Some("roads"));
    assert_eq!(
        snapshot.wizard.messages,
        vec![Message::success("messages.saveSuccess")]
    );
    assert!(!snapshot.wizard.loading);
    assert!(mock.stored_layer(id).is_some());
}

#[tokio::test]
async fn test_save_keeps_session_capabilities() {
    let mock = Arc::new(MockTransport::new());
    // the backend does not echo capabilities back
    let mut reloaded = fixtures::valid_wms_draft().to_wire();
    reloaded.id = Some(LayerId(FIRST_ASSIGNED_ID));
    reloaded.capabilities = None;
    mock.push_fetch_layer(Ok(reloaded));
    let editor = editor(mock);
    editor.edit(|_| {
        let mut draft = fixtures::valid_wms_draft();
        draft.capabilities = Some(json!({"styles": ["default"]}));
        draft
    });

    editor.save_layer().await.unwrap();

    assert_eq!(
        editor.snapshot().draft.capabilities,
        Some(json!({"styles": ["default"]}))
    );
}

#[tokio::test]
async fn test_save_surfaces_backend_warning() {
    let mock = Arc::new(MockTransport::new());
    let mut reloaded = fixtures::valid_wms_draft().to_wire();
    reloaded.id = Some(LayerId(FIRST_ASSIGNED_ID));
    reloaded.warn = Some("updateCapabilitiesFail".to_string());
    mock.push_fetch_layer(Ok(reloaded));
    let editor = editor(mock);
    editor.edit(|_| fixtures::valid_wms_draft());

    editor.save_layer().await.unwrap();

    let messages = editor.snapshot().wizard.messages;
    assert_eq!(
        messages,
        vec![
            Message::success("messages.saveSuccess"),
            Message::warning("messages.updateCapabilitiesFail"),
        ]
    );
}

#[tokio::test]
async fn test_save_reports_divergence() {
    let mock = Arc::new(MockTransport::new());
    let mut reloaded = fixtures::valid_wms_draft().to_wire();
    reloaded.id = Some(LayerId(FIRST_ASSIGNED_ID));
    reloaded.groups.clear();
    mock.push_fetch_layer(Ok(reloaded));
    let editor = editor(mock);
    editor.edit(|_| fixtures::valid_wms_draft());

    editor.save_layer().await.unwrap();

    let snapshot = editor.snapshot();
    assert!(snapshot.draft.groups.is_empty());
    let divergence = snapshot
        .wizard
        .messages
        .iter()
        .find(|m| m.key == "messages.savedLayerDiffers")
        .expect("divergence warning");
    assert_eq!(divergence.args.get("fields"), Some(&json!(["groups"])));
}

#[tokio::test]
async fn test_save_failure_keeps_draft() {
    let mock = Arc::new(MockTransport::new());
    mock.push_save_layer(Err(TransportError::status(500)));
    let editor = editor(mock.clone());
    editor.edit(|_| fixtures::valid_wms_draft());
    let before = editor.snapshot().draft;

    let result = editor.save_layer().await;
    assert!(matches!(result, Err(EditorError::Persistence(_))));

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft, before);
    assert_eq!(
        snapshot.wizard.messages,
        vec![Message::error("messages.saveFailed")]
    );
    assert!(!snapshot.wizard.loading);
    assert_eq!(mock.call_count(), 1);
    assert_eq!(editor.metrics().save_failures.load(std::sync::atomic::Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_edits_during_save_survive_reload() {
    let mock = Arc::new(MockTransport::new());
    let mut reloaded = fixtures::valid_wms_draft().to_wire();
    reloaded.id = Some(LayerId(FIRST_ASSIGNED_ID));
    let gate = mock.push_fetch_layer_gated(Ok(reloaded));
    let editor = editor(mock.clone());
    editor.edit(|_| fixtures::valid_wms_draft());

    let pending = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.save_layer().await })
    };
    // save done, reload held
    mock.wait_for_calls(2).await;
    editor.edit(|draft| {
        draft
            .with_opacity(42)
            .with_legend_image(Some("https://example.com/legend.png".to_string()))
    });

    gate.release();
    let id = pending.await.unwrap().unwrap();

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, Some(id));
    assert_eq!(snapshot.draft.opacity, Some(42));
    assert_eq!(
        snapshot.draft.legend_image.as_deref(),
        Some("https://example.com/legend.png")
    );
    assert_has_message!(snapshot.wizard.messages, "messages.saveSuccess");
    assert_has_message!(snapshot.wizard.messages, "messages.editedDuringSave");
    assert!(!snapshot.wizard.loading);
}

#[tokio::test]
async fn test_failed_reload_keeps_saved_id() {
    let mock = Arc::new(MockTransport::new());
    mock.push_fetch_layer(Err(TransportError::status(500)));
    let editor = editor(mock);
    editor.edit(|_| fixtures::valid_wms_draft());

    let id = editor.save_layer().await.unwrap();

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, Some(id));
    assert_has_message!(snapshot.wizard.messages, "messages.saveSuccess");
    assert_has_message!(snapshot.wizard.messages, "messages.errorFetchLayer");
}

// ============================================================================
// Loading and deleting
// ============================================================================

#[tokio::test]
async fn test_fetch_layer_loads_saved_layer() {
    let mock = Arc::new(MockTransport::new().with_layer(fixtures::saved_wfs_layer(7)));
    let editor = editor(mock);

    editor.fetch_layer(Some(LayerId(7))).await.unwrap();

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, Some(LayerId(7)));
    assert_eq!(snapshot.draft.name.as_deref(), Some("buildings"));
    assert_eq!(snapshot.versions, vec!["1.1.0", "2.0.0", "3.0.0"]);
    assert!(snapshot.has_field(FieldId::Capabilities));
    assert!(snapshot.wizard.messages.is_empty());
}

#[tokio::test]
async fn test_fetch_missing_layer() {
    let mock = Arc::new(MockTransport::new());
    let editor = editor(mock);

    let result = editor.fetch_layer(Some(LayerId(9))).await;
    assert!(matches!(result, Err(EditorError::LayerNotFound(_))));

    let messages = editor.snapshot().wizard.messages;
    assert_eq!(
        messages,
        vec![Message::error("messages.errorFetchLayer").with_arg("id", 9)]
    );
}

#[tokio::test]
async fn test_fetch_none_starts_new_layer() {
    let mock = Arc::new(MockTransport::new().with_layer(fixtures::saved_wfs_layer(7)));
    let editor = editor(mock.clone());
    editor.fetch_layer(Some(LayerId(7))).await.unwrap();

    editor.fetch_layer(None).await.unwrap();

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, None);
    assert_eq!(snapshot.draft.layer_type, "");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_cancel_drops_pending_layer_load() {
    let mock = Arc::new(MockTransport::new());
    let gate = mock.push_fetch_layer_gated(Ok(fixtures::saved_wfs_layer(7)));
    let editor = editor(mock.clone());

    let pending = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.fetch_layer(Some(LayerId(7))).await })
    };
    mock.wait_for_calls(1).await;
    editor.cancel();

    gate.release();
    assert!(matches!(pending.await.unwrap(), Err(EditorError::Superseded)));

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, None);
    assert_eq!(snapshot.draft.layer_type, "");
    assert!(!snapshot.wizard.loading);
    assert_eq!(editor.metrics().stale_results(), 1);
}

#[tokio::test]
async fn test_delete_resets_session() {
    let mock = Arc::new(MockTransport::new().with_layer(fixtures::saved_wfs_layer(7)));
    let editor = editor(mock.clone());
    editor.fetch_layer(Some(LayerId(7))).await.unwrap();

    editor.delete_layer().await.unwrap();

    assert!(mock.stored_layer(LayerId(7)).is_none());
    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, None);
    assert_eq!(
        snapshot.wizard.messages,
        vec![Message::success("messages.deleteSuccess")]
    );
}

#[tokio::test]
async fn test_delete_failure_keeps_layer() {
    let mock = Arc::new(MockTransport::new().with_layer(fixtures::saved_wfs_layer(7)));
    mock.push_delete_layer(Err(TransportError::status(500)));
    let editor = editor(mock.clone());
    editor.fetch_layer(Some(LayerId(7))).await.unwrap();

    assert!(editor.delete_layer().await.is_err());

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.id, Some(LayerId(7)));
    assert_eq!(
        snapshot.wizard.messages,
        vec![Message::error("messages.errorRemoveLayer")]
    );
}

#[tokio::test]
async fn test_late_delete_failure_does_not_reach_new_session() {
    let mock = Arc::new(MockTransport::new().with_layer(fixtures::saved_wfs_layer(7)));
    let gate = mock.push_delete_layer_gated(Err(TransportError::status(500)));
    let editor = editor(mock.clone());
    editor.fetch_layer(Some(LayerId(7))).await.unwrap();

    let pending = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.delete_layer().await })
    };
    mock.wait_for_calls(2).await;
    editor.cancel();

    gate.release();
    assert!(pending.await.unwrap().is_err());

    let snapshot = editor.snapshot();
    assert_no_message!(snapshot.wizard.messages, "messages.errorRemoveLayer");
    assert!(snapshot.wizard.messages.is_empty());
    assert!(!snapshot.wizard.loading);
    assert_eq!(editor.metrics().stale_results(), 1);
}

// ============================================================================
// Admin metadata
// ============================================================================

#[tokio::test]
async fn test_admin_metadata_initializes_permissions() {
    let mock = Arc::new(MockTransport::new());
    let gate = mock.push_admin_metadata_gated(Ok(fixtures::admin_metadata()));
    let editor = editor(mock.clone());

    let pending = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.fetch_admin_metadata().await })
    };
    mock.wait_for_calls(1).await;
    assert!(editor.snapshot().wizard.loading);

    gate.release();
    pending.await.unwrap().unwrap();

    let snapshot = editor.snapshot();
    assert!(!snapshot.wizard.loading);
    assert_eq!(snapshot.metadata.as_ref().map(|m| m.roles.len()), Some(2));
    assert_eq!(
        snapshot.draft.role_permissions.keys().collect::<Vec<_>>(),
        vec!["1", "2"]
    );
}

#[tokio::test]
async fn test_admin_metadata_mandatory_fields_apply_to_validation() {
    let mut metadata = fixtures::admin_metadata();
    metadata.layer_types.insert(
        "wmslayer".to_string(),
        vec!["url".to_string(), "name".to_string(), "format.value".to_string()],
    );
    let mock = Arc::new(MockTransport::new().with_metadata(metadata));
    let editor = editor(mock);
    editor.fetch_admin_metadata().await.unwrap();
    editor.edit(|_| fixtures::valid_wms_draft());

    let keys: Vec<String> = editor
        .validation_errors()
        .iter()
        .map(|e| e.message_key())
        .collect();
    assert_eq!(keys, vec!["validation.format.value"]);
}

#[tokio::test]
async fn test_registering_type_keeps_backend_mandatory_fields() {
    let mock = Arc::new(MockTransport::new());
    let editor = editor(mock);
    editor.fetch_admin_metadata().await.unwrap();

    editor.register_layer_type(
        "wmslayer",
        ComposingModel::new(&[FieldId::Url, FieldId::Name], &["1.3.0"]),
    );
    editor.edit(|_| fixtures::valid_wms_draft().with_url(None));

    let keys: Vec<String> = editor
        .validation_errors()
        .iter()
        .map(|e| e.message_key())
        .collect();
    assert_eq!(keys, vec!["validation.url"]);
}

#[tokio::test]
async fn test_admin_metadata_failure() {
    let mock = Arc::new(MockTransport::new());
    mock.push_admin_metadata(Err(TransportError::status(503)));
    let editor = editor(mock);

    assert!(editor.fetch_admin_metadata().await.is_err());

    let snapshot = editor.snapshot();
    assert!(snapshot.metadata.is_none());
    assert!(!snapshot.wizard.loading);
    assert_eq!(
        snapshot.wizard.messages,
        vec![Message::error("messages.errorFetchUserRolesAndPermissionTypes")]
    );
}

// ============================================================================
// Capability refresh
// ============================================================================

#[tokio::test]
async fn test_update_capabilities_refreshes_draft() {
    let mock = Arc::new(MockTransport::new().with_layer(fixtures::saved_wfs_layer(7)));
    mock.push_update_capabilities(Ok(fixtures::update_success(7, json!({"styles": ["a"]}))));
    let editor = editor(mock.clone());
    editor.fetch_layer(Some(LayerId(7))).await.unwrap();

    let report = editor.update_capabilities().await.unwrap();
    assert_eq!(report.succeeded().collect::<Vec<_>>(), vec![LayerId(7)]);

    let query = mock
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::UpdateCapabilities(query) => Some(query),
            _ => None,
        })
        .unwrap();
    assert_eq!(query.ids, vec![LayerId(7)]);
    assert_eq!(query.srs, fixtures::MAP_SRS);

    let snapshot = editor.snapshot();
    assert_eq!(snapshot.draft.capabilities, Some(json!({"styles": ["a"]})));
    assert_eq!(
        snapshot.wizard.messages,
        vec![Message::success("capabilities.updatedSuccesfully")]
    );
}

#[tokio::test]
async fn test_update_capabilities_failure_reason() {
    let mock = Arc::new(MockTransport::new().with_layer(fixtures::saved_wfs_layer(7)));
    mock.push_update_capabilities(Ok(fixtures::update_failure(7, "Service unavailable")));
    let editor = editor(mock);
    editor.fetch_layer(Some(LayerId(7))).await.unwrap();

    let report = editor.update_capabilities().await.unwrap();
    assert_eq!(report.failed_count(), 1);

    let messages = editor.snapshot().wizard.messages;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].key, "capabilities.updateFailedWithReason");
    assert_eq!(messages[0].args.get("reason"), Some(&json!("Service unavailable")));
}

#[tokio::test]
async fn test_update_capabilities_requires_saved_layer() {
    let mock = Arc::new(MockTransport::new());
    let editor = wms_editor(mock.clone());

    let result = editor.update_capabilities().await;
    assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
    assert_eq!(mock.call_count(), 0);
    assert!(!editor.snapshot().wizard.loading);
}
