//! Request and response types exchanged with the admin backend.

use layer_common::{LayerId, PermissionType, Role, WireLayer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A service's self-description for one (type, version, url, credentials)
/// combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityCatalog {
    /// Advertised layers keyed by name
    #[serde(default)]
    pub layers: BTreeMap<String, Value>,

    /// Layers from this service that are already configured locally
    #[serde(default)]
    pub existing_layers: BTreeMap<String, Value>,

    /// Service level keys (title, formats, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CapabilityCatalog {
    /// Layer fields advertised for a name. Entries that are not JSON objects
    /// are treated as absent.
    pub fn layer(&self, name: &str) -> Option<&Map<String, Value>> {
        self.layers.get(name).and_then(Value::as_object)
    }

    pub fn contains_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Record a layer as already configured so listings flag it.
    pub fn mark_existing(&mut self, name: impl Into<String>, layer: &WireLayer) {
        let value = serde_json::to_value(layer).unwrap_or_default();
        self.existing_layers.insert(name.into(), value);
    }

    pub fn is_existing(&self, name: &str) -> bool {
        self.existing_layers.contains_key(name)
    }

    /// Advertised layer names that are not configured yet.
    pub fn unconfigured_layers(&self) -> impl Iterator<Item = &str> {
        self.layers
            .keys()
            .map(String::as_str)
            .filter(|name| !self.existing_layers.contains_key(*name))
    }
}

/// Parameters of a capabilities request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitiesQuery {
    #[serde(rename = "type")]
    pub layer_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "user", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(rename = "pw", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Parameters of an on-demand capabilities refresh for saved layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCapabilitiesQuery {
    pub ids: Vec<LayerId>,
    /// Projection of the map the capabilities are resolved for
    pub srs: String,
}

impl UpdateCapabilitiesQuery {
    /// Query string pairs, ids joined with commas.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let ids = self
            .ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        vec![("id", ids), ("srs", self.srs.clone())]
    }
}

/// Backend answer to a capabilities refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCapabilitiesResponse {
    /// Ids (as strings) that were refreshed
    #[serde(default)]
    pub success: Vec<String>,

    /// Failure reason keyed by id
    #[serde(default)]
    pub error: BTreeMap<String, String>,

    /// Refreshed layer data keyed by id; each entry may carry `capabilities`
    #[serde(default)]
    pub layer_data: BTreeMap<String, Value>,
}

/// Backend answer to a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub id: LayerId,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Roles, permission types and mandatory fields configured on the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMetadata {
    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(default)]
    pub permission_types: Vec<PermissionType>,

    /// Mandatory dotted field paths keyed by layer type
    #[serde(default)]
    pub layer_types: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer_common::LayerDraft;
    use serde_json::json;

    #[test]
    fn test_catalog_keeps_service_keys() {
        let catalog: CapabilityCatalog = serde_json::from_value(json!({
            "layers": {"roads": {"name": "roads"}},
            "title": "Example WMS"
        }))
        .unwrap();
        assert!(catalog.contains_layer("roads"));
        assert!(catalog.existing_layers.is_empty());
        assert_eq!(catalog.extra["title"], json!("Example WMS"));
    }

    #[test]
    fn test_non_object_layer_entry_is_absent() {
        let catalog: CapabilityCatalog =
            serde_json::from_value(json!({"layers": {"broken": 5}})).unwrap();
        assert!(catalog.contains_layer("broken"));
        assert!(catalog.layer("broken").is_none());
    }

    #[test]
    fn test_mark_existing() {
        let mut catalog: CapabilityCatalog = serde_json::from_value(json!({
            "layers": {"roads": {}, "rivers": {}}
        }))
        .unwrap();
        let wire = LayerDraft::new("wmslayer")
            .with_name(Some("roads".to_string()))
            .to_wire();
        catalog.mark_existing("roads", &wire);

        assert!(catalog.is_existing("roads"));
        assert_eq!(catalog.existing_layers["roads"]["name"], json!("roads"));
        assert_eq!(catalog.unconfigured_layers().collect::<Vec<_>>(), vec!["rivers"]);
    }

    #[test]
    fn test_query_omits_missing_params() {
        let query = CapabilitiesQuery {
            layer_type: "wmslayer".to_string(),
            version: Some("1.3.0".to_string()),
            url: Some("https://example.com/wms".to_string()),
            username: None,
            password: None,
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(
            value,
            json!({"type": "wmslayer", "version": "1.3.0", "url": "https://example.com/wms"})
        );
    }

    #[test]
    fn test_update_params_join_ids() {
        let query = UpdateCapabilitiesQuery {
            ids: vec![LayerId(3), LayerId(9)],
            srs: "EPSG:3067".to_string(),
        };
        assert_eq!(
            query.to_params(),
            vec![("id", "3,9".to_string()), ("srs", "EPSG:3067".to_string())]
        );
    }

    #[test]
    fn test_admin_metadata_shape() {
        let metadata: AdminMetadata = serde_json::from_value(json!({
            "roles": [{"id": 1, "name": "Guest"}],
            "permissionTypes": [{"id": "VIEW_LAYER", "name": "View"}],
            "layerTypes": {"wmslayer": ["url", "name"]}
        }))
        .unwrap();
        assert_eq!(metadata.roles[0].key(), "1");
        assert_eq!(metadata.permission_types[0].id, "VIEW_LAYER");
        assert_eq!(metadata.layer_types["wmslayer"], vec!["url", "name"]);
    }
}
