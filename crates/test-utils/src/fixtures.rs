//! Common test fixtures for layer editor tests.
//!
//! Service urls point at reserved example domains; nothing here talks to a
//! real service.

use std::collections::BTreeMap;

use capabilities_client::{AdminMetadata, CapabilityCatalog, UpdateCapabilitiesResponse};
use layer_common::{LayerDraft, LayerId, LocalizedName, PermissionType, Role, WireLayer};
use serde_json::{json, Value};

/// Common service endpoints.
pub mod urls {
    pub const WMS: &str = "https://example.com/geoserver/wms";
    pub const WMTS: &str = "https://example.com/geoserver/gwc/service/wmts";
    pub const WFS: &str = "https://example.com/geoserver/ows";
    pub const OTHER_WFS: &str = "https://other.example.org/wfs";
}

/// Map projection used by fixtures.
pub const MAP_SRS: &str = "EPSG:3067";

/// Scale denominators, coarsest first.
pub const SCALES: [f64; 8] = [
    5_669_294.0,
    2_834_647.0,
    1_417_323.0,
    566_929.0,
    283_464.0,
    141_732.0,
    56_693.0,
    28_346.0,
];

/// Guest (1) and Admin (2).
pub fn roles() -> Vec<Role> {
    vec![
        Role {
            id: 1,
            name: "Guest".to_string(),
        },
        Role {
            id: 2,
            name: "Admin".to_string(),
        },
    ]
}

pub fn permission_types() -> Vec<PermissionType> {
    ["VIEW_LAYER", "VIEW_PUBLISHED", "PUBLISH", "DOWNLOAD"]
        .into_iter()
        .map(|id| PermissionType {
            id: id.to_string(),
            name: None,
        })
        .collect()
}

/// Roles, permission types and mandatory fields for the common OGC types.
pub fn admin_metadata() -> AdminMetadata {
    let mut layer_types = BTreeMap::new();
    for layer_type in ["wmslayer", "wmtslayer", "wfslayer"] {
        layer_types.insert(
            layer_type.to_string(),
            vec!["url".to_string(), "name".to_string()],
        );
    }
    AdminMetadata {
        roles: roles(),
        permission_types: permission_types(),
        layer_types,
    }
}

/// Capability entry for one advertised layer.
pub fn capability_layer(name: &str) -> Value {
    json!({
        "name": name,
        "locale": {
            "en": {"name": format!("{} (service title)", name)}
        },
        "capabilities": {
            "srs": [MAP_SRS, "EPSG:4326"],
            "styles": [{"name": "default"}]
        }
    })
}

/// Catalog advertising the given layer names.
pub fn catalog(names: &[&str]) -> CapabilityCatalog {
    let mut catalog = CapabilityCatalog::default();
    for name in names {
        catalog.layers.insert(name.to_string(), capability_layer(name));
    }
    catalog.extra.insert("title".to_string(), json!("Example service"));
    catalog
}

/// Locale map with a name for one language.
pub fn locale(lang: &str, name: &str) -> BTreeMap<String, LocalizedName> {
    let mut locale = BTreeMap::new();
    locale.insert(lang.to_string(), LocalizedName::named(name));
    locale
}

/// A WMS draft that passes validation with the built-in catalog and
/// default language "en".
pub fn valid_wms_draft() -> LayerDraft {
    LayerDraft::new("wmslayer")
        .with_url(Some(urls::WMS.to_string()))
        .with_version(Some("1.3.0".to_string()))
        .with_name(Some("roads".to_string()))
        .with_data_provider_id(Some(3))
        .with_group(true, 10)
        .with_initialized_permissions(&roles())
        .toggle_permission("1", "VIEW_LAYER")
        .with_locale(locale("en", "Roads"))
}

/// A saved WFS layer as the backend would return it.
pub fn saved_wfs_layer(id: i64) -> WireLayer {
    let mut draft = LayerDraft::new("wfslayer")
        .with_url(Some(urls::WFS.to_string()))
        .with_version(Some("2.0.0".to_string()))
        .with_name(Some("buildings".to_string()))
        .with_data_provider_id(Some(5))
        .with_initialized_permissions(&roles())
        .toggle_permission("2", "VIEW_LAYER")
        .with_locale(locale("en", "Buildings"));
    draft.id = Some(LayerId(id));
    draft.to_wire()
}

/// Backend answer for a capability refresh of one layer.
pub fn update_success(id: i64, capabilities: Value) -> UpdateCapabilitiesResponse {
    let mut response = UpdateCapabilitiesResponse::default();
    response.success.push(id.to_string());
    response
        .layer_data
        .insert(id.to_string(), json!({ "capabilities": capabilities }));
    response
}

/// Backend answer for a failed capability refresh of one layer.
pub fn update_failure(id: i64, reason: &str) -> UpdateCapabilitiesResponse {
    let mut response = UpdateCapabilitiesResponse::default();
    response.error.insert(id.to_string(), reason.to_string());
    response
}
