//! Persisted representation of a layer.
//!
//! The admin backend stores layers without any of the editor's transient
//! state: no shadow texts, no capabilities, scale limits as `-1` sentinels
//! and the data provider as `-1` when unset. Loading from the wire may carry
//! a one-shot `warn` key that must be surfaced, never stored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::draft::{JsonShadows, LayerDraft, LayerId, LocalizedName};
use crate::scale::{ScaleRange, NO_RESTRICTION};

fn no_restriction() -> f64 {
    NO_RESTRICTION
}

fn no_provider() -> i64 {
    -1
}

/// Layer as exchanged with the admin backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LayerId>,

    #[serde(rename = "type", default)]
    pub layer_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default)]
    pub options: Map<String, Value>,

    #[serde(rename = "role_permissions", default)]
    pub role_permissions: BTreeMap<String, BTreeSet<String>>,

    #[serde(default)]
    pub locale: BTreeMap<String, LocalizedName>,

    #[serde(default = "no_restriction")]
    pub minscale: f64,

    #[serde(default = "no_restriction")]
    pub maxscale: f64,

    #[serde(default)]
    pub groups: BTreeSet<i64>,

    #[serde(default = "no_provider")]
    pub data_provider_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default)]
    pub params: Map<String, Value>,

    #[serde(default)]
    pub realtime: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities_update_rate: Option<u32>,

    #[serde(rename = "metadataid", default, skip_serializing_if = "Option::is_none")]
    pub metadata_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gfi_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gfi_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gfi_xslt: Option<String>,

    #[serde(default)]
    pub format: Map<String, Value>,

    /// Capabilities sent by the backend when loading. Never sent back.
    #[serde(default, skip_serializing)]
    pub capabilities: Option<Value>,

    /// One-shot warning key from the backend, e.g. "updateCapabilitiesFail"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<String>,
}

impl WireLayer {
    /// Parse a backend JSON document.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Overlay the keys of `fields` (e.g. a capabilities layer entry) onto
    /// this layer.
    pub fn overlay(&self, fields: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(ref mut map) = value {
            for (key, field) in fields {
                map.insert(key.clone(), field.clone());
            }
        }
        Self::from_value(value)
    }
}

impl LayerDraft {
    /// Representation sent to the backend.
    pub fn to_wire(&self) -> WireLayer {
        let (minscale, maxscale) = self.scale_range().to_wire();
        WireLayer {
            id: self.id,
            layer_type: self.layer_type.clone(),
            version: self.version.clone(),
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            options: self.options.clone(),
            role_permissions: self.role_permissions.clone(),
            locale: self.locale.clone(),
            minscale,
            maxscale,
            groups: self.groups.clone(),
            data_provider_id: self.data_provider_id.unwrap_or(-1),
            opacity: self.opacity,
            style: self.style.clone(),
            params: self.params.clone(),
            realtime: self.realtime,
            refresh_rate: self.refresh_rate,
            capabilities_update_rate: self.capabilities_update_rate,
            metadata_id: self.metadata_id.clone(),
            legend_image: self.legend_image.clone(),
            gfi_content: self.gfi_content.clone(),
            gfi_type: self.gfi_type.clone(),
            gfi_xslt: self.gfi_xslt.clone(),
            format: self.format.clone(),
            capabilities: None,
            warn: None,
        }
    }

    /// Build a draft from the backend representation.
    ///
    /// Capabilities are session-local: the backend's copy wins when it sends
    /// one, otherwise `preserved` (the replaced draft's capabilities) is
    /// re-attached. Shadow texts are regenerated from the committed values.
    /// The `warn` key is split off and returned.
    pub fn from_wire(wire: WireLayer, preserved: Option<Value>) -> (Self, Option<String>) {
        let scales = ScaleRange::from_wire(wire.minscale, wire.maxscale);
        let shadows = JsonShadows::from_committed(&wire.options, &wire.attributes);
        let draft = LayerDraft {
            id: wire.id,
            layer_type: wire.layer_type,
            version: wire.version,
            url: wire.url,
            username: wire.username,
            password: wire.password,
            name: wire.name,
            attributes: wire.attributes,
            options: wire.options,
            role_permissions: wire.role_permissions,
            locale: wire.locale,
            minscale: scales.min,
            maxscale: scales.max,
            groups: wire.groups,
            data_provider_id: Some(wire.data_provider_id).filter(|id| *id >= 0),
            opacity: wire.opacity,
            style: wire.style,
            params: wire.params,
            realtime: wire.realtime,
            refresh_rate: wire.refresh_rate,
            capabilities_update_rate: wire.capabilities_update_rate,
            metadata_id: wire.metadata_id,
            legend_image: wire.legend_image,
            gfi_content: wire.gfi_content,
            gfi_type: wire.gfi_type,
            gfi_xslt: wire.gfi_xslt,
            format: wire.format,
            capabilities: wire.capabilities.or(preserved),
            shadows,
        };
        (draft, wire.warn)
    }
}
