//! The layer draft under edit.
//!
//! A [`LayerDraft`] is a plain value. Every setter consumes the draft and
//! returns the updated one, so the orchestrator can clone the current draft,
//! apply an edit and swap the result in as a single step. Setters never
//! recompute the required field set; callers do that after structural
//! changes (type or version).
//!
//! JSON-bearing options keep two copies: the raw text the user is typing
//! (the shadow field) and the last successfully parsed value in `options`.
//! Invalid text only ever touches the shadow so no keystrokes are lost.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::scale::{normalize_scale, ScaleRange};

/// Attribute keys owned by the editor rather than the free-text attribute
/// JSON. They survive [`LayerDraft::merge_attributes`].
pub const MANAGED_ATTRIBUTES: &[&str] = &["forcedSRS"];

/// Persisted identity of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub i64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Localized name and subtitle for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl LocalizedName {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            subtitle: None,
        }
    }
}

/// Options edited as raw JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonOption {
    Styles,
    ExternalStyles,
    Hover,
    TileGrid,
    Attributions,
}

impl JsonOption {
    pub const ALL: [JsonOption; 5] = [
        JsonOption::Styles,
        JsonOption::ExternalStyles,
        JsonOption::Hover,
        JsonOption::TileGrid,
        JsonOption::Attributions,
    ];

    /// Key of the committed value in `options`.
    pub fn option_key(&self) -> &'static str {
        match self {
            JsonOption::Styles => "styles",
            JsonOption::ExternalStyles => "externalStyles",
            JsonOption::Hover => "hover",
            JsonOption::TileGrid => "tileGrid",
            JsonOption::Attributions => "attributions",
        }
    }

    /// Key of the transient raw text field.
    pub fn shadow_key(&self) -> &'static str {
        match self {
            JsonOption::Styles => "tempStylesJSON",
            JsonOption::ExternalStyles => "tempExternalStylesJSON",
            JsonOption::Hover => "tempHoverJSON",
            JsonOption::TileGrid => "tempTileGridJSON",
            JsonOption::Attributions => "tempAttributionsJSON",
        }
    }

    /// Look up an option by its shadow field key.
    pub fn from_shadow_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.shadow_key() == key)
    }
}

/// Raw text the user is editing for each JSON-bearing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonShadows {
    #[serde(rename = "tempStylesJSON", default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<String>,

    #[serde(rename = "tempExternalStylesJSON", default, skip_serializing_if = "Option::is_none")]
    pub external_styles: Option<String>,

    #[serde(rename = "tempHoverJSON", default, skip_serializing_if = "Option::is_none")]
    pub hover: Option<String>,

    #[serde(rename = "tempTileGridJSON", default, skip_serializing_if = "Option::is_none")]
    pub tile_grid: Option<String>,

    #[serde(rename = "tempAttributionsJSON", default, skip_serializing_if = "Option::is_none")]
    pub attributions: Option<String>,

    #[serde(rename = "tempAttributesJSON", default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
}

impl JsonShadows {
    pub fn get(&self, option: JsonOption) -> Option<&str> {
        self.slot(option).as_deref()
    }

    fn slot(&self, option: JsonOption) -> &Option<String> {
        match option {
            JsonOption::Styles => &self.styles,
            JsonOption::ExternalStyles => &self.external_styles,
            JsonOption::Hover => &self.hover,
            JsonOption::TileGrid => &self.tile_grid,
            JsonOption::Attributions => &self.attributions,
        }
    }

    fn slot_mut(&mut self, option: JsonOption) -> &mut Option<String> {
        match option {
            JsonOption::Styles => &mut self.styles,
            JsonOption::ExternalStyles => &mut self.external_styles,
            JsonOption::Hover => &mut self.hover,
            JsonOption::TileGrid => &mut self.tile_grid,
            JsonOption::Attributions => &mut self.attributions,
        }
    }

    /// Shadow texts in validation order, labelled with their validation key.
    pub fn in_validation_order(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("styles", self.styles.as_deref()),
            ("externalStyles", self.external_styles.as_deref()),
            ("hover", self.hover.as_deref()),
            ("attributes", self.attributes.as_deref()),
            ("attributions", self.attributions.as_deref()),
            ("tileGrid", self.tile_grid.as_deref()),
        ]
    }

    /// Rebuild shadow text from committed values.
    pub fn from_committed(options: &Map<String, Value>, attributes: &Map<String, Value>) -> Self {
        let mut shadows = Self::default();
        for option in JsonOption::ALL {
            *shadows.slot_mut(option) = options.get(option.option_key()).map(to_pretty_json);
        }
        if !attributes.is_empty() {
            shadows.attributes = Some(to_pretty_json(&Value::Object(attributes.clone())));
        }
        shadows
    }
}

/// Format a value the way the editor shows it in text areas.
pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// The layer configuration being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LayerId>,

    /// Service/layer type identifier, e.g. "wmslayer"
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

    /// Name of the layer in the service's capabilities
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

    /// Coarsest scale the layer is shown at; `None` means no restriction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minscale: Option<f64>,

    /// Finest scale the layer is shown at; `None` means no restriction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxscale: Option<f64>,

    #[serde(default)]
    pub groups: BTreeSet<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_provider_id: Option<i64>,

    /// 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,

    /// Default style name
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

    /// GetFeatureInfo query format, `{ "value": "text/html" }`
    #[serde(default)]
    pub format: Map<String, Value>,

    /// Capabilities of the selected layer. Session-local, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Value>,

    #[serde(flatten)]
    pub shadows: JsonShadows,
}

impl LayerDraft {
    /// Create a draft for a layer type.
    pub fn new(layer_type: impl Into<String>) -> Self {
        Self {
            layer_type: layer_type.into(),
            ..Self::default()
        }
    }

    /// Whether the draft has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn scale_range(&self) -> ScaleRange {
        ScaleRange {
            min: self.minscale,
            max: self.maxscale,
        }
    }

    // === Connection ===

    pub fn with_type(mut self, layer_type: impl Into<String>) -> Self {
        self.layer_type = layer_type.into();
        self
    }

    /// Set the protocol version. Clearing it also clears the layer name,
    /// which is only meaningful within a version-scoped capability listing.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        if version.is_none() {
            self.name = None;
        }
        self.version = version;
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Forget which persisted layer and which advertised layer this draft
    /// refers to, keeping the service connection.
    pub fn without_identity(mut self) -> Self {
        self.name = None;
        self.id = None;
        self
    }

    // === Metadata ===

    pub fn with_locale(mut self, locale: BTreeMap<String, LocalizedName>) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_data_provider_id(mut self, data_provider_id: Option<i64>) -> Self {
        self.data_provider_id = data_provider_id;
        self
    }

    pub fn with_group(mut self, checked: bool, group_id: i64) -> Self {
        if checked {
            self.groups.insert(group_id);
        } else {
            self.groups.remove(&group_id);
        }
        self
    }

    pub fn with_metadata_id(mut self, metadata_id: Option<String>) -> Self {
        self.metadata_id = metadata_id;
        self
    }

    pub fn with_legend_image(mut self, legend_image: Option<String>) -> Self {
        self.legend_image = legend_image;
        self
    }

    // === Visualization ===

    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.opacity = Some(opacity.min(100));
        self
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }

    /// Set both scale limits. Negative values (the `-1` sentinel) mean no
    /// restriction.
    pub fn with_scales(mut self, minscale: Option<f64>, maxscale: Option<f64>) -> Self {
        self.minscale = normalize_scale(minscale);
        self.maxscale = normalize_scale(maxscale);
        self
    }

    pub fn with_clustering_distance(mut self, distance: Option<f64>) -> Self {
        set_or_remove(&mut self.options, "clusteringDistance", distance.map(Value::from));
        self
    }

    pub fn with_render_mode(mut self, render_mode: Option<String>) -> Self {
        set_or_remove(&mut self.options, "renderMode", render_mode.map(Value::from));
        self
    }

    /// Replace all options. Shadow texts are left as typed.
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Store raw JSON text for an option.
    ///
    /// The shadow always keeps `raw` verbatim. Empty text deletes the
    /// committed option; parseable text replaces it; anything else leaves
    /// the committed value alone.
    pub fn with_option_json(mut self, option: JsonOption, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let key = option.option_key();
        if raw.is_empty() {
            self.options.remove(key);
        } else if let Ok(parsed) = serde_json::from_str::<Value>(&raw) {
            self.options.insert(key.to_string(), parsed);
        }
        *self.shadows.slot_mut(option) = Some(raw);
        self
    }

    // === Feature info ===

    pub fn with_gfi_content(mut self, gfi_content: Option<String>) -> Self {
        self.gfi_content = gfi_content;
        self
    }

    pub fn with_gfi_type(mut self, gfi_type: Option<String>) -> Self {
        self.gfi_type = gfi_type;
        self
    }

    pub fn with_gfi_xslt(mut self, gfi_xslt: Option<String>) -> Self {
        self.gfi_xslt = gfi_xslt;
        self
    }

    pub fn with_query_format(mut self, value: Option<String>) -> Self {
        set_or_remove(&mut self.format, "value", value.map(Value::from));
        self
    }

    // === Time and refresh ===

    pub fn with_selected_time(mut self, selected_time: Option<String>) -> Self {
        set_or_remove(&mut self.params, "selectedTime", selected_time.map(Value::from));
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_refresh_rate(mut self, refresh_rate: Option<u32>) -> Self {
        self.refresh_rate = refresh_rate;
        self
    }

    pub fn with_capabilities_update_rate(mut self, rate: Option<u32>) -> Self {
        self.capabilities_update_rate = rate;
        self
    }

    // === Attributes ===

    /// Replace unmanaged attributes with `new_attributes`.
    ///
    /// The result only depends on `new_attributes` and the managed keys
    /// already stored, so merging the same map twice is a no-op.
    pub fn merge_attributes(self, new_attributes: Map<String, Value>) -> Self {
        let mut attributes: Map<String, Value> = self
            .attributes
            .iter()
            .filter(|(key, _)| MANAGED_ATTRIBUTES.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        attributes.extend(new_attributes);
        self.with_attributes(attributes)
    }

    /// Set attributes wholesale and refresh the attribute shadow text, unless
    /// the user is midway through typing something unparseable.
    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        let shadow_is_object = self
            .shadows
            .attributes
            .as_deref()
            .and_then(|text| serde_json::from_str::<Value>(text).ok())
            .is_some_and(|v| v.is_object());
        if shadow_is_object {
            self.shadows.attributes =
                Some(to_pretty_json(&Value::Object(self.attributes.clone())));
        }
        self
    }

    /// Raw attribute JSON typed by the user.
    ///
    /// Follows the option shadow rules: empty text drops every unmanaged
    /// attribute, an object replaces them, anything else only updates the
    /// shadow.
    pub fn with_attributes_json(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.shadows.attributes = Some(raw.clone());
        if raw.is_empty() {
            return self.merge_attributes(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(parsed)) => {
                // format text input
                self.shadows.attributes = Some(to_pretty_json(&Value::Object(parsed.clone())));
                self.merge_attributes(parsed)
            }
            _ => self,
        }
    }

    /// Projections the layer is forced to. An empty list removes the
    /// managed attribute.
    pub fn with_forced_srs(self, forced_srs: Vec<String>) -> Self {
        let mut attributes = self.attributes.clone();
        if forced_srs.is_empty() {
            attributes.remove("forcedSRS");
        } else {
            attributes.insert("forcedSRS".to_string(), Value::from(forced_srs));
        }
        self.with_attributes(attributes)
    }
}

fn set_or_remove(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        Some(value) => {
            map.insert(key.to_string(), value);
        }
        None => {
            map.remove(key);
        }
    }
}
