//! Field requirement catalog.
//!
//! Maps a layer type (and optionally a protocol version) to the ordered set of
//! configuration fields the editor shows for it, the versions the type
//! supports and the fields that must be filled before saving.
//!
//! The built-in table covers the OGC service types shipped with the editor.
//! Types only known at runtime are added with [`FieldCatalog::register`] or
//! loaded from a YAML file:
//!
//! ```yaml
//! layer_types:
//!   mylayer:
//!     fields: [URL, NAME, CAPABILITIES, VERSION]
//!     versions: ["1.0.0"]
//!     mandatory: [url, name]
//!     version_fields:
//!       "1.0.0":
//!         add: [CAPABILITIES_STYLES]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Configuration fields a layer type can expose in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldId {
    Attributions,
    /// The type reads its layer listing from a capabilities document.
    Capabilities,
    /// Style list comes from the capabilities document.
    CapabilitiesStyles,
    CapabilitiesUpdateRate,
    ClusteringDistance,
    Credentials,
    ExternalStylesJson,
    GfiContent,
    GfiType,
    GfiXslt,
    Hover,
    Name,
    Opacity,
    Realtime,
    RenderMode,
    Scale,
    SelectedTime,
    Srs,
    StylesJson,
    TileGrid,
    Url,
    Version,
}

/// Per-version refinement of a type's field list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRule {
    #[serde(default)]
    pub add: Vec<FieldId>,
    #[serde(default)]
    pub remove: Vec<FieldId>,
}

/// Everything the editor knows about one layer type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposingModel {
    /// Fields shown regardless of version
    pub fields: Vec<FieldId>,
    /// Supported protocol versions, oldest first
    pub versions: Vec<String>,
    /// Version specific additions/removals
    pub version_rules: BTreeMap<String, VersionRule>,
    /// Dotted draft paths that must be non-blank on save (e.g. "format.value")
    pub mandatory: Vec<String>,
}

impl ComposingModel {
    pub fn new(fields: &[FieldId], versions: &[&str]) -> Self {
        Self {
            fields: fields.to_vec(),
            versions: versions.iter().map(|v| v.to_string()).collect(),
            version_rules: BTreeMap::new(),
            mandatory: Vec::new(),
        }
    }

    pub fn with_mandatory(mut self, mandatory: &[&str]) -> Self {
        self.mandatory = mandatory.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_version_rule(mut self, version: &str, rule: VersionRule) -> Self {
        self.version_rules.insert(version.to_string(), rule);
        self
    }

    /// Ordered, duplicate free field list for a version.
    pub fn property_fields(&self, version: Option<&str>) -> Vec<FieldId> {
        let rule = version.and_then(|v| self.version_rules.get(v));
        let mut fields: Vec<FieldId> = Vec::with_capacity(self.fields.len());
        let additions = rule.map(|r| r.add.as_slice()).unwrap_or_default();
        for field in self.fields.iter().chain(additions) {
            if !fields.contains(field) {
                fields.push(*field);
            }
        }
        if let Some(rule) = rule {
            fields.retain(|f| !rule.remove.contains(f));
        }
        fields
    }
}

/// Errors loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Lookup table from layer type to its composing model.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    models: BTreeMap<String, ComposingModel>,
}

impl FieldCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the layer types the editor supports out of the box.
    pub fn builtin() -> Self {
        use FieldId::*;

        let mut catalog = Self::new();
        catalog.register(
            "wmslayer",
            ComposingModel::new(
                &[
                    Capabilities,
                    CapabilitiesStyles,
                    CapabilitiesUpdateRate,
                    Credentials,
                    GfiContent,
                    GfiType,
                    GfiXslt,
                    Name,
                    Opacity,
                    Realtime,
                    Scale,
                    SelectedTime,
                    Srs,
                    Url,
                    Version,
                ],
                &["1.1.1", "1.3.0"],
            )
            .with_mandatory(&["url", "name"]),
        );
        catalog.register(
            "wmtslayer",
            ComposingModel::new(
                &[
                    Capabilities,
                    CapabilitiesStyles,
                    Credentials,
                    GfiContent,
                    GfiType,
                    GfiXslt,
                    Srs,
                    Url,
                    Version,
                ],
                &["1.0.0"],
            )
            .with_mandatory(&["url", "name"]),
        );
        catalog.register(
            "wfslayer",
            ComposingModel::new(
                &[
                    Capabilities,
                    CapabilitiesUpdateRate,
                    ClusteringDistance,
                    Credentials,
                    Hover,
                    Name,
                    Opacity,
                    RenderMode,
                    Scale,
                    Srs,
                    StylesJson,
                    Url,
                    Version,
                ],
                &["1.1.0", "2.0.0", "3.0.0"],
            )
            // OGC API Features advertises styles, the older WFS versions don't
            .with_version_rule(
                "3.0.0",
                VersionRule {
                    add: vec![CapabilitiesStyles],
                    remove: Vec::new(),
                },
            )
            .with_mandatory(&["url", "name"]),
        );
        catalog.register(
            "arcgis93layer",
            ComposingModel::new(&[Attributions, Name, Opacity, Scale, Url], &[])
                .with_mandatory(&["url", "name"]),
        );
        catalog.register(
            "vectortilelayer",
            ComposingModel::new(
                &[
                    Attributions,
                    ExternalStylesJson,
                    Hover,
                    Opacity,
                    Scale,
                    Srs,
                    StylesJson,
                    TileGrid,
                    Url,
                ],
                &[],
            )
            .with_mandatory(&["url"]),
        );
        catalog
    }

    /// Register (or replace) a layer type.
    ///
    /// A model without mandatory fields keeps the mandatory list already
    /// stored for the type, so backend-supplied requirements survive a
    /// re-registration.
    pub fn register(&mut self, layer_type: impl Into<String>, mut model: ComposingModel) {
        let layer_type = layer_type.into();
        if model.mandatory.is_empty() {
            if let Some(existing) = self.models.get(&layer_type) {
                model.mandatory = existing.mandatory.clone();
            }
        }
        debug!(layer_type = %layer_type, fields = model.fields.len(), "Registered layer type");
        self.models.insert(layer_type, model);
    }

    /// Replace the mandatory field list of a type, registering an empty model
    /// for types the catalog has not seen yet.
    pub fn set_mandatory_fields(&mut self, layer_type: &str, mandatory: Vec<String>) {
        self.models
            .entry(layer_type.to_string())
            .or_default()
            .mandatory = mandatory;
    }

    /// Ordered field set for a type and version. Unknown types yield an
    /// empty set.
    pub fn fields_for(&self, layer_type: &str, version: Option<&str>) -> Vec<FieldId> {
        self.models
            .get(layer_type)
            .map(|m| m.property_fields(version))
            .unwrap_or_default()
    }

    /// Versions the type supports.
    pub fn versions_for(&self, layer_type: &str) -> Vec<String> {
        self.models
            .get(layer_type)
            .map(|m| m.versions.clone())
            .unwrap_or_default()
    }

    /// Dotted draft paths that must be filled in for a type.
    pub fn mandatory_fields(&self, layer_type: &str) -> &[String] {
        self.models
            .get(layer_type)
            .map(|m| m.mandatory.as_slice())
            .unwrap_or_default()
    }

    /// Whether the type/version needs a capabilities document.
    pub fn requires_capabilities(&self, layer_type: &str, version: Option<&str>) -> bool {
        self.fields_for(layer_type, version)
            .contains(&FieldId::Capabilities)
    }

    /// All registered layer types.
    pub fn layer_types(&self) -> Vec<&str> {
        self.models.keys().map(|s| s.as_str()).collect()
    }

    /// Merge layer type definitions from YAML text into this catalog.
    /// Returns the number of types registered.
    pub fn merge_yaml(&mut self, contents: &str) -> Result<usize, CatalogError> {
        let yaml: YamlCatalogFile = serde_yaml::from_str(contents)?;
        let count = yaml.layer_types.len();
        for (layer_type, entry) in yaml.layer_types {
            let model = ComposingModel {
                fields: entry.fields,
                versions: entry.versions,
                version_rules: entry.version_fields,
                mandatory: entry.mandatory,
            };
            self.register(layer_type, model);
        }
        Ok(count)
    }

    /// Load additional layer types from a YAML file.
    pub fn load_yaml_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, CatalogError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let count = self.merge_yaml(&contents)?;
        info!(path = ?path.as_ref(), layer_types = count, "Loaded layer type catalog");
        Ok(count)
    }
}

// ============================================================================
// YAML Parsing Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct YamlCatalogFile {
    #[serde(default)]
    layer_types: BTreeMap<String, YamlLayerType>,
}

#[derive(Debug, Deserialize)]
struct YamlLayerType {
    #[serde(default)]
    fields: Vec<FieldId>,
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    mandatory: Vec<String>,
    #[serde(default)]
    version_fields: BTreeMap<String, VersionRule>,
}
