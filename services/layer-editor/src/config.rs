//! Editor configuration.

use std::path::PathBuf;
use std::time::Duration;

use capabilities_client::HttpTransportConfig;
use layer_common::{CatalogError, FieldCatalog, ScaleTable};
use thiserror::Error;

/// Web Mercator scale denominators at 96 dpi, zoom levels 0-18.
pub const DEFAULT_SCALES: [f64; 19] = [
    559_082_264.0,
    279_541_132.0,
    139_770_566.0,
    69_885_283.0,
    34_942_642.0,
    17_471_321.0,
    8_735_660.0,
    4_367_830.0,
    2_183_915.0,
    1_091_958.0,
    545_979.0,
    272_989.0,
    136_495.0,
    68_247.0,
    34_124.0,
    17_062.0,
    8_531.0,
    4_265.0,
    2_133.0,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No supported languages configured")]
    NoLanguages,

    #[error("Invalid scale list '{0}'")]
    InvalidScales(String),

    #[error("Scale list must be ordered coarsest first")]
    UnorderedScales,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Settings of one editor instance.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Supported languages; the first one is the default language whose
    /// locale entry must carry a name.
    pub languages: Vec<String>,

    /// Projection of the map capabilities are refreshed for
    pub map_srs: String,

    /// Scale denominators of the map, coarsest first
    pub scales: ScaleTable,

    /// Admin backend request timeout
    pub request_timeout: Duration,

    /// Optional YAML file with extra layer types
    pub catalog_file: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            map_srs: "EPSG:3857".to_string(),
            scales: ScaleTable::new(DEFAULT_SCALES.to_vec()),
            request_timeout: Duration::from_secs(60),
            catalog_file: None,
        }
    }
}

impl EditorConfig {
    /// Build from environment variables.
    ///
    /// - EDITOR_LANGUAGES: comma separated, default language first (default: en)
    /// - MAP_SRS (default: EPSG:3857)
    /// - MAP_SCALES: comma separated denominators, coarsest first
    /// - LAYER_ADMIN_TIMEOUT_SECS (default: 60)
    /// - LAYER_CATALOG_FILE: YAML file with extra layer types
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let languages = match std::env::var("EDITOR_LANGUAGES") {
            Ok(list) => parse_languages(&list)?,
            Err(_) => defaults.languages,
        };
        let map_srs = std::env::var("MAP_SRS").unwrap_or(defaults.map_srs);
        let scales = match std::env::var("MAP_SCALES") {
            Ok(list) => parse_scales(&list)?,
            Err(_) => defaults.scales,
        };
        let request_timeout = match std::env::var("LAYER_ADMIN_TIMEOUT_SECS") {
            Ok(value) => value
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidValue {
                    name: "LAYER_ADMIN_TIMEOUT_SECS",
                    value,
                })?,
            Err(_) => defaults.request_timeout,
        };
        let catalog_file = std::env::var("LAYER_CATALOG_FILE").ok().map(PathBuf::from);

        Ok(Self {
            languages,
            map_srs,
            scales,
            request_timeout,
            catalog_file,
        })
    }

    pub fn default_language(&self) -> &str {
        self.languages.first().map(String::as_str).unwrap_or("en")
    }

    /// Built-in layer types plus the ones from the catalog file.
    pub fn field_catalog(&self) -> Result<FieldCatalog, ConfigError> {
        let mut catalog = FieldCatalog::builtin();
        if let Some(path) = &self.catalog_file {
            catalog.load_yaml_file(path)?;
        }
        Ok(catalog)
    }

    /// HTTP transport settings for an admin backend.
    pub fn http_transport(&self, base_url: impl Into<String>) -> HttpTransportConfig {
        HttpTransportConfig {
            base_url: base_url.into(),
            request_timeout: self.request_timeout,
            ..HttpTransportConfig::default()
        }
    }
}

/// Parse a comma separated language list.
pub fn parse_languages(list: &str) -> Result<Vec<String>, ConfigError> {
    let languages: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect();
    if languages.is_empty() {
        return Err(ConfigError::NoLanguages);
    }
    Ok(languages)
}

/// Parse a comma separated scale list; it must be strictly coarsest first.
pub fn parse_scales(list: &str) -> Result<ScaleTable, ConfigError> {
    let table = ScaleTable::parse(list).map_err(|_| ConfigError::InvalidScales(list.to_string()))?;
    if !table.scales().windows(2).all(|pair| pair[0] > pair[1]) {
        return Err(ConfigError::UnorderedScales);
    }
    Ok(table)
}
