//! Validation of a layer draft before saving.
//!
//! Validation never mutates the draft and never fails: it returns the list
//! of problems in a fixed order. A draft can be saved when the list is
//! empty.

use serde_json::Value;
use thiserror::Error;

use crate::draft::LayerDraft;
use crate::fields::FieldCatalog;

/// Inputs validation needs besides the draft.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub catalog: &'a FieldCatalog,
    /// First supported language; its locale entry must have a name
    pub default_language: &'a str,
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Data provider is required")]
    DataProvider,

    #[error("At least one role must be granted a permission")]
    NoPermissions,

    #[error("Name is required for the default language")]
    Locale,

    #[error("Mandatory field is missing: {0}")]
    MissingField(String),

    #[error("Invalid JSON for {0}")]
    InvalidJson(&'static str),

    #[error("Minimum scale must be coarser than maximum scale")]
    ScaleOrder,
}

impl ValidationError {
    /// Localization key for the error.
    pub fn message_key(&self) -> String {
        match self {
            ValidationError::DataProvider => "validation.dataprovider".to_string(),
            ValidationError::NoPermissions => "validation.nopermissions".to_string(),
            ValidationError::Locale => "validation.locale".to_string(),
            ValidationError::MissingField(field) => format!("validation.{}", field),
            ValidationError::InvalidJson(field) => format!("validation.{}", field),
            ValidationError::ScaleOrder => "validation.scale".to_string(),
        }
    }
}

/// Validate a draft.
pub fn validate(draft: &LayerDraft, ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if draft.data_provider_id.map_or(true, |id| id == -1) {
        errors.push(ValidationError::DataProvider);
    }

    if !draft.has_any_permissions() {
        errors.push(ValidationError::NoPermissions);
    }

    let has_default_name = draft
        .locale
        .get(ctx.default_language)
        .and_then(|l| l.name.as_deref())
        .is_some_and(|name| !name.is_empty());
    if !has_default_name {
        errors.push(ValidationError::Locale);
    }

    let mandatory = ctx.catalog.mandatory_fields(&draft.layer_type);
    if !mandatory.is_empty() {
        let document = serde_json::to_value(draft).unwrap_or_default();
        for field in mandatory {
            if is_missing(lookup_path(&document, field)) {
                errors.push(ValidationError::MissingField(field.clone()));
            }
        }
    }

    for (key, text) in draft.shadows.in_validation_order() {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            if !is_object_json(text) {
                errors.push(ValidationError::InvalidJson(key));
            }
        }
    }

    if !draft.scale_range().is_ordered() {
        errors.push(ValidationError::ScaleOrder);
    }

    errors
}

/// Resolve a dotted path such as "format.value".
pub fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(value, |current, key| current.get(key))
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(-1.0),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) => false,
    }
}

fn is_object_json(text: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(text),
        Ok(Value::Object(_)) | Ok(Value::Array(_))
    )
}
