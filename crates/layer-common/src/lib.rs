//! Common types shared by the layer editor crates.
//!
//! Everything in here is pure data: the layer draft under edit, the field
//! requirement catalog keyed by layer type, the validation engine and the
//! scale table helpers. No I/O happens in this crate apart from loading an
//! optional YAML catalog file.

pub mod draft;
pub mod error;
pub mod fields;
pub mod message;
pub mod permissions;
pub mod scale;
pub mod validation;
pub mod wire;

pub use draft::{JsonOption, LayerDraft, LayerId, LocalizedName, MANAGED_ATTRIBUTES};
pub use error::{EditorError, EditorResult, ErrorClass};
pub use fields::{CatalogError, ComposingModel, FieldCatalog, FieldId, VersionRule};
pub use message::{Message, MessageKind};
pub use permissions::{PermissionType, Role};
pub use scale::{ScaleRange, ScaleTable, NO_RESTRICTION};
pub use validation::{validate, ValidationContext, ValidationError};
pub use wire::WireLayer;
