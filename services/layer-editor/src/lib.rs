//! Layer configuration wizard library.
//!
//! This module exposes the orchestrator and its state for the CLI and for
//! embedding UIs.

pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod state;

pub use config::{ConfigError, EditorConfig};
pub use metrics::{EditorMetrics, SaveResult};
pub use orchestrator::LayerEditor;
pub use state::{InFlight, WizardSnapshot, WizardState, DEFAULT_TAB};
