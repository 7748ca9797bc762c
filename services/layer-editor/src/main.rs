//! Layer editor command line tool.
//!
//! Talks to the admin backend to:
//! - Negotiate service capabilities and list advertised layers
//! - Validate layer drafts offline
//! - Show a saved layer with its validation report
//! - Refresh stored capabilities of saved layers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use capabilities_client::{
    CapabilitiesQuery, CapabilityNegotiator, HttpTransport, LayerUpdate, NegotiationOutcome,
};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use layer_common::{validate, LayerDraft, LayerId, ValidationContext};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use layer_editor::config::{parse_languages, EditorConfig};
use layer_editor::LayerEditor;

#[derive(Parser, Debug)]
#[command(name = "layer-editor")]
#[command(about = "Configure map layers from WMS/WMTS/WFS services")]
struct Args {
    /// Admin backend action endpoint
    #[arg(long, env = "LAYER_ADMIN_URL", default_value = "http://localhost:8080/action")]
    admin_url: String,

    /// Supported languages, default language first
    #[arg(long, env = "EDITOR_LANGUAGES", default_value = "en")]
    languages: String,

    /// Projection of the map capabilities are refreshed for
    #[arg(long, env = "MAP_SRS", default_value = "EPSG:3857")]
    map_srs: String,

    /// YAML file with extra layer types
    #[arg(long, env = "LAYER_CATALOG_FILE")]
    catalog_file: Option<PathBuf>,

    /// Backend request timeout in seconds
    #[arg(long, env = "LAYER_ADMIN_TIMEOUT_SECS", default_value = "60")]
    timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Negotiate capabilities and list the advertised layers
    Capabilities {
        /// Layer type, e.g. wmslayer
        #[arg(long = "type")]
        layer_type: String,

        #[arg(long)]
        url: String,

        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long, env = "SERVICE_PASSWORD")]
        password: Option<String>,

        /// Try every version the type supports, concurrently
        #[arg(long)]
        probe: bool,
    },

    /// Validate a layer draft JSON file
    Validate { file: PathBuf },

    /// Load a saved layer and print it with its validation report
    Show { id: i64 },

    /// Refresh stored capabilities of saved layers
    UpdateCapabilities {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

impl Args {
    fn editor_config(&self) -> Result<EditorConfig> {
        Ok(EditorConfig {
            languages: parse_languages(&self.languages)?,
            map_srs: self.map_srs.clone(),
            request_timeout: Duration::from_secs(self.timeout_secs),
            catalog_file: self.catalog_file.clone(),
            ..EditorConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = args.editor_config()?;

    match &args.command {
        Command::Validate { file } => validate_file(&config, file),
        Command::Capabilities {
            layer_type,
            url,
            version,
            username,
            password,
            probe,
        } => {
            let fields = config.field_catalog()?;
            let versions = if *probe {
                fields.versions_for(layer_type)
            } else {
                vec![version.clone().unwrap_or_default()]
            };
            let base = CapabilitiesQuery {
                layer_type: layer_type.clone(),
                version: None,
                url: Some(url.clone()),
                username: username.clone(),
                password: password.clone(),
            };
            let negotiator = CapabilityNegotiator::new(connect(&args, &config)?);
            list_capabilities(negotiator, base, versions).await
        }
        Command::Show { id } => {
            let transport = connect(&args, &config)?;
            show_layer(transport, config, LayerId(*id)).await
        }
        Command::UpdateCapabilities { ids } => {
            let ids: Vec<LayerId> = ids.iter().copied().map(LayerId).collect();
            let negotiator = CapabilityNegotiator::new(connect(&args, &config)?);
            update_capabilities(negotiator, &ids, &config.map_srs).await
        }
    }
}

fn connect(args: &Args, config: &EditorConfig) -> Result<Arc<HttpTransport>> {
    let transport = HttpTransport::new(config.http_transport(&args.admin_url))
        .context("Failed to create admin backend client")?;
    info!(admin_url = %args.admin_url, "Using admin backend");
    Ok(Arc::new(transport))
}

/// Negotiate every version concurrently and print each listing.
async fn list_capabilities(
    negotiator: CapabilityNegotiator<HttpTransport>,
    base: CapabilitiesQuery,
    versions: Vec<String>,
) -> Result<()> {
    if versions.is_empty() {
        bail!("Layer type {} has no known versions", base.layer_type);
    }

    let queries: Vec<CapabilitiesQuery> = versions
        .into_iter()
        .map(|version| CapabilitiesQuery {
            version: Some(version).filter(|v| !v.is_empty()),
            ..base.clone()
        })
        .collect();
    let outcomes = join_all(queries.iter().map(|query| negotiator.negotiate(query))).await;

    let mut any_success = false;
    for (query, outcome) in queries.iter().zip(outcomes) {
        let version = query.version.as_deref().unwrap_or("-");
        match outcome {
            NegotiationOutcome::Success(catalog) => {
                any_success = true;
                println!("{} {}: {} layers", query.layer_type, version, catalog.layers.len());
                for name in catalog.layers.keys() {
                    let marker = if catalog.is_existing(name) { " (configured)" } else { "" };
                    println!("  {}{}", name, marker);
                }
            }
            other => {
                let key = other.message().map(|m| m.key).unwrap_or_default();
                println!("{} {}: {} ({})", query.layer_type, version, other.label(), key);
            }
        }
    }

    if !any_success {
        bail!("Capability negotiation failed for every version");
    }
    Ok(())
}

fn validate_file(config: &EditorConfig, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read: {:?}", file))?;
    let draft: LayerDraft = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse layer draft: {:?}", file))?;

    let fields = config.field_catalog()?;
    let ctx = ValidationContext {
        catalog: &fields,
        default_language: config.default_language(),
    };
    let errors = validate(&draft, &ctx);
    if errors.is_empty() {
        println!("{:?}: ok", file);
        return Ok(());
    }
    for error in &errors {
        println!("{:?}: {}", file, error.message_key());
    }
    bail!("{} validation error(s)", errors.len())
}

async fn show_layer(
    transport: Arc<HttpTransport>,
    config: EditorConfig,
    id: LayerId,
) -> Result<()> {
    let fields = config.field_catalog()?;
    let editor = LayerEditor::new(transport, config, fields);
    editor.fetch_admin_metadata().await?;
    editor.fetch_layer(Some(id)).await?;

    let snapshot = editor.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot.draft)?);
    for message in &snapshot.wizard.messages {
        println!("{:?}: {}", message.kind, message.key);
    }
    for error in editor.validation_errors() {
        println!("invalid: {}", error.message_key());
    }
    Ok(())
}

async fn update_capabilities(
    negotiator: CapabilityNegotiator<HttpTransport>,
    ids: &[LayerId],
    srs: &str,
) -> Result<()> {
    let report = negotiator.update(ids, srs).await?;
    for (id, update) in &report.results {
        match update {
            LayerUpdate::Updated { .. } => println!("{}: updated", id),
            LayerUpdate::Failed { reason } => {
                println!("{}: failed {}", id, reason.as_deref().unwrap_or(""))
            }
        }
    }
    if report.failed_count() > 0 {
        bail!("{} layer(s) failed to update", report.failed_count());
    }
    Ok(())
}
