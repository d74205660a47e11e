use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracker::{
    build_knowledge_base, load_catalog_file, CatalogError, DeriveError, Orchestrator, StateStore,
    TrackerSettings,
};

const SETTINGS_ENV_VAR: &str = "GRASS_TRACKER_SETTINGS";
const SCRIPT_ENV_VAR: &str = "GRASS_TRACKER_SCRIPT";

pub(crate) struct AppWiring {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) script_path: PathBuf,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("no replay script given; pass a path or set {SCRIPT_ENV_VAR}")]
    MissingScript,
    #[error("failed to read settings file {path}: {source}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {message}")]
    ParseSettings { path: PathBuf, message: String },
    #[error("invalid key precision: {0}")]
    Precision(#[from] DeriveError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Grass Tracker Replay ===");

    let script_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(SCRIPT_ENV_VAR).map(PathBuf::from))
        .ok_or(BootstrapError::MissingScript)?;
    let settings_path = std::env::var_os(SETTINGS_ENV_VAR).map(PathBuf::from);
    let settings = load_settings(settings_path.as_deref())?;

    Ok(AppWiring {
        orchestrator: build_orchestrator(&settings)?,
        script_path,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn load_settings(path: Option<&Path>) -> Result<TrackerSettings, BootstrapError> {
    let Some(path) = path else {
        info!("settings_defaulted");
        return Ok(TrackerSettings::default());
    };
    let raw = fs::read_to_string(path).map_err(|source| BootstrapError::ReadSettings {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    let settings: TrackerSettings = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|error| {
            let field = error.path().to_string();
            let source = error.into_inner();
            let message = if field.is_empty() || field == "." {
                source.to_string()
            } else {
                format!("at {field}: {source}")
            };
            BootstrapError::ParseSettings {
                path: path.to_path_buf(),
                message,
            }
        })?;
    info!(
        path = %path.display(),
        heuristic = settings.use_heuristic_knower,
        "settings_loaded"
    );
    Ok(settings)
}

pub(crate) fn build_orchestrator(
    settings: &TrackerSettings,
) -> Result<Orchestrator, BootstrapError> {
    let quantizer = settings.quantizer()?;
    let catalog = match &settings.catalog_path {
        Some(path) if !settings.use_heuristic_knower => {
            let catalog = load_catalog_file(path, &quantizer)?;
            info!(
                path = %path.display(),
                version = catalog.version(),
                keys = catalog.key_count(),
                aliases = catalog.aliases().len(),
                digest = catalog.digest_hex(),
                "catalog_loaded"
            );
            Some(catalog)
        }
        Some(_) => None,
        None => {
            if !settings.use_heuristic_knower {
                warn!("catalog_missing_using_heuristic");
            }
            None
        }
    };

    let knowledge = build_knowledge_base(settings, quantizer, catalog);
    info!(strategy = %knowledge.strategy(), "knowledge_selected");
    Ok(
        Orchestrator::new(StateStore::new(quantizer), knowledge)
            .with_settle_delay(settings.rescan_settle_delay()),
    )
}
