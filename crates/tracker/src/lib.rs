pub mod catalog;
mod key;
pub mod knowledge;
mod orchestrator;
mod settings;
pub mod store;
mod world;

pub use catalog::{
    load_catalog_file, parse_catalog, CatalogError, CatalogErrorCode, CuratedCatalog,
    SourceLocation,
};
pub use key::{DeriveError, KeyQuantizer, ObjectKey, DEFAULT_UNITS_PER_WORLD};
pub use knowledge::{
    CuratedKnowledgeBase, HeuristicKnowledgeBase, KnowledgeBase, KnowledgeError,
    KnowledgeStrategy, DEFAULT_GRASS_MARKERS,
};
pub use orchestrator::{ObservationOutcome, Orchestrator, RescanSummary};
pub use settings::{TrackerSettings, DEFAULT_RESCAN_SETTLE_DELAY_MS};
pub use store::{
    AliasOutcome, BlobError, LoadReport, RecordError, StateStore, Stats, StatsChanged,
    StatsListener, TrackedState,
};
pub use world::{InspectError, Vec2, WorldObject};

/// Builds the knowledge strategy selected by `settings`. Curated mode needs a
/// catalog; without one the heuristic strategy is used instead.
pub fn build_knowledge_base(
    settings: &TrackerSettings,
    quantizer: KeyQuantizer,
    catalog: Option<CuratedCatalog>,
) -> Box<dyn KnowledgeBase> {
    match catalog {
        Some(catalog) if !settings.use_heuristic_knower => {
            Box::new(CuratedKnowledgeBase::new(catalog, quantizer))
        }
        _ => Box::new(HeuristicKnowledgeBase::with_markers(
            quantizer,
            settings.heuristic_markers.iter().cloned(),
        )),
    }
}
