// ==========================================
// Moteur de chiffrage devis - Bibliothèque
// ==========================================
// Positionnement: moteur en mémoire pur, sans surface réseau,
// invoqué par une couche de présentation externe
// Session unique, synchrone: chaque mutation est suivie d'un
// recalcul complet avant tout affichage
// ==========================================

// ==========================================
// Déclaration des modules
// ==========================================

// Couche domaine - entités et types
pub mod domain;

// Couche moteur - arbre, ordonnancement, placement, calcul
pub mod engine;

// Couche catalogue - collaborateurs externes
pub mod catalog;

// Couche persistance - instantanés de devis
pub mod repository;

// Couche API - interface métier
pub mod api;

// Configuration
pub mod config;

// Infrastructure base de données (connexion/PRAGMA unifiés)
pub mod db;

// Journalisation
pub mod logging;

// ==========================================
// Réexport des types coeur
// ==========================================

// Types du domaine
pub use domain::types::{BaseReference, ContextType, ItemKind, LineEffect, ValueKind};

// Entités du domaine
pub use domain::{
    DetailLine, DetailLinePatch, DevisSnapshot, ItemPatch, Part, PartPatch, QuoteItem, ScopeId,
    SpecialLine, SpecialLineDraft, SpecialLinePatch, SubPart, SubPartPatch,
};

// Moteurs
pub use engine::{
    CalculationEngine, DevisTotals, DragEvent, EngineError, EngineResult, IgnoreReason,
    OrderingEngine, PlacementResolver, PlacementToken, PricingTree, ReorderOutcome,
    ResolvedPlacement, SpecialAmount,
};

// Catalogue
pub use catalog::{
    CatalogError, CatalogQuery, CatalogWrite, DetailLineDraft, DetailLineRecord, InMemoryCatalog,
    PartDraft, PartRecord, SubPartDraft, SubPartRecord,
};

// Persistance
pub use repository::{DevisSnapshotRepository, RepositoryError, SnapshotMeta};

// API
pub use api::{ApiError, ApiResult, DevisApi};

// Configuration
pub use config::EngineConfig;

// ==========================================
// Constantes système
// ==========================================

// Version du crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Nom applicatif
pub const APP_NAME: &str = "Moteur de chiffrage devis";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
