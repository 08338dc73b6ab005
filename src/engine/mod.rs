// ==========================================
// Moteur de chiffrage devis - Couche moteur
// ==========================================
// Responsabilité: arbre de chiffrage et règles métier pures
// Règle: toute règle refusée sort une raison explicite
// ==========================================

pub mod calculation;
pub mod error;
pub mod events;
pub mod ordering;
pub mod placement;
pub mod tree;

// Réexport des moteurs
pub use calculation::{CalculationEngine, DevisTotals, SpecialAmount};
pub use error::{EngineError, EngineResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, QuoteEvent, QuoteEventPublisher, QuoteEventType,
};
pub use ordering::{DragEvent, IgnoreReason, OrderingEngine, ReorderOutcome};
pub use placement::{PlacementResolver, PlacementToken, ResolvedPlacement};
pub use tree::PricingTree;
