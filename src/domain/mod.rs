// ==========================================
// Moteur de chiffrage devis - Couche domaine
// ==========================================
// Responsabilité: entités et types, aucune règle de calcul
// ==========================================

pub mod item;
pub mod snapshot;
pub mod types;

// Réexport des entités
pub use item::{
    DetailLine, DetailLinePatch, ItemPatch, Part, PartPatch, QuoteItem, ScopeId, SpecialLine,
    SpecialLineDraft, SpecialLinePatch, SubPart, SubPartPatch,
};
pub use snapshot::{
    DetailLineSnapshot, DevisSnapshot, PartSnapshot, SpecialLineSnapshot, SubPartSnapshot,
};
pub use types::{BaseReference, ContextType, ItemKind, LineEffect, ValueKind};
