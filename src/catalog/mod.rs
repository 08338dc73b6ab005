// ==========================================
// Moteur de chiffrage devis - Couche catalogue
// ==========================================
// Responsabilité: collaborateurs externes de recherche et de
// création des fiches (lots, sous-lots, lignes de détail)
// ==========================================

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

// Réexport des types du catalogue
pub use error::{CatalogError, CatalogResult};
pub use memory::InMemoryCatalog;
pub use records::{
    DetailLineDraft, DetailLineRecord, PartDraft, PartRecord, SubPartDraft, SubPartRecord,
};
pub use traits::{CatalogQuery, CatalogWrite};
