// ==========================================
// Moteur de chiffrage devis - Couche persistance
// ==========================================
// Responsabilité: accès aux données, aucune règle métier
// Contrainte: toutes les requêtes sont paramétrées
// ==========================================

pub mod devis_repo;
pub mod error;

// Réexport des entrepôts
pub use devis_repo::{DevisSnapshotRepository, SnapshotMeta};
pub use error::{RepositoryError, RepositoryResult};
