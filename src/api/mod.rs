// ==========================================
// Moteur de chiffrage devis - Couche API
// ==========================================
// Responsabilité: interface métier pour la couche de présentation
// ==========================================

pub mod devis_api;
pub mod error;

// Réexport des types de l'API
pub use devis_api::DevisApi;
pub use error::{ApiError, ApiResult};
