// ==========================================
// Moteur de chiffrage devis - Erreurs de la couche API
// ==========================================
// Responsabilité: convertir les erreurs techniques des couches
// moteur/catalogue/persistance en messages orientés opérateur
// Règle: aucune relance automatique; une référence introuvable
// impose une nouvelle action de l'opérateur
// ==========================================

use crate::catalog::error::CatalogError;
use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// Erreurs de la couche API
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== Résolution =====
    #[error("référence introuvable: {0}")]
    ReferenceNotFound(String),

    #[error("ressource introuvable: {0}")]
    NotFound(String),

    // ===== Règles métier =====
    #[error("saisie invalide: {0}")]
    InvalidInput(String),

    #[error("règle métier violée: {0}")]
    BusinessRuleViolation(String),

    #[error("validation catalogue en échec: {0}")]
    ValidationError(String),

    // ===== Collaborateurs =====
    #[error("catalogue indisponible: {0}")]
    CatalogUnavailable(String),

    #[error("erreur de base de données: {0}")]
    DatabaseError(String),

    // ===== Générique =====
    #[error("erreur interne: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// Conversion depuis EngineError
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ReferenceNotFound { entity, id } => {
                ApiError::ReferenceNotFound(format!("{} (id={})", entity, id))
            }
            EngineError::NotFound(id) => ApiError::NotFound(format!("élément (id={})", id)),
            EngineError::InvalidScope { kind, id, message } => {
                ApiError::InvalidInput(format!("{} {}: {}", kind, id, message))
            }
            EngineError::DuplicateId(id) => {
                ApiError::BusinessRuleViolation(format!("élément {} déjà présent au devis", id))
            }
            EngineError::OrderingConflict { scope, key } => ApiError::InternalError(format!(
                "conflit de clé d'ordre dans {} (clé {})",
                scope, key
            )),
            EngineError::UnresolvableBase { line_id, message } => {
                ApiError::BusinessRuleViolation(format!(
                    "base non résoluble (ligne {}): {}",
                    line_id, message
                ))
            }
            EngineError::StillReferenced { id, referenced_by } => {
                ApiError::BusinessRuleViolation(format!(
                    "{} sert encore de base à la ligne spéciale {}",
                    id, referenced_by
                ))
            }
            EngineError::PatchMismatch { id, expected, got } => ApiError::InvalidInput(format!(
                "patch {} incompatible avec {} ({})",
                got, id, expected
            )),
            EngineError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// Conversion depuis CatalogError
// ==========================================
impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::DuplicateName(name) => {
                ApiError::ValidationError(format!("intitulé déjà présent: {}", name))
            }
            CatalogError::MissingField(field) => {
                ApiError::ValidationError(format!("champ obligatoire manquant: {}", field))
            }
            CatalogError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("champ {}: {}", field, message))
            }
            CatalogError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            CatalogError::Backend(message) => ApiError::CatalogUnavailable(message),
            CatalogError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// Conversion depuis RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::LockError(message) => ApiError::DatabaseError(message),
            RepositoryError::DatabaseQueryError(message) => ApiError::DatabaseError(message),
            RepositoryError::SerializationError(message) => ApiError::InternalError(message),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Alias de Result de l'API
pub type ApiResult<T> = Result<T, ApiError>;
