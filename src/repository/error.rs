// ==========================================
// Moteur de chiffrage devis - Erreurs de la couche persistance
// ==========================================
// Outil: macro dérivée thiserror
// ==========================================

use thiserror::Error;

/// Erreurs de la couche persistance
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("enregistrement introuvable: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("verrou de base de données indisponible: {0}")]
    LockError(String),

    #[error("requête en échec: {0}")]
    DatabaseQueryError(String),

    #[error("sérialisation de l'instantané en échec: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// Conversion depuis rusqlite
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "inconnu".to_string(),
                id: "inconnu".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

// Conversion depuis serde_json
impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Alias de Result de la persistance
pub type RepositoryResult<T> = Result<T, RepositoryError>;
