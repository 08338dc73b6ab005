// ==========================================
// Moteur de chiffrage devis - Erreurs du catalogue
// ==========================================
// Outil: macro dérivée thiserror
// Origine: collaborateur catalogue (recherche/création); le moteur
// n'applique jamais une mutation pour un appel qui a échoué
// ==========================================

use thiserror::Error;

/// Erreurs du collaborateur catalogue
#[derive(Error, Debug)]
pub enum CatalogError {
    // ===== Validation =====
    #[error("intitulé déjà présent au catalogue: {0}")]
    DuplicateName(String),

    #[error("champ obligatoire manquant: {0}")]
    MissingField(&'static str),

    #[error("valeur de champ invalide ({field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== Résolution =====
    #[error("fiche catalogue introuvable: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ===== Transport =====
    #[error("appel au catalogue échoué: {0}")]
    Backend(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Alias de Result du catalogue
pub type CatalogResult<T> = Result<T, CatalogError>;
