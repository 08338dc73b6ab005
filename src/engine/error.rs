// ==========================================
// Moteur de chiffrage devis - Erreurs du moteur
// ==========================================
// Outil: macro dérivée thiserror
// Règle: toute opération refusée l'est AVANT mutation de l'arbre
// ==========================================

use crate::domain::item::ScopeId;
use crate::domain::types::ItemKind;
use thiserror::Error;

/// Erreurs du moteur (arbre, ordonnancement, placement, calcul)
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== Résolution de références =====
    #[error("référence introuvable: {entity} id={id}")]
    ReferenceNotFound { entity: String, id: String },

    #[error("élément introuvable: id={0}")]
    NotFound(String),

    // ===== Cohérence de portée =====
    #[error("portée invalide pour {kind} id={id}: {message}")]
    InvalidScope {
        kind: ItemKind,
        id: String,
        message: String,
    },

    #[error("identifiant déjà présent dans l'arbre: {0}")]
    DuplicateId(String),

    #[error("conflit de clé d'ordre dans la portée {scope}: clé {key}")]
    OrderingConflict { scope: ScopeId, key: f64 },

    // ===== Références de base =====
    // Restriction d'ordre de résolution, pas de cycle constaté: la
    // passe montante exige une base déjà définitive (total englobant,
    // total strictement plus profond, ou montant figé)
    #[error("base non résoluble en passe montante pour la ligne spéciale {line_id}: {message}")]
    UnresolvableBase { line_id: String, message: String },

    #[error("élément {id} encore référencé par la ligne spéciale {referenced_by}")]
    StillReferenced { id: String, referenced_by: String },

    // ===== Mise à jour =====
    #[error("patch incompatible pour {id}: attendu {expected}, reçu {got}")]
    PatchMismatch {
        id: String,
        expected: ItemKind,
        got: ItemKind,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Alias de Result du moteur
pub type EngineResult<T> = Result<T, EngineError>;
