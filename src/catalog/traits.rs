// ==========================================
// Moteur de chiffrage devis - Traits du catalogue
// ==========================================
// Collaborateurs externes, appels asynchrones: l'arbre n'est muté
// qu'APRÈS résolution de l'appel (pas d'insertion optimiste d'une
// fiche pas encore créée)
// ==========================================

use crate::catalog::error::CatalogResult;
use crate::catalog::records::{
    DetailLineDraft, DetailLineRecord, PartDraft, PartRecord, SubPartDraft, SubPartRecord,
};
use async_trait::async_trait;

/// Collaborateur de recherche catalogue
///
/// Recherche plein texte, bornée au parent pour les niveaux
/// inférieurs (les sous-lots et lignes sont rangés sous un parent).
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    async fn search_parts(&self, text: &str) -> CatalogResult<Vec<PartRecord>>;

    async fn search_sub_parts(
        &self,
        parent_part_id: &str,
        text: &str,
    ) -> CatalogResult<Vec<SubPartRecord>>;

    async fn search_detail_lines(
        &self,
        parent_sub_part_id: &str,
        text: &str,
    ) -> CatalogResult<Vec<DetailLineRecord>>;
}

/// Collaborateur de création catalogue
///
/// Retourne la fiche créée avec son identifiant attribué; les erreurs
/// de validation (doublon, champ manquant) remontent à l'opérateur.
#[async_trait]
pub trait CatalogWrite: Send + Sync {
    async fn create_part(&self, draft: PartDraft) -> CatalogResult<PartRecord>;

    async fn create_sub_part(
        &self,
        parent_part_id: &str,
        draft: SubPartDraft,
    ) -> CatalogResult<SubPartRecord>;

    async fn create_detail_line(
        &self,
        parent_sub_part_id: &str,
        draft: DetailLineDraft,
    ) -> CatalogResult<DetailLineRecord>;
}
