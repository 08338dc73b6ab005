// ==========================================
// Moteur de chiffrage devis - Catalogue en mémoire
// ==========================================
// Implémentation locale des collaborateurs catalogue: tests et
// hôtes sans serveur. Les règles de validation (doublon d'intitulé,
// champ obligatoire) sont celles du collaborateur réel.
// ==========================================

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::records::{
    DetailLineDraft, DetailLineRecord, PartDraft, PartRecord, SubPartDraft, SubPartRecord,
};
use crate::catalog::traits::{CatalogQuery, CatalogWrite};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct CatalogStore {
    parts: Vec<PartRecord>,
    /// Sous-lots rangés par lot parent
    sub_parts: HashMap<String, Vec<SubPartRecord>>,
    /// Lignes de détail rangées par sous-lot parent
    detail_lines: HashMap<String, Vec<DetailLineRecord>>,
}

/// Catalogue en mémoire
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    store: Mutex<CatalogStore>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CatalogResult<std::sync::MutexGuard<'_, CatalogStore>> {
        self.store
            .lock()
            .map_err(|e| CatalogError::Backend(e.to_string()))
    }

    fn matches(haystack: &str, needle: &str) -> bool {
        needle.trim().is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

#[async_trait]
impl CatalogQuery for InMemoryCatalog {
    async fn search_parts(&self, text: &str) -> CatalogResult<Vec<PartRecord>> {
        let store = self.lock()?;
        Ok(store
            .parts
            .iter()
            .filter(|record| Self::matches(&record.title, text))
            .cloned()
            .collect())
    }

    async fn search_sub_parts(
        &self,
        parent_part_id: &str,
        text: &str,
    ) -> CatalogResult<Vec<SubPartRecord>> {
        let store = self.lock()?;
        Ok(store
            .sub_parts
            .get(parent_part_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| Self::matches(&record.description, text))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn search_detail_lines(
        &self,
        parent_sub_part_id: &str,
        text: &str,
    ) -> CatalogResult<Vec<DetailLineRecord>> {
        let store = self.lock()?;
        Ok(store
            .detail_lines
            .get(parent_sub_part_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| Self::matches(&record.description, text))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogWrite for InMemoryCatalog {
    async fn create_part(&self, draft: PartDraft) -> CatalogResult<PartRecord> {
        if draft.title.trim().is_empty() {
            return Err(CatalogError::MissingField("title"));
        }
        let mut store = self.lock()?;
        if store
            .parts
            .iter()
            .any(|record| record.title.eq_ignore_ascii_case(&draft.title))
        {
            return Err(CatalogError::DuplicateName(draft.title));
        }
        let record = PartRecord {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
        };
        store.parts.push(record.clone());
        Ok(record)
    }

    async fn create_sub_part(
        &self,
        parent_part_id: &str,
        draft: SubPartDraft,
    ) -> CatalogResult<SubPartRecord> {
        if draft.description.trim().is_empty() {
            return Err(CatalogError::MissingField("description"));
        }
        let mut store = self.lock()?;
        let siblings = store
            .sub_parts
            .entry(parent_part_id.to_string())
            .or_default();
        if siblings
            .iter()
            .any(|record| record.description.eq_ignore_ascii_case(&draft.description))
        {
            return Err(CatalogError::DuplicateName(draft.description));
        }
        let record = SubPartRecord {
            id: Uuid::new_v4().to_string(),
            description: draft.description,
        };
        siblings.push(record.clone());
        Ok(record)
    }

    async fn create_detail_line(
        &self,
        parent_sub_part_id: &str,
        draft: DetailLineDraft,
    ) -> CatalogResult<DetailLineRecord> {
        if draft.description.trim().is_empty() {
            return Err(CatalogError::MissingField("description"));
        }
        if draft.unit.trim().is_empty() {
            return Err(CatalogError::MissingField("unit"));
        }
        let mut store = self.lock()?;
        let siblings = store
            .detail_lines
            .entry(parent_sub_part_id.to_string())
            .or_default();
        if siblings
            .iter()
            .any(|record| record.description.eq_ignore_ascii_case(&draft.description))
        {
            return Err(CatalogError::DuplicateName(draft.description));
        }
        // Prix indicatif catalogue: même chaîne de majoration que le moteur
        let base = draft.labor_cost + draft.material_cost;
        let price =
            base * (1.0 + draft.overhead_rate_pct / 100.0) * (1.0 + draft.margin_pct / 100.0);
        let record = DetailLineRecord {
            id: Uuid::new_v4().to_string(),
            description: draft.description,
            unit: draft.unit,
            labor_cost: draft.labor_cost,
            material_cost: draft.material_cost,
            overhead_rate_pct: draft.overhead_rate_pct,
            margin_pct: draft.margin_pct,
            price,
        };
        siblings.push(record.clone());
        Ok(record)
    }
}
