// ==========================================
// Moteur de chiffrage devis - Arbre de chiffrage
// ==========================================
// Responsabilité: magasin d'éléments + index de portée, rien d'autre
// Garantie: après chaque opération unitaire, chaque portée est un
// ordre total strict sur ordering_key (aucune égalité)
// Règle: tout refus intervient avant la moindre mutation
// ==========================================

use crate::domain::item::{
    DetailLine, ItemPatch, Part, QuoteItem, ScopeId, SpecialLine, SubPart,
};
use crate::domain::types::{BaseReference, ContextType, ItemKind};
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// PricingTree - Magasin des éléments du devis
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingTree {
    /// Tous les éléments, indexés par identifiant
    items: HashMap<String, QuoteItem>,
    /// Appartenance aux portées (non triée; le tri se fait à la lecture)
    scope_members: HashMap<ScopeId, Vec<String>>,
}

impl PricingTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&QuoteItem> {
        self.items.get(id)
    }

    /// Portée de rattachement d'un élément présent dans l'arbre
    pub fn scope_of(&self, id: &str) -> Option<ScopeId> {
        self.items.get(id).and_then(|item| item.scope())
    }

    // ==========================================
    // Accesseurs typés
    // ==========================================

    pub fn part(&self, id: &str) -> Option<&Part> {
        match self.items.get(id) {
            Some(QuoteItem::Part(p)) => Some(p),
            _ => None,
        }
    }

    pub fn sub_part(&self, id: &str) -> Option<&SubPart> {
        match self.items.get(id) {
            Some(QuoteItem::SubPart(sp)) => Some(sp),
            _ => None,
        }
    }

    pub fn detail_line(&self, id: &str) -> Option<&DetailLine> {
        match self.items.get(id) {
            Some(QuoteItem::DetailLine(dl)) => Some(dl),
            _ => None,
        }
    }

    pub fn special_line(&self, id: &str) -> Option<&SpecialLine> {
        match self.items.get(id) {
            Some(QuoteItem::SpecialLine(sl)) => Some(sl),
            _ => None,
        }
    }

    // ==========================================
    // Lectures ordonnées
    // ==========================================

    /// Séquence ordonnée d'une portée (toutes natures confondues)
    pub fn items_in_scope(&self, scope: &ScopeId) -> Vec<&QuoteItem> {
        let mut items: Vec<&QuoteItem> = self
            .scope_members
            .get(scope)
            .map(|ids| ids.iter().filter_map(|id| self.items.get(id)).collect())
            .unwrap_or_default();
        items.sort_by(|a, b| {
            a.ordering_key()
                .partial_cmp(&b.ordering_key())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        items
    }

    /// Identifiants ordonnés d'une portée
    pub fn ordered_ids_in_scope(&self, scope: &ScopeId) -> Vec<String> {
        self.items_in_scope(scope)
            .iter()
            .map(|item| item.id().to_string())
            .collect()
    }

    /// Lots du devis, dans l'ordre visuel
    pub fn parts(&self) -> Vec<&Part> {
        self.items_in_scope(&ScopeId::Global)
            .into_iter()
            .filter_map(|item| match item {
                QuoteItem::Part(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Sous-lots d'un lot, dans l'ordre visuel
    pub fn sub_parts_of(&self, part_id: &str) -> Vec<&SubPart> {
        self.items_in_scope(&ScopeId::Part(part_id.to_string()))
            .into_iter()
            .filter_map(|item| match item {
                QuoteItem::SubPart(sp) => Some(sp),
                _ => None,
            })
            .collect()
    }

    /// Lignes de détail d'un sous-lot, dans l'ordre visuel
    pub fn detail_lines_of(&self, sub_part_id: &str) -> Vec<&DetailLine> {
        self.items_in_scope(&ScopeId::SubPart(sub_part_id.to_string()))
            .into_iter()
            .filter_map(|item| match item {
                QuoteItem::DetailLine(dl) => Some(dl),
                _ => None,
            })
            .collect()
    }

    /// Lignes spéciales d'une portée, dans l'ordre visuel
    pub fn special_lines_in_scope(&self, scope: &ScopeId) -> Vec<&SpecialLine> {
        self.items_in_scope(scope)
            .into_iter()
            .filter_map(|item| match item {
                QuoteItem::SpecialLine(sl) => Some(sl),
                _ => None,
            })
            .collect()
    }

    /// Toutes les lignes spéciales du devis (ordre non significatif)
    pub fn special_lines(&self) -> Vec<&SpecialLine> {
        self.items
            .values()
            .filter_map(|item| match item {
                QuoteItem::SpecialLine(sl) => Some(sl),
                _ => None,
            })
            .collect()
    }

    /// Ordre visuel unique de toute la hiérarchie (aplati)
    ///
    /// Parcours en profondeur: portée globale, puis pour chaque lot
    /// sa portée, puis pour chaque sous-lot la sienne. Les lignes
    /// spéciales s'intercalent selon leur clé dans chaque portée.
    pub fn flattened(&self) -> Vec<&QuoteItem> {
        let mut out = Vec::with_capacity(self.items.len());
        for item in self.items_in_scope(&ScopeId::Global) {
            out.push(item);
            if let QuoteItem::Part(p) = item {
                for child in self.items_in_scope(&ScopeId::Part(p.id.clone())) {
                    out.push(child);
                    if let QuoteItem::SubPart(sp) = child {
                        for leaf in self.items_in_scope(&ScopeId::SubPart(sp.id.clone())) {
                            out.push(leaf);
                        }
                    }
                }
            }
        }
        out
    }

    // ==========================================
    // Insertion
    // ==========================================

    /// Admet un élément avec une clé d'ordre déjà attribuée
    ///
    /// Refus (arbre intact dans tous les cas):
    /// - `DuplicateId` si l'identifiant existe déjà
    /// - `InvalidScope` si le parent déclaré n'existe pas ou si le
    ///   contexte d'une ligne spéciale est incohérent
    /// - `ReferenceNotFound` si la base d'une ligne spéciale vise un
    ///   lot/sous-lot absent
    /// - `UnresolvableBase` si la base n'est pas définitive au moment
    ///   où la passe montante atteint la ligne
    /// - `OrderingConflict` en cas d'égalité de clé dans la portée
    pub fn insert(&mut self, item: QuoteItem, ordering_key: f64) -> EngineResult<ScopeId> {
        let id = item.id().to_string();
        if self.items.contains_key(&id) {
            return Err(EngineError::DuplicateId(id));
        }

        let scope = self.validate_membership(&item)?;

        if let QuoteItem::SpecialLine(sl) = &item {
            self.validate_base_reference(sl)?;
        }

        if !ordering_key.is_finite() {
            return Err(EngineError::OrderingConflict {
                scope,
                key: ordering_key,
            });
        }
        if self
            .items_in_scope(&scope)
            .iter()
            .any(|existing| existing.ordering_key() == ordering_key)
        {
            return Err(EngineError::OrderingConflict {
                scope,
                key: ordering_key,
            });
        }

        let mut item = item;
        item.set_ordering_key(ordering_key);
        debug!(id = %id, scope = %scope, key = ordering_key, "insertion dans l'arbre");
        self.scope_members
            .entry(scope.clone())
            .or_default()
            .push(id.clone());
        self.items.insert(id, item);
        Ok(scope)
    }

    /// Vérifie le rattachement d'un élément (parent vivant, bonne nature)
    fn validate_membership(&self, item: &QuoteItem) -> EngineResult<ScopeId> {
        match item {
            QuoteItem::Part(_) => Ok(ScopeId::Global),
            QuoteItem::SubPart(sp) => {
                if self.part(&sp.parent_part_id).is_none() {
                    return Err(EngineError::InvalidScope {
                        kind: ItemKind::SubPart,
                        id: sp.id.clone(),
                        message: format!("lot parent {} absent", sp.parent_part_id),
                    });
                }
                Ok(ScopeId::Part(sp.parent_part_id.clone()))
            }
            QuoteItem::DetailLine(dl) => {
                if self.sub_part(&dl.parent_sub_part_id).is_none() {
                    return Err(EngineError::InvalidScope {
                        kind: ItemKind::DetailLine,
                        id: dl.id.clone(),
                        message: format!("sous-lot parent {} absent", dl.parent_sub_part_id),
                    });
                }
                Ok(ScopeId::SubPart(dl.parent_sub_part_id.clone()))
            }
            QuoteItem::SpecialLine(sl) => {
                let scope = sl.scope().ok_or_else(|| EngineError::InvalidScope {
                    kind: ItemKind::SpecialLine,
                    id: sl.id.clone(),
                    message: format!(
                        "contexte incohérent: {} / {:?}",
                        sl.context_type, sl.context_id
                    ),
                })?;
                // Rejet des rattachements pendants à l'insertion, pas de tolérance silencieuse
                match &scope {
                    ScopeId::Global => {}
                    ScopeId::Part(part_id) => {
                        if self.part(part_id).is_none() {
                            return Err(EngineError::InvalidScope {
                                kind: ItemKind::SpecialLine,
                                id: sl.id.clone(),
                                message: format!("lot de rattachement {} absent", part_id),
                            });
                        }
                    }
                    ScopeId::SubPart(sub_part_id) => {
                        if self.sub_part(sub_part_id).is_none() {
                            return Err(EngineError::InvalidScope {
                                kind: ItemKind::SpecialLine,
                                id: sl.id.clone(),
                                message: format!("sous-lot de rattachement {} absent", sub_part_id),
                            });
                        }
                    }
                }
                Ok(scope)
            }
        }
    }

    /// Vérifie qu'une base est résoluble en passe montante
    ///
    /// Règle d'ordre de résolution: une base vise soit le total
    /// ENGLOBANT de la ligne (sémantique d'auto-exclusion), soit un
    /// total strictement plus profond que son contexte, soit un
    /// montant figé. Un total plus profond est déjà définitif quand la
    /// passe atteint la ligne; un total de même niveau ou englobant ne
    /// l'est pas encore (et deux références croisées de même niveau
    /// formeraient un cycle), d'où le rejet.
    pub(crate) fn validate_base_reference(&self, line: &SpecialLine) -> EngineResult<()> {
        match (&line.base_reference, line.context_type) {
            (BaseReference::Literal { .. }, _) => Ok(()),

            (BaseReference::GlobalExcludingSelf, ContextType::Global) => Ok(()),
            (BaseReference::GlobalExcludingSelf, _) => Err(EngineError::UnresolvableBase {
                line_id: line.id.clone(),
                message: "le total général n'est définitif qu'après le contexte de la ligne"
                    .to_string(),
            }),

            (BaseReference::PartTotal { part_id }, context) => {
                if self.part(part_id).is_none() {
                    return Err(EngineError::ReferenceNotFound {
                        entity: "lot".to_string(),
                        id: part_id.clone(),
                    });
                }
                match context {
                    ContextType::Global => Ok(()),
                    ContextType::Part if line.context_id.as_deref() == Some(part_id) => Ok(()),
                    _ => Err(EngineError::UnresolvableBase {
                        line_id: line.id.clone(),
                        message: format!(
                            "le total du lot {} n'est pas encore définitif depuis ce contexte",
                            part_id
                        ),
                    }),
                }
            }

            (BaseReference::SubPartTotal { sub_part_id }, context) => {
                if self.sub_part(sub_part_id).is_none() {
                    return Err(EngineError::ReferenceNotFound {
                        entity: "sous-lot".to_string(),
                        id: sub_part_id.clone(),
                    });
                }
                match context {
                    ContextType::Global | ContextType::Part => Ok(()),
                    ContextType::SubPart if line.context_id.as_deref() == Some(sub_part_id) => {
                        Ok(())
                    }
                    _ => Err(EngineError::UnresolvableBase {
                        line_id: line.id.clone(),
                        message: format!(
                            "le total du sous-lot {} n'est pas encore définitif depuis ce contexte",
                            sub_part_id
                        ),
                    }),
                }
            }
        }
    }

    // ==========================================
    // Suppression
    // ==========================================

    /// Supprime un élément et toute sa descendance
    ///
    /// Les clés des éléments restants ne sont jamais renumérotées et
    /// les clés supprimées ne sont jamais réutilisées. Refusé si une
    /// ligne spéciale extérieure prend un élément supprimé pour base.
    pub fn remove(&mut self, id: &str) -> EngineResult<Vec<QuoteItem>> {
        if !self.items.contains_key(id) {
            return Err(EngineError::NotFound(id.to_string()));
        }

        let removal_set = self.collect_removal_set(id);

        // Les lignes rattachées aux portées supprimées sont dans le lot
        // de suppression; seules les bases externes peuvent pendre.
        for line in self.special_lines() {
            if removal_set.contains(&line.id) {
                continue;
            }
            let base_target = match &line.base_reference {
                BaseReference::PartTotal { part_id } => Some(part_id),
                BaseReference::SubPartTotal { sub_part_id } => Some(sub_part_id),
                _ => None,
            };
            if let Some(target) = base_target {
                if removal_set.iter().any(|removed| removed == target) {
                    return Err(EngineError::StillReferenced {
                        id: target.clone(),
                        referenced_by: line.id.clone(),
                    });
                }
            }
        }

        let mut removed = Vec::with_capacity(removal_set.len());
        for removed_id in &removal_set {
            if let Some(item) = self.items.remove(removed_id) {
                if let Some(scope) = item.scope() {
                    if let Some(members) = self.scope_members.get_mut(&scope) {
                        members.retain(|member| member != removed_id);
                    }
                }
                removed.push(item);
            }
        }
        // Purge des portées devenues orphelines
        self.scope_members.retain(|_, members| !members.is_empty());
        debug!(id = %id, count = removed.len(), "suppression dans l'arbre");
        Ok(removed)
    }

    /// Identifiants de l'élément et de toute sa descendance
    fn collect_removal_set(&self, id: &str) -> Vec<String> {
        let mut set = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < set.len() {
            let current = set[cursor].clone();
            cursor += 1;
            let child_scopes = match self.items.get(&current) {
                Some(QuoteItem::Part(p)) => vec![ScopeId::Part(p.id.clone())],
                Some(QuoteItem::SubPart(sp)) => vec![ScopeId::SubPart(sp.id.clone())],
                _ => vec![],
            };
            for scope in child_scopes {
                if let Some(members) = self.scope_members.get(&scope) {
                    set.extend(members.iter().cloned());
                }
            }
        }
        set
    }

    // ==========================================
    // Mise à jour en place
    // ==========================================

    /// Applique un patch de champs (la clé d'ordre est hors d'atteinte)
    pub fn update(&mut self, id: &str, patch: ItemPatch) -> EngineResult<()> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        match (item, patch) {
            (QuoteItem::Part(p), ItemPatch::Part(patch)) => {
                if let Some(title) = patch.title {
                    p.title = title;
                }
                if let Some(display_number) = patch.display_number {
                    p.display_number = Some(display_number);
                }
            }
            (QuoteItem::SubPart(sp), ItemPatch::SubPart(patch)) => {
                if let Some(description) = patch.description {
                    sp.description = description;
                }
                if let Some(display_number) = patch.display_number {
                    sp.display_number = Some(display_number);
                }
            }
            (QuoteItem::DetailLine(dl), ItemPatch::DetailLine(patch)) => {
                if let Some(description) = patch.description {
                    dl.description = description;
                }
                if let Some(unit) = patch.unit {
                    dl.unit = unit;
                }
                if let Some(quantity) = patch.quantity {
                    dl.quantity = quantity;
                }
                if let Some(labor_cost) = patch.labor_cost {
                    dl.labor_cost = labor_cost;
                }
                if let Some(material_cost) = patch.material_cost {
                    dl.material_cost = material_cost;
                }
                if let Some(overhead_rate_pct) = patch.overhead_rate_pct {
                    dl.overhead_rate_pct = overhead_rate_pct;
                }
                if let Some(margin_pct) = patch.margin_pct {
                    dl.margin_pct = margin_pct;
                }
                if let Some(price_override) = patch.price_override {
                    dl.price_override = price_override;
                }
            }
            (QuoteItem::SpecialLine(sl), ItemPatch::SpecialLine(patch)) => {
                if let Some(description) = patch.description {
                    sl.description = description;
                }
                if let Some(value) = patch.value {
                    sl.value = value;
                }
                if let Some(value_kind) = patch.value_kind {
                    sl.value_kind = value_kind;
                }
                if let Some(effect) = patch.effect {
                    sl.effect = effect;
                }
            }
            (item, patch) => {
                return Err(EngineError::PatchMismatch {
                    id: id.to_string(),
                    expected: item.kind(),
                    got: patch.kind(),
                });
            }
        }
        Ok(())
    }

    // ==========================================
    // Écriture de clé réservée aux moteurs
    // ==========================================

    /// Réécrit la clé d'ordre d'un élément
    ///
    /// Réservé à OrderingEngine et PlacementResolver, qui garantissent
    /// l'absence d'égalité après l'opération complète.
    pub(crate) fn write_ordering_key(&mut self, id: &str, key: f64) -> EngineResult<()> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        item.set_ordering_key(key);
        Ok(())
    }
}
