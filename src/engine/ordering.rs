// ==========================================
// Moteur de chiffrage devis - Moteur d'ordonnancement
// ==========================================
// Responsabilité: réordonner une portée après un glisser-déposer
// Contraintes de mouvement (bloquantes, pas indicatives):
// - lot: portée globale uniquement
// - sous-lot: portée de son propre lot uniquement
// - ligne de détail: portée de son propre sous-lot uniquement
// - ligne spéciale: jamais par ce chemin (voir PlacementResolver)
// Règle: tout refus est un no-op strict avec raison explicite
// ==========================================

use crate::domain::item::{QuoteItem, ScopeId};
use crate::domain::types::ItemKind;
use crate::engine::error::EngineResult;
use crate::engine::tree::PricingTree;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// ==========================================
// DragEvent - Résultat brut d'un glisser-déposer
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragEvent {
    pub item_id: String,      // Élément déplacé
    pub source_scope: ScopeId, // Portée de départ
    pub source_index: usize,  // Position de départ dans la portée
    pub dest_scope: ScopeId,  // Portée de dépôt
    pub dest_index: usize,    // Position de dépôt dans la portée
}

// ==========================================
// IgnoreReason - Motif d'absorption silencieuse
// ==========================================
// La couche de présentation est censée interdire ces dépôts; quand
// ils surviennent malgré tout, le moteur les absorbe en no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IgnoreReason {
    CrossScope,      // Dépôt dans une portée étrangère
    OutOfBounds,     // Indice hors de la séquence
    SamePosition,    // Départ et arrivée identiques
    SpecialLineDrag, // Ligne spéciale glissée (réservé au placement)
    UnknownItem,     // Élément inconnu ou incohérent avec l'indice
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::CrossScope => write!(f, "CROSS_SCOPE"),
            IgnoreReason::OutOfBounds => write!(f, "OUT_OF_BOUNDS"),
            IgnoreReason::SamePosition => write!(f, "SAME_POSITION"),
            IgnoreReason::SpecialLineDrag => write!(f, "SPECIAL_LINE_DRAG"),
            IgnoreReason::UnknownItem => write!(f, "UNKNOWN_ITEM"),
        }
    }
}

// ==========================================
// ReorderOutcome - Issue d'un réordonnancement
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReorderOutcome {
    /// Mouvement appliqué; la portée a été renumérotée
    Applied { scope: ScopeId, moved_id: String },
    /// Mouvement absorbé en no-op strict, avec motif
    Ignored { reason: IgnoreReason },
}

impl ReorderOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReorderOutcome::Applied { .. })
    }
}

// ==========================================
// OrderingEngine - Moteur d'ordonnancement
// ==========================================
pub struct OrderingEngine {
    key_spacing: f64,
}

impl OrderingEngine {
    pub fn new(key_spacing: f64) -> Self {
        Self { key_spacing }
    }

    /// Applique un résultat de glisser-déposer sur une portée
    ///
    /// Mouvement valide: renumérotation complète de la portée en
    /// séquence croissante fraîche suivant le nouvel ordre visuel
    /// (lignes spéciales de la portée comprises: elles font partie de
    /// l'ordre visuel même si elles ne sont jamais l'élément glissé).
    /// Les éléments hors portée ne sont jamais touchés.
    pub fn reorder(&self, tree: &mut PricingTree, event: &DragEvent) -> ReorderOutcome {
        if event.source_scope != event.dest_scope {
            return self.ignored(event, IgnoreReason::CrossScope);
        }

        let ordered = tree.ordered_ids_in_scope(&event.source_scope);
        if event.source_index >= ordered.len() || event.dest_index >= ordered.len() {
            return self.ignored(event, IgnoreReason::OutOfBounds);
        }
        if ordered[event.source_index] != event.item_id {
            return self.ignored(event, IgnoreReason::UnknownItem);
        }
        if event.source_index == event.dest_index {
            return self.ignored(event, IgnoreReason::SamePosition);
        }

        let item = match tree.get(&event.item_id) {
            Some(item) => item,
            None => return self.ignored(event, IgnoreReason::UnknownItem),
        };
        if item.kind() == ItemKind::SpecialLine {
            return self.ignored(event, IgnoreReason::SpecialLineDrag);
        }
        // La nature de l'élément doit correspondre au niveau de la portée
        if !Self::kind_matches_scope(item, &event.source_scope) {
            return self.ignored(event, IgnoreReason::CrossScope);
        }

        let mut reordered = ordered;
        let moved = reordered.remove(event.source_index);
        reordered.insert(event.dest_index, moved);

        // La renumérotation ne peut échouer: tous les identifiants
        // viennent d'être lus dans la portée
        if self.renumber_ids(tree, &reordered).is_err() {
            return self.ignored(event, IgnoreReason::UnknownItem);
        }

        debug!(
            item_id = %event.item_id,
            scope = %event.source_scope,
            from = event.source_index,
            to = event.dest_index,
            "réordonnancement appliqué"
        );
        ReorderOutcome::Applied {
            scope: event.source_scope.clone(),
            moved_id: event.item_id.clone(),
        }
    }

    /// Attribue la prochaine clé de fin de portée (admission en annexe)
    pub fn append(&self, tree: &mut PricingTree, item: QuoteItem) -> EngineResult<f64> {
        let scope = item
            .scope()
            .ok_or_else(|| crate::engine::error::EngineError::InvalidScope {
                kind: item.kind(),
                id: item.id().to_string(),
                message: "contexte incohérent".to_string(),
            })?;
        let key = tree
            .items_in_scope(&scope)
            .last()
            .map(|last| last.ordering_key() + self.key_spacing)
            .unwrap_or(self.key_spacing);
        tree.insert(item, key)?;
        Ok(key)
    }

    /// Renumérote une portée entière en séquence paire fraîche
    ///
    /// Préserve exactement l'ordre relatif existant; utilisé aussi par
    /// PlacementResolver quand l'espace de clés est épuisé.
    pub fn renumber_scope(&self, tree: &mut PricingTree, scope: &ScopeId) -> EngineResult<()> {
        let ordered = tree.ordered_ids_in_scope(scope);
        self.renumber_ids(tree, &ordered)
    }

    fn renumber_ids(&self, tree: &mut PricingTree, ordered: &[String]) -> EngineResult<()> {
        for (index, id) in ordered.iter().enumerate() {
            tree.write_ordering_key(id, self.key_spacing * (index as f64 + 1.0))?;
        }
        Ok(())
    }

    fn kind_matches_scope(item: &QuoteItem, scope: &ScopeId) -> bool {
        matches!(
            (item.kind(), scope),
            (ItemKind::Part, ScopeId::Global)
                | (ItemKind::SubPart, ScopeId::Part(_))
                | (ItemKind::DetailLine, ScopeId::SubPart(_))
        )
    }

    fn ignored(&self, event: &DragEvent, reason: IgnoreReason) -> ReorderOutcome {
        debug!(item_id = %event.item_id, reason = %reason, "glisser-déposer absorbé en no-op");
        ReorderOutcome::Ignored { reason }
    }
}

impl Default for OrderingEngine {
    fn default() -> Self {
        Self::new(crate::config::EngineConfig::default().key_spacing)
    }
}
