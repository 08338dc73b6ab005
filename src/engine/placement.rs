// ==========================================
// Moteur de chiffrage devis - Résolveur de placement
// ==========================================
// Responsabilité: convertir un jeton « insérer ici » en
// (portée, voisin précédent, voisin suivant) puis attribuer la clé
// au point milieu, avec repli par renumérotation de la portée quand
// l'espace de clés est épuisé.
// Garantie: aucune clé hors de la portée cible n'est jamais touchée;
// dans la portée, seules les renumérotations de repli modifient les
// clés existantes, en préservant prouvablement l'ordre relatif.
// Échec: jeton visant un identifiant absent -> ReferenceNotFound,
// arbre bit-à-bit identique.
// ==========================================

use crate::domain::item::{QuoteItem, ScopeId, SpecialLine, SpecialLineDraft};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::ordering::OrderingEngine;
use crate::engine::tree::PricingTree;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// ==========================================
// PlacementToken - Jeton de position choisi par l'opérateur
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementToken {
    GlobalStart,
    GlobalEnd,
    BeforePart(String),
    AfterPart(String),
    BeforeSubPart(String),
    AfterSubPart(String),
    BeforeDetailLine(String),
    AfterDetailLine(String),
    AfterSpecialLine(String),
}

impl fmt::Display for PlacementToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementToken::GlobalStart => write!(f, "GLOBAL_START"),
            PlacementToken::GlobalEnd => write!(f, "GLOBAL_END"),
            PlacementToken::BeforePart(id) => write!(f, "BEFORE_PART({})", id),
            PlacementToken::AfterPart(id) => write!(f, "AFTER_PART({})", id),
            PlacementToken::BeforeSubPart(id) => write!(f, "BEFORE_SUB_PART({})", id),
            PlacementToken::AfterSubPart(id) => write!(f, "AFTER_SUB_PART({})", id),
            PlacementToken::BeforeDetailLine(id) => write!(f, "BEFORE_DETAIL_LINE({})", id),
            PlacementToken::AfterDetailLine(id) => write!(f, "AFTER_DETAIL_LINE({})", id),
            PlacementToken::AfterSpecialLine(id) => write!(f, "AFTER_SPECIAL_LINE({})", id),
        }
    }
}

// ==========================================
// ResolvedPlacement - Placement résolu et appliqué
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlacement {
    pub line_id: String,            // Identifiant attribué à la ligne insérée
    pub scope: ScopeId,             // Portée cible
    pub predecessor_id: Option<String>, // Voisin précédent (None en tête de portée)
    pub successor_id: Option<String>,   // Voisin suivant (None en fin de portée)
    pub ordering_key: f64,          // Clé attribuée
    pub renumbered: bool,           // Repli par renumérotation déclenché
}

// ==========================================
// PlacementResolver - Résolveur de placement
// ==========================================
pub struct PlacementResolver {
    key_spacing: f64,
    min_key_gap: f64,
}

impl PlacementResolver {
    pub fn new(key_spacing: f64, min_key_gap: f64) -> Self {
        Self {
            key_spacing,
            min_key_gap,
        }
    }

    /// Résout un jeton puis insère la ligne spéciale en attente
    ///
    /// Toutes les validations (jeton, base de calcul) précèdent la
    /// moindre mutation: en cas d'échec l'appelant jette le brouillon
    /// et l'arbre est inchangé.
    pub fn place(
        &self,
        tree: &mut PricingTree,
        ordering: &OrderingEngine,
        token: &PlacementToken,
        draft: SpecialLineDraft,
    ) -> EngineResult<ResolvedPlacement> {
        let (scope, predecessor_id, successor_id) = self.resolve_neighbors(tree, token)?;

        // Construction anticipée: l'insertion revalide contexte et base,
        // mais la base doit être contrôlée AVANT tout repli de renumérotation
        let probe = SpecialLine::from_draft(draft, &scope, f64::NAN);
        self.precheck_base(tree, &probe)?;

        let (key, renumbered) =
            self.assign_key(tree, ordering, &scope, &predecessor_id, &successor_id)?;

        let mut line = probe;
        line.ordering_key = key;
        let line_id = line.id.clone();
        tree.insert(QuoteItem::SpecialLine(line), key)?;

        debug!(
            line_id = %line_id,
            token = %token,
            scope = %scope,
            key,
            renumbered,
            "ligne spéciale placée"
        );
        Ok(ResolvedPlacement {
            line_id,
            scope,
            predecessor_id,
            successor_id,
            ordering_key: key,
            renumbered,
        })
    }

    // ==========================================
    // Résolution des voisins
    // ==========================================

    /// Associe déterministement le jeton à (portée, précédent, suivant)
    fn resolve_neighbors(
        &self,
        tree: &PricingTree,
        token: &PlacementToken,
    ) -> EngineResult<(ScopeId, Option<String>, Option<String>)> {
        match token {
            PlacementToken::GlobalStart => {
                let ordered = tree.ordered_ids_in_scope(&ScopeId::Global);
                Ok((ScopeId::Global, None, ordered.first().cloned()))
            }
            PlacementToken::GlobalEnd => {
                let ordered = tree.ordered_ids_in_scope(&ScopeId::Global);
                Ok((ScopeId::Global, ordered.last().cloned(), None))
            }
            PlacementToken::BeforePart(id) => {
                self.require(tree.part(id).is_some(), "lot", id)?;
                Ok(self.neighbors_around(tree, &ScopeId::Global, id, Side::Before))
            }
            PlacementToken::AfterPart(id) => {
                self.require(tree.part(id).is_some(), "lot", id)?;
                Ok(self.neighbors_around(tree, &ScopeId::Global, id, Side::After))
            }
            PlacementToken::BeforeSubPart(id) => {
                let sub_part = tree
                    .sub_part(id)
                    .ok_or_else(|| self.not_found("sous-lot", id))?;
                let scope = ScopeId::Part(sub_part.parent_part_id.clone());
                Ok(self.neighbors_around(tree, &scope, id, Side::Before))
            }
            PlacementToken::AfterSubPart(id) => {
                let sub_part = tree
                    .sub_part(id)
                    .ok_or_else(|| self.not_found("sous-lot", id))?;
                let scope = ScopeId::Part(sub_part.parent_part_id.clone());
                Ok(self.neighbors_around(tree, &scope, id, Side::After))
            }
            PlacementToken::BeforeDetailLine(id) => {
                let line = tree
                    .detail_line(id)
                    .ok_or_else(|| self.not_found("ligne de détail", id))?;
                let scope = ScopeId::SubPart(line.parent_sub_part_id.clone());
                Ok(self.neighbors_around(tree, &scope, id, Side::Before))
            }
            PlacementToken::AfterDetailLine(id) => {
                let line = tree
                    .detail_line(id)
                    .ok_or_else(|| self.not_found("ligne de détail", id))?;
                let scope = ScopeId::SubPart(line.parent_sub_part_id.clone());
                Ok(self.neighbors_around(tree, &scope, id, Side::After))
            }
            PlacementToken::AfterSpecialLine(id) => {
                let line = tree
                    .special_line(id)
                    .ok_or_else(|| self.not_found("ligne spéciale", id))?;
                let scope = line.scope().ok_or_else(|| self.not_found("portée", id))?;
                Ok(self.neighbors_around(tree, &scope, id, Side::After))
            }
        }
    }

    /// Voisins immédiats d'un élément de référence dans sa portée
    fn neighbors_around(
        &self,
        tree: &PricingTree,
        scope: &ScopeId,
        reference_id: &str,
        side: Side,
    ) -> (ScopeId, Option<String>, Option<String>) {
        let ordered = tree.ordered_ids_in_scope(scope);
        let position = ordered.iter().position(|id| id == reference_id);
        let position = match position {
            Some(position) => position,
            // La portée d'un élément vivant le contient toujours
            None => return (scope.clone(), None, None),
        };
        match side {
            Side::Before => {
                let predecessor = position.checked_sub(1).map(|i| ordered[i].clone());
                (scope.clone(), predecessor, Some(ordered[position].clone()))
            }
            Side::After => {
                let successor = ordered.get(position + 1).cloned();
                (scope.clone(), Some(ordered[position].clone()), successor)
            }
        }
    }

    // ==========================================
    // Attribution de clé
    // ==========================================

    /// Clé au point milieu, bornes extrapolées, repli par renumérotation
    fn assign_key(
        &self,
        tree: &mut PricingTree,
        ordering: &OrderingEngine,
        scope: &ScopeId,
        predecessor_id: &Option<String>,
        successor_id: &Option<String>,
    ) -> EngineResult<(f64, bool)> {
        if let Some(key) = self.try_midpoint(tree, predecessor_id, successor_id) {
            return Ok((key, false));
        }

        // Espace de clés épuisé entre les voisins: renumérotation paire
        // de la portée entière (ordre relatif préservé), puis nouvel essai
        ordering.renumber_scope(tree, scope)?;
        match self.try_midpoint(tree, predecessor_id, successor_id) {
            Some(key) => Ok((key, true)),
            // Après renumérotation à key_spacing d'écart, le milieu est
            // toujours représentable; ce bras est une garde défensive
            None => Err(EngineError::OrderingConflict {
                scope: scope.clone(),
                key: f64::NAN,
            }),
        }
    }

    /// Point milieu strict entre les clés des voisins, si représentable
    fn try_midpoint(
        &self,
        tree: &PricingTree,
        predecessor_id: &Option<String>,
        successor_id: &Option<String>,
    ) -> Option<f64> {
        let predecessor_key = predecessor_id
            .as_ref()
            .and_then(|id| tree.get(id))
            .map(|item| item.ordering_key());
        let successor_key = successor_id
            .as_ref()
            .and_then(|id| tree.get(id))
            .map(|item| item.ordering_key());

        match (predecessor_key, successor_key) {
            // Portée vide
            (None, None) => Some(self.key_spacing),
            // Fin de portée: borne extrapolée vers le haut
            (Some(predecessor), None) => Some(predecessor + self.key_spacing),
            // Tête de portée: borne extrapolée vers le bas (négatif admis)
            (None, Some(successor)) => Some(successor - self.key_spacing),
            (Some(predecessor), Some(successor)) => {
                let gap = successor - predecessor;
                if gap <= self.min_key_gap {
                    return None;
                }
                let midpoint = predecessor + gap / 2.0;
                if predecessor < midpoint && midpoint < successor {
                    Some(midpoint)
                } else {
                    None
                }
            }
        }
    }

    fn precheck_base(&self, tree: &PricingTree, line: &SpecialLine) -> EngineResult<()> {
        // Mêmes règles que l'insertion, contrôlées avant tout repli
        tree.validate_base_reference(line)
    }

    fn require(&self, present: bool, entity: &str, id: &str) -> EngineResult<()> {
        if present {
            Ok(())
        } else {
            Err(self.not_found(entity, id))
        }
    }

    fn not_found(&self, entity: &str, id: &str) -> EngineError {
        EngineError::ReferenceNotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

enum Side {
    Before,
    After,
}

impl Default for PlacementResolver {
    fn default() -> Self {
        let config = crate::config::EngineConfig::default();
        Self::new(config.key_spacing, config.min_key_gap)
    }
}
