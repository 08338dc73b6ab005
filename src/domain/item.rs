// ==========================================
// Moteur de chiffrage devis - Entités du devis
// ==========================================
// Quatre natures d'éléments, un type somme par nature (pas de
// champs optionnels hors-nature): les contraintes de portée sont
// vérifiables à la compilation.
// Clé d'ordre: f64, ordre strict sans égalité au sein d'une portée.
// ==========================================

use crate::domain::types::{BaseReference, ContextType, ItemKind, LineEffect, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==========================================
// ScopeId - Identifiant de portée
// ==========================================
// Chaque élément appartient à exactement une portée:
// - lots et lignes spéciales globales -> Global
// - sous-lots et lignes spéciales de lot -> Part(id)
// - lignes de détail et lignes spéciales de sous-lot -> SubPart(id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "owner_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeId {
    Global,
    Part(String),
    SubPart(String),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Global => write!(f, "GLOBAL"),
            ScopeId::Part(id) => write!(f, "PART({})", id),
            ScopeId::SubPart(id) => write!(f, "SUB_PART({})", id),
        }
    }
}

// ==========================================
// Part - Lot
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,                     // Identifiant catalogue
    pub title: String,                  // Intitulé du lot
    pub display_number: Option<String>, // Numérotation d'affichage (ex: "2.")
    pub ordering_key: f64,              // Clé d'ordre dans la portée globale
}

// ==========================================
// SubPart - Sous-lot
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPart {
    pub id: String,                     // Identifiant catalogue
    pub description: String,            // Descriptif du sous-lot
    pub display_number: Option<String>, // Numérotation d'affichage (ex: "2.1")
    pub parent_part_id: String,         // Lot parent
    pub ordering_key: f64,              // Clé d'ordre dans la portée du lot parent
}

// ==========================================
// DetailLine - Ligne de détail
// ==========================================
// Prix unitaire dérivé: (déboursé main d'oeuvre + fournitures)
// majoré des frais généraux puis de la marge, sauf prix imposé
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailLine {
    pub id: String,                  // Identifiant catalogue
    pub description: String,         // Descriptif de l'ouvrage
    pub unit: String,                // Unité de vente (m², ml, u, ...)
    pub quantity: f64,               // Quantité choisie par l'opérateur
    pub labor_cost: f64,             // Déboursé main d'oeuvre unitaire
    pub material_cost: f64,          // Déboursé fournitures unitaire
    pub overhead_rate_pct: f64,      // Taux de frais généraux (%)
    pub margin_pct: f64,             // Marge (%)
    pub price_override: Option<f64>, // Prix unitaire imposé (court-circuite le calcul)
    pub parent_sub_part_id: String,  // Sous-lot parent
    pub ordering_key: f64,           // Clé d'ordre dans la portée du sous-lot parent
}

// ==========================================
// SpecialLine - Ligne spéciale
// ==========================================
// Remise ou majoration libre, insérable à toute position de la
// hiérarchie. context_id est None si et seulement si le contexte
// est global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialLine {
    pub id: String,                   // UUID attribué à la création
    pub description: String,          // Libellé affiché
    pub value: f64,                   // Pourcentage ou montant, selon value_kind
    pub value_kind: ValueKind,        // PERCENTAGE / FIXED
    pub effect: LineEffect,           // ADDITION / REDUCTION
    pub context_type: ContextType,    // GLOBAL / PART / SUB_PART
    pub context_id: Option<String>,   // Lot ou sous-lot de rattachement (None si global)
    pub base_reference: BaseReference, // Base de calcul (totaux structurels uniquement)
    pub ordering_key: f64,            // Clé d'ordre dans la portée de rattachement
}

impl SpecialLine {
    /// Portée de rattachement dérivée du contexte
    ///
    /// Retourne None si le couple (context_type, context_id) est
    /// incohérent; le PricingTree rejette ce cas à l'insertion.
    pub fn scope(&self) -> Option<ScopeId> {
        match (self.context_type, self.context_id.as_ref()) {
            (ContextType::Global, None) => Some(ScopeId::Global),
            (ContextType::Part, Some(id)) => Some(ScopeId::Part(id.clone())),
            (ContextType::SubPart, Some(id)) => Some(ScopeId::SubPart(id.clone())),
            _ => None,
        }
    }

    /// Construit une ligne depuis un brouillon, rattachée à une portée
    ///
    /// L'identifiant est attribué ici (UUID v4); le contexte est
    /// entièrement dérivé de la portée cible, jamais du brouillon.
    pub fn from_draft(draft: SpecialLineDraft, scope: &ScopeId, ordering_key: f64) -> Self {
        let (context_type, context_id) = match scope {
            ScopeId::Global => (ContextType::Global, None),
            ScopeId::Part(id) => (ContextType::Part, Some(id.clone())),
            ScopeId::SubPart(id) => (ContextType::SubPart, Some(id.clone())),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            description: draft.description,
            value: draft.value,
            value_kind: draft.value_kind,
            effect: draft.effect,
            context_type,
            context_id,
            base_reference: draft.base_reference,
            ordering_key,
        }
    }
}

// ==========================================
// SpecialLineDraft - Ligne spéciale en attente de placement
// ==========================================
// Saisie opérateur avant résolution du jeton de placement:
// pas d'identifiant, pas de contexte, pas de clé d'ordre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialLineDraft {
    pub description: String,
    pub value: f64,
    pub value_kind: ValueKind,
    pub effect: LineEffect,
    pub base_reference: BaseReference,
}

// ==========================================
// QuoteItem - Type somme des éléments du devis
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteItem {
    Part(Part),
    SubPart(SubPart),
    DetailLine(DetailLine),
    SpecialLine(SpecialLine),
}

impl QuoteItem {
    pub fn id(&self) -> &str {
        match self {
            QuoteItem::Part(p) => &p.id,
            QuoteItem::SubPart(sp) => &sp.id,
            QuoteItem::DetailLine(dl) => &dl.id,
            QuoteItem::SpecialLine(sl) => &sl.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            QuoteItem::Part(_) => ItemKind::Part,
            QuoteItem::SubPart(_) => ItemKind::SubPart,
            QuoteItem::DetailLine(_) => ItemKind::DetailLine,
            QuoteItem::SpecialLine(_) => ItemKind::SpecialLine,
        }
    }

    pub fn ordering_key(&self) -> f64 {
        match self {
            QuoteItem::Part(p) => p.ordering_key,
            QuoteItem::SubPart(sp) => sp.ordering_key,
            QuoteItem::DetailLine(dl) => dl.ordering_key,
            QuoteItem::SpecialLine(sl) => sl.ordering_key,
        }
    }

    pub fn set_ordering_key(&mut self, key: f64) {
        match self {
            QuoteItem::Part(p) => p.ordering_key = key,
            QuoteItem::SubPart(sp) => sp.ordering_key = key,
            QuoteItem::DetailLine(dl) => dl.ordering_key = key,
            QuoteItem::SpecialLine(sl) => sl.ordering_key = key,
        }
    }

    /// Portée de rattachement, dérivée des liens parents
    ///
    /// None uniquement pour une ligne spéciale au contexte incohérent.
    pub fn scope(&self) -> Option<ScopeId> {
        match self {
            QuoteItem::Part(_) => Some(ScopeId::Global),
            QuoteItem::SubPart(sp) => Some(ScopeId::Part(sp.parent_part_id.clone())),
            QuoteItem::DetailLine(dl) => Some(ScopeId::SubPart(dl.parent_sub_part_id.clone())),
            QuoteItem::SpecialLine(sl) => sl.scope(),
        }
    }
}

// ==========================================
// Patchs de mise à jour en place
// ==========================================
// Champ à None = inchangé. La clé d'ordre n'est jamais modifiable
// par patch: seuls OrderingEngine et PlacementResolver l'écrivent.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartPatch {
    pub title: Option<String>,
    pub display_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubPartPatch {
    pub description: Option<String>,
    pub display_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailLinePatch {
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub labor_cost: Option<f64>,
    pub material_cost: Option<f64>,
    pub overhead_rate_pct: Option<f64>,
    pub margin_pct: Option<f64>,
    /// Some(None) = retrait du prix imposé, Some(Some(p)) = nouveau prix imposé
    pub price_override: Option<Option<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialLinePatch {
    pub description: Option<String>,
    pub value: Option<f64>,
    pub value_kind: Option<ValueKind>,
    pub effect: Option<LineEffect>,
}

/// Patch typé par nature d'élément
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "item_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemPatch {
    Part(PartPatch),
    SubPart(SubPartPatch),
    DetailLine(DetailLinePatch),
    SpecialLine(SpecialLinePatch),
}

impl ItemPatch {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemPatch::Part(_) => ItemKind::Part,
            ItemPatch::SubPart(_) => ItemKind::SubPart,
            ItemPatch::DetailLine(_) => ItemKind::DetailLine,
            ItemPatch::SpecialLine(_) => ItemKind::SpecialLine,
        }
    }
}
