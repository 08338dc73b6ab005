// ==========================================
// Moteur de chiffrage devis - Instantané de devis
// ==========================================
// Contrat de persistance: lots ordonnés, chacun avec ses sous-lots
// ordonnés, chacun avec ses lignes de détail (quantité choisie et
// prix effectif compris), plus la liste complète des lignes
// spéciales. Suffisant pour reconstruire l'arbre et tous les ordres
// sans perte.
// ==========================================

use crate::domain::item::{DetailLine, Part, QuoteItem, SpecialLine, SubPart};
use crate::domain::types::{BaseReference, ContextType, LineEffect, ValueKind};
use crate::engine::calculation::DevisTotals;
use crate::engine::error::EngineResult;
use crate::engine::tree::PricingTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// DetailLineSnapshot - Ligne de détail persistée
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailLineSnapshot {
    pub id: String,
    pub description: String,
    pub unit: String,
    pub quantity: f64,
    pub labor_cost: f64,
    pub material_cost: f64,
    pub overhead_rate_pct: f64,
    pub margin_pct: f64,
    pub price_override: Option<f64>,
    pub ordering_key: f64,
    /// Prix unitaire effectif au moment de la capture (affichage)
    pub effective_unit_price: f64,
    /// Total de ligne au moment de la capture (affichage)
    pub line_total: f64,
}

// ==========================================
// SubPartSnapshot - Sous-lot persisté
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPartSnapshot {
    pub id: String,
    pub description: String,
    pub display_number: Option<String>,
    pub ordering_key: f64,
    pub detail_lines: Vec<DetailLineSnapshot>,
}

// ==========================================
// PartSnapshot - Lot persisté
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSnapshot {
    pub id: String,
    pub title: String,
    pub display_number: Option<String>,
    pub ordering_key: f64,
    pub sub_parts: Vec<SubPartSnapshot>,
}

// ==========================================
// SpecialLineSnapshot - Ligne spéciale persistée
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialLineSnapshot {
    pub id: String,
    pub description: String,
    pub value: f64,
    pub value_kind: ValueKind,
    pub effect: LineEffect,
    pub context_type: ContextType,
    pub context_id: Option<String>,
    pub base_reference: BaseReference,
    pub ordering_key: f64,
}

// ==========================================
// DevisSnapshot - Instantané complet
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevisSnapshot {
    pub devis_id: String,
    pub captured_at: DateTime<Utc>,
    pub parts: Vec<PartSnapshot>,
    pub special_lines: Vec<SpecialLineSnapshot>,
}

impl DevisSnapshot {
    /// Capture l'arbre et ses totaux courants
    ///
    /// Les prix effectifs embarqués proviennent du dernier recalcul;
    /// ils sont portés pour le collaborateur de persistance et ne
    /// participent pas à la reconstruction.
    pub fn capture(tree: &PricingTree, totals: &DevisTotals, devis_id: &str) -> Self {
        let parts = tree
            .parts()
            .into_iter()
            .map(|part| PartSnapshot {
                id: part.id.clone(),
                title: part.title.clone(),
                display_number: part.display_number.clone(),
                ordering_key: part.ordering_key,
                sub_parts: tree
                    .sub_parts_of(&part.id)
                    .into_iter()
                    .map(|sub_part| SubPartSnapshot {
                        id: sub_part.id.clone(),
                        description: sub_part.description.clone(),
                        display_number: sub_part.display_number.clone(),
                        ordering_key: sub_part.ordering_key,
                        detail_lines: tree
                            .detail_lines_of(&sub_part.id)
                            .into_iter()
                            .map(|line| DetailLineSnapshot {
                                id: line.id.clone(),
                                description: line.description.clone(),
                                unit: line.unit.clone(),
                                quantity: line.quantity,
                                labor_cost: line.labor_cost,
                                material_cost: line.material_cost,
                                overhead_rate_pct: line.overhead_rate_pct,
                                margin_pct: line.margin_pct,
                                price_override: line.price_override,
                                ordering_key: line.ordering_key,
                                effective_unit_price: totals
                                    .unit_prices
                                    .get(&line.id)
                                    .copied()
                                    .unwrap_or_default(),
                                line_total: totals
                                    .line_totals
                                    .get(&line.id)
                                    .copied()
                                    .unwrap_or_default(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        // Ordre stable (contexte puis clé): deux captures d'un même
        // arbre sérialisent à l'identique et restent comparables
        let context_rank = |context: ContextType| match context {
            ContextType::Global => 0u8,
            ContextType::Part => 1,
            ContextType::SubPart => 2,
        };
        let mut special_lines: Vec<SpecialLineSnapshot> = tree
            .special_lines()
            .into_iter()
            .map(|line| SpecialLineSnapshot {
                id: line.id.clone(),
                description: line.description.clone(),
                value: line.value,
                value_kind: line.value_kind,
                effect: line.effect,
                context_type: line.context_type,
                context_id: line.context_id.clone(),
                base_reference: line.base_reference.clone(),
                ordering_key: line.ordering_key,
            })
            .collect();
        special_lines.sort_by(|a, b| {
            context_rank(a.context_type)
                .cmp(&context_rank(b.context_type))
                .then_with(|| a.context_id.cmp(&b.context_id))
                .then_with(|| {
                    a.ordering_key
                        .partial_cmp(&b.ordering_key)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        Self {
            devis_id: devis_id.to_string(),
            captured_at: Utc::now(),
            parts,
            special_lines,
        }
    }

    /// Reconstruit l'arbre, clés d'ordre exactes comprises
    ///
    /// Les éléments structurels sont insérés avant les lignes
    /// spéciales: leurs rattachements et bases sont ainsi toujours
    /// résolubles au moment de l'insertion.
    pub fn restore(&self) -> EngineResult<PricingTree> {
        let mut tree = PricingTree::new();

        for part in &self.parts {
            tree.insert(
                QuoteItem::Part(Part {
                    id: part.id.clone(),
                    title: part.title.clone(),
                    display_number: part.display_number.clone(),
                    ordering_key: part.ordering_key,
                }),
                part.ordering_key,
            )?;
            for sub_part in &part.sub_parts {
                tree.insert(
                    QuoteItem::SubPart(SubPart {
                        id: sub_part.id.clone(),
                        description: sub_part.description.clone(),
                        display_number: sub_part.display_number.clone(),
                        parent_part_id: part.id.clone(),
                        ordering_key: sub_part.ordering_key,
                    }),
                    sub_part.ordering_key,
                )?;
                for line in &sub_part.detail_lines {
                    tree.insert(
                        QuoteItem::DetailLine(DetailLine {
                            id: line.id.clone(),
                            description: line.description.clone(),
                            unit: line.unit.clone(),
                            quantity: line.quantity,
                            labor_cost: line.labor_cost,
                            material_cost: line.material_cost,
                            overhead_rate_pct: line.overhead_rate_pct,
                            margin_pct: line.margin_pct,
                            price_override: line.price_override,
                            parent_sub_part_id: sub_part.id.clone(),
                            ordering_key: line.ordering_key,
                        }),
                        line.ordering_key,
                    )?;
                }
            }
        }

        for line in &self.special_lines {
            tree.insert(
                QuoteItem::SpecialLine(SpecialLine {
                    id: line.id.clone(),
                    description: line.description.clone(),
                    value: line.value,
                    value_kind: line.value_kind,
                    effect: line.effect,
                    context_type: line.context_type,
                    context_id: line.context_id.clone(),
                    base_reference: line.base_reference.clone(),
                    ordering_key: line.ordering_key,
                }),
                line.ordering_key,
            )?;
        }

        Ok(tree)
    }
}
