// ==========================================
// Moteur de chiffrage devis - Moteur de calcul
// ==========================================
// Responsabilité: dériver tous les montants du devis, de bas en haut:
// prix unitaires -> lignes -> sous-lots -> lots -> total général,
// lignes spéciales résolues au passage de chaque niveau.
// Précision: toute l'accumulation reste en f64 pleine précision;
// l'arrondi à 2 décimales n'intervient qu'en sortie d'affichage,
// jamais entre deux étapes de sommation.
// Résolution: fonction pure de l'arbre - deux appels sur un arbre
// inchangé produisent des totaux identiques.
// ==========================================

use crate::domain::item::{ScopeId, SpecialLine};
use crate::domain::types::{BaseReference, ValueKind};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::tree::PricingTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// SpecialAmount - Montant résolu d'une ligne spéciale
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialAmount {
    /// Base de calcul résolue (total structurel ou montant figé)
    pub resolved_base: f64,
    /// Magnitude affichée, toujours non signée; l'effet porte le sens
    pub amount: f64,
    /// Contribution signée sommée dans le total parent
    pub signed: f64,
}

// ==========================================
// DevisTotals - Totaux dérivés du devis
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DevisTotals {
    /// Prix unitaire effectif par ligne de détail
    pub unit_prices: HashMap<String, f64>,
    /// Total par ligne de détail (prix unitaire x quantité)
    pub line_totals: HashMap<String, f64>,
    /// Total par sous-lot (lignes + lignes spéciales du sous-lot)
    pub sub_part_totals: HashMap<String, f64>,
    /// Total par lot (sous-lots + lignes spéciales du lot)
    pub part_totals: HashMap<String, f64>,
    /// Montants résolus des lignes spéciales
    pub special_amounts: HashMap<String, SpecialAmount>,
    /// Total général du devis
    pub global_total: f64,
}

impl DevisTotals {
    /// Total général calculé avec la ligne globale désignée omise de
    /// sa propre sommation
    pub fn global_total_excluding(&self, line_id: &str) -> Option<f64> {
        self.special_amounts
            .get(line_id)
            .map(|amount| self.global_total - amount.signed)
    }

    /// Copie arrondie pour l'affichage (2 décimales par défaut)
    pub fn rounded(&self, decimals: u32) -> DevisTotals {
        let factor = 10f64.powi(decimals as i32);
        let round = |value: f64| (value * factor).round() / factor;
        DevisTotals {
            unit_prices: self
                .unit_prices
                .iter()
                .map(|(id, value)| (id.clone(), round(*value)))
                .collect(),
            line_totals: self
                .line_totals
                .iter()
                .map(|(id, value)| (id.clone(), round(*value)))
                .collect(),
            sub_part_totals: self
                .sub_part_totals
                .iter()
                .map(|(id, value)| (id.clone(), round(*value)))
                .collect(),
            part_totals: self
                .part_totals
                .iter()
                .map(|(id, value)| (id.clone(), round(*value)))
                .collect(),
            special_amounts: self
                .special_amounts
                .iter()
                .map(|(id, amount)| {
                    (
                        id.clone(),
                        SpecialAmount {
                            resolved_base: round(amount.resolved_base),
                            amount: round(amount.amount),
                            signed: round(amount.signed),
                        },
                    )
                })
                .collect(),
            global_total: round(self.global_total),
        }
    }
}

// ==========================================
// CalculationEngine - Moteur de calcul
// ==========================================
pub struct CalculationEngine;

impl CalculationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Prix unitaire effectif d'une ligne de détail
    ///
    /// Prix imposé prioritaire; sinon déboursé majoré des frais
    /// généraux puis de la marge, dans cet ordre.
    pub fn unit_price(line: &crate::domain::item::DetailLine) -> f64 {
        if let Some(price) = line.price_override {
            return price;
        }
        let base = line.labor_cost + line.material_cost;
        let with_overhead = base * (1.0 + line.overhead_rate_pct / 100.0);
        with_overhead * (1.0 + line.margin_pct / 100.0)
    }

    /// Dérive l'ensemble des totaux du devis
    ///
    /// Les lignes spéciales d'une même portée se résolvent dans
    /// l'ordre visuel: la base d'auto-exclusion d'une ligne intègre
    /// les totaux structurels et les lignes déjà résolues de la
    /// portée, jamais la ligne elle-même ni les suivantes. Ce
    /// séquencement rend la résolution déterministe quand plusieurs
    /// lignes en pourcentage visent le même total.
    pub fn compute(&self, tree: &PricingTree) -> EngineResult<DevisTotals> {
        let mut totals = DevisTotals::default();

        // 1) Lignes de détail
        for part in tree.parts() {
            for sub_part in tree.sub_parts_of(&part.id) {
                for line in tree.detail_lines_of(&sub_part.id) {
                    let unit_price = Self::unit_price(line);
                    totals.unit_prices.insert(line.id.clone(), unit_price);
                    totals
                        .line_totals
                        .insert(line.id.clone(), unit_price * line.quantity);
                }
            }
        }

        // 2) Sous-lots: lignes de détail + lignes spéciales de sous-lot
        for part in tree.parts() {
            for sub_part in tree.sub_parts_of(&part.id) {
                let structural: f64 = tree
                    .detail_lines_of(&sub_part.id)
                    .iter()
                    .map(|line| totals.line_totals[&line.id])
                    .sum();
                let scope = ScopeId::SubPart(sub_part.id.clone());
                let total =
                    self.resolve_scope_specials(tree, &scope, structural, &mut totals)?;
                totals.sub_part_totals.insert(sub_part.id.clone(), total);
            }
        }

        // 3) Lots: sous-lots + lignes spéciales de lot
        for part in tree.parts() {
            let structural: f64 = tree
                .sub_parts_of(&part.id)
                .iter()
                .map(|sub_part| totals.sub_part_totals[&sub_part.id])
                .sum();
            let scope = ScopeId::Part(part.id.clone());
            let total = self.resolve_scope_specials(tree, &scope, structural, &mut totals)?;
            totals.part_totals.insert(part.id.clone(), total);
        }

        // 4) Total général: lots + lignes spéciales globales
        let structural: f64 = tree
            .parts()
            .iter()
            .map(|part| totals.part_totals[&part.id])
            .sum();
        totals.global_total =
            self.resolve_scope_specials(tree, &ScopeId::Global, structural, &mut totals)?;

        debug!(
            global_total = totals.global_total,
            parts = totals.part_totals.len(),
            specials = totals.special_amounts.len(),
            "totaux recalculés"
        );
        Ok(totals)
    }

    /// Résout les lignes spéciales d'une portée dans l'ordre visuel
    ///
    /// `running` démarre au total structurel de la portée et intègre
    /// chaque contribution signée au fil de la résolution; c'est lui
    /// qui sert de base d'auto-exclusion à la ligne suivante.
    fn resolve_scope_specials(
        &self,
        tree: &PricingTree,
        scope: &ScopeId,
        structural: f64,
        totals: &mut DevisTotals,
    ) -> EngineResult<f64> {
        let mut running = structural;
        for line in tree.special_lines_in_scope(scope) {
            let resolved_base = self.resolve_base(tree, line, running, totals)?;
            let amount = match line.value_kind {
                ValueKind::Percentage => resolved_base * line.value / 100.0,
                ValueKind::Fixed => line.value,
            };
            let signed = amount * line.effect.sign();
            totals.special_amounts.insert(
                line.id.clone(),
                SpecialAmount {
                    resolved_base,
                    amount,
                    signed,
                },
            );
            running += signed;
        }
        Ok(running)
    }

    /// Base résolue d'une ligne spéciale
    ///
    /// `enclosing_running` est le total courant de la portée englobante
    /// (auto-exclusion: la ligne n'y figure pas encore). Les totaux de
    /// lots/sous-lots désignés sont déjà définitifs à ce stade de la
    /// passe montante; une base pendante est une erreur, jamais zéro.
    fn resolve_base(
        &self,
        tree: &PricingTree,
        line: &SpecialLine,
        enclosing_running: f64,
        totals: &DevisTotals,
    ) -> EngineResult<f64> {
        match &line.base_reference {
            BaseReference::Literal { amount } => Ok(*amount),
            BaseReference::GlobalExcludingSelf => Ok(enclosing_running),
            BaseReference::PartTotal { part_id } => {
                if line.context_id.as_deref() == Some(part_id.as_str()) {
                    // Total englobant: sémantique d'auto-exclusion
                    return Ok(enclosing_running);
                }
                totals.part_totals.get(part_id).copied().ok_or_else(|| {
                    EngineError::ReferenceNotFound {
                        entity: "lot".to_string(),
                        id: part_id.clone(),
                    }
                })
            }
            BaseReference::SubPartTotal { sub_part_id } => {
                if line.context_id.as_deref() == Some(sub_part_id.as_str()) {
                    return Ok(enclosing_running);
                }
                totals
                    .sub_part_totals
                    .get(sub_part_id)
                    .copied()
                    .ok_or_else(|| EngineError::ReferenceNotFound {
                        entity: "sous-lot".to_string(),
                        id: sub_part_id.clone(),
                    })
            }
        }
    }
}

impl Default for CalculationEngine {
    fn default() -> Self {
        Self::new()
    }
}
