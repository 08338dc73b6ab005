// ==========================================
// Moteur de chiffrage devis - Fiches catalogue
// ==========================================
// Données brutes échangées avec le collaborateur catalogue; les
// brouillons n'ont pas d'identifiant, il est attribué côté serveur
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Fiches (identifiant attribué)
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPartRecord {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailLineRecord {
    pub id: String,
    pub description: String,
    pub unit: String,
    pub labor_cost: f64,
    pub material_cost: f64,
    pub overhead_rate_pct: f64,
    pub margin_pct: f64,
    /// Prix unitaire indicatif du catalogue (avant quantité/écrasement)
    pub price: f64,
}

// ==========================================
// Brouillons (création)
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDraft {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPartDraft {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailLineDraft {
    pub description: String,
    pub unit: String,
    pub labor_cost: f64,
    pub material_cost: f64,
    pub overhead_rate_pct: f64,
    pub margin_pct: f64,
}
