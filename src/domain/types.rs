// ==========================================
// Moteur de chiffrage devis - Types du domaine
// ==========================================
// Règle: enums fermés + Display + parse/to_db_str
// Sérialisation: SCREAMING_SNAKE_CASE (alignée sur la persistance)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Nature de la valeur (Value Kind)
// ==========================================
// Une ligne spéciale porte soit un pourcentage d'une base, soit un montant fixe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueKind {
    Percentage, // Pourcentage d'une base résolue
    Fixed,      // Montant fixe en euros
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Percentage => write!(f, "PERCENTAGE"),
            ValueKind::Fixed => write!(f, "FIXED"),
        }
    }
}

impl ValueKind {
    /// Analyse depuis une chaîne persistée
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PERCENTAGE" => Some(ValueKind::Percentage),
            "FIXED" => Some(ValueKind::Fixed),
            _ => None,
        }
    }

    /// Chaîne stockée en base
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ValueKind::Percentage => "PERCENTAGE",
            ValueKind::Fixed => "FIXED",
        }
    }
}

// ==========================================
// Effet de la ligne (Line Effect)
// ==========================================
// Le montant stocké est toujours une magnitude positive;
// le signe n'est appliqué qu'à la sommation dans le total parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineEffect {
    Addition,  // Majoration (+)
    Reduction, // Remise (-)
}

impl fmt::Display for LineEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEffect::Addition => write!(f, "ADDITION"),
            LineEffect::Reduction => write!(f, "REDUCTION"),
        }
    }
}

impl LineEffect {
    /// Analyse depuis une chaîne persistée
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ADDITION" => Some(LineEffect::Addition),
            "REDUCTION" => Some(LineEffect::Reduction),
            _ => None,
        }
    }

    /// Chaîne stockée en base
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LineEffect::Addition => "ADDITION",
            LineEffect::Reduction => "REDUCTION",
        }
    }

    /// Signe appliqué lors de la sommation dans le total parent
    pub fn sign(&self) -> f64 {
        match self {
            LineEffect::Addition => 1.0,
            LineEffect::Reduction => -1.0,
        }
    }
}

// ==========================================
// Contexte d'une ligne spéciale (Context Type)
// ==========================================
// Désigne le niveau de la hiérarchie auquel la ligne est rattachée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextType {
    Global,  // Rattachée au devis entier
    Part,    // Rattachée à un lot
    SubPart, // Rattachée à un sous-lot
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextType::Global => write!(f, "GLOBAL"),
            ContextType::Part => write!(f, "PART"),
            ContextType::SubPart => write!(f, "SUB_PART"),
        }
    }
}

impl ContextType {
    /// Analyse depuis une chaîne persistée
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GLOBAL" => Some(ContextType::Global),
            "PART" => Some(ContextType::Part),
            "SUB_PART" => Some(ContextType::SubPart),
            _ => None,
        }
    }

    /// Chaîne stockée en base
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ContextType::Global => "GLOBAL",
            ContextType::Part => "PART",
            ContextType::SubPart => "SUB_PART",
        }
    }
}

// ==========================================
// Nature d'un élément (Item Kind)
// ==========================================
// Discriminant des quatre natures d'éléments du devis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Part,        // Lot
    SubPart,     // Sous-lot
    DetailLine,  // Ligne de détail (chiffrée au catalogue)
    SpecialLine, // Ligne spéciale (remise/majoration libre)
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Part => write!(f, "PART"),
            ItemKind::SubPart => write!(f, "SUB_PART"),
            ItemKind::DetailLine => write!(f, "DETAIL_LINE"),
            ItemKind::SpecialLine => write!(f, "SPECIAL_LINE"),
        }
    }
}

impl ItemKind {
    /// Chaîne stockée en base
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ItemKind::Part => "PART",
            ItemKind::SubPart => "SUB_PART",
            ItemKind::DetailLine => "DETAIL_LINE",
            ItemKind::SpecialLine => "SPECIAL_LINE",
        }
    }
}

// ==========================================
// Référence de base (Base Reference)
// ==========================================
// La base d'une ligne spéciale ne peut viser qu'un total STRUCTUREL
// (ou un montant figé) - jamais le montant d'une autre ligne spéciale.
// L'acyclicité est garantie par construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseReference {
    /// Total général du devis, la ligne elle-même exclue de sa propre base
    GlobalExcludingSelf,
    /// Total d'un lot désigné
    PartTotal { part_id: String },
    /// Total d'un sous-lot désigné
    SubPartTotal { sub_part_id: String },
    /// Montant figé à la création de la ligne (jamais recalculé)
    Literal { amount: f64 },
}

impl fmt::Display for BaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseReference::GlobalExcludingSelf => write!(f, "GLOBAL_EXCLUDING_SELF"),
            BaseReference::PartTotal { part_id } => write!(f, "PART_TOTAL({})", part_id),
            BaseReference::SubPartTotal { sub_part_id } => {
                write!(f, "SUB_PART_TOTAL({})", sub_part_id)
            }
            BaseReference::Literal { amount } => write!(f, "LITERAL({})", amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_roundtrip() {
        assert_eq!(ValueKind::parse("percentage"), Some(ValueKind::Percentage));
        assert_eq!(ValueKind::parse("FIXED"), Some(ValueKind::Fixed));
        assert_eq!(ValueKind::parse("autre"), None);
        assert_eq!(ValueKind::Percentage.to_db_str(), "PERCENTAGE");
    }

    #[test]
    fn test_effect_sign() {
        assert_eq!(LineEffect::Addition.sign(), 1.0);
        assert_eq!(LineEffect::Reduction.sign(), -1.0);
    }

    #[test]
    fn test_context_type_parse() {
        assert_eq!(ContextType::parse("sub_part"), Some(ContextType::SubPart));
        assert_eq!(ContextType::parse("GLOBAL"), Some(ContextType::Global));
        assert_eq!(ContextType::parse(""), None);
    }
}
