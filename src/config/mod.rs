// ==========================================
// Moteur de chiffrage devis - Configuration
// ==========================================
// Règle: struct simple + Default, sérialisable pour l'hôte
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// EngineConfig - Configuration du moteur
// ==========================================
// Schéma de clés d'ordre: f64, insertions au point milieu.
// Plafond de précision: un même intervalle supporte ~52 insertions
// successives au même point avant que le milieu ne soit plus
// strictement compris entre ses voisins; la renumérotation paire
// (key_spacing, 2*key_spacing, ...) se déclenche dès que l'écart
// entre voisins passe sous min_key_gap ou que le milieu dégénère.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub key_spacing: f64,      // Espacement des clés en ajout/renumérotation: 1024.0
    pub min_key_gap: f64,      // Écart minimal exploitable entre voisins: 1e-6
    pub display_decimals: u32, // Décimales d'affichage des montants: 2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_spacing: 1024.0,
            min_key_gap: 1e-6,
            display_decimals: 2,
        }
    }
}

impl EngineConfig {
    /// Arrondi d'affichage (jamais utilisé entre deux étapes de sommation)
    pub fn round_display(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.display_decimals as i32);
        (value * factor).round() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.key_spacing, 1024.0);
        assert_eq!(config.display_decimals, 2);
    }

    #[test]
    fn test_round_display() {
        let config = EngineConfig::default();
        assert_eq!(config.round_display(43.199999999999996), 43.2);
        assert_eq!(config.round_display(388.8000000000001), 388.8);
        assert_eq!(config.round_display(1.005), 1.0); // 1.005 n'est pas représentable exactement
    }
}
