// ==========================================
// Moteur de chiffrage devis - Événements du moteur
// ==========================================
// Responsabilité: trait de publication d'événements de devis,
// inversion de dépendance: le moteur définit le trait, la couche de
// présentation (hors périmètre) fournit l'adaptateur.
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// Types d'événements de devis
// ==========================================

/// Type d'événement publié après une mutation appliquée
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteEventType {
    /// Portée réordonnée après glisser-déposer
    ScopeReordered,
    /// Ligne spéciale placée
    SpecialLinePlaced,
    /// Élément catalogue admis dans l'arbre
    ItemAdmitted,
    /// Champ modifié en place
    FieldUpdated,
    /// Élément supprimé (descendance comprise)
    ItemRemoved,
    /// Arbre reconstruit depuis un instantané
    SnapshotRestored,
}

impl QuoteEventType {
    /// Identifiant texte de l'événement
    pub fn as_str(&self) -> &str {
        match self {
            QuoteEventType::ScopeReordered => "ScopeReordered",
            QuoteEventType::SpecialLinePlaced => "SpecialLinePlaced",
            QuoteEventType::ItemAdmitted => "ItemAdmitted",
            QuoteEventType::FieldUpdated => "FieldUpdated",
            QuoteEventType::ItemRemoved => "ItemRemoved",
            QuoteEventType::SnapshotRestored => "SnapshotRestored",
        }
    }
}

/// Événement de devis
///
/// Publié par la couche API après chaque mutation suivie de son
/// recalcul; le total général y figure pour les vues de synthèse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteEvent {
    /// Devis concerné
    pub devis_id: String,
    /// Type d'événement
    pub event_type: QuoteEventType,
    /// Élément principal touché (None pour une restauration complète)
    pub item_id: Option<String>,
    /// Total général après recalcul
    pub global_total: f64,
}

impl QuoteEvent {
    pub fn new(
        devis_id: String,
        event_type: QuoteEventType,
        item_id: Option<String>,
        global_total: f64,
    ) -> Self {
        Self {
            devis_id,
            event_type,
            item_id,
            global_total,
        }
    }
}

// ==========================================
// Trait de publication
// ==========================================

/// Éditeur d'événements de devis
///
/// Défini côté moteur, implémenté côté hôte; l'échec de publication
/// ne remet jamais en cause la mutation déjà appliquée.
pub trait QuoteEventPublisher: Send + Sync {
    fn publish(&self, event: QuoteEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Éditeur sans effet (tests et hôtes sans abonné)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl QuoteEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: QuoteEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            devis_id = %event.devis_id,
            event_type = event.event_type.as_str(),
            "NoOpEventPublisher: événement ignoré"
        );
        Ok(())
    }
}

/// Enveloppe simplifiant Option<Arc<dyn QuoteEventPublisher>>
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn QuoteEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn QuoteEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// Publie si un éditeur est configuré; les erreurs d'abonné sont
    /// tracées et absorbées
    pub fn publish(&self, event: QuoteEvent) {
        if let Some(publisher) = &self.inner {
            if let Err(error) = publisher.publish(event) {
                tracing::warn!("échec de publication d'événement: {}", error);
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
