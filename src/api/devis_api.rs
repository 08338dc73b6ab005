// ==========================================
// Moteur de chiffrage devis - API de devis
// ==========================================
// Responsabilité: point d'entrée de la couche de présentation.
// Chaque mutation appliquée est suivie immédiatement d'un recalcul
// complet avant de rendre la main: l'arbre n'est jamais observable
// dans un état partiellement mis à jour entre deux actions.
// Règle: un appel collaborateur en échec ne mute rien; une opération
// annulée laisse arbre et totaux bit-à-bit identiques.
// ==========================================

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::ApiResult;
use crate::catalog::records::{
    DetailLineDraft, DetailLineRecord, PartDraft, PartRecord, SubPartDraft, SubPartRecord,
};
use crate::catalog::traits::CatalogWrite;
use crate::config::EngineConfig;
use crate::domain::item::{
    DetailLine, DetailLinePatch, ItemPatch, Part, QuoteItem, SpecialLineDraft, SubPart,
};
use crate::domain::snapshot::DevisSnapshot;
use crate::engine::calculation::{CalculationEngine, DevisTotals};
use crate::engine::events::{
    OptionalEventPublisher, QuoteEvent, QuoteEventPublisher, QuoteEventType,
};
use crate::engine::ordering::{DragEvent, OrderingEngine, ReorderOutcome};
use crate::engine::placement::{PlacementResolver, PlacementToken, ResolvedPlacement};
use crate::engine::tree::PricingTree;
use crate::repository::devis_repo::DevisSnapshotRepository;

// ==========================================
// DevisApi - Session d'édition d'un devis
// ==========================================
// Session unique, synchrone: pas d'édition concurrente du même devis
pub struct DevisApi {
    devis_id: String,
    config: EngineConfig,
    tree: PricingTree,
    ordering: OrderingEngine,
    placement: PlacementResolver,
    calculation: CalculationEngine,
    publisher: OptionalEventPublisher,
    /// Totaux du dernier recalcul (toujours cohérents avec l'arbre)
    totals: DevisTotals,
}

impl DevisApi {
    pub fn new(devis_id: impl Into<String>, config: EngineConfig) -> Self {
        let ordering = OrderingEngine::new(config.key_spacing);
        let placement = PlacementResolver::new(config.key_spacing, config.min_key_gap);
        Self {
            devis_id: devis_id.into(),
            config,
            tree: PricingTree::new(),
            ordering,
            placement,
            calculation: CalculationEngine::new(),
            publisher: OptionalEventPublisher::none(),
            totals: DevisTotals::default(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn QuoteEventPublisher>) -> Self {
        self.publisher = OptionalEventPublisher::with_publisher(publisher);
        self
    }

    // ==========================================
    // Lectures
    // ==========================================

    pub fn devis_id(&self) -> &str {
        &self.devis_id
    }

    pub fn tree(&self) -> &PricingTree {
        &self.tree
    }

    /// Totaux pleine précision du dernier recalcul
    pub fn totals(&self) -> &DevisTotals {
        &self.totals
    }

    /// Totaux arrondis pour l'affichage
    pub fn totals_rounded(&self) -> DevisTotals {
        self.totals.rounded(self.config.display_decimals)
    }

    // ==========================================
    // Admission de fiches catalogue existantes
    // ==========================================
    // Fiche déjà créée au catalogue: admission immédiate, aucun
    // aller-retour serveur nécessaire

    pub fn admit_part(&mut self, record: PartRecord) -> ApiResult<String> {
        let part = Part {
            id: record.id,
            title: record.title,
            display_number: None,
            ordering_key: 0.0, // attribuée à l'admission
        };
        let id = part.id.clone();
        self.ordering.append(&mut self.tree, QuoteItem::Part(part))?;
        self.after_mutation(QuoteEventType::ItemAdmitted, Some(id.clone()))?;
        Ok(id)
    }

    pub fn admit_sub_part(
        &mut self,
        parent_part_id: &str,
        record: SubPartRecord,
    ) -> ApiResult<String> {
        let sub_part = SubPart {
            id: record.id,
            description: record.description,
            display_number: None,
            parent_part_id: parent_part_id.to_string(),
            ordering_key: 0.0,
        };
        let id = sub_part.id.clone();
        self.ordering
            .append(&mut self.tree, QuoteItem::SubPart(sub_part))?;
        self.after_mutation(QuoteEventType::ItemAdmitted, Some(id.clone()))?;
        Ok(id)
    }

    pub fn admit_detail_line(
        &mut self,
        parent_sub_part_id: &str,
        record: DetailLineRecord,
        quantity: f64,
    ) -> ApiResult<String> {
        let line = DetailLine {
            id: record.id,
            description: record.description,
            unit: record.unit,
            quantity,
            labor_cost: record.labor_cost,
            material_cost: record.material_cost,
            overhead_rate_pct: record.overhead_rate_pct,
            margin_pct: record.margin_pct,
            price_override: None,
            parent_sub_part_id: parent_sub_part_id.to_string(),
            ordering_key: 0.0,
        };
        let id = line.id.clone();
        self.ordering
            .append(&mut self.tree, QuoteItem::DetailLine(line))?;
        self.after_mutation(QuoteEventType::ItemAdmitted, Some(id.clone()))?;
        Ok(id)
    }

    // ==========================================
    // Création catalogue puis admission
    // ==========================================
    // L'arbre n'est muté qu'après résolution de l'appel: jamais
    // d'insertion optimiste d'une fiche pas encore créée

    pub async fn create_and_admit_part(
        &mut self,
        catalog: &dyn CatalogWrite,
        draft: PartDraft,
    ) -> ApiResult<String> {
        let record = catalog.create_part(draft).await?;
        self.admit_part(record)
    }

    pub async fn create_and_admit_sub_part(
        &mut self,
        catalog: &dyn CatalogWrite,
        parent_part_id: &str,
        draft: SubPartDraft,
    ) -> ApiResult<String> {
        let record = catalog.create_sub_part(parent_part_id, draft).await?;
        self.admit_sub_part(parent_part_id, record)
    }

    pub async fn create_and_admit_detail_line(
        &mut self,
        catalog: &dyn CatalogWrite,
        parent_sub_part_id: &str,
        draft: DetailLineDraft,
        quantity: f64,
    ) -> ApiResult<String> {
        let record = catalog.create_detail_line(parent_sub_part_id, draft).await?;
        self.admit_detail_line(parent_sub_part_id, record, quantity)
    }

    // ==========================================
    // Réordonnancement et placement
    // ==========================================

    /// Applique un glisser-déposer
    ///
    /// Les dépôts invalides (portée étrangère, indices identiques...)
    /// sont absorbés en no-op strict: ni erreur, ni recalcul.
    pub fn handle_drag(&mut self, event: &DragEvent) -> ApiResult<ReorderOutcome> {
        let outcome = self.ordering.reorder(&mut self.tree, event);
        if outcome.is_applied() {
            self.after_mutation(QuoteEventType::ScopeReordered, Some(event.item_id.clone()))?;
        }
        Ok(outcome)
    }

    /// Place une ligne spéciale à la position désignée par le jeton
    ///
    /// En cas d'échec le brouillon est jeté et l'arbre reste inchangé.
    pub fn place_special_line(
        &mut self,
        token: &PlacementToken,
        draft: SpecialLineDraft,
    ) -> ApiResult<ResolvedPlacement> {
        let placement = self
            .placement
            .place(&mut self.tree, &self.ordering, token, draft)?;
        self.after_mutation(
            QuoteEventType::SpecialLinePlaced,
            Some(placement.line_id.clone()),
        )?;
        Ok(placement)
    }

    // ==========================================
    // Éditions de champs
    // ==========================================
    // Chaque frappe produit un recalcul correct indépendamment des
    // précédentes; le debounce éventuel est un confort de l'hôte,
    // jamais une condition de justesse

    pub fn update_item(&mut self, id: &str, patch: ItemPatch) -> ApiResult<()> {
        self.tree.update(id, patch)?;
        self.after_mutation(QuoteEventType::FieldUpdated, Some(id.to_string()))?;
        Ok(())
    }

    /// Raccourci: quantité d'une ligne de détail
    pub fn set_quantity(&mut self, line_id: &str, quantity: f64) -> ApiResult<()> {
        self.update_item(
            line_id,
            ItemPatch::DetailLine(DetailLinePatch {
                quantity: Some(quantity),
                ..Default::default()
            }),
        )
    }

    /// Raccourci: prix unitaire imposé (None pour revenir au calcul)
    pub fn set_price_override(&mut self, line_id: &str, price: Option<f64>) -> ApiResult<()> {
        self.update_item(
            line_id,
            ItemPatch::DetailLine(DetailLinePatch {
                price_override: Some(price),
                ..Default::default()
            }),
        )
    }

    // ==========================================
    // Suppression
    // ==========================================

    /// Supprime un élément et sa descendance; retourne le nombre
    /// d'éléments retirés
    pub fn remove_item(&mut self, id: &str) -> ApiResult<usize> {
        let removed = self.tree.remove(id)?;
        self.after_mutation(QuoteEventType::ItemRemoved, Some(id.to_string()))?;
        Ok(removed.len())
    }

    // ==========================================
    // Instantanés
    // ==========================================

    /// Capture l'état courant (arbre + prix effectifs)
    pub fn snapshot(&self) -> DevisSnapshot {
        DevisSnapshot::capture(&self.tree, &self.totals, &self.devis_id)
    }

    /// Reconstruit la session depuis un instantané
    pub fn restore(&mut self, snapshot: &DevisSnapshot) -> ApiResult<()> {
        let tree = snapshot.restore()?;
        self.tree = tree;
        self.devis_id = snapshot.devis_id.clone();
        self.after_mutation(QuoteEventType::SnapshotRestored, None)?;
        info!(devis_id = %self.devis_id, items = self.tree.len(), "devis restauré");
        Ok(())
    }

    /// Persiste la capture courante; retourne l'identifiant de capture
    pub fn persist(&self, repo: &DevisSnapshotRepository) -> ApiResult<String> {
        let snapshot_id = repo.save(&self.snapshot())?;
        Ok(snapshot_id)
    }

    /// Recharge la dernière capture persistée de ce devis
    pub fn restore_latest(&mut self, repo: &DevisSnapshotRepository) -> ApiResult<bool> {
        match repo.load_latest(&self.devis_id)? {
            Some(snapshot) => {
                self.restore(&snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ==========================================
    // Recalcul synchrone
    // ==========================================

    fn after_mutation(&mut self, event_type: QuoteEventType, item_id: Option<String>) -> ApiResult<()> {
        self.totals = self.calculation.compute(&self.tree)?;
        debug!(
            devis_id = %self.devis_id,
            event = event_type.as_str(),
            global_total = self.totals.global_total,
            "mutation appliquée et recalculée"
        );
        self.publisher.publish(QuoteEvent::new(
            self.devis_id.clone(),
            event_type,
            item_id,
            self.totals.global_total,
        ));
        Ok(())
    }
}
