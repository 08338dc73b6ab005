// ==========================================
// DevisApi - Tests de bout en bout
// ==========================================
// Cibles: admission via catalogue, recalcul synchrone après chaque
// mutation, opérations en échec sans le moindre effet observable
// ==========================================


use devis_engine::{
    ApiError, BaseReference, DetailLineDraft, DevisApi, DevisSnapshotRepository, DragEvent,
    EngineConfig, InMemoryCatalog, LineEffect, PartDraft, PartRecord, PlacementToken, ScopeId,
    SubPartDraft,
};
use test_helpers::{create_test_db, pct_draft};

/// Devis complet monté via le catalogue en mémoire
///
/// P (Gros oeuvre) > SP (Maçonnerie) > D (prix unitaire 216, quantité 2)
async fn build_session() -> (DevisApi, InMemoryCatalog, String, String, String) {
    let catalog = InMemoryCatalog::new();
    let mut api = DevisApi::new("DEV-2026-001", EngineConfig::default());

    let part_id = api
        .create_and_admit_part(
            &catalog,
            PartDraft {
                title: "Gros oeuvre".to_string(),
            },
        )
        .await
        .unwrap();
    let sub_part_id = api
        .create_and_admit_sub_part(
            &catalog,
            &part_id,
            SubPartDraft {
                description: "Maçonnerie".to_string(),
            },
        )
        .await
        .unwrap();
    let line_id = api
        .create_and_admit_detail_line(
            &catalog,
            &sub_part_id,
            DetailLineDraft {
                description: "Mur en parpaings".to_string(),
                unit: "m²".to_string(),
                labor_cost: 100.0,
                material_cost: 50.0,
                overhead_rate_pct: 20.0,
                margin_pct: 20.0,
            },
            2.0,
        )
        .await
        .unwrap();

    (api, catalog, part_id, sub_part_id, line_id)
}

// ==========================================
// Admission et recalcul synchrone
// ==========================================

#[tokio::test]
async fn test_create_and_admit_recomputes_totals() {
    let (api, _, _, _, line_id) = build_session().await;
    let totals = api.totals();
    assert!((totals.unit_prices[&line_id] - 216.0).abs() < 1e-9);
    assert!((totals.global_total - 432.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_admit_existing_record_without_catalog_call() {
    let mut api = DevisApi::new("DEV-2026-001", EngineConfig::default());
    let part_id = api
        .admit_part(PartRecord {
            id: "P1".to_string(),
            title: "Plomberie".to_string(),
        })
        .unwrap();
    assert_eq!(part_id, "P1");
    assert!(api.tree().contains("P1"));
    // Fiche déjà au catalogue: admission répétée du même id refusée
    let result = api.admit_part(PartRecord {
        id: "P1".to_string(),
        title: "Plomberie".to_string(),
    });
    assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));
}

#[tokio::test]
async fn test_failed_catalog_call_leaves_session_untouched() {
    let (mut api, catalog, _, _, _) = build_session().await;
    let before = api.totals().clone();
    let count = api.tree().len();

    // Champ obligatoire manquant: l'appel échoue côté catalogue
    let result = api
        .create_and_admit_part(
            &catalog,
            PartDraft {
                title: "   ".to_string(),
            },
        )
        .await;
    assert!(matches!(result, Err(ApiError::ValidationError(_))));
    // Jamais d'insertion optimiste
    assert_eq!(api.tree().len(), count);
    assert_eq!(api.totals(), &before);
}

#[tokio::test]
async fn test_each_edit_recomputes_independently() {
    let (mut api, _, _, _, line_id) = build_session().await;
    // Trois frappes successives: chacune laisse des totaux justes
    for (quantity, expected) in [(1.0, 216.0), (3.0, 648.0), (2.5, 540.0)] {
        api.set_quantity(&line_id, quantity).unwrap();
        assert!((api.totals().global_total - expected).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_price_override_set_and_cleared() {
    let (mut api, _, _, _, line_id) = build_session().await;
    api.set_price_override(&line_id, Some(200.0)).unwrap();
    assert!((api.totals().global_total - 400.0).abs() < 1e-9);
    api.set_price_override(&line_id, None).unwrap();
    assert!((api.totals().global_total - 432.0).abs() < 1e-9);
}

// ==========================================
// Placement et réordonnancement
// ==========================================

#[tokio::test]
async fn test_place_special_line_updates_global_total() {
    let (mut api, _, _, _, _) = build_session().await;
    let placed = api
        .place_special_line(
            &PlacementToken::GlobalEnd,
            pct_draft(
                "Remise commerciale",
                10.0,
                LineEffect::Reduction,
                BaseReference::GlobalExcludingSelf,
            ),
        )
        .unwrap();
    assert!((api.totals().global_total - 388.8).abs() < 1e-9);
    // Loi de réconciliation, vue opérateur
    let excluding = api.totals().global_total_excluding(&placed.line_id).unwrap();
    assert!((excluding - 432.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_failed_placement_is_strictly_observable_noop() {
    let (mut api, _, _, _, _) = build_session().await;
    let before = api.totals().clone();
    let count = api.tree().len();

    let result = api.place_special_line(
        &PlacementToken::BeforePart("P_absent".to_string()),
        pct_draft(
            "Remise commerciale",
            10.0,
            LineEffect::Reduction,
            BaseReference::GlobalExcludingSelf,
        ),
    );
    assert!(matches!(result, Err(ApiError::ReferenceNotFound(_))));
    assert_eq!(api.tree().len(), count);
    // Totaux bit-à-bit identiques: aucun recalcul n'a eu lieu
    assert_eq!(api.totals(), &before);
}

#[tokio::test]
async fn test_invalid_drag_absorbed_without_recompute() {
    let (mut api, _, part_id, sub_part_id, _) = build_session().await;
    let before = api.totals().clone();

    // Dépôt du sous-lot dans la portée globale: portée étrangère
    let outcome = api
        .handle_drag(&DragEvent {
            item_id: sub_part_id.clone(),
            source_scope: ScopeId::Part(part_id.clone()),
            source_index: 0,
            dest_scope: ScopeId::Global,
            dest_index: 0,
        })
        .unwrap();
    assert!(!outcome.is_applied());
    assert_eq!(api.totals(), &before);
}

#[tokio::test]
async fn test_valid_drag_applies_and_recomputes() {
    let (mut api, catalog, _, _, _) = build_session().await;
    let second = api
        .create_and_admit_part(
            &catalog,
            PartDraft {
                title: "Plomberie".to_string(),
            },
        )
        .await
        .unwrap();
    let outcome = api
        .handle_drag(&DragEvent {
            item_id: second.clone(),
            source_scope: ScopeId::Global,
            source_index: 1,
            dest_scope: ScopeId::Global,
            dest_index: 0,
        })
        .unwrap();
    assert!(outcome.is_applied());
    let parts = api.tree().parts();
    assert_eq!(parts[0].id, second);
}

// ==========================================
// Suppression
// ==========================================

#[tokio::test]
async fn test_remove_cascades_and_recomputes() {
    let (mut api, _, part_id, _, _) = build_session().await;
    let removed = api.remove_item(&part_id).unwrap();
    assert_eq!(removed, 3); // lot + sous-lot + ligne
    assert!((api.totals().global_total - 0.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_remove_refused_when_base_would_dangle() {
    let (mut api, _, part_id, _, _) = build_session().await;
    api.place_special_line(
        &PlacementToken::GlobalEnd,
        pct_draft(
            "Remise sur gros oeuvre",
            5.0,
            LineEffect::Reduction,
            BaseReference::PartTotal {
                part_id: part_id.clone(),
            },
        ),
    )
    .unwrap();
    let before = api.totals().clone();
    let result = api.remove_item(&part_id);
    assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));
    assert_eq!(api.totals(), &before);
}

// ==========================================
// Instantanés
// ==========================================

#[tokio::test]
async fn test_persist_then_restore_latest() {
    let (_temp, conn) = create_test_db().unwrap();
    let repo = DevisSnapshotRepository::new(conn).unwrap();

    let (mut api, _, _, _, line_id) = build_session().await;
    api.place_special_line(
        &PlacementToken::GlobalEnd,
        pct_draft(
            "Remise commerciale",
            10.0,
            LineEffect::Reduction,
            BaseReference::GlobalExcludingSelf,
        ),
    )
    .unwrap();
    let saved_total = api.totals().global_total;
    api.persist(&repo).unwrap();

    // Session vierge rechargée depuis la dernière capture
    let mut rehydrated = DevisApi::new("DEV-2026-001", EngineConfig::default());
    assert!(rehydrated.restore_latest(&repo).unwrap());
    assert!(rehydrated.tree().contains(&line_id));
    assert!((rehydrated.totals().global_total - saved_total).abs() < 1e-9);
}

#[tokio::test]
async fn test_restore_latest_without_capture() {
    let (_temp, conn) = create_test_db().unwrap();
    let repo = DevisSnapshotRepository::new(conn).unwrap();
    let mut api = DevisApi::new("DEV-JAMAIS-SAUVE", EngineConfig::default());
    assert!(!api.restore_latest(&repo).unwrap());
}
