// ==========================================
// CalculationEngine - Tests d'intégration
// ==========================================
// Cibles: chaîne de majoration, agrégation montante, résolution des
// lignes spéciales dans l'ordre visuel, loi de réconciliation
// ==========================================


use devis_engine::{
    BaseReference, CalculationEngine, DetailLine, DetailLinePatch, ItemPatch, LineEffect,
    PlacementResolver, PlacementToken,
};
use test_helpers::{fixed_draft, pct_draft, standard_tree, two_part_tree};

const EPS: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

// ==========================================
// Prix unitaires et totaux structurels
// ==========================================

#[test]
fn test_unit_price_markup_chain() {
    // (100 + 50) x 1.20 x 1.20 = 216.0
    let (tree, _) = standard_tree();
    let engine = CalculationEngine::new();
    let totals = engine.compute(&tree).unwrap();
    assert!(close(totals.unit_prices["D1"], 216.0));
    assert!(close(totals.line_totals["D1"], 432.0));
    assert!(close(totals.sub_part_totals["SP1"], 432.0));
    assert!(close(totals.part_totals["P1"], 432.0));
    assert!(close(totals.global_total, 432.0));
}

#[test]
fn test_price_override_short_circuits_markup() {
    let (mut tree, _) = standard_tree();
    tree.update(
        "D1",
        ItemPatch::DetailLine(DetailLinePatch {
            price_override: Some(Some(200.0)),
            ..Default::default()
        }),
    )
    .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    assert!(close(totals.unit_prices["D1"], 200.0));
    assert!(close(totals.global_total, 400.0));

    // Retrait du prix imposé: retour au prix dérivé
    tree.update(
        "D1",
        ItemPatch::DetailLine(DetailLinePatch {
            price_override: Some(None),
            ..Default::default()
        }),
    )
    .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    assert!(close(totals.unit_prices["D1"], 216.0));
}

#[test]
fn test_unit_price_helper_matches_compute() {
    let line = DetailLine {
        id: "D1".to_string(),
        description: String::new(),
        unit: "m²".to_string(),
        quantity: 1.0,
        labor_cost: 100.0,
        material_cost: 50.0,
        overhead_rate_pct: 20.0,
        margin_pct: 20.0,
        price_override: None,
        parent_sub_part_id: "SP1".to_string(),
        ordering_key: 1.0,
    };
    assert!(close(CalculationEngine::unit_price(&line), 216.0));
}

#[test]
fn test_structural_aggregation_bottom_up() {
    let (tree, _) = two_part_tree();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    assert!(close(totals.sub_part_totals["SP1"], 1000.0));
    assert!(close(totals.sub_part_totals["SP2"], 500.0));
    assert!(close(totals.part_totals["P1"], 1500.0));
    assert!(close(totals.part_totals["P2"], 250.0));
    assert!(close(totals.global_total, 1750.0));
}

// ==========================================
// Lignes spéciales
// ==========================================

#[test]
fn test_global_percentage_reduction_with_self_exclusion() {
    // Base 432, remise 10% -> montant 43.2, total général 388.8
    let (mut tree, ordering) = standard_tree();
    let resolver = PlacementResolver::default();
    let placed = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::GlobalEnd,
            pct_draft(
                "Remise commerciale",
                10.0,
                LineEffect::Reduction,
                BaseReference::GlobalExcludingSelf,
            ),
        )
        .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    let amount = &totals.special_amounts[&placed.line_id];
    assert!(close(amount.resolved_base, 432.0));
    assert!(close(amount.amount, 43.2));
    assert!(close(amount.signed, -43.2));
    assert!(close(totals.global_total, 388.8));
}

#[test]
fn test_reconciliation_law_holds() {
    // GT calculé avec la ligne omise == base résolue de la ligne
    let (mut tree, ordering) = standard_tree();
    let resolver = PlacementResolver::default();
    let placed = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::GlobalEnd,
            pct_draft(
                "Remise commerciale",
                10.0,
                LineEffect::Reduction,
                BaseReference::GlobalExcludingSelf,
            ),
        )
        .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    let excluding = totals.global_total_excluding(&placed.line_id).unwrap();
    assert!(close(
        excluding,
        totals.special_amounts[&placed.line_id].resolved_base
    ));
}

#[test]
fn test_sequential_resolution_in_visual_order() {
    // Deux remises de 10% en portée globale: la seconde s'assoit sur
    // le total courant intégrant la première
    let (mut tree, ordering) = two_part_tree();
    let resolver = PlacementResolver::default();
    let first = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::GlobalEnd,
            pct_draft(
                "Remise 1",
                10.0,
                LineEffect::Reduction,
                BaseReference::GlobalExcludingSelf,
            ),
        )
        .unwrap();
    let second = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::AfterSpecialLine(first.line_id.clone()),
            pct_draft(
                "Remise 2",
                10.0,
                LineEffect::Reduction,
                BaseReference::GlobalExcludingSelf,
            ),
        )
        .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    // Structurel 1750: remise 1 -> 175, courant 1575; remise 2 -> 157.5
    assert!(close(totals.special_amounts[&first.line_id].amount, 175.0));
    assert!(close(
        totals.special_amounts[&second.line_id].resolved_base,
        1575.0
    ));
    assert!(close(totals.special_amounts[&second.line_id].amount, 157.5));
    assert!(close(totals.global_total, 1417.5));
}

#[test]
fn test_fixed_addition_ignores_base() {
    let (mut tree, ordering) = two_part_tree();
    let resolver = PlacementResolver::default();
    let placed = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::GlobalEnd,
            fixed_draft(
                "Forfait déplacement",
                300.0,
                LineEffect::Addition,
                BaseReference::Literal { amount: 0.0 },
            ),
        )
        .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    assert!(close(totals.special_amounts[&placed.line_id].signed, 300.0));
    assert!(close(totals.global_total, 2050.0));
}

#[test]
fn test_part_scope_special_feeds_part_total() {
    // Majoration de 10% dans la portée du lot P1, base auto-exclue
    let (mut tree, ordering) = two_part_tree();
    let resolver = PlacementResolver::default();
    let placed = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::AfterSubPart("SP2".to_string()),
            pct_draft(
                "Majoration de lot",
                10.0,
                LineEffect::Addition,
                BaseReference::PartTotal {
                    part_id: "P1".to_string(),
                },
            ),
        )
        .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    assert!(close(
        totals.special_amounts[&placed.line_id].resolved_base,
        1500.0
    ));
    assert!(close(totals.part_totals["P1"], 1650.0));
    // Le lot majoré remonte dans le total général
    assert!(close(totals.global_total, 1900.0));
}

#[test]
fn test_sub_part_scope_special_feeds_upward() {
    let (mut tree, ordering) = two_part_tree();
    let resolver = PlacementResolver::default();
    resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::AfterDetailLine("D1".to_string()),
            fixed_draft(
                "Forfait évacuation",
                100.0,
                LineEffect::Addition,
                BaseReference::Literal { amount: 0.0 },
            ),
        )
        .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    assert!(close(totals.sub_part_totals["SP1"], 1100.0));
    assert!(close(totals.part_totals["P1"], 1600.0));
    assert!(close(totals.global_total, 1850.0));
}

#[test]
fn test_global_special_on_deeper_sub_part_total() {
    // Ligne globale assise sur le total définitif d'un sous-lot
    let (mut tree, ordering) = two_part_tree();
    let resolver = PlacementResolver::default();
    let placed = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::GlobalEnd,
            pct_draft(
                "Participation maçonnerie",
                10.0,
                LineEffect::Addition,
                BaseReference::SubPartTotal {
                    sub_part_id: "SP1".to_string(),
                },
            ),
        )
        .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    assert!(close(
        totals.special_amounts[&placed.line_id].resolved_base,
        1000.0
    ));
    assert!(close(totals.global_total, 1850.0));
}

// ==========================================
// Stabilité et affichage
// ==========================================

#[test]
fn test_compute_is_deterministic() {
    let (mut tree, ordering) = two_part_tree();
    let resolver = PlacementResolver::default();
    resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::GlobalEnd,
            pct_draft(
                "Remise commerciale",
                7.5,
                LineEffect::Reduction,
                BaseReference::GlobalExcludingSelf,
            ),
        )
        .unwrap();
    let engine = CalculationEngine::new();
    let first = engine.compute(&tree).unwrap();
    let second = engine.compute(&tree).unwrap();
    // Fonction pure de l'arbre: mêmes totaux à l'identique
    assert_eq!(first, second);
}

#[test]
fn test_rounding_only_at_display() {
    let (mut tree, _) = standard_tree();
    // 216 x 1/3 laisse une traîne binaire; la pleine précision est
    // conservée en interne, l'arrondi ne sort qu'à l'affichage
    tree.update(
        "D1",
        ItemPatch::DetailLine(DetailLinePatch {
            quantity: Some(1.0 / 3.0),
            ..Default::default()
        }),
    )
    .unwrap();
    let totals = CalculationEngine::new().compute(&tree).unwrap();
    let displayed = totals.rounded(2);
    assert!(close(totals.line_totals["D1"], 216.0 / 3.0));
    assert_eq!(displayed.line_totals["D1"], 72.0);
}
