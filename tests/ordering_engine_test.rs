// ==========================================
// OrderingEngine - Tests d'intégration
// ==========================================
// Cibles: renumérotation après mouvement valide, clôture de portée,
// absorption en no-op strict des dépôts invalides
// ==========================================


use devis_engine::{
    BaseReference, DragEvent, IgnoreReason, LineEffect, OrderingEngine, PlacementResolver,
    PlacementToken, PricingTree, ReorderOutcome, ScopeId,
};
use test_helpers::{part, pct_draft, priced_line, sub_part, two_part_tree};

fn drag(item_id: &str, scope: ScopeId, from: usize, to: usize) -> DragEvent {
    DragEvent {
        item_id: item_id.to_string(),
        source_scope: scope.clone(),
        source_index: from,
        dest_scope: scope,
        dest_index: to,
    }
}

/// Clichés des clés d'une portée, pour vérifier les no-ops stricts
fn scope_keys(tree: &PricingTree, scope: &ScopeId) -> Vec<(String, f64)> {
    tree.items_in_scope(scope)
        .iter()
        .map(|item| (item.id().to_string(), item.ordering_key()))
        .collect()
}

// ==========================================
// Mouvements valides
// ==========================================

#[test]
fn test_reorder_parts_renumbers_whole_scope() {
    let (mut tree, ordering) = two_part_tree();
    let outcome = ordering.reorder(&mut tree, &drag("P2", ScopeId::Global, 1, 0));
    assert!(matches!(
        outcome,
        ReorderOutcome::Applied { ref moved_id, .. } if moved_id == "P2"
    ));
    assert_eq!(tree.ordered_ids_in_scope(&ScopeId::Global), vec!["P2", "P1"]);
    // Séquence paire fraîche après renumérotation
    assert_eq!(tree.part("P2").unwrap().ordering_key, 1024.0);
    assert_eq!(tree.part("P1").unwrap().ordering_key, 2048.0);
}

#[test]
fn test_reorder_sub_parts_within_own_part() {
    let (mut tree, ordering) = two_part_tree();
    let scope = ScopeId::Part("P1".to_string());
    let outcome = ordering.reorder(&mut tree, &drag("SP2", scope.clone(), 1, 0));
    assert!(outcome.is_applied());
    assert_eq!(tree.ordered_ids_in_scope(&scope), vec!["SP2", "SP1"]);
}

#[test]
fn test_reorder_leaves_other_scopes_untouched() {
    let (mut tree, ordering) = two_part_tree();
    let p1_scope = ScopeId::Part("P1".to_string());
    let p2_before = scope_keys(&tree, &ScopeId::Part("P2".to_string()));
    let global_before = scope_keys(&tree, &ScopeId::Global);

    ordering.reorder(&mut tree, &drag("SP2", p1_scope, 1, 0));

    assert_eq!(scope_keys(&tree, &ScopeId::Part("P2".to_string())), p2_before);
    assert_eq!(scope_keys(&tree, &ScopeId::Global), global_before);
}

#[test]
fn test_reorder_renumbers_special_lines_of_scope_too() {
    let (mut tree, ordering) = two_part_tree();
    let resolver = PlacementResolver::default();
    let placed = resolver
        .place(
            &mut tree,
            &ordering,
            &PlacementToken::BeforePart("P2".to_string()),
            pct_draft(
                "Remise commerciale",
                10.0,
                LineEffect::Reduction,
                BaseReference::GlobalExcludingSelf,
            ),
        )
        .unwrap();
    // Ordre visuel: P1, ligne spéciale, P2 (la ligne garde sa place relative)
    let outcome = ordering.reorder(&mut tree, &drag("P1", ScopeId::Global, 0, 2));
    assert!(outcome.is_applied());
    assert_eq!(
        tree.ordered_ids_in_scope(&ScopeId::Global),
        vec![placed.line_id.as_str(), "P2", "P1"]
    );
    // La ligne spéciale reçoit elle aussi une clé de la séquence fraîche
    assert_eq!(
        tree.special_line(&placed.line_id).unwrap().ordering_key,
        1024.0
    );
}

// ==========================================
// Dépôts absorbés en no-op strict
// ==========================================

#[test]
fn test_cross_scope_drop_is_strict_noop() {
    let (mut tree, ordering) = two_part_tree();
    let before = scope_keys(&tree, &ScopeId::Part("P1".to_string()));
    let event = DragEvent {
        item_id: "SP1".to_string(),
        source_scope: ScopeId::Part("P1".to_string()),
        source_index: 0,
        dest_scope: ScopeId::Part("P2".to_string()),
        dest_index: 0,
    };
    let outcome = ordering.reorder(&mut tree, &event);
    assert_eq!(
        outcome,
        ReorderOutcome::Ignored {
            reason: IgnoreReason::CrossScope
        }
    );
    assert_eq!(scope_keys(&tree, &ScopeId::Part("P1".to_string())), before);
}

#[test]
fn test_same_position_drop_ignored() {
    let (mut tree, ordering) = two_part_tree();
    let before = scope_keys(&tree, &ScopeId::Global);
    let outcome = ordering.reorder(&mut tree, &drag("P1", ScopeId::Global, 0, 0));
    assert_eq!(
        outcome,
        ReorderOutcome::Ignored {
            reason: IgnoreReason::SamePosition
        }
    );
    assert_eq!(scope_keys(&tree, &ScopeId::Global), before);
}

#[test]
fn test_out_of_bounds_index_ignored() {
    let (mut tree, ordering) = two_part_tree();
    let outcome = ordering.reorder(&mut tree, &drag("P1", ScopeId::Global, 0, 9));
    assert_eq!(
        outcome,
        ReorderOutcome::Ignored {
            reason: IgnoreReason::OutOfBounds
        }
    );
}

#[test]
fn test_stale_index_ignored() {
    let (mut tree, ordering) = two_part_tree();
    // L'indice source ne désigne pas l'élément annoncé (vue périmée)
    let outcome = ordering.reorder(&mut tree, &drag("P2", ScopeId::Global, 0, 1));
    assert_eq!(
        outcome,
        ReorderOutcome::Ignored {
            reason: IgnoreReason::UnknownItem
        }
    );
}

#[test]
fn test_special_line_drag_ignored() {
    let (mut tree, ordering) = two_part_tree();
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
    let before = scope_keys(&tree, &ScopeId::Global);
    let outcome = ordering.reorder(&mut tree, &drag(&placed.line_id, ScopeId::Global, 2, 0));
    assert_eq!(
        outcome,
        ReorderOutcome::Ignored {
            reason: IgnoreReason::SpecialLineDrag
        }
    );
    assert_eq!(scope_keys(&tree, &ScopeId::Global), before);
}

#[test]
fn test_noop_is_idempotent() {
    let (mut tree, ordering) = two_part_tree();
    let before = scope_keys(&tree, &ScopeId::Global);
    for _ in 0..3 {
        ordering.reorder(&mut tree, &drag("P1", ScopeId::Global, 0, 0));
    }
    assert_eq!(scope_keys(&tree, &ScopeId::Global), before);
}

// ==========================================
// Admission en fin de portée
// ==========================================

#[test]
fn test_append_assigns_last_key_plus_spacing() {
    let mut tree = PricingTree::new();
    let ordering = OrderingEngine::new(1024.0);
    let first = ordering.append(&mut tree, part("P1", "A")).unwrap();
    let second = ordering.append(&mut tree, part("P2", "B")).unwrap();
    assert_eq!(first, 1024.0);
    assert_eq!(second, 2048.0);
}

#[test]
fn test_append_into_sub_scope() {
    let (mut tree, ordering) = two_part_tree();
    let last = tree.sub_part("SP2").unwrap().ordering_key;
    let key = ordering
        .append(&mut tree, sub_part("SP9", "P1", "Charpente"))
        .unwrap();
    assert_eq!(key, last + 1024.0);
    assert_eq!(
        tree.ordered_ids_in_scope(&ScopeId::Part("P1".to_string())),
        vec!["SP1", "SP2", "SP9"]
    );
}

#[test]
fn test_append_orphan_is_rejected_without_mutation() {
    let (mut tree, ordering) = two_part_tree();
    let before = tree.len();
    let result = ordering.append(&mut tree, priced_line("D9", "SP_absent", 1.0, 10.0));
    assert!(result.is_err());
    assert_eq!(tree.len(), before);
}
