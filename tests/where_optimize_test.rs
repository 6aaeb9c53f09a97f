#![allow(clippy::indexing_slicing)]
#![allow(clippy::unwrap_used)]

//! End-to-end rewrite tests through the public library API.
//!
//! Covered:
//! - Worked report query (subquery over a table outside the outer FROM)
//! - Inlining when the subquery's tables are all outer tables
//! - Pruning when they are not
//! - Idempotence of the rewrite
//! - Tree-level rewrite with explicit registries
//! - Best-effort fallback

use sqlrewrite_lib::query::ast::{Deparse, Expr, FromItem, Renderer};
use sqlrewrite_lib::query::catalog::FunctionRegistry;
use sqlrewrite_lib::query::optimize::{where_expr_optimize, where_optimize, where_text_optimize};
use sqlrewrite_lib::query::parse::{from_clause_parse, where_clause_parse};

use crate::util::{REPORT_EXPECTED, REPORT_FROM, REPORT_WHERE};

mod util;

fn optimize(from: &str, where_text: &str) -> String {
    let from_items = from_clause_parse(from).unwrap();
    where_optimize(&from_items, where_text, &FunctionRegistry::standard())
}

// =============================================================================
// Report query
// =============================================================================

#[test]
fn test_report_query() {
    assert_eq!(optimize(REPORT_FROM, REPORT_WHERE), REPORT_EXPECTED);
}

#[test]
fn test_report_query_idempotent() {
    let once = optimize(REPORT_FROM, REPORT_WHERE);
    assert_eq!(optimize(REPORT_FROM, &once), once);
}

/// Same query with the subquery reading only outer tables: the IN wrapper
/// disappears and the residual filter becomes the OR branch.
#[test]
fn test_report_query_inlined() {
    let where_text = REPORT_WHERE.replace("FROM other_table", "FROM large_table, mid_table");
    let result = optimize(REPORT_FROM, &where_text);

    assert_eq!(
        result,
        "((large_table.small_ref_id = small_table.id) AND (large_table.mid_ref_id = mid_table.id) \
         AND (small_table.group_name = 'MyGroup') AND (((large_table.date_time1 BETWEEN '2010-01-01' \
         AND '2017-01-01') AND (mid_table.type = 'Type1')) OR ((large_table.date_time2 BETWEEN \
         '2010-06-01' AND '2017-01-01') AND (mid_table.type = 'Type2')) OR ((mid_table.date_time3 \
         BETWEEN '2010-08-01' AND '2017-01-01') AND (mid_table.type = 'Type3'))))"
    );
    assert!(!result.contains("select"));
}

// =============================================================================
// Inline / prune
// =============================================================================

#[test]
fn test_inline_scenario() {
    let result = optimize(
        "a, b",
        "a.x = b.y AND ((a.v = 1 AND b.w = 2) OR a.id IN (SELECT a.id FROM a WHERE a.x = b.y AND a.z = 3))",
    );

    assert_eq!(
        result,
        "((a.x = b.y) AND (((a.v = 1) AND (b.w = 2)) OR (a.z = 3)))"
    );
}

#[test]
fn test_prune_scenario() {
    let result = optimize(
        "a, b",
        "a.x = b.y AND ((a.v = 1 AND b.w = 2) OR a.id IN (SELECT c.id FROM c WHERE a.x = b.y AND a.z = 3))",
    );

    assert_eq!(
        result,
        "((a.x = b.y) AND (((a.v = 1) AND (b.w = 2)) OR (a.id IN (select c.id from c where (a.z = 3)))))"
    );
}

#[test]
fn test_several_in_branches() {
    let result = optimize(
        "a, b",
        "a.k = b.k AND (a.id IN (SELECT a.id FROM a WHERE a.k = b.k AND a.n = 1) \
         OR a.id IN (SELECT c.id FROM c, b WHERE a.k = b.k AND c.n = 2) \
         OR a.id IN (5, 6))",
    );

    assert_eq!(
        result,
        "((a.k = b.k) AND ((a.n = 1) OR (a.id IN (select c.id from c where (c.n = 2))) OR (a.id IN (5, 6))))"
    );
}

#[test]
fn test_schema_qualified_from_items() {
    // `app.a` and `a` are different table references
    let result = optimize(
        "app.a",
        "a.k = 1 AND (a.v = 2 OR a.id IN (SELECT a.id FROM a WHERE a.k = 1 AND a.z = 3))",
    );
    assert_eq!(
        result,
        "((a.k = 1) AND ((a.v = 2) OR (a.id IN (select a.id from a where (a.z = 3)))))"
    );

    let result = optimize(
        "app.a",
        "a.k = 1 AND (a.v = 2 OR a.id IN (SELECT a.id FROM app.a WHERE a.k = 1 AND a.z = 3))",
    );
    assert_eq!(result, "((a.k = 1) AND ((a.v = 2) OR (a.z = 3)))");
}

// =============================================================================
// Tree level
// =============================================================================

#[test]
fn test_tree_rewrite_and_render() {
    let functions = FunctionRegistry::standard();
    let where_expr = where_clause_parse(
        "a.x = 1 AND (a.v = 2 OR a.id IN (SELECT a.id FROM a WHERE a.x = 1 AND a.z > 3))",
        &functions,
    )
    .unwrap();
    assert!(where_expr.has_subqueries());

    let optimized = where_expr_optimize(&[FromItem::new("a")], where_expr);
    assert!(!optimized.has_subqueries());

    let renderer = Renderer::new(&functions);
    assert_eq!(
        renderer.expr_render(&optimized),
        "((a.x = 1) AND ((a.v = 2) OR (a.z > 3)))"
    );
    assert_eq!(
        renderer.expr_reverse_polish(&optimized),
        "(AND (= a.x 1) (OR (= a.v 2) (> a.z 3)))"
    );

    // Deparse and Display agree with the standard renderer
    let mut buf = String::new();
    optimized.deparse(&mut buf);
    assert_eq!(buf, optimized.to_string());
}

#[test]
fn test_operand_access_errors() {
    let expr = where_clause_parse("a.x = 1", &FunctionRegistry::standard()).unwrap();
    let compound = expr.as_compound().unwrap();

    assert_eq!(compound.operand_count(), 2);
    assert!(compound.operand(1).is_ok());
    assert!(compound.operand(2).is_err());
    assert!(compound.operands[0].as_subquery().is_err());
    assert!(matches!(compound.operands[1], Expr::Leaf(_)));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_unparseable_where_returned_unchanged() {
    let from_items = from_clause_parse("a").unwrap();
    let functions = FunctionRegistry::standard();

    for text in ["a.x = = 1", "a.x::text = 'y'", "a.x = 1; DROP TABLE a"] {
        assert!(where_text_optimize(&from_items, text, &functions).is_err());
        assert_eq!(where_optimize(&from_items, text, &functions), text);
    }
}
