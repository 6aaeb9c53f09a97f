//! WHERE-clause subquery rewrite.
//!
//! Targets the shape `p1 AND p2 AND ... AND (x OR y IN (SELECT ...) OR ...)`.
//! An IN/NOT IN subquery sitting directly under a top-level OR has every
//! operand of its own WHERE that repeats a top-level predicate removed. When
//! the subquery reads only tables the outer query already reads, the IN wrapper
//! is dropped and the remaining filter takes the branch's place; otherwise the
//! subquery is kept and the shared tables are removed from its FROM list.
//!
//! Only that fixed depth is examined (top-level predicate, OR branch, IN).

use rootcause::Report;
use tracing::{debug, error, instrument, trace};

use crate::result::ReportExt;

use super::ast::{CompoundExpr, Expr, FromItem, LiteralValue, QuerySpec, Renderer, from_items_contain};
use super::catalog::{FunctionRegistry, Operator};
use super::parse::{ParseError, where_clause_parse};
use super::transform::{compound_operands_retain, or_branch_push};

/// Outcome of rewriting a single OR branch.
#[derive(Debug)]
enum BranchRewrite {
    /// The IN wrapper was removed; the residual filter replaces the branch.
    Inlined(Expr),
    /// The branch stays in place (possibly with a pruned subquery).
    Kept(Expr),
}

/// Best-effort rewrite of WHERE text.
///
/// Never fails: if the clause cannot be parsed the failure is logged and the
/// input text is returned unchanged.
pub fn where_optimize(
    from_items: &[FromItem],
    where_text: &str,
    functions: &FunctionRegistry,
) -> String {
    match where_text_optimize(from_items, where_text, functions) {
        Ok(optimized) => optimized,
        Err(e) => {
            error!("where clause optimization failed: {e}");
            where_text.to_owned()
        }
    }
}

/// Parse, rewrite and re-render WHERE text.
#[instrument(skip_all)]
pub fn where_text_optimize(
    from_items: &[FromItem],
    where_text: &str,
    functions: &FunctionRegistry,
) -> Result<String, Report<ParseError>> {
    let where_expr =
        where_clause_parse(where_text, functions).attach_loc("parsing WHERE clause")?;

    let optimized = where_expr_optimize(from_items, where_expr);

    Ok(Renderer::new(functions).expr_render(&optimized))
}

/// Rewrite a parsed WHERE tree against the outer query's FROM list.
///
/// A WHERE that is a single leaf or subquery is returned unchanged.
#[instrument(skip_all)]
pub fn where_expr_optimize(from_items: &[FromItem], where_expr: Expr) -> Expr {
    let root = match where_expr {
        Expr::Compound(root) => root,
        other @ (Expr::Leaf(_) | Expr::Subquery(_)) => return other,
    };

    // Dedup compares against the predicates as written
    let predicates = root.operands.clone();

    let operands = root
        .operands
        .into_iter()
        .map(|predicate| predicate_optimize(from_items, &predicates, predicate))
        .collect();

    CompoundExpr::with_operands(root.op, operands).into()
}

/// Rewrite the branches of a top-level OR predicate. Other predicates pass
/// through.
fn predicate_optimize(from_items: &[FromItem], predicates: &[Expr], predicate: Expr) -> Expr {
    let or = match predicate {
        Expr::Compound(compound) if compound.operator() == Operator::Or => compound,
        other @ (Expr::Leaf(_) | Expr::Compound(_) | Expr::Subquery(_)) => return other,
    };

    let mut branches = Vec::with_capacity(or.operands.len());
    for branch in or.operands {
        match or_branch_optimize(from_items, predicates, branch) {
            BranchRewrite::Inlined(residual) => or_branch_push(&mut branches, residual),
            BranchRewrite::Kept(branch) => branches.push(branch),
        }
    }

    CompoundExpr::with_operands(or.op, branches).into()
}

fn or_branch_optimize(from_items: &[FromItem], predicates: &[Expr], branch: Expr) -> BranchRewrite {
    let compound = match branch {
        Expr::Compound(compound) if compound.operator().is_in_list() => compound,
        other @ (Expr::Leaf(_) | Expr::Compound(_) | Expr::Subquery(_)) => {
            return BranchRewrite::Kept(other);
        }
    };

    let CompoundExpr { op, operands } = compound;
    let operands = match <[Expr; 2]>::try_from(operands) {
        Ok(operands) => operands,
        Err(operands) => return BranchRewrite::Kept(Expr::compound(op, operands)),
    };

    match operands {
        [subject, Expr::Subquery(query)]
            if matches!(query.where_clause, Some(Expr::Compound(_))) =>
        {
            in_subquery_rewrite(from_items, predicates, op, subject, *query)
        }
        operands => BranchRewrite::Kept(Expr::compound(op, Vec::from(operands))),
    }
}

fn in_subquery_rewrite(
    from_items: &[FromItem],
    predicates: &[Expr],
    op: String,
    subject: Expr,
    mut query: QuerySpec,
) -> BranchRewrite {
    let residual = match query.where_clause.take() {
        Some(Expr::Compound(inner_where)) => {
            let mut dropped = 0usize;
            let residual = compound_operands_retain(inner_where, |operand| {
                let repeated = predicates.contains(operand);
                dropped += usize::from(repeated);
                !repeated
            });
            trace!("dropped {dropped} repeated subquery filter operand(s)");
            residual
        }
        other @ (Some(Expr::Leaf(_) | Expr::Subquery(_)) | None) => other,
    };

    if from_items_contain(from_items, &query.from) {
        debug!("inlining {op} subquery filter into OR branch");
        return BranchRewrite::Inlined(
            residual.unwrap_or_else(|| LiteralValue::Boolean(true).into()),
        );
    }

    query.where_clause = residual;
    query.from.retain(|item| !from_items.contains(item));
    debug!(
        "pruned {op} subquery, {} FROM item(s) remain",
        query.from.len()
    );

    BranchRewrite::Kept(Expr::compound(op, vec![subject, query.into()]))
}
