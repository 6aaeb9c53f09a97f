use crate::query::ast::{CompoundExpr, Expr};
use crate::query::catalog::Operator;

/// Drop the operands of `compound` that `keep` rejects, keeping its operator.
///
/// An AND/OR left with a single operand collapses to that operand. Returns
/// None when no operands remain.
pub fn compound_operands_retain(
    compound: CompoundExpr,
    mut keep: impl FnMut(&Expr) -> bool,
) -> Option<Expr> {
    let variadic = matches!(compound.operator(), Operator::And | Operator::Or);
    let CompoundExpr { op, mut operands } = compound;
    operands.retain(|operand| keep(operand));

    match <[Expr; 1]>::try_from(operands) {
        Ok([single]) if variadic => Some(single),
        Ok([single]) => Some(Expr::compound(op, vec![single])),
        Err(operands) if operands.is_empty() => None,
        Err(operands) => Some(CompoundExpr::with_operands(op, operands).into()),
    }
}

/// Append `branch` to the operands of an OR under construction.
///
/// An OR branch in leading position is merged into its parent, matching how
/// the parser reads `(a OR b) OR c`; anywhere else it stays nested.
pub fn or_branch_push(branches: &mut Vec<Expr>, branch: Expr) {
    match branch {
        Expr::Compound(or) if branches.is_empty() && or.operator() == Operator::Or => {
            branches.extend(or.operands);
        }
        other @ (Expr::Leaf(_) | Expr::Compound(_) | Expr::Subquery(_)) => branches.push(other),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use crate::query::ast::{ColumnNode, LiteralValue};

    use super::*;

    fn eq(column: &str, value: &str) -> Expr {
        Expr::compound(
            "=",
            vec![
                ColumnNode::unqualified(column).into(),
                LiteralValue::Number(value.to_owned()).into(),
            ],
        )
    }

    fn compound(op: &str, operands: Vec<Expr>) -> CompoundExpr {
        CompoundExpr::with_operands(op, operands)
    }

    #[test]
    fn retain_keeps_operator() {
        let (a, b, c) = (eq("a", "1"), eq("b", "2"), eq("c", "3"));

        let and = compound("AND", vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(
            compound_operands_retain(and, |e| *e != b),
            Some(Expr::compound("AND", vec![a.clone(), c.clone()]))
        );

        let or = compound("OR", vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(
            compound_operands_retain(or, |e| *e != a),
            Some(Expr::compound("OR", vec![b, c]))
        );
    }

    #[test]
    fn retain_collapses_single_boolean_operand() {
        let (a, b) = (eq("a", "1"), eq("b", "2"));

        let and = compound("AND", vec![a.clone(), b.clone()]);
        assert_eq!(compound_operands_retain(and, |e| *e != a), Some(b.clone()));

        let or = compound("OR", vec![a.clone(), b.clone()]);
        assert_eq!(compound_operands_retain(or, |e| *e != b), Some(a.clone()));

        // Other operators keep their node
        let not = compound("NOT", vec![a.clone()]);
        assert_eq!(
            compound_operands_retain(not, |_| true),
            Some(Expr::compound("NOT", vec![a]))
        );
    }

    #[test]
    fn retain_compares_leaf_operands() {
        let x: Expr = ColumnNode::qualified("a", "x").into();
        let y: Expr = ColumnNode::qualified("b", "y").into();
        let predicate = Expr::compound("=", vec![x.clone(), y.clone()]);

        // The predicate itself is not among its own operands
        let kept = compound_operands_retain(
            compound("=", vec![x, y]),
            |e| *e != predicate,
        );
        assert_eq!(kept, Some(predicate));
    }

    #[test]
    fn retain_empty() {
        let and = compound("AND", vec![eq("a", "1"), eq("b", "2")]);
        assert!(compound_operands_retain(and, |_| false).is_none());
    }

    #[test]
    fn or_branch_leading_merged() {
        let (a, b, c) = (eq("a", "1"), eq("b", "2"), eq("c", "3"));
        let or = Expr::compound("OR", vec![a.clone(), b.clone()]);

        let mut leading = Vec::new();
        or_branch_push(&mut leading, or.clone());
        or_branch_push(&mut leading, c.clone());
        assert_eq!(leading, vec![a, b, c.clone()]);

        let mut trailing = Vec::new();
        or_branch_push(&mut trailing, c.clone());
        or_branch_push(&mut trailing, or.clone());
        assert_eq!(trailing, vec![c, or]);
    }
}
