use std::fmt;
use std::sync::LazyLock;

use crate::query::catalog::{FunctionRegistry, Operator};

use super::{CompoundExpr, Deparse, Expr, OrderByClause, QuerySpec, SortDirection};

static STANDARD_FUNCTIONS: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::standard);

const PLACEHOLDER: &str = "?";

/// Canonical SQL text for expression trees.
///
/// Every compound node is wrapped in its own parentheses (except set/quantifier
/// keywords and aggregate calls), so the output never depends on operator
/// precedence. Which names render as function calls is decided by the
/// registry the renderer was built with.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    functions: &'a FunctionRegistry,
}

impl Default for Renderer<'static> {
    fn default() -> Self {
        Self::standard()
    }
}

impl Renderer<'static> {
    /// Renderer over the standard aggregates and no custom functions.
    pub fn standard() -> Self {
        Self {
            functions: &STANDARD_FUNCTIONS,
        }
    }
}

impl<'a> Renderer<'a> {
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn expr_render(&self, expr: &Expr) -> String {
        let mut buf = String::new();
        self.expr_deparse(expr, &mut buf);
        buf
    }

    pub fn query_render(&self, query: &QuerySpec) -> String {
        let mut buf = String::new();
        self.query_deparse(query, &mut buf);
        buf
    }

    pub fn expr_deparse<'b>(&self, expr: &Expr, buf: &'b mut String) -> &'b mut String {
        match expr {
            Expr::Leaf(leaf) => leaf.deparse(buf),
            Expr::Compound(compound) => self.compound_deparse(compound, buf),
            Expr::Subquery(query) => self.query_deparse(query, buf),
        }
    }

    fn compound_deparse<'b>(&self, compound: &CompoundExpr, buf: &'b mut String) -> &'b mut String {
        let op = compound.op.as_str();

        if op == PLACEHOLDER {
            buf.push_str(PLACEHOLDER);
            return buf;
        }

        if self.functions.custom_function_arity(op).is_some() {
            return self.function_deparse(compound, buf);
        }

        let parens = self.parens_needed(op);
        if parens {
            buf.push('(');
        }

        match compound.operands.as_slice() {
            [] => {
                buf.push_str(op);
                buf.push_str("()");
            }
            [operand] => {
                self.unary_deparse(compound, operand, buf);
            }
            [subject, low, high] if op.to_ascii_uppercase().ends_with("BETWEEN") => {
                self.expr_deparse(subject, buf);
                buf.push(' ');
                buf.push_str(op);
                buf.push(' ');
                self.expr_deparse(low, buf);
                buf.push_str(" AND ");
                self.expr_deparse(high, buf);
            }
            operands => {
                self.nary_deparse(compound, operands, buf);
            }
        }

        if parens {
            buf.push(')');
        }

        buf
    }

    /// `NAME(arg, arg, ...)` for registered custom functions.
    fn function_deparse<'b>(&self, compound: &CompoundExpr, buf: &'b mut String) -> &'b mut String {
        buf.push_str(&compound.op);
        buf.push('(');
        let mut sep = "";
        for operand in &compound.operands {
            buf.push_str(sep);
            self.expr_deparse(operand, buf);
            sep = ", ";
        }
        buf.push(')');
        buf
    }

    fn parens_needed(&self, op: &str) -> bool {
        let upper = op.to_ascii_uppercase();
        !(matches!(upper.as_str(), "ANY" | "ALL" | "UNION") || self.functions.is_aggregate(&upper))
    }

    fn unary_deparse<'b>(
        &self,
        compound: &CompoundExpr,
        operand: &Expr,
        buf: &'b mut String,
    ) -> &'b mut String {
        let op = compound.op.as_str();
        let operator = compound.operator();

        match operand {
            Expr::Leaf(_) if self.functions.is_aggregate(op) => {
                buf.push_str(op);
                buf.push('(');
                self.expr_deparse(operand, buf);
                buf.push(')');
            }
            Expr::Subquery(query) => {
                buf.push_str(op);
                buf.push_str(" (");
                self.query_deparse(query, buf);
                buf.push(')');
            }
            Expr::Leaf(_) | Expr::Compound(_) => {
                if operator.is_null_test() {
                    // Postfix: expr IS NULL
                    self.expr_deparse(operand, buf);
                    buf.push(' ');
                    buf.push_str(op);
                } else if operator == Operator::Comma {
                    // Single-element value list
                    self.expr_deparse(operand, buf);
                } else {
                    buf.push_str(op);
                    buf.push(' ');
                    self.expr_deparse(operand, buf);
                }
            }
        }

        buf
    }

    fn nary_deparse<'b>(
        &self,
        compound: &CompoundExpr,
        operands: &[Expr],
        buf: &'b mut String,
    ) -> &'b mut String {
        let op = compound.op.as_str();
        let operator = compound.operator();
        let in_list = operator.is_in_list();

        let [first, rest @ ..] = operands else {
            return buf;
        };

        self.nary_operand_deparse(first, in_list, buf);

        if in_list {
            // subject IN (v1, v2, ...); the list owns the only parentheses
            buf.push(' ');
            buf.push_str(op);
            buf.push_str(" (");
            let mut sep = "";
            for operand in rest {
                buf.push_str(sep);
                self.nary_operand_deparse(operand, in_list, buf);
                sep = ", ";
            }
            buf.push(')');
            return buf;
        }

        for operand in rest {
            if operator == Operator::Comma {
                buf.push_str(", ");
            } else {
                buf.push(' ');
                buf.push_str(op);
                buf.push(' ');
            }
            self.nary_operand_deparse(operand, in_list, buf);
        }

        buf
    }

    fn nary_operand_deparse<'b>(
        &self,
        operand: &Expr,
        in_list: bool,
        buf: &'b mut String,
    ) -> &'b mut String {
        match operand {
            Expr::Subquery(query) if !in_list => {
                buf.push('(');
                self.query_deparse(query, buf);
                buf.push(')');
                buf
            }
            Expr::Leaf(_) | Expr::Compound(_) | Expr::Subquery(_) => {
                self.expr_deparse(operand, buf)
            }
        }
    }

    pub fn query_deparse<'b>(&self, query: &QuerySpec, buf: &'b mut String) -> &'b mut String {
        buf.push_str("select ");
        if query.distinct {
            buf.push_str("distinct ");
        }

        let mut sep = "";
        for column in &query.columns {
            buf.push_str(sep);
            self.expr_deparse(&column.expr, buf);
            if let Some(alias) = &column.alias {
                buf.push_str(" as ");
                alias.deparse(buf);
            }
            sep = ", ";
        }

        if !query.from.is_empty() {
            buf.push_str(" from ");
            let mut sep = "";
            for item in &query.from {
                buf.push_str(sep);
                item.deparse(buf);
                sep = ", ";
            }
        }

        if let Some(expr) = &query.where_clause {
            buf.push_str(" where ");
            self.expr_deparse(expr, buf);
        }

        if !query.group_by.is_empty() {
            buf.push_str(" group by ");
            let mut sep = "";
            for expr in &query.group_by {
                buf.push_str(sep);
                self.expr_deparse(expr, buf);
                sep = ", ";
            }
        }

        if let Some(expr) = &query.having {
            buf.push_str(" having ");
            self.expr_deparse(expr, buf);
        }

        if !query.order_by.is_empty() {
            buf.push_str(" order by ");
            let mut sep = "";
            for order in &query.order_by {
                buf.push_str(sep);
                self.order_by_deparse(order, buf);
                sep = ", ";
            }
        }

        buf
    }

    fn order_by_deparse<'b>(&self, order: &OrderByClause, buf: &'b mut String) -> &'b mut String {
        self.expr_deparse(&order.expr, buf);
        match order.direction {
            Some(SortDirection::Asc) => buf.push_str(" asc"),
            Some(SortDirection::Desc) => buf.push_str(" desc"),
            None => {}
        }
        buf
    }

    /// Fully parenthesized prefix form, e.g. `(AND (> a 1) (= b 2))`.
    pub fn expr_reverse_polish(&self, expr: &Expr) -> String {
        let mut buf = String::new();
        self.reverse_polish_deparse(expr, &mut buf);
        buf
    }

    fn reverse_polish_deparse<'b>(&self, expr: &Expr, buf: &'b mut String) -> &'b mut String {
        let Expr::Compound(compound) = expr else {
            return self.expr_deparse(expr, buf);
        };

        buf.push('(');
        buf.push_str(&compound.op);
        for operand in &compound.operands {
            buf.push(' ');
            match operand {
                Expr::Compound(_) => {
                    self.reverse_polish_deparse(operand, buf);
                }
                Expr::Subquery(query) => {
                    buf.push('(');
                    self.query_deparse(query, buf);
                    buf.push(')');
                }
                Expr::Leaf(leaf) => {
                    leaf.deparse(buf);
                }
            }
        }
        buf.push(')');
        buf
    }
}

impl Deparse for Expr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        Renderer::standard().expr_deparse(self, buf)
    }
}

impl Deparse for QuerySpec {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        Renderer::standard().query_deparse(self, buf)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Renderer::standard().expr_render(self))
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Renderer::standard().query_render(self))
    }
}
