use postgres_protocol::escape;

use crate::query::catalog::Operator;

use super::{Deparse, ExprError};

// Literal values that can appear as expression leaves
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    String(String),
    /// Numeric literal, kept as written
    Number(String),
    Boolean(bool),
    Null,
    Parameter(String), // For $1, $2, etc.
}

impl Deparse for LiteralValue {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match self {
            LiteralValue::String(s) => {
                let escaped = escape::escape_literal(s);
                // escape_literal prefixes E-strings with a space
                buf.push_str(escaped.trim_start());
            }
            LiteralValue::Number(n) => buf.push_str(n),
            LiteralValue::Boolean(b) => buf.push_str(if *b { "true" } else { "false" }),
            LiteralValue::Null => buf.push_str("NULL"),
            LiteralValue::Parameter(p) => buf.push_str(p),
        };

        buf
    }
}

// Column reference (potentially qualified: table.column)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnNode {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnNode {
    pub fn qualified(table: &str, column: &str) -> Self {
        Self {
            table: Some(table.to_owned()),
            column: column.to_owned(),
        }
    }

    pub fn unqualified(column: &str) -> Self {
        Self {
            table: None,
            column: column.to_owned(),
        }
    }
}

impl Deparse for ColumnNode {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        if let Some(table) = &self.table {
            table.deparse(buf);
            buf.push('.');
        }
        self.column.deparse(buf);

        buf
    }
}

/// Terminal expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Leaf {
    Value(LiteralValue),
    Column(ColumnNode),
    /// `*` or `table.*`
    Star { table: Option<String> },
}

impl Deparse for Leaf {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match self {
            Leaf::Value(value) => value.deparse(buf),
            Leaf::Column(column) => column.deparse(buf),
            Leaf::Star { table } => {
                if let Some(table) = table {
                    table.deparse(buf);
                    buf.push('.');
                }
                buf.push('*');
                buf
            }
        }
    }
}

/// Operator applied to an ordered operand list.
///
/// `a AND b AND c` is a single node with operator `AND` and three operands.
/// The operator is kept as its SQL symbol (or function name) so that symbols
/// missing from the catalog still render.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundExpr {
    pub op: String,
    pub operands: Vec<Expr>,
}

impl CompoundExpr {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            operands: Vec::new(),
        }
    }

    pub fn with_operands(op: impl Into<String>, operands: Vec<Expr>) -> Self {
        Self {
            op: op.into(),
            operands,
        }
    }

    /// Catalog entry for this node's operator.
    pub fn operator(&self) -> Operator {
        Operator::lookup(&self.op)
    }

    pub fn operand_push(&mut self, operand: Expr) {
        self.operands.push(operand);
    }

    pub fn operand(&self, index: usize) -> Result<&Expr, ExprError> {
        self.operands
            .get(index)
            .ok_or(ExprError::IndexOutOfRange {
                index,
                count: self.operands.len(),
            })
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }
}

// Expression tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Leaf(Leaf),
    Compound(CompoundExpr),
    Subquery(Box<QuerySpec>),
}

impl Expr {
    pub fn compound(op: impl Into<String>, operands: Vec<Expr>) -> Self {
        Expr::Compound(CompoundExpr::with_operands(op, operands))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Leaf(_) => "leaf",
            Expr::Compound(_) => "compound",
            Expr::Subquery(_) => "subquery",
        }
    }

    pub fn as_leaf(&self) -> Result<&Leaf, ExprError> {
        match self {
            Expr::Leaf(leaf) => Ok(leaf),
            Expr::Compound(_) | Expr::Subquery(_) => Err(ExprError::StructuralMismatch {
                expected: "leaf",
                found: self.kind_name(),
            }),
        }
    }

    pub fn as_compound(&self) -> Result<&CompoundExpr, ExprError> {
        match self {
            Expr::Compound(compound) => Ok(compound),
            Expr::Leaf(_) | Expr::Subquery(_) => Err(ExprError::StructuralMismatch {
                expected: "compound",
                found: self.kind_name(),
            }),
        }
    }

    pub fn as_subquery(&self) -> Result<&QuerySpec, ExprError> {
        match self {
            Expr::Subquery(query) => Ok(query),
            Expr::Leaf(_) | Expr::Compound(_) => Err(ExprError::StructuralMismatch {
                expected: "subquery",
                found: self.kind_name(),
            }),
        }
    }

    /// Check if this expression contains subqueries
    pub fn has_subqueries(&self) -> bool {
        match self {
            Expr::Leaf(_) => false,
            Expr::Compound(compound) => compound.operands.iter().any(Expr::has_subqueries),
            Expr::Subquery(_) => true,
        }
    }
}

impl From<Leaf> for Expr {
    fn from(leaf: Leaf) -> Self {
        Expr::Leaf(leaf)
    }
}

impl From<LiteralValue> for Expr {
    fn from(value: LiteralValue) -> Self {
        Expr::Leaf(Leaf::Value(value))
    }
}

impl From<ColumnNode> for Expr {
    fn from(column: ColumnNode) -> Self {
        Expr::Leaf(Leaf::Column(column))
    }
}

impl From<CompoundExpr> for Expr {
    fn from(compound: CompoundExpr) -> Self {
        Expr::Compound(compound)
    }
}

impl From<QuerySpec> for Expr {
    fn from(query: QuerySpec) -> Self {
        Expr::Subquery(Box::new(query))
    }
}

/// Table reference in a FROM list. Two items are the same table reference
/// only if schema, name and alias all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromItem {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl FromItem {
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: name.to_owned(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_owned());
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_owned());
        self
    }
}

impl Deparse for FromItem {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        if let Some(schema) = &self.schema {
            schema.deparse(buf);
            buf.push('.');
        }

        self.name.deparse(buf);

        if let Some(alias) = &self.alias {
            buf.push(' ');
            alias.deparse(buf);
        }

        buf
    }
}

/// True when every item of `inner` also appears in `outer`.
pub fn from_items_contain(outer: &[FromItem], inner: &[FromItem]) -> bool {
    inner.iter().all(|item| outer.contains(item))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectColumn {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderByClause {
    pub expr: Expr,
    /// `None` when no direction was written
    pub direction: Option<SortDirection>,
}

/// A single SELECT block as it appears inside a WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QuerySpec {
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    pub from: Vec<FromItem>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByClause>,
}

impl QuerySpec {
    /// Check if this query contains subqueries outside of its FROM list
    pub fn has_subqueries(&self) -> bool {
        self.columns.iter().any(|c| c.expr.has_subqueries())
            || self.where_clause.as_ref().is_some_and(Expr::has_subqueries)
            || self.group_by.iter().any(Expr::has_subqueries)
            || self.having.as_ref().is_some_and(Expr::has_subqueries)
            || self.order_by.iter().any(|o| o.expr.has_subqueries())
    }
}
