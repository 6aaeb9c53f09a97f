use error_set::error_set;
use rootcause::Report;
use tracing::{instrument, trace};

use pg_query::ParseResult;
use pg_query::protobuf::a_const::Val;
use pg_query::protobuf::node::Node as NodeEnum;
use pg_query::protobuf::{
    AConst, AExpr, AExprKind, BoolExpr, BoolExprType, ColumnRef, FuncCall, NullTest, NullTestType,
    ParamRef, RangeVar, ResTarget, SelectStmt, SetOperation, SortBy, SortByDir, SortByNulls,
    SubLink, SubLinkType,
};

use crate::result::{MapIntoReport, ReportExt};

use super::ast::{
    ColumnNode, Expr, FromItem, Leaf, LiteralValue, OrderByClause, QuerySpec, SelectColumn,
    SortDirection,
};
use super::catalog::FunctionRegistry;
use super::normalize::jdbc_escapes_strip;

error_set! {
    ParseError := WhereParseError || SqlError

    WhereParseError := {
        #[display("Unsupported WHERE clause pattern")]
        UnsupportedPattern,
        #[display("Unsupported A expression: {expr}")]
        UnsupportedAExpr { expr: String },
        #[display("Unsupported operator: {operator}")]
        UnsupportedOperator { operator: String },
        #[display("Unsupported {clause} clause")]
        UnsupportedClause { clause: &'static str },
        #[display("Unsupported FROM item")]
        UnsupportedFromItem,
        #[display("Unknown function: {name}")]
        UnknownFunction { name: String },
        #[display("Function {name} takes {expected} arguments, found {found}")]
        FunctionArity {
            name: String,
            expected: usize,
            found: usize,
        },
        #[display("Invalid column reference")]
        InvalidColumnRef,
        #[display("Invalid constant value: {value}")]
        InvalidConstValue { value: String },
        #[display("Expected a single SELECT statement")]
        StatementMismatch,
        #[display("Missing expression")]
        MissingExpression,
        #[display("{error}")]
        Other { error: String },
    }

    SqlError := {
        PgQueryError(pg_query::Error)
    }
}

/// Parse a standalone WHERE clause (without the `WHERE` keyword).
///
/// JDBC date/time escapes are stripped before the text reaches the parser.
/// Function calls must be known to `functions`.
#[instrument(skip_all)]
pub fn where_clause_parse(
    where_text: &str,
    functions: &FunctionRegistry,
) -> Result<Expr, Report<ParseError>> {
    let normalized = jdbc_escapes_strip(where_text);
    let ast = pg_query::parse(&format!("SELECT 1 WHERE {normalized}"))
        .map_err(SqlError::from)
        .map_into_report::<ParseError>()?;

    let select_stmt = query_select_statement(&ast).map_into_report::<ParseError>()?;
    if !select_stmt.from_clause.is_empty() {
        return Err(WhereParseError::UnsupportedClause { clause: "FROM" })
            .map_into_report::<ParseError>();
    }
    select_stmt_clauses_check(select_stmt).map_into_report::<ParseError>()?;
    select_stmt_tail_check(select_stmt).map_into_report::<ParseError>()?;

    let where_node = select_stmt
        .where_clause
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)
        .map_into_report::<ParseError>()?;

    let expr = node_convert_to_expr(where_node, functions)
        .map_into_report::<ParseError>()
        .attach_loc("converting WHERE clause")?;
    trace!("parsed where clause {expr}");

    Ok(expr)
}

/// Parse a comma-separated FROM list. Only plain table references
/// (`[schema.]table [alias]`) are accepted.
#[instrument(skip_all)]
pub fn from_clause_parse(from_text: &str) -> Result<Vec<FromItem>, Report<ParseError>> {
    let ast = pg_query::parse(&format!("SELECT * FROM {from_text}"))
        .map_err(SqlError::from)
        .map_into_report::<ParseError>()?;

    let select_stmt = query_select_statement(&ast).map_into_report::<ParseError>()?;
    if select_stmt.where_clause.is_some() {
        return Err(WhereParseError::UnsupportedClause { clause: "WHERE" })
            .map_into_report::<ParseError>();
    }
    select_stmt_clauses_check(select_stmt).map_into_report::<ParseError>()?;
    select_stmt_tail_check(select_stmt).map_into_report::<ParseError>()?;

    select_stmt
        .from_clause
        .iter()
        .map(from_item_extract)
        .collect::<Result<Vec<_>, _>>()
        .map_into_report::<ParseError>()
        .attach_loc("converting FROM list")
}

/// Parse a complete SELECT statement into a [`QuerySpec`].
#[instrument(skip_all)]
pub fn query_parse(
    query_text: &str,
    functions: &FunctionRegistry,
) -> Result<QuerySpec, Report<ParseError>> {
    let normalized = jdbc_escapes_strip(query_text);
    let ast = pg_query::parse(&normalized)
        .map_err(SqlError::from)
        .map_into_report::<ParseError>()?;

    let select_stmt = query_select_statement(&ast).map_into_report::<ParseError>()?;

    select_stmt_convert(select_stmt, functions)
        .map_into_report::<ParseError>()
        .attach_loc("converting SELECT statement")
}

fn query_select_statement(ast: &ParseResult) -> Result<&SelectStmt, WhereParseError> {
    let [raw_stmt] = ast.protobuf.stmts.as_slice() else {
        return Err(WhereParseError::StatementMismatch);
    };

    match raw_stmt.stmt.as_ref().and_then(|n| n.node.as_ref()) {
        Some(NodeEnum::SelectStmt(select_stmt)) => Ok(select_stmt),
        _ => Err(WhereParseError::StatementMismatch),
    }
}

/// Reject SELECT features that have no representation in [`QuerySpec`].
fn select_stmt_clauses_check(select_stmt: &SelectStmt) -> Result<(), WhereParseError> {
    let unsupported = if select_stmt.with_clause.is_some() {
        Some("WITH")
    } else if select_stmt.op() != SetOperation::SetopNone
        || select_stmt.larg.is_some()
        || select_stmt.rarg.is_some()
    {
        Some("set operation")
    } else if !select_stmt.values_lists.is_empty() {
        Some("VALUES")
    } else if select_stmt.limit_count.is_some() || select_stmt.limit_offset.is_some() {
        Some("LIMIT")
    } else if select_stmt.into_clause.is_some() {
        Some("INTO")
    } else if !select_stmt.locking_clause.is_empty() {
        Some("locking")
    } else if !select_stmt.window_clause.is_empty() {
        Some("WINDOW")
    } else if select_stmt
        .distinct_clause
        .iter()
        .any(|node| node.node.is_some())
    {
        Some("DISTINCT ON")
    } else {
        None
    };

    match unsupported {
        Some(clause) => Err(WhereParseError::UnsupportedClause { clause }),
        None => Ok(()),
    }
}

/// Clause fragments parse inside a wrapper statement; anything trailing the
/// fragment (GROUP BY, HAVING, ORDER BY) was not part of it.
fn select_stmt_tail_check(select_stmt: &SelectStmt) -> Result<(), WhereParseError> {
    let clause = if !select_stmt.group_clause.is_empty() {
        "GROUP BY"
    } else if select_stmt.having_clause.is_some() {
        "HAVING"
    } else if !select_stmt.sort_clause.is_empty() {
        "ORDER BY"
    } else {
        return Ok(());
    };

    Err(WhereParseError::UnsupportedClause { clause })
}

/// Convert a (sub)query SELECT statement.
pub fn select_stmt_convert(
    select_stmt: &SelectStmt,
    functions: &FunctionRegistry,
) -> Result<QuerySpec, WhereParseError> {
    select_stmt_clauses_check(select_stmt)?;

    let columns = select_stmt
        .target_list
        .iter()
        .map(|node| match node.node.as_ref() {
            Some(NodeEnum::ResTarget(target)) => res_target_convert(target, functions),
            _ => Err(WhereParseError::UnsupportedPattern),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let from = select_stmt
        .from_clause
        .iter()
        .map(from_item_extract)
        .collect::<Result<Vec<_>, _>>()?;

    let where_clause = select_stmt
        .where_clause
        .as_ref()
        .map(|node| node_convert_to_expr(node, functions))
        .transpose()?;

    let group_by = select_stmt
        .group_clause
        .iter()
        .map(|node| node_convert_to_expr(node, functions))
        .collect::<Result<Vec<_>, _>>()?;

    let having = select_stmt
        .having_clause
        .as_ref()
        .map(|node| node_convert_to_expr(node, functions))
        .transpose()?;

    let order_by = select_stmt
        .sort_clause
        .iter()
        .map(|node| match node.node.as_ref() {
            Some(NodeEnum::SortBy(sort_by)) => sort_by_convert(sort_by, functions),
            _ => Err(WhereParseError::UnsupportedPattern),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QuerySpec {
        distinct: !select_stmt.distinct_clause.is_empty(),
        columns,
        from,
        where_clause,
        group_by,
        having,
        order_by,
    })
}

fn res_target_convert(
    target: &ResTarget,
    functions: &FunctionRegistry,
) -> Result<SelectColumn, WhereParseError> {
    let val = target
        .val
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;

    Ok(SelectColumn {
        expr: node_convert_to_expr(val, functions)?,
        alias: (!target.name.is_empty()).then(|| target.name.clone()),
    })
}

fn sort_by_convert(
    sort_by: &SortBy,
    functions: &FunctionRegistry,
) -> Result<OrderByClause, WhereParseError> {
    let node = sort_by
        .node
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;

    if sort_by.sortby_nulls() != SortByNulls::SortbyNullsDefault {
        return Err(WhereParseError::UnsupportedClause {
            clause: "NULLS FIRST/LAST",
        });
    }

    let direction = match sort_by.sortby_dir() {
        SortByDir::SortbyDefault => None,
        SortByDir::SortbyAsc => Some(SortDirection::Asc),
        SortByDir::SortbyDesc => Some(SortDirection::Desc),
        SortByDir::SortbyUsing | SortByDir::Undefined => {
            return Err(WhereParseError::UnsupportedClause {
                clause: "ORDER BY USING",
            });
        }
    };

    Ok(OrderByClause {
        expr: node_convert_to_expr(node, functions)?,
        direction,
    })
}

/// Extract a FROM list entry. Joins and derived tables are rejected.
fn from_item_extract(node: &pg_query::Node) -> Result<FromItem, WhereParseError> {
    let Some(NodeEnum::RangeVar(range_var)) = node.node.as_ref() else {
        return Err(WhereParseError::UnsupportedFromItem);
    };

    Ok(range_var_extract(range_var))
}

fn range_var_extract(range_var: &RangeVar) -> FromItem {
    FromItem {
        schema: (!range_var.schemaname.is_empty()).then(|| range_var.schemaname.clone()),
        name: range_var.relname.clone(),
        alias: range_var.alias.as_ref().map(|a| a.aliasname.clone()),
    }
}

/// Convert a pg_query Node to our Expr - main entry point for recursion
pub fn node_convert_to_expr(
    node: &pg_query::Node,
    functions: &FunctionRegistry,
) -> Result<Expr, WhereParseError> {
    match node.node.as_ref() {
        Some(NodeEnum::AExpr(expr)) => a_expr_convert(expr, functions),
        Some(NodeEnum::BoolExpr(expr)) => bool_expr_convert(expr, functions),
        Some(NodeEnum::ColumnRef(col_ref)) => Ok(column_ref_extract(col_ref)?.into()),
        Some(NodeEnum::AConst(const_val)) => Ok(const_value_extract(const_val)?.into()),
        Some(NodeEnum::ParamRef(param_ref)) => Ok(param_ref_extract(param_ref).into()),
        Some(NodeEnum::SubLink(sub_link)) => sublink_convert(sub_link, functions),
        Some(NodeEnum::NullTest(null_test)) => null_test_convert(null_test, functions),
        Some(NodeEnum::FuncCall(func_call)) => func_call_convert(func_call, functions),
        unsupported => {
            trace!("unsupported node {unsupported:?}");
            Err(WhereParseError::UnsupportedPattern)
        }
    }
}

/// Convert pg_query SubLink.
///
/// `x IN (select)` becomes `IN [x, subquery]`, `x op ANY (select)` becomes
/// `op [x, ANY [subquery]]` (likewise ALL), EXISTS wraps the subquery and a
/// scalar subquery stands alone.
#[expect(clippy::wildcard_enum_match_arm)]
fn sublink_convert(sub_link: &SubLink, functions: &FunctionRegistry) -> Result<Expr, WhereParseError> {
    let query = match sub_link.subselect.as_ref().and_then(|n| n.node.as_ref()) {
        Some(NodeEnum::SelectStmt(select_stmt)) => select_stmt_convert(select_stmt, functions)?,
        _ => {
            return Err(WhereParseError::Other {
                error: "SubLink missing or invalid subselect".to_owned(),
            });
        }
    };
    let subquery = Expr::from(query);

    match sub_link.sub_link_type() {
        SubLinkType::ExistsSublink => Ok(Expr::compound("EXISTS", vec![subquery])),
        SubLinkType::ExprSublink => Ok(subquery),
        link_type @ (SubLinkType::AnySublink | SubLinkType::AllSublink) => {
            let test_expr = sub_link
                .testexpr
                .as_ref()
                .ok_or(WhereParseError::MissingExpression)?;
            let test_expr = node_convert_to_expr(test_expr, functions)?;

            if sub_link.oper_name.is_empty() {
                // IN (subquery) carries no operator name
                return Ok(Expr::compound("IN", vec![test_expr, subquery]));
            }

            let op = operator_extract(&sub_link.oper_name)?;
            let quantifier = match link_type {
                SubLinkType::AllSublink => "ALL",
                _ => "ANY",
            };

            Ok(Expr::compound(
                op,
                vec![test_expr, Expr::compound(quantifier, vec![subquery])],
            ))
        }
        unsupported => Err(WhereParseError::UnsupportedAExpr {
            expr: format!("{unsupported:?}"),
        }),
    }
}

/// Convert pg_query NullTest (IS NULL / IS NOT NULL)
fn null_test_convert(
    null_test: &NullTest,
    functions: &FunctionRegistry,
) -> Result<Expr, WhereParseError> {
    let arg = null_test
        .arg
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;

    let op = match null_test.nulltesttype() {
        NullTestType::IsNull => "IS NULL",
        NullTestType::IsNotNull => "IS NOT NULL",
        NullTestType::Undefined => {
            return Err(WhereParseError::UnsupportedAExpr {
                expr: "Undefined NullTest type".to_owned(),
            });
        }
    };

    Ok(Expr::compound(op, vec![node_convert_to_expr(arg, functions)?]))
}

/// Convert pg_query FuncCall. The function must be registered; the node's
/// operator is the upper-cased, unqualified name.
fn func_call_convert(
    func_call: &FuncCall,
    functions: &FunctionRegistry,
) -> Result<Expr, WhereParseError> {
    // Last component of a qualified name (pg_catalog.count -> count)
    let name = func_call
        .funcname
        .iter()
        .filter_map(|n| match &n.node {
            Some(NodeEnum::String(s)) => Some(s.sval.to_ascii_uppercase()),
            _ => None,
        })
        .next_back()
        .ok_or(WhereParseError::UnsupportedPattern)?;

    if !functions.is_known(&name) {
        return Err(WhereParseError::UnknownFunction { name });
    }

    if func_call.agg_distinct
        || func_call.over.is_some()
        || func_call.agg_filter.is_some()
        || !func_call.agg_order.is_empty()
    {
        return Err(WhereParseError::UnsupportedPattern);
    }

    // COUNT(*) carries agg_star and no arguments
    let args = if func_call.agg_star {
        vec![Leaf::Star { table: None }.into()]
    } else {
        func_call
            .args
            .iter()
            .map(|arg| node_convert_to_expr(arg, functions))
            .collect::<Result<Vec<_>, _>>()?
    };

    if let Some(expected) = functions.custom_function_arity(&name)
        && expected != args.len()
    {
        return Err(WhereParseError::FunctionArity {
            name,
            expected,
            found: args.len(),
        });
    }

    Ok(Expr::compound(name, args))
}

/// Extract column reference (or star) from pg_query ColumnRef
fn column_ref_extract(col_ref: &ColumnRef) -> Result<Leaf, WhereParseError> {
    // None stands for `*`
    let fields = col_ref
        .fields
        .iter()
        .map(|field| match field.node.as_ref() {
            Some(NodeEnum::String(s)) => Ok(Some(s.sval.as_str())),
            Some(NodeEnum::AStar(_)) => Ok(None),
            _ => Err(WhereParseError::InvalidColumnRef),
        })
        .collect::<Result<Vec<_>, _>>()?;

    match fields.as_slice() {
        [Some(column)] => Ok(Leaf::Column(ColumnNode::unqualified(column))),
        [Some(table), Some(column)] => Ok(Leaf::Column(ColumnNode::qualified(table, column))),
        [None] => Ok(Leaf::Star { table: None }),
        [Some(table), None] => Ok(Leaf::Star {
            table: Some((*table).to_owned()),
        }),
        _ => Err(WhereParseError::InvalidColumnRef),
    }
}

/// Extract constant value from pg_query A_Const
pub fn const_value_extract(const_val: &AConst) -> Result<LiteralValue, WhereParseError> {
    if const_val.isnull {
        return Ok(LiteralValue::Null);
    }

    match const_val.val.as_ref() {
        Some(Val::Sval(s)) => Ok(LiteralValue::String(s.sval.clone())),
        Some(Val::Ival(i)) => Ok(LiteralValue::Number(i.ival.to_string())),
        Some(Val::Fval(f)) => Ok(LiteralValue::Number(f.fval.clone())),
        Some(Val::Boolval(b)) => Ok(LiteralValue::Boolean(b.boolval)),
        Some(Val::Bsval(bs)) => Err(WhereParseError::InvalidConstValue {
            value: bs.bsval.clone(),
        }),
        None => Ok(LiteralValue::Null),
    }
}

/// Extract parameter reference from pg_query ParamRef
fn param_ref_extract(param_ref: &ParamRef) -> LiteralValue {
    LiteralValue::Parameter(format!("${}", param_ref.number))
}

/// Convert PostgreSQL A_Expr (expressions like col = value)
#[expect(clippy::wildcard_enum_match_arm)]
fn a_expr_convert(expr: &AExpr, functions: &FunctionRegistry) -> Result<Expr, WhereParseError> {
    let rexpr = expr
        .rexpr
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;

    match expr.kind() {
        AExprKind::AexprOp => {
            let op = operator_extract(&expr.name)?;
            let right = node_convert_to_expr(rexpr, functions)?;

            // Prefix operators (unary minus) have no left side
            let operands = match expr.lexpr.as_ref() {
                Some(lexpr) => vec![node_convert_to_expr(lexpr, functions)?, right],
                None => vec![right],
            };

            Ok(Expr::compound(op, operands))
        }
        AExprKind::AexprIn => {
            // name: ["="] for IN, ["<>"] for NOT IN
            let op = in_operator_extract(&expr.name)?;
            let lexpr = expr
                .lexpr
                .as_ref()
                .ok_or(WhereParseError::MissingExpression)?;

            // [subject, value1, value2, ...]
            let mut operands = vec![node_convert_to_expr(lexpr, functions)?];
            operands.extend(in_list_extract(rexpr, functions)?);

            Ok(Expr::compound(op, operands))
        }
        AExprKind::AexprLike | AExprKind::AexprIlike => {
            let op = match operator_extract(&expr.name)?.as_str() {
                "~~" => "LIKE",
                "!~~" => "NOT LIKE",
                "~~*" => "ILIKE",
                "!~~*" => "NOT ILIKE",
                other => {
                    return Err(WhereParseError::UnsupportedOperator {
                        operator: format!("LIKE with operator '{other}'"),
                    });
                }
            };
            let lexpr = expr
                .lexpr
                .as_ref()
                .ok_or(WhereParseError::MissingExpression)?;

            Ok(Expr::compound(
                op,
                vec![
                    node_convert_to_expr(lexpr, functions)?,
                    node_convert_to_expr(rexpr, functions)?,
                ],
            ))
        }
        kind @ (AExprKind::AexprBetween | AExprKind::AexprNotBetween) => {
            let op = match kind {
                AExprKind::AexprNotBetween => "NOT BETWEEN",
                _ => "BETWEEN",
            };
            let lexpr = expr
                .lexpr
                .as_ref()
                .ok_or(WhereParseError::MissingExpression)?;

            // [subject, low, high]
            let mut operands = vec![node_convert_to_expr(lexpr, functions)?];
            let bounds = in_list_extract(rexpr, functions)?;
            if bounds.len() != 2 {
                return Err(WhereParseError::Other {
                    error: "BETWEEN: expected two bounds".to_owned(),
                });
            }
            operands.extend(bounds);

            Ok(Expr::compound(op, operands))
        }
        unsupported_kind => Err(WhereParseError::UnsupportedAExpr {
            expr: format!("{unsupported_kind:?}"),
        }),
    }
}

/// Extract IN/NOT IN operator from name nodes
fn in_operator_extract(name_nodes: &[pg_query::Node]) -> Result<&'static str, WhereParseError> {
    match operator_extract(name_nodes)?.as_str() {
        "=" => Ok("IN"),
        "<>" => Ok("NOT IN"),
        other => Err(WhereParseError::UnsupportedOperator {
            operator: format!("IN with operator '{other}'"),
        }),
    }
}

/// Extract values from a pg_query List node (IN list, BETWEEN bounds)
fn in_list_extract(
    node: &pg_query::Node,
    functions: &FunctionRegistry,
) -> Result<Vec<Expr>, WhereParseError> {
    let Some(NodeEnum::List(list)) = &node.node else {
        return Err(WhereParseError::Other {
            error: "expected List on right side".to_owned(),
        });
    };

    list.items
        .iter()
        .map(|item| node_convert_to_expr(item, functions))
        .collect()
}

/// Extract the operator symbol from pg_query operator name nodes
fn operator_extract(name_nodes: &[pg_query::Node]) -> Result<String, WhereParseError> {
    let [name_node] = name_nodes else {
        return Err(WhereParseError::Other {
            error: "Multi-part operator names not supported".to_owned(),
        });
    };

    match name_node.node.as_ref() {
        Some(NodeEnum::String(s)) => Ok(s.sval.clone()),
        _ => Err(WhereParseError::Other {
            error: "Invalid operator name format".to_owned(),
        }),
    }
}

/// Convert PostgreSQL BoolExpr (AND, OR, NOT). Chained AND/OR arrive
/// flattened and stay variadic.
fn bool_expr_convert(expr: &BoolExpr, functions: &FunctionRegistry) -> Result<Expr, WhereParseError> {
    let op = match expr.boolop() {
        BoolExprType::AndExpr => "AND",
        BoolExprType::OrExpr => "OR",
        BoolExprType::NotExpr => return not_expr_convert(expr, functions),
        BoolExprType::Undefined => {
            return Err(WhereParseError::Other {
                error: "Undefined boolean expression type".to_owned(),
            });
        }
    };

    if expr.args.len() < 2 {
        return Err(WhereParseError::Other {
            error: format!("{op} with < 2 arguments not supported"),
        });
    }

    let operands = expr
        .args
        .iter()
        .map(|arg| node_convert_to_expr(arg, functions))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Expr::compound(op, operands))
}

/// `NOT x IN (select ...)` parses as NOT over an IN sublink and becomes a
/// single `NOT IN` node.
fn not_expr_convert(expr: &BoolExpr, functions: &FunctionRegistry) -> Result<Expr, WhereParseError> {
    let [arg] = expr.args.as_slice() else {
        return Err(WhereParseError::Other {
            error: "NOT with != 1 argument not supported".to_owned(),
        });
    };

    let negated_in = matches!(
        arg.node.as_ref(),
        Some(NodeEnum::SubLink(sub_link))
            if sub_link.sub_link_type() == SubLinkType::AnySublink && sub_link.oper_name.is_empty()
    );

    match node_convert_to_expr(arg, functions)? {
        Expr::Compound(mut compound) if negated_in => {
            compound.op = "NOT IN".to_owned();
            Ok(compound.into())
        }
        inner @ (Expr::Leaf(_) | Expr::Compound(_) | Expr::Subquery(_)) => {
            Ok(Expr::compound("NOT", vec![inner]))
        }
    }
}
