//! Operator catalog and function registry.
//!
//! The operator table is static and looked up by exact symbol. Function names
//! are not operators: aggregates and custom functions are registered in a
//! [`FunctionRegistry`] value that is handed to the parser and renderer
//! explicitly.

use std::collections::{HashMap, HashSet};

use phf::phf_map;
use strum_macros::AsRefStr;

/// Operators with dedicated rendering or rewrite behavior.
///
/// `None` is the sentinel for any symbol not in the table (function names,
/// `ANY`, `ALL`, `EXISTS`, dialect operators, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Operator {
    And,
    Or,
    Not,
    #[strum(to_string = "=")]
    Equal,
    #[strum(to_string = "!=")]
    NotEqual,
    #[strum(to_string = "<>")]
    Excluding,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = ">=")]
    GreaterThanOrEqual,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = "<=")]
    LessThanOrEqual,
    Between,
    #[strum(to_string = "NOT BETWEEN")]
    NotBetween,
    Like,
    #[strum(to_string = "NOT LIKE")]
    NotLike,
    In,
    #[strum(to_string = "NOT IN")]
    NotIn,
    #[strum(to_string = "IS NULL")]
    IsNull,
    #[strum(to_string = "IS NOT NULL")]
    IsNotNull,
    #[strum(to_string = "+")]
    Plus,
    #[strum(to_string = "-")]
    Minus,
    #[strum(to_string = "*")]
    Multiply,
    #[strum(to_string = "/")]
    Divide,
    #[strum(to_string = "**")]
    Power,
    #[strum(to_string = ",")]
    Comma,
    #[strum(to_string = "")]
    None,
}

const OPERATOR_SYMBOL_MAP: phf::Map<&'static str, Operator> = phf_map! {
    "AND" => Operator::And,
    "OR" => Operator::Or,
    "NOT" => Operator::Not,
    "=" => Operator::Equal,
    "!=" => Operator::NotEqual,
    "<>" => Operator::Excluding,
    ">" => Operator::GreaterThan,
    ">=" => Operator::GreaterThanOrEqual,
    "<" => Operator::LessThan,
    "<=" => Operator::LessThanOrEqual,
    "BETWEEN" => Operator::Between,
    "NOT BETWEEN" => Operator::NotBetween,
    "LIKE" => Operator::Like,
    "NOT LIKE" => Operator::NotLike,
    "IN" => Operator::In,
    "NOT IN" => Operator::NotIn,
    "IS NULL" => Operator::IsNull,
    "IS NOT NULL" => Operator::IsNotNull,
    "+" => Operator::Plus,
    "-" => Operator::Minus,
    "*" => Operator::Multiply,
    "/" => Operator::Divide,
    "**" => Operator::Power,
    "," => Operator::Comma,
};

impl Operator {
    /// Exact-match lookup. Unknown symbols map to [`Operator::None`].
    pub fn lookup(symbol: &str) -> Operator {
        OPERATOR_SYMBOL_MAP
            .get(symbol)
            .copied()
            .unwrap_or(Operator::None)
    }

    /// The operator's SQL symbol, `None` for the sentinel.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Operator::None => None,
            other => Some(other.as_ref()),
        }
    }

    pub fn is_in_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_null_test(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

const STANDARD_AGGREGATES: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Aggregate and custom function names known to the parser and renderer.
///
/// Names are stored upper-cased and matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRegistry {
    aggregates: HashSet<String>,
    functions: HashMap<String, usize>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FunctionRegistry {
    /// Registry with no aggregates and no custom functions.
    pub fn empty() -> Self {
        Self {
            aggregates: HashSet::new(),
            functions: HashMap::new(),
        }
    }

    /// Registry with the standard SQL aggregates.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for name in STANDARD_AGGREGATES {
            registry.aggregate_register(name);
        }
        registry
    }

    pub fn aggregate_register(&mut self, name: &str) {
        self.aggregates.insert(name.to_ascii_uppercase());
    }

    pub fn function_register(&mut self, name: &str, arity: usize) {
        self.functions.insert(name.to_ascii_uppercase(), arity);
    }

    pub fn with_aggregate(mut self, name: &str) -> Self {
        self.aggregate_register(name);
        self
    }

    pub fn with_function(mut self, name: &str, arity: usize) -> Self {
        self.function_register(name, arity);
        self
    }

    pub fn is_aggregate(&self, name: &str) -> bool {
        self.aggregates.contains(&name.to_ascii_uppercase())
    }

    /// Registered arity of a custom function, `None` if unregistered.
    pub fn custom_function_arity(&self, name: &str) -> Option<usize> {
        self.functions.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.is_aggregate(name) || self.custom_function_arity(name).is_some()
    }
}
