use std::{error::Error, ffi::OsString, fs, io, path::PathBuf};

use error_set::error_set;
use lexopt::prelude::*;
use tracing::Level;

use crate::query::catalog::FunctionRegistry;

error_set! {
    ConfigError := {
        ArgumentError(Box<dyn Error + Send + Sync + 'static>),

        #[display("Missing argument: {name}")]
        ArgumentMissing { name: &'static str },
        #[display("Invalid value for --{name}: {value}")]
        ArgumentInvalid { name: &'static str, value: String },
        IoError(io::Error),
    }
}

impl From<lexopt::Error> for ConfigError {
    fn from(error: lexopt::Error) -> Self {
        Self::ArgumentError(Box::new(error))
    }
}

const USAGE: &str = "(--from FROM | --from-file PATH) (--where WHERE | --where-file PATH) \
                     [--function NAME=ARITY]... [--aggregate NAME]... [--log-level LEVEL]";

/// Clause text given inline or read from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClauseSource {
    Inline(String),
    File(PathBuf),
}

impl ClauseSource {
    fn load(self) -> Result<String, ConfigError> {
        match self {
            ClauseSource::Inline(text) => Ok(text),
            ClauseSource::File(path) => Ok(fs::read_to_string(path)?.trim_end().to_owned()),
        }
    }
}

/// What the command line asked for.
#[derive(Debug)]
pub enum Invocation {
    Run(Settings),
    /// `--help`: usage text for the caller to print
    Help(String),
}

#[derive(Debug)]
pub struct Settings {
    /// Outer query FROM list, e.g. `large_table, small_table s`
    pub from: String,
    /// WHERE clause without the keyword
    pub where_clause: String,
    pub functions: FunctionRegistry,
    pub log_level: Level,
}

impl Settings {
    pub fn from_args() -> Result<Invocation, ConfigError> {
        Self::from_parser(lexopt::Parser::from_env())
    }

    /// Parse settings from an explicit argument list (program name excluded).
    pub fn from_arg_list<I>(args: I) -> Result<Invocation, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        Self::from_parser(lexopt::Parser::from_args(args))
    }

    fn from_parser(mut parser: lexopt::Parser) -> Result<Invocation, ConfigError> {
        let mut from: Option<ClauseSource> = None;
        let mut where_clause: Option<ClauseSource> = None;
        let mut functions = FunctionRegistry::standard();
        let mut log_level = Level::INFO;

        while let Some(arg) = parser.next()? {
            match arg {
                Long("from") => from = Some(ClauseSource::Inline(parser.value()?.string()?)),
                Long("from-file") => from = Some(ClauseSource::File(parser.value()?.into())),
                Long("where") => {
                    where_clause = Some(ClauseSource::Inline(parser.value()?.string()?));
                }
                Long("where-file") => {
                    where_clause = Some(ClauseSource::File(parser.value()?.into()));
                }
                Long("function") => {
                    let (name, arity) = function_arg_parse(&parser.value()?.string()?)?;
                    functions.function_register(&name, arity);
                }
                Long("aggregate") => functions.aggregate_register(&parser.value()?.string()?),
                Long("log-level") => log_level = parser.value()?.parse()?,
                Long("help") => {
                    let bin_name = parser.bin_name().unwrap_or("sqlrewrite");
                    return Ok(Invocation::Help(format!("Usage: {bin_name} {USAGE}")));
                }
                _ => return Err(ConfigError::ArgumentError(Box::new(arg.unexpected()))),
            }
        }

        Ok(Invocation::Run(Settings {
            from: from
                .ok_or(ConfigError::ArgumentMissing { name: "from" })?
                .load()?,
            where_clause: where_clause
                .ok_or(ConfigError::ArgumentMissing { name: "where" })?
                .load()?,
            functions,
            log_level,
        }))
    }
}

/// `NAME=ARITY`
fn function_arg_parse(value: &str) -> Result<(String, usize), ConfigError> {
    let invalid = || ConfigError::ArgumentInvalid {
        name: "function",
        value: value.to_owned(),
    };

    let (name, arity) = value.split_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let arity = arity.trim().parse::<usize>().map_err(|_| invalid())?;

    Ok((name.to_owned(), arity))
}
