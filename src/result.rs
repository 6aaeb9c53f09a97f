//! Location-tracking extensions for `rootcause` reports.
//!
//! Parse and rewrite entry points return `Result<T, Report<ParseError>>`.
//! Inner conversion steps produce plain error sets; these helpers lift them
//! into reports and add a breadcrumb at each boundary they cross.
//!
//! ```ignore
//! use crate::result::{MapIntoReport, ReportExt};
//!
//! fn where_text_optimize(text: &str) -> Result<String, Report<ParseError>> {
//!     let expr = where_clause_parse(text, &functions).attach_loc("parsing WHERE clause")?;
//!     // ...
//! }
//! ```
//!
//! A failed parse then prints as
//!
//! ```text
//!  ● Unknown function: UPPER
//!  ├ src/query/parse.rs:88
//!  ├ converting WHERE clause at src/query/parse.rs:89
//!  ╰ parsing WHERE clause at src/query/optimize.rs:58
//! ```

use rootcause::Report;
use rootcause::hooks::builtin_hooks::location::Location;

/// Breadcrumb message paired with the source location that added it.
/// Displays as "message at file:line".
#[derive(Debug, Clone)]
pub struct LocatedAttachment {
    pub message: String,
    pub location: Location,
}

impl core::fmt::Display for LocatedAttachment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

/// Attach a breadcrumb carrying the caller's location to a report.
pub trait ReportExt<C> {
    type Output;

    fn attach_loc(self, message: impl Into<String>) -> Self::Output;
}

impl<C> ReportExt<C> for Report<C> {
    type Output = Report<C>;

    #[track_caller]
    fn attach_loc(self, message: impl Into<String>) -> Report<C> {
        self.attach(LocatedAttachment {
            message: message.into(),
            location: Location::caller(),
        })
    }
}

impl<T, C> ReportExt<C> for Result<T, Report<C>> {
    type Output = Result<T, Report<C>>;

    #[track_caller]
    fn attach_loc(self, message: impl Into<String>) -> Result<T, Report<C>> {
        // Captured here; closures do not inherit #[track_caller]
        let location = Location::caller();
        self.map_err(|report| {
            report.attach(LocatedAttachment {
                message: message.into(),
                location,
            })
        })
    }
}

/// Lift `Result<T, E>` to `Result<T, Report<C>>` through `E: Into<C>`, e.g.
/// `pg_query::Error` -> `SqlError` -> `Report<ParseError>` in two calls, or a
/// `WhereParseError` straight into its `ParseError` superset.
pub trait MapIntoReport<T, E> {
    fn map_into_report<C>(self) -> Result<T, Report<C>>
    where
        E: Into<C>,
        C: std::error::Error + Send + Sync + 'static;
}

impl<T, E> MapIntoReport<T, E> for Result<T, E> {
    #[track_caller]
    fn map_into_report<C>(self) -> Result<T, Report<C>>
    where
        E: Into<C>,
        C: std::error::Error + Send + Sync + 'static,
    {
        self.map_err(|e| e.into().into())
    }
}
