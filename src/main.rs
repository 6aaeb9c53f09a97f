use std::error::Error;
use std::io::{self, Write};

use sqlrewrite_lib::query::optimize::where_optimize;
use sqlrewrite_lib::query::parse::from_clause_parse;
use sqlrewrite_lib::settings::{Invocation, Settings};
use sqlrewrite_lib::tracing_utils::LineFormatter;

use tracing::error;

fn main() -> Result<(), Box<dyn Error>> {
    let settings = match Settings::from_args()? {
        Invocation::Run(settings) => settings,
        Invocation::Help(usage) => {
            writeln!(io::stdout().lock(), "{usage}")?;
            return Ok(());
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(settings.log_level)
        .with_writer(io::stderr)
        .event_format(LineFormatter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // A bad FROM list leaves the WHERE clause as given
    let optimized = match from_clause_parse(&settings.from) {
        Ok(from_items) => where_optimize(&from_items, &settings.where_clause, &settings.functions),
        Err(e) => {
            error!("invalid FROM list: {e}");
            settings.where_clause.clone()
        }
    };

    writeln!(io::stdout().lock(), "{optimized}")?;

    Ok(())
}
