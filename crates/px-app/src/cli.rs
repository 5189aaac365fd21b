use clap::{Parser, Subcommand};
use px_core::Selection;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pxweb", about = "Browse and query PxWeb statistical databases", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API to use: `statfin`, `vero`, or a base URL
    #[arg(long, global = true, default_value = "statfin")]
    pub api: String,

    /// Database language (fi/sv/en) for the known APIs
    #[arg(long, global = true, default_value = "fi")]
    pub lang: String,

    /// Directory for cached query results
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the contents of a database or level
    Ls {
        /// Names from the root, e.g. `StatFin tyokay` or `StatFin/tyokay`
        path: Vec<String>,

        /// Write the listing as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Describe a table, one of its variables, or matching values
    Show {
        /// Names from the root down to the table
        #[arg(required = true)]
        path: Vec<String>,

        /// Variable code to list values for
        #[arg(long)]
        variable: Option<String>,

        /// Regular expression over value texts (needs --variable)
        #[arg(long, requires = "variable")]
        find: Option<String>,

        /// Match --find case sensitively
        #[arg(long, requires = "find")]
        case_sensitive: bool,
    },

    /// Query a table
    Query {
        /// Names from the root down to the table
        #[arg(required = true)]
        path: Vec<String>,

        /// Filter as CODE=SEL, where SEL is `*`, a code, or comma separated codes
        #[arg(long = "filter", short = 'f', value_parser = parse_filter)]
        filters: Vec<(String, Selection)>,

        /// Reuse or store the result under this cache id
        #[arg(long)]
        cache: Option<String>,

        /// Write the result as CSV to this file instead of printing it
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Manage the query cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached ids
    Ls,
    /// Delete every cached result
    Clear,
}

/// Split `Foo/Bar baz` style arguments into individual names
pub fn split_path(args: &[String]) -> Vec<&str> {
    args.iter()
        .flat_map(|a| a.split('/'))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `CODE=SEL`
pub fn parse_filter(s: &str) -> Result<(String, Selection), String> {
    let (code, selection) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=SELECTION, got '{s}'"))?;

    let code = code.trim();
    if code.is_empty() {
        return Err(format!("missing variable code in '{s}'"));
    }

    let codes: Vec<&str> = selection.split(',').map(str::trim).collect();
    let selection = match codes.as_slice() {
        [single] if single.is_empty() => return Err(format!("missing selection in '{s}'")),
        [single] => Selection::from(*single),
        many => Selection::from(many.to_vec()),
    };

    Ok((code.to_string(), selection))
}
