//! Command-line browser for PxWeb databases

use std::fs::File;
use std::io;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};

use px_core::{statfin_url, verohallinto_url, ClientConfig, Filters, PxWebApi, QueryCache};

mod cli;

use cli::{split_path, CacheAction, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Ls { ref path, csv } => {
            let mut api = open_api(&cli, &config)?;
            let path = split_path(path);
            let id = api.resolve(&path)?;
            if api.node(id).is_table() {
                print!("{}", api.node(id));
                return Ok(());
            }

            let index = api.index(id)?;
            if csv {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.write_record(["name", "type", "text"])?;
                for entry in index {
                    writer.write_record([
                        entry.name.as_str(),
                        entry.type_id.as_deref().unwrap_or(""),
                        entry.text.as_str(),
                    ])?;
                }
                writer.flush()?;
            } else {
                print!("{}", api.node(id));
            }
        }

        Commands::Show {
            ref path,
            ref variable,
            ref find,
            case_sensitive,
        } => {
            let mut api = open_api(&cli, &config)?;
            let table = api.table(&split_path(path))?;

            match (variable, find) {
                (None, _) => print!("{table}"),
                (Some(code), None) => print!("{}", table.variable(code)?),
                (Some(code), Some(pattern)) => {
                    for value in table.variable(code)?.find_with(pattern, !case_sensitive)? {
                        println!("{value}");
                    }
                }
            }
        }

        Commands::Query {
            ref path,
            ref filters,
            ref cache,
            ref output,
        } => {
            let mut api = open_api(&cli, &config)?;
            let path = split_path(path);
            let id = api.resolve(&path)?;
            let filters: Filters = filters.iter().cloned().collect();

            let batch = api
                .query(id, &filters, cache.as_deref())
                .with_context(|| format!("Query of {} failed", path.join("/")))?;

            match output {
                Some(file) => {
                    let out = File::create(file)
                        .with_context(|| format!("Cannot create {}", file.display()))?;
                    let mut writer = arrow::csv::Writer::new(out);
                    writer.write(&batch)?;
                    info!(rows = batch.num_rows(), file = %file.display(), "Wrote query result");
                }
                None => println!("{}", arrow::util::pretty::pretty_format_batches(&[batch])?),
            }
        }

        Commands::Cache { ref action } => {
            let cache = QueryCache::from_config(&config);
            match action {
                CacheAction::Ls => {
                    for id in cache.ids()? {
                        match cache.meta(&id)? {
                            Some(meta) => println!("{id}\t{}", meta.stored_at.to_rfc3339()),
                            None => println!("{id}"),
                        }
                    }
                }
                CacheAction::Clear => {
                    cache.clear()?;
                    println!("Cleared {}", cache.dir().display());
                }
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?,
        None => ClientConfig::from_env(),
    };

    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout_secs(secs);
    }
    Ok(config)
}

fn open_api(cli: &Cli, config: &ClientConfig) -> Result<PxWebApi> {
    let url = match cli.api.as_str() {
        "statfin" => statfin_url(&cli.lang),
        "vero" => verohallinto_url(&cli.lang),
        url if url.starts_with("http://") || url.starts_with("https://") => url.to_string(),
        other => bail!("Unknown API '{other}', expected statfin, vero or a URL"),
    };

    info!(url = %url, "Opening API");
    Ok(PxWebApi::with_config(url, config)?)
}
