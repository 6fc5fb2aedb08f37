use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dsapi_core::{parse, render, schema, Catalog, Dialect};
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dsapi")]
#[command(about = "Dataset search API admin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Load and validate a catalog file, print a summary.
    Check { catalog: PathBuf },
    /// Parse criteria and print the AST and the rendered backend query.
    Translate {
        criteria: String,
        #[arg(long, default_value = "standard")]
        dialect: Dialect,
        /// Validate field references against this catalog.
        #[arg(long, requires_all = ["dataset", "api_version"])]
        catalog: Option<PathBuf>,
        #[arg(long)]
        dataset: Option<String>,
        #[arg(long)]
        api_version: Option<String>,
    },
}

fn check(path: &Path) -> Result<JsonValue> {
    let catalog = Catalog::load(path).with_context(|| format!("checking {}", path.display()))?;
    let apis: Vec<JsonValue> = catalog
        .descriptors()
        .iter()
        .map(|d| {
            json!({
                "apiKey": d.api_key,
                "apiVersionNumber": d.api_version_number,
                "apiStatus": d.status(),
                "backendIndexName": d.backend_index_name,
                "fieldCount": d.fields.len(),
            })
        })
        .collect();
    let published = catalog.descriptors().iter().filter(|d| d.published).count();
    Ok(json!({
        "fingerprint": catalog.fingerprint(),
        "datasets": catalog.len(),
        "published": published,
        "apis": apis,
    }))
}

fn translate(
    criteria: &str,
    dialect: Dialect,
    scope: Option<(&Path, &str, &str)>,
) -> Result<JsonValue> {
    let clause = parse(criteria)?;
    if let Some((path, dataset, version)) = scope {
        let catalog = Catalog::load(path)?;
        let Some(descriptor) = catalog.get(dataset, version) else {
            bail!("dataset {dataset}/{version} is not in {}", path.display());
        };
        schema::validate_field_refs(descriptor, &clause)?;
    }
    Ok(json!({
        "ast": clause,
        "dialect": dialect,
        "query": render(&clause, dialect),
    }))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let report = match cli.cmd {
        Cmd::Check { catalog } => check(&catalog)?,
        Cmd::Translate {
            criteria,
            dialect,
            catalog,
            dataset,
            api_version,
        } => {
            let scope = match (&catalog, &dataset, &api_version) {
                (Some(c), Some(d), Some(v)) => Some((c.as_path(), d.as_str(), v.as_str())),
                _ => None,
            };
            translate(&criteria, dialect, scope)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
