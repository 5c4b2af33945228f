//! Load the ingredient catalog from a headerless `name,measurement_unit` CSV.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use larder_infra::{CatalogStore, PostgresStore, parse_ingredients_csv};

#[derive(Debug, Parser)]
#[command(name = "larder-import", about = "Import ingredients into the larder catalog")]
struct Args {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// CSV file with `name,measurement_unit` rows.
    #[arg(long)]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    larder_observability::init();
    let args = Args::parse();

    let file = File::open(&args.file).with_context(|| format!("cannot open {}", args.file.display()))?;
    let rows = parse_ingredients_csv(file).with_context(|| format!("cannot parse {}", args.file.display()))?;

    let store = PostgresStore::connect(&args.database_url).await?;
    store.migrate().await?;
    let summary = store.import_ingredients(rows).await?;

    tracing::info!(
        file = %args.file.display(),
        created = summary.created,
        existing = summary.existing,
        "ingredient import finished"
    );
    Ok(())
}
