//! Ingredient catalog import from CSV.
//!
//! The file has no header row; every record is `name,measurement_unit`.
//! Fields are trimmed, blank records are skipped, extra columns are ignored.

use std::io::Read;

use thiserror::Error;

use larder_core::DomainError;
use larder_recipes::NewIngredient;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("line {line}: expected `name,measurement_unit`, found {found} column(s)")]
    MissingColumn { line: u64, found: usize },

    #[error("line {line}: {source}")]
    Invalid {
        line: u64,
        #[source]
        source: DomainError,
    },

    #[error("csv read error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn parse_ingredients_csv<R: Read>(reader: R) -> Result<Vec<NewIngredient>, ImportError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.iter().all(str::is_empty) {
            continue;
        }
        let (Some(name), Some(unit)) = (record.get(0), record.get(1)) else {
            return Err(ImportError::MissingColumn {
                line,
                found: record.len(),
            });
        };
        let ingredient =
            NewIngredient::new(name, unit).map_err(|source| ImportError::Invalid { line, source })?;
        rows.push(ingredient);
    }
    tracing::debug!(rows = rows.len(), "parsed ingredient csv");
    Ok(rows)
}
