//! Shopping list pipeline.
//!
//! Cart ingredient rows go in, a downloadable document comes out:
//!
//! 1. [`aggregate`] merges rows sharing `(name, unit)` and sorts them.
//! 2. [`ReportWriter`] lays the merged lines out on fixed-size pages.
//! 3. [`pdf::encode`] turns the laid-out pages into PDF bytes.

pub mod aggregate;
pub mod layout;
pub mod pdf;

pub use aggregate::{AggregatedLine, IngredientRow, aggregate};
pub use layout::{LayoutError, Page, PageGeometry, PlacedLine, ReportWriter, WriterState, layout};

/// Aggregate, lay out and encode an A4 shopping list.
pub fn render_shopping_list<I>(rows: I) -> Result<Vec<u8>, LayoutError>
where
    I: IntoIterator<Item = IngredientRow>,
{
    let lines = aggregate(rows);
    let pages = layout(&lines, PageGeometry::A4)?;
    Ok(pdf::encode(&pages, &PageGeometry::A4))
}
