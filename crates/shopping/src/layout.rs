//! Page layout for the shopping list.
//!
//! [`ReportWriter`] is a small state machine with a vertical cursor:
//!
//! ```text
//! NewDocument -> WritingTitle -> WritingLines (-> page break -> WritingLines)* -> Finalized
//! ```
//!
//! Coordinates are PDF points with the origin at the bottom-left corner, so
//! the cursor moves downwards by decreasing `y`. Page breaks are lazy: a new
//! page is opened only when another line has to be placed and the current
//! page is full, so the output never ends with an empty page.

use serde::Serialize;
use thiserror::Error;

use crate::aggregate::AggregatedLine;

pub const TITLE: &str = "Shopping list";

/// Fixed page geometry, in points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: i32,
    pub height: i32,
    pub title_x: i32,
    pub title_y: i32,
    pub title_size: i32,
    pub text_x: i32,
    /// Baseline of the first body line on page 1 (below the title).
    pub first_line_y: i32,
    /// Baseline of the first body line on every later page.
    pub top_y: i32,
    pub line_height: i32,
    /// A page is full once the cursor is at or below this baseline.
    pub bottom_y: i32,
    pub font_size: i32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        width: 595,
        height: 842,
        title_x: 200,
        title_y: 800,
        title_size: 18,
        text_x: 50,
        first_line_y: 750,
        top_y: 800,
        line_height: 20,
        bottom_y: 50,
        font_size: 12,
    };

    /// Number of body lines that fit on a page whose first baseline is `start_y`.
    fn capacity_from(&self, start_y: i32) -> usize {
        if start_y <= self.bottom_y || self.line_height <= 0 {
            return 0;
        }
        let span = start_y - self.bottom_y;
        ((span + self.line_height - 1) / self.line_height) as usize
    }

    pub fn first_page_capacity(&self) -> usize {
        self.capacity_from(self.first_line_y)
    }

    pub fn page_capacity(&self) -> usize {
        self.capacity_from(self.top_y)
    }
}

/// A piece of text at a fixed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based.
    pub number: u32,
    pub title: Option<PlacedLine>,
    pub lines: Vec<PlacedLine>,
}

impl Page {
    fn new(number: u32) -> Self {
        Self {
            number,
            title: None,
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum WriterState {
    NewDocument,
    WritingTitle,
    WritingLines,
    Finalized,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: WriterState,
    },
}

#[derive(Debug)]
pub struct ReportWriter {
    geometry: PageGeometry,
    state: WriterState,
    finished: Vec<Page>,
    current: Option<Page>,
    cursor: i32,
}

impl ReportWriter {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            state: WriterState::NewDocument,
            finished: Vec::new(),
            current: None,
            cursor: geometry.first_line_y,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Open page 1 and place the title on it.
    pub fn write_title(&mut self, title: &str) -> Result<(), LayoutError> {
        if self.state != WriterState::NewDocument {
            return Err(self.invalid("write the title"));
        }
        let mut page = Page::new(1);
        page.title = Some(PlacedLine {
            text: title.to_string(),
            x: self.geometry.title_x,
            y: self.geometry.title_y,
            size: self.geometry.title_size,
        });
        self.current = Some(page);
        self.cursor = self.geometry.first_line_y;
        self.state = WriterState::WritingTitle;
        Ok(())
    }

    /// Place one body line, breaking to a new page first if the current one is full.
    pub fn write_line(&mut self, text: &str) -> Result<(), LayoutError> {
        match self.state {
            WriterState::WritingTitle | WriterState::WritingLines => {}
            _ => return Err(self.invalid("write a line")),
        }
        if self.cursor <= self.geometry.bottom_y {
            self.page_break();
        }
        let line = PlacedLine {
            text: text.to_string(),
            x: self.geometry.text_x,
            y: self.cursor,
            size: self.geometry.font_size,
        };
        if let Some(page) = self.current.as_mut() {
            page.lines.push(line);
        }
        self.cursor -= self.geometry.line_height;
        self.state = WriterState::WritingLines;
        Ok(())
    }

    /// Flush the current page and return every page written.
    pub fn finish(mut self) -> Result<Vec<Page>, LayoutError> {
        match self.state {
            WriterState::WritingTitle | WriterState::WritingLines => {}
            _ => return Err(self.invalid("finish")),
        }
        if let Some(page) = self.current.take() {
            self.finished.push(page);
        }
        self.state = WriterState::Finalized;
        tracing::debug!(pages = self.finished.len(), "shopping list laid out");
        Ok(self.finished)
    }

    fn page_break(&mut self) {
        let next_number = match self.current.take() {
            Some(page) => {
                let number = page.number + 1;
                self.finished.push(page);
                number
            }
            None => 1,
        };
        self.current = Some(Page::new(next_number));
        self.cursor = self.geometry.top_y;
    }

    fn invalid(&self, operation: &'static str) -> LayoutError {
        LayoutError::InvalidState {
            operation,
            state: self.state,
        }
    }
}

/// Lay out the titled report with continuous 1-based numbering.
pub fn layout(lines: &[AggregatedLine], geometry: PageGeometry) -> Result<Vec<Page>, LayoutError> {
    let mut writer = ReportWriter::new(geometry);
    writer.write_title(TITLE)?;
    for (i, line) in lines.iter().enumerate() {
        writer.write_line(&line.report_text(i + 1))?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(n: usize) -> Vec<AggregatedLine> {
        (0..n)
            .map(|i| AggregatedLine {
                ingredient_name: format!("Item {i:03}"),
                measurement_unit: "g".to_string(),
                total_amount: (i as u64) + 1,
            })
            .collect()
    }

    /// 37 lines per page on every page: baselines 790, 770, ..., 70.
    const UNIFORM_37: PageGeometry = PageGeometry {
        first_line_y: 790,
        top_y: 790,
        ..PageGeometry::A4
    };

    #[test]
    fn a4_capacities() {
        assert_eq!(PageGeometry::A4.first_page_capacity(), 35);
        assert_eq!(PageGeometry::A4.page_capacity(), 38);
        assert_eq!(UNIFORM_37.page_capacity(), 37);
    }

    #[test]
    fn empty_report_is_one_titled_page() {
        let pages = layout(&[], PageGeometry::A4).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title.as_ref().map(|t| t.text.as_str()), Some(TITLE));
        assert!(pages[0].lines.is_empty());
    }

    #[test]
    fn sixty_lines_with_capacity_37_make_two_pages() {
        let pages = layout(&lines(60), UNIFORM_37).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 37);
        assert_eq!(pages[1].lines.len(), 23);
        assert!(pages[0].title.is_some());
        assert!(pages[1].title.is_none());
        assert!(pages[1].lines[0].text.starts_with("38. "));
        assert!(pages[1].lines[22].text.starts_with("60. "));
    }

    #[test]
    fn later_pages_start_at_top_margin() {
        let pages = layout(&lines(36), PageGeometry::A4).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines[0].y, 750);
        assert_eq!(pages[0].lines[34].y, 70);
        assert_eq!(pages[1].lines[0].y, 800);
        assert_eq!(pages[1].number, 2);
    }

    #[test]
    fn exactly_full_page_has_no_trailing_blank_page() {
        let pages = layout(&lines(35), PageGeometry::A4).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.len(), 35);
    }

    #[test]
    fn writer_rejects_out_of_order_calls() {
        let mut writer = ReportWriter::new(PageGeometry::A4);
        assert!(writer.write_line("1. Salt: 5 g.").is_err());
        writer.write_title(TITLE).unwrap();
        assert_eq!(writer.state(), WriterState::WritingTitle);
        assert!(writer.write_title(TITLE).is_err());
        writer.write_line("1. Salt: 5 g.").unwrap();
        assert_eq!(writer.state(), WriterState::WritingLines);
        assert_eq!(writer.finish().unwrap().len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        #[test]
        fn numbering_is_continuous_and_pages_are_minimal(n in 0usize..200) {
            let geometry = PageGeometry::A4;
            let pages = layout(&lines(n), geometry).unwrap();

            let first = geometry.first_page_capacity();
            let rest = geometry.page_capacity();
            let expected_pages = if n <= first { 1 } else { 1 + (n - first).div_ceil(rest) };
            prop_assert_eq!(pages.len(), expected_pages);

            let texts: Vec<&str> = pages.iter().flat_map(|p| p.lines.iter()).map(|l| l.text.as_str()).collect();
            prop_assert_eq!(texts.len(), n);
            for (i, text) in texts.iter().enumerate() {
                let prefix = format!("{}. ", i + 1);
                prop_assert!(text.starts_with(&prefix));
            }
            prop_assert!(pages.iter().skip(1).all(|p| p.title.is_none() && !p.lines.is_empty()));
            prop_assert!(pages.iter().flat_map(|p| p.lines.iter()).all(|l| l.y > geometry.bottom_y));
        }
    }
}
