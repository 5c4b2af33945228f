//! PDF encoding of laid-out pages.
//!
//! Uses the standard Helvetica Type 1 font with WinAnsi encoding, so no font
//! program is embedded. Characters outside Latin-1 are written as `?`.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

use crate::layout::{Page, PageGeometry, PlacedLine};

const FONT_NAME: Name<'static> = Name(b"F1");

/// Encode pages into a complete PDF document.
pub fn encode(pages: &[Page], geometry: &PageGeometry) -> Vec<u8> {
    let mut next_id = 1;
    let mut alloc = || {
        let id = Ref::new(next_id);
        next_id += 1;
        id
    };

    let catalog_id = alloc();
    let page_tree_id = alloc();
    let font_id = alloc();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc(), alloc())).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().map(|(page_id, _)| *page_id))
        .count(page_ids.len() as i32);
    pdf.type1_font(font_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    let media_box = Rect::new(0.0, 0.0, geometry.width as f32, geometry.height as f32);
    for (page, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        let mut page_obj = pdf.page(*page_id);
        page_obj
            .media_box(media_box)
            .parent(page_tree_id)
            .contents(*content_id);
        page_obj.resources().fonts().pair(FONT_NAME, font_id);
        page_obj.finish();

        let mut content = Content::new();
        for placed in page.title.iter().chain(page.lines.iter()) {
            show_text(&mut content, placed);
        }
        pdf.stream(*content_id, &content.finish());
    }

    pdf.finish()
}

fn show_text(content: &mut Content, placed: &PlacedLine) {
    let bytes = to_latin1(&placed.text);
    content.begin_text();
    content.set_font(FONT_NAME, placed.size as f32);
    content.next_line(placed.x as f32, placed.y as f32);
    content.show(Str(&bytes));
    content.end_text();
}

/// WinAnsi agrees with Latin-1 on every printable Latin-1 code point.
fn to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(b) if b >= 0x20 && !(0x7f..0xa0).contains(&b) => b,
            _ => b'?',
        })
        .collect()
}
