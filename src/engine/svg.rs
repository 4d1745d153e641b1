use std::fmt::Write;

use kurbo::Rect;

use crate::dom::escape_html;

use super::artifact::{VectorDocument, VectorItem, VectorPage};
use super::payload::SvgDocument;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

pub(crate) fn render_document(document: &VectorDocument, background: &str) -> SvgDocument {
    let width = document
        .pages
        .iter()
        .map(|page| page.width)
        .fold(0.0, f64::max);
    let height = document.pages.iter().map(|page| page.height).sum::<f64>();

    let mut markup = String::new();
    let _ = write!(
        markup,
        "<svg xmlns=\"{SVG_NS}\" class=\"typst-doc\" viewBox=\"0 0 {width} {height}\" width=\"{width}\" height=\"{height}\" data-width=\"{width}\" data-height=\"{height}\">"
    );
    let mut top = 0.0;
    for (index, page) in document.pages.iter().enumerate() {
        write_page(&mut markup, index, page, top, background);
        top += page.height;
    }
    markup.push_str("</svg>");

    SvgDocument {
        markup,
        width,
        height,
    }
}

/// Output of [`render_diff`]: the fragment plus the page indices whose full
/// content it carries.
#[derive(Debug, Default)]
pub(crate) struct PageDiff {
    pub fragment: String,
    pub sent: Vec<usize>,
}

/// Serializes pages intersecting `window`. Pages identical to the entry at the
/// same index in `previous` are emitted as reuse placeholders. `None` entries
/// mark pages the receiver has never been sent.
pub(crate) fn render_diff(
    document: &VectorDocument,
    previous: &[Option<VectorPage>],
    window: Rect,
    background: &str,
) -> PageDiff {
    let mut diff = PageDiff::default();
    let mut top = 0.0;
    for (index, page) in document.pages.iter().enumerate() {
        let bounds = Rect::new(0.0, top, page.width, top + page.height);
        if overlaps(bounds, window) {
            let unchanged = previous
                .get(index)
                .and_then(Option::as_ref)
                .is_some_and(|old| old == page);
            if unchanged {
                let _ = write!(
                    diff.fragment,
                    "<g class=\"typst-page\" data-page=\"{index}\" data-reuse-from=\"{index}\" transform=\"translate(0, {top})\"/>"
                );
            } else {
                write_page(&mut diff.fragment, index, page, top, background);
                diff.sent.push(index);
            }
        }
        top += page.height;
    }
    diff
}

fn overlaps(page: Rect, window: Rect) -> bool {
    let window = window.abs();
    page.x0 <= window.x1 && window.x0 <= page.x1 && page.y0 <= window.y1 && window.y0 <= page.y1
}

fn write_page(out: &mut String, index: usize, page: &VectorPage, top: f64, background: &str) {
    let _ = write!(
        out,
        "<g class=\"typst-page\" data-page=\"{index}\" data-page-width=\"{}\" data-page-height=\"{}\" transform=\"translate(0, {top})\">",
        page.width, page.height
    );
    let _ = write!(
        out,
        "<rect width=\"{}\" height=\"{}\" fill=\"{background}\"/>",
        page.width, page.height
    );
    for item in &page.items {
        match item {
            VectorItem::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                let _ = write!(
                    out,
                    "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"{}\"/>",
                    escape_html(fill)
                );
            }
            VectorItem::Text {
                x,
                y,
                size,
                content,
                fill,
            } => {
                let _ = write!(
                    out,
                    "<text x=\"{x}\" y=\"{y}\" font-size=\"{size}\" fill=\"{}\">{}</text>",
                    escape_html(fill.as_deref().unwrap_or("#000000")),
                    escape_html(content)
                );
            }
        }
    }
    out.push_str("</g>");
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::{render_diff, render_document};
    use crate::engine::WHOLE_DOCUMENT;
    use crate::engine::artifact::{VectorDocument, VectorItem, VectorPage};

    fn document() -> VectorDocument {
        VectorDocument {
            pages: vec![
                VectorPage {
                    width: 600.0,
                    height: 800.0,
                    items: vec![VectorItem::Text {
                        x: 10.0,
                        y: 20.0,
                        size: 12.0,
                        content: "a & b".to_string(),
                        fill: None,
                    }],
                    links: Vec::new(),
                },
                VectorPage {
                    width: 400.0,
                    height: 400.0,
                    items: Vec::new(),
                    links: Vec::new(),
                },
            ],
            sources: Vec::new(),
        }
    }

    #[test]
    fn whole_document_stacks_pages() {
        let svg = render_document(&document(), "#ffffff");
        assert_eq!(svg.width, 600.0);
        assert_eq!(svg.height, 1200.0);
        assert!(svg.markup.starts_with("<svg"));
        assert!(svg.markup.contains("translate(0, 800)"));
        assert!(svg.markup.contains("a &amp; b"));
        assert!(svg.markup.ends_with("</svg>"));
    }

    #[test]
    fn diff_limits_to_window_and_reuses_unchanged_pages() {
        let doc = document();

        let first = render_diff(&doc, &[], Rect::new(0.0, 900.0, 100.0, 1000.0), "#ffffff");
        assert!(first.fragment.contains("data-page=\"1\""));
        assert!(!first.fragment.contains("data-page=\"0\""));
        assert_eq!(first.sent, vec![1]);

        let snapshot: Vec<_> = doc.pages.iter().cloned().map(Some).collect();
        let again = render_diff(&doc, &snapshot, WHOLE_DOCUMENT, "#ffffff");
        assert_eq!(again.fragment.matches("data-reuse-from").count(), 2);
        assert!(again.sent.is_empty());
    }

    #[test]
    fn diff_resends_pages_missing_from_the_snapshot() {
        let doc = document();
        let snapshot = vec![Some(doc.pages[0].clone()), None];

        let diff = render_diff(&doc, &snapshot, WHOLE_DOCUMENT, "#ffffff");
        assert!(diff.fragment.contains("data-reuse-from=\"0\""));
        assert!(diff.fragment.contains("data-page-height=\"400\""));
        assert_eq!(diff.sent, vec![1]);
    }
}
