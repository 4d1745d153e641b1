use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::geom::Viewport;

pub const SUPPORTED_FORMAT: &str = "vector";
pub const DEPRECATED_FORMATS: [&str; 3] = ["serde_json", "js", "ir"];

/// Document-space window covering any realistic document.
pub const WHOLE_DOCUMENT: Rect = Rect::new(0.0, 0.0, 1e33, 1e33);

pub fn check_artifact_format(format: &str) -> AppResult<()> {
    if format == SUPPORTED_FORMAT {
        return Ok(());
    }
    if DEPRECATED_FORMATS.contains(&format) {
        return Err(AppError::DeprecatedFormat(format.to_string()));
    }
    Err(AppError::unsupported(format!("artifact format {format}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page_offset: usize,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PagesInfo {
    pages: Vec<PageInfo>,
}

impl PagesInfo {
    pub fn new(pages: Vec<PageInfo>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&PageInfo> {
        self.pages.get(index)
    }

    /// Looks a page up by its one-based page number.
    pub fn page_by_number(&self, number: usize) -> Option<&PageInfo> {
        number.checked_sub(1).and_then(|index| self.page(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageInfo> {
        self.pages.iter()
    }

    pub fn to_vec(&self) -> Vec<PageInfo> {
        self.pages.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateSessionOptions {
    pub format: Option<String>,
    pub artifact_content: Option<Vec<u8>>,
}

impl CreateSessionOptions {
    pub fn vector(artifact_content: Vec<u8>) -> Self {
        Self {
            format: Some(SUPPORTED_FORMAT.to_string()),
            artifact_content: Some(artifact_content),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManipulateAction {
    #[default]
    Reset,
    Merge,
}

impl ManipulateAction {
    pub fn parse(name: &str) -> AppResult<Self> {
        match name {
            "reset" => Ok(Self::Reset),
            "merge" => Ok(Self::Merge),
            other => Err(AppError::invalid_argument(format!(
                "unknown manipulate action {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Merge => "merge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPageOptions {
    pub page_off: usize,
    pub viewport: Option<Viewport>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextItem {
    #[serde(rename = "str")]
    pub text: String,
    #[serde(default = "default_dir")]
    pub dir: String,
    pub width: f64,
    pub height: f64,
    /// Glyph run transform in y-up page points.
    pub transform: [f64; 6],
    #[serde(default)]
    pub font_name: String,
    #[serde(default)]
    pub has_eol: bool,
}

fn default_dir() -> String {
    "ltr".to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBox {
    pub width: f64,
    pub height: f64,
    pub transform: [f64; 6],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLinkAction", into = "RawLinkAction")]
pub enum LinkAction {
    Url { url: String },
    GoTo { x: f64, y: f64, page_ref: usize },
    Other { kind: String },
}

impl LinkAction {
    pub fn kind(&self) -> &str {
        match self {
            Self::Url { .. } => "Url",
            Self::GoTo { .. } => "GoTo",
            Self::Other { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawLinkAction {
    t: String,
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Deserialize)]
struct UrlTarget {
    url: String,
}

#[derive(Deserialize)]
struct GoToTarget {
    x: f64,
    y: f64,
    page_ref: usize,
}

impl From<RawLinkAction> for LinkAction {
    fn from(raw: RawLinkAction) -> Self {
        let decoded = match raw.t.as_str() {
            "Url" => serde_json::from_value::<UrlTarget>(raw.v)
                .ok()
                .map(|target| Self::Url { url: target.url }),
            "GoTo" => serde_json::from_value::<GoToTarget>(raw.v)
                .ok()
                .map(|target| Self::GoTo {
                    x: target.x,
                    y: target.y,
                    page_ref: target.page_ref,
                }),
            _ => None,
        };
        decoded.unwrap_or(Self::Other { kind: raw.t })
    }
}

impl From<LinkAction> for RawLinkAction {
    fn from(action: LinkAction) -> Self {
        match action {
            LinkAction::Url { url } => Self {
                t: "Url".to_string(),
                v: serde_json::json!({ "url": url }),
            },
            LinkAction::GoTo { x, y, page_ref } => Self {
                t: "GoTo".to_string(),
                v: serde_json::json!({ "x": x, "y": y, "page_ref": page_ref }),
            },
            LinkAction::Other { kind } => Self {
                t: kind,
                v: serde_json::Value::Null,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLink {
    pub annotation_box: AnnotationBox,
    pub action: LinkAction,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationList {
    pub links: Vec<AnnotationLink>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageRenderResult {
    pub text_content: TextContent,
    pub annotation_list: AnnotationList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub markup: String,
    pub width: f64,
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::{LinkAction, ManipulateAction, PageInfo, PagesInfo, check_artifact_format};
    use crate::error::AppError;

    #[test]
    fn format_check_names_deprecated_identifier() {
        assert!(check_artifact_format("vector").is_ok());
        for legacy in ["serde_json", "js", "ir"] {
            assert!(matches!(
                check_artifact_format(legacy),
                Err(AppError::DeprecatedFormat(name)) if name == legacy
            ));
        }
        assert!(matches!(
            check_artifact_format("pdf"),
            Err(AppError::Unsupported(_))
        ));
    }

    #[test]
    fn link_action_decodes_known_and_unknown_kinds() {
        let url: LinkAction =
            serde_json::from_str(r#"{"t":"Url","v":{"url":"https://example.com"}}"#)
                .expect("url action should decode");
        assert_eq!(
            url,
            LinkAction::Url {
                url: "https://example.com".to_string()
            }
        );

        let goto: LinkAction =
            serde_json::from_str(r#"{"t":"GoTo","v":{"x":1.5,"y":2.0,"page_ref":3}}"#)
                .expect("goto action should decode");
        assert_eq!(
            goto,
            LinkAction::GoTo {
                x: 1.5,
                y: 2.0,
                page_ref: 3
            }
        );

        let other: LinkAction = serde_json::from_str(r#"{"t":"Launch","v":{"file":"x"}}"#)
            .expect("unknown action should still decode");
        assert_eq!(other.kind(), "Launch");

        let malformed: LinkAction = serde_json::from_str(r#"{"t":"Url","v":{"href":1}}"#)
            .expect("malformed payload falls back");
        assert!(matches!(malformed, LinkAction::Other { .. }));
    }

    #[test]
    fn link_action_serializes_tagged_shape() {
        let value = serde_json::to_value(LinkAction::GoTo {
            x: 0.0,
            y: 10.0,
            page_ref: 2,
        })
        .expect("action should serialize");
        assert_eq!(value["t"], "GoTo");
        assert_eq!(value["v"]["page_ref"], 2);
    }

    #[test]
    fn pages_info_addresses_by_index_and_number() {
        let info = PagesInfo::new(vec![
            PageInfo {
                page_offset: 0,
                width: 600.0,
                height: 800.0,
            },
            PageInfo {
                page_offset: 1,
                width: 400.0,
                height: 400.0,
            },
        ]);
        assert_eq!(info.page_count(), 2);
        assert_eq!(info.page(1).map(|page| page.width), Some(400.0));
        assert_eq!(info.page_by_number(1).map(|page| page.page_offset), Some(0));
        assert!(info.page_by_number(0).is_none());
        assert!(info.page(2).is_none());
    }

    #[test]
    fn manipulate_action_parses_known_names() {
        assert_eq!(
            ManipulateAction::parse("merge").expect("merge"),
            ManipulateAction::Merge
        );
        assert_eq!(ManipulateAction::default().as_str(), "reset");
        assert!(ManipulateAction::parse("patch").is_err());
    }
}
