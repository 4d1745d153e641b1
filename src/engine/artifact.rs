use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::payload::{
    AnnotationBox, AnnotationLink, AnnotationList, LinkAction, PageInfo, PagesInfo, TextContent,
    TextItem,
};

/// Average advance of a glyph relative to its font size, used to size text runs.
const GLYPH_ADVANCE_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorDocument {
    #[serde(default)]
    pub pages: Vec<VectorPage>,
    #[serde(default)]
    pub sources: Vec<SourceMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPage {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub items: Vec<VectorItem>,
    #[serde(default)]
    pub links: Vec<VectorLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VectorItem {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
    },
    Text {
        x: f64,
        /// Baseline, measured down from the top of the page.
        y: f64,
        size: f64,
        content: String,
        #[serde(default)]
        fill: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLink {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub action: LinkAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub path: Vec<u32>,
    pub location: String,
}

/// Partial update applied by a `merge` manipulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactDelta {
    #[serde(default)]
    pub pages: Vec<PageUpdate>,
    #[serde(default)]
    pub page_count: Option<usize>,
    #[serde(default)]
    pub sources: Vec<SourceMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUpdate {
    pub index: usize,
    pub page: VectorPage,
}

impl VectorDocument {
    /// An empty payload decodes to an empty document.
    pub fn decode(bytes: &[u8]) -> AppResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let document: Self = serde_json::from_slice(bytes)?;
        document.validate()?;
        Ok(document)
    }

    pub fn encode(&self) -> AppResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn pages_info(&self) -> PagesInfo {
        PagesInfo::new(
            self.pages
                .iter()
                .enumerate()
                .map(|(page_offset, page)| PageInfo {
                    page_offset,
                    width: page.width,
                    height: page.height,
                })
                .collect(),
        )
    }

    pub fn source_span(&self, path: &[u32]) -> Option<String> {
        self.sources
            .iter()
            .rev()
            .find(|mapping| mapping.path == path)
            .map(|mapping| mapping.location.clone())
    }

    pub fn apply_delta(&mut self, delta: ArtifactDelta) -> AppResult<()> {
        let mut pages = self.pages.clone();
        for update in delta.pages {
            update.page.validate(update.index)?;
            match update.index.cmp(&pages.len()) {
                std::cmp::Ordering::Less => pages[update.index] = update.page,
                std::cmp::Ordering::Equal => pages.push(update.page),
                std::cmp::Ordering::Greater => {
                    return Err(AppError::invalid_argument(format!(
                        "delta page {} is past the end of a {}-page document",
                        update.index,
                        pages.len()
                    )));
                }
            }
        }
        if let Some(page_count) = delta.page_count {
            if page_count > pages.len() {
                return Err(AppError::invalid_argument(format!(
                    "delta page count {page_count} exceeds {} known pages",
                    pages.len()
                )));
            }
            pages.truncate(page_count);
        }

        self.pages = pages;
        self.sources.extend(delta.sources);
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        self.pages
            .iter()
            .enumerate()
            .try_for_each(|(index, page)| page.validate(index))
    }
}

impl ArtifactDelta {
    pub fn decode(bytes: &[u8]) -> AppResult<Option<Self>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(bytes)?))
    }
}

impl VectorPage {
    fn validate(&self, index: usize) -> AppResult<()> {
        let valid = |value: f64| value.is_finite() && value > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(AppError::invalid_argument(format!(
                "page {index} has invalid dimensions {}x{}",
                self.width, self.height
            )))
        }
    }

    pub fn text_content(&self) -> TextContent {
        let items = self
            .items
            .iter()
            .filter_map(|item| match item {
                VectorItem::Text {
                    x,
                    y,
                    size,
                    content,
                    ..
                } => Some(TextItem {
                    text: content.clone(),
                    dir: "ltr".to_string(),
                    width: content.chars().count() as f64 * size * GLYPH_ADVANCE_RATIO,
                    height: *size,
                    transform: [*size, 0.0, 0.0, *size, *x, self.height - *y],
                    font_name: "sans-serif".to_string(),
                    has_eol: false,
                }),
                VectorItem::Rect { .. } => None,
            })
            .collect();
        TextContent { items }
    }

    pub fn annotation_list(&self) -> AnnotationList {
        AnnotationList {
            links: self
                .links
                .iter()
                .map(|link| AnnotationLink {
                    annotation_box: AnnotationBox {
                        width: link.width,
                        height: link.height,
                        transform: [1.0, 0.0, 0.0, 1.0, link.x, link.y],
                    },
                    action: link.action.clone(),
                })
                .collect(),
        }
    }
}
