use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, RgbaImage};

use crate::dom::{CanvasSurface, MemoryDom, NodeId, escape_html};
use crate::error::{AppError, AppResult};

const PAGE_STYLE: &str = "\
.text-layer{position:absolute;inset:0;overflow:hidden;line-height:1;}\
.text-layer span{position:absolute;white-space:pre;color:transparent;transform-origin:0% 0%;}\
.typst-annotation{position:absolute;}\
";

pub fn canvas_png(surface: &CanvasSurface) -> AppResult<Vec<u8>> {
    let image = RgbaImage::from_raw(surface.width(), surface.height(), surface.pixels().to_vec())
        .ok_or_else(|| AppError::invalid_argument("canvas buffer does not match its size"))?;
    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|err| AppError::engine("png encode", err))?;
    Ok(output)
}

pub fn canvas_data_uri(surface: &CanvasSurface) -> AppResult<String> {
    let bytes = canvas_png(surface)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(bytes)))
}

/// Standalone HTML page for `node`; canvases become inline PNG images.
pub fn export_html(dom: &MemoryDom, node: NodeId, title: &str) -> AppResult<String> {
    let mut failure = None;
    let body = dom.to_html_with(node, &mut |surface: &CanvasSurface| {
        match canvas_data_uri(surface) {
            Ok(uri) => Some(uri),
            Err(err) => {
                failure.get_or_insert(err);
                None
            }
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }

    let mut html = String::with_capacity(body.len() + 256);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{PAGE_STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    );
    Ok(html)
}

/// Writes every canvas below `scope` as `page-<n>.png` into `dir`.
pub fn write_canvas_pngs(
    dom: &MemoryDom,
    scope: NodeId,
    dir: impl AsRef<Path>,
) -> AppResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| {
        AppError::io_with_context(source, format!("failed to create {}", dir.display()))
    })?;

    let mut written = Vec::new();
    for (index, canvas) in dom.find_by_tag(scope, "canvas").into_iter().enumerate() {
        let Some(surface) = dom.canvas(canvas) else {
            continue;
        };
        let path = dir.join(format!("page-{index}.png"));
        let bytes = canvas_png(surface)?;
        fs::write(&path, bytes).map_err(|source| {
            AppError::io_with_context(source, format!("failed to write {}", path.display()))
        })?;
        log::debug!(
            "wrote {} ({}x{})",
            path.display(),
            surface.width(),
            surface.height()
        );
        written.push(path);
    }
    Ok(written)
}
