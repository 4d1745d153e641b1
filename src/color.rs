use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};

pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-f]{6}$").expect("hex color pattern should compile"));

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

pub fn validate_background_color(value: &str) -> AppResult<()> {
    if is_hex_color(value) {
        Ok(())
    } else {
        Err(AppError::InvalidBackgroundColor(value.to_string()))
    }
}

/// Parses `#rrggbb` into opaque RGBA.
pub fn parse_hex_color(value: &str) -> AppResult<[u8; 4]> {
    validate_background_color(value)?;
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&value[range], 16)
            .map_err(|_| AppError::InvalidBackgroundColor(value.to_string()))
    };
    Ok([channel(1..3)?, channel(3..5)?, channel(5..7)?, 255])
}
