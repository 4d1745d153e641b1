use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::color::{DEFAULT_BACKGROUND_COLOR, is_hex_color};
use crate::engine::DEFAULT_SESSION_PIXEL_PER_PT;
use crate::error::{AppError, AppResult};
use crate::render::DEFAULT_LAYOUT_PIXEL_PER_PT;

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub artifact: ArtifactConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Session raster density applied when a render call supplies none.
    pub pixel_per_pt: f64,
    /// Device density of the canvases built by the layout manager.
    pub layout_pixel_per_pt: f64,
    pub background_color: String,
    pub text_scale_decimals: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixel_per_pt: DEFAULT_SESSION_PIXEL_PER_PT,
            layout_pixel_per_pt: DEFAULT_LAYOUT_PIXEL_PER_PT,
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            text_scale_decimals: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactConfig {
    pub root: PathBuf,
    pub default_theme: String,
    pub cache_entries: usize,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            default_theme: "light".to_string(),
            cache_entries: 8,
        }
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    /// A missing file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        match fs::metadata(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(AppError::io_with_context(
                    source,
                    format!("cannot stat config {}", path.display()),
                ));
            }
            Ok(meta) if !meta.is_file() => {
                return Err(AppError::invalid_argument(format!(
                    "config {} is not a file",
                    path.display()
                )));
            }
            Ok(_) => {}
        }

        let text = fs::read_to_string(path).map_err(|source| {
            AppError::io_with_context(source, format!("cannot read config {}", path.display()))
        })?;
        let config: Self = toml::from_str(&text).map_err(|err| {
            AppError::invalid_argument(format!("bad config {}: {err}", path.display()))
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        let defaults = RenderConfig::default();
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(self.render.pixel_per_pt) {
            log::warn!(
                "config pixel_per_pt {} is not positive, using {}",
                self.render.pixel_per_pt,
                defaults.pixel_per_pt
            );
            self.render.pixel_per_pt = defaults.pixel_per_pt;
        }
        if !positive(self.render.layout_pixel_per_pt) {
            self.render.layout_pixel_per_pt = defaults.layout_pixel_per_pt;
        }
        if !is_hex_color(&self.render.background_color) {
            log::warn!(
                "config background_color {:?} is not #rrggbb, using {}",
                self.render.background_color,
                defaults.background_color
            );
            self.render.background_color = defaults.background_color;
        }
        self.render.text_scale_decimals = self.render.text_scale_decimals.min(10);

        self.artifact.cache_entries = self.artifact.cache_entries.max(1);
        if self.artifact.default_theme.trim().is_empty() {
            self.artifact.default_theme = ArtifactConfig::default().default_theme;
        }
        self
    }
}

const CONFIG_DIR: &str = "pgc";
const CONFIG_FILE: &str = "config.toml";

/// First non-empty of `PGC_CONFIG_PATH`, `$XDG_CONFIG_HOME/pgc`, `$HOME/.config/pgc`
/// and `%APPDATA%/pgc`.
pub fn default_config_path() -> Option<PathBuf> {
    let env_dir = |name: &str| std::env::var_os(name).filter(|value| !value.is_empty());

    if let Some(explicit) = env_dir("PGC_CONFIG_PATH") {
        return Some(PathBuf::from(explicit));
    }
    env_dir("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env_dir("HOME").map(|home| PathBuf::from(home).join(".config")))
        .or_else(|| env_dir("APPDATA").map(PathBuf::from))
        .map(|base| base.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::Config;

    fn unique_temp_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("pgc_config_{suffix}_{}_{}", process::id(), nanos));
        path
    }

    #[test]
    fn load_from_path_returns_defaults_for_missing_file() {
        let missing = unique_temp_path("missing.toml");
        let config = Config::load_from_path(&missing).expect("missing config should fallback");
        assert_eq!(config, Config::default());
        assert_eq!(config.render.pixel_per_pt, 3.0);
        assert_eq!(config.render.layout_pixel_per_pt, 2.0);
        assert_eq!(config.artifact.default_theme, "light");
    }

    #[test]
    fn load_from_path_applies_partial_overrides_and_sanitizes() {
        let path = unique_temp_path("custom.toml");
        fs::write(
            &path,
            r#"
            [render]
            pixel_per_pt = -1.0
            layout_pixel_per_pt = 0.0
            background_color = "red"
            text_scale_decimals = 40

            [artifact]
            root = "/srv/book"
            cache_entries = 0
            "#,
        )
        .expect("config file should be written");

        let config = Config::load_from_path(&path).expect("config should parse");
        assert_eq!(config.render.pixel_per_pt, 3.0);
        assert_eq!(config.render.layout_pixel_per_pt, 2.0);
        assert_eq!(config.render.background_color, "#ffffff");
        assert_eq!(config.render.text_scale_decimals, 10);
        assert_eq!(config.artifact.root, PathBuf::from("/srv/book"));
        assert_eq!(config.artifact.cache_entries, 1);
        assert_eq!(config.artifact.default_theme, "light");

        fs::remove_file(&path).expect("config file should be removed");
    }

    #[test]
    fn load_from_path_rejects_malformed_toml() {
        let path = unique_temp_path("broken.toml");
        fs::write(&path, "[render\npixel_per_pt = ").expect("config file should be written");

        assert!(Config::load_from_path(&path).is_err());

        fs::remove_file(&path).expect("config file should be removed");
    }
}
