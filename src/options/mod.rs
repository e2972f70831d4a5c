//! Viewer options with TOML preset support.
//!
//! This is the explicit settings record handed to the controller: display
//! sizes, highlighting, palette, layout parameters and playback. Options
//! serialize to/from TOML for presets; the JSON schema drives generated
//! settings UIs.

mod colors;
mod display;
mod highlight;
mod playback;

use std::path::Path;

pub use colors::ColorOptions;
pub use display::DisplayOptions;
pub use highlight::HighlightOptions;
pub use playback::PlaybackOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::MovieError;
use crate::layout::LayoutOptions;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[highlight]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Base sizes and opacity.
    pub display: DisplayOptions,
    /// Highlighting and dimming.
    pub highlight: HighlightOptions,
    /// Color palette.
    #[schemars(skip)]
    pub colors: ColorOptions,
    /// Layout calculator parameters.
    pub layout: LayoutOptions,
    /// Timeline and motion.
    pub playback: PlaybackOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Io`] if the file cannot be read, or
    /// [`MovieError::OptionsParse`] on malformed TOML.
    pub fn load(path: &Path) -> Result<Self, MovieError> {
        let content = std::fs::read_to_string(path).map_err(MovieError::Io)?;
        let options = toml::from_str(&content)
            .map_err(|e| MovieError::OptionsParse(e.to_string()))?;
        log::info!("loaded options from {}", path.display());
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::OptionsParse`] if serialization fails, or
    /// [`MovieError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), MovieError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MovieError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(MovieError::Io)?;
        }
        std::fs::write(path, content).map_err(MovieError::Io)?;
        log::info!("saved options to {}", path.display());
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::Easing;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[highlight]
dimming_enabled = true

[playback]
easing = "gentle"
"#;
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert!(opts.highlight.dimming_enabled);
        assert_eq!(opts.playback.easing, Easing::Gentle);
        // Everything else should be default
        assert_eq!(opts.highlight.dimming_opacity, 0.3);
        assert_eq!(opts.display.font_size, 12.0);
        assert_eq!(opts.playback.prefetch_horizon, 4);
    }

    #[test]
    fn interval_scales_with_factor() {
        let mut playback = PlaybackOptions::default();
        assert_eq!(playback.interval_ms(), 1000.0);
        playback.factor = 4.0;
        assert_eq!(playback.interval_ms(), 250.0);
    }

    #[test]
    fn high_contrast_palette() {
        let colors = ColorOptions::default();
        assert_eq!(colors.highlight_pair(false).0, colors.marked);
        assert_eq!(
            colors.highlight_pair(true).1,
            colors.change_edge_high_contrast
        );
    }

    #[test]
    fn save_load_and_list_presets() {
        let dir = std::env::temp_dir()
            .join(format!("phylo-movie-presets-{}", std::process::id()));
        let mut opts = Options::default();
        opts.display.stroke_width = 2.5;
        opts.save(&dir.join("wide.toml")).unwrap();
        let loaded = Options::load(&dir.join("wide.toml")).unwrap();
        assert_eq!(loaded.display.stroke_width, 2.5);
        assert_eq!(Options::list_presets(&dir), vec!["wide".to_owned()]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("display"));
        assert!(props.contains_key("highlight"));
        assert!(props.contains_key("layout"));
        assert!(props.contains_key("playback"));
        assert!(!props.contains_key("colors"));

        let playback = &props["playback"]["properties"];
        assert!(playback.get("factor").is_some());
        assert!(playback.get("prefetch_horizon").is_none());
    }
}
