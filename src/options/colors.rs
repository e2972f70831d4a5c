use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Color palette. Colors are RGBA bytes; taxa colors are CSS strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorOptions {
    /// Branch color for taxa without an assigned color.
    pub default_branch: [u8; 4],
    /// Node fill for taxa without an assigned color.
    pub default_node: [u8; 4],
    /// Border of non-highlighted nodes.
    pub neutral_border: [u8; 4],
    /// Jumping-subtree highlight (emerald).
    pub marked: [u8; 4],
    /// Active change-edge highlight (blue).
    pub change_edge: [u8; 4],
    /// Upcoming change-edge dots.
    pub upcoming: [u8; 4],
    /// High-contrast jumping-subtree highlight.
    pub marked_high_contrast: [u8; 4],
    /// High-contrast change-edge highlight.
    pub change_edge_high_contrast: [u8; 4],
    /// Hover highlight; distinct from both data highlights.
    pub hover: [u8; 4],
    /// Label text for taxa without an assigned color.
    pub label: [u8; 4],
    /// Leaf name to CSS color (`#rrggbb`, `rgb(…)`, named).
    pub taxa_colors: HashMap<String, String>,
}

impl Default for ColorOptions {
    fn default() -> Self {
        Self {
            default_branch: [90, 90, 90, 255],
            default_node: [110, 110, 110, 255],
            neutral_border: [40, 40, 40, 255],
            marked: [16, 185, 129, 255],
            change_edge: [37, 99, 235, 255],
            upcoming: [96, 165, 250, 255],
            marked_high_contrast: [0, 230, 118, 255],
            change_edge_high_contrast: [0, 60, 255, 255],
            hover: [0, 200, 220, 150],
            label: [30, 30, 30, 255],
            taxa_colors: HashMap::new(),
        }
    }
}

impl ColorOptions {
    /// Highlight colors `(marked, change_edge)` for the chosen contrast.
    #[must_use]
    pub fn highlight_pair(&self, high_contrast: bool) -> ([u8; 4], [u8; 4]) {
        if high_contrast {
            (self.marked_high_contrast, self.change_edge_high_contrast)
        } else {
            (self.marked, self.change_edge)
        }
    }
}
