use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Display", inline)]
#[serde(default)]
/// Base sizes and global opacity.
pub struct DisplayOptions {
    /// Base branch width in pixels.
    #[schemars(title = "Stroke Width")]
    pub stroke_width: f32,
    /// Label pixel height.
    #[schemars(title = "Font Size")]
    pub font_size: f32,
    /// Node radius multiplier.
    #[schemars(title = "Node Size")]
    pub node_size: f32,
    /// Smallest marker radius before scaling.
    #[schemars(title = "Minimum Node Radius")]
    pub min_node_radius: f32,
    /// Alpha multiplier for branches and extensions.
    #[schemars(title = "Link Opacity")]
    pub link_connection_opacity: f32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            stroke_width: 1.0,
            font_size: 12.0,
            node_size: 1.0,
            min_node_radius: 1.0,
            link_connection_opacity: 1.0,
        }
    }
}
