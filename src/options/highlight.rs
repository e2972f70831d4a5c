use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Highlighting, dimming and pulse settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Highlighting", inline)]
#[serde(default)]
pub struct HighlightOptions {
    /// Dim everything not downstream of an active change edge.
    #[schemars(title = "Dim Unchanged Branches")]
    pub dimming_enabled: bool,
    /// Alpha multiplier for change-edge dimming.
    #[schemars(title = "Dimming Opacity")]
    pub dimming_opacity: f32,
    /// Dim everything outside the marked subtrees.
    #[schemars(title = "Dim Outside Marked Subtrees")]
    pub subtree_dimming_enabled: bool,
    /// Alpha multiplier for subtree dimming.
    #[schemars(title = "Subtree Dimming Opacity")]
    pub subtree_dimming_opacity: f32,
    /// Color jumping subtrees.
    #[schemars(title = "Mark Jumping Subtrees")]
    pub marked_subtrees_enabled: bool,
    /// Dash the active change edge.
    #[schemars(title = "Dash Active Edge")]
    pub dashing_enabled: bool,
    /// Dot the next transition's change edges.
    #[schemars(title = "Show Upcoming Changes")]
    pub upcoming_changes_enabled: bool,
    /// Use the high-contrast highlight palette.
    #[schemars(title = "High Contrast")]
    pub high_contrast_highlighting_enabled: bool,
    /// Pulse change-edge alpha.
    #[schemars(title = "Pulse")]
    pub pulse_enabled: bool,
    /// Full pulse cycle in milliseconds.
    #[schemars(title = "Pulse Period (ms)")]
    pub pulse_period_ms: f32,
    /// Lowest pulse alpha multiplier.
    #[schemars(title = "Pulse Minimum")]
    pub pulse_min_opacity: f32,
    /// Earlier transitions whose jumping subtrees count as history.
    #[schemars(title = "History Depth")]
    pub history_depth: usize,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            dimming_enabled: false,
            dimming_opacity: 0.3,
            subtree_dimming_enabled: false,
            subtree_dimming_opacity: 0.3,
            marked_subtrees_enabled: true,
            dashing_enabled: true,
            upcoming_changes_enabled: false,
            high_contrast_highlighting_enabled: false,
            pulse_enabled: true,
            pulse_period_ms: 1200.0,
            pulse_min_opacity: 0.55,
            history_depth: 3,
        }
    }
}

impl HighlightOptions {
    /// Pulse alpha multiplier at `elapsed_ms` (cosine wave between
    /// `pulse_min_opacity` and 1). Constant 1 when pulsing is off.
    pub fn pulse_opacity(&self, elapsed_ms: f64) -> f32 {
        if !self.pulse_enabled || self.pulse_period_ms <= 0.0 {
            return 1.0;
        }
        let phase = (elapsed_ms / f64::from(self.pulse_period_ms)).fract();
        let wave = 0.5 + 0.5 * (phase * std::f64::consts::TAU).cos();
        let min = self.pulse_min_opacity.clamp(0.0, 1.0);
        min + (1.0 - min) * wave as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_spans_min_to_one() {
        let opts = HighlightOptions::default();
        assert!((opts.pulse_opacity(0.0) - 1.0).abs() < 1e-6);
        let trough = opts.pulse_opacity(600.0);
        assert!((trough - 0.55).abs() < 1e-4);
        let off = HighlightOptions {
            pulse_enabled: false,
            ..HighlightOptions::default()
        };
        assert_eq!(off.pulse_opacity(600.0), 1.0);
    }
}
