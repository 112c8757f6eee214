//! Caption style specification.

use serde::{Deserialize, Serialize};

/// Visual parameters controlling caption appearance.
///
/// Owned by the front-end and passed by value into preview/render
/// requests. The service keeps no style state between calls, so the full
/// spec is serialized on every request. Field names on the wire follow
/// the service's JSON contract (`fontFamily`, `fontSize`, `color`,
/// `strokeColor`, `strokeWidth`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSpec {
    #[serde(rename = "fontFamily")]
    pub font_family: String,
    #[serde(rename = "fontSize")]
    pub font_size_px: u32,
    /// Fill color as `#RRGGBB`.
    #[serde(rename = "color")]
    pub text_color: String,
    /// Outline color as `#RRGGBB`.
    #[serde(rename = "strokeColor")]
    pub stroke_color: String,
    /// Outline thickness; 0 disables the outline entirely.
    #[serde(rename = "strokeWidth")]
    pub stroke_width_px: f64,
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size_px: 24,
            text_color: "#FFFFFF".to_string(),
            stroke_color: "#000000".to_string(),
            stroke_width_px: 2.0,
        }
    }
}
