//! Stroke-outline approximation via radial sampling.
//!
//! A uniform stroke is approximated by two interleaved rings of displaced
//! text copies: 16 at the full stroke radius and 16 at 0.7x the radius,
//! phase-shifted by half an angular step so the inner ring fills the gaps
//! of the outer one. The ring count, radius ratio and phase offset must
//! match the service's reference preview exactly - changing any of them
//! visibly alters the outline weight.

use std::f64::consts::PI;

use crate::models::StyleSpec;

/// Directional samples per ring.
pub const OUTLINE_RING_STEPS: usize = 16;

/// Radius of the inner ring relative to the stroke width.
pub const INNER_RING_RATIO: f64 = 0.7;

/// A single text displacement in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineOffset {
    pub dx: f64,
    pub dy: f64,
}

impl OutlineOffset {
    /// Distance from the text origin.
    pub fn radius(&self) -> f64 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

/// An outline offset paired with its stroke color, ready to draw
/// underneath the primary text layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineLayer {
    pub dx: f64,
    pub dy: f64,
    pub color: String,
}

/// Compute the outline sample set for a stroke width.
///
/// Returns the empty set for a zero width; otherwise exactly
/// `2 * OUTLINE_RING_STEPS` offsets, outer ring first.
pub fn outline_offsets(stroke_width_px: f64) -> Vec<OutlineOffset> {
    if stroke_width_px == 0.0 {
        return Vec::new();
    }

    let steps = OUTLINE_RING_STEPS;
    let mut offsets = Vec::with_capacity(2 * steps);

    // Ring A: full radius
    for i in 0..steps {
        let angle = (i as f64) * 2.0 * PI / (steps as f64);
        offsets.push(OutlineOffset {
            dx: angle.cos() * stroke_width_px,
            dy: angle.sin() * stroke_width_px,
        });
    }

    // Ring B: reduced radius, shifted half a step
    for i in 0..steps {
        let angle = (i as f64) * 2.0 * PI / (steps as f64) + PI / (steps as f64);
        offsets.push(OutlineOffset {
            dx: angle.cos() * stroke_width_px * INNER_RING_RATIO,
            dy: angle.sin() * stroke_width_px * INNER_RING_RATIO,
        });
    }

    offsets
}

/// Compute the full layer stack for a style spec.
pub fn outline_layers(spec: &StyleSpec) -> Vec<OutlineLayer> {
    outline_offsets(spec.stroke_width_px)
        .into_iter()
        .map(|o| OutlineLayer {
            dx: o.dx,
            dy: o.dy,
            color: spec.stroke_color.clone(),
        })
        .collect()
}
