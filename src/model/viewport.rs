use serde::{Deserialize, Serialize};

/// Zoom and scale limits applied by the viewport helpers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub min_vertical_scale: f32,
    pub max_vertical_scale: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_zoom: 0.05,
            max_zoom: 8.0,
            min_vertical_scale: 0.5,
            max_vertical_scale: 3.0,
        }
    }
}

/// Pan and zoom state of the timeline.
///
/// `x` and `y` are world-space offsets in layout units at zoom 1 and vertical
/// scale 1. On screen they become `x * zoom` and `y * vertical_scale` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    /// Horizontal scale factor.
    pub zoom: f32,
    /// Vertical scale factor, independent of `zoom`.
    pub vertical_scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
            vertical_scale: 1.0,
        }
    }
}

impl Viewport {
    /// Horizontal pan in screen pixels at the current zoom.
    pub fn pan_px(&self) -> f32 {
        self.x * self.zoom
    }

    /// Vertical pan in screen pixels at the current vertical scale.
    pub fn pan_py(&self) -> f32 {
        self.y * self.vertical_scale
    }

    /// Pan by a screen-space delta. Pixels become world units by dividing by the scale.
    pub fn pan_by_screen(&mut self, dx: f32, dy: f32) {
        if self.zoom > 0.0 {
            self.x -= dx / self.zoom;
        }
        if self.vertical_scale > 0.0 {
            self.y -= dy / self.vertical_scale;
        }
    }

    /// Multiply the zoom by `factor`, keeping the world point under `anchor_x` fixed.
    ///
    /// `anchor_x` is the cursor position relative to the unscaled left margin,
    /// i.e. `screen_x - surface_left - margin`.
    pub fn zoom_around(&mut self, factor: f32, anchor_x: f32, limits: &ZoomLimits) -> bool {
        let new_zoom = (self.zoom * factor).clamp(limits.min_zoom, limits.max_zoom);
        if !new_zoom.is_finite() || new_zoom == self.zoom {
            return false;
        }
        let world = (anchor_x + self.pan_px()) / self.zoom;
        self.zoom = new_zoom;
        self.x = world - anchor_x / new_zoom;
        true
    }

    /// Same as [`Viewport::zoom_around`] for the vertical axis.
    pub fn scale_vertically_around(&mut self, factor: f32, anchor_y: f32, limits: &ZoomLimits) -> bool {
        let new_scale = (self.vertical_scale * factor)
            .clamp(limits.min_vertical_scale, limits.max_vertical_scale);
        if !new_scale.is_finite() || new_scale == self.vertical_scale {
            return false;
        }
        let world = (anchor_y + self.pan_py()) / self.vertical_scale;
        self.vertical_scale = new_scale;
        self.y = world - anchor_y / new_scale;
        true
    }

    /// Zoom in around the left edge.
    pub fn zoom_in(&mut self, step: f32, limits: &ZoomLimits) {
        self.zoom_around(step, 0.0, limits);
    }

    /// Zoom out around the left edge.
    pub fn zoom_out(&mut self, step: f32, limits: &ZoomLimits) {
        if step > 0.0 {
            self.zoom_around(1.0 / step, 0.0, limits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_divides_screen_delta_by_zoom() {
        let mut vp = Viewport {
            zoom: 2.0,
            vertical_scale: 0.5,
            ..Default::default()
        };
        vp.pan_by_screen(10.0, 10.0);
        assert_eq!(vp.x, -5.0);
        assert_eq!(vp.y, -20.0);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let limits = ZoomLimits::default();
        let mut vp = Viewport {
            x: 120.0,
            ..Default::default()
        };
        let anchor = 300.0;
        let before = (anchor + vp.pan_px()) / vp.zoom;
        assert!(vp.zoom_around(1.1, anchor, &limits));
        let after = (anchor + vp.pan_px()) / vp.zoom;
        assert!((before - after).abs() < 1e-3);
        assert!((vp.zoom - 1.1).abs() < 1e-6);
    }

    #[test]
    fn zoom_is_clamped() {
        let limits = ZoomLimits::default();
        let mut vp = Viewport::default();
        for _ in 0..100 {
            vp.zoom_in(1.5, &limits);
        }
        assert_eq!(vp.zoom, limits.max_zoom);
        assert!(!vp.zoom_around(2.0, 0.0, &limits));
    }

    #[test]
    fn vertical_scale_keeps_anchor_fixed() {
        let limits = ZoomLimits::default();
        let mut vp = Viewport {
            y: 40.0,
            ..Default::default()
        };
        let before = (200.0 + vp.pan_py()) / vp.vertical_scale;
        assert!(vp.scale_vertically_around(1.25, 200.0, &limits));
        let after = (200.0 + vp.pan_py()) / vp.vertical_scale;
        assert!((before - after).abs() < 1e-3);
    }
}
