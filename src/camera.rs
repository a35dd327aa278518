//! Pan/zoom camera.
//!
//! The camera transform maps world (layout) coordinates to screen
//! coordinates: `screen = world * scale + translate`. Scale is clamped to the
//! configured range on every mutation. Smooth transitions are not performed
//! here: [`CameraController::follow_to`] and [`CameraController::fit_to_bounds`]
//! only compute a target, which the chart hands to the animation manager.

use serde::{Deserialize, Serialize};

use crate::layout::{Bounds, Extent, Position};

/// Affine pan/zoom transform applied to the whole scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl CameraTransform {
    pub const IDENTITY: CameraTransform = CameraTransform {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    pub const fn new(scale: f32, translate_x: f32, translate_y: f32) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
        }
    }

    /// World → screen.
    pub fn apply(&self, point: Position) -> Position {
        Position::new(
            point.x * self.scale + self.translate_x,
            point.y * self.scale + self.translate_y,
        )
    }

    /// Screen → world.
    pub fn invert(&self, point: Position) -> Position {
        Position::new(
            (point.x - self.translate_x) / self.scale,
            (point.y - self.translate_y) / self.scale,
        )
    }

    /// Component-wise interpolation, used for animated zoom.
    pub fn lerp(&self, to: &CameraTransform, t: f32) -> CameraTransform {
        CameraTransform::new(
            self.scale + (to.scale - self.scale) * t,
            self.translate_x + (to.translate_x - self.translate_x) * t,
            self.translate_y + (to.translate_y - self.translate_y) * t,
        )
    }
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Scale used when the camera follows a search match.
    pub follow_scale: f32,
    /// Screen padding kept around the content by fit-to-view.
    pub fit_padding: f32,
    /// Factor applied per zoom-in step; zoom-out uses its inverse.
    pub zoom_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
            follow_scale: 1.5,
            fit_padding: 40.0,
            zoom_step: 1.2,
        }
    }
}

/// Sole owner of the camera transform.
#[derive(Debug, Clone)]
pub struct CameraController {
    transform: CameraTransform,
    config: CameraConfig,
    extent: Extent,
}

impl CameraController {
    pub fn new(config: CameraConfig, extent: Extent) -> Self {
        Self {
            transform: CameraTransform::IDENTITY,
            config,
            extent,
        }
    }

    pub fn transform(&self) -> CameraTransform {
        self.transform
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn set_extent(&mut self, extent: Extent) {
        self.extent = extent;
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        if scale.is_nan() {
            return 1.0f32.clamp(self.config.min_scale, self.config.max_scale);
        }
        scale.clamp(self.config.min_scale, self.config.max_scale)
    }

    /// Zoom by `factor` about the canvas center.
    pub fn zoom_by(&mut self, factor: f32) -> CameraTransform {
        let center = self.extent.center();
        let anchor = self.transform.invert(center);
        let scale = self.clamp_scale(self.transform.scale * factor);
        self.transform = CameraTransform::new(
            scale,
            center.x - anchor.x * scale,
            center.y - anchor.y * scale,
        );
        self.transform
    }

    /// Jump to `transform`, clamping its scale.
    pub fn pan_to(&mut self, transform: CameraTransform) -> CameraTransform {
        self.transform = CameraTransform {
            scale: self.clamp_scale(transform.scale),
            ..transform
        };
        self.transform
    }

    /// Restore the identity transform.
    pub fn reset(&mut self) -> CameraTransform {
        self.transform = CameraTransform::IDENTITY;
        self.transform
    }

    /// Transform that centers `position` on the canvas at `target_scale`.
    ///
    /// Does not change the camera.
    pub fn follow_to(&self, position: Position, target_scale: f32) -> CameraTransform {
        let scale = self.clamp_scale(target_scale);
        let center = self.extent.center();
        CameraTransform::new(
            scale,
            center.x - position.x * scale,
            center.y - position.y * scale,
        )
    }

    /// Transform that fits `bounds` into the canvas with `padding` pixels of
    /// room on each side. Does not change the camera.
    pub fn fit_to_bounds(&self, bounds: Bounds, padding: f32) -> CameraTransform {
        let available_w = (self.extent.width - 2.0 * padding).max(1.0);
        let available_h = (self.extent.height - 2.0 * padding).max(1.0);
        let scale_x = if bounds.width() > 0.0 {
            available_w / bounds.width()
        } else {
            f32::INFINITY
        };
        let scale_y = if bounds.height() > 0.0 {
            available_h / bounds.height()
        } else {
            f32::INFINITY
        };
        let scale = scale_x.min(scale_y);
        let scale = if scale.is_finite() { scale.min(1.0) } else { 1.0 };
        self.follow_to(bounds.center(), scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraController {
        CameraController::new(CameraConfig::default(), Extent::new(800.0, 600.0))
    }

    #[test]
    fn test_zoom_clamps_to_max() {
        let mut cam = camera();
        for _ in 0..10 {
            let t = cam.zoom_by(10.0);
            assert!(t.scale <= 10.0);
        }
        assert_eq!(cam.transform().scale, 10.0);

        for _ in 0..10 {
            cam.zoom_by(0.01);
        }
        assert_eq!(cam.transform().scale, 0.1);
    }

    #[test]
    fn test_reset_is_identity() {
        let mut cam = camera();
        cam.zoom_by(3.0);
        cam.pan_to(CameraTransform::new(2.0, 50.0, -20.0));
        assert_eq!(cam.reset(), CameraTransform::IDENTITY);
        assert_eq!(
            cam.transform(),
            CameraTransform {
                scale: 1.0,
                translate_x: 0.0,
                translate_y: 0.0
            }
        );
    }

    #[test]
    fn test_zoom_keeps_canvas_center_fixed() {
        let mut cam = camera();
        cam.pan_to(CameraTransform::new(1.0, 30.0, 10.0));
        let center = Position::new(400.0, 300.0);
        let before = cam.transform().invert(center);
        cam.zoom_by(2.0);
        let after = cam.transform().invert(center);
        assert!(before.distance_to(after) < 1e-3);
    }

    #[test]
    fn test_pan_to_clamps_scale() {
        let mut cam = camera();
        let t = cam.pan_to(CameraTransform::new(50.0, 1.0, 2.0));
        assert_eq!(t, CameraTransform::new(10.0, 1.0, 2.0));
    }

    #[test]
    fn test_follow_to_centers_position() {
        let cam = camera();
        let target = cam.follow_to(Position::new(100.0, 50.0), 2.0);
        let on_screen = target.apply(Position::new(100.0, 50.0));
        assert_eq!(on_screen, Position::new(400.0, 300.0));
        // Pure: the camera itself did not move.
        assert_eq!(cam.transform(), CameraTransform::IDENTITY);

        let clamped = cam.follow_to(Position::new(0.0, 0.0), 100.0);
        assert_eq!(clamped.scale, 10.0);
    }

    #[test]
    fn test_apply_invert() {
        let t = CameraTransform::new(2.5, -40.0, 12.0);
        let p = Position::new(17.0, -3.0);
        assert!(t.invert(t.apply(p)).distance_to(p) < 1e-4);
    }

    #[test]
    fn test_fit_to_bounds() {
        let cam = camera();
        let bounds = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1440.0,
            max_y: 520.0,
        };
        let t = cam.fit_to_bounds(bounds, 40.0);
        assert!((t.scale - 0.5).abs() < 1e-6);
        let top_left = t.apply(Position::new(0.0, 0.0));
        assert!((top_left.x - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_single_point_uses_unit_scale() {
        let cam = camera();
        let bounds = Bounds::of(&[Position::new(10.0, 10.0)]).unwrap();
        assert_eq!(cam.fit_to_bounds(bounds, 40.0).scale, 1.0);
    }

    #[test]
    fn test_transform_serializes_camel_case() {
        let json = serde_json::to_string(&CameraTransform::IDENTITY).unwrap();
        assert!(json.contains("translateX"));
    }
}
