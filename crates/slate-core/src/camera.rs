//! Camera module for pan/zoom transforms.
//!
//! Two cameras exist because the two editing surfaces anchor zoom
//! differently: the collaborative board zooms around the pan origin, the
//! modal sketch editor zooms around the viewport center.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom step for a single wheel notch on the board.
pub const BOARD_ZOOM_STEP: f64 = 0.1;

/// Zoom steps for the modal editor (finer with Ctrl/Cmd held).
pub const MODAL_ZOOM_STEP: f64 = 0.1;
pub const MODAL_ZOOM_STEP_FINE: f64 = 0.05;

/// View transform for the collaborative board: pan offset plus zoom,
/// anchored at the pan origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Current zoom level.
    pub zoom: f64,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// World-to-screen transform for rendering: translate by pan, then scale.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen-to-world transform for input handling.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Adjust zoom by a signed step, clamped to the configured range.
    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom = (self.zoom + delta).clamp(self.min_zoom, self.max_zoom);
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }
}

/// View transform for the modal sketch editor: zoom only, anchored at the
/// viewport center so zooming keeps the canvas middle fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenteredCamera {
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CenteredCamera {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            min_zoom: 0.25,
            max_zoom: 3.0,
        }
    }
}

impl CenteredCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// World-to-screen transform: translate to center, scale, translate back.
    pub fn transform(&self, viewport: Size) -> Affine {
        let center = Vec2::new(viewport.width / 2.0, viewport.height / 2.0);
        Affine::translate(center) * Affine::scale(self.zoom) * Affine::translate(-center)
    }

    pub fn screen_to_world(&self, screen_point: Point, viewport: Size) -> Point {
        self.transform(viewport).inverse() * screen_point
    }

    /// Adjust zoom by a signed step, clamped to the configured range.
    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom = (self.zoom + delta).clamp(self.min_zoom, self.max_zoom);
    }
}
