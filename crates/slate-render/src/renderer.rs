//! Renderer trait abstraction.

use kurbo::{Affine, Size};
use peniko::Color;
use slate_core::camera::{Camera, CenteredCamera};
use slate_core::element::{Element, ElementId};
use slate_core::presence::Presence;

/// Context for a single render frame.
///
/// The element slice is expected in z order, as the sessions keep it; the
/// builder draws it back to front without re-sorting.
pub struct RenderContext<'a> {
    /// Elements to render, in z order.
    pub elements: &'a [Element],
    /// In-progress gesture preview, drawn above the committed elements.
    pub preview: Option<&'a Element>,
    /// Selected element, outlined if present.
    pub selected: Option<ElementId>,
    /// World-to-screen transform.
    pub transform: Affine,
    /// Zoom factor baked into `transform`; stroke widths and selection
    /// furniture are divided by it to stay screen-constant.
    pub zoom: f64,
    /// Viewport size in logical pixels.
    pub viewport_size: Size,
    /// Background color.
    pub background_color: Color,
    /// Selection highlight color.
    pub selection_color: Color,
    /// Remote participants whose cursors should be drawn.
    pub peers: &'a [&'a Presence],
}

impl<'a> RenderContext<'a> {
    /// Create a new render context with an identity view.
    pub fn new(elements: &'a [Element], viewport_size: Size) -> Self {
        Self {
            elements,
            preview: None,
            selected: None,
            transform: Affine::IDENTITY,
            zoom: 1.0,
            viewport_size,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            peers: &[],
        }
    }

    /// Take the view transform from a board camera.
    pub fn with_camera(mut self, camera: &Camera) -> Self {
        self.transform = camera.transform();
        self.zoom = camera.zoom;
        self
    }

    /// Take the view transform from a modal editor camera.
    pub fn with_centered_camera(mut self, camera: &CenteredCamera) -> Self {
        self.transform = camera.transform(self.viewport_size);
        self.zoom = camera.zoom;
        self
    }

    /// Set the gesture preview element.
    pub fn with_preview(mut self, preview: Option<&'a Element>) -> Self {
        self.preview = preview;
        self
    }

    /// Set the selected element.
    pub fn with_selected(mut self, selected: Option<ElementId>) -> Self {
        self.selected = selected;
        self
    }

    /// Set the remote participants.
    pub fn with_peers(mut self, peers: &'a [&'a Presence]) -> Self {
        self.peers = peers;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }
}

/// Trait for rendering backends.
///
/// `build_scene` runs once per frame and is a full repaint; there is no
/// damage tracking.
pub trait Renderer: Send + Sync {
    /// Build the scene/command buffer for a frame.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
