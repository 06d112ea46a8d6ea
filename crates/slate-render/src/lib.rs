//! Slateboard Render Library
//!
//! Renderer abstraction and the backend-neutral display list builder.
//! Backends consume the command list with whatever 2D API they have; the
//! scene builder owns all whiteboard-specific drawing decisions (zoom
//! compensation, selection outlines, note text wrapping, remote cursors).

mod color;
mod renderer;
mod scene;
mod text;

pub use color::parse_css_color;
pub use renderer::{RenderContext, Renderer};
pub use scene::{DrawCmd, SceneList};
pub use text::{CharMetrics, TextMeasure, wrap_text};
