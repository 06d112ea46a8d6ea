//! Backend-neutral display list builder.
//!
//! `SceneList` turns a frame's [`RenderContext`] into an ordered command
//! list a 2D backend can replay. Every frame rebuilds from scratch.

use crate::color::parse_css_color;
use crate::renderer::{RenderContext, Renderer};
use crate::text::{CharMetrics, wrap_text};
use kurbo::{Affine, BezPath, Ellipse, Point, Rect, Shape, Vec2};
use peniko::Color;
use slate_core::element::{Element, ShapeData};
use slate_core::presence::Presence;

/// Selection outline furniture, in screen pixels (divided by zoom at draw
/// time so it stays constant on screen).
const SELECTION_MARGIN: f64 = 5.0;
const SELECTION_STROKE: f64 = 2.0;
const SELECTION_DASH: f64 = 5.0;

/// Remote cursor furniture, also screen-constant.
const CURSOR_RADIUS: f64 = 5.0;
const CURSOR_LABEL_OFFSET: Vec2 = Vec2::new(10.0, -10.0);
const CURSOR_LABEL_FONT: f64 = 12.0;

/// Note body layout, in world units.
const NOTE_PADDING: f64 = 8.0;
const NOTE_FONT: f64 = 14.0;
const NOTE_LINE_HEIGHT: f64 = 18.0;

/// Standalone text element font, in world units.
const TEXT_FONT: f64 = 16.0;

/// Curve flattening tolerance for rects and ellipses.
const PATH_TOLERANCE: f64 = 0.1;

/// One drawing command. Coordinates are world-space; the transform command
/// at the head of the list maps them to the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Clear {
        color: Color,
    },
    SetTransform {
        transform: Affine,
    },
    Stroke {
        path: BezPath,
        color: Color,
        width: f64,
    },
    StrokeDashed {
        path: BezPath,
        color: Color,
        width: f64,
        dashes: [f64; 2],
    },
    Fill {
        path: BezPath,
        color: Color,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: Color,
    },
    Text {
        position: Point,
        content: String,
        color: Color,
        font_size: f64,
    },
}

/// Display-list renderer.
#[derive(Debug, Default)]
pub struct SceneList {
    cmds: Vec<DrawCmd>,
    metrics: CharMetrics,
}

impl SceneList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands for the most recently built frame, in draw order.
    pub fn cmds(&self) -> &[DrawCmd] {
        &self.cmds
    }

    fn draw_element(&mut self, element: &Element, zoom: f64) {
        let color = parse_css_color(&element.color);
        let width = element.size / zoom;

        match &element.shape {
            ShapeData::Path { points } => match points.as_slice() {
                [] => {}
                // A stationary stroke still leaves a visible dot.
                [single] => self.cmds.push(DrawCmd::FillCircle {
                    center: *single,
                    radius: width / 2.0,
                    color,
                }),
                [first, rest @ ..] => {
                    let mut path = BezPath::new();
                    path.move_to(*first);
                    for point in rest {
                        path.line_to(*point);
                    }
                    self.cmds.push(DrawCmd::Stroke { path, color, width });
                }
            },
            ShapeData::Line { start, end } => {
                let mut path = BezPath::new();
                path.move_to(*start);
                path.line_to(*end);
                self.cmds.push(DrawCmd::Stroke { path, color, width });
            }
            ShapeData::Rectangle { start, end } => {
                let rect = Rect::from_points(*start, *end);
                self.cmds.push(DrawCmd::Stroke {
                    path: rect.to_path(PATH_TOLERANCE),
                    color,
                    width,
                });
            }
            ShapeData::Ellipse { start, end } => {
                let rect = Rect::from_points(*start, *end);
                self.cmds.push(DrawCmd::Stroke {
                    path: Ellipse::from_rect(rect).to_path(PATH_TOLERANCE),
                    color,
                    width,
                });
            }
            ShapeData::Note {
                position,
                width: w,
                height: h,
                text,
            } => self.draw_note(*position, *w, *h, text, zoom),
            ShapeData::Text { position, text } => {
                self.cmds.push(DrawCmd::Text {
                    position: Point::new(position.x, position.y + TEXT_FONT),
                    content: text.clone(),
                    color,
                    font_size: TEXT_FONT,
                });
            }
        }
    }

    fn draw_note(&mut self, position: Point, width: f64, height: f64, text: &str, zoom: f64) {
        let rect = Rect::new(position.x, position.y, position.x + width, position.y + height);
        self.cmds.push(DrawCmd::Fill {
            path: rect.to_path(PATH_TOLERANCE),
            color: Color::from_rgba8(254, 243, 199, 255), // Amber paper
        });
        self.cmds.push(DrawCmd::Stroke {
            path: rect.to_path(PATH_TOLERANCE),
            color: Color::from_rgba8(245, 158, 11, 255),
            width: 1.0 / zoom,
        });

        let max_width = width - 2.0 * NOTE_PADDING;
        let max_lines = ((height - 2.0 * NOTE_PADDING) / NOTE_LINE_HEIGHT).floor() as usize;
        let lines = wrap_text(&self.metrics, text, NOTE_FONT, max_width);
        for (i, line) in lines.into_iter().take(max_lines).enumerate() {
            if line.is_empty() {
                continue;
            }
            self.cmds.push(DrawCmd::Text {
                position: Point::new(
                    position.x + NOTE_PADDING,
                    position.y + NOTE_PADDING + NOTE_FONT + i as f64 * NOTE_LINE_HEIGHT,
                ),
                content: line,
                color: Color::from_rgba8(146, 64, 14, 255),
                font_size: NOTE_FONT,
            });
        }
    }

    fn draw_selection(&mut self, bounds: Rect, color: Color, zoom: f64) {
        let margin = SELECTION_MARGIN / zoom;
        let outline = bounds.inflate(margin, margin);
        self.cmds.push(DrawCmd::StrokeDashed {
            path: outline.to_path(PATH_TOLERANCE),
            color,
            width: SELECTION_STROKE / zoom,
            dashes: [SELECTION_DASH / zoom; 2],
        });
    }

    fn draw_cursor(&mut self, peer: &Presence, zoom: f64) {
        let Some(cursor) = peer.cursor else {
            return;
        };
        let color = parse_css_color(&peer.color);
        self.cmds.push(DrawCmd::FillCircle {
            center: cursor,
            radius: CURSOR_RADIUS / zoom,
            color,
        });
        self.cmds.push(DrawCmd::Text {
            position: cursor + CURSOR_LABEL_OFFSET / zoom,
            content: peer.user_name.clone(),
            color,
            font_size: CURSOR_LABEL_FONT / zoom,
        });
    }
}

impl Renderer for SceneList {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.cmds.clear();
        self.cmds.push(DrawCmd::Clear {
            color: ctx.background_color,
        });
        self.cmds.push(DrawCmd::SetTransform {
            transform: ctx.transform,
        });

        for element in ctx.elements {
            self.draw_element(element, ctx.zoom);
        }
        if let Some(preview) = ctx.preview {
            self.draw_element(preview, ctx.zoom);
        }
        if let Some(id) = ctx.selected {
            if let Some(element) = ctx.elements.iter().find(|e| e.id == Some(id)) {
                self.draw_selection(element.bounds(), ctx.selection_color, ctx.zoom);
            }
        }
        for peer in ctx.peers {
            self.draw_cursor(peer, ctx.zoom);
        }
    }
}
