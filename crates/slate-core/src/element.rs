//! Element model for whiteboard shapes.
//!
//! A single tagged union covers both editing surfaces: elements created on
//! the collaborative board carry a store-assigned identifier, elements drawn
//! in the modal sketch editor are unidentified and live only at their
//! position in the sequence.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier for elements created through the collaborative layer store.
pub type ElementId = Uuid;

/// Stroke color applied when stored data omits one.
pub const DEFAULT_COLOR: &str = "#111827";

/// Stroke size applied when stored data omits one.
pub const DEFAULT_SIZE: f64 = 4.0;

/// Minimum dimensions enforced for note elements.
pub const MIN_NOTE_WIDTH: f64 = 200.0;
pub const MIN_NOTE_HEIGHT: f64 = 150.0;

/// Text seeded into a freshly created note.
pub const NOTE_PLACEHOLDER: &str = "Double-click to edit...";

/// Shape-specific geometry, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeData {
    Path {
        points: Vec<Point>,
    },
    Rectangle {
        start: Point,
        end: Point,
    },
    Ellipse {
        start: Point,
        end: Point,
    },
    Line {
        start: Point,
        end: Point,
    },
    Note {
        position: Point,
        width: f64,
        height: f64,
        text: String,
    },
    Text {
        position: Point,
        text: String,
    },
}

/// One drawable shape on a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Store-assigned identity; `None` for sketch elements that are never
    /// reconciled by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    /// Explicit paint order; higher paints later.
    #[serde(default, rename = "zIndex")]
    pub z_index: i64,
    /// CSS-style stroke/fill color.
    #[serde(default = "default_color")]
    pub color: String,
    /// Stroke width in world units.
    #[serde(default = "default_size")]
    pub size: f64,
    #[serde(flatten)]
    pub shape: ShapeData,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_size() -> f64 {
    DEFAULT_SIZE
}

impl Element {
    /// Create an unidentified element with default style.
    pub fn new(shape: ShapeData) -> Self {
        Self {
            id: None,
            z_index: 0,
            color: default_color(),
            size: DEFAULT_SIZE,
            shape,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_z_index(mut self, z_index: i64) -> Self {
        self.z_index = z_index;
        self
    }

    /// Normalized axis-aligned bounding box.
    ///
    /// Drag gestures can produce negative extents (end above/left of start);
    /// the result is always min-corner plus absolute dimensions.
    pub fn bounds(&self) -> Rect {
        match &self.shape {
            ShapeData::Path { points } => {
                let first = points.first().copied().unwrap_or(Point::ZERO);
                points
                    .iter()
                    .fold(Rect::from_points(first, first), |r, p| {
                        r.union_pt(*p)
                    })
            }
            ShapeData::Rectangle { start, end }
            | ShapeData::Ellipse { start, end }
            | ShapeData::Line { start, end } => Rect::from_points(*start, *end),
            ShapeData::Note {
                position,
                width,
                height,
                ..
            } => Rect::from_origin_size(*position, (*width, *height)),
            ShapeData::Text { position, text } => {
                // Nominal box for hit-testing; real metrics live in the renderer.
                let width = (text.chars().count() as f64 * 10.0).max(10.0);
                Rect::from_origin_size(*position, (width, 24.0))
            }
        }
    }

    /// Bounding-box containment test in world coordinates.
    ///
    /// Stroke-like shapes get half a stroke of slack so thin lines remain
    /// selectable.
    pub fn hit_test(&self, point: Point) -> bool {
        let pad = match self.shape {
            ShapeData::Path { .. } | ShapeData::Line { .. } => self.size / 2.0,
            _ => 0.0,
        };
        self.bounds().inflate(pad, pad).contains(point)
    }

    /// Move the whole shape by a world-space delta.
    pub fn translate(&mut self, delta: Vec2) {
        match &mut self.shape {
            ShapeData::Path { points } => {
                for p in points.iter_mut() {
                    *p += delta;
                }
            }
            ShapeData::Rectangle { start, end }
            | ShapeData::Ellipse { start, end }
            | ShapeData::Line { start, end } => {
                *start += delta;
                *end += delta;
            }
            ShapeData::Note { position, .. } | ShapeData::Text { position, .. } => {
                *position += delta;
            }
        }
    }

    /// Text content for note/text elements.
    pub fn text(&self) -> Option<&str> {
        match &self.shape {
            ShapeData::Note { text, .. } | ShapeData::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Replace the text of a note/text element. No-op for other kinds.
    pub fn set_text(&mut self, new_text: impl Into<String>) {
        match &mut self.shape {
            ShapeData::Note { text, .. } | ShapeData::Text { text, .. } => {
                *text = new_text.into();
            }
            _ => {}
        }
    }
}

/// Decode an element sequence from untrusted JSON text.
///
/// Unreadable input yields an empty sequence; the failure is logged only.
pub fn decode_elements_json(json: &str) -> Vec<Element> {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => decode_elements(&value),
        Err(e) => {
            log::warn!("Discarding unreadable element data: {}", e);
            Vec::new()
        }
    }
}

/// Decode an element sequence leniently from an already-parsed JSON value.
///
/// Entries with an unknown discriminant are dropped silently. Missing color
/// and size fall back to defaults. A bare object carrying a `points` array
/// with no discriminant is legacy data and coerced to `path`.
pub fn decode_elements(value: &Value) -> Vec<Element> {
    let Some(items) = value.as_array() else {
        log::warn!("Element data is not an array; starting empty");
        return Vec::new();
    };
    items.iter().filter_map(decode_element).collect()
}

fn decode_element(value: &Value) -> Option<Element> {
    let obj = value.as_object()?;

    let shape = match obj.get("kind").and_then(Value::as_str) {
        Some("path") => ShapeData::Path {
            points: decode_points(obj.get("points")?)?,
        },
        Some("rectangle") => ShapeData::Rectangle {
            start: decode_point(obj.get("start")?)?,
            end: decode_point(obj.get("end")?)?,
        },
        Some("ellipse") => ShapeData::Ellipse {
            start: decode_point(obj.get("start")?)?,
            end: decode_point(obj.get("end")?)?,
        },
        Some("line") => ShapeData::Line {
            start: decode_point(obj.get("start")?)?,
            end: decode_point(obj.get("end")?)?,
        },
        Some("note") => ShapeData::Note {
            position: decode_point(obj.get("position")?)?,
            width: obj
                .get("width")
                .and_then(Value::as_f64)
                .unwrap_or(MIN_NOTE_WIDTH),
            height: obj
                .get("height")
                .and_then(Value::as_f64)
                .unwrap_or(MIN_NOTE_HEIGHT),
            text: decode_text(obj),
        },
        Some("text") => ShapeData::Text {
            position: decode_point(obj.get("position")?)?,
            text: decode_text(obj),
        },
        // Legacy entries: a point array without a discriminant is a path.
        None if obj.contains_key("points") => ShapeData::Path {
            points: decode_points(obj.get("points")?)?,
        },
        _ => return None,
    };

    // A path needs at least one point; a single point renders as a dot.
    if let ShapeData::Path { points } = &shape {
        if points.is_empty() {
            return None;
        }
    }

    Some(Element {
        id: obj
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok()),
        z_index: obj.get("zIndex").and_then(Value::as_i64).unwrap_or(0),
        color: obj
            .get("color")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_COLOR)
            .to_string(),
        size: obj
            .get("size")
            .and_then(Value::as_f64)
            .filter(|s| *s > 0.0)
            .unwrap_or(DEFAULT_SIZE),
        shape,
    })
}

fn decode_text(obj: &serde_json::Map<String, Value>) -> String {
    obj.get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decode_point(value: &Value) -> Option<Point> {
    let obj = value.as_object()?;
    Some(Point::new(
        obj.get("x").and_then(Value::as_f64)?,
        obj.get("y").and_then(Value::as_f64)?,
    ))
}

fn decode_points(value: &Value) -> Option<Vec<Point>> {
    let items = value.as_array()?;
    Some(items.iter().filter_map(decode_point).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(points: Vec<Point>) -> Element {
        Element::new(ShapeData::Path { points })
    }

    #[test]
    fn test_path_roundtrip() {
        let el = path(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)])
            .with_color("#000000")
            .with_size(4.0);
        let json = serde_json::to_string(&[el.clone()]).unwrap();
        let decoded = decode_elements_json(&json);

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], el);
        match &decoded[0].shape {
            ShapeData::Path { points } => assert_eq!(points.len(), 2),
            other => panic!("Wrong kind: {:?}", other),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let json = r#"[{"kind":"path","points":[{"x":1.0,"y":2.0}]}]"#;
        let decoded = decode_elements_json(json);

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].color, DEFAULT_COLOR);
        assert!((decoded[0].size - DEFAULT_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_kind_dropped() {
        let json = r#"[
            {"kind":"sparkle","points":[{"x":0.0,"y":0.0}]},
            {"kind":"line","start":{"x":0.0,"y":0.0},"end":{"x":5.0,"y":5.0}}
        ]"#;
        let decoded = decode_elements_json(json);

        assert_eq!(decoded.len(), 1);
        assert!(matches!(decoded[0].shape, ShapeData::Line { .. }));
    }

    #[test]
    fn test_legacy_points_coerced_to_path() {
        let json = r##"[{"points":[{"x":1.0,"y":1.0},{"x":2.0,"y":2.0}],"color":"#ff0000"}]"##;
        let decoded = decode_elements_json(json);

        assert_eq!(decoded.len(), 1);
        assert!(matches!(decoded[0].shape, ShapeData::Path { .. }));
        assert_eq!(decoded[0].color, "#ff0000");
    }

    #[test]
    fn test_empty_path_dropped() {
        let json = r#"[{"kind":"path","points":[]}]"#;
        assert!(decode_elements_json(json).is_empty());
    }

    #[test]
    fn test_corrupt_data_yields_empty() {
        assert!(decode_elements_json("not json at all").is_empty());
        assert!(decode_elements_json(r#"{"kind":"path"}"#).is_empty());
    }

    #[test]
    fn test_bounds_normalized() {
        let el = Element::new(ShapeData::Rectangle {
            start: Point::new(100.0, 100.0),
            end: Point::new(20.0, 40.0),
        });
        let bounds = el.bounds();

        assert!((bounds.x0 - 20.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - 40.0).abs() < f64::EPSILON);
        assert!((bounds.width() - 80.0).abs() < f64::EPSILON);
        assert!((bounds.height() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test_aabb() {
        let el = Element::new(ShapeData::Rectangle {
            start: Point::new(0.0, 0.0),
            end: Point::new(50.0, 50.0),
        });

        assert!(el.hit_test(Point::new(25.0, 25.0)));
        assert!(!el.hit_test(Point::new(60.0, 25.0)));
    }

    #[test]
    fn test_hit_test_line_slack() {
        let el = Element::new(ShapeData::Line {
            start: Point::new(0.0, 10.0),
            end: Point::new(100.0, 10.0),
        })
        .with_size(4.0);

        // A horizontal line has a zero-height box; half a stroke of slack
        // keeps it clickable.
        assert!(el.hit_test(Point::new(50.0, 11.0)));
        assert!(!el.hit_test(Point::new(50.0, 20.0)));
    }

    #[test]
    fn test_translate() {
        let mut el = Element::new(ShapeData::Note {
            position: Point::new(10.0, 10.0),
            width: 200.0,
            height: 150.0,
            text: String::new(),
        });
        el.translate(Vec2::new(5.0, -3.0));

        let bounds = el.bounds();
        assert!((bounds.x0 - 15.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_id_survives_roundtrip() {
        let mut el = path(vec![Point::new(0.0, 0.0)]);
        el.id = Some(Uuid::new_v4());
        el.z_index = 7;

        let json = serde_json::to_string(&[el.clone()]).unwrap();
        let decoded = decode_elements_json(&json);

        assert_eq!(decoded[0].id, el.id);
        assert_eq!(decoded[0].z_index, 7);
    }
}
