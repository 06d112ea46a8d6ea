//! Tool definitions for both editing surfaces.

use serde::{Deserialize, Serialize};

/// Tools available on the collaborative board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BoardTool {
    #[default]
    Select,
    Pan,
    Pen,
    Rectangle,
    Ellipse,
    Text,
    Note,
    Eraser,
}

impl BoardTool {
    /// Single-key tool shortcut (no modifier).
    pub fn from_shortcut(key: &str) -> Option<Self> {
        match key {
            "v" | "V" => Some(Self::Select),
            "h" | "H" => Some(Self::Pan),
            "p" | "P" => Some(Self::Pen),
            "r" | "R" => Some(Self::Rectangle),
            "o" | "O" => Some(Self::Ellipse),
            "t" | "T" => Some(Self::Text),
            "n" | "N" => Some(Self::Note),
            "e" | "E" => Some(Self::Eraser),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Select => "Select (V)",
            Self::Pan => "Pan (H)",
            Self::Pen => "Pen (P)",
            Self::Rectangle => "Rectangle (R)",
            Self::Ellipse => "Ellipse (O)",
            Self::Text => "Text (T)",
            Self::Note => "Note (N)",
            Self::Eraser => "Eraser (E)",
        }
    }
}

/// Tools available in the modal sketch editor. No select/eraser/pan: the
/// modal is a single surface with whole-canvas undo only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SketchTool {
    #[default]
    Pen,
    Line,
    Rectangle,
    Ellipse,
}

impl SketchTool {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pen => "Pen",
            Self::Line => "Line",
            Self::Rectangle => "Rectangle",
            Self::Ellipse => "Ellipse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts() {
        assert_eq!(BoardTool::from_shortcut("v"), Some(BoardTool::Select));
        assert_eq!(BoardTool::from_shortcut("H"), Some(BoardTool::Pan));
        assert_eq!(BoardTool::from_shortcut("e"), Some(BoardTool::Eraser));
        assert_eq!(BoardTool::from_shortcut("x"), None);
        assert_eq!(BoardTool::from_shortcut("vv"), None);
    }

    #[test]
    fn test_default_tools() {
        assert_eq!(BoardTool::default(), BoardTool::Select);
        assert_eq!(SketchTool::default(), SketchTool::Pen);
    }
}
