//! Modal sketch editor session.
//!
//! A single-user drawing surface backed by local storage: pen strokes commit
//! incrementally while shapes preview until release, history snapshots each
//! completed gesture, and a debounced autosave keeps the stored copy close
//! to the live one. Closing with unsaved changes goes through a tri-state
//! decision instead of silently dropping work.

use crate::camera::{CenteredCamera, MODAL_ZOOM_STEP, MODAL_ZOOM_STEP_FINE};
use crate::element::{Element, ShapeData};
use crate::history::History;
use crate::input::{InputState, KeyEvent, Modifiers, MouseButton, PointerEvent};
use crate::storage::{AutosaveManager, Storage, StorageResult};
use crate::tools::SketchTool;
use kurbo::{Point, Size, Vec2};
use std::sync::Arc;
use std::time::Instant;

/// Shape gestures shorter than this (in world units, diagonal) are treated
/// as accidental clicks and discarded. Pen strokes are exempt: a single tap
/// with the pen is a deliberate dot.
pub const DEGENERATE_THRESHOLD: f64 = 2.0;

/// Outcome of the close confirmation shown when changes are unsaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    SaveAndClose,
    DiscardAndClose,
    CancelClose,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    /// Pen stroke in progress; the element is already live in the sequence
    /// and grows point by point.
    Penning,
    /// Shape in progress; nothing is committed until release.
    Drawing { start: Point, current: Point },
}

/// One open modal sketch editor on a locally persisted canvas.
pub struct SketchSession<S: Storage> {
    canvas_id: String,
    title: String,
    elements: Vec<Element>,
    tool: SketchTool,
    color: String,
    size: f64,
    camera: CenteredCamera,
    viewport: Size,
    gesture: Gesture,
    history: History,
    input: InputState,
    autosave: AutosaveManager<S>,
}

impl<S: Storage> SketchSession<S> {
    /// Open the editor for a canvas, loading whatever the store holds.
    /// Absent or corrupt data starts an empty canvas.
    pub fn open(canvas_id: impl Into<String>, title: impl Into<String>, storage: Arc<S>) -> Self {
        let canvas_id = canvas_id.into();
        let mut autosave = AutosaveManager::new(storage, &canvas_id);
        let elements = autosave.load();
        let history = History::new(elements.clone());
        Self {
            canvas_id,
            title: title.into(),
            elements,
            tool: SketchTool::default(),
            color: crate::element::DEFAULT_COLOR.to_string(),
            size: crate::element::DEFAULT_SIZE,
            camera: CenteredCamera::new(),
            viewport: Size::new(800.0, 600.0),
            gesture: Gesture::Idle,
            history,
            input: InputState::new(),
            autosave,
        }
    }

    /// Route one pointer event through the gesture state machine.
    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) {
        self.input.handle_pointer_event(&event, now);
        match event {
            PointerEvent::Down { position, button } => self.pointer_down(position, button, now),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { position, .. } => self.pointer_up(position, now),
            PointerEvent::Scroll { delta, .. } => self.scroll(delta),
            PointerEvent::Leave => {
                // Leaving the surface ends the stroke like a release would.
                let position = self.input.pointer_position;
                self.pointer_up(position, now);
            }
        }
    }

    fn pointer_down(&mut self, position: Point, button: MouseButton, _now: Instant) {
        if button != MouseButton::Left {
            return;
        }
        let world = self.camera.screen_to_world(position, self.viewport);
        match self.tool {
            SketchTool::Pen => {
                // Pen commits live so the stroke is visible as it grows.
                self.elements.push(
                    Element::new(ShapeData::Path {
                        points: vec![world],
                    })
                    .with_color(self.color.clone())
                    .with_size(self.size),
                );
                self.gesture = Gesture::Penning;
            }
            SketchTool::Line | SketchTool::Rectangle | SketchTool::Ellipse => {
                self.gesture = Gesture::Drawing {
                    start: world,
                    current: world,
                };
            }
        }
    }

    fn pointer_move(&mut self, position: Point) {
        let world = self.camera.screen_to_world(position, self.viewport);
        match &mut self.gesture {
            Gesture::Penning => {
                if let Some(ShapeData::Path { points }) =
                    self.elements.last_mut().map(|e| &mut e.shape)
                {
                    points.push(world);
                }
            }
            Gesture::Drawing { current, .. } => *current = world,
            Gesture::Idle => {}
        }
    }

    fn pointer_up(&mut self, position: Point, now: Instant) {
        let world = self.camera.screen_to_world(position, self.viewport);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Penning => self.finish_gesture(now),
            Gesture::Drawing { start, .. } => {
                if start.distance(world) <= DEGENERATE_THRESHOLD {
                    return;
                }
                let shape = match self.tool {
                    SketchTool::Line => ShapeData::Line {
                        start,
                        end: world,
                    },
                    SketchTool::Rectangle => ShapeData::Rectangle {
                        start,
                        end: world,
                    },
                    SketchTool::Ellipse => ShapeData::Ellipse {
                        start,
                        end: world,
                    },
                    SketchTool::Pen => return,
                };
                self.elements.push(
                    Element::new(shape)
                        .with_color(self.color.clone())
                        .with_size(self.size),
                );
                self.finish_gesture(now);
            }
            Gesture::Idle => {}
        }
    }

    fn finish_gesture(&mut self, now: Instant) {
        self.history.push(&self.elements);
        self.autosave.sync_dirty(&self.elements, now);
    }

    fn scroll(&mut self, delta: Vec2) {
        if !self.input.modifiers.command() {
            return;
        }
        let step = if delta.y < 0.0 {
            MODAL_ZOOM_STEP
        } else {
            -MODAL_ZOOM_STEP
        };
        self.camera.zoom_by(step);
    }

    /// Toolbar zoom buttons; finer step than the wheel.
    pub fn zoom_in(&mut self) {
        self.camera.zoom_by(MODAL_ZOOM_STEP_FINE);
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_by(-MODAL_ZOOM_STEP_FINE);
    }

    /// Ctrl/Cmd+Z, Shift+Z and Y drive history; nothing else is bound.
    pub fn handle_key(&mut self, event: KeyEvent, now: Instant) {
        let KeyEvent::Pressed(key) = event else {
            return;
        };
        let modifiers = self.input.modifiers;
        if !modifiers.command() {
            return;
        }
        match key.as_str() {
            "z" | "Z" => {
                if modifiers.shift {
                    self.redo(now);
                } else {
                    self.undo(now);
                }
            }
            "y" | "Y" => self.redo(now),
            _ => {}
        }
    }

    pub fn undo(&mut self, now: Instant) {
        if let Some(snapshot) = self.history.undo() {
            self.elements = snapshot;
            self.autosave.sync_dirty(&self.elements, now);
        }
    }

    pub fn redo(&mut self, now: Instant) {
        if let Some(snapshot) = self.history.redo() {
            self.elements = snapshot;
            self.autosave.sync_dirty(&self.elements, now);
        }
    }

    /// Remove everything; undoable like any other edit.
    pub fn clear(&mut self, now: Instant) {
        if self.elements.is_empty() {
            return;
        }
        self.elements.clear();
        self.finish_gesture(now);
    }

    /// Drive the autosave debounce. Returns true when a background save
    /// was written.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.autosave.poll(&self.elements, now)
    }

    /// Explicit save; the error surfaces so the caller can show it.
    pub fn save(&mut self) -> StorageResult<()> {
        self.autosave.save(&self.elements)
    }

    /// Drop in-memory changes back to the last-saved state.
    pub fn revert(&mut self) {
        self.elements = self.autosave.revert();
        self.history.push(&self.elements);
    }

    /// Whether closing needs a confirmation first.
    pub fn should_confirm_close(&self) -> bool {
        self.autosave.is_dirty()
    }

    /// Apply a close confirmation. Returns true when the editor may close.
    pub fn request_close(&mut self, decision: CloseDecision) -> bool {
        match decision {
            CloseDecision::SaveAndClose => match self.save() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Save on close failed for {}: {}", self.canvas_id, e);
                    false
                }
            },
            CloseDecision::DiscardAndClose => true,
            CloseDecision::CancelClose => false,
        }
    }

    /// Preview element for an in-progress shape gesture. Pen strokes are
    /// already live in the sequence and need no preview.
    pub fn preview(&self) -> Option<Element> {
        let Gesture::Drawing { start, current } = self.gesture.clone() else {
            return None;
        };
        let shape = match self.tool {
            SketchTool::Line => ShapeData::Line {
                start,
                end: current,
            },
            SketchTool::Rectangle => ShapeData::Rectangle {
                start,
                end: current,
            },
            SketchTool::Ellipse => ShapeData::Ellipse {
                start,
                end: current,
            },
            SketchTool::Pen => return None,
        };
        Some(
            Element::new(shape)
                .with_color(self.color.clone())
                .with_size(self.size),
        )
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.input.set_modifiers(modifiers);
    }

    pub fn set_tool(&mut self, tool: SketchTool) {
        self.tool = tool;
        self.gesture = Gesture::Idle;
    }

    pub fn tool(&self) -> SketchTool {
        self.tool
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = size;
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn camera(&self) -> &CenteredCamera {
        &self.camera
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, canvas_key};
    use std::time::Duration;

    fn session() -> SketchSession<MemoryStorage> {
        SketchSession::open("c1", "Sketch", Arc::new(MemoryStorage::new()))
    }

    fn down(pos: Point) -> PointerEvent {
        PointerEvent::Down {
            position: pos,
            button: MouseButton::Left,
        }
    }

    fn moved(pos: Point) -> PointerEvent {
        PointerEvent::Move { position: pos }
    }

    fn up(pos: Point) -> PointerEvent {
        PointerEvent::Up {
            position: pos,
            button: MouseButton::Left,
        }
    }

    fn drag(session: &mut SketchSession<MemoryStorage>, from: Point, to: Point, now: Instant) {
        session.handle_pointer(down(from), now);
        session.handle_pointer(moved(to), now);
        session.handle_pointer(up(to), now);
    }

    #[test]
    fn test_pen_commits_live() {
        let t0 = Instant::now();
        let mut session = session();

        session.handle_pointer(down(Point::new(10.0, 10.0)), t0);
        assert_eq!(session.elements().len(), 1);

        session.handle_pointer(moved(Point::new(20.0, 20.0)), t0);
        session.handle_pointer(moved(Point::new(30.0, 25.0)), t0);
        match &session.elements()[0].shape {
            ShapeData::Path { points } => assert_eq!(points.len(), 3),
            other => panic!("Wrong shape: {:?}", other),
        }

        session.handle_pointer(up(Point::new(30.0, 25.0)), t0);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_pen_tap_keeps_dot() {
        let t0 = Instant::now();
        let mut session = session();
        let pos = Point::new(50.0, 50.0);

        session.handle_pointer(down(pos), t0);
        session.handle_pointer(up(pos), t0);

        // A stationary pen tap survives; degenerate discard is shapes-only.
        assert_eq!(session.elements().len(), 1);
    }

    #[test]
    fn test_degenerate_shape_discarded() {
        let t0 = Instant::now();
        let mut session = session();
        session.set_tool(SketchTool::Rectangle);

        drag(&mut session, Point::new(50.0, 50.0), Point::new(51.0, 51.0), t0);
        assert!(session.elements().is_empty());
        assert!(!session.is_dirty());

        drag(&mut session, Point::new(50.0, 50.0), Point::new(80.0, 80.0), t0);
        assert_eq!(session.elements().len(), 1);
    }

    #[test]
    fn test_shape_previews_until_release() {
        let t0 = Instant::now();
        let mut session = session();
        session.set_tool(SketchTool::Line);

        session.handle_pointer(down(Point::new(10.0, 10.0)), t0);
        session.handle_pointer(moved(Point::new(60.0, 40.0)), t0);
        assert!(session.elements().is_empty());
        assert!(matches!(
            session.preview().map(|e| e.shape),
            Some(ShapeData::Line { .. })
        ));

        session.handle_pointer(up(Point::new(60.0, 40.0)), t0);
        assert_eq!(session.elements().len(), 1);
        assert!(session.preview().is_none());
    }

    #[test]
    fn test_autosave_after_debounce() {
        let t0 = Instant::now();
        let storage = Arc::new(MemoryStorage::new());
        let mut session = SketchSession::open("c1", "Sketch", storage.clone());

        drag(&mut session, Point::new(0.0, 0.0), Point::new(50.0, 50.0), t0);
        assert!(!session.poll(t0 + Duration::from_millis(1000)));
        assert!(session.poll(t0 + Duration::from_millis(1600)));
        assert!(!session.is_dirty());
        assert!(storage.exists(&canvas_key("c1")).unwrap());
    }

    #[test]
    fn test_undo_marks_dirty_again() {
        let t0 = Instant::now();
        let mut session = session();

        drag(&mut session, Point::new(0.0, 0.0), Point::new(50.0, 50.0), t0);
        session.save().unwrap();
        assert!(!session.is_dirty());

        session.undo(t0);
        assert!(session.elements().is_empty());
        assert!(session.is_dirty());

        // Redo restores the saved value exactly, so dirty clears.
        session.redo(t0);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_undo_redo_via_keyboard() {
        let t0 = Instant::now();
        let mut session = session();
        drag(&mut session, Point::new(0.0, 0.0), Point::new(50.0, 50.0), t0);

        session.set_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::default()
        });
        session.handle_key(KeyEvent::Pressed("z".to_string()), t0);
        assert!(session.elements().is_empty());

        session.set_modifiers(Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        });
        session.handle_key(KeyEvent::Pressed("Z".to_string()), t0);
        assert_eq!(session.elements().len(), 1);
    }

    #[test]
    fn test_revert_restores_saved_state() {
        let t0 = Instant::now();
        let mut session = session();

        drag(&mut session, Point::new(0.0, 0.0), Point::new(50.0, 50.0), t0);
        session.save().unwrap();
        drag(&mut session, Point::new(100.0, 100.0), Point::new(150.0, 150.0), t0);
        assert_eq!(session.elements().len(), 2);

        session.revert();
        assert_eq!(session.elements().len(), 1);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_close_decisions() {
        let t0 = Instant::now();
        let storage = Arc::new(MemoryStorage::new());
        let mut session = SketchSession::open("c1", "Sketch", storage.clone());

        drag(&mut session, Point::new(0.0, 0.0), Point::new(50.0, 50.0), t0);
        assert!(session.should_confirm_close());

        assert!(!session.request_close(CloseDecision::CancelClose));
        assert!(session.request_close(CloseDecision::SaveAndClose));
        assert!(storage.exists(&canvas_key("c1")).unwrap());
        assert!(!session.should_confirm_close());

        drag(&mut session, Point::new(60.0, 60.0), Point::new(90.0, 90.0), t0);
        assert!(session.request_close(CloseDecision::DiscardAndClose));
    }

    #[test]
    fn test_reopen_loads_saved_elements() {
        let t0 = Instant::now();
        let storage = Arc::new(MemoryStorage::new());

        let mut first = SketchSession::open("c1", "Sketch", storage.clone());
        drag(&mut first, Point::new(0.0, 0.0), Point::new(50.0, 50.0), t0);
        first.save().unwrap();

        let second = SketchSession::open("c1", "Sketch", storage);
        assert_eq!(second.elements().len(), 1);
        assert!(!second.is_dirty());
    }

    #[test]
    fn test_clear_is_undoable() {
        let t0 = Instant::now();
        let mut session = session();
        drag(&mut session, Point::new(0.0, 0.0), Point::new(50.0, 50.0), t0);
        session.save().unwrap();

        session.clear(t0);
        assert!(session.elements().is_empty());
        assert!(session.is_dirty());

        session.undo(t0);
        assert_eq!(session.elements().len(), 1);
        // Undo restored the saved value exactly, so dirty clears again.
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_wheel_zoom_clamped() {
        let t0 = Instant::now();
        let mut session = session();
        session.set_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::default()
        });

        for _ in 0..100 {
            session.handle_pointer(
                PointerEvent::Scroll {
                    position: Point::new(400.0, 300.0),
                    delta: Vec2::new(0.0, -1.0),
                },
                t0,
            );
        }
        assert!((session.camera().zoom - 3.0).abs() < f64::EPSILON);

        for _ in 0..100 {
            session.handle_pointer(
                PointerEvent::Scroll {
                    position: Point::new(400.0, 300.0),
                    delta: Vec2::new(0.0, 1.0),
                },
                t0,
            );
        }
        assert!((session.camera().zoom - 0.25).abs() < f64::EPSILON);
    }
}
