//! Collaborative board session.
//!
//! Session-scoped context object owning the element sequence, selection,
//! camera, gesture state machine, history and the collaboration client.
//! Pointer handlers mutate local state synchronously (read-your-own-writes)
//! and broadcast mutations fire-and-forget; remote state arrives only
//! through the periodic sync poll.

use crate::camera::{BOARD_ZOOM_STEP, Camera};
use crate::collab::{CollabClient, Relay};
use crate::element::{
    Element, ElementId, MIN_NOTE_HEIGHT, MIN_NOTE_WIDTH, NOTE_PLACEHOLDER, ShapeData,
};
use crate::history::History;
use crate::input::{InputState, KeyEvent, Modifiers, MouseButton, PointerEvent};
use crate::presence::Presence;
use crate::providers::{CanvasInfo, Identity, LayerStore};
use crate::tools::BoardTool;
use kurbo::{Point, Rect, Vec2};
use std::time::Instant;

/// Synchronous text entry at element creation/edit time.
///
/// The reference interaction is a blocking prompt; embedders may substitute
/// an inline editor. Returning `None` or an empty string cancels.
pub trait TextPrompt {
    fn prompt(&mut self, message: &str, initial: &str) -> Option<String>;
}

/// Current pointer gesture.
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    /// A shape gesture is in progress; `points` accumulates for the pen.
    Drawing {
        start: Point,
        current: Point,
        points: Vec<Point>,
    },
    /// Select tool moving an existing element. `grab_offset` is the vector
    /// from the element origin to the grab point, so the shape doesn't jump
    /// to the cursor.
    Dragging {
        id: ElementId,
        grab_offset: Vec2,
        moved: bool,
    },
    Panning {
        last: Point,
    },
}

/// One open editing session on a collaborative canvas.
pub struct BoardSession<S: LayerStore> {
    canvas: CanvasInfo,
    elements: Vec<Element>,
    selected: Option<ElementId>,
    tool: BoardTool,
    camera: Camera,
    gesture: Gesture,
    history: History,
    input: InputState,
    store: S,
    collab: CollabClient,
    color: String,
    size: f64,
}

impl<S: LayerStore> BoardSession<S> {
    /// Open a session: seed from the layers the host resolved, then run an
    /// immediate sync so the first paint shows the authoritative state.
    pub fn open(
        canvas: CanvasInfo,
        initial_elements: Vec<Element>,
        identity: Identity,
        store: S,
        relay: Box<dyn Relay>,
        now: Instant,
    ) -> Self {
        let mut collab = CollabClient::new(canvas.id.clone(), identity, relay, now);
        let mut elements = initial_elements;
        elements.sort_by_key(|e| e.z_index);
        if let Some(synced) = collab.sync() {
            elements = synced;
        }
        let history = History::new(elements.clone());
        Self {
            canvas,
            elements,
            selected: None,
            tool: BoardTool::default(),
            camera: Camera::new(),
            gesture: Gesture::Idle,
            history,
            input: InputState::new(),
            store,
            collab,
            color: crate::element::DEFAULT_COLOR.to_string(),
            size: crate::element::DEFAULT_SIZE,
        }
    }

    /// Route one pointer event through the gesture state machine.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        now: Instant,
        prompt: &mut dyn TextPrompt,
    ) {
        self.input.handle_pointer_event(&event, now);
        match event {
            PointerEvent::Down { position, button } => {
                if self.input.take_double_click() {
                    self.edit_text_at(position, prompt);
                } else {
                    self.pointer_down(position, button);
                }
            }
            PointerEvent::Move { position } => self.pointer_move(position, now),
            PointerEvent::Up {
                position, button, ..
            } => self.pointer_up(position, button, prompt),
            PointerEvent::Scroll { delta, .. } => self.scroll(delta),
            PointerEvent::Leave => {
                // Leaving the surface ends the gesture like a release would,
                // except a pending text gesture: releasing that would pop the
                // entry prompt mid-exit, so it is discarded instead.
                if self.tool == BoardTool::Text
                    && matches!(self.gesture, Gesture::Drawing { .. })
                {
                    self.gesture = Gesture::Idle;
                } else {
                    let position = self.input.pointer_position;
                    self.pointer_up(position, MouseButton::Left, prompt);
                }
            }
        }
    }

    fn pointer_down(&mut self, position: Point, button: MouseButton) {
        let world = self.camera.screen_to_world(position);

        // Pan: dedicated tool, middle button, or shift-modified select.
        if button == MouseButton::Middle
            || self.tool == BoardTool::Pan
            || (self.tool == BoardTool::Select && self.input.modifiers.shift)
        {
            self.gesture = Gesture::Panning { last: position };
            return;
        }
        if button != MouseButton::Left {
            return;
        }

        match self.tool {
            BoardTool::Select => {
                let hit = self
                    .elements
                    .iter()
                    .rev()
                    .find(|e| e.hit_test(world))
                    .map(|e| (e.id, e.bounds().origin()));
                match hit {
                    Some((id, origin)) => {
                        self.selected = id;
                        if let Some(id) = id {
                            self.gesture = Gesture::Dragging {
                                id,
                                grab_offset: world - origin,
                                moved: false,
                            };
                        }
                    }
                    None => self.selected = None,
                }
            }
            BoardTool::Pen => {
                self.gesture = Gesture::Drawing {
                    start: world,
                    current: world,
                    points: vec![world],
                };
            }
            BoardTool::Rectangle | BoardTool::Ellipse | BoardTool::Note | BoardTool::Text => {
                self.gesture = Gesture::Drawing {
                    start: world,
                    current: world,
                    points: Vec::new(),
                };
            }
            BoardTool::Eraser => {
                let hit = self
                    .elements
                    .iter()
                    .rev()
                    .find(|e| e.hit_test(world))
                    .and_then(|e| e.id);
                if let Some(id) = hit {
                    self.delete_element(id);
                }
            }
            BoardTool::Pan => {}
        }
    }

    fn pointer_move(&mut self, position: Point, now: Instant) {
        let world = self.camera.screen_to_world(position);
        match &mut self.gesture {
            Gesture::Drawing {
                current, points, ..
            } => {
                *current = world;
                if self.tool == BoardTool::Pen {
                    points.push(world);
                }
            }
            Gesture::Dragging {
                id,
                grab_offset,
                moved,
            } => {
                let id = *id;
                let target = world - *grab_offset;
                *moved = true;
                if let Some(el) = self.elements.iter_mut().find(|e| e.id == Some(id)) {
                    let delta = target - el.bounds().origin();
                    el.translate(delta);
                }
            }
            Gesture::Panning { last } => {
                let delta = position - *last;
                *last = position;
                self.camera.pan(delta);
            }
            Gesture::Idle => {}
        }
        self.collab.cursor_moved(world, self.selected, now);
    }

    fn pointer_up(&mut self, position: Point, button: MouseButton, prompt: &mut dyn TextPrompt) {
        if button != MouseButton::Left && !matches!(self.gesture, Gesture::Panning { .. }) {
            return;
        }
        let world = self.camera.screen_to_world(position);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Drawing { start, points, .. } => {
                self.commit_drawing(start, world, points, prompt);
            }
            Gesture::Dragging { id, moved, .. } => {
                if moved {
                    self.finish_drag(id);
                }
            }
            Gesture::Panning { .. } | Gesture::Idle => {}
        }
    }

    fn commit_drawing(
        &mut self,
        start: Point,
        end: Point,
        points: Vec<Point>,
        prompt: &mut dyn TextPrompt,
    ) {
        let shape = match self.tool {
            BoardTool::Pen => {
                if points.is_empty() {
                    return;
                }
                ShapeData::Path { points }
            }
            BoardTool::Rectangle => ShapeData::Rectangle { start, end },
            BoardTool::Ellipse => ShapeData::Ellipse { start, end },
            BoardTool::Note => {
                // Notes never come out smaller than the floor, regardless of
                // drag distance.
                let rect = Rect::from_points(start, end);
                ShapeData::Note {
                    position: rect.origin(),
                    width: rect.width().max(MIN_NOTE_WIDTH),
                    height: rect.height().max(MIN_NOTE_HEIGHT),
                    text: NOTE_PLACEHOLDER.to_string(),
                }
            }
            BoardTool::Text => {
                let Some(text) = prompt.prompt("Enter text", "") else {
                    return;
                };
                let text = text.trim().to_string();
                if text.is_empty() {
                    return;
                }
                ShapeData::Text {
                    position: end,
                    text,
                }
            }
            _ => return,
        };

        let element = Element::new(shape)
            .with_color(self.color.clone())
            .with_size(self.size)
            .with_z_index(self.next_z_index());
        self.insert_element(element);
    }

    /// Apply a freshly drawn element: persist through the layer store (which
    /// assigns its id), keep the optimistic local copy even if the store
    /// call fails, and broadcast.
    fn insert_element(&mut self, element: Element) {
        let element = match self.store.create_layer(&self.canvas.id, element.clone()) {
            Ok(created) => created,
            Err(e) => {
                log::warn!("Layer create failed on canvas {}: {}", self.canvas.id, e);
                element
            }
        };
        self.collab.send_update(&element);
        self.elements.push(element);
        self.history.push(&self.elements);
    }

    fn finish_drag(&mut self, id: ElementId) {
        let Some(element) = self.elements.iter().find(|e| e.id == Some(id)).cloned() else {
            return;
        };
        if let Err(e) = self.store.update_layer(id, &element) {
            log::warn!("Layer update failed: {}", e);
        }
        self.collab.send_update(&element);
        self.history.push(&self.elements);
    }

    fn scroll(&mut self, delta: Vec2) {
        if !self.input.modifiers.command() {
            return;
        }
        let step = if delta.y < 0.0 {
            BOARD_ZOOM_STEP
        } else {
            -BOARD_ZOOM_STEP
        };
        self.camera.zoom_by(step);
    }

    /// Double-click on a note/text element opens a prompt-based edit in
    /// place. Empty input or cancel leaves the element untouched.
    fn edit_text_at(&mut self, position: Point, prompt: &mut dyn TextPrompt) {
        let world = self.camera.screen_to_world(position);
        let hit = self
            .elements
            .iter()
            .rev()
            .find(|e| e.hit_test(world) && e.text().is_some())
            .and_then(|e| e.id);
        let Some(id) = hit else {
            return;
        };
        let current = self
            .elements
            .iter()
            .find(|e| e.id == Some(id))
            .and_then(|e| e.text())
            .unwrap_or_default()
            .to_string();
        let Some(text) = prompt.prompt("Edit text", &current) else {
            return;
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        if let Some(el) = self.elements.iter_mut().find(|e| e.id == Some(id)) {
            el.set_text(text);
        }
        self.finish_drag(id);
    }

    /// Route one keyboard event: single-letter tool shortcuts,
    /// Delete/Backspace for the selection, Ctrl/Cmd+Z / Shift+Z / Y for
    /// history.
    pub fn handle_key(&mut self, event: KeyEvent) {
        let KeyEvent::Pressed(key) = event else {
            return;
        };
        let modifiers = self.input.modifiers;
        if modifiers.command() {
            match key.as_str() {
                "z" | "Z" => {
                    if modifiers.shift {
                        self.redo();
                    } else {
                        self.undo();
                    }
                }
                "y" | "Y" => self.redo(),
                _ => {}
            }
            return;
        }
        match key.as_str() {
            "Delete" | "Backspace" => {
                if let Some(id) = self.selected {
                    self.delete_element(id);
                }
            }
            other => {
                if let Some(tool) = BoardTool::from_shortcut(other) {
                    self.set_tool(tool);
                }
            }
        }
    }

    /// Remove an element locally, then best-effort through store and relay.
    pub fn delete_element(&mut self, id: ElementId) {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != Some(id));
        if self.elements.len() == before {
            return;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        if let Err(e) = self.store.delete_layer(id) {
            log::warn!("Layer delete failed: {}", e);
        }
        self.collab.send_delete(id);
        self.history.push(&self.elements);
    }

    /// Raise an element above everything else.
    pub fn bring_to_front(&mut self, id: ElementId) {
        let top = self.next_z_index();
        let Some(el) = self.elements.iter_mut().find(|e| e.id == Some(id)) else {
            return;
        };
        el.z_index = top;
        let element = el.clone();
        self.elements.sort_by_key(|e| e.z_index);
        if let Err(e) = self.store.bring_to_front(id) {
            log::warn!("Bring-to-front failed: {}", e);
        }
        self.collab.send_update(&element);
        self.history.push(&self.elements);
    }

    /// Step back one local snapshot.
    ///
    /// History covers local-session snapshots only: restoring does not issue
    /// per-element network operations, so peers keep the server-confirmed
    /// state until it is mutated again.
    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo() {
            self.elements = snapshot;
            self.prune_selection();
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo() {
            self.elements = snapshot;
            self.prune_selection();
        }
    }

    /// Drive the sync poll and presence expiry.
    pub fn poll(&mut self, now: Instant) {
        if let Some(elements) = self.collab.poll(now) {
            self.apply_sync(elements);
        }
    }

    /// Full-replace from an authoritative sync response; last-full-sync-wins.
    pub fn apply_sync(&mut self, mut elements: Vec<Element>) {
        elements.sort_by_key(|e| e.z_index);
        self.elements = elements;
        self.prune_selection();
    }

    fn prune_selection(&mut self) {
        if let Some(id) = self.selected {
            if !self.elements.iter().any(|e| e.id == Some(id)) {
                self.selected = None;
            }
        }
    }

    fn next_z_index(&self) -> i64 {
        self.elements.iter().map(|e| e.z_index).max().unwrap_or(0) + 1
    }

    /// Preview element for the in-progress gesture, if any.
    pub fn preview(&self) -> Option<Element> {
        let Gesture::Drawing {
            start,
            current,
            points,
        } = &self.gesture
        else {
            return None;
        };
        let shape = match self.tool {
            BoardTool::Pen => ShapeData::Path {
                points: points.clone(),
            },
            BoardTool::Rectangle => ShapeData::Rectangle {
                start: *start,
                end: *current,
            },
            BoardTool::Ellipse => ShapeData::Ellipse {
                start: *start,
                end: *current,
            },
            BoardTool::Note => {
                let rect = Rect::from_points(*start, *current);
                ShapeData::Note {
                    position: rect.origin(),
                    width: rect.width().max(MIN_NOTE_WIDTH),
                    height: rect.height().max(MIN_NOTE_HEIGHT),
                    text: String::new(),
                }
            }
            _ => return None,
        };
        Some(
            Element::new(shape)
                .with_color(self.color.clone())
                .with_size(self.size),
        )
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.input.set_modifiers(modifiers);
    }

    pub fn set_tool(&mut self, tool: BoardTool) {
        self.tool = tool;
        self.gesture = Gesture::Idle;
    }

    pub fn tool(&self) -> BoardTool {
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

    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn peers(&self) -> Vec<&Presence> {
        self.collab.peers()
    }

    pub fn is_connected(&self) -> bool {
        self.collab.is_connected()
    }

    pub fn canvas(&self) -> &CanvasInfo {
        &self.canvas
    }
}
