//! Input state tracking for pointer and keyboard events.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    Scroll { position: Point, delta: Vec2 },
    Leave,
}

/// Keyboard event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

const DOUBLE_CLICK_TIME_MS: u128 = 500;
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Tracks pointer state across events: position, held buttons, modifiers,
/// and double-click detection.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Current modifier keys state.
    pub modifiers: Modifiers,
    pressed_buttons: HashSet<MouseButton>,
    last_click: Option<(Instant, Point)>,
    double_click: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            pointer_position: Point::ZERO,
            modifiers: Modifiers::default(),
            pressed_buttons: HashSet::new(),
            last_click: None,
            double_click: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a pointer event. `now` drives double-click timing.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent, now: Instant) {
        match event {
            PointerEvent::Down { position, button } => {
                self.pointer_position = *position;
                self.pressed_buttons.insert(*button);
                if *button == MouseButton::Left {
                    self.detect_double_click(*position, now);
                }
            }
            PointerEvent::Up { position, button } => {
                self.pointer_position = *position;
                self.pressed_buttons.remove(button);
            }
            PointerEvent::Move { position } | PointerEvent::Scroll { position, .. } => {
                self.pointer_position = *position;
            }
            PointerEvent::Leave => {
                self.pressed_buttons.clear();
            }
        }
    }

    fn detect_double_click(&mut self, position: Point, now: Instant) {
        if let Some((last_time, last_pos)) = self.last_click {
            let elapsed = now.duration_since(last_time).as_millis();
            let distance = position.distance(last_pos);
            if elapsed < DOUBLE_CLICK_TIME_MS && distance < DOUBLE_CLICK_DISTANCE {
                self.double_click = true;
                // Reset so a triple click is not a second double-click.
                self.last_click = None;
                return;
            }
        }
        self.last_click = Some((now, position));
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Consume the double-click flag set by the most recent left press.
    pub fn take_double_click(&mut self) -> bool {
        std::mem::take(&mut self.double_click)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn down(pos: Point) -> PointerEvent {
        PointerEvent::Down {
            position: pos,
            button: MouseButton::Left,
        }
    }

    fn up(pos: Point) -> PointerEvent {
        PointerEvent::Up {
            position: pos,
            button: MouseButton::Left,
        }
    }

    #[test]
    fn test_button_tracking() {
        let t0 = Instant::now();
        let mut input = InputState::new();

        input.handle_pointer_event(&down(Point::new(10.0, 10.0)), t0);
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_button_pressed(MouseButton::Middle));

        input.handle_pointer_event(&up(Point::new(10.0, 10.0)), t0);
        assert!(!input.is_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_double_click_detection() {
        let t0 = Instant::now();
        let pos = Point::new(100.0, 100.0);
        let mut input = InputState::new();

        input.handle_pointer_event(&down(pos), t0);
        assert!(!input.take_double_click());
        input.handle_pointer_event(&up(pos), t0);

        input.handle_pointer_event(&down(pos), t0 + Duration::from_millis(200));
        assert!(input.take_double_click());
        // Consumed.
        assert!(!input.take_double_click());
    }

    #[test]
    fn test_double_click_too_slow() {
        let t0 = Instant::now();
        let pos = Point::new(100.0, 100.0);
        let mut input = InputState::new();

        input.handle_pointer_event(&down(pos), t0);
        input.handle_pointer_event(&up(pos), t0);
        input.handle_pointer_event(&down(pos), t0 + Duration::from_millis(600));
        assert!(!input.take_double_click());
    }

    #[test]
    fn test_double_click_too_far() {
        let t0 = Instant::now();
        let mut input = InputState::new();

        input.handle_pointer_event(&down(Point::new(100.0, 100.0)), t0);
        input.handle_pointer_event(&up(Point::new(100.0, 100.0)), t0);
        input.handle_pointer_event(
            &down(Point::new(200.0, 200.0)),
            t0 + Duration::from_millis(100),
        );
        assert!(!input.take_double_click());
    }

    #[test]
    fn test_leave_clears_buttons() {
        let t0 = Instant::now();
        let mut input = InputState::new();

        input.handle_pointer_event(&down(Point::new(0.0, 0.0)), t0);
        input.handle_pointer_event(&PointerEvent::Leave, t0);
        assert!(!input.is_button_pressed(MouseButton::Left));
    }
}
