//! Keyboard and mouse input state plus the demo's key bindings.

use std::collections::{HashMap, HashSet};

pub use winit::keyboard::KeyCode;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

impl From<winit::event::MouseButton> for MouseButton {
    fn from(button: winit::event::MouseButton) -> Self {
        match button {
            winit::event::MouseButton::Left => MouseButton::Left,
            winit::event::MouseButton::Right => MouseButton::Right,
            winit::event::MouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Other,
        }
    }
}

/// Logical actions the demo responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,
    Ascend,
    Descend,
    SlowMotion,
    IncreaseGrowth,
    DecreaseGrowth,
    Quit,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::MoveForward,
        Action::MoveBackward,
        Action::StrafeLeft,
        Action::StrafeRight,
        Action::Ascend,
        Action::Descend,
        Action::SlowMotion,
        Action::IncreaseGrowth,
        Action::DecreaseGrowth,
        Action::Quit,
    ];

    /// The physical key bound to this action.
    pub const fn key(self) -> KeyCode {
        match self {
            Action::MoveForward => KeyCode::KeyW,
            Action::MoveBackward => KeyCode::KeyS,
            Action::StrafeLeft => KeyCode::KeyA,
            Action::StrafeRight => KeyCode::KeyD,
            Action::Ascend => KeyCode::KeyE,
            Action::Descend => KeyCode::KeyQ,
            Action::SlowMotion => KeyCode::ShiftLeft,
            Action::IncreaseGrowth => KeyCode::ArrowRight,
            Action::DecreaseGrowth => KeyCode::ArrowLeft,
            Action::Quit => KeyCode::Escape,
        }
    }

    /// Reverse lookup of [`Action::key`].
    pub fn from_key(key: KeyCode) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.key() == key)
    }
}

/// Tracks the current state of keyboard and mouse input.
///
/// Per-frame fields (press counts, mouse drag) accumulate every event
/// received since the last [`InputState::begin_frame`]. Cursor movement
/// only counts as drag while a mouse button is held.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently held keys
    pressed_keys: HashSet<KeyCode>,
    /// Key-down events this frame, auto-repeat included
    press_counts: HashMap<KeyCode, u32>,

    pressed_buttons: HashSet<MouseButton>,

    /// `None` until the first cursor event
    mouse_position: Option<(f32, f32)>,
    /// Movement made with a button held
    mouse_delta: (f32, f32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call after the frame has consumed it.
    pub fn begin_frame(&mut self) {
        self.press_counts.clear();
        self.mouse_delta = (0.0, 0.0);
    }

    /// Handle a key-down event. `repeat` marks OS auto-repeat.
    pub fn on_key_pressed(&mut self, key: KeyCode, repeat: bool) {
        if !self.pressed_keys.insert(key) && !repeat {
            return;
        }
        *self.press_counts.entry(key).or_insert(0) += 1;
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    /// The first button to go down anchors a new drag at the cursor.
    pub fn on_mouse_pressed(&mut self, button: MouseButton) {
        if self.pressed_buttons.is_empty() {
            self.mouse_delta = (0.0, 0.0);
        }
        self.pressed_buttons.insert(button);
    }

    pub fn on_mouse_released(&mut self, button: MouseButton) {
        self.pressed_buttons.remove(&button);
    }

    /// Handle cursor movement in window pixels.
    pub fn on_mouse_moved(&mut self, x: f32, y: f32) {
        if let Some((old_x, old_y)) = self.mouse_position
            && !self.pressed_buttons.is_empty()
        {
            self.mouse_delta.0 += x - old_x;
            self.mouse_delta.1 += y - old_y;
        }
        self.mouse_position = Some((x, y));
    }

    /// Drop all held keys and buttons, e.g. when focus is lost.
    pub fn release_all(&mut self) {
        self.pressed_keys.clear();
        self.pressed_buttons.clear();
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Number of key-down events for `key` this frame.
    pub fn press_count(&self, key: KeyCode) -> u32 {
        self.press_counts.get(&key).copied().unwrap_or(0)
    }

    pub fn is_action_held(&self, action: Action) -> bool {
        self.is_key_pressed(action.key())
    }

    pub fn action_press_count(&self, action: Action) -> u32 {
        self.press_count(action.key())
    }

    /// +1 when `positive` is held, -1 when only `negative` is held, else 0.
    pub fn axis(&self, positive: Action, negative: Action) -> f32 {
        if self.is_action_held(positive) {
            1.0
        } else if self.is_action_held(negative) {
            -1.0
        } else {
            0.0
        }
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn mouse_position(&self) -> Option<(f32, f32)> {
        self.mouse_position
    }

    /// Drag accumulated since the last `begin_frame`.
    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings_roundtrip() {
        for action in Action::ALL {
            assert_eq!(Action::from_key(action.key()), Some(action));
        }
        assert_eq!(Action::from_key(KeyCode::KeyZ), None);
    }

    #[test]
    fn test_press_counts_include_repeats() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::ArrowRight, false);
        input.on_key_pressed(KeyCode::ArrowRight, true);
        input.on_key_pressed(KeyCode::ArrowRight, true);
        assert_eq!(input.action_press_count(Action::IncreaseGrowth), 3);

        input.begin_frame();
        assert_eq!(input.press_count(KeyCode::ArrowRight), 0);
        assert!(input.is_key_pressed(KeyCode::ArrowRight));
    }

    #[test]
    fn test_duplicate_press_without_repeat_is_ignored() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW, false);
        input.on_key_pressed(KeyCode::KeyW, false);
        assert_eq!(input.press_count(KeyCode::KeyW), 1);
    }

    #[test]
    fn test_axis_positive_wins() {
        let mut input = InputState::new();
        assert_eq!(input.axis(Action::Ascend, Action::Descend), 0.0);

        input.on_key_pressed(KeyCode::KeyQ, false);
        assert_eq!(input.axis(Action::Ascend, Action::Descend), -1.0);

        input.on_key_pressed(KeyCode::KeyE, false);
        assert_eq!(input.axis(Action::Ascend, Action::Descend), 1.0);

        input.on_key_released(KeyCode::KeyE);
        assert_eq!(input.axis(Action::Ascend, Action::Descend), -1.0);
    }

    #[test]
    fn test_mouse_delta_accumulates() {
        let mut input = InputState::new();
        input.on_mouse_moved(100.0, 100.0);
        input.on_mouse_pressed(MouseButton::Left);
        assert_eq!(input.mouse_delta(), (0.0, 0.0));

        input.on_mouse_moved(104.0, 98.0);
        input.on_mouse_moved(110.0, 97.0);
        assert_eq!(input.mouse_delta(), (10.0, -3.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), (0.0, 0.0));
        assert_eq!(input.mouse_position(), Some((110.0, 97.0)));
    }

    #[test]
    fn test_hover_before_press_is_not_drag() {
        let mut input = InputState::new();
        input.on_mouse_moved(100.0, 100.0);
        input.on_mouse_moved(400.0, 100.0);
        assert_eq!(input.mouse_delta(), (0.0, 0.0));

        input.on_mouse_pressed(MouseButton::Left);
        assert_eq!(input.mouse_delta(), (0.0, 0.0));

        input.on_mouse_moved(405.0, 90.0);
        assert_eq!(input.mouse_delta(), (5.0, -10.0));
    }

    #[test]
    fn test_drag_stops_on_release() {
        let mut input = InputState::new();
        input.on_mouse_moved(0.0, 0.0);
        input.on_mouse_pressed(MouseButton::Right);
        input.on_mouse_moved(3.0, 4.0);
        input.on_mouse_released(MouseButton::Right);
        input.on_mouse_moved(50.0, 50.0);
        assert_eq!(input.mouse_delta(), (3.0, 4.0));
    }

    #[test]
    fn test_release_all() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyA, false);
        input.on_mouse_pressed(MouseButton::Left);
        input.release_all();
        assert!(!input.is_key_pressed(KeyCode::KeyA));
        assert!(!input.is_mouse_pressed(MouseButton::Left));
    }
}
