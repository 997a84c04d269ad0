//! Maps raw input state to camera and fractal controls.

use raymarch_platform::{Action, InputState, MouseButton};
use raymarch_scene::CameraInput;

/// Builds this frame's camera input from held keys, key-down events and
/// the mouse drag accumulated since the last frame.
///
/// Looking only happens while the left mouse button is held.
pub fn camera_input(input: &InputState) -> CameraInput {
    let look_delta = if input.is_mouse_pressed(MouseButton::Left) {
        input.mouse_delta()
    } else {
        (0.0, 0.0)
    };

    let growth_steps = input.action_press_count(Action::IncreaseGrowth) as i32
        - input.action_press_count(Action::DecreaseGrowth) as i32;

    CameraInput {
        vertical: input.axis(Action::MoveForward, Action::MoveBackward),
        // The camera's right vector points to the viewer's left, so A is +1.
        horizontal: input.axis(Action::StrafeLeft, Action::StrafeRight),
        elevation: input.axis(Action::Ascend, Action::Descend),
        slow_motion: input.is_action_held(Action::SlowMotion),
        look_delta,
        growth_steps,
    }
}

/// Clears per-frame input once a frame has used it.
///
/// A frame that was never submitted leaves key-down events and mouse drag
/// in place for the next one, so growth steps are not lost.
pub fn end_frame(input: &mut InputState, frame_rendered: bool) {
    if frame_rendered {
        input.begin_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raymarch_platform::KeyCode;

    #[test]
    fn test_idle_input() {
        let input = InputState::new();
        assert_eq!(camera_input(&input), CameraInput::default());
    }

    #[test]
    fn test_movement_axes() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW, false);
        input.on_key_pressed(KeyCode::KeyA, false);
        input.on_key_pressed(KeyCode::KeyQ, false);
        input.on_key_pressed(KeyCode::ShiftLeft, false);

        let controls = camera_input(&input);
        assert_eq!(controls.vertical, 1.0);
        assert_eq!(controls.horizontal, 1.0);
        assert_eq!(controls.elevation, -1.0);
        assert!(controls.slow_motion);
    }

    #[test]
    fn test_opposing_movement_keys() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyS, false);
        input.on_key_pressed(KeyCode::KeyW, false);
        input.on_key_pressed(KeyCode::KeyD, false);
        input.on_key_pressed(KeyCode::KeyA, false);
        let controls = camera_input(&input);
        assert_eq!(controls.vertical, 1.0);
        assert_eq!(controls.horizontal, 1.0);

        input.on_key_released(KeyCode::KeyW);
        assert_eq!(camera_input(&input).vertical, -1.0);
    }

    #[test]
    fn test_ascend_wins_over_descend() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyQ, false);
        input.on_key_pressed(KeyCode::KeyE, false);
        assert_eq!(camera_input(&input).elevation, 1.0);
    }

    #[test]
    fn test_growth_counts_repeats() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::ArrowRight, false);
        input.on_key_pressed(KeyCode::ArrowRight, true);
        input.on_key_pressed(KeyCode::ArrowRight, true);
        input.on_key_pressed(KeyCode::ArrowLeft, false);
        assert_eq!(camera_input(&input).growth_steps, 2);

        input.begin_frame();
        assert_eq!(camera_input(&input).growth_steps, 0);
    }

    #[test]
    fn test_look_requires_left_button() {
        let mut input = InputState::new();
        input.on_mouse_moved(100.0, 100.0);
        input.on_mouse_pressed(MouseButton::Right);
        input.on_mouse_moved(110.0, 95.0);
        assert_eq!(camera_input(&input).look_delta, (0.0, 0.0));
    }

    #[test]
    fn test_motion_before_left_press_is_not_look() {
        let mut input = InputState::new();
        input.on_mouse_moved(100.0, 100.0);
        input.on_mouse_moved(400.0, 100.0);
        input.on_mouse_pressed(MouseButton::Left);
        assert_eq!(camera_input(&input).look_delta, (0.0, 0.0));

        input.on_mouse_moved(410.0, 95.0);
        assert_eq!(camera_input(&input).look_delta, (10.0, -5.0));
    }

    #[test]
    fn test_dropped_frame_keeps_input() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::ArrowRight, false);
        input.on_mouse_moved(0.0, 0.0);
        input.on_mouse_pressed(MouseButton::Left);
        input.on_mouse_moved(8.0, 2.0);

        end_frame(&mut input, false);
        let controls = camera_input(&input);
        assert_eq!(controls.growth_steps, 1);
        assert_eq!(controls.look_delta, (8.0, 2.0));

        end_frame(&mut input, true);
        let controls = camera_input(&input);
        assert_eq!(controls.growth_steps, 0);
        assert_eq!(controls.look_delta, (0.0, 0.0));
    }
}
