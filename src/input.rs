use crate::camera::DevicePose;
use glam::{Quat, Vec2};
use std::collections::HashMap;
use std::fmt;

/// Controllers the host may report; indices outside this range are ignored.
pub const MAX_CONTROLLERS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Pointer,
    Controller(u8),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Pointer => f.write_str("pointer"),
            InputSource::Controller(index) => write!(f, "controller-{index}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Start,
    End,
}

/// What a gesture edge asks for. Pointer presses both toggle the label and squeeze;
/// controllers split the two across their select and squeeze buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    Grab,
    Select,
    Squeeze,
}

impl GestureAction {
    pub fn toggles_label(self) -> bool {
        matches!(self, GestureAction::Grab | GestureAction::Select)
    }

    pub fn squeezes(self) -> bool {
        matches!(self, GestureAction::Grab | GestureAction::Squeeze)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGesture {
    pub source: InputSource,
    pub phase: GesturePhase,
    pub action: GestureAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Desktop,
    Immersive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Cursor position in viewport pixels.
    PointerMove { x: f32, y: f32 },
    PointerButton { pressed: bool },
    ControllerPose { index: u8, pose: DevicePose },
    ControllerSelect { index: u8, pressed: bool },
    ControllerSqueeze { index: u8, pressed: bool },
    /// Thumbstick axes for this frame.
    ControllerAxes { index: u8, axes: Vec2 },
    HeadOrientation { rotation: Quat },
    Session { mode: SessionMode },
}

/// Host-facing input state. Callbacks only record intent here; nothing touches the scene
/// until the next tick drains it.
#[derive(Default)]
pub struct Input {
    gestures: Vec<InputGesture>,
    cursor_pos: Option<Vec2>,
    pointer_down: bool,
    poses: HashMap<u8, DevicePose>,
    axes: HashMap<u8, Vec2>,
    head: Option<Quat>,
    mode: SessionMode,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::PointerMove { x, y } => {
                if x.is_finite() && y.is_finite() {
                    self.cursor_pos = Some(Vec2::new(x, y));
                } else {
                    log::debug!("[input] ignoring non-finite pointer position ({x}, {y})");
                }
            }
            InputEvent::PointerButton { pressed } => {
                if pressed == self.pointer_down {
                    return;
                }
                self.pointer_down = pressed;
                self.push_gesture(InputSource::Pointer, pressed, GestureAction::Grab);
            }
            InputEvent::ControllerPose { index, pose } => {
                if Self::known_controller(index) && pose.is_finite() {
                    self.poses.insert(index, pose);
                }
            }
            InputEvent::ControllerSelect { index, pressed } => {
                if Self::known_controller(index) {
                    self.push_gesture(InputSource::Controller(index), pressed, GestureAction::Select);
                }
            }
            InputEvent::ControllerSqueeze { index, pressed } => {
                if Self::known_controller(index) {
                    self.push_gesture(InputSource::Controller(index), pressed, GestureAction::Squeeze);
                }
            }
            InputEvent::ControllerAxes { index, axes } => {
                if Self::known_controller(index) && axes.is_finite() {
                    self.axes.insert(index, axes);
                }
            }
            InputEvent::HeadOrientation { rotation } => {
                if rotation.is_finite() {
                    self.head = Some(rotation.normalize());
                }
            }
            InputEvent::Session { mode } => {
                self.mode = mode;
                if mode == SessionMode::Desktop {
                    self.axes.clear();
                }
            }
        }
    }

    fn known_controller(index: u8) -> bool {
        if index < MAX_CONTROLLERS {
            true
        } else {
            log::debug!("[input] ignoring unknown controller index {index}");
            false
        }
    }

    fn push_gesture(&mut self, source: InputSource, pressed: bool, action: GestureAction) {
        let phase = if pressed { GesturePhase::Start } else { GesturePhase::End };
        self.gestures.push(InputGesture { source, phase, action });
    }

    /// Hands every buffered gesture to the tick, in arrival order.
    pub fn take_gestures(&mut self) -> Vec<InputGesture> {
        std::mem::take(&mut self.gestures)
    }

    /// Thumbstick axes are per-frame samples; the tick consumes them.
    pub fn take_axes(&mut self) -> Vec<(u8, Vec2)> {
        let mut axes: Vec<_> = self.axes.drain().collect();
        axes.sort_by_key(|(index, _)| *index);
        axes
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_pos
    }

    pub fn controller_pose(&self, index: u8) -> Option<&DevicePose> {
        self.poses.get(&index)
    }

    pub fn head_orientation(&self) -> Option<Quat> {
        self.head
    }

    pub fn session_mode(&self) -> SessionMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_press_and_release_buffer_grab_gestures() {
        let mut input = Input::new();
        input.push(InputEvent::PointerButton { pressed: true });
        input.push(InputEvent::PointerButton { pressed: true });
        input.push(InputEvent::PointerButton { pressed: false });
        let gestures = input.take_gestures();
        assert_eq!(gestures.len(), 2, "repeated press without release is not a new edge");
        assert_eq!(gestures[0].phase, GesturePhase::Start);
        assert_eq!(gestures[1].phase, GesturePhase::End);
        assert!(gestures.iter().all(|g| g.source == InputSource::Pointer && g.action == GestureAction::Grab));
        assert!(input.take_gestures().is_empty(), "gestures never survive a drain");
    }

    #[test]
    fn malformed_pointer_and_unknown_controllers_are_ignored() {
        let mut input = Input::new();
        input.push(InputEvent::PointerMove { x: 10.0, y: 20.0 });
        input.push(InputEvent::PointerMove { x: f32::NAN, y: 5.0 });
        assert_eq!(input.cursor_position(), Some(Vec2::new(10.0, 20.0)));

        input.push(InputEvent::ControllerSqueeze { index: 7, pressed: true });
        input.push(InputEvent::ControllerAxes { index: 9, axes: Vec2::ONE });
        assert!(input.take_gestures().is_empty());
        assert!(input.take_axes().is_empty());
    }

    #[test]
    fn controller_buttons_map_to_actions() {
        let mut input = Input::new();
        input.push(InputEvent::ControllerSelect { index: 0, pressed: true });
        input.push(InputEvent::ControllerSqueeze { index: 1, pressed: true });
        let gestures = input.take_gestures();
        assert_eq!(gestures[0].action, GestureAction::Select);
        assert!(gestures[0].action.toggles_label() && !gestures[0].action.squeezes());
        assert_eq!(gestures[1].source, InputSource::Controller(1));
        assert!(gestures[1].action.squeezes() && !gestures[1].action.toggles_label());
    }
}
