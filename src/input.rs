//! Input handling.
//!
//! [`Input`] turns raw window events into [`InputAction`]s: discrete commands
//! from the keyboard, and orbit, pan or zoom deltas from the mouse. Every
//! handler returns immediately; nothing here touches the GPU.
//!
//! | Input            | Action                               |
//! |------------------|--------------------------------------|
//! | Space            | toggle simulation                    |
//! | A                | toggle attractor                     |
//! | R                | reset to a uniform cube              |
//! | H / S            | absorb, then form a heart / a star   |
//! | Escape           | quit                                 |
//! | left drag        | orbit                                |
//! | right drag       | pan                                  |
//! | wheel            | zoom                                 |

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::state::ShapeTarget;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn from_winit(btn: WinitMouseButton) -> Option<Self> {
        match btn {
            WinitMouseButton::Left => Some(MouseButton::Left),
            WinitMouseButton::Right => Some(MouseButton::Right),
            WinitMouseButton::Middle => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

/// Discrete requests from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleAnimation,
    ToggleAttractor,
    Reset,
    Form(ShapeTarget),
    Quit,
}

impl Command {
    /// Command bound to `key`, if any.
    pub fn for_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Space => Some(Command::ToggleAnimation),
            KeyCode::KeyA => Some(Command::ToggleAttractor),
            KeyCode::KeyR => Some(Command::Reset),
            KeyCode::KeyH => Some(Command::Form(ShapeTarget::Heart)),
            KeyCode::KeyS => Some(Command::Form(ShapeTarget::Star)),
            KeyCode::Escape => Some(Command::Quit),
            _ => None,
        }
    }
}

/// What a mouse drag currently does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Orbit,
    Pan,
}

/// One thing the application should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    Command(Command),
    /// Pointer delta in pixels while orbiting.
    Orbit(Vec2),
    /// Pointer delta in pixels while panning.
    Pan(Vec2),
    /// Scroll amount in lines, positive away from the user.
    Zoom(f32),
}

/// Pointer and keyboard state between events.
#[derive(Debug, Default)]
pub struct Input {
    left_held: bool,
    right_held: bool,
    last_cursor: Option<Vec2>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drag mode implied by the held buttons. Left wins over right.
    pub fn drag_mode(&self) -> Option<DragMode> {
        if self.left_held {
            Some(DragMode::Orbit)
        } else if self.right_held {
            Some(DragMode::Pan)
        } else {
            None
        }
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return None;
                }
                match event.physical_key {
                    PhysicalKey::Code(key) => self.key_pressed(key),
                    PhysicalKey::Unidentified(_) => None,
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = MouseButton::from_winit(*button) {
                    self.button(button, *state == ElementState::Pressed);
                }
                None
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32))
            }

            WindowEvent::CursorLeft { .. } => {
                self.last_cursor = None;
                None
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll(lines)
            }

            _ => None,
        }
    }

    /// A key went down (repeats already filtered out).
    pub fn key_pressed(&mut self, key: KeyCode) -> Option<InputAction> {
        Command::for_key(key).map(InputAction::Command)
    }

    /// A mouse button changed state.
    pub fn button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left_held = pressed,
            MouseButton::Right => self.right_held = pressed,
            MouseButton::Middle => {}
        }
    }

    /// The cursor moved to `position`. Yields a delta only while dragging.
    pub fn cursor_moved(&mut self, position: Vec2) -> Option<InputAction> {
        let last = self.last_cursor.replace(position)?;
        let delta = position - last;
        match self.drag_mode()? {
            DragMode::Orbit => Some(InputAction::Orbit(delta)),
            DragMode::Pan => Some(InputAction::Pan(delta)),
        }
    }

    /// The wheel turned by `lines`.
    pub fn scroll(&mut self, lines: f32) -> Option<InputAction> {
        (lines != 0.0).then_some(InputAction::Zoom(lines))
    }
}
