//! Keyboard and mouse state between frames.
//!
//! Window events accumulate into [`Input`]; once per frame the control loop
//! reads the shortcut intents and the camera drags, then clears the
//! per-frame state.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::backend::ProjectionMode;
use crate::control::Intent;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl From<WinitMouseButton> for MouseButton {
    fn from(btn: WinitMouseButton) -> Self {
        match btn {
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Left,
        }
    }
}

/// Intent bound to a key, if any.
pub fn shortcut(key: KeyCode) -> Option<Intent> {
    match key {
        KeyCode::KeyU => Some(Intent::Update),
        KeyCode::KeyR => Some(Intent::Restart),
        KeyCode::KeyM => Some(Intent::Projection(ProjectionMode::Monocular)),
        KeyCode::KeyB => Some(Intent::Projection(ProjectionMode::Binocular)),
        KeyCode::KeyE | KeyCode::Escape => Some(Intent::Exit),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct Input {
    keys_pressed: Vec<KeyCode>,
    keys_held: HashSet<KeyCode>,
    mouse_held: HashSet<MouseButton>,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
    scroll_delta: f32,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a key went down since the last frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Cursor movement since the last frame in pixels.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll since the last frame. Positive is up/forward.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Intents for the shortcuts pressed since the last frame, in press order.
    pub fn intents(&self) -> impl Iterator<Item = Intent> + '_ {
        self.keys_pressed.iter().filter_map(|&key| shortcut(key))
    }

    /// Clear per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    /// Drop held keys and buttons, e.g. when a UI widget takes focus.
    pub fn release_all(&mut self) {
        self.keys_held.clear();
        self.mouse_held.clear();
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.key(key, event.state);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let btn = MouseButton::from(*button);
                match state {
                    ElementState::Pressed => {
                        self.mouse_held.insert(btn);
                    }
                    ElementState::Released => {
                        self.mouse_held.remove(&btn);
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => self.mouse_position = None,

            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }

            _ => {}
        }
    }

    fn key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // Key repeat does not re-fire.
                if self.keys_held.insert(key) {
                    self.keys_pressed.push(key);
                }
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    fn cursor(&mut self, position: Vec2) {
        if let Some(last) = self.mouse_position {
            self.mouse_delta += position - last;
        }
        self.mouse_position = Some(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_repeat_fires_once() {
        let mut input = Input::new();
        input.key(KeyCode::KeyU, ElementState::Pressed);
        input.key(KeyCode::KeyU, ElementState::Pressed);
        assert_eq!(input.intents().collect::<Vec<_>>(), vec![Intent::Update]);

        input.begin_frame();
        assert!(input.key_held(KeyCode::KeyU));
        assert!(!input.key_pressed(KeyCode::KeyU));
        assert_eq!(input.intents().count(), 0);
    }

    #[test]
    fn test_shortcuts_keep_press_order() {
        let mut input = Input::new();
        for key in [KeyCode::KeyB, KeyCode::KeyX, KeyCode::KeyR, KeyCode::KeyE] {
            input.key(key, ElementState::Pressed);
        }
        let intents: Vec<Intent> = input.intents().collect();
        assert_eq!(
            intents,
            vec![
                Intent::Projection(ProjectionMode::Binocular),
                Intent::Restart,
                Intent::Exit,
            ]
        );
    }

    #[test]
    fn test_cursor_delta_accumulates() {
        let mut input = Input::new();
        input.cursor(Vec2::new(10.0, 10.0));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        input.cursor(Vec2::new(12.0, 9.0));
        input.cursor(Vec2::new(15.0, 9.0));
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, -1.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_shortcut_map() {
        assert_eq!(shortcut(KeyCode::KeyM), Some(Intent::Projection(ProjectionMode::Monocular)));
        assert_eq!(shortcut(KeyCode::Escape), Some(Intent::Exit));
        assert_eq!(shortcut(KeyCode::Space), None);
    }
}
