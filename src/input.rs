use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::controls::PointerState;

/// Pixels per wheel line for touchpads reporting pixel deltas
const PIXELS_PER_LINE: f32 = 40.0;

/// Adapter that turns winit pointer events into per-frame orbit input
#[derive(Debug, Clone, Default)]
pub struct WinitPointer {
    rotate_down: bool,
    pan_down: bool,
    /// Current cursor position (relative to window)
    position: Option<(f32, f32)>,
    pending: PointerState,
}

impl WinitPointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a winit WindowEvent and update internal state
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.set_button(*button, *state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.move_to(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => {
                self.position = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.pending.scroll += lines;
            }
            _ => {}
        }
    }

    fn set_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.rotate_down = pressed,
            MouseButton::Right | MouseButton::Middle => self.pan_down = pressed,
            _ => {}
        }
    }

    fn move_to(&mut self, x: f32, y: f32) {
        if let Some((old_x, old_y)) = self.position {
            let delta = (x - old_x, y - old_y);
            if self.rotate_down {
                self.pending.rotate.0 += delta.0;
                self.pending.rotate.1 += delta.1;
            } else if self.pan_down {
                self.pending.pan.0 += delta.0;
                self.pending.pan.1 += delta.1;
            }
        }
        self.position = Some((x, y));
    }

    /// Take the input accumulated since the last call
    pub fn take(&mut self) -> PointerState {
        std::mem::take(&mut self.pending)
    }

    pub fn position(&self) -> Option<(f32, f32)> {
        self.position
    }
}
