use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphanumeric() => {
                Some(Self::Character(ch.to_ascii_uppercase()))
            }
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Escape" | "Esc" => Escape,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Keys the frame driver and camera controller care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Escape,
    LeftShift,
    RightShift,
    LeftCtrl,
}

/// Keys read by the free-fly camera controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
    pub boost: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::Character('W'),
            back: KeyCode::Character('S'),
            left: KeyCode::Character('A'),
            right: KeyCode::Character('D'),
            up: KeyCode::Character('E'),
            down: KeyCode::Character('Q'),
            boost: KeyCode::Named(NamedKey::LeftShift),
        }
    }
}

/// Snapshot of held keys and accumulated mouse motion for one frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    mouse_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn add_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Clears per-frame accumulators. Held keys survive.
    pub fn begin_frame(&mut self) {
        self.mouse_delta = Vec2::ZERO;
    }
}

/// Platform input pump polled once at the start of each frame.
pub trait InputSource {
    fn poll(&mut self, state: &mut InputState);
}

/// Input source for headless runs; leaves the state untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInput;

impl InputSource for NullInput {
    fn poll(&mut self, _state: &mut InputState) {}
}

/// Replays a fixed list of key presses keyed by frame index.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frame: u64,
    events: Vec<(u64, KeyCode, bool)>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `key` to go down (`pressed = true`) or up on `frame`.
    pub fn push(mut self, frame: u64, key: KeyCode, pressed: bool) -> Self {
        self.events.push((frame, key, pressed));
        self
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, state: &mut InputState) {
        for (frame, key, pressed) in &self.events {
            if *frame != self.frame {
                continue;
            }
            if *pressed {
                state.set_key_down(*key);
            } else {
                state.set_key_up(*key);
            }
        }
        self.frame += 1;
    }
}
