//! Keyboard state tracking, decoupled from the windowing layer.
//!
//! The platform layer translates winit key events into [`Key`] values and
//! feeds them through `key_down`/`key_up`. Game code then asks either
//! level-triggered questions (`is_held`, for movement) or edge-triggered
//! ones (`was_pressed`, for toggles), and the loop clears edge state once
//! per tick via `end_frame`.

use std::collections::HashSet;

/// Keys the game reacts to. Everything else is dropped at the platform
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Escape,
    F3,
    F4,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    pressed: HashSet<Key>,
    released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a key-down event. OS key repeat does not re-trigger the edge.
    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    /// Feed a key-up event. A release with no matching press is ignored.
    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// True only on the tick the key went down.
    pub fn was_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    /// True only on the tick the key came back up.
    pub fn was_released(&self, key: Key) -> bool {
        self.released.contains(&key)
    }

    /// Clear edge-triggered state. Called exactly once per tick, after the
    /// update has consumed it.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_sets_held_and_edge() {
        let mut input = InputState::new();
        input.key_down(Key::W);
        assert!(input.is_held(Key::W));
        assert!(input.was_pressed(Key::W));
        assert!(!input.was_released(Key::W));
    }

    #[test]
    fn test_edge_clears_after_end_frame() {
        let mut input = InputState::new();
        input.key_down(Key::D);
        input.end_frame();
        assert!(input.is_held(Key::D));
        assert!(!input.was_pressed(Key::D));
    }

    #[test]
    fn test_repeat_does_not_retrigger_edge() {
        let mut input = InputState::new();
        input.key_down(Key::A);
        input.end_frame();
        input.key_down(Key::A);
        assert!(!input.was_pressed(Key::A));
        assert!(input.is_held(Key::A));
    }

    #[test]
    fn test_release_sets_edge_and_clears_held() {
        let mut input = InputState::new();
        input.key_down(Key::S);
        input.end_frame();
        input.key_up(Key::S);
        assert!(!input.is_held(Key::S));
        assert!(input.was_released(Key::S));
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut input = InputState::new();
        input.key_up(Key::Escape);
        assert!(!input.was_released(Key::Escape));
    }

    #[test]
    fn test_keys_are_tracked_independently() {
        let mut input = InputState::new();
        input.key_down(Key::W);
        input.key_down(Key::A);
        input.key_up(Key::W);
        assert!(!input.is_held(Key::W));
        assert!(input.is_held(Key::A));
    }
}
