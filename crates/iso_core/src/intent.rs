//! Movement intent: turning raw input into a world-space direction.
//!
//! Intent lives on the world axes (east = +x, south = +y; the isometric
//! projection renders north toward the upper right of the screen). Keyboard
//! and gamepad are interchangeable [`IntentSource`]s producing raw, possibly
//! oversized contributions; [`combined_intent`] sums them and normalizes
//! once, so a diagonal, or both devices pushed at once, never moves faster
//! than a single key.

use glam::Vec2;
use std::f32::consts::FRAC_1_SQRT_2;

use crate::input::{InputState, Key};

/// Intent magnitudes below this count as "not moving".
pub const INTENT_EPSILON: f32 = 1e-6;

/// Dot-product margin under which two compass directions count as a tie.
const DIRECTION_TIE_EPSILON: f32 = 1e-6;

/// A producer of raw movement contributions on the world axes.
///
/// Implementors may carry their own device state (the gamepad source owns
/// its gilrs context) and are polled once per tick.
pub trait IntentSource {
    fn sample(&mut self, input: &InputState) -> Vec2;
}

/// WASD mapped to the screen diagonals. Each key pulls toward the world
/// vector whose projection is straight up/down/left/right on screen, so W
/// alone walks toward the top of the window (compass NW), and W+D combine
/// to compass N.
#[derive(Debug, Default)]
pub struct KeyboardSource;

impl IntentSource for KeyboardSource {
    fn sample(&mut self, input: &InputState) -> Vec2 {
        let mut v = Vec2::ZERO;
        if input.is_held(Key::W) {
            v += Vec2::new(-1.0, -1.0); // screen up
        }
        if input.is_held(Key::S) {
            v += Vec2::new(1.0, 1.0); // screen down
        }
        if input.is_held(Key::A) {
            v += Vec2::new(-1.0, 1.0); // screen left
        }
        if input.is_held(Key::D) {
            v += Vec2::new(1.0, -1.0); // screen right
        }
        v
    }
}

/// Sum every source's contribution and normalize to a unit-or-zero vector.
pub fn combined_intent(sources: &mut [&mut dyn IntentSource], input: &InputState) -> Vec2 {
    let mut sum = Vec2::ZERO;
    for source in sources.iter_mut() {
        sum += source.sample(input);
    }
    sum.normalize_or_zero()
}

/// The eight compass directions on the world axes. North is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction8 {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction8 {
    pub const ALL: [Direction8; 8] = [
        Direction8::N,
        Direction8::NE,
        Direction8::E,
        Direction8::SE,
        Direction8::S,
        Direction8::SW,
        Direction8::W,
        Direction8::NW,
    ];

    /// Unit vector for this direction on the world axes.
    pub fn unit(self) -> Vec2 {
        match self {
            Direction8::N => Vec2::new(0.0, -1.0),
            Direction8::NE => Vec2::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
            Direction8::E => Vec2::new(1.0, 0.0),
            Direction8::SE => Vec2::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            Direction8::S => Vec2::new(0.0, 1.0),
            Direction8::SW => Vec2::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            Direction8::W => Vec2::new(-1.0, 0.0),
            Direction8::NW => Vec2::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        }
    }

    /// Lowercase tag used in asset keys ("walk_ne" and friends).
    pub fn tag(self) -> &'static str {
        match self {
            Direction8::N => "n",
            Direction8::NE => "ne",
            Direction8::E => "e",
            Direction8::SE => "se",
            Direction8::S => "s",
            Direction8::SW => "sw",
            Direction8::W => "w",
            Direction8::NW => "nw",
        }
    }

    /// Nearest compass direction to `v`. Near-ties keep `previous`, so an
    /// intent wobbling on a sector boundary cannot flicker between
    /// neighbors frame to frame. A ~zero vector also keeps `previous`.
    pub fn from_vec(v: Vec2, previous: Direction8) -> Direction8 {
        let n = v.normalize_or_zero();
        if n.length_squared() < INTENT_EPSILON {
            return previous;
        }
        let mut best = previous;
        let mut best_dot = previous.unit().dot(n);
        for dir in Direction8::ALL {
            let d = dir.unit().dot(n);
            if d > best_dot + DIRECTION_TIE_EPSILON {
                best = dir;
                best_dot = d;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed contribution, standing in for a real device.
    struct ConstSource(Vec2);

    impl IntentSource for ConstSource {
        fn sample(&mut self, _input: &InputState) -> Vec2 {
            self.0
        }
    }

    fn keyboard_intent(held: &[Key]) -> Vec2 {
        let mut input = InputState::new();
        for &key in held {
            input.key_down(key);
        }
        let mut keyboard = KeyboardSource;
        combined_intent(&mut [&mut keyboard], &input)
    }

    #[test]
    fn test_single_key_walks_a_screen_diagonal() {
        let v = keyboard_intent(&[Key::W]);
        assert!((v - Vec2::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2)).length() < 1e-6);
    }

    #[test]
    fn test_key_pair_snaps_to_compass_axis() {
        // W+D is straight up-right on screen, i.e. compass north.
        let v = keyboard_intent(&[Key::W, Key::D]);
        assert!((v - Vec2::new(0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        assert_eq!(keyboard_intent(&[Key::W, Key::S]), Vec2::ZERO);
        assert_eq!(keyboard_intent(&[Key::A, Key::D]), Vec2::ZERO);
    }

    #[test]
    fn test_intent_is_never_longer_than_unit() {
        for held in [
            vec![Key::W],
            vec![Key::D],
            vec![Key::W, Key::D],
            vec![Key::W, Key::A, Key::D],
        ] {
            let v = keyboard_intent(&held);
            assert!(v.length() <= 1.0 + 1e-6, "held {held:?} gave {v:?}");
        }
    }

    #[test]
    fn test_sources_sum_before_normalizing() {
        let input = InputState::new();
        let mut a = ConstSource(Vec2::new(1.0, 0.0));
        let mut b = ConstSource(Vec2::new(1.0, 0.0));
        let v = combined_intent(&mut [&mut a, &mut b], &input);
        assert!((v - Vec2::new(1.0, 0.0)).length() < 1e-6);

        let mut c = ConstSource(Vec2::new(1.0, 0.0));
        let mut d = ConstSource(Vec2::new(0.0, 1.0));
        let v = combined_intent(&mut [&mut c, &mut d], &input);
        assert!((v.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_direction_from_vec_hits_all_eight() {
        for dir in Direction8::ALL {
            let got = Direction8::from_vec(dir.unit() * 2.5, Direction8::S);
            assert_eq!(got, dir);
        }
    }

    #[test]
    fn test_direction_tie_prefers_previous() {
        // Exactly between N and NE.
        let between = (Direction8::N.unit() + Direction8::NE.unit()).normalize();
        assert_eq!(Direction8::from_vec(between, Direction8::N), Direction8::N);
        assert_eq!(Direction8::from_vec(between, Direction8::NE), Direction8::NE);
    }

    #[test]
    fn test_direction_zero_vec_keeps_previous() {
        assert_eq!(
            Direction8::from_vec(Vec2::ZERO, Direction8::SW),
            Direction8::SW
        );
    }

    #[test]
    fn test_direction_clear_winner_beats_previous() {
        assert_eq!(
            Direction8::from_vec(Vec2::new(1.0, 0.05), Direction8::W),
            Direction8::E
        );
    }
}
