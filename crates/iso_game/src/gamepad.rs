//! Gamepad movement intent via gilrs.
//!
//! The left stick is quantized to eight 45-degree sectors, and each sector
//! contributes the same world vector as the matching WASD combination, so
//! pad and keyboard walk identically. Stick magnitude only gates the
//! deadzone; there is no analog walk speed.

use gilrs::{Axis, Gilrs};
use glam::Vec2;
use iso_core::input::InputState;
use iso_core::intent::IntentSource;

/// Stick magnitude below this is ignored entirely.
pub const STICK_DEADZONE: f32 = 0.4;

pub struct GamepadSource {
    gilrs: Option<Gilrs>,
    /// Diagnostics for the debug overlay, refreshed on every sample.
    pub angle_deg: f32,
    pub magnitude: f32,
}

impl GamepadSource {
    /// Initialize gilrs. Failure (no backend, sandboxed device access) is
    /// downgraded to a keyboard-only session with a warning.
    pub fn new() -> Self {
        let gilrs = match Gilrs::new() {
            Ok(gilrs) => Some(gilrs),
            Err(e) => {
                log::warn!("Gamepad support unavailable: {e}");
                None
            }
        };
        Self {
            gilrs,
            angle_deg: 0.0,
            magnitude: 0.0,
        }
    }

    pub fn connected(&self) -> bool {
        self.gilrs
            .as_ref()
            .is_some_and(|g| g.gamepads().next().is_some())
    }

    /// Raw left stick of the first connected pad, y positive at stick-up.
    fn left_stick(&self) -> Vec2 {
        let Some(gilrs) = self.gilrs.as_ref() else {
            return Vec2::ZERO;
        };
        let Some((_, pad)) = gilrs.gamepads().next() else {
            return Vec2::ZERO;
        };
        Vec2::new(pad.value(Axis::LeftStickX), pad.value(Axis::LeftStickY))
    }
}

impl Default for GamepadSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentSource for GamepadSource {
    fn sample(&mut self, _input: &InputState) -> Vec2 {
        if let Some(gilrs) = self.gilrs.as_mut() {
            // Drain the queue so the state queries below see current values.
            while gilrs.next_event().is_some() {}
        }
        let stick = self.left_stick();
        self.magnitude = stick.length();
        self.angle_deg = stick_angle_deg(stick);
        snap_to_sector(stick, STICK_DEADZONE)
    }
}

/// Stick angle in degrees: 0 at stick-up, growing clockwise, in [0, 360).
pub fn stick_angle_deg(stick: Vec2) -> f32 {
    stick.x.atan2(stick.y).to_degrees().rem_euclid(360.0)
}

/// Snap a raw stick vector to one of eight 45-degree sectors and return
/// that sector's world contribution, or zero inside the deadzone.
///
/// Stick-up means screen-up, the same world diagonal the W key pulls, and
/// the diagonal sectors mirror two-key sums so the vectors stay on the
/// same scale whichever device produced them.
pub fn snap_to_sector(stick: Vec2, deadzone: f32) -> Vec2 {
    if stick.length() < deadzone {
        return Vec2::ZERO;
    }
    let angle = stick_angle_deg(stick);
    let sector = ((angle + 22.5) / 45.0).floor() as i32 % 8;
    match sector {
        0 => Vec2::new(-1.0, -1.0), // up
        1 => Vec2::new(0.0, -2.0),  // up-right
        2 => Vec2::new(1.0, -1.0),  // right
        3 => Vec2::new(2.0, 0.0),   // down-right
        4 => Vec2::new(1.0, 1.0),   // down
        5 => Vec2::new(0.0, 2.0),   // down-left
        6 => Vec2::new(-1.0, 1.0),  // left
        _ => Vec2::new(-2.0, 0.0),  // up-left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stick_at_angle(angle_deg: f32) -> Vec2 {
        let rad = angle_deg.to_radians();
        Vec2::new(rad.sin(), rad.cos())
    }

    #[test]
    fn test_stick_angle_cardinals() {
        assert!((stick_angle_deg(Vec2::new(0.0, 1.0)) - 0.0).abs() < 1e-4);
        assert!((stick_angle_deg(Vec2::new(1.0, 0.0)) - 90.0).abs() < 1e-4);
        assert!((stick_angle_deg(Vec2::new(0.0, -1.0)) - 180.0).abs() < 1e-4);
        assert!((stick_angle_deg(Vec2::new(-1.0, 0.0)) - 270.0).abs() < 1e-4);
    }

    #[test]
    fn test_deadzone_zeroes_small_input() {
        assert_eq!(snap_to_sector(Vec2::new(0.2, 0.2), STICK_DEADZONE), Vec2::ZERO);
        assert_eq!(snap_to_sector(Vec2::new(0.0, 0.39), STICK_DEADZONE), Vec2::ZERO);
        // Just past the deadzone snaps normally.
        assert_eq!(
            snap_to_sector(Vec2::new(0.0, 0.41), STICK_DEADZONE),
            Vec2::new(-1.0, -1.0)
        );
    }

    #[test]
    fn test_cardinal_sectors_match_single_keys() {
        assert_eq!(snap_to_sector(stick_at_angle(0.0), 0.4), Vec2::new(-1.0, -1.0));
        assert_eq!(snap_to_sector(stick_at_angle(90.0), 0.4), Vec2::new(1.0, -1.0));
        assert_eq!(snap_to_sector(stick_at_angle(180.0), 0.4), Vec2::new(1.0, 1.0));
        assert_eq!(snap_to_sector(stick_at_angle(270.0), 0.4), Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn test_diagonal_sectors_match_key_pairs() {
        assert_eq!(snap_to_sector(stick_at_angle(45.0), 0.4), Vec2::new(0.0, -2.0));
        assert_eq!(snap_to_sector(stick_at_angle(135.0), 0.4), Vec2::new(2.0, 0.0));
        assert_eq!(snap_to_sector(stick_at_angle(225.0), 0.4), Vec2::new(0.0, 2.0));
        assert_eq!(snap_to_sector(stick_at_angle(315.0), 0.4), Vec2::new(-2.0, 0.0));
    }

    #[test]
    fn test_sector_wraps_around_north() {
        // Both sides of 0 degrees land in the same up sector.
        assert_eq!(snap_to_sector(stick_at_angle(350.0), 0.4), Vec2::new(-1.0, -1.0));
        assert_eq!(snap_to_sector(stick_at_angle(10.0), 0.4), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn test_sector_boundaries() {
        // 22.5 degrees is the first boundary; at and past it the up-right
        // sector wins.
        assert_eq!(snap_to_sector(stick_at_angle(22.6), 0.4), Vec2::new(0.0, -2.0));
        assert_eq!(snap_to_sector(stick_at_angle(22.4), 0.4), Vec2::new(-1.0, -1.0));
    }
}
