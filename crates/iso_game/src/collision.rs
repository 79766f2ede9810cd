//! Swept AABB collision resolution.
//!
//! Movement resolves one axis at a time: x first, then y from the
//! x-resolved position, which is what lets a diagonal push slide along a
//! wall. A blocked axis is zeroed outright rather than clamped to the
//! contact point. The overlap test runs against the territory the box
//! would sweep through, so a large delta cannot tunnel through a thin
//! obstacle.

use glam::Vec2;
use serde::Deserialize;

/// Axis-aligned box in world units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn from_center(center: Vec2, half_w: f32, half_h: f32) -> Self {
        Self {
            min_x: center.x - half_w,
            min_y: center.y - half_h,
            max_x: center.x + half_w,
            max_y: center.y + half_h,
        }
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// Grow the box outward by `dx` and `dy` on each side.
    pub fn expanded(&self, dx: f32, dy: f32) -> Self {
        Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// Non-strict overlap test: boxes sharing only an edge still count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Territory entered moving `dx` along x: everything between the
    /// leading face and the translated leading face. Excludes the box's
    /// own footprint, so a box resting against a wall can still move away
    /// from it.
    fn entered_x(&self, dx: f32) -> Aabb {
        if dx >= 0.0 {
            Aabb { min_x: self.max_x, max_x: self.max_x + dx, ..*self }
        } else {
            Aabb { min_x: self.min_x + dx, max_x: self.min_x, ..*self }
        }
    }

    fn entered_y(&self, dy: f32) -> Aabb {
        if dy >= 0.0 {
            Aabb { min_y: self.max_y, max_y: self.max_y + dy, ..*self }
        } else {
            Aabb { min_y: self.min_y + dy, max_y: self.min_y, ..*self }
        }
    }
}

/// Outcome of [`resolve_move`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMove {
    /// The delta actually allowed. Each axis is either the request or zero.
    pub delta: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

impl ResolvedMove {
    pub fn blocked(&self) -> bool {
        self.blocked_x || self.blocked_y
    }
}

/// Resolve a requested `delta` for a box moving through `solids`.
///
/// A zero delta short-circuits: no overlap tests run and nothing is
/// reported blocked.
pub fn resolve_move(start: Aabb, delta: Vec2, solids: &[Aabb]) -> ResolvedMove {
    if delta == Vec2::ZERO {
        return ResolvedMove {
            delta: Vec2::ZERO,
            blocked_x: false,
            blocked_y: false,
        };
    }

    let mut accepted = Vec2::ZERO;
    let mut blocked_x = false;
    let mut blocked_y = false;

    if delta.x != 0.0 {
        let swept = start.entered_x(delta.x);
        if solids.iter().any(|s| swept.overlaps(s)) {
            blocked_x = true;
            log::trace!("Move blocked on x (delta {:.4})", delta.x);
        } else {
            accepted.x = delta.x;
        }
    }

    if delta.y != 0.0 {
        let moved = start.translated(accepted.x, 0.0);
        let swept = moved.entered_y(delta.y);
        if solids.iter().any(|s| swept.overlaps(s)) {
            blocked_y = true;
            log::trace!("Move blocked on y (delta {:.4})", delta.y);
        } else {
            accepted.y = delta.y;
        }
    }

    ResolvedMove {
        delta: accepted,
        blocked_x,
        blocked_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_box_at(x: f32, y: f32) -> Aabb {
        Aabb::from_center(Vec2::new(x, y), 0.125, 0.125)
    }

    fn tile_box(gx: f32, gy: f32) -> Aabb {
        Aabb {
            min_x: gx,
            min_y: gy,
            max_x: gx + 1.0,
            max_y: gy + 1.0,
        }
    }

    #[test]
    fn test_overlap_counts_touching_edges() {
        let a = tile_box(0.0, 0.0);
        let b = tile_box(1.0, 0.0);
        let c = tile_box(2.5, 0.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_zero_delta_short_circuits() {
        // Even a solid overlapping the start box reports nothing when the
        // delta is zero.
        let start = player_box_at(5.0, 5.0);
        let solids = [tile_box(4.5, 4.5)];
        let resolved = resolve_move(start, Vec2::ZERO, &solids);
        assert_eq!(resolved.delta, Vec2::ZERO);
        assert!(!resolved.blocked());
    }

    #[test]
    fn test_open_space_accepts_full_delta() {
        let start = player_box_at(5.0, 5.0);
        let resolved = resolve_move(start, Vec2::new(0.3, -0.2), &[]);
        assert_eq!(resolved.delta, Vec2::new(0.3, -0.2));
        assert!(!resolved.blocked_x);
        assert!(!resolved.blocked_y);
    }

    #[test]
    fn test_blocked_axis_is_zeroed_not_clamped() {
        // A huge eastward delta past a wall tile at (6, 5) yields zero, not
        // a clamp to the wall face.
        let start = player_box_at(5.0, 5.0);
        let solids = [tile_box(6.0, 5.0)];
        let resolved = resolve_move(start, Vec2::new(10.0, 0.0), &solids);
        assert_eq!(resolved.delta, Vec2::ZERO);
        assert!(resolved.blocked_x);
        assert!(!resolved.blocked_y);
    }

    #[test]
    fn test_large_delta_cannot_tunnel_through_thin_wall() {
        let start = player_box_at(5.0, 5.0);
        // Thin post directly in the path, far from the endpoint.
        let solids = [Aabb {
            min_x: 7.0,
            min_y: 4.9,
            max_x: 7.1,
            max_y: 5.1,
        }];
        let resolved = resolve_move(start, Vec2::new(20.0, 0.0), &solids);
        assert!(resolved.blocked_x);
        assert_eq!(resolved.delta.x, 0.0);
    }

    #[test]
    fn test_diagonal_slides_along_wall() {
        // X is walled off; the y component survives untouched.
        let start = player_box_at(5.0, 5.0);
        let solids = [tile_box(6.0, 5.0)];
        let resolved = resolve_move(start, Vec2::new(2.0, 0.5), &solids);
        assert_eq!(resolved.delta, Vec2::new(0.0, 0.5));
        assert!(resolved.blocked_x);
        assert!(!resolved.blocked_y);
    }

    #[test]
    fn test_y_resolves_from_the_x_resolved_position() {
        // The wall only crosses the y path at the NEW x. If y resolved from
        // the original position it would sail past it.
        let start = player_box_at(0.0, 0.0);
        let solids = [Aabb {
            min_x: 1.5,
            min_y: 1.0,
            max_x: 2.5,
            max_y: 3.0,
        }];
        let resolved = resolve_move(start, Vec2::new(2.0, 2.0), &solids);
        assert!(!resolved.blocked_x);
        assert!(resolved.blocked_y);
        assert_eq!(resolved.delta, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_negative_delta_blocks_against_west_wall() {
        let start = player_box_at(5.0, 5.0);
        let solids = [tile_box(4.0, 5.0)];
        let resolved = resolve_move(start, Vec2::new(-3.0, 0.0), &solids);
        assert!(resolved.blocked_x);
        assert_eq!(resolved.delta.x, 0.0);
    }

    #[test]
    fn test_moving_away_from_touching_wall_is_free() {
        // Box resting exactly against the wall face at x = 6.
        let start = player_box_at(5.875, 5.5);
        assert_eq!(start.max_x, 6.0);
        let solids = [tile_box(6.0, 5.0)];
        let resolved = resolve_move(start, Vec2::new(-1.0, 0.0), &solids);
        assert!(!resolved.blocked_x);
        assert_eq!(resolved.delta.x, -1.0);
    }

    #[test]
    fn test_moving_into_touching_wall_is_blocked() {
        let start = player_box_at(5.875, 5.5);
        let solids = [tile_box(6.0, 5.0)];
        let resolved = resolve_move(start, Vec2::new(0.5, 0.0), &solids);
        assert!(resolved.blocked_x);
        assert_eq!(resolved.delta, Vec2::ZERO);
    }

    #[test]
    fn test_landing_exactly_on_a_wall_face_is_blocked() {
        // Touching counts as overlap, so a delta that ends flush against a
        // wall is rejected rather than accepted at the boundary.
        let start = player_box_at(5.0, 5.5);
        let solids = [tile_box(6.0, 5.0)];
        // 0.875 would put max_x exactly at 6.0.
        let resolved = resolve_move(start, Vec2::new(0.875, 0.0), &solids);
        assert!(resolved.blocked_x);
    }

    #[test]
    fn test_accepted_delta_never_exceeds_request() {
        let start = player_box_at(2.0, 2.0);
        let solids = [tile_box(4.0, 2.0), tile_box(2.0, 4.0)];
        for delta in [
            Vec2::new(0.4, 0.0),
            Vec2::new(-0.4, 0.3),
            Vec2::new(5.0, 5.0),
            Vec2::new(0.0, -2.0),
        ] {
            let resolved = resolve_move(start, delta, &solids);
            assert!(resolved.delta.x.abs() <= delta.x.abs());
            assert!(resolved.delta.y.abs() <= delta.y.abs());
            // Each axis is all-or-nothing.
            assert!(resolved.delta.x == delta.x || resolved.delta.x == 0.0);
            assert!(resolved.delta.y == delta.y || resolved.delta.y == 0.0);
        }
    }
}
