//! The player: movement through the collision resolver plus the animator.

use glam::Vec2;
use iso_core::animation::{Animator, ClipSet};
use iso_core::intent::Direction8;

use crate::collision::{resolve_move, Aabb};
use crate::map::TileMap;

/// World units per second while walking.
pub const WALK_SPEED: f32 = 3.0;

/// Half extents of the collision box. Small relative to a tile so doorways
/// and gaps between objects stay passable.
pub const PLAYER_HALF_EXTENT: f32 = 0.125;

/// Padding added to the broad-phase query beyond the travel distance.
const BROAD_PHASE_MARGIN: f32 = 1.0;

/// Everything the frame loop wants to know about one step.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    /// Unit (or zero) movement intent fed into the step.
    pub intent: Vec2,
    /// Delta actually applied after collision resolution.
    pub accepted: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
    /// A non-looping fidget just played its last frame; the owner should
    /// pick a fresh fidget delay.
    pub fidget_completed: bool,
}

impl StepOutcome {
    pub fn blocked(&self) -> bool {
        self.blocked_x || self.blocked_y
    }
}

pub struct Player {
    pub pos: Vec2,
    pub speed: f32,
    pub animator: Animator,
}

impl Player {
    pub fn new(pos: Vec2, clips: ClipSet) -> Self {
        Self {
            pos,
            speed: WALK_SPEED,
            animator: Animator::new(clips, Direction8::S),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_center(self.pos, PLAYER_HALF_EXTENT, PLAYER_HALF_EXTENT)
    }

    /// One tick: scale intent by speed and dt, resolve the delta against
    /// nearby solids, apply whatever survived, then animate. The animator
    /// sees the raw intent, so walking into a wall still plays the walk.
    pub fn step(&mut self, intent: Vec2, dt: f32, map: &TileMap) -> StepOutcome {
        let raw = intent * self.speed * dt;
        let bbox = self.bounding_box();
        let region = bbox.expanded(
            raw.x.abs() + BROAD_PHASE_MARGIN,
            raw.y.abs() + BROAD_PHASE_MARGIN,
        );
        let solids = map.solid_boxes_near(region);
        let resolved = resolve_move(bbox, raw, &solids);
        self.pos += resolved.delta;

        let fidget_completed = self.animator.update(intent, dt);

        StepOutcome {
            intent,
            accepted: resolved.delta,
            blocked_x: resolved.blocked_x,
            blocked_y: resolved.blocked_y,
            fidget_completed,
        }
    }

    /// Sprite to draw this tick.
    pub fn sprite_id(&self) -> &str {
        self.animator.sprite_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::load_map_from_path;
    use iso_core::animation::{Action, AnimationClip, ClipKey};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        std::env::temp_dir().join(format!(
            "iso_player_test_{}_{}_{}.json",
            std::process::id(),
            name_hint,
            nanos
        ))
    }

    fn make_clips() -> ClipSet {
        let clips = ClipKey::all()
            .map(|key| {
                let (frames, duration, looping) = match key.action {
                    Action::Idle => (1, 1.0, true),
                    Action::Walk => (10, 0.1, true),
                    Action::Fidget => (4, 0.25, false),
                };
                AnimationClip {
                    frames: (0..frames).map(|i| format!("{key}_{i}")).collect(),
                    frame_duration: duration,
                    looping,
                }
            })
            .collect();
        ClipSet::from_clips(clips).expect("full clip set")
    }

    /// Build a map from row strings: '.' floor, '#' solid wall.
    fn make_map(rows: &[&str], name_hint: &str) -> TileMap {
        let value = serde_json::json!({
            "version": "0.1",
            "map_id": "player_test",
            "tile_width_px": 256,
            "tile_height_px": 128,
            "legend": {
                ".": { "sprite": "floor" },
                "#": { "sprite": "wall", "solid": true }
            },
            "rows": rows,
        });
        let path = temp_file_path(name_hint);
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
        let map = load_map_from_path(&path).expect("test map should load");
        let _ = fs::remove_file(&path);
        map
    }

    fn open_map(name_hint: &str) -> TileMap {
        make_map(&["........"; 8], name_hint)
    }

    #[test]
    fn test_step_scales_by_speed_and_dt() {
        let map = open_map("speed");
        let mut player = Player::new(Vec2::new(4.0, 4.0), make_clips());
        let outcome = player.step(Vec2::new(1.0, 0.0), 0.5, &map);
        assert!((player.pos.x - 5.5).abs() < 1e-5);
        assert_eq!(player.pos.y, 4.0);
        assert!(!outcome.blocked());
    }

    #[test]
    fn test_blocked_step_leaves_position_unchanged() {
        // Wall tile at (6, 5); a very fast eastward step from (5, 5) must
        // be zeroed entirely rather than clamped or tunneled.
        let mut rows = vec!["........".to_string(); 8];
        rows[5].replace_range(6..7, "#");
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let map = make_map(&rows, "wall_east");

        let mut player = Player::new(Vec2::new(5.0, 5.0), make_clips());
        player.speed = 100.0;
        let outcome = player.step(Vec2::new(1.0, 0.0), 0.1, &map);

        assert_eq!(player.pos, Vec2::new(5.0, 5.0));
        assert!(outcome.blocked_x);
        assert!(!outcome.blocked_y);
        assert_eq!(outcome.accepted, Vec2::ZERO);
        // The walk animation still runs against the wall.
        let state = player.animator.state();
        assert_eq!(state.key, ClipKey::new(Action::Walk, Direction8::E));
    }

    #[test]
    fn test_walking_into_wall_keeps_animating() {
        let mut rows = vec!["........".to_string(); 8];
        rows[5].replace_range(6..7, "#");
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let map = make_map(&rows, "wall_anim");

        let mut player = Player::new(Vec2::new(5.0, 5.0), make_clips());
        player.speed = 100.0;
        for _ in 0..3 {
            player.step(Vec2::new(1.0, 0.0), 0.1, &map);
        }
        assert_eq!(player.pos, Vec2::new(5.0, 5.0));
        // Walk clip at 0.1s per frame, 0.3s elapsed.
        assert_eq!(player.animator.state().frame_index, 3);
    }

    #[test]
    fn test_diagonal_input_slides_along_wall() {
        // Solid column at gx = 6 blocks x; y keeps moving.
        let rows = vec!["......#."; 8];
        let map = make_map(&rows, "slide");

        let mut player = Player::new(Vec2::new(5.8, 5.0), make_clips());
        let intent = Vec2::new(1.0, 1.0).normalize();
        let outcome = player.step(intent, 0.1, &map);

        let expected_dy = intent.y * WALK_SPEED * 0.1;
        assert!(outcome.blocked_x);
        assert!(!outcome.blocked_y);
        assert_eq!(player.pos.x, 5.8);
        assert!((player.pos.y - (5.0 + expected_dy)).abs() < 1e-5);
    }

    #[test]
    fn test_map_edge_is_solid() {
        let map = open_map("edge");
        let mut player = Player::new(Vec2::new(0.5, 0.5), make_clips());
        player.speed = 100.0;
        let outcome = player.step(Vec2::new(-1.0, 0.0), 0.1, &map);
        assert_eq!(player.pos, Vec2::new(0.5, 0.5));
        assert!(outcome.blocked_x);
    }

    #[test]
    fn test_identical_runs_are_deterministic() {
        let mut rows = vec!["........".to_string(); 8];
        rows[3].replace_range(4..5, "#");
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let map = make_map(&rows, "determinism");

        let script = [
            (Vec2::new(1.0, 0.0), 0.016),
            (Vec2::new(1.0, -1.0).normalize(), 0.017),
            (Vec2::ZERO, 0.016),
            (Vec2::new(0.0, -1.0), 0.3),
            (Vec2::new(1.0, 1.0).normalize(), 0.016),
        ];

        let mut a = Player::new(Vec2::new(2.0, 4.0), make_clips());
        let mut b = Player::new(Vec2::new(2.0, 4.0), make_clips());
        for &(intent, dt) in &script {
            a.step(intent, dt, &map);
            b.step(intent, dt, &map);
        }
        assert_eq!(a.pos, b.pos);
        assert_eq!(a.animator.state(), b.animator.state());
    }

    #[test]
    fn test_fidget_cycle_reports_completion() {
        let map = open_map("fidget");
        let mut player = Player::new(Vec2::new(4.0, 4.0), make_clips());
        player.animator.set_fidget_delay(0.05);

        let mut completed = false;
        // 0.05s of idling arms the fidget; the 4-frame clip then needs a
        // second per cycle. Plenty of headroom in 40 steps.
        for _ in 0..40 {
            let outcome = player.step(Vec2::ZERO, 0.05, &map);
            if outcome.fidget_completed {
                completed = true;
                break;
            }
        }
        assert!(completed, "fidget never completed");
        assert_eq!(player.animator.state().key.action, Action::Idle);
    }
}
