//! The isometric tile map: diamond projection, solidity queries, draw
//! order, and the JSON map format.
//!
//! World space is the tile grid itself: one unit per tile, x growing east
//! and y growing south. Screen space is y-down pixels. A map file carries
//! a character legend plus one string per grid row, so the layout reads
//! like a picture in the JSON.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::Deserialize;

use crate::collision::Aabb;

/// One grid cell, resolved from the legend.
#[derive(Debug, Clone)]
pub struct Tile {
    pub grid_x: i32,
    pub grid_y: i32,
    pub sprite_id: String,
    pub solid: bool,
}

/// A decorative obstacle placed at an arbitrary world position.
#[derive(Debug, Clone)]
pub struct StaticObject {
    pub sprite_id: String,
    pub pos: Vec2,
    /// World-space hit box. Authored relative to `pos`, resolved at load.
    pub hit: Aabb,
}

#[derive(Debug)]
pub struct TileMap {
    pub map_id: String,
    pub width: i32,
    pub height: i32,
    pub tile_width_px: u32,
    pub tile_height_px: u32,
    pub spawn: Vec2,
    /// Row-major, `height` rows of `width` tiles.
    tiles: Vec<Tile>,
    /// Tile indices sorted back to front for rendering.
    draw_order: Vec<usize>,
    objects: Vec<StaticObject>,
}

impl TileMap {
    /// Project a world position onto the screen. The world origin lands at
    /// screen (0, 0); for a grid corner the result is the top corner of
    /// that cell's floor diamond.
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let half_w = self.tile_width_px as f32 / 2.0;
        let half_h = self.tile_height_px as f32 / 2.0;
        Vec2::new(
            (world.x - world.y) * half_w,
            (world.x + world.y) * half_h,
        )
    }

    /// Exact algebraic inverse of [`world_to_screen`].
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let half_w = self.tile_width_px as f32 / 2.0;
        let half_h = self.tile_height_px as f32 / 2.0;
        let a = screen.x / half_w;
        let b = screen.y / half_h;
        Vec2::new((a + b) / 2.0, (b - a) / 2.0)
    }

    /// The tile containing a world position, `None` outside the grid.
    pub fn tile_at(&self, world: Vec2) -> Option<&Tile> {
        let gx = world.x.floor() as i32;
        let gy = world.y.floor() as i32;
        if gx < 0 || gy < 0 || gx >= self.width || gy >= self.height {
            return None;
        }
        Some(&self.tiles[(gy * self.width + gx) as usize])
    }

    /// Solidity at a world position. Everything outside the grid is solid,
    /// so the map edge behaves like a wall.
    pub fn is_solid_at(&self, world: Vec2) -> bool {
        match self.tile_at(world) {
            Some(tile) => tile.solid,
            None => true,
        }
    }

    /// Tiles in painter's order: ascending isometric depth (grid x + y),
    /// so nearer tiles draw over farther ones.
    pub fn tiles_back_to_front(&self) -> impl Iterator<Item = &Tile> {
        self.draw_order.iter().map(move |&i| &self.tiles[i])
    }

    pub fn objects(&self) -> &[StaticObject] {
        &self.objects
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Every solid box intersecting `region`: solid tile cells, cells
    /// beyond the map edge, and static object hit boxes. Cells touching
    /// the region boundary are included, matching the resolver's
    /// non-strict overlap rule.
    pub fn solid_boxes_near(&self, region: Aabb) -> Vec<Aabb> {
        let mut out = Vec::new();
        let gx0 = region.min_x.floor() as i32;
        let gx1 = region.max_x.floor() as i32;
        let gy0 = region.min_y.floor() as i32;
        let gy1 = region.max_y.floor() as i32;
        for gy in gy0..=gy1 {
            for gx in gx0..=gx1 {
                let solid = if gx < 0 || gy < 0 || gx >= self.width || gy >= self.height {
                    true
                } else {
                    self.tiles[(gy * self.width + gx) as usize].solid
                };
                if solid {
                    out.push(Aabb {
                        min_x: gx as f32,
                        min_y: gy as f32,
                        max_x: (gx + 1) as f32,
                        max_y: (gy + 1) as f32,
                    });
                }
            }
        }
        for object in &self.objects {
            if object.hit.overlaps(&region) {
                out.push(object.hit);
            }
        }
        out
    }
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct MapFileJson {
    version: String,
    map_id: String,
    tile_width_px: u32,
    tile_height_px: u32,
    legend: HashMap<String, TileDefJson>,
    rows: Vec<String>,
    #[serde(default)]
    objects: Vec<MapObjectJson>,
    #[serde(default)]
    spawn: Option<[f32; 2]>,
}

#[derive(Debug, Deserialize)]
struct TileDefJson {
    sprite: String,
    #[serde(default)]
    solid: bool,
}

#[derive(Debug, Deserialize)]
struct MapObjectJson {
    sprite: String,
    x: f32,
    y: f32,
    /// Hit box relative to (x, y).
    hit: Aabb,
}

/// Load and validate a map file.
pub fn load_map_from_path(path: &Path) -> Result<TileMap, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read map file {}: {}", path.display(), e))?;
    let file: MapFileJson = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse map file {}: {}", path.display(), e))?;
    validate_map_json(&file)?;

    let width = file.rows[0].chars().count() as i32;
    let height = file.rows.len() as i32;

    let mut tiles = Vec::with_capacity((width * height) as usize);
    for (gy, row) in file.rows.iter().enumerate() {
        for (gx, ch) in row.chars().enumerate() {
            // Validation guarantees every row character has a legend entry.
            let def = &file.legend[&ch.to_string()];
            tiles.push(Tile {
                grid_x: gx as i32,
                grid_y: gy as i32,
                sprite_id: def.sprite.clone(),
                solid: def.solid,
            });
        }
    }

    let mut draw_order: Vec<usize> = (0..tiles.len()).collect();
    draw_order.sort_by_key(|&i| (tiles[i].grid_x + tiles[i].grid_y, tiles[i].grid_x));

    let objects = file
        .objects
        .into_iter()
        .map(|o| StaticObject {
            sprite_id: o.sprite,
            pos: Vec2::new(o.x, o.y),
            hit: Aabb {
                min_x: o.x + o.hit.min_x,
                min_y: o.y + o.hit.min_y,
                max_x: o.x + o.hit.max_x,
                max_y: o.y + o.hit.max_y,
            },
        })
        .collect::<Vec<_>>();

    let spawn = match file.spawn {
        Some([x, y]) => Vec2::new(x, y),
        None => Vec2::new((width / 2 - 1) as f32, (height / 2 - 1) as f32),
    };

    log::info!(
        "Loaded map '{}' ({}x{} tiles, {} objects)",
        file.map_id,
        width,
        height,
        objects.len()
    );

    Ok(TileMap {
        map_id: file.map_id,
        width,
        height,
        tile_width_px: file.tile_width_px,
        tile_height_px: file.tile_height_px,
        spawn,
        tiles,
        draw_order,
        objects,
    })
}

fn validate_map_json(file: &MapFileJson) -> Result<(), String> {
    if file.version != "0.1" {
        return Err(format!(
            "Map validation failed: unsupported version '{}'",
            file.version
        ));
    }
    if file.map_id.is_empty() {
        return Err("Map validation failed: empty map_id".to_string());
    }
    if file.tile_width_px == 0 || file.tile_height_px == 0 {
        return Err(format!(
            "Map validation failed: tile size {}x{} must be non-zero",
            file.tile_width_px, file.tile_height_px
        ));
    }
    if file.rows.is_empty() {
        return Err("Map validation failed: no rows".to_string());
    }
    let width = file.rows[0].chars().count();
    if width == 0 {
        return Err("Map validation failed: rows are empty".to_string());
    }
    for (key, def) in &file.legend {
        if key.chars().count() != 1 {
            return Err(format!(
                "Map validation failed: legend key '{key}' is not a single character"
            ));
        }
        if def.sprite.is_empty() {
            return Err(format!(
                "Map validation failed: legend entry '{key}' has an empty sprite"
            ));
        }
    }
    for (gy, row) in file.rows.iter().enumerate() {
        if row.chars().count() != width {
            return Err(format!(
                "Map validation failed: row {} has {} tiles, expected {}",
                gy,
                row.chars().count(),
                width
            ));
        }
        for ch in row.chars() {
            if !file.legend.contains_key(&ch.to_string()) {
                return Err(format!(
                    "Map validation failed: row {gy} uses '{ch}' which is not in the legend"
                ));
            }
        }
    }
    for (i, object) in file.objects.iter().enumerate() {
        if object.sprite.is_empty() {
            return Err(format!(
                "Map validation failed: object {i} has an empty sprite"
            ));
        }
        if object.hit.min_x >= object.hit.max_x || object.hit.min_y >= object.hit.max_y {
            return Err(format!(
                "Map validation failed: object {i} has an inverted hit box"
            ));
        }
    }
    if let Some([x, y]) = file.spawn {
        let height = file.rows.len();
        if x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32 {
            return Err(format!(
                "Map validation failed: spawn ({x}, {y}) is outside the {width}x{height} grid"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        std::env::temp_dir().join(format!(
            "iso_map_test_{}_{}_{}.json",
            std::process::id(),
            name_hint,
            nanos
        ))
    }

    fn basic_map_json() -> serde_json::Value {
        serde_json::json!({
            "version": "0.1",
            "map_id": "test_room",
            "tile_width_px": 256,
            "tile_height_px": 128,
            "legend": {
                ".": { "sprite": "floor" },
                "#": { "sprite": "wall", "solid": true }
            },
            "rows": [
                "####",
                "#..#",
                "#..#",
                "####"
            ],
            "objects": [
                { "sprite": "barrel", "x": 2.5, "y": 1.5,
                  "hit": { "min_x": -0.2, "min_y": -0.2, "max_x": 0.2, "max_y": 0.2 } }
            ],
            "spawn": [1.5, 1.5]
        })
    }

    fn load_map(value: &serde_json::Value, name_hint: &str) -> Result<TileMap, String> {
        let path = temp_file_path(name_hint);
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        let result = load_map_from_path(&path);
        let _ = fs::remove_file(&path);
        result
    }

    #[test]
    fn test_load_valid_map() {
        let map = load_map(&basic_map_json(), "valid").expect("map should load");
        assert_eq!(map.map_id, "test_room");
        assert_eq!(map.width, 4);
        assert_eq!(map.height, 4);
        assert_eq!(map.tile_count(), 16);
        assert_eq!(map.spawn, Vec2::new(1.5, 1.5));
        assert_eq!(map.objects().len(), 1);

        let corner = map.tile_at(Vec2::new(0.5, 0.5)).expect("tile in bounds");
        assert!(corner.solid);
        assert_eq!(corner.sprite_id, "wall");
        let floor = map.tile_at(Vec2::new(1.5, 2.5)).expect("tile in bounds");
        assert!(!floor.solid);
    }

    #[test]
    fn test_spawn_defaults_to_grid_center() {
        let mut value = basic_map_json();
        value.as_object_mut().unwrap().remove("spawn");
        let map = load_map(&value, "spawn_default").expect("map should load");
        // width / 2 - 1 on each axis.
        assert_eq!(map.spawn, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_object_hit_box_is_resolved_to_world_space() {
        let map = load_map(&basic_map_json(), "object_world").expect("map should load");
        let hit = map.objects()[0].hit;
        assert!((hit.min_x - 2.3).abs() < 1e-6);
        assert!((hit.max_x - 2.7).abs() < 1e-6);
        assert!((hit.min_y - 1.3).abs() < 1e-6);
        assert!((hit.max_y - 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_world_to_screen_known_values() {
        let map = load_map(&basic_map_json(), "projection").expect("map should load");
        assert_eq!(map.world_to_screen(Vec2::ZERO), Vec2::ZERO);
        // One step east: half a tile right, half a tile down.
        assert_eq!(map.world_to_screen(Vec2::new(1.0, 0.0)), Vec2::new(128.0, 64.0));
        // One step south: half a tile left, half a tile down.
        assert_eq!(map.world_to_screen(Vec2::new(0.0, 1.0)), Vec2::new(-128.0, 64.0));
        // The diagonal lands straight below the origin.
        assert_eq!(map.world_to_screen(Vec2::new(1.0, 1.0)), Vec2::new(0.0, 128.0));
        // North of the origin is straight up in grid terms: up and right.
        assert_eq!(map.world_to_screen(Vec2::new(0.0, -1.0)), Vec2::new(128.0, -64.0));
    }

    #[test]
    fn test_projection_round_trips() {
        let map = load_map(&basic_map_json(), "round_trip").expect("map should load");
        for &(x, y) in &[
            (0.0, 0.0),
            (1.0, 2.0),
            (3.5, 0.25),
            (-2.0, 7.75),
            (11.0, 11.0),
        ] {
            let world = Vec2::new(x, y);
            let back = map.screen_to_world(map.world_to_screen(world));
            assert!(
                (back - world).length() < 1e-4,
                "round trip drifted: {world:?} -> {back:?}"
            );
        }
    }

    #[test]
    fn test_tile_at_out_of_bounds_is_none() {
        let map = load_map(&basic_map_json(), "oob").expect("map should load");
        assert!(map.tile_at(Vec2::new(-0.5, 1.0)).is_none());
        assert!(map.tile_at(Vec2::new(1.0, -0.5)).is_none());
        assert!(map.tile_at(Vec2::new(4.5, 1.0)).is_none());
        assert!(map.tile_at(Vec2::new(1.0, 4.5)).is_none());
        // But out of bounds is still solid.
        assert!(map.is_solid_at(Vec2::new(-0.5, 1.0)));
        assert!(map.is_solid_at(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_draw_order_is_back_to_front() {
        let map = load_map(&basic_map_json(), "draw_order").expect("map should load");
        let depths: Vec<i32> = map
            .tiles_back_to_front()
            .map(|t| t.grid_x + t.grid_y)
            .collect();
        assert_eq!(depths.len(), 16);
        for pair in depths.windows(2) {
            assert!(pair[0] <= pair[1], "draw order not sorted by depth");
        }
    }

    #[test]
    fn test_solid_boxes_near_picks_up_walls_and_edges() {
        let map = load_map(&basic_map_json(), "solids").expect("map should load");
        // Region straddling the west wall column and the map edge.
        let region = Aabb {
            min_x: -0.5,
            min_y: 1.2,
            max_x: 0.8,
            max_y: 1.8,
        };
        let solids = map.solid_boxes_near(region);
        assert!(solids.iter().any(|b| b.max_x <= 0.0), "missing off-map cell");
        assert!(
            solids.iter().any(|b| b.min_x == 0.0 && b.min_y == 1.0),
            "missing wall cell (0, 1)"
        );
    }

    #[test]
    fn test_solid_boxes_near_skips_open_floor() {
        let map = load_map(&basic_map_json(), "open").expect("map should load");
        // Interior floor well away from walls and the barrel.
        let region = Aabb {
            min_x: 1.3,
            min_y: 2.3,
            max_x: 1.7,
            max_y: 2.7,
        };
        assert!(map.solid_boxes_near(region).is_empty());
    }

    #[test]
    fn test_solid_boxes_near_includes_object_hits() {
        let map = load_map(&basic_map_json(), "object_solid").expect("map should load");
        let region = Aabb {
            min_x: 2.0,
            min_y: 1.0,
            max_x: 3.0,
            max_y: 2.0,
        };
        let solids = map.solid_boxes_near(region);
        assert!(
            solids.iter().any(|b| (b.min_x - 2.3).abs() < 1e-6),
            "missing barrel hit box"
        );
    }

    #[test]
    fn test_load_rejects_bad_version() {
        let mut value = basic_map_json();
        value["version"] = serde_json::json!("0.2");
        let err = load_map(&value, "bad_version").expect_err("should reject");
        assert!(err.contains("unsupported version"), "got: {err}");
    }

    #[test]
    fn test_load_rejects_ragged_rows() {
        let mut value = basic_map_json();
        value["rows"] = serde_json::json!(["####", "#.#", "####", "####"]);
        let err = load_map(&value, "ragged").expect_err("should reject");
        assert!(err.contains("row 1"), "got: {err}");
    }

    #[test]
    fn test_load_rejects_unknown_legend_char() {
        let mut value = basic_map_json();
        value["rows"] = serde_json::json!(["####", "#.?#", "#..#", "####"]);
        let err = load_map(&value, "unknown_char").expect_err("should reject");
        assert!(err.contains("'?'"), "got: {err}");
    }

    #[test]
    fn test_load_rejects_zero_tile_size() {
        let mut value = basic_map_json();
        value["tile_height_px"] = serde_json::json!(0);
        let err = load_map(&value, "zero_tile").expect_err("should reject");
        assert!(err.contains("non-zero"), "got: {err}");
    }

    #[test]
    fn test_load_rejects_spawn_outside_grid() {
        let mut value = basic_map_json();
        value["spawn"] = serde_json::json!([9.0, 1.0]);
        let err = load_map(&value, "bad_spawn").expect_err("should reject");
        assert!(err.contains("spawn"), "got: {err}");
    }

    #[test]
    fn test_load_rejects_inverted_object_hit() {
        let mut value = basic_map_json();
        value["objects"][0]["hit"] = serde_json::json!({
            "min_x": 0.2, "min_y": -0.2, "max_x": -0.2, "max_y": 0.2
        });
        let err = load_map(&value, "inverted_hit").expect_err("should reject");
        assert!(err.contains("inverted"), "got: {err}");
    }
}
