//! Sprite atlas metadata and the catalog that resolves sprite ids.
//!
//! Atlas files are hand-authored JSON: one texture path plus a pixel rect
//! (and draw pivot) per sprite on that sheet. UVs are derived here at load
//! time rather than stored in the file, which keeps the data writable by
//! hand. The catalog merges every atlas into a single id lookup.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use iso_core::animation::ClipSet;
use serde::Deserialize;

use crate::map::TileMap;

/// A resolved sprite: everything the mesh builder needs for one quad.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteEntry {
    pub texture_path: Arc<str>,
    pub size_px: (u32, u32),
    /// [u0, v0, u1, v1] with v growing downward, matching image rows.
    pub uv: [f32; 4],
    /// Fraction of the sprite size from its top-left corner to the world
    /// anchor point. Tile art uses (0.5, 0.75): the anchor sits at the top
    /// corner of the floor diamond in the bottom quarter of the image.
    pub pivot: (f32, f32),
}

#[derive(Debug, Default)]
pub struct SpriteCatalog {
    entries: HashMap<String, SpriteEntry>,
    atlas_count: usize,
}

impl SpriteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an atlas file and merge it into the catalog. Sprite ids must
    /// be unique across every atlas loaded.
    pub fn add_atlas_file(&mut self, path: &Path) -> Result<(), String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read atlas file {}: {}", path.display(), e))?;
        let atlas: AtlasFileJson = serde_json::from_str(&raw)
            .map_err(|e| format!("Failed to parse atlas file {}: {}", path.display(), e))?;
        validate_atlas_json(&atlas)?;

        for sprite in &atlas.sprites {
            if self.entries.contains_key(&sprite.sprite_id) {
                return Err(format!(
                    "Duplicate sprite id '{}' loading atlas '{}'",
                    sprite.sprite_id, atlas.atlas_id
                ));
            }
        }

        let texture_path: Arc<str> = Arc::from(atlas.texture.as_str());
        let tex_w = atlas.texture_size_px.0 as f32;
        let tex_h = atlas.texture_size_px.1 as f32;
        let sprite_count = atlas.sprites.len();
        for sprite in atlas.sprites {
            let r = sprite.rect_px;
            let uv = [
                r.x as f32 / tex_w,
                r.y as f32 / tex_h,
                (r.x + r.w) as f32 / tex_w,
                (r.y + r.h) as f32 / tex_h,
            ];
            self.entries.insert(
                sprite.sprite_id,
                SpriteEntry {
                    texture_path: texture_path.clone(),
                    size_px: (r.w, r.h),
                    uv,
                    pivot: sprite.pivot,
                },
            );
        }
        self.atlas_count += 1;
        log::info!(
            "Loaded atlas '{}' ({} sprites) from {}",
            atlas.atlas_id,
            sprite_count,
            path.display()
        );
        Ok(())
    }

    pub fn resolve(&self, sprite_id: &str) -> Option<&SpriteEntry> {
        self.entries.get(sprite_id)
    }

    /// Unique texture paths across every loaded atlas.
    pub fn texture_paths(&self) -> HashSet<Arc<str>> {
        self.entries
            .values()
            .map(|e| e.texture_path.clone())
            .collect()
    }

    pub fn sprite_count(&self) -> usize {
        self.entries.len()
    }

    pub fn atlas_count(&self) -> usize {
        self.atlas_count
    }
}

/// Check that every sprite the map references resolves in the catalog.
/// Run at startup so a typo fails the launch instead of a frame.
pub fn validate_map_sprites(map: &TileMap, catalog: &SpriteCatalog) -> Result<(), String> {
    for tile in map.tiles_back_to_front() {
        if catalog.resolve(&tile.sprite_id).is_none() {
            return Err(format!(
                "Map '{}' references unknown sprite '{}'",
                map.map_id, tile.sprite_id
            ));
        }
    }
    for object in map.objects() {
        if catalog.resolve(&object.sprite_id).is_none() {
            return Err(format!(
                "Map '{}' object references unknown sprite '{}'",
                map.map_id, object.sprite_id
            ));
        }
    }
    Ok(())
}

/// Check that every frame of every clip resolves in the catalog.
pub fn validate_clip_sprites(clips: &ClipSet, catalog: &SpriteCatalog) -> Result<(), String> {
    for (key, clip) in clips.iter() {
        for frame in &clip.frames {
            if catalog.resolve(frame).is_none() {
                return Err(format!(
                    "Clip '{key}' references unknown sprite '{frame}'"
                ));
            }
        }
    }
    Ok(())
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct AtlasFileJson {
    version: String,
    atlas_id: String,
    texture: String,
    texture_size_px: (u32, u32),
    sprites: Vec<AtlasSpriteJson>,
}

#[derive(Debug, Deserialize)]
struct AtlasSpriteJson {
    sprite_id: String,
    rect_px: RectPx,
    #[serde(default = "default_pivot")]
    pivot: (f32, f32),
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct RectPx {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

fn default_pivot() -> (f32, f32) {
    (0.5, 0.5)
}

fn validate_atlas_json(atlas: &AtlasFileJson) -> Result<(), String> {
    if atlas.version != "0.1" {
        return Err(format!(
            "Atlas validation failed: unsupported version '{}'",
            atlas.version
        ));
    }
    if atlas.atlas_id.is_empty() {
        return Err("Atlas validation failed: empty atlas_id".to_string());
    }
    if atlas.texture.is_empty() {
        return Err(format!(
            "Atlas validation failed: atlas '{}' has an empty texture path",
            atlas.atlas_id
        ));
    }
    let (tex_w, tex_h) = atlas.texture_size_px;
    if tex_w == 0 || tex_h == 0 {
        return Err(format!(
            "Atlas validation failed: atlas '{}' has a zero texture size",
            atlas.atlas_id
        ));
    }
    let mut seen = HashSet::new();
    for sprite in &atlas.sprites {
        if sprite.sprite_id.is_empty() {
            return Err(format!(
                "Atlas validation failed: atlas '{}' has a sprite with an empty id",
                atlas.atlas_id
            ));
        }
        if !seen.insert(sprite.sprite_id.as_str()) {
            return Err(format!(
                "Atlas validation failed: duplicate sprite id '{}' in atlas '{}'",
                sprite.sprite_id, atlas.atlas_id
            ));
        }
        let r = sprite.rect_px;
        if r.w == 0 || r.h == 0 {
            return Err(format!(
                "Atlas validation failed: sprite '{}' has a zero-size rect",
                sprite.sprite_id
            ));
        }
        let fits_x = r.x.checked_add(r.w).is_some_and(|edge| edge <= tex_w);
        let fits_y = r.y.checked_add(r.h).is_some_and(|edge| edge <= tex_h);
        if !fits_x || !fits_y {
            return Err(format!(
                "Atlas validation failed: sprite '{}' rect exceeds the {}x{} texture",
                sprite.sprite_id, tex_w, tex_h
            ));
        }
    }
    Ok(())
}
