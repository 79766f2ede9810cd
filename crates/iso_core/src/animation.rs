//! Character animation: clip data, playback state, and the state machine
//! that picks a clip from movement intent.
//!
//! Clips are keyed by [`ClipKey`], a closed (action, direction) pair rather
//! than a free-form string. The JSON side keeps textual keys ("walk_ne",
//! "idle_s", ...) for authoring; loading resolves them into a total
//! [`ClipSet`] up front, so playback can never ask for a clip that does not
//! exist.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::Deserialize;

use crate::intent::{Direction8, INTENT_EPSILON};

/// How long the character stands idle before the first fidget, in seconds.
/// Later fidgets use whatever delay the caller re-arms.
pub const INITIAL_FIDGET_DELAY: f32 = 2.0;

/// What the character is doing, animation-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Idle,
    Walk,
    /// Idle flourish played after standing still for a while. Never loops;
    /// finishing it hands control back to [`Action::Idle`].
    Fidget,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Idle, Action::Walk, Action::Fidget];

    /// Lowercase tag used in asset keys.
    pub fn tag(self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::Walk => "walk",
            Action::Fidget => "fidget",
        }
    }
}

/// Identifies one clip: an action facing one of the eight directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipKey {
    pub action: Action,
    pub direction: Direction8,
}

impl ClipKey {
    pub const COUNT: usize = Action::ALL.len() * Direction8::ALL.len();

    pub fn new(action: Action, direction: Direction8) -> Self {
        Self { action, direction }
    }

    /// Dense index into [`ClipSet`] storage.
    pub fn index(self) -> usize {
        self.action as usize * Direction8::ALL.len() + self.direction as usize
    }

    /// All keys, in index order.
    pub fn all() -> impl Iterator<Item = ClipKey> {
        Action::ALL.into_iter().flat_map(|action| {
            Direction8::ALL
                .into_iter()
                .map(move |direction| ClipKey { action, direction })
        })
    }

    /// Parse a textual key like "walk_ne". Returns `None` for anything
    /// outside the action_direction grid.
    pub fn parse(text: &str) -> Option<ClipKey> {
        let (action_tag, direction_tag) = text.split_once('_')?;
        let action = Action::ALL.into_iter().find(|a| a.tag() == action_tag)?;
        let direction = Direction8::ALL
            .into_iter()
            .find(|d| d.tag() == direction_tag)?;
        Some(ClipKey { action, direction })
    }
}

impl fmt::Display for ClipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.action.tag(), self.direction.tag())
    }
}

/// One playable clip. Frame timing is uniform across the clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    /// Sprite ids, one per frame, resolved against the sprite catalog.
    pub frames: Vec<String>,
    /// Seconds per frame (1 / fps from the asset file).
    pub frame_duration: f32,
    pub looping: bool,
}

impl AnimationClip {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Duration of one full pass over the frames, in seconds.
    pub fn cycle_duration(&self) -> f32 {
        self.frame_duration * self.frames.len() as f32
    }
}

/// Every [`ClipKey`] mapped to a clip. Totality is checked at load, so
/// lookup is infallible.
#[derive(Debug, Clone)]
pub struct ClipSet {
    clips: Vec<AnimationClip>,
}

impl ClipSet {
    /// Build from clips in [`ClipKey::all`] index order.
    pub fn from_clips(clips: Vec<AnimationClip>) -> Result<Self, String> {
        if clips.len() != ClipKey::COUNT {
            return Err(format!(
                "Clip set validation failed: expected {} clips, got {}",
                ClipKey::COUNT,
                clips.len()
            ));
        }
        Ok(Self { clips })
    }

    pub fn clip(&self, key: ClipKey) -> &AnimationClip {
        &self.clips[key.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClipKey, &AnimationClip)> {
        ClipKey::all().map(|key| (key, self.clip(key)))
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }
}

/// Playback position within the current clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub key: ClipKey,
    pub elapsed: f32,
    pub frame_index: usize,
    pub finished: bool,
}

impl AnimationState {
    pub fn new(key: ClipKey) -> Self {
        Self {
            key,
            elapsed: 0.0,
            frame_index: 0,
            finished: false,
        }
    }

    /// Change clips. Playback restarts from frame zero; switching to the
    /// key already playing is a no-op.
    pub fn switch(&mut self, key: ClipKey) {
        if self.key == key {
            return;
        }
        log::debug!("Animation clip switch: {} -> {}", self.key, key);
        self.key = key;
        self.elapsed = 0.0;
        self.frame_index = 0;
        self.finished = false;
    }

    /// Advance playback by `dt` seconds against `clip` (the clip for
    /// `self.key`). A finished non-looping clip holds its terminal frame
    /// until the next [`switch`](Self::switch).
    pub fn advance(&mut self, dt: f32, clip: &AnimationClip) {
        if self.finished {
            return;
        }
        self.elapsed += dt;
        let count = clip.frame_count();
        let raw_index = (self.elapsed / clip.frame_duration) as usize;
        if clip.looping {
            self.frame_index = raw_index % count;
        } else if raw_index >= count {
            self.frame_index = count - 1;
            self.finished = true;
        } else {
            self.frame_index = raw_index;
        }
    }
}

/// Drives an [`AnimationState`] from per-tick movement intent, including
/// the idle-fidget cycle.
///
/// The fidget delay is injected from outside (usually a random draw) rather
/// than sampled here, which keeps this type deterministic under test.
#[derive(Debug, Clone)]
pub struct Animator {
    clips: ClipSet,
    state: AnimationState,
    idle_for: f32,
    fidget_delay: f32,
}

impl Animator {
    pub fn new(clips: ClipSet, facing: Direction8) -> Self {
        Self {
            clips,
            state: AnimationState::new(ClipKey::new(Action::Idle, facing)),
            idle_for: 0.0,
            fidget_delay: INITIAL_FIDGET_DELAY,
        }
    }

    /// One tick: pick the clip implied by `intent`, then advance playback.
    ///
    /// `intent` is the raw movement intent, not the collision-resolved
    /// delta, so walking into a wall still animates the walk. Returns true
    /// on the tick a fidget finishes; the caller then picks the next delay
    /// via [`set_fidget_delay`](Self::set_fidget_delay).
    pub fn update(&mut self, intent: Vec2, dt: f32) -> bool {
        let mut fidget_completed = false;
        let moving = intent.length_squared() > INTENT_EPSILON;

        let next_key = if moving {
            self.idle_for = 0.0;
            let direction = Direction8::from_vec(intent, self.state.key.direction);
            ClipKey::new(Action::Walk, direction)
        } else {
            let direction = self.state.key.direction;
            match self.state.key.action {
                Action::Fidget if self.state.finished => {
                    fidget_completed = true;
                    self.idle_for = 0.0;
                    ClipKey::new(Action::Idle, direction)
                }
                Action::Fidget => self.state.key,
                Action::Idle | Action::Walk => {
                    self.idle_for += dt;
                    if self.idle_for >= self.fidget_delay {
                        ClipKey::new(Action::Fidget, direction)
                    } else {
                        ClipKey::new(Action::Idle, direction)
                    }
                }
            }
        };

        self.state.switch(next_key);
        self.state.advance(dt, self.clips.clip(next_key));
        fidget_completed
    }

    /// Set how long the character must stand idle before the next fidget.
    pub fn set_fidget_delay(&mut self, seconds: f32) {
        self.fidget_delay = seconds.max(0.0);
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn current_clip(&self) -> &AnimationClip {
        self.clips.clip(self.state.key)
    }

    /// Sprite id to draw this tick.
    pub fn sprite_id(&self) -> &str {
        &self.current_clip().frames[self.state.frame_index]
    }

    pub fn clips(&self) -> &ClipSet {
        &self.clips
    }
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct ClipSetFileJson {
    version: String,
    set_id: String,
    clips: HashMap<String, ClipJson>,
}

#[derive(Debug, Deserialize)]
struct ClipJson {
    frames: Vec<String>,
    fps: f32,
    #[serde(default = "default_looping")]
    looping: bool,
}

fn default_looping() -> bool {
    true
}

/// Load a clip set from JSON, requiring exactly one clip per [`ClipKey`].
pub fn load_clip_set_from_path(path: &Path) -> Result<ClipSet, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read clip set {}: {e}", path.display()))?;
    let file: ClipSetFileJson = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse clip set {}: {e}", path.display()))?;
    validate_clip_set_json(&file)?;

    let mut slots: Vec<Option<AnimationClip>> = vec![None; ClipKey::COUNT];
    for (text_key, clip) in &file.clips {
        // validate_clip_set_json already proved the key parses.
        if let Some(key) = ClipKey::parse(text_key) {
            slots[key.index()] = Some(AnimationClip {
                frames: clip.frames.clone(),
                frame_duration: 1.0 / clip.fps,
                looping: clip.looping,
            });
        }
    }

    let mut clips = Vec::with_capacity(ClipKey::COUNT);
    for key in ClipKey::all() {
        match slots[key.index()].take() {
            Some(clip) => clips.push(clip),
            None => {
                return Err(format!(
                    "Clip set validation failed: set '{}' is missing clip '{key}'",
                    file.set_id
                ))
            }
        }
    }

    log::info!(
        "Loaded clip set '{}' ({} clips) from {}",
        file.set_id,
        clips.len(),
        path.display()
    );
    ClipSet::from_clips(clips)
}

fn validate_clip_set_json(file: &ClipSetFileJson) -> Result<(), String> {
    if file.version != "0.1" {
        return Err(format!(
            "Clip set validation failed: unsupported version '{}'",
            file.version
        ));
    }
    if file.set_id.is_empty() {
        return Err("Clip set validation failed: empty set_id".to_string());
    }
    for (text_key, clip) in &file.clips {
        let key = ClipKey::parse(text_key).ok_or_else(|| {
            format!("Clip set validation failed: unrecognized clip key '{text_key}'")
        })?;
        if clip.frames.is_empty() {
            return Err(format!(
                "Clip set validation failed: clip '{text_key}' has no frames"
            ));
        }
        if clip.frames.iter().any(|f| f.is_empty()) {
            return Err(format!(
                "Clip set validation failed: clip '{text_key}' has an empty sprite id"
            ));
        }
        if !clip.fps.is_finite() || clip.fps <= 0.0 {
            return Err(format!(
                "Clip set validation failed: clip '{text_key}' needs a positive fps"
            ));
        }
        if key.action == Action::Fidget && clip.looping {
            return Err(format!(
                "Clip set validation failed: fidget clip '{text_key}' must not loop"
            ));
        }
    }
    Ok(())
}
