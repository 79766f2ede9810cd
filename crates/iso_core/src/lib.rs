//! Engine-agnostic simulation primitives for Iso Realm: input state
//! tracking, movement intent, frame timing, and character animation.
//!
//! Nothing in this crate touches the window, the GPU, or the filesystem
//! outside of asset loading, so all of it is testable headless.

pub mod animation;
pub mod input;
pub mod intent;
pub mod time;

pub use animation::{
    load_clip_set_from_path, Action, AnimationClip, AnimationState, Animator, ClipKey, ClipSet,
};
pub use input::{InputState, Key};
pub use intent::{combined_intent, Direction8, IntentSource, KeyboardSource};
pub use time::FrameClock;
