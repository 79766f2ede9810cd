//! Developer-facing tooling layered on top of the game: the egui debug
//! overlay. Nothing here affects simulation state.

pub mod debug_overlay;

pub use debug_overlay::{DebugOverlay, OverlayStats};
