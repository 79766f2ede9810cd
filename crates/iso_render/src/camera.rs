use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

/// GPU-side camera data: one column-major view-projection matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Orthographic 2D camera over screen-space coordinates.
///
/// Screen space here is y-down (the isometric projection emits y growing
/// toward the bottom of the window), so the orthographic bottom/top planes
/// are swapped relative to the usual y-up setup.
#[derive(Debug, Clone, Copy)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            viewport,
        }
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let half_w = self.viewport.0 as f32 / (2.0 * self.zoom);
        let half_h = self.viewport.1 as f32 / (2.0 * self.zoom);
        let proj = Mat4::orthographic_rh(
            self.position.x - half_w,
            self.position.x + half_w,
            self.position.y + half_h, // larger y is the bottom of the screen
            self.position.y - half_h,
            -1.0,
            1.0,
        );
        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}
