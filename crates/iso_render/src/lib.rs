//! wgpu plumbing for Iso Realm: device/surface setup, the sprite pipeline,
//! texture upload, the 2D camera, and the letterbox viewport math.

pub mod camera;
pub mod gpu_context;
pub mod sprite_pipeline;
pub mod texture;
pub mod vertex;
pub mod viewport;

pub use camera::{Camera2D, CameraUniform};
pub use gpu_context::GpuContext;
pub use sprite_pipeline::SpritePipeline;
pub use texture::Texture;
pub use vertex::SpriteVertex;
pub use viewport::Viewport;
