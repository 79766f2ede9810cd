use std::sync::Arc;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// The render surface letterboxes on resize, so resizable is the
    /// default rather than a fixed canvas-sized window.
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Iso Realm".to_string(),
            width: 1920,
            height: 1080,
            resizable: true,
        }
    }
}

pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Arc<Window> {
    let attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
        .with_resizable(config.resizable);

    let window = event_loop
        .create_window(attrs)
        .expect("Failed to create window");
    log::info!(
        "Created window '{}' at {}x{}",
        config.title,
        config.width,
        config.height
    );
    Arc::new(window)
}
