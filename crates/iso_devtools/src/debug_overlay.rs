//! Debug overlay rendered via egui on top of the composited frame.
//!
//! egui forces a split render flow because `egui_wgpu::Renderer::render()`
//! wants a `RenderPass<'static>` while `begin_render_pass` borrows the
//! encoder. Per frame:
//!
//!   1. `prepare()` -- run UI logic, produce tessellated primitives
//!   2. `upload()`  -- push texture deltas and vertex data (borrows encoder)
//!   3. `paint()`   -- draw into a pass obtained with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui dropped this frame
//!
//! UI logic only runs while `visible` (F3), but event handling stays active
//! so an open overlay can consume clicks aimed at it.

use iso_core::time::FrameClock;
use winit::window::Window;

/// Per-frame diagnostics gathered by the game loop.
#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub player_pos: (f32, f32),
    pub intent: (f32, f32),
    pub accepted_delta: (f32, f32),
    /// Collision resolver zeroed at least one axis this tick.
    pub blocked: bool,
    pub gamepad_connected: bool,
    pub gamepad_angle_deg: f32,
    pub gamepad_magnitude: f32,
    pub draw_calls: u32,
    pub sprite_count: u32,
    pub viewport_scale: f32,
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, window: &Window) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    /// Forward a window event to egui. Returns true when egui consumed it
    /// (e.g. a click landing on the overlay window).
    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        clock: &FrameClock,
        stats: Option<OverlayStats>,
    ) -> (Vec<egui::ClippedPrimitive>, egui::TexturesDelta) {
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if self.visible {
                egui::Window::new("Debug")
                    .default_pos([10.0, 10.0])
                    .show(ctx, |ui| {
                        ui.label(format!("FPS: {:.1}", clock.fps()));
                        ui.label(format!(
                            "Frame time: {:.2} ms",
                            clock.average_frame_time() * 1000.0
                        ));
                        ui.label(format!("Frame: {}", clock.frame_count()));
                        if let Some(ref stats) = stats {
                            ui.separator();
                            ui.label(format!(
                                "Player: ({:.2}, {:.2})",
                                stats.player_pos.0, stats.player_pos.1
                            ));
                            ui.label(format!(
                                "Intent: ({:.2}, {:.2})",
                                stats.intent.0, stats.intent.1
                            ));
                            ui.label(format!(
                                "Accepted: ({:.3}, {:.3})",
                                stats.accepted_delta.0, stats.accepted_delta.1
                            ));
                            if stats.blocked {
                                ui.colored_label(
                                    egui::Color32::from_rgb(255, 90, 90),
                                    "BLOCKED",
                                );
                            }

                            ui.separator();
                            if stats.gamepad_connected {
                                ui.label(format!(
                                    "Gamepad angle: {:.0} deg",
                                    stats.gamepad_angle_deg
                                ));
                                ui.label(format!(
                                    "Gamepad magnitude: {:.2}",
                                    stats.gamepad_magnitude
                                ));
                            } else {
                                ui.label("Gamepad: none");
                            }

                            ui.separator();
                            ui.label(format!("Draw calls: {}", stats.draw_calls));
                            ui.label(format!("Sprites: {}", stats.sprite_count));
                            ui.label(format!("Canvas scale: {:.2}", stats.viewport_scale));
                        }
                    });
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta)
    }

    /// Upload textures and buffers. Call before opening the egui pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Draw into an existing pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures egui no longer references. Call after rendering.
    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
