//! Iso Realm -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All
//! simulation runs inside `RedrawRequested` using a **variable-timestep**
//! model (see `FrameClock`): each redraw advances the world by the real,
//! clamped elapsed time, and `about_to_wait` immediately requests the next
//! redraw, so the loop runs at presentation rate.
//!
//! Rendering is a three-pass pipeline:
//!
//!   1. Scene pass -- tiles, objects, and the player are rebuilt into one
//!      sprite mesh each frame and drawn into a fixed 1920x1080 canvas
//!   2. Composite pass -- the canvas is scaled onto the window with
//!      letterbox/pillarbox bars so the picture never stretches
//!   3. Overlay pass -- egui draws the debug overlay at window resolution
//!
//! Movement intent flows keyboard + gamepad -> one combined unit vector ->
//! collision resolver -> position. The animator sees the raw intent, so
//! walking into a wall still plays the walk cycle.

mod atlas;
mod collision;
mod gamepad;
mod map;
mod player;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use atlas::{validate_clip_sprites, validate_map_sprites, SpriteCatalog};
use collision::Aabb;
use gamepad::GamepadSource;
use iso_core::animation::load_clip_set_from_path;
use iso_core::input::{InputState, Key};
use iso_core::intent::{combined_intent, KeyboardSource};
use iso_core::time::FrameClock;
use iso_devtools::debug_overlay::{DebugOverlay, OverlayStats};
use iso_platform::window::PlatformConfig;
use iso_render::{Camera2D, GpuContext, SpritePipeline, SpriteVertex, Texture, Viewport};
use map::{load_map_from_path, TileMap};
use player::{Player, StepOutcome};

const MAP_PATH: &str = "assets/maps/keep.json";
const CLIP_SET_PATH: &str = "assets/animations/player.json";
const ATLAS_PATHS: [&str; 2] = [
    "assets/atlases/scene_atlas.json",
    "assets/atlases/character_atlas.json",
];

/// Logical canvas resolution. The scene always renders at this size; the
/// window scales it with bars rather than stretching.
const CANVAS_WIDTH: u32 = 1920;
const CANVAS_HEIGHT: u32 = 1080;

/// Range for the random pause between idle fidgets, in seconds.
const FIDGET_DELAY_MIN: f32 = 1.0;
const FIDGET_DELAY_MAX: f32 = 6.0;

const DEBUG_WHITE_ASSET: &str = "__debug_white";
const DEBUG_SOLID_COLOR: [f32; 4] = [0.15, 0.9, 0.15, 0.35];
const DEBUG_PLAYER_COLOR: [f32; 4] = [1.0, 0.85, 0.2, 0.5];

/// A contiguous run of indices that share the same texture binding.
/// Draw calls are merged when consecutive quads use the same texture,
/// minimizing GPU bind-group switches during the render pass.
#[derive(Debug, Clone)]
struct DrawCall {
    texture_key: Arc<str>,
    index_start: u32,
    index_count: u32,
}

struct QuadSpec<'a> {
    texture_key: &'a Arc<str>,
    top_left: Vec2,
    size: Vec2,
    uv: [f32; 4],
    color: [f32; 4],
}

struct GpuSpriteTexture {
    #[allow(dead_code)]
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// All mutable engine state lives here. Constructed lazily in
/// `ApplicationHandler::resumed` once the window and GPU surface exist.
///
/// Ownership is split into three conceptual groups:
///  - **Core systems** (clock, input, cameras) -- updated every frame
///  - **Content** (map, clip set, atlases, textures) -- loaded once at startup
///  - **GPU resources** (vertex/index/camera buffers, canvas) -- streamed or
///    rebuilt as the frame demands
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    sprite_pipeline: SpritePipeline,
    debug_overlay: DebugOverlay,

    clock: FrameClock,
    input: InputState,
    keyboard: KeyboardSource,
    gamepad: GamepadSource,
    rng: rand::rngs::ThreadRng,

    // --- Content, loaded once at startup ----------------------------------------
    map: TileMap,
    catalog: SpriteCatalog,
    player: Player,
    textures: HashMap<Arc<str>, GpuSpriteTexture>,

    // --- Cameras, canvas, and composite ------------------------------------------
    scene_camera: Camera2D,
    window_camera: Camera2D,
    viewport: Viewport,
    canvas: Texture,
    canvas_bind_group: wgpu::BindGroup,
    scene_camera_buffer: wgpu::Buffer,
    scene_camera_bind_group: wgpu::BindGroup,
    window_camera_buffer: wgpu::Buffer,
    window_camera_bind_group: wgpu::BindGroup,
    composite_vertex_buffer: wgpu::Buffer,
    composite_index_buffer: wgpu::Buffer,

    // --- Per-frame GPU mesh state -----------------------------------------------
    // The sprite mesh is rebuilt on the CPU each frame, then streamed into
    // these GPU buffers. Buffers grow (power-of-two) but never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    draw_calls: Vec<DrawCall>,
    sprite_count: usize,

    show_collision_debug: bool,
    last_outcome: Option<StepOutcome>,
}

impl EngineState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone());
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        let map = load_map_from_path(Path::new(MAP_PATH)).unwrap_or_else(|err| {
            panic!("Failed to load map '{MAP_PATH}': {err}");
        });
        let clips = load_clip_set_from_path(Path::new(CLIP_SET_PATH)).unwrap_or_else(|err| {
            panic!("Failed to load clip set '{CLIP_SET_PATH}': {err}");
        });

        let mut catalog = SpriteCatalog::new();
        for atlas_path in ATLAS_PATHS {
            catalog
                .add_atlas_file(Path::new(atlas_path))
                .unwrap_or_else(|err| {
                    panic!("Failed to load atlas '{atlas_path}': {err}");
                });
        }
        if let Err(err) = validate_map_sprites(&map, &catalog) {
            panic!("Map failed sprite reference validation: {err}");
        }
        if let Err(err) = validate_clip_sprites(&clips, &catalog) {
            panic!("Clip set failed sprite reference validation: {err}");
        }

        let player = Player::new(map.spawn, clips);

        // Every atlas sheet referenced by the catalog must load, plus the
        // 1x1 white used by the collision debug quads.
        let mut textures = HashMap::new();
        for texture_path in catalog.texture_paths() {
            let gpu_texture =
                load_texture_asset(&gpu.device, &gpu.queue, &sprite_pipeline, &texture_path)
                    .unwrap_or_else(|err| panic!("Texture preflight failed: {err}"));
            textures.insert(texture_path, gpu_texture);
        }
        let white = Texture::from_rgba8(
            &gpu.device,
            &gpu.queue,
            &[255, 255, 255, 255],
            1,
            1,
            "debug_white",
        );
        let white_bind_group = sprite_pipeline.create_texture_bind_group(&gpu.device, &white);
        textures.insert(
            Arc::from(DEBUG_WHITE_ASSET),
            GpuSpriteTexture {
                texture: white,
                bind_group: white_bind_group,
            },
        );

        let canvas = Texture::render_target(
            &gpu.device,
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            gpu.surface_format,
            "Scene Canvas",
        );
        let canvas_bind_group = sprite_pipeline.create_texture_bind_group(&gpu.device, &canvas);

        let mut scene_camera = Camera2D::new((CANVAS_WIDTH, CANVAS_HEIGHT));
        scene_camera.position = camera_focus(&map, player.pos);
        let mut window_camera = Camera2D::new(gpu.size);
        window_camera.position = Vec2::new(gpu.size.0 as f32 / 2.0, gpu.size.1 as f32 / 2.0);
        let viewport = Viewport::fit(CANVAS_WIDTH, CANVAS_HEIGHT, gpu.size.0, gpu.size.1);

        let scene_camera_buffer =
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Scene Camera Buffer"),
                    contents: bytemuck::cast_slice(&[scene_camera.build_uniform()]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        let scene_camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &scene_camera_buffer);
        let window_camera_buffer =
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Window Camera Buffer"),
                    contents: bytemuck::cast_slice(&[window_camera.build_uniform()]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        let window_camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &window_camera_buffer);

        let composite_vertex_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Vertex Buffer"),
            size: (4 * std::mem::size_of::<SpriteVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let composite_index_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Index Buffer"),
            size: (6 * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let mut state = Self {
            window,
            gpu,
            sprite_pipeline,
            debug_overlay,
            clock: FrameClock::new(),
            input: InputState::new(),
            keyboard: KeyboardSource,
            gamepad: GamepadSource::new(),
            rng: rand::thread_rng(),
            map,
            catalog,
            player,
            textures,
            scene_camera,
            window_camera,
            viewport,
            canvas,
            canvas_bind_group,
            scene_camera_buffer,
            scene_camera_bind_group,
            window_camera_buffer,
            window_camera_bind_group,
            composite_vertex_buffer,
            composite_index_buffer,
            vertex_buffer,
            index_buffer,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            draw_calls: Vec::new(),
            sprite_count: 0,
            show_collision_debug: false,
            last_outcome: None,
        };

        // Startup order matters: textures above, then the first mesh and
        // the composite quad for the initial window size.
        state.rebuild_composite_quad();
        state.rebuild_scene_mesh();
        state
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.viewport = Viewport::fit(CANVAS_WIDTH, CANVAS_HEIGHT, width, height);
        self.window_camera.viewport = (width, height);
        self.window_camera.position = Vec2::new(width as f32 / 2.0, height as f32 / 2.0);
        self.rebuild_composite_quad();
        log::info!(
            "Resized to {}x{} (canvas scale {:.2})",
            width,
            height,
            self.viewport.scale
        );
    }

    /// Rewrite the composite quad to the letterboxed destination rect in
    /// window pixels. The bars are whatever the composite pass clears to.
    fn rebuild_composite_quad(&mut self) {
        let (x, y, w, h) = self.viewport.dest_rect();
        let vertices = [
            SpriteVertex {
                position: [x, y],
                tex_coords: [0.0, 0.0],
                color: [1.0, 1.0, 1.0, 1.0],
            },
            SpriteVertex {
                position: [x + w, y],
                tex_coords: [1.0, 0.0],
                color: [1.0, 1.0, 1.0, 1.0],
            },
            SpriteVertex {
                position: [x + w, y + h],
                tex_coords: [1.0, 1.0],
                color: [1.0, 1.0, 1.0, 1.0],
            },
            SpriteVertex {
                position: [x, y + h],
                tex_coords: [0.0, 1.0],
                color: [1.0, 1.0, 1.0, 1.0],
            },
        ];
        let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];
        self.gpu
            .queue
            .write_buffer(&self.composite_vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        self.gpu
            .queue
            .write_buffer(&self.composite_index_buffer, 0, bytemuck::cast_slice(&indices));
    }

    fn rebuild_scene_mesh(&mut self) {
        // Build a single CPU-side mesh each frame from the map, objects,
        // player, and debug overlays, then stream it into GPU buffers.
        let (vertices, indices, draw_calls) = self.build_mesh();
        self.ensure_mesh_capacity(vertices.len(), indices.len());
        self.sprite_count = vertices.len() / 4;
        self.draw_calls = draw_calls;

        if !vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        if !indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&indices));
        }
    }

    fn build_mesh(&self) -> (Vec<SpriteVertex>, Vec<u32>, Vec<DrawCall>) {
        let quad_estimate = self.map.tile_count() + self.map.objects().len() + 64;
        let mut vertices = Vec::with_capacity(quad_estimate * 4);
        let mut indices = Vec::with_capacity(quad_estimate * 6);
        let mut draw_calls = Vec::with_capacity(8);

        // Floor pass: tiles back to front so nearer tiles paint over
        // farther ones. The anchor is the top corner of the cell diamond.
        for tile in self.map.tiles_back_to_front() {
            let Some(entry) = self.catalog.resolve(&tile.sprite_id) else {
                log::warn!("Skipping tile ({}, {}): unresolved sprite '{}'",
                    tile.grid_x, tile.grid_y, tile.sprite_id);
                continue;
            };
            let anchor = self
                .map
                .world_to_screen(Vec2::new(tile.grid_x as f32, tile.grid_y as f32));
            let size = Vec2::new(entry.size_px.0 as f32, entry.size_px.1 as f32);
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key: &entry.texture_path,
                    top_left: anchor - Vec2::new(entry.pivot.0, entry.pivot.1) * size,
                    size,
                    uv: entry.uv,
                    color: [1.0, 1.0, 1.0, 1.0],
                },
            );
        }

        // Entity pass: objects and the player interleaved by isometric
        // depth (world x + y), so the player walks behind and in front of
        // scenery correctly.
        let mut entities: Vec<(f32, &str, Vec2)> =
            Vec::with_capacity(self.map.objects().len() + 1);
        for object in self.map.objects() {
            entities.push((
                object.pos.x + object.pos.y,
                object.sprite_id.as_str(),
                object.pos,
            ));
        }
        entities.push((
            self.player.pos.x + self.player.pos.y,
            self.player.sprite_id(),
            self.player.pos,
        ));
        entities.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        for (_, sprite_id, pos) in entities {
            let Some(entry) = self.catalog.resolve(sprite_id) else {
                log::warn!("Skipping entity: unresolved sprite '{sprite_id}'");
                continue;
            };
            let anchor = self.map.world_to_screen(pos);
            let size = Vec2::new(entry.size_px.0 as f32, entry.size_px.1 as f32);
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key: &entry.texture_path,
                    top_left: anchor - Vec2::new(entry.pivot.0, entry.pivot.1) * size,
                    size,
                    uv: entry.uv,
                    color: [1.0, 1.0, 1.0, 1.0],
                },
            );
        }

        // Collision debug overlay (F4): every solid box projected into the
        // diamond, drawn as translucent parallelograms over the scene.
        if self.show_collision_debug {
            let white_key: Arc<str> = Arc::from(DEBUG_WHITE_ASSET);
            for tile in self.map.tiles_back_to_front() {
                if !tile.solid {
                    continue;
                }
                let cell = Aabb {
                    min_x: tile.grid_x as f32,
                    min_y: tile.grid_y as f32,
                    max_x: (tile.grid_x + 1) as f32,
                    max_y: (tile.grid_y + 1) as f32,
                };
                self.add_world_box(&mut vertices, &mut indices, &mut draw_calls,
                    cell, DEBUG_SOLID_COLOR, &white_key);
            }
            for object in self.map.objects() {
                self.add_world_box(&mut vertices, &mut indices, &mut draw_calls,
                    object.hit, DEBUG_SOLID_COLOR, &white_key);
            }
            self.add_world_box(&mut vertices, &mut indices, &mut draw_calls,
                self.player.bounding_box(), DEBUG_PLAYER_COLOR, &white_key);
        }

        (vertices, indices, draw_calls)
    }

    /// Project a world-space box through the isometric transform and emit
    /// it as a filled parallelogram.
    fn add_world_box(
        &self,
        vertices: &mut Vec<SpriteVertex>,
        indices: &mut Vec<u32>,
        draw_calls: &mut Vec<DrawCall>,
        world_box: Aabb,
        color: [f32; 4],
        texture_key: &Arc<str>,
    ) {
        let corners = [
            self.map.world_to_screen(Vec2::new(world_box.min_x, world_box.min_y)),
            self.map.world_to_screen(Vec2::new(world_box.max_x, world_box.min_y)),
            self.map.world_to_screen(Vec2::new(world_box.max_x, world_box.max_y)),
            self.map.world_to_screen(Vec2::new(world_box.min_x, world_box.max_y)),
        ];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        push_corners(vertices, indices, draw_calls, corners, uvs, color, texture_key.clone());
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn overlay_stats(&self) -> OverlayStats {
        let outcome = self.last_outcome;
        OverlayStats {
            player_pos: (self.player.pos.x, self.player.pos.y),
            intent: outcome
                .map(|o| (o.intent.x, o.intent.y))
                .unwrap_or_default(),
            accepted_delta: outcome
                .map(|o| (o.accepted.x, o.accepted.y))
                .unwrap_or_default(),
            blocked: outcome.map(|o| o.blocked()).unwrap_or(false),
            gamepad_connected: self.gamepad.connected(),
            gamepad_angle_deg: self.gamepad.angle_deg,
            gamepad_magnitude: self.gamepad.magnitude,
            draw_calls: self.draw_calls.len() as u32,
            sprite_count: self.sprite_count as u32,
            viewport_scale: self.viewport.scale,
        }
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = iso_platform::window::create_window(event_loop, &self.config);
        self.state = Some(EngineState::new(window));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                state.resize(physical_size.width, physical_size.height);
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                // Simulation phase: one variable-dt step per redraw.
                let dt = state.clock.begin_frame();

                if state.input.was_pressed(Key::Escape) {
                    log::info!("Escape pressed, exiting.");
                    event_loop.exit();
                    return;
                }
                if state.input.was_pressed(Key::F3) {
                    state.debug_overlay.toggle();
                }
                if state.input.was_pressed(Key::F4) {
                    state.show_collision_debug = !state.show_collision_debug;
                    log::info!(
                        "Collision debug: {}",
                        if state.show_collision_debug { "ON" } else { "OFF" }
                    );
                }

                let intent = combined_intent(
                    &mut [&mut state.keyboard, &mut state.gamepad],
                    &state.input,
                );
                let outcome = state.player.step(intent, dt, &state.map);
                if outcome.blocked() {
                    log::debug!(
                        "Blocked at ({:.3}, {:.3}) intent ({:.2}, {:.2})",
                        state.player.pos.x,
                        state.player.pos.y,
                        outcome.intent.x,
                        outcome.intent.y
                    );
                }
                if outcome.fidget_completed {
                    let delay = state.rng.gen_range(FIDGET_DELAY_MIN..FIDGET_DELAY_MAX);
                    state.player.animator.set_fidget_delay(delay);
                    log::debug!("Next fidget in {delay:.2}s");
                }
                state.last_outcome = Some(outcome);
                state.scene_camera.position = camera_focus(&state.map, state.player.pos);

                state.rebuild_scene_mesh();

                // Render phase reads finalized simulation state.
                state.gpu.queue.write_buffer(
                    &state.scene_camera_buffer,
                    0,
                    bytemuck::cast_slice(&[state.scene_camera.build_uniform()]),
                );
                state.gpu.queue.write_buffer(
                    &state.window_camera_buffer,
                    0,
                    bytemuck::cast_slice(&[state.window_camera.build_uniform()]),
                );

                let Some(output) = state.gpu.begin_frame() else {
                    state.input.end_frame();
                    return;
                };
                let frame_view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());

                let stats = state.overlay_stats();
                let (egui_primitives, egui_textures_delta) =
                    state
                        .debug_overlay
                        .prepare(&state.window, &state.clock, Some(stats));
                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                // Pass 1: scene sprites into the fixed-size canvas.
                {
                    let mut last_bound_texture_key: Option<&Arc<str>> = None;
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Scene Render Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &state.canvas.view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color {
                                    r: 30.0 / 255.0,
                                    g: 30.0 / 255.0,
                                    b: 30.0 / 255.0,
                                    a: 1.0,
                                }),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    });

                    render_pass.set_pipeline(&state.sprite_pipeline.render_pipeline);
                    render_pass.set_bind_group(0, &state.scene_camera_bind_group, &[]);
                    render_pass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(state.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                    for draw in &state.draw_calls {
                        if let Some(texture) = state.textures.get(&draw.texture_key) {
                            let need_rebind = match last_bound_texture_key {
                                Some(last) => **last != *draw.texture_key,
                                None => true,
                            };
                            if need_rebind {
                                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                                last_bound_texture_key = Some(&draw.texture_key);
                            }
                            render_pass.draw_indexed(
                                draw.index_start..(draw.index_start + draw.index_count),
                                0,
                                0..1,
                            );
                        } else {
                            log::warn!("Draw call references missing texture '{}'", draw.texture_key);
                        }
                    }
                }

                // Pass 2: composite the canvas onto the window. The clear
                // is the letterbox bar color.
                {
                    let mut composite_pass =
                        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("Composite Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &frame_view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        });

                    composite_pass.set_pipeline(&state.sprite_pipeline.render_pipeline);
                    composite_pass.set_bind_group(0, &state.window_camera_bind_group, &[]);
                    composite_pass.set_bind_group(1, &state.canvas_bind_group, &[]);
                    composite_pass.set_vertex_buffer(0, state.composite_vertex_buffer.slice(..));
                    composite_pass.set_index_buffer(
                        state.composite_index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    composite_pass.draw_indexed(0..6, 0, 0..1);
                }

                state.debug_overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
                    &mut encoder,
                    &egui_primitives,
                    &egui_textures_delta,
                    &screen_descriptor,
                );

                // Pass 3: egui overlay at window resolution, over the bars.
                {
                    let mut egui_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &frame_view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();

                    state
                        .debug_overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.debug_overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                state.input.end_frame();
            }

            _ => {}
        }
    }
}

/// Where the scene camera looks: the projected player position lifted by
/// one tile height, which keeps the view on the character's torso rather
/// than the ground under its feet.
fn camera_focus(map: &TileMap, player_pos: Vec2) -> Vec2 {
    map.world_to_screen(player_pos) - Vec2::new(0.0, map.tile_height_px as f32)
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn add_quad(
    vertices: &mut Vec<SpriteVertex>,
    indices: &mut Vec<u32>,
    draw_calls: &mut Vec<DrawCall>,
    spec: QuadSpec<'_>,
) {
    let corners = [
        spec.top_left,
        spec.top_left + Vec2::new(spec.size.x, 0.0),
        spec.top_left + spec.size,
        spec.top_left + Vec2::new(0.0, spec.size.y),
    ];
    // Screen space is y-down, so the top-left vertex samples the top of
    // the sprite rect.
    let [u0, v0, u1, v1] = spec.uv;
    let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];
    push_corners(
        vertices,
        indices,
        draw_calls,
        corners,
        uvs,
        spec.color,
        spec.texture_key.clone(),
    );
}

fn push_corners(
    vertices: &mut Vec<SpriteVertex>,
    indices: &mut Vec<u32>,
    draw_calls: &mut Vec<DrawCall>,
    corners: [Vec2; 4],
    uvs: [[f32; 2]; 4],
    color: [f32; 4],
    texture_key: Arc<str>,
) {
    let base_index = vertices.len() as u32;
    for (corner, uv) in corners.iter().zip(uvs) {
        vertices.push(SpriteVertex {
            position: [corner.x, corner.y],
            tex_coords: uv,
            color,
        });
    }

    let draw_start = indices.len() as u32;
    indices.extend_from_slice(&[
        base_index,
        base_index + 1,
        base_index + 2,
        base_index,
        base_index + 2,
        base_index + 3,
    ]);

    push_draw_call(draw_calls, texture_key, draw_start, 6);
}

/// Append a draw call, merging with the previous one when the texture
/// matches and indices are contiguous. Tiles are emitted in draw order and
/// share one sheet, so the whole floor collapses into a single
/// `draw_indexed` call.
fn push_draw_call(
    draw_calls: &mut Vec<DrawCall>,
    texture_key: Arc<str>,
    index_start: u32,
    index_count: u32,
) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if *last.texture_key == *texture_key && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture_key,
        index_start,
        index_count,
    });
}

fn load_texture_asset(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &SpritePipeline,
    asset_path: &str,
) -> Result<GpuSpriteTexture, String> {
    let bytes = std::fs::read(asset_path)
        .map_err(|e| format!("Failed to read texture '{asset_path}': {e}"))?;
    let texture = Texture::from_bytes(device, queue, &bytes, asset_path)?;
    log::info!(
        "Loaded texture '{}' ({}x{})",
        asset_path,
        texture.size.0,
        texture.size.1
    );
    let bind_group = pipeline.create_texture_bind_group(device, &texture);
    Ok(GpuSpriteTexture {
        texture,
        bind_group,
    })
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F4 => Some(Key::F4),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Iso Realm starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
