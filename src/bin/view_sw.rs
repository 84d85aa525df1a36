//! Interactive viewer for the hierarchical z-buffer renderer.
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- --mode octree --scene occluder
//! cargo run --release -- --headless --frames 200 --mode hierarchical
//! ```
//!
//! Keys: W/S/↑/↓ move, A/D strafe, ←/→ turn, PgUp/PgDn look up/down,
//! Space/LShift rise/sink, 1/2/3 switch render mode.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use glam::Vec3;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use hzb_rs::{
    engine::{Engine, EngineConfig, FrameStats, OctreeParams, RenderMode, Shading},
    renderer::Framebuffer,
    world::{Camera, Mesh, scene},
};

const MOVE_SPEED: f32 = 0.25;
const TURN_SPEED: f32 = 0.03;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Zbuffer,
    Hierarchical,
    Octree,
}

impl From<ModeArg> for RenderMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Zbuffer => RenderMode::ZBuffer,
            ModeArg::Hierarchical => RenderMode::Hierarchical,
            ModeArg::Octree => RenderMode::Octree,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SceneArg {
    /// Big wall hiding a sphere cluster.
    Occluder,
    /// Lattice of small cubes.
    Grid,
    /// One finely tessellated sphere.
    Sphere,
}

#[derive(Parser, Debug)]
#[command(about = "Hierarchical z-buffer scan-line renderer")]
struct Args {
    #[arg(long, default_value_t = 800)]
    width: usize,
    #[arg(long, default_value_t = 600)]
    height: usize,
    #[arg(long, value_enum, default_value_t = ModeArg::Octree)]
    mode: ModeArg,
    #[arg(long, value_enum, default_value_t = SceneArg::Occluder)]
    scene: SceneArg,
    /// Octree split threshold (triangles per node).
    #[arg(long, default_value_t = 10)]
    threshold: usize,
    /// Octree depth cap.
    #[arg(long, default_value_t = 8)]
    max_depth: u32,
    /// Render without a window and exit.
    #[arg(long)]
    headless: bool,
    /// Frames to render in headless mode.
    #[arg(long, default_value_t = 100)]
    frames: u32,
}

fn build_scene(which: SceneArg) -> (Mesh, Camera) {
    let fov = 60_f32.to_radians();
    match which {
        SceneArg::Occluder => (
            scene::occluder_scene(),
            Camera::new(Vec3::new(0.0, 0.0, 10.0), 0.0, 0.0, fov, 1.0),
        ),
        SceneArg::Grid => (
            scene::cube_grid(8, 2.5, 0.6),
            Camera::new(Vec3::new(0.0, 0.0, 25.0), 0.0, 0.0, fov, 1.0),
        ),
        SceneArg::Sphere => (
            scene::uv_sphere(Vec3::ZERO, 3.0, 64, 96),
            Camera::new(Vec3::new(0.0, 0.0, 9.0), 0.0, 0.0, fov, 1.0),
        ),
    }
}

/// Rolling frame-time average, reported through `log` every few seconds.
struct FrameTimer {
    acc_time: Duration,
    acc_frames: u32,
    last_print: Instant,
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            acc_time: Duration::ZERO,
            acc_frames: 0,
            last_print: Instant::now(),
        }
    }

    fn record(&mut self, frame: Duration, mode: RenderMode, stats: &FrameStats) {
        self.acc_time += frame;
        self.acc_frames += 1;
        if self.last_print.elapsed() < Duration::from_secs(3) {
            return;
        }
        let avg_ms = self.acc_time.as_secs_f64() * 1000.0 / self.acc_frames as f64;
        log::info!(
            "{}: avg {:.2} ms ({:.1} FPS) | nodes {}/{} culled | tris {} visited, {} occluded, {} clipped | px {}",
            mode.name(),
            avg_ms,
            1000.0 / avg_ms,
            stats.nodes_culled,
            stats.nodes_visited + stats.nodes_culled,
            stats.triangles_visited,
            stats.occluded,
            stats.clipped_away,
            stats.pixels_written,
        );
        self.acc_time = Duration::ZERO;
        self.acc_frames = 0;
        self.last_print = Instant::now();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = EngineConfig {
        mode: args.mode.into(),
        octree: OctreeParams {
            threshold: args.threshold,
            max_depth: args.max_depth,
        },
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(args.width, args.height, config)
        .with_context(|| format!("creating a {}x{} engine", args.width, args.height))?;

    let (mesh, mut camera) = build_scene(args.scene);
    camera.set_aspect(args.width as f32 / args.height as f32);
    engine.load_mesh(&mesh);
    log::info!("{:?} scene: {} triangles", args.scene, mesh.len());

    let shading = Shading::default();
    let mut fb = Framebuffer::new(args.width, args.height);
    let mut timer = FrameTimer::new();

    if args.headless {
        for _ in 0..args.frames {
            let t0 = Instant::now();
            engine.render_frame(&camera, &mesh, &shading, &mut fb)?;
            timer.record(t0.elapsed(), engine.mode(), &engine.stats());
            camera.turn(0.002);
        }
        log::info!(
            "rendered {} frames, last: {:?}",
            fb.frames_presented(),
            engine.stats()
        );
        return Ok(());
    }

    let mut win = Window::new(
        "Hierarchical z-buffer",
        args.width,
        args.height,
        WindowOptions::default(),
    )?;
    win.set_target_fps(60);

    const MODE_KEYS: [(Key, RenderMode); 3] = [
        (Key::Key1, RenderMode::ZBuffer),
        (Key::Key2, RenderMode::Hierarchical),
        (Key::Key3, RenderMode::Octree),
    ];

    while win.is_open() && !win.is_key_down(Key::Escape) {
        for (key, mode) in MODE_KEYS {
            if win.is_key_pressed(key, KeyRepeat::No) {
                engine.set_mode(mode);
                log::info!("mode: {}", mode.name());
            }
        }

        /* movement ---------------------------------------------------------- */
        let axis = |pos: &[Key], neg: &[Key]| {
            let down = |keys: &[Key]| keys.iter().any(|&k| win.is_key_down(k));
            down(pos) as i32 as f32 - down(neg) as i32 as f32
        };
        let forward = axis(&[Key::W, Key::Up], &[Key::S, Key::Down]);
        let side = axis(&[Key::D], &[Key::A]);
        let up = axis(&[Key::Space], &[Key::LeftShift]);
        camera.step(forward * MOVE_SPEED, side * MOVE_SPEED, up * MOVE_SPEED);
        camera.turn(axis(&[Key::Left], &[Key::Right]) * TURN_SPEED);
        camera.tilt(axis(&[Key::PageUp], &[Key::PageDown]) * TURN_SPEED);

        /* draw ---------------------------------------------------------------- */
        let t0 = Instant::now();
        engine.render_frame(&camera, &mesh, &shading, &mut fb)?;
        timer.record(t0.elapsed(), engine.mode(), &engine.stats());

        win.update_with_buffer(fb.front(), fb.width(), fb.height())?;
    }
    Ok(())
}
