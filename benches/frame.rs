/// Frame-time comparison of the three visibility strategies, plus the
/// structures they are built from.
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use glam::{IVec2, Vec3};
use hzb_rs::{
    engine::{
        Engine, EngineConfig, OcclusionHierarchy, OctreeParams, RenderMode, Shading, SpatialIndex,
    },
    renderer::Framebuffer,
    world::{Camera, scene},
};

const W: usize = 640;
const H: usize = 480;

fn bench_render_modes(c: &mut Criterion) {
    let mesh = scene::occluder_scene();
    let camera = Camera::new(
        Vec3::new(0.0, 0.0, 10.0),
        0.0,
        0.0,
        60_f32.to_radians(),
        W as f32 / H as f32,
    );
    let shading = Shading::default();

    let mut group = c.benchmark_group("render_frame_occluder");
    for mode in RenderMode::ALL {
        let mut engine = Engine::new(
            W,
            H,
            EngineConfig {
                mode,
                ..EngineConfig::default()
            },
        )
        .unwrap();
        engine.load_mesh(&mesh);
        let mut fb = Framebuffer::new(W, H);

        group.bench_with_input(BenchmarkId::from_parameter(mode.name()), &mode, |b, _| {
            b.iter(|| {
                engine
                    .render_frame(black_box(&camera), &mesh, &shading, &mut fb)
                    .unwrap();
            });
        });
    }
    group.finish();
}

fn bench_octree_build(c: &mut Criterion) {
    let mesh = scene::cube_grid(10, 2.5, 0.6);
    c.bench_function("octree_build_cube_grid_10", |b| {
        b.iter(|| SpatialIndex::build(black_box(mesh.faces()), OctreeParams::default()));
    });
}

fn bench_hierarchy_update(c: &mut Criterion) {
    let mut tree = OcclusionHierarchy::new(W, H).unwrap();
    c.bench_function("hierarchy_update_row", |b| {
        b.iter(|| {
            tree.reset();
            for x in 0..W {
                tree.update(x, H / 2, black_box(0.5));
            }
        });
    });

    let pts = [IVec2::new(10, 10), IVec2::new(40, 12), IVec2::new(20, 35)];
    c.bench_function("hierarchy_is_occluded", |b| {
        b.iter(|| tree.is_occluded(black_box(&pts), 0.7));
    });
}

criterion_group!(
    benches,
    bench_render_modes,
    bench_octree_build,
    bench_hierarchy_update
);
criterion_main!(benches);
