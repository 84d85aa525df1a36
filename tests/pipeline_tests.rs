//! End-to-end frames through every render mode.

use glam::{Vec3, Vec4};

use hzb_rs::{
    engine::{Engine, EngineConfig, FAR_DEPTH, RenderMode, Shading},
    renderer::{Framebuffer, pack_rgb},
    world::{Camera, Mesh, Triangle, scene},
};

const FOV: f32 = std::f32::consts::FRAC_PI_3;

fn engine(w: usize, h: usize, mode: RenderMode) -> Engine {
    Engine::new(
        w,
        h,
        EngineConfig {
            mode,
            ..EngineConfig::default()
        },
    )
    .unwrap()
}

fn cam(pos: Vec3, yaw: f32, pitch: f32, w: usize, h: usize) -> Camera {
    Camera::new(pos, yaw, pitch, FOV, w as f32 / h as f32)
}

/// Render once and return the presented image plus the depth buffer.
fn render(e: &mut Engine, camera: &Camera, mesh: &Mesh) -> (Vec<u32>, Vec<f32>) {
    let s = e.screen();
    let mut fb = Framebuffer::new(s.w, s.h);
    e.render_frame(camera, mesh, &Shading::default(), &mut fb)
        .unwrap();
    (fb.front().to_vec(), e.depth_buffer().as_slice().to_vec())
}

#[test]
fn all_modes_produce_identical_frames() {
    let (w, h) = (64, 48);
    let cases = [
        (scene::occluder_scene(), cam(Vec3::new(0.0, 0.0, 10.0), 0.0, 0.0, w, h)),
        (scene::occluder_scene(), cam(Vec3::new(9.0, 4.0, 12.0), 0.5, -0.1, w, h)),
        (scene::cube_grid(4, 2.5, 0.6), cam(Vec3::new(0.5, 0.7, 14.0), 0.1, 0.05, w, h)),
        // inside the grid: geometry crosses the near plane and octree cubes
        // straddle the eye
        (scene::cube_grid(4, 2.5, 0.6), cam(Vec3::new(0.2, 0.3, 1.1), 0.7, 0.2, w, h)),
        (scene::uv_sphere(Vec3::new(0.0, 0.0, -4.0), 2.0, 12, 18), cam(Vec3::ZERO, 0.0, 0.0, w, h)),
    ];

    for (i, (mesh, camera)) in cases.iter().enumerate() {
        let mut reference = None;
        for mode in RenderMode::ALL {
            let mut e = engine(w, h, mode);
            let frame = render(&mut e, camera, mesh);
            match &reference {
                None => reference = Some(frame),
                Some(expected) => {
                    assert!(frame.0 == expected.0, "case {i}: {} colour differs", mode.name());
                    assert!(frame.1 == expected.1, "case {i}: {} depth differs", mode.name());
                }
            }
        }
    }
}

#[test]
fn submission_order_does_not_change_the_image() {
    // two triangles crossing each other in depth
    let a = Triangle::from_positions(
        Vec3::new(-2.0, -1.5, -6.0),
        Vec3::new(2.0, -1.5, -4.0),
        Vec3::new(0.0, 1.8, -5.0),
    );
    let b = Triangle::from_positions(
        Vec3::new(-2.0, 1.5, -4.0),
        Vec3::new(0.0, -1.8, -5.2),
        Vec3::new(2.0, 1.5, -6.0),
    );
    let (w, h) = (48, 48);
    let camera = cam(Vec3::ZERO, 0.0, 0.0, w, h);

    for mode in RenderMode::ALL {
        let ab = render(&mut engine(w, h, mode), &camera, &Mesh::new(vec![a, b]));
        let ba = render(&mut engine(w, h, mode), &camera, &Mesh::new(vec![b, a]));
        assert!(ab.0 == ba.0, "{} colour depends on order", mode.name());
        assert!(ab.1 == ba.1, "{} depth depends on order", mode.name());
    }
}

#[test]
fn screen_filling_quad_writes_every_pixel_once_at_its_depth() {
    let (w, h) = (40, 30);
    let camera = cam(Vec3::ZERO, 0.0, 0.0, w, h);
    let mesh = scene::quad_z(Vec3::new(0.13, -0.07, -5.0), 20.0, 20.0);

    let clip = camera.projection_matrix() * camera.view_matrix() * Vec4::new(0.0, 0.0, -5.0, 1.0);
    let expected_z = clip.z / clip.w;
    let color = pack_rgb(Shading::default().flat_color(&mesh.faces()[0]));

    for mode in RenderMode::ALL {
        let mut e = engine(w, h, mode);
        let (image, depth) = render(&mut e, &camera, &mesh);
        assert_eq!(e.stats().pixels_written as usize, w * h, "{}", mode.name());
        assert!(image.iter().all(|&p| p == color));
        assert!(depth.iter().all(|&z| (z - expected_z).abs() < 1e-5));
    }
}

#[test]
fn single_triangle_covers_half_the_screen() {
    let (w, h) = (32, 32);
    let camera = cam(Vec3::ZERO, 0.0, 0.0, w, h);
    // lower-left half of a screen-filling square, clipped to the frustum
    let mesh = Mesh::new(vec![Triangle::from_positions(
        Vec3::new(-20.0, -20.0, -5.0),
        Vec3::new(20.0, -20.0, -5.0),
        Vec3::new(-20.0, 20.0, -5.0),
    )]);
    let mut e = engine(w, h, RenderMode::ZBuffer);
    let (_, depth) = render(&mut e, &camera, &mesh);

    let covered = depth.iter().filter(|&&z| z != FAR_DEPTH).count();
    // hypotenuse runs corner to corner; row y covers pixels [0, y)
    assert_eq!(covered, 31 * 32 / 2);
    assert_ne!(depth[(h - 1) * w], FAR_DEPTH); // bottom-left
    assert_eq!(depth[w - 1], FAR_DEPTH); // top-right
    assert!(e.stats().polygons_rasterized >= 1);
}

#[test]
fn octree_skips_subtree_hidden_behind_the_wall() {
    let (w, h) = (64, 64);
    let mesh = scene::occluder_scene();
    let camera = cam(Vec3::new(0.0, 0.0, 10.0), 0.0, 0.0, w, h);

    let mut e = engine(w, h, RenderMode::Octree);
    let (image, _) = render(&mut e, &camera, &mesh);
    let stats = e.stats();

    assert!(stats.nodes_culled >= 1);
    assert!((stats.triangles_visited as usize) < mesh.len());
    let wall = pack_rgb(Shading::default().flat_color(&mesh.faces()[0]));
    assert!(image.iter().all(|&p| p == wall));

    // the plain per-triangle path has to look at everything
    let mut flat = engine(w, h, RenderMode::Hierarchical);
    render(&mut flat, &camera, &mesh);
    assert_eq!(flat.stats().triangles_visited as usize, mesh.len());
    assert!(flat.stats().occluded > 0);
}

#[test]
fn hierarchy_matches_depth_buffer_after_a_frame() {
    let (w, h) = (37, 23);
    let mesh = scene::cube_grid(3, 2.5, 0.8);
    let camera = cam(Vec3::new(1.0, 0.5, 9.0), 0.15, -0.05, w, h);

    for mode in [RenderMode::Hierarchical, RenderMode::Octree] {
        let mut e = engine(w, h, mode);
        render(&mut e, &camera, &mesh);
        let tree = e.hierarchy();
        let zb = e.depth_buffer();

        for y in 0..h {
            for x in 0..w {
                let leaf = tree.node(tree.leaf_code(x, y)).unwrap();
                assert_eq!(leaf.depth, zb.get(x, y), "leaf ({x},{y})");
            }
        }
        for node in tree.nodes().filter(|n| !n.is_leaf()) {
            assert_eq!(node.depth, tree.recomputed_depth(node.code));
        }
    }
}

#[test]
fn mode_switch_reuses_engine_state() {
    let (w, h) = (32, 24);
    let mesh = scene::occluder_scene();
    let camera = cam(Vec3::new(0.0, 0.0, 10.0), 0.0, 0.0, w, h);
    let mut e = engine(w, h, RenderMode::Octree);

    let first = render(&mut e, &camera, &mesh);
    e.set_mode(RenderMode::ZBuffer);
    let second = render(&mut e, &camera, &mesh);
    e.set_mode(RenderMode::Octree);
    let third = render(&mut e, &camera, &mesh);

    assert!(first.0 == second.0 && second.0 == third.0);
    assert_eq!(e.mode(), RenderMode::Octree);
}
