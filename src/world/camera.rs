use glam::{Mat4, Vec3};

/// Free-flying perspective view-point in world space.
///
/// * Right-handed, +Y up; `yaw = 0, pitch = 0` looks down -Z.
/// * Projection follows the OpenGL clip convention (`-w ≤ z ≤ w`).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub pos: Vec3,
    pub yaw: f32,   // radians, positive = turn left
    pub pitch: f32, // radians, positive = look up
    fov: f32,       // vertical FoV (radians)
    aspect: f32,
    near: f32,
    far: f32,
}

/// Keep the view just short of straight up/down so `look_to` stays defined.
const PITCH_LIMIT: f32 = 1.55;

impl Camera {
    /// Create a camera at `pos` looking along `yaw`/`pitch` with vertical FoV `fov`.
    pub fn new(pos: Vec3, yaw: f32, pitch: f32, fov: f32, aspect: f32) -> Self {
        Self {
            pos,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            fov,
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Same camera with different clip distances.
    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    #[inline]
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    #[inline(always)]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[inline(always)]
    pub fn far(&self) -> f32 {
        self.far
    }

    #[inline(always)]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the camera looks.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    /// Unit vector pointing to the camera's right, parallel to the ground.
    #[inline]
    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, -sy)
    }

    /*──────────────────────── matrices ──────────────────────────────*/

    /// World → view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.pos, self.forward(), Vec3::Y)
    }

    /// View → clip transform.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect, self.near, self.far)
    }

    /// Depth of a world point along the view direction (positive in front).
    #[inline]
    pub fn view_depth(&self, p: Vec3) -> f32 {
        (p - self.pos).dot(self.forward())
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units along the view direction, `side` units to the
    /// right and `up` units along world +Y.
    pub fn step(&mut self, forward: f32, side: f32, up: f32) {
        self.pos += self.forward() * forward + self.right() * side + Vec3::Y * up;
    }

    /// Rotate around world Y (positive = turn left).
    pub fn turn(&mut self, delta_yaw: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
    }

    /// Look up/down, clamped short of the poles.
    pub fn tilt(&mut self, delta_pitch: f32) {
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
