//! ----------------------------------------------------------------------------
//! **Homogeneous polygon clipper** (Sutherland–Hodgman)
//!
//! Works on clip-space positions (`projection * view * p`) *before* the
//! perspective divide, against the OpenGL clip volume
//!
//! ```text
//! -w ≤ x ≤ w      -w ≤ y ≤ w      -w ≤ z ≤ w
//! ```
//!
//! A leading `w ≥ W_EPSILON` plane discards everything at or behind the eye,
//! so the six canonical planes and the later divide never see `w ≤ 0`.
//! ----------------------------------------------------------------------------

use glam::Vec4;
use smallvec::SmallVec;

/// Smallest `w` a clipped vertex may carry.
pub const W_EPSILON: f32 = 1e-5;

/// Clipped convex polygon. A triangle gains at most one vertex per plane.
pub type ClipPolygon = SmallVec<[Vec4; 10]>;

/// The half-spaces a polygon is clipped against, in clipping order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipPlane {
    /// `w ≥ W_EPSILON`
    W,
    /// `x ≥ -w`
    Left,
    /// `x ≤ w`
    Right,
    /// `y ≥ -w`
    Bottom,
    /// `y ≤ w`
    Top,
    /// `z ≥ -w`
    Near,
    /// `z ≤ w`
    Far,
}

impl ClipPlane {
    pub const ALL: [ClipPlane; 7] = [
        ClipPlane::W,
        ClipPlane::Left,
        ClipPlane::Right,
        ClipPlane::Bottom,
        ClipPlane::Top,
        ClipPlane::Near,
        ClipPlane::Far,
    ];

    /// The six planes of the canonical view volume.
    pub const CANONICAL: [ClipPlane; 6] = [
        ClipPlane::Left,
        ClipPlane::Right,
        ClipPlane::Bottom,
        ClipPlane::Top,
        ClipPlane::Near,
        ClipPlane::Far,
    ];

    /// Signed distance, `≥ 0` inside.
    #[inline]
    pub fn distance(self, v: Vec4) -> f32 {
        match self {
            ClipPlane::W => v.w - W_EPSILON,
            ClipPlane::Left => v.w + v.x,
            ClipPlane::Right => v.w - v.x,
            ClipPlane::Bottom => v.w + v.y,
            ClipPlane::Top => v.w - v.y,
            ClipPlane::Near => v.w + v.z,
            ClipPlane::Far => v.w - v.z,
        }
    }
}

/// Intersect `input` with the whole clip volume.
///
/// Returns an empty polygon when nothing survives, the input unchanged (same
/// vertices, same order) when it is already inside, or a new convex polygon.
pub fn clip(input: &[Vec4]) -> ClipPolygon {
    let mut cur: ClipPolygon = input.iter().copied().collect();
    let mut next = ClipPolygon::new();

    for plane in ClipPlane::ALL {
        if cur.len() < 3 {
            break;
        }
        if cur.iter().all(|&v| plane.distance(v) >= 0.0) {
            continue; // trivially inside this plane
        }
        next.clear();
        clip_against(plane, &cur, &mut next);
        std::mem::swap(&mut cur, &mut next);
    }

    if cur.len() < 3 {
        cur.clear();
    }
    cur
}

/// One Sutherland–Hodgman pass.
fn clip_against(plane: ClipPlane, input: &[Vec4], out: &mut ClipPolygon) {
    let n = input.len();
    for i in 0..n {
        let a = input[i];
        let b = input[(i + 1) % n];
        let da = plane.distance(a);
        let db = plane.distance(b);

        if da >= 0.0 {
            out.push(a);
        }
        // only a crossing edge is split; the signs differ so `da - db ≠ 0`
        if (da >= 0.0) != (db >= 0.0) {
            let t = da / (da - db);
            out.push(a.lerp(b, t));
        }
    }
}

/// Triangulate a convex polygon as a fan around its first vertex.
///
/// Generic so the same fan can be taken after projection.
pub fn fan<T: Copy>(poly: &[T]) -> impl Iterator<Item = [T; 3]> + '_ {
    (1..poly.len().saturating_sub(1)).map(move |i| [poly[0], poly[i], poly[i + 1]])
}

/// True if `v` satisfies all six canonical half-spaces within `eps` (scaled
/// by `|w|`).
pub fn is_inside(v: Vec4, eps: f32) -> bool {
    let tol = eps * v.w.abs().max(1.0);
    ClipPlane::CANONICAL
        .iter()
        .all(|p| p.distance(v) >= -tol)
}

/*──────────────────────────────── Tests ───────────────────────────────*/
