//! Oct-encoded normal compression.
//!
//! Unit normals travel as two bytes via the oct32p mapping: the vector
//! is projected onto the octahedron `|x|+|y|+|z| = 1` and the lower
//! half is folded over into the unit square.

use glam::Vec3;

fn sign_not_zero(v: f32) -> f32 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

/// Decode a two-byte oct32p code into a unit vector.
#[must_use]
pub fn oct_decode(x: u8, y: u8) -> Vec3 {
    let mut px = f32::from(x) / 255.0 * 2.0 - 1.0;
    let mut py = f32::from(y) / 255.0 * 2.0 - 1.0;
    let pz = 1.0 - (px.abs() + py.abs());

    if pz < 0.0 {
        // Unfold the folded lower hemisphere.
        let old_x = px;
        px = (1.0 - py.abs()) * sign_not_zero(old_x);
        py = (1.0 - old_x.abs()) * sign_not_zero(py);
    }

    Vec3::new(px, py, pz).normalize()
}

/// Encode a unit vector into its two-byte oct32p code.
#[must_use]
pub fn oct_encode(normal: Vec3) -> (u8, u8) {
    let inv_l1 = 1.0 / (normal.x.abs() + normal.y.abs() + normal.z.abs());
    let mut px = normal.x * inv_l1;
    let mut py = normal.y * inv_l1;

    if normal.z < 0.0 {
        let old_x = px;
        px = (1.0 - py.abs()) * sign_not_zero(old_x);
        py = (1.0 - old_x.abs()) * sign_not_zero(py);
    }

    let to_byte = |v: f32| ((v.clamp(-1.0, 1.0) + 1.0) * 0.5 * 255.0).round() as u8;
    (to_byte(px), to_byte(py))
}

/// Decode a packed per-vertex normal buffer (2 bytes per vertex).
#[must_use]
pub fn decode_normal_buffer(packed: &[u8]) -> Vec<Vec3> {
    packed
        .chunks_exact(2)
        .map(|pair| oct_decode(pair[0], pair[1]))
        .collect()
}
