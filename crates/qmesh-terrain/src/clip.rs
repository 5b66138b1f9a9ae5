//! Generic UV-space half-plane mesh splitting.
//!
//! Clips an indexed triangle mesh against a signed-distance function
//! over UV space, keeping the non-negative side. New vertices appear
//! at exact edge intersections with all attributes interpolated by the
//! same weight, and are deduplicated by their interpolated attribute
//! values so triangles sharing a split edge reuse one vertex.

use std::collections::HashMap;

use glam::{DVec2, DVec3, Vec3};

/// Classification epsilon for the half-plane test. Distinct from the
/// UV snap threshold below; they guard different failure modes.
pub const CLIP_EPSILON: f64 = 1e-6;

/// Split-introduced UVs this close to 0, 0.5, or 1 snap exactly onto
/// the value, keeping tile seams watertight under later atlasing.
pub const UV_SNAP_THRESHOLD: f64 = 1e-4;

/// A vertex carried through the splitter with its full attribute set.
#[derive(Debug, Clone, Copy)]
pub struct ClipVertex {
    /// Absolute world position.
    pub position: DVec3,
    /// Unit normal, if the mesh has normals.
    pub normal: Option<Vec3>,
    /// Tile-local UV.
    pub uv: DVec2,
}

/// Result of one split: a restricted index/attribute buffer plus a
/// flag marking vertices the split introduced.
#[derive(Debug, Clone, Default)]
pub struct ClippedData {
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
    /// Vertex attributes.
    pub vertices: Vec<ClipVertex>,
    /// True for vertices created at split intersections, false for
    /// vertices copied unchanged from the input.
    pub vertex_is_clipped: Vec<bool>,
}

const SNAP_TARGETS: [f64; 3] = [0.0, 0.5, 1.0];

fn snap_uv_component(value: f64) -> f64 {
    for target in SNAP_TARGETS {
        if (value - target).abs() < UV_SNAP_THRESHOLD {
            return target;
        }
    }
    value
}

/// Snap a split-introduced UV onto the nearest seam value.
#[must_use]
pub fn snap_uv(uv: DVec2) -> DVec2 {
    DVec2::new(snap_uv_component(uv.x), snap_uv_component(uv.y))
}

fn lerp_vertex(a: &ClipVertex, b: &ClipVertex, t: f64) -> ClipVertex {
    let normal = match (a.normal, b.normal) {
        (Some(na), Some(nb)) => Some(na.lerp(nb, t as f32).normalize_or_zero()),
        _ => None,
    };
    ClipVertex {
        position: a.position.lerp(b.position, t),
        normal,
        uv: snap_uv(a.uv.lerp(b.uv, t)),
    }
}

/// Hashable bit-exact key over every interpolated attribute.
#[derive(Hash, PartialEq, Eq)]
struct AttributeKey([u64; 8]);

impl AttributeKey {
    fn new(v: &ClipVertex) -> Self {
        let n = v.normal.unwrap_or(Vec3::ZERO);
        Self([
            v.position.x.to_bits(),
            v.position.y.to_bits(),
            v.position.z.to_bits(),
            u64::from(n.x.to_bits()),
            u64::from(n.y.to_bits()),
            u64::from(n.z.to_bits()),
            v.uv.x.to_bits(),
            v.uv.y.to_bits(),
        ])
    }
}

struct ClipBuilder<'a> {
    source: &'a [ClipVertex],
    out: ClippedData,
    /// Original vertex index -> output index.
    copied: HashMap<u32, u32>,
    /// Interpolated attribute values -> output index.
    introduced: HashMap<AttributeKey, u32>,
}

impl<'a> ClipBuilder<'a> {
    fn new(source: &'a [ClipVertex]) -> Self {
        Self {
            source,
            out: ClippedData::default(),
            copied: HashMap::new(),
            introduced: HashMap::new(),
        }
    }

    fn copy_original(&mut self, index: u32) -> u32 {
        if let Some(&mapped) = self.copied.get(&index) {
            return mapped;
        }
        let mapped = self.out.vertices.len() as u32;
        self.out.vertices.push(self.source[index as usize]);
        self.out.vertex_is_clipped.push(false);
        self.copied.insert(index, mapped);
        mapped
    }

    fn add_introduced(&mut self, vertex: ClipVertex) -> u32 {
        let key = AttributeKey::new(&vertex);
        if let Some(&mapped) = self.introduced.get(&key) {
            return mapped;
        }
        let mapped = self.out.vertices.len() as u32;
        self.out.vertices.push(vertex);
        self.out.vertex_is_clipped.push(true);
        self.introduced.insert(key, mapped);
        mapped
    }
}

/// Polygon corner produced while clipping one triangle.
enum Corner {
    Original(u32),
    Introduced(ClipVertex),
}

/// Clip `indices` over `vertices` against `sdf`, keeping the side
/// where the distance is non-negative.
///
/// Triangles lying entirely on the split line are degenerate in the
/// kept half and are dropped.
#[must_use]
pub fn clip_mesh(
    vertices: &[ClipVertex],
    indices: &[u32],
    sdf: impl Fn(DVec2) -> f64,
) -> ClippedData {
    let mut builder = ClipBuilder::new(vertices);

    for tri in indices.chunks_exact(3) {
        let distances = [
            sdf(vertices[tri[0] as usize].uv),
            sdf(vertices[tri[1] as usize].uv),
            sdf(vertices[tri[2] as usize].uv),
        ];

        // Entirely on the split boundary: zero area in the kept half.
        if distances.iter().all(|d| d.abs() <= CLIP_EPSILON) {
            continue;
        }
        // Entirely outside.
        if distances.iter().all(|&d| d < -CLIP_EPSILON) {
            continue;
        }

        // Entirely inside (boundary counts as inside).
        if distances.iter().all(|&d| d >= -CLIP_EPSILON) {
            let mapped = [
                builder.copy_original(tri[0]),
                builder.copy_original(tri[1]),
                builder.copy_original(tri[2]),
            ];
            builder.out.indices.extend_from_slice(&mapped);
            continue;
        }

        // Straddling: clip the triangle polygon against the half-plane.
        let mut polygon: Vec<Corner> = Vec::with_capacity(4);
        for i in 0..3 {
            let j = (i + 1) % 3;
            let di = distances[i];
            let dj = distances[j];
            if di >= -CLIP_EPSILON {
                polygon.push(Corner::Original(tri[i]));
            }
            let crosses = (di > CLIP_EPSILON && dj < -CLIP_EPSILON)
                || (di < -CLIP_EPSILON && dj > CLIP_EPSILON);
            if crosses {
                let t = di / (di - dj);
                let a = &vertices[tri[i] as usize];
                let b = &vertices[tri[j] as usize];
                polygon.push(Corner::Introduced(lerp_vertex(a, b, t)));
            }
        }

        if polygon.len() < 3 {
            continue;
        }

        let mapped: Vec<u32> = polygon
            .into_iter()
            .map(|corner| match corner {
                Corner::Original(i) => builder.copy_original(i),
                Corner::Introduced(v) => builder.add_introduced(v),
            })
            .collect();

        for fan in 1..mapped.len() - 1 {
            builder
                .out
                .indices
                .extend_from_slice(&[mapped[0], mapped[fan], mapped[fan + 1]]);
        }
    }

    builder.out
}

/// The half-plane test for one quadrant axis: distance from the UV
/// midline, oriented so the kept half is non-negative.
#[must_use]
pub fn midline_sdf(vertical_axis: bool, keep_low: bool) -> impl Fn(DVec2) -> f64 {
    move |uv: DVec2| {
        let coordinate = if vertical_axis { uv.y } else { uv.x };
        if keep_low {
            0.5 - coordinate
        } else {
            coordinate - 0.5
        }
    }
}
