//! End-to-end pipeline: raw tile bytes through decode, build, wire
//! transport, and quadrant upsampling.

use glam::Vec3;
use qmesh_decode::{oct_encode, zig_zag_encode};
use qmesh_terrain::{
    BuildOptions, DecodeOptions, DecodeTask, Ellipsoid, GeoBox, GroupKind, build, from_wire_format,
    run_task, to_wire_format,
};

/// Single-quad tile with a west-to-east height gradient, up-facing
/// normals, a water-covered 1x1 mask, and JSON metadata.
fn tile_buffer() -> Vec<u8> {
    let mut buf = Vec::new();

    for v in [0.0f64; 3] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.extend_from_slice(&0.0f32.to_le_bytes());
    buf.extend_from_slice(&1000.0f32.to_le_bytes());
    for v in [0.0f64, 0.0, 0.0, 6_400_000.0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    for v in [0.0f64; 3] {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    // Corners: 0 = SW, 1 = SE, 2 = NW, 3 = NE; height follows u.
    buf.extend_from_slice(&4u32.to_le_bytes());
    let u = [0i16, 32767, -32767, 32767];
    let v = [0i16, 0, 32767, 0];
    let h = [0i16, 32767, -32767, 32767];
    for stream in [u, v, h] {
        for d in stream {
            buf.extend_from_slice(&zig_zag_encode(d).to_le_bytes());
        }
    }

    buf.extend_from_slice(&2u32.to_le_bytes());
    for code in [0u16, 0, 0, 2, 0, 2] {
        buf.extend_from_slice(&code.to_le_bytes());
    }

    for edge in [[0u16, 2], [0, 1], [1, 3], [2, 3]] {
        buf.extend_from_slice(&2u32.to_le_bytes());
        for i in edge {
            buf.extend_from_slice(&i.to_le_bytes());
        }
    }

    // Oct-encoded vertex normals.
    buf.push(1);
    buf.extend_from_slice(&8u32.to_le_bytes());
    for _ in 0..4 {
        let (x, y) = oct_encode(Vec3::Z);
        buf.push(x);
        buf.push(y);
    }

    // 1x1 water mask, fully water.
    buf.push(2);
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.push(255);

    // Metadata.
    let json = br#"{"geometricerror":42.0}"#;
    buf.push(4);
    buf.extend_from_slice(&(4 + json.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(json.len() as u32).to_le_bytes());
    buf.extend_from_slice(json);

    buf
}

fn geo_box() -> GeoBox {
    // Small tile so interpolated clip vertices sit on the surface to
    // well under the assertion tolerances.
    GeoBox::new(0.0, 0.0, 1e-4, 1e-4)
}

#[test]
fn decode_and_build_carries_extensions() {
    let decoded = qmesh_decode::decode(&tile_buffer()).unwrap();
    assert_eq!(decoded.vertex_count(), 4);
    assert!(decoded.extensions.vertex_normals.is_some());

    let mesh = build(
        &decoded,
        geo_box(),
        Ellipsoid::WGS84,
        &BuildOptions {
            skirt_length: 50.0,
            solid: true,
            ..BuildOptions::default()
        },
    );

    assert!(mesh.has_normals());
    assert!(mesh.group(GroupKind::Surface).is_some());
    assert!(mesh.group(GroupKind::BottomCap).is_some());
    assert!(mesh.group(GroupKind::Skirt).is_some());

    let mask = mesh.water_mask.as_ref().unwrap();
    // Wire value 255 means water and is stored inverted.
    assert_eq!(mask.image.get_pixel(0, 0).0[0], 0);

    let metadata = mesh.metadata.as_ref().unwrap();
    assert_eq!(metadata["geometricerror"], 42.0);
}

#[test]
fn wire_round_trip_preserves_built_mesh() {
    let decoded = qmesh_decode::decode(&tile_buffer()).unwrap();
    let mesh = build(
        &decoded,
        geo_box(),
        Ellipsoid::WGS84,
        &BuildOptions {
            skirt_length: 50.0,
            ..BuildOptions::default()
        },
    );

    let record = to_wire_format(&mesh, false).unwrap();
    let restored = from_wire_format(record).unwrap();

    assert_eq!(restored.positions, mesh.positions);
    assert_eq!(restored.normals, mesh.normals);
    assert_eq!(restored.indices, mesh.indices);
    assert_eq!(restored.groups, mesh.groups);
    assert_eq!(restored.metadata, mesh.metadata);
    assert!(restored.water_mask.is_some());
}

#[test]
fn task_chain_decodes_then_upsamples() {
    let options = DecodeOptions {
        build: BuildOptions {
            skirt_length: 50.0,
            ..BuildOptions::default()
        },
        elevation_map_enabled: true,
        ..DecodeOptions::default()
    };

    let parent = run_task(DecodeTask::QuantizedMesh {
        buffer: tile_buffer(),
        geo_box: geo_box(),
        projection: Ellipsoid::WGS84,
        options: options.clone(),
    })
    .unwrap();
    assert!(parent.height_map.is_some());

    // Western half of the gradient spans heights 0..500.
    let target = geo_box().quadrant(true, true);
    let child = run_task(DecodeTask::QuantizedUpsample {
        parent,
        target_geo_box: target,
        options,
    })
    .unwrap();

    assert_eq!(child.geo_box, target);
    assert!(child.min_height.abs() < 1.0);
    assert!((child.max_height - 500.0).abs() < 1.0);
}
