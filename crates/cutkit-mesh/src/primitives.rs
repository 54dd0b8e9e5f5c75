//! Closed mesh primitives used for connectors and tests.

use std::f64::consts::TAU;

use cutkit_math::Point3;

use crate::mesh::TriangleMesh;

/// Box with one corner at the origin and dimensions `(sx, sy, sz)`.
///
/// ```text
///     v7----v6
///    /|    /|
///   v4----v5|    z
///   | v3--|-v2   | y
///   |/    |/     |/
///   v0----v1     +---x
/// ```
pub fn make_box(sx: f64, sy: f64, sz: f64) -> TriangleMesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(sx, 0.0, 0.0),
        Point3::new(sx, sy, 0.0),
        Point3::new(0.0, sy, 0.0),
        Point3::new(0.0, 0.0, sz),
        Point3::new(sx, 0.0, sz),
        Point3::new(sx, sy, sz),
        Point3::new(0.0, sy, sz),
    ];
    let indices = vec![
        // bottom
        [0, 2, 1],
        [0, 3, 2],
        // top
        [4, 5, 6],
        [4, 6, 7],
        // front
        [0, 1, 5],
        [0, 5, 4],
        // back
        [2, 3, 7],
        [2, 7, 6],
        // left
        [0, 4, 7],
        [0, 7, 3],
        // right
        [1, 2, 6],
        [1, 6, 5],
    ];
    TriangleMesh::from_parts(vertices, indices)
}

/// Cylinder of `radius` along +Z from `z = 0` to `z = height`, with
/// `segments` sides (at least 3).
pub fn make_cylinder(radius: f64, height: f64, segments: u32) -> TriangleMesh {
    let n = segments.max(3);
    let mut vertices = Vec::with_capacity(2 + 2 * n as usize);
    vertices.push(Point3::new(0.0, 0.0, 0.0));
    vertices.push(Point3::new(0.0, 0.0, height));
    for z in [0.0, height] {
        for i in 0..n {
            let theta = TAU * i as f64 / n as f64;
            vertices.push(Point3::new(radius * theta.cos(), radius * theta.sin(), z));
        }
    }

    let bottom = |i: u32| 2 + i % n;
    let top = |i: u32| 2 + n + i % n;
    let mut indices = Vec::with_capacity(4 * n as usize);
    for i in 0..n {
        indices.push([0, bottom(i + 1), bottom(i)]);
        indices.push([1, top(i), top(i + 1)]);
        indices.push([bottom(i), bottom(i + 1), top(i + 1)]);
        indices.push([bottom(i), top(i + 1), top(i)]);
    }
    TriangleMesh::from_parts(vertices, indices)
}
