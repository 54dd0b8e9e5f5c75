//! Indexed triangle meshes and the bookkeeping the cutter needs on them.

use std::collections::HashMap;

use cutkit_math::{Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl BoundingBox {
    /// Bounding box of a point set, `None` when the set is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bb.extend(p);
        }
        Some(bb)
    }

    /// Grow the box to include `p`.
    pub fn extend(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest box containing both boxes.
    pub fn merged(&self, other: &BoundingBox) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Edge lengths along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Do the boxes overlap, allowing a gap of up to `margin`?
    pub fn intersects(&self, other: &BoundingBox, margin: f64) -> bool {
        (0..3).all(|i| {
            self.min[i] <= other.max[i] + margin && other.min[i] <= self.max[i] + margin
        })
    }

    /// Bounding box of the eight transformed corners.
    pub fn transformed(&self, t: &Transform) -> Self {
        let corners = (0..8).map(|i| {
            Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        let pts: Vec<Point3> = corners.map(|p| t.apply_point(&p)).collect();
        // Eight corners, never empty.
        Self::from_points(&pts).unwrap_or(*self)
    }
}

/// Indexed triangle mesh.
///
/// Triangles are wound counter-clockwise when seen from outside, so that
/// `volume` is positive for a closed solid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle vertex indices.
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertex and index buffers.
    pub fn from_parts(vertices: Vec<Point3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Mesh without triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Corner positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Point3; 3] {
        let [a, b, c] = self.indices[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(
            other
                .indices
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    /// Reverse the winding of every triangle.
    pub fn flip_orientation(&mut self) {
        for tri in &mut self.indices {
            tri.swap(1, 2);
        }
    }

    /// Transform in place. Mirroring transforms also flip the winding so
    /// the mesh stays outward-facing.
    pub fn transform(&mut self, t: &Transform) {
        for v in &mut self.vertices {
            *v = t.apply_point(v);
        }
        if t.determinant() < 0.0 {
            self.flip_orientation();
        }
    }

    /// Transformed copy.
    pub fn transformed(&self, t: &Transform) -> Self {
        let mut out = self.clone();
        out.transform(t);
        out
    }

    /// Bounding box over the vertices referenced by triangles.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.indices
                .iter()
                .flat_map(|t| t.iter())
                .map(|&i| &self.vertices[i as usize]),
        )
    }

    /// Signed enclosed volume (divergence theorem).
    pub fn volume(&self) -> f64 {
        (0..self.indices.len())
            .map(|i| {
                let [a, b, c] = self.triangle(i);
                a.coords.dot(&b.coords.cross(&c.coords))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Total triangle area.
    pub fn surface_area(&self) -> f64 {
        (0..self.indices.len())
            .map(|i| {
                let [a, b, c] = self.triangle(i);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// Merge vertices closer than `tolerance` and drop triangles that
    /// collapse as a result.
    pub fn weld(&self, tolerance: f64) -> Self {
        let mut lookup: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut vertices = Vec::new();

        for p in &self.vertices {
            let key = point_key(p, tolerance);
            let id = *lookup.entry(key).or_insert_with(|| {
                vertices.push(*p);
                (vertices.len() - 1) as u32
            });
            remap.push(id);
        }

        let indices = self
            .indices
            .iter()
            .map(|t| {
                [
                    remap[t[0] as usize],
                    remap[t[1] as usize],
                    remap[t[2] as usize],
                ]
            })
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0])
            .collect();

        Self { vertices, indices }
    }

    /// Copy holding only the vertices referenced by triangles.
    pub fn compact(&self) -> Self {
        Self::from_triangles(&self.vertices, &self.indices)
    }

    /// Build a mesh from a subset of triangles indexing into a shared vertex pool.
    pub fn from_triangles(pool: &[Point3], triangles: &[[u32; 3]]) -> Self {
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::with_capacity(triangles.len());
        for tri in triangles {
            let mut out = [0u32; 3];
            for (slot, &i) in out.iter_mut().zip(tri.iter()) {
                *slot = *remap.entry(i).or_insert_with(|| {
                    vertices.push(pool[i as usize]);
                    (vertices.len() - 1) as u32
                });
            }
            indices.push(out);
        }
        Self { vertices, indices }
    }

    /// Closed, consistently oriented 2-manifold check: every directed edge
    /// appears exactly once and its reverse appears exactly once.
    pub fn is_manifold(&self) -> bool {
        let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in &self.indices {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                if a == b {
                    return false;
                }
                *edges.entry((a, b)).or_default() += 1;
            }
        }
        edges
            .iter()
            .all(|(&(a, b), &count)| count == 1 && edges.get(&(b, a)) == Some(&1))
    }

    /// Split into vertex-connected components, in order of first triangle.
    pub fn split_by_connectivity(&self) -> Vec<TriangleMesh> {
        let mut parent: Vec<u32> = (0..self.vertices.len() as u32).collect();
        for tri in &self.indices {
            let r0 = find_root(&mut parent, tri[0]);
            for &v in &tri[1..] {
                let r = find_root(&mut parent, v);
                if r != r0 {
                    parent[r as usize] = r0;
                }
            }
        }

        let mut component_of_root: HashMap<u32, usize> = HashMap::new();
        let mut groups: Vec<Vec<[u32; 3]>> = Vec::new();
        for tri in &self.indices {
            let root = find_root(&mut parent, tri[0]);
            let idx = *component_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[idx].push(*tri);
        }

        groups
            .iter()
            .map(|tris| Self::from_triangles(&self.vertices, tris))
            .collect()
    }

    /// Inside test for a closed mesh by ray parity.
    pub fn contains_point(&self, point: &Point3) -> bool {
        // Irrational-ish direction so rays rarely graze edges or vertices.
        let dir = Vec3::new(1.0, 0.318_309_886, 0.198_147_932);
        let mut crossings = 0u32;

        for i in 0..self.indices.len() {
            let [v0, v1, v2] = self.triangle(i);
            // Möller-Trumbore
            let e1 = v1 - v0;
            let e2 = v2 - v0;
            let h = dir.cross(&e2);
            let a = e1.dot(&h);
            if a.abs() < 1e-12 {
                continue;
            }
            let f = 1.0 / a;
            let s = point - v0;
            let u = f * s.dot(&h);
            if !(0.0..=1.0).contains(&u) {
                continue;
            }
            let q = s.cross(&e1);
            let v = f * dir.dot(&q);
            if v < 0.0 || u + v > 1.0 {
                continue;
            }
            if f * e2.dot(&q) > 1e-10 {
                crossings += 1;
            }
        }

        crossings % 2 == 1
    }

    /// Lowest `z` the surface reaches inside the slab `x_min <= x <= x_max`,
    /// or `None` when no triangle enters the slab.
    pub fn lowest_z_between(&self, x_min: f64, x_max: f64) -> Option<f64> {
        let mut lowest: Option<f64> = None;
        for i in 0..self.indices.len() {
            let clipped = clip_polygon(&self.triangle(i), |p| p.x - x_min);
            let clipped = clip_polygon(&clipped, |p| x_max - p.x);
            for p in &clipped {
                lowest = Some(lowest.map_or(p.z, |z| z.min(p.z)));
            }
        }
        lowest
    }
}

/// Keep the part of a convex polygon where `inside(p) >= 0`.
fn clip_polygon(polygon: &[Point3], inside: impl Fn(&Point3) -> f64) -> Vec<Point3> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (k, a) in polygon.iter().enumerate() {
        let b = &polygon[(k + 1) % polygon.len()];
        let (fa, fb) = (inside(a), inside(b));
        if fa >= 0.0 {
            out.push(*a);
        }
        if (fa >= 0.0) != (fb >= 0.0) {
            out.push(a + (b - a) * (fa / (fa - fb)));
        }
    }
    out
}

/// Key for vertex lookup with tolerance-based hashing.
fn point_key(p: &Point3, tolerance: f64) -> (i64, i64, i64) {
    let scale = 1.0 / tolerance.max(f64::MIN_POSITIVE);
    (
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    )
}

fn find_root(parent: &mut [u32], mut i: u32) -> u32 {
    while parent[i as usize] != i {
        let grand = parent[parent[i as usize] as usize];
        parent[i as usize] = grand;
        i = grand;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::make_box;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// The box as an unindexed triangle soup, like a freshly loaded STL.
    fn soup(mesh: &TriangleMesh) -> TriangleMesh {
        let mut out = TriangleMesh::new();
        for i in 0..mesh.num_triangles() {
            let base = out.vertices.len() as u32;
            out.vertices.extend_from_slice(&mesh.triangle(i));
            out.indices.push([base, base + 1, base + 2]);
        }
        out
    }

    #[test]
    fn test_box_volume_and_area() {
        let mesh = make_box(10.0, 20.0, 30.0);
        assert_relative_eq!(mesh.volume(), 6000.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.surface_area(), 2.0 * (200.0 + 300.0 + 600.0), epsilon = 1e-9);
    }

    #[test]
    fn test_bounds() {
        let mesh = make_box(1.0, 2.0, 3.0).transformed(&Transform::translation(5.0, 0.0, 0.0));
        let bb = mesh.bounds().unwrap();
        assert_relative_eq!(bb.min.x, 5.0);
        assert_relative_eq!(bb.max.z, 3.0);
        assert_relative_eq!(bb.center().y, 1.0);
        assert!(TriangleMesh::new().bounds().is_none());
    }

    #[test]
    fn test_mirror_keeps_outward_winding() {
        let mesh = make_box(2.0, 2.0, 2.0).transformed(&Transform::scale(-1.0, 1.0, 1.0));
        assert_relative_eq!(mesh.volume(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weld_restores_manifold() {
        let mesh = make_box(3.0, 3.0, 3.0);
        let loose = soup(&mesh);
        assert!(!loose.is_manifold());
        let welded = loose.weld(1e-6);
        assert_eq!(welded.num_vertices(), 8);
        assert!(welded.is_manifold());
        assert_relative_eq!(welded.volume(), 27.0, epsilon = 1e-9);
    }

    #[test]
    fn test_open_mesh_is_not_manifold() {
        let mut mesh = make_box(1.0, 1.0, 1.0);
        mesh.indices.pop();
        assert!(!mesh.is_manifold());
    }

    #[test]
    fn test_split_by_connectivity() {
        let mut mesh = make_box(1.0, 1.0, 1.0);
        mesh.merge(&make_box(1.0, 1.0, 1.0).transformed(&Transform::translation(5.0, 0.0, 0.0)));
        let parts = mesh.split_by_connectivity();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].bounds().unwrap().max.x < 2.0);
        assert!(parts[1].bounds().unwrap().min.x > 4.0);
        for part in &parts {
            assert_eq!(part.num_vertices(), 8);
            assert!(part.is_manifold());
        }
    }

    #[test]
    fn test_contains_point() {
        let mesh = make_box(2.0, 2.0, 2.0);
        assert!(mesh.contains_point(&Point3::new(1.0, 1.0, 1.0)));
        assert!(mesh.contains_point(&Point3::new(0.1, 1.9, 0.5)));
        assert!(!mesh.contains_point(&Point3::new(3.0, 1.0, 1.0)));
        assert!(!mesh.contains_point(&Point3::new(-1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_lowest_z_between() {
        // Diamond cross-section: the lower-left face runs along z = -x.
        let mesh = make_box(10.0, 10.0, 10.0)
            .transformed(&Transform::rotation_about_axis(&Vec3::y_axis(), PI / 4.0));
        assert_relative_eq!(mesh.lowest_z_between(0.0, 1.0).unwrap(), -1.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.lowest_z_between(1.0, 2.0).unwrap(), -2.0, epsilon = 1e-9);
        assert_relative_eq!(
            mesh.lowest_z_between(-5.0, 50.0).unwrap(),
            -50f64.sqrt(),
            epsilon = 1e-9
        );
        assert!(mesh.lowest_z_between(20.0, 30.0).is_none());
    }

    #[test]
    fn test_bbox_intersects() {
        let a = make_box(1.0, 1.0, 1.0).bounds().unwrap();
        let b = a.transformed(&Transform::translation(1.5, 0.0, 0.0));
        assert!(!a.intersects(&b, 0.0));
        assert!(a.intersects(&b, 0.6));
    }
}
