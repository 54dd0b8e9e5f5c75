//! Splitting closed meshes along cut surfaces.
//!
//! The mesh is first refined along the vertical lines `x = x_k` of the
//! profile knots so that every triangle sees a single planar piece of the
//! surface. Edges crossing the surface are then split, triangles are sorted
//! to the upper or lower side and both sides are closed with a shared cap
//! triangulated from the seam loops.

use std::collections::{HashMap, HashSet};

use cutkit_math::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;
use crate::profile::{CutSurface, Profile};
use crate::seam::{chain_edges, SeamLoop};
use crate::triangulate::triangulate_loops;

/// Result of splitting a mesh by a surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSplit {
    /// Closed part above the surface; empty when nothing lies above.
    pub upper: TriangleMesh,
    /// Closed part below the surface; empty when nothing lies below.
    pub lower: TriangleMesh,
    /// Seam loops in surface-local coordinates.
    pub seams: Vec<SeamLoop>,
}

impl SurfaceSplit {
    /// True when the surface actually crossed the mesh.
    pub fn is_crossed(&self) -> bool {
        !self.upper.is_empty() && !self.lower.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    On,
    Below,
    Above,
}

impl Side {
    fn ternary(d: f64, epsilon: f64) -> Self {
        if d < -epsilon {
            Side::Below
        } else if d > epsilon {
            Side::Above
        } else {
            Side::On
        }
    }
}

/// Split `mesh` by the plane `z = 0`.
pub fn split_by_plane(mesh: &TriangleMesh, epsilon: f64) -> Result<SurfaceSplit> {
    split_by_profile(mesh, &Profile::flat(), epsilon)
}

/// Split `mesh` by a placed surface. Fragments come back in the mesh's
/// coordinates; seam loops stay in the surface frame.
pub fn split_by_surface(
    mesh: &TriangleMesh,
    surface: &CutSurface,
    epsilon: f64,
) -> Result<SurfaceSplit> {
    let to_local = surface
        .frame
        .inverse()
        .ok_or_else(|| MeshError::Degenerate("singular cut surface frame".into()))?;
    let mut split = split_by_profile(&mesh.transformed(&to_local), &surface.profile, epsilon)?;
    split.upper.transform(&surface.frame);
    split.lower.transform(&surface.frame);
    Ok(split)
}

/// Split `mesh` by the surface `z = h(x)` of `profile`.
///
/// Vertices within `epsilon` of the surface are snapped onto it and shared
/// by both sides, so cuts through existing vertices, edges or faces add no
/// slivers. When no vertex lies strictly on one side, the whole input is
/// returned as the other side. The input must be a closed manifold for the
/// crossing case, and both fragments are checked to be closed again.
pub fn split_by_profile(
    mesh: &TriangleMesh,
    profile: &Profile,
    epsilon: f64,
) -> Result<SurfaceSplit> {
    if mesh.is_empty() {
        return Ok(SurfaceSplit::default());
    }

    let mut vertices = mesh.vertices.clone();
    let mut indices = mesh.indices.clone();

    // 1. Refine along the profile knots.
    for x in profile.breakpoints() {
        let mut sides: Vec<Side> = vertices
            .iter()
            .map(|p| Side::ternary(p.x - x, epsilon))
            .collect();
        split_crossing_edges(&mut vertices, &mut indices, &mut sides, |a, b| {
            let t = ((x - a.x) / (b.x - a.x)).clamp(0.0, 1.0);
            let mut p = a + (b - a) * t;
            p.x = x;
            p
        });
    }

    // 2. Classify against the surface.
    let mut sides: Vec<Side> = vertices
        .iter()
        .map(|p| Side::ternary(profile.offset(p), epsilon))
        .collect();
    let used = used_vertices(&indices, vertices.len());
    let any_above = sides.iter().zip(&used).any(|(s, &u)| u && *s == Side::Above);
    let any_below = sides.iter().zip(&used).any(|(s, &u)| u && *s == Side::Below);

    if !any_below {
        return Ok(SurfaceSplit {
            upper: mesh.clone(),
            ..Default::default()
        });
    }
    if !any_above {
        return Ok(SurfaceSplit {
            lower: mesh.clone(),
            ..Default::default()
        });
    }
    if !mesh.is_manifold() {
        return Err(MeshError::NonManifold);
    }

    // Vertices within epsilon of the surface become seam vertices as is.
    for (p, side) in vertices.iter_mut().zip(&sides) {
        if *side == Side::On {
            p.z = profile.height(p.x);
        }
    }

    // 3. Split crossing edges; new vertices are snapped onto the surface.
    split_crossing_edges(&mut vertices, &mut indices, &mut sides, |a, b| {
        let (fa, fb) = (profile.offset(a), profile.offset(b));
        let t = if (fa - fb).abs() > f64::EPSILON {
            (fa / (fa - fb)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let mut p = a + (b - a) * t;
        p.z = profile.height(p.x);
        p
    });

    // 4. Partition. Faces lying in the surface go to the side they bound.
    let mut upper_tris = Vec::new();
    let mut lower_tris = Vec::new();
    for tri in &indices {
        let touches = |side: Side| tri.iter().any(|&i| sides[i as usize] == side);
        if touches(Side::Below) {
            lower_tris.push(*tri);
        } else if touches(Side::Above) || !faces_up(&vertices, tri, profile) {
            upper_tris.push(*tri);
        } else {
            lower_tris.push(*tri);
        }
    }

    // 5. Seam loops from the boundary of the upper side.
    let upper_edges: HashSet<(u32, u32)> = upper_tris.iter().flat_map(tri_edges).collect();
    let seam_edges: Vec<(u32, u32)> = upper_tris
        .iter()
        .flat_map(tri_edges)
        .filter(|&(a, b)| !upper_edges.contains(&(b, a)))
        .collect();
    let loops = chain_edges(&seam_edges)?;

    // 6. Cap, refined along the knots and lifted back onto the surface.
    let cap = triangulate_loops(&vertices, &loops)?;
    let mut cap_tris = cap.triangles;
    for x in profile.breakpoints() {
        let mut knot_sides: Vec<Side> = vertices
            .iter()
            .map(|p| Side::ternary(p.x - x, epsilon))
            .collect();
        split_crossing_edges(&mut vertices, &mut cap_tris, &mut knot_sides, |a, b| {
            let t = ((x - a.x) / (b.x - a.x)).clamp(0.0, 1.0);
            let mut p = a + (b - a) * t;
            p.x = x;
            p.z = profile.height(x);
            p
        });
    }

    // Counter-clockwise from above faces out of the lower side.
    lower_tris.extend_from_slice(&cap_tris);
    upper_tris.extend(cap_tris.iter().map(|t| [t[0], t[2], t[1]]));

    let seams = cap
        .loops
        .iter()
        .map(|lp| SeamLoop {
            points: lp.vertices.iter().map(|&i| vertices[i as usize]).collect(),
            is_hole: lp.is_hole,
        })
        .collect::<Vec<_>>();

    tracing::trace!(
        loops = seams.len(),
        upper = upper_tris.len(),
        lower = lower_tris.len(),
        "mesh split"
    );

    let upper = TriangleMesh::from_triangles(&vertices, &upper_tris);
    let lower = TriangleMesh::from_triangles(&vertices, &lower_tris);
    if !upper.is_manifold() || !lower.is_manifold() {
        return Err(MeshError::NonManifold);
    }

    Ok(SurfaceSplit {
        upper,
        lower,
        seams,
    })
}

fn tri_edges(t: &[u32; 3]) -> [(u32, u32); 3] {
    [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
}

/// True when a triangle lying in the surface faces toward the upper side,
/// i.e. it is the top face of material below the surface.
fn faces_up(vertices: &[Point3], tri: &[u32; 3], profile: &Profile) -> bool {
    let [a, b, c] = tri.map(|i| vertices[i as usize]);
    let normal = (b - a).cross(&(c - a));
    let centroid_x = (a.x + b.x + c.x) / 3.0;
    normal.dot(&profile.normal(centroid_x)) > 0.0
}

fn used_vertices(indices: &[[u32; 3]], count: usize) -> Vec<bool> {
    let mut used = vec![false; count];
    for tri in indices {
        for &i in tri {
            used[i as usize] = true;
        }
    }
    used
}

/// Split every edge joining a `Below` vertex to an `Above` vertex,
/// replacing its triangles by winding-preserving halves.
///
/// Intersection vertices are shared between the two triangles of an edge
/// and marked `On`.
fn split_crossing_edges<F>(
    vertices: &mut Vec<Point3>,
    indices: &mut Vec<[u32; 3]>,
    sides: &mut Vec<Side>,
    intersect: F,
) where
    F: Fn(&Point3, &Point3) -> Point3,
{
    let mut intersections: HashMap<(u32, u32), u32> = HashMap::new();
    let mut k = 0;

    while k != indices.len() {
        let mut ic = 0;
        while ic < 3 {
            let idx = indices[k];
            let idx_a = idx[(ic + 1) % 3];
            let idx_b = idx[(ic + 2) % 3];
            let idx_c = idx[ic];

            let crossing = matches!(
                (sides[idx_a as usize], sides[idx_b as usize]),
                (Side::Below, Side::Above) | (Side::Above, Side::Below)
            );
            if crossing {
                let key = (idx_a.min(idx_b), idx_a.max(idx_b));
                let mid = *intersections.entry(key).or_insert_with(|| {
                    let (lo, hi) = (key.0 as usize, key.1 as usize);
                    let p = intersect(&vertices[lo], &vertices[hi]);
                    vertices.push(p);
                    sides.push(Side::On);
                    (vertices.len() - 1) as u32
                });

                indices[k] = [idx_c, idx_a, mid];
                indices.push([idx_b, idx_c, mid]);
                // The third corner of the replaced triangle is now on the
                // surface, so only the edge opposite it can still cross.
                ic = 2;
                continue;
            }

            ic += 1;
        }

        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{make_box, make_cylinder};
    use approx::assert_relative_eq;
    use cutkit_math::{Dir3, Point2, Transform, Vec3};
    use std::f64::consts::PI;

    fn centered_box(sx: f64, sy: f64, sz: f64) -> TriangleMesh {
        make_box(sx, sy, sz).transformed(&Transform::translation(-sx / 2.0, -sy / 2.0, -sz / 2.0))
    }

    #[test]
    fn test_plane_split_box_halves() {
        let mesh = centered_box(10.0, 10.0, 10.0);
        let split = split_by_plane(&mesh, 1e-9).unwrap();
        assert!(split.is_crossed());
        assert!(split.upper.is_manifold());
        assert!(split.lower.is_manifold());
        assert_relative_eq!(split.upper.volume(), 500.0, epsilon = 1e-9);
        assert_relative_eq!(split.lower.volume(), 500.0, epsilon = 1e-9);
        assert_eq!(split.seams.len(), 1);
        assert!(!split.seams[0].is_hole);
        assert_relative_eq!(split.seams[0].perimeter(), 40.0, epsilon = 1e-9);
        assert!(split.seams[0].signed_area() > 0.0);
    }

    #[test]
    fn test_plane_missing_mesh() {
        let mesh = make_box(1.0, 1.0, 1.0).transformed(&Transform::translation(0.0, 0.0, 5.0));
        let split = split_by_plane(&mesh, 1e-9).unwrap();
        assert!(!split.is_crossed());
        assert!(split.lower.is_empty());
        assert_eq!(split.upper, mesh);
        assert!(split.seams.is_empty());
    }

    #[test]
    fn test_plane_through_face_is_not_a_cut() {
        // Bottom face lies exactly on the plane.
        let mesh = make_box(2.0, 2.0, 2.0);
        let split = split_by_plane(&mesh, 1e-9).unwrap();
        assert!(split.lower.is_empty());
        assert_relative_eq!(split.upper.volume(), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cylinder_oblique_split_conserves_volume() {
        let mesh = make_cylinder(3.0, 10.0, 32);
        let frame = Transform::translation(0.0, 0.0, 5.0).then(&Transform::rotation_x(0.4));
        let split = split_by_surface(&mesh, &CutSurface::plane(frame), 1e-9).unwrap();
        assert!(split.upper.is_manifold());
        assert!(split.lower.is_manifold());
        assert_relative_eq!(
            split.upper.volume() + split.lower.volume(),
            mesh.volume(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_hollow_box_seam_has_hole() {
        // Outer shell plus an inward-facing cavity shell.
        let mut mesh = centered_box(10.0, 10.0, 10.0);
        let mut inner = centered_box(4.0, 4.0, 8.0);
        inner.flip_orientation();
        mesh.merge(&inner);
        let split = split_by_plane(&mesh, 1e-9).unwrap();
        assert_eq!(split.seams.len(), 2);
        assert_eq!(split.seams.iter().filter(|s| s.is_hole).count(), 1);
        assert!(split.upper.is_manifold());
        assert_relative_eq!(split.upper.volume(), 500.0 - 16.0 * 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_profile_split_trapezoid_groove() {
        let mesh = centered_box(20.0, 10.0, 10.0);
        let profile = Profile::new(vec![
            Point2::new(-3.0, 0.0),
            Point2::new(-2.0, -2.0),
            Point2::new(2.0, -2.0),
            Point2::new(3.0, 0.0),
        ])
        .unwrap();
        let split = split_by_profile(&mesh, &profile, 1e-9).unwrap();
        assert!(split.upper.is_manifold());
        assert!(split.lower.is_manifold());
        // Trapezoid cross-section (6 + 4) / 2 * 2 = 10, extruded over 10 along y.
        let tongue = 10.0 * 10.0;
        assert_relative_eq!(split.upper.volume(), 1000.0 + tongue, epsilon = 1e-9);
        assert_relative_eq!(split.lower.volume(), 1000.0 - tongue, epsilon = 1e-9);
    }

    fn octahedron() -> TriangleMesh {
        TriangleMesh::from_parts(
            vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, -1.0),
            ],
            vec![
                [0, 1, 4],
                [1, 2, 4],
                [2, 3, 4],
                [3, 0, 4],
                [1, 0, 5],
                [2, 1, 5],
                [3, 2, 5],
                [0, 3, 5],
            ],
        )
    }

    #[test]
    fn test_plane_through_vertex_ring() {
        let mesh = octahedron();
        let split = split_by_plane(&mesh, 1e-9).unwrap();
        assert!(split.upper.is_manifold());
        assert!(split.lower.is_manifold());
        // The equator vertices are shared, not cloned.
        assert_eq!(split.upper.num_vertices(), 5);
        assert_eq!(split.lower.num_vertices(), 5);
        assert_relative_eq!(split.upper.volume(), 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(split.lower.volume(), 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(split.seams.len(), 1);
        assert_eq!(split.seams[0].points.len(), 4);
        assert_relative_eq!(split.seams[0].signed_area(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_through_box_edges() {
        // Diagonal plane containing the edges x = z = 0 and x = z = 10.
        let mesh = make_box(10.0, 10.0, 10.0);
        let frame = Transform::rotation_about_axis(&Vec3::y_axis(), -PI / 4.0);
        let split = split_by_surface(&mesh, &CutSurface::plane(frame), 1e-9).unwrap();
        assert!(split.upper.is_manifold());
        assert!(split.lower.is_manifold());
        assert_eq!(split.upper.num_vertices(), split.upper.weld(1e-9).num_vertices());
        assert_eq!(split.lower.num_vertices(), split.lower.weld(1e-9).num_vertices());
        assert_relative_eq!(split.upper.volume(), 500.0, epsilon = 1e-9);
        assert_relative_eq!(split.lower.volume(), 500.0, epsilon = 1e-9);
        assert_eq!(split.seams.len(), 1);
        assert_relative_eq!(
            split.seams[0].signed_area(),
            100.0 * 2f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_plane_through_box_corner() {
        let mesh = make_box(10.0, 10.0, 10.0);
        let tilt = Dir3::new_normalize(Vec3::new(1.0, 1.0, 0.0));
        let frame = Transform::translation(10.0, 10.0, 10.0)
            .then(&Transform::rotation_about_axis(&tilt, 0.4));
        let split = split_by_surface(&mesh, &CutSurface::plane(frame), 1e-9).unwrap();
        assert!(split.is_crossed());
        assert!(split.upper.is_manifold());
        assert!(split.lower.is_manifold());
        assert_eq!(split.upper.num_vertices(), split.upper.weld(1e-9).num_vertices());
        assert_relative_eq!(
            split.upper.volume() + split.lower.volume(),
            1000.0,
            epsilon = 1e-6
        );
    }

    /// Prism over a counter-clockwise polygon in the x-z plane, extruded
    /// along +y. `fan` triangulates the polygon.
    fn prism(outline: &[(f64, f64)], fan: &[[u32; 3]], depth: f64) -> TriangleMesh {
        let n = outline.len() as u32;
        let mut vertices: Vec<Point3> = outline.iter().map(|&(x, z)| Point3::new(x, 0.0, z)).collect();
        vertices.extend(outline.iter().map(|&(x, z)| Point3::new(x, depth, z)));
        let mut indices: Vec<[u32; 3]> = fan.to_vec();
        indices.extend(fan.iter().map(|t| [t[0] + n, t[2] + n, t[1] + n]));
        for i in 0..n {
            let j = (i + 1) % n;
            indices.push([i, j + n, j]);
            indices.push([i, i + n, j + n]);
        }
        TriangleMesh::from_parts(vertices, indices)
    }

    #[test]
    fn test_step_face_on_plane() {
        // L-shaped prism whose step face lies in the plane z = 0.
        let outline = [
            (0.0, -10.0),
            (20.0, -10.0),
            (20.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
        ];
        let mesh = prism(&outline, &[[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5]], 10.0);
        assert!(mesh.is_manifold());
        let split = split_by_plane(&mesh, 1e-9).unwrap();
        assert!(split.upper.is_manifold());
        assert!(split.lower.is_manifold());
        assert_relative_eq!(split.upper.volume(), 1000.0, epsilon = 1e-9);
        assert_relative_eq!(split.lower.volume(), 2000.0, epsilon = 1e-9);
        assert_eq!(split.seams.len(), 1);
        assert_relative_eq!(split.seams[0].signed_area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_open_mesh_fails() {
        let mut mesh = centered_box(2.0, 2.0, 2.0);
        mesh.indices.remove(0);
        assert_eq!(split_by_plane(&mesh, 1e-9).unwrap_err(), MeshError::NonManifold);
    }

    #[test]
    fn test_singular_frame_fails() {
        let mesh = centered_box(2.0, 2.0, 2.0);
        let surface = CutSurface::plane(Transform::scale(1.0, 0.0, 1.0));
        assert!(matches!(
            split_by_surface(&mesh, &surface, 1e-9),
            Err(MeshError::Degenerate(_))
        ));
    }
}
