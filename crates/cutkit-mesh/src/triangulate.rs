//! Cap triangulation over seam loops, in the XY projection of the cut frame.
//!
//! Loops are classified by nesting depth (even = outer, odd = hole), holes
//! are bridged into their enclosing outer loop and the merged polygon is
//! ear-clipped.

use cutkit_math::{Point2, Point3};

use crate::error::{MeshError, Result};

const AREA_EPSILON: f64 = 1e-12;
const COINCIDENT_EPSILON_SQ: f64 = 1e-24;

/// A cleaned-up loop of the cap boundary.
#[derive(Debug, Clone)]
pub(crate) struct CapLoop {
    /// Vertex ids, counter-clockwise for outer loops and clockwise for holes.
    pub vertices: Vec<u32>,
    pub is_hole: bool,
}

/// Triangles covering the region bounded by the loops, wound
/// counter-clockwise seen from +Z.
#[derive(Debug, Clone, Default)]
pub(crate) struct Cap {
    pub triangles: Vec<[u32; 3]>,
    pub loops: Vec<CapLoop>,
}

struct Ring {
    ids: Vec<u32>,
    pts: Vec<Point2>,
    area: f64,
}

impl Ring {
    fn new(points: &[Point3], ids: &[u32]) -> Option<Self> {
        let mut ring_ids: Vec<u32> = Vec::with_capacity(ids.len());
        let mut pts: Vec<Point2> = Vec::with_capacity(ids.len());
        for &id in ids {
            let p = points[id as usize];
            let q = Point2::new(p.x, p.y);
            if pts
                .last()
                .is_some_and(|last| (q - last).norm_squared() < COINCIDENT_EPSILON_SQ)
            {
                continue;
            }
            ring_ids.push(id);
            pts.push(q);
        }
        while pts.len() > 1
            && (pts[0] - pts[pts.len() - 1]).norm_squared() < COINCIDENT_EPSILON_SQ
        {
            pts.pop();
            ring_ids.pop();
        }
        if pts.len() < 3 {
            return None;
        }
        let area = signed_area(&pts);
        if area.abs() < AREA_EPSILON {
            return None;
        }
        Some(Self {
            ids: ring_ids,
            pts,
            area,
        })
    }

    fn reverse(&mut self) {
        self.ids.reverse();
        self.pts.reverse();
        self.area = -self.area;
    }
}

/// Triangulate the region enclosed by `loops` (vertex ids into `points`).
pub(crate) fn triangulate_loops(points: &[Point3], loops: &[Vec<u32>]) -> Result<Cap> {
    let mut rings: Vec<Ring> = Vec::with_capacity(loops.len());
    for lp in loops {
        match Ring::new(points, lp) {
            Some(ring) => rings.push(ring),
            None => tracing::debug!(len = lp.len(), "skipping degenerate seam loop"),
        }
    }

    let depth: Vec<usize> = (0..rings.len())
        .map(|i| {
            (0..rings.len())
                .filter(|&j| j != i && point_in_polygon(&rings[i].pts[0], &rings[j].pts))
                .count()
        })
        .collect();

    for (ring, &d) in rings.iter_mut().zip(&depth) {
        let is_hole = d % 2 == 1;
        if (is_hole && ring.area > 0.0) || (!is_hole && ring.area < 0.0) {
            ring.reverse();
        }
    }

    // Each hole belongs to the smallest enclosing outer loop one level up.
    let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); rings.len()];
    for h in (0..rings.len()).filter(|&h| depth[h] % 2 == 1) {
        let parent = (0..rings.len())
            .filter(|&o| depth[o] + 1 == depth[h] && point_in_polygon(&rings[h].pts[0], &rings[o].pts))
            .min_by(|&a, &b| rings[a].area.abs().total_cmp(&rings[b].area.abs()));
        match parent {
            Some(o) => holes_of[o].push(h),
            None => {
                return Err(MeshError::Degenerate(
                    "seam hole without enclosing loop".into(),
                ))
            }
        }
    }

    let mut cap = Cap::default();
    for o in (0..rings.len()).filter(|&o| depth[o] % 2 == 0) {
        let holes: Vec<&Ring> = holes_of[o].iter().map(|&h| &rings[h]).collect();
        triangulate_with_holes(&rings[o], &holes, &mut cap.triangles)?;
    }
    cap.loops = rings
        .into_iter()
        .zip(depth)
        .map(|(ring, d)| CapLoop {
            vertices: ring.ids,
            is_hole: d % 2 == 1,
        })
        .collect();
    Ok(cap)
}

/// Bridge the holes into the outer ring and ear-clip the result.
fn triangulate_with_holes(outer: &Ring, holes: &[&Ring], out: &mut Vec<[u32; 3]>) -> Result<()> {
    let mut pts: Vec<Point2> = outer.pts.clone();
    let mut ids: Vec<u32> = outer.ids.clone();
    let mut poly: Vec<usize> = (0..outer.pts.len()).collect();

    let mut hole_ranges = Vec::with_capacity(holes.len());
    for hole in holes {
        let start = pts.len();
        pts.extend_from_slice(&hole.pts);
        ids.extend_from_slice(&hole.ids);
        hole_ranges.push(start..pts.len());
    }

    // Rightmost holes first so earlier bridges never block later ones.
    let mut order: Vec<usize> = (0..holes.len()).collect();
    let max_x = |r: &std::ops::Range<usize>| {
        pts[r.clone()]
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max)
    };
    order.sort_by(|&a, &b| max_x(&hole_ranges[b]).total_cmp(&max_x(&hole_ranges[a])));

    for &h in &order {
        let range = hole_ranges[h].clone();
        let len = range.len();
        let rightmost = range
            .clone()
            .max_by(|&a, &b| pts[a].x.total_cmp(&pts[b].x))
            .unwrap_or(range.start);
        let hole_seq: Vec<usize> = (0..len)
            .map(|k| range.start + (rightmost - range.start + k) % len)
            .collect();
        let inner = pts[hole_seq[0]];

        let mut candidates: Vec<usize> = (0..poly.len()).collect();
        candidates.sort_by(|&a, &b| {
            (pts[poly[a]] - inner)
                .norm_squared()
                .total_cmp(&(pts[poly[b]] - inner).norm_squared())
        });
        let blocked = |j: usize| {
            let target = pts[poly[j]];
            let crosses_poly = (0..poly.len()).any(|k| {
                let (a, b) = (pts[poly[k]], pts[poly[(k + 1) % poly.len()]]);
                segments_cross(&inner, &target, &a, &b)
            });
            let crosses_hole = hole_ranges.iter().any(|r| {
                (0..r.len()).any(|k| {
                    let a = pts[r.start + k];
                    let b = pts[r.start + (k + 1) % r.len()];
                    segments_cross(&inner, &target, &a, &b)
                })
            });
            crosses_poly || crosses_hole
        };
        let best = match candidates.iter().copied().find(|&j| !blocked(j)) {
            Some(j) => j,
            None => {
                tracing::warn!("no visible bridge for seam hole, using nearest vertex");
                candidates[0]
            }
        };

        let mut merged = Vec::with_capacity(poly.len() + len + 2);
        merged.extend_from_slice(&poly[..=best]);
        merged.extend_from_slice(&hole_seq);
        merged.push(hole_seq[0]);
        merged.push(poly[best]);
        merged.extend_from_slice(&poly[best + 1..]);
        poly = merged;
    }

    let mut local = Vec::new();
    ear_clip(&pts, &poly, &mut local)?;
    out.extend(local.iter().map(|t| [ids[t[0]], ids[t[1]], ids[t[2]]]));
    Ok(())
}

/// Ear clipping for a counter-clockwise polygon given as indices into `pts`.
///
/// Collinear vertices left over when no proper ear exists are clipped as
/// zero-area triangles so the cap keeps every boundary edge.
fn ear_clip(pts: &[Point2], poly: &[usize], out: &mut Vec<[usize; 3]>) -> Result<()> {
    let mut remaining = poly.to_vec();

    while remaining.len() > 3 {
        let n = remaining.len();
        let mut clipped = None;

        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            let (a, b, c) = (pts[remaining[prev]], pts[remaining[i]], pts[remaining[next]]);
            if cross(&a, &b, &c) <= AREA_EPSILON {
                continue;
            }
            let is_ear = (0..n).all(|j| {
                if j == prev || j == i || j == next {
                    return true;
                }
                let p = pts[remaining[j]];
                let coincident = [a, b, c]
                    .iter()
                    .any(|q| (p - q).norm_squared() < COINCIDENT_EPSILON_SQ);
                coincident || !point_in_triangle(&p, &a, &b, &c)
            });
            if is_ear {
                clipped = Some(i);
                break;
            }
        }

        let i = match clipped {
            Some(i) => i,
            None => (0..n)
                .find(|&i| {
                    let a = pts[remaining[(i + n - 1) % n]];
                    let b = pts[remaining[i]];
                    let c = pts[remaining[(i + 1) % n]];
                    cross(&a, &b, &c).abs() <= AREA_EPSILON
                })
                .ok_or_else(|| {
                    MeshError::Degenerate("cap polygon could not be triangulated".into())
                })?,
        };
        out.push([remaining[(i + n - 1) % n], remaining[i], remaining[(i + 1) % n]]);
        remaining.remove(i);
    }

    if remaining.len() == 3 {
        out.push([remaining[0], remaining[1], remaining[2]]);
    }
    Ok(())
}

fn cross(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn signed_area(pts: &[Point2]) -> f64 {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let (a, b) = (pts[i], pts[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

fn point_in_triangle(p: &Point2, a: &Point2, b: &Point2, c: &Point2) -> bool {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.dot(&v0);
    let dot01 = v0.dot(&v1);
    let dot02 = v0.dot(&v2);
    let dot11 = v1.dot(&v1);
    let dot12 = v1.dot(&v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < f64::MIN_POSITIVE {
        return false;
    }
    let inv_denom = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

    let eps = 1e-10;
    u > eps && v > eps && (u + v) < 1.0 - eps
}

/// Even-odd point in polygon test.
pub(crate) fn point_in_polygon(p: &Point2, poly: &[Point2]) -> bool {
    let n = poly.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Proper crossing of segments `pq` and `ab`; touching at endpoints does
/// not count.
fn segments_cross(p: &Point2, q: &Point2, a: &Point2, b: &Point2) -> bool {
    let shared = [a, b]
        .iter()
        .any(|e| (*e - p).norm_squared() < COINCIDENT_EPSILON_SQ || (*e - q).norm_squared() < COINCIDENT_EPSILON_SQ);
    if shared {
        return false;
    }
    let d1 = cross(p, q, a);
    let d2 = cross(p, q, b);
    let d3 = cross(a, b, p);
    let d4 = cross(a, b, q);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(points: &mut Vec<Point3>, x0: f64, y0: f64, x1: f64, y1: f64, ccw: bool) -> Vec<u32> {
        let start = points.len() as u32;
        points.push(Point3::new(x0, y0, 0.0));
        points.push(Point3::new(x1, y0, 0.0));
        points.push(Point3::new(x1, y1, 0.0));
        points.push(Point3::new(x0, y1, 0.0));
        let mut ids: Vec<u32> = (start..start + 4).collect();
        if !ccw {
            ids.reverse();
        }
        ids
    }

    fn cap_area(points: &[Point3], cap: &Cap) -> f64 {
        cap.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| Point2::new(points[i as usize].x, points[i as usize].y));
                cross(&a, &b, &c) * 0.5
            })
            .sum()
    }

    #[test]
    fn test_square_any_winding() {
        let mut points = Vec::new();
        let lp = rect(&mut points, 0.0, 0.0, 2.0, 3.0, false);
        let cap = triangulate_loops(&points, &[lp]).unwrap();
        assert_eq!(cap.triangles.len(), 2);
        assert_relative_eq!(cap_area(&points, &cap), 6.0, epsilon = 1e-12);
        assert!(!cap.loops[0].is_hole);
    }

    #[test]
    fn test_square_with_hole() {
        let mut points = Vec::new();
        let outer = rect(&mut points, 0.0, 0.0, 10.0, 10.0, true);
        let hole = rect(&mut points, 3.0, 3.0, 6.0, 6.0, true);
        let cap = triangulate_loops(&points, &[hole, outer]).unwrap();
        assert_relative_eq!(cap_area(&points, &cap), 91.0, epsilon = 1e-9);
        assert!(cap.loops[0].is_hole);
        assert!(!cap.loops[1].is_hole);
        // Every triangle is wound counter-clockwise.
        for t in &cap.triangles {
            let [a, b, c] = t.map(|i| Point2::new(points[i as usize].x, points[i as usize].y));
            assert!(cross(&a, &b, &c) >= 0.0);
        }
    }

    #[test]
    fn test_island_inside_hole() {
        let mut points = Vec::new();
        let outer = rect(&mut points, 0.0, 0.0, 10.0, 10.0, true);
        let hole = rect(&mut points, 2.0, 2.0, 8.0, 8.0, true);
        let island = rect(&mut points, 4.0, 4.0, 6.0, 6.0, true);
        let cap = triangulate_loops(&points, &[outer, hole, island]).unwrap();
        assert_relative_eq!(cap_area(&points, &cap), 100.0 - 36.0 + 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_points_keep_boundary() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let cap = triangulate_loops(&points, &[vec![0, 1, 2, 3, 4, 5]]).unwrap();
        assert_eq!(cap.triangles.len(), 4);
        assert_relative_eq!(cap_area(&points, &cap), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_loop_skipped() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let cap = triangulate_loops(&points, &[vec![0, 1, 2]]).unwrap();
        assert!(cap.triangles.is_empty());
        assert!(cap.loops.is_empty());
    }

    #[test]
    fn test_point_in_polygon() {
        let sq = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(point_in_polygon(&Point2::new(0.5, 0.5), &sq));
        assert!(!point_in_polygon(&Point2::new(1.5, 0.5), &sq));
    }
}
