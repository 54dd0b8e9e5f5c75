//! Seam loops: the closed curves where a cut surface meets the mesh.

use std::collections::{HashMap, HashSet};

use cutkit_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};

/// A closed seam curve in cut-surface coordinates.
///
/// Outer loops run counter-clockwise seen from above (+Z), holes run
/// clockwise, so the solid cross-section is always on the left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeamLoop {
    /// Loop vertices; the closing edge is implicit.
    pub points: Vec<Point3>,
    /// True when the loop bounds a hole in the cross-section.
    pub is_hole: bool,
}

/// A point sampled along a seam loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeamSample {
    /// Position on the loop.
    pub position: Point3,
    /// Unit tangent in the loop direction.
    pub tangent: Vec3,
    /// Unit in-plane normal pointing into the cross-section.
    pub inward: Vec3,
}

impl SeamLoop {
    /// Length of the closed polyline.
    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| (b - a).norm()).sum()
    }

    /// Signed XY area; positive for counter-clockwise loops.
    pub fn signed_area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
            * 0.5
    }

    /// X extent of the loop.
    pub fn x_range(&self) -> (f64, f64) {
        self.points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            })
    }

    /// `count` samples spaced evenly by arc length, the first half a step
    /// from the loop start.
    pub fn samples(&self, count: usize) -> Vec<SeamSample> {
        let total = self.perimeter();
        if count == 0 || total <= 0.0 {
            return Vec::new();
        }
        let step = total / count as f64;
        let mut out = Vec::with_capacity(count);
        let mut walked = 0.0;
        let mut target = step * 0.5;

        for (a, b) in self.edges() {
            let len = (b - a).norm();
            if len <= 0.0 {
                continue;
            }
            let tangent = (b - a) / len;
            // In-plane normal, left of the direction of travel.
            let left = Vec3::new(-tangent.y, tangent.x, 0.0);
            let inward = if left.norm() > 0.0 {
                left.normalize()
            } else {
                left
            };
            while out.len() < count && target <= walked + len {
                out.push(SeamSample {
                    position: a + tangent * (target - walked),
                    tangent,
                    inward,
                });
                target += step;
            }
            walked += len;
        }
        out
    }

    fn edges(&self) -> impl Iterator<Item = (&Point3, &Point3)> {
        let n = self.points.len();
        (0..n).map(move |i| (&self.points[i], &self.points[(i + 1) % n]))
    }
}

/// Chain directed boundary edges into closed vertex loops.
///
/// Every vertex must have exactly one outgoing and one incoming edge.
/// Loops are returned in order of their first edge.
pub(crate) fn chain_edges(edges: &[(u32, u32)]) -> Result<Vec<Vec<u32>>> {
    let mut next: HashMap<u32, u32> = HashMap::with_capacity(edges.len());
    for &(a, b) in edges {
        if next.insert(a, b).is_some() {
            return Err(MeshError::OpenSeam(a));
        }
    }

    let mut visited: HashSet<u32> = HashSet::with_capacity(edges.len());
    let mut loops = Vec::new();
    for &(start, _) in edges {
        if visited.contains(&start) {
            continue;
        }
        let mut chain = Vec::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                return Err(MeshError::OpenSeam(current));
            }
            chain.push(current);
            let following = *next.get(&current).ok_or(MeshError::OpenSeam(current))?;
            if following == start {
                break;
            }
            current = following;
        }
        loops.push(chain);
    }
    Ok(loops)
}
