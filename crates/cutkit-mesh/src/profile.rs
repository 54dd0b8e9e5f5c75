//! Piecewise-linear cut profiles.
//!
//! A profile is a height function `h(x)` in the cut frame, extruded along
//! local Y. The flat profile (`h = 0`) is the cutting plane; groove
//! connectors use trapezoidal profiles.

use cutkit_math::{Point2, Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};

/// Minimum spacing between consecutive profile knots.
const MIN_KNOT_SPACING: f64 = 1e-9;

/// Height function defined by knots `(x, h)`.
///
/// Between knots `h` is linear; beyond the first and last knot it stays
/// constant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    knots: Vec<Point2>,
}

impl Profile {
    /// The plane `z = 0`.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Build a profile from knots with strictly increasing `x`.
    pub fn new(knots: Vec<Point2>) -> Result<Self> {
        if knots.iter().any(|k| !k.x.is_finite() || !k.y.is_finite()) {
            return Err(MeshError::InvalidProfile("non-finite knot".into()));
        }
        if knots
            .windows(2)
            .any(|w| w[1].x - w[0].x < MIN_KNOT_SPACING)
        {
            return Err(MeshError::InvalidProfile(
                "knot x coordinates must be strictly increasing".into(),
            ));
        }
        Ok(Self { knots })
    }

    /// The knots, ordered by `x`.
    pub fn knots(&self) -> &[Point2] {
        &self.knots
    }

    /// True when the profile is the plane `z = 0`.
    pub fn is_flat(&self) -> bool {
        self.knots.iter().all(|k| k.y == 0.0)
    }

    /// Height at `x`.
    pub fn height(&self, x: f64) -> f64 {
        let (first, last) = match (self.knots.first(), self.knots.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }
        for w in self.knots.windows(2) {
            if x <= w[1].x {
                let t = (x - w[0].x) / (w[1].x - w[0].x);
                return w[0].y + (w[1].y - w[0].y) * t;
            }
        }
        last.y
    }

    /// Slope `dh/dx` of the piece containing `x`. Knots belong to the piece
    /// on their right.
    pub fn slope(&self, x: f64) -> f64 {
        for w in self.knots.windows(2) {
            if x >= w[0].x && x < w[1].x {
                return (w[1].y - w[0].y) / (w[1].x - w[0].x);
            }
        }
        0.0
    }

    /// X positions where the slope changes.
    pub fn breakpoints(&self) -> impl Iterator<Item = f64> + '_ {
        self.knots.iter().map(|k| k.x)
    }

    /// Vertical offset of `p` above the surface: `p.z - h(p.x)`.
    pub fn offset(&self, p: &Point3) -> f64 {
        p.z - self.height(p.x)
    }

    /// Unit normal of the surface at `x`, pointing toward the upper side.
    pub fn normal(&self, x: f64) -> Vec3 {
        Vec3::new(-self.slope(x), 0.0, 1.0).normalize()
    }

    /// Lowest height reached by the profile.
    pub fn min_height(&self) -> f64 {
        self.knots.iter().map(|k| k.y).fold(0.0, f64::min)
    }
}

/// A profile placed in space.
///
/// `frame` maps profile-local coordinates into the mesh's coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutSurface {
    /// Local-to-mesh transform of the surface.
    pub frame: Transform,
    /// Height profile in the local frame.
    pub profile: Profile,
}

impl CutSurface {
    /// Plane `z = 0` of `frame`.
    pub fn plane(frame: Transform) -> Self {
        Self {
            frame,
            profile: Profile::flat(),
        }
    }

    /// Profile surface placed by `frame`.
    pub fn new(frame: Transform, profile: Profile) -> Self {
        Self { frame, profile }
    }
}
