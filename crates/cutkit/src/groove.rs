//! Groove connectors: complementary tongue and recess profiles.
//!
//! The tongue is a trapezoid protruding `depth` below the seam with base
//! width `width`; its flaps are drafted by `flaps_angle` from the seam
//! normal. The recess has the same shape grown by the depth and width
//! tolerances, so the printed halves press-fit.

use cutkit_math::Point2;
use cutkit_mesh::{Profile, SeamLoop, TriangleMesh};
use serde::{Deserialize, Serialize};

use crate::error::{CutError, Result};

/// Default clearance for connectors (mm).
pub const CUT_TOLERANCE: f64 = 0.1;

/// Groove parameters. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Groove {
    /// Tongue protrusion.
    pub depth: f64,
    /// Tongue base width.
    pub width: f64,
    /// Draft of the flap faces from the seam normal.
    pub flaps_angle: f64,
    /// Rotation of the groove about the seam normal.
    pub angle: f64,
    /// Baseline depth.
    pub depth_init: f64,
    /// Baseline width.
    pub width_init: f64,
    /// Baseline flaps angle.
    pub flaps_angle_init: f64,
    /// Baseline angle.
    pub angle_init: f64,
    /// Extra recess depth.
    pub depth_tolerance: f64,
    /// Extra recess width.
    pub width_tolerance: f64,
}

impl Default for Groove {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// The two surfaces a groove cut uses.
#[derive(Debug, Clone, PartialEq)]
pub struct GrooveProfiles {
    /// Surface bounding the upper fragment.
    pub tongue: Profile,
    /// Surface bounding the lower fragment.
    pub recess: Profile,
}

impl Groove {
    /// Groove with the given current values, also used as baselines.
    pub fn new(depth: f64, width: f64, flaps_angle: f64, angle: f64) -> Self {
        Self {
            depth,
            width,
            flaps_angle,
            angle,
            depth_init: depth,
            width_init: width,
            flaps_angle_init: flaps_angle,
            angle_init: angle,
            depth_tolerance: CUT_TOLERANCE,
            width_tolerance: CUT_TOLERANCE,
        }
    }

    /// Builder: set both clearances.
    pub fn with_tolerances(mut self, depth_tolerance: f64, width_tolerance: f64) -> Self {
        self.depth_tolerance = depth_tolerance;
        self.width_tolerance = width_tolerance;
        self
    }

    /// Restore the current values from the baselines.
    pub fn reset(&mut self) {
        self.depth = self.depth_init;
        self.width = self.width_init;
        self.flaps_angle = self.flaps_angle_init;
        self.angle = self.angle_init;
    }

    /// Move the current values a fraction `t` of the way back to the baselines.
    pub fn lerp_to_init(&mut self, t: f64) {
        let t = t.clamp(0.0, 1.0);
        let lerp = |current: f64, init: f64| current + (init - current) * t;
        self.depth = lerp(self.depth, self.depth_init);
        self.width = lerp(self.width, self.width_init);
        self.flaps_angle = lerp(self.flaps_angle, self.flaps_angle_init);
        self.angle = lerp(self.angle, self.angle_init);
    }

    /// Does the groove carve anything?
    pub fn is_active(&self) -> bool {
        self.depth > 0.0 && self.width > 0.0
    }

    /// Recess depth including clearance.
    pub fn recess_depth(&self) -> f64 {
        self.depth + self.depth_tolerance
    }

    /// Recess width including clearance.
    pub fn recess_width(&self) -> f64 {
        self.width + self.width_tolerance
    }

    /// Check the parameter invariants.
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.depth,
            self.width,
            self.flaps_angle,
            self.angle,
            self.depth_tolerance,
            self.width_tolerance,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CutError::ParameterOutOfRange(
                "groove values must be finite".into(),
            ));
        }
        if self.depth < 0.0 || self.width < 0.0 {
            return Err(CutError::ParameterOutOfRange(
                "groove depth and width must not be negative".into(),
            ));
        }
        if self.depth_tolerance < 0.0 || self.width_tolerance < 0.0 {
            return Err(CutError::ParameterOutOfRange(
                "groove tolerances must not be negative".into(),
            ));
        }
        if self.is_active() && !(self.flaps_angle > 0.0 && self.flaps_angle < 90.0) {
            return Err(CutError::ParameterOutOfRange(format!(
                "flaps angle {} must lie strictly between 0 and 90 degrees",
                self.flaps_angle
            )));
        }
        Ok(())
    }

    /// Tongue and recess profiles in the groove frame (groove runs along Y).
    pub fn profiles(&self) -> Result<GrooveProfiles> {
        self.validate()?;
        if !self.is_active() {
            return Ok(GrooveProfiles {
                tongue: Profile::flat(),
                recess: Profile::flat(),
            });
        }
        Ok(GrooveProfiles {
            tongue: trapezoid(self.width, self.depth, self.flaps_angle)?,
            recess: trapezoid(self.recess_width(), self.recess_depth(), self.flaps_angle)?,
        })
    }

    /// Check that the recess fits inside the cross-section of a part.
    ///
    /// `seams` are the recess seam loops and `mesh` the part, both in the
    /// groove frame. The part must span the recess width and reach deeper
    /// than the recess right under it.
    pub fn check_cross_section(&self, seams: &[SeamLoop], mesh: &TriangleMesh) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let (lo, hi) = seams
            .iter()
            .filter(|s| !s.is_hole)
            .map(SeamLoop::x_range)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| {
                (lo.min(a), hi.max(b))
            });
        let half = self.recess_width() / 2.0;
        if !(lo < -half && hi > half) {
            return Err(CutError::ParameterOutOfRange(format!(
                "groove width {:.3} exceeds the part cross-section",
                self.recess_width()
            )));
        }
        let floor = mesh.lowest_z_between(-half, half).unwrap_or(0.0);
        if floor >= -self.recess_depth() {
            return Err(CutError::ParameterOutOfRange(format!(
                "groove depth {:.3} exceeds the part thickness {:.3} under the seam",
                self.recess_depth(),
                -floor
            )));
        }
        Ok(())
    }
}

fn trapezoid(width: f64, depth: f64, flaps_angle: f64) -> Result<Profile> {
    let half = width / 2.0;
    let tip = half - depth * flaps_angle.to_radians().tan();
    if tip <= 1e-9 {
        return Err(CutError::ParameterOutOfRange(format!(
            "flaps angle {} closes a groove of width {:.3} and depth {:.3}",
            flaps_angle, width, depth
        )));
    }
    Profile::new(vec![
        Point2::new(-half, 0.0),
        Point2::new(-tip, -depth),
        Point2::new(tip, -depth),
        Point2::new(half, 0.0),
    ])
    .map_err(CutError::from)
}
