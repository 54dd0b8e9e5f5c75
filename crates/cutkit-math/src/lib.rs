#![warn(missing_docs)]

//! Math types for the cutkit model cutting engine.
//!
//! Thin wrappers around nalgebra providing the handful of types the cutting
//! pipeline passes around: points, vectors, directions and affine
//! transforms.

use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D space (cut-plane coordinates).
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
///
/// Object, instance, volume and cut-plane poses are all expressed with this
/// type. Composition follows matrix order: `a.then(&b)` applies `b` first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Translation by a vector.
    pub fn translation_vec(v: &Vec3) -> Self {
        Self::translation(v.x, v.y, v.z)
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        Self::rotation_about_axis(&Vec3::x_axis(), angle)
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        Self::rotation_about_axis(&Vec3::z_axis(), angle)
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Smallest rotation taking direction `from` onto direction `to`.
    ///
    /// Opposite directions rotate by half a turn about an arbitrary axis
    /// perpendicular to `from`. Zero-length inputs yield the identity.
    pub fn rotation_between(from: &Vec3, to: &Vec3) -> Self {
        if from.norm_squared() < 1e-24 || to.norm_squared() < 1e-24 {
            return Self::identity();
        }
        if let Some(rot) = Rotation3::rotation_between(from, to) {
            let mut m = Matrix4::identity();
            m.fixed_view_mut::<3, 3>(0, 0).copy_from(rot.matrix());
            return Self { matrix: m };
        }
        // Antiparallel: pick any axis orthogonal to `from`.
        let helper = if from.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
        let axis = Dir3::new_normalize(from.cross(&helper));
        Self::rotation_about_axis(&axis, std::f64::consts::PI)
    }

    /// Conjugate this transform so it acts about `center` instead of the origin.
    pub fn about_point(&self, center: &Point3) -> Self {
        Self::translation_vec(&center.coords)
            .then(self)
            .then(&Self::translation_vec(&-center.coords))
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation, applies rotation/scale).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Upper-left 3x3 block (rotation, scale and shear).
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation column.
    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(
            self.matrix[(0, 3)],
            self.matrix[(1, 3)],
            self.matrix[(2, 3)],
        )
    }

    /// Determinant of the linear part. Negative for mirroring transforms.
    pub fn determinant(&self) -> f64 {
        self.linear().determinant()
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result - p).norm() < 1e-12);
    }

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result.x - 11.0).abs() < 1e-12);
        assert!((result.y - 22.0).abs() < 1e-12);
        assert!((result.z - 33.0).abs() < 1e-12);
        assert!((t.translation_part() - Vec3::new(10.0, 20.0, 30.0)).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(PI / 2.0);
        let p = Point3::new(1.0, 0.0, 0.0);
        let result = t.apply_point(&p);
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let translate = Transform::translation(1.0, 0.0, 0.0);
        let scale = Transform::scale(2.0, 2.0, 2.0);
        // scale(translate(origin)) = (2, 0, 0)
        let composed = scale.then(&translate);
        let result = composed.apply_point(&Point3::origin());
        assert!((result.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse() {
        let t = Transform::translation(1.0, 2.0, 3.0).then(&Transform::rotation_x(0.3));
        let inv = t.inverse().unwrap();
        let composed = t.then(&inv);
        let p = Point3::new(5.0, 6.0, 7.0);
        let result = composed.apply_point(&p);
        assert!((result - p).norm() < 1e-12);
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(Transform::scale(1.0, 0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_rotation_between() {
        let t = Transform::rotation_between(&Vec3::z(), &Vec3::x());
        let r = t.apply_vec(&Vec3::z());
        assert!((r - Vec3::x()).norm() < 1e-12);

        let flip = Transform::rotation_between(&Vec3::z(), &-Vec3::z());
        let r = flip.apply_vec(&Vec3::z());
        assert!((r + Vec3::z()).norm() < 1e-12);
        assert!((flip.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_about_point_keeps_center_fixed() {
        let center = Point3::new(3.0, 4.0, 5.0);
        let t = Transform::rotation_x(PI).about_point(&center);
        assert!((t.apply_point(&center) - center).norm() < 1e-12);
        let moved = t.apply_point(&Point3::new(3.0, 4.0, 6.0));
        assert!((moved - Point3::new(3.0, 4.0, 4.0)).norm() < 1e-12);
    }

    #[test]
    fn test_mirror_determinant() {
        assert!(Transform::scale(-1.0, 1.0, 1.0).determinant() < 0.0);
    }
}
