// Transform utilities for Mat4
//
// Extends glam::Mat4 with the helpers the scene walk needs.
// glam::Mat4 already provides transform_point3(), transform_vector3() and inverse().

use glam::{Mat4, Vec3};

use crate::Aabb;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    /// An empty box stays empty.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Build a rotation of `degrees` around an arbitrary `axis`.
    /// A zero-length axis yields the identity.
    fn from_axis_angle_degrees(axis: Vec3, degrees: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }

        aabb.corners()
            .iter()
            .fold(Aabb::EMPTY, |acc, &corner| {
                acc.include_point(self.transform_point3(corner))
            })
    }

    fn from_axis_angle_degrees(axis: Vec3, degrees: f32) -> Mat4 {
        match axis.try_normalize() {
            Some(axis) => Mat4::from_axis_angle(axis, degrees.to_radians()),
            None => Mat4::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_aabb_identity() {
        let mat = Mat4::IDENTITY;
        let aabb = Aabb::from_point_cloud(&[Vec3::ZERO, Vec3::ONE]);
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.min() - aabb.min()).length() < 0.001);
        assert!((transformed.max() - aabb.max()).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::from_point_cloud(&[Vec3::ZERO, Vec3::ONE]);
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.min() - Vec3::new(5.0, 5.0, 5.0)).length() < 0.001);
        assert!((transformed.max() - Vec3::new(6.0, 6.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_rotation() {
        // 90 degrees around Z swaps the X and Y extents
        let mat = Mat4::from_axis_angle_degrees(Vec3::Z, 90.0);
        let aabb = Aabb::from_point_cloud(&[Vec3::ZERO, Vec3::new(4.0, 1.0, 1.0)]);
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.size() - Vec3::new(1.0, 4.0, 1.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_empty_aabb() {
        let mat = Mat4::from_translation(Vec3::ONE);
        assert!(mat.transform_aabb(&Aabb::EMPTY).is_empty());
    }

    #[test]
    fn test_axis_angle_zero_axis() {
        let mat = Mat4::from_axis_angle_degrees(Vec3::ZERO, 45.0);
        assert_eq!(mat, Mat4::IDENTITY);
    }
}
