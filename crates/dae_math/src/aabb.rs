use crate::{Interval, Vec3};

/// Axis-Aligned Bounding Box.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// Scene bounds start from [`Aabb::EMPTY`] and grow with [`Aabb::include_point`]
/// or [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create the tightest AABB around a set of points, or an empty box.
    pub fn from_point_cloud<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |aabb, point| aabb.include_point(*point))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow the box so that it contains `point`.
    pub fn include_point(&self, point: Vec3) -> Self {
        Self {
            x: self.x.include(point.x),
            y: self.y.include(point.y),
            z: self.z.include(point.z),
        }
    }

    /// Returns true if the box contains nothing along any axis.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vec3 {
        Vec3::new(self.x.size(), self.y.size(), self.z.size())
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.x.min, self.y.min, self.z.min),
            Vec3::new(self.x.max, self.y.min, self.z.min),
            Vec3::new(self.x.min, self.y.max, self.z.min),
            Vec3::new(self.x.max, self.y.max, self.z.min),
            Vec3::new(self.x.min, self.y.min, self.z.max),
            Vec3::new(self.x.max, self.y.min, self.z.max),
            Vec3::new(self.x.min, self.y.max, self.z.max),
            Vec3::new(self.x.max, self.y.max, self.z.max),
        ]
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(self.x.center(), self.y.center(), self.z.center())
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(max: Vec3) -> Aabb {
        Aabb::from_point_cloud(&[Vec3::ZERO, max])
    }

    #[test]
    fn test_aabb_from_point_cloud() {
        let points = [
            Vec3::new(-1.0, 2.0, 0.5),
            Vec3::new(3.0, -2.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
        ];
        let aabb = Aabb::from_point_cloud(&points);

        assert_eq!(aabb.min(), Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max(), Vec3::new(3.0, 2.0, 4.0));

        let none: [Vec3; 0] = [];
        assert!(Aabb::from_point_cloud(&none).is_empty());
    }

    #[test]
    fn test_flat_box_is_not_empty() {
        // A planar batch has zero extent along one axis but still has bounds
        let aabb = unit_box(Vec3::new(1.0, 1.0, 0.0));
        assert!(!aabb.is_empty());
        assert_eq!(aabb.size(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_aabb_surrounding() {
        let box1 = unit_box(Vec3::splat(5.0));
        let box2 = Aabb::from_point_cloud(&[Vec3::splat(3.0), Vec3::splat(10.0)]);
        let surrounding = Aabb::surrounding(&box1, &box2);

        assert_eq!(surrounding.x.min, 0.0);
        assert_eq!(surrounding.x.max, 10.0);

        // Empty is the identity
        assert_eq!(Aabb::surrounding(&Aabb::EMPTY, &box1), box1);
    }

    #[test]
    fn test_aabb_centroid_and_size() {
        let aabb = unit_box(Vec3::new(10.0, 4.0, 2.0));

        assert_eq!(aabb.centroid(), Vec3::new(5.0, 2.0, 1.0));
        assert_eq!(aabb.size(), Vec3::new(10.0, 4.0, 2.0));
    }

    #[test]
    fn test_corners_span_box() {
        let aabb = unit_box(Vec3::new(2.0, 3.0, 4.0));
        let corners = aabb.corners();

        assert!(corners.contains(&Vec3::ZERO));
        assert!(corners.contains(&Vec3::new(2.0, 3.0, 4.0)));
        assert_eq!(Aabb::from_point_cloud(&corners), aabb);
    }
}
