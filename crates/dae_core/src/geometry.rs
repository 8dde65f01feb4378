//! Decoded, renderer-ready geometry batches.
//!
//! A [`Primitive`] is what one COLLADA primitive element (`<triangles>`,
//! `<polylist>`, `<polygons>`, ...) decodes into: shared attribute arrays plus
//! one index stream per attribute, in the indexed layout renderers expect for
//! geometry that still needs triangulation or normal generation.

use dae_math::{Aabb, Vec2, Vec3};

/// Topology of a decoded batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Independent triangles, 3 indices each.
    Triangles,
    /// One fan per strip count entry.
    TriangleFans,
    /// One strip per strip count entry.
    TriangleStrips,
    /// Polygons, one contour per strip count entry, optionally grouped
    /// into outer-plus-holes by the contour counts.
    Polygons,
    /// Independent segments, 2 indices each.
    Lines,
}

impl Topology {
    pub fn is_lines(&self) -> bool {
        matches!(self, Topology::Lines)
    }
}

/// One decoded primitive batch of a geometry.
#[derive(Clone, Debug)]
pub struct Primitive {
    pub topology: Topology,

    /// Vertex positions referenced by `position_indices`
    pub positions: Vec<Vec3>,

    /// Normals referenced by `normal_indices`
    pub normals: Option<Vec<Vec3>>,

    /// 2D texture coordinates referenced by `tex_coord_indices`
    pub tex_coords: Option<Vec<Vec2>>,

    pub position_indices: Vec<u32>,
    pub normal_indices: Option<Vec<u32>>,
    pub tex_coord_indices: Option<Vec<u32>>,

    /// Vertex count of each strip, fan or contour.
    /// Empty for `Triangles` and `Lines`, where the count follows from the index length.
    pub strip_counts: Vec<u32>,

    /// For polygons with holes: how many consecutive `strip_counts` entries
    /// make up each polygon (`1 + hole count`).
    pub contour_counts: Option<Vec<u32>>,

    /// Local material name this batch was authored with, bound to an effect
    /// by `<instance_material symbol="..">`.
    pub material_symbol: Option<String>,

    /// Crease angle in radians at which the renderer should synthesize
    /// normals. Set only when the document supplied no normals.
    pub crease_angle: Option<f32>,

    /// Bounds of `positions`, untransformed.
    pub bounds: Aabb,
}

impl Primitive {
    /// Create a batch from positions and their indices.
    pub fn new(topology: Topology, positions: Vec<Vec3>, position_indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            topology,
            positions,
            normals: None,
            tex_coords: None,
            position_indices,
            normal_indices: None,
            tex_coord_indices: None,
            strip_counts: Vec::new(),
            contour_counts: None,
            material_symbol: None,
            crease_angle: None,
            bounds,
        }
    }

    /// Number of indexed vertices in the batch.
    pub fn index_count(&self) -> usize {
        self.position_indices.len()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_tex_coords(&self) -> bool {
        self.tex_coords.is_some()
    }

    /// Number of triangles, strips, fans, polygons or segments, depending on topology.
    pub fn element_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.position_indices.len() / 3,
            Topology::Lines => self.position_indices.len() / 2,
            Topology::Polygons => match &self.contour_counts {
                Some(contours) => contours.len(),
                None => self.strip_counts.len(),
            },
            Topology::TriangleFans | Topology::TriangleStrips => self.strip_counts.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_bounds() {
        let primitive = Primitive::new(
            Topology::Triangles,
            vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 3.0)],
            vec![0, 1, 2],
        );

        assert_eq!(primitive.bounds.min(), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(primitive.bounds.max(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(primitive.element_count(), 1);
        assert!(!primitive.has_normals());
    }

    #[test]
    fn test_polygon_element_count_uses_contours() {
        let mut primitive = Primitive::new(Topology::Polygons, vec![Vec3::ZERO; 7], (0..7).collect());
        primitive.strip_counts = vec![4, 3];
        primitive.contour_counts = Some(vec![2]);

        assert_eq!(primitive.element_count(), 1);
    }
}
