//! Triangulated preview meshes.
//!
//! Decoded [`Primitive`] batches keep COLLADA's indexed, per-attribute layout.
//! This module flattens a batch into a plain triangle list (one vertex per
//! corner) for consumers that only want triangles, like the inspector's
//! statistics or a quick GPU upload.

use dae_math::Vec3;

use crate::geometry::{Primitive, Topology};

/// A triangle mesh with one vertex per triangle corner.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals, present when the batch carried them
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Triangulate a decoded batch.
    ///
    /// Fans and strips are unrolled, polygons are fan-triangulated from their
    /// outer contour. Hole contours are skipped. Returns `None` for line
    /// batches or when no triangle survives.
    pub fn from_primitive(primitive: &Primitive) -> Option<Self> {
        let corners = triangle_corners(primitive)?;
        if corners.is_empty() {
            return None;
        }

        let positions = gather(&corners, &primitive.positions, &primitive.position_indices)?;

        let normals = match (&primitive.normals, &primitive.normal_indices) {
            (Some(normals), Some(indices)) => gather(&corners, normals, indices),
            _ => None,
        };

        let uvs = match (&primitive.tex_coords, &primitive.tex_coord_indices) {
            (Some(uvs), Some(indices)) => gather(&corners, uvs, indices)
                .map(|uvs| uvs.into_iter().map(|uv| uv.to_array()).collect()),
            _ => None,
        };

        let indices = (0..positions.len() as u32).collect();
        Some(Self {
            positions,
            normals,
            uvs,
            indices,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Positions in the batch's index streams forming each triangle, three per triangle.
fn triangle_corners(primitive: &Primitive) -> Option<Vec<usize>> {
    let index_count = primitive.position_indices.len();
    let mut corners = Vec::new();

    match primitive.topology {
        Topology::Lines => return None,
        Topology::Triangles => {
            corners.extend(0..index_count - index_count % 3);
        }
        Topology::TriangleFans => {
            for (start, count) in strip_ranges(&primitive.strip_counts) {
                fan(&mut corners, start, count);
            }
        }
        Topology::TriangleStrips => {
            for (start, count) in strip_ranges(&primitive.strip_counts) {
                for i in 0..count.saturating_sub(2) {
                    let (a, b) = if i % 2 == 0 { (i, i + 1) } else { (i + 1, i) };
                    corners.extend([start + a, start + b, start + i + 2]);
                }
            }
        }
        Topology::Polygons => {
            let ranges: Vec<_> = strip_ranges(&primitive.strip_counts).collect();
            match &primitive.contour_counts {
                Some(contours) => {
                    let mut strip = 0;
                    for &contour_count in contours {
                        if let Some(&(start, count)) = ranges.get(strip) {
                            fan(&mut corners, start, count);
                        }
                        if contour_count > 1 {
                            log::debug!("Skipping {} hole contour(s) in preview", contour_count - 1);
                        }
                        strip += contour_count as usize;
                    }
                }
                None => {
                    for (start, count) in ranges {
                        fan(&mut corners, start, count);
                    }
                }
            }
        }
    }

    // Strip counts come from the document; drop triangles past the streams
    let corners = corners
        .chunks_exact(3)
        .filter(|triangle| triangle.iter().all(|&c| c < index_count))
        .flatten()
        .copied()
        .collect();
    Some(corners)
}

fn gather<T: Copy>(corners: &[usize], values: &[T], indices: &[u32]) -> Option<Vec<T>> {
    corners
        .iter()
        .map(|&c| {
            let index = *indices.get(c)? as usize;
            values.get(index).copied()
        })
        .collect()
}

fn strip_ranges(counts: &[u32]) -> impl Iterator<Item = (usize, usize)> + '_ {
    counts.iter().scan(0usize, |offset, &count| {
        let start = *offset;
        *offset += count as usize;
        Some((start, count as usize))
    })
}

// Fan triangulation: (0,1,2), (0,2,3), ... (0,n-2,n-1)
fn fan(corners: &mut Vec<usize>, start: usize, count: usize) {
    for i in 1..count.saturating_sub(1) {
        corners.extend([start, start + i, start + i + 1]);
    }
}
