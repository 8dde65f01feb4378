//! Decoding of `<mesh>` content into [`Primitive`] batches.
//!
//! The decoder is fed by the parser while a `<geometry>` is open: sources and
//! `<vertices>` are resolved as soon as they close, index streams are buffered
//! per primitive element and decoded when that element closes. A batch that
//! cannot be decoded is dropped with a warning; its siblings are unaffected.

use std::sync::Arc;

use dae_math::{Vec2, Vec3};
use thiserror::Error;

use super::symbols::{Source, SymbolTable, VertexSet};
use super::types::{Input, Semantic};
use crate::geometry::{Primitive, Topology};

/// COLLADA primitive element kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Triangles,
    TriFans,
    TriStrips,
    Polylist,
    Polygons,
    Lines,
    LineStrips,
}

impl PrimitiveKind {
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "triangles" => Some(PrimitiveKind::Triangles),
            "trifans" => Some(PrimitiveKind::TriFans),
            "tristrips" => Some(PrimitiveKind::TriStrips),
            "polylist" => Some(PrimitiveKind::Polylist),
            "polygons" => Some(PrimitiveKind::Polygons),
            "lines" => Some(PrimitiveKind::Lines),
            "linestrips" => Some(PrimitiveKind::LineStrips),
            _ => None,
        }
    }

    fn topology(&self) -> Topology {
        match self {
            PrimitiveKind::Triangles => Topology::Triangles,
            PrimitiveKind::TriFans => Topology::TriangleFans,
            PrimitiveKind::TriStrips => Topology::TriangleStrips,
            PrimitiveKind::Polylist | PrimitiveKind::Polygons => Topology::Polygons,
            PrimitiveKind::Lines | PrimitiveKind::LineStrips => Topology::Lines,
        }
    }
}

/// Reasons a primitive batch is dropped.
#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("no resolvable POSITION source")]
    MissingPositions,

    #[error("index stream of length {len} is not a multiple of {stride} inputs per vertex")]
    Misaligned { len: usize, stride: usize },

    #[error("vcount lists {expected} vertices but the stream holds {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },

    #[error("{semantic:?} index {index} out of range 0..{len}")]
    IndexOutOfRange {
        semantic: Semantic,
        index: i32,
        len: usize,
    },

    #[error("no geometry")]
    Empty,
}

/// One polygon of a `<polygons>` element: outer contour and holes.
#[derive(Clone, Debug, Default)]
pub struct PolygonContours {
    pub outer: Vec<i32>,
    pub holes: Vec<Vec<i32>>,
}

/// Raw content of one primitive element, as read.
#[derive(Clone, Debug)]
pub struct PrimitiveBuffer {
    pub kind: PrimitiveKind,
    pub material: Option<String>,
    pub inputs: Vec<Input>,
    /// One entry per `<p>` (unused by `<polygons>`)
    pub streams: Vec<Vec<i32>>,
    pub vcount: Vec<i32>,
    pub polygons: Vec<PolygonContours>,
}

impl PrimitiveBuffer {
    pub fn new(kind: PrimitiveKind, material: Option<String>) -> Self {
        Self {
            kind,
            material,
            inputs: Vec::new(),
            streams: Vec::new(),
            vcount: Vec::new(),
            polygons: Vec::new(),
        }
    }

    /// Decode into a batch, resolving inputs through `symbols`.
    pub fn decode(&self, symbols: &SymbolTable, crease_angle: f32) -> Result<Primitive, DecodeError> {
        let attributes = Attributes::resolve(&self.inputs, symbols)?;
        let stride = attributes.stride;

        let mut vertices: Vec<&[i32]> = Vec::new();
        let mut strip_counts = Vec::new();
        let mut contour_counts = None;

        match self.kind {
            PrimitiveKind::Triangles | PrimitiveKind::Lines => {
                for stream in &self.streams {
                    vertices.extend(split_vertices(stream, stride)?);
                }
            }
            PrimitiveKind::TriFans | PrimitiveKind::TriStrips => {
                for stream in &self.streams {
                    let strip = split_vertices(stream, stride)?;
                    strip_counts.push(strip.len() as u32);
                    vertices.extend(strip);
                }
            }
            PrimitiveKind::Polylist => {
                for stream in &self.streams {
                    vertices.extend(split_vertices(stream, stride)?);
                }
                let expected: usize = self.vcount.iter().map(|&c| c.max(0) as usize).sum();
                if expected != vertices.len() {
                    return Err(DecodeError::VertexCountMismatch {
                        expected,
                        actual: vertices.len(),
                    });
                }
                strip_counts = self.vcount.iter().map(|&c| c.max(0) as u32).collect();
            }
            PrimitiveKind::Polygons => {
                let mut contours = Vec::with_capacity(self.polygons.len());
                for polygon in &self.polygons {
                    let outer = split_vertices(&polygon.outer, stride)?;
                    strip_counts.push(outer.len() as u32);
                    vertices.extend(outer);
                    for hole in &polygon.holes {
                        let hole = split_vertices(hole, stride)?;
                        strip_counts.push(hole.len() as u32);
                        vertices.extend(hole);
                    }
                    contours.push(1 + polygon.holes.len() as u32);
                }
                contour_counts = Some(contours);
            }
            PrimitiveKind::LineStrips => {
                for stream in &self.streams {
                    let strip = split_vertices(stream, stride)?;
                    for segment in strip.windows(2) {
                        vertices.extend_from_slice(segment);
                    }
                }
            }
        }

        if vertices.is_empty() {
            return Err(DecodeError::Empty);
        }

        let (positions, position_offset) = attributes.positions;
        let position_indices = gather(&vertices, position_offset, positions.len(), Semantic::Position)?;

        let mut primitive = Primitive::new(self.kind.topology(), positions, position_indices);

        if let Some((normals, offset)) = attributes.normals {
            primitive.normal_indices = Some(gather(&vertices, offset, normals.len(), Semantic::Normal)?);
            primitive.normals = Some(normals);
        }
        if let Some((tex_coords, offset)) = attributes.tex_coords {
            primitive.tex_coord_indices = Some(gather(&vertices, offset, tex_coords.len(), Semantic::TexCoord)?);
            primitive.tex_coords = Some(tex_coords);
        }

        primitive.strip_counts = strip_counts;
        primitive.contour_counts = contour_counts;
        primitive.material_symbol = self.material.clone();
        if !primitive.has_normals() && !primitive.topology.is_lines() {
            primitive.crease_angle = Some(crease_angle);
        }

        Ok(primitive)
    }
}

/// Attribute arrays of a batch with the offset of their index in each vertex group.
struct Attributes {
    stride: usize,
    positions: (Vec<Vec3>, usize),
    normals: Option<(Vec<Vec3>, usize)>,
    tex_coords: Option<(Vec<Vec2>, usize)>,
}

impl Attributes {
    fn resolve(inputs: &[Input], symbols: &SymbolTable) -> Result<Self, DecodeError> {
        let stride = inputs
            .iter()
            .map(|input| input.offset.saturating_add(1))
            .max()
            .ok_or(DecodeError::MissingPositions)?;

        let mut positions = None;
        let mut normals = None;
        let mut tex_coords = None;

        for input in inputs {
            match input.semantic {
                Semantic::Vertex => {
                    let Some(set) = symbols.vertices.get(&input.source) else {
                        log::debug!("Unknown vertices '{}'", input.source);
                        continue;
                    };
                    let VertexSet {
                        positions: set_positions,
                        normals: set_normals,
                        tex_coords: set_tex_coords,
                    } = set;
                    if positions.is_none() {
                        positions = set_positions.clone().map(|p| (p, input.offset));
                    }
                    if normals.is_none() {
                        normals = set_normals.clone().map(|n| (n, input.offset));
                    }
                    if tex_coords.is_none() {
                        tex_coords = set_tex_coords.clone().map(|t| (t, input.offset));
                    }
                }
                Semantic::Position if positions.is_none() => {
                    positions = lookup(symbols, &input.source).map(|s| (s.vec3s(), input.offset));
                }
                Semantic::Normal if normals.is_none() => {
                    normals = lookup(symbols, &input.source).map(|s| (s.vec3s(), input.offset));
                }
                Semantic::TexCoord if tex_coords.is_none() => {
                    tex_coords = lookup(symbols, &input.source).map(|s| (s.vec2s(), input.offset));
                }
                _ => {}
            }
        }

        Ok(Self {
            stride,
            positions: positions.ok_or(DecodeError::MissingPositions)?,
            normals,
            tex_coords,
        })
    }
}

fn lookup<'a>(symbols: &'a SymbolTable, id: &str) -> Option<&'a Source> {
    let source = symbols.sources.get(id);
    if source.is_none() {
        log::debug!("Unknown source '{}'", id);
    }
    source
}

fn split_vertices(stream: &[i32], stride: usize) -> Result<Vec<&[i32]>, DecodeError> {
    if stream.len() % stride != 0 {
        return Err(DecodeError::Misaligned {
            len: stream.len(),
            stride,
        });
    }
    Ok(stream.chunks(stride).collect())
}

fn gather(vertices: &[&[i32]], offset: usize, len: usize, semantic: Semantic) -> Result<Vec<u32>, DecodeError> {
    vertices
        .iter()
        .map(|vertex| {
            let index = vertex[offset];
            if index < 0 || index as usize >= len {
                Err(DecodeError::IndexOutOfRange { semantic, index, len })
            } else {
                Ok(index as u32)
            }
        })
        .collect()
}

#[derive(Debug)]
struct SourceState {
    id: String,
    array: Option<String>,
    stride: usize,
    count: Option<usize>,
}

/// Decoding state for the `<geometry>` currently open.
#[derive(Debug)]
pub struct GeometryDecoder {
    crease_angle: f32,
    geometry: Option<(String, Vec<Arc<Primitive>>)>,
    source: Option<SourceState>,
    vertices: Option<(String, Vec<Input>)>,
    primitive: Option<PrimitiveBuffer>,
    polygon: Option<PolygonContours>,
}

impl GeometryDecoder {
    /// `crease_angle` is recorded, in radians, on batches without normals.
    pub fn new(crease_angle: f32) -> Self {
        Self {
            crease_angle,
            geometry: None,
            source: None,
            vertices: None,
            primitive: None,
            polygon: None,
        }
    }

    pub fn open_geometry(&mut self, id: Option<String>) {
        self.geometry = id.map(|id| (id, Vec::new()));
    }

    pub fn close_geometry(&mut self, symbols: &mut SymbolTable) {
        if let Some((id, primitives)) = self.geometry.take() {
            log::debug!("Geometry '{}' decoded into {} batch(es)", id, primitives.len());
            symbols.geometries.insert(id, primitives);
        }
    }

    pub fn open_source(&mut self, id: Option<String>) {
        self.source = id.map(|id| SourceState {
            id,
            array: None,
            stride: 1,
            count: None,
        });
    }

    /// Record the `<accessor>` of the open source.
    pub fn set_accessor(&mut self, array: Option<String>, stride: usize, count: Option<usize>) {
        if let Some(source) = &mut self.source {
            source.array = array;
            source.stride = stride;
            source.count = count;
        }
    }

    pub fn close_source(&mut self, symbols: &mut SymbolTable) {
        let Some(state) = self.source.take() else {
            return;
        };
        let Some(array_id) = state.array else {
            log::debug!("Source '{}' has no accessor", state.id);
            return;
        };
        match symbols.arrays.get(&array_id) {
            Some(values) => {
                let source = Source::new(values.clone(), state.stride, state.count);
                symbols.sources.insert(state.id, source);
            }
            None => log::warn!("Source '{}' reads unknown array '{}'", state.id, array_id),
        }
    }

    pub fn open_vertices(&mut self, id: Option<String>) {
        self.vertices = id.map(|id| (id, Vec::new()));
    }

    pub fn close_vertices(&mut self, symbols: &mut SymbolTable) {
        let Some((id, inputs)) = self.vertices.take() else {
            return;
        };
        let mut set = VertexSet::default();
        for input in &inputs {
            let Some(source) = symbols.sources.get(&input.source) else {
                log::warn!("Vertices '{}' reference unknown source '{}'", id, input.source);
                continue;
            };
            match input.semantic {
                Semantic::Position => set.positions = Some(source.vec3s()),
                Semantic::Normal => set.normals = Some(source.vec3s()),
                Semantic::TexCoord if set.tex_coords.is_none() => set.tex_coords = Some(source.vec2s()),
                _ => {}
            }
        }
        symbols.vertices.insert(id, set);
    }

    /// Route an `<input>` to the open `<vertices>` or primitive.
    pub fn add_input(&mut self, input: Input) {
        if let Some((_, inputs)) = &mut self.vertices {
            inputs.push(input);
        } else if let Some(primitive) = &mut self.primitive {
            primitive.inputs.push(input);
        }
    }

    pub fn open_primitive(&mut self, kind: PrimitiveKind, material: Option<String>) {
        self.primitive = Some(PrimitiveBuffer::new(kind, material));
    }

    /// Content of a `<p>`.
    pub fn push_indices(&mut self, indices: Vec<i32>) {
        if let Some(polygon) = &mut self.polygon {
            polygon.outer = indices;
            return;
        }
        let Some(primitive) = &mut self.primitive else {
            return;
        };
        if primitive.kind == PrimitiveKind::Polygons {
            primitive.polygons.push(PolygonContours {
                outer: indices,
                holes: Vec::new(),
            });
        } else {
            primitive.streams.push(indices);
        }
    }

    pub fn set_vcount(&mut self, counts: Vec<i32>) {
        if let Some(primitive) = &mut self.primitive {
            primitive.vcount = counts;
        }
    }

    pub fn open_polygon_with_holes(&mut self) {
        self.polygon = Some(PolygonContours::default());
    }

    /// Content of an `<h>`.
    pub fn push_hole(&mut self, indices: Vec<i32>) {
        if let Some(polygon) = &mut self.polygon {
            polygon.holes.push(indices);
        }
    }

    pub fn close_polygon_with_holes(&mut self) {
        if let (Some(polygon), Some(primitive)) = (self.polygon.take(), &mut self.primitive) {
            primitive.polygons.push(polygon);
        }
    }

    pub fn close_primitive(&mut self, symbols: &SymbolTable) {
        let Some(buffer) = self.primitive.take() else {
            return;
        };
        let Some((geometry_id, primitives)) = &mut self.geometry else {
            return;
        };
        match buffer.decode(symbols, self.crease_angle) {
            Ok(primitive) => primitives.push(Arc::new(primitive)),
            Err(err) => log::warn!(
                "Dropping {:?} batch of geometry '{}': {}",
                buffer.kind,
                geometry_id,
                err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREASE: f32 = std::f32::consts::FRAC_PI_2;

    fn input(semantic: Semantic, source: &str, offset: usize) -> Input {
        Input {
            semantic,
            source: source.to_string(),
            offset,
        }
    }

    /// Symbols holding a square's positions under vertices "verts",
    /// one normal under "normals" and four UVWs under "uvs".
    fn square_symbols() -> SymbolTable {
        let mut symbols = SymbolTable::new();
        symbols.sources.insert(
            "positions",
            Source::new(
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
                3,
                None,
            ),
        );
        symbols.sources.insert("normals", Source::new(vec![0.0, 0.0, 1.0], 3, None));
        symbols.sources.insert(
            "uvs",
            Source::new(
                vec![0.0, 0.0, 9.0, 1.0, 0.0, 9.0, 1.0, 1.0, 9.0, 0.0, 1.0, 9.0],
                3,
                None,
            ),
        );

        let mut decoder = GeometryDecoder::new(CREASE);
        decoder.open_vertices(Some("verts".to_string()));
        decoder.add_input(input(Semantic::Position, "positions", 0));
        decoder.close_vertices(&mut symbols);
        symbols
    }

    #[test]
    fn test_triangles_with_interleaved_inputs() {
        let symbols = square_symbols();
        let mut buffer = PrimitiveBuffer::new(PrimitiveKind::Triangles, Some("mat".to_string()));
        buffer.inputs = vec![
            input(Semantic::Vertex, "verts", 0),
            input(Semantic::Normal, "normals", 1),
            input(Semantic::TexCoord, "uvs", 2),
        ];
        buffer.streams.push(vec![0, 0, 0, 1, 0, 1, 2, 0, 2, 0, 0, 0, 2, 0, 2, 3, 0, 3]);

        let primitive = buffer.decode(&symbols, CREASE).unwrap();
        assert_eq!(primitive.topology, Topology::Triangles);
        assert_eq!(primitive.position_indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(primitive.normal_indices, Some(vec![0; 6]));
        assert_eq!(primitive.tex_coord_indices, Some(vec![0, 1, 2, 0, 2, 3]));
        assert_eq!(primitive.tex_coords.as_ref().unwrap()[2], Vec2::new(1.0, 1.0));
        assert_eq!(primitive.material_symbol.as_deref(), Some("mat"));
        assert!(primitive.strip_counts.is_empty());
        assert!(primitive.crease_angle.is_none());
    }

    #[test]
    fn test_huge_offset_is_misaligned() {
        let symbols = square_symbols();
        let mut buffer = PrimitiveBuffer::new(PrimitiveKind::Triangles, None);
        buffer.inputs = vec![input(Semantic::Vertex, "verts", usize::MAX)];
        buffer.streams.push(vec![0, 1, 2]);

        assert_eq!(
            buffer.decode(&symbols, CREASE).unwrap_err(),
            DecodeError::Misaligned {
                len: 3,
                stride: usize::MAX
            }
        );
    }

    #[test]
    fn test_shared_offset_inputs() {
        let symbols = square_symbols();
        let mut buffer = PrimitiveBuffer::new(PrimitiveKind::Triangles, None);
        // VERTEX and TEXCOORD share offset 0: one index per vertex
        buffer.inputs = vec![input(Semantic::Vertex, "verts", 0), input(Semantic::TexCoord, "uvs", 0)];
        buffer.streams.push(vec![0, 1, 2]);

        let primitive = buffer.decode(&symbols, CREASE).unwrap();
        assert_eq!(primitive.position_indices, vec![0, 1, 2]);
        assert_eq!(primitive.tex_coord_indices, Some(vec![0, 1, 2]));
        assert_eq!(primitive.crease_angle, Some(CREASE));
    }

    #[test]
    fn test_fans_and_strips_count_per_p() {
        let symbols = square_symbols();
        for kind in [PrimitiveKind::TriFans, PrimitiveKind::TriStrips] {
            let mut buffer = PrimitiveBuffer::new(kind, None);
            buffer.inputs = vec![input(Semantic::Vertex, "verts", 0)];
            buffer.streams.push(vec![0, 1, 2, 3]);
            buffer.streams.push(vec![0, 2, 3]);

            let primitive = buffer.decode(&symbols, CREASE).unwrap();
            assert_eq!(primitive.strip_counts, vec![4, 3]);
            assert_eq!(primitive.position_indices, vec![0, 1, 2, 3, 0, 2, 3]);
        }
    }

    #[test]
    fn test_polylist_uses_vcount() {
        let symbols = square_symbols();
        let mut buffer = PrimitiveBuffer::new(PrimitiveKind::Polylist, None);
        buffer.inputs = vec![input(Semantic::Vertex, "verts", 0)];
        buffer.vcount = vec![4, 3];
        buffer.streams.push(vec![0, 1, 2, 3, 0, 1, 2]);

        let primitive = buffer.decode(&symbols, CREASE).unwrap();
        assert_eq!(primitive.topology, Topology::Polygons);
        assert_eq!(primitive.strip_counts, vec![4, 3]);
        assert!(primitive.contour_counts.is_none());

        buffer.vcount = vec![4, 4];
        assert_eq!(
            buffer.decode(&symbols, CREASE).unwrap_err(),
            DecodeError::VertexCountMismatch { expected: 8, actual: 7 }
        );
    }

    #[test]
    fn test_polygons_with_holes() {
        let symbols = square_symbols();
        let mut decoder = GeometryDecoder::new(CREASE);
        decoder.open_geometry(Some("g".to_string()));
        decoder.open_primitive(PrimitiveKind::Polygons, None);
        decoder.add_input(input(Semantic::Vertex, "verts", 0));
        decoder.open_polygon_with_holes();
        decoder.push_indices(vec![0, 1, 2, 3]);
        decoder.push_hole(vec![0, 1, 2]);
        decoder.close_polygon_with_holes();
        decoder.push_indices(vec![1, 2, 3]);
        decoder.close_primitive(&symbols);

        let mut symbols = symbols;
        decoder.close_geometry(&mut symbols);
        let primitive = &symbols.geometries.get("g").unwrap()[0];

        assert_eq!(primitive.strip_counts, vec![4, 3, 3]);
        assert_eq!(primitive.contour_counts, Some(vec![2, 1]));
        assert_eq!(primitive.position_indices, vec![0, 1, 2, 3, 0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_lines_and_linestrips() {
        let symbols = square_symbols();

        let mut lines = PrimitiveBuffer::new(PrimitiveKind::Lines, None);
        lines.inputs = vec![input(Semantic::Vertex, "verts", 0)];
        lines.streams.push(vec![0, 1, 2, 3]);
        let primitive = lines.decode(&symbols, CREASE).unwrap();
        assert_eq!(primitive.position_indices, vec![0, 1, 2, 3]);
        assert!(primitive.crease_angle.is_none());

        let mut strips = PrimitiveBuffer::new(PrimitiveKind::LineStrips, None);
        strips.inputs = vec![input(Semantic::Vertex, "verts", 0)];
        strips.streams.push(vec![0, 1, 2, 3]);
        strips.streams.push(vec![3]);
        let primitive = strips.decode(&symbols, CREASE).unwrap();
        assert_eq!(primitive.topology, Topology::Lines);
        assert_eq!(primitive.position_indices, vec![0, 1, 1, 2, 2, 3]);

        let mut single = PrimitiveBuffer::new(PrimitiveKind::LineStrips, None);
        single.inputs = vec![input(Semantic::Vertex, "verts", 0)];
        single.streams.push(vec![2]);
        assert_eq!(single.decode(&symbols, CREASE).unwrap_err(), DecodeError::Empty);
    }

    #[test]
    fn test_batches_dropped_independently() {
        let mut symbols = square_symbols();
        let mut decoder = GeometryDecoder::new(CREASE);
        decoder.open_geometry(Some("g".to_string()));

        decoder.open_primitive(PrimitiveKind::Triangles, None);
        decoder.add_input(input(Semantic::Vertex, "missing", 0));
        decoder.push_indices(vec![0, 1, 2]);
        decoder.close_primitive(&symbols);

        decoder.open_primitive(PrimitiveKind::Triangles, None);
        decoder.add_input(input(Semantic::Vertex, "verts", 0));
        decoder.add_input(input(Semantic::Normal, "normals", 1));
        decoder.push_indices(vec![0, 0, 1, 0, 2]);
        decoder.close_primitive(&symbols);

        decoder.open_primitive(PrimitiveKind::Triangles, None);
        decoder.add_input(input(Semantic::Vertex, "verts", 0));
        decoder.push_indices(vec![0, 1, 7]);
        decoder.close_primitive(&symbols);

        decoder.open_primitive(PrimitiveKind::Triangles, None);
        decoder.add_input(input(Semantic::Vertex, "verts", 0));
        decoder.push_indices(vec![1, 2, 3]);
        decoder.close_primitive(&symbols);

        decoder.close_geometry(&mut symbols);
        let batches = symbols.geometries.get("g").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].position_indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_source_from_accessor() {
        let mut symbols = SymbolTable::new();
        symbols.arrays.insert("arr", vec![0.0, 1.0, 2.0, 3.0]);

        let mut decoder = GeometryDecoder::new(CREASE);
        decoder.open_source(Some("src".to_string()));
        decoder.set_accessor(Some("arr".to_string()), 2, Some(2));
        decoder.close_source(&mut symbols);

        let source = symbols.sources.get("src").unwrap();
        assert_eq!(source.vec2s(), vec![Vec2::new(0.0, 1.0), Vec2::new(2.0, 3.0)]);
    }
}
