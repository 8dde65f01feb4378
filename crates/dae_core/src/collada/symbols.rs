//! Per-kind lookup tables from document ids to parsed values.
//!
//! Every table is insert-only while the document is read. Values that belong
//! to the output graph (nodes, appearances) are stored as arena indices into
//! the [`SceneGraph`](crate::scene::SceneGraph) being built.

use std::collections::HashMap;
use std::sync::Arc;

use dae_math::{Vec2, Vec3};

use crate::geometry::Primitive;
use crate::scene::{AppearanceId, NodeId};

/// Values stored in declaration order, addressed by document id.
#[derive(Clone, Debug)]
pub struct Registry<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `id` and return its slot.
    /// A repeated id points at the newest value; the older one stays in the arena.
    pub fn insert(&mut self, id: impl Into<String>, value: T) -> usize {
        let slot = self.items.len();
        self.items.push(value);
        self.index.insert(id.into(), slot);
        slot
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&slot| &self.items[slot])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let slot = *self.index.get(id)?;
        self.items.get_mut(slot)
    }
}

/// A flat numeric array read through an accessor stride.
#[derive(Clone, Debug, Default)]
pub struct Source {
    pub values: Vec<f32>,
    pub stride: usize,
    /// Element count declared by the accessor
    pub count: Option<usize>,
}

impl Source {
    pub fn new(values: Vec<f32>, stride: usize, count: Option<usize>) -> Self {
        Self {
            values,
            stride: stride.max(1),
            count,
        }
    }

    /// Number of logical elements.
    pub fn len(&self) -> usize {
        let available = self.values.len() / self.stride;
        self.count.map_or(available, |count| count.min(available))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn component(&self, element: usize, component: usize) -> f32 {
        if component < self.stride {
            self.values[element * self.stride + component]
        } else {
            0.0
        }
    }

    /// Elements as 3-vectors; missing components are 0.
    pub fn vec3s(&self) -> Vec<Vec3> {
        (0..self.len())
            .map(|i| Vec3::new(self.component(i, 0), self.component(i, 1), self.component(i, 2)))
            .collect()
    }

    /// Elements as 2-vectors; extra components are dropped.
    pub fn vec2s(&self) -> Vec<Vec2> {
        (0..self.len())
            .map(|i| Vec2::new(self.component(i, 0), self.component(i, 1)))
            .collect()
    }
}

/// Attributes gathered by a `<vertices>` element.
#[derive(Clone, Debug, Default)]
pub struct VertexSet {
    pub positions: Option<Vec<Vec3>>,
    pub normals: Option<Vec<Vec3>>,
    pub tex_coords: Option<Vec<Vec2>>,
}

/// A `<material>`: display name and the effect it instantiates.
#[derive(Clone, Debug, Default)]
pub struct MaterialDef {
    pub name: Option<String>,
    pub effect: Option<String>,
}

/// All id tables of one document.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// image id -> resolved path
    pub images: Registry<String>,
    pub effects: Registry<AppearanceId>,
    pub materials: Registry<MaterialDef>,
    /// geometry id -> decoded batches
    pub geometries: Registry<Vec<Arc<Primitive>>>,
    /// controller id -> geometry id
    pub controllers: Registry<String>,
    pub nodes: Registry<NodeId>,
    /// visual scene id -> root node
    pub visual_scenes: Registry<NodeId>,
    /// float_array / int_array id -> values
    pub arrays: Registry<Vec<f32>>,
    pub sources: Registry<Source>,
    pub vertices: Registry<VertexSet>,
    /// surface sid -> image id
    pub surfaces: Registry<String>,
    /// sampler sid -> surface sid
    pub samplers: Registry<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow `sampler -> surface -> image`. A name that is not a known
    /// sampler is taken as an image id.
    pub fn resolve_texture(&self, texture: &str) -> String {
        match self.samplers.get(texture) {
            Some(surface) => self
                .surfaces
                .get(surface)
                .cloned()
                .unwrap_or_else(|| surface.clone()),
            None => texture.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_latest_wins() {
        let mut registry = Registry::new();
        registry.insert("a", 1);
        registry.insert("b", 2);
        registry.insert("a", 3);

        assert_eq!(registry.get("a"), Some(&3));
        assert_eq!(registry.get("b"), Some(&2));
        assert_eq!(registry.get("c"), None);

        *registry.get_mut("b").unwrap() = 5;
        assert_eq!(registry.get("b"), Some(&5));
    }

    #[test]
    fn test_source_strides() {
        let source = Source::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, None);
        assert_eq!(source.len(), 2);
        assert_eq!(source.vec3s()[1], Vec3::new(4.0, 5.0, 6.0));
        // UVW truncated to UV
        assert_eq!(source.vec2s()[1], Vec2::new(4.0, 5.0));

        let short = Source::new(vec![1.0, 2.0, 3.0, 4.0], 2, Some(1));
        assert_eq!(short.len(), 1);
        assert_eq!(short.vec3s(), vec![Vec3::new(1.0, 2.0, 0.0)]);
    }

    #[test]
    fn test_resolve_texture_chain() {
        let mut symbols = SymbolTable::new();
        symbols.surfaces.insert("wood-surface", "wood-image".to_string());
        symbols.samplers.insert("wood-sampler", "wood-surface".to_string());

        assert_eq!(symbols.resolve_texture("wood-sampler"), "wood-image");
        assert_eq!(symbols.resolve_texture("direct-image"), "direct-image");
    }
}
