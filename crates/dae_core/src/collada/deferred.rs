//! References resolved after the whole document has been read.
//!
//! COLLADA allows references in either direction, so every reference is
//! recorded as a [`PendingBinding`] holding only ids and resolved by
//! [`DeferredQueue::drain`], in recording order. A binding whose target does
//! not exist is skipped.

use std::collections::HashMap;
use std::sync::Arc;

use super::symbols::SymbolTable;
use crate::geometry::Primitive;
use crate::scene::{AppearanceId, NodeId, NodeKind, SceneGraph, Shape, SharedGroupId};

/// Controllers may wrap other controllers (a skin over a morph).
const MAX_CONTROLLER_DEPTH: usize = 8;

/// Target of an `instance_geometry` or `instance_controller`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstanceTarget {
    Geometry(String),
    Controller(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PendingBinding {
    /// Set the diffuse texture of an appearance from an image id.
    EffectBinding { appearance: AppearanceId, image: String },

    /// Create one shape per batch of the target under `placeholder`.
    ShapeInstantiation {
        placeholder: NodeId,
        target: InstanceTarget,
        node_name: Option<String>,
    },

    /// Attach a link to the shared group of node `node` under `parent`.
    NodeLink { parent: NodeId, node: String },

    /// Bind the effect of `material` to the shapes under `group` drawn with `symbol`.
    MaterialBinding {
        group: NodeId,
        symbol: String,
        material: String,
    },

    /// Make visual scene `scene` the document's scene.
    SceneSelection { scene: String },
}

#[derive(Debug, Default)]
pub struct DeferredQueue {
    pending: Vec<PendingBinding>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, binding: PendingBinding) {
        self.pending.push(binding);
    }

    pub fn pending(&self) -> &[PendingBinding] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolve every binding in order. Returns the root of the last selected
    /// visual scene that exists.
    pub fn drain(self, symbols: &SymbolTable, graph: &mut SceneGraph) -> Option<NodeId> {
        let mut resolver = Resolver {
            symbols,
            graph,
            shared_groups: HashMap::new(),
            scene: None,
        };
        let total = self.pending.len();
        let mut skipped = 0;
        for binding in self.pending {
            if !resolver.resolve(binding) {
                skipped += 1;
            }
        }
        log::debug!("Resolved {} of {} deferred bindings", total - skipped, total);
        resolver.scene
    }
}

struct Resolver<'a> {
    symbols: &'a SymbolTable,
    graph: &'a mut SceneGraph,
    /// node id -> shared group, created on first link
    shared_groups: HashMap<String, SharedGroupId>,
    scene: Option<NodeId>,
}

impl<'a> Resolver<'a> {
    /// Returns false when the binding's target did not resolve.
    fn resolve(&mut self, binding: PendingBinding) -> bool {
        match binding {
            PendingBinding::EffectBinding { appearance, image } => self.bind_texture(appearance, &image),
            PendingBinding::ShapeInstantiation {
                placeholder,
                target,
                node_name,
            } => self.instantiate_shapes(placeholder, &target, node_name),
            PendingBinding::NodeLink { parent, node } => self.link_node(parent, &node),
            PendingBinding::MaterialBinding {
                group,
                symbol,
                material,
            } => self.bind_material(group, &symbol, &material),
            PendingBinding::SceneSelection { scene } => match self.symbols.visual_scenes.get(&scene) {
                Some(&root) => {
                    self.scene = Some(root);
                    true
                }
                None => {
                    log::debug!("Unknown visual scene '{}'", scene);
                    false
                }
            },
        }
    }

    fn bind_texture(&mut self, appearance: AppearanceId, image: &str) -> bool {
        let Some(path) = self.symbols.images.get(image) else {
            log::debug!("Unknown image '{}'", image);
            return false;
        };
        match self.graph.appearance_mut(appearance) {
            Some(appearance) => {
                appearance.diffuse_texture = Some(path.clone());
                true
            }
            None => false,
        }
    }

    fn geometry(&self, target: &InstanceTarget) -> Option<&'a Vec<Arc<Primitive>>> {
        let symbols = self.symbols;
        let mut id = match target {
            InstanceTarget::Geometry(id) => return symbols.geometries.get(id),
            InstanceTarget::Controller(id) => id.as_str(),
        };
        for _ in 0..MAX_CONTROLLER_DEPTH {
            let source = symbols.controllers.get(id)?;
            if let Some(geometry) = symbols.geometries.get(source) {
                return Some(geometry);
            }
            id = source.as_str();
        }
        None
    }

    fn instantiate_shapes(&mut self, placeholder: NodeId, target: &InstanceTarget, node_name: Option<String>) -> bool {
        let Some(batches) = self.geometry(target) else {
            log::debug!("Unresolved instance target {:?}", target);
            return false;
        };
        for (i, batch) in batches.iter().enumerate() {
            let name = match (&node_name, i) {
                (Some(name), 0) => Some(name.clone()),
                (Some(name), i) => Some(format!("{}_{}", name, i)),
                (None, _) => None,
            };
            let shape = self.graph.add_node(NodeKind::Shape(Shape::new(batch.clone())), name);
            self.graph.add_child(placeholder, shape);
        }
        true
    }

    fn link_node(&mut self, parent: NodeId, node: &str) -> bool {
        let Some(&root) = self.symbols.nodes.get(node) else {
            log::debug!("Unknown node '{}'", node);
            return false;
        };
        let graph = &mut *self.graph;
        let group = *self
            .shared_groups
            .entry(node.to_string())
            .or_insert_with(|| graph.add_shared_group(root));
        let link = graph.add_node(NodeKind::Link(group), None);
        graph.add_child(parent, link);
        true
    }

    fn bind_material(&mut self, group: NodeId, symbol: &str, material: &str) -> bool {
        let Some(definition) = self.symbols.materials.get(material) else {
            log::debug!("Unknown material '{}'", material);
            return false;
        };
        let Some(&appearance) = definition.effect.as_deref().and_then(|effect| self.symbols.effects.get(effect)) else {
            log::debug!("Material '{}' has no known effect", material);
            return false;
        };

        if let Some(target) = self.graph.appearance_mut(appearance) {
            target.name = Some(definition.name.clone().unwrap_or_else(|| material.to_string()));
        }

        let shapes = self.graph.shapes_in_subtree(group);
        let matching: Vec<NodeId> = shapes
            .iter()
            .copied()
            .filter(|&id| {
                self.graph
                    .node(id)
                    .and_then(|node| node.shape())
                    .and_then(|shape| shape.material_symbol.as_deref())
                    == Some(symbol)
            })
            .collect();

        // No shape carries the symbol: bind every shape in the group
        let targets = if matching.is_empty() { shapes } else { matching };
        for shape in targets {
            self.graph.bind_appearance(shape, appearance);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collada::symbols::MaterialDef;
    use crate::geometry::Topology;
    use crate::scene::Appearance;
    use dae_math::Vec3;

    fn batch(symbol: Option<&str>) -> Arc<Primitive> {
        let mut primitive = Primitive::new(Topology::Triangles, vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        primitive.material_symbol = symbol.map(str::to_string);
        Arc::new(primitive)
    }

    #[test]
    fn test_shapes_named_after_node() {
        let mut graph = SceneGraph::new("q");
        let mut symbols = SymbolTable::new();
        symbols.geometries.insert("g", vec![batch(None), batch(None), batch(None)]);
        symbols.controllers.insert("skin", "morph".to_string());
        symbols.controllers.insert("morph", "g".to_string());

        let a = graph.add_node(NodeKind::Group, None);
        let b = graph.add_node(NodeKind::Group, None);
        let mut queue = DeferredQueue::new();
        queue.push(PendingBinding::ShapeInstantiation {
            placeholder: a,
            target: InstanceTarget::Geometry("g".to_string()),
            node_name: Some("Box".to_string()),
        });
        queue.push(PendingBinding::ShapeInstantiation {
            placeholder: b,
            target: InstanceTarget::Controller("skin".to_string()),
            node_name: None,
        });
        queue.drain(&symbols, &mut graph);

        let names: Vec<_> = graph.children(a).iter().map(|&id| graph.name(id)).collect();
        assert_eq!(names, vec![Some("Box"), Some("Box_1"), Some("Box_2")]);
        assert_eq!(graph.children(b).len(), 3);
    }

    #[test]
    fn test_node_link_reuses_shared_group() {
        let mut graph = SceneGraph::new("q");
        let mut symbols = SymbolTable::new();
        let part = graph.add_node(NodeKind::Group, None);
        symbols.nodes.insert("part", part);

        let mut queue = DeferredQueue::new();
        for _ in 0..2 {
            queue.push(PendingBinding::NodeLink {
                parent: graph.root(),
                node: "part".to_string(),
            });
        }
        queue.push(PendingBinding::NodeLink {
            parent: graph.root(),
            node: "missing".to_string(),
        });
        queue.drain(&symbols, &mut graph);

        assert_eq!(graph.shared_group_count(), 1);
        assert_eq!(graph.children(graph.root()).len(), 2);
    }

    #[test]
    fn test_material_binding_by_symbol_then_fallback() {
        let mut graph = SceneGraph::new("q");
        let mut symbols = SymbolTable::new();
        let red = graph.add_appearance(Appearance::default());
        symbols.effects.insert("red-fx", red);
        symbols.materials.insert(
            "red",
            MaterialDef {
                name: Some("Red".to_string()),
                effect: Some("red-fx".to_string()),
            },
        );

        let group = graph.add_node(NodeKind::Group, None);
        let a = graph.add_node(NodeKind::Shape(Shape::new(batch(Some("s1")))), None);
        let b = graph.add_node(NodeKind::Shape(Shape::new(batch(Some("s2")))), None);
        graph.add_child(group, a);
        graph.add_child(group, b);

        let mut queue = DeferredQueue::new();
        queue.push(PendingBinding::MaterialBinding {
            group,
            symbol: "s2".to_string(),
            material: "red".to_string(),
        });
        queue.drain(&symbols, &mut graph);

        assert!(graph.shape_appearance(a).is_none());
        assert_eq!(graph.shape_appearance(b).unwrap().name.as_deref(), Some("Red"));

        let mut queue = DeferredQueue::new();
        queue.push(PendingBinding::MaterialBinding {
            group,
            symbol: "unknown".to_string(),
            material: "red".to_string(),
        });
        queue.drain(&symbols, &mut graph);
        assert!(graph.shape_appearance(a).is_some());
    }

    #[test]
    fn test_last_scene_selection_wins() {
        let mut graph = SceneGraph::new("q");
        let mut symbols = SymbolTable::new();
        let first = graph.add_node(NodeKind::Group, None);
        let second = graph.add_node(NodeKind::Group, None);
        symbols.visual_scenes.insert("first", first);
        symbols.visual_scenes.insert("second", second);

        let mut queue = DeferredQueue::new();
        queue.push(PendingBinding::SceneSelection { scene: "first".to_string() });
        queue.push(PendingBinding::SceneSelection { scene: "second".to_string() });
        queue.push(PendingBinding::SceneSelection { scene: "nope".to_string() });
        assert_eq!(queue.drain(&symbols, &mut graph), Some(second));
    }
}
