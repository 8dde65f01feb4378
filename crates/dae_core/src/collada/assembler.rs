//! Stack of open scene elements.
//!
//! `<visual_scene>`, `<node>` and instance placeholders push a frame when they
//! open and pop it when they close. New nodes attach to the frame on top.

use dae_math::Mat4;

use super::symbols::SymbolTable;
use super::types::TransformElement;
use crate::scene::{NodeId, NodeKind, SceneGraph};

#[derive(Debug)]
struct Frame {
    node: NodeId,
    /// Name shapes created under this frame inherit
    name: Option<String>,
}

#[derive(Debug, Default)]
pub struct SceneAssembler {
    stack: Vec<Frame>,
}

impl SceneAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node currently receiving children.
    pub fn current(&self) -> Option<NodeId> {
        self.stack.last().map(|frame| frame.node)
    }

    /// Name of the innermost frame.
    pub fn current_name(&self) -> Option<String> {
        self.stack.last().and_then(|frame| frame.name.clone())
    }

    pub fn open_visual_scene(
        &mut self,
        id: Option<&str>,
        name: Option<String>,
        graph: &mut SceneGraph,
        symbols: &mut SymbolTable,
    ) -> NodeId {
        let root = graph.add_node(NodeKind::Transform(Mat4::IDENTITY), name.clone());
        if let Some(id) = id {
            symbols.visual_scenes.insert(id, root);
        }
        self.stack.push(Frame { node: root, name });
        root
    }

    /// Open a `<node>`. Its display name is `name`, or `id` when unnamed.
    pub fn open_node(
        &mut self,
        id: Option<&str>,
        name: Option<String>,
        graph: &mut SceneGraph,
        symbols: &mut SymbolTable,
    ) -> NodeId {
        let name = name.or_else(|| id.map(str::to_string));
        let node = graph.add_node(NodeKind::Transform(Mat4::IDENTITY), name.clone());
        if let Some(parent) = self.current() {
            graph.add_child(parent, node);
        }
        if let Some(id) = id {
            symbols.nodes.insert(id, node);
        }
        self.stack.push(Frame { node, name });
        node
    }

    /// Open an `instance_geometry`/`instance_controller` placeholder group.
    pub fn open_instance(&mut self, graph: &mut SceneGraph) -> NodeId {
        let name = self.current_name();
        let placeholder = graph.add_node(NodeKind::Group, None);
        if let Some(parent) = self.current() {
            graph.add_child(parent, placeholder);
        }
        self.stack.push(Frame {
            node: placeholder,
            name,
        });
        placeholder
    }

    pub fn close(&mut self) {
        self.stack.pop();
    }

    /// Fold a transform element onto the node on top: `local = local * element`.
    /// Elements arrive in document order, so the first one written is outermost.
    pub fn apply_transform(&self, element: &TransformElement, graph: &mut SceneGraph) {
        if let Some(node) = self.current() {
            graph.postmultiply_transform(node, element.to_matrix());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dae_math::Vec3;

    #[test]
    fn test_nested_nodes() {
        let mut graph = SceneGraph::new("asm");
        let mut symbols = SymbolTable::new();
        let mut assembler = SceneAssembler::new();

        let scene = assembler.open_visual_scene(Some("scene"), None, &mut graph, &mut symbols);
        let outer = assembler.open_node(Some("outer"), Some("Outer".to_string()), &mut graph, &mut symbols);
        let inner = assembler.open_node(Some("inner"), None, &mut graph, &mut symbols);
        assert_eq!(assembler.current(), Some(inner));
        assembler.close();
        let placeholder = assembler.open_instance(&mut graph);
        assert_eq!(assembler.current_name().as_deref(), Some("Outer"));
        assembler.close();
        assembler.close();
        assembler.close();

        assert_eq!(assembler.current(), None);
        assert_eq!(graph.children(scene), &[outer]);
        assert_eq!(graph.children(outer), &[inner, placeholder]);
        assert_eq!(graph.name(inner), Some("inner"));
        assert_eq!(symbols.nodes.get("inner"), Some(&inner));
        assert_eq!(symbols.visual_scenes.get("scene"), Some(&scene));
    }

    #[test]
    fn test_transforms_compose_in_order() {
        let mut graph = SceneGraph::new("asm");
        let mut symbols = SymbolTable::new();
        let mut assembler = SceneAssembler::new();

        let node = assembler.open_node(None, None, &mut graph, &mut symbols);
        // translate then scale: the scale applies in the translated frame
        assembler.apply_transform(&TransformElement::Translate(Vec3::new(5.0, 0.0, 0.0)), &mut graph);
        assembler.apply_transform(&TransformElement::Scale(Vec3::splat(2.0)), &mut graph);

        let p = graph.transform(node).unwrap().transform_point3(Vec3::X);
        assert!((p - Vec3::new(7.0, 0.0, 0.0)).length() < 0.001);

        // rotate after the scale turns +X into +Y before scaling
        let rotate = TransformElement::from_values("rotate", &[0.0, 0.0, 1.0, 90.0]).unwrap();
        assembler.apply_transform(&rotate, &mut graph);
        let p = graph.transform(node).unwrap().transform_point3(Vec3::X);
        assert!((p - Vec3::new(5.0, 2.0, 0.0)).length() < 0.001);
    }
}
