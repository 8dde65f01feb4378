//! Scene graph types.
//!
//! The graph is an arena: nodes, shared groups and appearances live in
//! vectors and refer to each other by index. A [`NodeKind::Link`] points at a
//! [`SharedGroup`], so one subtree can be attached at many places without
//! copying its shapes or geometry.

use std::sync::Arc;

use dae_math::{Aabb, Mat4, Mat4Ext, Vec3};

use crate::geometry::Primitive;

/// Index of a node in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Index of a shared group in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SharedGroupId(pub usize);

/// Index of an appearance in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AppearanceId(pub usize);

/// Surface parameters of a COLLADA `profile_COMMON` effect.
#[derive(Clone, Debug, PartialEq)]
pub struct Appearance {
    /// Display name, taken from the material bound to this effect
    pub name: Option<String>,

    pub ambient_color: Vec3,
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub emissive_color: Vec3,

    pub shininess: f32,

    /// 0 = opaque, 1 = fully transparent
    pub transparency: f32,

    /// Resolved path of the diffuse texture image
    pub diffuse_texture: Option<String>,

    pub double_sided: bool,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            name: None,
            ambient_color: Vec3::ZERO,
            diffuse_color: Vec3::ONE,
            specular_color: Vec3::ZERO,
            emissive_color: Vec3::ZERO,
            shininess: 1.0,
            transparency: 0.0,
            diffuse_texture: None,
            double_sided: false,
        }
    }
}

/// A leaf drawing one decoded geometry batch.
#[derive(Clone, Debug)]
pub struct Shape {
    /// Shared with every other shape built from the same batch
    pub geometry: Arc<Primitive>,

    pub appearance: Option<AppearanceId>,

    /// Material symbol copied from the batch, matched by `instance_material`
    pub material_symbol: Option<String>,
}

impl Shape {
    pub fn new(geometry: Arc<Primitive>) -> Self {
        let material_symbol = geometry.material_symbol.clone();
        Self {
            geometry,
            appearance: None,
            material_symbol,
        }
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Plain grouping node
    Group,
    /// Group with a local transform
    Transform(Mat4),
    Shape(Shape),
    /// Attachment point of a shared group
    Link(SharedGroupId),
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: Option<String>,
    pub kind: NodeKind,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            kind,
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn shape(&self) -> Option<&Shape> {
        match &self.kind {
            NodeKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }
}

/// A subtree reachable from any number of [`NodeKind::Link`] nodes.
#[derive(Clone, Copy, Debug)]
pub struct SharedGroup {
    pub root: NodeId,
}

/// The assembled scene.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    /// Scene name (usually the document path)
    pub name: String,
    nodes: Vec<SceneNode>,
    shared_groups: Vec<SharedGroup>,
    appearances: Vec<Appearance>,
    root: NodeId,
}

impl SceneGraph {
    /// Create a graph holding only an empty root group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: vec![SceneNode::new(NodeKind::Group)],
            shared_groups: Vec::new(),
            appearances: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// True when nothing is attached under the root.
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Add a detached node and return its ID.
    pub fn add_node(&mut self, kind: NodeKind, name: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = SceneNode::new(kind);
        node.name = name;
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if child.0 >= self.nodes.len() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children()).unwrap_or(&[])
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.name.as_deref())
    }

    /// Local transform of a transform node.
    pub fn transform(&self, id: NodeId) -> Option<Mat4> {
        match self.node(id)?.kind {
            NodeKind::Transform(matrix) => Some(matrix),
            _ => None,
        }
    }

    /// Replace the local transform. Turns a plain group into a transform node.
    pub fn set_transform(&mut self, id: NodeId, matrix: Mat4) {
        if let Some(node) = self.node_mut(id) {
            match node.kind {
                NodeKind::Group | NodeKind::Transform(_) => node.kind = NodeKind::Transform(matrix),
                _ => log::warn!("Ignoring transform on non-group node {:?}", id),
            }
        }
    }

    /// `local = matrix * local`
    pub fn premultiply_transform(&mut self, id: NodeId, matrix: Mat4) {
        let current = self.transform(id).unwrap_or(Mat4::IDENTITY);
        self.set_transform(id, matrix * current);
    }

    /// `local = local * matrix`
    pub fn postmultiply_transform(&mut self, id: NodeId, matrix: Mat4) {
        let current = self.transform(id).unwrap_or(Mat4::IDENTITY);
        self.set_transform(id, current * matrix);
    }

    pub fn add_shared_group(&mut self, root: NodeId) -> SharedGroupId {
        let id = SharedGroupId(self.shared_groups.len());
        self.shared_groups.push(SharedGroup { root });
        id
    }

    pub fn shared_group(&self, id: SharedGroupId) -> Option<&SharedGroup> {
        self.shared_groups.get(id.0)
    }

    pub fn shared_group_count(&self) -> usize {
        self.shared_groups.len()
    }

    pub fn add_appearance(&mut self, appearance: Appearance) -> AppearanceId {
        let id = AppearanceId(self.appearances.len());
        self.appearances.push(appearance);
        id
    }

    pub fn appearance(&self, id: AppearanceId) -> Option<&Appearance> {
        self.appearances.get(id.0)
    }

    pub fn appearance_mut(&mut self, id: AppearanceId) -> Option<&mut Appearance> {
        self.appearances.get_mut(id.0)
    }

    pub fn appearance_count(&self) -> usize {
        self.appearances.len()
    }

    pub fn appearances(&self) -> &[Appearance] {
        &self.appearances
    }

    /// Appearance bound to a shape node, if any.
    pub fn shape_appearance(&self, id: NodeId) -> Option<&Appearance> {
        let shape = self.node(id)?.shape()?;
        self.appearance(shape.appearance?)
    }

    /// Set the appearance of a shape node.
    pub fn bind_appearance(&mut self, id: NodeId, appearance: AppearanceId) {
        if let Some(SceneNode {
            kind: NodeKind::Shape(shape),
            ..
        }) = self.nodes.get_mut(id.0)
        {
            shape.appearance = Some(appearance);
        }
    }

    /// Shape nodes below `id`, in depth-first order. Links are not followed.
    pub fn shapes_in_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut shapes = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            if node.shape().is_some() {
                shapes.push(current);
            }
            stack.extend(node.children.iter().rev());
        }
        shapes
    }

    /// Visit every shape reachable from `from` with its accumulated transform.
    ///
    /// A shared group is walked once per link site, each time with that
    /// site's transform. A link back into a shared group already being
    /// walked is skipped.
    pub fn for_each_shape<F>(&self, from: NodeId, mut f: F)
    where
        F: FnMut(NodeId, &Shape, Mat4),
    {
        let mut active = Vec::new();
        self.walk(from, Mat4::IDENTITY, &mut active, &mut f);
    }

    fn walk<F>(&self, id: NodeId, parent: Mat4, active: &mut Vec<SharedGroupId>, f: &mut F)
    where
        F: FnMut(NodeId, &Shape, Mat4),
    {
        let Some(node) = self.node(id) else {
            return;
        };

        let world = match &node.kind {
            NodeKind::Transform(matrix) => parent * *matrix,
            _ => parent,
        };

        match &node.kind {
            NodeKind::Shape(shape) => f(id, shape, world),
            NodeKind::Link(group) => {
                if active.contains(group) {
                    log::warn!("Skipping recursive link to shared group {:?}", group);
                } else if let Some(shared) = self.shared_group(*group) {
                    active.push(*group);
                    self.walk(shared.root, world, active, f);
                    active.pop();
                }
            }
            NodeKind::Group | NodeKind::Transform(_) => {}
        }

        for &child in &node.children {
            self.walk(child, world, active, f);
        }
    }

    /// Bounds of every shape reachable from `from`, in the space of `from`'s parent.
    pub fn world_bounds(&self, from: NodeId) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        self.for_each_shape(from, |_, shape, matrix| {
            let shape_bounds = matrix.transform_aabb(&shape.geometry.bounds);
            bounds = Aabb::surrounding(&bounds, &shape_bounds);
        });
        bounds
    }

    /// Number of shape instances reachable from the root, counting each link site.
    pub fn shape_count(&self) -> usize {
        let mut count = 0;
        self.for_each_shape(self.root, |_, _, _| count += 1);
        count
    }
}
