//! DAE Core - COLLADA loading into an instanced scene graph.
//!
//! This crate provides:
//!
//! - **Geometry types**: decoded `Primitive` batches and triangulated `Mesh` previews
//! - **Scene graph**: arena of groups, transforms, shapes and shared-group links
//! - **COLLADA support**: streaming `.dae` parsing, reference resolution and normalization
//!
//! # Example
//!
//! ```ignore
//! use dae_core::collada::load_dae;
//!
//! let scene = load_dae("house.dae")?;
//! println!("Loaded {} shapes, {} appearances",
//!     scene.shape_count(),
//!     scene.appearance_count());
//! ```

pub mod collada;
pub mod geometry;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use collada::{load_dae, load_dae_from_str, load_dae_or_empty, LoadError, LoadOptions};
pub use geometry::{Primitive, Topology};
pub use mesh::Mesh;
pub use scene::{Appearance, NodeId, NodeKind, SceneGraph, SceneNode, Shape};
