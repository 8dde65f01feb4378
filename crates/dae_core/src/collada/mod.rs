//! COLLADA (`.dae`) support.
//!
//! A document is read in a single streaming pass. Numeric arrays, sources,
//! geometries, effects and materials land in a [`symbols::SymbolTable`]; the
//! node hierarchy is built directly into a [`SceneGraph`](crate::scene::SceneGraph).
//! Every reference between elements is queued and resolved once the document
//! has been read, so declaration order does not matter. Finally the selected
//! visual scene is centered, scaled and rotated to Y-up.
//!
//! ## Supported
//!
//! - `triangles`, `trifans`, `tristrips`, `polylist`, `polygons` (with holes),
//!   `lines`, `linestrips`
//! - `profile_COMMON` effects with diffuse textures
//! - `instance_geometry`, `instance_controller` (skin and morph bind geometry),
//!   `instance_node` as shared subtrees
//! - `matrix`, `rotate`, `scale`, `translate` and `lookat` node transforms
//!
//! ## Not Supported
//!
//! - Other effect profiles
//! - Animation, lights, cameras, skin weights
//! - Embedded image data
//!
//! # Example
//!
//! ```ignore
//! use dae_core::collada::{load_dae_from_str, LoadOptions};
//!
//! let scene = load_dae_from_str(&content, "models/house.dae", &LoadOptions::default())?;
//! println!("Loaded {} shapes", scene.shape_count());
//! ```

pub mod arrays;
pub mod assembler;
pub mod decoder;
pub mod deferred;
pub mod effects;
pub mod normalize;
pub mod symbols;
pub mod types;

mod loader;
mod parser;

pub use loader::*;
pub use parser::*;
pub use types::{OpaqueMode, UpAxis};
