//! High-level COLLADA scene loading.
//!
//! This module provides the entry points that turn a `.dae` document into a
//! [`SceneGraph`]: parse, resolve references, normalize, attach.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalize::normalize;
use super::parser::{DocumentParser, ParseError, ParsedDocument};
use crate::scene::SceneGraph;

/// Errors that can occur during COLLADA loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Loader settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Center the scene, apply the unit scale and up-axis correction
    pub normalize: bool,

    /// Output units per document meter (100 = centimeters)
    pub target_units_per_meter: f32,

    /// Crease angle recorded on geometry that has no normals
    pub crease_angle_degrees: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            target_units_per_meter: 100.0,
            crease_angle_degrees: 90.0,
        }
    }
}

/// Progress reported to [`load_dae_with_progress`] callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPhase {
    Parsing,
    Complete,
}

/// Load a COLLADA file with default options.
///
/// Relative image paths are resolved against the file's directory.
///
/// # Example
///
/// ```ignore
/// use dae_core::collada::load_dae;
///
/// let scene = load_dae("house.dae")?;
/// println!("Loaded {} shapes", scene.shape_count());
/// ```
pub fn load_dae<P: AsRef<Path>>(path: P) -> LoadResult<SceneGraph> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    load_dae_from_str(&content, &path.to_string_lossy(), &LoadOptions::default())
}

/// Load a COLLADA document held in memory.
///
/// `document_path` names the document and anchors relative image paths.
pub fn load_dae_from_str(content: &str, document_path: &str, options: &LoadOptions) -> LoadResult<SceneGraph> {
    load_dae_with_progress(content, document_path, options, |_, _, _| {})
}

/// Like [`load_dae_from_str`], reporting the start and end of the parse.
///
/// `progress` is called with `(Parsing, path, 0.0)` before reading and
/// `(Complete, path, 1.0)` once the graph is finished. It is not called
/// when the parse fails.
pub fn load_dae_with_progress<F>(
    content: &str,
    document_path: &str,
    options: &LoadOptions,
    mut progress: F,
) -> LoadResult<SceneGraph>
where
    F: FnMut(LoadPhase, &str, f32),
{
    progress(LoadPhase::Parsing, document_path, 0.0);

    let parser = DocumentParser::new(document_path, options.crease_angle_degrees.to_radians());
    let ParsedDocument {
        mut graph,
        scene,
        asset,
    } = parser.parse(content)?;

    match scene {
        Some(scene) if options.normalize => {
            normalize(&mut graph, scene, asset.meter, asset.up_axis, options.target_units_per_meter);
        }
        Some(scene) => {
            let root = graph.root();
            graph.add_child(root, scene);
        }
        None => log::warn!("{} does not instantiate a visual scene", document_path),
    }

    log::info!(
        "Loaded {}: {} shapes, {} appearances",
        document_path,
        graph.shape_count(),
        graph.appearance_count()
    );

    progress(LoadPhase::Complete, document_path, 1.0);
    Ok(graph)
}

/// Load a document, replacing any error with an empty graph.
///
/// A document that cannot be read completely yields only the root group,
/// never a partially built scene.
pub fn load_dae_or_empty(content: &str, document_path: &str, options: &LoadOptions) -> SceneGraph {
    match load_dae_from_str(content, document_path, options) {
        Ok(graph) => graph,
        Err(err) => {
            log::error!("Failed to load {}: {}", document_path, err);
            SceneGraph::new(document_path)
        }
    }
}
