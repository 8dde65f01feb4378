//! Centering, unit scale and up-axis correction of the selected scene.

use dae_math::{Mat4, Vec3};

use super::types::UpAxis;
use crate::scene::{NodeId, SceneGraph};

/// Rewrite the transform of `scene_root` and attach it under the graph root.
///
/// The result is `axis * scale * center * local`: the scene's bounds are
/// centered on the origin, document meters become `units_per_meter` units,
/// and `up_axis` is rotated onto +Y.
pub fn normalize(graph: &mut SceneGraph, scene_root: NodeId, meter: f32, up_axis: UpAxis, units_per_meter: f32) {
    let bounds = graph.world_bounds(scene_root);
    if !bounds.is_empty() {
        let center = bounds.centroid();
        graph.premultiply_transform(scene_root, Mat4::from_translation(-center));
        log::debug!("Centered scene bounds {:?}", bounds);
    }

    let scale = meter * units_per_meter;
    graph.premultiply_transform(scene_root, Mat4::from_scale(Vec3::splat(scale)));
    graph.premultiply_transform(scene_root, up_axis.correction());
    log::debug!("Normalized scene with scale {} and up axis {:?}", scale, up_axis);

    let root = graph.root();
    graph.add_child(root, scene_root);
}
