//! Inspect a COLLADA file: load it and print what the scene graph holds.
//!
//! Run with: cargo run --bin dae_inspect -- <path.dae> [--json] [--no-normalize] [--options file.json]

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use dae_core::collada::{load_dae_from_str, LoadOptions};
use dae_core::{Mesh, SceneGraph};
use dae_math::Aabb;

#[derive(Debug, Default, PartialEq)]
struct Args {
    path: PathBuf,
    options: Option<PathBuf>,
    no_normalize: bool,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut path = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => parsed.json = true,
            "--no-normalize" => parsed.no_normalize = true,
            "--options" => {
                let file = iter.next().context("--options needs a file")?;
                parsed.options = Some(PathBuf::from(file));
            }
            flag if flag.starts_with("--") => bail!("Unknown flag {}", flag),
            _ => path = Some(PathBuf::from(arg)),
        }
    }
    parsed.path = path.context("Usage: dae_inspect <path.dae> [--json] [--no-normalize] [--options file.json]")?;
    Ok(parsed)
}

#[derive(Debug, Serialize)]
struct ShapeSummary {
    name: Option<String>,
    topology: String,
    vertices: usize,
    triangles: usize,
    has_normals: bool,
    has_tex_coords: bool,
    material: Option<String>,
}

#[derive(Debug, Serialize)]
struct AppearanceSummary {
    name: Option<String>,
    diffuse: [f32; 3],
    transparency: f32,
    texture: Option<String>,
    double_sided: bool,
}

#[derive(Debug, Serialize)]
struct SceneSummary {
    name: String,
    nodes: usize,
    shapes: usize,
    shared_groups: usize,
    triangles: usize,
    bounds_min: Option<[f32; 3]>,
    bounds_max: Option<[f32; 3]>,
    shape_list: Vec<ShapeSummary>,
    appearances: Vec<AppearanceSummary>,
}

fn summarize(graph: &SceneGraph) -> SceneSummary {
    let mut shape_list = Vec::new();
    graph.for_each_shape(graph.root(), |id, shape, _| {
        let triangles = Mesh::from_primitive(&shape.geometry).map_or(0, |mesh| mesh.triangle_count());
        shape_list.push(ShapeSummary {
            name: graph.name(id).map(str::to_string),
            topology: format!("{:?}", shape.geometry.topology),
            vertices: shape.geometry.index_count(),
            triangles,
            has_normals: shape.geometry.has_normals(),
            has_tex_coords: shape.geometry.has_tex_coords(),
            material: graph.shape_appearance(id).and_then(|a| a.name.clone()),
        });
    });

    let appearances = graph
        .appearances()
        .iter()
        .map(|a| AppearanceSummary {
            name: a.name.clone(),
            diffuse: a.diffuse_color.to_array(),
            transparency: a.transparency,
            texture: a.diffuse_texture.clone(),
            double_sided: a.double_sided,
        })
        .collect();

    let bounds: Aabb = graph.world_bounds(graph.root());
    let (bounds_min, bounds_max) = if bounds.is_empty() {
        (None, None)
    } else {
        (Some(bounds.min().to_array()), Some(bounds.max().to_array()))
    };

    SceneSummary {
        name: graph.name.clone(),
        nodes: graph.node_count(),
        shapes: shape_list.len(),
        shared_groups: graph.shared_group_count(),
        triangles: shape_list.iter().map(|s| s.triangles).sum(),
        bounds_min,
        bounds_max,
        shape_list,
        appearances,
    }
}

fn print_summary(summary: &SceneSummary) {
    println!("\n=== Scene: {} ===", summary.name);
    println!("Nodes: {}", summary.nodes);
    println!("Shapes: {}", summary.shapes);
    println!("Shared groups: {}", summary.shared_groups);
    println!("Total triangles: {}", summary.triangles);

    println!("\n--- Shapes ---");
    for (i, shape) in summary.shape_list.iter().enumerate() {
        println!(
            "  [{}] {} - {} {} vertices, {} triangles",
            i,
            shape.name.as_deref().unwrap_or("<unnamed>"),
            shape.vertices,
            shape.topology,
            shape.triangles
        );
        println!(
            "       Normals: {}, UVs: {}, Material: {}",
            shape.has_normals,
            shape.has_tex_coords,
            shape.material.as_deref().unwrap_or("-")
        );
    }

    println!("\n--- Appearances ---");
    for (i, appearance) in summary.appearances.iter().enumerate() {
        let [r, g, b] = appearance.diffuse;
        println!(
            "  [{}] {} diffuse ({:.2}, {:.2}, {:.2}) transparency {:.2}{}",
            i,
            appearance.name.as_deref().unwrap_or("<unbound>"),
            r,
            g,
            b,
            appearance.transparency,
            if appearance.double_sided { " double-sided" } else { "" }
        );
        if let Some(texture) = &appearance.texture {
            println!("       Texture: {}", texture);
        }
    }

    println!("\n--- World Bounds ---");
    match (summary.bounds_min, summary.bounds_max) {
        (Some(min), Some(max)) => {
            println!("  Min: ({:.2}, {:.2}, {:.2})", min[0], min[1], min[2]);
            println!("  Max: ({:.2}, {:.2}, {:.2})", max[0], max[1], max[2]);
        }
        _ => println!("  (empty)"),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&args)?;

    let mut options = match &args.options {
        Some(file) => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read options {}", file.display()))?;
            serde_json::from_str::<LoadOptions>(&text)
                .with_context(|| format!("Invalid options in {}", file.display()))?
        }
        None => LoadOptions::default(),
    };
    if args.no_normalize {
        options.normalize = false;
    }

    let content = std::fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let document_path = args.path.to_string_lossy();
    log::info!("Loading {}", document_path);

    let graph = load_dae_from_str(&content, &document_path, &options)
        .with_context(|| format!("Failed to load {}", document_path))?;

    let summary = summarize(&graph);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(&strings(&["--json", "house.dae", "--options", "opts.json"])).unwrap();
        assert_eq!(
            args,
            Args {
                path: PathBuf::from("house.dae"),
                options: Some(PathBuf::from("opts.json")),
                no_normalize: false,
                json: true,
            }
        );

        assert!(parse_args(&strings(&["--json"])).is_err());
        assert!(parse_args(&strings(&["house.dae", "--options"])).is_err());
        assert!(parse_args(&strings(&["house.dae", "--verbose"])).is_err());
    }

    #[test]
    fn test_summarize() {
        let content = r##"<COLLADA version="1.4.1">
  <library_geometries>
    <geometry id="quad">
      <mesh>
        <source id="quad-pos">
          <float_array id="quad-pos-array" count="12">0 0 0 1 0 0 1 1 0 0 1 0</float_array>
          <technique_common><accessor source="#quad-pos-array" count="4" stride="3"/></technique_common>
        </source>
        <vertices id="quad-verts"><input semantic="POSITION" source="#quad-pos"/></vertices>
        <polylist count="1">
          <input semantic="VERTEX" source="#quad-verts" offset="0"/>
          <vcount>4</vcount>
          <p>0 1 2 3</p>
        </polylist>
      </mesh>
    </geometry>
  </library_geometries>
  <library_visual_scenes>
    <visual_scene id="scene"><node name="Quad"><instance_geometry url="#quad"/></node></visual_scene>
  </library_visual_scenes>
  <scene><instance_visual_scene url="#scene"/></scene>
</COLLADA>"##;
        let options = LoadOptions {
            normalize: false,
            ..Default::default()
        };
        let graph = load_dae_from_str(content, "quad.dae", &options).unwrap();
        let summary = summarize(&graph);

        assert_eq!(summary.shapes, 1);
        assert_eq!(summary.triangles, 2);
        assert_eq!(summary.shape_list[0].name.as_deref(), Some("Quad"));
        assert_eq!(summary.shape_list[0].topology, "Polygons");
        assert_eq!(summary.bounds_max, Some([1.0, 1.0, 0.0]));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["shapes"], 1);
    }
}
