//! Streaming COLLADA reader.
//!
//! Reads the document once as open/text/close events and routes each event
//! to the component that owns it: numeric text to the accumulator, mesh
//! content to the [`GeometryDecoder`], effects to the [`EffectBuilder`], the
//! node hierarchy to the [`SceneAssembler`]. References are queued and
//! resolved after the last event.

use std::collections::HashMap;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::arrays::TextAccumulator;
use super::assembler::SceneAssembler;
use super::decoder::{GeometryDecoder, PrimitiveKind};
use super::deferred::{DeferredQueue, InstanceTarget, PendingBinding};
use super::effects::EffectBuilder;
use super::symbols::{MaterialDef, SymbolTable};
use super::types::{fragment, Input, Semantic, TransformElement, UpAxis};
use crate::scene::{NodeId, SceneGraph};

/// Errors that abort a parse.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Expected <COLLADA> root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("Unsupported COLLADA version '{0}'")]
    UnsupportedVersion(String),

    #[error("Unsupported element <{0}>")]
    UnsupportedElement(String),

    #[error("Unexpected end of document")]
    UnexpectedEof,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Values of the document's root `<asset>`.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetInfo {
    /// Length of one document unit in meters
    pub meter: f32,
    pub up_axis: UpAxis,
    pub authoring_tool: Option<String>,
    /// Set for SketchUp exports older than 7.1
    pub reverse_transparency: bool,
}

impl Default for AssetInfo {
    fn default() -> Self {
        Self {
            meter: 1.0,
            up_axis: UpAxis::Y,
            authoring_tool: None,
            reverse_transparency: false,
        }
    }
}

/// True for SketchUp versions before 7.1, which write `A_ONE` transparency inverted.
pub fn sketchup_reverses_transparency(authoring_tool: &str) -> bool {
    let Some(rest) = authoring_tool.trim().strip_prefix("Google SketchUp") else {
        return false;
    };
    let Some(version) = rest
        .split_whitespace()
        .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
    else {
        return false;
    };
    let mut parts = version.split('.').map(|part| part.parse::<u32>().ok());
    match (parts.next().flatten(), parts.next().flatten()) {
        (Some(major), minor) => major < 7 || (major == 7 && minor.unwrap_or(0) < 1),
        (None, _) => false,
    }
}

/// Resolve an `<init_from>` image reference against the document's location.
///
/// `file://` prefixes and leading `./` are stripped and `%20` is decoded.
/// Absolute paths and other URIs are returned unchanged; relative paths are
/// joined with the document's directory and `..` segments are collapsed.
pub fn resolve_image_path(document_path: &str, uri: &str) -> String {
    let uri = uri.trim();
    let path = uri.strip_prefix("file://").unwrap_or(uri).replace("%20", " ");

    let is_windows_drive = path.len() >= 2 && path.as_bytes()[1] == b':' && path.as_bytes()[0].is_ascii_alphabetic();
    if path.starts_with('/') || path.starts_with('\\') || is_windows_drive || path.contains("://") {
        return path;
    }

    let mut relative = path.as_str();
    while let Some(rest) = relative.strip_prefix("./") {
        relative = rest;
    }

    let directory = match document_path.rfind(['/', '\\']) {
        Some(end) => &document_path[..end],
        None => "",
    };
    let absolute = directory.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in directory.split(['/', '\\']).chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            _ => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Result of reading one document, before normalization.
#[derive(Debug)]
pub struct ParsedDocument {
    pub graph: SceneGraph,
    /// Root of the instantiated visual scene, not yet attached to the graph root
    pub scene: Option<NodeId>,
    pub asset: AssetInfo,
}

/// Attributes of one element keyed by local name.
struct Attributes(HashMap<String, String>);

impl Attributes {
    fn read(element: &BytesStart) -> ParseResult<Self> {
        let mut values = HashMap::new();
        for attr in element.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            values.insert(key, value);
        }
        Ok(Self(values))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn owned(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    /// Local id referenced by a URL attribute.
    fn reference(&self, key: &str) -> Option<String> {
        self.get(key).and_then(fragment).map(str::to_string)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| value.trim().parse().ok())
    }
}

#[derive(Debug)]
struct OpenElement {
    name: String,
    /// Whether opening this element pushed an assembler frame
    pushed_frame: bool,
}

/// Single-pass COLLADA reader producing a [`ParsedDocument`].
pub struct DocumentParser {
    document_path: String,
    graph: SceneGraph,
    symbols: SymbolTable,
    queue: DeferredQueue,
    text: TextAccumulator,
    elements: Vec<OpenElement>,
    asset: AssetInfo,
    decoder: GeometryDecoder,
    assembler: SceneAssembler,
    effect: Option<EffectBuilder>,
    image: Option<String>,
    material: Option<String>,
    controller: Option<String>,
    array: Option<String>,
}

impl DocumentParser {
    /// `crease_angle` (radians) is recorded on batches that carry no normals.
    pub fn new(document_path: &str, crease_angle: f32) -> Self {
        Self {
            document_path: document_path.to_string(),
            graph: SceneGraph::new(document_path),
            symbols: SymbolTable::new(),
            queue: DeferredQueue::new(),
            text: TextAccumulator::new(),
            elements: Vec::new(),
            asset: AssetInfo::default(),
            decoder: GeometryDecoder::new(crease_angle),
            assembler: SceneAssembler::new(),
            effect: None,
            image: None,
            material: None,
            controller: None,
            array: None,
        }
    }

    /// Read `content` to the end and resolve all queued references.
    pub fn parse(mut self, content: &str) -> ParseResult<ParsedDocument> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut seen_root = false;
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    self.start(&e)?;
                    seen_root = true;
                }
                Event::Empty(e) => {
                    self.start(&e)?;
                    self.end();
                    seen_root = true;
                }
                Event::End(_) => self.end(),
                Event::Text(t) => self.text.push(&t.unescape()?),
                Event::CData(c) => self.text.push(&String::from_utf8_lossy(&c.into_inner())),
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root || !self.elements.is_empty() {
            return Err(ParseError::UnexpectedEof);
        }

        log::info!(
            "Read {}: {} geometries, {} effects, {} materials, {} nodes, {} deferred bindings",
            self.document_path,
            self.symbols.geometries.len(),
            self.symbols.effects.len(),
            self.symbols.materials.len(),
            self.symbols.nodes.len(),
            self.queue.len()
        );

        let scene = self.queue.drain(&self.symbols, &mut self.graph);
        Ok(ParsedDocument {
            graph: self.graph,
            scene,
            asset: self.asset,
        })
    }

    fn start(&mut self, element: &BytesStart) -> ParseResult<()> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let attrs = Attributes::read(element)?;

        if self.elements.is_empty() {
            check_root(&name, &attrs)?;
        }

        let parent = self.elements.last().map(|e| e.name.clone()).unwrap_or_default();
        self.text.clear();
        let pushed_frame = self.open(&name, &parent, &attrs)?;
        self.elements.push(OpenElement { name, pushed_frame });
        Ok(())
    }

    fn end(&mut self) {
        let Some(element) = self.elements.pop() else {
            return;
        };
        let parent = self.elements.last().map(|e| e.name.clone()).unwrap_or_default();
        self.close(&element.name, &parent);
        if element.pushed_frame {
            self.assembler.close();
        }
        self.text.clear();
    }

    /// Inside the document's own `<asset>` (not an asset of a library element).
    fn in_root_asset(&self) -> bool {
        self.elements.get(1).is_some_and(|e| e.name == "asset")
    }

    /// Handle an element opening. Returns whether an assembler frame was pushed.
    fn open(&mut self, name: &str, parent: &str, attrs: &Attributes) -> ParseResult<bool> {
        match name {
            "unit" if self.in_root_asset() => {
                if let Some(meter) = attrs.parse::<f32>("meter").filter(|m| *m > 0.0) {
                    self.asset.meter = meter;
                }
            }

            "image" => self.image = attrs.owned("id"),
            "data" if parent == "image" => return Err(ParseError::UnsupportedElement(name.to_string())),

            "effect" => {
                self.effect = attrs
                    .get("id")
                    .map(|id| EffectBuilder::open(id, &mut self.graph, &mut self.symbols));
            }
            "newparam" => {
                if let Some(effect) = &mut self.effect {
                    effect.open_param(attrs.owned("sid"));
                }
            }
            "emission" | "ambient" | "diffuse" | "specular" | "transparent" | "shininess" | "transparency"
            | "reflective" | "reflectivity" | "index_of_refraction" => {
                if let Some(effect) = &mut self.effect {
                    effect.open_slot(name, attrs.get("opaque"));
                }
            }
            "texture" => {
                if let (Some(effect), Some(texture)) = (&mut self.effect, attrs.get("texture")) {
                    effect.set_texture(texture);
                }
            }
            _ if name.starts_with("profile_") => {
                if let Some(effect) = &mut self.effect {
                    effect.open_profile(name);
                }
            }

            "material" => {
                self.material = attrs.owned("id");
                if let Some(id) = &self.material {
                    let definition = MaterialDef {
                        name: attrs.owned("name"),
                        effect: None,
                    };
                    self.symbols.materials.insert(id.clone(), definition);
                }
            }
            "instance_effect" if parent == "material" => {
                if let Some(definition) = self.material.as_deref().and_then(|id| self.symbols.materials.get_mut(id)) {
                    definition.effect = attrs.reference("url");
                }
            }

            "geometry" => self.decoder.open_geometry(attrs.owned("id")),
            "source" if parent == "mesh" => self.decoder.open_source(attrs.owned("id")),
            "float_array" | "int_array" => self.array = attrs.owned("id"),
            "accessor" if parent == "technique_common" => {
                let source = attrs.get("source").map(|s| s.trim_start_matches('#').to_string());
                let stride = attrs.parse::<usize>("stride").unwrap_or(1);
                self.decoder.set_accessor(source, stride, attrs.parse::<usize>("count"));
            }
            "vertices" => self.decoder.open_vertices(attrs.owned("id")),
            "input" if parent == "vertices" || PrimitiveKind::from_element(parent).is_some() => {
                if let Some(source) = attrs.get("source") {
                    self.decoder.add_input(Input {
                        semantic: Semantic::parse(attrs.get("semantic").unwrap_or_default()),
                        source: source.trim_start_matches('#').to_string(),
                        offset: attrs.parse::<usize>("offset").unwrap_or(0),
                    });
                }
            }
            "ph" => self.decoder.open_polygon_with_holes(),
            _ if parent == "mesh" && PrimitiveKind::from_element(name).is_some() => {
                if let Some(kind) = PrimitiveKind::from_element(name) {
                    self.decoder.open_primitive(kind, attrs.owned("material"));
                }
            }

            "controller" => self.controller = attrs.owned("id"),
            "skin" | "morph" if parent == "controller" => {
                if let (Some(controller), Some(source)) = (&self.controller, attrs.reference("source")) {
                    self.symbols.controllers.insert(controller.clone(), source);
                }
            }

            "visual_scene" => {
                self.assembler
                    .open_visual_scene(attrs.get("id"), attrs.owned("name"), &mut self.graph, &mut self.symbols);
                return Ok(true);
            }
            "node" => {
                self.assembler
                    .open_node(attrs.get("id"), attrs.owned("name"), &mut self.graph, &mut self.symbols);
                return Ok(true);
            }
            "instance_geometry" | "instance_controller" if self.assembler.current().is_some() => {
                let node_name = self.assembler.current_name();
                let placeholder = self.assembler.open_instance(&mut self.graph);
                if let Some(url) = attrs.reference("url") {
                    let target = if name == "instance_geometry" {
                        InstanceTarget::Geometry(url)
                    } else {
                        InstanceTarget::Controller(url)
                    };
                    self.queue.push(PendingBinding::ShapeInstantiation {
                        placeholder,
                        target,
                        node_name,
                    });
                }
                return Ok(true);
            }
            "instance_node" => {
                if let (Some(parent), Some(node)) = (self.assembler.current(), attrs.reference("url")) {
                    self.queue.push(PendingBinding::NodeLink { parent, node });
                }
            }
            "instance_material" => {
                if let (Some(group), Some(symbol), Some(material)) =
                    (self.assembler.current(), attrs.owned("symbol"), attrs.reference("target"))
                {
                    self.queue.push(PendingBinding::MaterialBinding {
                        group,
                        symbol,
                        material,
                    });
                }
            }
            "instance_visual_scene" => {
                if let Some(scene) = attrs.reference("url") {
                    self.queue.push(PendingBinding::SceneSelection { scene });
                }
            }

            _ => {}
        }
        Ok(false)
    }

    fn close(&mut self, name: &str, parent: &str) {
        match name {
            "up_axis" if self.in_root_asset() => match UpAxis::parse(self.text.text()) {
                Some(axis) => self.asset.up_axis = axis,
                None => log::warn!("Unknown up axis '{}'", self.text.text()),
            },
            "authoring_tool" if self.in_root_asset() => {
                let tool = self.text.text().to_string();
                if sketchup_reverses_transparency(&tool) {
                    log::info!("'{}' writes inverted transparency, reversing A_ONE", tool);
                    self.asset.reverse_transparency = true;
                }
                self.asset.authoring_tool = Some(tool);
            }

            "init_from" if parent == "image" => {
                if let Some(id) = &self.image {
                    let path = resolve_image_path(&self.document_path, self.text.text());
                    self.symbols.images.insert(id.clone(), path);
                }
            }
            "init_from" if parent == "surface" => {
                if let Some(effect) = &self.effect {
                    effect.set_surface_image(self.text.text(), &mut self.symbols);
                }
            }
            "source" if parent == "sampler2D" => {
                if let Some(effect) = &self.effect {
                    effect.set_sampler_surface(self.text.text(), &mut self.symbols);
                }
            }
            "image" => self.image = None,

            "color" => {
                if let Some(effect) = &mut self.effect {
                    effect.set_color(&self.text.floats());
                }
            }
            "float" => {
                if let (Some(effect), Some(&value)) = (&mut self.effect, self.text.floats().first()) {
                    effect.set_float(value);
                }
            }
            "double_sided" => {
                if let Some(effect) = &mut self.effect {
                    effect.set_double_sided(self.text.text());
                }
            }
            "emission" | "ambient" | "diffuse" | "specular" | "transparent" | "shininess" | "transparency"
            | "reflective" | "reflectivity" | "index_of_refraction" => {
                if let Some(effect) = &mut self.effect {
                    effect.close_slot();
                }
            }
            "newparam" => {
                if let Some(effect) = &mut self.effect {
                    effect.close_param();
                }
            }
            _ if name.starts_with("profile_") => {
                if let Some(effect) = &mut self.effect {
                    effect.close_profile();
                }
            }
            "effect" => {
                if let Some(effect) = self.effect.take() {
                    effect.finish(
                        self.asset.reverse_transparency,
                        &mut self.graph,
                        &self.symbols,
                        &mut self.queue,
                    );
                }
            }
            "material" => self.material = None,

            "float_array" | "int_array" => {
                if let Some(id) = self.array.take() {
                    self.symbols.arrays.insert(id, self.text.floats());
                }
            }
            "source" if parent == "mesh" => self.decoder.close_source(&mut self.symbols),
            "vertices" => self.decoder.close_vertices(&mut self.symbols),
            "p" => self.decoder.push_indices(self.text.ints()),
            "h" => self.decoder.push_hole(self.text.ints()),
            "vcount" => self.decoder.set_vcount(self.text.ints()),
            "ph" => self.decoder.close_polygon_with_holes(),
            _ if parent == "mesh" && PrimitiveKind::from_element(name).is_some() => {
                self.decoder.close_primitive(&self.symbols);
            }
            "geometry" => self.decoder.close_geometry(&mut self.symbols),
            "controller" => self.controller = None,

            "matrix" | "rotate" | "scale" | "translate" | "lookat" if parent == "node" => {
                match TransformElement::from_values(name, &self.text.floats()) {
                    Some(transform) => self.assembler.apply_transform(&transform, &mut self.graph),
                    None => log::warn!("Ignoring malformed <{}>", name),
                }
            }

            _ => {}
        }
    }
}

fn check_root(name: &str, attrs: &Attributes) -> ParseResult<()> {
    if name != "COLLADA" {
        return Err(ParseError::UnexpectedRoot(name.to_string()));
    }
    let version = attrs.get("version").unwrap_or_default();
    if !version.starts_with("1.4") {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }
    Ok(())
}
