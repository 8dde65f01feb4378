//! `profile_COMMON` effects.
//!
//! The appearance of an effect is created when `<effect>` opens so that
//! materials and bindings can refer to it before it is complete. Colors and
//! scalars are collected while the effect is open and written on close.

use dae_math::{Vec3, Vec4};

use super::deferred::{DeferredQueue, PendingBinding};
use super::symbols::SymbolTable;
use super::types::OpaqueMode;
use crate::scene::{Appearance, AppearanceId, SceneGraph};

/// Rec. 709 luminance weights.
const LUMINANCE: Vec3 = Vec3::new(0.212671, 0.715160, 0.072169);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColorSlot {
    Emission,
    Ambient,
    Diffuse,
    Specular,
    Transparent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FloatSlot {
    Shininess,
    Transparency,
}

/// Transparency (0 = opaque) for an opacity mode, `<transparent>` color and
/// `<transparency>` factor.
///
/// `reverse` flips `A_ONE` only. It is set for Google SketchUp before 7.1,
/// which writes the alpha as transparency: alpha 0.3 gives 0.3 when reversed
/// (SketchUp 7.0) and 0.7 otherwise (SketchUp 7.1 and every other tool).
pub fn compute_transparency(mode: OpaqueMode, color: Option<Vec4>, factor: Option<f32>, reverse: bool) -> f32 {
    let t = factor.unwrap_or(1.0);
    let (mode, color) = match color {
        Some(color) => (mode, color),
        None => (OpaqueMode::AOne, Vec4::ONE),
    };
    let luminance = color.truncate().dot(LUMINANCE);
    let value = match mode {
        OpaqueMode::AOne if reverse => color.w * t,
        OpaqueMode::AOne => 1.0 - color.w * t,
        OpaqueMode::AZero => color.w * t,
        OpaqueMode::RgbZero => t * luminance,
        OpaqueMode::RgbOne => 1.0 - t * luminance,
    };
    value.clamp(0.0, 1.0)
}

/// State of the `<effect>` currently open.
#[derive(Debug)]
pub struct EffectBuilder {
    id: String,
    appearance: AppearanceId,
    param: Option<String>,
    in_profile_common: bool,
    color_slot: Option<ColorSlot>,
    float_slot: Option<FloatSlot>,

    emission: Option<Vec3>,
    ambient: Option<Vec3>,
    diffuse: Option<Vec3>,
    specular: Option<Vec3>,
    transparent: Option<Vec4>,
    opaque: OpaqueMode,
    transparency: Option<f32>,
    shininess: Option<f32>,
    texture: Option<String>,
    double_sided: bool,
}

impl EffectBuilder {
    /// Create the appearance for effect `id` and register it.
    pub fn open(id: &str, graph: &mut SceneGraph, symbols: &mut SymbolTable) -> Self {
        let appearance = graph.add_appearance(Appearance::default());
        symbols.effects.insert(id, appearance);
        Self {
            id: id.to_string(),
            appearance,
            param: None,
            in_profile_common: false,
            color_slot: None,
            float_slot: None,
            emission: None,
            ambient: None,
            diffuse: None,
            specular: None,
            transparent: None,
            opaque: OpaqueMode::default(),
            transparency: None,
            shininess: None,
            texture: None,
            double_sided: false,
        }
    }

    pub fn open_param(&mut self, sid: Option<String>) {
        self.param = sid;
    }

    pub fn close_param(&mut self) {
        self.param = None;
    }

    /// `<init_from>` of a `<surface>` parameter.
    pub fn set_surface_image(&self, image: &str, symbols: &mut SymbolTable) {
        if let Some(sid) = &self.param {
            symbols.surfaces.insert(sid.clone(), image.to_string());
        }
    }

    /// `<source>` of a `<sampler2D>` parameter.
    pub fn set_sampler_surface(&self, surface: &str, symbols: &mut SymbolTable) {
        if let Some(sid) = &self.param {
            symbols.samplers.insert(sid.clone(), surface.to_string());
        }
    }

    /// Track `profile_*` elements; only `profile_COMMON` contributes parameters.
    pub fn open_profile(&mut self, element: &str) {
        self.in_profile_common = element == "profile_COMMON";
        if !self.in_profile_common {
            log::debug!("Ignoring {} in effect '{}'", element, self.id);
        }
    }

    pub fn close_profile(&mut self) {
        self.in_profile_common = false;
    }

    /// Open a shading parameter element (`diffuse`, `shininess`, ...).
    pub fn open_slot(&mut self, element: &str, opaque: Option<&str>) {
        if !self.in_profile_common {
            return;
        }
        self.color_slot = match element {
            "emission" => Some(ColorSlot::Emission),
            "ambient" => Some(ColorSlot::Ambient),
            "diffuse" => Some(ColorSlot::Diffuse),
            "specular" => Some(ColorSlot::Specular),
            "transparent" => {
                self.opaque = opaque.and_then(OpaqueMode::parse).unwrap_or_default();
                Some(ColorSlot::Transparent)
            }
            _ => None,
        };
        self.float_slot = match element {
            "shininess" => Some(FloatSlot::Shininess),
            "transparency" => Some(FloatSlot::Transparency),
            _ => None,
        };
    }

    pub fn close_slot(&mut self) {
        self.color_slot = None;
        self.float_slot = None;
    }

    /// Content of a `<color>`.
    pub fn set_color(&mut self, values: &[f32]) {
        if values.len() < 3 {
            return;
        }
        let alpha = values.get(3).copied().unwrap_or(1.0);
        let color = Vec4::new(values[0], values[1], values[2], alpha);
        match self.color_slot {
            Some(ColorSlot::Emission) => self.emission = Some(color.truncate()),
            Some(ColorSlot::Ambient) => self.ambient = Some(color.truncate()),
            Some(ColorSlot::Diffuse) => self.diffuse = Some(color.truncate()),
            Some(ColorSlot::Specular) => self.specular = Some(color.truncate()),
            Some(ColorSlot::Transparent) => self.transparent = Some(color),
            None => {}
        }
    }

    /// Content of a `<float>`.
    pub fn set_float(&mut self, value: f32) {
        match self.float_slot {
            Some(FloatSlot::Shininess) => self.shininess = Some(value),
            Some(FloatSlot::Transparency) => self.transparency = Some(value),
            None => {}
        }
    }

    /// `<texture texture="..">`; only a diffuse texture is kept.
    pub fn set_texture(&mut self, texture: &str) {
        if self.color_slot == Some(ColorSlot::Diffuse) {
            self.texture = Some(texture.to_string());
        }
    }

    /// Content of a `<double_sided>` extra.
    pub fn set_double_sided(&mut self, text: &str) {
        self.double_sided = !matches!(text.trim(), "" | "0" | "false");
    }

    /// Write the collected parameters into the appearance and queue the
    /// texture lookup.
    pub fn finish(
        self,
        reverse_transparency: bool,
        graph: &mut SceneGraph,
        symbols: &SymbolTable,
        queue: &mut DeferredQueue,
    ) {
        let transparency = compute_transparency(
            self.opaque,
            self.transparent,
            self.transparency,
            reverse_transparency,
        );

        if let Some(appearance) = graph.appearance_mut(self.appearance) {
            appearance.emissive_color = self.emission.unwrap_or(Vec3::ZERO);
            appearance.ambient_color = self.ambient.unwrap_or(Vec3::ZERO);
            appearance.diffuse_color = self.diffuse.unwrap_or(Vec3::ONE);
            appearance.specular_color = self.specular.unwrap_or(Vec3::ZERO);
            appearance.shininess = self.shininess.unwrap_or(1.0);
            appearance.transparency = transparency;
            appearance.double_sided = self.double_sided;
        }

        if let Some(texture) = &self.texture {
            let image = symbols.resolve_texture(texture);
            queue.push(PendingBinding::EffectBinding {
                appearance: self.appearance,
                image,
            });
        }
    }
}
