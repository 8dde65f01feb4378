//! Small COLLADA value types shared by the parser components.

use dae_math::{Mat4, Mat4Ext, Vec3};

/// Axis the document considers "up".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

impl UpAxis {
    /// Parse `X_UP`, `Y_UP` or `Z_UP`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "X_UP" => Some(UpAxis::X),
            "Y_UP" => Some(UpAxis::Y),
            "Z_UP" => Some(UpAxis::Z),
            _ => None,
        }
    }

    /// Rotation bringing this axis onto +Y.
    pub fn correction(&self) -> Mat4 {
        match self {
            UpAxis::Y => Mat4::IDENTITY,
            UpAxis::Z => Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            UpAxis::X => Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2),
        }
    }
}

/// How a `<transparent>` color encodes opacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpaqueMode {
    #[default]
    AOne,
    AZero,
    RgbZero,
    RgbOne,
}

impl OpaqueMode {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "A_ONE" => Some(OpaqueMode::AOne),
            "A_ZERO" => Some(OpaqueMode::AZero),
            "RGB_ZERO" => Some(OpaqueMode::RgbZero),
            "RGB_ONE" => Some(OpaqueMode::RgbOne),
            _ => None,
        }
    }
}

/// Semantic of an `<input>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Semantic {
    Vertex,
    Position,
    Normal,
    TexCoord,
    Other,
}

impl Semantic {
    pub fn parse(text: &str) -> Self {
        match text {
            "VERTEX" => Semantic::Vertex,
            "POSITION" => Semantic::Position,
            "NORMAL" => Semantic::Normal,
            "TEXCOORD" => Semantic::TexCoord,
            _ => Semantic::Other,
        }
    }
}

/// An `<input semantic=".." source="#id" offset="n">`.
#[derive(Clone, Debug, PartialEq)]
pub struct Input {
    pub semantic: Semantic,
    /// Source or vertices id, without the leading `#`
    pub source: String,
    pub offset: usize,
}

/// One transform child of a `<node>`.
#[derive(Clone, Debug)]
pub enum TransformElement {
    /// 16 values, row-major
    Matrix(Mat4),
    /// Axis and angle in degrees
    Rotate(Vec3, f32),
    Scale(Vec3),
    Translate(Vec3),
    LookAt { eye: Vec3, target: Vec3, up: Vec3 },
}

impl TransformElement {
    /// Build a transform from an element name and its numeric content.
    /// Returns `None` for unknown names or too few values.
    pub fn from_values(element: &str, values: &[f32]) -> Option<Self> {
        let vec3 = |i: usize| Vec3::new(values[i], values[i + 1], values[i + 2]);
        match element {
            "matrix" if values.len() >= 16 => {
                let mut array = [0.0; 16];
                array.copy_from_slice(&values[..16]);
                Some(TransformElement::Matrix(Mat4::from_cols_array(&array).transpose()))
            }
            "rotate" if values.len() >= 4 => Some(TransformElement::Rotate(vec3(0), values[3])),
            "scale" if values.len() >= 3 => Some(TransformElement::Scale(vec3(0))),
            "translate" if values.len() >= 3 => Some(TransformElement::Translate(vec3(0))),
            "lookat" if values.len() >= 9 => Some(TransformElement::LookAt {
                eye: vec3(0),
                target: vec3(3),
                up: vec3(6),
            }),
            _ => None,
        }
    }

    /// Convert this element to a transformation matrix.
    pub fn to_matrix(&self) -> Mat4 {
        match self {
            TransformElement::Matrix(m) => *m,
            TransformElement::Rotate(axis, degrees) => Mat4::from_axis_angle_degrees(*axis, *degrees),
            TransformElement::Scale(s) => Mat4::from_scale(*s),
            TransformElement::Translate(t) => Mat4::from_translation(*t),
            TransformElement::LookAt { eye, target, up } => {
                if (*target - *eye).length_squared() == 0.0 || up.length_squared() == 0.0 {
                    return Mat4::IDENTITY;
                }
                Mat4::look_at_rh(*eye, *target, *up).inverse()
            }
        }
    }
}

/// Id referenced by a local URI fragment (`#id`). External URIs yield `None`.
pub fn fragment(url: &str) -> Option<&str> {
    url.strip_prefix('#').filter(|id| !id.is_empty())
}
