//! Typed mirror of the glTF JSON document.
//!
//! The loader consumes an already-parsed `serde_json::Value` tree; this
//! module maps it onto plain structs. Every cross-reference (buffer,
//! bufferView, accessor, mesh, node, material, technique, shader) stays a
//! string id resolved against the maps below.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Numeric component-type tags. The 4-byte integer codes are accepted by the
/// decoder with a fixed 4-byte size.
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ComponentType {
    SignedByte = 5120,
    UnsignedByte = 5121,
    SignedShort = 5122,
    UnsignedShort = 5123,
    SignedInt = 5124,
    UnsignedInt = 5125,
    Float = 5126,
}

impl ComponentType {
    /// Size in bytes of one component.
    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::SignedByte | ComponentType::UnsignedByte => 1,
            ComponentType::SignedShort | ComponentType::UnsignedShort => 2,
            ComponentType::SignedInt | ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorType {
    #[serde(rename = "SCALAR")]
    Scalar,
    #[serde(rename = "VEC2")]
    Vec2,
    #[serde(rename = "VEC3")]
    Vec3,
    #[serde(rename = "VEC4")]
    Vec4,
    #[serde(rename = "MAT2")]
    Mat2,
    #[serde(rename = "MAT3")]
    Mat3,
    #[serde(rename = "MAT4")]
    Mat4,
}

impl AccessorType {
    /// Components per element (matrices count flattened).
    pub fn component_count(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 => 4,
            AccessorType::Mat2 => 4,
            AccessorType::Mat3 => 9,
            AccessorType::Mat4 => 16,
        }
    }
}

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DrawMode {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    Triangles = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
}

impl Default for DrawMode {
    fn default() -> Self {
        DrawMode::Triangles
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AccessorDesc {
    #[serde(rename = "bufferView")]
    pub buffer_view: String,
    #[serde(rename = "byteOffset", default)]
    pub byte_offset: usize,
    /// 0 means tightly packed; the effective stride is computed from the
    /// element size.
    #[serde(rename = "byteStride", default)]
    pub byte_stride: usize,
    #[serde(rename = "componentType")]
    pub component_type: ComponentType,
    #[serde(rename = "type")]
    pub accessor_type: AccessorType,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BufferViewDesc {
    pub buffer: String,
    #[serde(rename = "byteOffset", default)]
    pub byte_offset: usize,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BufferDesc {
    pub uri: String,
    #[serde(rename = "byteLength")]
    pub byte_length: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PrimitiveDesc {
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub indices: Option<String>,
    pub material: Option<String>,
    #[serde(default)]
    pub mode: DrawMode,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MeshDesc {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<PrimitiveDesc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NodeDesc {
    pub matrix: Option<[f32; 16]>,
    pub translation: Option<[f32; 3]>,
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub meshes: Vec<String>,
}

impl NodeDesc {
    pub fn has_trs(&self) -> bool {
        self.translation.is_some() || self.rotation.is_some() || self.scale.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SceneDesc {
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MaterialDesc {
    pub name: Option<String>,
    pub technique: Option<String>,
    #[serde(default)]
    pub values: HashMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ImageDesc {
    pub uri: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProgramDesc {
    #[serde(rename = "vertexShader")]
    pub vertex_shader: String,
    #[serde(rename = "fragmentShader")]
    pub fragment_shader: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ShaderDesc {
    pub uri: String,
    #[serde(rename = "type")]
    pub stage: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Document {
    pub scene: Option<String>,
    #[serde(default)]
    pub scenes: HashMap<String, SceneDesc>,
    #[serde(default)]
    pub nodes: HashMap<String, NodeDesc>,
    #[serde(default)]
    pub meshes: HashMap<String, MeshDesc>,
    #[serde(default)]
    pub accessors: HashMap<String, AccessorDesc>,
    #[serde(rename = "bufferViews", default)]
    pub buffer_views: HashMap<String, BufferViewDesc>,
    #[serde(default)]
    pub buffers: HashMap<String, BufferDesc>,
    #[serde(default)]
    pub materials: HashMap<String, MaterialDesc>,
    /// Technique bodies are kept as raw mappings; the loader only resolves
    /// references into this map.
    #[serde(default)]
    pub techniques: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub images: HashMap<String, ImageDesc>,
    #[serde(default)]
    pub programs: HashMap<String, ProgramDesc>,
    #[serde(default)]
    pub shaders: HashMap<String, ShaderDesc>,
}
