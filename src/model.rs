//! The decoded scene model a load produces.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;

use crate::buffer::TypedView;
use crate::document::{ComponentType, Document, DrawMode};

/// Layout of one vertex attribute inside the shared interleaved vertex view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Components per element: 1/2/3/4 for scalars and vectors, 4/9/16 for
    /// matrices.
    pub arity: usize,
    pub component_type: ComponentType,
    /// Effective stride in bytes; a tight stride is computed when the
    /// accessor declared 0.
    pub byte_stride: usize,
    pub byte_offset: usize,
}

/// One drawable unit: geometry views plus material/technique references and
/// the world transform accumulated at its point of occurrence.
pub struct Primitive {
    pub mode: DrawMode,
    pub transform: Mat4,
    /// Decoded index components; carries its own component type tag.
    pub indices: Option<TypedView>,
    /// The whole interleaved vertex view decoded as one flat typed span,
    /// shared by every attribute below. `None` until the backing buffer has
    /// arrived.
    pub vertices: Option<TypedView>,
    pub attributes: HashMap<String, Attribute>,
    pub material: String,
    pub technique: Option<String>,
}

/// One occurrence of a mesh in the scene graph. Two nodes referencing the
/// same mesh id produce two instances with their own transforms; the decoded
/// geometry bytes are still shared through the cache.
pub struct MeshInstance {
    pub mesh_id: String,
    pub primitives: Vec<Primitive>,
}

#[derive(Default)]
pub struct Scene {
    /// Mesh instances in document traversal order.
    pub meshes: Vec<MeshInstance>,
}

/// Vertex and fragment shader text of one linked program. Compiling them is
/// the consumer's business.
pub struct ProgramSources {
    pub vertex: String,
    pub fragment: String,
}

/// The fully populated result handed out exactly once per load.
#[derive(Default)]
pub struct Model {
    pub document: Arc<Document>,
    pub default_scene: Option<String>,
    pub scenes: HashMap<String, Scene>,
    /// Accumulated world transform per node id, as composed during the walk.
    pub node_transforms: HashMap<String, Mat4>,
    pub images: HashMap<String, image::DynamicImage>,
    pub shaders: HashMap<String, String>,
    pub programs: HashMap<String, ProgramSources>,
}
