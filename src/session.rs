//! Per-load session: document walk, accessor resolution, and completion
//! tracking.
//!
//! One [`LoadSession`] exists per `load` call and is never reused. Parsing
//! runs synchronously in [`LoadSession::begin`]; binary dependencies are
//! resolved through the [`BufferCache`], deferring whatever is not resident
//! yet. Responses are consumed strictly one at a time through
//! [`LoadSession::deliver`], so nothing here needs locking. The load outcome
//! is produced exactly once, when the resource counters balance, parsing is
//! done, and every deferred decode has settled.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use glam::{Mat4, Quat, Vec3};

use crate::buffer::{BufferView, TypedView};
use crate::cache::{BufferCache, DecodeTask, PrimitiveSlot, Resolution};
use crate::document::{BufferViewDesc, ComponentType, Document, NodeDesc};
use crate::error::{Error, Result};
use crate::fetch::{FetchFailure, FetchRequest, FetchResponse, ResourceKind};
use crate::model::{Attribute, MeshInstance, Model, Primitive, ProgramSources, Scene};

/// Requested/settled counter pairs plus the parse flag. `check_complete`
/// consults this after every increment anywhere in the session.
#[derive(Debug, Default)]
struct Progress {
    buffers_requested: usize,
    buffers_settled: usize,
    images_requested: usize,
    images_settled: usize,
    shaders_requested: usize,
    shaders_settled: usize,
    tasks_deferred: usize,
    tasks_settled: usize,
    parse_done: bool,
}

impl Progress {
    fn resources_settled(&self) -> bool {
        self.buffers_requested == self.buffers_settled
            && self.images_requested == self.images_settled
            && self.shaders_requested == self.shaders_settled
    }

    fn complete(&self) -> bool {
        self.resources_settled() && self.parse_done && self.tasks_deferred == self.tasks_settled
    }
}

type OnLoad = Box<dyn FnOnce(&Result<Model>)>;

pub struct LoadSession {
    doc: Arc<Document>,
    model: Model,
    cache: BufferCache,
    progress: Progress,
    requests: Sender<FetchRequest>,
    failures: Vec<FetchFailure>,
    on_load: Option<OnLoad>,
    outcome: Option<Result<Model>>,
    fired: bool,
}

impl LoadSession {
    /// Parse the document tree, issue one fetch per declared resource URI,
    /// and walk every scene. Structural problems in the document surface
    /// here; a document without external resources completes immediately.
    pub fn begin(json: serde_json::Value, requests: Sender<FetchRequest>) -> Result<Self> {
        let doc: Document = serde_json::from_value(json)?;
        let doc = Arc::new(doc);

        let mut session = Self {
            doc: Arc::clone(&doc),
            model: Model {
                document: Arc::clone(&doc),
                default_scene: doc.scene.clone(),
                ..Model::default()
            },
            cache: BufferCache::new(),
            progress: Progress::default(),
            requests,
            failures: Vec::new(),
            on_load: None,
            outcome: None,
            fired: false,
        };

        session.issue_fetches()?;
        session.parse_scenes(&doc)?;
        session.progress.parse_done = true;
        session.check_complete();
        Ok(session)
    }

    /// Register an observer invoked exactly once with the load outcome. If
    /// the load already completed, it is invoked right away.
    pub fn set_on_load(&mut self, callback: impl FnOnce(&Result<Model>) + 'static) {
        match &self.outcome {
            Some(outcome) => callback(outcome),
            None => self.on_load = Some(Box::new(callback)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.fired
    }

    /// The outcome, once. Present after completion unless `run` or an
    /// earlier call already claimed it.
    pub fn take_outcome(&mut self) -> Option<Result<Model>> {
        self.outcome.take()
    }

    /// Pump responses until the load converges.
    pub fn run(mut self, responses: &Receiver<FetchResponse>) -> Result<Model> {
        loop {
            if let Some(outcome) = self.outcome.take() {
                return outcome;
            }
            let response = responses.recv().map_err(|_| Error::TransportClosed)?;
            self.deliver(response)?;
        }
    }

    /// Consume one transport response. Responses must be delivered one at a
    /// time; this is the only entry point that mutates the session after
    /// `begin`.
    pub fn deliver(&mut self, response: FetchResponse) -> Result<()> {
        match response {
            FetchResponse::Buffer { id, bytes } => {
                log::debug!("buffer \"{id}\" arrived ({} bytes)", bytes.len());
                self.progress.buffers_settled += 1;
                let drained = self.cache.insert_buffer(&id, bytes)?;
                for (view, task) in drained {
                    self.run_task(task, view)?;
                    self.progress.tasks_settled += 1;
                    self.check_complete();
                }
                self.check_complete();
            }
            FetchResponse::Image { id, image } => {
                self.progress.images_settled += 1;
                self.model.images.insert(id, image);
                self.check_complete();
            }
            FetchResponse::ShaderText { id, text } => {
                self.progress.shaders_settled += 1;
                self.model.shaders.insert(id, text);
                self.link_programs();
                self.check_complete();
            }
            FetchResponse::Failed { kind, id, message } => {
                log::warn!("{kind} \"{id}\" failed to fetch: {message}");
                match kind {
                    ResourceKind::Buffer => {
                        self.progress.buffers_settled += 1;
                        // queued decodes can never run; count them settled
                        for _ in self.cache.fail_buffer(&id) {
                            self.progress.tasks_settled += 1;
                        }
                    }
                    ResourceKind::Image => self.progress.images_settled += 1,
                    ResourceKind::Shader => self.progress.shaders_settled += 1,
                }
                self.failures.push(FetchFailure { kind, id, message });
                self.check_complete();
            }
        }
        Ok(())
    }

    fn issue_fetches(&mut self) -> Result<()> {
        let doc = Arc::clone(&self.doc);
        for (id, buffer) in &doc.buffers {
            self.progress.buffers_requested += 1;
            self.send(FetchRequest::Buffer {
                id: id.clone(),
                uri: buffer.uri.clone(),
            })?;
        }
        for (id, image) in &doc.images {
            self.progress.images_requested += 1;
            self.send(FetchRequest::Image {
                id: id.clone(),
                uri: image.uri.clone(),
            })?;
        }
        for (id, shader) in &doc.shaders {
            self.progress.shaders_requested += 1;
            self.send(FetchRequest::ShaderText {
                id: id.clone(),
                uri: shader.uri.clone(),
            })?;
        }
        Ok(())
    }

    fn send(&self, request: FetchRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| Error::TransportClosed)
    }

    fn parse_scenes(&mut self, doc: &Document) -> Result<()> {
        for (scene_id, scene) in &doc.scenes {
            self.model.scenes.insert(scene_id.clone(), Scene::default());
            for node_id in &scene.nodes {
                self.parse_node(doc, scene_id, node_id, Mat4::IDENTITY)?;
            }
        }
        Ok(())
    }

    fn parse_node(
        &mut self,
        doc: &Document,
        scene_id: &str,
        node_id: &str,
        parent: Mat4,
    ) -> Result<()> {
        let node = doc
            .nodes
            .get(node_id)
            .ok_or_else(|| Error::missing("node", node_id))?;

        let local = node_local_transform(node, node_id, parent)?;
        self.model
            .node_transforms
            .insert(node_id.to_string(), local);

        for mesh_id in &node.meshes {
            let mesh = doc
                .meshes
                .get(mesh_id)
                .ok_or_else(|| Error::missing("mesh", mesh_id))?;

            let mut primitives = Vec::with_capacity(mesh.primitives.len());
            for prim in &mesh.primitives {
                let material = prim
                    .material
                    .clone()
                    .ok_or_else(|| Error::MissingMaterial {
                        mesh: mesh_id.clone(),
                    })?;
                let material_desc = doc
                    .materials
                    .get(&material)
                    .ok_or_else(|| Error::missing("material", &material))?;
                if let Some(technique) = &material_desc.technique {
                    if !doc.techniques.contains_key(technique) {
                        return Err(Error::missing("technique", technique));
                    }
                }
                primitives.push(Primitive {
                    mode: prim.mode,
                    transform: local,
                    indices: None,
                    vertices: None,
                    attributes: HashMap::new(),
                    material,
                    technique: material_desc.technique.clone(),
                });
            }

            let scene = self
                .model
                .scenes
                .get_mut(scene_id)
                .expect("scene entry created before its nodes are walked");
            let mesh_index = scene.meshes.len();
            scene.meshes.push(MeshInstance {
                mesh_id: mesh_id.clone(),
                primitives,
            });

            for (prim_index, prim) in mesh.primitives.iter().enumerate() {
                let slot = PrimitiveSlot {
                    scene: scene_id.to_string(),
                    mesh: mesh_index,
                    primitive: prim_index,
                };
                if let Some(indices_id) = &prim.indices {
                    self.resolve_indices(doc, indices_id, slot.clone())?;
                }
                self.resolve_attributes(doc, mesh_id, &prim.attributes, slot)?;
            }
        }

        for child_id in &node.children {
            self.parse_node(doc, scene_id, child_id, local)?;
        }
        Ok(())
    }

    fn resolve_indices(
        &mut self,
        doc: &Document,
        accessor_id: &str,
        slot: PrimitiveSlot,
    ) -> Result<()> {
        let accessor = doc
            .accessors
            .get(accessor_id)
            .ok_or_else(|| Error::missing("accessor", accessor_id))?;
        let desc = doc
            .buffer_views
            .get(&accessor.buffer_view)
            .ok_or_else(|| Error::missing("bufferView", &accessor.buffer_view))?;

        let task = DecodeTask::Indices {
            target: slot,
            byte_offset: accessor.byte_offset,
            component_type: accessor.component_type,
            components: accessor.count * accessor.accessor_type.component_count(),
        };
        self.submit(&accessor.buffer_view, desc, task)
    }

    /// All attributes of one primitive are interleaved in a single buffer
    /// view and must share one component type; that type is the storage type
    /// of the whole decoded vertex span.
    fn resolve_attributes(
        &mut self,
        doc: &Document,
        mesh_id: &str,
        attributes: &HashMap<String, String>,
        slot: PrimitiveSlot,
    ) -> Result<()> {
        let mut shared: Option<(&str, ComponentType)> = None;
        let mut layout = HashMap::with_capacity(attributes.len());

        for (name, accessor_id) in attributes {
            let accessor = doc
                .accessors
                .get(accessor_id)
                .ok_or_else(|| Error::missing("accessor", accessor_id))?;
            match shared {
                None => shared = Some((accessor.buffer_view.as_str(), accessor.component_type)),
                Some((view_id, component_type)) => {
                    if view_id != accessor.buffer_view.as_str()
                        || component_type != accessor.component_type
                    {
                        return Err(Error::MixedAttributeLayout {
                            mesh: mesh_id.to_string(),
                        });
                    }
                }
            }

            let arity = accessor.accessor_type.component_count();
            let byte_stride = if accessor.byte_stride == 0 {
                arity * accessor.component_type.byte_size()
            } else {
                accessor.byte_stride
            };
            layout.insert(
                name.clone(),
                Attribute {
                    arity,
                    component_type: accessor.component_type,
                    byte_stride,
                    byte_offset: accessor.byte_offset,
                },
            );
        }

        let Some((view_id, storage_type)) = shared else {
            return Err(Error::NoAttributes {
                mesh: mesh_id.to_string(),
            });
        };
        let desc = doc
            .buffer_views
            .get(view_id)
            .ok_or_else(|| Error::missing("bufferView", view_id))?;

        let task = DecodeTask::Vertices {
            target: slot,
            storage_type,
            attributes: layout,
        };
        self.submit(view_id, desc, task)
    }

    fn submit(&mut self, view_id: &str, desc: &BufferViewDesc, task: DecodeTask) -> Result<()> {
        match self.cache.request(view_id, desc, task)? {
            Resolution::Ready(view, task) => self.run_task(task, view),
            Resolution::Deferred => {
                self.progress.tasks_deferred += 1;
                Ok(())
            }
        }
    }

    fn run_task(&mut self, task: DecodeTask, view: Arc<BufferView>) -> Result<()> {
        match task {
            DecodeTask::Indices {
                target,
                byte_offset,
                component_type,
                components,
            } => {
                let typed = TypedView::new(view, byte_offset, component_type, components)?;
                self.primitive_mut(&target).indices = Some(typed);
            }
            DecodeTask::Vertices {
                target,
                storage_type,
                attributes,
            } => {
                let components = view.byte_length() / storage_type.byte_size();
                let typed = TypedView::new(view, 0, storage_type, components)?;
                let primitive = self.primitive_mut(&target);
                primitive.vertices = Some(typed);
                primitive.attributes = attributes;
            }
        }
        Ok(())
    }

    fn primitive_mut(&mut self, slot: &PrimitiveSlot) -> &mut Primitive {
        let scene = self
            .model
            .scenes
            .get_mut(&slot.scene)
            .expect("decode target scene exists");
        &mut scene.meshes[slot.mesh].primitives[slot.primitive]
    }

    /// Link every program whose two shader stages are resident.
    fn link_programs(&mut self) {
        let doc = Arc::clone(&self.doc);
        for (program_id, program) in &doc.programs {
            if self.model.programs.contains_key(program_id) {
                continue;
            }
            if let (Some(vertex), Some(fragment)) = (
                self.model.shaders.get(&program.vertex_shader),
                self.model.shaders.get(&program.fragment_shader),
            ) {
                log::debug!("program \"{program_id}\" sources resolved");
                self.model.programs.insert(
                    program_id.clone(),
                    ProgramSources {
                        vertex: vertex.clone(),
                        fragment: fragment.clone(),
                    },
                );
            }
        }
    }

    fn check_complete(&mut self) {
        if self.fired || !self.progress.complete() {
            return;
        }
        self.fired = true;

        let model = std::mem::take(&mut self.model);
        let outcome = if self.failures.is_empty() {
            log::info!(
                "load complete: {} scene(s), {} image(s), {} program(s)",
                model.scenes.len(),
                model.images.len(),
                model.programs.len()
            );
            Ok(model)
        } else {
            log::warn!("load settled with {} failed fetch(es)", self.failures.len());
            Err(Error::ResourcesFailed(std::mem::take(&mut self.failures)))
        };

        if let Some(callback) = self.on_load.take() {
            callback(&outcome);
        }
        self.outcome = Some(outcome);
    }
}

/// `parent * matrix` for matrix nodes, `parent * (T·R) * S` for TRS nodes.
/// Partial TRS fields default to identity components; a node declaring
/// neither form, or both, is malformed.
fn node_local_transform(node: &NodeDesc, node_id: &str, parent: Mat4) -> Result<Mat4> {
    match (node.matrix, node.has_trs()) {
        (Some(matrix), false) => Ok(parent * Mat4::from_cols_array(&matrix)),
        (Some(_), true) => Err(Error::AmbiguousNodeTransform {
            node: node_id.to_string(),
        }),
        (None, true) => {
            let translation = node.translation.map(Vec3::from).unwrap_or(Vec3::ZERO);
            let rotation = node.rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY);
            let scale = node.scale.map(Vec3::from).unwrap_or(Vec3::ONE);
            Ok(parent
                * Mat4::from_rotation_translation(rotation, translation)
                * Mat4::from_scale(scale))
        }
        (None, false) => Err(Error::NodeWithoutTransform {
            node: node_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DrawMode;
    use crossbeam::channel::unbounded;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    const IDENTITY: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    /// One buffer holding three u16 indices, two bytes of padding, and three
    /// vec3 float positions, all carved through a single buffer view.
    fn scenario_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in [0u16, 1, 2] {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    fn scenario_doc() -> serde_json::Value {
        json!({
            "scene": "scene0",
            "scenes": { "scene0": { "nodes": ["node0"] } },
            "nodes": {
                "node0": { "matrix": IDENTITY, "meshes": ["mesh0"] }
            },
            "meshes": {
                "mesh0": {
                    "primitives": [{
                        "attributes": { "POSITION": "acc_pos" },
                        "indices": "acc_idx",
                        "material": "mat0"
                    }]
                }
            },
            "accessors": {
                "acc_idx": {
                    "bufferView": "view0", "byteOffset": 0,
                    "componentType": 5123, "type": "SCALAR", "count": 3
                },
                "acc_pos": {
                    "bufferView": "view0", "byteOffset": 8, "byteStride": 12,
                    "componentType": 5126, "type": "VEC3", "count": 3
                }
            },
            "bufferViews": {
                "view0": { "buffer": "buf0", "byteOffset": 0, "byteLength": 44 }
            },
            "buffers": { "buf0": { "uri": "scene.bin" } },
            "materials": { "mat0": { "technique": "tech0" } },
            "techniques": { "tech0": {} }
        })
    }

    #[test]
    fn end_to_end_single_primitive() {
        let (req_tx, req_rx) = unbounded();
        let mut session = LoadSession::begin(scenario_doc(), req_tx).expect("begin");

        // exactly one buffer fetch was issued, and the load is still open
        let requests: Vec<_> = req_rx.try_iter().collect();
        assert_eq!(requests.len(), 1);
        assert!(!session.is_complete());

        session
            .deliver(FetchResponse::Buffer {
                id: "buf0".to_string(),
                bytes: scenario_bytes(),
            })
            .expect("deliver");
        assert!(session.is_complete());

        let model = session.take_outcome().expect("outcome").expect("success");
        assert_eq!(model.default_scene.as_deref(), Some("scene0"));
        let scene = &model.scenes["scene0"];
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].mesh_id, "mesh0");

        let primitive = &scene.meshes[0].primitives[0];
        assert_eq!(primitive.mode, DrawMode::Triangles);
        assert_eq!(primitive.transform, Mat4::IDENTITY);
        assert_eq!(primitive.material, "mat0");
        assert_eq!(primitive.technique.as_deref(), Some("tech0"));

        let indices = primitive.indices.as_ref().expect("indices decoded");
        assert_eq!(indices.component_type(), ComponentType::UnsignedShort);
        assert_eq!(indices.to_vec::<u16>(), vec![0, 1, 2]);

        let position = &primitive.attributes["POSITION"];
        assert_eq!(position.arity, 3);
        assert_eq!(position.component_type, ComponentType::Float);
        assert_eq!(position.byte_stride, 12);
        assert_eq!(position.byte_offset, 8);

        // the vertex span covers the whole view as floats
        let vertices = primitive.vertices.as_ref().expect("vertices decoded");
        assert_eq!(vertices.len(), 11);
        assert_eq!(vertices.read::<f32>(2), 0.0);
        assert_eq!(vertices.read::<f32>(5), 1.0);
    }

    #[test]
    fn completion_fires_exactly_once() {
        let (req_tx, _req_rx) = unbounded();
        let mut session = LoadSession::begin(scenario_doc(), req_tx).expect("begin");

        let fired = Rc::new(Cell::new(0u32));
        let observed = Rc::clone(&fired);
        session.set_on_load(move |outcome| {
            assert!(outcome.is_ok());
            observed.set(observed.get() + 1);
        });
        assert_eq!(fired.get(), 0);

        session
            .deliver(FetchResponse::Buffer {
                id: "buf0".to_string(),
                bytes: scenario_bytes(),
            })
            .expect("deliver");
        assert_eq!(fired.get(), 1);

        // a stray duplicate arrival must not re-fire the callback
        session
            .deliver(FetchResponse::Buffer {
                id: "buf0".to_string(),
                bytes: scenario_bytes(),
            })
            .expect("deliver");
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn mesh_reused_under_two_nodes_shares_geometry() {
        let mut positions = Vec::new();
        for v in [0.0f32; 9] {
            positions.extend_from_slice(&v.to_le_bytes());
        }
        let translated = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)).to_cols_array();

        let doc = json!({
            "scenes": { "scene0": { "nodes": ["node_a", "node_b"] } },
            "nodes": {
                "node_a": { "matrix": translated, "meshes": ["mesh0"] },
                "node_b": { "translation": [2.0, 0.0, 0.0], "meshes": ["mesh0"] }
            },
            "meshes": {
                "mesh0": {
                    "primitives": [{
                        "attributes": { "POSITION": "acc_pos" },
                        "material": "mat0"
                    }]
                }
            },
            "accessors": {
                "acc_pos": {
                    "bufferView": "view0",
                    "componentType": 5126, "type": "VEC3", "count": 3
                }
            },
            "bufferViews": {
                "view0": { "buffer": "buf0", "byteLength": 36 }
            },
            "buffers": { "buf0": { "uri": "positions.bin" } },
            "materials": { "mat0": {} }
        });

        let (req_tx, _req_rx) = unbounded();
        let mut session = LoadSession::begin(doc, req_tx).expect("begin");
        session
            .deliver(FetchResponse::Buffer {
                id: "buf0".to_string(),
                bytes: positions,
            })
            .expect("deliver");

        let model = session.take_outcome().expect("outcome").expect("success");
        let scene = &model.scenes["scene0"];
        assert_eq!(scene.meshes.len(), 2);

        let first = &scene.meshes[0].primitives[0];
        let second = &scene.meshes[1].primitives[0];
        assert_ne!(first.transform, second.transform);
        assert_eq!(
            first.transform,
            Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
        );

        // independent instances, one decoded byte range
        let first_view = first.vertices.as_ref().expect("decoded").buffer_view();
        let second_view = second.vertices.as_ref().expect("decoded").buffer_view();
        assert!(Arc::ptr_eq(first_view, second_view));
    }

    #[test]
    fn trs_composition_matches_manual_matrix() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let doc = json!({
            "scenes": { "scene0": { "nodes": ["node0"] } },
            "nodes": {
                "node0": {
                    "translation": [1.0, 2.0, 3.0],
                    "rotation": [0.0, 0.0, half, half],
                    "scale": [2.0, 2.0, 2.0]
                }
            }
        });

        let (req_tx, _req_rx) = unbounded();
        let mut session = LoadSession::begin(doc, req_tx).expect("begin");
        let model = session.take_outcome().expect("outcome").expect("success");

        // T(1,2,3) * R(90 deg about z) * S(2): column-major by hand
        let expected = Mat4::from_cols_array(&[
            0.0, 2.0, 0.0, 0.0, //
            -2.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 2.0, 0.0, //
            1.0, 2.0, 3.0, 1.0,
        ]);
        let actual = model.node_transforms["node0"];
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "got {actual:?}, expected {expected:?}"
        );
    }

    #[test]
    fn matrix_node_composes_with_parent() {
        let parent = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let child = Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0));
        let doc = json!({
            "scenes": { "scene0": { "nodes": ["root"] } },
            "nodes": {
                "root": {
                    "matrix": parent.to_cols_array().to_vec(),
                    "children": ["leaf"]
                },
                "leaf": { "matrix": child.to_cols_array().to_vec() }
            }
        });

        let (req_tx, _req_rx) = unbounded();
        let mut session = LoadSession::begin(doc, req_tx).expect("begin");
        let model = session.take_outcome().expect("outcome").expect("success");

        assert_eq!(model.node_transforms["root"], parent);
        assert_eq!(model.node_transforms["leaf"], parent * child);
    }

    #[test]
    fn malformed_documents_fail_loudly() {
        let (req_tx, _req_rx) = unbounded();
        let no_material = json!({
            "scenes": { "scene0": { "nodes": ["node0"] } },
            "nodes": { "node0": { "matrix": IDENTITY, "meshes": ["mesh0"] } },
            "meshes": {
                "mesh0": { "primitives": [{ "attributes": {} }] }
            }
        });
        assert!(matches!(
            LoadSession::begin(no_material, req_tx.clone()),
            Err(Error::MissingMaterial { .. })
        ));

        let no_transform = json!({
            "scenes": { "scene0": { "nodes": ["node0"] } },
            "nodes": { "node0": {} }
        });
        assert!(matches!(
            LoadSession::begin(no_transform, req_tx.clone()),
            Err(Error::NodeWithoutTransform { .. })
        ));

        let mixed = json!({
            "scenes": { "scene0": { "nodes": ["node0"] } },
            "nodes": { "node0": { "matrix": IDENTITY, "meshes": ["mesh0"] } },
            "meshes": {
                "mesh0": {
                    "primitives": [{
                        "attributes": { "POSITION": "acc_f32", "COLOR": "acc_u8" },
                        "material": "mat0"
                    }]
                }
            },
            "accessors": {
                "acc_f32": {
                    "bufferView": "view0",
                    "componentType": 5126, "type": "VEC3", "count": 1
                },
                "acc_u8": {
                    "bufferView": "view0",
                    "componentType": 5121, "type": "VEC4", "count": 1
                }
            },
            "bufferViews": { "view0": { "buffer": "buf0", "byteLength": 16 } },
            "buffers": { "buf0": { "uri": "b.bin" } },
            "materials": { "mat0": {} }
        });
        assert!(matches!(
            LoadSession::begin(mixed, req_tx),
            Err(Error::MixedAttributeLayout { .. })
        ));
    }

    #[test]
    fn document_without_resources_completes_in_begin() {
        let (req_tx, _req_rx) = unbounded();
        let session = LoadSession::begin(json!({ "scenes": {} }), req_tx).expect("begin");
        assert!(session.is_complete());

        let (_res_tx, res_rx) = unbounded();
        let model = session.run(&res_rx).expect("no pending resources");
        assert!(model.scenes.is_empty());
    }

    #[test]
    fn failed_buffer_settles_the_load_with_an_error() {
        let (req_tx, _req_rx) = unbounded();
        let mut session = LoadSession::begin(scenario_doc(), req_tx).expect("begin");

        session
            .deliver(FetchResponse::Failed {
                kind: ResourceKind::Buffer,
                id: "buf0".to_string(),
                message: "timed out".to_string(),
            })
            .expect("deliver");
        assert!(session.is_complete());

        match session.take_outcome().expect("outcome") {
            Err(Error::ResourcesFailed(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].id, "buf0");
            }
            Err(other) => panic!("expected ResourcesFailed, got {other}"),
            Ok(_) => panic!("the load must not succeed"),
        }
    }

    #[test]
    fn disconnected_transport_is_an_error_not_a_hang() {
        let (req_tx, _req_rx) = unbounded();
        let session = LoadSession::begin(scenario_doc(), req_tx).expect("begin");

        let (res_tx, res_rx) = unbounded::<FetchResponse>();
        drop(res_tx);
        assert!(matches!(session.run(&res_rx), Err(Error::TransportClosed)));
    }

    #[test]
    fn shared_shaders_fetch_once_and_link_both_programs() {
        let doc = json!({
            "scenes": {},
            "programs": {
                "p0": { "vertexShader": "vs", "fragmentShader": "fs" },
                "p1": { "vertexShader": "vs", "fragmentShader": "fs" }
            },
            "shaders": {
                "vs": { "uri": "common.vert" },
                "fs": { "uri": "common.frag" }
            }
        });

        let (req_tx, req_rx) = unbounded();
        let mut session = LoadSession::begin(doc, req_tx).expect("begin");
        // one request per declared shader, not per referencing program
        assert_eq!(req_rx.try_iter().count(), 2);

        for (id, text) in [("vs", "void main() {}"), ("fs", "void main() {}")] {
            session
                .deliver(FetchResponse::ShaderText {
                    id: id.to_string(),
                    text: text.to_string(),
                })
                .expect("deliver");
        }

        let model = session.take_outcome().expect("outcome").expect("success");
        assert_eq!(model.programs.len(), 2);
        assert_eq!(model.programs["p0"].vertex, "void main() {}");
    }
}
