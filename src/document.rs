//! `Document`: the container protocol, arenas, and object materialization.
//!
//! Grounded on `sfbxDocument.cpp`'s `Document::read`/`write` (magic/version/
//! node-list/footer framing, the FileId/CreationTime/Creator fixed nodes)
//! and its `Document::createObject`/materialization loop (class/subclass
//! dispatch, `Connections` OO/OP resolution). Object identity resolution
//! and inter-object edges use arena indices (`ObjectId`) instead of a
//! `shared_ptr` graph.

use std::collections::HashMap;

use crate::animation::{
    AnimationCurveData, AnimationCurveNodeData, AnimationKind, AnimationLayerData, AnimationStackData,
};
use crate::config::{ReadOptions, WriteOptions};
use crate::deformer::{BlendShapeChannelData, BlendShapeData, ClusterData, SkinData};
use crate::error::{Diagnostic, DiagnosticSink, FbxError, Result};
use crate::geometry::{GeomMeshData, LayerElement, MappingMode, ReferenceMode, ShapeData};
use crate::model::ModelData;
use crate::node::{self, parse_node, write_node, Node, NodeId};
use crate::object::{default_data_for, Object, ObjectClass, ObjectData, ObjectId, ObjectSubClass};
use crate::pose::BindPoseData;
use crate::primitive::{ByteReader, ByteWriter};
use crate::property::Property;
use crate::tokens::*;
use nalgebra::{Matrix4, Vector3};

pub struct Document {
    pub version: u32,
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
    pub objects: Vec<Object>,
    pub root_objects: Vec<ObjectId>,
    pub root_model: ObjectId,
    pub anim_stacks: Vec<ObjectId>,
    pub current_take: Option<ObjectId>,
}

impl Document {
    /// A fresh, empty Document: just the synthetic RootModel at id 0.
    pub fn new() -> Self {
        let mut objects = Vec::new();
        objects.push(Object::new(0, "RootNode", ObjectClass::Model, ObjectSubClass::Root, ObjectData::Model(ModelData::default())));
        Self {
            version: 7700,
            nodes: Vec::new(),
            roots: Vec::new(),
            objects,
            root_objects: vec![ObjectId(0)],
            root_model: ObjectId(0),
            anim_stacks: Vec::new(),
            current_take: None,
        }
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0 as usize]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id.0 as usize]
    }

    /// Finds an object by its display name. Accepts the legacy
    /// `"Scene\x00\x01Model"` alias for the root model on read, but never
    /// emits it on write.
    pub fn find_object_by_name(&self, name: &str) -> Option<ObjectId> {
        if name == LEGACY_ROOT_MODEL_NAME {
            return Some(self.root_model);
        }
        self.objects
            .iter()
            .position(|o| o.name == name)
            .map(|i| ObjectId(i as u32))
    }

    // ---- read -----------------------------------------------------------

    pub fn read(bytes: &[u8], options: &ReadOptions) -> Result<(Document, DiagnosticSink)> {
        if bytes.len() < FBX_MAGIC.len() + 4 || &bytes[..FBX_MAGIC.len()] != FBX_MAGIC.as_slice() {
            return Err(FbxError::BadMagic);
        }
        let version = u32::from_le_bytes(bytes[23..27].try_into().unwrap());
        if version > options.max_version {
            return Err(FbxError::UnsupportedVersion(version, options.max_version));
        }

        let mut r = ByteReader::new(&bytes[27..]);
        let base_offset = 27u64;
        let mut nodes = Vec::new();
        let mut roots = Vec::new();
        loop {
            match parse_node(&mut r, base_offset, &mut nodes)? {
                Some(id) => roots.push(id),
                None => break,
            }
        }
        verify_footer(&bytes[27 + r.position()..])?;

        let mut doc = Document::new();
        doc.version = version;
        doc.nodes = nodes;
        doc.roots = roots;

        let mut sink = DiagnosticSink::new();
        doc.materialize_objects(&mut sink)?;
        Ok((doc, sink))
    }

    fn find_root(&self, name: &str) -> Option<NodeId> {
        self.roots.iter().copied().find(|&id| self.nodes[id.0 as usize].name == name)
    }

    fn materialize_objects(&mut self, sink: &mut DiagnosticSink) -> Result<()> {
        let mut id_map: HashMap<u64, ObjectId> = HashMap::new();
        id_map.insert(0, self.root_model);

        let Some(objects_node) = self.find_root(OBJECTS) else {
            return Ok(());
        };
        let children = self.nodes[objects_node.0 as usize].children.clone();
        for child in children {
            let n = &self.nodes[child.0 as usize];
            let Some(class) = ObjectClass::from_name(&n.name) else {
                continue;
            };
            let id = n.property(0).and_then(Property::as_i64).unwrap_or(0) as u64;
            let display = n.property(1).and_then(Property::as_str).unwrap_or("");
            let name = display.split(NAME_CLASS_SEP).next().unwrap_or(display).to_string();
            let subclass_name = n
                .properties
                .last()
                .and_then(Property::as_str)
                .unwrap_or("");
            let subclass = ObjectSubClass::from_name(subclass_name);

            let mut obj = Object::new(id, name, class, subclass, default_data_for(class, subclass));
            obj.node = Some(child);
            let object_id = ObjectId(self.objects.len() as u32);
            self.objects.push(obj);
            id_map.insert(id, object_id);
        }

        if let Some(connections_node) = self.find_root(CONNECTIONS) {
            let entries = self.nodes[connections_node.0 as usize].children.clone();
            for entry in entries {
                let n = &self.nodes[entry.0 as usize];
                let kind = n.property(0).and_then(Property::as_str).unwrap_or("").to_string();
                let child_fbx_id = n.property(1).and_then(Property::as_i64);
                let parent_fbx_id = n.property(2).and_then(Property::as_i64);
                let prop_name = n.property(3).and_then(Property::as_str).map(str::to_string);

                let (Some(child_fbx_id), Some(parent_fbx_id)) = (child_fbx_id, parent_fbx_id) else {
                    continue;
                };
                let child_id = match id_map.get(&(child_fbx_id as u64)) {
                    Some(&id) => id,
                    None => {
                        sink.push(Diagnostic::BadConnection { id: child_fbx_id as u64 });
                        continue;
                    }
                };
                let parent_id = match id_map.get(&(parent_fbx_id as u64)) {
                    Some(&id) => id,
                    None => {
                        sink.push(Diagnostic::BadConnection { id: parent_fbx_id as u64 });
                        continue;
                    }
                };

                self.object_mut(parent_id).children.push(child_id);
                self.object_mut(child_id).parents.push(parent_id);

                if kind == "OP" {
                    if let Some(name) = prop_name {
                        self.apply_op_connection(parent_id, child_id, &name);
                    }
                }
            }
        }

        for i in 0..self.objects.len() {
            let id = ObjectId(i as u32);
            if let Some(node_id) = self.objects[i].node {
                self.construct_object(id, node_id, sink)?;
            }
        }

        self.anim_stacks = self
            .objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.class == ObjectClass::AnimationStack)
            .map(|(i, _)| ObjectId(i as u32))
            .collect();
        self.current_take = self.anim_stacks.first().copied();

        self.root_objects = self
            .objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.parents.is_empty())
            .map(|(i, _)| ObjectId(i as u32))
            .collect();

        Ok(())
    }

    /// Wires up an `OP` connection's target-specific consequence: deriving
    /// an `AnimationCurveNode`'s `AnimationKind` and its `target`/`layer`
    /// split.
    fn apply_op_connection(&mut self, parent_id: ObjectId, child_id: ObjectId, prop_name: &str) {
        if self.object(child_id).class == ObjectClass::AnimationCurveNode {
            let kind = AnimationKind::from_property_name(prop_name);
            if let ObjectData::AnimationCurveNode(data) = &mut self.object_mut(child_id).data {
                data.kind = kind;
                data.target = Some(parent_id);
            }
        }
    }

    fn construct_object(&mut self, id: ObjectId, node_id: NodeId, sink: &mut DiagnosticSink) -> Result<()> {
        let class = self.object(id).class;
        match class {
            ObjectClass::Model => self.construct_model(id, node_id),
            ObjectClass::Geometry => self.construct_geometry(id, node_id),
            ObjectClass::Deformer => self.construct_deformer(id, node_id, sink),
            ObjectClass::Pose => self.construct_pose(id, node_id),
            ObjectClass::AnimationStack => self.construct_anim_stack(id, node_id),
            ObjectClass::AnimationLayer => self.construct_anim_layer(id),
            ObjectClass::AnimationCurveNode => self.construct_anim_curve_node(id),
            ObjectClass::AnimationCurve => self.construct_anim_curve(id, node_id),
            ObjectClass::NodeAttribute | ObjectClass::Material => Ok(()),
        }
    }

    fn construct_model(&mut self, id: ObjectId, node_id: NodeId) -> Result<()> {
        let props70 = find_properties70(node_id, &self.nodes);
        let mut data = ModelData::default();
        if let Some(p70) = props70 {
            for p in &self.nodes[p70.0 as usize].children.clone() {
                let n = &self.nodes[p.0 as usize];
                let Some(name) = n.property(0).and_then(Property::as_str) else { continue };
                let values = p_numeric_values(&n.properties);
                match name {
                    LCL_TRANSLATION => data.position = vec3_from(&values),
                    LCL_ROTATION => data.rotation = vec3_from(&values),
                    LCL_SCALING => data.scale = vec3_from(&values),
                    PRE_ROTATION => data.pre_rotation = vec3_from(&values),
                    POST_ROTATION => data.post_rotation = vec3_from(&values),
                    ROTATION_ORDER => {
                        if let Some(&v) = values.first() {
                            data.rotation_order = crate::model::RotationOrder::from_i32(v as i32);
                        }
                    }
                    VISIBILITY => {
                        if let Some(&v) = values.first() {
                            data.visibility = v != 0.0;
                        }
                    }
                    FOCAL_LENGTH => {
                        data.focal_length = values.first().map(|&v| v as f32);
                    }
                    _ => {}
                }
            }
        }

        // Legacy compatibility: a Mesh model may carry Vertices directly
        // rather than through a separate Geometry object (pre-6000-era files).
        if self.object(id).subclass == ObjectSubClass::Mesh
            && find_child(node_id, VERTICES, &self.nodes).is_some()
        {
            let geom = self.read_geom_mesh_fields(node_id);
            self.object_mut(id).data = ObjectData::Model(data);
            let geom_id = ObjectId(self.objects.len() as u32);
            let mut geom_obj = Object::new(0, "", ObjectClass::Geometry, ObjectSubClass::Mesh, ObjectData::GeomMesh(geom));
            geom_obj.parents.push(id);
            self.objects.push(geom_obj);
            self.object_mut(id).children.push(geom_id);
            return Ok(());
        }

        self.object_mut(id).data = ObjectData::Model(data);
        Ok(())
    }

    fn read_geom_mesh_fields(&self, node_id: NodeId) -> GeomMeshData {
        let mut geom = GeomMeshData::default();
        if let Some(v) = find_child(node_id, VERTICES, &self.nodes) {
            if let Some(arr) = self.nodes[v.0 as usize].property(0).and_then(Property::as_f64_array) {
                geom.points = arr.chunks_exact(3).map(|c| Vector3::new(c[0] as f32, c[1] as f32, c[2] as f32)).collect();
            }
        }
        if let Some(pvi) = find_child(node_id, POLYGON_VERTEX_INDEX, &self.nodes) {
            if let Some(arr) = self.nodes[pvi.0 as usize].property(0).and_then(Property::as_i32_array) {
                let (counts, indices) = GeomMeshData::decode_polygon_vertex_index(arr);
                geom.counts = counts;
                geom.indices = indices;
            }
        }
        for &child in &self.nodes[node_id.0 as usize].children {
            let n = &self.nodes[child.0 as usize];
            if n.name == LAYER_ELEMENT_NORMAL {
                geom.normal_layers.push(self.read_vector_layer(child));
            } else if n.name == LAYER_ELEMENT_UV {
                geom.uv_layers.push(self.read_uv_layer(child));
            } else if n.name == LAYER_ELEMENT_COLOR {
                geom.color_layers.push(self.read_color_layer(child));
            }
        }
        geom
    }

    fn read_vector_layer(&self, layer_node: NodeId) -> LayerElement<Vector3<f32>> {
        let name = find_child(layer_node, NAME, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_str)
            .unwrap_or("")
            .to_string();
        let data = find_child(layer_node, NORMALS, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_f64_array)
            .map(|a| a.chunks_exact(3).map(|c| Vector3::new(c[0] as f32, c[1] as f32, c[2] as f32)).collect())
            .unwrap_or_default();
        let indices = find_child(layer_node, NORMALS_INDEX, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_i32_array)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        LayerElement { name, data, indices }
    }

    fn read_uv_layer(&self, layer_node: NodeId) -> LayerElement<[f64; 2]> {
        let name = find_child(layer_node, NAME, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_str)
            .unwrap_or("")
            .to_string();
        let data = find_child(layer_node, UV, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_f64_array)
            .map(|a| a.chunks_exact(2).map(|c| [c[0], c[1]]).collect())
            .unwrap_or_default();
        let indices = find_child(layer_node, UV_INDEX, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_i32_array)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        LayerElement { name, data, indices }
    }

    fn read_color_layer(&self, layer_node: NodeId) -> LayerElement<[f64; 4]> {
        let name = find_child(layer_node, NAME, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_str)
            .unwrap_or("")
            .to_string();
        let data = find_child(layer_node, COLORS, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_f64_array)
            .map(|a| a.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect())
            .unwrap_or_default();
        let indices = find_child(layer_node, COLOR_INDEX, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_i32_array)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        LayerElement { name, data, indices }
    }

    fn construct_geometry(&mut self, id: ObjectId, node_id: NodeId) -> Result<()> {
        match self.object(id).subclass {
            ObjectSubClass::Shape => {
                let mut shape = ShapeData::default();
                if let Some(idx) = find_child(node_id, INDEXES, &self.nodes) {
                    if let Some(arr) = self.nodes[idx.0 as usize].property(0).and_then(Property::as_i32_array) {
                        shape.indices = arr.to_vec();
                    }
                }
                if let Some(v) = find_child(node_id, VERTICES, &self.nodes) {
                    if let Some(arr) = self.nodes[v.0 as usize].property(0).and_then(Property::as_f64_array) {
                        shape.delta_points = arr.chunks_exact(3).map(|c| Vector3::new(c[0] as f32, c[1] as f32, c[2] as f32)).collect();
                    }
                }
                if let Some(nrm) = find_child(node_id, NORMALS, &self.nodes) {
                    if let Some(arr) = self.nodes[nrm.0 as usize].property(0).and_then(Property::as_f64_array) {
                        shape.delta_normals = arr.chunks_exact(3).map(|c| Vector3::new(c[0] as f32, c[1] as f32, c[2] as f32)).collect();
                    }
                }
                self.object_mut(id).data = ObjectData::Shape(shape);
            }
            _ => {
                let geom = self.read_geom_mesh_fields(node_id);
                self.object_mut(id).data = ObjectData::GeomMesh(geom);
            }
        }
        Ok(())
    }

    fn construct_deformer(&mut self, id: ObjectId, node_id: NodeId, sink: &mut DiagnosticSink) -> Result<()> {
        match self.object(id).subclass {
            ObjectSubClass::Skin => {
                let clusters = self.object(id).children.clone();
                self.object_mut(id).data = ObjectData::Skin(SkinData { clusters });
            }
            ObjectSubClass::Cluster => {
                let mut cluster = ClusterData::new();
                // A Cluster is the OO *child* of its joint Model (the joint
                // is the connection's parent), not the other way around.
                cluster.joint = self.object(id).parents.iter().copied().find(|&p| self.object(p).class == ObjectClass::Model);
                if cluster.joint.is_none() {
                    sink.push(Diagnostic::BadConnection { id: self.object(id).id });
                }
                if let Some(n) = find_child(node_id, INDEXES, &self.nodes) {
                    if let Some(arr) = self.nodes[n.0 as usize].property(0).and_then(Property::as_i32_array) {
                        cluster.indices = arr.to_vec();
                    }
                }
                if let Some(n) = find_child(node_id, WEIGHTS, &self.nodes) {
                    if let Some(arr) = self.nodes[n.0 as usize].property(0).and_then(Property::as_f64_array) {
                        cluster.weights = arr.to_vec();
                    }
                }
                if let Some(n) = find_child(node_id, TRANSFORM, &self.nodes) {
                    if let Some(arr) = self.nodes[n.0 as usize].property(0).and_then(Property::as_f64_array) {
                        cluster.transform = matrix_from_16(arr);
                    }
                }
                if let Some(n) = find_child(node_id, TRANSFORM_LINK, &self.nodes) {
                    if let Some(arr) = self.nodes[n.0 as usize].property(0).and_then(Property::as_f64_array) {
                        cluster.transform_link = matrix_from_16(arr);
                    }
                }
                self.object_mut(id).data = ObjectData::Cluster(cluster);
            }
            ObjectSubClass::BlendShape => {
                let channels = self.object(id).children.clone();
                self.object_mut(id).data = ObjectData::BlendShape(BlendShapeData { channels });
            }
            ObjectSubClass::BlendShapeChannel => {
                let shape_objs: Vec<ObjectId> = self.object(id).children.iter().copied().filter(|&c| self.object(c).class == ObjectClass::Geometry).collect();
                let mut weight = 0.0;
                if let Some(n) = find_child(node_id, DEFORM_PERCENT, &self.nodes) {
                    weight = n.property(0).and_then(Property::as_f64).unwrap_or(0.0) / 100.0;
                }
                let full_weights: Vec<f64> = find_child(node_id, FULL_WEIGHTS, &self.nodes)
                    .and_then(|n| self.nodes[n.0 as usize].property(0))
                    .and_then(Property::as_f64_array)
                    .map(|a| a.to_vec())
                    .unwrap_or_default();
                let shapes = shape_objs
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| (s, full_weights.get(i).copied().unwrap_or(100.0)))
                    .collect();
                self.object_mut(id).data = ObjectData::BlendShapeChannel(BlendShapeChannelData { shapes, weight });
            }
            _ => {}
        }
        Ok(())
    }

    fn construct_pose(&mut self, id: ObjectId, node_id: NodeId) -> Result<()> {
        if self.object(id).subclass != ObjectSubClass::BindPose {
            return Ok(());
        }
        let mut pose = BindPoseData::default();
        for &child in &self.nodes[node_id.0 as usize].children.clone() {
            let n = &self.nodes[child.0 as usize];
            if n.name != POSE_NODE {
                continue;
            }
            let Some(joint_fbx_id) = find_child(child, NODE, &self.nodes)
                .and_then(|nid| self.nodes[nid.0 as usize].property(0))
                .and_then(Property::as_i64)
            else {
                continue;
            };
            let Some(matrix_arr) = find_child(child, MATRIX, &self.nodes)
                .and_then(|nid| self.nodes[nid.0 as usize].property(0))
                .and_then(Property::as_f64_array)
            else {
                continue;
            };
            if let Some(joint) = self.objects.iter().position(|o| o.id == joint_fbx_id as u64) {
                pose.push(ObjectId(joint as u32), matrix_from_16(matrix_arr));
            }
        }
        self.object_mut(id).data = ObjectData::BindPose(pose);
        Ok(())
    }

    fn construct_anim_stack(&mut self, id: ObjectId, node_id: NodeId) -> Result<()> {
        let layers = self.object(id).children.clone();
        let mut data = AnimationStackData { layers, ..Default::default() };
        if let Some(p70) = find_properties70(node_id, &self.nodes) {
            for p in &self.nodes[p70.0 as usize].children.clone() {
                let n = &self.nodes[p.0 as usize];
                let Some(name) = n.property(0).and_then(Property::as_str) else { continue };
                let values = p_numeric_values(&n.properties);
                let Some(&ticks) = values.first() else { continue };
                let secs = crate::animation::ticks_to_seconds(ticks as i64);
                match name {
                    "LocalStart" => data.local_start_secs = secs,
                    "LocalStop" => data.local_stop_secs = secs,
                    "ReferenceStart" => data.reference_start_secs = secs,
                    "ReferenceStop" => data.reference_stop_secs = secs,
                    _ => {}
                }
            }
        }
        self.object_mut(id).data = ObjectData::AnimationStack(data);
        Ok(())
    }

    fn construct_anim_layer(&mut self, id: ObjectId) -> Result<()> {
        let curve_nodes = self.object(id).children.clone();
        self.object_mut(id).data = ObjectData::AnimationLayer(AnimationLayerData { curve_nodes });
        Ok(())
    }

    fn construct_anim_curve_node(&mut self, id: ObjectId) -> Result<()> {
        let curves: Vec<ObjectId> = self.object(id).children.iter().copied().filter(|&c| self.object(c).class == ObjectClass::AnimationCurve).collect();
        let layer = self.object(id).parents.iter().copied().find(|&p| self.object(p).class == ObjectClass::AnimationLayer);
        if let ObjectData::AnimationCurveNode(existing) = &self.object(id).data {
            let mut data = existing.clone();
            data.curves = curves;
            data.layer = layer;
            self.object_mut(id).data = ObjectData::AnimationCurveNode(data);
        } else {
            self.object_mut(id).data = ObjectData::AnimationCurveNode(AnimationCurveNodeData { curves, layer, ..Default::default() });
        }
        Ok(())
    }

    fn construct_anim_curve(&mut self, id: ObjectId, node_id: NodeId) -> Result<()> {
        let times: Vec<f32> = find_child(node_id, KEY_TIME, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_i64_array)
            .map(|a| a.iter().map(|&t| crate::animation::ticks_to_seconds(t) as f32).collect())
            .unwrap_or_default();
        let values: Vec<f32> = find_child(node_id, KEY_VALUE_FLOAT, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_f32_array)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        let default = find_child(node_id, DEFAULT, &self.nodes)
            .and_then(|n| self.nodes[n.0 as usize].property(0))
            .and_then(Property::as_f32)
            .unwrap_or(0.0);
        self.object_mut(id).data = ObjectData::AnimationCurve(AnimationCurveData { times, values, default });
        Ok(())
    }

    // ---- write ------------------------------------------------------------

    /// Re-serializes this Document to a byte-exact FBX binary file.
    /// The node tree is rebuilt from the object arena (not from `self.nodes`)
    /// so that in-memory mutations to objects are reflected on write.
    pub fn write(&self, options: &WriteOptions) -> Vec<u8> {
        let mut arena: Vec<Node> = Vec::new();
        let mut roots: Vec<NodeId> = Vec::new();

        roots.push(push_node(&mut arena, leaf(FBX_HEADER_EXTENSION, Vec::new())));
        self.build_header_extension(&mut arena, *roots.last().unwrap(), options);

        roots.push(self.build_file_id(&mut arena));
        roots.push(self.build_creation_time(&mut arena));
        roots.push(self.build_creator(&mut arena));
        roots.push(self.build_global_settings(&mut arena));
        roots.push(self.build_documents(&mut arena));
        roots.push(push_node(&mut arena, Node::new(REFERENCES)));
        roots.push(self.build_definitions(&mut arena));
        roots.push(self.build_objects(&mut arena, options));
        roots.push(self.build_connections(&mut arena));
        roots.push(self.build_takes(&mut arena));

        let mut w = ByteWriter::new();
        w.write_bytes(FBX_MAGIC);
        w.write_u32(options.version);

        let mut offset = 27u64;
        for &root in &roots {
            write_node(root, &arena, offset, &mut w, options.compress_arrays);
            offset += node::node_size(root, &arena, options.compress_arrays);
        }
        node::write_null_node(&mut w);

        write_footer(&mut w, options.version);
        w.into_bytes()
    }

    fn build_header_extension(&self, arena: &mut Vec<Node>, header_id: NodeId, options: &WriteOptions) {
        let mut n = std::mem::replace(&mut arena[header_id.0 as usize], Node::new(FBX_HEADER_EXTENSION));
        n.properties.clear();
        n.children.push(push_node(arena, leaf("FBXHeaderVersion", vec![Property::Int32(1003)])));
        n.children.push(push_node(arena, leaf("FBXVersion", vec![Property::Int32(options.version as i32)])));
        n.children.push(push_node(arena, leaf("EncryptionType", vec![Property::Int32(0)])));

        let mut stamp = Node::new("CreationTimeStamp");
        for (field, value) in [("Version", 1000), ("Year", 0), ("Month", 0), ("Day", 0), ("Hour", 0), ("Minute", 0), ("Second", 0), ("Millisecond", 0)] {
            let child = push_node(arena, leaf(field, vec![Property::Int32(value)]));
            stamp.children.push(child);
        }
        n.children.push(push_node(arena, stamp));

        n.children.push(push_node(arena, leaf("Creator", vec![Property::String(CREATOR_STRING.as_bytes().to_vec())])));

        let mut scene_info = Node::new(SCENE_INFO);
        scene_info.properties.push(Property::String(b"SceneInfo::GlobalInfo".to_vec()));
        scene_info.properties.push(Property::String(b"UserData".to_vec()));
        scene_info.children.push(push_node(arena, Node::new("Type")));
        scene_info.children.push(push_node(arena, leaf(VERSION, vec![Property::Int32(100)])));
        scene_info.children.push(push_node(arena, Node::new(META_DATA)));
        scene_info.children.push(push_node(arena, Node::new(PROPERTIES70)));
        n.children.push(push_node(arena, scene_info));

        arena[header_id.0 as usize] = n;
    }

    fn build_file_id(&self, arena: &mut Vec<Node>) -> NodeId {
        push_node(arena, leaf(FILE_ID, vec![Property::Blob(FILE_ID_BLOB.to_vec())]))
    }

    fn build_creation_time(&self, arena: &mut Vec<Node>) -> NodeId {
        push_node(arena, leaf(CREATION_TIME, vec![Property::String(CREATION_TIME_STRING.as_bytes().to_vec())]))
    }

    fn build_creator(&self, arena: &mut Vec<Node>) -> NodeId {
        push_node(arena, leaf(CREATOR, vec![Property::String(CREATOR_STRING.as_bytes().to_vec())]))
    }

    fn build_global_settings(&self, arena: &mut Vec<Node>) -> NodeId {
        let mut n = Node::new(GLOBAL_SETTINGS);
        n.children.push(push_node(arena, leaf(VERSION, vec![Property::Int32(1000)])));
        let mut p70 = Node::new(PROPERTIES70);
        let entries: &[(&str, &str, Property)] = &[
            ("UpAxis", "int", Property::Int32(1)),
            ("UpAxisSign", "int", Property::Int32(1)),
            ("FrontAxis", "int", Property::Int32(2)),
            ("FrontAxisSign", "int", Property::Int32(1)),
            ("CoordAxis", "int", Property::Int32(0)),
            ("CoordAxisSign", "int", Property::Int32(1)),
            ("OriginalUpAxis", "int", Property::Int32(-1)),
            ("OriginalUpAxisSign", "int", Property::Int32(1)),
            ("UnitScaleFactor", "double", Property::Float64(1.0)),
            ("OriginalUnitScaleFactor", "double", Property::Float64(1.0)),
            ("TimeMode", "enum", Property::Int32(0)),
            ("TimeProtocol", "enum", Property::Int32(2)),
            ("SnapOnFrameMode", "enum", Property::Int32(0)),
            ("TimeSpanStart", "KTime", Property::Int64(0)),
            ("TimeSpanStop", "KTime", Property::Int64(TICKS_PER_SECOND)),
            ("CustomFrameRate", "double", Property::Float64(-1.0)),
        ];
        for (name, ty, value) in entries {
            let p = property_node(name, ty, vec![value.clone()]);
            p70.children.push(push_node(arena, p));
        }
        p70.children.push(push_node(arena, leaf_p("DefaultCamera", "KString", vec![Property::String(b"Producer Perspective".to_vec())])));
        p70.children.push(push_node(arena, leaf_p("AmbientColor", "ColorRGB", vec![Property::Float64(0.0), Property::Float64(0.0), Property::Float64(0.0)])));
        n.children.push(push_node(arena, p70));
        push_node(arena, n)
    }

    fn build_documents(&self, arena: &mut Vec<Node>) -> NodeId {
        let mut n = Node::new(DOCUMENTS);
        n.children.push(push_node(arena, leaf(COUNT, vec![Property::Int32(1)])));
        let mut doc = Node::new(DOCUMENT);
        doc.properties.push(Property::Int64(1));
        doc.properties.push(Property::String(b"My Scene".to_vec()));
        doc.properties.push(Property::String(b"Scene".to_vec()));
        let mut p70 = Node::new(PROPERTIES70);
        p70.children.push(push_node(arena, leaf_p("SourceObject", "object", Vec::new())));
        p70.children.push(push_node(arena, leaf_p("ActiveAnimStackName", "KString", vec![Property::String(b"".to_vec())])));
        doc.children.push(push_node(arena, p70));
        doc.children.push(push_node(arena, leaf("RootNode", vec![Property::Int64(self.object(self.root_model).id as i64)])));
        n.children.push(push_node(arena, doc));
        push_node(arena, n)
    }

    fn build_definitions(&self, arena: &mut Vec<Node>) -> NodeId {
        let mut n = Node::new(DEFINITIONS);
        n.children.push(push_node(arena, leaf(VERSION, vec![Property::Int32(100)])));

        let classes = [
            ObjectClass::NodeAttribute,
            ObjectClass::Model,
            ObjectClass::Geometry,
            ObjectClass::Deformer,
            ObjectClass::Pose,
            ObjectClass::AnimationStack,
            ObjectClass::AnimationLayer,
            ObjectClass::AnimationCurveNode,
            ObjectClass::AnimationCurve,
            ObjectClass::Material,
        ];
        let mut total = 1; // GlobalSettings is always counted once
        for class in classes {
            let count = self.objects.iter().filter(|o| o.class == class).count() as i32;
            total += count;
            let mut t = Node::new(OBJECT_TYPE);
            t.properties.push(Property::String(class.name().as_bytes().to_vec()));
            t.children.push(push_node(arena, leaf(COUNT, vec![Property::Int32(count)])));
            n.children.push(push_node(arena, t));
        }
        n.children.insert(1, push_node(arena, leaf(COUNT, vec![Property::Int32(total)])));
        push_node(arena, n)
    }

    fn build_objects(&self, arena: &mut Vec<Node>, options: &WriteOptions) -> NodeId {
        let mut n = Node::new(OBJECTS);
        for obj in self.objects.iter().filter(|o| o.id != 0) {
            let node = self.object_to_node(obj, arena, options);
            n.children.push(push_node(arena, node));
        }
        push_node(arena, n)
    }

    fn object_to_node(&self, obj: &Object, arena: &mut Vec<Node>, options: &WriteOptions) -> Node {
        let mut node = Node::new(obj.class.name());
        node.properties.push(Property::Int64(obj.id as i64));
        node.properties.push(Property::String(format!("{}{}{}", obj.name, NAME_CLASS_SEP, obj.class.name()).into_bytes()));
        node.properties.push(Property::String(obj.subclass.name().as_bytes().to_vec()));

        match &obj.data {
            ObjectData::Model(m) => self.fill_model_node(&mut node, m, arena),
            ObjectData::GeomMesh(g) => self.fill_geom_mesh_node(&mut node, g, arena),
            ObjectData::Shape(s) => self.fill_shape_node(&mut node, s, arena),
            ObjectData::Cluster(c) => self.fill_cluster_node(&mut node, c, arena),
            ObjectData::BlendShapeChannel(c) => self.fill_blend_channel_node(&mut node, c, arena),
            ObjectData::BindPose(p) => self.fill_bind_pose_node(&mut node, p, arena),
            ObjectData::AnimationStack(s) => self.fill_anim_stack_node(&mut node, s, options, arena),
            ObjectData::AnimationCurve(c) => self.fill_anim_curve_node(&mut node, c, arena),
            _ => {}
        }
        node
    }

    fn fill_model_node(&self, node: &mut Node, m: &ModelData, arena: &mut Vec<Node>) {
        let mut p70 = Node::new(PROPERTIES70);
        p70.children.push(push_node(arena, vec3_property(LCL_TRANSLATION, m.position)));
        p70.children.push(push_node(arena, vec3_property(LCL_ROTATION, m.rotation)));
        p70.children.push(push_node(arena, vec3_property(LCL_SCALING, m.scale)));
        if m.pre_rotation != Vector3::zeros() {
            p70.children.push(push_node(arena, vec3_property(PRE_ROTATION, m.pre_rotation)));
        }
        if m.post_rotation != Vector3::zeros() {
            p70.children.push(push_node(arena, vec3_property(POST_ROTATION, m.post_rotation)));
        }
        p70.children.push(push_node(arena, leaf_p(ROTATION_ORDER, "enum", vec![Property::Int32(m.rotation_order as i32)])));
        p70.children.push(push_node(arena, leaf_p(VISIBILITY, "Visibility", vec![Property::Float64(if m.visibility { 1.0 } else { 0.0 })])));
        if let Some(focal_length) = m.focal_length {
            p70.children.push(push_node(arena, leaf_p(FOCAL_LENGTH, "Number", vec![Property::Float64(focal_length as f64)])));
        }
        node.children.push(push_node(arena, p70));
    }

    fn fill_geom_mesh_node(&self, node: &mut Node, g: &GeomMeshData, arena: &mut Vec<Node>) {
        node.children.push(push_node(arena, leaf(GEOMETRY_VERSION, vec![Property::Int32(124)])));
        let points: Vec<f64> = g.points.iter().flat_map(|v| [v.x as f64, v.y as f64, v.z as f64]).collect();
        node.children.push(push_node(arena, array_node(VERTICES, Property::Float64Array(points))));
        let raw_indices = GeomMeshData::encode_polygon_vertex_index(&g.counts, &g.indices);
        node.children.push(push_node(arena, array_node(POLYGON_VERTEX_INDEX, Property::Int32Array(raw_indices))));

        let polygon_vertex_count = g.indices.len();
        let control_point_count = g.points.len();

        for (i, layer) in g.normal_layers.iter().enumerate() {
            let mut l = Node::new(LAYER_ELEMENT_NORMAL);
            l.properties.push(Property::Int32(i as i32));
            l.children.push(push_node(arena, leaf(NAME, vec![Property::String(layer.name.as_bytes().to_vec())])));
            push_layer_mode_nodes(&mut l, layer, polygon_vertex_count, control_point_count, arena);
            let flat: Vec<f64> = layer.data.iter().flat_map(|v| [v.x as f64, v.y as f64, v.z as f64]).collect();
            l.children.push(push_node(arena, array_node(NORMALS, Property::Float64Array(flat))));
            if layer.reference_mode() == ReferenceMode::IndexToDirect {
                l.children.push(push_node(arena, leaf(NORMALS_INDEX, vec![Property::Int32Array(layer.indices.clone())])));
            }
            node.children.push(push_node(arena, l));
        }
        for (i, layer) in g.uv_layers.iter().enumerate() {
            let mut l = Node::new(LAYER_ELEMENT_UV);
            l.properties.push(Property::Int32(i as i32));
            l.children.push(push_node(arena, leaf(NAME, vec![Property::String(layer.name.as_bytes().to_vec())])));
            push_layer_mode_nodes(&mut l, layer, polygon_vertex_count, control_point_count, arena);
            let flat: Vec<f64> = layer.data.iter().flat_map(|v| [v[0], v[1]]).collect();
            l.children.push(push_node(arena, array_node(UV, Property::Float64Array(flat))));
            if layer.reference_mode() == ReferenceMode::IndexToDirect {
                l.children.push(push_node(arena, leaf(UV_INDEX, vec![Property::Int32Array(layer.indices.clone())])));
            }
            node.children.push(push_node(arena, l));
        }
        for (i, layer) in g.color_layers.iter().enumerate() {
            let mut l = Node::new(LAYER_ELEMENT_COLOR);
            l.properties.push(Property::Int32(i as i32));
            l.children.push(push_node(arena, leaf(NAME, vec![Property::String(layer.name.as_bytes().to_vec())])));
            push_layer_mode_nodes(&mut l, layer, polygon_vertex_count, control_point_count, arena);
            let flat: Vec<f64> = layer.data.iter().flat_map(|v| [v[0], v[1], v[2], v[3]]).collect();
            l.children.push(push_node(arena, array_node(COLORS, Property::Float64Array(flat))));
            if layer.reference_mode() == ReferenceMode::IndexToDirect {
                l.children.push(push_node(arena, leaf(COLOR_INDEX, vec![Property::Int32Array(layer.indices.clone())])));
            }
            node.children.push(push_node(arena, l));
        }
    }

    fn fill_shape_node(&self, node: &mut Node, s: &ShapeData, arena: &mut Vec<Node>) {
        node.children.push(push_node(arena, leaf(INDEXES, vec![Property::Int32Array(s.indices.clone())])));
        let points: Vec<f64> = s.delta_points.iter().flat_map(|v| [v.x as f64, v.y as f64, v.z as f64]).collect();
        node.children.push(push_node(arena, leaf(VERTICES, vec![Property::Float64Array(points)])));
        let normals: Vec<f64> = s.delta_normals.iter().flat_map(|v| [v.x as f64, v.y as f64, v.z as f64]).collect();
        node.children.push(push_node(arena, leaf(NORMALS, vec![Property::Float64Array(normals)])));
    }

    fn fill_cluster_node(&self, node: &mut Node, c: &ClusterData, arena: &mut Vec<Node>) {
        node.children.push(push_node(arena, leaf(INDEXES, vec![Property::Int32Array(c.indices.clone())])));
        node.children.push(push_node(arena, leaf(WEIGHTS, vec![Property::Float64Array(c.weights.clone())])));
        node.children.push(push_node(arena, leaf(TRANSFORM, vec![Property::Float64Array(matrix_to_16(&c.transform))])));
        node.children.push(push_node(arena, leaf(TRANSFORM_LINK, vec![Property::Float64Array(matrix_to_16(&c.transform_link))])));
    }

    fn fill_blend_channel_node(&self, node: &mut Node, c: &BlendShapeChannelData, arena: &mut Vec<Node>) {
        node.children.push(push_node(arena, leaf(DEFORM_PERCENT, vec![Property::Float64(c.weight * 100.0)])));
        let full_weights: Vec<f64> = c.shapes.iter().map(|(_, w)| *w).collect();
        node.children.push(push_node(arena, leaf(FULL_WEIGHTS, vec![Property::Float64Array(full_weights)])));
    }

    fn fill_bind_pose_node(&self, node: &mut Node, p: &BindPoseData, arena: &mut Vec<Node>) {
        node.properties.push(Property::String(b"Pose::BindPose".to_vec()));
        node.children.push(push_node(arena, leaf(TYPE, vec![Property::String(b"BindPose".to_vec())])));
        node.children.push(push_node(arena, leaf(VERSION, vec![Property::Int32(100)])));
        node.children.push(push_node(arena, leaf(NB_POSE_NODES, vec![Property::Int32(p.joints.len() as i32)])));
        for (joint, matrix) in &p.joints {
            let mut pn = Node::new(POSE_NODE);
            pn.children.push(push_node(arena, leaf(NODE, vec![Property::Int64(self.object(*joint).id as i64)])));
            pn.children.push(push_node(arena, leaf(MATRIX, vec![Property::Float64Array(matrix_to_16(matrix))])));
            node.children.push(push_node(arena, pn));
        }
    }

    fn fill_anim_stack_node(&self, node: &mut Node, s: &AnimationStackData, options: &WriteOptions, arena: &mut Vec<Node>) {
        let _ = options;
        let mut p70 = Node::new(PROPERTIES70);
        for (name, secs) in [
            ("LocalStart", s.local_start_secs),
            ("LocalStop", s.local_stop_secs),
            ("ReferenceStart", s.reference_start_secs),
            ("ReferenceStop", s.reference_stop_secs),
        ] {
            let ticks = crate::animation::seconds_to_ticks(secs);
            p70.children.push(push_node(arena, leaf_p(name, "KTime", vec![Property::Int64(ticks)])));
        }
        node.children.push(push_node(arena, p70));
    }

    fn fill_anim_curve_node(&self, node: &mut Node, c: &AnimationCurveData, arena: &mut Vec<Node>) {
        node.children.push(push_node(arena, leaf(DEFAULT, vec![Property::Float32(c.default)])));
        node.children.push(push_node(arena, leaf(KEY_VER, vec![Property::Int32(4009)])));
        let times: Vec<i64> = c.times.iter().map(|&t| crate::animation::seconds_to_ticks(t as f64)).collect();
        node.children.push(push_node(arena, leaf(KEY_TIME, vec![Property::Int64Array(times)])));
        node.children.push(push_node(arena, leaf(KEY_VALUE_FLOAT, vec![Property::Float32Array(c.values.clone())])));
        node.children.push(push_node(arena, leaf(KEY_ATTR_FLAGS, vec![Property::Int32Array(vec![24836])])));
        node.children.push(push_node(arena, leaf(KEY_ATTR_DATA_FLOAT, vec![Property::Float32Array(vec![0.0, 0.0, 0.0, 0.0])])));
        node.children.push(push_node(arena, leaf(KEY_ATTR_REF_COUNT, vec![Property::Int32Array(vec![c.times.len() as i32])])));
    }

    fn build_connections(&self, arena: &mut Vec<Node>) -> NodeId {
        let mut n = Node::new(CONNECTIONS);
        for (i, obj) in self.objects.iter().enumerate() {
            if obj.id == 0 {
                continue;
            }
            let child_id = ObjectId(i as u32);
            // An AnimationCurveNode's `target` is an OP-derived parent (see
            // apply_op_connection), generically recorded in `obj.parents`
            // alongside its true OO parent (its AnimationLayer). It must be
            // emitted only once, as OP below, not again here as OO.
            let op_target = match &obj.data {
                ObjectData::AnimationCurveNode(data) => data.target,
                _ => None,
            };
            for &parent in &obj.parents {
                if op_target == Some(parent) {
                    continue;
                }
                let mut c = leaf(OO, vec![Property::Int64(obj.id as i64), Property::Int64(self.object(parent).id as i64)]);
                c.name = OO.to_string();
                n.children.push(push_node(arena, c));
            }
            if let ObjectData::AnimationCurveNode(data) = &obj.data {
                if let Some(target) = data.target {
                    let prop_name = match data.kind {
                        AnimationKind::Position => LCL_TRANSLATION,
                        AnimationKind::Rotation => LCL_ROTATION,
                        AnimationKind::Scale => LCL_SCALING,
                        AnimationKind::DeformWeight => DEFORM_PERCENT,
                        AnimationKind::FocalLength => FOCAL_LENGTH,
                        AnimationKind::Unknown => "",
                    };
                    let c = leaf(OP, vec![
                        Property::Int64(child_id.0 as i64),
                        Property::Int64(self.object(target).id as i64),
                        Property::String(prop_name.as_bytes().to_vec()),
                    ]);
                    n.children.push(push_node(arena, c));
                }
            }
        }
        push_node(arena, n)
    }

    fn build_takes(&self, arena: &mut Vec<Node>) -> NodeId {
        let mut n = Node::new(TAKES);
        let current_name = self.current_take.map(|id| self.object(id).name.clone()).unwrap_or_default();
        n.children.push(push_node(arena, leaf(CURRENT, vec![Property::String(current_name.into_bytes())])));
        for &stack_id in &self.anim_stacks {
            let stack = self.object(stack_id);
            let ObjectData::AnimationStack(data) = &stack.data else { continue };
            let mut take = Node::new(TAKE);
            take.properties.push(Property::String(stack.name.as_bytes().to_vec()));
            take.children.push(push_node(arena, leaf(FILE_NAME, vec![Property::String(format!("{}.tak", stack.name).into_bytes())])));
            if Some(stack_id) == self.current_take && (data.local_stop_secs != 0.0 || data.local_start_secs != 0.0) {
                let start = crate::animation::seconds_to_ticks(data.local_start_secs);
                let stop = crate::animation::seconds_to_ticks(data.local_stop_secs);
                take.children.push(push_node(arena, leaf(LOCAL_TIME, vec![Property::Int64(start), Property::Int64(stop)])));
                take.children.push(push_node(arena, leaf(REFERENCE_TIME, vec![Property::Int64(start), Property::Int64(stop)])));
            }
            n.children.push(push_node(arena, take));
        }
        push_node(arena, n)
    }

    /// Textual ASCII dump of this Document.
    pub fn dump_ascii(&self) -> String {
        crate::dump::dump_ascii(self.version, &self.roots, &self.nodes)
    }

    /// Re-targets `other`'s single `AnimationStack` curve-node targets to
    /// this Document's objects by display name, adopting it as the current
    /// take on success. Fails atomically if any target has no unique match.
    pub fn remap(&mut self, other: &Document) -> Result<()> {
        let Some(&stack_id) = other.anim_stacks.first() else {
            return Err(FbxError::RemapFailed("no AnimationStack in source document".into()));
        };
        let stack = other.object(stack_id);
        let ObjectData::AnimationStack(stack_data) = &stack.data else {
            return Err(FbxError::RemapFailed(stack.name.clone()));
        };

        let mut resolved: Vec<(ObjectId, ObjectId)> = Vec::new();
        for &layer_id in &stack_data.layers {
            let ObjectData::AnimationLayer(layer_data) = &other.object(layer_id).data else { continue };
            for &cn_id in &layer_data.curve_nodes {
                let ObjectData::AnimationCurveNode(cn_data) = &other.object(cn_id).data else { continue };
                let Some(target) = cn_data.target else { continue };
                let target_name = &other.object(target).name;
                match self.find_object_by_name(target_name) {
                    Some(local_id) => resolved.push((cn_id, local_id)),
                    None => return Err(FbxError::RemapFailed(target_name.clone())),
                }
            }
        }

        let base = self.objects.len() as u32;
        for obj in &other.objects {
            if obj.id == 0 {
                continue;
            }
            self.objects.push(obj.clone());
        }
        let shift = |id: ObjectId| ObjectId(id.0 + base);
        for obj in self.objects.iter_mut().skip(base as usize) {
            obj.parents = obj.parents.iter().map(|&p| shift(p)).collect();
            obj.children = obj.children.iter().map(|&c| shift(c)).collect();
            match &mut obj.data {
                ObjectData::AnimationStack(data) => {
                    data.layers = data.layers.iter().map(|&id| shift(id)).collect();
                }
                ObjectData::AnimationLayer(data) => {
                    data.curve_nodes = data.curve_nodes.iter().map(|&id| shift(id)).collect();
                }
                ObjectData::AnimationCurveNode(data) => {
                    data.curves = data.curves.iter().map(|&id| shift(id)).collect();
                    data.layer = data.layer.map(shift);
                    data.target = data.target.map(shift);
                }
                ObjectData::Skin(data) => {
                    data.clusters = data.clusters.iter().map(|&id| shift(id)).collect();
                }
                ObjectData::Cluster(data) => {
                    data.joint = data.joint.map(shift);
                }
                ObjectData::BlendShape(data) => {
                    data.channels = data.channels.iter().map(|&id| shift(id)).collect();
                }
                ObjectData::BlendShapeChannel(data) => {
                    data.shapes = data.shapes.iter().map(|&(id, w)| (shift(id), w)).collect();
                }
                ObjectData::BindPose(data) => {
                    data.joints = data.joints.iter().map(|&(id, m)| (shift(id), m)).collect();
                }
                _ => {}
            }
        }
        for (other_cn, local_target) in resolved {
            let shifted = ObjectId(other_cn.0 + base);
            if let ObjectData::AnimationCurveNode(data) = &mut self.object_mut(shifted).data {
                data.target = Some(local_target);
            }
        }

        let new_stack_id = ObjectId(stack_id.0 + base);
        self.anim_stacks.push(new_stack_id);
        self.current_take = Some(new_stack_id);
        Ok(())
    }

    /// Evaluates `curve_node_id` at time `t` (seconds) and mutates its
    /// target accordingly: Position/Rotation/Scale on a `Model`,
    /// DeformWeight on a `BlendShapeChannel`, FocalLength on a `Model`'s
    /// optional Camera field. An unresolved target or a kind/target type
    /// mismatch is a no-op plus a pushed diagnostic.
    pub fn apply_animation_curve_node(&mut self, curve_node_id: ObjectId, t: f32, sink: &mut DiagnosticSink) {
        let ObjectData::AnimationCurveNode(data) = &self.object(curve_node_id).data else {
            return;
        };
        let kind = data.kind;
        let curve_ids = data.curves.clone();
        let Some(target) = data.target else {
            sink.push(Diagnostic::AnimationApplyNoOp { kind });
            return;
        };

        // Evaluates one component curve by id, owned `f32` so the borrow of
        // `self` this closure needs doesn't outlive the mutable borrow below.
        let curve_value = |id: ObjectId| match &self.object(id).data {
            ObjectData::AnimationCurve(c) => c.evaluate(t),
            _ => 0.0,
        };

        match kind {
            AnimationKind::Position | AnimationKind::Rotation | AnimationKind::Scale => {
                let v = Vector3::new(
                    curve_ids.first().map(|&id| curve_value(id)).unwrap_or(0.0),
                    curve_ids.get(1).map(|&id| curve_value(id)).unwrap_or(0.0),
                    curve_ids.get(2).map(|&id| curve_value(id)).unwrap_or(0.0),
                );
                match self.object_mut(target).model_mut() {
                    Some(model) => match kind {
                        AnimationKind::Position => model.position = v,
                        AnimationKind::Rotation => model.rotation = v,
                        AnimationKind::Scale => model.scale = v,
                        _ => unreachable!(),
                    },
                    None => sink.push(Diagnostic::AnimationApplyNoOp { kind }),
                }
            }
            AnimationKind::DeformWeight => {
                let value = curve_ids.first().map(|&id| curve_value(id)).unwrap_or(0.0);
                match &mut self.object_mut(target).data {
                    ObjectData::BlendShapeChannel(channel) => channel.set_weight(value as f64),
                    _ => sink.push(Diagnostic::AnimationApplyNoOp { kind }),
                }
            }
            AnimationKind::FocalLength => {
                let value = curve_ids.first().map(|&id| curve_value(id)).unwrap_or(0.0);
                match self.object_mut(target).model_mut() {
                    Some(model) => model.focal_length = Some(value),
                    None => sink.push(Diagnostic::AnimationApplyNoOp { kind }),
                }
            }
            AnimationKind::Unknown => sink.push(Diagnostic::AnimationApplyNoOp { kind }),
        }
    }

    /// Applies every curve node reachable via this stack's layers at time
    /// `t` (seconds).
    pub fn apply_animation_stack(&mut self, stack_id: ObjectId, t: f32, sink: &mut DiagnosticSink) {
        let ObjectData::AnimationStack(data) = &self.object(stack_id).data else {
            return;
        };
        let layers = data.layers.clone();
        for layer_id in layers {
            let ObjectData::AnimationLayer(layer_data) = &self.object(layer_id).data else {
                continue;
            };
            let curve_nodes = layer_data.curve_nodes.clone();
            for curve_node_id in curve_nodes {
                self.apply_animation_curve_node(curve_node_id, t, sink);
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// ---- free helpers ---------------------------------------------------------

fn push_node(arena: &mut Vec<Node>, n: Node) -> NodeId {
    let id = NodeId(arena.len() as u32);
    arena.push(n);
    id
}

fn leaf(name: &str, properties: Vec<Property>) -> Node {
    Node { name: name.to_string(), properties, children: Vec::new() }
}

/// Pushes `MappingInformationType`/`ReferenceInformationType` leaves onto a
/// `LayerElementNormal`/`LayerElementUV`/`LayerElementColor` node, inferred
/// from the layer's data/index shape the same way the writer infers it on
/// read.
fn push_layer_mode_nodes<T>(
    l: &mut Node,
    layer: &LayerElement<T>,
    polygon_vertex_count: usize,
    control_point_count: usize,
    arena: &mut Vec<Node>,
) {
    let mapping = match layer.mapping_mode(polygon_vertex_count, control_point_count) {
        MappingMode::ByPolygonVertex => BY_POLYGON_VERTEX,
        MappingMode::ByControlPoint => BY_CONTROL_POINT,
    };
    let reference = match layer.reference_mode() {
        ReferenceMode::Direct => DIRECT,
        ReferenceMode::IndexToDirect => INDEX_TO_DIRECT,
    };
    l.children.push(push_node(arena, leaf(MAPPING_INFORMATION_TYPE, vec![Property::String(mapping.as_bytes().to_vec())])));
    l.children.push(push_node(arena, leaf(REFERENCE_INFORMATION_TYPE, vec![Property::String(reference.as_bytes().to_vec())])));
}

/// A `Properties70`/`P` leaf: name, type string, two empty flag slots, then
/// zero or more trailing values (most types carry one; `ColorRGB`/`Vector3D`
/// etc. carry three).
fn leaf_p(name: &str, ty: &str, values: Vec<Property>) -> Node {
    property_node(name, ty, values)
}

fn property_node(name: &str, ty: &str, values: Vec<Property>) -> Node {
    let mut props = vec![
        Property::String(name.as_bytes().to_vec()),
        Property::String(ty.as_bytes().to_vec()),
        Property::String(Vec::new()),
        Property::String(Vec::new()),
    ];
    props.extend(values);
    Node { name: P.to_string(), properties: props, children: Vec::new() }
}

fn vec3_property(name: &str, v: Vector3<f32>) -> Node {
    let mut props = vec![
        Property::String(name.as_bytes().to_vec()),
        Property::String(b"Vector3D".to_vec()),
        Property::String(Vec::new()),
        Property::String(Vec::new()),
        Property::Float64(v.x as f64),
        Property::Float64(v.y as f64),
        Property::Float64(v.z as f64),
    ];
    let _ = &mut props;
    Node { name: P.to_string(), properties: props, children: Vec::new() }
}

fn array_node(name: &str, prop: Property) -> Node {
    let mut n = Node::new(name);
    n.properties.push(prop);
    n
}

fn find_properties70(node_id: NodeId, arena: &[Node]) -> Option<NodeId> {
    find_child(node_id, PROPERTIES70, arena)
}

fn find_child(node_id: NodeId, name: &str, arena: &[Node]) -> Option<NodeId> {
    arena[node_id.0 as usize].children.iter().copied().find(|&c| arena[c.0 as usize].name == name)
}

/// Extracts the numeric value tail of a `P` entry's properties (after name,
/// type, and the two flag slots).
fn p_numeric_values(properties: &[Property]) -> Vec<f64> {
    properties
        .iter()
        .skip(4)
        .filter_map(|p| match p {
            Property::Float64(v) => Some(*v),
            Property::Float32(v) => Some(*v as f64),
            Property::Int32(v) => Some(*v as f64),
            Property::Int64(v) => Some(*v as f64),
            _ => None,
        })
        .collect()
}

fn vec3_from(values: &[f64]) -> Vector3<f32> {
    Vector3::new(
        values.first().copied().unwrap_or(0.0) as f32,
        values.get(1).copied().unwrap_or(0.0) as f32,
        values.get(2).copied().unwrap_or(0.0) as f32,
    )
}

fn matrix_from_16(arr: &[f64]) -> Matrix4<f64> {
    if arr.len() < 16 {
        return Matrix4::identity();
    }
    Matrix4::from_row_slice(&arr[..16])
}

fn matrix_to_16(m: &Matrix4<f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(16);
    for r in 0..4 {
        for c in 0..4 {
            out.push(m[(r, c)]);
        }
    }
    out
}

fn verify_footer(tail: &[u8]) -> Result<()> {
    if tail.len() < FOOTER_MAGIC1.len() || tail[..FOOTER_MAGIC1.len()] != FOOTER_MAGIC1 {
        return Err(FbxError::BadMagic);
    }
    if tail.len() < FOOTER_MAGIC2.len() || tail[tail.len() - FOOTER_MAGIC2.len()..] != FOOTER_MAGIC2 {
        return Err(FbxError::BadMagic);
    }
    Ok(())
}

fn write_footer(w: &mut ByteWriter, version: u32) {
    w.write_bytes(&FOOTER_MAGIC1);
    let pad = 16 - (w.len() % 16);
    let pad = if pad == 0 { 16 } else { pad };
    for _ in 0..pad {
        w.write_u8(0);
    }
    w.write_u32(0);
    w.write_u32(version);
    for _ in 0..120 {
        w.write_u8(0);
    }
    w.write_bytes(&FOOTER_MAGIC2);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_round_trips() {
        let doc = Document::new();
        let options = WriteOptions::default();
        let bytes = doc.write(&options);
        let (doc2, sink) = Document::read(&bytes, &ReadOptions::default()).unwrap();
        assert!(sink.is_empty());
        assert_eq!(doc2.objects.len(), 1);
        assert_eq!(doc2.object(doc2.root_model).name, "RootNode");
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = vec![0u8; 40];
        let err = Document::read(&bytes, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, FbxError::BadMagic));
    }

    #[test]
    fn version_ceiling_is_enforced() {
        let mut doc = Document::new();
        let mut options = WriteOptions::default();
        options.version = 8000;
        doc.version = 8000;
        let bytes = doc.write(&options);
        let err = Document::read(&bytes, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, FbxError::UnsupportedVersion(8000, 7700)));
    }

    #[test]
    fn model_transform_round_trips() {
        let mut doc = Document::new();
        let id = ObjectId(doc.objects.len() as u32);
        let mut model = ModelData::default();
        model.position = Vector3::new(1.0, 2.0, 3.0);
        model.rotation = Vector3::new(0.0, 90.0, 0.0);
        let mut obj = Object::new(1, "Bone", ObjectClass::Model, ObjectSubClass::LimbNode, ObjectData::Model(model));
        obj.parents.push(doc.root_model);
        doc.objects.push(obj);
        doc.object_mut(doc.root_model).children.push(id);

        let options = WriteOptions::default();
        let bytes = doc.write(&options);
        let (doc2, _sink) = Document::read(&bytes, &ReadOptions::default()).unwrap();
        let found = doc2.find_object_by_name("Bone").expect("Bone round-trips");
        let m = doc2.object(found).model().unwrap();
        assert!((m.position.x - 1.0).abs() < 1e-6);
        assert!((m.rotation.y - 90.0).abs() < 1e-6);
    }

    #[test]
    fn indexed_uv_layer_round_trips_mapping_and_indices() {
        use crate::geometry::LayerElement;

        let mut doc = Document::new();
        let id = ObjectId(doc.objects.len() as u32);
        let mut geom = GeomMeshData::default();
        geom.points = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
        geom.counts = vec![3];
        geom.indices = vec![0, 1, 2];
        geom.uv_layers.push(LayerElement {
            name: "UVMap".to_string(),
            data: vec![[0.0, 0.0], [1.0, 0.0]],
            indices: vec![0, 1, 0],
        });
        let obj = Object::new(1, "Mesh", ObjectClass::Geometry, ObjectSubClass::Mesh, ObjectData::GeomMesh(geom));
        doc.objects.push(obj);
        doc.object_mut(doc.root_model).children.push(id);

        let bytes = doc.write(&WriteOptions::default());
        let (doc2, sink) = Document::read(&bytes, &ReadOptions::default()).unwrap();
        assert!(sink.is_empty());
        let found = doc2.find_object_by_name("Mesh").expect("Mesh round-trips");
        let uv = &doc2.object(found).geom_mesh().unwrap().uv_layers[0];
        assert_eq!(uv.indices, vec![0, 1, 0]);
        assert_eq!(uv.reference_mode(), ReferenceMode::IndexToDirect);
    }

    #[test]
    fn compressed_write_round_trips_array_properties() {
        let mut doc = Document::new();
        let id = ObjectId(doc.objects.len() as u32);
        let mut geom = GeomMeshData::default();
        geom.points = vec![Vector3::new(1.0, 2.0, 3.0); 64];
        geom.counts = vec![geom.points.len() as i32];
        geom.indices = (0..geom.points.len() as i32).collect();
        let obj = Object::new(1, "Mesh", ObjectClass::Geometry, ObjectSubClass::Mesh, ObjectData::GeomMesh(geom.clone()));
        doc.objects.push(obj);
        doc.object_mut(doc.root_model).children.push(id);

        let mut options = WriteOptions::default();
        options.compress_arrays = true;
        let bytes = doc.write(&options);
        let (doc2, sink) = Document::read(&bytes, &ReadOptions::default()).unwrap();
        assert!(sink.is_empty());
        let found = doc2.find_object_by_name("Mesh").expect("Mesh round-trips");
        assert_eq!(doc2.object(found).geom_mesh().unwrap().points, geom.points);
    }

    #[test]
    fn local_time_is_only_emitted_for_the_current_take() {
        let mut doc = Document::new();
        let active = ObjectId(doc.objects.len() as u32);
        let mut active_stack = AnimationStackData::default();
        active_stack.local_start_secs = 0.0;
        active_stack.local_stop_secs = 1.0;
        doc.objects.push(Object::new(1, "Active", ObjectClass::AnimationStack, ObjectSubClass::None, ObjectData::AnimationStack(active_stack)));
        doc.anim_stacks.push(active);
        doc.current_take = Some(active);

        let inactive = ObjectId(doc.objects.len() as u32);
        let mut inactive_stack = AnimationStackData::default();
        inactive_stack.local_start_secs = 0.0;
        inactive_stack.local_stop_secs = 2.0;
        doc.objects.push(Object::new(2, "Inactive", ObjectClass::AnimationStack, ObjectSubClass::None, ObjectData::AnimationStack(inactive_stack)));
        doc.anim_stacks.push(inactive);

        let mut arena = Vec::new();
        let takes_id = doc.build_takes(&mut arena);
        let takes = &arena[takes_id.0 as usize];
        for &take_id in &takes.children {
            let take = &arena[take_id.0 as usize];
            let is_active = take.properties.first() == Some(&Property::String(b"Active".to_vec()));
            let has_local_time = take.children.iter().any(|&c| arena[c.0 as usize].name == LOCAL_TIME);
            assert_eq!(has_local_time, is_active);
        }
    }

    #[test]
    fn apply_animation_curve_node_sets_model_position() {
        let mut doc = Document::new();
        let target = ObjectId(doc.objects.len() as u32);
        doc.objects.push(Object::new(1, "Bone", ObjectClass::Model, ObjectSubClass::LimbNode, ObjectData::Model(ModelData::default())));

        let curve_x = ObjectId(doc.objects.len() as u32);
        doc.objects.push(Object::new(
            2,
            "",
            ObjectClass::AnimationCurve,
            ObjectSubClass::None,
            ObjectData::AnimationCurve(AnimationCurveData { times: vec![0.0], values: vec![5.0], default: 0.0 }),
        ));
        let curve_y = ObjectId(doc.objects.len() as u32);
        doc.objects.push(Object::new(
            3,
            "",
            ObjectClass::AnimationCurve,
            ObjectSubClass::None,
            ObjectData::AnimationCurve(AnimationCurveData { times: vec![0.0], values: vec![7.0], default: 0.0 }),
        ));
        let curve_node = ObjectId(doc.objects.len() as u32);
        doc.objects.push(Object::new(
            4,
            "",
            ObjectClass::AnimationCurveNode,
            ObjectSubClass::None,
            ObjectData::AnimationCurveNode(AnimationCurveNodeData {
                kind: AnimationKind::Position,
                curves: vec![curve_x, curve_y],
                layer: None,
                target: Some(target),
            }),
        ));

        let mut sink = DiagnosticSink::new();
        doc.apply_animation_curve_node(curve_node, 0.0, &mut sink);
        assert!(sink.is_empty());
        let model = doc.object(target).model().unwrap();
        assert_eq!(model.position.x, 5.0);
        assert_eq!(model.position.y, 7.0);
    }

    #[test]
    fn apply_animation_curve_node_diagnoses_unknown_kind() {
        let mut doc = Document::new();
        let target = ObjectId(doc.objects.len() as u32);
        doc.objects.push(Object::new(1, "Bone", ObjectClass::Model, ObjectSubClass::LimbNode, ObjectData::Model(ModelData::default())));
        let curve_node = ObjectId(doc.objects.len() as u32);
        doc.objects.push(Object::new(
            2,
            "",
            ObjectClass::AnimationCurveNode,
            ObjectSubClass::None,
            ObjectData::AnimationCurveNode(AnimationCurveNodeData { kind: AnimationKind::Unknown, curves: Vec::new(), layer: None, target: Some(target) }),
        ));

        let mut sink = DiagnosticSink::new();
        doc.apply_animation_curve_node(curve_node, 0.0, &mut sink);
        assert_eq!(sink.entries().len(), 1);
    }

    #[test]
    fn remap_shifts_object_ids_inside_deformer_data() {
        let mut a = Document::new();
        let mut b = Document::new();

        let b_joint = ObjectId(b.objects.len() as u32);
        b.objects.push(Object::new(10, "Joint", ObjectClass::Model, ObjectSubClass::LimbNode, ObjectData::Model(ModelData::default())));
        let b_cluster = ObjectId(b.objects.len() as u32);
        b.objects.push(Object::new(
            11,
            "Cluster",
            ObjectClass::Deformer,
            ObjectSubClass::Cluster,
            ObjectData::Cluster(ClusterData { joint: Some(b_joint), ..Default::default() }),
        ));
        let b_stack = ObjectId(b.objects.len() as u32);
        b.objects.push(Object::new(
            12,
            "Take",
            ObjectClass::AnimationStack,
            ObjectSubClass::None,
            ObjectData::AnimationStack(AnimationStackData::default()),
        ));
        b.anim_stacks.push(b_stack);

        let base = a.objects.len() as u32;
        a.remap(&b).unwrap();

        let shifted_cluster = a.object(ObjectId(b_cluster.0 + base));
        let ObjectData::Cluster(cluster_data) = &shifted_cluster.data else {
            panic!("expected Cluster data");
        };
        assert_eq!(cluster_data.joint, Some(ObjectId(b_joint.0 + base)));
    }
}
