//! `Object`: the base entity of the typed scene graph.
//!
//! Replaces the original's virtual
//! `constructObject`/`constructNodes`/`constructLinks`/`addChild` dispatch
//! with a tagged `(ObjectClass, ObjectSubClass)` pair plus a small dispatch
//! table (see `document::materialize_objects`), and stores inter-object
//! edges as arena indices (`ObjectId`) rather than `shared_ptr`s, grounded
//! on `sfbxObject.cpp`'s `GetFbxObjectType`/`GetFbxObjectSubType` name
//! tables.

use crate::animation::{AnimationCurveData, AnimationCurveNodeData, AnimationLayerData, AnimationStackData};
use crate::deformer::{BlendShapeChannelData, BlendShapeData, ClusterData, SkinData};
use crate::geometry::{GeomMeshData, ShapeData};
use crate::model::ModelData;
use crate::node::NodeId;
use crate::pose::BindPoseData;

/// Index into a [`crate::document::Document`]'s object arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    NodeAttribute,
    Model,
    Geometry,
    Deformer,
    Pose,
    Material,
    AnimationStack,
    AnimationLayer,
    AnimationCurveNode,
    AnimationCurve,
}

impl ObjectClass {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectClass::NodeAttribute => "NodeAttribute",
            ObjectClass::Model => "Model",
            ObjectClass::Geometry => "Geometry",
            ObjectClass::Deformer => "Deformer",
            ObjectClass::Pose => "Pose",
            ObjectClass::Material => "Material",
            ObjectClass::AnimationStack => "AnimStack",
            ObjectClass::AnimationLayer => "AnimLayer",
            ObjectClass::AnimationCurveNode => "AnimCurveNode",
            ObjectClass::AnimationCurve => "AnimCurve",
        }
    }

    pub fn from_name(n: &str) -> Option<Self> {
        Some(match n {
            "NodeAttribute" => ObjectClass::NodeAttribute,
            "Model" => ObjectClass::Model,
            "Geometry" => ObjectClass::Geometry,
            "Deformer" => ObjectClass::Deformer,
            "Pose" => ObjectClass::Pose,
            "Material" => ObjectClass::Material,
            "AnimStack" | "AnimationStack" => ObjectClass::AnimationStack,
            "AnimLayer" | "AnimationLayer" => ObjectClass::AnimationLayer,
            "AnimCurveNode" | "AnimationCurveNode" => ObjectClass::AnimationCurveNode,
            "AnimCurve" | "AnimationCurve" => ObjectClass::AnimationCurve,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSubClass {
    None,
    Null,
    Root,
    LimbNode,
    Mesh,
    Light,
    Camera,
    Shape,
    Skin,
    Cluster,
    BlendShape,
    BlendShapeChannel,
    BindPose,
}

impl ObjectSubClass {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectSubClass::None => "",
            ObjectSubClass::Null => "Null",
            ObjectSubClass::Root => "Root",
            ObjectSubClass::LimbNode => "LimbNode",
            ObjectSubClass::Mesh => "Mesh",
            ObjectSubClass::Light => "Light",
            ObjectSubClass::Camera => "Camera",
            ObjectSubClass::Shape => "Shape",
            ObjectSubClass::Skin => "Skin",
            ObjectSubClass::Cluster => "Cluster",
            ObjectSubClass::BlendShape => "BlendShape",
            ObjectSubClass::BlendShapeChannel => "BlendShapeChannel",
            ObjectSubClass::BindPose => "BindPose",
        }
    }

    pub fn from_name(n: &str) -> Self {
        match n {
            "Null" => ObjectSubClass::Null,
            "Root" => ObjectSubClass::Root,
            "LimbNode" => ObjectSubClass::LimbNode,
            "Mesh" => ObjectSubClass::Mesh,
            "Light" => ObjectSubClass::Light,
            "Camera" => ObjectSubClass::Camera,
            "Shape" => ObjectSubClass::Shape,
            "Skin" => ObjectSubClass::Skin,
            "Cluster" => ObjectSubClass::Cluster,
            "BlendShape" => ObjectSubClass::BlendShape,
            "BlendShapeChannel" => ObjectSubClass::BlendShapeChannel,
            "BindPose" => ObjectSubClass::BindPose,
            _ => ObjectSubClass::None,
        }
    }
}

/// The typed payload specific to a concrete (class, subclass) pair. Plays
/// the role the original's per-subclass virtual fields play, collapsed
/// into one tagged enum.
#[derive(Debug, Clone)]
pub enum ObjectData {
    Generic,
    NodeAttribute,
    Model(ModelData),
    GeomMesh(GeomMeshData),
    Shape(ShapeData),
    Skin(SkinData),
    Cluster(ClusterData),
    BlendShape(BlendShapeData),
    BlendShapeChannel(BlendShapeChannelData),
    BindPose(BindPoseData),
    Material,
    AnimationStack(AnimationStackData),
    AnimationLayer(AnimationLayerData),
    AnimationCurveNode(AnimationCurveNodeData),
    AnimationCurve(AnimationCurveData),
}

#[derive(Debug, Clone)]
pub struct Object {
    pub id: u64,
    pub name: String,
    pub class: ObjectClass,
    pub subclass: ObjectSubClass,
    pub node: Option<NodeId>,
    pub parents: Vec<ObjectId>,
    pub children: Vec<ObjectId>,
    pub data: ObjectData,
}

impl Object {
    pub fn new(id: u64, name: impl Into<String>, class: ObjectClass, subclass: ObjectSubClass, data: ObjectData) -> Self {
        Self {
            id,
            name: name.into(),
            class,
            subclass,
            node: None,
            parents: Vec::new(),
            children: Vec::new(),
            data,
        }
    }

    pub fn model(&self) -> Option<&ModelData> {
        match &self.data {
            ObjectData::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut ModelData> {
        match &mut self.data {
            ObjectData::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn geom_mesh(&self) -> Option<&GeomMeshData> {
        match &self.data {
            ObjectData::GeomMesh(g) => Some(g),
            _ => None,
        }
    }

    pub fn geom_mesh_mut(&mut self) -> Option<&mut GeomMeshData> {
        match &mut self.data {
            ObjectData::GeomMesh(g) => Some(g),
            _ => None,
        }
    }
}

/// Finds the (class, subclass) → concrete-behavior row for a parsed
/// `Objects` child. Unknown subclasses fall back to the generic behavior
/// for their class, matching "else generic".
pub fn default_data_for(class: ObjectClass, subclass: ObjectSubClass) -> ObjectData {
    match (class, subclass) {
        (ObjectClass::NodeAttribute, _) => ObjectData::NodeAttribute,
        (ObjectClass::Model, _) => ObjectData::Model(ModelData::default()),
        (ObjectClass::Geometry, ObjectSubClass::Mesh) => ObjectData::GeomMesh(GeomMeshData::default()),
        (ObjectClass::Geometry, ObjectSubClass::Shape) => ObjectData::Shape(ShapeData::default()),
        (ObjectClass::Geometry, _) => ObjectData::GeomMesh(GeomMeshData::default()),
        (ObjectClass::Deformer, ObjectSubClass::Skin) => ObjectData::Skin(SkinData::default()),
        (ObjectClass::Deformer, ObjectSubClass::Cluster) => ObjectData::Cluster(ClusterData::default()),
        (ObjectClass::Deformer, ObjectSubClass::BlendShape) => ObjectData::BlendShape(BlendShapeData::default()),
        (ObjectClass::Deformer, ObjectSubClass::BlendShapeChannel) => {
            ObjectData::BlendShapeChannel(BlendShapeChannelData::default())
        }
        (ObjectClass::Deformer, _) => ObjectData::Generic,
        (ObjectClass::Pose, ObjectSubClass::BindPose) => ObjectData::BindPose(BindPoseData::default()),
        (ObjectClass::Pose, _) => ObjectData::Generic,
        (ObjectClass::Material, _) => ObjectData::Material,
        (ObjectClass::AnimationStack, _) => ObjectData::AnimationStack(AnimationStackData::default()),
        (ObjectClass::AnimationLayer, _) => ObjectData::AnimationLayer(AnimationLayerData::default()),
        (ObjectClass::AnimationCurveNode, _) => ObjectData::AnimationCurveNode(AnimationCurveNodeData::default()),
        (ObjectClass::AnimationCurve, _) => ObjectData::AnimationCurve(AnimationCurveData::default()),
    }
}
