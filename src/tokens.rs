//! String constants for well-known node and property names.
//!
//! Kept as plain `&'static str` constants rather than an enum: nodes are
//! matched by name against arbitrary (and sometimes vendor-specific) FBX
//! files, so a closed enum would have to grow an `Other(String)` escape
//! hatch anyway.

pub const FBX_HEADER_EXTENSION: &str = "FBXHeaderExtension";
pub const GLOBAL_SETTINGS: &str = "GlobalSettings";
pub const DOCUMENTS: &str = "Documents";
pub const DOCUMENT: &str = "Document";
pub const REFERENCES: &str = "References";
pub const DEFINITIONS: &str = "Definitions";
pub const OBJECT_TYPE: &str = "ObjectType";
pub const COUNT: &str = "Count";
pub const OBJECTS: &str = "Objects";
pub const CONNECTIONS: &str = "Connections";
pub const TAKES: &str = "Takes";
pub const TAKE: &str = "Take";
pub const CURRENT: &str = "Current";
pub const FILE_NAME: &str = "FileName";
pub const LOCAL_TIME: &str = "LocalTime";
pub const REFERENCE_TIME: &str = "ReferenceTime";
pub const PROPERTIES70: &str = "Properties70";
pub const P: &str = "P";
pub const C: &str = "C";
pub const OO: &str = "OO";
pub const OP: &str = "OP";

pub const MODEL: &str = "Model";
pub const GEOMETRY: &str = "Geometry";
pub const NODE_ATTRIBUTE: &str = "NodeAttribute";
pub const DEFORMER: &str = "Deformer";
pub const POSE: &str = "Pose";
pub const MATERIAL: &str = "Material";
pub const ANIMATION_STACK: &str = "AnimationStack";
pub const ANIMATION_LAYER: &str = "AnimationLayer";
pub const ANIMATION_CURVE_NODE: &str = "AnimationCurveNode";
pub const ANIMATION_CURVE: &str = "AnimationCurve";

pub const NULL: &str = "Null";
pub const ROOT: &str = "Root";
pub const LIMB_NODE: &str = "LimbNode";
pub const MESH: &str = "Mesh";
pub const LIGHT: &str = "Light";
pub const CAMERA: &str = "Camera";
pub const SHAPE: &str = "Shape";
pub const SKIN: &str = "Skin";
pub const CLUSTER: &str = "Cluster";
pub const BLEND_SHAPE: &str = "BlendShape";
pub const BLEND_SHAPE_CHANNEL: &str = "BlendShapeChannel";
pub const BIND_POSE: &str = "BindPose";

pub const VERSION: &str = "Version";
pub const GEOMETRY_VERSION: &str = "GeometryVersion";
pub const VERTICES: &str = "Vertices";
pub const POLYGON_VERTEX_INDEX: &str = "PolygonVertexIndex";
pub const LAYER: &str = "Layer";
pub const LAYER_ELEMENT: &str = "LayerElement";
pub const TYPE: &str = "Type";
pub const TYPE_INDEX: &str = "TypeIndex";
pub const LAYER_ELEMENT_NORMAL: &str = "LayerElementNormal";
pub const LAYER_ELEMENT_UV: &str = "LayerElementUV";
pub const LAYER_ELEMENT_COLOR: &str = "LayerElementColor";
pub const NORMALS: &str = "Normals";
pub const NORMALS_INDEX: &str = "NormalsIndex";
pub const UV: &str = "UV";
pub const UV_INDEX: &str = "UVIndex";
pub const COLORS: &str = "Colors";
pub const COLOR_INDEX: &str = "ColorIndex";
pub const MAPPING_INFORMATION_TYPE: &str = "MappingInformationType";
pub const REFERENCE_INFORMATION_TYPE: &str = "ReferenceInformationType";
pub const BY_POLYGON_VERTEX: &str = "ByPolygonVertex";
pub const BY_CONTROL_POINT: &str = "ByControlPoint";
pub const DIRECT: &str = "Direct";
pub const INDEX_TO_DIRECT: &str = "IndexToDirect";
pub const NAME: &str = "Name";

pub const INDEXES: &str = "Indexes";
pub const WEIGHTS: &str = "Weights";
pub const TRANSFORM: &str = "Transform";
pub const TRANSFORM_LINK: &str = "TransformLink";
pub const DEFORM_PERCENT: &str = "DeformPercent";
pub const FULL_WEIGHTS: &str = "FullWeights";

pub const NB_POSE_NODES: &str = "NbPoseNodes";
pub const POSE_NODE: &str = "PoseNode";
pub const NODE: &str = "Node";
pub const MATRIX: &str = "Matrix";

pub const DEFAULT: &str = "Default";
pub const KEY_VER: &str = "KeyVer";
pub const KEY_TIME: &str = "KeyTime";
pub const KEY_VALUE_FLOAT: &str = "KeyValueFloat";
pub const KEY_ATTR_FLAGS: &str = "KeyAttrFlags";
pub const KEY_ATTR_DATA_FLOAT: &str = "KeyAttrDataFloat";
pub const KEY_ATTR_REF_COUNT: &str = "KeyAttrRefCount";
pub const FOCAL_LENGTH: &str = "FocalLength";

pub const LCL_TRANSLATION: &str = "Lcl Translation";
pub const LCL_ROTATION: &str = "Lcl Rotation";
pub const LCL_SCALING: &str = "Lcl Scaling";
pub const PRE_ROTATION: &str = "PreRotation";
pub const POST_ROTATION: &str = "PostRotation";
pub const ROTATION_ORDER: &str = "RotationOrder";
pub const ROTATION_ACTIVE: &str = "RotationActive";
pub const VISIBILITY: &str = "Visibility";
pub const DEFAULT_ATTRIBUTE_INDEX: &str = "DefaultAttributeIndex";

pub const FILE_ID: &str = "FileId";
pub const CREATION_TIME: &str = "CreationTime";
pub const CREATOR: &str = "Creator";
pub const SCENE_INFO: &str = "SceneInfo";
pub const META_DATA: &str = "MetaData";

/// Legacy display-name of the root model, used by pre-6000 `Connect OO`
/// name-based resolution.
pub const LEGACY_ROOT_MODEL_NAME: &str = "Scene\u{0}\u{1}Model";

/// Separator between an object's display name and its class tag.
pub const NAME_CLASS_SEP: &str = "\u{0}\u{1}";

/// FBX canonical tick rate: 1 second = this many ticks.
pub const TICKS_PER_SECOND: i64 = 46_186_158_000;

pub const FBX_MAGIC: &[u8; 23] = b"Kaydara FBX Binary  \x00\x1a\x00";
pub const FOOTER_MAGIC1: [u8; 16] = [
    0xfa, 0xbc, 0xab, 0x09, 0xd0, 0xc8, 0xd4, 0x66, 0xb1, 0x76, 0xfb, 0x83, 0x1c, 0xf7, 0x26, 0x7e,
];
pub const FOOTER_MAGIC2: [u8; 16] = [
    0xf8, 0x5a, 0x8c, 0x6a, 0xde, 0xf5, 0xd9, 0x7e, 0xec, 0xe9, 0x0c, 0xe3, 0x75, 0x8f, 0x29, 0x0b,
];
pub const FILE_ID_BLOB: [u8; 16] = [
    0x28, 0xb3, 0x2a, 0xeb, 0xb6, 0x24, 0xcc, 0xc2, 0xbf, 0xc8, 0xb0, 0x2a, 0xa9, 0x2b, 0xfc, 0xf1,
];
pub const CREATION_TIME_STRING: &str = "1970-01-01 10:00:00:000";
pub const CREATOR_STRING: &str = "fbxcore";
