//! A binary FBX scene container reader and writer.
//!
//! [`Document`] owns a flat node arena (the raw, untyped record tree)
//! and an object arena (the typed scene graph materialized from it:
//! [`Model`](model::ModelData), [`GeomMesh`](geometry::GeomMeshData),
//! [`Skin`]/[`Cluster`](deformer), [`BindPose`](pose::BindPoseData), and the
//! animation stack/layer/curve-node/curve chain (animation)). Read with
//! [`Document::read`], write with [`Document::write`].

pub mod animation;
pub mod config;
pub mod deformer;
pub mod document;
pub mod dump;
pub mod error;
pub mod geometry;
pub mod model;
pub mod node;
pub mod object;
pub mod pose;
pub mod primitive;
pub mod property;
pub mod tokens;

pub use config::{ReadOptions, WriteOptions};
pub use document::Document;
pub use error::{Diagnostic, DiagnosticSink, FbxError, Result};
pub use object::{Object, ObjectClass, ObjectData, ObjectId, ObjectSubClass};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelData;
    use nalgebra::Vector3;

    #[test]
    fn empty_scene_round_trips_through_bytes() {
        let doc = Document::new();
        let bytes = doc.write(&WriteOptions::default());
        let (doc2, sink) = Document::read(&bytes, &ReadOptions::default()).unwrap();
        assert!(sink.is_empty());
        assert_eq!(doc2.object(doc2.root_model).name, "RootNode");
    }

    #[test]
    fn a_child_model_survives_a_round_trip() {
        let mut doc = Document::new();
        let child_id = ObjectId(doc.objects.len() as u32);
        let mut model = ModelData::default();
        model.position = Vector3::new(0.0, 5.0, 0.0);
        let mut obj = Object::new(42, "Hips", ObjectClass::Model, ObjectSubClass::LimbNode, ObjectData::Model(model));
        obj.parents.push(doc.root_model);
        doc.objects.push(obj);
        doc.object_mut(doc.root_model).children.push(child_id);

        let bytes = doc.write(&WriteOptions::default());
        let (doc2, _) = Document::read(&bytes, &ReadOptions::default()).unwrap();
        let found = doc2.find_object_by_name("Hips").expect("Hips exists after round-trip");
        assert_eq!(doc2.object(found).model().unwrap().position.y, 5.0);
        assert!(doc2.object(found).parents.contains(&doc2.root_model));
    }

    #[test]
    fn ascii_dump_starts_with_version_header() {
        let doc = Document::new();
        let out = doc.dump_ascii();
        assert!(out.starts_with("; FBX "));
    }
}
