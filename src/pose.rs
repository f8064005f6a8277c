//! `BindPose`.
//!
//! Grounded on `sfbxDeformer.cpp`'s `BindPose::constructObject`/
//! `constructNodes`: a list of `PoseNode` children, each an int64 joint
//! `Node` id plus a double[16] `Matrix`, row-major on disk.

use crate::object::ObjectId;
use nalgebra::Matrix4;

#[derive(Debug, Clone, Default)]
pub struct BindPoseData {
    pub joints: Vec<(ObjectId, Matrix4<f64>)>,
}

impl BindPoseData {
    pub fn push(&mut self, joint: ObjectId, matrix: Matrix4<f64>) {
        self.joints.push((joint, matrix));
    }

    pub fn matrix_for(&self, joint: ObjectId) -> Option<&Matrix4<f64>> {
        self.joints.iter().find(|(j, _)| *j == joint).map(|(_, m)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_matrix_by_joint() {
        let mut pose = BindPoseData::default();
        let a = ObjectId(1);
        let b = ObjectId(2);
        pose.push(a, Matrix4::identity());
        pose.push(b, Matrix4::new_scaling(2.0));
        assert_eq!(pose.matrix_for(a), Some(&Matrix4::identity()));
        assert_eq!(pose.matrix_for(b), Some(&Matrix4::new_scaling(2.0)));
        assert_eq!(pose.matrix_for(ObjectId(3)), None);
    }
}
