//! `Model` transform data and matrix composition.
//!
//! Grounded on `sfbxModel.cpp`'s `Model::getLocalMatrix`/`getGlobalMatrix`
//! and `sfbxMath.h`'s per-rotation-order quaternion composition formulas.
//! Matrix/vector/quaternion types come from `nalgebra`, grounded on
//! `vrm2sl`'s use of the same crate.

use nalgebra::{Matrix4, UnitQuaternion, Vector3};

/// The six proper Euler orders plus the `SphericXYZ` alias, which is treated
/// as plain `XYZ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationOrder {
    #[default]
    XYZ = 0,
    XZY = 1,
    YZX = 2,
    YXZ = 3,
    ZXY = 4,
    ZYX = 5,
    SphericXYZ = 6,
}

impl RotationOrder {
    pub fn from_i32(v: i32) -> Self {
        match v {
            0 => RotationOrder::XYZ,
            1 => RotationOrder::XZY,
            2 => RotationOrder::YZX,
            3 => RotationOrder::YXZ,
            4 => RotationOrder::ZXY,
            5 => RotationOrder::ZYX,
            6 => RotationOrder::SphericXYZ,
            _ => RotationOrder::XYZ,
        }
    }
}

fn rx(angle_rad: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle_rad)
}
fn ry(angle_rad: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle_rad)
}
fn rz(angle_rad: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle_rad)
}

/// Composes the quaternion for an Euler triple (degrees pre-converted to
/// radians by the caller) under `order`, per the FBX convention: multiplied
/// in the order opposite to the axis name, e.g. `XYZ = Rz * Ry * Rx`.
pub fn rotate_euler(order: RotationOrder, euler_rad: Vector3<f32>) -> UnitQuaternion<f32> {
    let (x, y, z) = (rx(euler_rad.x), ry(euler_rad.y), rz(euler_rad.z));
    match order {
        RotationOrder::XYZ | RotationOrder::SphericXYZ => z * y * x,
        RotationOrder::XZY => y * z * x,
        RotationOrder::YXZ => z * x * y,
        RotationOrder::YZX => x * z * y,
        RotationOrder::ZXY => y * x * z,
        RotationOrder::ZYX => x * y * z,
    }
}

pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub visibility: bool,
    pub rotation_order: RotationOrder,
    pub position: Vector3<f32>,
    pub pre_rotation: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub post_rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    /// `Camera`-subclass only: present when the `FocalLength` property was
    /// found, and animatable via an `AnimationCurveNode` of kind
    /// `FocalLength`.
    pub focal_length: Option<f32>,
}

impl Default for ModelData {
    fn default() -> Self {
        Self {
            visibility: true,
            rotation_order: RotationOrder::default(),
            position: Vector3::zeros(),
            pre_rotation: Vector3::zeros(),
            rotation: Vector3::zeros(),
            post_rotation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            focal_length: None,
        }
    }
}

impl ModelData {
    /// `M_local = Scale · PostR · R · PreR`, translation placed in the
    /// fourth row, each `R*` built from its Euler triple and transposed
    /// (row-major convention).
    pub fn local_matrix(&self) -> Matrix4<f32> {
        let mut m = Matrix4::new_nonuniform_scaling(&self.scale);

        if self.post_rotation != Vector3::zeros() {
            let q = rotate_euler(self.rotation_order, self.post_rotation * DEG_TO_RAD);
            m *= q.to_homogeneous().transpose();
        }
        if self.rotation != Vector3::zeros() {
            let q = rotate_euler(self.rotation_order, self.rotation * DEG_TO_RAD);
            m *= q.to_homogeneous().transpose();
        }
        if self.pre_rotation != Vector3::zeros() {
            let q = rotate_euler(self.rotation_order, self.pre_rotation * DEG_TO_RAD);
            m *= q.to_homogeneous().transpose();
        }

        m.set_row(3, &nalgebra::RowVector4::new(self.position.x, self.position.y, self.position.z, 1.0));
        m
    }

    /// `global = local · parent.global`, parent on the right.
    pub fn global_matrix(&self, parent_global: Option<Matrix4<f32>>) -> Matrix4<f32> {
        let local = self.local_matrix();
        match parent_global {
            Some(p) => local * p,
            None => local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn rotation_takes_x_to_z_and_translates() {
        // position=(1,2,3), rotation=(0,90,0) XYZ degrees, scale=1.
        // local * (1,0,0,1) ~= (1, 2, 2).
        let model = ModelData {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::new(0.0, 90.0, 0.0),
            ..ModelData::default()
        };
        let m = model.local_matrix();
        let p = nalgebra::RowVector4::new(1.0f32, 0.0, 0.0, 1.0);
        let result = p * m;
        assert!(approx_eq(result[0], 1.0), "x={}", result[0]);
        assert!(approx_eq(result[1], 2.0), "y={}", result[1]);
        assert!(approx_eq(result[2], 2.0), "z={}", result[2]);
    }

    #[test]
    fn identity_transform_is_identity_matrix() {
        let model = ModelData::default();
        let m = model.local_matrix();
        assert_eq!(m, Matrix4::identity());
    }

    #[test]
    fn global_matrix_composes_with_parent() {
        let parent = ModelData {
            position: Vector3::new(10.0, 0.0, 0.0),
            ..ModelData::default()
        };
        let child = ModelData {
            position: Vector3::new(1.0, 0.0, 0.0),
            ..ModelData::default()
        };
        let parent_global = parent.global_matrix(None);
        let child_global = child.global_matrix(Some(parent_global));
        let expected = child.local_matrix() * parent_global;
        assert_eq!(child_global, expected);
    }
}
