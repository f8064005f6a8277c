//! `Skin`, `Cluster`, `BlendShape`, `BlendShapeChannel`.
//!
//! Grounded on `sfbxDeformer.cpp`'s `Skin::getJointWeightsVariable`/
//! `getJointWeightsFixed`/`getJointMatrices` and `Cluster`/
//! `BlendShapeChannel` construction. The fixed-K selection direction and
//! the blend-weight-scaling question are both design decisions recorded in
//! DESIGN.md rather than carried over unexamined.

use crate::error::{FbxError, Result};
use crate::object::ObjectId;
use nalgebra::{Matrix4, Vector3};

#[derive(Debug, Clone, Default)]
pub struct SkinData {
    pub clusters: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterData {
    pub joint: Option<ObjectId>,
    pub indices: Vec<i32>,
    pub weights: Vec<f64>,
    /// Pre-bind, mesh-local.
    pub transform: Matrix4<f64>,
    /// Joint bind-pose, world.
    pub transform_link: Matrix4<f64>,
}

impl ClusterData {
    pub fn new() -> Self {
        Self {
            joint: None,
            indices: Vec::new(),
            weights: Vec::new(),
            transform: Matrix4::identity(),
            transform_link: Matrix4::identity(),
        }
    }

    /// Sets `transform_link` and derives `transform` as its inverse,
    /// matching `Cluster::setBindMatrix` in the original.
    pub fn set_bind_matrix(&mut self, world: Matrix4<f64>) {
        self.transform_link = world;
        self.transform = world.try_inverse().unwrap_or(Matrix4::identity());
    }
}

/// One (cluster_index, weight) influence on a control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    pub cluster_index: u32,
    pub weight: f64,
}

/// CSR-style variable-length per-vertex weight streams.
#[derive(Debug, Clone, Default)]
pub struct VariableJointWeights {
    pub counts: Vec<u32>,
    pub offsets: Vec<u32>,
    pub weights: Vec<Influence>,
}

/// Scatter-accumulates every cluster's (index, weight) pairs into per-vertex
/// streams, via a two-pass counting scan (count → prefix-sum offsets →
/// scatter), grounded on `Skin::getJointWeightsVariable`.
pub fn joint_weights_variable(clusters: &[&ClusterData], vertex_count: usize) -> VariableJointWeights {
    let mut counts = vec![0u32; vertex_count];
    for cluster in clusters {
        for &vi in &cluster.indices {
            if (vi as usize) < vertex_count {
                counts[vi as usize] += 1;
            }
        }
    }

    let mut offsets = vec![0u32; vertex_count];
    let mut running = 0u32;
    for (i, &c) in counts.iter().enumerate() {
        offsets[i] = running;
        running += c;
    }

    let mut weights = vec![Influence { cluster_index: 0, weight: 0.0 }; running as usize];
    let mut cursor = vec![0u32; vertex_count];
    for (ci, cluster) in clusters.iter().enumerate() {
        for (k, &vi) in cluster.indices.iter().enumerate() {
            let vi = vi as usize;
            if vi >= vertex_count {
                continue;
            }
            let slot = offsets[vi] + cursor[vi];
            weights[slot as usize] = Influence {
                cluster_index: ci as u32,
                weight: cluster.weights[k],
            };
            cursor[vi] += 1;
        }
    }

    VariableJointWeights { counts, offsets, weights }
}

/// Truncates each vertex to at most `k` joints chosen by **largest** weight
/// (ties broken by smaller cluster index), then renormalizes so non-zero
/// sums equal 1.0. Vertices with fewer than `k` influences are copied
/// verbatim with the remaining slots left at `(0, 0.0)`.
pub fn joint_weights_fixed(variable: &VariableJointWeights, k: usize) -> Vec<Influence> {
    let vertex_count = variable.counts.len();
    let mut out = vec![Influence { cluster_index: 0, weight: 0.0 }; vertex_count * k];

    for v in 0..vertex_count {
        let start = variable.offsets[v] as usize;
        let count = variable.counts[v] as usize;
        let slice = &variable.weights[start..start + count];

        let mut chosen: Vec<Influence> = if count <= k {
            slice.to_vec()
        } else {
            let mut sorted = slice.to_vec();
            sorted.sort_by(|a, b| {
                b.weight
                    .partial_cmp(&a.weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cluster_index.cmp(&b.cluster_index))
            });
            sorted.truncate(k);
            sorted
        };

        let sum: f64 = chosen.iter().map(|i| i.weight).sum();
        if sum != 0.0 {
            for inf in &mut chosen {
                inf.weight /= sum;
            }
        }

        let dst = &mut out[v * k..v * k + k];
        for (slot, inf) in dst.iter_mut().zip(chosen.into_iter()) {
            *slot = inf;
        }
    }

    out
}

/// `bindpose[i] = cluster.transform`, `global[i] = joint.globalMatrix`,
/// `joint[i] = bindpose[i] · global[i]`. `joint_global` resolves a
/// cluster's joint to its current global matrix, or `None` if the cluster's
/// joint link is missing or not a Model (logs a diagnostic and uses
/// identity in that case, matching the original's warn-and-identity
/// fallback).
pub fn joint_matrices(
    clusters: &[&ClusterData],
    joint_global: impl Fn(&ClusterData) -> Option<Matrix4<f64>>,
) -> Vec<(Matrix4<f64>, Matrix4<f64>, Matrix4<f64>)> {
    clusters
        .iter()
        .map(|c| {
            let bindpose = c.transform;
            let global = joint_global(c).unwrap_or_else(Matrix4::identity);
            let joint = bindpose * global;
            (bindpose, global, joint)
        })
        .collect()
}

/// `dst[v] = Σ_k weight_k · (M_k · src[v])`. Vertex count mismatch is
/// a hard `CountMismatch` error.
pub fn deform_points(
    dst: &mut [Vector3<f32>],
    src: &[Vector3<f32>],
    influences_per_vertex: usize,
    influences: &[Influence],
    joint_matrices: &[Matrix4<f64>],
) -> Result<()> {
    if dst.len() != src.len() {
        return Err(FbxError::CountMismatch {
            expected: src.len(),
            got: dst.len(),
        });
    }
    for (v, (d, s)) in dst.iter_mut().zip(src.iter()).enumerate() {
        let mut acc = Vector3::<f64>::zeros();
        let start = v * influences_per_vertex;
        for inf in &influences[start..start + influences_per_vertex] {
            if inf.weight == 0.0 {
                continue;
            }
            let m = &joint_matrices[inf.cluster_index as usize];
            let p = mul_point(m, &Vector3::new(s.x as f64, s.y as f64, s.z as f64));
            acc += p * inf.weight;
        }
        *d = Vector3::new(acc.x as f32, acc.y as f32, acc.z as f32);
    }
    Ok(())
}

/// Affine point transform: `v' = v * M + translation_row`, consistent with
/// this crate's row-vector convention (translation in the fourth row).
fn mul_point(m: &Matrix4<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        v.x * m[(0, 0)] + v.y * m[(1, 0)] + v.z * m[(2, 0)] + m[(3, 0)],
        v.x * m[(0, 1)] + v.y * m[(1, 1)] + v.z * m[(2, 1)] + m[(3, 1)],
        v.x * m[(0, 2)] + v.y * m[(1, 2)] + v.z * m[(2, 2)] + m[(3, 2)],
    )
}

#[derive(Debug, Clone, Default)]
pub struct BlendShapeData {
    pub channels: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct BlendShapeChannelData {
    /// (Shape, full weight) pairs.
    pub shapes: Vec<(ObjectId, f64)>,
    pub weight: f64,
}

impl BlendShapeChannelData {
    pub fn set_weight(&mut self, w: f64) {
        self.weight = w;
    }

    /// Copies `src` into `dst`, then adds each referenced shape's delta at
    /// the shape's sparse indices, unscaled by weight. This crate documents
    /// the behavior rather than silently changing it; see
    /// `deform_points_weighted` for a scaled variant.
    pub fn deform_points(
        &self,
        dst: &mut [Vector3<f32>],
        src: &[Vector3<f32>],
        shape_indices: &[i32],
        shape_deltas: &[Vector3<f32>],
    ) {
        if dst.as_ptr() != src.as_ptr() {
            dst.copy_from_slice(src);
        }
        for (&idx, &delta) in shape_indices.iter().zip(shape_deltas.iter()) {
            dst[idx as usize] += delta;
        }
    }

    /// Convenience variant that scales each delta by the channel's current
    /// weight (an additive improvement over the original, not a default).
    pub fn deform_points_weighted(
        &self,
        dst: &mut [Vector3<f32>],
        src: &[Vector3<f32>],
        shape_indices: &[i32],
        shape_deltas: &[Vector3<f32>],
    ) {
        if dst.as_ptr() != src.as_ptr() {
            dst.copy_from_slice(src);
        }
        let w = self.weight as f32;
        for (&idx, &delta) in shape_indices.iter().zip(shape_deltas.iter()) {
            dst[idx as usize] += delta * w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(indices: Vec<i32>, weights: Vec<f64>) -> ClusterData {
        ClusterData {
            joint: None,
            indices,
            weights,
            transform: Matrix4::identity(),
            transform_link: Matrix4::identity(),
        }
    }

    #[test]
    fn variable_weights_scatter_accumulate_by_vertex() {
        let c0 = cluster(vec![0], vec![1.0]);
        let c1 = cluster(vec![1, 2], vec![0.7, 0.3]);
        let clusters = vec![&c0, &c1];
        let v = joint_weights_variable(&clusters, 3);
        assert_eq!(v.counts, vec![1, 1, 1]);

        let fixed = joint_weights_fixed(&v, 4);
        // vertex 0: cluster 0 weight 1.0 (normalized stays 1.0)
        assert_eq!(fixed[0].cluster_index, 0);
        assert!((fixed[0].weight - 1.0).abs() < 1e-9);
        // vertex 1: cluster 1 weight 0.7 -> normalized to 1.0 (only influence)
        assert_eq!(fixed[4].cluster_index, 1);
        assert!((fixed[4].weight - 1.0).abs() < 1e-9);
        // vertex 2: cluster 1 weight 0.3 -> normalized to 1.0
        assert_eq!(fixed[8].cluster_index, 1);
        assert!((fixed[8].weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_k_truncation_keeps_largest_and_renormalizes() {
        let c0 = cluster(vec![0], vec![0.1]);
        let c1 = cluster(vec![0], vec![0.5]);
        let c2 = cluster(vec![0], vec![0.4]);
        let clusters = vec![&c0, &c1, &c2];
        let v = joint_weights_variable(&clusters, 1);
        assert_eq!(v.counts, vec![3]);

        let fixed = joint_weights_fixed(&v, 2);
        // Largest two: cluster 1 (0.5) and cluster 2 (0.4), sum 0.9 -> normalized.
        assert_eq!(fixed[0].cluster_index, 1);
        assert!((fixed[0].weight - (0.5 / 0.9)).abs() < 1e-9);
        assert_eq!(fixed[1].cluster_index, 2);
        assert!((fixed[1].weight - (0.4 / 0.9)).abs() < 1e-9);
    }

    #[test]
    fn fixed_k_tie_break_prefers_smaller_cluster_index() {
        let c0 = cluster(vec![0], vec![0.5]);
        let c1 = cluster(vec![0], vec![0.5]);
        let c2 = cluster(vec![0], vec![0.1]);
        let clusters = vec![&c0, &c1, &c2];
        let v = joint_weights_variable(&clusters, 1);
        let fixed = joint_weights_fixed(&v, 2);
        assert_eq!(fixed[0].cluster_index, 0);
        assert_eq!(fixed[1].cluster_index, 1);
    }

    #[test]
    fn blend_shape_applies_unscaled_delta() {
        let chan = BlendShapeChannelData { shapes: Vec::new(), weight: 0.5 };
        let src = vec![Vector3::new(0.0f32, 0.0, 0.0); 2];
        let mut dst = src.clone();
        let indices = [1];
        let deltas = [Vector3::new(1.0f32, 0.0, 0.0)];
        chan.deform_points(&mut dst, &src, &indices, &deltas);
        assert_eq!(dst[1], Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn blend_shape_weighted_scales_delta() {
        let chan = BlendShapeChannelData { shapes: Vec::new(), weight: 0.5 };
        let src = vec![Vector3::new(0.0f32, 0.0, 0.0); 2];
        let mut dst = src.clone();
        let indices = [1];
        let deltas = [Vector3::new(1.0f32, 0.0, 0.0)];
        chan.deform_points_weighted(&mut dst, &src, &indices, &deltas);
        assert_eq!(dst[1], Vector3::new(0.5, 0.0, 0.0));
    }
}
