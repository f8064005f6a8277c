//! `GeomMesh` and `Shape`.
//!
//! Grounded on `sfbxGeometry.cpp`'s `GeomMesh::constructObject`/
//! `constructNodes` (polygon index run bit-inversion and layer
//! mapping/reference mode inference) and `Shape::constructObject`/
//! `constructNodes`.

use nalgebra::Vector3;

/// Mapping mode of a layer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    ByPolygonVertex,
    ByControlPoint,
}

/// Reference mode of a layer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMode {
    Direct,
    IndexToDirect,
}

#[derive(Debug, Clone, Default)]
pub struct LayerElement<T> {
    pub name: String,
    pub data: Vec<T>,
    pub indices: Vec<i32>,
}

impl<T> LayerElement<T> {
    /// Infers mapping mode the way the writer does: `ByPolygonVertex`
    /// if the data or index count matches the polygon-vertex count,
    /// otherwise `ByControlPoint` when the data is dense per control point
    /// with no indirection.
    pub fn mapping_mode(&self, polygon_vertex_count: usize, control_point_count: usize) -> MappingMode {
        if self.data.len() == polygon_vertex_count || self.indices.len() == polygon_vertex_count {
            MappingMode::ByPolygonVertex
        } else if self.data.len() == control_point_count && self.indices.is_empty() {
            MappingMode::ByControlPoint
        } else {
            MappingMode::ByPolygonVertex
        }
    }

    pub fn reference_mode(&self) -> ReferenceMode {
        if self.indices.is_empty() {
            ReferenceMode::Direct
        } else {
            ReferenceMode::IndexToDirect
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeomMeshData {
    pub points: Vec<Vector3<f32>>,
    /// Polygon sizes, derived from the index run on read.
    pub counts: Vec<i32>,
    /// Positive control-point indices, one per polygon-vertex.
    pub indices: Vec<i32>,
    pub normal_layers: Vec<LayerElement<Vector3<f32>>>,
    pub uv_layers: Vec<LayerElement<[f64; 2]>>,
    pub color_layers: Vec<LayerElement<[f64; 4]>>,
}

impl GeomMeshData {
    /// Decodes a raw `PolygonVertexIndex` array (last index of each face
    /// bit-inverted) into `(counts, indices)`.
    pub fn decode_polygon_vertex_index(raw: &[i32]) -> (Vec<i32>, Vec<i32>) {
        let mut counts = Vec::new();
        let mut indices = Vec::with_capacity(raw.len());
        let mut run_len = 0i32;
        for &i in raw {
            run_len += 1;
            if i < 0 {
                indices.push(!i);
                counts.push(run_len);
                run_len = 0;
            } else {
                indices.push(i);
            }
        }
        (counts, indices)
    }

    /// Re-encodes `(counts, indices)` into the on-disk bit-inverted run,
    /// the inverse of `decode_polygon_vertex_index`.
    pub fn encode_polygon_vertex_index(counts: &[i32], indices: &[i32]) -> Vec<i32> {
        let mut out = Vec::with_capacity(indices.len());
        let mut pos = 0usize;
        for &count in counts {
            let count = count as usize;
            for k in 0..count {
                let v = indices[pos + k];
                if k + 1 == count {
                    out.push(!v);
                } else {
                    out.push(v);
                }
            }
            pos += count;
        }
        out
    }

    /// Wireframe edge expansion for one face given its control-point
    /// indices: a 2-count face is a single line segment;
    /// an N≥3-count face fans into N edges (and, separately, N-2 triangles,
    /// not computed here since triangulation is a consumer concern).
    pub fn face_wireframe_edges(face_indices: &[i32]) -> Vec<i32> {
        let n = face_indices.len();
        if n < 2 {
            return Vec::new();
        }
        if n == 2 {
            return vec![face_indices[0], face_indices[1]];
        }
        let mut edges = Vec::with_capacity(n * 2);
        for i in 0..n {
            edges.push(face_indices[i]);
            edges.push(face_indices[(i + 1) % n]);
        }
        edges
    }

    /// Triangle fan for an N≥3-count face: `N-2` triangles sharing vertex 0.
    pub fn face_triangle_fan(face_indices: &[i32]) -> Vec<i32> {
        let n = face_indices.len();
        if n < 3 {
            return Vec::new();
        }
        let mut tris = Vec::with_capacity((n - 2) * 3);
        for i in 1..n - 1 {
            tris.push(face_indices[0]);
            tris.push(face_indices[i]);
            tris.push(face_indices[i + 1]);
        }
        tris
    }

    /// Splits the flat `indices` buffer into per-face slices according to
    /// `counts`.
    pub fn faces(&self) -> Vec<&[i32]> {
        let mut out = Vec::with_capacity(self.counts.len());
        let mut pos = 0usize;
        for &c in &self.counts {
            let c = c as usize;
            out.push(&self.indices[pos..pos + c]);
            pos += c;
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShapeData {
    /// Indices into the base mesh's points.
    pub indices: Vec<i32>,
    pub delta_points: Vec<Vector3<f32>>,
    pub delta_normals: Vec<Vector3<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_then_encode_is_identity() {
        let raw = vec![0, 1, !2, 2, 3, !0];
        let (counts, indices) = GeomMeshData::decode_polygon_vertex_index(&raw);
        assert_eq!(counts, vec![3, 3]);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);
        let re = GeomMeshData::encode_polygon_vertex_index(&counts, &indices);
        assert_eq!(re, raw);
    }

    #[test]
    fn triangle_wireframe_and_fan() {
        let face = [0, 1, 2];
        assert_eq!(GeomMeshData::face_wireframe_edges(&face), vec![0, 1, 1, 2, 2, 0]);
        assert_eq!(GeomMeshData::face_triangle_fan(&face), vec![0, 1, 2]);
    }

    #[test]
    fn line_segment_face_has_no_triangles() {
        let face = [4, 5];
        assert_eq!(GeomMeshData::face_wireframe_edges(&face), vec![4, 5]);
        assert!(GeomMeshData::face_triangle_fan(&face).is_empty());
    }

    #[test]
    fn quad_fans_into_two_triangles() {
        let face = [0, 1, 2, 3];
        assert_eq!(GeomMeshData::face_triangle_fan(&face), vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(
            GeomMeshData::face_wireframe_edges(&face),
            vec![0, 1, 1, 2, 2, 3, 3, 0]
        );
    }
}
