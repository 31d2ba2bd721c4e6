//! Mesh geometry, its dataset groups and the vertex/face iterators.

use super::dataset::DatasetRef;
use super::group::{DatasetGroup, GroupRef};
use crate::error::{MeshdalError, Result};

/// Mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate (bed elevation for most formats).
    pub z: f64,
}

impl Vertex {
    /// Create a vertex.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Face as a list of 0-based vertex indices.
pub type Face = Vec<usize>;

/// Axis-aligned bounding box in the mesh plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Minimum X.
    pub min_x: f64,
    /// Maximum X.
    pub max_x: f64,
    /// Minimum Y.
    pub min_y: f64,
    /// Maximum Y.
    pub max_y: f64,
}

impl BBox {
    fn of(vertices: &[Vertex]) -> Self {
        let mut bbox = Self {
            min_x: f64::NAN,
            max_x: f64::NAN,
            min_y: f64::NAN,
            max_y: f64::NAN,
        };
        for v in vertices {
            bbox.min_x = if bbox.min_x.is_nan() { v.x } else { bbox.min_x.min(v.x) };
            bbox.max_x = if bbox.max_x.is_nan() { v.x } else { bbox.max_x.max(v.x) };
            bbox.min_y = if bbox.min_y.is_nan() { v.y } else { bbox.min_y.min(v.y) };
            bbox.max_y = if bbox.max_y.is_nan() { v.y } else { bbox.max_y.max(v.y) };
        }
        bbox
    }
}

/// Vertex and face counts, passed to drivers that size values by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDimensions {
    /// Number of vertices.
    pub vertices: usize,
    /// Number of faces.
    pub faces: usize,
}

/// Unstructured mesh with its attached dataset groups.
#[derive(Debug)]
pub struct Mesh {
    driver_name: String,
    uri: String,
    crs: String,
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    face_vertices_maximum_count: usize,
    dataset_groups: Vec<DatasetGroup>,
}

impl Mesh {
    /// Build a mesh, checking that every face references an existing vertex.
    pub fn new(
        driver_name: impl Into<String>,
        uri: impl Into<String>,
        vertices: Vec<Vertex>,
        faces: Vec<Face>,
    ) -> Result<Self> {
        if let Some((face, &vertex)) = faces.iter().enumerate().find_map(|(i, f)| {
            f.iter().find(|&&v| v >= vertices.len()).map(|v| (i, v))
        }) {
            return Err(MeshdalError::invalid_data(format!(
                "face {face} references vertex {vertex}, mesh has {} vertices",
                vertices.len()
            )));
        }

        let face_vertices_maximum_count = faces.iter().map(Vec::len).max().unwrap_or(0);
        Ok(Self {
            driver_name: driver_name.into(),
            uri: uri.into(),
            crs: String::new(),
            vertices,
            faces,
            face_vertices_maximum_count,
            dataset_groups: Vec::new(),
        })
    }

    /// Driver that produced the mesh.
    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// File the mesh was loaded from.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Coordinate reference system, empty when unknown.
    pub fn projection(&self) -> &str {
        &self.crs
    }

    /// Set the coordinate reference system.
    pub fn set_projection(&mut self, crs: impl Into<String>) {
        self.crs = crs.into();
    }

    /// Bounding box of all vertices; NaN for an empty mesh.
    pub fn extent(&self) -> BBox {
        BBox::of(&self.vertices)
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Vertex and face counts.
    pub fn dimensions(&self) -> MeshDimensions {
        MeshDimensions {
            vertices: self.vertices.len(),
            faces: self.faces.len(),
        }
    }

    /// Largest number of vertices in a single face.
    pub fn face_vertices_maximum_count(&self) -> usize {
        self.face_vertices_maximum_count
    }

    /// All vertices.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All faces.
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Fresh iterator over vertex coordinates.
    pub fn vertex_iterator(&self) -> VertexIterator<'_> {
        VertexIterator {
            vertices: &self.vertices,
            position: 0,
        }
    }

    /// Fresh iterator over face connectivity.
    pub fn face_iterator(&self) -> FaceIterator<'_> {
        FaceIterator {
            faces: &self.faces,
            position: 0,
        }
    }

    /// Number of attached dataset groups.
    pub fn dataset_group_count(&self) -> usize {
        self.dataset_groups.len()
    }

    /// Group at `index`.
    pub fn dataset_group(&self, index: usize) -> Result<GroupRef<'_>> {
        let group = self.dataset_groups.get(index).ok_or_else(|| {
            MeshdalError::incompatible_mesh(format!(
                "dataset group index {index} out of range ({} groups)",
                self.dataset_groups.len()
            ))
        })?;
        Ok(GroupRef::new(self, group, index))
    }

    /// Mutable access to the group at `index`.
    pub fn dataset_group_mut(&mut self, index: usize) -> Result<&mut DatasetGroup> {
        let count = self.dataset_groups.len();
        self.dataset_groups.get_mut(index).ok_or_else(|| {
            MeshdalError::incompatible_mesh(format!(
                "dataset group index {index} out of range ({count} groups)"
            ))
        })
    }

    /// Iterate over all groups in attachment order.
    pub fn dataset_groups(&self) -> impl Iterator<Item = GroupRef<'_>> {
        self.dataset_groups
            .iter()
            .enumerate()
            .map(move |(i, g)| GroupRef::new(self, g, i))
    }

    /// First group named `name`.
    pub fn find_dataset_group(&self, name: &str) -> Option<GroupRef<'_>> {
        self.dataset_groups().find(|g| g.name() == name)
    }

    /// Convenience: dataset `dataset` of group `group`.
    pub fn dataset(&self, group: usize, dataset: usize) -> Result<DatasetRef<'_>> {
        self.dataset_group(group)?.dataset(dataset)
    }

    /// Attach a group; returns its index.
    pub fn add_dataset_group(&mut self, group: DatasetGroup) -> usize {
        self.dataset_groups.push(group);
        self.dataset_groups.len() - 1
    }
}

/// Single-pass iterator over vertex coordinates.
#[derive(Debug)]
pub struct VertexIterator<'a> {
    vertices: &'a [Vertex],
    position: usize,
}

impl VertexIterator<'_> {
    /// Write up to `max_count` vertices as x,y,z triples into `coordinates`
    /// and return how many were written. Returns 0 once exhausted.
    pub fn next(&mut self, max_count: usize, coordinates: &mut [f64]) -> usize {
        let remaining = self.vertices.len() - self.position;
        let n = remaining.min(max_count).min(coordinates.len() / 3);

        let batch = &self.vertices[self.position..self.position + n];
        for (out, v) in coordinates.chunks_exact_mut(3).zip(batch) {
            out[0] = v.x;
            out[1] = v.y;
            out[2] = v.z;
        }
        self.position += n;
        n
    }
}

/// Single-pass iterator over face connectivity.
#[derive(Debug)]
pub struct FaceIterator<'a> {
    faces: &'a [Face],
    position: usize,
}

impl FaceIterator<'_> {
    /// Write whole faces until either buffer is full.
    ///
    /// `vertex_indices` receives the flattened vertex indices;
    /// `face_offsets[i]` is the exclusive end of face `i` within it. Returns
    /// the number of faces written. A face that does not fit into the
    /// remaining index space is left for the next call, so 0 is returned
    /// both once exhausted and when `vertex_indices` is too small for the
    /// next face; pass at least `face_vertices_maximum_count` slots to tell
    /// the two apart.
    pub fn next(&mut self, face_offsets: &mut [usize], vertex_indices: &mut [usize]) -> usize {
        let mut faces_written = 0;
        let mut indices_written = 0;

        while faces_written < face_offsets.len() {
            let Some(face) = self.faces.get(self.position) else {
                break;
            };
            let end = indices_written + face.len();
            if end > vertex_indices.len() {
                break;
            }
            vertex_indices[indices_written..end].copy_from_slice(face);
            face_offsets[faces_written] = end;
            indices_written = end;
            faces_written += 1;
            self.position += 1;
        }

        faces_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 1.0),
            Vertex::new(1.0, 0.0, 2.0),
            Vertex::new(1.0, 1.0, 3.0),
            Vertex::new(0.0, 1.0, 4.0),
        ];
        Mesh::new("TEST", "quad", vertices, vec![vec![0, 1, 2, 3]]).unwrap()
    }

    #[test]
    fn vertex_iterator_drains_in_batches() {
        let mesh = quad();
        let mut it = mesh.vertex_iterator();
        let mut coords = [0.0; 6];
        assert_eq!(it.next(2, &mut coords), 2);
        assert_eq!(coords, [0.0, 0.0, 1.0, 1.0, 0.0, 2.0]);
        assert_eq!(it.next(2, &mut coords), 2);
        assert_eq!(coords[5], 4.0);
        assert_eq!(it.next(2, &mut coords), 0);
        assert_eq!(it.next(2, &mut coords), 0);
    }

    #[test]
    fn face_offsets_are_prefix_sums() {
        let vertices = (0..5).map(|i| Vertex::new(i as f64, 0.0, 0.0)).collect();
        let faces = vec![vec![0, 1, 2], vec![1, 2, 3, 4], vec![2, 3, 4]];
        let mesh = Mesh::new("TEST", "tri", vertices, faces).unwrap();
        assert_eq!(mesh.face_vertices_maximum_count(), 4);

        let mut it = mesh.face_iterator();
        let mut offsets = [0usize; 10];
        let mut indices = [0usize; 8];
        let n = it.next(&mut offsets, &mut indices);
        assert_eq!(n, 2);
        assert_eq!(&offsets[..n], &[3, 7]);
        assert_eq!(&indices[..7], &[0, 1, 2, 1, 2, 3, 4]);

        let n = it.next(&mut offsets, &mut indices);
        assert_eq!(n, 1);
        assert_eq!(offsets[0], 3);
        assert_eq!(it.next(&mut offsets, &mut indices), 0);
        assert_eq!(it.next(&mut offsets, &mut indices), 0);
    }

    #[test]
    fn face_too_large_for_buffer_is_deferred() {
        let mesh = quad();
        let mut it = mesh.face_iterator();
        let mut offsets = [0usize; 2];
        let mut small = [0usize; 3];
        assert_eq!(it.next(&mut offsets, &mut small), 0);

        let mut indices = [0usize; 4];
        assert_eq!(it.next(&mut offsets, &mut indices), 1);
        assert_eq!(indices, [0, 1, 2, 3]);
    }

    #[test]
    fn invalid_face_index_is_rejected() {
        let vertices = vec![Vertex::default(); 2];
        let err = Mesh::new("TEST", "bad", vertices, vec![vec![0, 1, 2]]).unwrap_err();
        assert!(matches!(err, MeshdalError::InvalidData(_)));
    }

    #[test]
    fn extent_covers_vertices() {
        let bbox = quad().extent();
        assert_eq!((bbox.min_x, bbox.max_x, bbox.min_y, bbox.max_y), (0.0, 1.0, 0.0, 1.0));
        let empty = Mesh::new("TEST", "empty", Vec::new(), Vec::new()).unwrap();
        assert!(empty.extent().min_x.is_nan());
    }

    #[test]
    fn group_index_out_of_range() {
        let mesh = quad();
        assert_eq!(mesh.dataset_group_count(), 0);
        assert!(matches!(
            mesh.dataset_group(0),
            Err(MeshdalError::IncompatibleMesh(_))
        ));
    }
}
