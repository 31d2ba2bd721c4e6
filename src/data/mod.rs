//! Mesh and dataset model.
//!
//! A [`Mesh`] owns its [`DatasetGroup`]s, each group owns its [`Dataset`]s.
//! Callers navigate through borrowed views ([`GroupRef`], [`DatasetRef`]) so
//! nothing can outlive the mesh it came from.

mod dataset;
mod group;
mod memory;
mod mesh;
mod netcdf;
mod source;
mod statistics;

pub use self::netcdf::NetcdfSource;
pub use dataset::{DataBlock, DataType, Dataset, DatasetInfo, DatasetRef};
pub use group::{DatasetGroup, GroupRef};
pub use memory::MemoryDataset2D;
pub use mesh::{BBox, Face, FaceIterator, Mesh, MeshDimensions, Vertex, VertexIterator};
pub use source::{ArraySource, MemorySource};
pub use statistics::{dataset_statistics, group_statistics, Statistics};

pub(crate) use dataset::window_len;

/// Where dataset values are defined on the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLocation {
    /// One value per vertex.
    OnVertices2D,
    /// One value per face.
    OnFaces2D,
    /// One value per volume of the layered 3D stack.
    OnVolumes3D,
}
