//! Format drivers and the driver registry.
//!
//! A [`Driver`] translates one on-disk format into the [`Mesh`] model and,
//! when it declares the capability, writes groups back. Drivers are stateless;
//! anything tied to one opened file lives in the objects the driver returns.

mod ascii_dat;
mod manager;
mod mesh2dm;
pub mod tuflowfv;

pub use ascii_dat::AsciiDat;
pub use manager::DriverManager;
pub use mesh2dm::Mesh2dm;
pub use tuflowfv::TuflowFv;

use crate::data::{
    dataset_statistics, group_statistics, DataLocation, Dataset, DatasetGroup, MemoryDataset2D,
    Mesh, MeshDimensions,
};
use crate::error::{MeshdalError, Result};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Something a driver can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Load a mesh from a file.
    ReadMesh,
    /// Write a mesh to a file.
    SaveMesh,
    /// Append dataset groups from a file to an existing mesh.
    ReadDatasets,
    /// Persist groups defined on vertices.
    WriteDatasetsOnVertices2D,
    /// Persist groups defined on faces.
    WriteDatasetsOnFaces2D,
    /// Persist groups defined on volumes.
    WriteDatasetsOnVolumes3D,
}

impl Capability {
    const ALL: [Capability; 6] = [
        Capability::ReadMesh,
        Capability::SaveMesh,
        Capability::ReadDatasets,
        Capability::WriteDatasetsOnVertices2D,
        Capability::WriteDatasetsOnFaces2D,
        Capability::WriteDatasetsOnVolumes3D,
    ];

    const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Write capability matching a data location.
    pub fn write_datasets_on(location: DataLocation) -> Self {
        match location {
            DataLocation::OnVertices2D => Capability::WriteDatasetsOnVertices2D,
            DataLocation::OnFaces2D => Capability::WriteDatasetsOnFaces2D,
            DataLocation::OnVolumes3D => Capability::WriteDatasetsOnVolumes3D,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Capability::ReadMesh => "read mesh",
            Capability::SaveMesh => "save mesh",
            Capability::ReadDatasets => "read datasets",
            Capability::WriteDatasetsOnVertices2D => "write datasets on vertices",
            Capability::WriteDatasetsOnFaces2D => "write datasets on faces",
            Capability::WriteDatasetsOnVolumes3D => "write datasets on volumes",
        };
        f.write_str(text)
    }
}

/// Set of [`Capability`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// No capability.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// This set plus `capability`.
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Whether `capability` is in the set.
    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Capabilities in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

/// A file format.
///
/// Every operation is optional; the defaults report the capability as
/// missing. `can_read_*` must be cheap and must not fail loudly.
pub trait Driver: fmt::Debug + Send + Sync {
    /// Short unique name, e.g. `TUFLOWFV`.
    fn name(&self) -> &str;

    /// Human readable name.
    fn long_name(&self) -> &str;

    /// File filter, e.g. `*.nc`.
    fn filters(&self) -> &str;

    /// What the driver can do.
    fn capabilities(&self) -> Capabilities;

    /// Whether `capability` is supported.
    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Whether groups on `location` can be written.
    fn has_write_dataset_capability(&self, location: DataLocation) -> bool {
        self.has_capability(Capability::write_datasets_on(location))
    }

    /// Largest face this format can store.
    fn face_vertices_maximum_count(&self) -> usize {
        usize::MAX
    }

    /// Cheap check whether `path` holds a mesh in this format.
    fn can_read_mesh(&self, _path: &Path) -> bool {
        false
    }

    /// Cheap check whether `path` holds datasets in this format.
    fn can_read_datasets(&self, _path: &Path) -> bool {
        false
    }

    /// Parse a whole mesh.
    fn load(&self, _path: &Path) -> Result<Mesh> {
        Err(self.missing(Capability::ReadMesh))
    }

    /// Append the groups stored in `path` to `mesh`.
    fn load_datasets(&self, _path: &Path, _mesh: &mut Mesh) -> Result<()> {
        Err(self.missing(Capability::ReadDatasets))
    }

    /// Write the geometry of `mesh`.
    fn save(&self, _mesh: &Mesh, _path: &Path) -> Result<()> {
        Err(self.missing(Capability::SaveMesh))
    }

    /// Append a new, editable group to `mesh`.
    fn create_dataset_group(
        &self,
        mesh: &mut Mesh,
        name: &str,
        location: DataLocation,
        is_scalar: bool,
        uri: &str,
    ) -> Result<()> {
        let mut group = DatasetGroup::new(self.name(), uri, name, location, is_scalar);
        group.start_editing();
        mesh.add_dataset_group(group);
        debug!(driver = self.name(), group = name, "created dataset group");
        Ok(())
    }

    /// Append an in-memory dataset to `group`.
    ///
    /// `values` holds one value per vertex or face (two, interleaved, for
    /// vectors); `active` holds one flag per face.
    fn create_dataset(
        &self,
        group: &mut DatasetGroup,
        mesh: MeshDimensions,
        time: f64,
        values: &[f64],
        active: Option<&[i32]>,
    ) -> Result<()> {
        let location = group.data_location();
        let values_count = match location {
            DataLocation::OnVertices2D => mesh.vertices,
            DataLocation::OnFaces2D => mesh.faces,
            DataLocation::OnVolumes3D => {
                return Err(self.missing(Capability::WriteDatasetsOnVolumes3D));
            }
        };

        let mut dataset = MemoryDataset2D::new(time, values_count, group.is_scalar(), values)?;
        if let Some(active) = active {
            if active.len() != mesh.faces {
                return Err(MeshdalError::invalid_data(format!(
                    "expected {} active flags, got {}",
                    mesh.faces,
                    active.len()
                )));
            }
            dataset = dataset.with_active_flags(active);
        }
        let statistics = dataset_statistics(&dataset, location, group.is_scalar())?;
        dataset.info_mut().statistics = statistics;
        group.push_dataset(Box::new(dataset));
        Ok(())
    }

    /// Flush a group that just left edit mode.
    fn persist(&self, group: &DatasetGroup, _mesh: &Mesh) -> Result<()> {
        Err(self.missing(Capability::write_datasets_on(group.data_location())))
    }

    /// Error for an unsupported capability of this driver.
    fn missing(&self, capability: Capability) -> MeshdalError {
        MeshdalError::missing_capability(self.name(), capability.to_string())
    }
}

/// Scalar "Bed Elevation" group built from the vertex z values.
pub(crate) fn bed_elevation_group(driver_name: &str, mesh: &Mesh) -> Result<DatasetGroup> {
    let mut group = DatasetGroup::new(
        driver_name,
        mesh.uri(),
        "Bed Elevation",
        DataLocation::OnVertices2D,
        true,
    );
    let z: Vec<f64> = mesh.vertices().iter().map(|v| v.z).collect();
    let mut dataset = MemoryDataset2D::new(0.0, z.len(), true, &z)?;
    dataset.info_mut().statistics = dataset_statistics(&dataset, DataLocation::OnVertices2D, true)?;
    group.push_dataset(Box::new(dataset));
    group.set_statistics(group_statistics(&group));
    Ok(group)
}
