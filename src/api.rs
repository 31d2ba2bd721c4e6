//! Flat entry points over the process-wide [`DriverManager`].
//!
//! Every function returns a [`Result`] and also records its outcome in the
//! thread-local status slot read by [`last_status`](crate::status::last_status),
//! for callers ported from status-code style APIs.

use crate::data::{DataBlock, DataLocation, DataType, Mesh};
use crate::drivers::{Driver, DriverManager};
use crate::error::{MeshdalError, Result};
use crate::status::record;
use std::path::Path;
use std::sync::Arc;

pub use crate::status::{last_status, Status};

/// Package version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Number of registered drivers.
pub fn driver_count() -> usize {
    DriverManager::instance().drivers_count()
}

/// Driver at `index` in registration order.
pub fn driver_from_index(index: usize) -> Result<Arc<dyn Driver>> {
    record(
        DriverManager::instance()
            .driver(index)
            .ok_or_else(|| MeshdalError::missing_driver(format!("#{index}"))),
    )
}

/// Driver registered as `name`.
pub fn driver_from_name(name: &str) -> Result<Arc<dyn Driver>> {
    record(
        DriverManager::instance()
            .driver_by_name(name)
            .ok_or_else(|| MeshdalError::missing_driver(name)),
    )
}

/// Load a mesh, probing drivers in registration order.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh> {
    record(DriverManager::instance().load(path.as_ref()))
}

/// Save the geometry of `mesh` with the named driver.
pub fn save_mesh(mesh: &Mesh, path: impl AsRef<Path>, driver_name: &str) -> Result<()> {
    record(DriverManager::instance().save(mesh, path.as_ref(), driver_name))
}

/// Append the dataset groups stored in `path` to `mesh`.
pub fn load_datasets(mesh: &mut Mesh, path: impl AsRef<Path>) -> Result<()> {
    record(DriverManager::instance().load_datasets(mesh, path.as_ref()))
}

/// Create an editable group that `driver` will persist to `uri`.
pub fn add_dataset_group(
    mesh: &mut Mesh,
    driver: &dyn Driver,
    name: &str,
    location: DataLocation,
    is_scalar: bool,
    uri: &str,
) -> Result<usize> {
    let result = if name.is_empty() {
        Err(MeshdalError::invalid_data("group name is empty"))
    } else {
        DriverManager::instance().add_dataset_group(mesh, name, location, is_scalar, driver, uri)
    };
    record(result)
}

/// Append a time step to an editable group.
pub fn add_dataset(
    mesh: &mut Mesh,
    group: usize,
    time: f64,
    values: &[f64],
    active: Option<&[i32]>,
) -> Result<usize> {
    record(DriverManager::instance().add_dataset(mesh, group, time, values, active))
}

/// Finish editing a group: compute statistics and persist it.
pub fn close_edit_mode(mesh: &mut Mesh, group: usize) -> Result<()> {
    record(DriverManager::instance().close_edit_mode(mesh, group))
}

/// Append a metadata entry to a group.
pub fn set_metadata(mesh: &mut Mesh, group: usize, key: &str, value: &str) -> Result<()> {
    let result = mesh.dataset_group_mut(group).and_then(|g| {
        if key.is_empty() {
            return Err(MeshdalError::incompatible_group("metadata key is empty"));
        }
        g.set_metadata(key, value);
        Ok(())
    });
    record(result)
}

/// Windowed read of dataset `dataset` in group `group`.
pub fn read_data(
    mesh: &Mesh,
    group: usize,
    dataset: usize,
    index_start: usize,
    count: usize,
    data_type: DataType,
) -> Result<DataBlock> {
    record(
        mesh.dataset(group, dataset)
            .and_then(|d| d.read_data(index_start, count, data_type)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Vertex;

    fn triangle() -> Mesh {
        Mesh::new(
            "2DM",
            "tri.2dm",
            vec![
                Vertex::new(0.0, 0.0, 1.0),
                Vertex::new(1.0, 0.0, 2.0),
                Vertex::new(0.0, 1.0, 3.0),
            ],
            vec![vec![0, 1, 2]],
        )
        .unwrap()
    }

    #[test]
    fn status_tracks_last_call() {
        assert!(driver_from_name("NOPE").is_err());
        assert_eq!(last_status(), Status::ErrMissingDriver);

        assert_eq!(driver_from_name("2DM").unwrap().name(), "2DM");
        assert_eq!(last_status(), Status::None);
    }

    #[test]
    fn edit_cycle_through_facade() {
        let dir = tempfile::tempdir().unwrap();
        let uri = dir.path().join("level.dat").display().to_string();
        let mut mesh = triangle();
        let driver = driver_from_name("ASCII_DAT").unwrap();

        let g = add_dataset_group(
            &mut mesh,
            driver.as_ref(),
            "Level",
            DataLocation::OnVertices2D,
            true,
            &uri,
        )
        .unwrap();
        add_dataset(&mut mesh, g, 0.0, &[1.0, 2.0, 3.0], Some(&[1][..])).unwrap();
        set_metadata(&mut mesh, g, "units", "m").unwrap();

        assert!(add_dataset(&mut mesh, g, 1.0, &[1.0], None).is_err());
        assert_eq!(last_status(), Status::ErrInvalidData);

        close_edit_mode(&mut mesh, g).unwrap();
        assert!(dir.path().join("level.dat").exists());
        assert_eq!(
            mesh.dataset_group(g).unwrap().minimum_maximum(),
            (1.0, 3.0)
        );

        let block = read_data(&mesh, g, 0, 1, 2, DataType::ScalarDouble).unwrap();
        assert_eq!(block, DataBlock::Doubles(vec![2.0, 3.0]));

        assert!(read_data(&mesh, g, 0, 2, 2, DataType::ScalarDouble).is_err());
        assert_eq!(last_status(), Status::ErrIncompatibleDataset);

        assert!(add_dataset(&mut mesh, g, 2.0, &[0.0; 3], None).is_err());
        assert_eq!(last_status(), Status::ErrIncompatibleDataset);
    }

    #[test]
    fn empty_group_name_is_invalid_data() {
        let mut mesh = triangle();
        let driver = driver_from_name("ASCII_DAT").unwrap();
        let result = add_dataset_group(
            &mut mesh,
            driver.as_ref(),
            "",
            DataLocation::OnVertices2D,
            true,
            "unused.dat",
        );
        assert!(matches!(result, Err(MeshdalError::InvalidData(_))));
        assert_eq!(last_status(), Status::ErrInvalidData);
        assert_eq!(mesh.dataset_group_count(), 0);
    }

    #[test]
    fn version_is_package_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
