//! Ordered driver registry.

use super::{AsciiDat, Capability, Driver, Mesh2dm, TuflowFv};
use crate::data::{group_statistics, DataLocation, Mesh};
use crate::error::{MeshdalError, Result};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Registered drivers, probed in registration order.
///
/// When several drivers could open the same file the first registered one
/// wins.
#[derive(Debug)]
pub struct DriverManager {
    drivers: Vec<Arc<dyn Driver>>,
}

impl Default for DriverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverManager {
    /// Registry with every built-in driver.
    pub fn new() -> Self {
        Self::with_drivers(vec![
            Arc::new(Mesh2dm),
            Arc::new(TuflowFv),
            Arc::new(AsciiDat),
        ])
    }

    /// Registry with exactly `drivers`, in that order.
    pub fn with_drivers(drivers: Vec<Arc<dyn Driver>>) -> Self {
        Self { drivers }
    }

    /// Process-wide registry of built-in drivers.
    pub fn instance() -> &'static DriverManager {
        static INSTANCE: OnceLock<DriverManager> = OnceLock::new();
        INSTANCE.get_or_init(DriverManager::new)
    }

    /// Number of registered drivers.
    pub fn drivers_count(&self) -> usize {
        self.drivers.len()
    }

    /// Driver at `index`.
    pub fn driver(&self, index: usize) -> Option<Arc<dyn Driver>> {
        self.drivers.get(index).cloned()
    }

    /// Driver registered as `name`.
    pub fn driver_by_name(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.iter().find(|d| d.name() == name).cloned()
    }

    /// All drivers in registration order.
    pub fn drivers(&self) -> &[Arc<dyn Driver>] {
        &self.drivers
    }

    /// Load a mesh with the first driver that recognises `path`.
    pub fn load(&self, path: &Path) -> Result<Mesh> {
        if !path.exists() {
            return Err(MeshdalError::file_not_found(path));
        }

        let driver = self
            .drivers
            .iter()
            .filter(|d| d.has_capability(Capability::ReadMesh))
            .find(|d| d.can_read_mesh(path))
            .ok_or_else(|| MeshdalError::unknown_format(path))?;

        debug!(driver = driver.name(), path = %path.display(), "loading mesh");
        let mesh = driver.load(path)?;
        info!(
            driver = driver.name(),
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            groups = mesh.dataset_group_count(),
            "loaded mesh"
        );
        Ok(mesh)
    }

    /// Append groups from `path` to `mesh` with the first dataset driver
    /// that recognises it.
    pub fn load_datasets(&self, mesh: &mut Mesh, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(MeshdalError::file_not_found(path));
        }

        let driver = self
            .drivers
            .iter()
            .filter(|d| d.has_capability(Capability::ReadDatasets))
            .find(|d| d.can_read_datasets(path))
            .ok_or_else(|| MeshdalError::unknown_format(path))?;

        let before = mesh.dataset_group_count();
        driver.load_datasets(path, mesh)?;
        info!(
            driver = driver.name(),
            added = mesh.dataset_group_count() - before,
            "loaded datasets"
        );
        Ok(())
    }

    /// Write the geometry of `mesh` with driver `driver_name`.
    pub fn save(&self, mesh: &Mesh, path: &Path, driver_name: &str) -> Result<()> {
        let driver = self
            .driver_by_name(driver_name)
            .ok_or_else(|| MeshdalError::missing_driver(driver_name))?;

        if !driver.has_capability(Capability::SaveMesh) {
            return Err(driver.missing(Capability::SaveMesh));
        }

        if driver.face_vertices_maximum_count() < mesh.face_vertices_maximum_count() {
            return Err(MeshdalError::incompatible_mesh(format!(
                "{} stores faces of at most {} vertices, mesh has faces of {}",
                driver.name(),
                driver.face_vertices_maximum_count(),
                mesh.face_vertices_maximum_count()
            )));
        }

        driver.save(mesh, path)
    }

    /// Create an editable group on `mesh` owned by `driver`; returns its index.
    pub fn add_dataset_group(
        &self,
        mesh: &mut Mesh,
        name: &str,
        location: DataLocation,
        is_scalar: bool,
        driver: &dyn Driver,
        uri: &str,
    ) -> Result<usize> {
        if !driver.has_write_dataset_capability(location) {
            return Err(driver.missing(Capability::write_datasets_on(location)));
        }

        let index = mesh.dataset_group_count();
        driver.create_dataset_group(mesh, name, location, is_scalar, uri)?;
        if mesh.dataset_group_count() <= index {
            return Err(MeshdalError::invalid_data(format!(
                "driver {} did not create group {name}",
                driver.name()
            )));
        }
        Ok(index)
    }

    /// Append a time step to group `group` of `mesh`; returns its index.
    pub fn add_dataset(
        &self,
        mesh: &mut Mesh,
        group: usize,
        time: f64,
        values: &[f64],
        active: Option<&[i32]>,
    ) -> Result<usize> {
        let dimensions = mesh.dimensions();
        let group = mesh.dataset_group_mut(group)?;

        if !group.is_in_edit_mode() {
            return Err(MeshdalError::incompatible_dataset(format!(
                "group {} is not in edit mode",
                group.name()
            )));
        }

        let driver = self
            .driver_by_name(group.driver_name())
            .ok_or_else(|| MeshdalError::missing_driver(group.driver_name()))?;

        let location = group.data_location();
        if !driver.has_write_dataset_capability(location) {
            return Err(driver.missing(Capability::write_datasets_on(location)));
        }
        if location == DataLocation::OnVolumes3D {
            return Err(driver.missing(Capability::WriteDatasetsOnVolumes3D));
        }
        if active.is_some() && location != DataLocation::OnVertices2D {
            return Err(MeshdalError::incompatible_dataset(
                "active flags are only accepted for data on vertices",
            ));
        }

        let index = group.datasets().len();
        driver.create_dataset(group, dimensions, time, values, active)?;
        if group.datasets().len() <= index {
            return Err(MeshdalError::invalid_data("no dataset was added"));
        }
        Ok(index)
    }

    /// Leave edit mode on group `group`: compute statistics and persist.
    ///
    /// Does nothing when the group is not being edited. The group stays
    /// closed even if persisting fails.
    pub fn close_edit_mode(&self, mesh: &mut Mesh, group: usize) -> Result<()> {
        {
            let g = mesh.dataset_group_mut(group)?;
            if !g.is_in_edit_mode() {
                return Ok(());
            }
            let statistics = group_statistics(g);
            g.set_statistics(statistics);
            g.stop_editing();
        }

        let g = mesh.dataset_group(group)?.group();
        let driver = self
            .driver_by_name(g.driver_name())
            .ok_or_else(|| MeshdalError::missing_driver(g.driver_name()))?;

        if !driver.has_write_dataset_capability(g.data_location()) {
            return Err(driver.missing(Capability::write_datasets_on(g.data_location())));
        }

        driver.persist(g, mesh).map_err(|e| {
            warn!(group = g.name(), uri = g.uri(), error = %e, "failed to persist dataset group");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetGroup, Vertex};
    use crate::drivers::Capabilities;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Recorder {
        persisted: AtomicUsize,
    }

    impl Driver for Recorder {
        fn name(&self) -> &str {
            "RECORDER"
        }
        fn long_name(&self) -> &str {
            "Recording test driver"
        }
        fn filters(&self) -> &str {
            "*.rec"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::empty()
                .with(Capability::ReadMesh)
                .with(Capability::WriteDatasetsOnVertices2D)
        }
        fn can_read_mesh(&self, path: &Path) -> bool {
            path.extension().map_or(false, |e| e == "toml")
        }
        fn load(&self, path: &Path) -> Result<Mesh> {
            triangle(&path.display().to_string())
        }
        fn persist(&self, _group: &DatasetGroup, _mesh: &Mesh) -> Result<()> {
            self.persisted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Greedy;

    impl Driver for Greedy {
        fn name(&self) -> &str {
            "GREEDY"
        }
        fn long_name(&self) -> &str {
            "Opens anything"
        }
        fn filters(&self) -> &str {
            "*"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::empty().with(Capability::ReadMesh)
        }
        fn can_read_mesh(&self, _path: &Path) -> bool {
            true
        }
        fn load(&self, _path: &Path) -> Result<Mesh> {
            triangle("greedy")
        }
    }

    fn triangle(uri: &str) -> Result<Mesh> {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        Mesh::new("RECORDER", uri, vertices, vec![vec![0, 1, 2]])
    }

    fn manifest() -> &'static Path {
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"))
    }

    #[test]
    fn first_registered_driver_wins() {
        let drivers: Vec<Arc<dyn Driver>> = vec![Arc::new(Greedy), Arc::new(Recorder::default())];
        let manager = DriverManager::with_drivers(drivers);
        assert_eq!(manager.load(manifest()).unwrap().uri(), "greedy");

        let drivers: Vec<Arc<dyn Driver>> = vec![Arc::new(Recorder::default()), Arc::new(Greedy)];
        let manager = DriverManager::with_drivers(drivers);
        assert_ne!(manager.load(manifest()).unwrap().uri(), "greedy");
    }

    #[test]
    fn missing_file_and_unknown_format() {
        let drivers: Vec<Arc<dyn Driver>> = vec![Arc::new(Recorder::default())];
        let manager = DriverManager::with_drivers(drivers);
        assert!(matches!(
            manager.load(Path::new("/definitely/not/here.rec")),
            Err(MeshdalError::FileNotFound { .. })
        ));
        let lib = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/src/lib.rs"));
        assert!(matches!(
            manager.load(lib),
            Err(MeshdalError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn lookup_by_index_and_name() {
        let manager = DriverManager::new();
        assert_eq!(manager.drivers_count(), 3);
        assert_eq!(manager.driver(1).unwrap().name(), "TUFLOWFV");
        assert!(manager.driver(3).is_none());
        assert!(manager.driver_by_name("ASCII_DAT").is_some());
        assert!(manager.driver_by_name("XMDF").is_none());
    }

    #[test]
    fn group_creation_respects_capabilities() {
        let recorder = Arc::new(Recorder::default());
        let manager = DriverManager::with_drivers(vec![recorder.clone() as Arc<dyn Driver>]);
        let mut mesh = triangle("t").unwrap();

        let rejected = manager.add_dataset_group(
            &mut mesh,
            "faces",
            DataLocation::OnFaces2D,
            true,
            recorder.as_ref(),
            "out.rec",
        );
        assert!(matches!(rejected, Err(MeshdalError::MissingDriverCapability { .. })));
        assert_eq!(mesh.dataset_group_count(), 0);

        let index = manager
            .add_dataset_group(
                &mut mesh,
                "depth",
                DataLocation::OnVertices2D,
                true,
                recorder.as_ref(),
                "out.rec",
            )
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(mesh.dataset_group_count(), 1);
        assert!(mesh.dataset_group(0).unwrap().is_in_edit_mode());
    }

    #[test]
    fn add_dataset_checks_preconditions() {
        let recorder = Arc::new(Recorder::default());
        let manager = DriverManager::with_drivers(vec![recorder.clone() as Arc<dyn Driver>]);
        let mut mesh = triangle("t").unwrap();
        let g = manager
            .add_dataset_group(
                &mut mesh,
                "depth",
                DataLocation::OnVertices2D,
                true,
                recorder.as_ref(),
                "out.rec",
            )
            .unwrap();

        assert!(matches!(
            manager.add_dataset(&mut mesh, g, 0.0, &[1.0, 2.0], None),
            Err(MeshdalError::InvalidData(_))
        ));
        let first = manager.add_dataset(&mut mesh, g, 0.0, &[1.0, 2.0, 3.0], Some(&[1][..]));
        assert_eq!(first.unwrap(), 0);
        assert_eq!(manager.add_dataset(&mut mesh, g, 1.0, &[4.0, 5.0, 6.0], None).unwrap(), 1);

        let ds = mesh.dataset(g, 0).unwrap();
        assert!(ds.has_active_flag_capability());
        assert_eq!(ds.minimum_maximum(), (1.0, 3.0));
    }

    #[test]
    fn close_edit_mode_persists_once() {
        let recorder = Arc::new(Recorder::default());
        let manager = DriverManager::with_drivers(vec![recorder.clone() as Arc<dyn Driver>]);
        let mut mesh = triangle("t").unwrap();
        let g = manager
            .add_dataset_group(
                &mut mesh,
                "depth",
                DataLocation::OnVertices2D,
                true,
                recorder.as_ref(),
                "out.rec",
            )
            .unwrap();
        manager.add_dataset(&mut mesh, g, 0.0, &[1.0, 2.0, 3.0], None).unwrap();
        manager.add_dataset(&mut mesh, g, 1.0, &[-1.0, 8.0, 3.0], None).unwrap();

        manager.close_edit_mode(&mut mesh, g).unwrap();
        assert_eq!(recorder.persisted.load(Ordering::SeqCst), 1);
        let group = mesh.dataset_group(g).unwrap();
        assert!(!group.is_in_edit_mode());
        assert_eq!(group.minimum_maximum(), (-1.0, 8.0));

        manager.close_edit_mode(&mut mesh, g).unwrap();
        assert_eq!(recorder.persisted.load(Ordering::SeqCst), 1);

        assert!(matches!(
            manager.add_dataset(&mut mesh, g, 2.0, &[0.0; 3], None),
            Err(MeshdalError::IncompatibleDataset(_))
        ));
    }

    #[test]
    fn save_rejects_unknown_and_incapable_drivers() {
        let manager = DriverManager::new();
        let mesh = triangle("t").unwrap();
        let out = Path::new("unused.2dm");
        assert!(matches!(
            manager.save(&mesh, out, "NOPE"),
            Err(MeshdalError::MissingDriver { .. })
        ));
        assert!(matches!(
            manager.save(&mesh, out, "TUFLOWFV"),
            Err(MeshdalError::MissingDriverCapability { .. })
        ));
    }
}
