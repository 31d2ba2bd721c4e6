//! Dataset groups.

use super::dataset::{Dataset, DatasetRef};
use super::mesh::Mesh;
use super::statistics::Statistics;
use super::DataLocation;
use crate::error::{MeshdalError, Result};
use crate::util::time;
use chrono::NaiveDateTime;

/// Named, typed collection of time steps over one mesh.
///
/// Every dataset in the group shares the group's location and scalar/vector
/// shape. Metadata is an ordered multi-map: setting a key twice keeps both
/// entries.
#[derive(Debug)]
pub struct DatasetGroup {
    name: String,
    data_location: DataLocation,
    is_scalar: bool,
    metadata: Vec<(String, String)>,
    driver_name: String,
    uri: String,
    reference_time: Option<NaiveDateTime>,
    statistics: Statistics,
    in_edit_mode: bool,
    maximum_vertical_levels_count: usize,
    datasets: Vec<Box<dyn Dataset>>,
}

impl DatasetGroup {
    /// Create an empty group owned by `driver_name` and backed by `uri`.
    pub fn new(
        driver_name: impl Into<String>,
        uri: impl Into<String>,
        name: impl Into<String>,
        data_location: DataLocation,
        is_scalar: bool,
    ) -> Self {
        let name = name.into();
        Self {
            metadata: vec![("name".to_string(), name.clone())],
            name,
            data_location,
            is_scalar,
            driver_name: driver_name.into(),
            uri: uri.into(),
            reference_time: None,
            statistics: Statistics::default(),
            in_edit_mode: false,
            maximum_vertical_levels_count: 0,
            datasets: Vec::new(),
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the values live.
    pub fn data_location(&self) -> DataLocation {
        self.data_location
    }

    /// True for scalar data, false for 2D vectors.
    pub fn is_scalar(&self) -> bool {
        self.is_scalar
    }

    /// Driver responsible for persisting this group.
    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// File backing this group.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Metadata entries in insertion order.
    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// Append a metadata entry. Existing entries with the same key are kept.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.push((key.into(), value.into()));
    }

    /// First value stored under `key`.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Reference time of the dataset time offsets.
    pub fn reference_time(&self) -> Option<NaiveDateTime> {
        self.reference_time
    }

    /// Set the reference time.
    pub fn set_reference_time(&mut self, reference_time: Option<NaiveDateTime>) {
        self.reference_time = reference_time;
    }

    /// Cached statistics.
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Replace cached statistics.
    pub fn set_statistics(&mut self, statistics: Statistics) {
        self.statistics = statistics;
    }

    /// Whether datasets may still be added.
    pub fn is_in_edit_mode(&self) -> bool {
        self.in_edit_mode
    }

    /// Open the group for editing.
    pub fn start_editing(&mut self) {
        self.in_edit_mode = true;
    }

    /// Close the group for editing.
    pub fn stop_editing(&mut self) {
        self.in_edit_mode = false;
    }

    /// Largest vertical level count; 0 for 2D groups.
    pub fn maximum_vertical_levels_count(&self) -> usize {
        self.maximum_vertical_levels_count
    }

    /// Set the largest vertical level count.
    pub fn set_maximum_vertical_levels_count(&mut self, count: usize) {
        self.maximum_vertical_levels_count = count;
    }

    /// Datasets in time order of insertion.
    pub fn datasets(&self) -> &[Box<dyn Dataset>] {
        &self.datasets
    }

    /// Append a dataset.
    pub fn push_dataset(&mut self, dataset: Box<dyn Dataset>) {
        self.datasets.push(dataset);
    }
}

/// Borrowed view of a group, carrying the mesh it is attached to.
#[derive(Debug, Clone, Copy)]
pub struct GroupRef<'a> {
    mesh: &'a Mesh,
    group: &'a DatasetGroup,
    index: usize,
}

impl<'a> GroupRef<'a> {
    pub(crate) fn new(mesh: &'a Mesh, group: &'a DatasetGroup, index: usize) -> Self {
        Self { mesh, group, index }
    }

    /// Mesh the group is attached to.
    pub fn mesh(&self) -> &'a Mesh {
        self.mesh
    }

    /// Underlying group.
    pub fn group(&self) -> &'a DatasetGroup {
        self.group
    }

    /// Position inside the mesh.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of datasets.
    pub fn dataset_count(&self) -> usize {
        self.group.datasets.len()
    }

    /// Dataset at `index`.
    pub fn dataset(&self, index: usize) -> Result<DatasetRef<'a>> {
        let dataset = self.group.datasets.get(index).ok_or_else(|| {
            MeshdalError::incompatible_group(format!(
                "dataset index {index} out of range ({} datasets)",
                self.group.datasets.len()
            ))
        })?;
        Ok(DatasetRef::new(*self, dataset.as_ref(), index))
    }

    /// Iterate over all datasets.
    pub fn datasets(&self) -> impl Iterator<Item = DatasetRef<'a>> + 'a {
        let this = *self;
        this.group
            .datasets
            .iter()
            .enumerate()
            .map(move |(i, d)| DatasetRef::new(this, d.as_ref(), i))
    }

    /// Number of metadata entries.
    pub fn metadata_count(&self) -> usize {
        self.group.metadata.len()
    }

    /// Metadata key at `index`.
    pub fn metadata_key(&self, index: usize) -> Result<&'a str> {
        self.metadata_entry(index).map(|(k, _)| k.as_str())
    }

    /// Metadata value at `index`.
    pub fn metadata_value(&self, index: usize) -> Result<&'a str> {
        self.metadata_entry(index).map(|(_, v)| v.as_str())
    }

    fn metadata_entry(&self, index: usize) -> Result<&'a (String, String)> {
        self.group.metadata.get(index).ok_or_else(|| {
            MeshdalError::incompatible_dataset(format!("metadata index {index} out of range"))
        })
    }

    /// Group name.
    pub fn name(&self) -> &'a str {
        &self.group.name
    }

    /// True for scalar data.
    pub fn is_scalar(&self) -> bool {
        self.group.is_scalar
    }

    /// Where the values live.
    pub fn data_location(&self) -> DataLocation {
        self.group.data_location
    }

    /// Largest vertical level count.
    pub fn maximum_vertical_levels_count(&self) -> usize {
        self.group.maximum_vertical_levels_count
    }

    /// Cached minimum and maximum.
    pub fn minimum_maximum(&self) -> (f64, f64) {
        (self.group.statistics.minimum, self.group.statistics.maximum)
    }

    /// Whether the group is open for editing.
    pub fn is_in_edit_mode(&self) -> bool {
        self.group.in_edit_mode
    }

    /// Reference time as ISO-8601, empty when unknown.
    pub fn reference_time(&self) -> String {
        self.group
            .reference_time
            .map(time::to_iso8601)
            .unwrap_or_default()
    }

    /// Driver responsible for persisting this group.
    pub fn driver_name(&self) -> &'a str {
        &self.group.driver_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_keeps_duplicates_in_order() {
        let mut group = DatasetGroup::new("ASCII_DAT", "d.dat", "Depth", DataLocation::OnVertices2D, true);
        group.set_metadata("units", "m");
        group.set_metadata("units", "ft");

        let entries: Vec<_> = group.metadata().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, vec![("name", "Depth"), ("units", "m"), ("units", "ft")]);
        assert_eq!(group.metadata_value("units"), Some("m"));
    }

    #[test]
    fn edit_mode_toggles() {
        let mut group = DatasetGroup::new("ASCII_DAT", "d.dat", "Depth", DataLocation::OnFaces2D, false);
        assert!(!group.is_in_edit_mode());
        group.start_editing();
        assert!(group.is_in_edit_mode());
        group.stop_editing();
        assert!(!group.is_in_edit_mode());
    }
}
