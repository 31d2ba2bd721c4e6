//! Datasets: one time step of values over a mesh.
//!
//! Bulk access goes through windowed reads. A caller passes `(index_start,
//! count, buffer)` and receives the number of elements written, which is
//! `min(total - index_start, count)`; a start at or past the end writes
//! nothing and returns 0.

use super::group::GroupRef;
use super::statistics::Statistics;
use super::DataLocation;
use crate::error::{MeshdalError, Result};
use std::fmt;

/// Kind of values requested from [`DatasetRef::read_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// One double per vertex or face.
    ScalarDouble,
    /// Interleaved x,y doubles per vertex or face.
    Vector2dDouble,
    /// One active flag per face.
    ActiveInteger,
    /// Number of vertical levels per face.
    VerticalLevelCountInteger,
    /// Elevation of every layer boundary, stacked face by face.
    VerticalLevelDouble,
    /// Index of the first volume of each face.
    FaceIndexToVolumeIndexInteger,
    /// One double per volume.
    ScalarVolumesDouble,
    /// Interleaved x,y doubles per volume.
    Vector2dVolumesDouble,
}

impl DataType {
    /// Whether values of this type are integers.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::ActiveInteger
                | DataType::VerticalLevelCountInteger
                | DataType::FaceIndexToVolumeIndexInteger
        )
    }

    fn is_vector(self) -> bool {
        matches!(
            self,
            DataType::Vector2dDouble | DataType::Vector2dVolumesDouble
        )
    }
}

/// Values returned by a typed read.
#[derive(Debug, Clone, PartialEq)]
pub enum DataBlock {
    /// Floating point values.
    Doubles(Vec<f64>),
    /// Integer values.
    Integers(Vec<i32>),
}

impl DataBlock {
    /// Number of stored elements (vectors count twice).
    pub fn len(&self) -> usize {
        match self {
            DataBlock::Doubles(v) => v.len(),
            DataBlock::Integers(v) => v.len(),
        }
    }

    /// True when nothing was read.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow as doubles.
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            DataBlock::Doubles(v) => Some(v),
            DataBlock::Integers(_) => None,
        }
    }

    /// Borrow as integers.
    pub fn as_integers(&self) -> Option<&[i32]> {
        match self {
            DataBlock::Integers(v) => Some(v),
            DataBlock::Doubles(_) => None,
        }
    }
}

/// Scalar properties shared by every dataset implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    /// Offset from the group's reference time, in hours.
    pub time: f64,
    /// Number of values (vertices or faces, depending on location).
    pub values_count: usize,
    /// Total stacked layer count; 0 for 2D data.
    pub volumes_count: usize,
    /// Largest number of levels under any face; 0 for 2D data.
    pub maximum_vertical_levels_count: usize,
    /// Whether the time step holds usable data.
    pub is_valid: bool,
    /// Whether [`Dataset::active_data`] is meaningful.
    pub supports_active_flag: bool,
    /// Cached minimum/maximum.
    pub statistics: Statistics,
}

impl DatasetInfo {
    /// Info for a 2D dataset with `values_count` values.
    pub fn new_2d(time: f64, values_count: usize) -> Self {
        Self {
            time,
            values_count,
            volumes_count: 0,
            maximum_vertical_levels_count: 0,
            is_valid: true,
            supports_active_flag: false,
            statistics: Statistics::default(),
        }
    }

    /// Info for a 3D dataset stacked under `faces_count` faces.
    pub fn new_3d(
        time: f64,
        faces_count: usize,
        volumes_count: usize,
        maximum_vertical_levels_count: usize,
    ) -> Self {
        Self {
            time,
            values_count: faces_count,
            volumes_count,
            maximum_vertical_levels_count,
            is_valid: true,
            supports_active_flag: false,
            statistics: Statistics::default(),
        }
    }
}

/// Number of elements a window starting at `index_start` may copy.
pub(crate) fn window_len(total: usize, index_start: usize, count: usize) -> usize {
    if count == 0 || index_start >= total {
        0
    } else {
        (total - index_start).min(count)
    }
}

fn unsupported(what: &str) -> MeshdalError {
    MeshdalError::incompatible_dataset(format!("dataset does not provide {what}"))
}

/// A single time step of a dataset group.
///
/// Implementations override the reads their data location supports; the
/// defaults reject the request. Every read follows the windowed protocol
/// and never writes past `buffer`.
pub trait Dataset: fmt::Debug {
    /// Shared properties.
    fn info(&self) -> &DatasetInfo;

    /// Mutable shared properties.
    fn info_mut(&mut self) -> &mut DatasetInfo;

    /// Scalar values on vertices or faces.
    fn scalar_data(&self, _index_start: usize, _count: usize, _buffer: &mut [f64]) -> Result<usize> {
        Err(unsupported("scalar data"))
    }

    /// Interleaved vector values on vertices or faces; `buffer` holds `2 * count`.
    fn vector_data(&self, _index_start: usize, _count: usize, _buffer: &mut [f64]) -> Result<usize> {
        Err(unsupported("vector data"))
    }

    /// Active flag (0 or 1) per face.
    fn active_data(&self, _index_start: usize, _count: usize, _buffer: &mut [i32]) -> Result<usize> {
        Err(unsupported("active flags"))
    }

    /// Vertical level count per face.
    fn vertical_level_count_data(
        &self,
        _index_start: usize,
        _count: usize,
        _buffer: &mut [i32],
    ) -> Result<usize> {
        Err(unsupported("vertical level counts"))
    }

    /// Layer boundary elevations.
    fn vertical_level_data(
        &self,
        _index_start: usize,
        _count: usize,
        _buffer: &mut [f64],
    ) -> Result<usize> {
        Err(unsupported("vertical levels"))
    }

    /// 0-based index of the first volume under each face.
    fn face_to_volume_data(
        &self,
        _index_start: usize,
        _count: usize,
        _buffer: &mut [i32],
    ) -> Result<usize> {
        Err(unsupported("face to volume indices"))
    }

    /// Scalar values per volume.
    fn scalar_volumes_data(
        &self,
        _index_start: usize,
        _count: usize,
        _buffer: &mut [f64],
    ) -> Result<usize> {
        Err(unsupported("scalar volume data"))
    }

    /// Interleaved vector values per volume; `buffer` holds `2 * count`.
    fn vector_volumes_data(
        &self,
        _index_start: usize,
        _count: usize,
        _buffer: &mut [f64],
    ) -> Result<usize> {
        Err(unsupported("vector volume data"))
    }
}

/// Borrowed view of a dataset together with its group and mesh.
#[derive(Debug, Clone, Copy)]
pub struct DatasetRef<'a> {
    group: GroupRef<'a>,
    dataset: &'a dyn Dataset,
    index: usize,
}

impl<'a> DatasetRef<'a> {
    pub(crate) fn new(group: GroupRef<'a>, dataset: &'a dyn Dataset, index: usize) -> Self {
        Self {
            group,
            dataset,
            index,
        }
    }

    /// Owning group.
    pub fn group(&self) -> GroupRef<'a> {
        self.group
    }

    /// Position inside the group.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Underlying implementation.
    pub fn dataset(&self) -> &'a dyn Dataset {
        self.dataset
    }

    /// Time in hours relative to the group's reference time.
    pub fn time(&self) -> f64 {
        self.dataset.info().time
    }

    /// Total number of volumes; 0 for 2D data.
    pub fn volumes_count(&self) -> usize {
        self.dataset.info().volumes_count
    }

    /// Largest vertical level count under a face.
    pub fn maximum_vertical_levels_count(&self) -> usize {
        self.dataset.info().maximum_vertical_levels_count
    }

    /// Number of values (vertices or faces).
    pub fn value_count(&self) -> usize {
        self.dataset.info().values_count
    }

    /// Whether this time step holds usable data.
    pub fn is_valid(&self) -> bool {
        self.dataset.info().is_valid
    }

    /// Cached minimum and maximum.
    pub fn minimum_maximum(&self) -> (f64, f64) {
        let stats = self.dataset.info().statistics;
        (stats.minimum, stats.maximum)
    }

    /// Whether active flags can be read.
    pub fn has_active_flag_capability(&self) -> bool {
        self.dataset.info().supports_active_flag
    }

    /// Read `count` elements of `data_type` starting at `index_start`.
    ///
    /// The request is first checked against the group's shape and location,
    /// then against the number of available elements; a window that does not
    /// fit entirely is rejected before anything is read.
    pub fn read_data(
        &self,
        index_start: usize,
        count: usize,
        data_type: DataType,
    ) -> Result<DataBlock> {
        let total = self.available(data_type)?;

        if total <= index_start {
            return Err(MeshdalError::incompatible_dataset(format!(
                "start index {index_start} is out of range ({total} values)"
            )));
        }
        if count > total - index_start {
            return Err(MeshdalError::incompatible_dataset(format!(
                "window {index_start}+{count} exceeds {total} values"
            )));
        }

        let d = self.dataset;
        if data_type.is_integer() {
            let mut buffer = vec![0i32; count];
            let written = match data_type {
                DataType::ActiveInteger => d.active_data(index_start, count, &mut buffer)?,
                DataType::VerticalLevelCountInteger => {
                    d.vertical_level_count_data(index_start, count, &mut buffer)?
                }
                _ => d.face_to_volume_data(index_start, count, &mut buffer)?,
            };
            buffer.truncate(written);
            return Ok(DataBlock::Integers(buffer));
        }

        let width = if data_type.is_vector() { 2 } else { 1 };
        let len = count.checked_mul(width).ok_or_else(|| {
            MeshdalError::incompatible_dataset(format!("window of {count} values is too large"))
        })?;
        let mut buffer = vec![0f64; len];
        let written = match data_type {
            DataType::ScalarDouble => d.scalar_data(index_start, count, &mut buffer)?,
            DataType::Vector2dDouble => d.vector_data(index_start, count, &mut buffer)?,
            DataType::VerticalLevelDouble => d.vertical_level_data(index_start, count, &mut buffer)?,
            DataType::ScalarVolumesDouble => d.scalar_volumes_data(index_start, count, &mut buffer)?,
            _ => d.vector_volumes_data(index_start, count, &mut buffer)?,
        };
        buffer.truncate(written * width);
        Ok(DataBlock::Doubles(buffer))
    }

    /// Number of elements available for `data_type`, or an error when the
    /// type does not fit this dataset.
    fn available(&self, data_type: DataType) -> Result<usize> {
        let group = self.group.group();
        let location = group.data_location();
        let is_scalar = group.is_scalar();
        let faces = self.group.mesh().face_count();
        let info = self.dataset.info();
        let is_2d = matches!(
            location,
            DataLocation::OnVertices2D | DataLocation::OnFaces2D
        );
        let is_3d = location == DataLocation::OnVolumes3D;

        let mismatch = || {
            Err(MeshdalError::incompatible_dataset(format!(
                "{data_type:?} does not match a {} group on {location:?}",
                if is_scalar { "scalar" } else { "vector" }
            )))
        };

        match data_type {
            DataType::ScalarDouble if is_scalar && is_2d => Ok(info.values_count),
            DataType::Vector2dDouble if !is_scalar && is_2d => Ok(info.values_count),
            DataType::ActiveInteger if info.supports_active_flag => Ok(faces),
            DataType::VerticalLevelCountInteger | DataType::FaceIndexToVolumeIndexInteger
                if is_3d =>
            {
                Ok(faces)
            }
            DataType::VerticalLevelDouble if is_3d => Ok(faces + info.volumes_count),
            DataType::ScalarVolumesDouble if is_3d && is_scalar => Ok(info.volumes_count),
            DataType::Vector2dVolumesDouble if is_3d && !is_scalar => Ok(2 * info.volumes_count),
            _ => mismatch(),
        }
    }
}
