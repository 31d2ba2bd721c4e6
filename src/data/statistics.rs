//! Minimum/maximum statistics over datasets and groups.

use super::dataset::Dataset;
use super::group::DatasetGroup;
use super::DataLocation;
use crate::error::Result;

/// Values are pulled through the windowed reads in chunks of this size.
const STATISTICS_CHUNK: usize = 1000;

/// Minimum and maximum of a set of values. NaN when nothing was seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Smallest value.
    pub minimum: f64,
    /// Largest value.
    pub maximum: f64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            minimum: f64::NAN,
            maximum: f64::NAN,
        }
    }
}

impl Statistics {
    /// True when at least one value contributed.
    pub fn is_valid(&self) -> bool {
        !self.minimum.is_nan() && !self.maximum.is_nan()
    }

    /// Fold a single value in; NaN is ignored.
    pub fn update(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.minimum.is_nan() || value < self.minimum {
            self.minimum = value;
        }
        if self.maximum.is_nan() || value > self.maximum {
            self.maximum = value;
        }
    }

    /// Union of two ranges.
    pub fn combine(mut self, other: Statistics) -> Statistics {
        self.update(other.minimum);
        self.update(other.maximum);
        self
    }
}

/// Compute statistics for `dataset`, which belongs to a group with the given
/// `location` and shape. Vectors contribute their magnitude.
pub fn dataset_statistics(
    dataset: &dyn Dataset,
    location: DataLocation,
    is_scalar: bool,
) -> Result<Statistics> {
    let info = dataset.info();
    let total = if location == DataLocation::OnVolumes3D {
        info.volumes_count
    } else {
        info.values_count
    };

    let width = if is_scalar { 1 } else { 2 };
    let mut buffer = vec![0f64; STATISTICS_CHUNK * width];
    let mut stats = Statistics::default();
    let mut index_start = 0;

    while index_start < total {
        let read = match (location, is_scalar) {
            (DataLocation::OnVolumes3D, true) => {
                dataset.scalar_volumes_data(index_start, STATISTICS_CHUNK, &mut buffer)?
            }
            (DataLocation::OnVolumes3D, false) => {
                dataset.vector_volumes_data(index_start, STATISTICS_CHUNK, &mut buffer)?
            }
            (_, true) => dataset.scalar_data(index_start, STATISTICS_CHUNK, &mut buffer)?,
            (_, false) => dataset.vector_data(index_start, STATISTICS_CHUNK, &mut buffer)?,
        };
        if read == 0 {
            break;
        }

        if is_scalar {
            buffer[..read].iter().for_each(|&v| stats.update(v));
        } else {
            for pair in buffer[..read * 2].chunks_exact(2) {
                stats.update(pair[0].hypot(pair[1]));
            }
        }
        index_start += read;
    }

    Ok(stats)
}

/// Union of the cached statistics of every dataset in `group`.
pub fn group_statistics(group: &DatasetGroup) -> Statistics {
    group
        .datasets()
        .iter()
        .fold(Statistics::default(), |acc, d| acc.combine(d.info().statistics))
}
