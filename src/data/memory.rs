//! In-memory 2D datasets, used by the write path and by drivers that parse
//! whole files up front.

use super::dataset::{window_len, Dataset, DatasetInfo};
use crate::error::{MeshdalError, Result};
use ndarray::{Array1, Array2};

/// 2D dataset whose values live in memory.
///
/// Values are stored as a `values_count x components` array, so a vector
/// dataset is already interleaved x,y in its standard layout.
#[derive(Debug, Clone)]
pub struct MemoryDataset2D {
    info: DatasetInfo,
    values: Array2<f64>,
    active: Option<Array1<i32>>,
}

impl MemoryDataset2D {
    /// Build from flat values. `values` must hold `values_count` scalars or
    /// `2 * values_count` interleaved vector components.
    pub fn new(time: f64, values_count: usize, is_scalar: bool, values: &[f64]) -> Result<Self> {
        let components = if is_scalar { 1 } else { 2 };
        if values.len() != values_count * components {
            return Err(MeshdalError::invalid_data(format!(
                "expected {} values, got {}",
                values_count * components,
                values.len()
            )));
        }
        let values = Array2::from_shape_vec((values_count, components), values.to_vec())
            .map_err(|e| MeshdalError::invalid_data(format!("Invalid shape/data size: {e}")))?;

        Ok(Self {
            info: DatasetInfo::new_2d(time, values_count),
            values,
            active: None,
        })
    }

    /// Attach one active flag per face. Any non-zero flag counts as active.
    pub fn with_active_flags(mut self, flags: &[i32]) -> Self {
        self.active = Some(flags.iter().map(|&f| i32::from(f != 0)).collect());
        self.info.supports_active_flag = true;
        self
    }

    /// Number of components per value (1 or 2).
    pub fn components(&self) -> usize {
        self.values.ncols()
    }

    /// Value of component `component` at `index`.
    pub fn value(&self, index: usize, component: usize) -> Option<f64> {
        self.values.get((index, component)).copied()
    }

    fn copy_values(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> usize {
        let width = self.components();
        let n = window_len(self.values.nrows(), index_start, count).min(buffer.len() / width);
        if n == 0 {
            return 0;
        }
        let Some(values) = self.values.as_slice() else {
            return 0;
        };
        let offset = index_start * width;
        buffer[..n * width].copy_from_slice(&values[offset..offset + n * width]);
        n
    }
}

impl Dataset for MemoryDataset2D {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DatasetInfo {
        &mut self.info
    }

    fn scalar_data(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> Result<usize> {
        if self.components() != 1 {
            return Err(MeshdalError::incompatible_dataset("dataset holds vector data"));
        }
        Ok(self.copy_values(index_start, count, buffer))
    }

    fn vector_data(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> Result<usize> {
        if self.components() != 2 {
            return Err(MeshdalError::incompatible_dataset("dataset holds scalar data"));
        }
        Ok(self.copy_values(index_start, count, buffer))
    }

    fn active_data(&self, index_start: usize, count: usize, buffer: &mut [i32]) -> Result<usize> {
        let flags = self
            .active
            .as_ref()
            .ok_or_else(|| MeshdalError::incompatible_dataset("dataset has no active flags"))?;
        let n = window_len(flags.len(), index_start, count).min(buffer.len());
        for (dst, src) in buffer.iter_mut().zip(flags.iter().skip(index_start).take(n)) {
            *dst = *src;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_window_reads() {
        let ds = MemoryDataset2D::new(1.5, 4, true, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut buf = [0.0; 3];
        assert_eq!(ds.scalar_data(0, 3, &mut buf).unwrap(), 3);
        assert_eq!(buf, [1.0, 2.0, 3.0]);
        assert_eq!(ds.scalar_data(2, 3, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[3.0, 4.0]);
    }

    #[test]
    fn read_past_end_leaves_buffer_untouched() {
        let ds = MemoryDataset2D::new(0.0, 2, true, &[5.0, 6.0]).unwrap();
        let mut buf = [-1.0; 2];
        assert_eq!(ds.scalar_data(2, 2, &mut buf).unwrap(), 0);
        assert_eq!(buf, [-1.0, -1.0]);
    }

    #[test]
    fn vector_values_are_interleaved() {
        let ds = MemoryDataset2D::new(0.0, 2, false, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut buf = [0.0; 4];
        assert_eq!(ds.vector_data(1, 5, &mut buf).unwrap(), 1);
        assert_eq!(&buf[..2], &[3.0, 4.0]);
        assert!(ds.scalar_data(0, 1, &mut buf).is_err());
        assert_eq!(ds.value(1, 1), Some(4.0));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(MemoryDataset2D::new(0.0, 3, false, &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn active_flags_are_normalised() {
        let ds = MemoryDataset2D::new(0.0, 3, true, &[0.0; 3])
            .unwrap()
            .with_active_flags(&[5, 0]);
        assert!(ds.info().supports_active_flag);
        let mut buf = [9; 2];
        assert_eq!(ds.active_data(0, 2, &mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 0]);
    }
}
