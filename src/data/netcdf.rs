//! NetCDF-backed [`ArraySource`].

use super::source::ArraySource;
use crate::error::{MeshdalError, Result};
use netcdf::Extent;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// NetCDF file opened for windowed reads.
pub struct NetcdfSource {
    path: PathBuf,
    file: netcdf::File,
}

impl fmt::Debug for NetcdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetcdfSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl NetcdfSource {
    /// Open a NetCDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)
            .map_err(|e| MeshdalError::NetCDF(format!("Failed to open {}: {e}", path.display())))?;
        debug!(path = %path.display(), "opened NetCDF file");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path of the opened file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| MeshdalError::invalid_data(format!("missing NetCDF variable {name}")))
    }

    fn attr_value_to_string(value: netcdf::AttributeValue) -> String {
        use netcdf::AttributeValue;

        match value {
            AttributeValue::Str(v) => v,
            AttributeValue::Strs(v) => v.join(", "),
            AttributeValue::Int(v) => v.to_string(),
            AttributeValue::Short(v) => v.to_string(),
            AttributeValue::Longlong(v) => v.to_string(),
            AttributeValue::Float(v) => v.to_string(),
            AttributeValue::Double(v) => v.to_string(),
            other => format!("{other:?}"),
        }
    }
}

impl ArraySource for NetcdfSource {
    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.file.dimension(name).map(|d| d.len())
    }

    fn array_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name().to_string()).collect()
    }

    fn array_dimensions(&self, name: &str) -> Option<Vec<String>> {
        self.file
            .variable(name)
            .map(|v| {
                v.dimensions()
                    .iter()
                    .map(|d: &netcdf::Dimension<'_>| d.name().to_string())
                    .collect()
            })
    }

    fn attribute_str(&self, name: &str, attribute: &str) -> Option<String> {
        let var = self.file.variable(name)?;
        // Probing absent attributes makes HDF5 print to stderr.
        if !var.attributes().any(|a| a.name() == attribute) {
            return None;
        }
        var.attribute_value(attribute)?
            .ok()
            .map(Self::attr_value_to_string)
    }

    fn read_doubles(&self, name: &str, start: usize, count: usize) -> Result<Vec<f64>> {
        self.variable(name)?
            .get_values::<f64, _>([Extent::from(start..start + count)])
            .map_err(|e| MeshdalError::NetCDF(format!("Failed to read {name}: {e}")))
    }

    fn read_ints(&self, name: &str, start: usize, count: usize) -> Result<Vec<i32>> {
        self.variable(name)?
            .get_values::<i32, _>([Extent::from(start..start + count)])
            .map_err(|e| MeshdalError::NetCDF(format!("Failed to read {name}: {e}")))
    }

    fn read_doubles_at(&self, name: &str, row: usize, start: usize, count: usize) -> Result<Vec<f64>> {
        self.variable(name)?
            .get_values::<f64, _>([Extent::from(row), Extent::from(start..start + count)])
            .map_err(|e| MeshdalError::NetCDF(format!("Failed to read {name}[{row}]: {e}")))
    }

    fn read_ints_at(&self, name: &str, row: usize, start: usize, count: usize) -> Result<Vec<i32>> {
        self.variable(name)?
            .get_values::<i32, _>([Extent::from(row), Extent::from(start..start + count)])
            .map_err(|e| MeshdalError::NetCDF(format!("Failed to read {name}[{row}]: {e}")))
    }

    fn read_all_ints(&self, name: &str) -> Result<Vec<i32>> {
        self.variable(name)?
            .get_values::<i32, _>(..)
            .map_err(|e| MeshdalError::NetCDF(format!("Failed to read {name}: {e}")))
    }
}
