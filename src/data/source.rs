//! Windowed access to named arrays of a backing file.

use crate::error::{MeshdalError, Result};
use std::fmt;

/// Backing store that hands out bounded slices of named arrays.
///
/// Drivers that stream values (rather than parsing whole files) read through
/// this trait so each request touches only `count` elements.
pub trait ArraySource: fmt::Debug {
    /// Length of dimension `name`.
    fn dimension_len(&self, name: &str) -> Option<usize>;

    /// Names of all arrays, in file order.
    fn array_names(&self) -> Vec<String>;

    /// Dimension names of array `name`.
    fn array_dimensions(&self, name: &str) -> Option<Vec<String>>;

    /// String attribute `attribute` of array `name`.
    fn attribute_str(&self, name: &str, attribute: &str) -> Option<String>;

    /// `count` doubles of a 1-D array starting at `start`.
    fn read_doubles(&self, name: &str, start: usize, count: usize) -> Result<Vec<f64>>;

    /// `count` integers of a 1-D array starting at `start`.
    fn read_ints(&self, name: &str, start: usize, count: usize) -> Result<Vec<i32>>;

    /// `count` doubles of row `row` of a 2-D array starting at column `start`.
    fn read_doubles_at(&self, name: &str, row: usize, start: usize, count: usize) -> Result<Vec<f64>>;

    /// `count` integers of row `row` of a 2-D array starting at column `start`.
    fn read_ints_at(&self, name: &str, row: usize, start: usize, count: usize) -> Result<Vec<i32>>;

    /// Whole array, flattened row-major.
    fn read_all_ints(&self, name: &str) -> Result<Vec<i32>>;

    /// Whether array `name` exists.
    fn has_array(&self, name: &str) -> bool {
        self.array_dimensions(name).is_some()
    }
}

#[derive(Debug, Clone)]
struct MemoryArray {
    name: String,
    dimensions: Vec<String>,
    values: Vec<f64>,
    attributes: Vec<(String, String)>,
}

/// [`ArraySource`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    dimensions: Vec<(String, usize)>,
    arrays: Vec<MemoryArray>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dimension.
    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        self.dimensions.push((name.to_string(), len));
        self
    }

    /// Add an array over the named dimensions, values flattened row-major.
    pub fn with_array(mut self, name: &str, dimensions: &[&str], values: Vec<f64>) -> Self {
        self.arrays.push(MemoryArray {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            values,
            attributes: Vec::new(),
        });
        self
    }

    /// Add a string attribute to an existing array.
    pub fn with_attribute(mut self, array: &str, key: &str, value: &str) -> Self {
        if let Some(a) = self.arrays.iter_mut().find(|a| a.name == array) {
            a.attributes.push((key.to_string(), value.to_string()));
        }
        self
    }

    fn array(&self, name: &str) -> Result<&MemoryArray> {
        self.arrays
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| MeshdalError::invalid_data(format!("missing array {name}")))
    }

    fn window(&self, name: &str, row: usize, start: usize, count: usize) -> Result<&[f64]> {
        let array = self.array(name)?;
        let row_len: usize = array
            .dimensions
            .iter()
            .skip(1)
            .map(|d| self.dimension_len(d).unwrap_or(0))
            .product();
        let row_len = if array.dimensions.len() > 1 {
            row_len
        } else {
            array.values.len()
        };
        let offset = row * row_len + start;
        if start + count > row_len || offset + count > array.values.len() {
            return Err(MeshdalError::invalid_data(format!(
                "window {start}+{count} of row {row} is outside {name}"
            )));
        }
        Ok(&array.values[offset..offset + count])
    }
}

impl ArraySource for MemorySource {
    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, len)| *len)
    }

    fn array_names(&self) -> Vec<String> {
        self.arrays.iter().map(|a| a.name.clone()).collect()
    }

    fn array_dimensions(&self, name: &str) -> Option<Vec<String>> {
        self.arrays
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.dimensions.clone())
    }

    fn attribute_str(&self, name: &str, attribute: &str) -> Option<String> {
        self.array(name)
            .ok()?
            .attributes
            .iter()
            .find(|(k, _)| k == attribute)
            .map(|(_, v)| v.clone())
    }

    fn read_doubles(&self, name: &str, start: usize, count: usize) -> Result<Vec<f64>> {
        Ok(self.window(name, 0, start, count)?.to_vec())
    }

    fn read_ints(&self, name: &str, start: usize, count: usize) -> Result<Vec<i32>> {
        Ok(self.window(name, 0, start, count)?.iter().map(|&v| v as i32).collect())
    }

    fn read_doubles_at(&self, name: &str, row: usize, start: usize, count: usize) -> Result<Vec<f64>> {
        Ok(self.window(name, row, start, count)?.to_vec())
    }

    fn read_ints_at(&self, name: &str, row: usize, start: usize, count: usize) -> Result<Vec<i32>> {
        Ok(self.window(name, row, start, count)?.iter().map(|&v| v as i32).collect())
    }

    fn read_all_ints(&self, name: &str) -> Result<Vec<i32>> {
        Ok(self.array(name)?.values.iter().map(|&v| v as i32).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemorySource {
        MemorySource::new()
            .with_dimension("Time", 2)
            .with_dimension("N", 3)
            .with_array("flat", &["N"], vec![1.0, 2.0, 3.0])
            .with_array("field", &["Time", "N"], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .with_attribute("field", "units", "m")
    }

    #[test]
    fn windows_address_rows() {
        let s = source();
        assert_eq!(s.read_doubles("flat", 1, 2).unwrap(), vec![2.0, 3.0]);
        assert_eq!(s.read_doubles_at("field", 1, 1, 2).unwrap(), vec![5.0, 6.0]);
        assert_eq!(s.read_ints_at("field", 0, 0, 1).unwrap(), vec![1]);
        assert!(s.read_doubles_at("field", 0, 2, 2).is_err());
    }

    #[test]
    fn metadata_lookup() {
        let s = source();
        assert_eq!(s.attribute_str("field", "units").as_deref(), Some("m"));
        assert_eq!(s.array_names(), vec!["flat", "field"]);
        assert!(s.has_array("flat"));
        assert!(!s.has_array("missing"));
        assert_eq!(s.dimension_len("N"), Some(3));
    }
}
