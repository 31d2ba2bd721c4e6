//! Error types for meshdal.
//!
//! This module provides a unified error handling approach using `thiserror`.
//! Every error maps onto one legacy [`Status`] code through [`MeshdalError::status`].

use crate::status::Status;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for meshdal operations.
pub type Result<T> = std::result::Result<T, MeshdalError>;

/// Errors that can occur while loading, querying or writing meshes.
#[derive(Debug, Error)]
pub enum MeshdalError {
    /// The requested file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// No driver recognised the file.
    #[error("Unknown format: {path}")]
    UnknownFormat {
        /// Offending path.
        path: PathBuf,
    },

    /// No driver is registered under the given name or index.
    #[error("Missing driver: {name}")]
    MissingDriver {
        /// Requested driver name (or index).
        name: String,
    },

    /// The driver exists but cannot perform the requested operation.
    #[error("Driver {driver} does not support {capability}")]
    MissingDriverCapability {
        /// Driver name.
        driver: String,
        /// Missing capability, human readable.
        capability: String,
    },

    /// Mesh geometry is inconsistent with the request.
    #[error("Incompatible mesh: {0}")]
    IncompatibleMesh(String),

    /// Dataset group is inconsistent with the request.
    #[error("Incompatible dataset group: {0}")]
    IncompatibleDatasetGroup(String),

    /// Dataset is inconsistent with the request.
    #[error("Incompatible dataset: {0}")]
    IncompatibleDataset(String),

    /// Malformed input data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Writing a file failed.
    #[error("Failed to write {path}")]
    FailToWriteToDisk {
        /// Destination path.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a NetCDF file.
    #[error("NetCDF error: {0}")]
    NetCDF(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshdalError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create an UnknownFormat error.
    pub fn unknown_format(path: impl Into<PathBuf>) -> Self {
        Self::UnknownFormat { path: path.into() }
    }

    /// Create a MissingDriver error.
    pub fn missing_driver(name: impl Into<String>) -> Self {
        Self::MissingDriver { name: name.into() }
    }

    /// Create a MissingDriverCapability error.
    pub fn missing_capability(driver: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::MissingDriverCapability {
            driver: driver.into(),
            capability: capability.into(),
        }
    }

    /// Create an IncompatibleMesh error.
    pub fn incompatible_mesh(msg: impl Into<String>) -> Self {
        Self::IncompatibleMesh(msg.into())
    }

    /// Create an IncompatibleDatasetGroup error.
    pub fn incompatible_group(msg: impl Into<String>) -> Self {
        Self::IncompatibleDatasetGroup(msg.into())
    }

    /// Create an IncompatibleDataset error.
    pub fn incompatible_dataset(msg: impl Into<String>) -> Self {
        Self::IncompatibleDataset(msg.into())
    }

    /// Create an InvalidData error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a FailToWriteToDisk error.
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FailToWriteToDisk {
            path: path.into(),
            source,
        }
    }

    /// Legacy status code for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::FileNotFound { .. } => Status::ErrFileNotFound,
            Self::UnknownFormat { .. } | Self::NetCDF(_) => Status::ErrUnknownFormat,
            Self::MissingDriver { .. } => Status::ErrMissingDriver,
            Self::MissingDriverCapability { .. } => Status::ErrMissingDriverCapability,
            Self::IncompatibleMesh(_) => Status::ErrIncompatibleMesh,
            Self::IncompatibleDatasetGroup(_) => Status::ErrIncompatibleDatasetGroup,
            Self::IncompatibleDataset(_) => Status::ErrIncompatibleDataset,
            Self::InvalidData(_) | Self::Io(_) => Status::ErrInvalidData,
            Self::FailToWriteToDisk { .. } => Status::ErrFailToWriteToDisk,
        }
    }
}

impl From<netcdf::Error> for MeshdalError {
    fn from(err: netcdf::Error) -> Self {
        Self::NetCDF(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_maps_to_a_status() {
        assert_eq!(
            MeshdalError::file_not_found("a.nc").status(),
            Status::ErrFileNotFound
        );
        assert_eq!(
            MeshdalError::NetCDF("bad header".into()).status(),
            Status::ErrUnknownFormat
        );
        assert_eq!(
            MeshdalError::missing_capability("2DM", "write datasets").status(),
            Status::ErrMissingDriverCapability
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            MeshdalError::write_failed("out.dat", io).status(),
            Status::ErrFailToWriteToDisk
        );
    }

    #[test]
    fn messages_name_the_offender() {
        let err = MeshdalError::missing_driver("XMDF");
        assert_eq!(err.to_string(), "Missing driver: XMDF");
    }
}
