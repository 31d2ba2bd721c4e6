//! Meshdal - mesh and dataset abstraction over hydraulic model formats.
//!
//! Meshdal reads unstructured meshes and the time-varying results attached to
//! them through a registry of format drivers, and exposes the values through
//! a bounded, windowed read protocol so large result files never have to be
//! loaded whole.
//!
//! # Features
//!
//! - TUFLOW FV NetCDF results, including layered 3D volumes
//! - SMS 2DM meshes (read and write)
//! - ASCII `.dat` datasets (read and write)
//! - Vertex and face iterators with caller-owned buffers
//! - Cached minimum/maximum statistics per dataset and group
//!
//! # Example
//!
//! ```ignore
//! use meshdal::data::DataType;
//! use meshdal::DriverManager;
//! use std::path::Path;
//!
//! let mesh = DriverManager::instance().load(Path::new("results.nc"))?;
//! let group = mesh.dataset_group(1)?;
//! let first = group.dataset(0)?;
//! let depth = first.read_data(0, 100, DataType::ScalarDouble)?;
//! println!("{} values from {}", depth.len(), group.name());
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod api;
pub mod data;
pub mod drivers;
pub mod error;
pub mod status;
pub mod util;

pub use api::version;
pub use data::{DataLocation, Mesh};
pub use drivers::{Capabilities, Capability, Driver, DriverManager};
pub use error::{MeshdalError, Result};
pub use status::{last_status, Status};
