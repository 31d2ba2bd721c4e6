//! TUFLOW FV NetCDF results.
//!
//! The mesh comes from the node and cell arrays; every `(Time, NumCells2D)`
//! variable becomes a face group and every `(Time, NumCells3D)` variable a
//! layered volume group. Values stay on disk and are read on demand.

mod dataset;

pub use dataset::{TuflowFvDataset2D, TuflowFvDataset3D, TuflowFvFile};

use super::{bed_elevation_group, Capabilities, Capability, Driver};
use crate::data::{
    dataset_statistics, group_statistics, ArraySource, DataLocation, Dataset, DatasetGroup,
    Face, Mesh, NetcdfSource, Vertex,
};
use crate::error::{MeshdalError, Result};
use crate::util::time::{self, TimeUnit};
use chrono::NaiveDateTime;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

const DRIVER_NAME: &str = "TUFLOWFV";

const TIME_VARIABLE: &str = "ResTime";

/// Variables that describe geometry or bookkeeping rather than results.
const IGNORED_VARIABLES: &[&str] = &[
    TIME_VARIABLE,
    "NL",
    "cell_Nvert",
    "cell_node",
    "idx2",
    "idx3",
    "cell_X",
    "cell_Y",
    "cell_Zb",
    "cell_A",
    "node_X",
    "node_Y",
    "node_Zb",
    "layerface_Z",
    "stat",
];

/// Prefix relabeling for derived quantities, checked in order.
const DERIVED_PREFIXES: &[(&str, &str)] = &[
    ("time at maximum value of ", "Time at Maximums"),
    ("time at minimum value of ", "Time at Minimums"),
    ("maximum value of ", "Maximums"),
    ("minimum value of ", "Minimums"),
];

/// Sizes read from the file's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    faces: usize,
    max_vertices_in_face: usize,
    vertices: usize,
    volumes: usize,
    level_faces: usize,
    timesteps: usize,
}

impl Dimensions {
    fn read(source: &dyn ArraySource) -> Result<Self> {
        let get = |name: &str| {
            source
                .dimension_len(name)
                .ok_or_else(|| MeshdalError::invalid_data(format!("missing dimension {name}")))
        };
        Ok(Self {
            faces: get("NumCells2D")?,
            max_vertices_in_face: get("MaxNumCellVert")?,
            vertices: get("NumVert2D")?,
            volumes: get("NumCells3D")?,
            level_faces: get("NumLayerFaces3D")?,
            timesteps: get("Time")?,
        })
    }
}

/// Which half of a vector a variable holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Scalar,
    X,
    Y,
}

/// Group name and component for a variable, from its `long_name`.
fn classify(variable: &str, long_name: Option<&str>) -> (String, Component) {
    let Some(long_name) = long_name.map(str::trim).filter(|l| !l.is_empty()) else {
        return (variable.to_string(), Component::Scalar);
    };

    let (base, suffix) = DERIVED_PREFIXES
        .iter()
        .find_map(|(prefix, suffix)| long_name.strip_prefix(prefix).map(|rest| (rest, Some(*suffix))))
        .unwrap_or((long_name, None));

    let (base, component) = if let Some(rest) = base.strip_prefix("x_") {
        (rest, Component::X)
    } else if let Some(rest) = base.strip_prefix("y_") {
        (rest, Component::Y)
    } else {
        (base, Component::Scalar)
    };

    let name = match suffix {
        Some(suffix) => format!("{base}/{suffix}"),
        None => base.to_string(),
    };
    (name, component)
}

/// Result variable (or vector pair) that becomes one dataset group.
#[derive(Debug, Clone, PartialEq)]
struct VariableGroup {
    name: String,
    location: DataLocation,
    x: Option<String>,
    y: Option<String>,
}

impl VariableGroup {
    fn is_scalar(&self) -> bool {
        self.x.is_none() || self.y.is_none()
    }

    /// Variable holding the first (or only) component.
    fn primary(&self) -> Option<&str> {
        self.x.as_deref().or(self.y.as_deref())
    }

    /// Variable holding the second component of a vector.
    fn secondary(&self) -> Option<&str> {
        if self.is_scalar() {
            None
        } else {
            self.y.as_deref()
        }
    }
}

fn scan_variables(source: &dyn ArraySource) -> Vec<VariableGroup> {
    let mut groups: Vec<VariableGroup> = Vec::new();

    for variable in source.array_names() {
        if IGNORED_VARIABLES.contains(&variable.as_str()) {
            continue;
        }
        let Some(dims) = source.array_dimensions(&variable) else {
            continue;
        };
        let location = match dims.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["Time", "NumCells2D"] => DataLocation::OnFaces2D,
            ["Time", "NumCells3D"] => DataLocation::OnVolumes3D,
            _ => {
                debug!(variable = %variable, "skipping variable with unsupported shape");
                continue;
            }
        };

        let long_name = source.attribute_str(&variable, "long_name");
        let (name, component) = classify(&variable, long_name.as_deref());

        let index = match groups
            .iter()
            .position(|g| g.name == name && g.location == location)
        {
            Some(index) => index,
            None => {
                groups.push(VariableGroup {
                    name,
                    location,
                    x: None,
                    y: None,
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        match component {
            Component::Scalar | Component::X => group.x = Some(variable),
            Component::Y => group.y = Some(variable),
        }
    }

    groups
}

/// Dataset times in hours plus the reference time of the time axis.
fn read_times(source: &dyn ArraySource, timesteps: usize) -> Result<(Vec<f64>, Option<NaiveDateTime>)> {
    let default_reference = time::parse_date("1899-12-30");
    if timesteps == 0 {
        return Ok((Vec::new(), default_reference));
    }

    let raw = source.read_doubles(TIME_VARIABLE, 0, timesteps)?;
    let (unit, reference) = source
        .attribute_str(TIME_VARIABLE, "units")
        .and_then(|units| time::parse_cf_units(&units))
        .unwrap_or((TimeUnit::Hours, None));
    let factor = unit.to_hours();

    Ok((
        raw.into_iter().map(|t| t * factor).collect(),
        reference.or(default_reference),
    ))
}

fn read_vertices(source: &dyn ArraySource, dims: &Dimensions) -> Result<Vec<Vertex>> {
    let xs = source.read_doubles("node_X", 0, dims.vertices)?;
    let ys = source.read_doubles("node_Y", 0, dims.vertices)?;
    let zs = source.read_doubles("node_Zb", 0, dims.vertices)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .zip(zs)
        .map(|((x, y), z)| Vertex::new(x, y, z))
        .collect())
}

fn read_faces(source: &dyn ArraySource, dims: &Dimensions) -> Result<Vec<Face>> {
    let counts = source.read_ints("cell_Nvert", 0, dims.faces)?;
    let nodes = source.read_all_ints("cell_node")?;
    if nodes.len() < dims.faces * dims.max_vertices_in_face {
        return Err(MeshdalError::invalid_data(format!(
            "cell_node holds {} entries, expected {}",
            nodes.len(),
            dims.faces * dims.max_vertices_in_face
        )));
    }

    counts
        .iter()
        .enumerate()
        .map(|(face, &count)| -> Result<Face> {
            let count = usize::try_from(count)
                .ok()
                .filter(|&c| c <= dims.max_vertices_in_face)
                .ok_or_else(|| {
                    MeshdalError::invalid_data(format!("face {face} has {count} vertices"))
                })?;
            let row = &nodes[face * dims.max_vertices_in_face..][..count];
            // stored 1-based
            row.iter()
                .map(|&node| {
                    usize::try_from(node)
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .ok_or_else(|| {
                            MeshdalError::invalid_data(format!(
                                "face {face} references node {node}"
                            ))
                        })
                })
                .collect()
        })
        .collect()
}

/// TUFLOW FV result driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TuflowFv;

impl TuflowFv {
    /// Build a mesh and its groups from any array source laid out like a
    /// TUFLOW FV result file.
    pub fn load_from_source(uri: &str, source: Box<dyn ArraySource>) -> Result<Mesh> {
        let dims = Dimensions::read(source.as_ref())?;
        let vertices = read_vertices(source.as_ref(), &dims)?;
        let faces = read_faces(source.as_ref(), &dims)?;
        let mut mesh = Mesh::new(DRIVER_NAME, uri, vertices, faces)?;

        let bed = bed_elevation_group(DRIVER_NAME, &mesh)?;
        mesh.add_dataset_group(bed);

        let (times, reference_time) = read_times(source.as_ref(), dims.timesteps)?;
        let variables = scan_variables(source.as_ref());
        let file = Rc::new(TuflowFvFile::new(source, dims));

        for variable in &variables {
            let Some(primary) = variable.primary() else {
                continue;
            };
            let is_scalar = variable.is_scalar();
            let mut group =
                DatasetGroup::new(DRIVER_NAME, uri, &variable.name, variable.location, is_scalar);
            group.set_reference_time(reference_time);
            if let Some(units) = file.source().attribute_str(primary, "units") {
                group.set_metadata("units", units);
            }
            if variable.location == DataLocation::OnVolumes3D {
                group.set_maximum_vertical_levels_count(file.maximum_levels_count()?);
            }

            for (ts, &time) in times.iter().enumerate() {
                let x = primary.to_string();
                let y = variable.secondary().map(str::to_string);
                let mut dataset: Box<dyn Dataset> = match variable.location {
                    DataLocation::OnVolumes3D => {
                        Box::new(TuflowFvDataset3D::new(Rc::clone(&file), x, y, ts, time)?)
                    }
                    _ => Box::new(TuflowFvDataset2D::new(Rc::clone(&file), x, y, ts, time)),
                };
                let statistics = dataset_statistics(dataset.as_ref(), variable.location, is_scalar)?;
                dataset.info_mut().statistics = statistics;
                group.push_dataset(dataset);
            }

            group.set_statistics(group_statistics(&group));
            debug!(
                group = %variable.name,
                datasets = group.datasets().len(),
                "loaded TUFLOW FV group"
            );
            mesh.add_dataset_group(group);
        }

        info!(
            uri,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            groups = mesh.dataset_group_count(),
            "loaded TUFLOW FV mesh"
        );
        Ok(mesh)
    }
}

impl Driver for TuflowFv {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn long_name(&self) -> &str {
        "TUFLOW FV"
    }

    fn filters(&self) -> &str {
        "*.nc"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty().with(Capability::ReadMesh)
    }

    fn can_read_mesh(&self, path: &Path) -> bool {
        NetcdfSource::open(path)
            .ok()
            .map_or(false, |source| Dimensions::read(&source).is_ok())
    }

    fn load(&self, path: &Path) -> Result<Mesh> {
        let source = NetcdfSource::open(path)?;
        Self::load_from_source(&path.display().to_string(), Box::new(source))
    }
}
