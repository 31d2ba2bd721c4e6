//! ASCII `.dat` dataset files.
//!
//! Each `BEGSCL`/`BEGVEC` ... `ENDDS` block becomes one dataset group. Files
//! whose stem ends in `_els` hold one value per face, all others one value
//! per vertex.

use super::{Capabilities, Capability, Driver};
use crate::data::{
    dataset_statistics, group_statistics, DataLocation, Dataset, DatasetGroup, MemoryDataset2D,
    Mesh, MeshDimensions,
};
use crate::error::{MeshdalError, Result};
use crate::util::{
    decode_text, header_line,
    time::{self, TimeUnit},
    unquote,
};
use chrono::NaiveDateTime;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

const DRIVER_NAME: &str = "ASCII_DAT";
const HEADER: &str = "DATASET";
const FACE_SUFFIX: &str = "_els";

/// ASCII dataset driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiDat;

/// Whether `path` names a face-centred file.
fn is_face_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(FACE_SUFFIX))
}

/// Non-empty lines with 1-based line numbers.
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        self.inner
            .by_ref()
            .map(|(n, l)| (n + 1, l.trim()))
            .find(|(_, l)| !l.is_empty())
    }

    fn expect_line(&mut self) -> Result<(usize, &'a str)> {
        self.next_line()
            .ok_or_else(|| MeshdalError::invalid_data("unexpected end of file"))
    }
}

fn number<T: std::str::FromStr>(line: usize, text: Option<&str>) -> Result<T> {
    text.and_then(|t| t.parse().ok())
        .ok_or_else(|| MeshdalError::invalid_data(format!("line {line}: expected a number")))
}

/// One `BEGSCL`/`BEGVEC` block being read.
#[derive(Debug)]
struct Block {
    name: Option<String>,
    is_scalar: bool,
    time_unit: TimeUnit,
    datasets: Vec<MemoryDataset2D>,
}

/// Parses dataset blocks against a mesh of known size.
struct Reader<'a> {
    lines: Lines<'a>,
    mesh: MeshDimensions,
    location: DataLocation,
    uri: String,
    default_name: String,
}

impl<'a> Reader<'a> {
    fn values_count(&self) -> usize {
        match self.location {
            DataLocation::OnFaces2D => self.mesh.faces,
            _ => self.mesh.vertices,
        }
    }

    fn check_count(&self, line: usize, card: &str, found: usize, expected: usize) -> Result<()> {
        if found != expected {
            return Err(MeshdalError::incompatible_mesh(format!(
                "line {line}: {card} {found} does not match mesh size {expected}"
            )));
        }
        Ok(())
    }

    fn read_groups(&mut self) -> Result<Vec<DatasetGroup>> {
        let mut groups = Vec::new();
        let mut block: Option<Block> = None;
        let mut reference_time: Option<NaiveDateTime> = None;

        while let Some((n, line)) = self.lines.next_line() {
            let (card, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let rest = rest.trim();
            match card {
                "BEGSCL" | "BEGVEC" => {
                    if block.is_some() {
                        return Err(MeshdalError::invalid_data(format!(
                            "line {n}: {card} inside an open block"
                        )));
                    }
                    block = Some(Block {
                        name: None,
                        is_scalar: card == "BEGSCL",
                        time_unit: TimeUnit::Hours,
                        datasets: Vec::new(),
                    });
                }
                "ND" => {
                    let count: usize = number(n, Some(rest))?;
                    self.check_count(n, card, count, self.mesh.vertices)?;
                }
                "NC" => {
                    let count: usize = number(n, Some(rest))?;
                    self.check_count(n, card, count, self.mesh.faces)?;
                }
                "NAME" => {
                    if let Some(b) = block.as_mut() {
                        b.name = Some(unquote(rest).to_string());
                    }
                }
                "RT_JULIAN" => {
                    let julian: f64 = number(n, Some(rest))?;
                    reference_time = time::from_julian_day(julian);
                }
                "TIMEUNITS" => {
                    let unit = TimeUnit::parse(rest).ok_or_else(|| {
                        MeshdalError::invalid_data(format!("line {n}: unknown time unit {rest}"))
                    })?;
                    if let Some(b) = block.as_mut() {
                        b.time_unit = unit;
                    }
                }
                "TS" => {
                    let Some(b) = block.as_mut() else {
                        return Err(MeshdalError::invalid_data(format!(
                            "line {n}: TS outside a block"
                        )));
                    };
                    let mut fields = rest.split_whitespace();
                    let istat: i32 = number(n, fields.next())?;
                    let raw_time: f64 = number(n, fields.next())?;
                    let time = raw_time * b.time_unit.to_hours();
                    let dataset = self.read_time_step(time, istat != 0, b.is_scalar)?;
                    b.datasets.push(dataset);
                }
                "ENDDS" => {
                    let Some(b) = block.take() else {
                        return Err(MeshdalError::invalid_data(format!(
                            "line {n}: ENDDS without a block"
                        )));
                    };
                    let name = b.name.as_deref().unwrap_or(&self.default_name);
                    let mut group = DatasetGroup::new(
                        DRIVER_NAME,
                        self.uri.as_str(),
                        name,
                        self.location,
                        b.is_scalar,
                    );
                    group.set_reference_time(reference_time);
                    for dataset in b.datasets {
                        group.push_dataset(Box::new(dataset));
                    }
                    group.set_statistics(group_statistics(&group));
                    groups.push(group);
                }
                _ => debug!(line = n, card, "ignoring card"),
            }
        }

        if block.is_some() {
            return Err(MeshdalError::invalid_data("dataset block is missing ENDDS"));
        }
        Ok(groups)
    }

    fn read_time_step(
        &mut self,
        time: f64,
        has_status: bool,
        is_scalar: bool,
    ) -> Result<MemoryDataset2D> {
        let active = if has_status {
            let flags = (0..self.mesh.faces)
                .map(|_| {
                    let (n, line) = self.lines.expect_line()?;
                    number::<i32>(n, Some(line))
                })
                .collect::<Result<Vec<_>>>()?;
            Some(flags)
        } else {
            None
        };

        let components = if is_scalar { 1 } else { 2 };
        let count = self.values_count();
        let mut values = Vec::with_capacity(count * components);
        for _ in 0..count {
            let (n, line) = self.lines.expect_line()?;
            let mut fields = line.split_whitespace();
            for _ in 0..components {
                values.push(number::<f64>(n, fields.next())?);
            }
        }

        let mut dataset = MemoryDataset2D::new(time, count, is_scalar, &values)?;
        if let Some(flags) = active {
            dataset = dataset.with_active_flags(&flags);
        }
        dataset.info_mut().statistics = dataset_statistics(&dataset, self.location, is_scalar)?;
        Ok(dataset)
    }
}

/// Serialize `group` in `.dat` layout.
fn write_group(group: &DatasetGroup, mesh: MeshDimensions, out: &mut impl Write) -> Result<()> {
    let is_scalar = group.is_scalar();
    let values_count = match group.data_location() {
        DataLocation::OnFaces2D => mesh.faces,
        _ => mesh.vertices,
    };

    writeln!(out, "{HEADER}")?;
    writeln!(out, "OBJTYPE \"mesh2d\"")?;
    writeln!(out, "{}", if is_scalar { "BEGSCL" } else { "BEGVEC" })?;
    writeln!(out, "ND {}", mesh.vertices)?;
    writeln!(out, "NC {}", mesh.faces)?;
    writeln!(out, "NAME \"{}\"", group.name())?;
    if let Some(reference) = group.reference_time() {
        writeln!(out, "RT_JULIAN {:.8}", time::to_julian_day(reference))?;
    }
    writeln!(out, "TIMEUNITS HOURS")?;

    let components = if is_scalar { 1 } else { 2 };
    let mut values = vec![0f64; values_count * components];
    let mut active = vec![0i32; mesh.faces];

    for dataset in group.datasets() {
        let info = dataset.info();
        let has_status = info.supports_active_flag;
        writeln!(out, "TS {} {}", i32::from(has_status), info.time)?;

        if has_status {
            let read = dataset.active_data(0, mesh.faces, &mut active)?;
            for flag in &active[..read] {
                writeln!(out, "{flag}")?;
            }
        }

        let read = if is_scalar {
            dataset.scalar_data(0, values_count, &mut values)?
        } else {
            dataset.vector_data(0, values_count, &mut values)?
        };
        if read != values_count {
            return Err(MeshdalError::invalid_data(format!(
                "dataset at time {} returned {read} of {values_count} values",
                info.time
            )));
        }
        for chunk in values.chunks_exact(components) {
            let line: Vec<String> = chunk.iter().map(f64::to_string).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
    }

    writeln!(out, "ENDDS")?;
    out.flush()?;
    Ok(())
}

impl Driver for AsciiDat {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn long_name(&self) -> &str {
        "DAT"
    }

    fn filters(&self) -> &str {
        "*.dat"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
            .with(Capability::ReadDatasets)
            .with(Capability::WriteDatasetsOnVertices2D)
            .with(Capability::WriteDatasetsOnFaces2D)
    }

    fn can_read_datasets(&self, path: &Path) -> bool {
        header_line(path).is_some_and(|l| l == HEADER)
    }

    fn load_datasets(&self, path: &Path, mesh: &mut Mesh) -> Result<()> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes);
        let mut lines = Lines::new(&text);
        if lines.next_line().map(|(_, l)| l) != Some(HEADER) {
            return Err(MeshdalError::unknown_format(path));
        }

        let location = if is_face_file(path) {
            DataLocation::OnFaces2D
        } else {
            DataLocation::OnVertices2D
        };
        let default_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(DRIVER_NAME)
            .to_string();

        let mut reader = Reader {
            lines,
            mesh: mesh.dimensions(),
            location,
            uri: path.display().to_string(),
            default_name,
        };
        let groups = reader.read_groups()?;
        let count = groups.len();
        for group in groups {
            mesh.add_dataset_group(group);
        }
        info!(path = %path.display(), groups = count, "loaded ASCII datasets");
        Ok(())
    }

    fn persist(&self, group: &DatasetGroup, mesh: &Mesh) -> Result<()> {
        let path = Path::new(group.uri());
        match (group.data_location(), is_face_file(path)) {
            (DataLocation::OnVolumes3D, _) => {
                return Err(self.missing(Capability::WriteDatasetsOnVolumes3D));
            }
            (DataLocation::OnFaces2D, false) => {
                return Err(MeshdalError::invalid_data(format!(
                    "face data must be written to a file ending in {FACE_SUFFIX}: {}",
                    path.display()
                )));
            }
            (DataLocation::OnVertices2D, true) => {
                return Err(MeshdalError::invalid_data(format!(
                    "vertex data cannot be written to {}",
                    path.display()
                )));
            }
            _ => {}
        }

        let file = File::create(path).map_err(|e| MeshdalError::write_failed(path, e))?;
        let mut out = BufWriter::new(file);
        write_group(group, mesh.dimensions(), &mut out).map_err(|e| match e {
            MeshdalError::Io(source) => MeshdalError::write_failed(path, source),
            other => other,
        })?;
        debug!(group = group.name(), path = %path.display(), "persisted dataset group");
        Ok(())
    }
}
