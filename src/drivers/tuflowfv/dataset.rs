//! Datasets streamed from a TUFLOW FV result file.

use super::Dimensions;
use crate::data::{window_len, ArraySource, Dataset, DatasetInfo};
use crate::error::Result;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Level counts are scanned in chunks of this many faces.
const LEVEL_SCAN_CHUNK: usize = 1000;

const LEVEL_COUNTS: &str = "NL";
const LEVEL_ELEVATIONS: &str = "layerface_Z";
const CELL_STATUS: &str = "stat";
const FACE_TO_VOLUME: &str = "idx3";

/// One opened result file, shared by all of its datasets.
pub struct TuflowFvFile {
    source: Box<dyn ArraySource>,
    dims: Dimensions,
    has_level_counts: bool,
    has_level_elevations: bool,
    has_face_to_volume: bool,
    has_cell_status: bool,
    maximum_levels_count: Cell<Option<usize>>,
}

impl fmt::Debug for TuflowFvFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TuflowFvFile")
            .field("source", &self.source)
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl TuflowFvFile {
    pub(super) fn new(source: Box<dyn ArraySource>, dims: Dimensions) -> Self {
        let has_cell_status = source
            .array_dimensions(CELL_STATUS)
            .map_or(false, |d| d.len() == 2 && d[1] == "NumCells2D");
        Self {
            has_level_counts: source.has_array(LEVEL_COUNTS),
            has_level_elevations: source.has_array(LEVEL_ELEVATIONS),
            has_face_to_volume: source.has_array(FACE_TO_VOLUME),
            has_cell_status,
            source,
            dims,
            maximum_levels_count: Cell::new(None),
        }
    }

    /// Backing array source.
    pub fn source(&self) -> &dyn ArraySource {
        self.source.as_ref()
    }

    /// Whether wet/dry status per face is stored.
    pub fn has_cell_status(&self) -> bool {
        self.has_cell_status
    }

    /// Largest level count under any face, computed on first use.
    pub fn maximum_levels_count(&self) -> Result<usize> {
        if let Some(count) = self.maximum_levels_count.get() {
            return Ok(count);
        }

        let mut maximum = 0;
        if self.has_level_counts {
            let mut index_start = 0;
            while index_start < self.dims.faces {
                let n = (self.dims.faces - index_start).min(LEVEL_SCAN_CHUNK);
                let levels = self.source.read_ints(LEVEL_COUNTS, index_start, n)?;
                let chunk_max = levels.iter().copied().max().unwrap_or(0);
                maximum = maximum.max(usize::try_from(chunk_max).unwrap_or(0));
                index_start += n;
            }
        }

        self.maximum_levels_count.set(Some(maximum));
        Ok(maximum)
    }

    fn active_data(&self, ts: usize, index_start: usize, count: usize, buffer: &mut [i32]) -> Result<usize> {
        let n = window_len(self.dims.faces, index_start, count).min(buffer.len());
        if n == 0 || !self.has_cell_status || ts >= self.dims.timesteps {
            return Ok(0);
        }
        let status = self.source.read_ints_at(CELL_STATUS, ts, index_start, n)?;
        for (dst, src) in buffer.iter_mut().zip(status) {
            *dst = i32::from(src != 0);
        }
        Ok(n)
    }
}

/// Face-centred 2D time step.
#[derive(Debug)]
pub struct TuflowFvDataset2D {
    info: DatasetInfo,
    file: Rc<TuflowFvFile>,
    x: String,
    y: Option<String>,
    ts: usize,
}

impl TuflowFvDataset2D {
    pub(super) fn new(file: Rc<TuflowFvFile>, x: String, y: Option<String>, ts: usize, time: f64) -> Self {
        let mut info = DatasetInfo::new_2d(time, file.dims.faces);
        info.supports_active_flag = file.has_cell_status;
        Self { info, file, x, y, ts }
    }

    fn values(&self, name: &str, index_start: usize, n: usize) -> Result<Vec<f64>> {
        self.file.source.read_doubles_at(name, self.ts, index_start, n)
    }
}

impl Dataset for TuflowFvDataset2D {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DatasetInfo {
        &mut self.info
    }

    fn scalar_data(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> Result<usize> {
        let n = window_len(self.info.values_count, index_start, count).min(buffer.len());
        if n == 0 || self.ts >= self.file.dims.timesteps {
            return Ok(0);
        }
        let vals = self.values(&self.x, index_start, n)?;
        buffer[..n].copy_from_slice(&vals[..n]);
        Ok(n)
    }

    fn vector_data(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> Result<usize> {
        let Some(y) = &self.y else {
            return Ok(0);
        };
        let n = window_len(self.info.values_count, index_start, count).min(buffer.len() / 2);
        if n == 0 || self.ts >= self.file.dims.timesteps {
            return Ok(0);
        }
        let xs = self.values(&self.x, index_start, n)?;
        let ys = self.values(y, index_start, n)?;
        for (i, pair) in buffer.chunks_exact_mut(2).take(n).enumerate() {
            pair[0] = xs[i];
            pair[1] = ys[i];
        }
        Ok(n)
    }

    fn active_data(&self, index_start: usize, count: usize, buffer: &mut [i32]) -> Result<usize> {
        self.file.active_data(self.ts, index_start, count, buffer)
    }
}

/// Layered 3D time step.
///
/// Face space has one entry per 2D face (level counts, face to volume
/// map); volume space has one entry per stacked layer. Layer boundary
/// elevations need one extra entry per face.
#[derive(Debug)]
pub struct TuflowFvDataset3D {
    info: DatasetInfo,
    file: Rc<TuflowFvFile>,
    x: String,
    y: Option<String>,
    ts: usize,
}

impl TuflowFvDataset3D {
    pub(super) fn new(
        file: Rc<TuflowFvFile>,
        x: String,
        y: Option<String>,
        ts: usize,
        time: f64,
    ) -> Result<Self> {
        let maximum_levels = file.maximum_levels_count()?;
        let mut info = DatasetInfo::new_3d(time, file.dims.faces, file.dims.volumes, maximum_levels);
        info.supports_active_flag = file.has_cell_status;
        Ok(Self { info, file, x, y, ts })
    }

    fn in_time_range(&self) -> bool {
        self.ts < self.file.dims.timesteps
    }
}

impl Dataset for TuflowFvDataset3D {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DatasetInfo {
        &mut self.info
    }

    fn active_data(&self, index_start: usize, count: usize, buffer: &mut [i32]) -> Result<usize> {
        self.file.active_data(self.ts, index_start, count, buffer)
    }

    fn vertical_level_count_data(&self, index_start: usize, count: usize, buffer: &mut [i32]) -> Result<usize> {
        let n = window_len(self.file.dims.faces, index_start, count).min(buffer.len());
        if n == 0 || !self.file.has_level_counts {
            return Ok(0);
        }
        let vals = self.file.source.read_ints(LEVEL_COUNTS, index_start, n)?;
        buffer[..n].copy_from_slice(&vals[..n]);
        Ok(n)
    }

    fn vertical_level_data(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> Result<usize> {
        let n = window_len(self.file.dims.level_faces, index_start, count).min(buffer.len());
        if n == 0 || !self.in_time_range() || !self.file.has_level_elevations {
            return Ok(0);
        }
        let vals = self
            .file
            .source
            .read_doubles_at(LEVEL_ELEVATIONS, self.ts, index_start, n)?;
        buffer[..n].copy_from_slice(&vals[..n]);
        Ok(n)
    }

    fn face_to_volume_data(&self, index_start: usize, count: usize, buffer: &mut [i32]) -> Result<usize> {
        let n = window_len(self.file.dims.faces, index_start, count).min(buffer.len());
        if n == 0 || !self.file.has_face_to_volume {
            return Ok(0);
        }
        let vals = self.file.source.read_ints(FACE_TO_VOLUME, index_start, n)?;
        // stored 1-based
        for (dst, src) in buffer.iter_mut().zip(vals) {
            *dst = src - 1;
        }
        Ok(n)
    }

    fn scalar_volumes_data(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> Result<usize> {
        let n = window_len(self.info.volumes_count, index_start, count).min(buffer.len());
        if n == 0 || !self.in_time_range() {
            return Ok(0);
        }
        let vals = self.file.source.read_doubles_at(&self.x, self.ts, index_start, n)?;
        buffer[..n].copy_from_slice(&vals[..n]);
        Ok(n)
    }

    fn vector_volumes_data(&self, index_start: usize, count: usize, buffer: &mut [f64]) -> Result<usize> {
        let Some(y) = &self.y else {
            return Ok(0);
        };
        let n = window_len(self.info.volumes_count, index_start, count).min(buffer.len() / 2);
        if n == 0 || !self.in_time_range() {
            return Ok(0);
        }
        let xs = self.file.source.read_doubles_at(&self.x, self.ts, index_start, n)?;
        let ys = self.file.source.read_doubles_at(y, self.ts, index_start, n)?;
        for (i, pair) in buffer.chunks_exact_mut(2).take(n).enumerate() {
            pair[0] = xs[i];
            pair[1] = ys[i];
        }
        Ok(n)
    }
}
