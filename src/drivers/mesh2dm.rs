//! SMS 2DM text meshes.
//!
//! ```text
//! MESH2D
//! ND 1 0.0 0.0 -1.0
//! E3T 1 1 2 3 1
//! E4Q 2 2 4 5 3 1
//! ```
//!
//! Node and element ids are 1-based and need not be contiguous; faces are
//! renumbered to 0-based vertex indices on load.

use super::{bed_elevation_group, Capabilities, Capability, Driver};
use crate::data::{Face, Mesh, Vertex};
use crate::error::{MeshdalError, Result};
use crate::util::{decode_text, header_line};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

const DRIVER_NAME: &str = "2DM";
const HEADER: &str = "MESH2D";

/// Element cards the format defines but this driver cannot represent.
const UNSUPPORTED_ELEMENTS: &[&str] = &["E2L", "E3L", "E6T", "E8Q", "E9Q"];

/// 2DM mesh driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mesh2dm;

fn parse_error(line: usize, what: impl std::fmt::Display) -> MeshdalError {
    MeshdalError::invalid_data(format!("line {line}: {what}"))
}

fn parse_field<T: std::str::FromStr>(line: usize, field: Option<&str>, what: &str) -> Result<T> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| parse_error(line, format!("bad {what}")))
}

/// Parse 2DM text into vertices and faces.
fn parse(text: &str) -> Result<(Vec<Vertex>, Vec<Face>)> {
    let mut vertices = Vec::new();
    let mut node_ids: HashMap<usize, usize> = HashMap::new();
    let mut elements: Vec<(usize, Vec<usize>)> = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let n = n + 1;
        let mut fields = line.split_whitespace();
        let Some(card) = fields.next() else {
            continue;
        };
        match card {
            "ND" => {
                let id: usize = parse_field(n, fields.next(), "node id")?;
                let x = parse_field(n, fields.next(), "x")?;
                let y = parse_field(n, fields.next(), "y")?;
                let z = parse_field(n, fields.next(), "z")?;
                if node_ids.insert(id, vertices.len()).is_some() {
                    return Err(parse_error(n, format!("duplicate node {id}")));
                }
                vertices.push(Vertex::new(x, y, z));
            }
            "E3T" | "E4Q" => {
                let count = if card == "E3T" { 3 } else { 4 };
                let _id: usize = parse_field(n, fields.next(), "element id")?;
                let nodes = (0..count)
                    .map(|_| parse_field(n, fields.next(), "node reference"))
                    .collect::<Result<Vec<usize>>>()?;
                elements.push((n, nodes));
            }
            card if UNSUPPORTED_ELEMENTS.contains(&card) => {
                return Err(parse_error(n, format!("unsupported element type {card}")));
            }
            _ => {}
        }
    }

    // elements may precede the nodes they reference
    let faces = elements
        .into_iter()
        .map(|(n, nodes)| {
            nodes
                .into_iter()
                .map(|id| {
                    node_ids
                        .get(&id)
                        .copied()
                        .ok_or_else(|| parse_error(n, format!("unknown node {id}")))
                })
                .collect::<Result<Face>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((vertices, faces))
}

/// Write `mesh` as 2DM text.
fn write_mesh(mesh: &Mesh, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for (i, face) in mesh.faces().iter().enumerate() {
        let card = if face.len() == 3 { "E3T" } else { "E4Q" };
        write!(out, "{card} {}", i + 1)?;
        for v in face {
            write!(out, " {}", v + 1)?;
        }
        writeln!(out, " 1")?;
    }
    for (i, v) in mesh.vertices().iter().enumerate() {
        writeln!(out, "ND {} {} {} {}", i + 1, v.x, v.y, v.z)?;
    }
    out.flush()
}

impl Driver for Mesh2dm {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn long_name(&self) -> &str {
        "2DM Mesh File"
    }

    fn filters(&self) -> &str {
        "*.2dm"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
            .with(Capability::ReadMesh)
            .with(Capability::SaveMesh)
    }

    fn face_vertices_maximum_count(&self) -> usize {
        4
    }

    fn can_read_mesh(&self, path: &Path) -> bool {
        header_line(path).is_some_and(|l| l.starts_with(HEADER))
    }

    fn load(&self, path: &Path) -> Result<Mesh> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes);
        if !text.trim_start().starts_with(HEADER) {
            return Err(MeshdalError::unknown_format(path));
        }
        let (vertices, faces) = parse(&text)?;
        let uri = path.display().to_string();
        let mut mesh = Mesh::new(DRIVER_NAME, uri.as_str(), vertices, faces)?;

        let bed = bed_elevation_group(DRIVER_NAME, &mesh)?;
        mesh.add_dataset_group(bed);

        info!(
            uri = %uri,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "loaded 2DM mesh"
        );
        Ok(mesh)
    }

    fn save(&self, mesh: &Mesh, path: &Path) -> Result<()> {
        if let Some((i, face)) = mesh
            .faces()
            .iter()
            .enumerate()
            .find(|(_, f)| !(3..=4).contains(&f.len()))
        {
            return Err(MeshdalError::incompatible_mesh(format!(
                "face {i} has {} vertices, 2DM stores triangles and quads only",
                face.len()
            )));
        }
        let file = File::create(path).map_err(|e| MeshdalError::write_failed(path, e))?;
        let mut out = BufWriter::new(file);
        write_mesh(mesh, &mut out).map_err(|e| MeshdalError::write_failed(path, e))?;
        debug!(path = %path.display(), "saved 2DM mesh");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const QUAD_AND_TRIANGLE: &str = "MESH2D\n\
        MESHNAME \"demo\"\n\
        E4Q 1 10 20 40 30 1\n\
        E3T 2 20 50 40 1\n\
        ND 10 0.0 0.0 -1.0\n\
        ND 20 1.0 0.0 -2.0\n\
        ND 30 0.0 1.0 -3.0\n\
        ND 40 1.0 1.0 -4.0\n\
        ND 50 2.0 0.5 -5.0\n";

    #[test]
    fn parses_sparse_ids() {
        let (vertices, faces) = parse(QUAD_AND_TRIANGLE).unwrap();
        assert_eq!(vertices.len(), 5);
        assert_eq!(faces, vec![vec![0, 1, 3, 2], vec![1, 4, 3]]);
        assert_eq!(vertices[4], Vertex::new(2.0, 0.5, -5.0));
    }

    #[test]
    fn unsupported_elements_are_invalid_data() {
        let err = parse("MESH2D\nE6T 1 1 2 3 4 5 6 1\n").unwrap_err();
        assert!(matches!(err, MeshdalError::InvalidData(_)));
    }

    #[test]
    fn unknown_node_reference() {
        let err = parse("MESH2D\nND 1 0 0 0\nE3T 1 1 2 3 1\n").unwrap_err();
        assert!(err.to_string().contains("unknown node 2"));
    }

    #[test]
    fn load_adds_bed_elevation_and_save_round_trips() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.2dm");
        fs::write(&input, QUAD_AND_TRIANGLE).unwrap();

        let driver = Mesh2dm;
        assert!(driver.can_read_mesh(&input));
        let mesh = driver.load(&input).unwrap();
        let bed = mesh.dataset_group(0).unwrap();
        assert_eq!(bed.name(), "Bed Elevation");
        assert_eq!(bed.minimum_maximum(), (-5.0, -1.0));

        let output = dir.path().join("out.2dm");
        driver.save(&mesh, &output).unwrap();
        let reloaded = driver.load(&output).unwrap();
        assert_eq!(reloaded.vertices(), mesh.vertices());
        assert_eq!(reloaded.faces(), mesh.faces());
    }

    #[test]
    fn latin1_mesh_names_are_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.2dm");
        let mut content = b"MESH2D\nMESHNAME \"caf\xe9\"\n".to_vec();
        content.extend_from_slice(b"E3T 1 1 2 3 1\nND 1 0 0 0\nND 2 1 0 0\nND 3 0 1 0\n");
        fs::write(&path, content).unwrap();

        assert!(Mesh2dm.can_read_mesh(&path));
        let mesh = Mesh2dm.load(&path).unwrap();
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn binary_files_are_not_claimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.nc");
        let mut content = b"CDF\x01".to_vec();
        content.extend(std::iter::repeat(0xffu8).take(1 << 16));
        fs::write(&path, content).unwrap();
        assert!(!Mesh2dm.can_read_mesh(&path));
    }

    #[test]
    fn save_rejects_faces_other_than_triangles_and_quads() {
        let dir = tempdir().unwrap();
        let vertices = (0..5).map(|i| Vertex::new(f64::from(i), 0.0, 0.0)).collect();
        let mesh = Mesh::new("TEST", "pentagon", vertices, vec![vec![0, 1, 2, 3, 4]]).unwrap();
        let out = dir.path().join("pentagon.2dm");

        let err = Mesh2dm.save(&mesh, &out).unwrap_err();
        assert!(matches!(err, MeshdalError::IncompatibleMesh(_)));
        assert!(!out.exists());
    }

    #[test]
    fn other_text_is_not_claimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.2dm");
        fs::write(&path, "DATASET\n").unwrap();
        assert!(!Mesh2dm.can_read_mesh(&path));
    }
}
