//! Meshes and datasets written by the text drivers load back unchanged.

use meshdal::data::DataType;
use meshdal::{api, DataLocation, Status};
use std::fs;
use tempfile::tempdir;

const MESH: &str = "MESH2D\n\
    ND 1 0.0 0.0 5.0\n\
    ND 2 1.0 0.0 4.0\n\
    ND 3 1.0 1.0 3.0\n\
    ND 4 0.0 1.0 2.0\n\
    ND 5 2.0 0.5 1.0\n\
    E4Q 1 1 2 3 4 1\n\
    E3T 2 2 5 3 1\n";

#[test]
fn datasets_persist_on_close_and_reload() {
    let dir = tempdir().unwrap();
    let mesh_path = dir.path().join("channel.2dm");
    fs::write(&mesh_path, MESH).unwrap();

    let mut mesh = api::load_mesh(&mesh_path).unwrap();
    assert_eq!(mesh.driver_name(), "2DM");
    assert_eq!(mesh.face_vertices_maximum_count(), 4);

    let driver = api::driver_from_name("ASCII_DAT").unwrap();
    let depth_path = dir.path().join("depth.dat");
    let g = api::add_dataset_group(
        &mut mesh,
        driver.as_ref(),
        "Depth",
        DataLocation::OnVertices2D,
        true,
        &depth_path.display().to_string(),
    )
    .unwrap();
    api::add_dataset(&mut mesh, g, 0.0, &[0.0, 0.5, 1.0, 1.5, 2.0], None).unwrap();
    api::add_dataset(&mut mesh, g, 1.0, &[1.0, 1.5, 2.0, 2.5, 9.0], Some(&[1, 0][..])).unwrap();
    assert!(!depth_path.exists());

    api::close_edit_mode(&mut mesh, g).unwrap();
    assert_eq!(api::last_status(), Status::None);
    assert!(depth_path.exists());

    let mut reloaded = api::load_mesh(&mesh_path).unwrap();
    api::load_datasets(&mut reloaded, &depth_path).unwrap();
    assert_eq!(reloaded.dataset_group_count(), 2);

    let depth = reloaded.dataset_group(1).unwrap();
    assert_eq!(depth.name(), "Depth");
    assert_eq!(depth.dataset_count(), 2);
    assert_eq!(depth.minimum_maximum(), (0.0, 9.0));

    let second = depth.dataset(1).unwrap();
    assert_eq!(second.time(), 1.0);
    let values = second.read_data(3, 2, DataType::ScalarDouble).unwrap();
    assert_eq!(values.as_doubles(), Some(&[2.5, 9.0][..]));
    let active = second.read_data(0, 2, DataType::ActiveInteger).unwrap();
    assert_eq!(active.as_integers(), Some(&[1, 0][..]));
}

#[test]
fn face_groups_need_face_files() {
    let dir = tempdir().unwrap();
    let mesh_path = dir.path().join("channel.2dm");
    fs::write(&mesh_path, MESH).unwrap();
    let mut mesh = api::load_mesh(&mesh_path).unwrap();
    let driver = api::driver_from_name("ASCII_DAT").unwrap();

    let wrong = dir.path().join("speed.dat").display().to_string();
    let g = api::add_dataset_group(
        &mut mesh,
        driver.as_ref(),
        "Speed",
        DataLocation::OnFaces2D,
        true,
        &wrong,
    )
    .unwrap();
    api::add_dataset(&mut mesh, g, 0.0, &[1.0, 2.0], None).unwrap();
    assert!(api::close_edit_mode(&mut mesh, g).is_err());
    assert_eq!(api::last_status(), Status::ErrInvalidData);
    assert!(!mesh.dataset_group(g).unwrap().is_in_edit_mode());

    let right = dir.path().join("speed_els.dat");
    let g = api::add_dataset_group(
        &mut mesh,
        driver.as_ref(),
        "Speed",
        DataLocation::OnFaces2D,
        true,
        &right.display().to_string(),
    )
    .unwrap();
    api::add_dataset(&mut mesh, g, 0.0, &[1.0, 2.0], None).unwrap();
    assert!(api::add_dataset(&mut mesh, g, 0.5, &[1.0, 2.0], Some(&[1, 1][..])).is_err());
    assert_eq!(api::last_status(), Status::ErrIncompatibleDataset);
    api::close_edit_mode(&mut mesh, g).unwrap();

    let mut reloaded = api::load_mesh(&mesh_path).unwrap();
    api::load_datasets(&mut reloaded, &right).unwrap();
    let speed = reloaded.find_dataset_group("Speed").unwrap();
    assert_eq!(speed.data_location(), DataLocation::OnFaces2D);
    assert_eq!(speed.minimum_maximum(), (1.0, 2.0));
}

#[test]
fn dataset_files_must_match_the_mesh() {
    let dir = tempdir().unwrap();
    let mesh_path = dir.path().join("channel.2dm");
    fs::write(&mesh_path, MESH).unwrap();
    let dat = dir.path().join("other.dat");
    fs::write(
        &dat,
        "DATASET\nBEGSCL\nND 3\nNC 1\nNAME \"x\"\nTS 0 0\n1\n2\n3\nENDDS\n",
    )
    .unwrap();

    let mut mesh = api::load_mesh(&mesh_path).unwrap();
    assert!(api::load_datasets(&mut mesh, &dat).is_err());
    assert_eq!(api::last_status(), Status::ErrIncompatibleMesh);
    assert_eq!(mesh.dataset_group_count(), 1);
}

#[test]
fn save_respects_face_limits() {
    let dir = tempdir().unwrap();
    let mesh_path = dir.path().join("channel.2dm");
    fs::write(&mesh_path, MESH).unwrap();
    let mesh = api::load_mesh(&mesh_path).unwrap();

    let out = dir.path().join("copy.2dm");
    api::save_mesh(&mesh, &out, "2DM").unwrap();
    let copy = api::load_mesh(&out).unwrap();
    assert_eq!(copy.faces(), mesh.faces());
    assert_eq!(copy.extent(), mesh.extent());

    assert!(api::save_mesh(&mesh, &out, "XMDF").is_err());
    assert_eq!(api::last_status(), Status::ErrMissingDriver);
}

#[test]
fn missing_and_unrecognised_files() {
    let dir = tempdir().unwrap();
    assert!(api::load_mesh(dir.path().join("absent.2dm")).is_err());
    assert_eq!(api::last_status(), Status::ErrFileNotFound);

    let junk = dir.path().join("junk.txt");
    fs::write(&junk, "hello\n").unwrap();
    assert!(api::load_mesh(&junk).is_err());
    assert_eq!(api::last_status(), Status::ErrUnknownFormat);
}

#[test]
fn non_utf8_text_loads_through_the_registry() {
    let dir = tempdir().unwrap();
    let mesh_path = dir.path().join("latin1.2dm");
    let mut content = b"MESH2D\nMESHNAME \"R\xe9servoir\"\n".to_vec();
    content.extend_from_slice(MESH.trim_start_matches("MESH2D\n").as_bytes());
    fs::write(&mesh_path, content).unwrap();

    let mut mesh = api::load_mesh(&mesh_path).unwrap();
    assert_eq!(mesh.driver_name(), "2DM");
    assert_eq!(mesh.vertex_count(), 5);

    let dat = dir.path().join("level.dat");
    let mut content = b"DATASET\nBEGSCL\nND 5\nNC 2\nNAME \"Niveau \xe0\"\nTS 0 0\n".to_vec();
    content.extend_from_slice(b"1\n2\n3\n4\n5\nENDDS\n");
    fs::write(&dat, content).unwrap();

    api::load_datasets(&mut mesh, &dat).unwrap();
    let level = mesh.dataset_group(1).unwrap();
    assert!(level.name().starts_with("Niveau "));
    assert_eq!(level.minimum_maximum(), (1.0, 5.0));
}
