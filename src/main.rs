//! Meshdal - inspect and convert hydraulic meshes from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshdal::data::GroupRef;
use meshdal::DriverManager;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "meshdal")]
#[command(version, about = "Inspect and convert hydraulic model meshes", long_about = None)]
struct Args {
    /// Enable logging to specified file
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered drivers and their capabilities
    Drivers,
    /// Describe a mesh and its dataset groups
    Info {
        /// Mesh file to load
        mesh: PathBuf,
        /// Extra dataset files to attach before printing
        #[arg(long, num_args = 1..)]
        datasets: Vec<PathBuf>,
    },
    /// Write the geometry of a mesh with another driver
    Convert {
        /// Mesh file to load
        mesh: PathBuf,
        /// Output file
        output: PathBuf,
        /// Name of the driver used for writing
        #[arg(long)]
        driver: String,
    },
}

fn init_logging(log: Option<&PathBuf>) -> Result<()> {
    match log {
        Some(log_path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(log_path)
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(Level::DEBUG)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn print_drivers(manager: &DriverManager) {
    println!("{:<10} {:<16} {:<8} CAPABILITIES", "NAME", "LONG NAME", "FILTER");
    for driver in manager.drivers() {
        let capabilities: Vec<String> = driver
            .capabilities()
            .iter()
            .map(|c| c.to_string())
            .collect();
        println!(
            "{:<10} {:<16} {:<8} {}",
            driver.name(),
            driver.long_name(),
            driver.filters(),
            capabilities.join(", ")
        );
    }
}

fn print_group(group: &GroupRef<'_>) {
    let (min, max) = group.minimum_maximum();
    println!(
        "  [{}] {} ({:?}, {}, {} datasets)",
        group.index(),
        group.name(),
        group.data_location(),
        if group.is_scalar() { "scalar" } else { "vector" },
        group.dataset_count()
    );
    println!("      range: {min} .. {max}");
    if group.maximum_vertical_levels_count() > 0 {
        println!("      max levels: {}", group.maximum_vertical_levels_count());
    }
    let reference_time = group.reference_time();
    if !reference_time.is_empty() {
        println!("      reference time: {reference_time}");
    }
    for i in 0..group.metadata_count() {
        if let (Ok(key), Ok(value)) = (group.metadata_key(i), group.metadata_value(i)) {
            if key != "name" {
                println!("      {key}: {value}");
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_ref())?;
    tracing::debug!("Starting meshdal {}", meshdal::version());

    let manager = DriverManager::instance();
    match args.command {
        Command::Drivers => print_drivers(manager),
        Command::Info { mesh, datasets } => {
            let mut loaded = manager
                .load(&mesh)
                .with_context(|| format!("Failed to load mesh {}", mesh.display()))?;
            for path in &datasets {
                manager
                    .load_datasets(&mut loaded, path)
                    .with_context(|| format!("Failed to load datasets {}", path.display()))?;
            }

            let extent = loaded.extent();
            println!("mesh: {}", loaded.uri());
            println!("driver: {}", loaded.driver_name());
            println!("vertices: {}", loaded.vertex_count());
            println!("faces: {}", loaded.face_count());
            println!("max vertices per face: {}", loaded.face_vertices_maximum_count());
            println!(
                "extent: x {} .. {}, y {} .. {}",
                extent.min_x, extent.max_x, extent.min_y, extent.max_y
            );
            println!("groups: {}", loaded.dataset_group_count());
            for group in loaded.dataset_groups() {
                print_group(&group);
            }
        }
        Command::Convert {
            mesh,
            output,
            driver,
        } => {
            let loaded = manager
                .load(&mesh)
                .with_context(|| format!("Failed to load mesh {}", mesh.display()))?;
            manager
                .save(&loaded, &output, &driver)
                .with_context(|| format!("Failed to save {} with {driver}", output.display()))?;
            println!("wrote {}", output.display());
        }
    }

    Ok(())
}
