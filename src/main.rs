//! Command-line front end for the rackpack catalog.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand, crate_version};
use rackpack::analyzer::SampleAnalyzer;
use rackpack::automap::AutoMapper;
use rackpack::catalog::{CatalogStore, DirectoryId, FsAccess, RackId, SampleId};
use rackpack::config::{self, AppSettings};
use rackpack::logging;
use rackpack::scanner::{ScanProgress, Scanner};
use rackpack::session::RackSession;
use rackpack::tree::{TreeNode, build_tree};

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "Catalogue drum one-shots and build OP-XY drum presets."
)]
struct Cli {
    /// Catalog database to use instead of the configured one.
    #[clap(long, global = true)]
    db: Option<PathBuf>,
    /// Log filter overriding the configured one when RUST_LOG is not set.
    #[clap(long, global = true)]
    log: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grants a directory, scans it and stores its one-shots.
    AddDir { path: PathBuf },
    /// Lists granted directories and their access state.
    Dirs {},
    /// Re-checks access to a directory and rescans it.
    Rescan { id: String },
    /// Removes a directory and all of its samples.
    RemoveDir { id: String },
    /// Lists catalogued samples.
    Samples {
        /// Only list samples of this directory.
        #[clap(long)]
        dir: Option<String>,
    },
    /// Prints the catalog as a folder tree.
    Tree {},
    /// Computes level and waveform data for a sample.
    Analyze { id: String },
    /// Auto-maps the catalog onto the layout and exports a preset.
    Automap {
        /// Seed for a reproducible mapping.
        #[clap(long)]
        seed: Option<u64>,
        /// Skip samples longer than this many seconds.
        #[clap(long)]
        max_duration: Option<f64>,
        /// Preset name.
        #[clap(long)]
        name: String,
        /// Directory to write the archive into.
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Lists saved racks.
    Racks {},
    /// Deletes a saved rack.
    DeleteRack { id: String },
    /// Deletes a sample from the catalog.
    DeleteSample { id: String },
    /// Exports a saved rack as a preset archive.
    ExportRack {
        id: String,
        /// Preset name.
        #[clap(long)]
        name: String,
        /// Directory to write the archive into.
        #[clap(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let settings = config::load_or_default()?;
    if let Err(err) = logging::init(&settings.logging, cli.log.as_deref()) {
        eprintln!("Logging disabled: {err}");
    }

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => settings.database_path()?,
    };
    let scanner = Scanner::new(settings.scanner.criteria());
    let mut store = CatalogStore::open(&db_path, FsAccess::new(), scanner)?;
    // Validates roots and fills the handle cache for file access.
    let directories = store.list_directories()?;

    match cli.command {
        Commands::AddDir { path } => {
            let progress = store.scanner().events().subscribe();
            let directory = store.add_directory_at(&path)?;
            report_scan(&progress.drain());
            let count = store.list_samples_in(&directory.id)?.len();
            println!("{}\t{}\t{count} samples", directory.id, directory.path.display());
        }
        Commands::Dirs {} => {
            for directory in directories {
                println!(
                    "{}\t{}\t{}\t{}",
                    directory.id,
                    directory.permission.as_str(),
                    directory.name,
                    directory.path.display()
                );
            }
        }
        Commands::Rescan { id } => {
            let progress = store.scanner().events().subscribe();
            let directory = store.request_permission(&DirectoryId::from_string(id))?;
            report_scan(&progress.drain());
            let count = store.list_samples_in(&directory.id)?.len();
            println!("{}\t{count} samples", directory.id);
        }
        Commands::RemoveDir { id } => {
            let removed = store.remove_directory(&DirectoryId::from_string(id))?;
            println!("Removed directory and {removed} samples");
        }
        Commands::Samples { dir } => {
            let samples = match dir {
                Some(id) => store.list_samples_in(&DirectoryId::from_string(id))?,
                None => store.list_samples()?,
            };
            for sample in samples {
                let duration = sample
                    .duration_seconds
                    .map(|seconds| format!("{seconds:.3}s"))
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{duration}\t{}", sample.id, sample.path);
            }
        }
        Commands::Tree {} => {
            let samples = store.list_samples()?;
            for node in build_tree(&directories, &samples) {
                print_node(&node, 0);
            }
        }
        Commands::Analyze { id } => {
            let sample = SampleAnalyzer::new().analyze(&store, &SampleId::from_string(id))?;
            println!(
                "{}\t{:.3}s\t{} ch\t{} Hz\t{:.1} dB",
                sample.name,
                sample.duration_seconds.unwrap_or_default(),
                sample.channels.unwrap_or_default(),
                sample.sample_rate.unwrap_or_default(),
                sample.rms_db.unwrap_or_default()
            );
        }
        Commands::Automap {
            seed,
            max_duration,
            name,
            out,
        } => {
            let mut mapper = match seed.or(settings.automap.seed) {
                Some(seed) => AutoMapper::seeded(seed),
                None => AutoMapper::new(),
            };
            let max_duration = max_duration.unwrap_or(settings.automap.max_duration_seconds);
            let mut session = RackSession::new();
            let report = session.auto_map_catalog(&store, &mut mapper, max_duration)?;
            println!("Mapped {} keys ({} failed)", report.assigned, report.failed);
            let exported = session.download_preset(&store, &name)?;
            let path = exported.write_to(&output_dir(out, &settings)?)?;
            println!("Wrote {}", path.display());
        }
        Commands::Racks {} => {
            for rack in store.list_racks()? {
                let assigned = rack
                    .configuration
                    .keys
                    .iter()
                    .filter(|key| key.assigned_sample.is_some())
                    .count();
                println!("{}\t{}\t{assigned} keys", rack.id, rack.name);
            }
        }
        Commands::DeleteRack { id } => {
            let removed = store.remove_rack(&RackId::from_string(id))?;
            println!("{}", if removed { "Deleted" } else { "No such rack" });
        }
        Commands::DeleteSample { id } => {
            let removed = store.remove_sample(&SampleId::from_string(id))?;
            println!("{}", if removed { "Deleted" } else { "No such sample" });
        }
        Commands::ExportRack { id, name, out } => {
            let mut session = RackSession::new();
            session.load_rack(&store, &RackId::from_string(id))?;
            let exported = session.download_preset(&store, &name)?;
            if exported.skipped > 0 {
                eprintln!("{} keys could not be exported", exported.skipped);
            }
            let path = exported.write_to(&output_dir(out, &settings)?)?;
            println!("Wrote {}", path.display());
        }
    }
    store.close()?;
    Ok(())
}

fn output_dir(out: Option<PathBuf>, settings: &AppSettings) -> Result<PathBuf, Box<dyn Error>> {
    match out {
        Some(dir) => Ok(dir),
        None => Ok(settings.export_dir()?),
    }
}

fn report_scan(events: &[ScanProgress]) {
    let detected = events
        .iter()
        .filter_map(|event| match event {
            ScanProgress::Scanning { detected_count } => Some(*detected_count),
            ScanProgress::Processing { .. } => None,
        })
        .last()
        .unwrap_or(0);
    println!("Detected {detected} one-shots");
}

fn print_node(node: &TreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        TreeNode::Folder { name, children, .. } => {
            println!("{indent}{name}/ ({})", node.sample_count());
            for child in children {
                print_node(child, depth + 1);
            }
        }
        TreeNode::Sample(sample) => println!("{indent}{}", sample.name),
    }
}
