//! cabdex CLI - build and query dependency indexes of asset containers.
//!
//! This is the main entry point for the cabdex command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use cabdex::prelude::*;

/// Container file extensions picked up when walking directories.
const CONTAINER_EXTENSIONS: &[&str] = &["blk", "bundle", "unity3d"];

/// cabdex - asset container dependency index
#[derive(Parser)]
#[command(name = "cabdex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Index family presets.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Family {
    Blk,
    Cab,
    Wmv,
}

#[derive(clap::Args)]
struct IndexArgs {
    /// Index family
    #[arg(short, long, value_enum, default_value = "blk", env = "CABDEX_FAMILY")]
    family: Family,

    /// Cache file (defaults to the family's map file)
    #[arg(short, long, env = "CABDEX_CACHE")]
    cache: Option<PathBuf>,
}

impl IndexArgs {
    fn config(&self) -> IndexConfig {
        let config = match self.family {
            Family::Blk => IndexConfig::blk(),
            Family::Cab => IndexConfig::cab(),
            Family::Wmv => IndexConfig::wmv(),
        };
        match &self.cache {
            Some(path) => config.with_cache_path(path),
            None => config,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from container files and write its cache
    Build {
        /// Container files or directories to scan
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        index: IndexArgs,
    },

    /// Resolve the files and offsets needed to load the given files
    Resolve {
        /// Requested container files
        #[arg(required = true)]
        files: Vec<String>,

        #[command(flatten)]
        index: IndexArgs,

        /// File of numeric container ids in preferred order
        #[arg(short, long)]
        sort_hint: Option<PathBuf>,

        /// Match requests as substrings of stored paths
        #[arg(long)]
        containment: bool,

        /// Discover direct dependencies before following chains
        #[arg(long)]
        breadth_first: bool,

        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the segments, sub-files and probe results of a container
    Inspect {
        /// Container file
        container: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build { inputs, index } => {
            cmd_build(&inputs, index.config())?;
        }
        Commands::Resolve {
            files,
            index,
            sort_hint,
            containment,
            breadth_first,
            json,
        } => {
            let mut config = index.config();
            if containment {
                config = config.with_matching(MatchPolicy::Containment);
            }
            if breadth_first {
                config = config.with_expansion(Expansion::BreadthFirst);
            }
            cmd_resolve(&files, config, sort_hint.as_deref(), json)?;
        }
        Commands::Inspect { container } => {
            cmd_inspect(&container)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_build(inputs: &[PathBuf], config: IndexConfig) -> Result<()> {
    let files = collect_containers(inputs)?;
    if files.is_empty() {
        anyhow::bail!("No container files found");
    }

    println!(
        "Building {} from {} files...",
        config.cache_path().display(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut session = IndexSession::new(config);
    let report = session.build_with_progress(&files, |p| pb.set_position(p.current as u64));
    pb.finish_with_message("Done");

    println!(
        "Indexed {} keys from {} files in {:?} ({} failed, {} collisions)",
        report.index_len,
        report.files_processed,
        start.elapsed(),
        report.files_failed,
        report.collisions
    );

    if !report.saved {
        anyhow::bail!("Failed to write {}", session.config().cache_path().display());
    }

    Ok(())
}

fn cmd_resolve(
    files: &[String],
    config: IndexConfig,
    sort_hint: Option<&Path>,
    json: bool,
) -> Result<()> {
    let cache = config.cache_path().to_path_buf();
    let mut session = IndexSession::new(config);

    if let Some(path) = sort_hint {
        let hint = BlockSortList::load(path)
            .with_context(|| format!("Failed to read sort hint {}", path.display()))?;
        session.set_sort_hint(Some(Box::new(hint)));
    }

    if !session.load() {
        anyhow::bail!("Failed to load index {}", cache.display());
    }

    let resolution = session.resolve(files);

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    for file in &resolution.files {
        match resolution.offsets.get(file) {
            Some(offsets) => {
                let offsets: Vec<String> = offsets.iter().map(|o| format!("{:#x}", o)).collect();
                println!("{} [{}]", file, offsets.join(", "));
            }
            None => println!("{}", file),
        }
    }

    println!(
        "\nTotal: {} files, {} keys",
        resolution.files.len(),
        resolution.keys.len()
    );

    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let data = fs::read(path).context("Failed to read container")?;

    if BlkContainer::is_blk(&data) {
        let container = BlkContainer::parse(&data, &Aes128Gate).context("Failed to decrypt container")?;
        println!(
            "Encrypted container: key {} bytes, block size {}, payload {} bytes",
            container.key().len(),
            container.block_size(),
            container.payload().len()
        );

        let scan = container.segments(&FramedSegments, None);
        for (offset, segment) in &scan.segments {
            println!("\nSegment at {:#x}:", offset);
            print_entries(&segment.entries);
        }
        for failure in &scan.failures {
            eprintln!("Segment at {:#x} failed: {}", failure.offset, failure.error);
        }
    } else {
        let bundle = PlainBundle::parse(&data, &FramedSegments).context("Failed to parse bundle")?;
        println!("Plain bundle:");
        print_entries(bundle.entries());
    }

    Ok(())
}

fn print_entries(entries: &[cabdex::container::SubEntry<'_>]) {
    for entry in entries {
        print!("  {:>10} {}", entry.data.len(), entry.path);

        match SerializedProbe.probe(entry.path, entry.data) {
            Ok(ProbeResult::NotSerialized) => println!(),
            Ok(ProbeResult::Manifests {
                manifests,
                reference,
            }) => {
                println!(" -> [{}]", reference.dependencies.join(", "));
                for manifest in manifests {
                    println!(
                        "             manifest {} -> [{}]",
                        manifest.name,
                        manifest.dependencies.join(", ")
                    );
                }
            }
            Ok(ProbeResult::References(reference)) => {
                println!(" -> [{}]", reference.dependencies.join(", "));
            }
            Err(e) => println!(" (probe failed: {})", e),
        }
    }
}

/// Expand directories into the container files beneath them, sorted by path.
fn collect_containers(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(input) {
            let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
            if entry.file_type().is_file() && is_container(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn is_container(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CONTAINER_EXTENSIONS.iter().any(|c| e.eq_ignore_ascii_case(c)))
        .unwrap_or(false)
}
