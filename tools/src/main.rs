use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use codec::EntityLayout;
use fieldsync_tools::{
    compile_layout, decode_packet, format_report_pretty, format_schema_hash, load_schema,
    PacketKind,
};
use tracing::{debug, info};

/// Packets printed when `--sort` is given without `--limit`.
const DEFAULT_SORTED_LIMIT: usize = 10;

#[derive(Parser)]
#[command(name = "fieldsync-tools", version, about = "Inspect fieldsync packets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode create or update packets.
    Inspect(InspectArgs),
    /// Print the schema hash peers compare on connect.
    Hash {
        #[arg(long)]
        schema: PathBuf,
    },
}

#[derive(Args)]
struct InspectArgs {
    /// A packet file, or a directory of them.
    path: PathBuf,
    /// Schema JSON for the entity type.
    #[arg(long)]
    schema: PathBuf,
    #[arg(long, value_enum)]
    kind: Kind,
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
    /// File name pattern applied inside a directory (default `*`).
    #[arg(long)]
    glob: Option<String>,
    /// Largest packets first.
    #[arg(long, value_enum)]
    sort: Option<SortBy>,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Create,
    Update,
}

impl From<Kind> for PacketKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Create => Self::Create,
            Kind::Update => Self::Update,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortBy {
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match Cli::parse().command {
        Command::Inspect(args) => run_inspect(&args),
        Command::Hash { schema } => {
            let layout = compile_layout(load_schema(&schema)?)?;
            println!("{}", format_schema_hash(layout.schema_hash()));
            Ok(())
        }
    }
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let layout = compile_layout(load_schema(&args.schema)?)?;
    if !args.path.is_dir() {
        return print_packet(&layout, &args.path, args);
    }

    let mut packets = list_packets(&args.path, args.glob.as_deref().unwrap_or("*"))?;
    if let Some(SortBy::Size) = args.sort {
        packets.sort_by(|(a_path, a_len), (b_path, b_len)| {
            b_len.cmp(a_len).then_with(|| a_path.cmp(b_path))
        });
    }
    let limit = args
        .limit
        .or(args.sort.map(|_| DEFAULT_SORTED_LIMIT))
        .unwrap_or(usize::MAX);
    info!(dir = %args.path.display(), matched = packets.len(), "inspecting directory");
    for (path, len) in packets.into_iter().take(limit) {
        println!("== {} ({len} bytes) ==", path.display());
        print_packet(&layout, &path, args)?;
    }
    Ok(())
}

/// Regular files in `dir` whose names match `pattern`, sorted by path, with
/// their sizes.
fn list_packets(dir: &Path, pattern: &str) -> Result<Vec<(PathBuf, u64)>> {
    let full = dir.join(pattern);
    let full = full
        .to_str()
        .with_context(|| format!("non-UTF-8 path {}", full.display()))?;
    let mut packets = Vec::new();
    for path in glob::glob(full).context("invalid glob pattern")? {
        let path = path?;
        let meta = fs::metadata(&path).with_context(|| format!("stat {}", path.display()))?;
        if meta.is_file() {
            packets.push((path, meta.len()));
        }
    }
    packets.sort();
    Ok(packets)
}

fn print_packet(layout: &EntityLayout, path: &Path, args: &InspectArgs) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("read packet {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "decoding packet");
    let report = decode_packet(layout, &bytes, args.kind.into())
        .with_context(|| format!("inspect {}", path.display()))?;
    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Pretty => print!("{}", format_report_pretty(&report)),
    }
    Ok(())
}
