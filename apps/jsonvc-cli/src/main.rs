use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use jsonvc_common::Document;
use jsonvc_kernel::{compute_diff, Repository, Target};
use jsonvc_persist::{Encoding, FileStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonvc", version, about = "Tiny version control for json files")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write the repo as plain JSON instead of zstd-compressed
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new jsonvc repository
    Init {
        /// The path to the jsonvc repo
        path: PathBuf,
    },
    /// Replace the repo document with new data and commit it
    Commit {
        /// The path to the jsonvc repo
        path: PathBuf,
        /// The new data as a JSON object
        data: Vec<String>,
    },
    /// Show differences between the repo and new data
    Diff {
        /// The path to the jsonvc repo
        path: PathBuf,
        /// The new data as a JSON object
        data: Vec<String>,
    },
    /// Show the history of the repo
    Log {
        /// The path to the jsonvc repo
        path: PathBuf,
    },
    /// Drop commits from the given index or timestamp on
    Reset(TargetArgs),
    /// Drop commits before the given index or timestamp
    Strip(TargetArgs),
    /// Branching is not supported
    Branch {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        _rest: Vec<String>,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// The path to the jsonvc repo
    path: PathBuf,
    /// Index in the repo entries
    #[arg(short, long, allow_hyphen_values = true)]
    index: Option<i64>,
    /// Timestamp in the repo entries
    #[arg(short, long)]
    timestamp: Option<i64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let encoding = if cli.plain {
        Encoding::Plain
    } else {
        Encoding::default()
    };

    match cli.command {
        Commands::Init { path } => {
            let store = FileStore::open_with(&path, encoding)?;
            println!("Initialized jsonvc repo at {}", store.path().display());
        }
        Commands::Commit { path, data } => {
            let mut repo = open(&path, encoding)?;
            let new = parse_data(&data)?;
            if repo.update(new)? {
                println!("Repo updated and committed.");
            } else {
                println!("Nothing to commit.");
            }
        }
        Commands::Diff { path, data } => {
            let repo = open(&path, encoding)?;
            let new = parse_data(&data)?;
            println!("Differences:");
            let Some(diff) = compute_diff(repo.document(), &new) else {
                println!("Nothing");
                return Ok(());
            };
            println!("\tUpdates:");
            for (key, value) in diff.changes() {
                println!("\t\t{key}: {value}");
            }
            println!();
            println!("\tDeletions:");
            for key in diff.deletions() {
                println!("\t\t{key}");
            }
        }
        Commands::Log { path } => {
            let repo = open(&path, encoding)?;
            println!("{}", repo.summary());
            for entry in repo.history() {
                println!("\t{entry}");
            }
        }
        Commands::Reset(args) => {
            let target = Target::from_parts(args.index, args.timestamp)?;
            open(&args.path, encoding)?.reset(target)?;
            println!("Reset repo.");
        }
        Commands::Strip(args) => {
            let target = Target::from_parts(args.index, args.timestamp)?;
            open(&args.path, encoding)?.strip(target)?;
            println!("Stripped repo.");
        }
        Commands::Branch { .. } => {
            anyhow::bail!("branching is not supported");
        }
    }

    Ok(())
}

fn open(path: &Path, encoding: Encoding) -> anyhow::Result<Repository<FileStore>> {
    let store = FileStore::open_with(path, encoding)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let repo = Repository::open(store)
        .with_context(|| format!("failed to load {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = repo.entries().len(), "repo opened");
    Ok(repo)
}

/// Join the data words and parse them as one JSON object.
fn parse_data(words: &[String]) -> anyhow::Result<Document> {
    let text = words.join(" ");
    serde_json::from_str(&text).with_context(|| format!("data must be a JSON object: {text}"))
}
