//! mnemo CLI: search, verify and vault sync for a markdown knowledge store.
//!
//! Every command prints JSON on stdout. Logs go to stderr and are
//! filtered with `MNEMO_LOG` (default `warn`).

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use mnemo_core::{Category, MnemoConfig, NoteLayout, ProjectId};
use mnemo_index::{DocumentStore, SqliteVectorIndex, VectorIndex};
use mnemo_search::{SearchEngine, SearchMode, SearchRequest};
use mnemo_vault::{
    discover_working_copies, init_vault, migrate, resolve_project, FixedProject, GitCli,
    GitRemoteDetector, MigrateMode, Synchronizer,
};

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(version)]
#[command(about = "Federated markdown knowledge store")]
struct Cli {
    /// Working copy root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hybrid full-text and semantic search
    #[command(alias = "s")]
    Search {
        query: String,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// fts, vector or hybrid
        #[arg(long, default_value = "hybrid")]
        mode: SearchMode,
        /// Scope to this project (defaults to the detected one)
        #[arg(long, conflicts_with = "all_projects")]
        project: Option<String>,
        /// Search every project
        #[arg(long)]
        all_projects: bool,
    },
    /// Compare notes on disk with the index
    Verify {
        #[arg(long)]
        category: Option<Category>,
        /// Mark orphaned index entries as superseded
        #[arg(long)]
        fix: bool,
    },
    /// Shared vault synchronization
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },
    /// Print shell completions
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
enum VaultAction {
    /// Clone the vault repository and remember it
    Init {
        repo: String,
        /// Checkout location (default: <data dir>/vault)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Mirror notes into the vault, commit and push
    Sync {
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy this project's and universal notes from the vault
    Pull,
    /// Show vault configuration and pending changes
    Status,
    /// Seed the vault from every working copy under a directory
    Migrate {
        parent: PathBuf,
        #[arg(long, conflicts_with = "dry_run")]
        list: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value_t = 3)]
        depth: usize,
    },
}

/// An opened working copy.
struct Workspace {
    root: PathBuf,
    config: MnemoConfig,
    store: DocumentStore,
}

impl Workspace {
    fn open(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("working copy {} not found", root.display()))?;
        let config = MnemoConfig::load(&root)?;
        let store = DocumentStore::open(&config.store_path(&root))?;
        Ok(Self {
            root,
            config,
            store,
        })
    }

    fn layout(&self) -> NoteLayout {
        self.config.layout(&self.root)
    }

    fn project(&self) -> Result<Option<ProjectId>> {
        let git = GitCli;
        Ok(resolve_project(
            self.config.project.as_deref(),
            &GitRemoteDetector::new(&git),
            &self.root,
        )?)
    }

    /// The vector index, or `None` if it is disabled or cannot be opened.
    fn vectors(&self) -> Option<SqliteVectorIndex> {
        if !self.config.search.vector_enabled {
            return None;
        }
        match SqliteVectorIndex::open(&self.config.vector_path(&self.root)) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(error = %e, "vector index unavailable");
                None
            }
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("MNEMO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            category,
            limit,
            offset,
            mode,
            project,
            all_projects,
        } => {
            let ws = Workspace::open(&cli.root)?;
            let scope = match (project, all_projects) {
                (_, true) => None,
                (Some(p), false) => Some(ProjectId::new(p)?),
                (None, false) => ws.project()?,
            };
            let vectors = ws.vectors();
            let engine = SearchEngine::new(
                &ws.store,
                vectors.as_ref().map(|v| v as &dyn VectorIndex),
                &ws.config.search,
            );
            let request = SearchRequest {
                query,
                category,
                limit,
                offset,
                mode,
                project: scope,
            };
            print_json(&engine.search(&request).await?)
        }

        Commands::Verify { category, fix } => {
            let ws = Workspace::open(&cli.root)?;
            let report = mnemo_verify::verify(&ws.layout(), &ws.store, category, fix)?;
            print_json(&report)
        }

        Commands::Vault { action } => {
            let ws = Workspace::open(&cli.root)?;
            let git = GitCli;
            match action {
                VaultAction::Init { repo, dest } => {
                    let dest = match dest {
                        Some(d) if d.is_absolute() => d,
                        Some(d) => ws.root.join(d),
                        None => ws.config.data_dir(&ws.root).join("vault"),
                    };
                    print_json(&init_vault(&ws.store, &git, &repo, &dest)?)
                }
                VaultAction::Sync { dry_run } => {
                    let layout = ws.layout();
                    let detector = FixedProject(ws.project()?);
                    let sync = Synchronizer::new(&layout, &ws.store, &git, &detector);
                    print_json(&sync.sync(dry_run)?)
                }
                VaultAction::Pull => {
                    let layout = ws.layout();
                    let detector = FixedProject(ws.project()?);
                    let sync = Synchronizer::new(&layout, &ws.store, &git, &detector);
                    print_json(&sync.pull()?)
                }
                VaultAction::Status => {
                    let layout = ws.layout();
                    let detector = FixedProject(ws.project()?);
                    let sync = Synchronizer::new(&layout, &ws.store, &git, &detector);
                    print_json(&sync.status()?)
                }
                VaultAction::Migrate {
                    parent,
                    list,
                    dry_run,
                    depth,
                } => {
                    let mode = if list {
                        MigrateMode::List
                    } else if dry_run {
                        MigrateMode::DryRun
                    } else {
                        MigrateMode::Apply
                    };
                    let copies = discover_working_copies(&parent, depth);
                    let detector = GitRemoteDetector::new(&git);
                    print_json(&migrate(&copies, mode, &ws.store, &git, &detector)?)
                }
            }
        }

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "mnemo", &mut io::stdout());
            Ok(())
        }
    }
}
