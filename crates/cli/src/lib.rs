mod inspect;

use clap::{Parser, Subcommand};
use modstore_core::{ModuleStore, StoreConfig};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "modstore",
    version,
    about = "Inspect a generational module store",
    long_about = "Reads the module records of a storage root and shows their generations, \
                  descriptor metadata and native library registrations."
)]
pub struct Cli {
    /// Storage root. Defaults to ~/.modstore/storage
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// JSON store configuration file (overrides --root)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List installed modules
    List,
    /// Show one module record and its descriptor
    Show {
        #[arg(value_name = "ID")]
        id: u64,
    },
    /// List the generation directories of a module
    Generations {
        #[arg(value_name = "ID")]
        id: u64,
    },
    /// Resolve a native library of a module
    #[command(
        long_about = "Maps NAME to the platform library file name and searches the module's \
                      registered native paths. The raw NAME is tried when the mapped name has no match."
    )]
    FindLibrary {
        #[arg(value_name = "ID")]
        id: u64,
        #[arg(value_name = "NAME")]
        name: String,
    },
}

fn load_config(cli: &Cli) -> Result<StoreConfig, Box<dyn std::error::Error>> {
    let config = match (&cli.config, &cli.root) {
        (Some(path), _) => StoreConfig::from_file(path)?,
        (None, Some(root)) => StoreConfig::new(root),
        (None, None) => StoreConfig::default_location(),
    };
    // Snapshots are never written from the CLI
    Ok(config.with_save_delay(-1))
}

/// Open an existing store. A missing storage root is an error rather than a
/// new, empty store.
fn open_store(config: &StoreConfig) -> Result<ModuleStore, Box<dyn std::error::Error>> {
    if !config.storage_root.is_dir() {
        return Err(format!("no module store at {}", config.storage_root.display()).into());
    }
    Ok(ModuleStore::with_defaults(config)?)
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _guard = modstore_core::logging::init_logging("cli", &config.log_dir(), false);

    debug!("Opening store at {}", config.storage_root.display());
    let store = open_store(&config)?;

    match cli.command {
        Commands::List => inspect::list(&store, cli.json),
        Commands::Show { id } => inspect::show(&store, id, cli.json),
        Commands::Generations { id } => inspect::generations(&store, id, cli.json),
        Commands::FindLibrary { id, name } => inspect::find_library(&store, id, &name, cli.json),
    }
}
