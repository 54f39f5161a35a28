use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pkgdb::config::DatabaseConfig;
use pkgdb::store::{SqliteStore, Store};
use pkgdb::types::repr::LATEST_REPR_VERSION;
use pkgdb::types::{ApiRepr, AuditQuery};

#[derive(Parser)]
#[command(name = "pkgdb")]
#[command(about = "Package database administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where to find the database.
#[derive(Args)]
struct DatabaseArgs {
    /// Data directory holding the database; overrides the config file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl DatabaseArgs {
    fn config(&self) -> anyhow::Result<DatabaseConfig> {
        let mut config = match &self.config {
            Some(path) => DatabaseConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => DatabaseConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        Ok(config)
    }

    /// Opens an existing database.
    fn open(&self) -> anyhow::Result<SqliteStore> {
        let config = self.config()?;
        let db_path = config.db_path();
        if !db_path.exists() {
            bail!(
                "Database not initialized at {}. Run 'pkgdb init' first.",
                db_path.display()
            );
        }
        Ok(SqliteStore::with_config(&config)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed the status vocabulary
    Init {
        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Copy a listing's acls onto another branch of the same package
    Clone {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Package name
        #[arg(long)]
        package: String,

        /// Source branch (branch name or name-version)
        #[arg(long)]
        from: String,

        /// Target branch (branch name or name-version)
        #[arg(long)]
        to: String,

        /// User recorded in the audit log
        #[arg(long)]
        author: String,
    },

    /// Print the acls of every listing of a package
    Acls {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Package name
        #[arg(long)]
        package: String,
    },

    /// Print the exported representation of a listing
    Export {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Package name
        #[arg(long)]
        package: String,

        /// Branch (branch name or name-version)
        #[arg(long)]
        branch: String,

        /// Representation version
        #[arg(long, default_value_t = LATEST_REPR_VERSION)]
        repr_version: u32,
    },

    /// Print audit log entries, oldest first
    Log {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<u32>,

        /// Only entries by this author
        #[arg(long)]
        author: Option<String>,
    },
}

fn run_init(db: &DatabaseArgs) -> anyhow::Result<()> {
    let config = db.config()?;
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::with_config(&config)?;
    store.initialize()?;

    println!("Initialized database at {}", config.db_path().display());
    Ok(())
}

fn run_clone(
    db: &DatabaseArgs,
    package: &str,
    from: &str,
    to: &str,
    author: &str,
) -> anyhow::Result<()> {
    let store = db.open()?;
    let package = store.package_by_name(package)?;
    let collection = store.collection_by_simple_name(from)?;
    let Some(source) = store.listing_for(package.id, collection.id)? else {
        bail!("{} is not listed on {}", package.name, collection.simple_name());
    };

    let cloned = store.clone_listing(source.id, to, author)?;
    let detail = store.listing_detail(cloned.id)?;
    info!(
        "Cloned acls of {} from {} to {}",
        package.name,
        collection.simple_name(),
        detail.collection.simple_name()
    );
    println!(
        "{} {} -> {} (listing {})",
        package.name,
        collection.simple_name(),
        detail.collection.simple_name(),
        cloned.id
    );
    Ok(())
}

fn run_acls(db: &DatabaseArgs, package: &str) -> anyhow::Result<()> {
    let store = db.open()?;
    let acls = store.package_acls(package)?;
    println!("{}", serde_json::to_string_pretty(&acls)?);
    Ok(())
}

fn run_export(
    db: &DatabaseArgs,
    package: &str,
    branch: &str,
    repr_version: u32,
) -> anyhow::Result<()> {
    let store = db.open()?;
    let package = store.package_by_name(package)?;
    let collection = store.collection_by_simple_name(branch)?;
    let Some(listing) = store.listing_for(package.id, collection.id)? else {
        bail!("{} is not listed on {}", package.name, collection.simple_name());
    };

    let repr = store.listing_detail(listing.id)?.api_repr(repr_version)?;
    println!("{}", serde_json::to_string_pretty(&repr)?);
    Ok(())
}

fn run_log(db: &DatabaseArgs, limit: Option<u32>, author: Option<String>) -> anyhow::Result<()> {
    let store = db.open()?;
    let entries = store.audit_log(&AuditQuery {
        target: None,
        author,
        limit,
    })?;

    for entry in entries {
        println!(
            "{} {} {}",
            entry.changed_at.format("%Y-%m-%d %H:%M:%S"),
            entry.author,
            entry.description
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("pkgdb=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db } => run_init(&db)?,
        Commands::Clone {
            db,
            package,
            from,
            to,
            author,
        } => run_clone(&db, &package, &from, &to, &author)?,
        Commands::Acls { db, package } => run_acls(&db, &package)?,
        Commands::Export {
            db,
            package,
            branch,
            repr_version,
        } => run_export(&db, &package, &branch, repr_version)?,
        Commands::Log { db, limit, author } => run_log(&db, limit, author)?,
    }

    Ok(())
}
