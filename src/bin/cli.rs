//! NutellaDB CLI
//!
//! Thin command-line driver over the core: it opens databases by path,
//! names collections by string, and invokes core operations. All state
//! lives in the database directories under the chosen root.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use nutelladb::database::{self, Database};
use nutelladb::snapshot::Repository;
use nutelladb::Result;

/// NutellaDB CLI
#[derive(Parser, Debug)]
#[command(name = "nutella")]
#[command(about = "Embedded key-value database with snapshot versioning")]
#[command(version)]
struct Args {
    /// Directory databases live under
    #[arg(short, long, default_value = "./files")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new database with a generated id
    CreateDb,

    /// List databases under the root directory
    ListDbs,

    /// Create a collection backed by a B-tree of the given order
    CreateCollection {
        db: String,
        name: String,
        order: usize,
    },

    /// Insert a key-value pair into a collection
    Insert {
        db: String,
        collection: String,
        key: String,
        value: String,
    },

    /// Find a key in a collection
    Find {
        db: String,
        collection: String,
        key: String,
    },

    /// Update a key, inserting it when absent
    Update {
        db: String,
        collection: String,
        key: String,
        value: String,
    },

    /// Delete a key from a collection
    Delete {
        db: String,
        collection: String,
        key: String,
    },

    /// List every entry of a collection in key order
    FindAll { db: String, collection: String },

    /// Initialize the snapshot repository of a database
    Init { db: String },

    /// Snapshot the database directory
    Commit {
        db: String,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// List snapshots, oldest first
    Snapshots { db: String },

    /// Restore the database directory to a commit
    Restore { db: String, commit: String },

    /// Compile loose objects into a packfile
    Pack { db: String },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Commands::CreateDb => {
            let db_id = database::generate_db_id();
            let db = Database::create(&args.root.join(&db_id), &db_id)?;
            db.close()?;
            println!("{}", db_id);
        }

        Commands::ListDbs => {
            for id in database::list_databases(&args.root)? {
                println!("{}", id);
            }
        }

        Commands::CreateCollection { db, name, order } => {
            let db = Database::load(&args.root.join(db))?;
            db.create_collection(name, *order)?;
            db.close()?;
            println!("Created collection '{}'", name);
        }

        Commands::Insert {
            db,
            collection,
            key,
            value,
        } => {
            let db = Database::load(&args.root.join(db))?;
            db.collection(collection)?.insert(key, parse_value(value))?;
            db.close()?;
            println!("OK");
        }

        Commands::Find {
            db,
            collection,
            key,
        } => {
            let db = Database::load(&args.root.join(db))?;
            match db.collection(collection)?.find(key)? {
                Some(value) => println!("{}", value),
                None => println!("(nil)"),
            }
        }

        Commands::Update {
            db,
            collection,
            key,
            value,
        } => {
            let db = Database::load(&args.root.join(db))?;
            db.collection(collection)?.upsert(key, parse_value(value))?;
            db.close()?;
            println!("OK");
        }

        Commands::Delete {
            db,
            collection,
            key,
        } => {
            let db = Database::load(&args.root.join(db))?;
            let deleted = db.collection(collection)?.delete(key)?;
            db.close()?;
            println!("{}", if deleted { "OK" } else { "(not found)" });
        }

        Commands::FindAll { db, collection } => {
            let db = Database::load(&args.root.join(db))?;
            for kv in db.collection(collection)?.find_all()? {
                println!("{}\t{}", kv.key, kv.value);
            }
        }

        Commands::Init { db } => {
            Repository::init(&args.root.join(db))?;
            println!("Initialized repository");
        }

        Commands::Commit { db, message } => {
            let repo = Repository::open(&args.root.join(db))?;
            let commit = repo.commit(message)?;
            println!("{}", commit);
        }

        Commands::Snapshots { db } => {
            let repo = Repository::open(&args.root.join(db))?;
            let index = repo.snapshots();
            for (_key, entry) in index.sorted_by_time() {
                println!(
                    "{}  {}  {}",
                    entry.commit, entry.timestamp, entry.message
                );
            }
        }

        Commands::Restore { db, commit } => {
            let repo = Repository::open(&args.root.join(db))?;
            repo.restore(commit)?;
            println!("Restored to commit {}", commit);
        }

        Commands::Pack { db } => {
            let repo = Repository::open(&args.root.join(db))?;
            match repo.pack()? {
                Some(summary) => println!(
                    "Packed {} objects into {}",
                    summary.object_count, summary.name
                ),
                None => println!("No loose objects to pack"),
            }
        }
    }

    Ok(())
}

/// Parse a CLI value as JSON, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
