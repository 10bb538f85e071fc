/// brainctl - maintenance tool for the Second Brain memory store
///
/// Usage:
///   cargo run --bin brainctl -- [--db-path <path>] <command>
///
/// Commands:
///   list [--limit N]                      newest memories first
///   add --category C --content T [--tags] manual entry (summary = content)
///   delete <id>                           remove one memory (missing ids are ignored)
///   compact                               renumber ids to 1..N
///   reset --yes                           destroy every memory
///   count                                 number of stored memories

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use second_brain_schemas::{Category, MemoryId, NewMemory};
use second_brain_store::{MemoryStore, DEFAULT_LOAD_LIMIT};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "brainctl")]
#[command(about = "Inspect and maintain the Second Brain memory store")]
struct Args {
    /// Path to SQLite database file
    #[arg(long, short, env = "DB_PATH")]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the most recent memories
    List {
        #[arg(long, short, default_value_t = DEFAULT_LOAD_LIMIT)]
        limit: usize,
    },
    /// Save a manual memory
    Add {
        #[arg(long, short)]
        category: String,
        #[arg(long)]
        content: String,
        #[arg(long, short, default_value = "")]
        tags: String,
    },
    /// Delete a memory by id
    Delete { id: i64 },
    /// Renumber ids into a contiguous 1..N sequence
    Compact,
    /// Destroy all memories
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Count stored memories
    Count,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let db_path = match args.db_path {
        Some(path) => path,
        None => {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".second-brain").join("second_brain.db")
        }
    };

    let store = MemoryStore::open(&db_path)
        .with_context(|| format!("Failed to open memory store at {}", db_path.display()))?;

    match args.command {
        Command::List { limit } => {
            let records = store.load(limit);
            if records.is_empty() {
                info!("No memories stored");
            }
            for record in records {
                println!(
                    "[{}] {} [{}] {}",
                    record.id, record.created_at, record.category, record.summary
                );
                if !record.tags.is_empty() {
                    println!("      tags: {}", record.tags);
                }
            }
        }
        Command::Add {
            category,
            content,
            tags,
        } => {
            if Category::parse(&category).is_none() {
                warn!("'{}' is not one of the suggested categories", category);
            }
            let id = store.save(&NewMemory::manual(category, content, tags))?;
            println!("Saved memory {}", id);
        }
        Command::Delete { id } => {
            if store.delete(MemoryId(id))? {
                println!("Deleted memory {}", id);
            } else {
                println!("No memory with id {}", id);
            }
        }
        Command::Compact => {
            let count = store.compact_ids()?;
            if count == 0 {
                println!("Store is empty, nothing to compact");
            } else {
                println!("Renumbered {} memories to ids 1..={}", count, count);
            }
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset without --yes");
            }
            store.reset()?;
            println!("All memories destroyed");
        }
        Command::Count => {
            println!("{}", store.count()?);
        }
    }

    Ok(())
}
