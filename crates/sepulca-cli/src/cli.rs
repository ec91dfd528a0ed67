use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sepulca",
    about = "Sepulca — a minimal persistent object store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List all records in a storage
    List(ListArgs),
    /// Create a record with optional initial attributes
    Add(AddArgs),
    /// Erase a record from a storage
    Erase(EraseArgs),
    /// Print one record
    Print(PrintArgs),
    /// Check whether a record exists
    Check(CheckArgs),
    /// Exercise the storage lock file
    Lock(LockArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Storage directory
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct AddArgs {
    /// Storage directory
    pub dir: PathBuf,
    /// Initial attributes as alternating KEY VALUE arguments
    #[arg(value_name = "KEY VALUE")]
    pub attrs: Vec<String>,
}

#[derive(Args)]
pub struct EraseArgs {
    /// Storage directory
    pub dir: PathBuf,
    /// Record identifier, e.g. {aabb-ccdd-eeff-0011}
    pub id: String,
}

#[derive(Args)]
pub struct PrintArgs {
    /// Storage directory
    pub dir: PathBuf,
    /// Record identifier, e.g. {aabb-ccdd-eeff-0011}
    pub id: String,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Storage directory
    pub dir: PathBuf,
    /// Record identifier, e.g. {aabb-ccdd-eeff-0011}
    pub id: String,
}

#[derive(Args)]
pub struct LockArgs {
    /// Storage directory
    pub dir: PathBuf,
    /// Seconds to hold the lock before releasing it
    #[arg(long, default_value_t = 10)]
    pub hold: u64,
}
