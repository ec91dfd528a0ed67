use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use sepulca_store::{Attributes, FileStorage, ProcessLock, Record, Storage, LOCK_FILE_NAME};
use sepulca_types::RecordId;

use crate::cli::*;

/// Invalid command usage that clap cannot express on its own.
///
/// `main` maps this to the usage exit code (1) instead of the general
/// failure code (2).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::List(args) => cmd_list(args, format),
        Command::Add(args) => cmd_add(args),
        Command::Erase(args) => cmd_erase(args),
        Command::Print(args) => cmd_print(args, format),
        Command::Check(args) => cmd_check(args),
        Command::Lock(args) => cmd_lock(args),
    }
}

fn open_storage(dir: &Path) -> anyhow::Result<FileStorage> {
    FileStorage::open(dir).with_context(|| format!("opening storage '{}'", dir.display()))
}

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    Ok(RecordId::parse(raw)?)
}

fn print_record(record: &Record<'_>, indent: usize) {
    let pad = " ".repeat(indent * 4);
    println!(
        "{pad}record {}: {} attribute(s)",
        record.id().to_string().yellow(),
        record.attrs().len()
    );
    for (name, value) in record.attrs() {
        println!("{pad}    {name} = {value}");
    }
}

fn record_json(record: &Record<'_>) -> serde_json::Value {
    serde_json::json!({
        "id": record.id(),
        "attrs": record.attrs(),
    })
}

fn cmd_list(args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let storage = open_storage(&args.dir)?;
    match format {
        OutputFormat::Text => {
            println!("storage contents:");
            let mut total = 0;
            storage.enumerate(&mut |record| {
                print_record(&record, 1);
                total += 1;
                true
            })?;
            println!("{total} record(s)");
        }
        OutputFormat::Json => {
            let mut items = Vec::new();
            storage.enumerate(&mut |record| {
                items.push(record_json(&record));
                true
            })?;
            println!("{}", serde_json::Value::Array(items));
        }
    }
    Ok(())
}

fn cmd_add(args: AddArgs) -> anyhow::Result<()> {
    if args.attrs.len() % 2 != 0 {
        return Err(UsageError("attributes must come in <key> <value> pairs".into()).into());
    }
    let mut attrs = Attributes::new();
    for pair in args.attrs.chunks(2) {
        attrs.insert(pair[0].clone(), pair[1].clone());
    }

    let storage = open_storage(&args.dir)?;
    let record = storage.create(attrs)?;
    println!("{} created", "✓".green().bold());
    print_record(&record, 1);
    Ok(())
}

fn cmd_erase(args: EraseArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let storage = open_storage(&args.dir)?;
    let record = storage.get(&id)?;

    println!("this record will be erased:");
    print_record(&record, 1);
    record.erase()?;
    println!("{} erased", "✓".green().bold());
    Ok(())
}

fn cmd_print(args: PrintArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let storage = open_storage(&args.dir)?;
    let record = storage.get(&id)?;
    match format {
        OutputFormat::Text => print_record(&record, 0),
        OutputFormat::Json => println!("{}", record_json(&record)),
    }
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let storage = open_storage(&args.dir)?;
    if storage.exists(&id)? {
        println!("{} record {} exists", "✓".green(), id.to_string().yellow());
    } else {
        println!(
            "{} record {} does not exist",
            "✗".red(),
            id.to_string().yellow()
        );
    }
    Ok(())
}

fn cmd_lock(args: LockArgs) -> anyhow::Result<()> {
    fs::create_dir_all(&args.dir)
        .with_context(|| format!("creating directory '{}'", args.dir.display()))?;
    let lock = ProcessLock::open(args.dir.join(LOCK_FILE_NAME))?;
    let pid = std::process::id();

    println!("testing file lock: {}", lock.path().display());
    println!("[{pid}] locking");
    lock.acquire()?;
    println!("[{pid}] holding for {} sec", args.hold);
    thread::sleep(Duration::from_secs(args.hold));
    println!("[{pid}] unlocking");
    lock.release()?;
    println!("[{pid}] unlocked");
    Ok(())
}
