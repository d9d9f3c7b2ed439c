//! blockfile inspector - examines a block-addressed storage directory

use anyhow::{Context, Result};
use blockfile::storage::{BlockId, FileManager, Page};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Inspect the files and blocks of a blockfile storage directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Storage directory
    #[arg(short = 'D', long, default_value = "./blockfile_data")]
    data_dir: PathBuf,

    /// Block size in bytes
    #[arg(short, long, default_value = "4096")]
    block_size: usize,

    /// Logical file to inspect (all files are listed when omitted)
    #[arg(short, long)]
    file: Option<String>,

    /// Block number to dump as hex (requires --file)
    #[arg(long)]
    block: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let fm = FileManager::new(&args.data_dir, args.block_size)
        .context("Failed to open storage directory")?;

    println!("📁 Storage directory: {}", args.data_dir.display());
    println!("   - Block size: {} bytes", fm.block_size());
    println!("   - Newly created: {}", fm.is_new());
    println!();

    match (args.file, args.block) {
        (Some(file), Some(block_num)) => {
            let block = BlockId::new(file, block_num);
            let mut page = Page::new(fm.block_size());
            fm.read(&block, &mut page)
                .with_context(|| format!("Failed to read {}", block))?;
            println!("{}:", block);
            dump_hex(page.contents());
        }
        (Some(file), None) => {
            let blocks = fm
                .length(&file)
                .with_context(|| format!("Failed to stat file {}", file))?;
            println!("{}: {} blocks", file, blocks);
        }
        (None, _) => list_files(&args.data_dir, &fm)?,
    }

    Ok(())
}

/// Lists every regular file in the storage directory with its block count.
fn list_files(data_dir: &Path, fm: &FileManager) -> Result<()> {
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(data_dir).context("Failed to list storage directory")? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    if names.is_empty() {
        println!("(no files)");
        return Ok(());
    }

    for name in names {
        let blocks = fm
            .length(&name)
            .with_context(|| format!("Failed to stat file {}", name))?;
        println!("{}: {} blocks", name, blocks);
    }

    Ok(())
}

fn dump_hex(bytes: &[u8]) {
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        println!("{:08x}  {:<47}  |{}|", i * 16, hex.join(" "), ascii);
    }
}
