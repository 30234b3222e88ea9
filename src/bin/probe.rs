//! modstore probe binary
//!
//! Opens one module through a pool and reports which files were usable.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use modstore::{
    BlockType, CompressedLinkedState, CompressedVerseState, GenericBookState, ModuleMeta,
    ModuleState, PoolConfig, RawFileLinkedState, RawLinkedState, RawState, StatePool, Testament,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Module layout to open
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    Raw,
    Linked,
    FileLinked,
    CompressedLinked,
    CompressedVerse,
    Genbook,
}

/// Block granularity of compressed verse modules
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Blocks {
    Book,
    Chapter,
    Verse,
}

impl From<Blocks> for BlockType {
    fn from(blocks: Blocks) -> Self {
        match blocks {
            Blocks::Book => BlockType::Book,
            Blocks::Chapter => BlockType::Chapter,
            Blocks::Verse => BlockType::Verse,
        }
    }
}

/// modstore probe
#[derive(Parser, Debug)]
#[command(name = "modstore-probe")]
#[command(about = "Open a module's files and report what is usable")]
#[command(version)]
struct Args {
    /// Module directory (verse layouts) or base file path (other layouts)
    path: PathBuf,

    /// Module layout
    #[arg(short, long, value_enum, default_value = "raw")]
    layout: Layout,

    /// Module name; defaults to the last path component
    #[arg(short, long)]
    module: Option<String>,

    /// Block type of compressed verse modules
    #[arg(short, long, value_enum, default_value = "chapter")]
    blocks: Blocks,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,modstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let name = args.module.clone().unwrap_or_else(|| {
        args.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string())
    });
    let meta = ModuleMeta::new(name.as_str(), &args.path).with_block_type(args.blocks.into());

    tracing::info!("modstore probe v{}", modstore::VERSION);
    tracing::info!("Module: {} ({:?})", name, args.layout);
    tracing::info!("Path: {}", args.path.display());

    let config = match PoolConfig::builder().queue_capacity(1).build() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid pool config: {}", e);
            std::process::exit(1);
        }
    };
    let pool = StatePool::new(config);

    let outcome = match args.layout {
        Layout::Raw => probe::<RawState>(&pool, &meta, |s| {
            for t in Testament::ALL {
                tracing::info!("{}: {}", t, open_or_absent(s.has_testament(t)));
            }
        }),
        Layout::Linked => probe::<RawLinkedState>(&pool, &meta, |s| {
            tracing::info!("index/data: {}", open_or_absent(s.index().is_some()));
        }),
        Layout::FileLinked => probe::<RawFileLinkedState>(&pool, &meta, |s| {
            tracing::info!("index/data: {}", open_or_absent(s.linked().index().is_some()));
            match s.incfile_value() {
                Ok(Some(v)) => tracing::info!("incfile: next free record {}", v),
                Ok(None) => tracing::info!("incfile: absent"),
                Err(e) => tracing::warn!("incfile: {}", e),
            }
        }),
        Layout::CompressedLinked => probe::<CompressedLinkedState>(&pool, &meta, |s| {
            tracing::info!("index/data: {}", open_or_absent(s.linked().index().is_some()));
            tracing::info!("compressed: {}", open_or_absent(s.has_compressed()));
        }),
        Layout::CompressedVerse => probe::<CompressedVerseState>(&pool, &meta, |s| {
            for t in Testament::ALL {
                tracing::info!("{}: {}", t, open_or_absent(s.has_testament(t)));
            }
        }),
        Layout::Genbook => probe::<GenericBookState>(&pool, &meta, |s| {
            tracing::info!("data: {}", open_or_absent(s.data().is_some()));
        }),
    };

    if let Err(e) = outcome {
        tracing::error!("Failed to open module: {}", e);
        std::process::exit(1);
    }

    pool.shutdown();
}

/// Acquire, report, release, then acquire again to show reuse
fn probe<S: ModuleState>(
    pool: &StatePool,
    meta: &ModuleMeta,
    report: impl FnOnce(&mut S),
) -> modstore::Result<()> {
    let mut checkout = pool.acquire::<S, _>(meta)?;

    for warning in &checkout.warnings {
        tracing::warn!("{}", warning);
    }
    report(&mut checkout.state);
    tracing::info!("writable: {}", checkout.state.is_writable());

    let first = checkout.state.instance_id();
    pool.release(checkout.into_state());

    let again = pool.lease::<S, _>(meta)?;
    tracing::info!(
        "re-acquired instance {} (recycled: {}, same: {})",
        again.instance_id(),
        again.recycled(),
        again.instance_id() == first
    );
    Ok(())
}

fn open_or_absent(open: bool) -> &'static str {
    if open {
        "open"
    } else {
        "absent"
    }
}
