//! wikifs binary.
//!
//! Usage:
//!   wikifs ~/wfs
//!   wikifs --config ./config.toml --debug ~/wfs
//!
//! Unmount with `fusermount -u ~/wfs`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use wikifs_fuse::{MountConfig, build_tree, init_tracing, mount};
use wikifs_kernel::Config;

/// Mount MediaWiki sites as a directory of editable text files.
#[derive(Parser, Debug)]
#[command(name = "wikifs")]
#[command(version, about)]
struct Args {
    /// Where to mount the wiki tree
    mountpoint: PathBuf,

    /// Config file (created with defaults if missing)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    debug: bool,

    /// Let other users see the mount (needs user_allow_other in fuse.conf)
    #[arg(long)]
    allow_other: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("wikifs: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path().context("no home directory for the default config")?,
    };
    let config = Config::load_or_init(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;

    let log_path = config.log_path(&config_path);
    let _log_guard = init_tracing(args.debug || config.general.debug, log_path.as_deref())?;
    tracing::info!("Using config {}", config_path.display());

    // The mount loop blocks this thread; tree futures run on the workers.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("wikifs-io")
        .build()
        .context("start tokio runtime")?;

    let tree = runtime.block_on(build_tree(&config))?;
    let mount_config = MountConfig {
        allow_other: args.allow_other,
    };
    mount(Arc::new(tree), &args.mountpoint, runtime.handle().clone(), &mount_config)
}
