use bgpverse::{config_loader, orchestrator};
use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::{info, LevelFilter};
use std::path::PathBuf;

/// Compile a network topology into per-VM interface, BIRD and QEMU configs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the topology JSON document
    #[arg(short, long, default_value = "universe-pretty.json")]
    topology: PathBuf,

    /// Path to the compiler configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for the per-host, per-node artifact tree
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Log level (overrides the configuration file; RUST_LOG overrides both)
    #[arg(short, long)]
    log_level: Option<LevelFilter>,

    /// Compile and verify without writing any files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging before anything else logs. Without RUST_LOG the
    // filter stays open and the global max level does the filtering.
    let env_filter = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).init();
    if !env_filter {
        log::set_max_level(args.log_level.unwrap_or(LevelFilter::Info));
    }

    let config = config_loader::load_config_or_default(args.config.as_deref())?;
    if !env_filter && args.log_level.is_none() {
        log::set_max_level(config.general.level_filter());
    }

    info!("Starting bgpverse");
    info!("Topology file: {:?}", args.topology);
    info!("Output directory: {:?}", args.output);

    let topology = config_loader::load_topology(&args.topology)?;
    let compiled = orchestrator::compile(&topology, &config)?;

    if args.dry_run {
        info!(
            "Dry run: {} nodes on {} hosts, {} links verified",
            compiled.nodes.len(),
            compiled.hosts.iter().filter(|h| !h.nodes.is_empty()).count(),
            compiled.edges.len()
        );
        return Ok(());
    }

    orchestrator::write_artifacts(&compiled, &args.output)?;

    info!("Compilation completed successfully");
    Ok(())
}
