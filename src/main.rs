use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use fabriclab::config::{CompilerConfig, PoolConfig};
use fabriclab::{config_loader, orchestrator};
use log::info;
use std::path::PathBuf;

/// Compile solver output into a containerlab topology
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the compiler configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Solver document (.json, or YAML otherwise)
    #[arg(short, long)]
    solver: Option<String>,

    /// Output path for the containerlab topology
    #[arg(short, long)]
    output: Option<String>,

    /// Output path for the Nix bridge list
    #[arg(long)]
    bridges_output: Option<String>,

    /// IPv4 pool for point-to-point allocation
    #[arg(long, requires = "pool6")]
    pool4: Option<String>,

    /// IPv6 pool for point-to-point allocation
    #[arg(long, requires = "pool4")]
    pool6: Option<String>,

    /// Container image for every node
    #[arg(long)]
    image: Option<String>,

    /// Lab name
    #[arg(long)]
    name: Option<String>,

    /// Compile and report without writing any file
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    /// Layer command-line overrides on top of `config`
    fn apply(&self, mut config: CompilerConfig) -> CompilerConfig {
        if let Some(solver) = &self.solver {
            config.solver = solver.clone();
        }
        if let Some(output) = &self.output {
            config.output.topology = output.clone();
        }
        if let Some(bridges) = &self.bridges_output {
            config.output.bridges = bridges.clone();
        }
        if let Some(image) = &self.image {
            config.topology.image = image.clone();
        }
        if let Some(name) = &self.name {
            config.topology.name = name.clone();
        }
        if self.pool4.is_some() || self.pool6.is_some() {
            config.pools = Some(PoolConfig {
                ipv4: self.pool4.clone(),
                ipv6: self.pool6.clone(),
            });
        }
        config
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting fabriclab v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => config_loader::load_config(path)?,
        None => CompilerConfig::default(),
    };
    let config = args.apply(config);
    config.validate().wrap_err("Invalid configuration after command-line overrides")?;

    info!("Solver document: {}", config.solver);
    info!("Topology output: {}", config.output.topology);
    info!("Bridge list output: {}", config.output.bridges);

    orchestrator::generate_fabric(&config, args.dry_run)?;

    info!("Compilation completed successfully");
    Ok(())
}
