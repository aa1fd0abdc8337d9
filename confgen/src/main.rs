//! replica-confgen - configuration generator for consensus replica fleets
//!
//! Plans replica endpoints, collects key material from the identity and TLS
//! key generators, and writes the shared cluster config, the per-replica
//! secret configs and the node directory.

use clap::{Args, Parser, Subcommand};
use confgen::{generate, plan, ClusterSpec, ExternalKeygen, Result};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "replica-confgen")]
#[command(author, version, about = "Generate configuration for a batch of replicas", long_about = None)]
struct Cli {
    /// TOML file with run settings (flags override it)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch keys and write all configuration files
    Generate {
        #[command(flatten)]
        cluster: ClusterArgs,

        /// Create the output directory if it does not exist
        #[arg(long)]
        mkdir: bool,
    },

    /// Print the planned replica endpoints without generating keys
    Plan {
        #[command(flatten)]
        cluster: ClusterArgs,
    },

    /// Print the resolved run settings as TOML
    Config {
        #[command(flatten)]
        cluster: ClusterArgs,
    },
}

#[derive(Args, Default)]
struct ClusterArgs {
    /// Replica host address (repeatable, or comma separated)
    #[arg(long = "addr", value_name = "ADDR", value_delimiter = ',', conflicts_with = "ips")]
    addresses: Vec<String>,

    /// File with one replica host address per line
    #[arg(long, value_name = "FILE")]
    ips: Option<PathBuf>,

    /// Replicas per address
    #[arg(long = "iter", value_name = "N")]
    replicas_per_address: Option<usize>,

    /// Peer port of the first replica on each address
    #[arg(long = "pport", value_name = "PORT")]
    peer_port: Option<u16>,

    /// Client port of the first replica on each address
    #[arg(long = "cport", value_name = "PORT")]
    client_port: Option<u16>,

    /// Identity key generator executable
    #[arg(long, value_name = "PATH")]
    keygen: Option<PathBuf>,

    /// TLS key generator executable
    #[arg(long, value_name = "PATH")]
    tls_keygen: Option<PathBuf>,

    /// Output file name prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Node directory file name
    #[arg(long, value_name = "FILE")]
    nodes: Option<String>,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Block size written to the cluster config
    #[arg(long)]
    block_size: Option<u64>,

    /// Stable period written to the cluster config
    #[arg(long)]
    stable_period: Option<u64>,

    /// Pacemaker kind written to the cluster config
    #[arg(long)]
    pace_maker: Option<String>,
}

impl ClusterArgs {
    /// Layer the flags that were given over `spec`
    fn apply(self, spec: &mut ClusterSpec) {
        if !self.addresses.is_empty() {
            spec.addresses = self.addresses;
            spec.address_file = None;
        }
        if let Some(ips) = self.ips {
            spec.address_file = Some(ips);
            spec.addresses.clear();
        }
        if let Some(k) = self.replicas_per_address {
            spec.replicas_per_address = k;
        }
        if let Some(port) = self.peer_port {
            spec.peer_port = port;
        }
        if let Some(port) = self.client_port {
            spec.client_port = port;
        }
        if let Some(keygen) = self.keygen {
            spec.tools.keygen = keygen;
        }
        if let Some(tls_keygen) = self.tls_keygen {
            spec.tools.tls_keygen = tls_keygen;
        }
        if let Some(prefix) = self.prefix {
            spec.output.prefix = prefix;
        }
        if let Some(nodes) = self.nodes {
            spec.output.node_directory = nodes;
        }
        if let Some(dir) = self.out_dir {
            spec.output.dir = dir;
        }
        if self.block_size.is_some() {
            spec.params.block_size = self.block_size;
        }
        if self.stable_period.is_some() {
            spec.params.stable_period = self.stable_period;
        }
        if self.pace_maker.is_some() {
            spec.params.pace_maker = self.pace_maker;
        }
    }
}

fn resolve_spec(config: Option<&std::path::Path>, cluster: ClusterArgs) -> Result<ClusterSpec> {
    let mut spec = ClusterSpec::load(config)?;
    cluster.apply(&mut spec);
    Ok(spec)
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Generate { cluster, mkdir } => {
            let mut spec = resolve_spec(config, cluster)?;
            spec.output.create_dir |= mkdir;

            info!("🚀 replica-confgen v{}", env!("CARGO_PKG_VERSION"));
            let keygen = ExternalKeygen::from_config(&spec.tools);
            let report = generate(&spec, &keygen)?;
            print!("{}", report);
        }

        Commands::Plan { cluster } => {
            let spec = resolve_spec(config, cluster)?;
            for endpoint in plan(&spec)? {
                println!("{}:{}", endpoint.index, endpoint);
            }
        }

        Commands::Config { cluster } => {
            let spec = resolve_spec(config, cluster)?;
            print!("{}", spec.to_toml()?);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        error!("{} failed", e.phase());
        eprintln!("error: {} failed: {}", e.phase(), e);
        std::process::exit(1);
    }
}
