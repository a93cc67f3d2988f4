/// cmx - Compatibility Matrix command-line client
///
/// Creates test clusters and VMs through the vendor API and scaffolds
/// the ignore files used when packaging an application.
mod config;
mod nodegroup;
mod print;
mod scaffold;
mod utils;
mod vendor;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::nodegroup::{parse_node_groups, parse_tags, NodeGroupSpec};
use crate::print::OutputFormat;
use crate::utils::PollingConfig;
use crate::vendor::models::NodeGroup;
use crate::vendor::{
    wait_until_running, ApiError, CreateClusterRequest, CreateVmRequest, VendorClient,
    WaitOutcome,
};

/// Exit status used when `--wait` runs out before the resource is ready
const WAIT_EXCEEDED_EXIT_CODE: i32 = 124;

#[derive(Debug, Error)]
#[error("wait duration exceeded")]
struct WaitDurationExceeded;

#[derive(Parser)]
#[command(name = "cmx")]
#[command(about = "Create Compatibility Matrix clusters and VMs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "cmx.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage test clusters
    Cluster {
        #[command(subcommand)]
        command: ClusterCommands,
    },

    /// Manage test VMs
    Vm {
        #[command(subcommand)]
        command: VmCommands,
    },

    /// Scaffold files for packaging an application
    Init {
        #[command(subcommand)]
        command: InitCommands,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ClusterCommands {
    /// Create a test cluster
    Create(ClusterCreateArgs),
}

#[derive(Subcommand)]
enum VmCommands {
    /// Create a test VM
    Create(VmCreateArgs),
}

#[derive(Subcommand)]
enum InitCommands {
    /// Write the .helmignore and .gitignore entries for a packaged chart
    IgnoreFiles {
        /// Helm chart directory
        #[arg(long, default_value = ".")]
        chart_dir: PathBuf,

        /// Directory holding the packaging manifests
        #[arg(long, default_value = "./kots")]
        kots_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Generate example configuration file
    Init,
}

/// Flags shared by cluster and VM creation
#[derive(Args)]
struct CommonCreateArgs {
    /// Name (defaults to random name)
    #[arg(long)]
    name: Option<String>,

    /// Distribution to provision
    #[arg(long)]
    distribution: String,

    /// Version to provision (format is distribution dependent)
    #[arg(long, default_value = "")]
    version: String,

    /// Time to live (duration, max 48h)
    #[arg(long)]
    ttl: Option<String>,

    /// Tag to apply (key=value format, can be specified multiple times)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Wait duration for the resource to be ready, e.g. 10m (leave empty to not wait)
    #[arg(long, value_parser = humantime::parse_duration)]
    wait: Option<Duration>,

    /// Disk Size (GiB) to request per node
    #[arg(long, default_value_t = 50)]
    disk: i64,

    /// The type of instance to use (e.g. m6i.large)
    #[arg(long, default_value = "")]
    instance_type: String,

    /// Dry run
    #[arg(long)]
    dry_run: bool,

    /// The output format to use. One of: json|table|wide
    #[arg(long)]
    output: Option<String>,
}

#[derive(Args)]
struct ClusterCreateArgs {
    #[command(flatten)]
    common: CommonCreateArgs,

    /// License ID to use for the installation
    #[arg(long, default_value = "")]
    license_id: String,

    /// Node count
    #[arg(long, default_value_t = 1)]
    nodes: i64,

    /// Minimum node count (only when --nodes is 0)
    #[arg(long)]
    min_nodes: Option<i64>,

    /// Maximum node count (only when --nodes is 0)
    #[arg(long)]
    max_nodes: Option<i64>,

    /// Default node group (name=?,instance-type=?,nodes=?,disk=? format)
    #[arg(long)]
    default_nodegroup: Option<String>,

    /// Additional node group (name=?,instance-type=?,nodes=?,disk=? format, can be specified multiple times)
    #[arg(long = "additional-nodegroup")]
    additional_nodegroups: Vec<String>,
}

#[derive(Args)]
struct VmCreateArgs {
    #[command(flatten)]
    common: CommonCreateArgs,

    /// IP family to use (ipv4|ipv6|dual)
    #[arg(long, default_value = "")]
    ip_family: String,

    /// Number of VMs to create
    #[arg(long, default_value_t = 1)]
    nodes: i64,

    /// Node group (name=?,instance-type=?,nodes=?,disk=? format, can be specified multiple times)
    #[arg(long = "nodegroup")]
    nodegroups: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cmx={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Cluster {
            command: ClusterCommands::Create(ref args),
        } => create_cluster(&cli, args).await,
        Commands::Vm {
            command: VmCommands::Create(ref args),
        } => create_vm(&cli, args).await,
        Commands::Init {
            command:
                InitCommands::IgnoreFiles {
                    ref chart_dir,
                    ref kots_dir,
                },
        } => init_ignore_files(chart_dir, kots_dir),
        Commands::Config {
            command: ConfigCommands::Init,
        } => init_config(&cli).await,
    };

    if let Err(e) = result {
        if e.is::<WaitDurationExceeded>() {
            warn!("{}", e);
            std::process::exit(WAIT_EXCEEDED_EXIT_CODE);
        }
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Build the default node group from either the descriptor or the discrete flags
fn resolve_default_node_group(args: &ClusterCreateArgs) -> Result<NodeGroup> {
    if let Some(descriptor) = &args.default_nodegroup {
        let parsed =
            parse_node_groups(&[descriptor.as_str()]).context("parse default node group")?;
        let [ng] = parsed.as_slice() else {
            anyhow::bail!("invalid default node group format");
        };
        return Ok(NodeGroup::from(ng));
    }

    let spec = NodeGroupSpec::new(
        "default",
        args.common.instance_type.clone(),
        args.nodes.max(0),
        args.common.disk,
    );
    let mut ng = NodeGroup::from(&spec);

    if args.nodes <= 0 {
        let min_nodes = args.min_nodes.unwrap_or(0);
        let max_nodes = args.max_nodes.unwrap_or(0);
        if min_nodes < 0 {
            anyhow::bail!("min-nodes must be a non-negative number: {}", min_nodes);
        }
        if max_nodes < 0 {
            anyhow::bail!("max-nodes must be a non-negative number: {}", max_nodes);
        }
        ng.min_node_count = Some(min_nodes);
        ng.max_node_count = Some(max_nodes);
    }

    Ok(ng)
}

fn output_format(args: &CommonCreateArgs, settings: &Settings) -> Result<OutputFormat> {
    args.output
        .as_deref()
        .unwrap_or(&settings.defaults.output)
        .parse()
}

fn vendor_client(settings: &Settings) -> Result<VendorClient> {
    let token = settings.get_api_token()?;
    VendorClient::new(&settings.api_origin, &token)
}

/// Turn a forbidden response into the terms-of-service hint
fn explain_forbidden(e: anyhow::Error) -> anyhow::Error {
    match e.downcast_ref::<ApiError>() {
        Some(ApiError::Forbidden(msg)) if msg.is_empty() => anyhow::anyhow!(
            "You must read and accept the Compatibility Matrix Terms of Service before using this command"
        ),
        _ => e,
    }
}

fn resource_name(args: &CommonCreateArgs) -> String {
    args.name
        .clone()
        .unwrap_or_else(utils::names::generate_name)
}

fn resource_ttl(args: &CommonCreateArgs, settings: &Settings) -> String {
    args.ttl
        .clone()
        .or_else(|| settings.defaults.ttl.clone())
        .unwrap_or_default()
}

/// Build the cluster request; the default node group is always first
fn cluster_request(args: &ClusterCreateArgs, settings: &Settings) -> Result<CreateClusterRequest> {
    let tags = parse_tags(&args.common.tags).context("parse tags")?;
    let additional =
        parse_node_groups(&args.additional_nodegroups).context("parse node groups")?;
    let default_group = resolve_default_node_group(args)?;

    let mut node_groups = vec![default_group];
    node_groups.extend(additional.iter().map(NodeGroup::from));

    Ok(CreateClusterRequest {
        name: resource_name(&args.common),
        kubernetes_distribution: args.common.distribution.clone(),
        kubernetes_version: args.common.version.clone(),
        license_id: args.license_id.clone(),
        ttl: resource_ttl(&args.common, settings),
        node_groups,
        tags,
    })
}

fn vm_request(args: &VmCreateArgs, settings: &Settings) -> Result<CreateVmRequest> {
    let tags = parse_tags(&args.common.tags).context("parse tags")?;
    let node_groups = parse_node_groups(&args.nodegroups).context("parse node groups")?;

    Ok(CreateVmRequest {
        name: resource_name(&args.common),
        distribution: args.common.distribution.clone(),
        version: args.common.version.clone(),
        ip_family: args.ip_family.clone(),
        node_count: args.nodes,
        disk_gib: args.common.disk,
        ttl: resource_ttl(&args.common, settings),
        instance_type: args.common.instance_type.clone(),
        node_groups: node_groups.iter().map(NodeGroup::from).collect(),
        tags,
    })
}

/// Wait settings for `--wait`, or None when the flag is absent or zero
fn wait_polling(
    wait: Option<Duration>,
    interval: Duration,
    description: String,
) -> Option<PollingConfig> {
    wait.filter(|d| !d.is_zero())
        .map(|d| PollingConfig::new(d, interval, description))
}

/// Create a test cluster
async fn create_cluster(cli: &Cli, args: &ClusterCreateArgs) -> Result<()> {
    let settings = Settings::load(&cli.config).context("Failed to load configuration")?;
    let format = output_format(&args.common, &settings)?;
    let request = cluster_request(args, &settings)?;

    info!(
        "Creating cluster {} ({} {}) with {} node group(s)",
        request.name,
        request.kubernetes_distribution,
        request.kubernetes_version,
        request.node_groups.len()
    );

    let client = vendor_client(&settings)?;
    let mut stdout = std::io::stdout();
    run_cluster_create(
        &client,
        &request,
        &args.common,
        format,
        vendor::wait::WAIT_INTERVAL,
        &mut stdout,
    )
    .await
}

async fn run_cluster_create<W: Write>(
    client: &VendorClient,
    request: &CreateClusterRequest,
    args: &CommonCreateArgs,
    format: OutputFormat,
    interval: Duration,
    out: &mut W,
) -> Result<()> {
    if args.dry_run {
        let estimate = client
            .create_cluster_dry_run(request)
            .await
            .map_err(explain_forbidden)?;
        return print::dry_run(out, estimate.total_cost, &estimate.ttl);
    }

    let cluster = client
        .create_cluster(request)
        .await
        .map_err(explain_forbidden)
        .context("create cluster")?;

    let description = format!("Waiting for cluster {} to be running", cluster.id);
    let cluster = match wait_polling(args.wait, interval, description) {
        Some(polling) => {
            let id = cluster.id.clone();
            match wait_until_running(&polling, || client.get_cluster(&id)).await? {
                WaitOutcome::Running(c) => c,
                WaitOutcome::TimedOut(last) => {
                    print::cluster(format, out, last.as_ref().unwrap_or(&cluster))?;
                    out.flush()?;
                    return Err(WaitDurationExceeded.into());
                }
            }
        }
        None => cluster,
    };

    print::cluster(format, out, &cluster)
}

/// Create a test VM
async fn create_vm(cli: &Cli, args: &VmCreateArgs) -> Result<()> {
    let settings = Settings::load(&cli.config).context("Failed to load configuration")?;
    let format = output_format(&args.common, &settings)?;
    let request = vm_request(args, &settings)?;

    info!(
        "Creating vm {} ({} {})",
        request.name, request.distribution, request.version
    );

    let client = vendor_client(&settings)?;
    let mut stdout = std::io::stdout();
    run_vm_create(
        &client,
        &request,
        &args.common,
        format,
        vendor::wait::WAIT_INTERVAL,
        &mut stdout,
    )
    .await
}

async fn run_vm_create<W: Write>(
    client: &VendorClient,
    request: &CreateVmRequest,
    args: &CommonCreateArgs,
    format: OutputFormat,
    interval: Duration,
    out: &mut W,
) -> Result<()> {
    if args.dry_run {
        let estimate = client
            .create_vm_dry_run(request)
            .await
            .map_err(explain_forbidden)?;
        return print::dry_run(out, estimate.total_cost, &estimate.ttl);
    }

    let vm = client
        .create_vm(request)
        .await
        .map_err(explain_forbidden)
        .context("create vm")?;

    let description = format!("Waiting for vm {} to be running", vm.id);
    let vm = match wait_polling(args.wait, interval, description) {
        Some(polling) => {
            let id = vm.id.clone();
            match wait_until_running(&polling, || client.get_vm(&id)).await? {
                WaitOutcome::Running(v) => v,
                WaitOutcome::TimedOut(last) => {
                    print::vm(format, out, last.as_ref().unwrap_or(&vm))?;
                    out.flush()?;
                    return Err(WaitDurationExceeded.into());
                }
            }
        }
        None => vm,
    };

    print::vm(format, out, &vm)
}

/// Write the packaging ignore files
fn init_ignore_files(chart_dir: &std::path::Path, kots_dir: &std::path::Path) -> Result<()> {
    scaffold::write_helmignore(chart_dir)?;

    std::fs::create_dir_all(kots_dir)
        .with_context(|| format!("Failed to create {}", kots_dir.display()))?;
    scaffold::write_gitignore(kots_dir)?;

    info!("✓ Ignore files written");
    Ok(())
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let example = Settings::example();
    let yaml = serde_yaml::to_string(&example)?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Set your vendor API token:");
    info!("     export REPLICATED_API_TOKEN=your-token-here");
    info!("  2. Create a cluster:");
    info!("     cmx cluster create --distribution k3s");

    Ok(())
}
