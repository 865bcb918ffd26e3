mod commands;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use xelon_api::DEFAULT_BASE_URL;
use xelon_machine::config::{
    DEFAULT_CPU_CORES, DEFAULT_DEVICE_PASSWORD, DEFAULT_DISK_SIZE, DEFAULT_KUBERNETES_ID,
    DEFAULT_MEMORY, DEFAULT_SSH_PORT, DEFAULT_SSH_USER, DEFAULT_SWAP_DISK_SIZE,
};
use xelon_machine::{DeviceHandle, DriverConfig, Readiness};

#[derive(Parser)]
#[command(name = "xelon-machine")]
#[command(about = "Provision and manage Docker hosts on Xelon VDC", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    driver: DriverArgs,

    #[command(flatten)]
    device: DeviceArgs,

    /// Enable debug logging
    #[arg(long, global = true, env = "XELON_DEBUG")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a device and print its identifiers as JSON
    Create,
    /// Start the device
    Start,
    /// Stop the device and wait until it is powered off
    Stop,
    /// Stop and start the device
    Restart,
    /// Issue a stop command without waiting
    Kill,
    /// Stop and delete the device
    Remove,
    /// Show the device state
    Status,
    /// Show the Docker URL of the running device
    Url,
    /// Show the SSH hostname of the device
    SshHostname,
    /// Show version information
    Version,
}

#[derive(Args)]
struct DriverArgs {
    /// Machine name, used as display name and hostname of the device
    #[arg(long, global = true, env = "XELON_MACHINE_NAME", default_value = "default")]
    machine_name: String,

    /// Directory for machine files such as SSH keys
    #[arg(long, global = true, env = "XELON_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Xelon API base URL
    #[arg(long, global = true, env = "XELON_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    api_base_url: String,

    /// Xelon authentication token
    #[arg(long, global = true, env = "XELON_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Xelon account username, used when no token is given
    #[arg(long, global = true, env = "XELON_USERNAME")]
    username: Option<String>,

    /// Xelon account password, used when no token is given
    #[arg(long, global = true, env = "XELON_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Number of CPU cores for the device
    #[arg(long, global = true, env = "XELON_CPU_CORES", default_value_t = DEFAULT_CPU_CORES)]
    cpu_cores: u32,

    /// Password for the device
    #[arg(
        long,
        global = true,
        env = "XELON_DEVICE_PASSWORD",
        hide_env_values = true,
        default_value = DEFAULT_DEVICE_PASSWORD,
        hide_default_value = true
    )]
    device_password: String,

    /// Drive size for the device in GB
    #[arg(long, global = true, env = "XELON_DISK_SIZE", default_value_t = DEFAULT_DISK_SIZE)]
    disk_size: u32,

    /// Kubernetes ID for the device
    #[arg(long, global = true, env = "XELON_KUBERNETES_ID", default_value = DEFAULT_KUBERNETES_ID)]
    kubernetes_id: String,

    /// Size of memory for the device in GB
    #[arg(long, global = true, env = "XELON_MEMORY", default_value_t = DEFAULT_MEMORY)]
    memory: u32,

    /// Swap disk size for the device in GB
    #[arg(long, global = true, env = "XELON_SWAP_DISK_SIZE", default_value_t = DEFAULT_SWAP_DISK_SIZE)]
    swap_disk_size: u32,

    /// Template the device is created from
    #[arg(long, global = true, env = "XELON_TEMPLATE_ID")]
    template_id: Option<u32>,

    /// SSH port to connect
    #[arg(long, global = true, env = "XELON_SSH_PORT", default_value_t = DEFAULT_SSH_PORT)]
    ssh_port: u16,

    /// SSH username to connect
    #[arg(long, global = true, env = "XELON_SSH_USER", default_value = DEFAULT_SSH_USER)]
    ssh_user: String,

    /// Wait for the guest agent before a device counts as ready
    #[arg(
        long,
        global = true,
        env = "XELON_REQUIRE_GUEST_TOOLS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    require_guest_tools: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "XELON_REQUEST_TIMEOUT", default_value_t = 15)]
    request_timeout: u64,
}

impl DriverArgs {
    fn into_config(self) -> DriverConfig {
        let defaults = DriverConfig::default();
        DriverConfig {
            machine_name: self.machine_name,
            store_path: self.store_path.unwrap_or(defaults.store_path),
            api_base_url: self.api_base_url,
            token: self.token,
            username: self.username,
            password: self.password,
            cpu_cores: self.cpu_cores,
            device_password: self.device_password,
            disk_size: self.disk_size,
            kubernetes_id: self.kubernetes_id,
            memory: self.memory,
            swap_disk_size: self.swap_disk_size,
            template_id: self.template_id,
            ssh_port: self.ssh_port,
            ssh_user: self.ssh_user,
            request_timeout: Duration::from_secs(self.request_timeout),
            readiness: if self.require_guest_tools {
                Readiness::GuestAgent
            } else {
                Readiness::Provisioned
            },
            poll: defaults.poll,
        }
    }
}

/// Identifiers of an existing device, as printed by `create`
#[derive(Args)]
struct DeviceArgs {
    /// Device (localvmid) to operate on
    #[arg(long, global = true, env = "XELON_DEVICE_ID")]
    device_id: Option<String>,

    /// Tenant of the device; looked up when omitted
    #[arg(long, global = true, env = "XELON_TENANT_ID")]
    tenant_id: Option<String>,

    /// IP address recorded at create time
    #[arg(long, global = true, env = "XELON_IP_ADDRESS")]
    ip_address: Option<String>,
}

impl From<DeviceArgs> for DeviceHandle {
    fn from(args: DeviceArgs) -> Self {
        DeviceHandle {
            tenant_id: args.tenant_id,
            local_vm_id: args.device_id,
            ip_address: args.ip_address,
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    // version needs no credentials
    if matches!(cli.command, Commands::Version) {
        println!("xelon-machine {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = cli.driver.into_config();
    let handle = DeviceHandle::from(cli.device);

    commands::run(cli.command, config, handle).await
}
