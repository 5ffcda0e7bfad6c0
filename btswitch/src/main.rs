/*!
 * bt-switch
 * Hand a Bluetooth headset between this machine and a remote host
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use btswitch::{
    default_config_path, load_config, local_hostname, BackendKind, ConfigStore, Host, Operation,
    SwitchPlan, TracingSink, TransportKind, CONFIG_ENV,
};

#[derive(Parser)]
#[command(name = "bt-switch")]
#[command(about = "Move a Bluetooth device between this machine and a remote host")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Target host alias (default: this host's default target)
    #[arg(short, long)]
    target: Option<String>,

    /// Device or group alias (default: this host's default device)
    #[arg(short = 'D', long)]
    device: Option<String>,

    /// switch, push or pull
    #[arg(short, long, default_value = "switch")]
    mode: Operation,

    /// Print the per-device report as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage bluetooth devices
    #[command(subcommand)]
    Devices(DeviceCommand),
    /// Manage remote hosts
    #[command(subcommand)]
    Hosts(HostCommand),
    /// Manage device groups
    #[command(subcommand)]
    Groups(GroupCommand),
    /// Manage default settings per hostname
    #[command(subcommand)]
    Defaults(DefaultsCommand),
}

#[derive(Subcommand)]
enum DeviceCommand {
    /// List configured devices
    List,
    /// Add a new device
    Add {
        alias: String,
        mac: String,
        name: String,
    },
    /// Remove a device
    Remove { alias: String },
}

#[derive(Subcommand)]
enum HostCommand {
    /// List configured hosts
    List,
    /// Add a new host
    Add {
        alias: String,
        address: String,
        user: String,
        #[arg(long, default_value = "ssh")]
        protocol: TransportKind,
        #[arg(long, default_value = "bluez")]
        driver_type: BackendKind,
    },
    /// Remove a host
    Remove { alias: String },
}

#[derive(Subcommand)]
enum GroupCommand {
    /// List configured groups
    List,
    /// Add a group of existing devices
    Add {
        alias: String,
        #[arg(required = true)]
        devices: Vec<String>,
    },
    /// Remove a group
    Remove { alias: String },
}

#[derive(Subcommand)]
enum DefaultsCommand {
    /// List default settings per hostname
    List,
    /// Set default device (or group) and target for a hostname
    Set {
        hostname: String,
        device: String,
        target: String,
    },
    /// Remove defaults for a hostname
    Remove { hostname: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("btswitch={log_level},bt_switch={log_level}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<btswitch::Error>() {
                Some(btswitch::Error::Configuration(_)) | Some(btswitch::Error::Execution(_)) => {
                    error!("{e:#}")
                }
                _ => error!("Unexpected error: {e:?}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(mut cli: Cli) -> Result<ExitCode> {
    let path = match cli.config.clone() {
        Some(path) => path,
        None => default_config_path()?,
    };
    let store = ConfigStore::new(&path);

    match cli.command.take() {
        None => switch(&cli, &path).await,
        Some(Commands::Devices(cmd)) => devices(&store, cmd),
        Some(Commands::Hosts(cmd)) => hosts(&store, cmd),
        Some(Commands::Groups(cmd)) => groups(&store, cmd),
        Some(Commands::Defaults(cmd)) => defaults(&store, cmd),
    }
}

async fn switch(cli: &Cli, path: &std::path::Path) -> Result<ExitCode> {
    let config = load_config(path)?;
    let hostname = local_hostname()?;
    let plan = SwitchPlan::resolve(
        &config,
        &hostname,
        cli.target.as_deref(),
        cli.device.as_deref(),
    )?;

    if plan.is_self_target() {
        warn!("Target is localhost. Nothing to switch.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = plan.execute(cli.mode, &TracingSink).await?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to encode report")?
        );
    }

    for outcome in &report.outcomes {
        if outcome.succeeded() {
            info!("{} ({}): {} {}", outcome.name, outcome.mac, outcome.direction, outcome.status);
        } else {
            error!("{} ({}): {} {}", outcome.name, outcome.mac, outcome.direction, outcome.status);
        }
    }

    if report.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn devices(store: &ConfigStore, cmd: DeviceCommand) -> Result<ExitCode> {
    match cmd {
        DeviceCommand::List => {
            let devices = store.list_devices()?;
            if devices.is_empty() {
                println!("No devices configured.");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{:<15} {:<20} NAME", "ALIAS", "MAC");
            println!("{}", "-".repeat(50));
            for (alias, dev) in &devices {
                println!("{:<15} {:<20} {}", alias, dev.mac, dev.name);
            }
        }
        DeviceCommand::Add { alias, mac, name } => {
            store.add_device(&alias, &mac, &name)?;
            println!("Device '{alias}' added.");
        }
        DeviceCommand::Remove { alias } => {
            store.remove_device(&alias)?;
            println!("Device '{alias}' removed.");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn hosts(store: &ConfigStore, cmd: HostCommand) -> Result<ExitCode> {
    match cmd {
        HostCommand::List => {
            let hosts = store.list_hosts()?;
            if hosts.is_empty() {
                println!("No hosts configured.");
                return Ok(ExitCode::SUCCESS);
            }
            println!(
                "{:<15} {:<20} {:<10} {:<8} DRIVER",
                "ALIAS", "ADDRESS", "USER", "PROTO"
            );
            println!("{}", "-".repeat(65));
            for (alias, host) in &hosts {
                println!(
                    "{:<15} {:<20} {:<10} {:<8} {}",
                    alias, host.address, host.user, host.protocol, host.driver_type
                );
            }
        }
        HostCommand::Add {
            alias,
            address,
            user,
            protocol,
            driver_type,
        } => {
            let host = Host {
                address,
                user,
                protocol,
                driver_type,
            };
            store.add_host(&alias, host)?;
            println!("Host '{alias}' added.");
        }
        HostCommand::Remove { alias } => {
            store.remove_host(&alias)?;
            println!("Host '{alias}' removed.");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn groups(store: &ConfigStore, cmd: GroupCommand) -> Result<ExitCode> {
    match cmd {
        GroupCommand::List => {
            let groups = store.list_groups()?;
            if groups.is_empty() {
                println!("No groups configured.");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{:<15} DEVICES", "ALIAS");
            println!("{}", "-".repeat(50));
            for (alias, members) in &groups {
                println!("{:<15} {}", alias, members.join(", "));
            }
        }
        GroupCommand::Add { alias, devices } => {
            store.add_group(&alias, &devices)?;
            println!("Group '{alias}' added.");
        }
        GroupCommand::Remove { alias } => {
            store.remove_group(&alias)?;
            println!("Group '{alias}' removed.");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn defaults(store: &ConfigStore, cmd: DefaultsCommand) -> Result<ExitCode> {
    match cmd {
        DefaultsCommand::List => {
            let defaults = store.list_defaults()?;
            if defaults.is_empty() {
                println!("No defaults configured.");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{:<20} {:<15} TARGET", "HOSTNAME", "DEVICE");
            println!("{}", "-".repeat(50));
            for (hostname, settings) in &defaults {
                println!(
                    "{:<20} {:<15} {}",
                    hostname, settings.default_device, settings.default_target
                );
            }
        }
        DefaultsCommand::Set {
            hostname,
            device,
            target,
        } => {
            store.set_default(&hostname, &device, &target)?;
            println!("Defaults set for '{hostname}'.");
        }
        DefaultsCommand::Remove { hostname } => {
            store.remove_default(&hostname)?;
            println!("Defaults removed for '{hostname}'.");
        }
    }
    Ok(ExitCode::SUCCESS)
}
