///! Phoenix CLI
///!
///! Command-line interface for refreshing a development warehouse cluster
///! from production snapshots

mod commands;
mod config;
mod logging;
mod output;
mod workflow;

use anyhow::Result;
use clap::{Parser, Subcommand};
use phoenix_aws::{RedshiftWarehouse, Route53Dns};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// AWS region override (defaults to the profile/environment region)
    #[arg(short, long)]
    region: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the dev clone: restore, resize, flip the alias, retire the old clone
    Refresh {
        /// Skip the restore step and operate on an existing cluster
        #[arg(long)]
        skip_restore: bool,
        /// Skip the resize step
        #[arg(long)]
        skip_resize: bool,
        /// Skip the DNS alias flip
        #[arg(long)]
        skip_dns: bool,
        /// Keep the previous clone around
        #[arg(long)]
        skip_delete: bool,
        /// Cluster the remaining steps target when --skip-restore is set
        #[arg(long)]
        use_cluster: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Manage warehouse clusters
    Cluster {
        #[command(subcommand)]
        command: ClusterCommands,
    },
    /// Inspect cluster snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Manage the DNS alias
    Dns {
        #[command(subcommand)]
        command: DnsCommands,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ClusterCommands {
    /// List all clusters
    List,
    /// Show cluster details
    Show { id: String },
    /// Print a cluster's endpoint hostname
    Hostname { id: String },
    /// Delete a cluster
    Delete {
        id: String,
        /// Take a final snapshot before deleting
        #[arg(long)]
        final_snapshot: bool,
    },
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// List automated snapshots of a cluster
    List { cluster_id: String },
    /// Show the most recent automated snapshot of a cluster
    Latest { cluster_id: String },
}

#[derive(Subcommand)]
enum DnsCommands {
    /// Point the configured alias at a cluster's endpoint
    Flip { cluster_id: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default config file
    Init,
    /// Print the active configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::LoggingConfig::init_from_env()?;

    // Load config
    let config = config::Config::load().unwrap_or_default();

    // Execute command
    match cli.command {
        Commands::Refresh {
            skip_restore,
            skip_resize,
            skip_dns,
            skip_delete,
            use_cluster,
            yes,
        } => {
            let aws = phoenix_aws::load_sdk_config(cli.region).await;
            let warehouse = RedshiftWarehouse::new(&aws);
            let dns = Route53Dns::new(&aws);
            let flags = workflow::RefreshFlags {
                skip_restore,
                skip_resize,
                skip_dns,
                skip_delete,
                use_cluster,
            };
            commands::refresh::handle_refresh_command(flags, yes, &config, &warehouse, &dns)
                .await?
        }
        Commands::Cluster { command } => {
            let aws = phoenix_aws::load_sdk_config(cli.region).await;
            let warehouse = RedshiftWarehouse::new(&aws);
            commands::cluster::handle_cluster_command(command, &warehouse, &cli.output).await?
        }
        Commands::Snapshot { command } => {
            let aws = phoenix_aws::load_sdk_config(cli.region).await;
            let warehouse = RedshiftWarehouse::new(&aws);
            commands::snapshot::handle_snapshot_command(command, &warehouse, &cli.output).await?
        }
        Commands::Dns { command } => {
            let aws = phoenix_aws::load_sdk_config(cli.region).await;
            let warehouse = RedshiftWarehouse::new(&aws);
            let dns = Route53Dns::new(&aws);
            commands::dns::handle_dns_command(command, &config, &warehouse, &dns).await?
        }
        Commands::Config { command } => {
            commands::config::handle_config_command(command, &config)?
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

/// Generate shell completions
fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
