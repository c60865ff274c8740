///! Warehouse cluster commands

use crate::output::{self, OutputFormat};
use crate::ClusterCommands;
use anyhow::Result;
use dialoguer::Confirm;
use phoenix_aws::WarehouseApi;
use phoenix_common::Cluster;
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct ClusterRow {
    identifier: String,
    status: String,
    node_type: String,
    nodes: String,
    endpoint: String,
}

impl From<Cluster> for ClusterRow {
    fn from(c: Cluster) -> Self {
        Self {
            identifier: c.identifier,
            status: c.status.to_string(),
            node_type: c.node_type,
            nodes: c.number_of_nodes.to_string(),
            endpoint: c
                .endpoint
                .map(|e| format!("{}:{}", e.address, e.port))
                .unwrap_or_default(),
        }
    }
}

pub async fn handle_cluster_command<W: WarehouseApi>(
    command: ClusterCommands,
    warehouse: &W,
    output_format: &str,
) -> Result<()> {
    match command {
        ClusterCommands::List => {
            let clusters = warehouse.list_clusters().await?;
            let format = OutputFormat::from_str(output_format);
            let rows: Vec<ClusterRow> = clusters.into_iter().map(ClusterRow::from).collect();
            output::print_output(rows, format)?;
        }

        ClusterCommands::Show { id } => {
            let cluster = warehouse.describe_cluster(&id).await?;
            let format = OutputFormat::from_str(output_format);
            output::print_single(&cluster, format)?;
        }

        ClusterCommands::Hostname { id } => {
            let cluster = warehouse.describe_cluster(&id).await?;
            // bare hostname so the output can feed scripts
            println!("{}", cluster.hostname()?);
        }

        ClusterCommands::Delete { id, final_snapshot } => {
            let confirm = Confirm::new()
                .with_prompt(format!("Are you sure you want to delete cluster {}?", id))
                .interact()?;

            if confirm {
                warehouse.delete_cluster(&id, !final_snapshot).await?;
                output::print_deleted("Cluster", &id);
            } else {
                output::print_info("Deletion aborted");
            }
        }
    }

    Ok(())
}
