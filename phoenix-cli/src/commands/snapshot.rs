///! Cluster snapshot commands

use crate::output::{self, format_megabytes, OutputFormat};
use crate::SnapshotCommands;
use anyhow::Result;
use phoenix_aws::WarehouseApi;
use phoenix_common::{latest_snapshot, Snapshot};
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct SnapshotRow {
    identifier: String,
    created_at: String,
    status: String,
    size: String,
}

impl From<Snapshot> for SnapshotRow {
    fn from(s: Snapshot) -> Self {
        Self {
            identifier: s.identifier,
            created_at: s.created_at.to_rfc3339(),
            status: s.status,
            size: format_megabytes(s.size_megabytes),
        }
    }
}

pub async fn handle_snapshot_command<W: WarehouseApi>(
    command: SnapshotCommands,
    warehouse: &W,
    output_format: &str,
) -> Result<()> {
    match command {
        SnapshotCommands::List { cluster_id } => {
            let mut snapshots = warehouse.automated_snapshots(&cluster_id).await?;
            snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let format = OutputFormat::from_str(output_format);
            let rows: Vec<SnapshotRow> = snapshots.into_iter().map(SnapshotRow::from).collect();
            output::print_output(rows, format)?;
        }

        SnapshotCommands::Latest { cluster_id } => {
            let snapshots = warehouse.automated_snapshots(&cluster_id).await?;
            let format = OutputFormat::from_str(output_format);
            match latest_snapshot(&snapshots) {
                Some(snapshot) => output::print_single(snapshot, format)?,
                None => output::print_warning(&format!(
                    "No automated snapshots found for cluster {}",
                    cluster_id
                )),
            }
        }
    }

    Ok(())
}
