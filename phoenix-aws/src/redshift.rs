//! Warehouse control-plane client (Redshift)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_redshift::types as rs;
use chrono::DateTime;
use phoenix_common::{
    Cluster, ClusterStatus, Endpoint, Error, ResizeTarget, RestoreStatus, Snapshot, SnapshotType,
};
use tracing::debug;

/// Warehouse cluster operations used by the refresh workflow
#[async_trait]
pub trait WarehouseApi {
    /// Describe a single cluster; errors when it does not exist
    async fn describe_cluster(&self, id: &str) -> Result<Cluster>;

    /// All clusters visible to the account
    async fn list_clusters(&self) -> Result<Vec<Cluster>>;

    /// Automated snapshots of the given cluster
    async fn automated_snapshots(&self, cluster_id: &str) -> Result<Vec<Snapshot>>;

    /// Restore a new cluster from a snapshot taken of `source_id`
    async fn restore_from_snapshot(
        &self,
        new_id: &str,
        snapshot_id: &str,
        source_id: &str,
    ) -> Result<Cluster>;

    /// Change node type / node count; the cluster transitions through
    /// `resizing` and back to `available`
    async fn resize_cluster(&self, id: &str, target: &ResizeTarget) -> Result<()>;

    async fn delete_cluster(&self, id: &str, skip_final_snapshot: bool) -> Result<()>;
}

pub struct RedshiftWarehouse {
    client: aws_sdk_redshift::Client,
}

impl RedshiftWarehouse {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_redshift::Client::new(config),
        }
    }
}

#[async_trait]
impl WarehouseApi for RedshiftWarehouse {
    async fn describe_cluster(&self, id: &str) -> Result<Cluster> {
        debug!(cluster = id, "DescribeClusters");
        let resp = match self
            .client
            .describe_clusters()
            .cluster_identifier(id)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_cluster_not_found_fault() {
                    bail!(Error::ClusterNotFound(id.to_string()));
                }
                return Err(err).with_context(|| format!("describing cluster {}", id));
            }
        };

        let cluster = resp
            .clusters()
            .first()
            .ok_or_else(|| Error::ClusterNotFound(id.to_string()))?;
        cluster_from_sdk(cluster)
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        debug!("DescribeClusters (all)");
        let mut items = self.client.describe_clusters().into_paginator().items().send();

        let mut clusters = Vec::new();
        while let Some(item) = items.next().await {
            let cluster = item.context("listing clusters")?;
            clusters.push(cluster_from_sdk(&cluster)?);
        }
        Ok(clusters)
    }

    async fn automated_snapshots(&self, cluster_id: &str) -> Result<Vec<Snapshot>> {
        debug!(cluster = cluster_id, "DescribeClusterSnapshots");
        let resp = self
            .client
            .describe_cluster_snapshots()
            .cluster_identifier(cluster_id)
            .snapshot_type(SnapshotType::Automated.as_str())
            .send()
            .await
            .with_context(|| format!("listing snapshots of cluster {}", cluster_id))?;

        resp.snapshots().iter().map(snapshot_from_sdk).collect()
    }

    async fn restore_from_snapshot(
        &self,
        new_id: &str,
        snapshot_id: &str,
        source_id: &str,
    ) -> Result<Cluster> {
        debug!(
            cluster = new_id,
            snapshot = snapshot_id,
            source = source_id,
            "RestoreFromClusterSnapshot"
        );
        let resp = self
            .client
            .restore_from_cluster_snapshot()
            .cluster_identifier(new_id)
            .snapshot_identifier(snapshot_id)
            .snapshot_cluster_identifier(source_id)
            .send()
            .await
            .with_context(|| format!("restoring {} from snapshot {}", new_id, snapshot_id))?;

        let cluster = resp
            .cluster()
            .ok_or(Error::MissingField("RestoreFromClusterSnapshot.Cluster"))?;
        cluster_from_sdk(cluster)
    }

    async fn resize_cluster(&self, id: &str, target: &ResizeTarget) -> Result<()> {
        debug!(
            cluster = id,
            node_type = %target.node_type,
            nodes = target.number_of_nodes,
            "ModifyCluster"
        );
        self.client
            .modify_cluster()
            .cluster_identifier(id)
            .cluster_type(target.cluster_type())
            .node_type(&target.node_type)
            .number_of_nodes(target.number_of_nodes)
            .send()
            .await
            .with_context(|| format!("resizing cluster {}", id))?;
        Ok(())
    }

    async fn delete_cluster(&self, id: &str, skip_final_snapshot: bool) -> Result<()> {
        debug!(cluster = id, skip_final_snapshot, "DeleteCluster");
        self.client
            .delete_cluster()
            .cluster_identifier(id)
            .skip_final_cluster_snapshot(skip_final_snapshot)
            .send()
            .await
            .with_context(|| format!("deleting cluster {}", id))?;
        Ok(())
    }
}

fn cluster_from_sdk(cluster: &rs::Cluster) -> Result<Cluster> {
    let identifier = cluster
        .cluster_identifier()
        .ok_or(Error::MissingField("Cluster.ClusterIdentifier"))?
        .to_string();

    let endpoint = cluster.endpoint().and_then(|e| {
        e.address().map(|address| Endpoint {
            address: address.to_string(),
            port: e.port(),
        })
    });

    Ok(Cluster {
        identifier,
        status: ClusterStatus::from(cluster.cluster_status().unwrap_or("unknown")),
        node_type: cluster.node_type().unwrap_or_default().to_string(),
        number_of_nodes: cluster.number_of_nodes(),
        endpoint,
        restore_status: cluster
            .restore_status()
            .and_then(|r| r.status())
            .map(RestoreStatus::from),
    })
}

fn snapshot_from_sdk(snapshot: &rs::Snapshot) -> Result<Snapshot> {
    let identifier = snapshot
        .snapshot_identifier()
        .ok_or(Error::MissingField("Snapshot.SnapshotIdentifier"))?
        .to_string();

    let created_at = snapshot
        .snapshot_create_time()
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .ok_or(Error::MissingField("Snapshot.SnapshotCreateTime"))?;

    Ok(Snapshot {
        identifier,
        cluster_identifier: snapshot.cluster_identifier().unwrap_or_default().to_string(),
        status: snapshot.status().unwrap_or("unknown").to_string(),
        snapshot_type: match snapshot.snapshot_type() {
            Some("manual") => SnapshotType::Manual,
            _ => SnapshotType::Automated,
        },
        created_at,
        size_megabytes: snapshot.total_backup_size_in_mega_bytes(),
    })
}
