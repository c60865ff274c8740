///! The clone refresh workflow
///!
///! A strictly sequential run of control-plane calls with fixed-interval
///! polling between the asynchronous transitions: validate the source,
///! restore the latest automated snapshot into a fresh clone, resize it,
///! flip the DNS alias, retire the previous clone.

use crate::output;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use phoenix_aws::{DnsApi, WarehouseApi};
use phoenix_common::{
    clone_identifier, find_stale_clone, latest_snapshot, validate_identifier, CloneMatch, Cluster,
    DnsRecord, Error, ResizeTarget,
};
use std::time::Duration;
use tokio::time::sleep;

/// Settings the workflow runs with, resolved from the config file
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub source_cluster: String,
    pub clone_prefix: String,
    pub resize_target: ResizeTarget,
    pub hosted_zone_id: String,
    pub record_name: String,
    pub record_ttl: i64,
    pub poll_interval: Duration,
    pub delete_delay: Duration,
}

/// Step toggles (the original runbook's debugging switches)
#[derive(Debug, Clone, Default)]
pub struct RefreshFlags {
    pub skip_restore: bool,
    pub skip_resize: bool,
    pub skip_dns: bool,
    pub skip_delete: bool,
    /// Target for the remaining steps when the restore is skipped
    pub use_cluster: Option<String>,
}

/// What a refresh run did
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub new_cluster: String,
    pub snapshot: Option<String>,
    pub endpoint: Option<String>,
    pub deleted_cluster: Option<String>,
}

pub struct Refresher<'a, W, D> {
    warehouse: &'a W,
    dns: &'a D,
    settings: RefreshSettings,
    flags: RefreshFlags,
}

impl<'a, W: WarehouseApi, D: DnsApi> Refresher<'a, W, D> {
    pub fn new(warehouse: &'a W, dns: &'a D, settings: RefreshSettings, flags: RefreshFlags) -> Self {
        Self {
            warehouse,
            dns,
            settings,
            flags,
        }
    }

    /// Run the full sequence; `now` feeds the generated clone identifier
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let source = self
            .warehouse
            .describe_cluster(&self.settings.source_cluster)
            .await?;
        output::print_info(&format!("New cluster will be cloned from: {}", source.identifier));

        // The previous clone is located before the restore so the fresh
        // cluster can never end up a deletion candidate.
        let clusters = self.warehouse.list_clusters().await?;
        let stale = find_stale_clone(&clusters, &self.settings.clone_prefix);
        match &stale {
            CloneMatch::One(id) => output::print_info(&format!("Previous clone: {}", id)),
            CloneMatch::None => output::print_info("No previous clone found"),
            CloneMatch::Many(ids) => output::print_warning(&format!(
                "{} clusters match the clone prefix; none will be deleted",
                ids.len()
            )),
        }

        let (new_cluster, snapshot) = if self.flags.skip_restore {
            let id = match &self.flags.use_cluster {
                Some(id) => id.clone(),
                None => bail!("--use-cluster is required when the restore step is skipped"),
            };
            output::print_info(&format!("Skipping restore; targeting cluster {}", id));
            (id, None)
        } else {
            let snapshots = self
                .warehouse
                .automated_snapshots(&source.identifier)
                .await?;
            let snapshot = latest_snapshot(&snapshots)
                .ok_or_else(|| Error::NoSnapshot(source.identifier.clone()))?;
            output::print_info(&format!(
                "Restoring from snapshot: {} (created {})",
                snapshot.identifier, snapshot.created_at
            ));

            let new_id = clone_identifier(&self.settings.clone_prefix, now);
            validate_identifier(&new_id)?;

            let restored = self
                .warehouse
                .restore_from_snapshot(&new_id, &snapshot.identifier, &source.identifier)
                .await?;
            let new_id = restored.identifier;
            self.wait_for_available(&new_id).await?;
            self.wait_for_restore(&new_id).await?;
            output::print_success(&format!("Cluster {} restored", new_id));
            (new_id, Some(snapshot.identifier.clone()))
        };

        if self.flags.skip_resize {
            output::print_info("Skipping resize");
        } else {
            let target = &self.settings.resize_target;
            output::print_info(&format!(
                "Resizing {} to {} x {}",
                new_cluster, target.number_of_nodes, target.node_type
            ));
            self.warehouse.resize_cluster(&new_cluster, target).await?;
            self.wait_for_available(&new_cluster).await?;
            output::print_success(&format!("Cluster {} resized", new_cluster));
        }

        let endpoint = if self.flags.skip_dns {
            output::print_info("Skipping alias flip");
            None
        } else {
            if self.settings.hosted_zone_id.is_empty() || self.settings.record_name.is_empty() {
                bail!("hosted_zone_id and record_name must be configured for the alias flip (or pass --skip-dns)");
            }
            let cluster = self.warehouse.describe_cluster(&new_cluster).await?;
            let hostname = cluster.hostname()?.to_string();
            let record = DnsRecord::cname(
                &self.settings.record_name,
                &hostname,
                self.settings.record_ttl,
            );
            self.dns
                .upsert_record(&self.settings.hosted_zone_id, &record)
                .await?;
            output::print_success(&format!(
                "{} now points at {}",
                self.settings.record_name, hostname
            ));
            Some(hostname)
        };

        let deleted_cluster = if self.flags.skip_delete {
            output::print_info("Skipping old cluster deletion");
            None
        } else {
            self.retire_stale_clone(&stale, &new_cluster).await?
        };

        Ok(RefreshOutcome {
            new_cluster,
            snapshot,
            endpoint,
            deleted_cluster,
        })
    }

    async fn retire_stale_clone(
        &self,
        stale: &CloneMatch,
        new_cluster: &str,
    ) -> Result<Option<String>> {
        match stale {
            CloneMatch::One(old) if old != new_cluster => {
                output::print_info(&format!(
                    "Deleting old cluster {} in {}",
                    old,
                    output::format_duration(self.settings.delete_delay.as_secs())
                ));
                // give clients the record TTL to move off the old endpoint
                sleep(self.settings.delete_delay).await;
                self.warehouse.delete_cluster(old, true).await?;
                output::print_deleted("Cluster", old);
                Ok(Some(old.clone()))
            }
            CloneMatch::One(_) => Ok(None),
            CloneMatch::None => {
                output::print_info("No old cluster to delete");
                Ok(None)
            }
            CloneMatch::Many(ids) => {
                output::print_warning(&format!(
                    "Multiple old clusters exist ({}); delete them manually if no longer needed",
                    ids.join(", ")
                ));
                Ok(None)
            }
        }
    }

    async fn wait_for_available(&self, id: &str) -> Result<Cluster> {
        let spinner = poll_spinner(&format!("Waiting for cluster {} to become available...", id));
        loop {
            let cluster = self.warehouse.describe_cluster(id).await?;
            if cluster.status.is_available() {
                spinner.finish_and_clear();
                return Ok(cluster);
            }
            spinner.set_message(format!(
                "Cluster {} status is {}; waiting {}s",
                id,
                cluster.status,
                self.settings.poll_interval.as_secs()
            ));
            sleep(self.settings.poll_interval).await;
        }
    }

    async fn wait_for_restore(&self, id: &str) -> Result<()> {
        let spinner = poll_spinner(&format!("Waiting for restore of {} to complete...", id));
        loop {
            let cluster = self.warehouse.describe_cluster(id).await?;
            let status = cluster
                .restore_status
                .ok_or(Error::MissingField("Cluster.RestoreStatus"))?;
            if status.is_completed() {
                spinner.finish_and_clear();
                return Ok(());
            }
            if status.is_failed() {
                spinner.finish_and_clear();
                bail!("restore of cluster {} failed", id);
            }
            spinner.set_message(format!(
                "Cluster {} restore status is {}; waiting {}s",
                id,
                status,
                self.settings.poll_interval.as_secs()
            ));
            sleep(self.settings.poll_interval).await;
        }
    }
}

fn poll_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use phoenix_common::{ClusterStatus, Endpoint, RestoreStatus, Snapshot, SnapshotType};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const NEW_ID: &str = "warehouse-dev-2026-08-06-09-05";
    const OLD_ID: &str = "warehouse-dev-2026-08-01-04-10";

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 9, 5, 0).unwrap()
    }

    fn settings() -> RefreshSettings {
        RefreshSettings {
            source_cluster: "warehouse".to_string(),
            clone_prefix: "warehouse-dev".to_string(),
            resize_target: ResizeTarget {
                node_type: "dc2.large".to_string(),
                number_of_nodes: 4,
            },
            hosted_zone_id: "Z2I3829AKAAKDKMK".to_string(),
            record_name: "dev-warehouse.example.com".to_string(),
            record_ttl: 300,
            poll_interval: Duration::ZERO,
            delete_delay: Duration::ZERO,
        }
    }

    fn cluster(id: &str) -> Cluster {
        Cluster {
            identifier: id.to_string(),
            status: ClusterStatus::Available,
            node_type: "dc2.large".to_string(),
            number_of_nodes: 2,
            endpoint: Some(Endpoint {
                address: format!("{}.abc123.example.com", id),
                port: 5439,
            }),
            restore_status: None,
        }
    }

    fn snapshot(id: &str, secs: i64) -> Snapshot {
        Snapshot {
            identifier: id.to_string(),
            cluster_identifier: "warehouse".to_string(),
            status: "available".to_string(),
            snapshot_type: SnapshotType::Automated,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            size_megabytes: 2048.0,
        }
    }

    #[derive(Default)]
    struct MockState {
        clusters: Vec<Cluster>,
        snapshots: Vec<Snapshot>,
        /// Statuses a describe pops before settling on `available`
        status_seq: HashMap<String, Vec<ClusterStatus>>,
        /// Restore statuses a describe pops before settling on `completed`
        restore_seq: HashMap<String, Vec<RestoreStatus>>,
        calls: Vec<String>,
    }

    #[derive(Default)]
    struct MockWarehouse {
        state: Mutex<MockState>,
    }

    impl MockWarehouse {
        fn with(state: MockState) -> Self {
            Self {
                state: Mutex::new(state),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().unwrap().calls.clone()
        }
    }

    #[async_trait]
    impl WarehouseApi for MockWarehouse {
        async fn describe_cluster(&self, id: &str) -> Result<Cluster> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("describe:{}", id));
            let mut cluster = state
                .clusters
                .iter()
                .find(|c| c.identifier == id)
                .cloned()
                .ok_or_else(|| Error::ClusterNotFound(id.to_string()))?;

            cluster.status = match state.status_seq.get_mut(id) {
                Some(seq) if !seq.is_empty() => seq.remove(0),
                _ => ClusterStatus::Available,
            };
            cluster.restore_status = Some(match state.restore_seq.get_mut(id) {
                Some(seq) if !seq.is_empty() => seq.remove(0),
                _ => RestoreStatus::Completed,
            });
            Ok(cluster)
        }

        async fn list_clusters(&self) -> Result<Vec<Cluster>> {
            let mut state = self.state.lock().unwrap();
            state.calls.push("list".to_string());
            Ok(state.clusters.clone())
        }

        async fn automated_snapshots(&self, cluster_id: &str) -> Result<Vec<Snapshot>> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("snapshots:{}", cluster_id));
            Ok(state.snapshots.clone())
        }

        async fn restore_from_snapshot(
            &self,
            new_id: &str,
            snapshot_id: &str,
            source_id: &str,
        ) -> Result<Cluster> {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(format!("restore:{}:{}:{}", new_id, snapshot_id, source_id));
            let restored = cluster(new_id);
            state.clusters.push(restored.clone());
            Ok(restored)
        }

        async fn resize_cluster(&self, id: &str, target: &ResizeTarget) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!(
                "resize:{}:{}:{}",
                id, target.node_type, target.number_of_nodes
            ));
            Ok(())
        }

        async fn delete_cluster(&self, id: &str, skip_final_snapshot: bool) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(format!("delete:{}:{}", id, skip_final_snapshot));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDns {
        upserts: Mutex<Vec<(String, DnsRecord)>>,
    }

    #[async_trait]
    impl DnsApi for MockDns {
        async fn upsert_record(&self, hosted_zone_id: &str, record: &DnsRecord) -> Result<()> {
            self.upserts
                .lock()
                .unwrap()
                .push((hosted_zone_id.to_string(), record.clone()));
            Ok(())
        }
    }

    fn happy_state() -> MockState {
        let mut state = MockState::default();
        state.clusters = vec![cluster("warehouse"), cluster(OLD_ID)];
        state.snapshots = vec![snapshot("snap-old", 1_000), snapshot("snap-new", 2_000)];
        state.status_seq.insert(
            NEW_ID.to_string(),
            vec![ClusterStatus::Creating, ClusterStatus::Creating],
        );
        state.restore_seq.insert(
            NEW_ID.to_string(),
            vec![
                RestoreStatus::Starting,
                RestoreStatus::Restoring,
                RestoreStatus::Restoring,
            ],
        );
        state
    }

    #[tokio::test]
    async fn full_refresh_happy_path() {
        let warehouse = MockWarehouse::with(happy_state());
        let dns = MockDns::default();
        let refresher = Refresher::new(&warehouse, &dns, settings(), RefreshFlags::default());

        let outcome = refresher.run(test_now()).await.unwrap();

        assert_eq!(outcome.new_cluster, NEW_ID);
        assert_eq!(outcome.snapshot.as_deref(), Some("snap-new"));
        assert_eq!(
            outcome.endpoint.as_deref(),
            Some("warehouse-dev-2026-08-06-09-05.abc123.example.com")
        );
        assert_eq!(outcome.deleted_cluster.as_deref(), Some(OLD_ID));

        let calls = warehouse.calls();
        assert_eq!(calls[0], "describe:warehouse");
        assert_eq!(calls[1], "list");
        assert_eq!(calls[2], "snapshots:warehouse");

        let restore = format!("restore:{}:snap-new:warehouse", NEW_ID);
        let resize = format!("resize:{}:dc2.large:4", NEW_ID);
        let delete = format!("delete:{}:true", OLD_ID);
        let pos = |needle: &str| calls.iter().position(|c| c.as_str() == needle).unwrap();
        assert!(pos(&restore) < pos(&resize));
        assert!(pos(&resize) < pos(&delete));
        assert_eq!(calls.last().unwrap(), &delete);

        let upserts = dns.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].0, "Z2I3829AKAAKDKMK");
        assert_eq!(upserts[0].1.name, "dev-warehouse.example.com");
        assert_eq!(
            upserts[0].1.value,
            "warehouse-dev-2026-08-06-09-05.abc123.example.com"
        );
        assert_eq!(upserts[0].1.ttl, 300);
    }

    #[tokio::test]
    async fn ambiguous_clones_are_left_alone() {
        let mut state = happy_state();
        state.clusters.push(cluster("warehouse-dev-2026-07-20-04-10"));
        let warehouse = MockWarehouse::with(state);
        let dns = MockDns::default();
        let refresher = Refresher::new(&warehouse, &dns, settings(), RefreshFlags::default());

        let outcome = refresher.run(test_now()).await.unwrap();

        assert!(outcome.deleted_cluster.is_none());
        assert!(!warehouse.calls().iter().any(|c| c.starts_with("delete:")));
    }

    #[tokio::test]
    async fn no_previous_clone_deletes_nothing() {
        let mut state = happy_state();
        state.clusters.retain(|c| c.identifier == "warehouse");
        let warehouse = MockWarehouse::with(state);
        let dns = MockDns::default();
        let refresher = Refresher::new(&warehouse, &dns, settings(), RefreshFlags::default());

        let outcome = refresher.run(test_now()).await.unwrap();

        assert!(outcome.deleted_cluster.is_none());
        assert!(!warehouse.calls().iter().any(|c| c.starts_with("delete:")));
    }

    #[tokio::test]
    async fn skip_restore_requires_a_target_cluster() {
        let warehouse = MockWarehouse::with(happy_state());
        let dns = MockDns::default();
        let flags = RefreshFlags {
            skip_restore: true,
            ..Default::default()
        };
        let refresher = Refresher::new(&warehouse, &dns, settings(), flags);

        let err = refresher.run(test_now()).await.unwrap_err();
        assert!(err.to_string().contains("--use-cluster"));
    }

    #[tokio::test]
    async fn skip_restore_targets_the_named_cluster() {
        let mut state = happy_state();
        state.clusters.retain(|c| c.identifier == "warehouse");
        state.clusters.push(cluster("warehouse-dev-adopted"));
        let warehouse = MockWarehouse::with(state);
        let dns = MockDns::default();
        let flags = RefreshFlags {
            skip_restore: true,
            use_cluster: Some("warehouse-dev-adopted".to_string()),
            ..Default::default()
        };
        let refresher = Refresher::new(&warehouse, &dns, settings(), flags);

        let outcome = refresher.run(test_now()).await.unwrap();

        assert_eq!(outcome.new_cluster, "warehouse-dev-adopted");
        assert!(outcome.snapshot.is_none());
        // the adopted cluster is also the only prefix match; never deleted
        assert!(outcome.deleted_cluster.is_none());
        let calls = warehouse.calls();
        assert!(!calls.iter().any(|c| c.starts_with("restore:")));
        assert!(!calls.iter().any(|c| c.starts_with("snapshots:")));
        assert!(!calls.iter().any(|c| c.starts_with("delete:")));
        assert!(calls.contains(&"resize:warehouse-dev-adopted:dc2.large:4".to_string()));
    }

    #[tokio::test]
    async fn skip_delete_keeps_the_old_clone() {
        let warehouse = MockWarehouse::with(happy_state());
        let dns = MockDns::default();
        let flags = RefreshFlags {
            skip_delete: true,
            ..Default::default()
        };
        let refresher = Refresher::new(&warehouse, &dns, settings(), flags);

        let outcome = refresher.run(test_now()).await.unwrap();

        assert!(outcome.deleted_cluster.is_none());
        assert!(!warehouse.calls().iter().any(|c| c.starts_with("delete:")));
    }

    #[tokio::test]
    async fn skip_dns_leaves_the_alias_alone() {
        let warehouse = MockWarehouse::with(happy_state());
        let dns = MockDns::default();
        let flags = RefreshFlags {
            skip_dns: true,
            ..Default::default()
        };
        let refresher = Refresher::new(&warehouse, &dns, settings(), flags);

        let outcome = refresher.run(test_now()).await.unwrap();

        assert!(outcome.endpoint.is_none());
        assert!(dns.upserts.lock().unwrap().is_empty());
        // deletion still runs without the flip, as in the original runbook
        assert_eq!(outcome.deleted_cluster.as_deref(), Some(OLD_ID));
    }

    #[tokio::test]
    async fn failed_restore_is_fatal() {
        let mut state = happy_state();
        state.restore_seq.insert(
            NEW_ID.to_string(),
            vec![RestoreStatus::Failed, RestoreStatus::Failed],
        );
        state.status_seq.remove(NEW_ID);
        let warehouse = MockWarehouse::with(state);
        let dns = MockDns::default();
        let refresher = Refresher::new(&warehouse, &dns, settings(), RefreshFlags::default());

        let err = refresher.run(test_now()).await.unwrap_err();
        assert!(err.to_string().contains("restore"));
        assert!(dns.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_snapshot_is_fatal() {
        let mut state = happy_state();
        state.snapshots.clear();
        let warehouse = MockWarehouse::with(state);
        let dns = MockDns::default();
        let refresher = Refresher::new(&warehouse, &dns, settings(), RefreshFlags::default());

        let err = refresher.run(test_now()).await.unwrap_err();
        assert!(err.to_string().contains("No automated snapshot"));
        assert!(!warehouse.calls().iter().any(|c| c.starts_with("restore:")));
    }
}
