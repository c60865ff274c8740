//! Common types and decision logic shared between phoenix-aws and phoenix-cli

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Warehouse cluster status as reported by the control plane
///
/// The set of statuses is open-ended (transitional values like
/// "available, prep-for-resize" show up during maintenance), so anything
/// unrecognized is carried verbatim in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Creating,
    Available,
    Modifying,
    Resizing,
    Deleting,
    #[serde(untagged)]
    Other(String),
}

impl ClusterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ClusterStatus::Creating => "creating",
            ClusterStatus::Available => "available",
            ClusterStatus::Modifying => "modifying",
            ClusterStatus::Resizing => "resizing",
            ClusterStatus::Deleting => "deleting",
            ClusterStatus::Other(s) => s,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ClusterStatus::Available)
    }
}

impl From<&str> for ClusterStatus {
    fn from(s: &str) -> Self {
        match s {
            "creating" => ClusterStatus::Creating,
            "available" => ClusterStatus::Available,
            "modifying" => ClusterStatus::Modifying,
            "resizing" => ClusterStatus::Resizing,
            "deleting" => ClusterStatus::Deleting,
            other => ClusterStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restore progress of a cluster created from a snapshot
///
/// `completed` is the only success terminal; `failed` is fatal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RestoreStatus {
    Starting,
    Restoring,
    Completed,
    Failed,
    #[serde(untagged)]
    Other(String),
}

impl RestoreStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RestoreStatus::Starting => "starting",
            RestoreStatus::Restoring => "restoring",
            RestoreStatus::Completed => "completed",
            RestoreStatus::Failed => "failed",
            RestoreStatus::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RestoreStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RestoreStatus::Failed)
    }
}

impl From<&str> for RestoreStatus {
    fn from(s: &str) -> Self {
        match s {
            "starting" => RestoreStatus::Starting,
            "restoring" => RestoreStatus::Restoring,
            "completed" => RestoreStatus::Completed,
            "failed" => RestoreStatus::Failed,
            other => RestoreStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RestoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot origin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotType {
    Automated,
    Manual,
}

impl SnapshotType {
    pub fn as_str(&self) -> &str {
        match self {
            SnapshotType::Automated => "automated",
            SnapshotType::Manual => "manual",
        }
    }
}

/// Cluster endpoint (JDBC host/port)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub port: i32,
}

/// A warehouse cluster as seen through the control plane
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub identifier: String,
    pub status: ClusterStatus,
    pub node_type: String,
    pub number_of_nodes: i32,
    pub endpoint: Option<Endpoint>,
    pub restore_status: Option<RestoreStatus>,
}

impl Cluster {
    /// Endpoint address, fatal when the cluster has none yet
    pub fn hostname(&self) -> Result<&str> {
        self.endpoint
            .as_ref()
            .map(|e| e.address.as_str())
            .ok_or(Error::MissingField("Cluster.Endpoint.Address"))
    }
}

/// A point-in-time cluster backup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub identifier: String,
    pub cluster_identifier: String,
    pub status: String,
    pub snapshot_type: SnapshotType,
    pub created_at: DateTime<Utc>,
    pub size_megabytes: f64,
}

/// DNS record kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Cname,
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::Cname => "CNAME",
        }
    }
}

/// A DNS record to upsert into a hosted zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DnsRecord {
    pub name: String,
    pub record_type: RecordType,
    pub ttl: i64,
    pub value: String,
}

impl DnsRecord {
    pub fn cname(name: impl Into<String>, value: impl Into<String>, ttl: i64) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::Cname,
            ttl,
            value: value.into(),
        }
    }
}

/// Node configuration a cluster is resized to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResizeTarget {
    pub node_type: String,
    pub number_of_nodes: i32,
}

impl ResizeTarget {
    /// Control-plane cluster type derived from the node count
    pub fn cluster_type(&self) -> &str {
        if self.number_of_nodes > 1 {
            "multi-node"
        } else {
            "single-node"
        }
    }
}

/// Outcome of looking for the previous clone among existing clusters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneMatch {
    /// No available cluster carries the prefix
    None,
    /// Exactly one candidate; safe to retire after the flip
    One(String),
    /// Ambiguous; nothing gets deleted
    Many(Vec<String>),
}

/// Pick the most recent automated snapshot
///
/// Manual snapshots are ignored even if newer; the refresh only ever clones
/// from the automated backup chain.
pub fn latest_snapshot(snapshots: &[Snapshot]) -> Option<&Snapshot> {
    snapshots
        .iter()
        .filter(|s| s.snapshot_type == SnapshotType::Automated)
        .max_by_key(|s| s.created_at)
}

/// Find the previous clone: an `available` cluster whose identifier starts
/// with the clone prefix
pub fn find_stale_clone(clusters: &[Cluster], prefix: &str) -> CloneMatch {
    let mut candidates: Vec<String> = clusters
        .iter()
        .filter(|c| c.identifier.starts_with(prefix) && c.status.is_available())
        .map(|c| c.identifier.clone())
        .collect();

    match candidates.len() {
        0 => CloneMatch::None,
        1 => CloneMatch::One(candidates.remove(0)),
        _ => CloneMatch::Many(candidates),
    }
}

/// Build the identifier for a freshly restored clone: prefix plus a
/// minute-resolution timestamp, e.g. `warehouse-dev-2026-08-06-09-05`
pub fn clone_identifier(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, at.format("%Y-%m-%d-%H-%M"))
}

/// Check a cluster identifier against the control plane's naming rules:
/// 1-63 chars, lowercase alphanumeric and hyphens, starts with a letter,
/// no trailing or consecutive hyphens
pub fn validate_identifier(id: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidIdentifier {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.is_empty() || id.len() > 63 {
        return Err(invalid("must be 1-63 characters"));
    }
    if !id.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("must start with a lowercase letter"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "only lowercase letters, digits and hyphens are allowed",
        ));
    }
    if id.ends_with('-') || id.contains("--") {
        return Err(invalid("hyphens may not trail or repeat"));
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("No automated snapshot found for cluster: {0}")]
    NoSnapshot(String),

    #[error("Missing field in control-plane response: {0}")]
    MissingField(&'static str),

    #[error("Invalid cluster identifier '{id}': {reason}")]
    InvalidIdentifier { id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
