//! DNS control-plane client (Route 53)

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use phoenix_common::{DnsRecord, RecordType};
use tracing::info;

/// DNS record operations used by the alias flip
#[async_trait]
pub trait DnsApi {
    /// Upsert the record in the hosted zone
    async fn upsert_record(&self, hosted_zone_id: &str, record: &DnsRecord) -> Result<()>;
}

pub struct Route53Dns {
    client: aws_sdk_route53::Client,
}

impl Route53Dns {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_route53::Client::new(config),
        }
    }
}

#[async_trait]
impl DnsApi for Route53Dns {
    async fn upsert_record(&self, hosted_zone_id: &str, record: &DnsRecord) -> Result<()> {
        let batch = change_batch(record)?;
        let resp = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(hosted_zone_id)
            .change_batch(batch)
            .send()
            .await
            .with_context(|| {
                format!(
                    "upserting {} record {} in zone {}",
                    record.record_type.as_str(),
                    record.name,
                    hosted_zone_id
                )
            })?;

        info!(
            record = %record.name,
            value = %record.value,
            change_info = ?resp.change_info(),
            "record change submitted"
        );
        Ok(())
    }
}

/// Single-change UPSERT batch for one record
fn change_batch(record: &DnsRecord) -> Result<ChangeBatch> {
    let rr_type = match record.record_type {
        RecordType::Cname => RrType::Cname,
    };

    let value = ResourceRecord::builder()
        .value(&record.value)
        .build()
        .context("building resource record")?;

    let record_set = ResourceRecordSet::builder()
        .name(&record.name)
        .r#type(rr_type)
        .ttl(record.ttl)
        .resource_records(value)
        .build()
        .context("building record set")?;

    let change = Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(record_set)
        .build()
        .context("building change")?;

    ChangeBatch::builder()
        .comment("phoenix alias flip")
        .changes(change)
        .build()
        .context("building change batch")
}
