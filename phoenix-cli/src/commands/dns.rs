///! DNS alias commands

use crate::config::Config;
use crate::output;
use crate::DnsCommands;
use anyhow::{bail, Result};
use phoenix_aws::{DnsApi, WarehouseApi};
use phoenix_common::DnsRecord;

pub async fn handle_dns_command<W: WarehouseApi, D: DnsApi>(
    command: DnsCommands,
    config: &Config,
    warehouse: &W,
    dns: &D,
) -> Result<()> {
    match command {
        DnsCommands::Flip { cluster_id } => {
            if config.hosted_zone_id.is_empty() || config.record_name.is_empty() {
                bail!("hosted_zone_id and record_name must be set; run 'phoenix config init'");
            }

            let cluster = warehouse.describe_cluster(&cluster_id).await?;
            let hostname = cluster.hostname()?;

            let record = DnsRecord::cname(&config.record_name, hostname, config.record_ttl);
            dns.upsert_record(&config.hosted_zone_id, &record).await?;

            output::print_success(&format!("{} now points at {}", config.record_name, hostname));
        }
    }

    Ok(())
}
