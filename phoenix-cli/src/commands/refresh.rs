///! Dev-clone refresh command

use crate::config::Config;
use crate::output;
use crate::workflow::{Refresher, RefreshFlags, RefreshSettings};
use anyhow::{bail, Result};
use chrono::Utc;
use dialoguer::Confirm;
use phoenix_aws::{DnsApi, WarehouseApi};
use phoenix_common::ResizeTarget;
use std::time::{Duration, Instant};

pub async fn handle_refresh_command<W: WarehouseApi, D: DnsApi>(
    flags: RefreshFlags,
    yes: bool,
    config: &Config,
    warehouse: &W,
    dns: &D,
) -> Result<()> {
    let settings = settings_from(config)?;

    output::print_info(&format!("Source cluster:  {}", settings.source_cluster));
    output::print_info(&format!("Clone prefix:    {}", settings.clone_prefix));
    output::print_info(&format!(
        "Resize target:   {} x {}",
        settings.resize_target.number_of_nodes, settings.resize_target.node_type
    ));
    if !flags.skip_dns {
        output::print_info(&format!("Alias record:    {}", settings.record_name));
    }

    if !yes {
        let confirm = Confirm::new()
            .with_prompt("Refresh the clone now? The previous clone will be deleted")
            .interact()?;

        if !confirm {
            output::print_info("Refresh aborted");
            return Ok(());
        }
    }

    let started = Instant::now();
    let refresher = Refresher::new(warehouse, dns, settings, flags);
    let outcome = refresher.run(Utc::now()).await?;

    output::print_success(&format!("Refresh complete: {}", outcome.new_cluster));
    if let Some(snapshot) = &outcome.snapshot {
        output::print_info(&format!("Restored from: {}", snapshot));
    }
    if let Some(endpoint) = &outcome.endpoint {
        output::print_info(&format!("Endpoint: {}", endpoint));
    }
    output::print_info(&format!(
        "Completed in {}",
        output::format_duration(started.elapsed().as_secs())
    ));

    Ok(())
}

fn settings_from(config: &Config) -> Result<RefreshSettings> {
    if config.source_cluster.is_empty() || config.clone_prefix.is_empty() {
        bail!(
            "source_cluster and clone_prefix must be set; run 'phoenix config init' and edit {}",
            Config::config_path()?.display()
        );
    }

    Ok(RefreshSettings {
        source_cluster: config.source_cluster.clone(),
        clone_prefix: config.clone_prefix.clone(),
        resize_target: ResizeTarget {
            node_type: config.node_type.clone(),
            number_of_nodes: config.number_of_nodes,
        },
        hosted_zone_id: config.hosted_zone_id.clone(),
        record_name: config.record_name.clone(),
        record_ttl: config.record_ttl,
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        delete_delay: Duration::from_secs(config.delete_delay_secs),
    })
}
