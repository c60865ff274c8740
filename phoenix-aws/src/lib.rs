//! AWS control-plane clients for phoenix
//!
//! Wraps the warehouse (Redshift) and DNS (Route 53) service APIs behind
//! small traits so the refresh workflow can be driven against mocks.

pub mod redshift;
pub mod route53;

pub use redshift::{RedshiftWarehouse, WarehouseApi};
pub use route53::{DnsApi, Route53Dns};

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load shared AWS configuration from the default provider chain, optionally
/// pinning the region
pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}
