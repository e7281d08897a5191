//! Terminal output utilities.
//!
//! Row formatters return strings so they can be tested; printing lives in
//! the parent module.

use crate::models::{CloudSubnet, ProviderType, Subnet};
use crate::sync::RecordFailure;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let quoted = format!("\"{}\"", value.to_string());
    if quoted.len() >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

pub fn provider_header() -> String {
    format!("{},{},{}", format_field("type", 10), format_field("name", 26), format_field("regions", 9))
}

pub fn provider_row(provider_type: &ProviderType, name: &str, region_count: usize) -> String {
    format!(
        "{},{},{}",
        format_field(provider_type, 10),
        format_field(name, 26),
        format_field(region_count, 9)
    )
}

pub fn cloud_subnet_header() -> String {
    format!(
        "{},{},{},{},{},{}",
        format_field("provider", 10),
        format_field("cidr", 20),
        format_field("name", 24),
        format_field("region", 16),
        format_field("accountID", 14),
        format_field("vpcID", 14)
    )
}

pub fn cloud_subnet_row(provider_type: &ProviderType, s: &CloudSubnet) -> String {
    format!(
        "{},{},{},{},{},{}",
        format_field(provider_type, 10),
        format_field(&s.cidr, 20),
        format_field(&s.name, 24),
        format_field(&s.region, 16),
        format_field(&s.account_id, 14),
        format_field(&s.vpc_id, 14)
    )
}

pub fn inventory_header() -> String {
    format!(
        "{},{},{},{},{},{},{}",
        format_field("cidr", 20),
        format_field("hosts", 10),
        format_field("broadcast", 17),
        format_field("name", 24),
        format_field("provider", 10),
        format_field("kind", 8),
        format_field("used%", 8)
    )
}

/// One inventory record. Unparsable CIDRs show `?` for the derived columns.
pub fn inventory_row(s: &Subnet) -> String {
    let (hosts, broadcast) = match s.details() {
        Ok(d) => (d.host_count.to_string(), d.broadcast.to_string()),
        Err(_) => ("?".to_string(), "?".to_string()),
    };
    let (provider, kind) = match &s.cloud_info {
        Some(ci) => (
            ci.provider.to_string(),
            format!("{:?}", ci.resource_type).to_lowercase(),
        ),
        None => (String::new(), format!("{:?}", s.location_type).to_lowercase()),
    };
    let used = s
        .utilization
        .as_ref()
        .map(|u| format!("{:.1}", u.utilization_percent))
        .unwrap_or_default();

    format!(
        "{},{},{},{},{},{},{}",
        format_field(&s.cidr, 20),
        format_field(hosts, 10),
        format_field(broadcast, 17),
        format_field(&s.name, 24),
        format_field(provider, 10),
        format_field(kind, 8),
        format_field(used, 8)
    )
}

pub fn failure_row(f: &RecordFailure) -> String {
    format!(
        "{},{},{}",
        format_field(&f.cidr, 20),
        format_field(format!("{:?}", f.resource_type).to_lowercase(), 8),
        format_field(&f.error, 0)
    )
}
