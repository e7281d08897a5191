//! Output of registry, reconciliation and inventory data.
//!
//! - [`terminal`] - quoted, aligned CSV-ish rows

mod terminal;

pub use terminal::format_field;

use crate::models::Subnet;
use crate::registry::{FetchErrors, FetchResults, ProviderRegistry};
use crate::sync::{SyncReport, UtilizationReport};
use colored::Colorize;
use itertools::Itertools;

/// Registered providers, ordered by type.
pub fn print_providers(registry: &ProviderRegistry) {
    println!("{}", terminal::provider_header());
    for provider_type in registry.list_providers().into_iter().sorted() {
        // listed a moment ago; a concurrent unregister just drops the row
        if let Ok(p) = registry.get_provider(&provider_type) {
            println!("{}", terminal::provider_row(&provider_type, p.name(), p.regions().len()));
        }
    }
}

/// Fan-out results: every subnet, then one line per failed provider.
pub fn print_fetch(results: &FetchResults, errors: &FetchErrors) {
    println!("{}", terminal::cloud_subnet_header());
    for (provider_type, subnets) in results.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        for s in subnets.iter().sorted_by(|a, b| a.cidr.cmp(&b.cidr)) {
            println!("{}", terminal::cloud_subnet_row(provider_type, s));
        }
    }
    for (provider_type, err) in errors.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        println!("#{}# {provider_type}: {err}", "FAILED".on_red());
    }
}

pub fn print_sync_report(report: &SyncReport) {
    println!(
        "#{}# {provider}: vpcs created={vc} skipped={vs}, subnets created={sc} updated={su}, failures={f}",
        if report.is_clean() { "OK".on_green() } else { "PARTIAL".on_yellow() },
        provider = report.provider,
        vc = report.vpcs_created,
        vs = report.vpcs_skipped,
        sc = report.subnets_created,
        su = report.subnets_updated,
        f = report.failures.len(),
    );
    for f in &report.failures {
        println!("{}", terminal::failure_row(f));
    }
}

pub fn print_utilization_report(report: &UtilizationReport) {
    println!(
        "#{}# utilization refreshed={} skipped={} failures={}",
        "DONE".on_green(),
        report.refreshed,
        report.skipped,
        report.failures.len()
    );
    for f in &report.failures {
        println!("{}", terminal::failure_row(f));
    }
}

/// Inventory ordered by address; unparsable CIDRs go last.
pub fn print_inventory(subnets: &[Subnet]) {
    println!("{}", terminal::inventory_header());
    for s in subnets.iter().sorted_by_key(|s| (s.ipv4().ok().is_none(), s.ipv4().ok(), s.cidr.clone())) {
        println!("{}", terminal::inventory_row(s));
    }
    println!("# {} records", subnets.len());
}
