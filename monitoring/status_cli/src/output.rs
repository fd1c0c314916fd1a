//! Output formatting utilities.

use colored::Colorize;
use monitoring_shared_types::{
    CollectionState, DetectedProduct, InstanceStatus, Product, ProductStatus, ReportMeta,
    StatusReport,
};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::Result;
use crate::OutputFormat;

#[derive(Debug, Serialize, Tabled)]
struct ProductRow {
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Instances")]
    instances: usize,
    #[tabled(rename = "Internal")]
    internal: usize,
    #[tabled(rename = "Partial")]
    partial: usize,
    #[tabled(rename = "Migrated")]
    migrated: usize,
    #[tabled(rename = "Detected")]
    detected: String,
}

impl ProductRow {
    fn new(product: Product, status: &ProductStatus) -> Self {
        Self {
            product: product.to_string(),
            instances: status.total_unique_instance_count,
            internal: status.total_unique_internally_collected_count,
            partial: status.total_unique_partially_migrated_count,
            migrated: status.total_unique_fully_migrated_count,
            detected: status.detected.map(describe_detection).unwrap_or_else(|| "-".into()),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct InstanceRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

impl InstanceRow {
    fn new(instance_id: &str, status: &InstanceStatus) -> Self {
        let mut notes = Vec::new();
        if status.is_primary {
            notes.push("primary".to_string());
        }
        if let Some(beat_type) = &status.beat_type {
            notes.push(beat_type.clone());
        }
        if let Some(internal) = status.last_internally_collected_timestamp {
            notes.push(format!("internal until {}", internal));
        }

        Self {
            instance: instance_id.to_string(),
            state: describe_state(status).to_string(),
            last_seen: status
                .last_timestamp
                .map(|ts| ts.to_string())
                .unwrap_or_else(|| "-".into()),
            cluster: status.cluster_uuid.clone().unwrap_or_else(|| "-".into()),
            notes: notes.join(", "),
        }
    }
}

fn describe_state(status: &InstanceStatus) -> &'static str {
    match status.collection_state() {
        Some(CollectionState::InternalOnly) => "internal",
        Some(CollectionState::PartiallyMigrated) => "partially migrated",
        Some(CollectionState::FullyMigrated) => "migrated",
        None if status.is_net_new_user => "no data yet",
        None => "unknown",
    }
}

fn describe_detection(detected: DetectedProduct) -> String {
    match (detected.does_exist, detected.might_exist) {
        (Some(true), _) => "exists".into(),
        (_, Some(true)) => "might exist".into(),
        _ => "not found".into(),
    }
}

pub fn print_report(report: &StatusReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Table => print_tables(report),
    }
    Ok(())
}

fn print_tables(report: &StatusReport) {
    let ReportMeta::Run(meta) = &report.meta else {
        warn("The caller lacks the monitor privilege; no status available.");
        return;
    };

    section("Products");
    let rows: Vec<ProductRow> = report
        .products
        .iter()
        .map(|(product, status)| ProductRow::new(*product, status))
        .collect();
    println!("{}", Table::new(rows));

    for (product, status) in &report.products {
        if status.by_instance_id.is_empty() {
            continue;
        }
        section(&product.to_string());
        let rows: Vec<InstanceRow> = status
            .by_instance_id
            .iter()
            .map(|(id, instance)| InstanceRow::new(id, instance))
            .collect();
        println!("{}", Table::new(rows));
    }

    println!();
    println!(
        "{} last {}s, live cluster {}",
        "Window:".dimmed(),
        meta.seconds_ago,
        meta.live_cluster_uuid.as_deref().unwrap_or("unknown")
    );
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn warn(msg: &str) {
    println!("{} {}", "!".yellow().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitoring_shared_types::LiveNode;

    #[test]
    fn test_instance_rows() {
        let partial = InstanceStatus {
            last_timestamp: Some(9_000),
            is_primary: true,
            cluster_uuid: Some("c1".into()),
            is_partially_migrated: true,
            last_internally_collected_timestamp: Some(1_000),
            ..Default::default()
        };
        let row = InstanceRow::new("k1", &partial);
        assert_eq!(row.state, "partially migrated");
        assert_eq!(row.last_seen, "9000");
        assert_eq!(row.notes, "primary, internal until 1000");

        let net_new = InstanceRow::new("n1", &InstanceStatus::net_new_node(LiveNode::new("n1")));
        assert_eq!(net_new.state, "no data yet");
        assert_eq!(net_new.cluster, "-");
    }

    #[test]
    fn test_product_row_detection() {
        let mut status = ProductStatus::default();
        status.detected = Some(DetectedProduct::might_exist(true));
        assert_eq!(ProductRow::new(Product::Apm, &status).detected, "might exist");

        status.detected = Some(DetectedProduct::exists());
        assert_eq!(ProductRow::new(Product::Kibana, &status).detected, "exists");

        status.detected = None;
        assert_eq!(ProductRow::new(Product::Beats, &status).detected, "-");
    }
}
