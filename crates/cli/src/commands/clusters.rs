//! Cluster inspection, provisioning and deletion commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ClusterRecord, ClusterRequest};
use crate::output::{
    color_status, format_timestamp, print_json, print_success, print_warning, OutputFormat,
};

/// Row for clusters table
#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Nodes")]
    nodes: String,
    #[tabled(rename = "Bounds")]
    bounds: String,
    #[tabled(rename = "Last Action")]
    last_action: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn last_action(record: &ClusterRecord) -> String {
    match &record.status.last_action {
        Some(action) if action.success => action.action_type.clone(),
        Some(action) => format!("{} (failed)", action.action_type).red().to_string(),
        None => "-".to_string(),
    }
}

/// List managed clusters
pub async fn list_clusters(
    client: &ApiClient,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let path = match &namespace {
        Some(ns) => format!("api/v1/clusters?namespace={}", ns),
        None => "api/v1/clusters".to_string(),
    };
    let records: Vec<ClusterRecord> = client.get(&path).await?;

    if format == OutputFormat::Json {
        return print_json(&records);
    }
    if records.is_empty() {
        print_warning("No clusters found");
        return Ok(());
    }

    let rows: Vec<ClusterRow> = records
        .iter()
        .map(|r| ClusterRow {
            namespace: r.metadata.namespace.clone(),
            name: r.metadata.name.clone(),
            phase: color_status(&r.status.phase),
            nodes: if r.spec.node_count == r.status.node_count {
                r.spec.node_count.to_string()
            } else {
                format!("{} -> {}", r.status.node_count, r.spec.node_count)
            },
            bounds: format!(
                "{}..{}",
                r.spec.auto_scaling.min_nodes, r.spec.auto_scaling.max_nodes
            ),
            last_action: last_action(r),
            updated: format_timestamp(&r.status.last_updated),
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!("\nTotal: {} clusters", records.len());

    Ok(())
}

/// Show one cluster in detail
pub async fn get_cluster(
    client: &ApiClient,
    namespace: &str,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/clusters/{}/{}", namespace, name);
    let record: ClusterRecord = client.get(&path).await?;

    if format == OutputFormat::Json {
        return print_json(&record);
    }
    print_cluster(&record);
    Ok(())
}

fn print_cluster(record: &ClusterRecord) {
    println!("{}", "Cluster".bold());
    println!("{}", "=".repeat(50));
    println!("Name:          {}", record.metadata.name.cyan());
    println!("Namespace:     {}", record.metadata.namespace.cyan());
    println!("Phase:         {}", color_status(&record.status.phase));
    println!(
        "Nodes:         {} (observed {})",
        record.spec.node_count, record.status.node_count
    );
    println!(
        "Autoscaling:   {} [{}..{}]",
        if record.spec.auto_scaling.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        },
        record.spec.auto_scaling.min_nodes,
        record.spec.auto_scaling.max_nodes
    );
    println!("Version:       {}", record.spec.version);
    println!("Instance:      {}", record.spec.instance_class);

    if let Some(alarm) = &record.status.last_alarm_info {
        println!("Last alarm:    {}", alarm);
    }
    if let Some(action) = &record.status.last_action {
        println!(
            "Last action:   {} via {} at {} ({})",
            action.action_type,
            action.rule_name,
            format_timestamp(&action.timestamp),
            if action.success {
                "succeeded".green()
            } else {
                "failed".red()
            }
        );
    }
    println!(
        "Updated:       {}",
        format_timestamp(&record.status.last_updated).dimmed()
    );
}

/// Provision a new cluster
pub async fn create_cluster(
    client: &ApiClient,
    request: ClusterRequest,
    format: OutputFormat,
) -> Result<()> {
    let record: ClusterRecord = client.post("api/v1/clusters", &request).await?;

    if format == OutputFormat::Json {
        return print_json(&record);
    }
    print_success(&format!(
        "Cluster {}/{} submitted with {} nodes (phase {})",
        record.metadata.namespace,
        record.metadata.name,
        record.spec.node_count,
        color_status(&record.status.phase)
    ));
    Ok(())
}

/// Delete a cluster
pub async fn delete_cluster(client: &ApiClient, namespace: &str, name: &str) -> Result<()> {
    let path = format!("api/v1/clusters/{}/{}", namespace, name);
    client.delete::<serde_json::Value>(&path).await?;
    print_success(&format!("Cluster {}/{} deleted", namespace, name));
    Ok(())
}
