//! Submit an alarm event by hand

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{AlarmRequest, ApiClient, ReconcileReport};
use crate::output::{
    color_severity, color_status, format_remaining, print_json, print_warning, OutputFormat,
};

/// Row for the per-action outcome table
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Gate")]
    gate: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Send an alarm and print the reconciliation report
pub async fn submit_alarm(
    client: &ApiClient,
    request: AlarmRequest,
    format: OutputFormat,
) -> Result<()> {
    let report: ReconcileReport = client.post("api/v1/alarms", &request).await?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    println!("{}", "Reconciliation".bold());
    println!("{}", "=".repeat(60));
    println!("Cluster:   {}/{}", report.namespace, report.cluster.cyan());
    println!("Alarm:     {}", report.alarm_name);
    println!("Severity:  {}", color_severity(&report.severity));
    println!("Strategy:  {}", report.strategy);
    println!("Phase:     {}", color_status(&report.phase));
    println!();

    if report.actions.is_empty() {
        print_warning("No remediation action decided");
        return Ok(());
    }

    let rows: Vec<OutcomeRow> = report
        .actions
        .iter()
        .map(|o| {
            let gate = match (&o.disposition, o.remaining_ms) {
                (Some(d), Some(ms)) => format!("{} ({})", d, format_remaining(ms / 1000)),
                (Some(d), None) => d.clone(),
                (None, _) => "-".to_string(),
            };
            OutcomeRow {
                rule: o.action.rule_name.clone(),
                action: o.action.action_type.clone(),
                priority: o.action.priority.clone(),
                target: o
                    .action
                    .target_nodes
                    .map_or("-".to_string(), |n| n.to_string()),
                gate: color_status(&gate),
                status: color_status(&o.status),
                message: o.message.clone().unwrap_or_default(),
            }
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);

    Ok(())
}
