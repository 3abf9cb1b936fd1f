//! Recent alerts

use anyhow::Result;
use tabled::Tabled;

use crate::client::{AlertList, ApiClient};
use crate::output::{color_severity, format_timestamp, print_info, print_json, OutputFormat};

/// Row for alerts table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

/// Show alerts recently sent by the remediator
pub async fn show_alerts(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: AlertList = client.get("api/v1/alerts").await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }
    if result.alerts.is_empty() {
        print_info("No alerts sent");
        return Ok(());
    }

    let label = |alert: &crate::client::Alert, key: &str| {
        alert.labels.get(key).cloned().unwrap_or_default()
    };
    let rows: Vec<AlertRow> = result
        .alerts
        .iter()
        .rev()
        .map(|a| AlertRow {
            time: format_timestamp(&a.starts_at),
            severity: color_severity(&label(a, "severity")),
            cluster: label(a, "cluster"),
            summary: a.annotations.get("summary").cloned().unwrap_or_default(),
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);

    Ok(())
}
