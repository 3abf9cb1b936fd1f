//! Cooldown inspection and override commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ClearedResponse, CooldownList};
use crate::output::{
    color_severity, format_remaining, format_timestamp, print_info, print_json, print_success,
    print_warning, OutputFormat,
};

/// Row for cooldowns table
#[derive(Tabled)]
struct CooldownRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Bucket")]
    bucket: String,
    #[tabled(rename = "Last Executed")]
    last_executed: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
}

/// Row for deferred actions table
#[derive(Tabled)]
struct DeferredRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Due")]
    due_at: String,
}

/// List recorded cooldowns and pending deferred actions
pub async fn list_cooldowns(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: CooldownList = client.get("api/v1/cooldowns").await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    println!("{}", "Cooldowns".bold());
    println!("{}", "=".repeat(60));
    if result.cooldowns.is_empty() {
        print_info("No cooldowns recorded");
    } else {
        let rows: Vec<CooldownRow> = result
            .cooldowns
            .iter()
            .map(|c| CooldownRow {
                cluster: c.cluster.clone(),
                rule: c.rule.clone(),
                bucket: c.bucket.clone(),
                last_executed: format_timestamp(&c.last_executed),
                remaining: if c.active {
                    format_remaining(c.remaining_secs).yellow().to_string()
                } else {
                    "expired".green().to_string()
                },
            })
            .collect();

        let table = tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
    }

    if !result.pending.is_empty() {
        println!();
        println!("{}", "Deferred Actions".bold());
        println!("{}", "-".repeat(60));
        let rows: Vec<DeferredRow> = result
            .pending
            .iter()
            .map(|d| DeferredRow {
                cluster: format!("{}/{}", d.namespace, d.cluster),
                rule: d.action.rule_name.clone(),
                action: d.action.action_type.clone(),
                severity: color_severity(&d.severity),
                due_at: format_timestamp(&d.due_at),
            })
            .collect();

        let table = tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
    }

    Ok(())
}

/// Clear one rule's cooldown, or every cooldown of a cluster
pub async fn clear_cooldowns(
    client: &ApiClient,
    cluster: &str,
    rule: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let path = match &rule {
        Some(rule) => format!("api/v1/cooldowns/{}/{}", cluster, rule),
        None => format!("api/v1/cooldowns/{}", cluster),
    };
    let cleared = client
        .delete::<ClearedResponse>(&path)
        .await?
        .map_or(0, |r| r.cleared);

    if format == OutputFormat::Json {
        return print_json(&ClearedResponse { cleared });
    }

    match (cleared, rule) {
        (0, Some(rule)) => print_warning(&format!("No cooldown recorded for {} on {}", rule, cluster)),
        (0, None) => print_warning(&format!("No cooldowns recorded for {}", cluster)),
        (_, Some(rule)) => print_success(&format!("Cleared cooldown for {} on {}", rule, cluster)),
        (n, None) => print_success(&format!("Cleared {} cooldown(s) for {}", n, cluster)),
    }

    Ok(())
}
