//! Search Remediator CLI
//!
//! A command-line tool for inspecting cooldowns and clusters, submitting
//! alarms and provisioning clusters through the remediator's admin API.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alarms, alerts, clusters, cooldowns};

/// Search Remediator CLI
#[derive(Parser)]
#[command(name = "srm")]
#[command(author, version, about = "CLI for the Search Remediator", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SRM_API_URL env var)
    #[arg(long, env = "SRM_API_URL")]
    pub api_url: Option<String>,

    /// Output format (defaults to the config file setting, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and clear rule cooldowns
    #[command(subcommand)]
    Cooldowns(CooldownCommands),

    /// Inspect, provision and delete clusters
    #[command(subcommand)]
    Clusters(ClusterCommands),

    /// Submit an alarm event for a cluster
    Alarm {
        /// Cluster name
        cluster: String,

        /// Alarm name (e.g. cpu-high, latency-critical)
        alarm_name: String,

        /// Alarm state (ALARM, OK, INSUFFICIENT_DATA)
        #[arg(long, default_value = "ALARM")]
        state: String,

        /// Observed metric value
        #[arg(long, default_value_t = 0.0)]
        value: f64,

        /// Alarm threshold
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,

        /// Free-form reason
        #[arg(long, default_value = "Submitted via srm")]
        reason: String,

        /// Namespace of the cluster
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Show recently sent alerts
    Alerts,
}

#[derive(Subcommand)]
pub enum CooldownCommands {
    /// List cooldowns and pending deferred actions
    List,

    /// Clear cooldowns of a cluster
    Clear {
        /// Cluster name
        cluster: String,

        /// Clear only this rule
        #[arg(long)]
        rule: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClusterCommands {
    /// List clusters
    List {
        /// Filter by namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Show one cluster
    Get {
        /// Namespace
        namespace: String,
        /// Cluster name
        name: String,
    },

    /// Provision a new cluster
    Create {
        /// Cluster name
        name: String,

        /// Initial node count
        #[arg(long)]
        nodes: u32,

        /// Cluster type (opensearch or elasticsearch)
        #[arg(long = "type", default_value = "opensearch")]
        cluster_type: String,

        /// Engine version (defaults per cluster type)
        #[arg(long)]
        version: Option<String>,

        /// Namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Delete a cluster
    Delete {
        /// Namespace
        namespace: String,
        /// Cluster name
        name: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Config::load()?;
    let format = cli
        .format
        .or_else(|| {
            settings
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::from_config)
        })
        .unwrap_or_default();
    let default_namespace = settings.default_namespace.clone();

    // Initialize client
    let client = client::ApiClient::new(&settings.resolve_api_url(cli.api_url.as_deref()))?;

    // Execute command
    match cli.command {
        Commands::Cooldowns(cmd) => match cmd {
            CooldownCommands::List => cooldowns::list_cooldowns(&client, format).await?,
            CooldownCommands::Clear { cluster, rule } => {
                cooldowns::clear_cooldowns(&client, &cluster, rule, format).await?
            }
        },
        Commands::Clusters(cmd) => match cmd {
            ClusterCommands::List { namespace } => {
                clusters::list_clusters(&client, namespace.or(default_namespace), format).await?
            }
            ClusterCommands::Get { namespace, name } => {
                clusters::get_cluster(&client, &namespace, &name, format).await?
            }
            ClusterCommands::Create {
                name,
                nodes,
                cluster_type,
                version,
                namespace,
            } => {
                let request = client::ClusterRequest {
                    cluster_name: name,
                    cluster_type,
                    node_count: nodes,
                    version,
                    namespace: namespace.or(default_namespace),
                    requested_by: std::env::var("USER").ok(),
                };
                clusters::create_cluster(&client, request, format).await?
            }
            ClusterCommands::Delete { namespace, name } => {
                clusters::delete_cluster(&client, &namespace, &name).await?
            }
        },
        Commands::Alarm {
            cluster,
            alarm_name,
            state,
            value,
            threshold,
            reason,
            namespace,
        } => {
            let request = client::AlarmRequest {
                cluster_name: cluster,
                namespace: namespace.or(default_namespace),
                timestamp: chrono::Utc::now().to_rfc3339(),
                alarm_name,
                state: state.to_uppercase(),
                comparison_operator: "GreaterThanThreshold".to_string(),
                threshold,
                value,
                reason,
            };
            alarms::submit_alarm(&client, request, format).await?
        }
        Commands::Alerts => alerts::show_alerts(&client, format).await?,
    }

    Ok(())
}
