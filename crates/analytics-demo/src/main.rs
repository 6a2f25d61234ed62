//! analytics-demo: a thin CLI over the embeddable analytics pipeline, for
//! poking at it from a terminal instead of wiring it into a host app.

use clap::{Parser, Subcommand};
use serde_json::json;

use analytics_config::sink::{FsSinkConfig, SinkConfig};
use analytics_config::{AnalyticsConfigOverrides, ConfigBuilder};
use analytics_pipeline::AnalyticsPipeline;

#[derive(Parser)]
#[command(name = "analytics-demo", about = "Exercise the analytics pipeline from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Root directory for the WAL, DLQ, and filesystem sink output.
    #[arg(long, default_value = "./.analytics", global = true)]
    root: std::path::PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Emit one event of the given type, with an optional JSON ctx blob.
    Emit {
        #[arg(long, default_value = "demo.event")]
        event_type: String,
        #[arg(long)]
        ctx: Option<String>,
    },
    /// Print the current metrics snapshot as JSON.
    Metrics,
    /// List dead-letter entries, optionally filtered by event type.
    Dlq {
        #[arg(long)]
        event_type: Option<String>,
    },
    /// Run every sink's retention sweep once and exit.
    Retention,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = ConfigBuilder::new()
        .apply_env()
        .apply_overrides(AnalyticsConfigOverrides {
            root: Some(cli.root.clone()),
            sinks: Some(vec![SinkConfig::Fs(FsSinkConfig::new(cli.root.join("out")))]),
            ..Default::default()
        })
        .build()
        .expect("valid analytics config");

    let pipeline = AnalyticsPipeline::from_config(config).expect("pipeline wiring");

    match cli.command {
        Command::Emit { event_type, ctx } => {
            let ctx_value: Option<serde_json::Value> =
                ctx.as_deref().map(|raw| serde_json::from_str(raw).expect("--ctx must be valid JSON"));
            let result = pipeline
                .emit(json!({
                    "type": event_type,
                    "ctx": ctx_value,
                }))
                .await;
            println!("{}", serde_json::to_string_pretty(&result).unwrap());
        }
        Command::Metrics => {
            let snapshot = pipeline.metrics_snapshot();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "eventsPerSecond": snapshot.events_per_second,
                    "errorRate": snapshot.error_rate,
                    "queueDepth": snapshot.queue_depth,
                }))
                .unwrap()
            );
        }
        Command::Dlq { event_type } => {
            let filter = analytics_core::DlqFilter { event_type, ..Default::default() };
            for file in pipeline.dlq().list_files().unwrap_or_default() {
                for entry in pipeline.dlq().read_entries(&file, Some(&filter)).unwrap_or_default() {
                    println!("{}", serde_json::to_string(&entry).unwrap());
                }
            }
        }
        Command::Retention => {
            pipeline.run_retention_sweep();
        }
    }

    pipeline.shutdown().await.expect("clean shutdown");
}
