use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use analytics_config::{AnalyticsConfigOverrides, ConfigBuilder};
use analytics_config::sink::{FsSinkConfig, SinkConfig};
use analytics_pipeline::{run_age_flush_loop, run_retention_sweep_loop, AnalyticsPipeline};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = ConfigBuilder::new()
        .apply_env()
        .apply_overrides(AnalyticsConfigOverrides {
            sinks: Some(vec![SinkConfig::Fs(FsSinkConfig::new("./.analytics/out"))]),
            ..Default::default()
        })
        .build()
        .expect("valid analytics config");

    let pipeline = Arc::new(AnalyticsPipeline::from_config(config).expect("pipeline wiring"));

    let flusher = tokio::spawn(run_age_flush_loop(pipeline.clone(), Duration::from_secs(1)));
    let retention = tokio::spawn(run_retention_sweep_loop(pipeline.clone(), Duration::from_secs(3600)));

    let result = pipeline
        .emit(json!({
            "type": "demo.started",
            "ctx": { "example": true },
        }))
        .await;
    log::info!("emit result: {}", serde_json::to_string(&result).unwrap());

    pipeline.shutdown().await.expect("clean shutdown");
    flusher.abort();
    retention.abort();
}
