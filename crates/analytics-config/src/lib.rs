pub mod backpressure;
pub mod breaker;
pub mod buffer;
pub mod config;
pub mod middleware;
pub mod pii;
pub mod registry;
pub mod retention;
pub mod retry;
pub mod sink;

pub use backpressure::BackpressureConfig;
pub use buffer::BufferConfig;
pub use config::{AnalyticsConfig, AnalyticsConfigOverrides, ConfigBuilder, ConfigError};
pub use middleware::MiddlewareConfig;
pub use pii::PiiConfig;
pub use registry::build_sink;
pub use retention::RetentionConfig;
pub use sink::SinkConfig;
