//! Concrete sink adapters (filesystem, HTTP, object storage) plus the
//! router, retry policy, and circuit breaker they share.

pub mod breaker;
pub mod fs_sink;
pub mod http_sink;
pub mod object_store_sink;
pub mod retry;
pub mod router;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use fs_sink::{FsSink, FsSinkConfig};
pub use http_sink::{HttpAuth, HttpMethod, HttpSink, HttpSinkConfig};
pub use object_store_sink::{ObjectKeyStrategy, ObjectStoreSink, ObjectStoreSinkConfig};
pub use retry::{with_retry, RetryConfig};
pub use router::Router;
