//! analytics-types: the canonical event shape and its strict validator.
//!
//! This crate knows nothing about buffering, sinks, or delivery — it only
//! defines `AnalyticsEventV1` (the `kb.v1` wire shape) and the validation
//! rules every event must pass before it is allowed into the pipeline.

pub mod error;
pub mod event;
pub mod hashing;
pub mod validator;

pub use error::{ValidationCode, ValidationViolation};
pub use event::{Actor, ActorType, AnalyticsEventV1, CtxValue, HashMeta, Source};
pub use validator::validate;
