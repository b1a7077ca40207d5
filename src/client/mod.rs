//! Client Module
//!
//! Fetching evaluation records and catalogs from the evaluation API.

mod http;
mod retry;
mod source;

pub use http::HttpEvaluationSource;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use source::{EvaluationSource, RawEvaluation, StaticEvaluationSource};
