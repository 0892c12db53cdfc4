//! devreport - activity aggregation from task tracking services.
//!
//! This library fetches task records from remote trackers through a shared,
//! rate-limited and retrying transport, fans out over many lists with a
//! bounded worker pool, and merges everything into one normalized stream of
//! [`Task`]s with summary [`Statistics`].
//!
//! # Features
//!
//! - `clickup` (default) - The ClickUp source and the reqwest-backed
//!   [`ReqwestTransport`](http::reqwest_transport::ReqwestTransport).
//!
//! # Example
//!
//! ```ignore
//! use devreport::clickup::{ClickUpClient, ClickUpSource, FetchOptions, ListRef};
//! use devreport::{Generator, Period};
//!
//! let client = ClickUpClient::new(&token, Vec::new(), &FetchOptions::default())?
//!     .with_cancellation(cancel.clone());
//! let source = ClickUpSource::new(client, vec![ListRef::new("901")]);
//!
//! let outcome = Generator::new(vec![Arc::new(source)])
//!     .generate("alice", Period::ThisWeek.resolve(Utc::now()), &cancel)
//!     .await?;
//! let stats = Generator::statistics(&outcome.tasks);
//! ```

pub mod http;
pub mod progress;
pub mod rate_limit;
pub mod report;
pub mod retry;
pub mod rewrite;
pub mod transport;

#[cfg(feature = "clickup")]
pub mod clickup;

pub use progress::{FetchProgress, ProgressCallback};
pub use rate_limit::{ApiRateLimiter, rate_limits};
pub use report::{
    ActivitySource, AggregateError, Annotations, GenerateError, GenerateOutcome, Generator,
    Period, SourceError, Statistics, Task, TaskKind, TimeWindow, UnknownPeriod, annotate,
    statistics,
};
pub use retry::RetryConfig;
pub use rewrite::{OllamaRewriter, PassThrough, RewriteOptions, TextRewriter};
pub use transport::{RateLimitedTransport, TransportError};
