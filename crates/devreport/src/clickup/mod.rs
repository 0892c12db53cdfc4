//! ClickUp integration.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for ClickUp API operations
//! - [`types`] - API response shapes and list references
//! - [`client`] - Authenticated, rate-limited API client with pagination
//! - [`fan_out`] - Bounded worker pool fetching many lists at once
//! - [`convert`] - Record to [`Task`](crate::report::Task) conversion and roll-ups
//! - [`source`] - [`ActivitySource`](crate::report::ActivitySource) implementation
//!
//! ```ignore
//! use devreport::clickup::{ClickUpClient, ClickUpSource, FetchOptions};
//! use devreport::report::{Generator, Period};
//!
//! let client = ClickUpClient::new(&token, Vec::new(), &FetchOptions::default())?;
//! let source = ClickUpSource::from_folder(client, "90120").await?;
//! let outcome = Generator::new(vec![Arc::new(source)])
//!     .generate("alice", Period::LastWeek.resolve(Utc::now()), &cancel)
//!     .await?;
//! ```

mod client;
mod convert;
mod error;
mod fan_out;
mod source;
mod types;

pub use client::{ClickUpClient, DEFAULT_BASE_URL, DEFAULT_MAX_WORKERS, FetchOptions};
pub use convert::{OpenRollUpCompletion, SOURCE_NAME, parse_millis, roll_up, to_task};
pub use error::{ClickUpError, short_error_message};
pub use fan_out::{FanOutResult, fetch_many};
pub use source::{ClickUpSource, DEFAULT_CATEGORY, RollUpOptions, SourceMode};
pub use types::{Assignee, ClickUpStatus, ClickUpTask, ListDetails, ListInfo, ListRef};
