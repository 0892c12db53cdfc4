//! Source-agnostic report model and cross-source aggregation.

mod annotate;
mod errors;
mod generator;
mod period;
mod types;

pub use annotate::{Annotations, annotate, parse_comma_list};
pub use errors::{AggregateError, GenerateError, SourceError};
pub use generator::{GenerateOutcome, Generator, statistics};
pub use period::{Period, UnknownPeriod};
pub use types::{ActivitySource, Statistics, Task, TaskKind, TimeWindow};
