//! Realized PnL statistics from a sequential fill log.
//!
//! Fills are paired into round trips (open, then close) by [`RoundTripEngine`];
//! [`pipeline::summarise`] drives a newline-delimited JSON log through the
//! engine and streams results to a [`Reporter`].

pub mod config;
pub mod engine;
pub mod error;
pub mod fill;
pub mod ingest;
pub mod obs;
pub mod pipeline;
pub mod report;

#[cfg(feature = "python")]
mod python;

pub use engine::{
    CostAttribution, Direction, PositionState, RoundTripEngine, RoundTripResult, SummaryTotals,
};
pub use error::{DecodeError, IngestError, PnlError};
pub use fill::{decode_line, Fill, Side};
pub use ingest::FillReader;
pub use pipeline::{summarise, RunOutcome};
pub use report::{ConsoleReporter, JsonReporter, MemoryReporter, OutputFormat, Reporter};
