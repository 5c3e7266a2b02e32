use std::io::BufRead;

use crate::engine::{RoundTripEngine, SummaryTotals};
use crate::error::{IngestError, PnlError};
use crate::ingest::FillReader;
use crate::report::Reporter;

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub totals: SummaryTotals,
    pub fills: u64,
    pub skipped_lines: u64,
    /// An opening fill was still waiting for its close when input ended.
    pub discarded_open: bool,
}

/// Runs one fill log through `engine`, streaming round trips to `reporter`.
///
/// Lines that fail to decode are logged and skipped. Read and write failures
/// abort the run.
pub fn summarise<R, P>(
    reader: R,
    mut engine: RoundTripEngine,
    reporter: &mut P,
) -> Result<RunOutcome, PnlError>
where
    R: BufRead,
    P: Reporter + ?Sized,
{
    let mut fills = 0u64;
    let mut skipped_lines = 0u64;

    for item in FillReader::new(reader) {
        match item {
            Ok(fill) => {
                fills += 1;
                if let Some(result) = engine.process(&fill) {
                    reporter.round_trip(&result)?;
                }
            }
            Err(IngestError::Decode { line, source }) => {
                skipped_lines += 1;
                tracing::warn!(line, error = %source, "skipping undecodable fill line");
            }
            Err(IngestError::Io(err)) => return Err(PnlError::Io(err)),
        }
    }

    let discarded_open = engine.position().is_open();
    let totals = engine.finalize();
    reporter.summary(&totals)?;

    tracing::info!(
        fills,
        round_trips = totals.round_trip_count,
        skipped_lines,
        discarded_open,
        "fill log processed"
    );

    Ok(RunOutcome {
        totals,
        fills,
        skipped_lines,
        discarded_open,
    })
}
