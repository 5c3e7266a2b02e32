use std::io::{self, Write};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::{RoundTripResult, SummaryTotals};

/// Receives round trips as they close and the totals once the run ends.
pub trait Reporter {
    fn round_trip(&mut self, result: &RoundTripResult) -> io::Result<()>;
    fn summary(&mut self, totals: &SummaryTotals) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unsupported output format: {other} (expected text or json)")),
        }
    }
}

fn display_pct(totals: &SummaryTotals) -> Option<Decimal> {
    totals.win_rate_pct().map(|pct| pct.round_dp(2).normalize())
}

/// Plain-text report, one `PnL($)` line per round trip followed by a summary
/// block.
pub struct ConsoleReporter<W> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn round_trip(&mut self, result: &RoundTripResult) -> io::Result<()> {
        writeln!(self.out, "PnL($): {}", result.pnl)
    }

    fn summary(&mut self, totals: &SummaryTotals) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Total PnL($): {}", totals.total_pnl)?;
        writeln!(self.out, "Total Cost($): {}", totals.total_cost)?;
        match display_pct(totals) {
            Some(pct) => writeln!(
                self.out,
                "Won {} out of {} trades. win rate(%): {}%",
                totals.win_count, totals.round_trip_count, pct
            )?,
            None => writeln!(
                self.out,
                "Won {} out of {} trades. win rate(%): n/a (no trades)",
                totals.win_count, totals.round_trip_count
            )?,
        }
        writeln!(self.out, "Volume($): {}", totals.total_volume)?;
        self.out.flush()
    }
}

/// Keeps everything in memory; used by the Python binding and tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    pub results: Vec<RoundTripResult>,
    pub summary: Option<SummaryTotals>,
}

impl Reporter for MemoryReporter {
    fn round_trip(&mut self, result: &RoundTripResult) -> io::Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn summary(&mut self, totals: &SummaryTotals) -> io::Result<()> {
        self.summary = Some(totals.clone());
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    RoundTrip(&'a RoundTripResult),
    Summary(SummaryRecord<'a>),
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    #[serde(flatten)]
    totals: &'a SummaryTotals,
    win_rate_pct: Option<Decimal>,
}

/// JSON-lines report: a `round_trip` object per close, then one `summary`.
pub struct JsonReporter<W> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_record(&mut self, record: &Record<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn round_trip(&mut self, result: &RoundTripResult) -> io::Result<()> {
        self.write_record(&Record::RoundTrip(result))
    }

    fn summary(&mut self, totals: &SummaryTotals) -> io::Result<()> {
        self.write_record(&Record::Summary(SummaryRecord {
            totals,
            win_rate_pct: display_pct(totals),
        }))?;
        self.out.flush()
    }
}
