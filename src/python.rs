use std::io::Cursor;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::engine::{CostAttribution, RoundTripEngine};
use crate::pipeline::summarise;
use crate::report::MemoryReporter;

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[pyfunction]
#[pyo3(signature = (lines, cost_attribution = "round_trip"))]
fn summarise_fills(py: Python<'_>, lines: Vec<String>, cost_attribution: &str) -> PyResult<PyObject> {
    let attribution = CostAttribution::from_str(cost_attribution).map_err(PyValueError::new_err)?;

    let mut reporter = MemoryReporter::default();
    let outcome = summarise(
        Cursor::new(lines.join("\n")),
        RoundTripEngine::new(attribution),
        &mut reporter,
    )?;

    let round_trips = PyList::empty_bound(py);
    for trip in &reporter.results {
        let dict = PyDict::new_bound(py);
        dict.set_item("direction", trip.direction.as_str())?;
        dict.set_item("pnl", trip.pnl.to_string())?;
        dict.set_item("entry_price", trip.entry_price.to_string())?;
        dict.set_item("exit_price", trip.exit_price.to_string())?;
        dict.set_item("quantity", trip.quantity.to_string())?;
        dict.set_item("cost_attributed", trip.cost_attributed.to_string())?;
        dict.set_item("opened_at", trip.opened_at.map(format_datetime))?;
        dict.set_item("closed_at", trip.closed_at.map(format_datetime))?;
        dict.set_item("saturated", trip.saturated)?;
        round_trips.append(dict)?;
    }

    let totals = &outcome.totals;
    let result = PyDict::new_bound(py);
    result.set_item("round_trips", round_trips)?;
    result.set_item("total_pnl", totals.total_pnl.to_string())?;
    result.set_item("total_cost", totals.total_cost.to_string())?;
    result.set_item("total_volume", totals.total_volume.to_string())?;
    result.set_item("win_count", totals.win_count)?;
    result.set_item("round_trip_count", totals.round_trip_count)?;
    result.set_item("win_rate", totals.win_rate().map(|rate| rate.to_string()))?;
    result.set_item("skipped_lines", outcome.skipped_lines)?;
    result.set_item("discarded_open", outcome.discarded_open)?;
    result.set_item("cost_attribution", attribution.as_str())?;

    Ok(result.into_any().unbind())
}

#[pymodule]
fn fill_pnl(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(summarise_fills, m)?)?;
    m.add("__doc__", "Round-trip PnL statistics from fill logs")?;
    Ok(())
}
