//! Round-trip pairing and PnL accumulation.
//!
//! Fills alternate between opening and closing a single position: the first
//! fill while flat opens it, the next fill closes it regardless of side. Each
//! close yields a [`RoundTripResult`] and is folded into [`SummaryTotals`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fill::{Fill, Side};

/// Which fill costs are charged against a closed round trip.
///
/// `total_cost` accumulates exactly the attributed amount at each close, so
/// fees are never counted twice and an unmatched open contributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostAttribution {
    /// Only the opening fill's cost.
    OpeningOnly,
    /// Opening and closing fill costs.
    #[default]
    RoundTrip,
}

impl CostAttribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostAttribution::OpeningOnly => "opening_only",
            CostAttribution::RoundTrip => "round_trip",
        }
    }
}

impl FromStr for CostAttribution {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "opening_only" => Ok(CostAttribution::OpeningOnly),
            "round_trip" => Ok(CostAttribution::RoundTrip),
            other => Err(format!(
                "unsupported cost attribution: {other} (expected round_trip or opening_only)"
            )),
        }
    }
}

impl fmt::Display for CostAttribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Flat,
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Flat => "flat",
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    fn opened_by(side: Side) -> Self {
        match side {
            Side::Buy => Direction::Long,
            Side::Sell => Direction::Short,
        }
    }

    /// Per-unit price move in the position's favour.
    fn favourable_move(self, entry: Decimal, exit: Decimal, sat: &mut Saturating) -> Decimal {
        match self {
            Direction::Long => sat.sub(exit, entry),
            Direction::Short => sat.sub(entry, exit),
            Direction::Flat => Decimal::ZERO,
        }
    }
}

/// Decimal arithmetic that clamps to `Decimal::MIN`/`Decimal::MAX` instead of
/// panicking, remembering whether any step had to clamp.
#[derive(Debug, Default)]
struct Saturating {
    hit: bool,
}

impl Saturating {
    fn bound(&mut self, negative: bool) -> Decimal {
        self.hit = true;
        if negative {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    }

    fn add(&mut self, a: Decimal, b: Decimal) -> Decimal {
        match a.checked_add(b) {
            Some(sum) => sum,
            None => self.bound(a.is_sign_negative()),
        }
    }

    fn sub(&mut self, a: Decimal, b: Decimal) -> Decimal {
        match a.checked_sub(b) {
            Some(diff) => diff,
            None => self.bound(a.is_sign_negative()),
        }
    }

    fn mul(&mut self, a: Decimal, b: Decimal) -> Decimal {
        match a.checked_mul(b) {
            Some(product) => product,
            None => self.bound(a.is_sign_negative() != b.is_sign_negative()),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The engine's view of the single position. `entry_price`, `open_cost` and
/// `opened_at` only carry meaning while `direction` is not `Flat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionState {
    pub direction: Direction,
    pub entry_price: Decimal,
    pub open_cost: Decimal,
    pub opened_at: Option<DateTime<Utc>>,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        self.direction == Direction::Flat
    }

    pub fn is_open(&self) -> bool {
        !self.is_flat()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTripResult {
    pub direction: Direction,
    pub pnl: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub cost_attributed: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Some figure exceeded the `Decimal` range and was clamped to its bound.
    #[serde(skip_serializing_if = "is_false")]
    pub saturated: bool,
}

impl RoundTripResult {
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub total_pnl: Decimal,
    pub total_cost: Decimal,
    pub total_volume: Decimal,
    pub win_count: u64,
    pub round_trip_count: u64,
}

impl SummaryTotals {
    /// Fraction of round trips with strictly positive PnL, `None` before the
    /// first round trip completes.
    pub fn win_rate(&self) -> Option<Decimal> {
        if self.round_trip_count == 0 {
            return None;
        }
        Some(Decimal::from(self.win_count) / Decimal::from(self.round_trip_count))
    }

    pub fn win_rate_pct(&self) -> Option<Decimal> {
        self.win_rate().map(|rate| rate * Decimal::ONE_HUNDRED)
    }

    /// Folds one round trip in. Returns true when a running total clamped.
    fn record(&mut self, result: &RoundTripResult) -> bool {
        let mut sat = Saturating::default();
        self.total_pnl = sat.add(self.total_pnl, result.pnl);
        self.total_cost = sat.add(self.total_cost, result.cost_attributed);
        // Volume is valued at the entry price, sized by the closing fill.
        let volume = sat.mul(result.entry_price, result.quantity);
        self.total_volume = sat.add(self.total_volume, volume);
        self.round_trip_count += 1;
        if result.is_win() {
            self.win_count += 1;
        }
        sat.hit
    }
}

#[derive(Debug, Default)]
pub struct RoundTripEngine {
    attribution: CostAttribution,
    position: PositionState,
    totals: SummaryTotals,
}

impl RoundTripEngine {
    pub fn new(attribution: CostAttribution) -> Self {
        Self {
            attribution,
            position: PositionState::default(),
            totals: SummaryTotals::default(),
        }
    }

    pub fn attribution(&self) -> CostAttribution {
        self.attribution
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    /// Running totals over the round trips closed so far.
    pub fn totals(&self) -> &SummaryTotals {
        &self.totals
    }

    pub fn process(&mut self, fill: &Fill) -> Option<RoundTripResult> {
        if self.position.is_flat() {
            self.open(fill);
            return None;
        }
        Some(self.close(fill))
    }

    /// Ends the run. An open position left without its closing fill is dropped
    /// and never reaches the totals.
    pub fn finalize(self) -> SummaryTotals {
        if self.position.is_open() {
            tracing::debug!(
                direction = ?self.position.direction,
                entry_price = %self.position.entry_price,
                "discarding unmatched open position"
            );
        }
        self.totals
    }

    /// Feeds a whole sequence through a fresh pass and collects every result.
    pub fn replay<I>(mut self, fills: I) -> (Vec<RoundTripResult>, SummaryTotals)
    where
        I: IntoIterator<Item = Fill>,
    {
        let results = fills
            .into_iter()
            .filter_map(|fill| self.process(&fill))
            .collect();
        (results, self.finalize())
    }

    fn open(&mut self, fill: &Fill) {
        self.position = PositionState {
            direction: Direction::opened_by(fill.side),
            entry_price: fill.price,
            open_cost: fill.cost,
            opened_at: fill.timestamp,
        };
    }

    fn close(&mut self, fill: &Fill) -> RoundTripResult {
        let position = std::mem::take(&mut self.position);
        let mut sat = Saturating::default();

        let cost_attributed = match self.attribution {
            CostAttribution::OpeningOnly => position.open_cost,
            CostAttribution::RoundTrip => sat.add(position.open_cost, fill.cost),
        };
        let per_unit = position
            .direction
            .favourable_move(position.entry_price, fill.price, &mut sat);
        let gross = sat.mul(per_unit, fill.quantity);
        let pnl = sat.sub(gross, cost_attributed);

        let result = RoundTripResult {
            direction: position.direction,
            pnl,
            entry_price: position.entry_price,
            exit_price: fill.price,
            quantity: fill.quantity,
            cost_attributed,
            opened_at: position.opened_at,
            closed_at: fill.timestamp,
            saturated: sat.hit,
        };
        let totals_saturated = self.totals.record(&result);

        if result.saturated || totals_saturated {
            tracing::warn!(
                direction = ?result.direction,
                entry_price = %result.entry_price,
                exit_price = %result.exit_price,
                quantity = %result.quantity,
                "round trip exceeds decimal range, clamped to bounds"
            );
        }

        tracing::debug!(
            direction = ?result.direction,
            pnl = %result.pnl,
            cost = %result.cost_attributed,
            "round trip closed"
        );
        result
    }
}
