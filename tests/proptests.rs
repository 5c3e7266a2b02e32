use std::io::Cursor;

use fill_pnl::{summarise, CostAttribution, Fill, MemoryReporter, RoundTripEngine, Side};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn decimal() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..5).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn fill() -> impl Strategy<Value = Fill> {
    (side(), decimal(), decimal(), decimal())
        .prop_map(|(side, qty, price, cost)| Fill::new(side, qty, price, cost))
}

fn attribution() -> impl Strategy<Value = CostAttribution> {
    prop_oneof![
        Just(CostAttribution::RoundTrip),
        Just(CostAttribution::OpeningOnly)
    ]
}

fn to_line(fill: &Fill) -> String {
    format!(
        "{{\"side\":\"{}\",\"qty\":\"{}\",\"price\":\"{}\",\"cost\":\"{}\"}}",
        fill.side, fill.quantity, fill.price, fill.cost
    )
}

fn malformed_line() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "{",
        "not json at all",
        "null",
        "[\"Buy\", 1, 100, 0]",
        "{\"side\":\"Buy\"}",
        "{\"side\":\"0\",\"qty\":\"1\",\"price\":\"1\",\"cost\":\"0\"}",
        "{\"side\":\"Sell\",\"qty\":\"one\",\"price\":\"1\",\"cost\":\"0\"}",
    ])
}

fn run_text(text: String, attribution: CostAttribution) -> MemoryReporter {
    let mut reporter = MemoryReporter::default();
    summarise(Cursor::new(text), RoundTripEngine::new(attribution), &mut reporter)
        .expect("in-memory run should not fail");
    reporter
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn even_sequences_close_every_pair(fills in prop::collection::vec(fill(), 0..60)) {
        let even = fills.len() - fills.len() % 2;
        let (results, totals) = RoundTripEngine::default().replay(fills[..even].to_vec());
        prop_assert_eq!(results.len(), even / 2);
        prop_assert_eq!(totals.round_trip_count as usize, even / 2);
    }

    #[test]
    fn trailing_open_never_reaches_totals(fills in prop::collection::vec(fill(), 1..60)) {
        let even = fills.len() - fills.len() % 2;
        let (_, all) = RoundTripEngine::default().replay(fills.clone());
        let (_, prefix) = RoundTripEngine::default().replay(fills[..even].to_vec());
        prop_assert_eq!(all, prefix);
    }

    #[test]
    fn unchanged_price_without_cost_is_breakeven(
        open_side in side(),
        close_side in side(),
        price in decimal(),
        qty in decimal()
    ) {
        let (results, totals) = RoundTripEngine::default().replay(vec![
            Fill::new(open_side, qty, price, Decimal::ZERO),
            Fill::new(close_side, qty, price, Decimal::ZERO),
        ]);
        prop_assert_eq!(results[0].pnl, Decimal::ZERO);
        prop_assert_eq!(totals.win_count, 0);
    }

    #[test]
    fn wins_never_exceed_round_trips(
        fills in prop::collection::vec(fill(), 0..60),
        policy in attribution()
    ) {
        let (results, totals) = RoundTripEngine::new(policy).replay(fills);
        prop_assert!(totals.win_count <= totals.round_trip_count);
        prop_assert_eq!(totals.win_count as usize, results.iter().filter(|r| r.is_win()).count());
        match totals.win_rate() {
            None => {
                prop_assert_eq!(totals.round_trip_count, 0);
            }
            Some(rate) => {
                prop_assert!(rate >= Decimal::ZERO && rate <= Decimal::ONE);
            }
        }
    }

    #[test]
    fn total_cost_matches_attribution_policy(
        fills in prop::collection::vec(fill(), 0..60),
        policy in attribution()
    ) {
        let (results, totals) = RoundTripEngine::new(policy).replay(fills.clone());
        let attributed: Decimal = results.iter().map(|r| r.cost_attributed).sum();
        prop_assert_eq!(totals.total_cost, attributed);

        let even = fills.len() - fills.len() % 2;
        let expected: Decimal = fills[..even]
            .chunks(2)
            .map(|pair| match policy {
                CostAttribution::RoundTrip => pair[0].cost + pair[1].cost,
                CostAttribution::OpeningOnly => pair[0].cost,
            })
            .sum();
        prop_assert_eq!(totals.total_cost, expected);

        let pnl: Decimal = results.iter().map(|r| r.pnl).sum();
        prop_assert_eq!(totals.total_pnl, pnl);
    }

    #[test]
    fn malformed_lines_do_not_change_results(
        entries in prop::collection::vec((fill(), prop::option::of(malformed_line())), 0..40),
        policy in attribution()
    ) {
        let clean: Vec<String> = entries.iter().map(|(fill, _)| to_line(fill)).collect();
        let mut noisy = Vec::new();
        for (fill, junk) in &entries {
            if let Some(junk) = junk {
                noisy.push(junk.to_string());
            }
            noisy.push(to_line(fill));
        }

        let expected = run_text(clean.join("\n"), policy);
        let actual = run_text(noisy.join("\n"), policy);
        prop_assert_eq!(&actual.results, &expected.results);
        prop_assert_eq!(&actual.summary, &expected.summary);

        let (direct, _) = RoundTripEngine::new(policy)
            .replay(entries.iter().map(|(fill, _)| fill.clone()));
        prop_assert_eq!(&expected.results, &direct);
    }
}
