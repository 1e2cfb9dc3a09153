// 📊 Aggregator - normalised monthly/yearly totals and next-due projection
//
// Pure functions over a slice of subscriptions. Nothing is cached: totals are
// recomputed from the full collection every time they are asked for.
//
// Normalisation table (per-cycle amount → figure):
//
//   Frequency   monthly   yearly
//   Weekly        ×4        ×48
//   Biweekly      ×2        ×24
//   Monthly       ×1        ×12
//   Yearly         0        ×1
//   other          0         0
//
// Yearly subscriptions are left out of the monthly figure entirely, they are
// not amortised as amount/12.

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::subscription::{Frequency, Subscription};

/// Multiplier turning one billing cycle into a monthly figure
pub fn monthly_factor(frequency: &Frequency) -> f64 {
    match frequency {
        Frequency::Weekly => 4.0,
        Frequency::Biweekly => 2.0,
        Frequency::Monthly => 1.0,
        Frequency::Yearly | Frequency::Other(_) => 0.0,
    }
}

/// Multiplier turning one billing cycle into a yearly figure
pub fn yearly_factor(frequency: &Frequency) -> f64 {
    match frequency {
        Frequency::Weekly => 4.0 * 12.0,
        Frequency::Biweekly => 2.0 * 12.0,
        Frequency::Monthly => 12.0,
        Frequency::Yearly => 1.0,
        Frequency::Other(_) => 0.0,
    }
}

pub fn monthly_total(subscriptions: &[Subscription]) -> f64 {
    subscriptions
        .iter()
        .fold(0.0, |total, sub| total + sub.amount * monthly_factor(&sub.frequency))
}

pub fn yearly_total(subscriptions: &[Subscription]) -> f64 {
    subscriptions
        .iter()
        .fold(0.0, |total, sub| total + sub.amount * yearly_factor(&sub.frequency))
}

/// Advance `date` by one billing cycle.
///
/// Month and year steps use chrono's calendar addition, which clamps the day to
/// the end of a shorter target month (Jan 31 + 1 month = Feb 28/29). Unknown
/// cadences, and additions past chrono's date range, return `date` unchanged.
pub fn next_due_date(date: NaiveDate, frequency: &Frequency) -> NaiveDate {
    let advanced = match frequency {
        Frequency::Weekly => date.checked_add_signed(Duration::days(7)),
        Frequency::Biweekly => date.checked_add_signed(Duration::days(14)),
        Frequency::Monthly => date.checked_add_months(Months::new(1)),
        Frequency::Yearly => date.checked_add_months(Months::new(12)),
        Frequency::Other(_) => None,
    };
    advanced.unwrap_or(date)
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Figures shown on the metrics screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub monthly_total: f64,
    pub yearly_total: f64,
}

impl Summary {
    pub fn of(subscriptions: &[Subscription]) -> Self {
        Summary {
            count: subscriptions.len(),
            monthly_total: monthly_total(subscriptions),
            yearly_total: yearly_total(subscriptions),
        }
    }
}

/// "No subscriptions" / "1 subscription" / "N subscriptions"
pub fn count_label(count: usize) -> String {
    match count {
        0 => "No subscriptions".to_string(),
        1 => "1 subscription".to_string(),
        n => format!("{} subscriptions", n),
    }
}

/// Dollar amount with two decimals, e.g. "$12.50"
pub fn format_amount(amount: f64) -> String {
    format!("${:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sub(amount: f64, frequency: Frequency) -> Subscription {
        Subscription::new("Test".to_string(), amount, date(2025, 1, 15), frequency)
    }

    #[test]
    fn test_empty_collection_totals_are_zero() {
        assert_eq!(monthly_total(&[]), 0.0);
        assert_eq!(yearly_total(&[]), 0.0);
    }

    #[rstest]
    #[case(Frequency::Weekly, 40.0, 480.0)]
    #[case(Frequency::Biweekly, 20.0, 240.0)]
    #[case(Frequency::Monthly, 10.0, 120.0)]
    #[case(Frequency::Yearly, 0.0, 10.0)]
    #[case(Frequency::Other("Daily".to_string()), 0.0, 0.0)]
    fn test_normalisation_per_frequency(
        #[case] frequency: Frequency,
        #[case] monthly: f64,
        #[case] yearly: f64,
    ) {
        let subs = vec![sub(10.0, frequency)];
        assert_eq!(monthly_total(&subs), monthly);
        assert_eq!(yearly_total(&subs), yearly);
    }

    #[test]
    fn test_yearly_is_excluded_from_monthly_not_amortised() {
        let subs = vec![sub(120.0, Frequency::Yearly), sub(5.0, Frequency::Monthly)];
        assert_eq!(monthly_total(&subs), 5.0);
        assert_eq!(yearly_total(&subs), 180.0);
    }

    #[test]
    fn test_mixed_collection() {
        let subs = vec![
            sub(15.0, Frequency::Monthly),
            sub(5.0, Frequency::Weekly),
            sub(100.0, Frequency::Yearly),
            sub(8.0, Frequency::Biweekly),
            sub(99.0, Frequency::Other("Quarterly".to_string())),
        ];

        assert_eq!(monthly_total(&subs), 15.0 + 20.0 + 16.0);
        assert_eq!(yearly_total(&subs), 180.0 + 240.0 + 100.0 + 192.0);
    }

    #[rstest]
    #[case(Frequency::Weekly, date(2025, 1, 22))]
    #[case(Frequency::Biweekly, date(2025, 1, 29))]
    #[case(Frequency::Monthly, date(2025, 2, 15))]
    #[case(Frequency::Yearly, date(2026, 1, 15))]
    #[case(Frequency::Other("Daily".to_string()), date(2025, 1, 15))]
    fn test_next_due_date(#[case] frequency: Frequency, #[case] expected: NaiveDate) {
        assert_eq!(next_due_date(date(2025, 1, 15), &frequency), expected);
    }

    #[test]
    fn test_next_due_date_crosses_year_boundary() {
        assert_eq!(
            next_due_date(date(2024, 12, 28), &Frequency::Weekly),
            date(2025, 1, 4)
        );
        assert_eq!(
            next_due_date(date(2024, 12, 10), &Frequency::Monthly),
            date(2025, 1, 10)
        );
    }

    #[test]
    fn test_month_end_clamps_to_shorter_month() {
        assert_eq!(
            next_due_date(date(2025, 1, 31), &Frequency::Monthly),
            date(2025, 2, 28)
        );
        assert_eq!(
            next_due_date(date(2024, 1, 31), &Frequency::Monthly),
            date(2024, 2, 29)
        );
        assert_eq!(
            next_due_date(date(2024, 2, 29), &Frequency::Yearly),
            date(2025, 2, 28)
        );
    }

    #[test]
    fn test_next_due_date_at_end_of_range_is_unchanged() {
        assert_eq!(
            next_due_date(NaiveDate::MAX, &Frequency::Weekly),
            NaiveDate::MAX
        );
    }

    #[test]
    fn test_summary() {
        let subs = vec![sub(10.0, Frequency::Monthly), sub(50.0, Frequency::Yearly)];
        let summary = Summary::of(&subs);

        assert_eq!(summary.count, 2);
        assert_eq!(summary.monthly_total, 10.0);
        assert_eq!(summary.yearly_total, 170.0);
    }

    #[rstest]
    #[case(0, "No subscriptions")]
    #[case(1, "1 subscription")]
    #[case(7, "7 subscriptions")]
    fn test_count_label(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(count_label(count), expected);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "$0.00");
        assert_eq!(format_amount(12.5), "$12.50");
        assert_eq!(format_amount(1234.567), "$1234.57");
    }

    fn frequency_strategy() -> impl Strategy<Value = Frequency> {
        prop_oneof![
            Just(Frequency::Weekly),
            Just(Frequency::Biweekly),
            Just(Frequency::Monthly),
            Just(Frequency::Yearly),
            "[A-Z][a-z]{2,8}".prop_map(Frequency::from),
        ]
    }

    fn subscriptions_strategy() -> impl Strategy<Value = Vec<Subscription>> {
        prop::collection::vec(
            (0u32..1_000_000, frequency_strategy())
                .prop_map(|(cents, frequency)| sub(f64::from(cents) / 100.0, frequency)),
            0..20,
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    proptest! {
        #[test]
        fn prop_totals_are_distributive(
            first in subscriptions_strategy(),
            second in subscriptions_strategy(),
        ) {
            let mut joined = first.clone();
            joined.extend(second.iter().cloned());

            prop_assert!(close(
                monthly_total(&joined),
                monthly_total(&first) + monthly_total(&second)
            ));
            prop_assert!(close(
                yearly_total(&joined),
                yearly_total(&first) + yearly_total(&second)
            ));
        }

        #[test]
        fn prop_monthly_amount_scales_to_twelve(cents in 0u32..10_000_000) {
            let amount = f64::from(cents) / 100.0;
            let subs = vec![sub(amount, Frequency::Monthly)];
            prop_assert_eq!(monthly_total(&subs), amount);
            prop_assert!(close(yearly_total(&subs), 12.0 * amount));
        }

        #[test]
        fn prop_yearly_amount_never_counts_monthly(cents in 0u32..10_000_000) {
            let amount = f64::from(cents) / 100.0;
            let subs = vec![sub(amount, Frequency::Yearly)];
            prop_assert_eq!(monthly_total(&subs), 0.0);
            prop_assert_eq!(yearly_total(&subs), amount);
        }
    }
}
