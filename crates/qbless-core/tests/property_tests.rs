#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::Duration;
use common::{since, ts, until};
use proptest::prelude::*;
use qbless_core::condition::{AttributeCondition, BinOpCondition, TimeIntervalCondition};
use qbless_core::qualifier::{Qualifier, Selector};
use qbless_core::{Condition, QualifierBlessing};

fn selector() -> impl Strategy<Value = Selector> {
    prop_oneof![
        Just(Selector::Equal),
        Just(Selector::NotEqual),
        Just(Selector::LessThan),
        Just(Selector::LessThanOrEqual),
        Just(Selector::GreaterThan),
        Just(Selector::GreaterThanOrEqual),
        Just(Selector::Like),
        Just(Selector::CaseInsensitiveLike),
    ]
}

fn key() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("a"), Just("b"), Just("c")]
}

fn attribute() -> impl Strategy<Value = AttributeCondition> {
    (key(), any::<[bool; 4]>())
        .prop_map(|(key, [lt, eq, ne, gt])| AttributeCondition::new(key, lt, eq, ne, gt))
}

fn leaf() -> impl Strategy<Value = Qualifier> {
    (key(), selector(), 0i64..10).prop_map(|(key, selector, value)| {
        Qualifier::key_value(key, selector, value)
    })
}

fn qualifier() -> impl Strategy<Value = Qualifier> {
    leaf().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(Qualifier::And),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Qualifier::Or),
            inner.prop_map(Qualifier::not),
        ]
    })
}

fn blessed(qualifier: &Qualifier, condition: &dyn Condition) -> bool {
    QualifierBlessing::new()
        .bless(Some(qualifier), condition)
        .is_ok()
}

proptest! {
    #[test]
    fn prop_double_negation_is_identity(
        condition in attribute(),
        qualifier in qualifier(),
    ) {
        let doubled = Qualifier::not(Qualifier::not(qualifier.clone()));
        prop_assert_eq!(blessed(&doubled, &condition), blessed(&qualifier, &condition));
    }

    #[test]
    fn prop_double_negation_under_combinator(
        first in attribute(),
        second in attribute(),
        qualifier in qualifier(),
    ) {
        let condition = BinOpCondition::and(first, second);
        let doubled = Qualifier::not(Qualifier::not(qualifier.clone()));
        prop_assert_eq!(blessed(&doubled, &condition), blessed(&qualifier, &condition));
    }

    #[test]
    fn prop_in_set_equals_or_of_equalities(
        condition in attribute(),
        set_key in key(),
        values in prop::collection::vec(0i64..100, 1..6),
    ) {
        let in_set = Qualifier::in_set(set_key, values.iter().copied());
        let equalities = Qualifier::or(
            values
                .iter()
                .map(|v| Qualifier::key_value(set_key, Selector::Equal, *v)),
        );
        prop_assert_eq!(blessed(&in_set, &condition), blessed(&equalities, &condition));
    }

    #[test]
    fn prop_interval_within_window_iff_span_fits(
        offset_days in 0i64..3000,
        span_days in 0i64..120,
        min_days in 0u32..100,
        upper_first in any::<bool>(),
    ) {
        let lower = ts(2015, 1, 1) + Duration::days(offset_days);
        let upper = lower + Duration::days(span_days);
        let condition = TimeIntervalCondition::new("date", 0, min_days, false);
        let bounds = if upper_first {
            [until("date", upper), since("date", lower)]
        } else {
            [since("date", lower), until("date", upper)]
        };

        let verdict = blessed(&Qualifier::and(bounds), &condition);
        prop_assert_eq!(verdict, span_days <= i64::from(min_days));
    }
}
