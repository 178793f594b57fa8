// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Property-based tests for the filter predicate engine.

use crm_app::{
    FilterCategory, FilterConfig, FilterRule, FilterSet, Row, Value, extract_numeric,
    matches_search,
};
use proptest::prelude::*;
use time::{Date, Duration, Month};

fn base_day() -> Date {
    Date::from_calendar_date(2024, Month::January, 1).expect("valid base date")
}

fn row_strategy() -> impl Strategy<Value = Row> {
    ("[a-zA-Z ]{0,12}", "[a-zA-Z ]{0,12}", -5_000i64..5_000).prop_map(|(name, city, amount)| {
        Row::new()
            .with("name", name)
            .with("city", city)
            .with("amount", amount)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn search_matches_iff_some_field_contains_term(
        row in row_strategy(),
        term in "[a-zA-Z]{0,3}",
    ) {
        let fields = ["name".to_owned(), "city".to_owned(), "amount".to_owned()];
        let needle = term.to_lowercase();
        let expected = term.is_empty()
            || fields
                .iter()
                .any(|field| row.value(field).search_text().to_lowercase().contains(&needle));
        prop_assert_eq!(matches_search(&row, fields.iter(), &term), expected);
    }

    #[test]
    fn range_matches_iff_within_bounds(
        value in -10_000i64..10_000,
        min in -10_000i64..10_000,
        max in -10_000i64..10_000,
    ) {
        let rule = FilterRule::Range { min: min.to_string(), max: max.to_string() };
        let cell = Value::from(value);
        let number = extract_numeric(&cell);
        let expected = number >= min as f64 && number <= max as f64;
        prop_assert_eq!(rule.matches(FilterCategory::Numeric, &cell), expected);
    }

    #[test]
    fn currency_text_ranges_use_extracted_numbers(cents in 0i64..10_000_000, floor in 0i64..100_000) {
        let dollars = cents / 100;
        let text = format!("${dollars}.{:02}", cents % 100);
        let rule = FilterRule::Min { value: floor.to_string() };
        let cell = Value::text(text.clone());
        let expected = extract_numeric(&cell) >= floor as f64;
        prop_assert_eq!(rule.matches(FilterCategory::Numeric, &cell), expected, "{}", text);
    }

    #[test]
    fn after_is_day_inclusive(record_offset in 0i64..730, bound_offset in 0i64..730, hour in 0u8..24) {
        let record_day = base_day() + Duration::days(record_offset);
        let bound_day = base_day() + Duration::days(bound_offset);
        let record = Value::text(format!("{record_day}T{hour:02}:30:00Z"));
        let rule = FilterRule::After { value: bound_day.to_string() };
        prop_assert_eq!(rule.matches(FilterCategory::Date, &record), record_day >= bound_day);
    }

    #[test]
    fn filtering_is_idempotent(
        rows in prop::collection::vec(row_strategy(), 0..40),
        floor in -5_000i64..5_000,
        needle in "[a-z]{0,2}",
    ) {
        let mut filters = FilterSet::<String>::new();
        filters
            .set(
                "amount".to_owned(),
                FilterCategory::Numeric,
                FilterConfig::new(FilterRule::Min { value: floor.to_string() }),
            )
            .expect("min is a numeric operator");
        filters
            .set(
                "name".to_owned(),
                FilterCategory::Text,
                FilterConfig::new(FilterRule::Contains { value: needle }),
            )
            .expect("contains is a text operator");

        let once: Vec<Row> = rows.into_iter().filter(|row| filters.matches(row)).collect();
        let twice: Vec<Row> = once.iter().filter(|row| filters.matches(*row)).cloned().collect();
        prop_assert_eq!(once, twice);
    }
}
