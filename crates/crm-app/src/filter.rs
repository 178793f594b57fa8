// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Type-aware filter predicates over record values.
//!
//! A column is classified into a [`FilterCategory`] from its name (and its
//! declared kind when that is decisive). The category fixes which operators
//! are legal. Malformed input never hides data: unparsable numbers extract
//! as `0` and unparsable dates let the record through.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::Date;

use crate::format::ColumnKind;
use crate::record::{FieldKey, Record};
use crate::value::{Value, parse_date_text};

const DATE_KEYWORDS: [&str; 10] = [
    "date", "time", "created", "updated", "modified", "due", "deadline", "birthday", "expires",
    "closed",
];
const AMOUNT_KEYWORDS: [&str; 10] = [
    "amount", "price", "cost", "revenue", "value", "total", "budget", "salary", "fee", "balance",
];
const PERCENTAGE_KEYWORDS: [&str; 5] = ["percent", "probability", "rate", "ratio", "margin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterCategory {
    Text,
    Numeric,
    Date,
}

impl FilterCategory {
    /// Keyword classification of a field name; date keywords win over
    /// amount and percentage keywords.
    pub fn classify(field_name: &str) -> Self {
        let name = field_name.to_lowercase();
        if DATE_KEYWORDS.iter().any(|keyword| name.contains(keyword)) {
            Self::Date
        } else if AMOUNT_KEYWORDS
            .iter()
            .chain(PERCENTAGE_KEYWORDS.iter())
            .any(|keyword| name.contains(keyword))
        {
            Self::Numeric
        } else {
            Self::Text
        }
    }

    pub fn for_column(field_name: &str, kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Date | ColumnKind::DateTime => Self::Date,
            ColumnKind::Currency | ColumnKind::Percentage => Self::Numeric,
            _ => Self::classify(field_name),
        }
    }

    pub const fn operators(self) -> &'static [FilterOperator] {
        match self {
            Self::Text => &[FilterOperator::Contains, FilterOperator::Equals],
            Self::Numeric => &[
                FilterOperator::Min,
                FilterOperator::Max,
                FilterOperator::Equals,
                FilterOperator::Range,
            ],
            Self::Date => &[
                FilterOperator::After,
                FilterOperator::Before,
                FilterOperator::On,
                FilterOperator::DateRange,
            ],
        }
    }

    pub fn default_operator(self) -> FilterOperator {
        self.operators()[0]
    }

    pub fn allows(self, operator: FilterOperator) -> bool {
        self.operators().contains(&operator)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    Contains,
    Equals,
    Min,
    Max,
    Range,
    After,
    Before,
    On,
    DateRange,
}

impl FilterOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::Min => "min",
            Self::Max => "max",
            Self::Range => "range",
            Self::After => "after",
            Self::Before => "before",
            Self::On => "on",
            Self::DateRange => "dateRange",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contains" => Some(Self::Contains),
            "equals" => Some(Self::Equals),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "range" => Some(Self::Range),
            "after" => Some(Self::After),
            "before" => Some(Self::Before),
            "on" => Some(Self::On),
            "dateRange" => Some(Self::DateRange),
            _ => None,
        }
    }

    /// Operators taking two bounds rather than one operand.
    pub const fn is_ranged(self) -> bool {
        matches!(self, Self::Range | Self::DateRange)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator plus raw operand text as the user entered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterRule {
    Contains { value: String },
    Equals { value: String },
    Min { value: String },
    Max { value: String },
    Range { min: String, max: String },
    After { value: String },
    Before { value: String },
    On { value: String },
    DateRange { start: String, end: String },
}

impl FilterRule {
    pub fn single(operator: FilterOperator, value: impl Into<String>) -> Self {
        let value = value.into();
        match operator {
            FilterOperator::Contains => Self::Contains { value },
            FilterOperator::Equals => Self::Equals { value },
            FilterOperator::Min => Self::Min { value },
            FilterOperator::Max => Self::Max { value },
            FilterOperator::After => Self::After { value },
            FilterOperator::Before => Self::Before { value },
            FilterOperator::On => Self::On { value },
            FilterOperator::Range => Self::Range {
                min: value,
                max: String::new(),
            },
            FilterOperator::DateRange => Self::DateRange {
                start: value,
                end: String::new(),
            },
        }
    }

    pub const fn operator(&self) -> FilterOperator {
        match self {
            Self::Contains { .. } => FilterOperator::Contains,
            Self::Equals { .. } => FilterOperator::Equals,
            Self::Min { .. } => FilterOperator::Min,
            Self::Max { .. } => FilterOperator::Max,
            Self::Range { .. } => FilterOperator::Range,
            Self::After { .. } => FilterOperator::After,
            Self::Before { .. } => FilterOperator::Before,
            Self::On { .. } => FilterOperator::On,
            Self::DateRange { .. } => FilterOperator::DateRange,
        }
    }

    /// True when no operand was entered at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Contains { value }
            | Self::Equals { value }
            | Self::Min { value }
            | Self::Max { value }
            | Self::After { value }
            | Self::Before { value }
            | Self::On { value } => value.trim().is_empty(),
            Self::Range { min, max } => min.trim().is_empty() && max.trim().is_empty(),
            Self::DateRange { start, end } => start.trim().is_empty() && end.trim().is_empty(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Contains { value } => format!("contains \"{value}\""),
            Self::Equals { value } => format!("= {value}"),
            Self::Min { value } => format!("≥ {value}"),
            Self::Max { value } => format!("≤ {value}"),
            Self::Range { min, max } => match (min.trim().is_empty(), max.trim().is_empty()) {
                (false, false) => format!("{min} – {max}"),
                (false, true) => format!("≥ {min}"),
                (true, false) => format!("≤ {max}"),
                (true, true) => "any".to_owned(),
            },
            Self::After { value } => format!("after {value}"),
            Self::Before { value } => format!("before {value}"),
            Self::On { value } => format!("on {value}"),
            Self::DateRange { start, end } => {
                match (start.trim().is_empty(), end.trim().is_empty()) {
                    (false, false) => format!("{start} → {end}"),
                    (false, true) => format!("from {start}"),
                    (true, false) => format!("until {end}"),
                    (true, true) => "any".to_owned(),
                }
            }
        }
    }

    pub fn matches(&self, category: FilterCategory, value: &Value) -> bool {
        match self {
            Self::Contains { value: needle } => value
                .search_text()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::Equals { value: expected } => match category {
                FilterCategory::Numeric => extract_numeric(value) == extract_numeric_text(expected),
                FilterCategory::Text | FilterCategory::Date => {
                    value.search_text().to_lowercase() == expected.to_lowercase()
                }
            },
            Self::Min { value: bound } => {
                blank(bound) || extract_numeric(value) >= extract_numeric_text(bound)
            }
            Self::Max { value: bound } => {
                blank(bound) || extract_numeric(value) <= extract_numeric_text(bound)
            }
            Self::Range { min, max } => {
                let number = extract_numeric(value);
                (blank(min) || number >= extract_numeric_text(min))
                    && (blank(max) || number <= extract_numeric_text(max))
            }
            Self::After { value: bound } => date_matches(value, bound, |day, bound| day >= bound),
            Self::Before { value: bound } => date_matches(value, bound, |day, bound| day <= bound),
            Self::On { value: bound } => date_matches(value, bound, |day, bound| day == bound),
            Self::DateRange { start, end } => {
                date_matches(value, start, |day, bound| day >= bound)
                    && date_matches(value, end, |day, bound| day <= bound)
            }
        }
    }
}

/// One active filter: the rule plus the label shown on its chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(flatten)]
    pub rule: FilterRule,
    pub display_value: String,
}

impl FilterConfig {
    pub fn new(rule: FilterRule) -> Self {
        let display_value = rule.describe();
        Self {
            rule,
            display_value,
        }
    }

    pub fn with_display(mut self, display_value: impl Into<String>) -> Self {
        self.display_value = display_value.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveFilter {
    category: FilterCategory,
    config: FilterConfig,
}

/// Field filters combined with logical AND; empty means no filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet<F: FieldKey> {
    entries: BTreeMap<F, ActiveFilter>,
}

impl<F: FieldKey> Default for FilterSet<F> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<F: FieldKey> FilterSet<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or replaces the filter for `field`.
    ///
    /// A rule with no operand clears the field instead of storing an empty
    /// entry.
    pub fn set(&mut self, field: F, category: FilterCategory, config: FilterConfig) -> Result<()> {
        let operator = config.rule.operator();
        if !category.allows(operator) {
            let legal = category
                .operators()
                .iter()
                .map(|operator| operator.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "operator {operator} is not available for {category} column {}; use one of: {legal}",
                field.name()
            );
        }
        if config.rule.is_empty() {
            self.entries.remove(&field);
            return Ok(());
        }
        self.entries.insert(field, ActiveFilter { category, config });
        Ok(())
    }

    pub fn clear(&mut self, field: &F) -> bool {
        self.entries.remove(field).is_some()
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, field: &F) -> Option<&FilterConfig> {
        self.entries.get(field).map(|active| &active.config)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&F, &FilterConfig)> {
        self.entries
            .iter()
            .map(|(field, active)| (field, &active.config))
    }

    pub fn matches<R: Record<Field = F>>(&self, row: &R) -> bool {
        self.entries
            .iter()
            .all(|(field, active)| active.config.rule.matches(active.category, &row.get(field)))
    }
}

/// Case-insensitive substring search across `fields`; an empty term matches.
pub fn matches_search<'a, R, I>(row: &R, fields: I, term: &str) -> bool
where
    R: Record,
    R::Field: 'a,
    I: IntoIterator<Item = &'a R::Field>,
{
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    fields
        .into_iter()
        .any(|field| row.get(field).search_text().to_lowercase().contains(&needle))
}

/// Numeric reading of a cell: everything but digits, `.` and `-` is
/// stripped, then the leading number is parsed; nothing parsable yields 0.
pub fn extract_numeric(value: &Value) -> f64 {
    match value {
        Value::Number(number) if number.is_finite() => *number,
        Value::Number(_) | Value::Null => 0.0,
        other => extract_numeric_text(&other.search_text()),
    }
}

pub fn extract_numeric_text(raw: &str) -> f64 {
    let stripped: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
        .collect();
    parse_leading_float(&stripped).unwrap_or(0.0)
}

fn parse_leading_float(raw: &str) -> Option<f64> {
    let bytes = raw.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    raw[..end].trim_end_matches('.').parse::<f64>().ok()
}

fn blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

fn date_matches(value: &Value, bound: &str, compare: impl Fn(Date, Date) -> bool) -> bool {
    if blank(bound) {
        return true;
    }
    match (value.as_date(), parse_date_text(bound)) {
        (Some(day), Some(bound)) => compare(day, bound),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FilterCategory, FilterConfig, FilterOperator, FilterRule, FilterSet, extract_numeric,
        extract_numeric_text, matches_search,
    };
    use crate::format::ColumnKind;
    use crate::record::Row;
    use crate::value::Value;

    fn field(name: &str) -> String {
        name.to_owned()
    }

    #[test]
    fn classification_uses_name_keywords() {
        assert_eq!(FilterCategory::classify("close_date"), FilterCategory::Date);
        assert_eq!(FilterCategory::classify("CreatedAt"), FilterCategory::Date);
        assert_eq!(FilterCategory::classify("annual_revenue"), FilterCategory::Numeric);
        assert_eq!(FilterCategory::classify("probability"), FilterCategory::Numeric);
        assert_eq!(FilterCategory::classify("account_name"), FilterCategory::Text);
        assert_eq!(
            FilterCategory::for_column("renewal", ColumnKind::Date),
            FilterCategory::Date
        );
    }

    #[test]
    fn numeric_extraction_strips_currency_noise() {
        assert_eq!(extract_numeric_text("$1,234.56"), 1234.56);
        assert_eq!(extract_numeric_text("-$42"), -42.0);
        assert_eq!(extract_numeric_text("n/a"), 0.0);
        assert_eq!(extract_numeric_text("2024-03-15"), 2024.0);
        assert_eq!(extract_numeric(&Value::Null), 0.0);
        assert_eq!(extract_numeric(&Value::Number(7.5)), 7.5);
    }

    #[test]
    fn min_filter_scenario() {
        let rule = FilterRule::Min {
            value: "1000".to_owned(),
        };
        assert!(rule.matches(FilterCategory::Numeric, &Value::text("$1,234.56")));
        assert!(!rule.matches(FilterCategory::Numeric, &Value::text("$900.00")));
    }

    #[test]
    fn after_filter_is_same_day_inclusive() {
        let record = Value::text("2024-03-15");
        let same_day = FilterRule::After {
            value: "2024-03-15".to_owned(),
        };
        let next_day = FilterRule::After {
            value: "2024-03-16".to_owned(),
        };
        assert!(same_day.matches(FilterCategory::Date, &record));
        assert!(!next_day.matches(FilterCategory::Date, &record));
    }

    #[test]
    fn date_comparison_ignores_time_of_day() {
        let rule = FilterRule::On {
            value: "2024-03-15".to_owned(),
        };
        assert!(rule.matches(FilterCategory::Date, &Value::text("2024-03-15T23:10:00Z")));
        let before = FilterRule::Before {
            value: "2024-03-15T00:00:00Z".to_owned(),
        };
        assert!(before.matches(FilterCategory::Date, &Value::text("2024-03-15T18:00:00Z")));
    }

    #[test]
    fn unparsable_dates_do_not_exclude() {
        let rule = FilterRule::After {
            value: "2030-01-01".to_owned(),
        };
        assert!(rule.matches(FilterCategory::Date, &Value::text("someday")));
        assert!(rule.matches(FilterCategory::Date, &Value::Null));
        let bad_bound = FilterRule::Before {
            value: "whenever".to_owned(),
        };
        assert!(bad_bound.matches(FilterCategory::Date, &Value::text("2024-01-01")));
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let rule = FilterRule::DateRange {
            start: "2024-03-01".to_owned(),
            end: "2024-03-31".to_owned(),
        };
        assert!(rule.matches(FilterCategory::Date, &Value::text("2024-03-01")));
        assert!(rule.matches(FilterCategory::Date, &Value::text("2024-03-31")));
        assert!(!rule.matches(FilterCategory::Date, &Value::text("2024-04-01")));
    }

    #[test]
    fn text_operators_are_case_insensitive() {
        let contains = FilterRule::Contains {
            value: "ACME".to_owned(),
        };
        assert!(contains.matches(FilterCategory::Text, &Value::text("acme corp")));
        let equals = FilterRule::Equals {
            value: "Acme Corp".to_owned(),
        };
        assert!(equals.matches(FilterCategory::Text, &Value::text("ACME CORP")));
        assert!(!equals.matches(FilterCategory::Text, &Value::text("ACME CORP LLC")));
    }

    #[test]
    fn filter_set_rejects_illegal_operator() {
        let mut filters = FilterSet::<String>::new();
        let error = filters
            .set(
                field("account_name"),
                FilterCategory::Text,
                FilterConfig::new(FilterRule::After {
                    value: "2024-01-01".to_owned(),
                }),
            )
            .expect_err("after is not a text operator");
        assert!(error.to_string().contains("contains, equals"));
        assert!(filters.is_empty());
    }

    #[test]
    fn cleared_filters_are_removed_not_emptied() -> anyhow::Result<()> {
        let mut filters = FilterSet::<String>::new();
        filters.set(
            field("amount"),
            FilterCategory::Numeric,
            FilterConfig::new(FilterRule::Min {
                value: "10".to_owned(),
            }),
        )?;
        assert_eq!(filters.len(), 1);
        filters.set(
            field("amount"),
            FilterCategory::Numeric,
            FilterConfig::new(FilterRule::Min {
                value: "  ".to_owned(),
            }),
        )?;
        assert!(filters.is_empty());
        assert!(filters.get(&field("amount")).is_none());
        Ok(())
    }

    #[test]
    fn filter_set_is_a_logical_and() -> anyhow::Result<()> {
        let mut filters = FilterSet::<String>::new();
        filters.set(
            field("amount"),
            FilterCategory::Numeric,
            FilterConfig::new(FilterRule::Range {
                min: "100".to_owned(),
                max: "500".to_owned(),
            }),
        )?;
        filters.set(
            field("stage"),
            FilterCategory::Text,
            FilterConfig::new(FilterRule::Equals {
                value: "proposal".to_owned(),
            }),
        )?;

        let both = Row::new().with("amount", 250.0).with("stage", "Proposal");
        let wrong_stage = Row::new().with("amount", 250.0).with("stage", "closed_won");
        let too_big = Row::new().with("amount", 900.0).with("stage", "proposal");
        assert!(filters.matches(&both));
        assert!(!filters.matches(&wrong_stage));
        assert!(!filters.matches(&too_big));
        Ok(())
    }

    #[test]
    fn search_spans_all_given_fields() {
        let row = Row::new().with("name", "Globex").with("city", "Springfield");
        let fields = [field("name"), field("city")];
        assert!(matches_search(&row, fields.iter(), ""));
        assert!(matches_search(&row, fields.iter(), "SPRING"));
        assert!(!matches_search(&row, fields.iter(), "shelbyville"));
    }

    #[test]
    fn operator_sets_per_category() {
        assert_eq!(
            FilterCategory::Numeric.operators(),
            &[
                FilterOperator::Min,
                FilterOperator::Max,
                FilterOperator::Equals,
                FilterOperator::Range
            ]
        );
        assert!(FilterCategory::Date.allows(FilterOperator::DateRange));
        assert!(!FilterCategory::Date.allows(FilterOperator::Contains));
        assert_eq!(FilterOperator::parse("dateRange"), Some(FilterOperator::DateRange));
    }

    #[test]
    fn display_values_describe_the_rule() {
        let config = FilterConfig::new(FilterRule::Range {
            min: "1000".to_owned(),
            max: "5000".to_owned(),
        });
        assert_eq!(config.display_value, "1000 – 5000");
        let custom = FilterConfig::new(FilterRule::Contains {
            value: "x".to_owned(),
        })
        .with_display("name has x");
        assert_eq!(custom.display_value, "name has x");
    }
}
