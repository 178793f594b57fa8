// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Display rendering for cell values.
//!
//! Every function here is total: blank input renders as [`PLACEHOLDER`] and
//! malformed dates or amounts degrade to the placeholder instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::value::Value;

pub const PLACEHOLDER: &str = "-";
pub const DEFAULT_TRUNCATE_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnKind {
    #[default]
    Text,
    Date,
    DateTime,
    Currency,
    Percentage,
    Boolean,
    Chip,
    Link,
    Clickable,
    Truncated,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChipColor {
    #[default]
    Neutral,
    Primary,
    Success,
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipStyle {
    pub label: String,
    pub color: ChipColor,
}

/// Label and color lookup keyed by the lower-cased cell value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChipPalette {
    entries: BTreeMap<String, ChipStyle>,
    fallback: ChipColor,
}

impl ChipPalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, value: &str, label: impl Into<String>, color: ChipColor) -> Self {
        self.entries.insert(
            value.to_lowercase(),
            ChipStyle {
                label: label.into(),
                color,
            },
        );
        self
    }

    pub fn fallback(mut self, color: ChipColor) -> Self {
        self.fallback = color;
        self
    }

    pub fn style_for(&self, raw: &str) -> ChipStyle {
        self.entries
            .get(&raw.to_lowercase())
            .cloned()
            .unwrap_or_else(|| ChipStyle {
                label: raw.to_owned(),
                color: self.fallback,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Placeholder,
    Text(String),
    /// Disabled checkbox; `None` is the neutral unknown state.
    Check(Option<bool>),
    Chip(ChipStyle),
    Link { label: String, target: String },
    Action(String),
    Truncated { shown: String, full: String },
}

impl Rendered {
    pub fn display_text(&self) -> String {
        match self {
            Self::Placeholder => PLACEHOLDER.to_owned(),
            Self::Text(text) | Self::Action(text) => text.clone(),
            Self::Check(Some(true)) => "[x]".to_owned(),
            Self::Check(Some(false)) => "[ ]".to_owned(),
            Self::Check(None) => "[-]".to_owned(),
            Self::Chip(style) => style.label.clone(),
            Self::Link { label, .. } => label.clone(),
            Self::Truncated { shown, .. } => shown.clone(),
        }
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

/// Per-cell rendering options resolved from a column or field descriptor.
#[derive(Debug, Clone, Copy)]
pub struct CellFormat<'a> {
    pub kind: ColumnKind,
    pub chips: Option<&'a ChipPalette>,
    pub truncate_chars: usize,
}

impl CellFormat<'_> {
    pub const fn plain(kind: ColumnKind) -> Self {
        Self {
            kind,
            chips: None,
            truncate_chars: DEFAULT_TRUNCATE_CHARS,
        }
    }
}

pub type Formatter<R> = Arc<dyn Fn(&Value, &R) -> Rendered + Send + Sync>;

/// Field-name overrides layered over the built-in per-kind renderers.
pub struct FormatterRegistry<R> {
    by_field: HashMap<String, Formatter<R>>,
}

impl<R> Default for FormatterRegistry<R> {
    fn default() -> Self {
        Self {
            by_field: HashMap::new(),
        }
    }
}

impl<R> Clone for FormatterRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            by_field: self.by_field.clone(),
        }
    }
}

impl<R> FormatterRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(
        mut self,
        field_name: impl Into<String>,
        formatter: impl Fn(&Value, &R) -> Rendered + Send + Sync + 'static,
    ) -> Self {
        self.by_field.insert(field_name.into(), Arc::new(formatter));
        self
    }

    pub fn has_field(&self, field_name: &str) -> bool {
        self.by_field.contains_key(field_name)
    }

    pub fn format(
        &self,
        field_name: &str,
        cell: &CellFormat<'_>,
        value: &Value,
        row: &R,
    ) -> Rendered {
        if let Some(formatter) = self.by_field.get(field_name) {
            return formatter(value, row);
        }
        format_value(cell, value)
    }
}

pub fn format_value(cell: &CellFormat<'_>, value: &Value) -> Rendered {
    if cell.kind == ColumnKind::Boolean {
        return Rendered::Check(value.as_bool());
    }
    if value.is_blank() {
        return Rendered::Placeholder;
    }

    match cell.kind {
        ColumnKind::Date => value.as_date().map_or(Rendered::Placeholder, |date| {
            Rendered::Text(format!(
                "{}/{}/{}",
                u8::from(date.month()),
                date.day(),
                date.year()
            ))
        }),
        ColumnKind::DateTime => value
            .as_datetime()
            .map_or(Rendered::Placeholder, |datetime| {
                Rendered::Text(format_locale_datetime(datetime))
            }),
        ColumnKind::Currency => match value {
            Value::Number(amount) => Rendered::Text(format_currency(*amount)),
            Value::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|amount| amount.is_finite())
                .map_or(Rendered::Placeholder, |amount| {
                    Rendered::Text(format_currency(amount))
                }),
            _ => Rendered::Placeholder,
        },
        ColumnKind::Percentage => Rendered::Text(format!("{}%", value.search_text())),
        ColumnKind::Chip => {
            let raw = value.search_text();
            match cell.chips {
                Some(palette) => Rendered::Chip(palette.style_for(&raw)),
                None => Rendered::Chip(ChipStyle {
                    label: raw,
                    color: ChipColor::Neutral,
                }),
            }
        }
        ColumnKind::Link => {
            let label = value.search_text();
            Rendered::Link {
                target: label.clone(),
                label,
            }
        }
        ColumnKind::Clickable => Rendered::Action(value.search_text()),
        ColumnKind::Truncated => {
            let full = value.search_text();
            let shown = truncate_label(&full, cell.truncate_chars);
            if shown == full {
                Rendered::Text(full)
            } else {
                Rendered::Truncated { shown, full }
            }
        }
        ColumnKind::Boolean => Rendered::Check(value.as_bool()),
        ColumnKind::Text | ColumnKind::Custom => Rendered::Text(value.search_text()),
    }
}

/// `$` followed by the grouped amount, with up to three fraction digits.
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_number(amount.abs()))
}

pub fn group_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let text = format!("{rounded:.3}");
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let digits = whole.as_bytes();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(char::from(*digit));
    }

    if fraction.is_empty() {
        grouped
    } else {
        format!("{grouped}.{fraction}")
    }
}

pub fn truncate_label(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

fn format_locale_datetime(datetime: OffsetDateTime) -> String {
    let hour = datetime.hour();
    let (hour12, meridiem) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!(
        "{}/{}/{}, {}:{:02}:{:02} {}",
        u8::from(datetime.month()),
        datetime.day(),
        datetime.year(),
        hour12,
        datetime.minute(),
        datetime.second(),
        meridiem
    )
}

#[cfg(test)]
mod tests {
    use super::{
        CellFormat, ChipColor, ChipPalette, ColumnKind, FormatterRegistry, Rendered, format_value,
        group_number,
    };
    use crate::record::Row;
    use crate::value::Value;
    use time::macros::datetime;

    fn render(kind: ColumnKind, value: Value) -> String {
        format_value(&CellFormat::plain(kind), &value).display_text()
    }

    #[test]
    fn blank_values_render_placeholder_for_every_kind() {
        for kind in [
            ColumnKind::Text,
            ColumnKind::Date,
            ColumnKind::DateTime,
            ColumnKind::Currency,
            ColumnKind::Percentage,
            ColumnKind::Chip,
            ColumnKind::Link,
            ColumnKind::Truncated,
        ] {
            assert_eq!(render(kind, Value::Null), "-", "{kind:?}");
            assert_eq!(render(kind, Value::text("")), "-", "{kind:?}");
        }
    }

    #[test]
    fn invalid_dates_and_amounts_degrade_to_placeholder() {
        assert_eq!(render(ColumnKind::Date, Value::text("yesterday-ish")), "-");
        assert_eq!(render(ColumnKind::DateTime, Value::text("13/45/99")), "-");
        assert_eq!(render(ColumnKind::Currency, Value::text("lots")), "-");
        assert_eq!(render(ColumnKind::Currency, Value::Bool(true)), "-");
    }

    #[test]
    fn dates_render_month_day_year() {
        assert_eq!(render(ColumnKind::Date, Value::text("2024-03-15")), "3/15/2024");
        assert_eq!(
            render(
                ColumnKind::DateTime,
                Value::DateTime(datetime!(2024-03-15 14:05:09 UTC))
            ),
            "3/15/2024, 2:05:09 PM"
        );
        assert_eq!(
            render(ColumnKind::DateTime, Value::text("2024-03-15T00:30:00Z")),
            "3/15/2024, 12:30:00 AM"
        );
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(render(ColumnKind::Currency, Value::Number(1234.5)), "$1,234.5");
        assert_eq!(render(ColumnKind::Currency, Value::Number(1_000_000.0)), "$1,000,000");
        assert_eq!(render(ColumnKind::Currency, Value::text("99.999")), "$99.999");
        assert_eq!(render(ColumnKind::Currency, Value::Number(-42.0)), "-$42");
        assert_eq!(group_number(0.0), "0");
    }

    #[test]
    fn percentage_keeps_stored_precision() {
        assert_eq!(render(ColumnKind::Percentage, Value::Number(12.345)), "12.345%");
        assert_eq!(render(ColumnKind::Percentage, Value::Number(50.0)), "50%");
    }

    #[test]
    fn booleans_are_tri_state() {
        let cell = CellFormat::plain(ColumnKind::Boolean);
        assert_eq!(format_value(&cell, &Value::Bool(true)), Rendered::Check(Some(true)));
        assert_eq!(format_value(&cell, &Value::Bool(false)), Rendered::Check(Some(false)));
        assert_eq!(format_value(&cell, &Value::Null), Rendered::Check(None));
        assert_eq!(format_value(&cell, &Value::text("maybe")), Rendered::Check(None));
    }

    #[test]
    fn chips_look_up_lowercased_values_with_fallback() {
        let palette = ChipPalette::new()
            .entry("closed_won", "Won", ChipColor::Success)
            .fallback(ChipColor::Info);
        let cell = CellFormat {
            kind: ColumnKind::Chip,
            chips: Some(&palette),
            truncate_chars: 40,
        };
        let Rendered::Chip(known) = format_value(&cell, &Value::text("CLOSED_WON")) else {
            panic!("expected chip");
        };
        assert_eq!(known.label, "Won");
        assert_eq!(known.color, ChipColor::Success);

        let Rendered::Chip(unknown) = format_value(&cell, &Value::text("on_hold")) else {
            panic!("expected chip");
        };
        assert_eq!(unknown.label, "on_hold");
        assert_eq!(unknown.color, ChipColor::Info);
    }

    #[test]
    fn truncated_keeps_full_text() {
        let cell = CellFormat {
            kind: ColumnKind::Truncated,
            chips: None,
            truncate_chars: 5,
        };
        assert_eq!(
            format_value(&cell, &Value::text("abcdefgh")),
            Rendered::Truncated {
                shown: "abcde…".to_owned(),
                full: "abcdefgh".to_owned(),
            }
        );
        assert_eq!(
            format_value(&cell, &Value::text("abc")),
            Rendered::Text("abc".to_owned())
        );
    }

    #[test]
    fn registry_prefers_field_override() {
        let registry = FormatterRegistry::<Row>::new().with_field("owner_name", |value, _row| {
            if value.is_blank() {
                Rendered::Text("Unassigned".to_owned())
            } else {
                Rendered::Text(value.search_text())
            }
        });
        let row = Row::new();
        let cell = CellFormat::plain(ColumnKind::Text);
        assert_eq!(
            registry.format("owner_name", &cell, &Value::Null, &row),
            Rendered::Text("Unassigned".to_owned())
        );
        assert_eq!(
            registry.format("city", &cell, &Value::Null, &row),
            Rendered::Placeholder
        );
    }
}
