// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::value::{RecordId, Value};

/// Name of a record attribute.
///
/// Entity records use a field enum so descriptors are checked at compile
/// time; [`Row`] uses plain strings.
pub trait FieldKey: Clone + Eq + Ord + Hash + Debug {
    fn name(&self) -> &str;
}

impl FieldKey for String {
    fn name(&self) -> &str {
        self
    }
}

pub trait Record: Clone {
    type Field: FieldKey;

    /// Reads a field; missing attributes read as [`Value::Null`].
    fn get(&self, field: &Self::Field) -> Value;

    fn set(&mut self, field: &Self::Field, value: Value) -> Result<()>;

    fn field_keys(&self) -> Vec<Self::Field>;

    fn record_id(&self, id_field: &Self::Field) -> Option<RecordId> {
        RecordId::from_value(&self.get(id_field))
    }

    fn to_row(&self) -> Row {
        let mut row = Row::default();
        for field in self.field_keys() {
            row.insert(field.name(), self.get(&field));
        }
        row
    }
}

/// Schema-less record used for related-record payloads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn value(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Record for Row {
    type Field = String;

    fn get(&self, field: &String) -> Value {
        self.value(field)
    }

    fn set(&mut self, field: &String, value: Value) -> Result<()> {
        self.values.insert(field.clone(), value);
        Ok(())
    }

    fn field_keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn to_row(&self) -> Row {
        self.clone()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::default();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, Row};
    use crate::value::{RecordId, Value};

    #[test]
    fn missing_keys_read_as_null() {
        let row = Row::new().with("name", "Acme");
        assert_eq!(row.get(&"name".to_owned()), Value::text("Acme"));
        assert_eq!(row.get(&"owner".to_owned()), Value::Null);
    }

    #[test]
    fn record_id_comes_from_id_field() {
        let row = Row::new().with("ContactID", 12_i64);
        assert_eq!(
            row.record_id(&"ContactID".to_owned()),
            Some(RecordId::Int(12))
        );
        assert_eq!(row.record_id(&"missing".to_owned()), None);
    }

    #[test]
    fn rows_deserialize_from_json_objects() -> anyhow::Result<()> {
        let row: Row = serde_json::from_str(r#"{"TypeName":"Call","Active":true}"#)?;
        assert_eq!(row.value("TypeName"), Value::text("Call"));
        assert_eq!(row.value("Active"), Value::Bool(true));
        Ok(())
    }
}
