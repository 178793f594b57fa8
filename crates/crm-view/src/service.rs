// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Collaborator contracts the generic views call into.
//!
//! Every fetch answers with a [`ServiceResult`]; there is no bare-array
//! variant. Closures with the right shape implement each trait, so
//! containers can wire a backend call inline.

use anyhow::Result;
use crm_app::{Row, User, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResult<T> {
    pub data: T,
}

impl<T> ServiceResult<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceResult<U> {
        ServiceResult { data: f(self.data) }
    }
}

/// Loads the rows of one related tab for a parent record.
pub trait DataService<P>: Send + Sync {
    fn fetch(&self, parent: &P) -> Result<ServiceResult<Vec<Row>>>;
}

impl<P, F> DataService<P> for F
where
    F: Fn(&P) -> Result<ServiceResult<Vec<Row>>> + Send + Sync,
{
    fn fetch(&self, parent: &P) -> Result<ServiceResult<Vec<Row>>> {
        self(parent)
    }
}

/// Resolves a dropdown's stored value to the referenced record.
pub trait LookupService: Send + Sync {
    fn resolve(&self, value: &Value) -> Result<ServiceResult<Row>>;
}

impl<F> LookupService for F
where
    F: Fn(&Value) -> Result<ServiceResult<Row>> + Send + Sync,
{
    fn resolve(&self, value: &Value) -> Result<ServiceResult<Row>> {
        self(value)
    }
}

/// Candidate owners offered by the assign-user dialog.
pub trait UserDirectory: Send + Sync {
    fn list_users(&self) -> Result<ServiceResult<Vec<User>>>;
}

impl<F> UserDirectory for F
where
    F: Fn() -> Result<ServiceResult<Vec<User>>> + Send + Sync,
{
    fn list_users(&self) -> Result<ServiceResult<Vec<User>>> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataService, LookupService, ServiceResult};
    use crm_app::{Row, Value};

    #[test]
    fn closures_serve_as_data_services() -> anyhow::Result<()> {
        let service = |parent: &i64| -> anyhow::Result<ServiceResult<Vec<Row>>> {
            Ok(ServiceResult::new(vec![Row::new().with("parent", *parent)]))
        };
        let rows = service.fetch(&7)?.into_data();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("parent"), Value::Number(7.0));
        Ok(())
    }

    #[test]
    fn lookup_errors_pass_through() {
        let service = |_: &Value| -> anyhow::Result<ServiceResult<Row>> {
            anyhow::bail!("type lookup offline")
        };
        let error = service
            .resolve(&Value::Number(3.0))
            .expect_err("lookup should fail");
        assert_eq!(error.to_string(), "type lookup offline");
    }
}
