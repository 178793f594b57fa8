// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::{Date, OffsetDateTime};

use crate::ids::*;
use crate::record::{FieldKey, Record};
use crate::value::Value;

macro_rules! record_fields {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl FieldKey for $name {
            fn name(&self) -> &str {
                self.as_str()
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    SalesRep,
    ReadOnly,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::SalesRep => "sales_rep",
            Self::ReadOnly => "read_only",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "sales_rep" => Some(Self::SalesRep),
            "read_only" => Some(Self::ReadOnly),
            _ => None,
        }
    }
}

/// The acting user, passed down explicitly to anything that gates actions.
///
/// Role checks made against this value are advisory UI gating only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub display_name: String,
    pub roles: BTreeSet<Role>,
}

impl CurrentUser {
    pub fn new(id: UserId, display_name: impl Into<String>, roles: &[Role]) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            roles: roles.iter().copied().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &BTreeSet<Role>) -> bool {
        self.roles.iter().any(|role| roles.contains(role))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Account,
    Contact,
    Deal,
    Activity,
    ActivityType,
    Note,
    Attachment,
    User,
}

impl EntityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Contact => "contact",
            Self::Deal => "deal",
            Self::Activity => "activity",
            Self::ActivityType => "activity_type",
            Self::Note => "note",
            Self::Attachment => "attachment",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "account" => Some(Self::Account),
            "contact" => Some(Self::Contact),
            "deal" => Some(Self::Deal),
            "activity" => Some(Self::Activity),
            "activity_type" => Some(Self::ActivityType),
            "note" => Some(Self::Note),
            "attachment" => Some(Self::Attachment),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Prospect,
    Customer,
    Partner,
    Churned,
}

impl AccountStatus {
    pub const ALL: [Self; 4] = [Self::Prospect, Self::Customer, Self::Partner, Self::Churned];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prospect => "prospect",
            Self::Customer => "customer",
            Self::Partner => "partner",
            Self::Churned => "churned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prospect" => Some(Self::Prospect),
            "customer" => Some(Self::Customer),
            "partner" => Some(Self::Partner),
            "churned" => Some(Self::Churned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStage {
    Prospecting,
    Qualification,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    pub const ALL: [Self; 6] = [
        Self::Prospecting,
        Self::Qualification,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prospecting => "prospecting",
            Self::Qualification => "qualification",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prospecting" => Some(Self::Prospecting),
            "qualification" => Some(Self::Qualification),
            "proposal" => Some(Self::Proposal),
            "negotiation" => Some(Self::Negotiation),
            "closed_won" => Some(Self::ClosedWon),
            "closed_lost" => Some(Self::ClosedLost),
            _ => None,
        }
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

record_fields!(AccountField {
    Id => "account_id",
    Name => "account_name",
    Industry => "industry",
    Website => "website",
    Phone => "phone",
    City => "city",
    AnnualRevenue => "annual_revenue",
    Status => "status",
    OwnerId => "owner_id",
    OwnerName => "owner_name",
    IsActive => "is_active",
    CreatedAt => "created_at",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub industry: String,
    pub website: String,
    pub phone: String,
    pub city: String,
    pub annual_revenue: Option<f64>,
    pub status: AccountStatus,
    pub owner_id: Option<UserId>,
    pub owner_name: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl Record for Account {
    type Field = AccountField;

    fn get(&self, field: &AccountField) -> Value {
        match field {
            AccountField::Id => self.id.into(),
            AccountField::Name => self.name.as_str().into(),
            AccountField::Industry => self.industry.as_str().into(),
            AccountField::Website => self.website.as_str().into(),
            AccountField::Phone => self.phone.as_str().into(),
            AccountField::City => self.city.as_str().into(),
            AccountField::AnnualRevenue => self.annual_revenue.into(),
            AccountField::Status => self.status.as_str().into(),
            AccountField::OwnerId => self.owner_id.into(),
            AccountField::OwnerName => self.owner_name.as_str().into(),
            AccountField::IsActive => self.is_active.into(),
            AccountField::CreatedAt => self.created_at.into(),
        }
    }

    fn set(&mut self, field: &AccountField, value: Value) -> Result<()> {
        let name = field.as_str();
        match field {
            AccountField::Id => bail!("{name} is assigned by the backend and cannot be edited"),
            AccountField::Name => self.name = text_value(value),
            AccountField::Industry => self.industry = text_value(value),
            AccountField::Website => self.website = text_value(value),
            AccountField::Phone => self.phone = text_value(value),
            AccountField::City => self.city = text_value(value),
            AccountField::AnnualRevenue => self.annual_revenue = optional_number(name, &value)?,
            AccountField::Status => {
                let raw = text_value(value);
                self.status = AccountStatus::parse(&raw).ok_or_else(|| {
                    anyhow::anyhow!(
                        "{name} must be one of prospect, customer, partner, churned; got {raw:?}"
                    )
                })?;
            }
            AccountField::OwnerId => self.owner_id = optional_id(name, &value)?,
            AccountField::OwnerName => self.owner_name = text_value(value),
            AccountField::IsActive => self.is_active = required_bool(name, &value)?,
            AccountField::CreatedAt => self.created_at = required_datetime(name, &value)?,
        }
        Ok(())
    }

    fn field_keys(&self) -> Vec<AccountField> {
        AccountField::ALL.to_vec()
    }
}

record_fields!(ContactField {
    Id => "contact_id",
    AccountId => "account_id",
    FirstName => "first_name",
    LastName => "last_name",
    Email => "email",
    Phone => "phone",
    JobTitle => "job_title",
    OwnerId => "owner_id",
    CreatedAt => "created_at",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub account_id: Option<AccountId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub job_title: String,
    pub owner_id: Option<UserId>,
    pub created_at: OffsetDateTime,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

impl Record for Contact {
    type Field = ContactField;

    fn get(&self, field: &ContactField) -> Value {
        match field {
            ContactField::Id => self.id.into(),
            ContactField::AccountId => self.account_id.into(),
            ContactField::FirstName => self.first_name.as_str().into(),
            ContactField::LastName => self.last_name.as_str().into(),
            ContactField::Email => self.email.as_str().into(),
            ContactField::Phone => self.phone.as_str().into(),
            ContactField::JobTitle => self.job_title.as_str().into(),
            ContactField::OwnerId => self.owner_id.into(),
            ContactField::CreatedAt => self.created_at.into(),
        }
    }

    fn set(&mut self, field: &ContactField, value: Value) -> Result<()> {
        let name = field.as_str();
        match field {
            ContactField::Id => bail!("{name} is assigned by the backend and cannot be edited"),
            ContactField::AccountId => self.account_id = optional_id(name, &value)?,
            ContactField::FirstName => self.first_name = text_value(value),
            ContactField::LastName => self.last_name = text_value(value),
            ContactField::Email => self.email = text_value(value),
            ContactField::Phone => self.phone = text_value(value),
            ContactField::JobTitle => self.job_title = text_value(value),
            ContactField::OwnerId => self.owner_id = optional_id(name, &value)?,
            ContactField::CreatedAt => self.created_at = required_datetime(name, &value)?,
        }
        Ok(())
    }

    fn field_keys(&self) -> Vec<ContactField> {
        ContactField::ALL.to_vec()
    }
}

record_fields!(DealField {
    Id => "deal_id",
    AccountId => "account_id",
    Name => "deal_name",
    Stage => "stage",
    Amount => "amount",
    Probability => "probability",
    CloseDate => "close_date",
    OwnerId => "owner_id",
    OwnerName => "owner_name",
    CreatedAt => "created_at",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub account_id: Option<AccountId>,
    pub name: String,
    pub stage: DealStage,
    pub amount: Option<f64>,
    pub probability: Option<f64>,
    pub close_date: Option<Date>,
    pub owner_id: Option<UserId>,
    pub owner_name: String,
    pub created_at: OffsetDateTime,
}

impl Record for Deal {
    type Field = DealField;

    fn get(&self, field: &DealField) -> Value {
        match field {
            DealField::Id => self.id.into(),
            DealField::AccountId => self.account_id.into(),
            DealField::Name => self.name.as_str().into(),
            DealField::Stage => self.stage.as_str().into(),
            DealField::Amount => self.amount.into(),
            DealField::Probability => self.probability.into(),
            DealField::CloseDate => self.close_date.into(),
            DealField::OwnerId => self.owner_id.into(),
            DealField::OwnerName => self.owner_name.as_str().into(),
            DealField::CreatedAt => self.created_at.into(),
        }
    }

    fn set(&mut self, field: &DealField, value: Value) -> Result<()> {
        let name = field.as_str();
        match field {
            DealField::Id => bail!("{name} is assigned by the backend and cannot be edited"),
            DealField::AccountId => self.account_id = optional_id(name, &value)?,
            DealField::Name => self.name = text_value(value),
            DealField::Stage => {
                let raw = text_value(value);
                self.stage = DealStage::parse(&raw)
                    .ok_or_else(|| anyhow::anyhow!("{name} has unknown stage {raw:?}"))?;
            }
            DealField::Amount => self.amount = optional_number(name, &value)?,
            DealField::Probability => self.probability = optional_number(name, &value)?,
            DealField::CloseDate => self.close_date = optional_date(name, &value)?,
            DealField::OwnerId => self.owner_id = optional_id(name, &value)?,
            DealField::OwnerName => self.owner_name = text_value(value),
            DealField::CreatedAt => self.created_at = required_datetime(name, &value)?,
        }
        Ok(())
    }

    fn field_keys(&self) -> Vec<DealField> {
        DealField::ALL.to_vec()
    }
}

record_fields!(ActivityField {
    Id => "activity_id",
    AccountId => "account_id",
    DealId => "deal_id",
    ActivityTypeId => "activity_type_id",
    TypeName => "type_name",
    Subject => "subject",
    DueDate => "due_date",
    Completed => "completed",
    Notes => "notes",
    CreatedAt => "created_at",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub account_id: Option<AccountId>,
    pub deal_id: Option<DealId>,
    pub activity_type_id: Option<ActivityTypeId>,
    /// Denormalized type label; absent when the backend did not join it.
    pub type_name: Option<String>,
    pub subject: String,
    pub due_date: Option<Date>,
    pub completed: Option<bool>,
    pub notes: String,
    pub created_at: OffsetDateTime,
}

impl Record for Activity {
    type Field = ActivityField;

    fn get(&self, field: &ActivityField) -> Value {
        match field {
            ActivityField::Id => self.id.into(),
            ActivityField::AccountId => self.account_id.into(),
            ActivityField::DealId => self.deal_id.into(),
            ActivityField::ActivityTypeId => self.activity_type_id.into(),
            ActivityField::TypeName => self.type_name.clone().into(),
            ActivityField::Subject => self.subject.as_str().into(),
            ActivityField::DueDate => self.due_date.into(),
            ActivityField::Completed => self.completed.into(),
            ActivityField::Notes => self.notes.as_str().into(),
            ActivityField::CreatedAt => self.created_at.into(),
        }
    }

    fn set(&mut self, field: &ActivityField, value: Value) -> Result<()> {
        let name = field.as_str();
        match field {
            ActivityField::Id => bail!("{name} is assigned by the backend and cannot be edited"),
            ActivityField::AccountId => self.account_id = optional_id(name, &value)?,
            ActivityField::DealId => self.deal_id = optional_id(name, &value)?,
            ActivityField::ActivityTypeId => {
                let next: Option<ActivityTypeId> = optional_id(name, &value)?;
                if next != self.activity_type_id {
                    self.type_name = None;
                }
                self.activity_type_id = next;
            }
            ActivityField::TypeName => {
                self.type_name = Some(text_value(value)).filter(|name| !name.is_empty());
            }
            ActivityField::Subject => self.subject = text_value(value),
            ActivityField::DueDate => self.due_date = optional_date(name, &value)?,
            ActivityField::Completed => self.completed = optional_bool(name, &value)?,
            ActivityField::Notes => self.notes = text_value(value),
            ActivityField::CreatedAt => self.created_at = required_datetime(name, &value)?,
        }
        Ok(())
    }

    fn field_keys(&self) -> Vec<ActivityField> {
        ActivityField::ALL.to_vec()
    }
}

record_fields!(ActivityTypeField {
    Id => "activity_type_id",
    TypeName => "type_name",
    Description => "description",
    IsActive => "is_active",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: ActivityTypeId,
    pub type_name: String,
    pub description: String,
    pub is_active: bool,
}

impl Record for ActivityType {
    type Field = ActivityTypeField;

    fn get(&self, field: &ActivityTypeField) -> Value {
        match field {
            ActivityTypeField::Id => self.id.into(),
            ActivityTypeField::TypeName => self.type_name.as_str().into(),
            ActivityTypeField::Description => self.description.as_str().into(),
            ActivityTypeField::IsActive => self.is_active.into(),
        }
    }

    fn set(&mut self, field: &ActivityTypeField, value: Value) -> Result<()> {
        let name = field.as_str();
        match field {
            ActivityTypeField::Id => {
                bail!("{name} is assigned by the backend and cannot be edited")
            }
            ActivityTypeField::TypeName => self.type_name = text_value(value),
            ActivityTypeField::Description => self.description = text_value(value),
            ActivityTypeField::IsActive => self.is_active = required_bool(name, &value)?,
        }
        Ok(())
    }

    fn field_keys(&self) -> Vec<ActivityTypeField> {
        ActivityTypeField::ALL.to_vec()
    }
}

record_fields!(NoteField {
    Id => "note_id",
    EntityType => "entity_type",
    EntityId => "entity_id",
    Body => "body",
    Author => "author",
    CreatedAt => "created_at",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub body: String,
    pub author: String,
    pub created_at: OffsetDateTime,
}

impl Record for Note {
    type Field = NoteField;

    fn get(&self, field: &NoteField) -> Value {
        match field {
            NoteField::Id => self.id.into(),
            NoteField::EntityType => self.entity_type.as_str().into(),
            NoteField::EntityId => self.entity_id.into(),
            NoteField::Body => self.body.as_str().into(),
            NoteField::Author => self.author.as_str().into(),
            NoteField::CreatedAt => self.created_at.into(),
        }
    }

    fn set(&mut self, field: &NoteField, value: Value) -> Result<()> {
        let name = field.as_str();
        match field {
            NoteField::Body => self.body = text_value(value),
            NoteField::Author => self.author = text_value(value),
            _ => bail!("{name} is read-only on notes"),
        }
        Ok(())
    }

    fn field_keys(&self) -> Vec<NoteField> {
        NoteField::ALL.to_vec()
    }
}

record_fields!(AttachmentField {
    Id => "attachment_id",
    EntityType => "entity_type",
    EntityId => "entity_id",
    FileName => "file_name",
    MimeType => "mime_type",
    SizeBytes => "size_bytes",
    UploadedBy => "uploaded_by",
    CreatedAt => "created_at",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub created_at: OffsetDateTime,
}

impl Record for Attachment {
    type Field = AttachmentField;

    fn get(&self, field: &AttachmentField) -> Value {
        match field {
            AttachmentField::Id => self.id.into(),
            AttachmentField::EntityType => self.entity_type.as_str().into(),
            AttachmentField::EntityId => self.entity_id.into(),
            AttachmentField::FileName => self.file_name.as_str().into(),
            AttachmentField::MimeType => self.mime_type.as_str().into(),
            AttachmentField::SizeBytes => self.size_bytes.into(),
            AttachmentField::UploadedBy => self.uploaded_by.as_str().into(),
            AttachmentField::CreatedAt => self.created_at.into(),
        }
    }

    fn set(&mut self, field: &AttachmentField, value: Value) -> Result<()> {
        let name = field.as_str();
        match field {
            AttachmentField::FileName => self.file_name = text_value(value),
            _ => bail!("{name} is read-only on attachments"),
        }
        Ok(())
    }

    fn field_keys(&self) -> Vec<AttachmentField> {
        AttachmentField::ALL.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub roles: BTreeSet<Role>,
    pub is_active: bool,
}

/// A file picked for upload, handed to the attachment callback as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

fn text_value(value: Value) -> String {
    match value {
        Value::Text(text) => text,
        other => other.search_text(),
    }
}

fn optional_number(name: &str, value: &Value) -> Result<Option<f64>> {
    if value.is_blank() {
        return Ok(None);
    }
    match value.as_f64() {
        Some(number) => Ok(Some(number)),
        None => bail!("{name} expects a number, got {value:?}"),
    }
}

fn optional_date(name: &str, value: &Value) -> Result<Option<Date>> {
    if value.is_blank() {
        return Ok(None);
    }
    match value.as_date() {
        Some(date) => Ok(Some(date)),
        None => bail!("{name} expects a date like 2024-03-15, got {value:?}"),
    }
}

fn required_datetime(name: &str, value: &Value) -> Result<OffsetDateTime> {
    match value.as_datetime() {
        Some(datetime) => Ok(datetime),
        None => bail!("{name} expects a timestamp, got {value:?}"),
    }
}

fn optional_bool(name: &str, value: &Value) -> Result<Option<bool>> {
    if value.is_blank() {
        return Ok(None);
    }
    match value.as_bool() {
        Some(flag) => Ok(Some(flag)),
        None => bail!("{name} expects true or false, got {value:?}"),
    }
}

fn required_bool(name: &str, value: &Value) -> Result<bool> {
    match value.as_bool() {
        Some(flag) => Ok(flag),
        None => bail!("{name} expects true or false, got {value:?}"),
    }
}

fn optional_id<T: From<i64>>(name: &str, value: &Value) -> Result<Option<T>> {
    if value.is_blank() {
        return Ok(None);
    }
    match value.as_i64() {
        Some(id) => Ok(Some(T::from(id))),
        None => bail!("{name} expects a numeric id, got {value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Account, AccountField, AccountStatus, Activity, ActivityField, CurrentUser, DealStage,
        Role,
    };
    use crate::ids::{AccountId, ActivityId, ActivityTypeId, UserId};
    use crate::record::Record;
    use crate::value::Value;
    use time::OffsetDateTime;

    fn sample_account() -> Account {
        Account {
            id: AccountId::new(1),
            name: "Acme".to_owned(),
            industry: "Manufacturing".to_owned(),
            website: String::new(),
            phone: String::new(),
            city: "Austin".to_owned(),
            annual_revenue: Some(1_500_000.0),
            status: AccountStatus::Customer,
            owner_id: None,
            owner_name: String::new(),
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn field_names_round_trip() {
        for field in AccountField::ALL {
            assert_eq!(AccountField::parse(field.as_str()), Some(*field));
        }
        assert_eq!(DealStage::parse("Closed_Won"), Some(DealStage::ClosedWon));
        assert_eq!(Role::parse("sales_rep"), Some(Role::SalesRep));
    }

    #[test]
    fn account_set_converts_values() -> anyhow::Result<()> {
        let mut account = sample_account();
        account.set(&AccountField::AnnualRevenue, Value::text("2500"))?;
        assert_eq!(account.annual_revenue, Some(2500.0));
        account.set(&AccountField::AnnualRevenue, Value::text(""))?;
        assert_eq!(account.annual_revenue, None);
        account.set(&AccountField::OwnerId, Value::Number(9.0))?;
        assert_eq!(account.owner_id, Some(UserId::new(9)));
        account.set(&AccountField::Status, Value::text("Partner"))?;
        assert_eq!(account.status, AccountStatus::Partner);
        Ok(())
    }

    #[test]
    fn account_set_rejects_bad_input() {
        let mut account = sample_account();
        let error = account
            .set(&AccountField::AnnualRevenue, Value::text("lots"))
            .expect_err("non-numeric revenue should fail");
        assert!(error.to_string().contains("expects a number"));
        assert!(account.set(&AccountField::Id, Value::Number(3.0)).is_err());
    }

    #[test]
    fn changing_activity_type_drops_stale_type_name() -> anyhow::Result<()> {
        let mut activity = Activity {
            id: ActivityId::new(1),
            account_id: None,
            deal_id: None,
            activity_type_id: Some(ActivityTypeId::new(2)),
            type_name: Some("Call".to_owned()),
            subject: "Intro".to_owned(),
            due_date: None,
            completed: None,
            notes: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        activity.set(&ActivityField::ActivityTypeId, Value::Number(3.0))?;
        assert_eq!(activity.type_name, None);
        assert_eq!(activity.get(&ActivityField::TypeName), Value::Null);
        Ok(())
    }

    #[test]
    fn current_user_role_checks() {
        let user = CurrentUser::new(UserId::new(1), "Avery", &[Role::SalesRep]);
        assert!(user.has_role(Role::SalesRep));
        assert!(!user.has_role(Role::Admin));
        assert!(user.has_any_role(&[Role::Admin, Role::SalesRep].into_iter().collect()));
    }

    #[test]
    fn to_row_uses_field_names() {
        let row = sample_account().to_row();
        assert_eq!(row.value("account_name"), Value::text("Acme"));
        assert_eq!(row.value("owner_id"), Value::Null);
    }
}
