// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Save-time validation run by the entity containers.
//!
//! The generic detail view passes drafts straight through; each container
//! wraps its draft in a [`FormPayload`] and validates before calling the
//! backend.

use anyhow::{Result, bail};

use crate::{Account, Activity, ActivityType, AttachmentUpload, Contact, Deal, EntityType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Account,
    Contact,
    Deal,
    Activity,
    ActivityType,
    Note,
    Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFormInput {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFormInput {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub upload: AttachmentUpload,
}

/// Largest upload the demo backend accepts.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum FormPayload {
    Account(Account),
    Contact(Contact),
    Deal(Deal),
    Activity(Activity),
    ActivityType(ActivityType),
    Note(NoteFormInput),
    Attachment(AttachmentFormInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Account(_) => FormKind::Account,
            Self::Contact(_) => FormKind::Contact,
            Self::Deal(_) => FormKind::Deal,
            Self::Activity(_) => FormKind::Activity,
            Self::ActivityType(_) => FormKind::ActivityType,
            Self::Note(_) => FormKind::Note,
            Self::Attachment(_) => FormKind::Attachment,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Account(account) => validate_account(account),
            Self::Contact(contact) => validate_contact(contact),
            Self::Deal(deal) => validate_deal(deal),
            Self::Activity(activity) => validate_activity(activity),
            Self::ActivityType(activity_type) => validate_activity_type(activity_type),
            Self::Note(note) => note.validate(),
            Self::Attachment(attachment) => attachment.validate(),
        }
    }
}

fn validate_account(account: &Account) -> Result<()> {
    if account.name.trim().is_empty() {
        bail!("account name is required -- enter a name and retry");
    }
    if let Some(revenue) = account.annual_revenue
        && revenue < 0.0
    {
        bail!("annual revenue cannot be negative");
    }
    if !account.website.is_empty() && !account.website.contains('.') {
        bail!(
            "website {:?} does not look like a domain -- use a form like example.com",
            account.website
        );
    }
    Ok(())
}

fn validate_contact(contact: &Contact) -> Result<()> {
    if contact.first_name.trim().is_empty() && contact.last_name.trim().is_empty() {
        bail!("contact name is required -- enter a first or last name and retry");
    }
    if !contact.email.is_empty() && !contact.email.contains('@') {
        bail!("contact email {:?} is missing an @", contact.email);
    }
    Ok(())
}

fn validate_deal(deal: &Deal) -> Result<()> {
    if deal.name.trim().is_empty() {
        bail!("deal name is required -- enter a name and retry");
    }
    if deal.account_id.is_none() {
        bail!("deal account is required -- choose an account and retry");
    }
    if let Some(amount) = deal.amount
        && amount < 0.0
    {
        bail!("deal amount cannot be negative");
    }
    if let Some(probability) = deal.probability
        && !(0.0..=100.0).contains(&probability)
    {
        bail!("deal probability must be between 0 and 100, got {probability}");
    }
    Ok(())
}

fn validate_activity(activity: &Activity) -> Result<()> {
    if activity.subject.trim().is_empty() {
        bail!("activity subject is required -- enter a subject and retry");
    }
    if activity.activity_type_id.is_none() {
        bail!("activity type is required -- choose a type and retry");
    }
    Ok(())
}

fn validate_activity_type(activity_type: &ActivityType) -> Result<()> {
    if activity_type.type_name.trim().is_empty() {
        bail!("activity type name is required -- enter a name and retry");
    }
    Ok(())
}

impl NoteFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.entity_id <= 0 {
            bail!("note must be attached to a saved record");
        }
        if self.body.trim().is_empty() {
            bail!("note body is empty -- type some text and retry");
        }
        Ok(())
    }
}

impl AttachmentFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.entity_id <= 0 {
            bail!("attachment must be linked to a saved record");
        }
        if self.upload.file_name.trim().is_empty() {
            bail!("attachment file name is required -- choose a file and retry");
        }
        if self.upload.mime_type.trim().is_empty() {
            bail!("attachment MIME type is required");
        }
        if self.upload.data.is_empty() {
            bail!("attachment content is empty -- choose a file with content and retry");
        }
        if self.upload.data.len() > MAX_ATTACHMENT_BYTES {
            bail!(
                "attachment is {} bytes; the limit is {MAX_ATTACHMENT_BYTES}",
                self.upload.data.len()
            );
        }
        Ok(())
    }
}
