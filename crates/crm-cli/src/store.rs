// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! In-memory demo backend.
//!
//! List reads and writes run on the UI thread and return immediately.
//! Related-tab, lookup and user-directory reads run on worker threads and
//! sleep for the configured latency first, so loading states are visible.

use anyhow::{Result, anyhow, bail};
use crm_app::{
    Account, AccountId, Activity, ActivityId, ActivityType, ActivityTypeId, Attachment,
    AttachmentFormInput, AttachmentId, Contact, ContactId, CurrentUser, Deal, DealId, EntityType,
    FormPayload, Note, NoteFormInput, NoteId, User, UserId,
};
use crm_testkit::DemoData;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info};

#[derive(Clone)]
pub struct DemoStore {
    data: Arc<Mutex<DemoData>>,
    latency: Duration,
    failing_tabs: Arc<BTreeSet<String>>,
}

impl DemoStore {
    pub fn new(data: DemoData, latency: Duration) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            latency,
            failing_tabs: Arc::new(BTreeSet::new()),
        }
    }

    /// Related tabs whose fetch always fails, for exercising error states.
    pub fn with_failing_tabs(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.failing_tabs = Arc::new(keys.into_iter().collect());
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, DemoData>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("demo store lock poisoned; restart the console"))
    }

    fn pause(&self) {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
    }

    /// Gate for related-tab fetches: sleeps, then fails for configured keys.
    pub fn related(&self, tab: &str) -> Result<()> {
        self.pause();
        if self.failing_tabs.contains(tab) {
            bail!("{tab} service is unavailable (configured in [demo].failing_tabs)");
        }
        Ok(())
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.lock()?.accounts.clone())
    }

    pub fn account(&self, id: AccountId) -> Result<Account> {
        self.pause();
        self.lock()?
            .accounts
            .iter()
            .find(|account| account.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("account {} not found", id.get()))
    }

    /// Account name for list formatting on the UI thread.
    pub fn account_name_now(&self, id: AccountId) -> Option<String> {
        let data = self.lock().ok()?;
        data.accounts
            .iter()
            .find(|account| account.id == id)
            .map(|account| account.name.clone())
    }

    pub fn save_account(&self, account: &Account) -> Result<()> {
        FormPayload::Account(account.clone()).validate()?;
        let mut data = self.lock()?;
        let slot = find_mut(&mut data.accounts, |row| row.id == account.id, "account", account.id.get())?;
        *slot = account.clone();
        info!(account = account.id.get(), "account saved");
        Ok(())
    }

    pub fn delete_account(&self, id: AccountId) -> Result<()> {
        let mut data = self.lock()?;
        let before = data.accounts.len();
        data.accounts.retain(|account| account.id != id);
        if data.accounts.len() == before {
            bail!("account {} no longer exists; refresh the list", id.get());
        }
        for contact in &mut data.contacts {
            if contact.account_id == Some(id) {
                contact.account_id = None;
            }
        }
        drop_attached(&mut data, EntityType::Account, id.get());
        info!(account = id.get(), "account deleted");
        Ok(())
    }

    pub fn set_account_owner(&self, id: AccountId, owner: Option<&User>) -> Result<()> {
        let mut data = self.lock()?;
        let account = find_mut(&mut data.accounts, |row| row.id == id, "account", id.get())?;
        account.owner_id = owner.map(|user| user.id);
        account.owner_name = owner.map(|user| user.display_name.clone()).unwrap_or_default();
        info!(account = id.get(), owner = ?account.owner_id, "account owner changed");
        Ok(())
    }

    /// Takes an unowned account; fails when someone claimed it first.
    pub fn claim_account(&self, id: AccountId, user: &CurrentUser) -> Result<()> {
        let mut data = self.lock()?;
        let account = find_mut(&mut data.accounts, |row| row.id == id, "account", id.get())?;
        if let Some(owner) = account.owner_id
            && owner != user.id
        {
            bail!("account is already owned by {}; refresh to see the owner", account.owner_name);
        }
        account.owner_id = Some(user.id);
        account.owner_name = user.display_name.clone();
        info!(account = id.get(), user = user.id.get(), "account claimed");
        Ok(())
    }

    pub fn contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.lock()?.contacts.clone())
    }

    pub fn contacts_for_account(&self, id: AccountId) -> Result<Vec<Contact>> {
        self.related("contacts")?;
        Ok(self
            .lock()?
            .contacts
            .iter()
            .filter(|contact| contact.account_id == Some(id))
            .cloned()
            .collect())
    }

    pub fn save_contact(&self, contact: &Contact) -> Result<()> {
        FormPayload::Contact(contact.clone()).validate()?;
        let mut data = self.lock()?;
        let slot = find_mut(&mut data.contacts, |row| row.id == contact.id, "contact", contact.id.get())?;
        *slot = contact.clone();
        Ok(())
    }

    pub fn delete_contact(&self, id: ContactId) -> Result<()> {
        let mut data = self.lock()?;
        let before = data.contacts.len();
        data.contacts.retain(|contact| contact.id != id);
        if data.contacts.len() == before {
            bail!("contact {} no longer exists; refresh the list", id.get());
        }
        drop_attached(&mut data, EntityType::Contact, id.get());
        Ok(())
    }

    pub fn deals(&self) -> Result<Vec<Deal>> {
        Ok(self.lock()?.deals.clone())
    }

    pub fn deals_for_account(&self, id: AccountId) -> Result<Vec<Deal>> {
        self.related("deals")?;
        Ok(self
            .lock()?
            .deals
            .iter()
            .filter(|deal| deal.account_id == Some(id))
            .cloned()
            .collect())
    }

    pub fn save_deal(&self, deal: &Deal) -> Result<()> {
        FormPayload::Deal(deal.clone()).validate()?;
        let mut data = self.lock()?;
        let slot = find_mut(&mut data.deals, |row| row.id == deal.id, "deal", deal.id.get())?;
        *slot = deal.clone();
        Ok(())
    }

    pub fn delete_deal(&self, id: DealId) -> Result<()> {
        let mut data = self.lock()?;
        let before = data.deals.len();
        data.deals.retain(|deal| deal.id != id);
        if data.deals.len() == before {
            bail!("deal {} no longer exists; refresh the list", id.get());
        }
        for activity in &mut data.activities {
            if activity.deal_id == Some(id) {
                activity.deal_id = None;
            }
        }
        drop_attached(&mut data, EntityType::Deal, id.get());
        Ok(())
    }

    pub fn set_deal_owner(&self, id: DealId, owner: Option<&User>) -> Result<()> {
        let mut data = self.lock()?;
        let deal = find_mut(&mut data.deals, |row| row.id == id, "deal", id.get())?;
        deal.owner_id = owner.map(|user| user.id);
        deal.owner_name = owner.map(|user| user.display_name.clone()).unwrap_or_default();
        Ok(())
    }

    pub fn claim_deal(&self, id: DealId, user: &CurrentUser) -> Result<()> {
        let mut data = self.lock()?;
        let deal = find_mut(&mut data.deals, |row| row.id == id, "deal", id.get())?;
        if let Some(owner) = deal.owner_id
            && owner != user.id
        {
            bail!("deal is already owned by {}; refresh to see the owner", deal.owner_name);
        }
        deal.owner_id = Some(user.id);
        deal.owner_name = user.display_name.clone();
        info!(deal = id.get(), user = user.id.get(), "deal claimed");
        Ok(())
    }

    pub fn activities(&self) -> Result<Vec<Activity>> {
        Ok(self.lock()?.activities.clone())
    }

    pub fn activities_for_account(&self, id: AccountId) -> Result<Vec<Activity>> {
        self.related("activities")?;
        Ok(self
            .lock()?
            .activities
            .iter()
            .filter(|activity| activity.account_id == Some(id))
            .cloned()
            .collect())
    }

    pub fn activities_for_deal(&self, id: DealId) -> Result<Vec<Activity>> {
        self.related("activities")?;
        Ok(self
            .lock()?
            .activities
            .iter()
            .filter(|activity| activity.deal_id == Some(id))
            .cloned()
            .collect())
    }

    pub fn save_activity(&self, activity: &Activity) -> Result<()> {
        FormPayload::Activity(activity.clone()).validate()?;
        let mut data = self.lock()?;
        if let Some(type_id) = activity.activity_type_id
            && !data.activity_types.iter().any(|kind| kind.id == type_id)
        {
            bail!("activity type {} does not exist; pick one from Activity Types", type_id.get());
        }
        let slot = find_mut(&mut data.activities, |row| row.id == activity.id, "activity", activity.id.get())?;
        *slot = activity.clone();
        Ok(())
    }

    pub fn delete_activity(&self, id: ActivityId) -> Result<()> {
        let mut data = self.lock()?;
        let before = data.activities.len();
        data.activities.retain(|activity| activity.id != id);
        if data.activities.len() == before {
            bail!("activity {} no longer exists; refresh the list", id.get());
        }
        drop_attached(&mut data, EntityType::Activity, id.get());
        Ok(())
    }

    pub fn activity_types(&self) -> Result<Vec<ActivityType>> {
        Ok(self.lock()?.activity_types.clone())
    }

    /// Reference lookup used by the activity type dropdown.
    pub fn activity_type(&self, id: ActivityTypeId) -> Result<ActivityType> {
        self.pause();
        self.activity_type_now(id)
    }

    /// Same as [`DemoStore::activity_type`] without the simulated latency,
    /// for list formatting on the UI thread.
    pub fn activity_type_now(&self, id: ActivityTypeId) -> Result<ActivityType> {
        self.lock()?
            .activity_types
            .iter()
            .find(|kind| kind.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("activity type {} not found", id.get()))
    }

    pub fn save_activity_type(&self, activity_type: &ActivityType) -> Result<()> {
        FormPayload::ActivityType(activity_type.clone()).validate()?;
        let mut data = self.lock()?;
        let duplicate = data.activity_types.iter().any(|kind| {
            kind.id != activity_type.id && kind.type_name.eq_ignore_ascii_case(&activity_type.type_name)
        });
        if duplicate {
            bail!("activity type {:?} already exists", activity_type.type_name);
        }
        let id = activity_type.id;
        let slot = find_mut(&mut data.activity_types, |row| row.id == id, "activity type", id.get())?;
        *slot = activity_type.clone();
        for activity in &mut data.activities {
            if activity.activity_type_id == Some(id) && activity.type_name.is_some() {
                activity.type_name = Some(activity_type.type_name.clone());
            }
        }
        Ok(())
    }

    /// Soft delete: the type stays referenced by old activities.
    pub fn deactivate_activity_type(&self, id: ActivityTypeId) -> Result<()> {
        self.set_activity_type_active(id, false)
    }

    pub fn reactivate_activity_type(&self, id: ActivityTypeId) -> Result<()> {
        self.set_activity_type_active(id, true)
    }

    fn set_activity_type_active(&self, id: ActivityTypeId, active: bool) -> Result<()> {
        let mut data = self.lock()?;
        let kind = find_mut(&mut data.activity_types, |row| row.id == id, "activity type", id.get())?;
        if kind.is_active == active {
            let state = if active { "active" } else { "inactive" };
            bail!("activity type {:?} is already {state}", kind.type_name);
        }
        kind.is_active = active;
        info!(activity_type = id.get(), active, "activity type toggled");
        Ok(())
    }

    pub fn purge_activity_type(&self, id: ActivityTypeId) -> Result<()> {
        let mut data = self.lock()?;
        let uses = data
            .activities
            .iter()
            .filter(|activity| activity.activity_type_id == Some(id))
            .count();
        if uses > 0 {
            bail!("activity type {} is used by {uses} activities; deactivate it instead", id.get());
        }
        let before = data.activity_types.len();
        data.activity_types.retain(|kind| kind.id != id);
        if data.activity_types.len() == before {
            bail!("activity type {} no longer exists; refresh the list", id.get());
        }
        info!(activity_type = id.get(), "activity type permanently deleted");
        Ok(())
    }

    pub fn notes_for(&self, entity_type: EntityType, entity_id: i64) -> Result<Vec<Note>> {
        self.related("notes")?;
        Ok(self
            .lock()?
            .notes
            .iter()
            .filter(|note| note.entity_type == entity_type && note.entity_id == entity_id)
            .cloned()
            .collect())
    }

    pub fn add_note(&self, input: &NoteFormInput, author: &CurrentUser) -> Result<Note> {
        input.validate()?;
        let mut data = self.lock()?;
        let id = NoteId::new(next_id(data.notes.iter().map(|note| note.id.get())));
        let note = Note {
            id,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            body: input.body.trim().to_owned(),
            author: author.display_name.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        data.notes.push(note.clone());
        debug!(note = id.get(), entity = input.entity_type.as_str(), "note added");
        Ok(note)
    }

    pub fn attachments_for(&self, entity_type: EntityType, entity_id: i64) -> Result<Vec<Attachment>> {
        self.related("attachments")?;
        Ok(self
            .lock()?
            .attachments
            .iter()
            .filter(|file| file.entity_type == entity_type && file.entity_id == entity_id)
            .cloned()
            .collect())
    }

    pub fn add_attachment(&self, input: &AttachmentFormInput, author: &CurrentUser) -> Result<Attachment> {
        input.validate()?;
        let mut data = self.lock()?;
        let id = AttachmentId::new(next_id(data.attachments.iter().map(|file| file.id.get())));
        let attachment = Attachment {
            id,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            file_name: input.upload.file_name.clone(),
            mime_type: input.upload.mime_type.clone(),
            size_bytes: i64::try_from(input.upload.data.len())?,
            uploaded_by: author.display_name.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        data.attachments.push(attachment.clone());
        Ok(attachment)
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.pause();
        Ok(self.lock()?.users.clone())
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.pause();
        self.lock()?
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("user {} not found", id.get()))
    }
}

fn find_mut<'a, T>(
    rows: &'a mut [T],
    matches: impl Fn(&T) -> bool,
    noun: &str,
    id: i64,
) -> Result<&'a mut T> {
    rows.iter_mut()
        .find(|row| matches(row))
        .ok_or_else(|| anyhow!("{noun} {id} no longer exists; refresh the list"))
}

fn drop_attached(data: &mut DemoData, entity_type: EntityType, entity_id: i64) {
    data.notes
        .retain(|note| !(note.entity_type == entity_type && note.entity_id == entity_id));
    data.attachments
        .retain(|file| !(file.entity_type == entity_type && file.entity_id == entity_id));
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::DemoStore;
    use anyhow::Result;
    use crm_app::{CurrentUser, EntityType, NoteFormInput, Role, UserId};
    use crm_testkit::DemoData;
    use std::time::Duration;

    fn store() -> DemoStore {
        DemoStore::new(DemoData::generate(4, 12), Duration::ZERO)
    }

    fn user() -> CurrentUser {
        CurrentUser::new(UserId::new(3), "Taylor Reed", &[Role::SalesRep])
    }

    #[test]
    fn invalid_account_is_not_saved() -> Result<()> {
        let store = store();
        let mut account = store.accounts()?.remove(0);
        let original = account.name.clone();
        account.name = "  ".to_owned();
        let error = store.save_account(&account).expect_err("blank name rejected");
        assert!(error.to_string().contains("account name is required"));
        assert_eq!(store.account(account.id)?.name, original);
        Ok(())
    }

    #[test]
    fn notes_are_scoped_to_their_record() -> Result<()> {
        let store = store();
        let accounts = store.accounts()?;
        let (first, second) = (&accounts[0], &accounts[1]);
        let before = store.notes_for(EntityType::Account, second.id.get())?.len();
        store.add_note(
            &NoteFormInput {
                entity_type: EntityType::Account,
                entity_id: first.id.get(),
                body: "called about renewal".to_owned(),
            },
            &user(),
        )?;
        let notes = store.notes_for(EntityType::Account, first.id.get())?;
        assert!(notes.iter().any(|note| note.body == "called about renewal"));
        assert!(notes.iter().all(|note| note.entity_id == first.id.get()));
        assert_eq!(store.notes_for(EntityType::Account, second.id.get())?.len(), before);
        Ok(())
    }

    #[test]
    fn used_activity_type_cannot_be_purged() -> Result<()> {
        let store = store();
        let activities = store.activities()?;
        let used = activities
            .iter()
            .find_map(|activity| activity.activity_type_id)
            .expect("seeded activity with a type");
        let error = store.purge_activity_type(used).expect_err("in use");
        assert!(error.to_string().contains("deactivate it instead"));
        Ok(())
    }

    #[test]
    fn inactive_type_reactivates_once() -> Result<()> {
        let store = store();
        let inactive = store
            .activity_types()?
            .into_iter()
            .find(|kind| !kind.is_active)
            .expect("seeded inactive type");
        store.reactivate_activity_type(inactive.id)?;
        assert!(store.activity_type_now(inactive.id)?.is_active);
        let error = store
            .reactivate_activity_type(inactive.id)
            .expect_err("already active");
        assert!(error.to_string().contains("already active"));
        Ok(())
    }

    #[test]
    fn failing_tab_reports_configured_error() {
        let store = store().with_failing_tabs(["deals".to_owned()]);
        let error = store.related("deals").expect_err("configured to fail");
        assert!(error.to_string().contains("deals service is unavailable"));
        assert!(store.related("contacts").is_ok());
    }

    #[test]
    fn deleting_an_account_detaches_its_contacts() -> Result<()> {
        let store = store();
        let account = store.accounts()?.remove(0);
        store.delete_account(account.id)?;
        assert!(store.account(account.id).is_err());
        assert!(
            store
                .contacts()?
                .iter()
                .all(|contact| contact.account_id != Some(account.id))
        );
        let error = store.delete_account(account.id).expect_err("already gone");
        assert!(error.to_string().contains("refresh the list"));
        Ok(())
    }

    #[test]
    fn claim_fails_when_someone_else_owns_the_account() -> Result<()> {
        let store = store();
        let account = store.accounts()?.remove(0);
        let other = CurrentUser::new(UserId::new(4), "Riley Diaz", &[Role::SalesRep]);
        store.set_account_owner(account.id, None)?;
        store.claim_account(account.id, &other)?;
        let error = store
            .claim_account(account.id, &user())
            .expect_err("owned by someone else");
        assert!(error.to_string().contains("already owned by Riley Diaz"));
        assert_eq!(store.account(account.id)?.owner_id, Some(UserId::new(4)));
        Ok(())
    }
}
