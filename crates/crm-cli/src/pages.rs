// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The five entity pages: accounts, contacts, deals, activities and
//! activity types, each wired to the demo store.

use anyhow::{Result, anyhow};
use crm_app::{
    Account, AccountField, AccountId, AccountStatus, Activity, ActivityField, ActivityType,
    ActivityTypeField, ActivityTypeId, AttachmentFormInput, AttachmentUpload, ChipColor,
    ChipPalette, ColumnKind, Contact, ContactField, CurrentUser, Deal, DealField, DealStage,
    EntityType, FormatterRegistry, NoteFormInput, PageKind, Record, Rendered, Role, Row, User,
    UserId, Value,
};
use crm_view::{
    Column, DetailActions, DetailView, FieldDescriptor, FieldKind, LookupService,
    OwnershipConfig, RelatedTab, RowAction, RowActions, SelectOption, ServiceResult, TableView,
    UserDirectory,
};
use std::sync::Arc;

use crate::page::{EntityPage, PageController, PageSpec};
use crate::store::DemoStore;

const CLAIM_ROLES: &[Role] = &[Role::SalesRep, Role::Manager, Role::Admin];
const ASSIGN_ROLES: &[Role] = &[Role::Manager, Role::Admin];

/// Builds every page in tab order.
pub fn build_pages(store: &DemoStore, user: &CurrentUser) -> Result<Vec<Box<dyn PageController>>> {
    Ok(vec![
        Box::new(EntityPage::new(AccountsPage::new(store.clone(), user), user.clone())?),
        Box::new(EntityPage::new(ContactsPage::new(store.clone()), user.clone())?),
        Box::new(EntityPage::new(DealsPage::new(store.clone(), user), user.clone())?),
        Box::new(EntityPage::new(ActivitiesPage::new(store.clone()), user.clone())?),
        Box::new(EntityPage::new(ActivityTypesPage::new(store.clone()), user.clone())?),
    ])
}

fn can_write(user: &CurrentUser) -> bool {
    CLAIM_ROLES.iter().any(|role| user.has_role(*role))
}

fn can_assign(user: &CurrentUser) -> bool {
    ASSIGN_ROLES.iter().any(|role| user.has_role(*role))
}

fn lookup_id(value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| anyhow!("expected a record id, got {value:?}"))
}

fn user_directory(store: &DemoStore) -> Arc<dyn UserDirectory> {
    let store = store.clone();
    Arc::new(move || -> Result<ServiceResult<Vec<User>>> {
        let users = store.users()?;
        Ok(ServiceResult::new(
            users.into_iter().filter(|user| user.is_active).collect(),
        ))
    })
}

fn user_lookup(store: &DemoStore) -> Arc<dyn LookupService> {
    let store = store.clone();
    Arc::new(move |value: &Value| -> Result<ServiceResult<Row>> {
        let user = store.user(UserId::new(lookup_id(value)?))?;
        Ok(ServiceResult::new(
            Row::new()
                .with("user_id", user.id)
                .with("display_name", user.display_name),
        ))
    })
}

fn account_lookup(store: &DemoStore) -> Arc<dyn LookupService> {
    let store = store.clone();
    Arc::new(move |value: &Value| -> Result<ServiceResult<Row>> {
        let account = store.account(AccountId::new(lookup_id(value)?))?;
        Ok(ServiceResult::new(account.to_row()))
    })
}

fn activity_type_lookup(store: &DemoStore) -> Arc<dyn LookupService> {
    let store = store.clone();
    Arc::new(move |value: &Value| -> Result<ServiceResult<Row>> {
        let kind = store.activity_type(ActivityTypeId::new(lookup_id(value)?))?;
        Ok(ServiceResult::new(kind.to_row()))
    })
}

fn account_status_palette() -> ChipPalette {
    ChipPalette::new()
        .entry("prospect", "Prospect", ChipColor::Info)
        .entry("customer", "Customer", ChipColor::Success)
        .entry("partner", "Partner", ChipColor::Primary)
        .entry("churned", "Churned", ChipColor::Error)
}

fn deal_stage_palette() -> ChipPalette {
    DealStage::ALL
        .into_iter()
        .fold(ChipPalette::new(), |palette, stage| {
            let color = match stage {
                DealStage::Prospecting => ChipColor::Neutral,
                DealStage::Qualification => ChipColor::Info,
                DealStage::Proposal => ChipColor::Primary,
                DealStage::Negotiation => ChipColor::Warning,
                DealStage::ClosedWon => ChipColor::Success,
                DealStage::ClosedLost => ChipColor::Error,
            };
            palette.entry(stage.as_str(), stage_label(stage), color)
        })
}

fn stage_label(stage: DealStage) -> &'static str {
    match stage {
        DealStage::Prospecting => "Prospecting",
        DealStage::Qualification => "Qualification",
        DealStage::Proposal => "Proposal",
        DealStage::Negotiation => "Negotiation",
        DealStage::ClosedWon => "Closed won",
        DealStage::ClosedLost => "Closed lost",
    }
}

fn status_options() -> Vec<SelectOption> {
    AccountStatus::ALL
        .into_iter()
        .map(|status| {
            let label = account_status_palette().style_for(status.as_str()).label;
            SelectOption::new(status.as_str(), label)
        })
        .collect()
}

fn stage_options() -> Vec<SelectOption> {
    DealStage::ALL
        .into_iter()
        .map(|stage| SelectOption::new(stage.as_str(), stage_label(stage)))
        .collect()
}

fn column(field: &str, header: &str) -> Column<String> {
    Column::new(field.to_owned(), header)
}

/// Renders an account id column as the account's name.
fn account_name_formatter<R>(store: &DemoStore) -> impl Fn(&Value, &R) -> Rendered + Send + Sync + 'static {
    let store = store.clone();
    move |value: &Value, _: &R| {
        value
            .as_i64()
            .and_then(|id| store.account_name_now(AccountId::new(id)))
            .map_or(Rendered::Placeholder, Rendered::Text)
    }
}

fn owner_formatter<R>(me: UserId) -> impl Fn(&Value, &R) -> Rendered + Send + Sync + 'static
where
    R: Record,
{
    move |value: &Value, row: &R| {
        if value.is_blank() {
            return Rendered::Text("Unassigned".to_owned());
        }
        let mine = row
            .to_row()
            .value("owner_id")
            .as_i64()
            .is_some_and(|id| id == me.get());
        if mine {
            Rendered::Text(format!("{} (you)", value.search_text()))
        } else {
            Rendered::Text(value.search_text())
        }
    }
}

fn notes_tab<R: 'static>(
    store: &DemoStore,
    entity_type: EntityType,
    id_of: fn(&R) -> i64,
) -> RelatedTab<R> {
    let store = store.clone();
    let service = Arc::new(move |parent: &R| -> Result<ServiceResult<Vec<Row>>> {
        let notes = store.notes_for(entity_type, id_of(parent))?;
        Ok(ServiceResult::new(notes.iter().map(Record::to_row).collect()))
    });
    RelatedTab::new("notes", "Notes", EntityType::Note, service)
        .table(TableView::new(
            "Notes",
            "note_id".to_owned(),
            vec![
                column("body", "Note").truncate(60),
                column("author", "Author"),
                column("created_at", "Created").kind(ColumnKind::DateTime),
            ],
        ))
        .process(|mut rows| {
            rows.reverse();
            rows
        })
}

fn attachments_tab<R: 'static>(
    store: &DemoStore,
    entity_type: EntityType,
    id_of: fn(&R) -> i64,
) -> RelatedTab<R> {
    let store = store.clone();
    let service = Arc::new(move |parent: &R| -> Result<ServiceResult<Vec<Row>>> {
        let files = store.attachments_for(entity_type, id_of(parent))?;
        Ok(ServiceResult::new(files.iter().map(Record::to_row).collect()))
    });
    RelatedTab::new("attachments", "Attachments", EntityType::Attachment, service).table(
        TableView::new(
            "Attachments",
            "attachment_id".to_owned(),
            vec![
                column("file_name", "File").clickable(),
                column("mime_type", "Type"),
                column("size_bytes", "Bytes"),
                column("uploaded_by", "Uploaded by"),
                column("created_at", "Uploaded").kind(ColumnKind::DateTime),
            ],
        ),
    )
}

fn contacts_table() -> TableView<Row> {
    TableView::new(
        "Contacts",
        "contact_id".to_owned(),
        vec![
            column("full_name", "Name"),
            column("job_title", "Title"),
            column("email", "Email").kind(ColumnKind::Link),
            column("phone", "Phone"),
        ],
    )
}

fn deals_table() -> TableView<Row> {
    TableView::new(
        "Deals",
        "deal_id".to_owned(),
        vec![
            column("deal_name", "Deal"),
            column("stage", "Stage").chips(deal_stage_palette()),
            column("amount", "Amount").kind(ColumnKind::Currency),
            column("close_date", "Close").kind(ColumnKind::Date),
        ],
    )
}

fn activities_table() -> TableView<Row> {
    TableView::new(
        "Activities",
        "activity_id".to_owned(),
        vec![
            column("subject", "Subject"),
            column("type_name", "Type"),
            column("due_date", "Due").kind(ColumnKind::Date),
            column("completed", "Done").kind(ColumnKind::Boolean),
        ],
    )
}

/// Fills `type_name` on activity rows the backend returned without it.
fn with_type_names(store: &DemoStore) -> impl Fn(Vec<Row>) -> Vec<Row> + Send + Sync + 'static {
    let store = store.clone();
    move |rows: Vec<Row>| {
        rows.into_iter()
            .map(|mut row| {
                if row.value("type_name").is_blank()
                    && let Some(id) = row.value("activity_type_id").as_i64()
                    && let Ok(kind) = store.activity_type_now(ActivityTypeId::new(id))
                {
                    row.insert("type_name", kind.type_name);
                }
                row
            })
            .collect()
    }
}

fn add_note(store: &DemoStore, entity_type: EntityType, entity_id: i64, body: &str, user: &CurrentUser) -> Result<()> {
    let input = NoteFormInput {
        entity_type,
        entity_id,
        body: body.to_owned(),
    };
    store.add_note(&input, user).map(|_| ())
}

fn add_attachment(
    store: &DemoStore,
    entity_type: EntityType,
    entity_id: i64,
    upload: &AttachmentUpload,
    user: &CurrentUser,
) -> Result<()> {
    let input = AttachmentFormInput {
        entity_type,
        entity_id,
        upload: upload.clone(),
    };
    store.add_attachment(&input, user).map(|_| ())
}

/// Save, delete, note and attachment callbacks shared by the pages that
/// carry notes.
fn record_actions<R: 'static>(
    store: &DemoStore,
    user: &CurrentUser,
    entity_type: EntityType,
    id_of: fn(&R) -> i64,
    attachments: bool,
) -> DetailActions<R> {
    let note_store = store.clone();
    let note_user = user.clone();
    let actions = DetailActions::new().on_add_note(move |item: &R, body: &str| {
        add_note(&note_store, entity_type, id_of(item), body, &note_user)
    });
    if !attachments {
        return actions;
    }
    let file_store = store.clone();
    let file_user = user.clone();
    actions.on_add_attachment(move |item: &R, upload: &AttachmentUpload| {
        add_attachment(&file_store, entity_type, id_of(item), upload, &file_user)
    })
}

fn finish_detail<R: Record>(mut detail: DetailView<R>, user: &CurrentUser) -> DetailView<R> {
    if !can_write(user) {
        detail = detail.read_only();
    }
    detail
}

pub struct AccountsPage {
    store: DemoStore,
    me: UserId,
}

impl AccountsPage {
    pub fn new(store: DemoStore, user: &CurrentUser) -> Self {
        Self { store, me: user.id }
    }

    fn account_id(account: &Account) -> i64 {
        account.id.get()
    }
}

impl PageSpec for AccountsPage {
    type Record = Account;

    fn kind(&self) -> PageKind {
        PageKind::Accounts
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Account
    }

    fn load(&self) -> Result<Vec<Account>> {
        self.store.accounts()
    }

    fn table(&self) -> TableView<Account> {
        TableView::new(
            "Accounts",
            AccountField::Id,
            vec![
                Column::new(AccountField::Name, "Name").clickable(),
                Column::new(AccountField::Industry, "Industry"),
                Column::new(AccountField::City, "City").hidden(),
                Column::new(AccountField::Website, "Website")
                    .kind(ColumnKind::Link)
                    .hidden(),
                Column::new(AccountField::Status, "Status").chips(account_status_palette()),
                Column::new(AccountField::AnnualRevenue, "Revenue").kind(ColumnKind::Currency),
                Column::new(AccountField::OwnerName, "Owner"),
                Column::new(AccountField::IsActive, "Active")
                    .kind(ColumnKind::Boolean)
                    .hidden(),
                Column::new(AccountField::CreatedAt, "Created").kind(ColumnKind::DateTime),
            ],
        )
        .with_formatters(
            FormatterRegistry::new().with_field(AccountField::OwnerName.as_str(), owner_formatter(self.me)),
        )
    }

    fn row_actions(&self, user: &CurrentUser) -> RowActions<Account> {
        let mut actions = RowActions::new();
        if !can_write(user) {
            return actions;
        }
        let store = self.store.clone();
        actions = actions.on(RowAction::Delete, move |account: &Account| {
            store.delete_account(account.id)
        });
        let store = self.store.clone();
        let claimer = user.clone();
        actions = actions.on(RowAction::Claim, move |account: &Account| {
            store.claim_account(account.id, &claimer)
        });
        if can_assign(user) {
            let store = self.store.clone();
            actions = actions.on_assign(move |account: &Account, owner| {
                store.set_account_owner(account.id, Some(owner))
            });
        }
        actions
    }

    fn detail(&self, item: Account, user: &CurrentUser) -> Result<DetailView<Account>> {
        let fields = vec![
            FieldDescriptor::new(AccountField::Name, "Name", FieldKind::Text).required(),
            FieldDescriptor::new(AccountField::Industry, "Industry", FieldKind::Text),
            FieldDescriptor::new(AccountField::Website, "Website", FieldKind::Text),
            FieldDescriptor::new(AccountField::Phone, "Phone", FieldKind::Text),
            FieldDescriptor::new(AccountField::City, "City", FieldKind::Text),
            FieldDescriptor::new(AccountField::AnnualRevenue, "Annual revenue", FieldKind::Currency),
            FieldDescriptor::new(AccountField::Status, "Status", FieldKind::Select)
                .options(status_options()),
            FieldDescriptor::new(AccountField::OwnerId, "Owner", FieldKind::Dropdown)
                .read_only()
                .display_field(AccountField::OwnerName)
                .lookup(user_lookup(&self.store), "display_name"),
            FieldDescriptor::new(AccountField::IsActive, "Active", FieldKind::Boolean),
            FieldDescriptor::new(AccountField::CreatedAt, "Created", FieldKind::DateTime).read_only(),
        ];

        let contacts = {
            let store = self.store.clone();
            Arc::new(move |account: &Account| -> Result<ServiceResult<Vec<Row>>> {
                let rows = store
                    .contacts_for_account(account.id)?
                    .iter()
                    .map(|contact| contact.to_row().with("full_name", contact.full_name()))
                    .collect();
                Ok(ServiceResult::new(rows))
            })
        };
        let deals = {
            let store = self.store.clone();
            Arc::new(move |account: &Account| -> Result<ServiceResult<Vec<Row>>> {
                let deals = store.deals_for_account(account.id)?;
                Ok(ServiceResult::new(deals.iter().map(Record::to_row).collect()))
            })
        };
        let activities = {
            let store = self.store.clone();
            Arc::new(move |account: &Account| -> Result<ServiceResult<Vec<Row>>> {
                let activities = store.activities_for_account(account.id)?;
                Ok(ServiceResult::new(activities.iter().map(Record::to_row).collect()))
            })
        };
        let tabs = vec![
            RelatedTab::<Account>::new("contacts", "Contacts", EntityType::Contact, contacts)
                .table(contacts_table()),
            RelatedTab::<Account>::new("deals", "Deals", EntityType::Deal, deals).table(deals_table()),
            RelatedTab::<Account>::new("activities", "Activities", EntityType::Activity, activities)
                .table(activities_table())
                .process(with_type_names(&self.store)),
            notes_tab(&self.store, EntityType::Account, Self::account_id),
            attachments_tab(&self.store, EntityType::Account, Self::account_id),
        ];

        let save_store = self.store.clone();
        let delete_store = self.store.clone();
        let claim_store = self.store.clone();
        let assign_store = self.store.clone();
        let actions = record_actions(&self.store, user, EntityType::Account, Self::account_id, true)
            .on_save(move |account: &Account| save_store.save_account(account))
            .on_delete(move |account: &Account| delete_store.delete_account(account.id))
            .on_claim(move |account: &Account, claimer: &CurrentUser| {
                claim_store.claim_account(account.id, claimer)
            })
            .on_assign(move |account: &Account, owner| {
                assign_store.set_account_owner(account.id, Some(owner))
            });
        let ownership = OwnershipConfig::new(AccountField::OwnerId, AccountField::OwnerName)
            .claim_roles(CLAIM_ROLES)
            .assign_roles(ASSIGN_ROLES);

        let detail = DetailView::new(item, fields, tabs, user.clone())?
            .with_actions(actions)
            .with_ownership(ownership);
        Ok(finish_detail(detail, user))
    }

    fn detail_title(&self, item: &Account) -> String {
        format!("Account: {}", item.name)
    }

    fn users(&self) -> Arc<dyn UserDirectory> {
        user_directory(&self.store)
    }

    fn supports_notes(&self) -> bool {
        true
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    fn add_note(&self, item: &Account, body: &str, user: &CurrentUser) -> Result<()> {
        add_note(&self.store, EntityType::Account, item.id.get(), body, user)
    }

    fn add_attachment(&self, item: &Account, upload: &AttachmentUpload, user: &CurrentUser) -> Result<()> {
        add_attachment(&self.store, EntityType::Account, item.id.get(), upload, user)
    }
}

pub struct ContactsPage {
    store: DemoStore,
}

impl ContactsPage {
    pub fn new(store: DemoStore) -> Self {
        Self { store }
    }

    fn contact_id(contact: &Contact) -> i64 {
        contact.id.get()
    }
}

impl PageSpec for ContactsPage {
    type Record = Contact;

    fn kind(&self) -> PageKind {
        PageKind::Contacts
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Contact
    }

    fn load(&self) -> Result<Vec<Contact>> {
        self.store.contacts()
    }

    fn table(&self) -> TableView<Contact> {
        TableView::new(
            "Contacts",
            ContactField::Id,
            vec![
                Column::new(ContactField::FirstName, "First").clickable(),
                Column::new(ContactField::LastName, "Last").clickable(),
                Column::new(ContactField::AccountId, "Account").kind(ColumnKind::Custom),
                Column::new(ContactField::JobTitle, "Title"),
                Column::new(ContactField::Email, "Email").kind(ColumnKind::Link),
                Column::new(ContactField::Phone, "Phone").hidden(),
                Column::new(ContactField::CreatedAt, "Created")
                    .kind(ColumnKind::DateTime)
                    .hidden(),
            ],
        )
        .with_formatters(
            FormatterRegistry::new()
                .with_field(ContactField::AccountId.as_str(), account_name_formatter(&self.store)),
        )
    }

    fn row_actions(&self, user: &CurrentUser) -> RowActions<Contact> {
        if !can_write(user) {
            return RowActions::new();
        }
        let store = self.store.clone();
        RowActions::new().on(RowAction::Delete, move |contact: &Contact| {
            store.delete_contact(contact.id)
        })
    }

    fn detail(&self, item: Contact, user: &CurrentUser) -> Result<DetailView<Contact>> {
        let fields = vec![
            FieldDescriptor::new(ContactField::FirstName, "First name", FieldKind::Text).required(),
            FieldDescriptor::new(ContactField::LastName, "Last name", FieldKind::Text).required(),
            FieldDescriptor::new(ContactField::AccountId, "Account", FieldKind::Dropdown)
                .lookup(account_lookup(&self.store), AccountField::Name.as_str()),
            FieldDescriptor::new(ContactField::JobTitle, "Job title", FieldKind::Text),
            FieldDescriptor::new(ContactField::Email, "Email", FieldKind::Text),
            FieldDescriptor::new(ContactField::Phone, "Phone", FieldKind::Text),
            FieldDescriptor::new(ContactField::CreatedAt, "Created", FieldKind::DateTime).read_only(),
        ];
        let tabs = vec![
            notes_tab(&self.store, EntityType::Contact, Self::contact_id),
            attachments_tab(&self.store, EntityType::Contact, Self::contact_id),
        ];
        let save_store = self.store.clone();
        let delete_store = self.store.clone();
        let actions = record_actions(&self.store, user, EntityType::Contact, Self::contact_id, true)
            .on_save(move |contact: &Contact| save_store.save_contact(contact))
            .on_delete(move |contact: &Contact| delete_store.delete_contact(contact.id));
        let detail = DetailView::new(item, fields, tabs, user.clone())?.with_actions(actions);
        Ok(finish_detail(detail, user))
    }

    fn detail_title(&self, item: &Contact) -> String {
        format!("Contact: {}", item.full_name())
    }

    fn users(&self) -> Arc<dyn UserDirectory> {
        user_directory(&self.store)
    }

    fn supports_notes(&self) -> bool {
        true
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    fn add_note(&self, item: &Contact, body: &str, user: &CurrentUser) -> Result<()> {
        add_note(&self.store, EntityType::Contact, item.id.get(), body, user)
    }

    fn add_attachment(&self, item: &Contact, upload: &AttachmentUpload, user: &CurrentUser) -> Result<()> {
        add_attachment(&self.store, EntityType::Contact, item.id.get(), upload, user)
    }
}

pub struct DealsPage {
    store: DemoStore,
    me: UserId,
}

impl DealsPage {
    pub fn new(store: DemoStore, user: &CurrentUser) -> Self {
        Self { store, me: user.id }
    }

    fn deal_id(deal: &Deal) -> i64 {
        deal.id.get()
    }
}

impl PageSpec for DealsPage {
    type Record = Deal;

    fn kind(&self) -> PageKind {
        PageKind::Deals
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Deal
    }

    fn load(&self) -> Result<Vec<Deal>> {
        self.store.deals()
    }

    fn table(&self) -> TableView<Deal> {
        TableView::new(
            "Deals",
            DealField::Id,
            vec![
                Column::new(DealField::Name, "Deal").clickable(),
                Column::new(DealField::AccountId, "Account").kind(ColumnKind::Custom),
                Column::new(DealField::Stage, "Stage").chips(deal_stage_palette()),
                Column::new(DealField::Amount, "Amount").kind(ColumnKind::Currency),
                Column::new(DealField::Probability, "Probability").kind(ColumnKind::Percentage),
                Column::new(DealField::CloseDate, "Close date").kind(ColumnKind::Date),
                Column::new(DealField::OwnerName, "Owner"),
                Column::new(DealField::CreatedAt, "Created")
                    .kind(ColumnKind::DateTime)
                    .hidden(),
            ],
        )
        .with_formatters(
            FormatterRegistry::new()
                .with_field(DealField::AccountId.as_str(), account_name_formatter(&self.store))
                .with_field(DealField::OwnerName.as_str(), owner_formatter(self.me)),
        )
    }

    fn row_actions(&self, user: &CurrentUser) -> RowActions<Deal> {
        let mut actions = RowActions::new();
        if !can_write(user) {
            return actions;
        }
        let store = self.store.clone();
        actions = actions.on(RowAction::Delete, move |deal: &Deal| store.delete_deal(deal.id));
        let store = self.store.clone();
        let claimer = user.clone();
        actions = actions.on(RowAction::Claim, move |deal: &Deal| {
            store.claim_deal(deal.id, &claimer)
        });
        if can_assign(user) {
            let store = self.store.clone();
            actions = actions.on_assign(move |deal: &Deal, owner| store.set_deal_owner(deal.id, Some(owner)));
        }
        actions
    }

    fn detail(&self, item: Deal, user: &CurrentUser) -> Result<DetailView<Deal>> {
        let fields = vec![
            FieldDescriptor::new(DealField::Name, "Name", FieldKind::Text).required(),
            FieldDescriptor::new(DealField::AccountId, "Account", FieldKind::Dropdown)
                .lookup(account_lookup(&self.store), AccountField::Name.as_str()),
            FieldDescriptor::new(DealField::Stage, "Stage", FieldKind::Select).options(stage_options()),
            FieldDescriptor::new(DealField::Amount, "Amount", FieldKind::Currency),
            FieldDescriptor::new(DealField::Probability, "Probability (%)", FieldKind::Number),
            FieldDescriptor::new(DealField::CloseDate, "Close date", FieldKind::Date),
            FieldDescriptor::new(DealField::OwnerId, "Owner", FieldKind::Dropdown)
                .read_only()
                .display_field(DealField::OwnerName)
                .lookup(user_lookup(&self.store), "display_name"),
            FieldDescriptor::new(DealField::CreatedAt, "Created", FieldKind::DateTime).read_only(),
        ];

        let activities = {
            let store = self.store.clone();
            Arc::new(move |deal: &Deal| -> Result<ServiceResult<Vec<Row>>> {
                let activities = store.activities_for_deal(deal.id)?;
                Ok(ServiceResult::new(activities.iter().map(Record::to_row).collect()))
            })
        };
        let tabs = vec![
            RelatedTab::<Deal>::new("activities", "Activities", EntityType::Activity, activities)
                .table(activities_table())
                .process(with_type_names(&self.store)),
            notes_tab(&self.store, EntityType::Deal, Self::deal_id),
            attachments_tab(&self.store, EntityType::Deal, Self::deal_id),
        ];

        let save_store = self.store.clone();
        let delete_store = self.store.clone();
        let claim_store = self.store.clone();
        let assign_store = self.store.clone();
        let actions = record_actions(&self.store, user, EntityType::Deal, Self::deal_id, true)
            .on_save(move |deal: &Deal| save_store.save_deal(deal))
            .on_delete(move |deal: &Deal| delete_store.delete_deal(deal.id))
            .on_claim(move |deal: &Deal, claimer: &CurrentUser| claim_store.claim_deal(deal.id, claimer))
            .on_assign(move |deal: &Deal, owner| assign_store.set_deal_owner(deal.id, Some(owner)));
        let ownership = OwnershipConfig::new(DealField::OwnerId, DealField::OwnerName)
            .claim_roles(CLAIM_ROLES)
            .assign_roles(ASSIGN_ROLES);

        let detail = DetailView::new(item, fields, tabs, user.clone())?
            .with_actions(actions)
            .with_ownership(ownership);
        Ok(finish_detail(detail, user))
    }

    fn detail_title(&self, item: &Deal) -> String {
        format!("Deal: {}", item.name)
    }

    fn users(&self) -> Arc<dyn UserDirectory> {
        user_directory(&self.store)
    }

    fn supports_notes(&self) -> bool {
        true
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    fn add_note(&self, item: &Deal, body: &str, user: &CurrentUser) -> Result<()> {
        add_note(&self.store, EntityType::Deal, item.id.get(), body, user)
    }

    fn add_attachment(&self, item: &Deal, upload: &AttachmentUpload, user: &CurrentUser) -> Result<()> {
        add_attachment(&self.store, EntityType::Deal, item.id.get(), upload, user)
    }
}

pub struct ActivitiesPage {
    store: DemoStore,
}

impl ActivitiesPage {
    pub fn new(store: DemoStore) -> Self {
        Self { store }
    }

    fn activity_id(activity: &Activity) -> i64 {
        activity.id.get()
    }
}

impl PageSpec for ActivitiesPage {
    type Record = Activity;

    fn kind(&self) -> PageKind {
        PageKind::Activities
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Activity
    }

    fn load(&self) -> Result<Vec<Activity>> {
        self.store.activities()
    }

    fn table(&self) -> TableView<Activity> {
        let store = self.store.clone();
        let type_name = move |value: &Value, activity: &Activity| {
            if !value.is_blank() {
                return Rendered::Text(value.search_text());
            }
            activity
                .activity_type_id
                .and_then(|id| store.activity_type_now(id).ok())
                .map_or(Rendered::Placeholder, |kind| Rendered::Text(kind.type_name))
        };
        TableView::new(
            "Activities",
            ActivityField::Id,
            vec![
                Column::new(ActivityField::Subject, "Subject").clickable(),
                Column::new(ActivityField::TypeName, "Type").kind(ColumnKind::Custom),
                Column::new(ActivityField::AccountId, "Account").kind(ColumnKind::Custom),
                Column::new(ActivityField::DueDate, "Due").kind(ColumnKind::Date),
                Column::new(ActivityField::Completed, "Done").kind(ColumnKind::Boolean),
                Column::new(ActivityField::Notes, "Notes").truncate(30).hidden(),
            ],
        )
        .with_formatters(
            FormatterRegistry::new()
                .with_field(ActivityField::TypeName.as_str(), type_name)
                .with_field(ActivityField::AccountId.as_str(), account_name_formatter(&self.store)),
        )
    }

    fn row_actions(&self, user: &CurrentUser) -> RowActions<Activity> {
        if !can_write(user) {
            return RowActions::new();
        }
        let store = self.store.clone();
        RowActions::new().on(RowAction::Delete, move |activity: &Activity| {
            store.delete_activity(activity.id)
        })
    }

    fn detail(&self, item: Activity, user: &CurrentUser) -> Result<DetailView<Activity>> {
        let fields = vec![
            FieldDescriptor::new(ActivityField::Subject, "Subject", FieldKind::Text).required(),
            FieldDescriptor::new(ActivityField::ActivityTypeId, "Type", FieldKind::Dropdown)
                .display_field(ActivityField::TypeName)
                .lookup(activity_type_lookup(&self.store), ActivityTypeField::TypeName.as_str()),
            FieldDescriptor::new(ActivityField::AccountId, "Account", FieldKind::Dropdown)
                .lookup(account_lookup(&self.store), AccountField::Name.as_str()),
            FieldDescriptor::new(ActivityField::DueDate, "Due date", FieldKind::Date),
            FieldDescriptor::new(ActivityField::Completed, "Completed", FieldKind::Boolean),
            FieldDescriptor::new(ActivityField::Notes, "Notes", FieldKind::TextArea).rows(4),
            FieldDescriptor::new(ActivityField::CreatedAt, "Created", FieldKind::DateTime).read_only(),
        ];
        let tabs = vec![notes_tab(&self.store, EntityType::Activity, Self::activity_id)];
        let save_store = self.store.clone();
        let delete_store = self.store.clone();
        let actions = record_actions(&self.store, user, EntityType::Activity, Self::activity_id, false)
            .on_save(move |activity: &Activity| save_store.save_activity(activity))
            .on_delete(move |activity: &Activity| delete_store.delete_activity(activity.id));
        let detail = DetailView::new(item, fields, tabs, user.clone())?.with_actions(actions);
        Ok(finish_detail(detail, user))
    }

    fn detail_title(&self, item: &Activity) -> String {
        format!("Activity: {}", item.subject)
    }

    fn users(&self) -> Arc<dyn UserDirectory> {
        user_directory(&self.store)
    }

    fn supports_notes(&self) -> bool {
        true
    }

    fn add_note(&self, item: &Activity, body: &str, user: &CurrentUser) -> Result<()> {
        add_note(&self.store, EntityType::Activity, item.id.get(), body, user)
    }
}

/// Reference data. Deleting deactivates; admins may purge unused types.
pub struct ActivityTypesPage {
    store: DemoStore,
}

impl ActivityTypesPage {
    pub fn new(store: DemoStore) -> Self {
        Self { store }
    }
}

impl PageSpec for ActivityTypesPage {
    type Record = ActivityType;

    fn kind(&self) -> PageKind {
        PageKind::ActivityTypes
    }

    fn entity_type(&self) -> EntityType {
        EntityType::ActivityType
    }

    fn load(&self) -> Result<Vec<ActivityType>> {
        self.store.activity_types()
    }

    fn table(&self) -> TableView<ActivityType> {
        TableView::new(
            "Activity types",
            ActivityTypeField::Id,
            vec![
                Column::new(ActivityTypeField::TypeName, "Type").clickable(),
                Column::new(ActivityTypeField::Description, "Description").truncate(50),
                Column::new(ActivityTypeField::IsActive, "Active").kind(ColumnKind::Boolean),
            ],
        )
    }

    fn row_actions(&self, user: &CurrentUser) -> RowActions<ActivityType> {
        let mut actions = RowActions::new();
        if !can_write(user) {
            return actions;
        }
        let store = self.store.clone();
        actions = actions.on(RowAction::Delete, move |kind: &ActivityType| {
            store.deactivate_activity_type(kind.id)
        });
        let store = self.store.clone();
        actions = actions.on(RowAction::Reactivate, move |kind: &ActivityType| {
            store.reactivate_activity_type(kind.id)
        });
        if user.has_role(Role::Admin) {
            let store = self.store.clone();
            actions = actions.on(RowAction::PermanentDelete, move |kind: &ActivityType| {
                store.purge_activity_type(kind.id)
            });
        }
        actions
    }

    fn detail(&self, item: ActivityType, user: &CurrentUser) -> Result<DetailView<ActivityType>> {
        let fields = vec![
            FieldDescriptor::new(ActivityTypeField::TypeName, "Name", FieldKind::Text).required(),
            FieldDescriptor::new(ActivityTypeField::Description, "Description", FieldKind::TextArea),
            FieldDescriptor::new(ActivityTypeField::IsActive, "Active", FieldKind::Boolean).read_only(),
        ];
        let save_store = self.store.clone();
        let delete_store = self.store.clone();
        let actions = DetailActions::new()
            .on_save(move |kind: &ActivityType| save_store.save_activity_type(kind))
            .on_delete(move |kind: &ActivityType| delete_store.deactivate_activity_type(kind.id));
        let detail = DetailView::new(item, fields, Vec::new(), user.clone())?.with_actions(actions);
        Ok(finish_detail(detail, user))
    }

    fn detail_title(&self, item: &ActivityType) -> String {
        format!("Activity type: {}", item.type_name)
    }

    fn users(&self) -> Arc<dyn UserDirectory> {
        user_directory(&self.store)
    }

    fn prefilter(&self, data: &[ActivityType], show_inactive: bool) -> Option<Vec<ActivityType>> {
        if show_inactive {
            return None;
        }
        Some(data.iter().filter(|kind| kind.is_active).cloned().collect())
    }

    fn has_inactive_toggle(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{AccountsPage, ActivitiesPage, ActivityTypesPage, build_pages};
    use crate::page::{EntityPage, PageController, PageSpec};
    use crate::store::DemoStore;
    use anyhow::Result;
    use crm_app::{
        ActivityField, ActivityTypeId, CurrentUser, EntityType, PageKind, Rendered, Role, ViewMode,
    };
    use crm_testkit::{DemoData, demo_users};
    use crm_view::{ConsoleEvent, RowAction};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::Duration;

    fn store() -> DemoStore {
        DemoStore::new(DemoData::generate(7, 6), Duration::ZERO)
    }

    fn user(roles: &[Role]) -> CurrentUser {
        let taylor = &demo_users()[2];
        CurrentUser::new(taylor.id, taylor.display_name.clone(), roles)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn channel() -> (Sender<ConsoleEvent>, Receiver<ConsoleEvent>) {
        mpsc::channel()
    }

    fn pick_row_action<P: PageController>(
        page: &mut P,
        actions: &[RowAction],
        action: RowAction,
        tx: &Sender<ConsoleEvent>,
    ) {
        let index = actions
            .iter()
            .position(|candidate| *candidate == action)
            .expect("action is offered");
        page.handle_key(key(KeyCode::Char('m')), tx);
        for _ in 0..index {
            page.handle_key(key(KeyCode::Char('j')), tx);
        }
        page.handle_key(key(KeyCode::Enter), tx);
    }

    #[test]
    fn pages_follow_tab_order() -> Result<()> {
        let pages = build_pages(&store(), &user(&[Role::SalesRep]))?;
        let kinds: Vec<PageKind> = pages.iter().map(|page| page.kind()).collect();
        assert_eq!(kinds, PageKind::ALL.to_vec());
        Ok(())
    }

    #[test]
    fn enter_on_account_name_opens_detail_and_loads_contacts() -> Result<()> {
        let store = store();
        let rep = user(&[Role::SalesRep]);
        let mut page = EntityPage::new(AccountsPage::new(store.clone(), &rep), rep)?;
        let (tx, rx) = channel();

        let outcome = page.handle_key(key(KeyCode::Enter), &tx);
        assert_eq!(outcome.mode, Some(ViewMode::Detail));
        let account_id = page.detail().expect("detail open").item().id;
        let expected = store.contacts_for_account(account_id)?.len();

        for _ in 0..4 {
            let loaded = page
                .detail()
                .and_then(|detail| detail.tab_state("contacts"))
                .is_some_and(|tab| tab.data.is_some());
            if loaded {
                break;
            }
            match rx.recv_timeout(Duration::from_secs(5))? {
                ConsoleEvent::Detail(event) => {
                    page.handle_detail(event, &tx);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        let contacts = page
            .detail()
            .and_then(|detail| detail.tab_state("contacts"))
            .expect("contacts tab");
        assert_eq!(contacts.rows().len(), expected);
        assert!(contacts.rows().iter().all(|row| !row.value("full_name").is_blank()));

        let outcome = page.handle_key(key(KeyCode::Esc), &tx);
        assert_eq!(outcome.mode, Some(ViewMode::List));
        assert!(!page.is_detail_open());
        Ok(())
    }

    #[test]
    fn row_menu_delete_removes_the_account() -> Result<()> {
        let store = store();
        let rep = user(&[Role::SalesRep]);
        let mut page = EntityPage::new(AccountsPage::new(store.clone(), &rep), rep)?;
        let (tx, _rx) = channel();
        let before = page.rows().len();
        let actions = page.table().row_actions();

        pick_row_action(&mut page, &actions, RowAction::Delete, &tx);

        assert_eq!(page.rows().len(), before - 1);
        assert_eq!(store.accounts()?.len(), before - 1);
        Ok(())
    }

    #[test]
    fn row_menu_note_lands_on_the_cursor_account() -> Result<()> {
        let store = store();
        let rep = user(&[Role::SalesRep]);
        let mut page = EntityPage::new(AccountsPage::new(store.clone(), &rep), rep)?;
        let (tx, _rx) = channel();
        let account_id = page.rows()[0].id;
        let actions = page.table().row_actions();

        pick_row_action(&mut page, &actions, RowAction::AddNote, &tx);
        for ch in "renewal in May".chars() {
            page.handle_key(key(KeyCode::Char(ch)), &tx);
        }
        let outcome = page.handle_key(key(KeyCode::Enter), &tx);

        assert_eq!(outcome.status.as_deref(), Some("note added"));
        let notes = store.notes_for(EntityType::Account, account_id.get())?;
        assert!(notes.iter().any(|note| note.body == "renewal in May"));
        Ok(())
    }

    #[test]
    fn read_only_user_gets_no_write_actions() -> Result<()> {
        let viewer = user(&[Role::ReadOnly]);
        let page = EntityPage::new(AccountsPage::new(store(), &viewer), viewer)?;
        let actions = page.table().row_actions();
        assert!(actions.contains(&RowAction::View));
        assert!(!actions.contains(&RowAction::Delete));
        assert!(!actions.contains(&RowAction::Claim));
        assert!(!actions.contains(&RowAction::Assign));
        Ok(())
    }

    #[test]
    fn assign_is_offered_to_managers_only() -> Result<()> {
        let rep = user(&[Role::SalesRep]);
        let rep_page = EntityPage::new(AccountsPage::new(store(), &rep), rep)?;
        assert!(!rep_page.table().row_actions().contains(&RowAction::Assign));

        let manager = user(&[Role::Manager]);
        let manager_page = EntityPage::new(AccountsPage::new(store(), &manager), manager)?;
        assert!(manager_page.table().row_actions().contains(&RowAction::Assign));
        Ok(())
    }

    #[test]
    fn activity_types_hide_inactive_until_toggled() -> Result<()> {
        let store = store();
        let spec = ActivityTypesPage::new(store.clone());
        let all = store.activity_types()?;
        let active = spec.prefilter(&all, false).expect("prefiltered");
        assert!(active.len() < all.len());
        assert!(active.iter().all(|kind| kind.is_active));
        assert!(spec.prefilter(&all, true).is_none());

        let admin = user(&[Role::Admin]);
        let mut page = EntityPage::new(spec, admin)?;
        let (tx, _rx) = channel();
        let outcome = page.handle_key(key(KeyCode::Char('I')), &tx);
        assert_eq!(outcome.status.as_deref(), Some("showing inactive"));
        assert!(page.table().row_actions().contains(&RowAction::PermanentDelete));
        Ok(())
    }

    #[test]
    fn activity_type_column_resolves_missing_names() -> Result<()> {
        let store = store();
        let spec = ActivitiesPage::new(store.clone());
        let table = spec.table();
        let index = table
            .column_index(&ActivityField::TypeName)
            .expect("type column");
        let mut activity = store.activities()?.into_iter().next().expect("an activity");
        activity.activity_type_id = Some(ActivityTypeId::new(1));
        activity.type_name = None;

        let expected = store.activity_type_now(ActivityTypeId::new(1))?.type_name;
        assert_eq!(table.render_cell(&activity, index), Rendered::Text(expected));
        Ok(())
    }
}
