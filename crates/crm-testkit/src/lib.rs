// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crm_app::{
    Account, AccountId, AccountStatus, Activity, ActivityId, ActivityType, ActivityTypeId,
    Attachment, AttachmentId, Contact, ContactId, Deal, DealId, DealStage, EntityType, Note,
    NoteId, Role, User, UserId,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use time::macros::datetime;
use time::{Date, Duration, OffsetDateTime};

const INDUSTRIES: [&str; 10] = [
    "Software",
    "Manufacturing",
    "Logistics",
    "Healthcare",
    "Retail",
    "Finance",
    "Energy",
    "Education",
    "Hospitality",
    "Media",
];

const COMPANY_PREFIXES: [&str; 14] = [
    "Acme", "Northwind", "Globex", "Initech", "Umbrella", "Stark", "Wayne", "Contoso", "Fabrikam",
    "Tailspin", "Litware", "Adatum", "Proseware", "Vandelay",
];
const COMPANY_SUFFIXES: [&str; 7] = ["Inc", "Labs", "Group", "Systems", "Partners", "Co", "Holdings"];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const CITIES: [&str; 12] = [
    "Austin",
    "Seattle",
    "Denver",
    "Madison",
    "Raleigh",
    "Pittsburgh",
    "Portland",
    "Boise",
    "Phoenix",
    "Nashville",
    "Columbus",
    "Minneapolis",
];

const JOB_TITLES: [&str; 10] = [
    "CEO",
    "CTO",
    "VP Sales",
    "Head of Operations",
    "Procurement Lead",
    "Engineering Manager",
    "Office Manager",
    "Finance Director",
    "Product Owner",
    "IT Administrator",
];

const DEAL_KINDS: [&str; 8] = [
    "Annual license",
    "Platform upgrade",
    "Pilot",
    "Support renewal",
    "Expansion",
    "Onboarding package",
    "Data migration",
    "Training",
];

/// Reference activity types. The last one is inactive so the reactivate
/// flow has something to work on.
const ACTIVITY_TYPES: [(&str, &str, bool); 6] = [
    ("Call", "Phone conversation with the customer", true),
    ("Email", "Outbound or inbound email thread", true),
    ("Meeting", "Scheduled meeting, in person or remote", true),
    ("Demo", "Product demonstration", true),
    ("Follow-up", "Reminder to circle back", true),
    ("Fax", "Legacy channel, kept for old records", false),
];

const USERS: [(&str, &[Role], bool); 6] = [
    ("Avery Walker", &[Role::Admin], true),
    ("Jordan Hill", &[Role::Manager], true),
    ("Taylor Reed", &[Role::SalesRep], true),
    ("Riley Diaz", &[Role::SalesRep], true),
    ("Morgan Price", &[Role::ReadOnly], true),
    ("Casey Brooks", &[Role::SalesRep], false),
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for CRM records. The same seed always yields the same
/// sequence.
#[derive(Debug, Clone)]
pub struct CrmFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl CrmFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn company_name(&mut self) -> String {
        format!("{} {}", self.pick(&COMPANY_PREFIXES), self.pick(&COMPANY_SUFFIXES))
    }

    pub fn person_name(&mut self) -> (String, String) {
        (self.pick(&FIRST_NAMES).to_owned(), self.pick(&LAST_NAMES).to_owned())
    }

    pub fn account(&mut self, id: AccountId, owner: Option<&User>) -> Account {
        let name = self.company_name();
        let slug = name.to_ascii_lowercase().replace(' ', "");
        let status = AccountStatus::ALL[self.rng.int_n(AccountStatus::ALL.len())];
        let annual_revenue = if self.rng.int_n(5) == 0 {
            None
        } else {
            Some(self.int_range_i64(50, 20_000) as f64 * 1_000.0)
        };
        Account {
            id,
            name,
            industry: self.pick(&INDUSTRIES).to_owned(),
            website: format!("https://{slug}.example.com"),
            phone: self.phone(),
            city: self.pick(&CITIES).to_owned(),
            annual_revenue,
            status,
            owner_id: owner.map(|user| user.id),
            owner_name: owner.map(|user| user.display_name.clone()).unwrap_or_default(),
            is_active: status != AccountStatus::Churned,
            created_at: self.datetime_before_reference(720),
        }
    }

    pub fn contact(&mut self, id: ContactId, account: &Account) -> Contact {
        let (first_name, last_name) = self.person_name();
        let domain = account.name.to_ascii_lowercase().replace(' ', "");
        Contact {
            id,
            account_id: Some(account.id),
            email: format!(
                "{}.{}@{domain}.example.com",
                first_name.to_ascii_lowercase(),
                last_name.to_ascii_lowercase()
            ),
            first_name,
            last_name,
            phone: self.phone(),
            job_title: self.pick(&JOB_TITLES).to_owned(),
            owner_id: account.owner_id,
            created_at: self.datetime_before_reference(360),
        }
    }

    pub fn deal(&mut self, id: DealId, account: &Account) -> Deal {
        let stage = DealStage::ALL[self.rng.int_n(DealStage::ALL.len())];
        let probability = match stage {
            DealStage::ClosedWon => Some(100.0),
            DealStage::ClosedLost => Some(0.0),
            _ if self.rng.int_n(4) == 0 => None,
            _ => Some(self.int_range_i64(1, 9) as f64 * 10.0),
        };
        let close_offset = self.int_range_i64(-90, 180);
        Deal {
            id,
            account_id: Some(account.id),
            name: format!("{} {}", account.name, self.pick(&DEAL_KINDS)),
            stage,
            amount: Some(self.int_range_i64(5, 500) as f64 * 500.0),
            probability,
            close_date: Some(reference_date() + Duration::days(close_offset)),
            owner_id: account.owner_id,
            owner_name: account.owner_name.clone(),
            created_at: self.datetime_before_reference(180),
        }
    }

    /// An activity against an account (and optionally one of its deals).
    /// Only active types are picked. Roughly a third of activities leave
    /// the type label off so the view has to resolve it.
    pub fn activity(
        &mut self,
        id: ActivityId,
        account: &Account,
        deal: Option<&Deal>,
        types: &[ActivityType],
    ) -> Activity {
        let active: Vec<&ActivityType> = types.iter().filter(|kind| kind.is_active).collect();
        let kind = if active.is_empty() {
            None
        } else {
            Some(active[self.rng.int_n(active.len())])
        };
        let completed = match self.rng.int_n(3) {
            0 => None,
            1 => Some(false),
            _ => Some(true),
        };
        let type_name = kind
            .filter(|_| self.rng.int_n(3) != 0)
            .map(|kind| kind.type_name.clone());
        Activity {
            id,
            account_id: Some(account.id),
            deal_id: deal.map(|deal| deal.id),
            activity_type_id: kind.map(|kind| kind.id),
            type_name,
            subject: self.sentence(3, 6),
            due_date: Some(reference_date() + Duration::days(self.int_range_i64(-30, 60))),
            completed,
            notes: if self.rng.bool() {
                self.sentence(6, 12)
            } else {
                String::new()
            },
            created_at: self.datetime_before_reference(90),
        }
    }

    pub fn note(&mut self, id: NoteId, entity_type: EntityType, entity_id: i64, author: &str) -> Note {
        Note {
            id,
            entity_type,
            entity_id,
            body: self.sentence(5, 14),
            author: author.to_owned(),
            created_at: self.datetime_before_reference(60),
        }
    }

    pub fn attachment(
        &mut self,
        id: AttachmentId,
        entity_type: EntityType,
        entity_id: i64,
        uploaded_by: &str,
    ) -> Attachment {
        let (file_name, mime_type) = match self.rng.int_n(3) {
            0 => ("proposal.pdf", "application/pdf"),
            1 => ("pricing.xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            _ => ("whiteboard.png", "image/png"),
        };
        Attachment {
            id,
            entity_type,
            entity_id,
            file_name: file_name.to_owned(),
            mime_type: mime_type.to_owned(),
            size_bytes: self.int_range_i64(2_000, 4_000_000),
            uploaded_by: uploaded_by.to_owned(),
            created_at: self.datetime_before_reference(60),
        }
    }

    pub fn phone(&mut self) -> String {
        format!(
            "({:03}) {:03}-{:04}",
            self.int_range_i64(200, 999),
            self.int_range_i64(200, 999),
            self.int_range_i64(0, 9_999),
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn datetime_before_reference(&mut self, max_days: i64) -> OffsetDateTime {
        let seconds = self.int_range_i64(0, max_days * 86_400);
        reference_now() - Duration::seconds(seconds)
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        const WORDS: [&str; 24] = [
            "review",
            "pricing",
            "contract",
            "renewal",
            "onboarding",
            "budget",
            "timeline",
            "proposal",
            "stakeholder",
            "security",
            "questionnaire",
            "integration",
            "pilot",
            "feedback",
            "quarterly",
            "roadmap",
            "sync",
            "invoice",
            "legal",
            "approval",
            "discount",
            "champion",
            "procurement",
            "kickoff",
        ];

        let count = self.int_range_i64(min_words as i64, max_words as i64) as usize;
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

/// A complete, internally consistent demo dataset.
#[derive(Debug, Clone, Default)]
pub struct DemoData {
    pub users: Vec<User>,
    pub activity_types: Vec<ActivityType>,
    pub accounts: Vec<Account>,
    pub contacts: Vec<Contact>,
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
    pub notes: Vec<Note>,
    pub attachments: Vec<Attachment>,
}

impl DemoData {
    pub fn generate(seed: u64, account_count: usize) -> Self {
        let mut faker = CrmFaker::new(seed);
        let mut data = Self {
            users: demo_users(),
            activity_types: demo_activity_types(),
            ..Self::default()
        };
        let owners: Vec<User> = data
            .users
            .iter()
            .filter(|user| user.is_active && !user.roles.contains(&Role::ReadOnly))
            .cloned()
            .collect();

        for index in 0..account_count {
            let owner = if faker.int_n(4) == 0 || owners.is_empty() {
                None
            } else {
                Some(&owners[faker.int_n(owners.len())])
            };
            let account = faker.account(AccountId::new(index as i64 + 1), owner);
            let author = owner.map_or("System", |user| user.display_name.as_str());

            for _ in 0..faker.int_n(4) + 1 {
                let id = ContactId::new(data.contacts.len() as i64 + 1);
                data.contacts.push(faker.contact(id, &account));
            }
            let first_deal = data.deals.len();
            for _ in 0..faker.int_n(3) {
                let id = DealId::new(data.deals.len() as i64 + 1);
                data.deals.push(faker.deal(id, &account));
            }
            for _ in 0..faker.int_n(4) {
                let deals = &data.deals[first_deal..];
                let deal = if deals.is_empty() || faker.int_n(2) == 0 {
                    None
                } else {
                    Some(&deals[faker.int_n(deals.len())])
                };
                let id = ActivityId::new(data.activities.len() as i64 + 1);
                let activity = faker.activity(id, &account, deal, &data.activity_types);
                data.activities.push(activity);
            }
            for _ in 0..faker.int_n(3) {
                let id = NoteId::new(data.notes.len() as i64 + 1);
                data.notes
                    .push(faker.note(id, EntityType::Account, account.id.get(), author));
            }
            if faker.int_n(3) == 0 {
                let id = AttachmentId::new(data.attachments.len() as i64 + 1);
                data.attachments
                    .push(faker.attachment(id, EntityType::Account, account.id.get(), author));
            }
            data.accounts.push(account);
        }
        data
    }
}

pub fn demo_users() -> Vec<User> {
    USERS
        .iter()
        .enumerate()
        .map(|(index, (name, roles, is_active))| {
            let email = name.to_ascii_lowercase().replace(' ', ".");
            User {
                id: UserId::new(index as i64 + 1),
                display_name: (*name).to_owned(),
                email: format!("{email}@crm.example.com"),
                roles: roles.iter().copied().collect::<BTreeSet<_>>(),
                is_active: *is_active,
            }
        })
        .collect()
}

pub fn demo_activity_types() -> Vec<ActivityType> {
    ACTIVITY_TYPES
        .iter()
        .enumerate()
        .map(|(index, (name, description, is_active))| ActivityType {
            id: ActivityTypeId::new(index as i64 + 1),
            type_name: (*name).to_owned(),
            description: (*description).to_owned(),
            is_active: *is_active,
        })
        .collect()
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}

pub fn reference_now() -> OffsetDateTime {
    datetime!(2026-01-01 0:00 UTC)
}

fn reference_date() -> Date {
    reference_now().date()
}
