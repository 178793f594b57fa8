// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use crm_app::{CurrentUser, PageKind, Role, UserId};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "crm-console";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_USER_ID: i64 = 3;
const DEFAULT_DISPLAY_NAME: &str = "Taylor Reed";
const DEFAULT_SEED: u64 = 42;
const DEFAULT_ACCOUNTS: usize = 40;
const DEFAULT_LATENCY_MS: u64 = 250;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub demo: Demo,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            session: Session::default(),
            ui: Ui::default(),
            demo: Demo::default(),
            log: Log::default(),
        }
    }
}

/// Who the console acts as. Roles gate claim and assign.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    pub user_id: Option<i64>,
    pub display_name: Option<String>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub start_page: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Demo {
    pub seed: Option<u64>,
    pub accounts: Option<usize>,
    pub latency_ms: Option<u64>,
    pub failing_tabs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CRM_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CRM_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [session], [ui], [demo] and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(user_id) = self.session.user_id
            && user_id <= 0
        {
            bail!(
                "session.user_id in {} must be positive, got {}",
                path.display(),
                user_id
            );
        }

        self.roles()
            .with_context(|| format!("invalid session.roles in {}", path.display()))?;

        if let Some(page) = &self.ui.start_page
            && PageKind::parse(page).is_none()
        {
            let known = PageKind::ALL
                .iter()
                .map(|page| page.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "ui.start_page {:?} in {} is not a page; use one of: {known}",
                page,
                path.display()
            );
        }

        if self.demo.accounts == Some(0) {
            bail!("demo.accounts in {} must be at least 1", path.display());
        }

        if let Some(latency) = self.demo.latency_ms
            && latency > 10_000
        {
            bail!(
                "demo.latency_ms in {} must be at most 10000, got {}",
                path.display(),
                latency
            );
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            bail!(
                "log.level {:?} in {} is not a level; use one of: {}",
                level,
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    pub fn roles(&self) -> Result<Vec<Role>> {
        let Some(names) = &self.session.roles else {
            return Ok(vec![Role::SalesRep]);
        };
        names
            .iter()
            .map(|name| {
                Role::parse(name).ok_or_else(|| {
                    anyhow!("unknown role {name:?}; use admin, manager, sales_rep or read_only")
                })
            })
            .collect()
    }

    pub fn current_user(&self) -> Result<CurrentUser> {
        let roles = self.roles()?;
        Ok(CurrentUser::new(
            UserId::new(self.session.user_id.unwrap_or(DEFAULT_USER_ID)),
            self.session
                .display_name
                .as_deref()
                .unwrap_or(DEFAULT_DISPLAY_NAME),
            &roles,
        ))
    }

    pub fn start_page(&self) -> PageKind {
        self.ui
            .start_page
            .as_deref()
            .and_then(PageKind::parse)
            .unwrap_or(PageKind::Accounts)
    }

    pub fn demo_seed(&self) -> u64 {
        self.demo.seed.unwrap_or(DEFAULT_SEED)
    }

    pub fn demo_accounts(&self) -> usize {
        self.demo.accounts.unwrap_or(DEFAULT_ACCOUNTS)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.demo.latency_ms.unwrap_or(DEFAULT_LATENCY_MS))
    }

    pub fn failing_tabs(&self) -> Vec<String> {
        self.demo.failing_tabs.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> String {
        self.log
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_ascii_lowercase()
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow!("cannot resolve a log directory; set [log].file"))?;
        Ok(root.join(APP_NAME).join("crm-console.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# crm-console config\n# Place this file at: {}\n\nversion = 1\n\n[session]\nuser_id = {DEFAULT_USER_ID}\ndisplay_name = \"{DEFAULT_DISPLAY_NAME}\"\n# admin, manager, sales_rep, read_only\nroles = [\"sales_rep\"]\n\n[ui]\n# accounts, contacts, deals, activities, activity_types\nstart_page = \"accounts\"\n\n[demo]\nseed = {DEFAULT_SEED}\naccounts = {DEFAULT_ACCOUNTS}\n# Delay applied to related-tab, lookup and user fetches\nlatency_ms = {DEFAULT_LATENCY_MS}\n# Related tabs that always fail, e.g. [\"attachments\"]\nfailing_tabs = []\n\n[log]\n# CRM_LOG overrides this with a full filter directive\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n# file = \"/absolute/path/to/crm-console.log\"\n",
            path.display(),
        )
    }
}
