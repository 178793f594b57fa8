// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "CRM_LOG";

/// `CRM_LOG` wins when it holds a valid directive; otherwise the configured
/// level applies to the workspace crates only.
pub fn build_filter(env_directive: Option<&str>, level: &str) -> EnvFilter {
    if let Some(directive) = env_directive
        && let Ok(filter) = EnvFilter::try_new(directive)
    {
        return filter;
    }
    EnvFilter::new(format!(
        "crm_app={level},crm_view={level},crm_console={level}"
    ))
}

/// The terminal owns stdout and stderr while the console runs, so events go
/// to an append-only file.
pub fn init_logging(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let env_directive = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env_directive.as_deref(), level);
    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

#[cfg(test)]
mod tests {
    use super::build_filter;

    #[test]
    fn configured_level_scopes_to_workspace_crates() {
        let rendered = build_filter(None, "debug").to_string();
        assert!(rendered.contains("crm_view=debug"), "got {rendered}");
        assert!(rendered.contains("crm_console=debug"), "got {rendered}");
    }

    #[test]
    fn env_directive_overrides_level() {
        let rendered = build_filter(Some("crm_view=trace"), "info").to_string();
        assert_eq!(rendered, "crm_view=trace");
    }

    #[test]
    fn invalid_env_directive_falls_back_to_level() {
        let rendered = build_filter(Some("crm_view=[[["), "warn").to_string();
        assert!(rendered.contains("crm_app=warn"), "got {rendered}");
    }
}
