// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod console;
mod logging;
mod page;
mod pages;
mod store;

use anyhow::{Context, Result};
use config::Config;
use console::CrmConsole;
use crm_testkit::DemoData;
use std::env;
use std::path::PathBuf;
use store::DemoStore;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `crm-console --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    if options.print_log_path {
        println!("{}", log_path.display());
        return Ok(());
    }

    let user = config.current_user()?;
    if options.check_only {
        return Ok(());
    }

    logging::init_logging(&log_path, &config.log_level()).with_context(|| {
        format!(
            "start logging to {}; set [log].file to a writable path",
            log_path.display()
        )
    })?;

    let data = DemoData::generate(config.demo_seed(), config.demo_accounts());
    let store = DemoStore::new(data, config.latency()).with_failing_tabs(config.failing_tabs());
    let pages = pages::build_pages(&store, &user)?;
    info!(
        user = %user.display_name,
        seed = config.demo_seed(),
        accounts = config.demo_accounts(),
        "starting console"
    );

    let mut console = CrmConsole::new(pages, config.start_page());
    crm_view::run_console(&mut console)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_log_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_log_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-log-path" => {
                options.print_log_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("crm-console");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-log-path         Print resolved log file path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and session, then exit");
    println!("  --help                   Show this help");
    println!();
    println!("  CRM_CONFIG_PATH overrides the default config location.");
    println!("  CRM_LOG takes a tracing filter, e.g. CRM_LOG=crm_view=debug");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/crm-console-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_log_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--demo"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-log-path", "--print-example-config", "--check", "-h"],
            default_options_path(),
        )?;
        assert!(!options.print_config_path);
        assert!(options.print_log_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.show_help);
        Ok(())
    }
}
