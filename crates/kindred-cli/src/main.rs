// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod report;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use kindred_app::{Dashboard, DashboardCommand, DataService, EntityId, Session};
use kindred_testkit::FakeService;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SETTLE_SLACK: Duration = Duration::from_secs(1);

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

    logging::init_tracing(options.verbose)?;

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `kindred --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let dashboard_options = config.dashboard_options()?;
    let api_timeout = config.api_timeout()?;

    let service: Arc<dyn DataService> = if options.demo {
        Arc::new(FakeService::seeded()?)
    } else {
        let client = kindred_api::Client::new(config.api_base_url(), config.api_key(), api_timeout)
            .with_context(|| {
                format!(
                    "invalid [api] config in {}; fix base_url/timeout values",
                    options.config_path.display()
                )
            })?;
        if !client.has_api_key() {
            info!(env = config.api_key_env(), "no api key set; requests go out unauthenticated");
        }
        Arc::new(client)
    };
    if options.check_only {
        return Ok(());
    }

    let dashboard = match &options.open {
        Some(url) => Dashboard::from_url(url, dashboard_options),
        None => Dashboard::new(dashboard_options),
    };
    let settle_timeout = api_timeout
        + dashboard_options
            .search_debounce
            .max(dashboard_options.heavy_search_debounce)
        + SETTLE_SLACK;

    let mut session = Session::new(service, dashboard);
    settle(&mut session, settle_timeout, "initial list")?;

    if let Some(text) = &options.search {
        session.type_search(text.as_str());
        settle(&mut session, settle_timeout, "search")?;
    }

    if let Some(raw) = &options.select {
        let id = EntityId::parse(raw).ok_or_else(|| anyhow!("--select needs a non-empty id without commas, got {raw:?}"))?;
        session.apply(DashboardCommand::Select(id));
        settle(&mut session, settle_timeout, "detail")?;
    }

    print!("{}", report::render(&session));
    Ok(())
}

fn settle(session: &mut Session, timeout: Duration, what: &str) -> Result<()> {
    if !session.wait_idle(timeout) {
        bail!("timed out after {timeout:?} waiting for the {what} to load");
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    demo: bool,
    open: Option<String>,
    select: Option<String>,
    search: Option<String>,
    verbose: u8,
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
        print_example: false,
        check_only: false,
        demo: false,
        open: None,
        select: None,
        search: None,
        verbose: 0,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--open" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--open requires a dashboard URL"))?;
                options.open = Some(value.as_ref().to_owned());
            }
            "--select" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--select requires an entity id"))?;
                options.select = Some(value.as_ref().to_owned());
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires search text"))?;
                options.search = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "-v" | "--verbose" => {
                options.verbose = options.verbose.saturating_add(1);
            }
            "-vv" => {
                options.verbose = options.verbose.saturating_add(2);
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("kindred");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and backend settings");
    println!("  --demo                   Use seeded in-memory family data");
    println!("  --open <url>             Restore view and filters from a dashboard URL");
    println!("  --search <text>          Type text into the search box");
    println!("  --select <id>            Select an entity in the open view");
    println!("  -v, -vv                  More logging (or set KINDRED_LOG)");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/kindred-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                check_only: false,
                demo: false,
                open: None,
                select: None,
                search: None,
                verbose: 0,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_reads_dashboard_flags() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--demo",
                "--open",
                "/dashboard/recipients?q=sarah",
                "--select",
                "r1",
                "--search",
                "sar",
            ],
            default_options_path(),
        )?;
        assert!(options.demo);
        assert_eq!(options.open.as_deref(), Some("/dashboard/recipients?q=sarah"));
        assert_eq!(options.select.as_deref(), Some("r1"));
        assert_eq!(options.search.as_deref(), Some("sar"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_counts_verbosity() -> Result<()> {
        let options = parse_cli_args(vec!["-v", "--verbose"], default_options_path())?;
        assert_eq!(options.verbose, 2);
        let options = parse_cli_args(vec!["-vv"], default_options_path())?;
        assert_eq!(options.verbose, 2);
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        for flag in ["--config", "--open", "--select", "--search"] {
            let error = parse_cli_args(vec![flag], default_options_path())
                .expect_err("missing value should fail");
            assert!(error.to_string().contains("requires"), "{flag}: {error}");
        }
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.demo);
        assert!(!options.show_help);
        Ok(())
    }
}
