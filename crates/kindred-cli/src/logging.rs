// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::env;
use std::io::IsTerminal;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KINDRED_LOG";

pub fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Directives come from `KINDRED_LOG`, then `RUST_LOG`, then the `-v` count.
pub fn filter_directives(verbose: u8, kindred_log: Option<String>, rust_log: Option<String>) -> String {
    kindred_log
        .into_iter()
        .chain(rust_log)
        .find(|directives| !directives.trim().is_empty())
        .unwrap_or_else(|| default_level(verbose).to_owned())
}

pub fn init_tracing(verbose: u8) -> Result<()> {
    let directives = filter_directives(
        verbose,
        env::var(LOG_ENV).ok(),
        env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    let env_filter = EnvFilter::try_new(&directives)
        .map_err(|error| anyhow!("invalid {LOG_ENV} / RUST_LOG filter {directives:?}: {error}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(error) = init_result {
        debug!(%error, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{default_level, filter_directives};

    #[test]
    fn verbosity_raises_the_default_level() {
        assert_eq!(default_level(0), "warn");
        assert_eq!(default_level(1), "info");
        assert_eq!(default_level(2), "debug");
        assert_eq!(default_level(7), "trace");
    }

    #[test]
    fn kindred_log_wins_over_rust_log() {
        assert_eq!(
            filter_directives(0, Some("kindred_app=debug".to_owned()), Some("info".to_owned())),
            "kindred_app=debug"
        );
        assert_eq!(
            filter_directives(0, Some("  ".to_owned()), Some("info".to_owned())),
            "info"
        );
        assert_eq!(filter_directives(2, None, None), "debug");
    }
}
