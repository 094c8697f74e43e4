// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use kindred_app::{
    COMPACT_SEARCH_DEBOUNCE, DEFAULT_MAX_RETRIES, DashboardOptions, HEAVY_SEARCH_DEBOUNCE, ViewId,
};
use serde::Deserialize;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "kindred";
pub const CONFIG_PATH_ENV: &str = "KINDRED_CONFIG_PATH";
pub const DEFAULT_API_KEY_ENV: &str = "KINDRED_API_KEY";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:54321";
const DEFAULT_TIMEOUT: &str = "5s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub default_view: Option<String>,
    pub search_debounce: Option<String>,
    pub heavy_search_debounce: Option<String>,
    pub max_retries: Option<u32>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        default_path_from(env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
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
                    "config file {} is not versioned. Add `version = 1` and put values under [api] and [ui]",
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
        if self.api_base_url().is_empty() {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        if let Some(name) = &self.api.api_key_env
            && name.trim().is_empty()
        {
            bail!("api.api_key_env in {} must name an environment variable", path.display());
        }

        for (key, value) in [
            ("api.timeout", &self.api.timeout),
            ("ui.search_debounce", &self.ui.search_debounce),
            ("ui.heavy_search_debounce", &self.ui.heavy_search_debounce),
        ] {
            if let Some(raw) = value
                && parse_duration(raw)? <= Duration::ZERO
            {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }

        if let Some(raw) = &self.ui.default_view
            && ViewId::parse(raw).is_none()
        {
            let known: Vec<&str> = ViewId::ALL.iter().map(|view| view.as_str()).collect();
            bail!(
                "ui.default_view {raw:?} in {} is not a view; use one of: {}",
                path.display(),
                known.join(", ")
            );
        }

        if self.ui.max_retries == Some(0) {
            bail!("ui.max_retries in {} must be at least 1", path.display());
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim()
            .trim_end_matches('/')
    }

    pub fn api_key_env(&self) -> &str {
        self.api.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn api_key(&self) -> Option<String> {
        env::var(self.api_key_env()).ok()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn default_view(&self) -> ViewId {
        self.ui
            .default_view
            .as_deref()
            .and_then(ViewId::parse)
            .unwrap_or_default()
    }

    pub fn dashboard_options(&self) -> Result<DashboardOptions> {
        let search_debounce = match &self.ui.search_debounce {
            Some(raw) => parse_duration(raw)?,
            None => COMPACT_SEARCH_DEBOUNCE,
        };
        let heavy_search_debounce = match &self.ui.heavy_search_debounce {
            Some(raw) => parse_duration(raw)?,
            None => HEAVY_SEARCH_DEBOUNCE,
        };
        Ok(DashboardOptions {
            initial_view: self.default_view(),
            search_debounce,
            heavy_search_debounce,
            max_retries: self.ui.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# kindred config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\n# Name of the environment variable holding the anon key.\napi_key_env = \"{}\"\ntimeout = \"{}\"\n\n[ui]\ndefault_view = \"activity\"\nsearch_debounce = \"300ms\"\n# Used by activity and memory-book.\nheavy_search_debounce = \"500ms\"\nmax_retries = {}\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_API_KEY_ENV,
            DEFAULT_TIMEOUT,
            DEFAULT_MAX_RETRIES,
        )
    }
}

fn default_path_from(env_override: Option<OsString>, config_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = env_override.filter(|path| !path.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let config_root = config_root.ok_or_else(|| {
        anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
    })?;
    Ok(config_root.join(APP_NAME).join("config.toml"))
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 300ms or 5s)")
}
