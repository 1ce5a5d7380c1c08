use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::{RequestDescriptor, DEFAULT_ACTION};

const ENV_PREFIX: &str = "FLIGHT_PROBE";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Flight location, `scheme://host:port`.
    pub endpoint: String,
    /// Server-side action named in the JSON ticket.
    pub action: String,
    /// Extra key/value pairs merged into the JSON ticket.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Raw ticket payload. Takes precedence over `action` and `params`.
    pub ticket: Option<String>,
    /// Number of rows to print after the summary; 0 disables the preview.
    pub preview_rows: usize,
    /// Log format: "compact" or "json".
    pub log_format: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: "grpc://localhost:8815".to_string(),
            action: DEFAULT_ACTION.to_string(),
            params: BTreeMap::new(),
            ticket: None,
            preview_rows: 0,
            log_format: "compact".to_string(),
        }
    }
}

impl ProbeConfig {
    /// Built-in defaults overlaid with `FLIGHT_PROBE_*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_env(None)
    }

    /// Like [`ProbeConfig::load`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_from_env(env: Option<config::Map<String, String>>) -> anyhow::Result<Self> {
        let defaults_json = serde_json::to_string(&Self::default())
            .with_context(|| "failed to serialize defaults")?;
        let settings = config::Config::builder()
            .add_source(
                config::File::from_str(&defaults_json, config::FileFormat::Json).required(false),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(env))
            .build()
            .with_context(|| "failed to load configuration")?;
        let cfg: ProbeConfig = settings
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The descriptor to send: the raw ticket when set, the JSON action otherwise.
    pub fn request(&self) -> Result<RequestDescriptor> {
        match &self.ticket {
            Some(ticket) => Ok(RequestDescriptor::raw(ticket.clone().into_bytes())),
            None => RequestDescriptor::action(&self.action, self.params.clone()),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.log_format.as_str(), "compact" | "json") {
            bail!(
                "unsupported log format {:?}, expected \"compact\" or \"json\"",
                self.log_format
            );
        }
        if self.action.trim().is_empty() && self.ticket.is_none() {
            bail!("either an action or a raw ticket must be configured");
        }
        Ok(())
    }
}
