use anyhow::Context;
use serde::Serialize;

use helpdesk_core::sla::{
    SlaPolicy, SlaWindow, DEFAULT_HIGH_WINDOW, DEFAULT_LOW_WINDOW, DEFAULT_MEDIUM_WINDOW,
    DEFAULT_URGENT_WINDOW,
};

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "helpdesk_core=info,helpdesk_cli=info";

/// Engine configuration loaded from environment variables.
///
/// Every field has a default; override per deployment via the environment
/// (a `.env` file is honoured).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub sla_policy: SlaPolicy,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `SLA_URGENT_RESPONSE_MINS`    | `60`    |
    /// | `SLA_URGENT_RESOLUTION_MINS`  | `240`   |
    /// | `SLA_HIGH_RESPONSE_MINS`      | `240`   |
    /// | `SLA_HIGH_RESOLUTION_MINS`    | `1440`  |
    /// | `SLA_MEDIUM_RESPONSE_MINS`    | `480`   |
    /// | `SLA_MEDIUM_RESOLUTION_MINS`  | `2880`  |
    /// | `SLA_LOW_RESPONSE_MINS`       | `1440`  |
    /// | `SLA_LOW_RESOLUTION_MINS`     | `4320`  |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let window = |tier: &str, default: SlaWindow| -> anyhow::Result<SlaWindow> {
            Ok(SlaWindow::new(
                minutes(&lookup, &format!("SLA_{tier}_RESPONSE_MINS"), default.response_minutes)?,
                minutes(
                    &lookup,
                    &format!("SLA_{tier}_RESOLUTION_MINS"),
                    default.resolution_minutes,
                )?,
            ))
        };

        let sla_policy = SlaPolicy::new(
            window("LOW", DEFAULT_LOW_WINDOW)?,
            window("MEDIUM", DEFAULT_MEDIUM_WINDOW)?,
            window("HIGH", DEFAULT_HIGH_WINDOW)?,
            window("URGENT", DEFAULT_URGENT_WINDOW)?,
        )
        .context("Invalid SLA policy configuration")?;

        Ok(Self { sla_policy })
    }
}

fn minutes(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> anyhow::Result<i64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a whole number of minutes, got '{raw}'")),
        None => Ok(default),
    }
}
