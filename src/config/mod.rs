//! Process-wide workflow configuration.
//!
//! SLA and escalation knobs read by the scheduler and the lifecycle
//! managers. Loading is layered: built-in defaults, then an optional TOML
//! file named by `CASEFLOW_CONFIG`, then `CASEFLOW_*` environment overrides.
//! Values are validated once at load time; managers receive the struct and
//! never re-read the environment.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// SLA and escalation configuration for the approval and reminder sweeps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Hours from approval creation to its SLA deadline
    pub approval_sla_hours: u32,
    /// Master switch for the escalation pass; reminders still run when off
    pub escalation_enabled: bool,
    /// Hours granted to each new approver after an escalation
    pub escalation_sla_hours: u32,
    /// Highest escalation level the sweep will reassign to
    pub escalation_max_level: u32,
    /// Hours after `requested_at` before a pending approval gets a reminder
    pub escalation_reminder_hours: u32,
    /// Minimum hours between two reminders for the same approval or
    /// involvement
    pub reminder_cooldown_hours: u32,
    /// Cadence of the background sweep
    pub sweep_interval_seconds: u64,
    /// Capacity of the transition event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            approval_sla_hours: 48,
            escalation_enabled: true,
            escalation_sla_hours: 24,
            escalation_max_level: 3,
            escalation_reminder_hours: 24,
            reminder_cooldown_hours: 24,
            sweep_interval_seconds: 300,
            event_channel_capacity: 1024,
        }
    }
}

impl SystemConfig {
    pub fn approval_sla(&self) -> Duration {
        Duration::hours(i64::from(self.approval_sla_hours))
    }

    pub fn escalation_sla(&self) -> Duration {
        Duration::hours(i64::from(self.escalation_sla_hours))
    }

    pub fn reminder_after(&self) -> Duration {
        Duration::hours(i64::from(self.escalation_reminder_hours))
    }

    pub fn reminder_cooldown(&self) -> Duration {
        Duration::hours(i64::from(self.reminder_cooldown_hours))
    }

    /// Reject configurations the sweep cannot operate under
    pub fn validate(&self) -> Result<()> {
        if self.approval_sla_hours == 0 {
            return Err(CoreError::Configuration(
                "approval_sla_hours must be greater than zero".to_string(),
            ));
        }
        if self.escalation_enabled && self.escalation_sla_hours == 0 {
            return Err(CoreError::Configuration(
                "escalation_sla_hours must be greater than zero when escalation is enabled"
                    .to_string(),
            ));
        }
        if self.sweep_interval_seconds == 0 {
            return Err(CoreError::Configuration(
                "sweep_interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(CoreError::Configuration(
                "event_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load layered configuration: defaults → optional TOML file → env.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&SystemConfig::default())
                .map_err(|e| CoreError::Configuration(e.to_string()))?,
        );

        if let Ok(path) = std::env::var("CASEFLOW_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let loaded: SystemConfig = builder
            .add_source(config::Environment::with_prefix("CASEFLOW"))
            .build()
            .map_err(|e| CoreError::Configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CoreError::Configuration(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }
}
